//! Pending-result slots polled by the frame loop.
//!
//! A slot hands out a [`Completer`] to the background task and keeps the
//! receiving half. The frame loop calls [`PendingSlot::poll`] at the start
//! of each tick; nothing ever blocks. Beginning a new request or cancelling
//! drops the receiver, so a late completion is discarded on the sender side.

use tokio::sync::oneshot;

/// Sending half, moved into the spawned task.
#[derive(Debug)]
pub struct Completer<T> {
    tx: oneshot::Sender<T>,
    generation: u64,
}

impl<T> Completer<T> {
    /// Delivers the result. Returns `false` if the request was superseded
    /// or cancelled in the meantime.
    pub fn complete(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the slot has dropped interest in this request.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of polling a slot.
#[derive(Debug, PartialEq, Eq)]
pub enum PendingPoll<T> {
    /// No request outstanding
    Idle,
    /// Request outstanding, no result yet
    Waiting,
    /// Result arrived; the slot is idle again
    Ready(T),
    /// The task ended without completing; the slot is idle again
    Abandoned,
}

/// Receiving half with a generation counter for diagnostics.
#[derive(Debug)]
pub struct PendingSlot<T> {
    rx: Option<oneshot::Receiver<T>>,
    generation: u64,
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingSlot<T> {
    pub fn new() -> Self {
        Self {
            rx: None,
            generation: 0,
        }
    }

    /// Starts a new request, invalidating any outstanding one.
    pub fn begin(&mut self) -> Completer<T> {
        let (tx, rx) = oneshot::channel();
        self.generation += 1;
        self.rx = Some(rx);
        Completer {
            tx,
            generation: self.generation,
        }
    }

    /// Drops the outstanding request. Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        self.rx.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking check for a result.
    pub fn poll(&mut self) -> PendingPoll<T> {
        let Some(rx) = self.rx.as_mut() else {
            return PendingPoll::Idle;
        };
        match rx.try_recv() {
            Ok(value) => {
                self.rx = None;
                PendingPoll::Ready(value)
            }
            Err(oneshot::error::TryRecvError::Empty) => PendingPoll::Waiting,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.rx = None;
                PendingPoll::Abandoned
            }
        }
    }
}
