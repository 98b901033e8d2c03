//! Simulation context implementing VizContext with a virtual clock.

use riskscape_env::VizContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Simulation context backed by a virtual clock.
///
/// Time only moves when the harness advances it, once per simulated frame.
/// Spawned work runs on the current Tokio runtime; the harness yields
/// between frames so that it makes progress.
#[derive(Clone)]
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,

    /// Number of tasks spawned through this context
    spawned: Arc<AtomicU64>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }

    pub fn spawned_tasks(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl VizContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(task = name, t_ns = self.time_ns(), "sim spawn");
        tokio::spawn(future);
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
