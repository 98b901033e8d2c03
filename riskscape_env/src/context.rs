//! Runtime context trait for the visualization engine.

use std::future::Future;
use std::time::Duration;

/// The engine's view of the runtime it lives in.
///
/// The frame loop is single-threaded and never awaits; anything that can
/// suspend (target fetches, asset loads) is handed to `spawn` and its result
/// is polled back at the start of a later tick.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::spawn` and `Instant`
/// - **Simulation**: `SimContext` - virtual clock, seeded
pub trait VizContext: Send + Sync + 'static {
    /// Returns the time elapsed since the context was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Spawns a fire-and-forget background task.
    ///
    /// The engine never joins the task; it observes completion through a
    /// pending-result slot.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
