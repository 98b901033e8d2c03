//! Data and asset access traits for the visualization core.

use crate::error::EnvError;
use crate::types::{AssetMesh, CounterfactualResult, Neighborhood, Snapshot, TargetList};
use async_trait::async_trait;

/// Abstraction over the backend query API.
///
/// # Implementations
///
/// - **Production**: `JsonDirectoryClient` (pre-exported JSON documents)
/// - **Simulation**: `SyntheticDataset` with seeded data and fault injection
///
/// # Request Flow
///
/// ```text
/// Scene                      DataClient                  Backend
///   |                           |                           |
///   |-- spawn(targets(t)) ----->|                           |
///   |                           |-- query ----------------->|
///   |   (frames keep ticking)   |<-------------- document --|
///   |<-- pending slot filled ---|                           |
/// ```
#[async_trait]
pub trait DataClient: Send + Sync + 'static {
    /// Fetches the full snapshot (nodes + edges) for a time bucket.
    async fn snapshot(&self, bucket: u32) -> Result<Snapshot, EnvError>;

    /// Fetches the k-hop neighbourhood around an entity within a bucket.
    async fn neighbors(
        &self,
        entity_id: &str,
        hops: u8,
        bucket: u32,
    ) -> Result<Neighborhood, EnvError>;

    /// Fetches the ranked autopilot target list for a bucket.
    async fn autopilot_targets(&self, bucket: u32) -> Result<TargetList, EnvError>;

    /// Fetches the counterfactual explanation for an entity.
    async fn counterfactual(
        &self,
        entity_id: &str,
        bucket: u32,
    ) -> Result<CounterfactualResult, EnvError>;
}

/// Loader for optional external visual resources (GLB markers etc.).
#[async_trait]
pub trait AssetLoader: Send + Sync + 'static {
    /// Loads a resource by reference.
    ///
    /// # Returns
    /// * `Ok(mesh)` - The resource was resolved and decoded
    /// * `Err(EnvError::Unreachable)` - The resource does not exist or cannot be fetched
    async fn load(&self, resource_ref: &str) -> Result<AssetMesh, EnvError>;
}
