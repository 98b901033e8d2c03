//! Riskscape Environment Abstraction Layer
//!
//! The visualization core never talks to the outside world directly. Every
//! snapshot, neighbourhood query, autopilot target list and optional asset
//! arrives through the traits defined here:
//!
//! - Time and task spawning (`VizContext`)
//! - Backend data queries (`DataClient`)
//! - Optional visual resources (`AssetLoader`)
//!
//! Production wires these to Tokio and the filesystem; the simulation
//! harness swaps in seeded, virtual-clock implementations so any run is
//! reproducible from its seed.
//!
//! # Example
//!
//! ```ignore
//! use riskscape_env::{DataClient, JsonDirectoryClient};
//!
//! async fn load(client: &JsonDirectoryClient) {
//!     let snapshot = client.snapshot(3).await?;
//!     println!("{} entities", snapshot.nodes.len());
//! }
//! ```

mod client;
mod context;
mod error;
mod json_client;
mod tokio_impl;
mod types;

pub use client::{AssetLoader, DataClient};
pub use context::VizContext;
pub use error::EnvError;
pub use json_client::{FileAssetLoader, JsonDirectoryClient};
pub use tokio_impl::TokioContext;
pub use types::{
    AssetEvent, AssetKind, AssetMesh, AutopilotTarget, CounterfactualResult, EdgeSnapshot,
    EntitySnapshot, KycLevel, Neighborhood, Snapshot, SnapshotMeta, TargetKind, TargetList,
};
