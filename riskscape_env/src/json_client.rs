//! Filesystem-backed implementations of the data boundary.
//!
//! `JsonDirectoryClient` serves documents previously exported from the
//! backend API, one file per query:
//!
//! ```text
//! <root>/snapshot_<t>.json
//! <root>/targets_<t>.json
//! <root>/neighbors_<id>_<k>_<t>.json
//! <root>/counterfactual_<id>_<t>.json
//! ```

use crate::client::{AssetLoader, DataClient};
use crate::error::EnvError;
use crate::types::{AssetMesh, CounterfactualResult, Neighborhood, Snapshot, TargetList};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads backend documents from a directory.
#[derive(Debug, Clone)]
pub struct JsonDirectoryClient {
    root: PathBuf,
}

impl JsonDirectoryClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_document<T: DeserializeOwned>(&self, name: &str) -> Result<T, EnvError> {
        let path = self.root.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EnvError::not_found(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read document");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DataClient for JsonDirectoryClient {
    async fn snapshot(&self, bucket: u32) -> Result<Snapshot, EnvError> {
        self.read_document(&format!("snapshot_{}.json", bucket)).await
    }

    async fn neighbors(
        &self,
        entity_id: &str,
        hops: u8,
        bucket: u32,
    ) -> Result<Neighborhood, EnvError> {
        self.read_document(&format!("neighbors_{}_{}_{}.json", entity_id, hops, bucket))
            .await
    }

    async fn autopilot_targets(&self, bucket: u32) -> Result<TargetList, EnvError> {
        self.read_document(&format!("targets_{}.json", bucket)).await
    }

    async fn counterfactual(
        &self,
        entity_id: &str,
        bucket: u32,
    ) -> Result<CounterfactualResult, EnvError> {
        self.read_document(&format!("counterfactual_{}_{}.json", entity_id, bucket))
            .await
    }
}

/// Loads marker resources (e.g. `.glb` files) from a local directory.
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    root: PathBuf,
}

impl FileAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps an API-style reference (`/api/assets/x.glb`) to a file under the root.
    fn resolve(&self, resource_ref: &str) -> PathBuf {
        let name = resource_ref.rsplit('/').next().unwrap_or(resource_ref);
        self.root.join(name)
    }
}

#[async_trait]
impl AssetLoader for FileAssetLoader {
    async fn load(&self, resource_ref: &str) -> Result<AssetMesh, EnvError> {
        let path = self.resolve(resource_ref);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| EnvError::unreachable(path.display()))?;

        if bytes.is_empty() {
            return Err(EnvError::Serialization(format!(
                "empty resource: {}",
                path.display()
            )));
        }

        Ok(AssetMesh {
            resource_ref: resource_ref.to_string(),
            // Opaque binary; a triangle-sized stride is enough for bookkeeping
            vertex_count: (bytes.len() / 36) as u32,
            byte_len: bytes.len(),
        })
    }
}
