//! In-memory asset loader with a configurable set of reachable resources.

use async_trait::async_trait;
use riskscape_env::{AssetLoader, AssetMesh, EnvError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Resolves only the resource refs it was told about; everything else is
/// unreachable.
#[derive(Debug, Default)]
pub struct SimAssetLoader {
    reachable: HashSet<String>,
    loads: AtomicU64,
}

impl SimAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reachable<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reachable: refs.into_iter().map(Into::into).collect(),
            loads: AtomicU64::new(0),
        }
    }

    /// Load attempts so far.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetLoader for SimAssetLoader {
    async fn load(&self, resource_ref: &str) -> Result<AssetMesh, EnvError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.reachable.contains(resource_ref) {
            return Err(EnvError::unreachable(resource_ref));
        }
        // Sized from the ref so repeated loads are stable
        let vertex_count = 24 + 8 * resource_ref.len() as u32;
        Ok(AssetMesh {
            resource_ref: resource_ref.to_string(),
            vertex_count,
            byte_len: vertex_count as usize * 32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reachable_only() {
        let loader = SimAssetLoader::with_reachable(["assets/cluster_0.glb"]);
        let mesh = loader.load("assets/cluster_0.glb").await.unwrap();
        assert_eq!(mesh.resource_ref, "assets/cluster_0.glb");
        assert!(mesh.vertex_count > 0);

        assert!(matches!(loader.load("assets/missing.glb").await, Err(EnvError::Unreachable(_))));
        assert_eq!(loader.loads(), 2);
    }
}
