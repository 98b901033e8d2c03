//! Wire types exchanged across the data-access boundary.
//!
//! Field names follow the backend's JSON documents so snapshots exported
//! from the API deserialize without adapters.

use serde::{Deserialize, Serialize};

/// Compliance depth classification of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycLevel {
    #[default]
    Standard,
    Enhanced,
}

/// One entity as it exists in a single time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Stable key, identical across buckets for the same entity
    pub id: String,

    /// Regulatory/geographic grouping (0..7)
    pub jurisdiction_bucket: u8,

    /// Standard or enhanced due diligence
    #[serde(default)]
    pub kyc_level: KycLevel,

    /// Model-estimated suspiciousness [0.0 - 1.0]
    pub risk_score: f32,

    /// Category string, e.g. "account", "merchant", "bank"
    #[serde(default = "default_entity_type")]
    pub entity_type: String,

    /// Monetary magnitude moved in the bucket
    #[serde(default)]
    pub volume: f64,
}

fn default_entity_type() -> String {
    "account".to_string()
}

impl EntitySnapshot {
    /// Creates an account entity with zero volume.
    pub fn new(id: impl Into<String>, jurisdiction_bucket: u8, kyc_level: KycLevel, risk_score: f32) -> Self {
        Self {
            id: id.into(),
            jurisdiction_bucket,
            kyc_level,
            risk_score,
            entity_type: default_entity_type(),
            volume: 0.0,
        }
    }

    /// Sets the entity category.
    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }

    /// Sets the bucket volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// A directed money movement between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub from_id: String,
    pub to_id: String,
    pub amount: f64,

    /// Why the edge was singled out (counterfactual results only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EdgeSnapshot {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, amount: f64) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            amount,
            reason: None,
        }
    }
}

/// Bucket metadata returned alongside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Bucket index
    pub t: u32,
    pub n_buckets: u32,
    pub n_entities: usize,
    pub n_transactions: usize,
    #[serde(default = "default_bucket_size")]
    pub bucket_size_seconds: u64,
}

fn default_bucket_size() -> u64 {
    86_400
}

/// The full set of entities and edges valid for one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub meta: SnapshotMeta,
    pub nodes: Vec<EntitySnapshot>,
    #[serde(default)]
    pub edges: Vec<EdgeSnapshot>,
}

impl Snapshot {
    /// Returns the bucket index this snapshot belongs to.
    pub fn bucket(&self) -> u32 {
        self.meta.t
    }
}

/// Result of a k-hop neighbourhood query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub center_id: String,
    pub k: u8,
    #[serde(default)]
    pub nodes: Vec<EntitySnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

/// Whether an autopilot target is a single entity or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Entity,
    Cluster,
}

/// An externally ranked place the autopilot should visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,

    /// Target key (entity id or cluster id)
    #[serde(default)]
    pub id: String,

    /// Members; exactly one for entity targets
    pub entity_ids: Vec<String>,

    pub risk_score: f32,

    /// Human-readable annotation
    pub label: String,

    /// Why this target is interesting
    pub reason: String,
}

impl AutopilotTarget {
    /// Creates a single-entity target.
    pub fn entity(id: impl Into<String>, risk_score: f32, label: impl Into<String>, reason: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind: TargetKind::Entity,
            entity_ids: vec![id.clone()],
            id,
            risk_score,
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Creates a cluster target.
    pub fn cluster(
        id: impl Into<String>,
        entity_ids: Vec<String>,
        risk_score: f32,
        label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: TargetKind::Cluster,
            id: id.into(),
            entity_ids,
            risk_score,
            label: label.into(),
            reason: reason.into(),
        }
    }
}

/// Ranked target list for one bucket, highest risk first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetList {
    pub targets: Vec<AutopilotTarget>,
}

/// "What if this entity behaved normally?" explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualResult {
    pub entity_id: String,
    pub bucket: u32,
    pub original_risk: f32,
    pub counterfactual_risk: f32,

    /// Edges excluded from the recomputation
    pub removed_edges: Vec<EdgeSnapshot>,
}

impl CounterfactualResult {
    /// Risk change caused by removing the suspicious edges.
    pub fn delta(&self) -> f32 {
        self.counterfactual_risk - self.original_risk
    }
}

/// Category of a decorative asset marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Blob floating over a group of entities
    #[serde(rename = "cluster_blob")]
    ClusterMarker,

    /// Pin marking a single entity
    #[serde(rename = "beacon")]
    Beacon,
}

/// Decoded external visual resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMesh {
    pub resource_ref: String,
    pub vertex_count: u32,
    pub byte_len: usize,
}

/// Asset lifecycle broadcasts from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum AssetEvent {
    /// A generated resource is available at `url`
    #[serde(rename = "ASSET_READY")]
    Ready {
        asset_id: String,
        asset_type: AssetKind,
        bucket: u32,
        url: String,
        #[serde(default)]
        entity_ids: Vec<String>,
    },

    /// Generation failed; the client should render procedurally
    #[serde(rename = "ASSET_FALLBACK")]
    Fallback {
        asset_id: String,
        asset_type: AssetKind,
        bucket: u32,
        #[serde(default)]
        entity_ids: Vec<String>,
        #[serde(default)]
        entity_id: Option<String>,
        #[serde(default)]
        risk_score: f32,
    },
}

/// Prefix the backend puts in front of the entity id of a beacon asset.
const BEACON_PREFIX: &str = "beacon_";

impl AssetEvent {
    /// Returns the member entities the marker should float over.
    ///
    /// Ready events carry no member list for beacons; the entity is then
    /// recovered from the `beacon_<entity_id>` asset id.
    pub fn members(&self) -> Vec<String> {
        match self {
            AssetEvent::Ready {
                entity_ids,
                asset_id,
                asset_type,
                ..
            } => {
                if entity_ids.is_empty() {
                    beacon_member(*asset_type, asset_id).into_iter().collect()
                } else {
                    entity_ids.clone()
                }
            }
            AssetEvent::Fallback {
                entity_ids,
                entity_id,
                asset_id,
                asset_type,
                ..
            } => {
                if !entity_ids.is_empty() {
                    entity_ids.clone()
                } else if let Some(id) = entity_id {
                    vec![id.clone()]
                } else {
                    beacon_member(*asset_type, asset_id).into_iter().collect()
                }
            }
        }
    }
}

fn beacon_member(kind: AssetKind, asset_id: &str) -> Option<String> {
    match kind {
        AssetKind::Beacon => asset_id
            .strip_prefix(BEACON_PREFIX)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        AssetKind::ClusterMarker => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_node_defaults() {
        let json = r#"{"id":"acct_1","jurisdiction_bucket":3,"kyc_level":"enhanced","risk_score":0.42}"#;
        let node: EntitySnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(node.kyc_level, KycLevel::Enhanced);
        assert_eq!(node.entity_type, "account");
        assert_eq!(node.volume, 0.0);
    }

    #[test]
    fn test_target_type_field() {
        let json = r#"{"type":"cluster","id":"cluster_0","entity_ids":["a","b"],
            "risk_score":0.8,"label":"Cluster (2 entities)","reason":"Connected component"}"#;
        let target: AutopilotTarget = serde_json::from_str(json).unwrap();

        assert_eq!(target.kind, TargetKind::Cluster);
        assert_eq!(target.entity_ids.len(), 2);
    }

    #[test]
    fn test_asset_fallback_event() {
        let json = r#"{"event":"ASSET_FALLBACK","data":{"asset_id":"beacon_a1",
            "asset_type":"beacon","bucket":4,"entity_id":"a1","risk_score":0.9}}"#;
        let event: AssetEvent = serde_json::from_str(json).unwrap();

        match &event {
            AssetEvent::Fallback { asset_type, bucket, .. } => {
                assert_eq!(*asset_type, AssetKind::Beacon);
                assert_eq!(*bucket, 4);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(event.members(), vec!["a1".to_string()]);
    }

    #[test]
    fn test_ready_beacon_member_from_asset_id() {
        // ASSET_READY as broadcast: metadata only, no member list
        let json = r#"{"event":"ASSET_READY","data":{"asset_id":"beacon_E00042",
            "asset_type":"beacon","bucket":2,"url":"/assets/beacon_9f1c.glb"}}"#;
        let event: AssetEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.members(), vec!["E00042".to_string()]);
    }

    #[test]
    fn test_ready_member_list_wins() {
        let event = AssetEvent::Ready {
            asset_id: "beacon_x".to_string(),
            asset_type: AssetKind::Beacon,
            bucket: 0,
            url: "/assets/b.glb".to_string(),
            entity_ids: vec!["y".to_string()],
        };
        assert_eq!(event.members(), vec!["y".to_string()]);
    }

    #[test]
    fn test_ready_cluster_without_members_is_empty() {
        let json = r#"{"event":"ASSET_READY","data":{"asset_id":"cluster_3",
            "asset_type":"cluster_blob","bucket":1,"url":"/assets/cluster_3.glb"}}"#;
        let event: AssetEvent = serde_json::from_str(json).unwrap();
        assert!(event.members().is_empty());

        let bare = AssetEvent::Ready {
            asset_id: "beacon_".to_string(),
            asset_type: AssetKind::Beacon,
            bucket: 0,
            url: String::new(),
            entity_ids: Vec::new(),
        };
        assert!(bare.members().is_empty());
    }
}
