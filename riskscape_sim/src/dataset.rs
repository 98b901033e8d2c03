//! Seeded synthetic transaction graph serving as the data collaborator.
//!
//! Every bucket is generated up front from one ChaCha8 stream, so the same
//! seed always produces the same snapshots, target lists and
//! counterfactuals.
//!
//! - ~6% of entities are "suspicious": higher base risk, structuring
//!   transfers just under the reporting threshold, and rings among the
//!   suspicious entities that are active in a bucket
//! - everyone else transacts at log-normally distributed amounts

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use riskscape_env::{
    AutopilotTarget, CounterfactualResult, DataClient, EdgeSnapshot, EntitySnapshot, EnvError,
    KycLevel, Neighborhood, Snapshot, SnapshotMeta, TargetList,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Reporting threshold that structuring stays just below.
pub const STRUCTURING_THRESHOLD: f64 = 10_000.0;
pub const STRUCTURING_DELTA: f64 = 1_000.0;

/// Backend cap on targets per list.
pub const MAX_TARGETS: usize = 8;
/// Counterfactual results carry at most this many edges.
pub const MAX_REMOVED_EDGES: usize = 50;

const CLUSTER_THRESHOLD: f32 = 0.3;
const SPIKE_DELTA: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub seed: u64,
    pub entities: usize,
    pub buckets: u32,
    /// Background transactions per entity per bucket
    pub tx_per_entity: f32,
    pub suspicious_fraction: f32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            entities: 200,
            buckets: 12,
            tx_per_entity: 1.5,
            suspicious_fraction: 0.06,
        }
    }
}

#[derive(Debug, Clone)]
struct Profile {
    id: String,
    jurisdiction: u8,
    kyc: KycLevel,
    entity_type: &'static str,
    base_risk: f32,
    suspicious: bool,
}

const ENTITY_TYPES: [(&str, u32); 6] = [
    ("account", 62),
    ("business", 12),
    ("merchant", 10),
    ("bank", 6),
    ("exchange", 5),
    ("payment_processor", 5),
];

fn pick_type(rng: &mut ChaCha8Rng) -> &'static str {
    let total: u32 = ENTITY_TYPES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (name, weight) in ENTITY_TYPES {
        if roll < weight {
            return name;
        }
        roll -= weight;
    }
    "account"
}

/// Synthetic dataset with failure injection.
pub struct SyntheticDataset {
    config: DatasetConfig,
    buckets: Vec<Snapshot>,
    fail_snapshots: AtomicBool,
    fail_targets: AtomicBool,
    suppress_targets: AtomicBool,
    requests: AtomicU64,
}

impl SyntheticDataset {
    pub fn generate(config: DatasetConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let profiles = Self::profiles(&config, &mut rng);
        let buckets = (0..config.buckets)
            .map(|t| Self::bucket(&config, &profiles, t, &mut rng))
            .collect();

        tracing::debug!(
            seed = config.seed,
            entities = config.entities,
            buckets = config.buckets,
            suspicious = profiles.iter().filter(|p| p.suspicious).count(),
            "synthetic dataset generated"
        );
        Self {
            config,
            buckets,
            fail_snapshots: AtomicBool::new(false),
            fail_targets: AtomicBool::new(false),
            suppress_targets: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        }
    }

    fn profiles(config: &DatasetConfig, rng: &mut ChaCha8Rng) -> Vec<Profile> {
        let mut profiles: Vec<Profile> = (0..config.entities)
            .map(|i| {
                let suspicious = rng.gen::<f32>() < config.suspicious_fraction;
                Profile {
                    id: format!("E{:05}", i),
                    jurisdiction: rng.gen_range(0..8),
                    kyc: if rng.gen_bool(0.2) { KycLevel::Enhanced } else { KycLevel::Standard },
                    entity_type: pick_type(rng),
                    base_risk: if suspicious {
                        rng.gen_range(0.55..0.8)
                    } else {
                        rng.gen_range(0.02..0.3)
                    },
                    suspicious,
                }
            })
            .collect();

        // At least three, so rings and clusters exist
        let wanted = profiles.len().min(3);
        while profiles.iter().filter(|p| p.suspicious).count() < wanted {
            let index = rng.gen_range(0..profiles.len());
            let p = &mut profiles[index];
            if !p.suspicious {
                p.suspicious = true;
                p.base_risk = rng.gen_range(0.55..0.8);
            }
        }
        profiles
    }

    fn bucket(config: &DatasetConfig, profiles: &[Profile], t: u32, rng: &mut ChaCha8Rng) -> Snapshot {
        let n = profiles.len();
        let mut edges = Vec::new();

        if n >= 2 {
            let amounts = LogNormal::new(7.6, 1.1).ok();
            let tx_count = (n as f32 * config.tx_per_entity).round() as usize;
            for _ in 0..tx_count {
                let from = rng.gen_range(0..n);
                let mut to = rng.gen_range(0..n - 1);
                if to >= from {
                    to += 1;
                }
                let amount: f64 = amounts
                    .as_ref()
                    .map(|d| d.sample(rng))
                    .unwrap_or(1_000.0);
                edges.push(EdgeSnapshot::new(&profiles[from].id, &profiles[to].id, amount.round()));
            }
        }

        // Active suspicious entities form a ring of structured transfers
        let mut active: Vec<usize> = (0..n)
            .filter(|&i| profiles[i].suspicious && rng.gen_bool(0.75))
            .collect();
        active.shuffle(rng);
        if active.len() >= 2 {
            for (k, &from) in active.iter().enumerate() {
                let to = active[(k + 1) % active.len()];
                let amount = rng.gen_range(STRUCTURING_THRESHOLD - STRUCTURING_DELTA..STRUCTURING_THRESHOLD);
                let mut edge = EdgeSnapshot::new(&profiles[from].id, &profiles[to].id, amount.round());
                edge.reason = Some("structuring".to_string());
                edges.push(edge);
            }
        }

        let mut volume = vec![0.0f64; n];
        let index: HashMap<&str, usize> = profiles.iter().enumerate().map(|(i, p)| (p.id.as_str(), i)).collect();
        for edge in &edges {
            if let (Some(&a), Some(&b)) = (index.get(edge.from_id.as_str()), index.get(edge.to_id.as_str())) {
                volume[a] += edge.amount;
                volume[b] += edge.amount;
            }
        }

        let drift = Normal::new(0.0f32, 0.04).ok();
        let active_set: HashSet<usize> = active.iter().copied().collect();
        let nodes = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let noise = drift.as_ref().map(|d| d.sample(rng)).unwrap_or(0.0);
                let boost = if active_set.contains(&i) { 0.15 } else { 0.0 };
                let risk = (p.base_risk + noise + boost).clamp(0.0, 1.0);
                EntitySnapshot::new(&p.id, p.jurisdiction, p.kyc, (risk * 10_000.0).round() / 10_000.0)
                    .with_type(p.entity_type)
                    .with_volume(volume[i])
            })
            .collect::<Vec<_>>();

        Snapshot {
            meta: SnapshotMeta {
                t,
                n_buckets: config.buckets,
                n_entities: nodes.len(),
                n_transactions: edges.len(),
                bucket_size_seconds: 86_400,
            },
            nodes,
            edges,
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn bucket_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Borrow a generated bucket.
    pub fn snapshot_ref(&self, bucket: u32) -> Option<&Snapshot> {
        self.buckets.get(bucket as usize)
    }

    pub fn set_fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_targets(&self, fail: bool) {
        self.fail_targets.store(fail, Ordering::SeqCst);
    }

    /// Makes target queries return an empty list.
    pub fn set_suppress_targets(&self, suppress: bool) {
        self.suppress_targets.store(suppress, Ordering::SeqCst);
    }

    /// Requests served (including failed ones).
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn get(&self, bucket: u32) -> Result<&Snapshot, EnvError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.buckets
            .get(bucket as usize)
            .ok_or_else(|| EnvError::not_found(format!("bucket {}", bucket)))
    }

    /// Ranked investigation targets: top risky entities, high-risk
    /// clusters and risk spikes, deduplicated and capped.
    pub fn rank_targets(&self, bucket: u32) -> Result<Vec<AutopilotTarget>, EnvError> {
        let snapshot = self.get(bucket)?;
        let mut targets = Vec::new();

        let mut scored: Vec<&EntitySnapshot> = snapshot.nodes.iter().filter(|n| n.risk_score > 0.1).collect();
        scored.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score).then_with(|| a.id.cmp(&b.id)));
        for node in scored.iter().take(5) {
            let structured = snapshot
                .edges
                .iter()
                .filter(|e| (e.from_id == node.id || e.to_id == node.id) && is_structuring(e.amount))
                .count();
            let reason = if structured > 0 {
                format!(
                    "{} tx in ${:.0}-${:.0} range",
                    structured,
                    STRUCTURING_THRESHOLD - STRUCTURING_DELTA,
                    STRUCTURING_THRESHOLD
                )
            } else {
                "Elevated risk score".to_string()
            };
            targets.push(AutopilotTarget::entity(
                &node.id,
                node.risk_score,
                format!("High-risk {}: {}", node.entity_type, node.id),
                reason,
            ));
        }

        let mut clusters = detect_clusters(snapshot, CLUSTER_THRESHOLD);
        clusters.sort_by(|a, b| {
            let ka = a.1 * a.0.len() as f32;
            let kb = b.1 * b.0.len() as f32;
            kb.total_cmp(&ka)
        });
        for (index, (members, risk)) in clusters.into_iter().take(3).enumerate() {
            let size = members.len();
            targets.push(AutopilotTarget::cluster(
                format!("cluster_{}", index),
                members,
                risk,
                format!("Cluster ({} entities, risk {:.0}%)", size, risk * 100.0),
                format!("Connected component of {} high-risk entities", size),
            ));
        }

        if bucket > 0 {
            if let Some(previous) = self.buckets.get(bucket as usize - 1) {
                let before: HashMap<&str, f32> =
                    previous.nodes.iter().map(|n| (n.id.as_str(), n.risk_score)).collect();
                let mut spikes: Vec<(&EntitySnapshot, f32)> = snapshot
                    .nodes
                    .iter()
                    .map(|n| (n, n.risk_score - before.get(n.id.as_str()).copied().unwrap_or(0.0)))
                    .filter(|(_, delta)| *delta > SPIKE_DELTA)
                    .collect();
                spikes.sort_by(|a, b| b.1.total_cmp(&a.1));
                for (node, delta) in spikes.into_iter().take(2) {
                    targets.push(AutopilotTarget::entity(
                        &node.id,
                        node.risk_score,
                        format!("Risk spike: {}", node.id),
                        format!("Risk jumped +{:.0}% from previous time window", delta * 100.0),
                    ));
                }
            }
        }

        targets.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        let mut seen = HashSet::new();
        targets.retain(|t| seen.insert(t.id.clone()));
        targets.truncate(MAX_TARGETS);
        Ok(targets)
    }

    /// Undirected BFS up to `hops` from `entity_id`.
    pub fn neighborhood(&self, entity_id: &str, hops: u8, bucket: u32) -> Result<Neighborhood, EnvError> {
        let snapshot = self.get(bucket)?;
        if !snapshot.nodes.iter().any(|n| n.id == entity_id) {
            return Err(EnvError::not_found(format!("entity {} in bucket {}", entity_id, bucket)));
        }

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &snapshot.edges {
            adjacency.entry(edge.from_id.as_str()).or_default().push(edge.to_id.as_str());
            adjacency.entry(edge.to_id.as_str()).or_default().push(edge.from_id.as_str());
        }

        let mut reached: HashSet<&str> = HashSet::from([entity_id]);
        let mut queue = VecDeque::from([(entity_id, 0u8)]);
        while let Some((current, depth)) = queue.pop_front() {
            if depth >= hops {
                continue;
            }
            for &next in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if reached.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        Ok(Neighborhood {
            center_id: entity_id.to_string(),
            k: hops,
            nodes: snapshot
                .nodes
                .iter()
                .filter(|n| reached.contains(n.id.as_str()))
                .cloned()
                .collect(),
            edges: snapshot
                .edges
                .iter()
                .filter(|e| reached.contains(e.from_id.as_str()) && reached.contains(e.to_id.as_str()))
                .cloned()
                .collect(),
        })
    }

    /// Removes the entity's structuring edges and edges to other high-risk
    /// counterparties, then rescales its risk by the share of activity left.
    pub fn explain(&self, entity_id: &str, bucket: u32) -> Result<CounterfactualResult, EnvError> {
        let snapshot = self.get(bucket)?;
        let node = snapshot
            .nodes
            .iter()
            .find(|n| n.id == entity_id)
            .ok_or_else(|| EnvError::not_found(format!("entity {} in bucket {}", entity_id, bucket)))?;
        let risk_of: HashMap<&str, f32> = snapshot.nodes.iter().map(|n| (n.id.as_str(), n.risk_score)).collect();

        let own: Vec<&EdgeSnapshot> = snapshot
            .edges
            .iter()
            .filter(|e| e.from_id == entity_id || e.to_id == entity_id)
            .collect();
        let mut removed = Vec::new();
        for edge in &own {
            let other = if edge.from_id == entity_id { &edge.to_id } else { &edge.from_id };
            let reason = if is_structuring(edge.amount) {
                Some("structuring")
            } else if risk_of.get(other.as_str()).copied().unwrap_or(0.0) >= 0.5 {
                Some("circular_flow")
            } else {
                None
            };
            if let Some(reason) = reason {
                let mut edge = (*edge).clone();
                edge.reason = Some(reason.to_string());
                removed.push(edge);
            }
        }

        let share = if own.is_empty() {
            0.0
        } else {
            removed.len() as f32 / own.len() as f32
        };
        let counterfactual = (node.risk_score * (1.0 - 0.8 * share)).clamp(0.0, 1.0);
        removed.truncate(MAX_REMOVED_EDGES);

        Ok(CounterfactualResult {
            entity_id: entity_id.to_string(),
            bucket,
            original_risk: node.risk_score,
            counterfactual_risk: (counterfactual * 10_000.0).round() / 10_000.0,
            removed_edges: removed,
        })
    }
}

fn is_structuring(amount: f64) -> bool {
    (STRUCTURING_THRESHOLD - STRUCTURING_DELTA..STRUCTURING_THRESHOLD).contains(&amount)
}

/// Connected components (size >= 2) among entities at or above `threshold`.
fn detect_clusters(snapshot: &Snapshot, threshold: f32) -> Vec<(Vec<String>, f32)> {
    let risk: HashMap<&str, f32> = snapshot
        .nodes
        .iter()
        .filter(|n| n.risk_score >= threshold)
        .map(|n| (n.id.as_str(), n.risk_score))
        .collect();

    let mut adjacency: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for edge in &snapshot.edges {
        let (f, t) = (edge.from_id.as_str(), edge.to_id.as_str());
        if f != t && risk.contains_key(f) && risk.contains_key(t) {
            adjacency.entry(f).or_default().insert(t);
            adjacency.entry(t).or_default().insert(f);
        }
    }

    let mut roots: Vec<&str> = risk.keys().copied().collect();
    roots.sort_unstable();

    let mut visited = HashSet::new();
    let mut clusters = Vec::new();
    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        let mut component = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for &next in adjacency.get(current).into_iter().flatten() {
                if visited.insert(next) {
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        if component.len() >= 2 {
            component.sort_unstable();
            let mean = component.iter().map(|id| risk[id]).sum::<f32>() / component.len() as f32;
            clusters.push((
                component.into_iter().map(str::to_string).collect(),
                (mean * 10_000.0).round() / 10_000.0,
            ));
        }
    }
    clusters
}

#[async_trait]
impl DataClient for SyntheticDataset {
    async fn snapshot(&self, bucket: u32) -> Result<Snapshot, EnvError> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            self.requests.fetch_add(1, Ordering::SeqCst);
            return Err(EnvError::unreachable(format!("snapshot {}", bucket)));
        }
        self.get(bucket).cloned()
    }

    async fn neighbors(&self, entity_id: &str, hops: u8, bucket: u32) -> Result<Neighborhood, EnvError> {
        self.neighborhood(entity_id, hops, bucket)
    }

    async fn autopilot_targets(&self, bucket: u32) -> Result<TargetList, EnvError> {
        if self.fail_targets.load(Ordering::SeqCst) {
            self.requests.fetch_add(1, Ordering::SeqCst);
            return Err(EnvError::unreachable(format!("targets {}", bucket)));
        }
        if self.suppress_targets.load(Ordering::SeqCst) {
            self.get(bucket)?;
            return Ok(TargetList::default());
        }
        Ok(TargetList {
            targets: self.rank_targets(bucket)?,
        })
    }

    async fn counterfactual(&self, entity_id: &str, bucket: u32) -> Result<CounterfactualResult, EnvError> {
        self.explain(entity_id, bucket)
    }
}
