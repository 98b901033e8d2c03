//! Decorative asset markers floating over groups of entities.
//!
//! A placement is created immediately with a procedural visual. When it
//! names an external resource, the overlay hands back an [`AssetTicket`]
//! whose completer the caller moves into a background load; the result is
//! applied at the start of a later frame by [`AssetOverlay::poll_loads`].
//! A failed load leaves the procedural visual in place, so both paths
//! share one lifecycle.

use crate::layout::unit_hash;
use crate::lookup::{centroid, PositionLookup};
use crate::palette::Rgb;
use crate::pending::{Completer, PendingPoll, PendingSlot};
use nalgebra::{Point3, Vector3};
use riskscape_env::{AssetKind, AssetMesh, EnvError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f32::consts::TAU;

pub type LoadResult = Result<AssetMesh, EnvError>;

/// Marker placement and styling constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Height above the member centroid (default: 6.0)
    pub vertical_offset: f32,
    pub cluster_scale: f32,
    pub beacon_scale: f32,
    pub cluster_color: Rgb,
    pub beacon_color: Rgb,
    pub cluster_opacity: f32,
    pub beacon_opacity: f32,
    /// Relative size pulsation (default: 0.08)
    pub pulse_amplitude: f32,
    pub pulse_speed: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            vertical_offset: 6.0,
            cluster_scale: 3.0,
            beacon_scale: 1.6,
            cluster_color: Rgb::new(0.95, 0.35, 0.55),
            beacon_color: Rgb::new(1.0, 0.82, 0.25),
            cluster_opacity: 0.35,
            beacon_opacity: 0.9,
            pulse_amplitude: 0.08,
            pulse_speed: 1.2,
        }
    }
}

/// Built-in shape used when no external resource is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceduralShape {
    /// Translucent sphere-like blob
    Blob,
    /// Pin with a glowing head
    Pin,
}

impl ProceduralShape {
    pub fn for_kind(kind: AssetKind) -> Self {
        match kind {
            AssetKind::ClusterMarker => ProceduralShape::Blob,
            AssetKind::Beacon => ProceduralShape::Pin,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetVisual {
    Procedural(ProceduralShape),
    Loaded(AssetMesh),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssetMaterial {
    pub color: Rgb,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPlacement {
    pub asset_id: String,
    pub kind: AssetKind,
    pub entity_ids: Vec<String>,
    pub bucket: u32,
    pub resource_ref: Option<String>,
    pub position: Point3<f32>,
    pub visual: AssetVisual,
    pub material: AssetMaterial,
    pub base_scale: f32,
    phase: f32,
}

/// Background load request for a placement.
#[derive(Debug)]
pub struct AssetTicket {
    pub asset_id: String,
    pub resource_ref: String,
    pub completer: Completer<LoadResult>,
}

/// Per-frame draw data for one placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetInstance {
    pub asset_id: String,
    pub kind: AssetKind,
    pub bucket: u32,
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    pub opacity: f32,
    /// Set when an external resource is drawn
    pub resource_ref: Option<String>,
    /// Set when the procedural stand-in is drawn
    pub procedural: Option<ProceduralShape>,
}

/// Results applied by one `poll_loads` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub loaded: usize,
    pub fell_back: usize,
}

#[derive(Debug, Default)]
pub struct AssetOverlay {
    config: AssetConfig,
    placements: BTreeMap<String, AssetPlacement>,
    pending: HashMap<String, PendingSlot<LoadResult>>,
    elapsed: f32,
}

impl AssetOverlay {
    pub fn new(config: AssetConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Places a marker over `entity_ids`, replacing any placement with the
    /// same id. Members that cannot be positioned are left out of the
    /// centroid; with none resolvable the marker sits over the origin.
    pub fn place<P, S>(
        &mut self,
        asset_id: &str,
        resource_ref: Option<&str>,
        kind: AssetKind,
        entity_ids: &[S],
        bucket: u32,
        positions: &P,
    ) -> Option<AssetTicket>
    where
        P: PositionLookup + ?Sized,
        S: AsRef<str>,
    {
        self.remove(asset_id);

        let anchor = centroid(positions, entity_ids)
            .map(|(c, _)| c)
            .unwrap_or_else(Point3::origin);
        let resource_ref = resource_ref.filter(|r| !r.is_empty()).map(str::to_string);
        let (material, base_scale) = match kind {
            AssetKind::ClusterMarker => (
                AssetMaterial {
                    color: self.config.cluster_color,
                    opacity: self.config.cluster_opacity,
                },
                self.config.cluster_scale,
            ),
            AssetKind::Beacon => (
                AssetMaterial {
                    color: self.config.beacon_color,
                    opacity: self.config.beacon_opacity,
                },
                self.config.beacon_scale,
            ),
        };

        self.placements.insert(
            asset_id.to_string(),
            AssetPlacement {
                asset_id: asset_id.to_string(),
                kind,
                entity_ids: entity_ids.iter().map(|s| s.as_ref().to_string()).collect(),
                bucket,
                resource_ref: resource_ref.clone(),
                position: anchor + Vector3::y() * self.config.vertical_offset,
                visual: AssetVisual::Procedural(ProceduralShape::for_kind(kind)),
                material,
                base_scale,
                phase: unit_hash(&format!("{}_phase", asset_id)) * TAU,
            },
        );
        tracing::debug!(asset_id, ?kind, bucket, resource = ?resource_ref, "asset placed");

        let resource_ref = resource_ref?;
        let mut slot = PendingSlot::new();
        let completer = slot.begin();
        self.pending.insert(asset_id.to_string(), slot);
        Some(AssetTicket {
            asset_id: asset_id.to_string(),
            resource_ref,
            completer,
        })
    }

    /// Applies finished loads. Failures keep the procedural visual.
    pub fn poll_loads(&mut self) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        let mut finished = Vec::new();

        for (asset_id, slot) in &mut self.pending {
            match slot.poll() {
                PendingPoll::Idle | PendingPoll::Waiting => continue,
                PendingPoll::Ready(Ok(mesh)) => {
                    if let Some(placement) = self.placements.get_mut(asset_id) {
                        tracing::debug!(asset_id = %asset_id, vertices = mesh.vertex_count, "asset loaded");
                        placement.visual = AssetVisual::Loaded(mesh);
                        outcome.loaded += 1;
                    }
                }
                PendingPoll::Ready(Err(e)) => {
                    tracing::warn!(asset_id = %asset_id, error = %e, "asset load failed, keeping procedural fallback");
                    outcome.fell_back += 1;
                }
                PendingPoll::Abandoned => {
                    tracing::warn!(asset_id = %asset_id, "asset load abandoned, keeping procedural fallback");
                    outcome.fell_back += 1;
                }
            }
            finished.push(asset_id.clone());
        }

        for asset_id in finished {
            self.pending.remove(&asset_id);
        }
        outcome
    }

    /// Removes one placement and drops its outstanding load.
    pub fn remove(&mut self, asset_id: &str) -> bool {
        self.pending.remove(asset_id);
        self.placements.remove(asset_id).is_some()
    }

    /// Removes every placement tagged with `bucket`.
    pub fn clear_bucket(&mut self, bucket: u32) -> usize {
        let doomed: Vec<String> = self
            .placements
            .values()
            .filter(|p| p.bucket == bucket)
            .map(|p| p.asset_id.clone())
            .collect();
        for asset_id in &doomed {
            self.remove(asset_id);
        }
        if !doomed.is_empty() {
            tracing::debug!(bucket, removed = doomed.len(), "bucket assets cleared");
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.placements.clear();
        self.pending.clear();
    }

    /// Re-anchors markers on their members' current positions. A marker
    /// whose members all vanished keeps its last position.
    pub fn follow<P>(&mut self, positions: &P)
    where
        P: PositionLookup + ?Sized,
    {
        let offset = Vector3::y() * self.config.vertical_offset;
        for placement in self.placements.values_mut() {
            if let Some((c, _)) = centroid(positions, &placement.entity_ids) {
                placement.position = c + offset;
            }
        }
    }

    pub fn animate(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetPlacement> {
        self.placements.get(asset_id)
    }

    pub fn placements(&self) -> impl Iterator<Item = &AssetPlacement> {
        self.placements.values()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Draw data in asset-id order, with the ambient size pulse applied.
    pub fn instances(&self) -> Vec<AssetInstance> {
        self.placements
            .values()
            .map(|p| {
                let pulse = 1.0
                    + self.config.pulse_amplitude
                        * (self.elapsed * self.config.pulse_speed + p.phase).sin();
                let (resource_ref, procedural) = match &p.visual {
                    AssetVisual::Loaded(mesh) => (Some(mesh.resource_ref.clone()), None),
                    AssetVisual::Procedural(shape) => (None, Some(*shape)),
                };
                AssetInstance {
                    asset_id: p.asset_id.clone(),
                    kind: p.kind,
                    bucket: p.bucket,
                    position: [p.position.x, p.position.y, p.position.z],
                    scale: p.base_scale * pulse,
                    color: p.material.color.to_array(),
                    opacity: p.material.opacity,
                    resource_ref,
                    procedural,
                }
            })
            .collect()
    }
}
