//! The node visual layer: one animated visual state per live entity.
//!
//! Pipeline per snapshot:
//! 1. Validate the incoming entity list (reject without touching state)
//! 2. Layout + target attribute computation
//! 3. Carry over in-flight current values for persisting ids
//! 4. Rebuild the shape batches from scratch

use crate::error::VizError;
use crate::layout::{unit_hash, LayoutConfig, LayoutEngine};
use crate::lookup::{PositionLookup, RiskLookup};
use crate::palette::{jurisdiction_color, RiskGradient, Rgb};
use crate::shapes::{DrawSlot, ShapeBatch, ShapeKind};
use crate::visual::{clamp_unit, sanitize_volume, step_factor, EntityVisualState, VisualTargets};
use nalgebra::Point3;
use riskscape_env::EntitySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Styling and animation constants for entity glyphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Seconds for a full transition (default: 0.8)
    pub transition_duration: f32,

    /// Multiplier on the per-frame step, tuned for smoothness (default: 3.0)
    pub catch_up: f32,

    pub min_scale: f32,
    pub max_scale: f32,

    /// Volume at which the scale saturates (default: 1e6)
    pub volume_saturation: f64,

    /// Minimum weight of the risk gradient in the blended color (default: 0.15)
    pub risk_blend_floor: f32,

    /// Entities below this risk are dimmed (default: 0.2)
    pub dim_threshold: f32,

    /// Width of the brightness ramp above the threshold (default: 0.1)
    pub dim_band: f32,

    /// Color multiplier for dimmed entities (default: 0.35)
    pub dim_factor: f32,

    /// Glow starts above this risk (default: 0.6)
    pub glow_low: f32,

    /// Glow saturates at this risk (default: 0.85)
    pub glow_full: f32,

    /// Halo size relative to the glyph (default: 2.2)
    pub halo_scale: f32,

    /// Halo opacity at full glow (default: 0.55)
    pub halo_opacity: f32,

    /// Relative pulse amplitude for halos (default: 0.15)
    pub pulse_amplitude: f32,

    /// Pulse angular speed in rad/s (default: 1.6)
    pub pulse_speed: f32,

    /// Color of the selected entity
    pub highlight: Rgb,

    pub gradient: RiskGradient,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            transition_duration: 0.8,
            catch_up: 3.0,
            min_scale: 0.6,
            max_scale: 2.4,
            volume_saturation: 1_000_000.0,
            risk_blend_floor: 0.15,
            dim_threshold: 0.2,
            dim_band: 0.1,
            dim_factor: 0.35,
            glow_low: 0.6,
            glow_full: 0.85,
            halo_scale: 2.2,
            halo_opacity: 0.55,
            pulse_amplitude: 0.15,
            pulse_speed: 1.6,
            highlight: Rgb::new(0.35, 0.95, 1.0),
            gradient: RiskGradient::default(),
        }
    }
}

impl NodeConfig {
    /// Logarithmic, saturating volume-to-scale mapping.
    pub fn scale_for_volume(&self, volume: f64) -> f32 {
        let v = sanitize_volume(volume);
        let saturation = self.volume_saturation.max(1.0);
        let t = ((1.0 + v).ln() / (1.0 + saturation).ln()).clamp(0.0, 1.0) as f32;
        self.min_scale + (self.max_scale - self.min_scale) * t
    }

    /// Color multiplier: dimmed below the threshold, linear ramp across the band.
    pub fn brightness_for_risk(&self, risk: f32) -> f32 {
        let r = clamp_unit(risk);
        if r < self.dim_threshold {
            self.dim_factor
        } else if self.dim_band > 0.0 && r < self.dim_threshold + self.dim_band {
            let t = (r - self.dim_threshold) / self.dim_band;
            self.dim_factor + (1.0 - self.dim_factor) * t
        } else {
            1.0
        }
    }

    /// Emissive intensity: 0 below `glow_low`, 1 above `glow_full`.
    pub fn glow_for_risk(&self, risk: f32) -> f32 {
        let r = clamp_unit(risk);
        if r <= self.glow_low {
            0.0
        } else if r >= self.glow_full {
            1.0
        } else {
            (r - self.glow_low) / (self.glow_full - self.glow_low)
        }
    }

    /// Unselected color: jurisdiction hue pulled toward the risk gradient.
    pub fn base_color(&self, entity: &EntitySnapshot) -> Rgb {
        let risk = clamp_unit(entity.risk_score);
        let weight = self.risk_blend_floor + (1.0 - self.risk_blend_floor) * risk;
        jurisdiction_color(entity.jurisdiction_bucket)
            .lerp(self.gradient.sample(risk), weight)
            .scaled(self.brightness_for_risk(risk))
    }
}

// ============================================================================
// DRAW OUTPUT
// ============================================================================

/// One glyph instance, in batch slot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInstance {
    pub id: String,
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    pub emissive: f32,
}

/// Camera-facing halo drawn behind glowing entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlowBillboard {
    pub id: String,
    pub position: [f32; 3],
    pub scale: f32,
    pub opacity: f32,
    pub color: [f32; 3],
}

/// Bookkeeping summary of one `update` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub entities: usize,
    pub persisted: usize,
    pub spawned: usize,
    pub dropped: usize,
}

/// Per-entity data that is not animated.
#[derive(Debug, Clone)]
struct EntityMeta {
    shape: ShapeKind,
    risk: f32,
    base_color: Rgb,
    pulse_phase: f32,
}

// ============================================================================
// NODE VISUAL LAYER
// ============================================================================

/// Owns every live entity's visual state and its shape batch slot.
pub struct NodeVisualLayer {
    config: NodeConfig,
    layout: LayoutEngine,
    ids: Vec<String>,
    index_by_id: HashMap<String, usize>,
    meta: Vec<EntityMeta>,
    states: Vec<EntityVisualState>,
    batches: [ShapeBatch; 3],
    selected: Option<String>,
    elapsed: f32,
}

impl NodeVisualLayer {
    pub fn new(config: NodeConfig, layout: LayoutConfig) -> Self {
        Self {
            config,
            layout: LayoutEngine::new(layout),
            ids: Vec::new(),
            index_by_id: HashMap::new(),
            meta: Vec::new(),
            states: Vec::new(),
            batches: ShapeKind::ALL.map(|_| ShapeBatch::new()),
            selected: None,
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Replaces the live entity set.
    ///
    /// Persisting ids keep their in-flight current values; new ids appear
    /// settled at their targets; absent ids are dropped. On a malformed
    /// list the previous state is left untouched.
    pub fn update(&mut self, entities: &[EntitySnapshot]) -> Result<UpdateStats, VizError> {
        validate_entities(entities)?;

        let positions = self.layout.compute(entities);
        let mut ids = Vec::with_capacity(entities.len());
        let mut index_by_id = HashMap::with_capacity(entities.len());
        let mut meta = Vec::with_capacity(entities.len());
        let mut states = Vec::with_capacity(entities.len());
        let mut stats = UpdateStats {
            entities: entities.len(),
            ..Default::default()
        };

        for (index, (entity, position)) in entities.iter().zip(positions).enumerate() {
            let base_color = self.config.base_color(entity);
            let targets = VisualTargets {
                position,
                scale: self.config.scale_for_volume(entity.volume),
                color: base_color,
                glow: self.config.glow_for_risk(entity.risk_score),
            };

            let state = match self.index_by_id.get(&entity.id) {
                Some(&previous) => {
                    stats.persisted += 1;
                    let mut state = self.states[previous];
                    state.retarget(targets);
                    state
                }
                None => {
                    stats.spawned += 1;
                    EntityVisualState::spawn(targets)
                }
            };

            meta.push(EntityMeta {
                shape: ShapeKind::classify(&entity.entity_type),
                risk: clamp_unit(entity.risk_score),
                base_color,
                pulse_phase: unit_hash(&format!("{}_pulse", entity.id)) * TAU,
            });
            states.push(state);
            index_by_id.insert(entity.id.clone(), index);
            ids.push(entity.id.clone());
        }
        stats.dropped = self.ids.len() - stats.persisted;

        self.ids = ids;
        self.index_by_id = index_by_id;
        self.meta = meta;
        self.states = states;

        for batch in &mut self.batches {
            batch.reset();
        }
        for (index, m) in self.meta.iter().enumerate() {
            self.batches[m.shape.index()].assign(index);
        }

        // Selection survives only if its id persisted
        if let Some(id) = self.selected.take() {
            if let Some(&index) = self.index_by_id.get(&id) {
                self.states[index].color.set_target(self.config.highlight);
                self.selected = Some(id);
            }
        }

        tracing::debug!(
            entities = stats.entities,
            persisted = stats.persisted,
            spawned = stats.spawned,
            dropped = stats.dropped,
            spheres = self.batches[0].len(),
            cubes = self.batches[1].len(),
            diamonds = self.batches[2].len(),
            "node layer updated"
        );
        Ok(stats)
    }

    /// Advances every visual toward its target and the ambient pulse clock.
    pub fn animate(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
        let alpha = step_factor(dt, self.config.transition_duration, self.config.catch_up);
        for state in &mut self.states {
            state.advance(alpha);
        }
    }

    /// Selects one entity (or none). Unknown ids are ignored.
    ///
    /// Returns whether the selection changed.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        let next = match id {
            Some(id) => match self.index_by_id.get(id) {
                Some(&index) => Some(index),
                None => return false,
            },
            None => None,
        };
        let previous = self
            .selected
            .as_deref()
            .and_then(|id| self.index_by_id.get(id).copied());
        if previous == next {
            return false;
        }

        if let Some(index) = previous {
            let base = self.meta[index].base_color;
            self.states[index].color.set_target(base);
        }
        if let Some(index) = next {
            self.states[index].color.set_target(self.config.highlight);
        }
        self.selected = next.map(|index| self.ids[index].clone());
        true
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Current (animated) position of an entity.
    pub fn position(&self, id: &str) -> Option<Point3<f32>> {
        self.index_by_id
            .get(id)
            .map(|&index| self.states[index].position.current())
    }

    /// Resolves a drawn instance back to its entity (pointer picking).
    pub fn entity_id(&self, slot: DrawSlot) -> Option<&str> {
        self.batches[slot.shape.index()]
            .global_at(slot.slot)
            .map(|index| self.ids[index].as_str())
    }

    pub fn draw_slot(&self, id: &str) -> Option<DrawSlot> {
        let index = *self.index_by_id.get(id)?;
        let shape = self.meta[index].shape;
        self.batches[shape.index()]
            .slot_of(index)
            .map(|slot| DrawSlot { shape, slot })
    }

    pub fn state(&self, id: &str) -> Option<&EntityVisualState> {
        self.index_by_id.get(id).map(|&index| &self.states[index])
    }

    pub fn batch(&self, shape: ShapeKind) -> &ShapeBatch {
        &self.batches[shape.index()]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// True when no entity has a transition in flight.
    pub fn is_settled(&self) -> bool {
        self.states.iter().all(EntityVisualState::is_settled)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Instance data for one batch, in slot order.
    pub fn instances(&self, shape: ShapeKind) -> Vec<NodeInstance> {
        self.batches[shape.index()]
            .members()
            .iter()
            .map(|&index| {
                let state = &self.states[index];
                let p = state.position.current();
                NodeInstance {
                    id: self.ids[index].clone(),
                    position: [p.x, p.y, p.z],
                    scale: state.scale.current(),
                    color: state.color.current().to_array(),
                    emissive: state.glow.current(),
                }
            })
            .collect()
    }

    /// Halos for every entity with a positive glow, pulsing out of phase.
    pub fn glow_billboards(&self) -> Vec<GlowBillboard> {
        let cfg = &self.config;
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.glow.current() > 0.0)
            .map(|(index, state)| {
                let glow = state.glow.current();
                let wave = (self.elapsed * cfg.pulse_speed + self.meta[index].pulse_phase).sin();
                let pulse = 1.0 + cfg.pulse_amplitude * wave;
                let p = state.position.current();
                GlowBillboard {
                    id: self.ids[index].clone(),
                    position: [p.x, p.y, p.z],
                    scale: state.scale.current() * cfg.halo_scale * pulse,
                    opacity: (cfg.halo_opacity * glow * pulse).clamp(0.0, 1.0),
                    color: state.color.current().to_array(),
                }
            })
            .collect()
    }
}

impl PositionLookup for NodeVisualLayer {
    fn position_of(&self, id: &str) -> Option<Point3<f32>> {
        self.position(id)
    }
}

impl RiskLookup for NodeVisualLayer {
    fn risk_of(&self, id: &str) -> Option<f32> {
        self.index_by_id.get(id).map(|&index| self.meta[index].risk)
    }
}

/// Rejects lists that cannot be applied atomically.
fn validate_entities(entities: &[EntitySnapshot]) -> Result<(), VizError> {
    let mut seen = HashSet::with_capacity(entities.len());
    for (position, entity) in entities.iter().enumerate() {
        if entity.id.is_empty() {
            return Err(VizError::malformed(format!("entity #{} has an empty id", position)));
        }
        if !seen.insert(entity.id.as_str()) {
            return Err(VizError::malformed(format!("duplicate entity id '{}'", entity.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use riskscape_env::KycLevel;

    fn layer() -> NodeVisualLayer {
        NodeVisualLayer::new(NodeConfig::default(), LayoutConfig::default())
    }

    fn entity(id: &str, lane: u8, risk: f32) -> EntitySnapshot {
        EntitySnapshot::new(id, lane, KycLevel::Standard, risk).with_volume(5_000.0)
    }

    #[test]
    fn test_new_entities_snap_to_target() {
        let mut nodes = layer();
        let stats = nodes.update(&[entity("a", 0, 0.3), entity("b", 1, 0.7)]).unwrap();

        assert_eq!(stats.spawned, 2);
        assert!(nodes.is_settled());
        assert!(nodes.position("a").is_some());
    }

    #[test]
    fn test_persisting_entity_does_not_jump() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.2)]).unwrap();
        let before = nodes.state("a").unwrap().position.current();

        let stats = nodes.update(&[entity("a", 0, 0.9)]).unwrap();
        let state = nodes.state("a").unwrap();

        assert_eq!(stats.persisted, 1);
        assert_eq!(state.position.current(), before);
        assert!(state.position.target().y > before.y);
    }

    #[test]
    fn test_in_flight_value_is_the_new_start() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.1)]).unwrap();
        nodes.update(&[entity("a", 0, 0.9)]).unwrap();
        nodes.animate(0.016);
        let mid = nodes.state("a").unwrap().position.current();

        nodes.update(&[entity("a", 0, 0.5)]).unwrap();
        assert_eq!(nodes.state("a").unwrap().position.current(), mid);
    }

    #[test]
    fn test_absent_entities_are_dropped() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.1), entity("b", 1, 0.2)]).unwrap();
        let stats = nodes.update(&[entity("b", 1, 0.2)]).unwrap();

        assert_eq!(stats.dropped, 1);
        assert!(nodes.position("a").is_none());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_batches_reassigned_per_update() {
        let mut nodes = layer();
        let bank = entity("bank_1", 2, 0.1).with_type("bank");
        let shop = entity("shop_1", 3, 0.1).with_type("merchant");
        nodes
            .update(&[entity("a", 0, 0.1), bank.clone(), shop, entity("b", 1, 0.1)])
            .unwrap();

        assert_eq!(nodes.batch(ShapeKind::Sphere).len(), 2);
        assert_eq!(nodes.batch(ShapeKind::Cube).len(), 1);
        assert_eq!(nodes.batch(ShapeKind::Diamond).len(), 1);

        let slot = nodes.draw_slot("b").unwrap();
        assert_eq!(slot, DrawSlot { shape: ShapeKind::Sphere, slot: 1 });
        assert_eq!(nodes.entity_id(slot), Some("b"));

        nodes.update(&[bank]).unwrap();
        assert_eq!(nodes.batch(ShapeKind::Sphere).len(), 0);
        assert_eq!(nodes.draw_slot("bank_1"), Some(DrawSlot { shape: ShapeKind::Cube, slot: 0 }));
        assert_eq!(nodes.entity_id(DrawSlot { shape: ShapeKind::Sphere, slot: 1 }), None);
    }

    #[test]
    fn test_malformed_update_leaves_state_intact() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.4)]).unwrap();

        let err = nodes.update(&[entity("x", 0, 0.1), entity("x", 1, 0.2)]).unwrap_err();
        assert!(matches!(err, VizError::MalformedSnapshot { .. }));
        assert_eq!(nodes.len(), 1);
        assert!(nodes.position("a").is_some());

        let err = nodes.update(&[entity("", 0, 0.1)]).unwrap_err();
        assert!(matches!(err, VizError::MalformedSnapshot { .. }));
    }

    #[test]
    fn test_large_step_converges() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.1), entity("b", 4, 0.3)]).unwrap();
        nodes.update(&[entity("a", 2, 0.95), entity("b", 6, 0.05)]).unwrap();
        assert!(!nodes.is_settled());

        nodes.animate(1.0);
        assert!(nodes.is_settled());
    }

    #[test]
    fn test_frame_rate_steps_settle() {
        let mut nodes = layer();
        let first: Vec<_> = (0..50)
            .map(|i| entity(&format!("E{:05}", i), (i % 8) as u8, (i as f32) / 50.0))
            .collect();
        let second: Vec<_> = (0..50)
            .map(|i| {
                entity(&format!("E{:05}", i), ((i + 3) % 8) as u8, 1.0 - (i as f32) / 50.0)
                    .with_volume(250_000.0)
            })
            .collect();
        nodes.update(&first).unwrap();
        nodes.update(&second).unwrap();
        assert!(!nodes.is_settled());

        let mut frames = 0;
        while !nodes.is_settled() && frames < 600 {
            nodes.animate(1.0 / 60.0);
            frames += 1;
        }
        assert!(nodes.is_settled(), "not settled after {} frames", frames);
        for id in ["E00000", "E00017", "E00049"] {
            let state = nodes.state(id).unwrap();
            assert_eq!(state.position.current(), state.position.target());
        }
    }

    #[test]
    fn test_select_and_restore() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.4), entity("b", 1, 0.4)]).unwrap();
        let base = nodes.state("a").unwrap().color.target();

        assert!(nodes.select(Some("a")));
        assert_eq!(nodes.state("a").unwrap().color.target(), nodes.config().highlight);

        assert!(nodes.select(Some("b")));
        assert_eq!(nodes.state("a").unwrap().color.target(), base);
        assert_eq!(nodes.selected(), Some("b"));

        assert!(nodes.select(None));
        assert_eq!(nodes.selected(), None);
        assert!(!nodes.select(Some("ghost")));
    }

    #[test]
    fn test_selection_survives_update_when_id_persists() {
        let mut nodes = layer();
        nodes.update(&[entity("a", 0, 0.4)]).unwrap();
        nodes.select(Some("a"));

        nodes.update(&[entity("a", 0, 0.6)]).unwrap();
        assert_eq!(nodes.selected(), Some("a"));
        assert_eq!(nodes.state("a").unwrap().color.target(), nodes.config().highlight);

        nodes.update(&[entity("b", 0, 0.6)]).unwrap();
        assert_eq!(nodes.selected(), None);
    }

    #[test]
    fn test_glow_thresholds() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.glow_for_risk(0.5), 0.0);
        assert_eq!(cfg.glow_for_risk(0.6), 0.0);
        assert_relative_eq!(cfg.glow_for_risk(0.725), 0.5, epsilon = 1e-5);
        assert_eq!(cfg.glow_for_risk(0.85), 1.0);
        assert_eq!(cfg.glow_for_risk(3.0), 1.0);
    }

    #[test]
    fn test_brightness_ramp_has_no_step() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.brightness_for_risk(0.1), cfg.dim_factor);
        let at = cfg.brightness_for_risk(cfg.dim_threshold);
        assert_relative_eq!(at, cfg.dim_factor, epsilon = 1e-6);
        assert_relative_eq!(cfg.brightness_for_risk(0.25), (cfg.dim_factor + 1.0) / 2.0, epsilon = 1e-5);
        assert_eq!(cfg.brightness_for_risk(0.31), 1.0);
    }

    #[test]
    fn test_scale_saturates_and_clamps() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.scale_for_volume(-50.0), cfg.min_scale);
        assert_eq!(cfg.scale_for_volume(f64::NAN), cfg.min_scale);
        assert_eq!(cfg.scale_for_volume(1e12), cfg.max_scale);
        assert!(cfg.scale_for_volume(1_000.0) < cfg.scale_for_volume(100_000.0));
    }

    #[test]
    fn test_billboards_only_for_glowing_entities() {
        let mut nodes = layer();
        nodes
            .update(&[entity("calm", 0, 0.2), entity("hot1", 1, 0.95), entity("hot2", 2, 0.95)])
            .unwrap();
        nodes.animate(0.5);

        let halos = nodes.glow_billboards();
        assert_eq!(halos.len(), 2);
        assert!(halos.iter().all(|h| h.id != "calm"));
        // Per-entity phase offset: identical risk, different pulse
        assert_ne!(halos[0].scale, halos[1].scale);
    }

    proptest! {
        #[test]
        fn prop_convergence_after_full_step(
            risks in prop::collection::vec(0.0f32..=1.0, 1..20),
            shift in 0.0f32..=1.0,
        ) {
            let mut nodes = layer();
            let first: Vec<_> = risks.iter().enumerate()
                .map(|(i, r)| entity(&format!("e{}", i), (i % 8) as u8, *r))
                .collect();
            let second: Vec<_> = risks.iter().enumerate()
                .map(|(i, r)| entity(&format!("e{}", i), ((i + 3) % 8) as u8, (r + shift) % 1.0))
                .collect();
            nodes.update(&first).unwrap();
            nodes.update(&second).unwrap();
            nodes.animate(nodes.config().transition_duration);
            prop_assert!(nodes.is_settled());
        }
    }
}
