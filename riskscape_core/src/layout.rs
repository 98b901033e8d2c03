//! The "LAYOUT" Engine - deterministic attribute-to-space mapping
//!
//! Three independent axes make the scene legible at a glance:
//! - X: jurisdiction lane (recentred around the origin)
//! - Y: risk score ("higher" always means "riskier")
//! - Z: KYC depth band, plus jitter
//!
//! Jitter is derived from one-way hashes of the entity id, so the same
//! entity always lands on the same coordinates regardless of list order.

use crate::visual::clamp_unit;
use nalgebra::Point3;
use riskscape_env::{EntitySnapshot, KycLevel};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Configuration for the LayoutEngine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance between adjacent jurisdiction lanes (default: 14.0)
    pub lane_spacing: f32,

    /// Number of lanes; jurisdiction buckets wrap modulo this (default: 8)
    pub lane_count: u8,

    /// Height of a risk-1.0 entity (default: 40.0)
    pub height_scale: f32,

    /// Depth offset applied to enhanced-KYC entities (default: -18.0)
    pub kyc_depth_offset: f32,

    /// Maximum polar jitter radius inside a lane (default: 4.5)
    ///
    /// Must stay below half the lane spacing so lanes never interleave.
    pub jitter_radius: f32,

    /// Full width of the additive depth jitter (default: 3.0)
    pub depth_jitter: f32,

    /// Amplitude of the decorative lane wave (default: 1.2)
    pub wave_amplitude: f32,

    /// Lane-index frequency of the wave (default: 0.8)
    pub wave_frequency: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_spacing: 14.0,
            lane_count: 8,
            height_scale: 40.0,
            kyc_depth_offset: -18.0,
            jitter_radius: 4.5,
            depth_jitter: 3.0,
            wave_amplitude: 1.2,
            wave_frequency: 0.8,
        }
    }
}

/// One-way, order-dependent string hash (rotate/XOR accumulation).
///
/// The exact output feeds jitter placement; changing it moves every entity.
pub fn stable_hash(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0u32, |h, unit| h.rotate_left(5) ^ u32::from(unit))
}

/// Hash normalized to [0, 1).
///
/// Reduced modulo a decimal range: the low bits carry the id suffix, where
/// sequential ids differ.
pub fn unit_hash(s: &str) -> f32 {
    (stable_hash(s) % HASH_RANGE) as f32 / HASH_RANGE as f32
}

const HASH_RANGE: u32 = 10_000;

/// Stateless layout function.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Computes one position per entity, in input order.
    pub fn compute(&self, entities: &[EntitySnapshot]) -> Vec<Point3<f32>> {
        entities.iter().map(|e| self.position_for(e)).collect()
    }

    /// Position of a single entity.
    pub fn position_for(&self, entity: &EntitySnapshot) -> Point3<f32> {
        let cfg = &self.config;
        let lane_count = cfg.lane_count.max(1);
        let lane = (entity.jurisdiction_bucket % lane_count) as f32;
        let center = (lane_count - 1) as f32 / 2.0;

        // Area-uniform polar jitter: sqrt radius avoids center bias
        let radius = unit_hash(&entity.id).sqrt() * cfg.jitter_radius;
        let angle = unit_hash(&format!("{}_z", entity.id)) * TAU;
        let depth = (unit_hash(&format!("{}_d", entity.id)) - 0.5) * cfg.depth_jitter;

        let x = (lane - center) * cfg.lane_spacing + radius * angle.cos();
        let y = (clamp_unit(entity.risk_score) * cfg.height_scale).max(0.0);

        let kyc = match entity.kyc_level {
            KycLevel::Enhanced => cfg.kyc_depth_offset,
            KycLevel::Standard => 0.0,
        };
        let wave = cfg.wave_amplitude * (lane * cfg.wave_frequency + angle).sin();
        let z = kyc + radius * angle.sin() + depth + wave;

        Point3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entity(id: &str, lane: u8, kyc: KycLevel, risk: f32) -> EntitySnapshot {
        EntitySnapshot::new(id, lane, kyc, risk)
    }

    #[test]
    fn test_empty_input() {
        let engine = LayoutEngine::default();
        assert!(engine.compute(&[]).is_empty());
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(stable_hash("acct_0001"), stable_hash("acct_0001"));
        assert_ne!(stable_hash("acct_0001"), stable_hash("acct_0002"));
        // Order dependent
        assert_ne!(stable_hash("ab"), stable_hash("ba"));
    }

    #[test]
    fn test_hash_vectors() {
        // rotl5 ^ unit, no finalizer
        assert_eq!(stable_hash(""), 0);
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("ab"), (97 << 5) ^ 98);
        assert_eq!(stable_hash("ab"), 3138);
        assert_eq!(stable_hash("ba"), 3105);
        assert!((unit_hash("ab") - 0.3138).abs() < 1e-6);
    }

    #[test]
    fn test_hash_rotation_wraps() {
        // Seven units push the first one past bit 31 and back around
        let s = "abcdefg";
        let expected = s
            .encode_utf16()
            .fold(0u32, |h, u| ((h << 5) | (h >> 27)) ^ u32::from(u));
        assert_eq!(stable_hash(s), expected);
    }

    #[test]
    fn test_sequential_ids_spread() {
        let us: Vec<f32> = (0..2000).map(|i| unit_hash(&format!("E{:05}", i))).collect();
        let lo = us.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = us.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(lo < 0.1, "min {}", lo);
        assert!(hi > 0.9, "max {}", hi);
    }

    #[test]
    fn test_unit_hash_range() {
        for i in 0..1000 {
            let u = unit_hash(&format!("entity_{}", i));
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_order_independent() {
        let engine = LayoutEngine::default();
        let a = entity("a", 0, KycLevel::Standard, 0.2);
        let b = entity("b", 3, KycLevel::Enhanced, 0.7);

        let forward = engine.compute(&[a.clone(), b.clone()]);
        let reverse = engine.compute(&[b, a]);

        assert_eq!(forward[0], reverse[1]);
        assert_eq!(forward[1], reverse[0]);
    }

    #[test]
    fn test_axes_follow_risk_and_lane() {
        let engine = LayoutEngine::default();
        let entities = vec![
            entity("e1", 0, KycLevel::Standard, 0.1),
            entity("e2", 1, KycLevel::Standard, 0.5),
            entity("e3", 2, KycLevel::Standard, 0.9),
        ];
        let pos = engine.compute(&entities);

        assert!(pos[0].y < pos[1].y && pos[1].y < pos[2].y);
        assert!(pos[0].x < pos[1].x && pos[1].x < pos[2].x);
    }

    #[test]
    fn test_lanes_straddle_origin() {
        let engine = LayoutEngine::default();
        let cfg = engine.config().clone();
        let first = engine.position_for(&entity("x", 0, KycLevel::Standard, 0.0));
        let last = engine.position_for(&entity("x", 7, KycLevel::Standard, 0.0));

        // Same id => same jitter, so lane centers are symmetric
        let mid = (first.x + last.x) / 2.0;
        let jitter_x = first.x + 3.5 * cfg.lane_spacing;
        assert!((mid - jitter_x).abs() < 1e-3);
    }

    #[test]
    fn test_enhanced_kyc_depth_band() {
        let engine = LayoutEngine::default();
        let cfg = engine.config();
        let std_pos = engine.position_for(&entity("k", 2, KycLevel::Standard, 0.4));
        let enh_pos = engine.position_for(&entity("k", 2, KycLevel::Enhanced, 0.4));

        assert!((enh_pos.z - std_pos.z - cfg.kyc_depth_offset).abs() < 1e-4);
        assert_eq!(enh_pos.x, std_pos.x);
    }

    #[test]
    fn test_out_of_range_risk_is_clamped() {
        let engine = LayoutEngine::default();
        let low = engine.position_for(&entity("r", 1, KycLevel::Standard, -2.0));
        let nan = engine.position_for(&entity("r", 1, KycLevel::Standard, f32::NAN));
        let high = engine.position_for(&entity("r", 1, KycLevel::Standard, 4.0));

        assert_eq!(low.y, 0.0);
        assert_eq!(nan.y, 0.0);
        assert_eq!(high.y, engine.config().height_scale);
    }

    proptest! {
        #[test]
        fn prop_layout_is_bit_identical(
            id in "[a-z0-9_]{1,24}",
            lane in 0u8..8,
            risk in 0.0f32..=1.0,
            enhanced in any::<bool>(),
        ) {
            let kyc = if enhanced { KycLevel::Enhanced } else { KycLevel::Standard };
            let e = entity(&id, lane, kyc, risk);
            let first = LayoutEngine::default().position_for(&e);
            let second = LayoutEngine::default().position_for(&e);
            prop_assert_eq!(first.x.to_bits(), second.x.to_bits());
            prop_assert_eq!(first.y.to_bits(), second.y.to_bits());
            prop_assert_eq!(first.z.to_bits(), second.z.to_bits());
        }

        #[test]
        fn prop_jitter_stays_inside_lane(id in "[a-z0-9]{1,16}", lane in 0u8..8) {
            let engine = LayoutEngine::default();
            let cfg = engine.config();
            let p = engine.position_for(&entity(&id, lane, KycLevel::Standard, 0.5));
            let lane_center = (lane as f32 - 3.5) * cfg.lane_spacing;
            prop_assert!((p.x - lane_center).abs() <= cfg.jitter_radius + 1e-4);
        }
    }
}
