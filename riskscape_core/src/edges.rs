//! Edge batching into amount tiers with a decorative dash flow.
//!
//! Segments are laid out into tiers once per edge list; every frame only
//! their endpoints and colors are re-resolved against the node layer while
//! entities animate.

use crate::error::VizError;
use crate::lookup::{PositionLookup, RiskLookup};
use crate::palette::{RiskGradient, Rgb};
use crate::visual::sanitize_volume;
use riskscape_env::EdgeSnapshot;
use serde::{Deserialize, Serialize};

/// Tier bounds, line styling and dash cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Amount boundaries between the three tiers (default: 10k, 100k)
    pub tier_bounds: [f64; 2],
    pub tier_widths: [f32; 3],
    pub opacity: f32,
    pub dash_length: f32,
    pub gap_length: f32,
    /// Dash travel in world units per second
    pub dash_speed: f32,

    pub counterfactual_color: Rgb,
    pub counterfactual_width: f32,
    pub counterfactual_opacity: f32,
    pub counterfactual_dash_length: f32,
    pub counterfactual_gap_length: f32,
    pub counterfactual_dash_speed: f32,

    pub gradient: RiskGradient,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            tier_bounds: [10_000.0, 100_000.0],
            tier_widths: [1.0, 2.0, 3.5],
            opacity: 0.55,
            dash_length: 1.5,
            gap_length: 1.0,
            dash_speed: 2.0,
            counterfactual_color: Rgb::new(0.72, 0.42, 1.0),
            counterfactual_width: 4.5,
            counterfactual_opacity: 0.95,
            counterfactual_dash_length: 0.6,
            counterfactual_gap_length: 0.4,
            counterfactual_dash_speed: 5.0,
            gradient: RiskGradient::default(),
        }
    }
}

impl EdgeConfig {
    /// Tier index for a monetary amount. Invalid amounts fall in tier 0.
    pub fn tier_for(&self, amount: f64) -> usize {
        let amount = sanitize_volume(amount);
        self.tier_bounds.iter().filter(|bound| amount >= **bound).count()
    }

    /// Flow color: the gradient sampled at the riskier endpoint.
    pub fn flow_color<R>(&self, risks: &R, from_id: &str, to_id: &str) -> Rgb
    where
        R: RiskLookup + ?Sized,
    {
        let risk = risks
            .risk_of(from_id)
            .unwrap_or(0.0)
            .max(risks.risk_of(to_id).unwrap_or(0.0));
        self.gradient.sample(risk)
    }
}

/// Which edge set is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    #[default]
    Flow,
    Counterfactual,
}

/// One drawable line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSegment {
    pub from_id: String,
    pub to_id: String,
    pub amount: f64,
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub color: [f32; 3],
}

/// All segments sharing one line width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeTier {
    pub width: f32,
    pub opacity: f32,
    pub segments: Vec<EdgeSegment>,
}

/// Tiered edge batches plus the dash-flow clock.
#[derive(Debug, Default)]
pub struct EdgeRenderer {
    config: EdgeConfig,
    mode: EdgeMode,
    tiers: Vec<EdgeTier>,
    dash_offset: f32,
    skipped: usize,
}

impl EdgeRenderer {
    pub fn new(config: EdgeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Replaces the edge set with normal flow styling.
    ///
    /// Edges whose endpoints cannot be positioned are skipped. Returns the
    /// number of segments drawn.
    pub fn update<P, R>(
        &mut self,
        edges: &[EdgeSnapshot],
        positions: &P,
        risks: &R,
    ) -> Result<usize, VizError>
    where
        P: PositionLookup + ?Sized,
        R: RiskLookup + ?Sized,
    {
        validate_edges(edges)?;
        self.mode = EdgeMode::Flow;
        self.rebuild(edges, positions, risks);
        Ok(self.segment_count())
    }

    /// Replaces the edge set with the counterfactual emphasis styling.
    pub fn show_counterfactual<P>(
        &mut self,
        removed: &[EdgeSnapshot],
        positions: &P,
    ) -> Result<usize, VizError>
    where
        P: PositionLookup + ?Sized,
    {
        validate_edges(removed)?;
        self.mode = EdgeMode::Counterfactual;
        self.dash_offset = 0.0;
        self.rebuild(removed, positions, &NoRisk);
        Ok(self.segment_count())
    }

    /// Re-resolves endpoints and flow colors in place.
    ///
    /// The tier layout from the last edge list is kept; a segment whose
    /// endpoint can no longer be positioned is dropped until the next list.
    pub fn follow<P, R>(&mut self, positions: &P, risks: &R)
    where
        P: PositionLookup + ?Sized,
        R: RiskLookup + ?Sized,
    {
        let cfg = &self.config;
        let mode = self.mode;
        let mut dropped = 0;
        for tier in &mut self.tiers {
            tier.segments.retain_mut(|seg| {
                let (Some(from), Some(to)) = (
                    positions.position_of(&seg.from_id),
                    positions.position_of(&seg.to_id),
                ) else {
                    dropped += 1;
                    return false;
                };
                seg.from = [from.x, from.y, from.z];
                seg.to = [to.x, to.y, to.z];
                if mode == EdgeMode::Flow {
                    seg.color = cfg.flow_color(risks, &seg.from_id, &seg.to_id).to_array();
                }
                true
            });
        }
        if dropped > 0 {
            self.skipped += dropped;
            tracing::debug!(dropped, mode = ?self.mode, "edge endpoints lost");
        }
    }

    /// Advances the dash pattern, wrapped to one period.
    pub fn animate(&mut self, dt: f32) {
        let (dash, gap) = self.dash_pattern();
        let period = dash + gap;
        if period <= 0.0 {
            return;
        }
        let speed = match self.mode {
            EdgeMode::Flow => self.config.dash_speed,
            EdgeMode::Counterfactual => self.config.counterfactual_dash_speed,
        };
        self.dash_offset = (self.dash_offset + dt.max(0.0) * speed).rem_euclid(period);
    }

    /// Drops every edge and releases the tier batches.
    pub fn clear(&mut self) {
        self.tiers = Vec::new();
        self.mode = EdgeMode::Flow;
        self.dash_offset = 0.0;
        self.skipped = 0;
    }

    pub fn mode(&self) -> EdgeMode {
        self.mode
    }

    pub fn tiers(&self) -> &[EdgeTier] {
        &self.tiers
    }

    pub fn dash_offset(&self) -> f32 {
        self.dash_offset
    }

    /// (dash, gap) lengths for the current mode.
    pub fn dash_pattern(&self) -> (f32, f32) {
        match self.mode {
            EdgeMode::Flow => (self.config.dash_length, self.config.gap_length),
            EdgeMode::Counterfactual => (
                self.config.counterfactual_dash_length,
                self.config.counterfactual_gap_length,
            ),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.tiers.iter().map(|t| t.segments.len()).sum()
    }

    /// Edges left out of the current tiers for lack of a position.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn rebuild<P, R>(&mut self, edges: &[EdgeSnapshot], positions: &P, risks: &R)
    where
        P: PositionLookup + ?Sized,
        R: RiskLookup + ?Sized,
    {
        let cfg = &self.config;
        let mut tiers: Vec<EdgeTier> = match self.mode {
            EdgeMode::Flow => cfg
                .tier_widths
                .iter()
                .map(|&width| EdgeTier {
                    width,
                    opacity: cfg.opacity,
                    segments: Vec::new(),
                })
                .collect(),
            EdgeMode::Counterfactual => vec![EdgeTier {
                width: cfg.counterfactual_width,
                opacity: cfg.counterfactual_opacity,
                segments: Vec::new(),
            }],
        };

        let mut skipped = 0;
        for edge in edges {
            let (Some(from), Some(to)) = (
                positions.position_of(&edge.from_id),
                positions.position_of(&edge.to_id),
            ) else {
                skipped += 1;
                continue;
            };

            let (tier, color) = match self.mode {
                EdgeMode::Flow => (
                    cfg.tier_for(edge.amount),
                    cfg.flow_color(risks, &edge.from_id, &edge.to_id),
                ),
                EdgeMode::Counterfactual => (0, cfg.counterfactual_color),
            };

            tiers[tier].segments.push(EdgeSegment {
                from_id: edge.from_id.clone(),
                to_id: edge.to_id.clone(),
                amount: sanitize_volume(edge.amount),
                from: [from.x, from.y, from.z],
                to: [to.x, to.y, to.z],
                color: color.to_array(),
            });
        }

        if skipped != self.skipped {
            tracing::debug!(edges = edges.len(), skipped, mode = ?self.mode, "edge endpoints unresolved");
        }
        self.skipped = skipped;
        self.tiers = tiers;
    }
}

/// Risk lookup that knows nothing; counterfactual edges ignore risk.
struct NoRisk;

impl RiskLookup for NoRisk {
    fn risk_of(&self, _id: &str) -> Option<f32> {
        None
    }
}

pub(crate) fn validate_edges(edges: &[EdgeSnapshot]) -> Result<(), VizError> {
    match edges
        .iter()
        .position(|e| e.from_id.is_empty() || e.to_id.is_empty())
    {
        Some(index) => Err(VizError::malformed(format!(
            "edge #{} has an empty endpoint",
            index
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::collections::HashMap;

    fn lookups() -> (HashMap<String, Point3<f32>>, HashMap<String, f32>) {
        let positions = HashMap::from([
            ("a".to_string(), Point3::new(0.0, 0.0, 0.0)),
            ("b".to_string(), Point3::new(10.0, 5.0, 0.0)),
            ("c".to_string(), Point3::new(-4.0, 2.0, 1.0)),
        ]);
        let risks = HashMap::from([
            ("a".to_string(), 0.1),
            ("b".to_string(), 0.9),
            ("c".to_string(), 0.3),
        ]);
        (positions, risks)
    }

    #[test]
    fn test_tiers_by_amount() {
        let cfg = EdgeConfig::default();
        assert_eq!(cfg.tier_for(500.0), 0);
        assert_eq!(cfg.tier_for(10_000.0), 1);
        assert_eq!(cfg.tier_for(250_000.0), 2);
        assert_eq!(cfg.tier_for(f64::NAN), 0);
        assert_eq!(cfg.tier_for(-7.0), 0);
    }

    #[test]
    fn test_update_buckets_and_colors() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        let drawn = edges
            .update(
                &[
                    EdgeSnapshot::new("a", "b", 50.0),
                    EdgeSnapshot::new("a", "c", 20_000.0),
                    EdgeSnapshot::new("c", "b", 1_000_000.0),
                ],
                &positions,
                &risks,
            )
            .unwrap();

        assert_eq!(drawn, 3);
        let tiers = edges.tiers();
        assert_eq!(tiers.len(), 3);
        assert!(tiers.iter().all(|t| t.segments.len() == 1));
        assert!(tiers[0].width < tiers[1].width && tiers[1].width < tiers[2].width);

        // Color follows the riskier endpoint
        let expected = edges.config().gradient.sample(0.9).to_array();
        assert_eq!(tiers[0].segments[0].color, expected);
    }

    #[test]
    fn test_missing_endpoint_is_skipped() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        let drawn = edges
            .update(
                &[EdgeSnapshot::new("a", "ghost", 10.0), EdgeSnapshot::new("a", "b", 10.0)],
                &positions,
                &risks,
            )
            .unwrap();
        assert_eq!(drawn, 1);
        assert_eq!(edges.skipped(), 1);
    }

    #[test]
    fn test_empty_endpoint_is_malformed() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges.update(&[EdgeSnapshot::new("a", "b", 1.0)], &positions, &risks).unwrap();

        let err = edges
            .update(&[EdgeSnapshot::new("", "b", 1.0)], &positions, &risks)
            .unwrap_err();
        assert!(matches!(err, VizError::MalformedSnapshot { .. }));
        assert_eq!(edges.segment_count(), 1);
    }

    #[test]
    fn test_counterfactual_mode_styling() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges.update(&[EdgeSnapshot::new("a", "b", 10.0)], &positions, &risks).unwrap();

        let removed = [EdgeSnapshot::new("b", "c", 999_999.0), EdgeSnapshot::new("c", "a", 1.0)];
        assert_eq!(edges.show_counterfactual(&removed, &positions).unwrap(), 2);
        assert_eq!(edges.mode(), EdgeMode::Counterfactual);

        let cfg = edges.config().clone();
        let tiers = edges.tiers();
        assert_eq!(tiers.len(), 1);
        assert!(tiers[0].width > cfg.tier_widths[2]);
        assert!(tiers[0].opacity > cfg.opacity);
        assert!(tiers[0]
            .segments
            .iter()
            .all(|s| s.color == cfg.counterfactual_color.to_array()));
        assert_ne!(edges.dash_pattern(), (cfg.dash_length, cfg.gap_length));
    }

    #[test]
    fn test_dash_offset_wraps() {
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        let (dash, gap) = edges.dash_pattern();
        for _ in 0..500 {
            edges.animate(0.016);
            assert!(edges.dash_offset() >= 0.0 && edges.dash_offset() < dash + gap);
        }
        assert!(edges.dash_offset() > 0.0);
    }

    #[test]
    fn test_follow_tracks_moving_endpoints() {
        let (mut positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges.update(&[EdgeSnapshot::new("a", "b", 10.0)], &positions, &risks).unwrap();

        positions.insert("b".to_string(), Point3::new(20.0, 5.0, 0.0));
        edges.follow(&positions, &risks);
        assert_relative_eq!(edges.tiers()[0].segments[0].to[0], 20.0);

        positions.remove("b");
        edges.follow(&positions, &risks);
        assert_eq!(edges.segment_count(), 0);
        assert_eq!(edges.skipped(), 1);
    }

    #[test]
    fn test_follow_keeps_tier_layout() {
        let (mut positions, mut risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges
            .update(
                &[
                    EdgeSnapshot::new("a", "b", 50.0),
                    EdgeSnapshot::new("a", "c", 20_000.0),
                    EdgeSnapshot::new("c", "b", 1_000_000.0),
                ],
                &positions,
                &risks,
            )
            .unwrap();
        let before: Vec<Vec<(String, String)>> = edges
            .tiers()
            .iter()
            .map(|t| t.segments.iter().map(|s| (s.from_id.clone(), s.to_id.clone())).collect())
            .collect();

        positions.insert("c".to_string(), Point3::new(-8.0, 3.0, 2.0));
        risks.insert("c".to_string(), 0.95);
        for _ in 0..10 {
            edges.follow(&positions, &risks);
        }

        let after: Vec<Vec<(String, String)>> = edges
            .tiers()
            .iter()
            .map(|t| t.segments.iter().map(|s| (s.from_id.clone(), s.to_id.clone())).collect())
            .collect();
        assert_eq!(before, after);
        assert_eq!(edges.segment_count(), 3);

        let moved = &edges.tiers()[1].segments[0];
        assert_eq!(moved.to, [-8.0, 3.0, 2.0]);
        assert_eq!(moved.color, edges.config().gradient.sample(0.95).to_array());
        assert_eq!(edges.tiers()[2].segments[0].from, [-8.0, 3.0, 2.0]);
    }

    #[test]
    fn test_follow_keeps_counterfactual_color() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges
            .show_counterfactual(&[EdgeSnapshot::new("a", "b", 10.0)], &positions)
            .unwrap();
        edges.follow(&positions, &risks);

        let expected = edges.config().counterfactual_color.to_array();
        assert_eq!(edges.tiers()[0].segments[0].color, expected);
    }

    #[test]
    fn test_clear_releases_tiers() {
        let (positions, risks) = lookups();
        let mut edges = EdgeRenderer::new(EdgeConfig::default());
        edges.update(&[EdgeSnapshot::new("a", "b", 10.0)], &positions, &risks).unwrap();
        edges.animate(0.3);

        edges.clear();
        assert!(edges.tiers().is_empty());
        assert_eq!(edges.dash_offset(), 0.0);
        assert_eq!(edges.mode(), EdgeMode::Flow);
    }
}
