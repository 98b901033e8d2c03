//! Aggregate engine configuration.
//!
//! Every field has a tuned default; a JSON file only needs the keys it
//! overrides.

use crate::assets::AssetConfig;
use crate::autopilot::AutopilotConfig;
use crate::camera::CameraPose;
use crate::edges::EdgeConfig;
use crate::error::VizError;
use crate::layout::LayoutConfig;
use crate::nodes::NodeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub nodes: NodeConfig,
    pub edges: EdgeConfig,
    pub assets: AssetConfig,
    pub autopilot: AutopilotConfig,
    /// Camera pose before any user or autopilot movement
    pub initial_camera: CameraPose,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, VizError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| VizError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VizError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| VizError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, VizError> {
        serde_json::to_string_pretty(self).map_err(|e| VizError::Config(e.to_string()))
    }

    /// Rejects settings that would stall or invert an animation.
    pub fn validate(&self) -> Result<(), VizError> {
        let n = &self.nodes;
        if !(n.transition_duration > 0.0) {
            return Err(VizError::Config("nodes.transition_duration must be > 0".into()));
        }
        if !(n.catch_up > 0.0) {
            return Err(VizError::Config("nodes.catch_up must be > 0".into()));
        }
        if n.glow_low >= n.glow_full {
            return Err(VizError::Config("nodes.glow_low must be below nodes.glow_full".into()));
        }
        if n.min_scale > n.max_scale {
            return Err(VizError::Config("nodes.min_scale exceeds nodes.max_scale".into()));
        }
        if self.edges.tier_bounds[0] > self.edges.tier_bounds[1] {
            return Err(VizError::Config("edges.tier_bounds must be ascending".into()));
        }

        let a = &self.autopilot;
        let durations = [
            ("overview_duration", a.overview_duration),
            ("closing_duration", a.closing_duration),
            ("approach_duration", a.approach_duration),
            ("settle_duration", a.settle_duration),
            ("hold_duration", a.hold_duration),
            ("severity_multiplier", a.severity_multiplier),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(VizError::Config(format!("autopilot.{} must be > 0", name)));
        }
        let [open, close] = a.annotation_window;
        if !(0.0..=1.0).contains(&open) || !(0.0..=1.0).contains(&close) || open > close {
            return Err(VizError::Config(
                "autopilot.annotation_window must be an ordered pair within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "layout": { "lane_spacing": 20.0 }, "autopilot": { "max_targets": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.layout.lane_spacing, 20.0);
        assert_eq!(config.layout.lane_count, LayoutConfig::default().lane_count);
        assert_eq!(config.autopilot.max_targets, 3);
        assert_eq!(config.nodes.catch_up, 3.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = EngineConfig::from_json_str(r#"{ "nodes": { "glow_low": 0.9, "glow_full": 0.5 } }"#);
        assert!(matches!(err, Err(VizError::Config(_))));

        let err = EngineConfig::from_json_str(r#"{ "autopilot": { "hold_duration": 0.0 } }"#);
        assert!(matches!(err, Err(VizError::Config(_))));

        let err = EngineConfig::from_json_str(r#"{ "autopilot": { "annotation_window": [0.9, 0.2] } }"#);
        assert!(matches!(err, Err(VizError::Config(_))));

        assert!(matches!(EngineConfig::from_json_str("{ nope"), Err(VizError::Config(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = EngineConfig::default().to_json_pretty().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.autopilot.max_targets, 8);
        assert!(EngineConfig::from_json_file("/definitely/not/here.json").is_err());
    }
}
