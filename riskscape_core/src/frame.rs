//! Serializable per-frame view of the whole scene.
//!
//! This is what a renderer (or the headless exporter) consumes: every
//! batch's instances in slot order plus overlays, camera and UI text.

use crate::assets::AssetInstance;
use crate::autopilot::AutopilotState;
use crate::camera::CameraPose;
use crate::edges::{EdgeMode, EdgeTier};
use crate::nodes::{GlowBillboard, NodeInstance};
use crate::shapes::ShapeKind;
use serde::Serialize;

/// One shape batch worth of instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchView {
    pub shape: ShapeKind,
    pub instances: Vec<NodeInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub mode: EdgeMode,
    pub dash_offset: f32,
    pub dash_pattern: [f32; 2],
    pub tiers: Vec<EdgeTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub frame: u64,
    /// Seconds of animation time since the scene was created
    pub time: f32,
    pub bucket: Option<u32>,
    pub camera: CameraPose,
    pub camera_input_enabled: bool,
    pub autopilot: AutopilotState,
    pub batches: Vec<BatchView>,
    pub halos: Vec<GlowBillboard>,
    pub edges: EdgeView,
    pub assets: Vec<AssetInstance>,
    pub annotation: Option<String>,
    pub notices: Vec<String>,
    pub selected: Option<String>,
}

impl FrameView {
    pub fn entity_count(&self) -> usize {
        self.batches.iter().map(|b| b.instances.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.tiers.iter().map(|t| t.segments.len()).sum()
    }
}
