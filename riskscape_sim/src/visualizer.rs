//! Optional live viewer for scenario runs.
//!
//! Wraps the core Rerun sink so the runner can log unconditionally; without
//! the `visualization` feature every call is a no-op.

use riskscape_core::{FrameView, LayoutConfig};

#[cfg(feature = "visualization")]
use riskscape_core::RerunVisualizer;

/// Rerun logger for simulation visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    viz: Option<RerunVisualizer>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            viz: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match RerunVisualizer::new(name) {
            Ok(viz) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to watch the run");
                Self {
                    viz: Some(viz),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Floor guides for the jurisdiction lanes.
    #[cfg(feature = "visualization")]
    pub fn log_lanes(&self, layout: &LayoutConfig) {
        if let Some(viz) = &self.viz {
            let depth = layout.height_scale.max(layout.kyc_depth_offset.abs() * 2.0);
            if let Err(e) = viz.log_lanes(layout.lane_count, layout.lane_spacing, depth) {
                tracing::debug!("lane logging failed: {}", e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_lanes(&self, _layout: &LayoutConfig) {}

    #[cfg(feature = "visualization")]
    pub fn log_frame(&mut self, frame: &FrameView) {
        if let Some(viz) = &mut self.viz {
            if let Err(e) = viz.log_frame(frame) {
                tracing::debug!(frame = frame.frame, "frame logging failed: {}", e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_frame(&mut self, _frame: &FrameView) {}

    #[cfg(feature = "visualization")]
    pub fn log_message(&self, text: &str) {
        if let Some(viz) = &self.viz {
            if let Err(e) = viz.log_message(text) {
                tracing::debug!("message logging failed: {}", e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_message(&self, _text: &str) {}
}
