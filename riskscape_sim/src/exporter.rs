//! JSON exporter for recorded frames.
//!
//! Writes the frames a scenario produced, plus the verdict, so a run can be
//! inspected or replayed into a viewer after the fact.

use riskscape_core::FrameView;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Complete recording of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct FrameExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Scene time of the last recorded frame
    pub duration_sec: f32,

    /// Recorded frames, in order
    pub frames: Vec<FrameView>,

    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl FrameExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: FrameView) {
        self.duration_sec = frame.time;
        self.frames.push(frame);
    }

    /// Records the verdict.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskscape_core::frame::EdgeView;
    use riskscape_core::{AutopilotState, CameraPose, EdgeMode};

    fn frame(index: u64, time: f32) -> FrameView {
        FrameView {
            frame: index,
            time,
            bucket: Some(0),
            camera: CameraPose::default(),
            camera_input_enabled: true,
            autopilot: AutopilotState::Idle,
            batches: Vec::new(),
            halos: Vec::new(),
            edges: EdgeView {
                mode: EdgeMode::Flow,
                dash_offset: 0.0,
                dash_pattern: [1.5, 1.0],
                tiers: Vec::new(),
            },
            assets: Vec::new(),
            annotation: None,
            notices: vec!["hello".to_string()],
            selected: None,
        }
    }

    #[test]
    fn test_export_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut export = FrameExport::new("tour", 42);
        export.add_frame(frame(1, 0.5));
        export.add_frame(frame(2, 1.0));
        export.finalize(false, Some("tour did not finish".to_string()));
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["scenario"], "tour");
        assert_eq!(value["frames"].as_array().unwrap().len(), 2);
        assert_eq!(value["duration_sec"], 1.0);
        assert_eq!(value["failure_reason"], "tour did not finish");
        assert_eq!(value["frames"][0]["notices"][0], "hello");
    }
}
