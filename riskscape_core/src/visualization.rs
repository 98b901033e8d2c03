//! Rerun.io sink for scene frames.
//!
//! Logs one [`FrameView`] per call on the `frame` timeline:
//! - one point cloud per shape batch, plus glow halos
//! - one line-strip batch per edge tier
//! - asset markers and the camera rig
//! - annotations and notices as text logs
//!
//! Enable with the `visualization` feature flag.

use crate::frame::FrameView;
use crate::palette::Rgb;
use rerun::{RecordingStream, RecordingStreamBuilder};

type LogResult = Result<(), Box<dyn std::error::Error>>;

/// Rerun-based viewer for the risk scene
pub struct RerunVisualizer {
    rec: RecordingStream,
    last_annotation: Option<String>,
}

impl RerunVisualizer {
    /// Create a new visualizer that spawns the Rerun viewer
    pub fn new(app_id: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let rec = RecordingStreamBuilder::new(app_id).spawn()?;
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())?;
        Ok(Self {
            rec,
            last_annotation: None,
        })
    }

    /// Create a visualizer that saves to an .rrd file
    pub fn new_to_file(app_id: &str, path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let rec = RecordingStreamBuilder::new(app_id).save(path)?;
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())?;
        Ok(Self {
            rec,
            last_annotation: None,
        })
    }

    /// Lane guide lines on the floor, one per jurisdiction.
    pub fn log_lanes(&self, lane_count: u8, lane_spacing: f32, depth: f32) -> LogResult {
        let half = (lane_count.max(1) as f32 - 1.0) / 2.0;
        let strips: Vec<Vec<[f32; 3]>> = (0..lane_count)
            .map(|lane| {
                let x = (lane as f32 - half) * lane_spacing;
                vec![[x, 0.0, -depth], [x, 0.0, depth]]
            })
            .collect();
        self.rec.log_static(
            "world/lanes",
            &rerun::LineStrips3D::new(strips).with_colors([[60, 60, 60, 100]]),
        )?;
        Ok(())
    }

    /// Log a complete frame.
    pub fn log_frame(&mut self, frame: &FrameView) -> LogResult {
        self.rec.set_time_sequence("frame", frame.frame as i64);

        for batch in &frame.batches {
            let path = format!("world/entities/{}", batch.shape.name());
            self.rec.log(
                path,
                &rerun::Points3D::new(batch.instances.iter().map(|i| i.position))
                    .with_radii(batch.instances.iter().map(|i| i.scale * 0.5))
                    .with_colors(batch.instances.iter().map(|i| Rgb::from(i.color).to_rgba8(1.0)))
                    .with_labels(batch.instances.iter().map(|i| i.id.clone())),
            )?;
        }

        self.rec.log(
            "world/halos",
            &rerun::Points3D::new(frame.halos.iter().map(|h| h.position))
                .with_radii(frame.halos.iter().map(|h| h.scale * 0.5))
                .with_colors(frame.halos.iter().map(|h| Rgb::from(h.color).to_rgba8(h.opacity))),
        )?;

        for (index, tier) in frame.edges.tiers.iter().enumerate() {
            self.rec.log(
                format!("world/edges/tier_{}", index),
                &rerun::LineStrips3D::new(tier.segments.iter().map(|s| vec![s.from, s.to]))
                    .with_radii([tier.width * 0.05])
                    .with_colors(tier.segments.iter().map(|s| Rgb::from(s.color).to_rgba8(tier.opacity))),
            )?;
        }

        self.rec.log(
            "world/assets",
            &rerun::Points3D::new(frame.assets.iter().map(|a| a.position))
                .with_radii(frame.assets.iter().map(|a| a.scale * 0.5))
                .with_colors(frame.assets.iter().map(|a| Rgb::from(a.color).to_rgba8(a.opacity)))
                .with_labels(frame.assets.iter().map(|a| a.asset_id.clone())),
        )?;

        let eye = frame.camera.position;
        let target = frame.camera.look_at;
        self.rec.log(
            "world/camera",
            &rerun::LineStrips3D::new([[[eye.x, eye.y, eye.z], [target.x, target.y, target.z]]])
                .with_colors([[255, 255, 255, 160]])
                .with_labels([frame.autopilot.to_string()]),
        )?;

        if frame.annotation != self.last_annotation {
            if let Some(text) = &frame.annotation {
                self.rec.log("logs/annotation", &rerun::TextLog::new(text.clone()))?;
            }
            self.last_annotation = frame.annotation.clone();
        }

        self.rec.log(
            "stats/entities",
            &rerun::Scalars::new([frame.entity_count() as f64]),
        )?;
        self.rec.log(
            "stats/edges",
            &rerun::Scalars::new([frame.edge_count() as f64]),
        )?;
        Ok(())
    }

    /// Log a notice or other one-off message.
    pub fn log_message(&self, text: &str) -> LogResult {
        self.rec.log("logs/notices", &rerun::TextLog::new(text))?;
        Ok(())
    }
}
