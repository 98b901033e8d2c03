//! Camera autopilot: tour planning and keyframe playback.
//!
//! ```text
//!            start (targets > 0)          pause
//!   Idle ─────────────────────────▶ Running ─────▶ Paused
//!    ▲                                 │  ◀──────────┘
//!    └──────────── stop / exhausted ───┘     resume
//! ```
//!
//! Target lists are fetched off the frame loop. The controller hands out a
//! completer for the fetch and polls for the result at the start of a tick.

use crate::camera::{CameraPose, CameraRig, Easing};
use crate::lookup::{centroid, PositionLookup};
use crate::overlay::OverlaySurface;
use crate::pending::{Completer, PendingPoll, PendingSlot};
use crate::visual::clamp_unit;
use nalgebra::{Point3, Vector3};
use riskscape_env::{AutopilotTarget, EnvError, TargetKind, TargetList};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

pub type FetchResult = Result<TargetList, EnvError>;

// ============================================================================
// STATE AND KEYFRAMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for AutopilotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutopilotState::Idle => "idle",
            AutopilotState::Running => "running",
            AutopilotState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// One planned camera move. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyframe {
    pub pose: CameraPose,
    /// Seconds, always > 0
    pub duration: f32,
    pub easing: Easing,
    pub annotation: Option<String>,
}

impl Keyframe {
    fn new(pose: CameraPose, duration: f32, easing: Easing, annotation: Option<String>) -> Self {
        Self {
            pose,
            duration: duration.max(f32::EPSILON),
            easing,
            annotation,
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Shot offsets, durations and playback windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Targets considered per tour (default: 8)
    pub max_targets: usize,

    /// Establishing and closing shot
    pub overview: CameraPose,
    pub overview_duration: f32,
    pub closing_duration: f32,

    pub approach_offset: [f32; 3],
    pub approach_duration: f32,
    pub settle_offset: [f32; 3],
    pub settle_duration: f32,
    /// Camera drift during the hold, added to the settle position
    pub hold_drift: [f32; 3],
    pub hold_duration: f32,

    pub cluster_base_radius: f32,
    pub cluster_radius_per_member: f32,
    pub cluster_max_radius: f32,
    /// Height of the cluster shots as a fraction of the radius
    pub cluster_elevation: f32,
    /// Orbit angle swept around a cluster, radians
    pub cluster_sweep: f32,

    /// Targets with risk >= ratio * max risk get longer shots
    pub severity_ratio: f32,
    pub severity_multiplier: f32,

    /// Fraction of segment progress during which annotations are shown
    pub annotation_window: [f32; 2],

    /// Lifetime of "no targets" / fetch-failure notices, seconds
    pub notice_ttl: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            max_targets: 8,
            overview: CameraPose::default(),
            overview_duration: 3.0,
            closing_duration: 3.0,
            approach_offset: [0.0, 12.0, 28.0],
            approach_duration: 2.5,
            settle_offset: [0.0, 4.0, 10.0],
            settle_duration: 1.8,
            hold_drift: [1.2, 0.4, 0.0],
            hold_duration: 2.0,
            cluster_base_radius: 18.0,
            cluster_radius_per_member: 2.0,
            cluster_max_radius: 60.0,
            cluster_elevation: 0.45,
            cluster_sweep: 0.9,
            severity_ratio: 0.9,
            severity_multiplier: 1.5,
            annotation_window: [0.2, 0.85],
            notice_ttl: 3.0,
        }
    }
}

// ============================================================================
// PLANNING
// ============================================================================

/// Plans a tour over the resolvable targets.
///
/// Targets keep the order they were supplied in. A target whose entities
/// cannot be positioned is skipped. Returns no keyframes when nothing
/// resolves.
pub fn plan_tour<P>(
    bucket: u32,
    targets: &[AutopilotTarget],
    positions: &P,
    config: &AutopilotConfig,
) -> Vec<Keyframe>
where
    P: PositionLookup + ?Sized,
{
    let considered = &targets[..targets.len().min(config.max_targets)];
    let resolved: Vec<(&AutopilotTarget, Point3<f32>, usize)> = considered
        .iter()
        .filter_map(|target| {
            let (anchor, members) = resolve_target(target, positions)?;
            Some((target, anchor, members))
        })
        .collect();
    if resolved.is_empty() {
        return Vec::new();
    }

    let max_risk = considered
        .iter()
        .map(|t| clamp_unit(t.risk_score))
        .fold(0.0f32, f32::max);

    let mut keyframes = Vec::with_capacity(resolved.len() * 3 + 2);
    keyframes.push(Keyframe::new(
        config.overview,
        config.overview_duration,
        Easing::EaseInOut,
        Some(format!("Bucket {}: {} investigation targets", bucket, resolved.len())),
    ));

    for (target, anchor, members) in &resolved {
        let scale = if max_risk > 0.0 && clamp_unit(target.risk_score) >= config.severity_ratio * max_risk {
            config.severity_multiplier
        } else {
            1.0
        };
        match target.kind {
            TargetKind::Entity => plan_entity(&mut keyframes, target, *anchor, scale, config),
            TargetKind::Cluster => plan_cluster(&mut keyframes, target, *anchor, *members, scale, config),
        }
    }

    keyframes.push(Keyframe::new(
        config.overview,
        config.closing_duration,
        Easing::EaseInOut,
        Some(format!("Tour complete: {} targets reviewed", resolved.len())),
    ));
    keyframes
}

fn resolve_target<P>(target: &AutopilotTarget, positions: &P) -> Option<(Point3<f32>, usize)>
where
    P: PositionLookup + ?Sized,
{
    match target.kind {
        TargetKind::Entity => {
            let id = target.entity_ids.first().unwrap_or(&target.id);
            positions.position_of(id).map(|p| (p, 1))
        }
        TargetKind::Cluster => centroid(positions, &target.entity_ids),
    }
}

fn plan_entity(
    keyframes: &mut Vec<Keyframe>,
    target: &AutopilotTarget,
    p: Point3<f32>,
    scale: f32,
    cfg: &AutopilotConfig,
) {
    let settle = p + Vector3::from(cfg.settle_offset);
    keyframes.push(Keyframe::new(
        CameraPose::new(p + Vector3::from(cfg.approach_offset), p),
        cfg.approach_duration * scale,
        Easing::EaseInOut,
        Some(target.label.clone()),
    ));
    keyframes.push(Keyframe::new(
        CameraPose::new(settle, p),
        cfg.settle_duration * scale,
        Easing::EaseOut,
        Some(target.reason.clone()),
    ));
    keyframes.push(Keyframe::new(
        CameraPose::new(settle + Vector3::from(cfg.hold_drift), p),
        cfg.hold_duration * scale,
        Easing::Linear,
        None,
    ));
}

fn plan_cluster(
    keyframes: &mut Vec<Keyframe>,
    target: &AutopilotTarget,
    c: Point3<f32>,
    members: usize,
    scale: f32,
    cfg: &AutopilotConfig,
) {
    let radius = (cfg.cluster_base_radius + cfg.cluster_radius_per_member * members as f32)
        .min(cfg.cluster_max_radius);
    let orbit = |angle: f32, r: f32| {
        c + Vector3::new(r * angle.sin(), r * cfg.cluster_elevation, r * angle.cos())
    };

    keyframes.push(Keyframe::new(
        CameraPose::new(orbit(0.0, radius), c),
        cfg.approach_duration * scale,
        Easing::EaseInOut,
        Some(format!("{} ({} entities)", target.label, members)),
    ));
    keyframes.push(Keyframe::new(
        CameraPose::new(orbit(cfg.cluster_sweep, radius * 0.85), c),
        cfg.settle_duration * scale,
        Easing::EaseInOut,
        Some(target.reason.clone()),
    ));
    keyframes.push(Keyframe::new(
        CameraPose::new(orbit(cfg.cluster_sweep * 1.1, radius * 0.85), c),
        cfg.hold_duration * scale,
        Easing::Linear,
        None,
    ));
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Result of a toggle request.
#[derive(Debug)]
pub enum ToggleAction {
    Stopped,
    Resumed,
    /// A target fetch must be spawned with this completer
    Fetch(Completer<FetchResult>),
}

pub struct AutopilotController {
    config: AutopilotConfig,
    state: AutopilotState,
    keyframes: Vec<Keyframe>,
    index: usize,
    progress: f32,
    segment_start: CameraPose,
    annotation_visible: bool,
    fetch: PendingSlot<FetchResult>,
    fetch_bucket: u32,
    state_tx: watch::Sender<AutopilotState>,
}

impl AutopilotController {
    pub fn new(config: AutopilotConfig) -> Self {
        let (state_tx, _) = watch::channel(AutopilotState::Idle);
        Self {
            config,
            state: AutopilotState::Idle,
            keyframes: Vec::new(),
            index: 0,
            progress: 0.0,
            segment_start: CameraPose::default(),
            annotation_visible: false,
            fetch: PendingSlot::new(),
            fetch_bucket: 0,
            state_tx,
        }
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn state(&self) -> AutopilotState {
        self.state
    }

    /// State-change notifications.
    pub fn subscribe(&self) -> watch::Receiver<AutopilotState> {
        self.state_tx.subscribe()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Fraction of the current keyframe played, in [0, 1).
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch.is_pending()
    }

    /// Begins a target-list fetch for `bucket`. Rejected unless idle.
    ///
    /// A fetch already in flight is superseded.
    pub fn request(&mut self, bucket: u32) -> Option<Completer<FetchResult>> {
        if self.state != AutopilotState::Idle {
            return None;
        }
        self.fetch_bucket = bucket;
        Some(self.fetch.begin())
    }

    /// Applies a completed fetch, if any. Called at the start of a tick.
    pub fn poll_fetch<P>(&mut self, positions: &P, camera: &mut CameraRig, overlay: &mut dyn OverlaySurface)
    where
        P: PositionLookup + ?Sized,
    {
        match self.fetch.poll() {
            PendingPoll::Idle | PendingPoll::Waiting => {}
            PendingPoll::Ready(Ok(list)) => {
                let bucket = self.fetch_bucket;
                self.start(bucket, &list.targets, positions, camera, overlay);
            }
            PendingPoll::Ready(Err(e)) => {
                tracing::warn!(bucket = self.fetch_bucket, error = %e, "autopilot target fetch failed");
                overlay.post_notice(&format!("Autopilot unavailable: {}", e), self.config.notice_ttl);
            }
            PendingPoll::Abandoned => {
                tracing::warn!(bucket = self.fetch_bucket, "autopilot target fetch abandoned");
                overlay.post_notice("Autopilot unavailable", self.config.notice_ttl);
            }
        }
    }

    /// Plans and starts a tour. A no-op unless idle; with nothing to visit
    /// a notice is posted and the controller stays idle.
    pub fn start<P>(
        &mut self,
        bucket: u32,
        targets: &[AutopilotTarget],
        positions: &P,
        camera: &mut CameraRig,
        overlay: &mut dyn OverlaySurface,
    ) -> bool
    where
        P: PositionLookup + ?Sized,
    {
        if self.state != AutopilotState::Idle {
            return false;
        }
        let keyframes = plan_tour(bucket, targets, positions, &self.config);
        if keyframes.is_empty() {
            tracing::info!(bucket, supplied = targets.len(), "autopilot has no targets");
            overlay.post_notice(
                &format!("No investigation targets for bucket {}", bucket),
                self.config.notice_ttl,
            );
            return false;
        }

        let total: f32 = keyframes.iter().map(|k| k.duration).sum();
        tracing::info!(bucket, keyframes = keyframes.len(), seconds = total, "autopilot tour planned");

        self.keyframes = keyframes;
        self.index = 0;
        self.progress = 0.0;
        self.segment_start = camera.pose();
        self.annotation_visible = false;
        camera.set_input_enabled(false);
        self.set_state(AutopilotState::Running);
        true
    }

    /// Returns to idle from any state and cancels any in-flight fetch.
    pub fn stop(&mut self, camera: &mut CameraRig, overlay: &mut dyn OverlaySurface) {
        if self.fetch.cancel() {
            tracing::debug!(bucket = self.fetch_bucket, "autopilot fetch cancelled");
        }
        self.keyframes.clear();
        self.index = 0;
        self.progress = 0.0;
        self.annotation_visible = false;
        overlay.clear_annotation();
        camera.set_input_enabled(true);
        self.set_state(AutopilotState::Idle);
    }

    /// Running → paused. The user may move the camera while paused.
    pub fn pause(&mut self, camera: &mut CameraRig) -> bool {
        if self.state != AutopilotState::Running {
            return false;
        }
        camera.set_input_enabled(true);
        self.set_state(AutopilotState::Paused);
        true
    }

    /// Paused → running, replaying the current segment from wherever the
    /// camera is now.
    pub fn resume(&mut self, camera: &mut CameraRig) -> bool {
        if self.state != AutopilotState::Paused {
            return false;
        }
        self.segment_start = camera.pose();
        self.progress = 0.0;
        camera.set_input_enabled(false);
        self.set_state(AutopilotState::Running);
        true
    }

    /// Running → stop, paused → resume, idle → fetch targets.
    pub fn toggle(&mut self, bucket: u32, camera: &mut CameraRig, overlay: &mut dyn OverlaySurface) -> Option<ToggleAction> {
        match self.state {
            AutopilotState::Running => {
                self.stop(camera, overlay);
                Some(ToggleAction::Stopped)
            }
            AutopilotState::Paused => {
                self.resume(camera);
                Some(ToggleAction::Resumed)
            }
            AutopilotState::Idle => self.request(bucket).map(ToggleAction::Fetch),
        }
    }

    /// Advances playback by one frame.
    pub fn tick(&mut self, dt: f32, camera: &mut CameraRig, overlay: &mut dyn OverlaySurface) {
        if self.state != AutopilotState::Running {
            return;
        }
        let Some(keyframe) = self.keyframes.get(self.index) else {
            tracing::info!("autopilot tour finished");
            self.stop(camera, overlay);
            return;
        };

        self.progress += dt.max(0.0) / keyframe.duration;
        if self.progress >= 1.0 {
            // Exact landing: no easing residue carried into the next segment
            camera.set_pose(keyframe.pose);
            self.segment_start = keyframe.pose;
            self.index += 1;
            self.progress = 0.0;
            if self.annotation_visible {
                overlay.clear_annotation();
                self.annotation_visible = false;
            }
            return;
        }

        let eased = keyframe.easing.apply(self.progress);
        camera.set_pose(self.segment_start.lerp(&keyframe.pose, eased));

        let [open, close] = self.config.annotation_window;
        let in_window = self.progress >= open && self.progress < close;
        match (&keyframe.annotation, in_window) {
            (Some(text), true) => {
                overlay.show_annotation(text);
                self.annotation_visible = true;
            }
            _ if self.annotation_visible => {
                overlay.clear_annotation();
                self.annotation_visible = false;
            }
            _ => {}
        }
    }

    fn set_state(&mut self, next: AutopilotState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "autopilot state changed");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}
