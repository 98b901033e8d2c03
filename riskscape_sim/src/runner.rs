//! Scenario runner - drives a headless scene through scripted sessions.
//!
//! Every scenario runs on a fresh current-thread Tokio runtime. Work the
//! scene spawns (target fetches, asset loads) only progresses when the
//! harness yields between frames, so the interleaving is the same on every
//! run with the same seed.

use crate::assets::SimAssetLoader;
use crate::context::SimContext;
use crate::dataset::{DatasetConfig, SyntheticDataset};
use crate::error::{ensure, SimError};
use crate::exporter::FrameExport;
use crate::scenarios::ScenarioId;
use crate::visualizer::RerunLogger;

use riskscape_core::{AutopilotState, EdgeMode, EngineConfig, MemoryOverlay, Scene};
use riskscape_env::{AssetEvent, AssetKind, DataClient, TargetKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Simulated frame rate.
pub const TICK_RATE_HZ: u32 = 60;

/// Resource the simulated loader can resolve.
pub const REACHABLE_ASSET: &str = "assets/cluster_0.glb";

/// Simulated seconds allowed for a snapshot's transitions to land.
const SETTLE_TIMEOUT_SECS: f32 = 6.0;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Frames ticked
    pub frames: u64,

    /// Scene time at the end of the run
    pub final_time_secs: f32,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Entities in the synthetic dataset
    entities: usize,

    /// Time buckets in the synthetic dataset
    buckets: u32,

    /// Maximum simulated duration in seconds
    max_duration_secs: f32,

    config: EngineConfig,

    /// Stream frames to a Rerun viewer
    visualize: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            entities: 200,
            buckets: 6,
            max_duration_secs: 120.0,
            config: EngineConfig::default(),
            visualize: false,
        }
    }

    pub fn with_entities(mut self, entities: usize) -> Self {
        self.entities = entities.max(4);
        self
    }

    pub fn with_buckets(mut self, buckets: u32) -> Self {
        self.buckets = buckets.max(2);
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f32) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_visualizer(mut self, enabled: bool) -> Self {
        self.visualize = enabled;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).0
    }

    /// Runs a scenario, recording every `every`-th frame to `path`.
    pub fn run_with_export(
        &self,
        scenario: ScenarioId,
        every: u64,
        path: impl AsRef<Path>,
    ) -> Result<ScenarioResult, SimError> {
        let (result, export) = self.execute(scenario, Some(every.max(1)));
        if let Some(export) = export {
            export.write_to_file(path.as_ref())?;
            info!(
                frames = export.frames.len(),
                path = %path.as_ref().display(),
                "frames exported"
            );
        }
        Ok(result)
    }

    fn execute(&self, scenario: ScenarioId, record_every: Option<u64>) -> (ScenarioResult, Option<FrameExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let runtime = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(e) => return (self.result(scenario, 0, 0.0, Err(SimError::Io(e))), None),
        };

        runtime.block_on(async {
            let mut harness = match Harness::new(self, scenario, record_every) {
                Ok(harness) => harness,
                Err(e) => return (self.result(scenario, 0, 0.0, Err(e)), None),
            };

            let verdict = match scenario {
                ScenarioId::Tour => harness.tour().await,
                ScenarioId::BucketScrub => harness.bucket_scrub().await,
                ScenarioId::EmptyTargets => harness.empty_targets().await,
                ScenarioId::FetchFailure => harness.fetch_failure().await,
                ScenarioId::AssetFallback => harness.asset_fallback().await,
                ScenarioId::Counterfactual => harness.counterfactual().await,
                ScenarioId::PauseResume => harness.pause_resume().await,
            };

            let result = self.result(
                scenario,
                harness.scene.frame_index(),
                harness.scene.time(),
                verdict,
            );
            harness.logger.log_message(&match &result.failure_reason {
                None => format!("{} passed", scenario),
                Some(reason) => format!("{} failed: {}", scenario, reason),
            });
            let export = harness.export.map(|mut export| {
                export.finalize(result.passed, result.failure_reason.clone());
                export
            });
            (result, export)
        })
    }

    fn result(&self, scenario: ScenarioId, frames: u64, time: f32, verdict: Result<(), SimError>) -> ScenarioResult {
        let failure_reason = match verdict {
            Ok(()) => None,
            Err(e) => {
                warn!(scenario = scenario.name(), error = %e, "scenario failed");
                Some(e.to_string())
            }
        };
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            frames,
            final_time_secs: time,
            failure_reason,
        }
    }
}

/// A scene wired to simulated collaborators, plus the frame clock.
struct Harness {
    ctx: Arc<SimContext>,
    data: Arc<SyntheticDataset>,
    loader: Arc<SimAssetLoader>,
    scene: Scene<SimContext>,
    dt: f32,
    budget_frames: u64,
    record_every: u64,
    export: Option<FrameExport>,
    logger: RerunLogger,
}

impl Harness {
    fn new(runner: &ScenarioRunner, scenario: ScenarioId, record_every: Option<u64>) -> Result<Self, SimError> {
        // Decorrelate the data stream from the context seed
        let data_seed = runner.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let ctx = SimContext::shared(runner.seed);
        let data = Arc::new(SyntheticDataset::generate(DatasetConfig {
            seed: data_seed,
            entities: runner.entities,
            buckets: runner.buckets,
            ..Default::default()
        }));
        let loader = Arc::new(SimAssetLoader::with_reachable([REACHABLE_ASSET]));

        let scene = Scene::new(
            Arc::clone(&ctx),
            Arc::clone(&data) as Arc<dyn DataClient>,
            Arc::clone(&loader) as Arc<dyn riskscape_env::AssetLoader>,
            runner.config.clone(),
            Box::new(MemoryOverlay::new()),
        )?;

        let logger = if runner.visualize {
            RerunLogger::new(&format!("riskscape-sim/{}", scenario.name()))
        } else {
            RerunLogger::disabled()
        };
        logger.log_lanes(&runner.config.layout);

        let dt = 1.0 / TICK_RATE_HZ as f32;
        Ok(Self {
            ctx,
            data,
            loader,
            scene,
            dt,
            budget_frames: (runner.max_duration_secs.max(0.0) * TICK_RATE_HZ as f32).ceil() as u64,
            record_every: record_every.unwrap_or(u64::MAX),
            export: record_every.map(|_| FrameExport::new(scenario.name(), runner.seed)),
            logger,
        })
    }

    // ------------------------------------------------------------------
    // Frame clock
    // ------------------------------------------------------------------

    async fn step(&mut self) -> Result<(), SimError> {
        if self.scene.frame_index() >= self.budget_frames {
            return Err(SimError::Check(format!(
                "time budget exhausted after {} frames",
                self.budget_frames
            )));
        }

        // Let spawned fetches and loads run before the tick polls them
        tokio::task::yield_now().await;
        self.scene.tick(self.dt);
        self.ctx.advance_time(Duration::from_secs_f32(self.dt));

        let index = self.scene.frame_index();
        if index % self.record_every == 0 || (self.logger.is_enabled() && index % 6 == 0) {
            let frame = self.scene.frame();
            self.logger.log_frame(&frame);
            if let Some(export) = self.export.as_mut() {
                export.add_frame(frame);
            }
        }
        Ok(())
    }

    async fn run_for(&mut self, secs: f32) -> Result<(), SimError> {
        let frames = (secs / self.dt).ceil() as u64;
        for _ in 0..frames {
            self.step().await?;
        }
        Ok(())
    }

    /// Steps until `done` holds, failing after `max_secs`.
    async fn run_until<F>(&mut self, max_secs: f32, what: &str, done: F) -> Result<(), SimError>
    where
        F: Fn(&Scene<SimContext>) -> bool,
    {
        let frames = (max_secs / self.dt).ceil() as u64;
        for _ in 0..frames {
            if done(&self.scene) {
                return Ok(());
            }
            self.step().await?;
        }
        ensure(done(&self.scene), || format!("{} not reached within {:.1}s", what, max_secs))
    }

    fn focus_bucket(&self) -> u32 {
        self.data.bucket_count().saturating_sub(1).min(2)
    }

    async fn load_focus_bucket(&mut self) -> Result<u32, SimError> {
        let bucket = self.focus_bucket();
        let stats = self.scene.load_bucket(bucket).await?;
        debug!(bucket, spawned = stats.spawned, "bucket loaded");
        self.run_until(SETTLE_TIMEOUT_SECS, "node transitions settled", |s| s.nodes().is_settled())
            .await?;
        Ok(bucket)
    }

    fn notices(&self) -> Vec<String> {
        self.scene.overlay().notices().iter().map(|n| n.text.clone()).collect()
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    /// RS-001: a full tour, start to finish.
    async fn tour(&mut self) -> Result<(), SimError> {
        let bucket = self.load_focus_bucket().await?;
        let mut state_rx = self.scene.subscribe();
        let targets = self.data.rank_targets(bucket)?;

        ensure(self.scene.start_autopilot(), || "start request rejected".into())?;
        self.run_until(1.0, "tour running", |s| s.autopilot().state() == AutopilotState::Running)
            .await?;
        ensure(*state_rx.borrow_and_update() == AutopilotState::Running, || {
            "state channel did not publish Running".into()
        })?;
        ensure(!self.scene.camera().input_enabled(), || "user input enabled during tour".into())?;

        let keyframes = self.scene.autopilot().keyframes().to_vec();
        let expected = targets.len().min(self.scene.config().autopilot.max_targets) * 3 + 2;
        ensure(keyframes.len() == expected, || {
            format!("planned {} keyframes, expected {}", keyframes.len(), expected)
        })?;
        let total: f32 = keyframes.iter().map(|k| k.duration).sum();
        info!(bucket, targets = targets.len(), seconds = total, "tour planned");

        let mut annotated = 0usize;
        let mut last_index = 0;
        let frames = ((total + 2.0) / self.dt).ceil() as u64;
        for _ in 0..frames {
            if self.scene.autopilot().state() == AutopilotState::Idle {
                break;
            }
            let index = self.scene.autopilot().current_index();
            ensure(index >= last_index, || "keyframe index went backwards".into())?;
            last_index = index;
            if self.scene.overlay().annotation().is_some() {
                annotated += 1;
            }
            self.step().await?;
        }

        ensure(self.scene.autopilot().state() == AutopilotState::Idle, || {
            format!("tour still {} after {:.1}s", self.scene.autopilot().state(), total + 2.0)
        })?;
        ensure(*state_rx.borrow_and_update() == AutopilotState::Idle, || {
            "state channel did not publish Idle".into()
        })?;
        ensure(annotated > 0, || "no annotation was ever shown".into())?;
        ensure(self.scene.overlay().annotation().is_none(), || "annotation left on screen".into())?;
        ensure(self.scene.camera().input_enabled(), || "camera input not handed back".into())?;

        let closing = keyframes.last().map(|k| k.pose);
        ensure(closing == Some(self.scene.camera().pose()), || {
            "camera did not land exactly on the closing pose".into()
        })
    }

    /// RS-002: rapid bucket changes with transitions still in flight.
    async fn bucket_scrub(&mut self) -> Result<(), SimError> {
        let entities = self.data.config().entities;
        self.scene.load_bucket(0).await?;
        self.run_for(0.5).await?;

        let watched = self.scene.nodes().ids().next().map(str::to_string);
        ensure(self.scene.select(watched.as_deref()), || "selection rejected".into())?;
        if let Some(id) = watched.as_deref() {
            self.scene
                .place_asset("beacon_scrub", None, AssetKind::Beacon, &[id.to_string()], 0);
        }

        for bucket in 1..self.data.bucket_count() {
            let before: Vec<_> = self
                .scene
                .nodes()
                .ids()
                .filter_map(|id| self.scene.nodes().state(id).map(|s| (id.to_string(), s.position.current())))
                .collect();
            let stats = self.scene.load_bucket(bucket).await?;
            let jumped = before
                .iter()
                .filter(|(id, p)| self.scene.nodes().state(id).map(|s| s.position.current()) != Some(*p))
                .count();
            ensure(jumped == 0, || format!("{} entities jumped on entering bucket {}", jumped, bucket))?;
            ensure(stats.persisted == entities && stats.spawned == 0 && stats.dropped == 0, || {
                format!("bucket {} churned entities: {:?}", bucket, stats)
            })?;
            ensure(self.scene.assets().is_empty(), || {
                format!("markers from an older bucket survived into bucket {}", bucket)
            })?;
            self.run_for(0.2).await?;

            let frame = self.scene.frame();
            ensure(frame.entity_count() == entities, || {
                format!("frame drew {} of {} entities", frame.entity_count(), entities)
            })?;
            let finite = frame
                .batches
                .iter()
                .flat_map(|b| &b.instances)
                .all(|i| i.position.iter().all(|c| c.is_finite()) && i.scale.is_finite());
            ensure(finite, || format!("non-finite instance data in bucket {}", bucket))?;
        }

        ensure(self.scene.nodes().selected() == watched.as_deref(), || {
            "selection lost across buckets".into()
        })?;
        self.run_until(SETTLE_TIMEOUT_SECS, "transitions settled", |s| s.nodes().is_settled())
            .await
    }

    /// RS-003: the backend has nothing to visit.
    async fn empty_targets(&mut self) -> Result<(), SimError> {
        self.data.set_suppress_targets(true);
        let bucket = self.load_focus_bucket().await?;
        let before = self.scene.camera().pose();

        ensure(self.scene.start_autopilot(), || "start request rejected".into())?;
        self.run_for(0.5).await?;

        let expected = format!("No investigation targets for bucket {}", bucket);
        ensure(self.notices().contains(&expected), || {
            format!("missing notice {:?}, have {:?}", expected, self.notices())
        })?;
        ensure(self.scene.autopilot().state() == AutopilotState::Idle, || "autopilot left idle".into())?;
        ensure(self.scene.camera().input_enabled(), || "camera input disabled".into())?;
        ensure(self.scene.camera().pose() == before, || "camera moved without a tour".into())
    }

    /// RS-004: target fetch and snapshot fetch both fail.
    async fn fetch_failure(&mut self) -> Result<(), SimError> {
        let bucket = self.load_focus_bucket().await?;
        let entities = self.scene.nodes().len();

        self.data.set_fail_targets(true);
        ensure(self.scene.start_autopilot(), || "start request rejected".into())?;
        self.run_for(0.5).await?;

        ensure(
            self.notices().iter().any(|n| n.starts_with("Autopilot unavailable")),
            || format!("no failure notice, have {:?}", self.notices()),
        )?;
        ensure(self.scene.autopilot().state() == AutopilotState::Idle, || "autopilot left idle".into())?;
        ensure(!self.scene.autopilot().is_fetching(), || "fetch still marked in flight".into())?;
        ensure(self.scene.camera().input_enabled(), || "camera input disabled".into())?;

        self.data.set_fail_snapshots(true);
        let next = (bucket + 1) % self.data.bucket_count();
        ensure(self.scene.load_bucket(next).await.is_err(), || "failing snapshot applied".into())?;
        ensure(self.scene.bucket() == Some(bucket) && self.scene.nodes().len() == entities, || {
            "scene changed after a failed snapshot load".into()
        })?;

        // Recovery once the backend is back
        self.data.set_fail_targets(false);
        self.data.set_fail_snapshots(false);
        self.run_for(self.scene.config().autopilot.notice_ttl + 0.1).await?;
        ensure(self.notices().is_empty(), || "notices did not expire".into())?;
        ensure(self.scene.start_autopilot(), || "restart rejected".into())?;
        self.run_until(1.0, "tour running after recovery", |s| {
            s.autopilot().state() == AutopilotState::Running
        })
        .await
    }

    /// RS-005: reachable, unreachable and fallback markers side by side.
    async fn asset_fallback(&mut self) -> Result<(), SimError> {
        let bucket = self.load_focus_bucket().await?;
        let targets = self.data.rank_targets(bucket)?;
        let members = targets
            .iter()
            .find(|t| t.kind == TargetKind::Cluster)
            .or_else(|| targets.first())
            .map(|t| t.entity_ids.clone())
            .unwrap_or_default();
        let single = members.first().cloned().unwrap_or_default();

        let events = [
            AssetEvent::Ready {
                asset_id: "cluster_0".into(),
                asset_type: AssetKind::ClusterMarker,
                bucket,
                url: REACHABLE_ASSET.into(),
                entity_ids: members.clone(),
            },
            AssetEvent::Ready {
                asset_id: "beacon_1".into(),
                asset_type: AssetKind::Beacon,
                bucket,
                url: "assets/beacon_1.glb".into(),
                entity_ids: vec![single.clone()],
            },
            AssetEvent::Fallback {
                asset_id: "beacon_2".into(),
                asset_type: AssetKind::Beacon,
                bucket,
                entity_ids: Vec::new(),
                entity_id: Some(single.clone()),
                risk_score: 0.9,
            },
        ];
        for event in &events {
            self.scene.handle_asset_event(event);
        }
        ensure(self.scene.assets().len() == 3, || "markers not placed immediately".into())?;

        // Removed before its load lands: the late result must be dropped
        self.scene
            .place_asset("doomed", Some(REACHABLE_ASSET), AssetKind::Beacon, &[single.clone()], bucket);
        ensure(self.scene.remove_asset("doomed"), || "remove failed".into())?;

        self.run_until(1.0, "asset loads settled", |s| s.assets().pending_loads() == 0)
            .await?;
        self.run_for(0.1).await?;

        let instances = self.scene.frame().assets;
        let find = |id: &str| instances.iter().find(|i| i.asset_id == id);
        ensure(find("doomed").is_none(), || "removed marker came back".into())?;
        ensure(
            find("cluster_0").and_then(|i| i.resource_ref.as_deref()) == Some(REACHABLE_ASSET),
            || "reachable resource not swapped in".into(),
        )?;
        for id in ["beacon_1", "beacon_2"] {
            ensure(find(id).is_some_and(|i| i.procedural.is_some()), || {
                format!("{} lost its procedural stand-in", id)
            })?;
        }
        ensure(self.loader.loads() == 3, || format!("{} load attempts, expected 3", self.loader.loads()))?;

        let anchor = self.scene.nodes().position(&single);
        let marker = find("beacon_2").map(|i| i.position[1]);
        ensure(
            matches!((anchor, marker), (Some(a), Some(y)) if y > a.y),
            || "beacon not floating above its entity".into(),
        )?;

        let next = (bucket + 1) % self.data.bucket_count();
        self.scene.load_bucket(next).await?;
        ensure(self.scene.assets().is_empty(), || "markers survived a bucket change".into())
    }

    /// RS-006: neighbourhood flow edges, then the counterfactual overlay.
    async fn counterfactual(&mut self) -> Result<(), SimError> {
        let bucket = self.load_focus_bucket().await?;
        let center = self
            .data
            .rank_targets(bucket)?
            .into_iter()
            .find(|t| t.kind == TargetKind::Entity)
            .map(|t| t.id)
            .ok_or_else(|| SimError::Check("no entity target to explain".into()))?;

        let drawn = self.scene.load_neighborhood(&center, 2).await?;
        ensure(drawn > 0, || format!("no neighbourhood edges around {}", center))?;
        ensure(self.scene.edges().mode() == EdgeMode::Flow, || "expected flow mode".into())?;

        let offset = self.scene.edges().dash_offset();
        self.run_for(0.25).await?;
        ensure(self.scene.edges().dash_offset() != offset, || "dashes not animating".into())?;

        let explanation = self.data.explain(&center, bucket)?;
        ensure(explanation.counterfactual_risk <= explanation.original_risk, || {
            "counterfactual raised risk".into()
        })?;
        let removed = self.scene.load_counterfactual(&center).await?;
        ensure(removed == explanation.removed_edges.len(), || {
            format!("drew {} of {} removed edges", removed, explanation.removed_edges.len())
        })?;
        ensure(self.scene.edges().mode() == EdgeMode::Counterfactual, || {
            "expected counterfactual mode".into()
        })?;
        self.run_for(0.25).await?;
        ensure(self.scene.frame().edge_count() == removed, || "edge count drifted".into())?;

        self.scene.clear_edges();
        self.run_for(0.1).await?;
        ensure(self.scene.frame().edge_count() == 0, || "edges survived clear".into())
    }

    /// RS-007: pause hands the camera back, resume continues the tour.
    async fn pause_resume(&mut self) -> Result<(), SimError> {
        self.load_focus_bucket().await?;
        ensure(self.scene.start_autopilot(), || "start request rejected".into())?;
        self.run_until(1.0, "tour running", |s| s.autopilot().state() == AutopilotState::Running)
            .await?;
        self.run_for(1.5).await?;

        ensure(self.scene.pause_autopilot(), || "pause rejected".into())?;
        ensure(!self.scene.pause_autopilot(), || "double pause accepted".into())?;
        let index = self.scene.autopilot().current_index();
        let pose = self.scene.camera().pose();

        self.run_for(1.0).await?;
        ensure(self.scene.camera().pose() == pose, || "camera moved while paused".into())?;
        ensure(self.scene.autopilot().current_index() == index, || "tour advanced while paused".into())?;
        ensure(self.scene.camera_mut().orbit(0.3, 0.1), || "user orbit refused while paused".into())?;
        let nudged = self.scene.camera().pose();

        ensure(self.scene.resume_autopilot(), || "resume rejected".into())?;
        ensure(!self.scene.camera().input_enabled(), || "input still enabled after resume".into())?;
        ensure(!self.scene.camera_mut().orbit(0.3, 0.0), || "user orbit accepted while running".into())?;
        self.run_for(0.5).await?;
        ensure(self.scene.camera().pose() != nudged, || "tour did not continue".into())?;
        ensure(self.scene.autopilot().current_index() >= index, || "tour restarted".into())?;

        self.scene.toggle_autopilot();
        ensure(self.scene.autopilot().state() == AutopilotState::Idle, || "toggle did not stop".into())?;
        ensure(self.scene.camera().input_enabled(), || "input not restored after stop".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(42).with_entities(80).with_buckets(4)
    }

    #[test]
    fn test_tour_scenario() {
        let result = runner().run(ScenarioId::Tour);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.frames > 0);
    }

    #[test]
    fn test_bucket_scrub_scenario() {
        let result = runner().run(ScenarioId::BucketScrub);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_empty_and_failing_targets() {
        for scenario in [ScenarioId::EmptyTargets, ScenarioId::FetchFailure] {
            let result = runner().run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_asset_fallback_scenario() {
        let result = runner().run(ScenarioId::AssetFallback);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_counterfactual_scenario() {
        let result = runner().run(ScenarioId::Counterfactual);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_pause_resume_scenario() {
        let result = runner().run(ScenarioId::PauseResume);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_deterministic() {
        let a = runner().run(ScenarioId::Tour);
        let b = runner().run(ScenarioId::Tour);
        assert_eq!(a.frames, b.frames);
        assert_eq!(a.final_time_secs, b.final_time_secs);
    }

    #[test]
    fn test_budget_exhaustion_fails() {
        let result = runner().with_duration(0.5).run(ScenarioId::Tour);
        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("budget"));
    }

    #[test]
    fn test_export_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scrub.json");
        let result = runner()
            .run_with_export(ScenarioId::BucketScrub, 10, &path)
            .unwrap();
        assert!(result.passed);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scenario"], "bucket_scrub");
        assert_eq!(value["passed"], true);
        assert!(!value["frames"].as_array().unwrap().is_empty());
    }
}
