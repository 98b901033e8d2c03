//! The scene: every component behind one ordered, single-threaded tick.
//!
//! Tick order:
//! 1. Apply completed target fetches and asset loads
//! 2. Animate nodes
//! 3. Re-anchor and animate edges and asset markers
//! 4. Advance autopilot playback (camera)
//! 5. Age overlay notices

use crate::assets::{AssetOverlay, AssetTicket};
use crate::autopilot::{AutopilotController, AutopilotState, FetchResult, ToggleAction};
use crate::camera::CameraRig;
use crate::config::EngineConfig;
use crate::edges::{validate_edges, EdgeRenderer};
use crate::error::VizError;
use crate::frame::{BatchView, EdgeView, FrameView};
use crate::nodes::{NodeVisualLayer, UpdateStats};
use crate::overlay::OverlaySurface;
use crate::pending::Completer;
use crate::shapes::{DrawSlot, ShapeKind};
use riskscape_env::{
    AssetEvent, AssetKind, AssetLoader, AutopilotTarget, CounterfactualResult, DataClient,
    Neighborhood, Snapshot, VizContext,
};
use std::sync::Arc;
use tokio::sync::watch;

pub struct Scene<C: VizContext> {
    ctx: Arc<C>,
    client: Arc<dyn DataClient>,
    loader: Arc<dyn AssetLoader>,
    config: EngineConfig,

    nodes: NodeVisualLayer,
    edges: EdgeRenderer,
    assets: AssetOverlay,
    autopilot: AutopilotController,
    camera: CameraRig,
    overlay: Box<dyn OverlaySurface>,

    bucket: Option<u32>,
    frame: u64,
    time: f32,
}

impl<C: VizContext> Scene<C> {
    pub fn new(
        ctx: Arc<C>,
        client: Arc<dyn DataClient>,
        loader: Arc<dyn AssetLoader>,
        config: EngineConfig,
        overlay: Box<dyn OverlaySurface>,
    ) -> Result<Self, VizError> {
        config.validate()?;
        tracing::debug!(seed = ctx.seed(), "scene created");
        Ok(Self {
            nodes: NodeVisualLayer::new(config.nodes.clone(), config.layout.clone()),
            edges: EdgeRenderer::new(config.edges.clone()),
            assets: AssetOverlay::new(config.assets.clone()),
            autopilot: AutopilotController::new(config.autopilot.clone()),
            camera: CameraRig::new(config.initial_camera),
            ctx,
            client,
            loader,
            config,
            overlay,
            bucket: None,
            frame: 0,
            time: 0.0,
        })
    }

    // ------------------------------------------------------------------
    // Data ingestion
    // ------------------------------------------------------------------

    /// Applies a bucket snapshot. A malformed snapshot is rejected with the
    /// scene left exactly as it was.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<UpdateStats, VizError> {
        let bucket = snapshot.bucket();
        let stats = match validate_edges(&snapshot.edges).and_then(|_| self.nodes.update(&snapshot.nodes)) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(bucket, error = %e, "snapshot rejected");
                return Err(e);
            }
        };

        if let Some(previous) = self.bucket.filter(|b| *b != bucket) {
            self.assets.clear_bucket(previous);
        }
        self.bucket = Some(bucket);

        let drawn = self.edges.update(&snapshot.edges, &self.nodes, &self.nodes)?;
        tracing::debug!(
            bucket,
            entities = stats.entities,
            edges = drawn,
            skipped_edges = self.edges.skipped(),
            "snapshot applied"
        );
        Ok(stats)
    }

    /// Fetches and applies the snapshot for `bucket`.
    pub async fn load_bucket(&mut self, bucket: u32) -> Result<UpdateStats, VizError> {
        let snapshot = self.client.snapshot(bucket).await?;
        self.apply_snapshot(&snapshot)
    }

    /// Replaces the drawn edges with a neighbourhood query result.
    pub fn apply_neighborhood(&mut self, neighborhood: &Neighborhood) -> Result<usize, VizError> {
        self.edges.update(&neighborhood.edges, &self.nodes, &self.nodes)
    }

    pub async fn load_neighborhood(&mut self, entity_id: &str, hops: u8) -> Result<usize, VizError> {
        let bucket = self.bucket.unwrap_or(0);
        let neighborhood = self.client.neighbors(entity_id, hops, bucket).await?;
        self.apply_neighborhood(&neighborhood)
    }

    /// Draws the edges removed by a counterfactual recomputation.
    pub fn show_counterfactual(&mut self, result: &CounterfactualResult) -> Result<usize, VizError> {
        tracing::info!(
            entity_id = %result.entity_id,
            removed = result.removed_edges.len(),
            delta = result.delta(),
            "showing counterfactual"
        );
        self.edges.show_counterfactual(&result.removed_edges, &self.nodes)
    }

    pub async fn load_counterfactual(&mut self, entity_id: &str) -> Result<usize, VizError> {
        let bucket = self.bucket.unwrap_or(0);
        let result = self.client.counterfactual(entity_id, bucket).await?;
        self.show_counterfactual(&result)
    }

    pub fn clear_edges(&mut self) {
        self.edges.clear();
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    /// Places a marker; a resource reference starts a background load.
    pub fn place_asset(
        &mut self,
        asset_id: &str,
        resource_ref: Option<&str>,
        kind: AssetKind,
        entity_ids: &[String],
        bucket: u32,
    ) {
        if let Some(ticket) = self
            .assets
            .place(asset_id, resource_ref, kind, entity_ids, bucket, &self.nodes)
        {
            self.spawn_load(ticket);
        }
    }

    /// Applies a backend asset broadcast.
    pub fn handle_asset_event(&mut self, event: &AssetEvent) {
        let members = event.members();
        match event {
            AssetEvent::Ready {
                asset_id,
                asset_type,
                bucket,
                url,
                ..
            } => self.place_asset(asset_id, Some(url.as_str()), *asset_type, &members, *bucket),
            AssetEvent::Fallback {
                asset_id,
                asset_type,
                bucket,
                ..
            } => self.place_asset(asset_id, None, *asset_type, &members, *bucket),
        }
    }

    pub fn remove_asset(&mut self, asset_id: &str) -> bool {
        self.assets.remove(asset_id)
    }

    pub fn clear_bucket_assets(&mut self, bucket: u32) -> usize {
        self.assets.clear_bucket(bucket)
    }

    fn spawn_load(&self, ticket: AssetTicket) {
        let loader = Arc::clone(&self.loader);
        self.ctx.spawn("asset-load", async move {
            let AssetTicket {
                asset_id,
                resource_ref,
                completer,
            } = ticket;
            let generation = completer.generation();
            let result = loader.load(&resource_ref).await;
            if !completer.complete(result) {
                tracing::debug!(asset_id = %asset_id, generation, "asset load result discarded");
            }
        });
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&mut self, id: Option<&str>) -> bool {
        self.nodes.select(id)
    }

    /// Pointer picking: selects the entity drawn at `slot`.
    pub fn pick(&mut self, slot: DrawSlot) -> Option<String> {
        let id = self.nodes.entity_id(slot)?.to_string();
        self.nodes.select(Some(&id));
        Some(id)
    }

    // ------------------------------------------------------------------
    // Autopilot
    // ------------------------------------------------------------------

    /// Requests a target list for the current bucket and starts a tour
    /// when it arrives. Rejected unless the autopilot is idle.
    pub fn start_autopilot(&mut self) -> bool {
        let bucket = self.bucket.unwrap_or(0);
        match self.autopilot.request(bucket) {
            Some(completer) => {
                self.spawn_fetch(bucket, completer);
                true
            }
            None => false,
        }
    }

    /// Starts a tour over an already available target list.
    pub fn start_tour(&mut self, targets: &[AutopilotTarget]) -> bool {
        let bucket = self.bucket.unwrap_or(0);
        self.autopilot
            .start(bucket, targets, &self.nodes, &mut self.camera, self.overlay.as_mut())
    }

    pub fn stop_autopilot(&mut self) {
        self.autopilot.stop(&mut self.camera, self.overlay.as_mut());
    }

    pub fn pause_autopilot(&mut self) -> bool {
        self.autopilot.pause(&mut self.camera)
    }

    pub fn resume_autopilot(&mut self) -> bool {
        self.autopilot.resume(&mut self.camera)
    }

    pub fn toggle_autopilot(&mut self) {
        let bucket = self.bucket.unwrap_or(0);
        if let Some(ToggleAction::Fetch(completer)) =
            self.autopilot
                .toggle(bucket, &mut self.camera, self.overlay.as_mut())
        {
            self.spawn_fetch(bucket, completer);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AutopilotState> {
        self.autopilot.subscribe()
    }

    fn spawn_fetch(&self, bucket: u32, completer: Completer<FetchResult>) {
        let client = Arc::clone(&self.client);
        self.ctx.spawn("autopilot-fetch", async move {
            let generation = completer.generation();
            let result = client.autopilot_targets(bucket).await;
            if !completer.complete(result) {
                tracing::debug!(bucket, generation, "stale target list discarded");
            }
        });
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Advances everything by one frame.
    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.autopilot
            .poll_fetch(&self.nodes, &mut self.camera, self.overlay.as_mut());
        self.assets.poll_loads();

        self.nodes.animate(dt);
        self.edges.follow(&self.nodes, &self.nodes);
        self.edges.animate(dt);
        self.assets.follow(&self.nodes);
        self.assets.animate(dt);

        self.autopilot
            .tick(dt, &mut self.camera, self.overlay.as_mut());
        self.overlay.tick(dt);

        self.frame += 1;
        self.time += dt;
    }

    /// Assembles the draw data for the current frame.
    pub fn frame(&self) -> FrameView {
        let (dash, gap) = self.edges.dash_pattern();
        FrameView {
            frame: self.frame,
            time: self.time,
            bucket: self.bucket,
            camera: self.camera.pose(),
            camera_input_enabled: self.camera.input_enabled(),
            autopilot: self.autopilot.state(),
            batches: ShapeKind::ALL
                .iter()
                .map(|&shape| BatchView {
                    shape,
                    instances: self.nodes.instances(shape),
                })
                .collect(),
            halos: self.nodes.glow_billboards(),
            edges: EdgeView {
                mode: self.edges.mode(),
                dash_offset: self.edges.dash_offset(),
                dash_pattern: [dash, gap],
                tiers: self.edges.tiers().to_vec(),
            },
            assets: self.assets.instances(),
            annotation: self.overlay.annotation().map(str::to_string),
            notices: self.overlay.notices().iter().map(|n| n.text.clone()).collect(),
            selected: self.nodes.selected().map(str::to_string),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeVisualLayer {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeRenderer {
        &self.edges
    }

    pub fn assets(&self) -> &AssetOverlay {
        &self.assets
    }

    pub fn autopilot(&self) -> &AutopilotController {
        &self.autopilot
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// User camera controls; moves are ignored while the autopilot drives.
    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn overlay(&self) -> &dyn OverlaySurface {
        self.overlay.as_ref()
    }

    pub fn bucket(&self) -> Option<u32> {
        self.bucket
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetVisual, ProceduralShape};
    use crate::overlay::MemoryOverlay;
    use async_trait::async_trait;
    use riskscape_env::{
        AssetMesh, EdgeSnapshot, EntitySnapshot, EnvError, KycLevel, SnapshotMeta, TargetList,
        TokioContext,
    };

    struct MockClient {
        targets: Vec<AutopilotTarget>,
        fail_targets: bool,
    }

    fn snapshot(bucket: u32) -> Snapshot {
        let risk_shift = bucket as f32 * 0.05;
        Snapshot {
            meta: SnapshotMeta {
                t: bucket,
                n_buckets: 10,
                n_entities: 4,
                n_transactions: 3,
                bucket_size_seconds: 86_400,
            },
            nodes: vec![
                EntitySnapshot::new("a", 0, KycLevel::Standard, 0.1 + risk_shift).with_volume(1_000.0),
                EntitySnapshot::new("b", 1, KycLevel::Enhanced, 0.5).with_type("bank").with_volume(90_000.0),
                EntitySnapshot::new("c", 2, KycLevel::Standard, 0.9).with_type("merchant"),
                EntitySnapshot::new("d", 3, KycLevel::Standard, 0.7 - risk_shift),
            ],
            edges: vec![
                EdgeSnapshot::new("a", "b", 500.0),
                EdgeSnapshot::new("b", "c", 50_000.0),
                EdgeSnapshot::new("c", "ghost", 1.0),
            ],
        }
    }

    #[async_trait]
    impl DataClient for MockClient {
        async fn snapshot(&self, bucket: u32) -> Result<Snapshot, EnvError> {
            if bucket > 9 {
                return Err(EnvError::not_found(format!("snapshot {}", bucket)));
            }
            Ok(snapshot(bucket))
        }

        async fn neighbors(&self, entity_id: &str, hops: u8, _bucket: u32) -> Result<Neighborhood, EnvError> {
            Ok(Neighborhood {
                center_id: entity_id.to_string(),
                k: hops,
                nodes: Vec::new(),
                edges: vec![EdgeSnapshot::new(entity_id, "d", 200_000.0)],
            })
        }

        async fn autopilot_targets(&self, _bucket: u32) -> Result<TargetList, EnvError> {
            if self.fail_targets {
                return Err(EnvError::unreachable("targets endpoint"));
            }
            Ok(TargetList {
                targets: self.targets.clone(),
            })
        }

        async fn counterfactual(&self, entity_id: &str, bucket: u32) -> Result<CounterfactualResult, EnvError> {
            Ok(CounterfactualResult {
                entity_id: entity_id.to_string(),
                bucket,
                original_risk: 0.9,
                counterfactual_risk: 0.3,
                removed_edges: vec![EdgeSnapshot::new("b", entity_id, 50_000.0)],
            })
        }
    }

    struct MockLoader;

    #[async_trait]
    impl AssetLoader for MockLoader {
        async fn load(&self, resource_ref: &str) -> Result<AssetMesh, EnvError> {
            if resource_ref.starts_with("ok/") {
                Ok(AssetMesh {
                    resource_ref: resource_ref.to_string(),
                    vertex_count: 24,
                    byte_len: 864,
                })
            } else {
                Err(EnvError::unreachable(resource_ref))
            }
        }
    }

    fn scene_with(targets: Vec<AutopilotTarget>, fail_targets: bool) -> Scene<TokioContext> {
        Scene::new(
            TokioContext::shared(),
            Arc::new(MockClient { targets, fail_targets }),
            Arc::new(MockLoader),
            EngineConfig::default(),
            Box::new(MemoryOverlay::new()),
        )
        .unwrap()
    }

    fn scene() -> Scene<TokioContext> {
        scene_with(
            vec![
                AutopilotTarget::entity("c", 0.9, "Merchant c", "Structuring"),
                AutopilotTarget::cluster("k", vec!["b".into(), "d".into()], 0.6, "Cluster k", "Ring"),
            ],
            false,
        )
    }

    /// Lets spawned fetches and loads run, then ticks once.
    async fn settle(scene: &mut Scene<TokioContext>) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        scene.tick(1.0 / 60.0);
    }

    #[tokio::test]
    async fn test_load_bucket_builds_frame() {
        let mut scene = scene();
        let stats = scene.load_bucket(2).await.unwrap();
        assert_eq!(stats.entities, 4);

        scene.tick(1.0 / 60.0);
        let frame = scene.frame();
        assert_eq!(frame.bucket, Some(2));
        assert_eq!(frame.entity_count(), 4);
        // The edge to the missing entity is skipped
        assert_eq!(frame.edge_count(), 2);
        assert!(frame.halos.iter().any(|h| h.id == "c"));
        assert_eq!(frame.frame, 1);

        assert!(matches!(scene.load_bucket(42).await, Err(VizError::Env(_))));
        assert_eq!(scene.bucket(), Some(2));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_leaves_scene_intact() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(1)).unwrap();

        let mut bad = snapshot(2);
        bad.edges.push(EdgeSnapshot::new("", "a", 1.0));
        assert!(scene.apply_snapshot(&bad).is_err());

        assert_eq!(scene.bucket(), Some(1));
        assert_eq!(scene.nodes().len(), 4);
        assert_eq!(scene.edges().segment_count(), 2);
    }

    #[tokio::test]
    async fn test_autopilot_fetch_and_tour() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(3)).unwrap();
        let mut rx = scene.subscribe();

        assert!(scene.start_autopilot());
        assert_eq!(scene.autopilot().state(), AutopilotState::Idle);
        settle(&mut scene).await;

        assert_eq!(scene.autopilot().state(), AutopilotState::Running);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AutopilotState::Running);
        assert!(!scene.camera().input_enabled());
        assert!(!scene.start_autopilot());

        let mut frames = 0;
        while scene.autopilot().state() == AutopilotState::Running && frames < 5_000 {
            scene.tick(1.0 / 60.0);
            frames += 1;
        }
        assert_eq!(scene.autopilot().state(), AutopilotState::Idle);
        assert!(scene.camera().input_enabled());
    }

    #[tokio::test]
    async fn test_empty_targets_posts_notice() {
        let mut scene = scene_with(Vec::new(), false);
        scene.apply_snapshot(&snapshot(0)).unwrap();
        let before = scene.camera().pose();

        scene.toggle_autopilot();
        settle(&mut scene).await;

        assert_eq!(scene.autopilot().state(), AutopilotState::Idle);
        assert_eq!(scene.camera().pose(), before);
        assert_eq!(scene.frame().notices.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_recovers_to_idle() {
        let mut scene = scene_with(Vec::new(), true);
        scene.apply_snapshot(&snapshot(0)).unwrap();

        scene.start_autopilot();
        settle(&mut scene).await;

        assert_eq!(scene.autopilot().state(), AutopilotState::Idle);
        assert!(scene.frame().notices[0].contains("unavailable"));
    }

    #[tokio::test]
    async fn test_stop_discards_late_fetch() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(0)).unwrap();

        scene.start_autopilot();
        scene.stop_autopilot();
        settle(&mut scene).await;

        assert_eq!(scene.autopilot().state(), AutopilotState::Idle);
        assert!(scene.autopilot().keyframes().is_empty());
    }

    #[tokio::test]
    async fn test_asset_events() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(5)).unwrap();

        scene.handle_asset_event(&AssetEvent::Ready {
            asset_id: "blob_k".into(),
            asset_type: AssetKind::ClusterMarker,
            bucket: 5,
            url: "ok/blob_k.glb".into(),
            entity_ids: vec!["b".into(), "d".into()],
        });
        scene.handle_asset_event(&AssetEvent::Ready {
            asset_id: "beacon_c".into(),
            asset_type: AssetKind::Beacon,
            bucket: 5,
            url: "missing/beacon_c.glb".into(),
            entity_ids: vec!["c".into()],
        });
        assert_eq!(scene.assets().len(), 2);
        settle(&mut scene).await;

        assert!(matches!(scene.assets().get("blob_k").unwrap().visual, AssetVisual::Loaded(_)));
        assert_eq!(
            scene.assets().get("beacon_c").unwrap().visual,
            AssetVisual::Procedural(ProceduralShape::Pin)
        );
    }

    #[tokio::test]
    async fn test_ready_beacon_anchors_over_its_entity() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(5)).unwrap();

        scene.handle_asset_event(&AssetEvent::Ready {
            asset_id: "beacon_c".into(),
            asset_type: AssetKind::Beacon,
            bucket: 5,
            url: "ok/beacon_c.glb".into(),
            entity_ids: Vec::new(),
        });

        let placement = scene.assets().get("beacon_c").unwrap();
        let entity = scene.nodes().position("c").unwrap();
        assert_eq!(placement.entity_ids, vec!["c".to_string()]);
        assert_eq!(placement.position.x, entity.x);
        assert_eq!(placement.position.z, entity.z);
        assert!(placement.position.y > entity.y);
    }

    #[tokio::test]
    async fn test_bucket_change_clears_previous_assets() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(1)).unwrap();
        scene.handle_asset_event(&AssetEvent::Fallback {
            asset_id: "beacon_c".into(),
            asset_type: AssetKind::Beacon,
            bucket: 1,
            entity_ids: Vec::new(),
            entity_id: Some("c".into()),
            risk_score: 0.9,
        });
        scene.select(Some("c"));

        scene.apply_snapshot(&snapshot(2)).unwrap();
        assert!(scene.assets().is_empty());
        assert_eq!(scene.nodes().selected(), Some("c"));
    }

    #[tokio::test]
    async fn test_pick_selects_entity() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(0)).unwrap();

        let slot = scene.nodes().draw_slot("b").unwrap();
        assert_eq!(slot.shape, ShapeKind::Cube);
        assert_eq!(scene.pick(slot).as_deref(), Some("b"));
        assert_eq!(scene.frame().selected.as_deref(), Some("b"));
        assert_eq!(scene.pick(DrawSlot { shape: ShapeKind::Cube, slot: 9 }), None);
    }

    #[tokio::test]
    async fn test_neighborhood_and_counterfactual() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(0)).unwrap();

        assert_eq!(scene.load_neighborhood("a", 2).await.unwrap(), 1);
        assert_eq!(scene.edges().tiers()[2].segments.len(), 1);

        assert_eq!(scene.load_counterfactual("c").await.unwrap(), 1);
        assert_eq!(scene.frame().edges.mode, crate::edges::EdgeMode::Counterfactual);

        scene.clear_edges();
        assert_eq!(scene.frame().edge_count(), 0);
    }

    #[tokio::test]
    async fn test_user_camera_gated_during_tour() {
        let mut scene = scene();
        scene.apply_snapshot(&snapshot(0)).unwrap();
        scene.start_autopilot();
        settle(&mut scene).await;

        assert!(!scene.camera_mut().dolly(3.0));
        assert!(scene.pause_autopilot());
        assert!(scene.camera_mut().dolly(3.0));
        assert!(scene.resume_autopilot());
    }
}
