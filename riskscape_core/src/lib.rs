//! Riskscape Core - real-time visualization and camera-cinematics engine
//! for time-sliced transaction/entity risk graphs.
//!
//! The engine turns bucket snapshots into an animated 3D scene:
//! 1. **Layout**: deterministic, hash-jittered placement (lane = jurisdiction,
//!    height = risk, depth band = KYC level)
//! 2. **Nodes**: per-entity current/target visuals, shape batches, selection
//! 3. **Overlays**: tiered edges with dash flow, asset markers with fallback
//! 4. **Autopilot**: keyframe tours over externally ranked targets
//!
//! All state advances in one ordered tick ([`Scene::tick`]). Anything that
//! can suspend goes through the `riskscape_env` boundary and is polled back
//! through [`pending::PendingSlot`]s.

pub mod assets;
pub mod autopilot;
pub mod camera;
pub mod config;
pub mod edges;
pub mod error;
pub mod frame;
pub mod layout;
pub mod lookup;
pub mod nodes;
pub mod overlay;
pub mod palette;
pub mod pending;
pub mod scene;
pub mod shapes;
pub mod visual;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use assets::{AssetConfig, AssetOverlay, AssetPlacement, AssetVisual, ProceduralShape};
pub use autopilot::{plan_tour, AutopilotConfig, AutopilotController, AutopilotState, Keyframe};
pub use camera::{CameraPose, CameraRig, Easing};
pub use config::EngineConfig;
pub use edges::{EdgeConfig, EdgeMode, EdgeRenderer};
pub use error::VizError;
pub use frame::FrameView;
pub use layout::{LayoutConfig, LayoutEngine};
pub use lookup::{PositionLookup, RiskLookup};
pub use nodes::{NodeConfig, NodeVisualLayer};
pub use overlay::{MemoryOverlay, OverlaySurface};
pub use palette::{RiskGradient, Rgb};
pub use scene::Scene;
pub use shapes::{DrawSlot, ShapeKind};
pub use visual::EntityVisualState;

#[cfg(feature = "visualization")]
pub use visualization::RerunVisualizer;
