//! Riskscape Deterministic Simulation Harness
//!
//! Runs the visualization engine headless against a seeded synthetic
//! backend, so interaction flows can be checked without a window or a
//! server.
//!
//! # Core Principle
//!
//! Every source of non-determinism is pinned down:
//! - **Time**: a virtual clock that advances one fixed frame per tick
//! - **Tasks**: background fetches run on a current-thread runtime and only
//!   progress when the harness yields between frames
//! - **Data**: every bucket, target list and counterfactual derives from a
//!   single 64-bit seed
//!
//! ```text
//!  ┌──────────────────────── ScenarioRunner ────────────────────────┐
//!  │                                                                 │
//!  │  SyntheticDataset ──► Scene<SimContext> ──► FrameView ──► export │
//!  │  SimAssetLoader   ──►       ▲                                   │
//!  │                             │ tick(1/60)                        │
//!  │                         frame clock                             │
//!  └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use riskscape_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Tour);
//! assert!(result.passed);
//! ```

mod assets;
mod context;
mod dataset;
mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod visualizer;

pub use assets::SimAssetLoader;
pub use context::SimContext;
pub use dataset::{DatasetConfig, SyntheticDataset, MAX_REMOVED_EDGES, MAX_TARGETS};
pub use error::{ensure, SimError};
pub use exporter::FrameExport;
pub use runner::{ScenarioResult, ScenarioRunner, TICK_RATE_HZ};
pub use scenarios::ScenarioId;
pub use visualizer::RerunLogger;
