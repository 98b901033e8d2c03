//! Scenario catalogue for the deterministic harness.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// RS-001: full autopilot tour over the riskiest bucket
    Tour,

    /// RS-002: scrub through every bucket while transitions are in flight
    BucketScrub,

    /// RS-003: backend returns no targets
    EmptyTargets,

    /// RS-004: target fetch fails
    FetchFailure,

    /// RS-005: asset resources unreachable, procedural markers stay up
    AssetFallback,

    /// RS-006: neighbourhood + counterfactual overlay on the top entity
    Counterfactual,

    /// RS-007: pause and resume mid-tour
    PauseResume,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Tour,
            ScenarioId::BucketScrub,
            ScenarioId::EmptyTargets,
            ScenarioId::FetchFailure,
            ScenarioId::AssetFallback,
            ScenarioId::Counterfactual,
            ScenarioId::PauseResume,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Tour => "tour",
            ScenarioId::BucketScrub => "bucket_scrub",
            ScenarioId::EmptyTargets => "empty_targets",
            ScenarioId::FetchFailure => "fetch_failure",
            ScenarioId::AssetFallback => "asset_fallback",
            ScenarioId::Counterfactual => "counterfactual",
            ScenarioId::PauseResume => "pause_resume",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Tour => "Autopilot visits every target, then hands the camera back",
            ScenarioId::BucketScrub => "Step through all buckets; entities persist and transitions settle",
            ScenarioId::EmptyTargets => "No targets: notice shown, autopilot stays idle",
            ScenarioId::FetchFailure => "Target fetch errors: notice shown, input restored",
            ScenarioId::AssetFallback => "Unreachable resources keep procedural markers",
            ScenarioId::Counterfactual => "Flow edges, then the removed-edge overlay",
            ScenarioId::PauseResume => "Pause freezes the tour, resume continues from the same keyframe",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tour" | "rs-001" => Ok(ScenarioId::Tour),
            "bucket_scrub" | "scrub" | "rs-002" => Ok(ScenarioId::BucketScrub),
            "empty_targets" | "empty" | "rs-003" => Ok(ScenarioId::EmptyTargets),
            "fetch_failure" | "rs-004" => Ok(ScenarioId::FetchFailure),
            "asset_fallback" | "rs-005" => Ok(ScenarioId::AssetFallback),
            "counterfactual" | "rs-006" => Ok(ScenarioId::Counterfactual),
            "pause_resume" | "rs-007" => Ok(ScenarioId::PauseResume),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
