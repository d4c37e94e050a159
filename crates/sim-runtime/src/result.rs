use serde::Serialize;
use sim_core::BigNum;

/// Why the depth walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// One window took longer than the stall ceiling.
    Stalled,
    /// The reward/time ratio fell below the configured fraction of its best.
    RatioDecline,
    /// The configured depth bound was reached.
    DepthLimit,
}

/// `Low` marks results computed without starting currency because the
/// catalog has no bootstrap character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Normal,
    Low,
}

/// One evaluated depth window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowRecord {
    pub depth: u64,
    pub secs: f64,
    pub elapsed_secs: f64,
    pub damage: BigNum,
    pub target: BigNum,
    pub currency: BigNum,
    pub reward: BigNum,
    pub ratio: f64,
    pub levels_purchased: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulateResult {
    /// Depth of the best reward/time ratio seen.
    pub depth: u64,
    pub elapsed_secs: f64,
    pub reward: BigNum,
    pub ratio: f64,
    pub start_depth: u64,
    /// Last depth the walk evaluated.
    pub last_depth: u64,
    pub stop_reason: StopReason,
    pub confidence: Confidence,
    /// Whether the planner ever ran instead of the bootstrap power law.
    pub optimizer_engaged: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<WindowRecord>,
}

impl SimulateResult {
    /// Ordering used to pick between runs: higher ratio first, then deeper.
    pub fn beats(&self, other: &SimulateResult) -> bool {
        match self.ratio.total_cmp(&other.ratio) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.depth > other.depth,
        }
    }
}
