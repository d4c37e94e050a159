use serde::{Deserialize, Serialize};

/// Run-level knobs for the session simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Per-window target damage as a multiple of boss health.
    pub target_boss_multiple: f64,
    /// Stop once the reward/time ratio falls below this fraction of the best.
    pub stop_ratio: f64,
    /// A window slower than this counts as stalled progress.
    pub stall_ceiling_secs: f64,
    /// Hard upper bound on the depth walk.
    pub max_depth: u64,
    /// Keep one record per evaluated window in the result.
    pub record_trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target_boss_multiple: 30.0,
            stop_ratio: 0.8,
            stall_ceiling_secs: 1800.0,
            max_depth: 100_000,
            record_trace: false,
        }
    }
}

impl SimConfig {
    /// Returns a description of the first invalid field, if any.
    pub fn problem(&self) -> Option<&'static str> {
        if !(self.target_boss_multiple.is_finite() && self.target_boss_multiple > 0.0) {
            return Some("target_boss_multiple must be > 0");
        }
        if !(0.0..=1.0).contains(&self.stop_ratio) {
            return Some("stop_ratio must be in [0, 1]");
        }
        if !(self.stall_ceiling_secs > 0.0) {
            return Some("stall_ceiling_secs must be > 0");
        }
        if self.max_depth == 0 {
            return Some("max_depth must be > 0");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let c: SimConfig = serde_yaml::from_str("stop_ratio: 0.5").unwrap();
        assert_eq!(c.stop_ratio, 0.5);
        assert_eq!(c.target_boss_multiple, 30.0);
        assert!(c.problem().is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let c = SimConfig {
            stop_ratio: 1.5,
            ..SimConfig::default()
        };
        assert!(c.problem().is_some());
        let c = SimConfig {
            max_depth: 0,
            ..SimConfig::default()
        };
        assert!(c.problem().is_some());
    }
}
