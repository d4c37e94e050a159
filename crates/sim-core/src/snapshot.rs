//! Per-run inputs supplied by the caller: the player's progress snapshot and
//! an optional active-play schedule.

use crate::bignum::BigNum;
use crate::catalog::{AchievementId, UnlockId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Parsed player progress. Absent fields mean zero or empty, never an error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub unlock_levels: BTreeMap<UnlockId, u64>,
    /// Bonus levels granted by owned items, keyed by the unlock they boost.
    #[serde(default)]
    pub item_levels: BTreeMap<UnlockId, u64>,
    #[serde(default)]
    pub achievements: BTreeSet<AchievementId>,
    /// Accumulated reward currency; drives the prestige damage multiplier.
    #[serde(default)]
    pub reward_total: BigNum,
    /// Premium purchase that doubles damage.
    #[serde(default)]
    pub premium_damage: bool,
}

impl Snapshot {
    pub fn unlock_level(&self, id: UnlockId) -> u64 {
        self.unlock_levels.get(&id).copied().unwrap_or(0)
    }

    /// Unlock level plus item bonus levels.
    pub fn effective_level(&self, id: UnlockId) -> u64 {
        self.unlock_level(id)
            .saturating_add(self.item_levels.get(&id).copied().unwrap_or(0))
    }
}

/// Active-ability combo categories a cooldown plan can schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboCategory {
    /// Temporary damage multiplier.
    DamageBurst,
    /// Automated clicking only.
    ClickStorm,
    /// Temporary gold multiplier.
    GoldRush,
    /// Clicks that also yield gold.
    GoldenClicks,
}

/// How often a combo is used and how fast the player clicks during it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboUsage {
    pub uses_per_30_min: f64,
    pub clicks_per_second: f64,
}

/// Active-play schedule. An absent or empty plan means idle play.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownPlan {
    #[serde(default)]
    pub combos: BTreeMap<ComboCategory, ComboUsage>,
}

const HALF_HOUR_SECS: f64 = 1800.0;

impl CooldownPlan {
    pub fn is_idle(&self) -> bool {
        self.combos.is_empty()
    }

    /// Fraction of a half hour the combo is active, capped at 1.
    pub fn uptime(&self, category: ComboCategory, duration_secs: f64) -> f64 {
        self.combos
            .get(&category)
            .map(|u| (u.uses_per_30_min * duration_secs / HALF_HOUR_SECS).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Every entry must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.combos.values().all(|u| {
            u.uses_per_30_min.is_finite()
                && u.clicks_per_second.is_finite()
                && u.uses_per_30_min >= 0.0
                && u.clicks_per_second >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_level_adds_item_levels() {
        let mut s = Snapshot::default();
        s.unlock_levels.insert(UnlockId(4), 10);
        s.item_levels.insert(UnlockId(4), 3);
        s.item_levels.insert(UnlockId(5), 2);
        assert_eq!(s.effective_level(UnlockId(4)), 13);
        assert_eq!(s.effective_level(UnlockId(5)), 2);
        assert_eq!(s.unlock_level(UnlockId(5)), 0);
    }

    #[test]
    fn empty_snapshot_deserializes() {
        let s: Snapshot = serde_yaml::from_str("{}").unwrap();
        assert!(s.reward_total.is_zero());
        assert!(s.achievements.is_empty());
        let j: Snapshot =
            serde_json::from_str(r#"{"unlock_levels":{"3":12},"reward_total":"1e20"}"#).unwrap();
        assert_eq!(j.unlock_level(UnlockId(3)), 12);
        assert_eq!(j.reward_total.exponent(), 20);
    }

    #[test]
    fn uptime_is_capped() {
        let mut plan = CooldownPlan::default();
        assert!(plan.is_idle());
        plan.combos.insert(
            ComboCategory::DamageBurst,
            ComboUsage {
                uses_per_30_min: 2.0,
                clicks_per_second: 10.0,
            },
        );
        plan.combos.insert(
            ComboCategory::ClickStorm,
            ComboUsage {
                uses_per_30_min: 100.0,
                clicks_per_second: 10.0,
            },
        );
        assert!((plan.uptime(ComboCategory::DamageBurst, 30.0) - 60.0 / 1800.0).abs() < 1e-12);
        assert_eq!(plan.uptime(ComboCategory::ClickStorm, 30.0), 1.0);
        assert_eq!(plan.uptime(ComboCategory::GoldRush, 30.0), 0.0);
        assert!(plan.is_valid());
    }
}
