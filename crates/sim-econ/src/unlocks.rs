//! Aggregation of permanent unlocks, item levels and achievements from a
//! snapshot into the scalar effects the formulas consume.

use crate::EconError;
use rust_decimal::prelude::ToPrimitive;
use sim_core::{BigNum, Catalog, PermanentUnlock, Scaling, Snapshot, UnlockId, UnlockTarget};
use std::collections::BTreeSet;
use tracing::debug;

/// Tapering Solomon curve: the per-level rate drops to 80%, 60%, 40% and
/// finally 30% of `per_level` after each band of 20 levels.
pub fn solomon_percent(per_level: f64, level: u64) -> f64 {
    const BANDS: [(u64, f64); 4] = [(20, 1.0), (20, 0.8), (20, 0.6), (20, 0.4)];
    let mut remaining = level;
    let mut total = 0.0;
    for (width, rate) in BANDS {
        let take = remaining.min(width);
        total += take as f64 * rate * per_level;
        remaining -= take;
    }
    total + remaining as f64 * 0.3 * per_level
}

/// Effect value of one unlock at an effective level.
pub fn unlock_value(unlock: &PermanentUnlock, level: u64, idle: bool) -> f64 {
    let per_level = unlock.per_level.to_f64().unwrap_or(0.0);
    let level_f = level as f64;
    match unlock.scaling {
        Scaling::Idle if idle => per_level * level_f,
        Scaling::Idle | Scaling::None => 0.0,
        Scaling::Multiplier | Scaling::Flat => per_level * level_f,
        Scaling::Solomon => solomon_percent(per_level, level),
    }
}

/// Snapshot-derived modifiers. Neutral values are `1.0` for multipliers and
/// `0.0` for additive quantities.
#[derive(Clone, Debug, PartialEq)]
pub struct UnlockEffects {
    pub damage: f64,
    pub gold: f64,
    pub reward: f64,
    pub golden_clicks: f64,
    pub cost_discount_percent: f64,
    pub boss_health_reduction: f64,
    pub monster_count_reduction: f64,
    pub start_depth: f64,
    pub starting_currency: f64,
    pub primal_chance_percent: f64,
    pub free_levels: f64,
    pub achievement_percent: f64,
    /// `1 + prestige% × reward_total`.
    pub prestige: BigNum,
    pub premium_damage: bool,
    /// Snapshot ids with no catalog entry; they contribute nothing.
    pub unknown_ids: usize,
}

impl Default for UnlockEffects {
    fn default() -> Self {
        Self {
            damage: 1.0,
            gold: 1.0,
            reward: 1.0,
            golden_clicks: 1.0,
            cost_discount_percent: 0.0,
            boss_health_reduction: 0.0,
            monster_count_reduction: 0.0,
            start_depth: 0.0,
            starting_currency: 0.0,
            primal_chance_percent: 0.0,
            free_levels: 0.0,
            achievement_percent: 0.0,
            prestige: BigNum::ONE,
            premium_damage: false,
            unknown_ids: 0,
        }
    }
}

impl UnlockEffects {
    /// Evaluate every unlock, item and achievement the snapshot mentions.
    /// `idle` enables idle-only unlocks.
    pub fn evaluate(catalog: &Catalog, snapshot: &Snapshot, idle: bool) -> Result<Self, EconError> {
        let mut fx = UnlockEffects::default();
        let ids: BTreeSet<UnlockId> = snapshot
            .unlock_levels
            .keys()
            .chain(snapshot.item_levels.keys())
            .copied()
            .collect();
        for id in ids {
            let Some(unlock) = catalog.unlock(id) else {
                debug!(unlock = id.0, "snapshot unlock missing from catalog");
                fx.unknown_ids += 1;
                continue;
            };
            let value = unlock_value(unlock, snapshot.effective_level(id), idle);
            fx.apply(unlock.target, value);
        }
        for id in &snapshot.achievements {
            match catalog.achievement(*id) {
                Some(a) => fx.achievement_percent += a.damage_percent.to_f64().unwrap_or(0.0),
                None => {
                    debug!(achievement = id.0, "snapshot achievement missing from catalog");
                    fx.unknown_ids += 1;
                }
            }
        }
        fx.premium_damage = snapshot.premium_damage;
        let percent = catalog.balance().prestige_percent / 100.0;
        fx.prestige = BigNum::ONE + snapshot.reward_total.scale(percent)?;
        Ok(fx)
    }

    fn apply(&mut self, target: UnlockTarget, value: f64) {
        let factor = (1.0 + value / 100.0).max(0.0);
        match target {
            UnlockTarget::Damage => self.damage *= factor,
            UnlockTarget::Gold => self.gold *= factor,
            UnlockTarget::Reward => self.reward *= factor,
            UnlockTarget::GoldenClicks => self.golden_clicks *= factor,
            UnlockTarget::CostDiscount => self.cost_discount_percent += value,
            UnlockTarget::BossHealth => self.boss_health_reduction += value,
            UnlockTarget::MonsterCount => self.monster_count_reduction += value,
            UnlockTarget::StartDepth => self.start_depth += value,
            UnlockTarget::StartingCurrency => self.starting_currency += value,
            UnlockTarget::PrimalChance => self.primal_chance_percent += value,
            UnlockTarget::FreeLevels => self.free_levels += value,
        }
    }

    /// Fraction of list price actually paid for character levels.
    pub fn cost_scale(&self, max_discount_percent: f64) -> f64 {
        1.0 - self.cost_discount_percent.clamp(0.0, max_discount_percent) / 100.0
    }

    /// Probability that an off-milestone boss pays out its reward.
    pub fn primal_chance(&self, base_chance: f64) -> f64 {
        (base_chance + self.primal_chance_percent / 100.0).clamp(0.0, 1.0)
    }

    /// First depth of the run; saturates instead of wrapping.
    pub fn start_depth(&self) -> u64 {
        (self.start_depth.max(0.0).floor() as u64).saturating_add(1)
    }

    pub fn free_levels(&self) -> u64 {
        self.free_levels.max(0.0).floor() as u64
    }

    /// Currency at the start of a run, in units of the bootstrap character's
    /// base cost. `None` when the catalog has no bootstrap character.
    pub fn starting_currency(&self, catalog: &Catalog) -> Result<Option<BigNum>, EconError> {
        let Some(bootstrap) = catalog.bootstrap_character() else {
            return Ok(None);
        };
        Ok(Some(bootstrap.base_cost.scale(self.starting_currency.max(0.0))?))
    }
}
