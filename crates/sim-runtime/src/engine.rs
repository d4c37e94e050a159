//! Depth walk: clears boss-aligned windows one after another, feeding the
//! gold earned back into the leveling plan, until progress stalls or the
//! reward/time ratio has clearly peaked.

use crate::factors::SimulationFactors;
use crate::result::{Confidence, SimulateResult, StopReason, WindowRecord};
use crate::SimError;
use rayon::prelude::*;
use sim_ai::LevelingPlan;
use sim_core::{BigNum, Catalog, CooldownPlan, SimConfig, Snapshot};
use sim_econ::{MonsterCurve, UnlockEffects, BOSS_INTERVAL};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only simulation context shared by every run on one catalog.
#[derive(Clone, Debug)]
pub struct Engine {
    catalog: Arc<Catalog>,
    curve: MonsterCurve,
    config: SimConfig,
}

#[derive(Clone, Copy, Debug)]
struct Best {
    depth: u64,
    elapsed_secs: f64,
    reward: BigNum,
    ratio: f64,
}

impl Engine {
    pub fn new(catalog: Catalog, config: SimConfig) -> Result<Self, SimError> {
        Self::with_shared(Arc::new(catalog), config)
    }

    /// Build on a catalog already shared with other engines.
    pub fn with_shared(catalog: Arc<Catalog>, config: SimConfig) -> Result<Self, SimError> {
        if let Some(problem) = config.problem() {
            return Err(SimError::InvalidConfig(problem.to_string()));
        }
        let curve = MonsterCurve::new(catalog.balance(), config.max_depth)?;
        Ok(Engine {
            catalog,
            curve,
            config,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Walk depths from the snapshot's start and report the most
    /// reward-efficient stopping point.
    pub fn simulate(
        &self,
        snapshot: &Snapshot,
        plan: Option<&CooldownPlan>,
    ) -> Result<SimulateResult, SimError> {
        if let Some(p) = plan {
            if !p.is_valid() {
                return Err(SimError::InvalidPlan);
            }
        }
        let idle = plan.map_or(true, CooldownPlan::is_idle);
        let balance = self.catalog.balance();
        let effects = UnlockEffects::evaluate(&self.catalog, snapshot, idle)?;
        let factors = SimulationFactors::derive(balance, &effects, plan)?;
        let mut leveling = LevelingPlan::new(&self.catalog, &effects)?;

        let (mut currency, confidence) = match effects.starting_currency(&self.catalog)? {
            Some(c) => (c, Confidence::Normal),
            None => {
                warn!("catalog has no bootstrap character; starting with zero currency");
                (BigNum::ZERO, Confidence::Low)
            }
        };

        let start_depth = effects.start_depth();
        let primal_chance = effects.primal_chance(balance.reward.base_chance);
        let click_dps = BigNum::try_from_f64(
            factors.click_rate * balance.base_click_damage * factors.damage,
        )?;
        debug!(start_depth, idle, ?factors, "starting depth walk");

        let mut best = Best {
            depth: start_depth,
            elapsed_secs: 0.0,
            reward: BigNum::ZERO,
            ratio: 0.0,
        };
        let mut elapsed = 0.0;
        let mut reward = BigNum::ZERO;
        // Ratios are only ranked once a depth-completion reward has been paid.
        let mut paid = false;
        let mut total_levels = 0u64;
        let mut level_units = 0u64;
        let mut engaged = false;
        let mut trace = Vec::new();
        let mut from = start_depth;
        let mut depth = start_depth
            .div_ceil(BOSS_INTERVAL)
            .saturating_mul(BOSS_INTERVAL);
        let mut last_depth = start_depth;

        let stop_reason = loop {
            if depth > self.config.max_depth {
                break StopReason::DepthLimit;
            }
            let window = self.curve.window(from, depth, &effects)?;
            let target = window
                .boss_health
                .scale(self.config.target_boss_multiple / factors.damage)?;
            let outcome = leveling.advance(&currency, &target)?;
            engaged |= outcome.engaged;

            let dps = outcome.ranking_damage.scale(factors.damage)? + click_dps;
            if dps.is_zero() {
                debug!(depth, "no damage available");
                break StopReason::Stalled;
            }
            let secs = window.health.checked_div(&dps)?.to_f64();
            if !secs.is_finite() || secs > self.config.stall_ceiling_secs {
                debug!(depth, secs, "window exceeds stall ceiling");
                break StopReason::Stalled;
            }
            last_depth = depth;

            let gold_factor = factors.gold * leveling.gold_multiplier();
            currency += window.gold.scale(gold_factor)?;
            currency += window
                .monster_gold
                .scale(factors.golden_click_rate * secs * gold_factor)?;
            elapsed += secs;
            let boss_reward = self.curve.completion_reward(depth, primal_chance) * factors.reward;
            paid |= boss_reward > 0.0;
            // leveling pays whole units of the cumulative level count
            total_levels = total_levels.saturating_add(outcome.levels_purchased);
            let units = (total_levels as f64 / balance.reward.levels_per_reward).floor() as u64;
            let level_reward = units.saturating_sub(level_units);
            level_units = units;
            reward += BigNum::try_from_f64(boss_reward)? + BigNum::from(level_reward);
            let ratio = if elapsed > 0.0 {
                reward.to_f64() / elapsed
            } else {
                0.0
            };

            if self.config.record_trace {
                trace.push(WindowRecord {
                    depth,
                    secs,
                    elapsed_secs: elapsed,
                    damage: outcome.damage,
                    target,
                    currency,
                    reward,
                    ratio,
                    levels_purchased: outcome.levels_purchased,
                });
            }
            if !paid {
                debug!(depth, ratio, "no completion reward yet");
            } else if ratio >= best.ratio {
                best = Best {
                    depth,
                    elapsed_secs: elapsed,
                    reward,
                    ratio,
                };
            } else if ratio < self.config.stop_ratio * best.ratio {
                debug!(depth, ratio, best = best.ratio, "ratio past its peak");
                break StopReason::RatioDecline;
            }
            from = depth + 1;
            depth = match depth.checked_add(BOSS_INTERVAL) {
                Some(next) => next,
                None => break StopReason::DepthLimit,
            };
        };

        info!(
            depth = best.depth,
            last_depth,
            ratio = best.ratio,
            ?stop_reason,
            "simulation finished"
        );
        Ok(SimulateResult {
            depth: best.depth,
            elapsed_secs: best.elapsed_secs,
            reward: best.reward,
            ratio: best.ratio,
            start_depth,
            last_depth,
            stop_reason,
            confidence,
            optimizer_engaged: engaged,
            trace,
        })
    }

    /// Run one simulation per plan variant in parallel. Results keep the
    /// order of `plans`.
    pub fn simulate_variants(
        &self,
        snapshot: &Snapshot,
        plans: &[Option<CooldownPlan>],
    ) -> Vec<Result<SimulateResult, SimError>> {
        plans
            .par_iter()
            .map(|plan| self.simulate(snapshot, plan.as_ref()))
            .collect()
    }
}

/// Index and value of the best successful variant.
pub fn best_variant(
    results: &[Result<SimulateResult, SimError>],
) -> Option<(usize, &SimulateResult)> {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|r| (i, r)))
        .fold(None, |best: Option<(usize, &SimulateResult)>, (i, r)| match best {
            Some((_, b)) if !r.beats(b) => best,
            _ => Some((i, r)),
        })
}
