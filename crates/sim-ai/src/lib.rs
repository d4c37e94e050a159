#![deny(warnings)]

//! Greedy leveling planner.
//!
//! A [`LevelingPlan`] spends a growing currency total across the catalog's
//! characters, one purchase decision at a time, always taking the level
//! change with the largest damage gain. State carries over between calls so
//! the simulator can feed it one depth window after another.

use sim_core::{BigNum, Catalog, NumError, UpgradeEffect};
use sim_econ::{EconError, Pricing, UnlockEffects};
use thiserror::Error;
use tracing::{debug, trace};

/// Levels are rounded down to multiples of this once the target is met.
pub const ROUND_STEP: u64 = 25;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    /// A cost or damage formula failed.
    #[error(transparent)]
    Econ(#[from] EconError),
    /// Invalid arithmetic inside the planner itself.
    #[error(transparent)]
    Num(#[from] NumError),
}

/// Result of one [`LevelingPlan::advance`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanOutcome {
    /// Committed damage per second after this call.
    pub damage: BigNum,
    /// Committed damage plus the leftover-budget bonus. Used for ranking and
    /// time estimates; never stored in the plan.
    pub ranking_damage: BigNum,
    /// Levels bought during this call.
    pub levels_purchased: u64,
    /// False when the bootstrap power law answered instead of the planner.
    pub engaged: bool,
}

#[derive(Clone, Debug)]
struct Candidate {
    ordinal: usize,
    level: u64,
    total: BigNum,
    gain: BigNum,
    bonus: BigNum,
}

/// Mutable purchase state for one run.
#[derive(Debug)]
pub struct LevelingPlan<'a> {
    pricing: Pricing<'a>,
    levels: Vec<u64>,
    seed_costs: Vec<BigNum>,
    raw: Vec<BigNum>,
    all_mult: Vec<f64>,
    gold_mult: Vec<f64>,
    damage: BigNum,
    spent: BigNum,
    purchased: u64,
    last: Option<usize>,
    floor: BigNum,
    bootstrap_damage: BigNum,
    bootstrap_exponent: f64,
    leftover_divisor: f64,
}

impl<'a> LevelingPlan<'a> {
    /// Seed characters with the free levels granted by the snapshot.
    ///
    /// Only characters the starting currency could reach are seeded, and
    /// never past the level of their first upgrade the simulator does not
    /// model. Seeded levels cost nothing.
    pub fn new(catalog: &'a Catalog, effects: &UnlockEffects) -> Result<Self, PlanError> {
        let pricing = Pricing::new(catalog, effects);
        let free = effects.free_levels();
        let reach = effects.starting_currency(catalog)?.unwrap_or(BigNum::ZERO);
        let n = catalog.characters().len();
        let mut plan = LevelingPlan {
            pricing,
            levels: vec![0; n],
            seed_costs: vec![BigNum::ZERO; n],
            raw: vec![BigNum::ZERO; n],
            all_mult: vec![1.0; n],
            gold_mult: vec![1.0; n],
            damage: BigNum::ZERO,
            spent: BigNum::ZERO,
            purchased: 0,
            last: None,
            floor: BigNum::ZERO,
            bootstrap_damage: BigNum::ZERO,
            bootstrap_exponent: catalog.balance().bootstrap_exponent,
            leftover_divisor: catalog.balance().leftover_divisor,
        };
        for ordinal in 0..n {
            let cap = catalog
                .upgrades_for(ordinal)
                .iter()
                .find(|u| u.effect == UpgradeEffect::Other)
                .map(|u| u.required_level)
                .unwrap_or(u64::MAX);
            let seed = if free == 0 {
                0
            } else {
                free.min(cap).min(plan.pricing.highest_affordable(ordinal, &reach)?)
            };
            plan.levels[ordinal] = seed;
            plan.seed_costs[ordinal] = plan.pricing.cost(ordinal, 0, seed)?;
            plan.refresh(ordinal)?;
        }
        plan.damage = plan.total()?;
        if let Some(b) = catalog.bootstrap_character() {
            plan.floor = plan.pricing.cost(b.ordinal, 0, 1)?;
            plan.bootstrap_damage = b.base_damage * plan.pricing.prestige();
        }
        debug!(characters = n, free_levels = free, damage = %plan.damage, "seeded leveling plan");
        Ok(plan)
    }

    pub fn damage(&self) -> BigNum {
        self.damage
    }

    /// Currency committed to purchases so far, free levels excluded.
    pub fn spent(&self) -> BigNum {
        self.spent
    }

    pub fn levels(&self) -> &[u64] {
        &self.levels
    }

    pub fn levels_purchased(&self) -> u64 {
        self.purchased
    }

    /// Product of gold upgrades owned across all characters.
    pub fn gold_multiplier(&self) -> f64 {
        self.gold_mult.iter().product()
    }

    /// Currency below which the bootstrap power law applies.
    pub fn floor(&self) -> BigNum {
        self.floor
    }

    fn refresh(&mut self, ordinal: usize) -> Result<(), PlanError> {
        let level = self.levels[ordinal];
        self.raw[ordinal] = self.pricing.damage(ordinal, level)?;
        self.all_mult[ordinal] = self.pricing.all_multiplier(ordinal, level);
        self.gold_mult[ordinal] = self.pricing.gold_multiplier(ordinal, level);
        Ok(())
    }

    fn total(&self) -> Result<BigNum, PlanError> {
        let raw: BigNum = self.raw.iter().sum();
        Ok(raw.scale(self.all_mult.iter().product())?)
    }

    /// Committed damage if `ordinal` were at `level`, everything else unchanged.
    fn total_with(&self, ordinal: usize, level: u64) -> Result<BigNum, PlanError> {
        let others: BigNum = self
            .raw
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != ordinal)
            .map(|(_, d)| *d)
            .sum();
        let global: f64 = self
            .all_mult
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != ordinal)
            .map(|(_, m)| *m)
            .product();
        let own = self.pricing.damage(ordinal, level)?;
        Ok((others + own).scale(global * self.pricing.all_multiplier(ordinal, level))?)
    }

    /// Net cost of the current level of `ordinal`.
    fn spent_on(&self, ordinal: usize) -> Result<BigNum, PlanError> {
        let cost = self.pricing.cost(ordinal, 0, self.levels[ordinal])?;
        Ok(cost - self.seed_costs[ordinal])
    }

    fn evaluate(&self, ordinal: usize, total: &BigNum) -> Result<Option<Candidate>, PlanError> {
        let current = self.levels[ordinal];
        let remaining = (*total - self.spent) + self.spent_on(ordinal)?;
        let budget = remaining + self.seed_costs[ordinal];
        let level = self.pricing.highest_affordable(ordinal, &budget)?;
        if level <= current {
            return Ok(None);
        }
        let new_total = self.total_with(ordinal, level)?;
        if new_total <= self.damage {
            return Ok(None);
        }
        let gain = new_total - self.damage;

        let leftover = budget - self.pricing.cost(ordinal, 0, level)?;
        let next_cost = self.pricing.cost(ordinal, level, level + 1)?;
        let bonus = if leftover.is_zero() || next_cost.is_zero() {
            BigNum::ZERO
        } else {
            let next_gain = self.total_with(ordinal, level + 1)? - new_total;
            next_gain.scale(leftover.checked_div(&next_cost)?.to_f64() / self.leftover_divisor)?
        };
        Ok(Some(Candidate {
            ordinal,
            level,
            total: new_total,
            gain,
            bonus,
        }))
    }

    /// Pick the character with the largest ranked gain. Ties keep catalog order.
    fn scan(&self, total: &BigNum) -> Result<Option<Candidate>, PlanError> {
        let mut best: Option<Candidate> = None;
        for ordinal in 0..self.levels.len() {
            let Some(c) = self.evaluate(ordinal, total)? else {
                continue;
            };
            let better = match &best {
                Some(b) => c.gain + c.bonus > b.gain + b.bonus,
                None => true,
            };
            if better {
                best = Some(c);
            }
        }
        Ok(best)
    }

    /// Round a purchase that already meets `target` down to a multiple of
    /// [`ROUND_STEP`] when the rounded level still meets it.
    fn round_down(&self, c: Candidate, target: &BigNum) -> Result<Candidate, PlanError> {
        if c.total < *target {
            return Ok(c);
        }
        let rounded = c.level / ROUND_STEP * ROUND_STEP;
        if rounded <= self.levels[c.ordinal] || rounded == c.level {
            return Ok(c);
        }
        let total = self.total_with(c.ordinal, rounded)?;
        if total < *target {
            return Ok(c);
        }
        Ok(Candidate {
            level: rounded,
            gain: total - self.damage,
            total,
            bonus: BigNum::ZERO,
            ..c
        })
    }

    fn commit(&mut self, c: &Candidate) -> Result<(), PlanError> {
        let before = self.levels[c.ordinal];
        let old = self.spent_on(c.ordinal)?;
        self.levels[c.ordinal] = c.level;
        let new = self.spent_on(c.ordinal)?;
        self.spent = (self.spent - old) + new;
        self.refresh(c.ordinal)?;
        self.damage = c.total;
        self.purchased += c.level - before;
        self.last = Some(c.ordinal);
        trace!(character = c.ordinal, from = before, to = c.level, damage = %self.damage, "commit");
        Ok(())
    }

    /// Spend up to `total` currency (cumulative, not incremental) to reach
    /// `target` damage.
    ///
    /// Once committed damage is past `target`, only the previously bought
    /// character is re-evaluated; when it cannot improve, nothing is bought.
    pub fn advance(&mut self, total: &BigNum, target: &BigNum) -> Result<PlanOutcome, PlanError> {
        if *total < self.floor {
            let fraction = total.checked_div(&self.floor)?.powf(self.bootstrap_exponent)?;
            let damage = (self.bootstrap_damage * fraction).max(self.damage);
            return Ok(PlanOutcome {
                damage,
                ranking_damage: damage,
                levels_purchased: 0,
                engaged: false,
            });
        }

        let before = self.purchased;
        let mut bonus = BigNum::ZERO;
        let max_steps = 2 * self.levels.len() + 4;
        for _ in 0..max_steps {
            let candidate = match self.last {
                Some(i) if self.damage > *target => self.evaluate(i, total)?,
                _ => self.scan(total)?,
            };
            let Some(candidate) = candidate else {
                break;
            };
            let chosen = self.round_down(candidate, target)?;
            bonus = chosen.bonus;
            self.commit(&chosen)?;
            if self.damage >= *target {
                break;
            }
        }
        Ok(PlanOutcome {
            damage: self.damage,
            ranking_damage: self.damage + bonus,
            levels_purchased: self.purchased - before,
            engaged: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{Snapshot, UnlockId};

    const BUNDLED: &str = include_str!("../../../assets/catalog.yaml");

    fn bundled() -> Catalog {
        Catalog::from_yaml_str(BUNDLED).unwrap()
    }

    fn pair() -> Catalog {
        Catalog::from_yaml_str(
            r#"
bootstrap_character: 1
characters:
  - { id: 1, base_cost: 10, base_damage: 1 }
  - { id: 2, base_cost: 100, base_damage: 20 }
  - { id: 3, base_cost: 1e9, base_damage: 1e6 }
unlocks:
  - { id: 1, scaling: flat, target: free_levels, per_level: 5 }
  - { id: 2, scaling: flat, target: starting_currency, per_level: 100 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn below_floor_uses_power_law() {
        let cat = pair();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        assert!((plan.floor().to_f64() - 10.0).abs() < 1e-9);
        let out = plan.advance(&BigNum::from(4u64), &BigNum::from(1_000u64)).unwrap();
        assert!(!out.engaged);
        assert!((out.damage.to_f64() - 0.4f64.sqrt()).abs() < 1e-12);
        assert_eq!(plan.levels(), &[0, 0, 0]);
        let zero = plan.advance(&BigNum::ZERO, &BigNum::ONE).unwrap();
        assert!(zero.damage.is_zero());
    }

    #[test]
    fn buys_the_larger_gain() {
        let cat = pair();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        let out = plan.advance(&BigNum::from(150u64), &BigNum::from(1_000_000u64)).unwrap();
        assert!(out.engaged);
        assert_eq!(plan.levels()[1], 1);
        assert!(plan.levels()[0] > 0);
        assert!(plan.spent().to_f64() <= 150.0 + 1e-9);
        assert!(out.levels_purchased >= 1);
        assert!(out.ranking_damage >= out.damage);
    }

    #[test]
    fn leftover_bonus_only_ranks() {
        let cat = pair();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        let p = Pricing::new(&cat, &UnlockEffects::default());
        let out = plan.advance(&BigNum::from(150u64), &BigNum::ONE).unwrap();
        // 50 left over after the first level of the second character
        assert_eq!(plan.levels(), &[0, 1, 0]);
        assert!(out.ranking_damage > out.damage);
        assert_eq!(plan.damage(), out.damage);
        assert!((plan.damage().to_f64() - 20.0).abs() < 1e-9);
        assert_eq!(plan.spent(), p.cost(1, 0, 1).unwrap());
    }

    #[test]
    fn memo_reevaluates_only_the_last_pick() {
        let cat = pair();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        plan.advance(&BigNum::from(150u64), &BigNum::ONE).unwrap();
        let idle = plan.advance(&BigNum::from(150u64), &BigNum::ONE).unwrap();
        assert_eq!(idle.levels_purchased, 0);
        assert_eq!(plan.levels(), &[0, 1, 0]);
        let out = plan.advance(&BigNum::from(1_000u64), &BigNum::ONE).unwrap();
        assert_eq!(out.levels_purchased, 6);
        assert_eq!(plan.levels(), &[0, 7, 0]);
    }

    #[test]
    fn rounds_down_once_target_is_met() {
        let cat = pair();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        let p = Pricing::new(&cat, &UnlockEffects::default());
        let budget = p.cost(1, 0, 60).unwrap();
        let out = plan.advance(&budget, &BigNum::from(200u64)).unwrap();
        assert_eq!(plan.levels()[1] % ROUND_STEP, 0);
        assert!(out.damage >= BigNum::from(200u64));
    }

    #[test]
    fn free_levels_are_seeded_and_not_charged() {
        let cat = pair();
        let mut snap = Snapshot::default();
        snap.unlock_levels.insert(UnlockId(1), 2);
        snap.unlock_levels.insert(UnlockId(2), 2);
        let fx = UnlockEffects::evaluate(&cat, &snap, true).unwrap();
        let plan = LevelingPlan::new(&cat, &fx).unwrap();
        // 2000 starting currency reaches ten levels of both cheap characters
        assert_eq!(plan.levels(), &[10, 10, 0]);
        assert!(plan.spent().is_zero());
        assert!((plan.damage().to_f64() - 210.0).abs() < 1e-9);
    }

    #[test]
    fn memo_path_keeps_spending_past_target() {
        let cat = bundled();
        let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
        let small = BigNum::from(1_000u64);
        plan.advance(&small, &BigNum::ONE).unwrap();
        let first = plan.damage();
        let out = plan.advance(&BigNum::from(1_000_000u64), &BigNum::ONE).unwrap();
        assert!(out.damage >= first);
        assert!(plan.spent().to_f64() <= 1_000_000.0 * (1.0 + 1e-9));
    }

    proptest! {
        #[test]
        fn committed_damage_never_regresses(
            steps in proptest::collection::vec((0.0f64..3.0, 0.0f64..8.0), 1..40)
        ) {
            let cat = bundled();
            let mut plan = LevelingPlan::new(&cat, &UnlockEffects::default()).unwrap();
            let mut log_total = 0.0;
            let mut last = plan.damage();
            for (grow, log_target) in steps {
                log_total += grow;
                let total = BigNum::from_log10(log_total).unwrap();
                let target = BigNum::from_log10(log_target).unwrap();
                plan.advance(&total, &target).unwrap();
                prop_assert!(plan.damage() >= last);
                let slack = total.scale(1.0 + 1e-9).unwrap();
                prop_assert!(plan.spent() <= slack);
                last = plan.damage();
            }
        }
    }
}
