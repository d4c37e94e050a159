//! Monster health and reward by depth.
//!
//! Health grows by `early_growth` per depth up to the regime threshold and by
//! `late_growth` after it. The health at the threshold and at every interval
//! boundary is computed once when the curve is built, so a lookup at any
//! depth costs one power evaluation.

use crate::unlocks::UnlockEffects;
use crate::EconError;
use sim_core::{Balance, BigNum};

/// Every depth divisible by this is a boss.
pub const BOSS_INTERVAL: u64 = 5;

/// Interval scaling never lets the late growth base fall below this.
const MIN_LATE_GROWTH: f64 = 1.001;

pub fn is_boss(depth: u64) -> bool {
    depth % BOSS_INTERVAL == 0
}

/// Aggregated monsters of a depth range.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub from: u64,
    pub to: u64,
    /// Total health of every monster in the range, bosses included.
    pub health: BigNum,
    /// Gold dropped by all of them.
    pub gold: BigNum,
    /// Health of the last boss in the range (zero when there is none).
    pub boss_health: BigNum,
    /// Gold of a single normal monster at the last depth.
    pub monster_gold: BigNum,
    pub monsters: u64,
}

/// Memoized health/reward curve for one balance table.
#[derive(Clone, Debug)]
pub struct MonsterCurve {
    balance: Balance,
    threshold_health: BigNum,
    /// Interval index of `anchors[0]`.
    first_anchor: u64,
    /// Health at depth `k × every` for `k = first_anchor..`.
    anchors: Vec<BigNum>,
}

impl MonsterCurve {
    /// Build the curve, memoizing interval anchors up to `max_depth`.
    pub fn new(balance: &Balance, max_depth: u64) -> Result<Self, EconError> {
        let threshold = balance.growth_threshold;
        let threshold_health = early_health(balance, threshold)?;
        let mut curve = MonsterCurve {
            balance: balance.clone(),
            threshold_health,
            first_anchor: 0,
            anchors: Vec::new(),
        };
        if let Some(iv) = balance.interval_scaling {
            curve.first_anchor = threshold / iv.every + 1;
            let mut depth = threshold;
            let mut health = threshold_health;
            for k in curve.first_anchor..=max_depth / iv.every {
                let next = k * iv.every;
                health = health * curve.late_base(next)?.powi((next - depth) as i64)?;
                curve.anchors.push(health);
                depth = next;
            }
        }
        Ok(curve)
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Cached health at the regime threshold.
    pub fn threshold_health(&self) -> BigNum {
        self.threshold_health
    }

    /// Growth base for the step into `depth` (late regime only).
    fn late_base(&self, depth: u64) -> Result<BigNum, EconError> {
        let base = match self.balance.interval_scaling {
            Some(iv) => self.balance.late_growth + iv.step * ((depth - 1) / iv.every) as f64,
            None => self.balance.late_growth,
        };
        Ok(BigNum::try_from_f64(base.max(MIN_LATE_GROWTH))?)
    }

    /// Health at interval boundary `k × every`, from the memo when available.
    fn anchor(&self, k: u64, every: u64) -> Result<BigNum, EconError> {
        let idx = (k - self.first_anchor) as usize;
        if let Some(h) = self.anchors.get(idx) {
            return Ok(*h);
        }
        let (mut depth, mut health) = match self.anchors.last() {
            Some(h) => ((self.first_anchor + self.anchors.len() as u64 - 1) * every, *h),
            None => (self.balance.growth_threshold, self.threshold_health),
        };
        while depth < k * every {
            let next = (depth / every + 1) * every;
            health = health * self.late_base(next)?.powi((next - depth) as i64)?;
            depth = next;
        }
        Ok(health)
    }

    /// Health of one normal monster at `depth` (1-based).
    pub fn health(&self, depth: u64) -> Result<BigNum, EconError> {
        if depth == 0 {
            return Err(EconError::InvalidDepth(depth));
        }
        let threshold = self.balance.growth_threshold;
        if depth <= threshold {
            return early_health(&self.balance, depth);
        }
        let (start, base) = match self.balance.interval_scaling {
            Some(iv) => {
                let k = (depth - 1) / iv.every;
                if k * iv.every <= threshold {
                    (threshold, self.threshold_health)
                } else {
                    (k * iv.every, self.anchor(k, iv.every)?)
                }
            }
            None => (threshold, self.threshold_health),
        };
        Ok(base * self.late_base(depth)?.powi((depth - start) as i64)?)
    }

    /// Boss health multiplier after the snapshot's reduction.
    pub fn boss_multiplier(&self, reduction: f64) -> f64 {
        (self.balance.boss_multiplier - reduction.max(0.0)).max(self.balance.min_boss_multiplier)
    }

    /// Normal monsters per depth after the snapshot's reduction.
    pub fn monsters_per_depth(&self, reduction: f64) -> u64 {
        let base = u64::from(self.balance.monsters_per_depth);
        let cut = reduction.max(0.0).floor() as u64;
        base.saturating_sub(cut)
            .max(u64::from(self.balance.min_monsters_per_depth))
    }

    /// Share of health paid out as gold; escalates past a fixed depth, capped.
    pub fn gold_fraction(&self, depth: u64) -> f64 {
        let b = &self.balance;
        let over = depth.saturating_sub(b.gold_escalation_start);
        let escalation = b.gold_escalation.powf(over as f64).min(b.gold_escalation_cap);
        escalation / b.gold_divisor
    }

    /// Gold dropped by a normal monster at `depth`.
    pub fn monster_gold(&self, depth: u64) -> Result<BigNum, EconError> {
        Ok(self.health(depth)?.scale(self.gold_fraction(depth))?)
    }

    /// Health of the boss at `depth`.
    pub fn boss_health(&self, depth: u64, fx: &UnlockEffects) -> Result<BigNum, EconError> {
        Ok(self
            .health(depth)?
            .scale(self.boss_multiplier(fx.boss_health_reduction))?)
    }

    /// Sum health and gold over `from..=to`.
    pub fn window(&self, from: u64, to: u64, fx: &UnlockEffects) -> Result<Window, EconError> {
        let per_depth = self.monsters_per_depth(fx.monster_count_reduction);
        let boss_mult = BigNum::try_from_f64(self.boss_multiplier(fx.boss_health_reduction))?;
        let mut w = Window {
            from,
            to,
            health: BigNum::ZERO,
            gold: BigNum::ZERO,
            boss_health: BigNum::ZERO,
            monster_gold: BigNum::ZERO,
            monsters: 0,
        };
        for depth in from.max(1)..=to {
            let h = self.health(depth)?;
            let fraction = BigNum::try_from_f64(self.gold_fraction(depth))?;
            if is_boss(depth) {
                let boss = h * boss_mult;
                w.health += boss;
                w.gold += boss * fraction;
                w.boss_health = boss;
                w.monsters += 1;
            } else {
                let count = BigNum::from(per_depth);
                w.health += h * count;
                w.gold += h * count * fraction;
                w.monsters += per_depth;
            }
            if depth == to {
                w.monster_gold = h * fraction;
            }
        }
        Ok(w)
    }

    /// Depth-completion reward for clearing `depth`, before the reward factor.
    pub fn completion_reward(&self, depth: u64, primal_chance: f64) -> f64 {
        let r = &self.balance.reward;
        if !is_boss(depth) || depth < r.milestone {
            return 0.0;
        }
        if depth == r.milestone {
            return r.flat;
        }
        let value = ((depth as f64 - r.offset) / r.divisor).max(0.0).powf(r.exponent);
        if depth % r.milestone == 0 {
            value
        } else {
            value * primal_chance
        }
    }
}

/// Early-regime health: `base × (early_growth^(d−1) + (d−1))`.
pub fn early_health(balance: &Balance, depth: u64) -> Result<BigNum, EconError> {
    if depth == 0 {
        return Err(EconError::InvalidDepth(depth));
    }
    let steps = depth - 1;
    let growth = BigNum::try_from_f64(balance.early_growth)?.powi(steps as i64)?;
    Ok((growth + BigNum::from(steps)).scale(balance.base_health)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::IntervalScaling;

    fn curve() -> MonsterCurve {
        MonsterCurve::new(&Balance::default(), 5_000).unwrap()
    }

    fn scaled(max_depth: u64) -> MonsterCurve {
        let balance = Balance {
            interval_scaling: Some(IntervalScaling {
                every: 500,
                step: 0.025,
            }),
            ..Balance::default()
        };
        MonsterCurve::new(&balance, max_depth).unwrap()
    }

    #[test]
    fn first_depths_match_closed_form() {
        let c = curve();
        assert!((c.health(1).unwrap().to_f64() - 10.0).abs() < 1e-9);
        assert!((c.health(2).unwrap().to_f64() - 26.0).abs() < 1e-9);
        assert!(c.health(0).is_err());
    }

    #[test]
    fn regimes_agree_at_threshold() {
        let c = curve();
        let cached = c.threshold_health();
        let mut walked = BigNum::ONE;
        for _ in 1..140 {
            walked = walked.scale(1.6).unwrap();
        }
        let walked = (walked + BigNum::from(139u64)).scale(10.0).unwrap();
        let tol = |a: BigNum, b: BigNum| (a.log10().unwrap() - b.log10().unwrap()).abs() < 1e-9;
        assert!(tol(walked, cached));
        assert!(tol(c.health(140).unwrap(), cached));
        let next = c.health(141).unwrap().checked_div(&cached).unwrap();
        assert!((next.to_f64() - 1.15).abs() < 1e-9);
    }

    #[test]
    fn anchors_match_stepwise_growth() {
        let c = scaled(3_000);
        let h500 = c.health(500).unwrap();
        let h501 = c.health(501).unwrap();
        let h1000 = c.health(1000).unwrap();
        let h1001 = c.health(1001).unwrap();
        assert!((h501.checked_div(&h500).unwrap().to_f64() - 1.175).abs() < 1e-9);
        assert!((h1001.checked_div(&h1000).unwrap().to_f64() - 1.2).abs() < 1e-9);
        let expected = c.threshold_health().log10().unwrap()
            + 360.0 * 1.15f64.log10()
            + 500.0 * 1.175f64.log10();
        assert!((h1000.log10().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn depths_past_the_memo_extend_correctly() {
        let short = scaled(600);
        let long = scaled(10_000);
        for depth in [2_499u64, 2_500, 2_501, 7_777] {
            let a = short.health(depth).unwrap().log10().unwrap();
            let b = long.health(depth).unwrap().log10().unwrap();
            assert!((a - b).abs() < 1e-6, "depth {depth}");
        }
    }

    #[test]
    fn boss_multiplier_is_floored() {
        let c = curve();
        assert_eq!(c.boss_multiplier(0.0), 10.0);
        assert_eq!(c.boss_multiplier(2.5), 7.5);
        assert_eq!(c.boss_multiplier(40.0), 5.0);
        assert_eq!(c.monsters_per_depth(3.0), 7);
        assert_eq!(c.monsters_per_depth(30.0), 2);
    }

    #[test]
    fn gold_fraction_escalates_to_cap() {
        let c = curve();
        assert!((c.gold_fraction(10) - 1.0 / 15.0).abs() < 1e-12);
        assert!(c.gold_fraction(100) > c.gold_fraction(80));
        assert!((c.gold_fraction(100_000) - 3.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn window_sums_normals_and_boss() {
        let c = curve();
        let fx = UnlockEffects::default();
        let w = c.window(1, 5, &fx).unwrap();
        assert_eq!(w.monsters, 41);
        let normals: f64 = (1..5).map(|d| c.health(d).unwrap().to_f64() * 10.0).sum();
        let boss = c.health(5).unwrap().to_f64() * 10.0;
        assert!((w.health.to_f64() - normals - boss).abs() < 1e-6);
        assert!((w.boss_health.to_f64() - boss).abs() < 1e-9);
        assert!((w.gold.to_f64() - w.health.to_f64() / 15.0).abs() < 1e-6);
    }

    #[test]
    fn completion_reward_shape() {
        let c = curve();
        assert_eq!(c.completion_reward(95, 1.0), 0.0);
        assert_eq!(c.completion_reward(100, 0.25), 1.0);
        assert_eq!(c.completion_reward(101, 1.0), 0.0);
        let full = c.completion_reward(200, 0.25);
        assert!((full - (120.0f64 / 25.0).powf(1.3)).abs() < 1e-12);
        let off = c.completion_reward(105, 0.25);
        assert!((off - 0.25).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn health_is_strictly_increasing(d in 1u64..20_000) {
            let c = scaled(20_000);
            let a = c.health(d).unwrap();
            let b = c.health(d + 1).unwrap();
            prop_assert!(a < b);
        }
    }
}
