//! Character purchase cost, inverse cost lookup and damage by level.

use crate::unlocks::UnlockEffects;
use crate::EconError;
use sim_core::{BigNum, Catalog, Character, Upgrade, UpgradeEffect};

/// Linear steps above the closed-form seed before falling back to bisection.
const CLIMB_CAP: u32 = 64;
/// Linear steps below the closed-form seed before falling back to bisection.
const DESCEND_CAP: u32 = 256;

/// Cost and damage formulas for one catalog under one snapshot.
#[derive(Clone, Debug)]
pub struct Pricing<'a> {
    catalog: &'a Catalog,
    cost_scale: f64,
    prestige: BigNum,
}

impl<'a> Pricing<'a> {
    pub fn new(catalog: &'a Catalog, effects: &UnlockEffects) -> Self {
        Self {
            catalog,
            cost_scale: effects.cost_scale(catalog.balance().max_discount_percent),
            prestige: effects.prestige,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn prestige(&self) -> BigNum {
        self.prestige
    }

    fn character(&self, ordinal: usize) -> Result<&'a Character, EconError> {
        self.catalog
            .characters()
            .get(ordinal)
            .ok_or(EconError::UnknownCharacter(ordinal))
    }

    /// Per-level cost growth factor.
    pub fn growth(&self, character: &Character) -> f64 {
        let b = self.catalog.balance();
        if character.elite {
            b.elite_cost_growth
        } else {
            b.cost_growth
        }
    }

    /// Owner base cost times the upgrade's tier multiplier. Not discounted.
    pub fn upgrade_cost(&self, upgrade: &Upgrade) -> Result<BigNum, EconError> {
        let tier = self
            .catalog
            .balance()
            .upgrade_cost_tiers
            .get(upgrade.cost_tier)
            .copied()
            .unwrap_or(0.0);
        match self.catalog.character(upgrade.character) {
            Some(c) => Ok(c.base_cost.scale(tier)?),
            None => Ok(BigNum::ZERO),
        }
    }

    /// Discounted geometric series for levels `from..to`, upgrades excluded.
    pub fn series_cost(&self, ordinal: usize, from: u64, to: u64) -> Result<BigNum, EconError> {
        if to <= from {
            return Ok(BigNum::ZERO);
        }
        let c = self.character(ordinal)?;
        let g = self.growth(c);
        let growth = BigNum::try_from_f64(g)?;
        let head = growth.powi(from as i64)?;
        let span = growth.powi((to - from) as i64)?.checked_sub(&BigNum::ONE)?;
        Ok((c.base_cost * head * span).scale(self.cost_scale / (g - 1.0))?)
    }

    /// Cost to raise a character from level `from` to `to`, including every
    /// upgrade whose required level falls in `[from, to)`.
    pub fn cost(&self, ordinal: usize, from: u64, to: u64) -> Result<BigNum, EconError> {
        let series = self.series_cost(ordinal, from, to)?;
        let upgrades = self
            .catalog
            .upgrades_for(ordinal)
            .iter()
            .filter(|u| u.required_level >= from && u.required_level < to)
            .map(|u| self.upgrade_cost(u))
            .sum::<Result<BigNum, EconError>>()?;
        Ok(series + upgrades)
    }

    /// Highest level `n` with `cost(0, n) <= budget`.
    pub fn highest_affordable(&self, ordinal: usize, budget: &BigNum) -> Result<u64, EconError> {
        if self.cost(ordinal, 0, 1)? > *budget {
            return Ok(0);
        }
        let c = self.character(ordinal)?;
        let g = self.growth(c);
        // budget = base·scale·(g^n − 1)/(g − 1), solved for n
        let unit = c.base_cost.scale(self.cost_scale)?;
        let x = budget.scale(g - 1.0)?.checked_div(&unit)? + BigNum::ONE;
        let seed = x.log10()? / g.log10();
        let mut level = if seed.is_finite() && seed > 0.0 {
            seed.floor() as u64
        } else {
            0
        };

        let mut steps = 0;
        while self.cost(ordinal, 0, level + 1)? <= *budget {
            level += 1;
            steps += 1;
            if steps == CLIMB_CAP {
                return self.search_up(ordinal, budget, level);
            }
        }
        let mut steps = 0;
        while level > 0 && self.cost(ordinal, 0, level)? > *budget {
            level -= 1;
            steps += 1;
            if steps == DESCEND_CAP {
                return self.bisect(ordinal, budget, 0, level + 1);
            }
        }
        Ok(level)
    }

    /// `lo` is affordable; double until something is not, then bisect.
    fn search_up(&self, ordinal: usize, budget: &BigNum, lo: u64) -> Result<u64, EconError> {
        let mut lo = lo;
        let mut hi = lo.saturating_mul(2).max(lo + 1);
        while self.cost(ordinal, 0, hi)? <= *budget {
            if hi == u64::MAX {
                return Ok(hi);
            }
            lo = hi;
            hi = hi.saturating_mul(2);
        }
        self.bisect(ordinal, budget, lo, hi)
    }

    /// Requires `cost(lo) <= budget < cost(hi)`.
    fn bisect(&self, ordinal: usize, budget: &BigNum, lo: u64, hi: u64) -> Result<u64, EconError> {
        let (mut lo, mut hi) = (lo, hi);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.cost(ordinal, 0, mid)? <= *budget {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Step-function damage bonus at `level`.
    pub fn level_bonus(&self, character: &Character, level: u64) -> Result<BigNum, EconError> {
        let lb = &self.catalog.balance().level_bonus;
        let steps = |start: u64, every: u64, cap: u64| {
            if level < start {
                0
            } else {
                ((level - start) / every).min(cap)
            }
        };
        let quad = steps(lb.quad_start, lb.quad_every, lb.quad_cap);
        let tenfold = (level / lb.tenfold_every).min(lb.tenfold_cap);
        let mut bonus = BigNum::try_from_f64(lb.quad_factor)?.powi(quad as i64)?
            * BigNum::try_from_f64(lb.tenfold_factor)?.powi(tenfold as i64)?;
        if character.elite {
            let elite = steps(lb.elite_start, lb.elite_every, lb.elite_cap);
            bonus *= BigNum::try_from_f64(lb.elite_factor)?.powi(elite as i64)?;
        }
        Ok(bonus)
    }

    fn upgrade_product(&self, ordinal: usize, level: u64, pick: fn(&UpgradeEffect) -> bool) -> f64 {
        self.catalog
            .upgrades_for(ordinal)
            .iter()
            .take_while(|u| u.required_level <= level)
            .filter(|u| pick(&u.effect))
            .map(|u| u.effect.multiplier().max(0.0))
            .product()
    }

    /// Damage per second of one character at `level`, excluding global
    /// multipliers from other characters' upgrades.
    pub fn damage(&self, ordinal: usize, level: u64) -> Result<BigNum, EconError> {
        let c = self.character(ordinal)?;
        if level == 0 || Some(c.id) == self.catalog.non_combat_character() {
            return Ok(BigNum::ZERO);
        }
        let own = self.upgrade_product(ordinal, level, |e| {
            matches!(e, UpgradeEffect::CharacterPercent { .. })
        });
        let raw = c.base_damage * BigNum::from(level) * self.level_bonus(c, level)? * self.prestige;
        Ok(raw.scale(own)?)
    }

    /// Product of this character's all-character damage upgrades owned at `level`.
    pub fn all_multiplier(&self, ordinal: usize, level: u64) -> f64 {
        self.upgrade_product(ordinal, level, |e| matches!(e, UpgradeEffect::AllPercent { .. }))
    }

    /// Product of this character's gold upgrades owned at `level`.
    pub fn gold_multiplier(&self, ordinal: usize, level: u64) -> f64 {
        self.upgrade_product(ordinal, level, |e| matches!(e, UpgradeEffect::GoldPercent { .. }))
    }
}
