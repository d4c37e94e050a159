use crate::SimError;
use sim_core::{Balance, ComboCategory, CooldownPlan, NumError};
use sim_econ::UnlockEffects;

/// Run-wide multipliers derived once from the snapshot and cooldown plan.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationFactors {
    pub damage: f64,
    pub gold: f64,
    /// Golden clicks per second.
    pub golden_click_rate: f64,
    /// Clicks per second averaged over the whole session.
    pub click_rate: f64,
    pub reward: f64,
}

impl SimulationFactors {
    /// `effects` must have been evaluated with the same idle flag the plan implies.
    pub fn derive(
        balance: &Balance,
        effects: &UnlockEffects,
        plan: Option<&CooldownPlan>,
    ) -> Result<Self, SimError> {
        let combo = &balance.combo;
        let uptime = |cat: ComboCategory| plan.map_or(0.0, |p| p.uptime(cat, combo.duration_secs));
        let cps = |cat: ComboCategory| {
            plan.and_then(|p| p.combos.get(&cat))
                .map_or(0.0, |u| u.clicks_per_second)
        };

        let premium = if effects.premium_damage {
            balance.premium_damage_multiplier
        } else {
            1.0
        };
        let damage = effects.damage
            * (1.0 + effects.achievement_percent / 100.0)
            * premium
            * (1.0 + combo.burst_bonus * uptime(ComboCategory::DamageBurst));
        let gold = effects.gold * (1.0 + combo.rush_bonus * uptime(ComboCategory::GoldRush));
        let golden_click_rate = effects.golden_clicks
            * cps(ComboCategory::GoldenClicks)
            * uptime(ComboCategory::GoldenClicks);
        let click_rate = plan.map_or(0.0, |p| {
            p.combos
                .iter()
                .map(|(cat, u)| u.clicks_per_second * p.uptime(*cat, combo.duration_secs))
                .sum::<f64>()
        });

        let factors = SimulationFactors {
            damage,
            gold,
            golden_click_rate,
            click_rate,
            reward: effects.reward,
        };
        for v in [damage, gold, golden_click_rate, click_rate, effects.reward] {
            if !v.is_finite() {
                return Err(NumError::NonFinite(v).into());
            }
        }
        if damage <= 0.0 {
            return Err(SimError::ZeroDamageFactor);
        }
        Ok(factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::ComboUsage;

    fn plan() -> CooldownPlan {
        let mut p = CooldownPlan::default();
        for (cat, uses, cps) in [
            (ComboCategory::DamageBurst, 60.0, 10.0),
            (ComboCategory::GoldRush, 15.0, 0.0),
            (ComboCategory::GoldenClicks, 60.0, 20.0),
        ] {
            p.combos.insert(
                cat,
                ComboUsage {
                    uses_per_30_min: uses,
                    clicks_per_second: cps,
                },
            );
        }
        p
    }

    #[test]
    fn idle_factors_are_unlock_only() {
        let fx = UnlockEffects {
            damage: 3.0,
            achievement_percent: 50.0,
            premium_damage: true,
            ..UnlockEffects::default()
        };
        let f = SimulationFactors::derive(&Balance::default(), &fx, None).unwrap();
        assert!((f.damage - 9.0).abs() < 1e-12);
        assert_eq!(f.gold, 1.0);
        assert_eq!(f.click_rate, 0.0);
        assert_eq!(f.golden_click_rate, 0.0);
    }

    #[test]
    fn plan_uptime_feeds_factors() {
        let fx = UnlockEffects {
            golden_clicks: 2.0,
            ..UnlockEffects::default()
        };
        let f = SimulationFactors::derive(&Balance::default(), &fx, Some(&plan())).unwrap();
        // 60 uses × 30 s fill the half hour
        assert!((f.damage - 2.0).abs() < 1e-12);
        assert!((f.gold - 1.25).abs() < 1e-12);
        assert!((f.golden_click_rate - 40.0).abs() < 1e-12);
        assert!((f.click_rate - 30.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_factor_is_an_error() {
        let fx = UnlockEffects {
            damage: f64::INFINITY,
            ..UnlockEffects::default()
        };
        let err = SimulationFactors::derive(&Balance::default(), &fx, None).unwrap_err();
        assert!(matches!(err, SimError::Num(NumError::NonFinite(_))));
    }

    #[test]
    fn zero_damage_factor_is_an_error() {
        let fx = UnlockEffects {
            damage: 0.0,
            ..UnlockEffects::default()
        };
        assert_eq!(
            SimulationFactors::derive(&Balance::default(), &fx, None),
            Err(SimError::ZeroDamageFactor)
        );
    }
}
