//! Static game-balance catalog: characters, upgrades, permanent unlocks,
//! achievements and the balance constants the formulas read.
//!
//! A catalog is loaded once from a serialized [`CatalogDocument`] and then
//! shared read-only by every simulation run. Loading validates all
//! catalog-internal cross references; a dangling reference is a fatal
//! [`CatalogError`], while lookups by id return `Option` and never panic.

use crate::bignum::BigNum;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of a [`Character`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub u32);

/// Identifier of an [`Upgrade`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradeId(pub u32);

/// Identifier of a [`PermanentUnlock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockId(pub u32);

/// Identifier of an [`Achievement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub u32);

/// A purchasable damage-producing unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    #[serde(default)]
    pub name: String,
    /// Cost of the first level.
    pub base_cost: BigNum,
    /// Damage per second of a single level before bonuses.
    pub base_damage: BigNum,
    /// Elite characters use the steeper cost growth and the extra level bonus.
    #[serde(default)]
    pub elite: bool,
    /// Position in catalog order; assigned at load time.
    #[serde(skip)]
    pub ordinal: usize,
}

/// What buying an [`Upgrade`] does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Multiplies the owning character's damage by `1 + percent/100`.
    CharacterPercent { percent: Decimal },
    /// Multiplies every character's damage by `1 + percent/100`.
    AllPercent { percent: Decimal },
    /// Multiplies gold found by `1 + percent/100`.
    GoldPercent { percent: Decimal },
    /// Click or utility effects the simulator does not model.
    Other,
}

impl UpgradeEffect {
    pub fn percent(&self) -> Option<Decimal> {
        match self {
            UpgradeEffect::CharacterPercent { percent }
            | UpgradeEffect::AllPercent { percent }
            | UpgradeEffect::GoldPercent { percent } => Some(*percent),
            UpgradeEffect::Other => None,
        }
    }

    /// Multiplier contributed by this effect; `1.0` for [`UpgradeEffect::Other`].
    pub fn multiplier(&self) -> f64 {
        match self {
            UpgradeEffect::CharacterPercent { percent }
            | UpgradeEffect::AllPercent { percent }
            | UpgradeEffect::GoldPercent { percent } => {
                1.0 + percent.to_f64().unwrap_or(0.0) / 100.0
            }
            UpgradeEffect::Other => 1.0,
        }
    }
}

/// One-time purchase tied to a character level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upgrade {
    pub id: UpgradeId,
    /// Owning character.
    pub character: CharacterId,
    /// Character level at which the upgrade becomes purchasable.
    pub required_level: u64,
    pub effect: UpgradeEffect,
    /// Index into [`Balance::upgrade_cost_tiers`].
    #[serde(default)]
    pub cost_tier: usize,
}

/// Display grouping for permanent unlocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockBucket {
    #[default]
    Primary,
    Secondary,
}

/// How a permanent unlock's level turns into an effect value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// `per_level × level` percent, only while playing idle.
    Idle,
    /// `per_level × level` percent.
    Multiplier,
    /// Percent with a per-level rate that tapers every 20 levels.
    Solomon,
    /// `per_level × level` as a plain additive quantity.
    Flat,
    /// No effect on the simulation.
    None,
}

/// The formula input a permanent unlock modifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockTarget {
    Damage,
    Gold,
    Reward,
    GoldenClicks,
    CostDiscount,
    BossHealth,
    MonsterCount,
    StartDepth,
    StartingCurrency,
    PrimalChance,
    FreeLevels,
}

impl UnlockTarget {
    /// Multiplicative targets combine as `Π (1 + value/100)`, the rest add up.
    pub fn is_multiplicative(self) -> bool {
        matches!(
            self,
            UnlockTarget::Damage
                | UnlockTarget::Gold
                | UnlockTarget::Reward
                | UnlockTarget::GoldenClicks
        )
    }
}

/// A persistent, snapshot-tracked bonus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PermanentUnlock {
    pub id: UnlockId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bucket: UnlockBucket,
    pub scaling: Scaling,
    pub target: UnlockTarget,
    #[serde(default)]
    pub per_level: Decimal,
}

/// An achievement adds a flat damage percentage once unlocked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    #[serde(default)]
    pub name: String,
    pub damage_percent: Decimal,
}

/// Health growth modifier applied every `every` depths past the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalScaling {
    pub every: u64,
    /// Added to the late growth base once per completed interval.
    pub step: f64,
}

/// Step functions multiplying character damage by level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelBonus {
    pub quad_start: u64,
    pub quad_every: u64,
    pub quad_factor: f64,
    pub quad_cap: u64,
    pub tenfold_every: u64,
    pub tenfold_factor: f64,
    pub tenfold_cap: u64,
    pub elite_start: u64,
    pub elite_every: u64,
    pub elite_factor: f64,
    pub elite_cap: u64,
}

impl Default for LevelBonus {
    fn default() -> Self {
        Self {
            quad_start: 175,
            quad_every: 25,
            quad_factor: 4.0,
            quad_cap: 157,
            tenfold_every: 1000,
            tenfold_factor: 10.0,
            tenfold_cap: 4,
            elite_start: 500,
            elite_every: 25,
            elite_factor: 1.25,
            elite_cap: 9,
        }
    }
}

/// Depth-completion reward curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardCurve {
    pub milestone: u64,
    pub flat: f64,
    pub offset: f64,
    pub divisor: f64,
    pub exponent: f64,
    /// Chance that an off-milestone boss pays out, before unlocks.
    pub base_chance: f64,
    /// Levels purchased per reward unit.
    pub levels_per_reward: f64,
}

impl Default for RewardCurve {
    fn default() -> Self {
        Self {
            milestone: 100,
            flat: 1.0,
            offset: 80.0,
            divisor: 25.0,
            exponent: 1.3,
            base_chance: 0.25,
            levels_per_reward: 2000.0,
        }
    }
}

/// Active-ability tuning used when a cooldown plan is present.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboBalance {
    pub duration_secs: f64,
    pub burst_bonus: f64,
    pub rush_bonus: f64,
}

impl Default for ComboBalance {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            burst_bonus: 1.0,
            rush_bonus: 1.0,
        }
    }
}

/// Balance constants for every formula. Missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    pub base_health: f64,
    pub early_growth: f64,
    pub late_growth: f64,
    pub growth_threshold: u64,
    pub interval_scaling: Option<IntervalScaling>,
    pub monsters_per_depth: u32,
    pub min_monsters_per_depth: u32,
    pub boss_multiplier: f64,
    pub min_boss_multiplier: f64,
    pub gold_divisor: f64,
    pub gold_escalation_start: u64,
    pub gold_escalation: f64,
    pub gold_escalation_cap: f64,
    pub cost_growth: f64,
    pub elite_cost_growth: f64,
    pub max_discount_percent: f64,
    pub upgrade_cost_tiers: Vec<f64>,
    pub level_bonus: LevelBonus,
    pub prestige_percent: f64,
    pub premium_damage_multiplier: f64,
    pub base_click_damage: f64,
    pub reward: RewardCurve,
    pub bootstrap_exponent: f64,
    pub leftover_divisor: f64,
    pub combo: ComboBalance,
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            base_health: 10.0,
            early_growth: 1.6,
            late_growth: 1.15,
            growth_threshold: 140,
            interval_scaling: None,
            monsters_per_depth: 10,
            min_monsters_per_depth: 2,
            boss_multiplier: 10.0,
            min_boss_multiplier: 5.0,
            gold_divisor: 15.0,
            gold_escalation_start: 75,
            gold_escalation: 1.025,
            gold_escalation_cap: 3.0,
            cost_growth: 1.07,
            elite_cost_growth: 1.22,
            max_discount_percent: 99.0,
            upgrade_cost_tiers: vec![10.0, 25.0, 100.0, 800.0, 8_000.0, 40_000.0, 400_000.0],
            level_bonus: LevelBonus::default(),
            prestige_percent: 10.0,
            premium_damage_multiplier: 2.0,
            base_click_damage: 1.0,
            reward: RewardCurve::default(),
            bootstrap_exponent: 0.5,
            leftover_divisor: 4.0,
            combo: ComboBalance::default(),
        }
    }
}

/// Validation and loading errors for catalogs.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Two entries of one table share an id.
    #[error("duplicate {kind} id {id}")]
    Duplicate { kind: &'static str, id: u32 },
    /// An upgrade's owner is not a catalog character.
    #[error("upgrade {upgrade} references missing character {character}")]
    MissingCharacter { upgrade: u32, character: u32 },
    /// `non_combat_character` names an absent character.
    #[error("non-combat character {0} is not in the catalog")]
    MissingNonCombat(u32),
    /// Upgrade cost tier outside `balance.upgrade_cost_tiers`.
    #[error("upgrade {upgrade} uses unknown cost tier {tier}")]
    UnknownCostTier { upgrade: u32, tier: usize },
    /// A character whose first level is free.
    #[error("character {0} must have a positive base cost")]
    NonPositiveCost(u32),
    /// Percentages and per-level amounts are never negative.
    #[error("{kind} {id} has a negative percentage")]
    NegativePercent { kind: &'static str, id: u32 },
    /// A balance constant outside its domain.
    #[error("invalid balance: {0}")]
    InvalidBalance(String),
    /// No characters at all.
    #[error("catalog has no characters")]
    Empty,
    /// Malformed YAML or JSON.
    #[error("parse error: {0}")]
    Parse(String),
    /// The catalog file could not be read.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e.to_string())
    }
}

/// Serialized catalog as found in data files.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub balance: Balance,
    pub characters: Vec<Character>,
    #[serde(default)]
    pub upgrades: Vec<Upgrade>,
    #[serde(default)]
    pub unlocks: Vec<PermanentUnlock>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub non_combat_character: Option<CharacterId>,
    /// First leveling-relevant character; its cost is the early-game currency floor.
    #[serde(default)]
    pub bootstrap_character: Option<CharacterId>,
}

/// Immutable, validated catalog.
#[derive(Clone, Debug)]
pub struct Catalog {
    version: u32,
    balance: Balance,
    characters: Vec<Character>,
    upgrades: Vec<Vec<Upgrade>>,
    unlocks: Vec<PermanentUnlock>,
    achievements: Vec<Achievement>,
    character_index: BTreeMap<CharacterId, usize>,
    unlock_index: BTreeMap<UnlockId, usize>,
    achievement_index: BTreeMap<AchievementId, usize>,
    non_combat: Option<CharacterId>,
    bootstrap: Option<CharacterId>,
}

fn require(ok: bool, what: &str) -> Result<(), CatalogError> {
    if ok {
        Ok(())
    } else {
        Err(CatalogError::InvalidBalance(what.to_string()))
    }
}

/// Validate balance constants the formulas divide by or exponentiate.
pub fn validate_balance(b: &Balance) -> Result<(), CatalogError> {
    require(b.base_health > 0.0, "base_health must be > 0")?;
    require(b.early_growth > 1.0, "early_growth must be > 1")?;
    require(b.late_growth > 1.0, "late_growth must be > 1")?;
    require(b.growth_threshold >= 1, "growth_threshold must be >= 1")?;
    if let Some(iv) = &b.interval_scaling {
        require(iv.every > 0, "interval_scaling.every must be > 0")?;
        require(iv.step.is_finite(), "interval_scaling.step must be finite")?;
    }
    require(b.min_monsters_per_depth >= 1, "min_monsters_per_depth must be >= 1")?;
    require(
        b.monsters_per_depth >= b.min_monsters_per_depth,
        "monsters_per_depth below its minimum",
    )?;
    require(
        b.min_boss_multiplier > 0.0 && b.boss_multiplier >= b.min_boss_multiplier,
        "boss multipliers must satisfy 0 < min <= base",
    )?;
    require(b.gold_divisor > 0.0, "gold_divisor must be > 0")?;
    require(
        b.gold_escalation >= 1.0 && b.gold_escalation_cap >= 1.0,
        "gold escalation and cap must be >= 1",
    )?;
    require(
        b.cost_growth > 1.0 && b.elite_cost_growth > 1.0,
        "cost growth must be > 1",
    )?;
    require(
        (0.0..100.0).contains(&b.max_discount_percent),
        "max_discount_percent must be in [0, 100)",
    )?;
    require(
        b.upgrade_cost_tiers.iter().all(|t| t.is_finite() && *t >= 0.0),
        "upgrade cost tiers must be finite and >= 0",
    )?;
    let lb = &b.level_bonus;
    require(
        lb.quad_every > 0 && lb.tenfold_every > 0 && lb.elite_every > 0,
        "level bonus intervals must be > 0",
    )?;
    require(
        lb.quad_factor >= 1.0 && lb.tenfold_factor >= 1.0 && lb.elite_factor >= 1.0,
        "level bonus factors must be >= 1",
    )?;
    require(b.prestige_percent >= 0.0, "prestige_percent must be >= 0")?;
    require(
        b.premium_damage_multiplier >= 1.0,
        "premium_damage_multiplier must be >= 1",
    )?;
    require(b.base_click_damage >= 0.0, "base_click_damage must be >= 0")?;
    let r = &b.reward;
    require(r.milestone > 0, "reward.milestone must be > 0")?;
    require(
        r.divisor > 0.0 && r.levels_per_reward > 0.0,
        "reward divisors must be > 0",
    )?;
    require(r.flat >= 0.0 && r.exponent > 0.0, "reward curve must be non-negative")?;
    require(
        (0.0..=1.0).contains(&r.base_chance),
        "reward.base_chance must be in [0, 1]",
    )?;
    require(b.bootstrap_exponent > 0.0, "bootstrap_exponent must be > 0")?;
    require(b.leftover_divisor > 0.0, "leftover_divisor must be > 0")?;
    require(
        b.combo.duration_secs >= 0.0 && b.combo.burst_bonus >= 0.0 && b.combo.rush_bonus >= 0.0,
        "combo tuning must be >= 0",
    )?;
    Ok(())
}

fn index_unique<K: Ord + Copy>(
    ids: impl Iterator<Item = K>,
    kind: &'static str,
    raw: impl Fn(K) -> u32,
) -> Result<BTreeMap<K, usize>, CatalogError> {
    let mut index = BTreeMap::new();
    for (i, id) in ids.enumerate() {
        if index.insert(id, i).is_some() {
            return Err(CatalogError::Duplicate { kind, id: raw(id) });
        }
    }
    Ok(index)
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = CatalogError;

    fn try_from(doc: CatalogDocument) -> Result<Self, Self::Error> {
        validate_balance(&doc.balance)?;
        if doc.characters.is_empty() {
            return Err(CatalogError::Empty);
        }
        let character_index = index_unique(doc.characters.iter().map(|c| c.id), "character", |k| k.0)?;
        let unlock_index = index_unique(doc.unlocks.iter().map(|u| u.id), "unlock", |k| k.0)?;
        let achievement_index =
            index_unique(doc.achievements.iter().map(|a| a.id), "achievement", |k| k.0)?;
        index_unique(doc.upgrades.iter().map(|u| u.id), "upgrade", |k| k.0)?;

        let mut characters = doc.characters;
        for (ordinal, c) in characters.iter_mut().enumerate() {
            if c.base_cost.is_zero() {
                return Err(CatalogError::NonPositiveCost(c.id.0));
            }
            c.ordinal = ordinal;
        }

        let mut upgrades: Vec<Vec<Upgrade>> = vec![Vec::new(); characters.len()];
        for u in doc.upgrades {
            let Some(&ordinal) = character_index.get(&u.character) else {
                return Err(CatalogError::MissingCharacter {
                    upgrade: u.id.0,
                    character: u.character.0,
                });
            };
            if u.effect.percent().is_some_and(|p| p < Decimal::ZERO) {
                return Err(CatalogError::NegativePercent {
                    kind: "upgrade",
                    id: u.id.0,
                });
            }
            if u.cost_tier >= doc.balance.upgrade_cost_tiers.len() {
                return Err(CatalogError::UnknownCostTier {
                    upgrade: u.id.0,
                    tier: u.cost_tier,
                });
            }
            upgrades[ordinal].push(u);
        }
        for list in &mut upgrades {
            list.sort_by_key(|u| (u.required_level, u.id));
        }

        if let Some(u) = doc.unlocks.iter().find(|u| u.per_level < Decimal::ZERO) {
            return Err(CatalogError::NegativePercent {
                kind: "unlock",
                id: u.id.0,
            });
        }
        if let Some(a) = doc
            .achievements
            .iter()
            .find(|a| a.damage_percent < Decimal::ZERO)
        {
            return Err(CatalogError::NegativePercent {
                kind: "achievement",
                id: a.id.0,
            });
        }

        if let Some(id) = doc.non_combat_character {
            if !character_index.contains_key(&id) {
                return Err(CatalogError::MissingNonCombat(id.0));
            }
        }

        Ok(Catalog {
            version: doc.version,
            balance: doc.balance,
            characters,
            upgrades,
            unlocks: doc.unlocks,
            achievements: doc.achievements,
            character_index,
            unlock_index,
            achievement_index,
            non_combat: doc.non_combat_character,
            bootstrap: doc.bootstrap_character,
        })
    }
}

impl Catalog {
    /// Parse and validate a YAML catalog.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Catalog::try_from(doc)
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Catalog::try_from(doc)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Characters in catalog order.
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.character_index.get(&id).map(|&i| &self.characters[i])
    }

    /// Upgrades owned by the character at `ordinal`, sorted by required level.
    pub fn upgrades_for(&self, ordinal: usize) -> &[Upgrade] {
        self.upgrades.get(ordinal).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn unlocks(&self) -> &[PermanentUnlock] {
        &self.unlocks
    }

    pub fn unlock(&self, id: UnlockId) -> Option<&PermanentUnlock> {
        self.unlock_index.get(&id).map(|&i| &self.unlocks[i])
    }

    pub fn achievement(&self, id: AchievementId) -> Option<&Achievement> {
        self.achievement_index.get(&id).map(|&i| &self.achievements[i])
    }

    pub fn non_combat_character(&self) -> Option<CharacterId> {
        self.non_combat
    }

    /// The bootstrap character, if the catalog contains it.
    pub fn bootstrap_character(&self) -> Option<&Character> {
        self.bootstrap.and_then(|id| self.character(id))
    }
}
