#![deny(warnings)]

//! Core domain models for the progression engine.
//!
//! This crate defines the extended-precision number used for every game
//! quantity, the static balance catalog, the per-run snapshot and cooldown
//! plan, and the run configuration. Loading helpers validate catalog
//! invariants up front so later layers can index freely.

pub mod bignum;
pub mod catalog;
pub mod config;
pub mod snapshot;

pub use bignum::{BigNum, NumError};
pub use catalog::{
    validate_balance, Achievement, AchievementId, Balance, Catalog, CatalogDocument,
    CatalogError, Character, CharacterId, ComboBalance, IntervalScaling, LevelBonus,
    PermanentUnlock, RewardCurve, Scaling, UnlockBucket, UnlockId, UnlockTarget, Upgrade,
    UpgradeEffect, UpgradeId,
};
pub use config::SimConfig;
pub use snapshot::{ComboCategory, ComboUsage, CooldownPlan, Snapshot};

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a YAML or JSON document, chosen by file extension (`.json` is JSON,
/// anything else YAML).
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), "read document");
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&text).map_err(|e| CatalogError::Parse(e.to_string()))
    } else {
        serde_yaml::from_str(&text).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let doc: CatalogDocument = read_document(path)?;
    Catalog::try_from(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn bundled_catalog_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/catalog.yaml");
        let catalog = load_catalog(&path).unwrap();
        assert!(catalog.characters().len() > 20);
        assert!(catalog.bootstrap_character().is_some());
        let nc = catalog.non_combat_character().unwrap();
        assert!(catalog.character(nc).unwrap().base_damage.is_zero());
    }

    #[test]
    fn bundled_snapshot_and_plan_load() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let snap: Snapshot = read_document(&root.join("snapshot.yaml")).unwrap();
        assert!(!snap.unlock_levels.is_empty());
        let plan: CooldownPlan = read_document(&root.join("plan.yaml")).unwrap();
        assert!(!plan.is_idle());
        assert!(plan.is_valid());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
