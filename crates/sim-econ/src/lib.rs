#![deny(warnings)]

//! Balance formulas: monster health and rewards by depth, character cost
//! and damage by level, and aggregation of snapshot unlocks into effects.
//!
//! Everything here is pure. A [`MonsterCurve`] is built once per catalog and
//! may be shared between runs; [`Pricing`] borrows the catalog and carries the
//! snapshot-derived discount and prestige of a single run.

pub mod monster;
pub mod pricing;
pub mod unlocks;

pub use monster::{early_health, is_boss, MonsterCurve, Window, BOSS_INTERVAL};
pub use pricing::Pricing;
pub use unlocks::{solomon_percent, unlock_value, UnlockEffects};

use sim_core::NumError;
use thiserror::Error;

/// Errors produced by formula evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EconError {
    #[error(transparent)]
    Num(#[from] NumError),
    /// Depths are 1-based.
    #[error("invalid depth {0}")]
    InvalidDepth(u64),
    #[error("no character at ordinal {0}")]
    UnknownCharacter(usize),
}
