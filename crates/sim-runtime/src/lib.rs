#![deny(warnings)]

//! Session simulator for the progression engine.
//!
//! An [`Engine`] owns the shared catalog and its memoized monster curve.
//! Each [`Engine::simulate`] call derives its own [`SimulationFactors`] and
//! leveling plan, so runs never share mutable state and can execute in
//! parallel through [`Engine::simulate_variants`].

pub mod engine;
pub mod factors;
pub mod result;

pub use engine::{best_variant, Engine};
pub use factors::SimulationFactors;
pub use result::{Confidence, SimulateResult, StopReason, WindowRecord};

use sim_ai::PlanError;
use sim_core::NumError;
use sim_econ::EconError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Formula evaluation failed.
    #[error(transparent)]
    Econ(#[from] EconError),
    /// The leveling planner failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Invalid arithmetic in the depth walk.
    #[error(transparent)]
    Num(#[from] NumError),
    /// The run-wide damage multiplier is zero, so no window can be cleared.
    #[error("damage multiplier is zero")]
    ZeroDamageFactor,
    /// A cooldown plan with negative or non-finite entries.
    #[error("cooldown plan entries must be finite and non-negative")]
    InvalidPlan,
    /// A [`SimConfig`](sim_core::SimConfig) field outside its domain.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
