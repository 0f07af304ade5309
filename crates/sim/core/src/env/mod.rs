//! Interfaces to the collaborators around the decision core.
//!
//! [`Caster`] is what the rotation engine drives. [`CombatOracle`] rolls
//! outcomes and amounts, [`ModifierForecast`] predicts modifier state at a
//! future instant, and [`RngOracle`] supplies deterministic randomness to
//! oracle implementations.
mod caster;
mod combat;
mod forecast;
mod rng;

pub use caster::Caster;
pub use combat::{CombatOracle, FixedCombat, HitResult, ScriptedCombat, Strike, StrikeRequest};
pub use forecast::{AuraForecast, CooldownForecast, CooldownGrant, ForecastView, ModifierForecast};
pub use rng::{PcgRng, RngOracle, compute_seed};
