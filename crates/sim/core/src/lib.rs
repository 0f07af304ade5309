//! Deterministic rotation decision core.
//!
//! `sim-core` answers one question for a single agent: what does it do next,
//! and when does it next need to be asked. Everything here is synchronous and
//! single-threaded; time moves in discrete jumps to the next scheduled event.
//!
//! The pieces, leaf first:
//!
//! - [`time`]: the simulation clock
//! - [`resource`]: the regenerating resource ledger and the point counter
//! - [`cooldown`]: per-ability cooldowns and the shared action lock
//! - [`aura`]: timed effects and the shared modifiers they toggle
//! - [`periodic`]: damage-over-time ticks bound to an aura
//! - [`deferred`]: outcomes waiting out their travel time
//! - [`pooling`]: resource held back for forecast refreshes
//! - [`rotation`]: the priority rule engine
//!
//! [`unit::Agent`] ties them together behind the [`env::Caster`] interface the
//! rotation engine drives.
pub mod aura;
pub mod config;
pub mod cooldown;
pub mod deferred;
pub mod env;
pub mod error;
pub mod ids;
pub mod periodic;
pub mod pooling;
pub mod resource;
pub mod rotation;
pub mod spellbook;
pub mod time;
pub mod unit;

pub use aura::{AuraEvent, AuraEventKind, AuraInstance, AuraKey, AuraRegistry, ModifierSet};
pub use config::SimConfig;
pub use cooldown::{ActionLock, CooldownTracker};
pub use deferred::DeferredQueue;
pub use env::{
    AuraForecast, Caster, CombatOracle, CooldownForecast, CooldownGrant, FixedCombat, HitResult,
    ModifierForecast, PcgRng, RngOracle, ScriptedCombat, Strike, StrikeRequest, compute_seed,
};
pub use error::{
    CastError, ErrorSeverity, InsufficientResource, InvariantViolation, SetupError, SimError,
};
pub use ids::{AbilityId, AuraId, ModifierId, UnitId};
pub use periodic::{PeriodicEngine, PeriodicKey, PeriodicTick};
pub use pooling::{ObligationPlanner, ObligationRule, ObligationSet, PendingObligation};
pub use resource::{PointCounter, ResourceLedger, SpendReceipt};
pub use rotation::{
    Decision, EngineError, OnBlocked, RotationEngine, Rule, RuleContext, RuleTable, Tier,
};
pub use spellbook::{
    AbilityDefinition, AbilityFlags, AuraApplication, AuraDefinition, AuraHolder,
    ModifierDefinition, ModifierKind, PeriodicDefinition, Spellbook, SpellbookSpec,
};
pub use time::{Clock, SimTime};
pub use unit::{Agent, CastOutcome, CombatEvent, CombatLog};
