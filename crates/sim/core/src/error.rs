//! Common error infrastructure for sim-core.
//!
//! Error taxonomy:
//!
//! - **Starvation** is not an error. The rotation engine reports it as a
//!   `Wait` decision.
//! - [`InsufficientResource`]: a spend exceeded the balance. Always checked
//!   before commit; the only recovery is to not execute.
//! - [`InvariantViolation`]: a planning bug (clock moving backward, point
//!   counter overflow, negative stacks). Fatal, never clamped.
//! - [`SetupError`]: configuration gaps detected while building a spellbook or
//!   rule table. Fatal at setup time, never at evaluation time.
//!
//! A missed cast is not an error either; it follows the ability's refund path.

use crate::ids::{AbilityId, AuraId, ModifierId, UnitId};
use crate::time::SimTime;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Temporary condition; the caller may wait and retry.
    ///
    /// Examples: resource short, ability on cooldown, action lock held
    Recoverable,

    /// Invalid input that should not be retried without changes.
    ///
    /// Examples: unknown ability, unknown target
    Validation,

    /// Unexpected state inconsistency that indicates a bug.
    Internal,

    /// The run cannot continue.
    ///
    /// Examples: clock moved backward, stack count below zero
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if the simulation run must abort.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all sim-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait SimError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// A spend attempted more than the current balance. No partial spend happens.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[error("insufficient resource: requested {requested:.2}, available {available:.2}")]
pub struct InsufficientResource {
    pub requested: f64,
    pub available: f64,
}

impl SimError for InsufficientResource {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        "INSUFFICIENT_RESOURCE"
    }
}

/// Broken state invariants. Always fatal.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("clock moved backward: now {now}, requested {requested}")]
    ClockBackwards { now: SimTime, requested: SimTime },

    #[error("resource out of range: current {current}, max {max}")]
    ResourceOutOfRange { current: f64, max: f64 },

    #[error("regeneration tick period is zero")]
    ZeroRegenTick,

    #[error("point counter above max: current {current}, max {max}")]
    PointsOverMax { current: u32, max: u32 },

    #[error("{aura} stack count would drop below zero")]
    StackUnderflow { aura: AuraId },

    #[error("{aura} stack count {stacks} exceeds max {max}")]
    StacksOverMax { aura: AuraId, stacks: u8, max: u8 },

    #[error("{modifier} released by a source that never acquired it")]
    ModifierNotHeld { modifier: ModifierId },
}

impl SimError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use InvariantViolation::*;
        match self {
            ClockBackwards { .. } => "INVARIANT_CLOCK_BACKWARDS",
            ResourceOutOfRange { .. } => "INVARIANT_RESOURCE_OUT_OF_RANGE",
            ZeroRegenTick => "INVARIANT_ZERO_REGEN_TICK",
            PointsOverMax { .. } => "INVARIANT_POINTS_OVER_MAX",
            StackUnderflow { .. } => "INVARIANT_STACK_UNDERFLOW",
            StacksOverMax { .. } => "INVARIANT_STACKS_OVER_MAX",
            ModifierNotHeld { .. } => "INVARIANT_MODIFIER_NOT_HELD",
        }
    }
}

/// Reasons a cast could not be committed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CastError {
    #[error("{0} is not in the spellbook")]
    UnknownAbility(AbilityId),

    #[error("target {0} is not present")]
    UnknownTarget(UnitId),

    #[error("{ability} is on cooldown until {ready_at}")]
    OnCooldown { ability: AbilityId, ready_at: SimTime },

    #[error("action lock held until {ready_at}")]
    ActionLocked { ready_at: SimTime },

    #[error("{ability} requires {aura} to be active")]
    MissingAura { ability: AbilityId, aura: AuraId },

    #[error(transparent)]
    Insufficient(#[from] InsufficientResource),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl SimError for CastError {
    fn severity(&self) -> ErrorSeverity {
        use CastError::*;
        match self {
            UnknownAbility(_) | UnknownTarget(_) => ErrorSeverity::Validation,
            OnCooldown { .. } | ActionLocked { .. } | MissingAura { .. } | Insufficient(_) => {
                ErrorSeverity::Recoverable
            }
            Invariant(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        use CastError::*;
        match self {
            UnknownAbility(_) => "CAST_UNKNOWN_ABILITY",
            UnknownTarget(_) => "CAST_UNKNOWN_TARGET",
            OnCooldown { .. } => "CAST_ON_COOLDOWN",
            ActionLocked { .. } => "CAST_ACTION_LOCKED",
            MissingAura { .. } => "CAST_MISSING_AURA",
            Insufficient(e) => e.error_code(),
            Invariant(e) => e.error_code(),
        }
    }
}

/// Configuration gaps detected while assembling a spellbook or rule table.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("{owner} references unknown {ability}")]
    UnknownAbility { owner: String, ability: AbilityId },

    #[error("{owner} references unknown {aura}")]
    UnknownAura { owner: String, aura: AuraId },

    #[error("{owner} references unknown {modifier}")]
    UnknownModifier { owner: String, modifier: ModifierId },

    #[error("duplicate definition for {0}")]
    Duplicate(String),

    #[error("rule '{rule}' ({tier}) is listed after a {previous} rule")]
    RuleOutOfOrder {
        rule: String,
        tier: &'static str,
        previous: &'static str,
    },

    #[error("rule table is empty")]
    EmptyRuleTable,

    #[error("invalid definition for {owner}: {reason}")]
    InvalidDefinition { owner: String, reason: &'static str },
}

impl SimError for SetupError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use SetupError::*;
        match self {
            UnknownAbility { .. } => "SETUP_UNKNOWN_ABILITY",
            UnknownAura { .. } => "SETUP_UNKNOWN_AURA",
            UnknownModifier { .. } => "SETUP_UNKNOWN_MODIFIER",
            Duplicate(_) => "SETUP_DUPLICATE",
            RuleOutOfOrder { .. } => "SETUP_RULE_OUT_OF_ORDER",
            EmptyRuleTable => "SETUP_EMPTY_RULE_TABLE",
            InvalidDefinition { .. } => "SETUP_INVALID_DEFINITION",
        }
    }
}
