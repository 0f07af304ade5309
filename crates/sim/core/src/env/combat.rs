use std::collections::VecDeque;

use crate::ids::UnitId;
use crate::spellbook::{AbilityDefinition, PeriodicDefinition};
use crate::time::SimTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitResult {
    Hit,
    Crit,
    Miss,
    Dodge,
}

impl HitResult {
    /// Whether the outcome applies its effects.
    pub fn landed(self) -> bool {
        matches!(self, Self::Hit | Self::Crit)
    }
}

/// Everything the oracle may read when rolling an outcome.
#[derive(Clone, Copy, Debug)]
pub struct StrikeRequest<'a> {
    pub ability: &'a AbilityDefinition,
    pub target: UnitId,
    pub at: SimTime,
    /// Points consumed by a finisher, zero otherwise.
    pub points: u32,
    /// Product of the caster's active damage multipliers.
    pub damage_multiplier: f64,
}

/// Rolled outcome of a strike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strike {
    pub result: HitResult,
    pub amount: f64,
}

impl Strike {
    pub const MISS: Self = Self {
        result: HitResult::Miss,
        amount: 0.0,
    };
}

/// Hit tables and damage arithmetic.
///
/// Implementations own their randomness. Helpful abilities never reach
/// [`CombatOracle::strike`]; they always land.
pub trait CombatOracle: Send {
    fn strike(&mut self, request: &StrikeRequest<'_>) -> Strike;

    /// Per-tick amount of a periodic effect applied by `request`.
    fn periodic_snapshot(
        &mut self,
        request: &StrikeRequest<'_>,
        periodic: &PeriodicDefinition,
    ) -> f64;

    /// Rolls a proc with probability `chance`.
    fn proc(&mut self, chance: f64) -> bool;
}

/// Oracle with a single fixed outcome, for tests and dry runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedCombat {
    pub result: HitResult,
    pub amount: f64,
    pub tick_amount: f64,
}

impl FixedCombat {
    pub fn hitting(amount: f64) -> Self {
        Self {
            result: HitResult::Hit,
            amount,
            tick_amount: amount,
        }
    }

    pub fn missing() -> Self {
        Self {
            result: HitResult::Miss,
            amount: 0.0,
            tick_amount: 0.0,
        }
    }
}

impl CombatOracle for FixedCombat {
    fn strike(&mut self, request: &StrikeRequest<'_>) -> Strike {
        if !self.result.landed() {
            return Strike {
                result: self.result,
                amount: 0.0,
            };
        }
        Strike {
            result: self.result,
            amount: self.amount * request.damage_multiplier,
        }
    }

    fn periodic_snapshot(&mut self, request: &StrikeRequest<'_>, _: &PeriodicDefinition) -> f64 {
        self.tick_amount * request.damage_multiplier
    }

    fn proc(&mut self, chance: f64) -> bool {
        chance >= 1.0
    }
}

/// Oracle replaying a fixed sequence of results, then hitting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptedCombat {
    results: VecDeque<HitResult>,
    amount: f64,
}

impl ScriptedCombat {
    pub fn new(results: impl IntoIterator<Item = HitResult>, amount: f64) -> Self {
        Self {
            results: results.into_iter().collect(),
            amount,
        }
    }
}

impl CombatOracle for ScriptedCombat {
    fn strike(&mut self, request: &StrikeRequest<'_>) -> Strike {
        let result = self.results.pop_front().unwrap_or(HitResult::Hit);
        if !result.landed() {
            return Strike { result, amount: 0.0 };
        }
        Strike {
            result,
            amount: self.amount * request.damage_multiplier,
        }
    }

    fn periodic_snapshot(&mut self, request: &StrikeRequest<'_>, _: &PeriodicDefinition) -> f64 {
        self.amount * request.damage_multiplier
    }

    fn proc(&mut self, chance: f64) -> bool {
        chance >= 1.0
    }
}
