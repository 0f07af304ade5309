use core::time::Duration;

use crate::error::{CastError, InvariantViolation};
use crate::ids::{AbilityId, AuraId, ModifierId, UnitId};
use crate::resource::{PointCounter, ResourceLedger};
use crate::spellbook::Spellbook;
use crate::time::SimTime;
use crate::unit::CastOutcome;

/// The acting unit as seen by the rotation engine.
///
/// Queries are pure. Only [`Caster::advance_to`] and [`Caster::cast`] mutate,
/// and both run synchronously inside an evaluation step.
pub trait Caster {
    fn id(&self) -> UnitId;

    fn now(&self) -> SimTime;

    /// Moves the caster's clock to `time`, resolving every event due on the
    /// way in time order.
    fn advance_to(&mut self, time: SimTime) -> Result<(), InvariantViolation>;

    fn spellbook(&self) -> &Spellbook;

    /// Cooldown, action lock, required aura, target and current resource all
    /// permit casting `ability` right now.
    fn can_cast(&self, ability: AbilityId, target: UnitId) -> bool;

    /// Executes `ability` on `target`. Nothing is committed on error.
    fn cast(&mut self, ability: AbilityId, target: UnitId) -> Result<CastOutcome, CastError>;

    /// Resource cost of `ability` if cast at `at`, using projected modifier
    /// state for future instants.
    fn cost_of(&self, ability: AbilityId, at: SimTime) -> f64;

    fn is_modifier_active_at(&self, modifier: ModifierId, at: SimTime) -> bool;

    /// Remaining duration of the caster's own `aura` on `holder`.
    fn remaining_duration(&self, holder: UnitId, aura: AuraId) -> Duration;

    fn aura_expires_at(&self, holder: UnitId, aura: AuraId) -> Option<SimTime>;

    fn stacks(&self, holder: UnitId, aura: AuraId) -> u8;

    fn is_aura_active(&self, holder: UnitId, aura: AuraId) -> bool {
        !self.remaining_duration(holder, aura).is_zero()
    }

    fn has_target(&self, target: UnitId) -> bool;

    fn resource(&self) -> &ResourceLedger;

    fn points(&self) -> &PointCounter;

    /// Time at which the cooldown of `ability` ends.
    fn ready_at(&self, ability: AbilityId) -> SimTime;

    fn action_lock(&self) -> SimTime;

    /// Earliest scheduled state change strictly after `time`: deferred
    /// impacts, periodic ticks, aura expiries, cooldowns and the lock.
    fn next_event_after(&self, time: SimTime) -> Option<SimTime>;
}
