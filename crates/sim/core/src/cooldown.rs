//! Per-ability reuse timers and the shared action lock.
//!
//! An ability is usable iff `now >= ready_at`. The action lock is a single
//! `ready_at` shared by every instantaneous action of the agent.

use std::collections::BTreeMap;

use core::time::Duration;

use crate::ids::AbilityId;
use crate::time::SimTime;

/// Shared gate serializing all instantaneous actions (global cooldown).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionLock {
    ready_at: SimTime,
}

impl ActionLock {
    pub fn ready_at(&self) -> SimTime {
        self.ready_at
    }

    pub fn is_ready(&self, now: SimTime) -> bool {
        now >= self.ready_at
    }

    /// Holds the lock for `duration` starting at `now`.
    pub fn engage(&mut self, now: SimTime, duration: Duration) {
        self.ready_at = self.ready_at.max(now + duration);
    }
}

/// Reuse timers keyed by ability.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CooldownTracker {
    ready_at: BTreeMap<AbilityId, SimTime>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_at(&self, ability: AbilityId) -> SimTime {
        self.ready_at
            .get(&ability)
            .copied()
            .unwrap_or(SimTime::ZERO)
    }

    pub fn is_ready(&self, ability: AbilityId, now: SimTime) -> bool {
        now >= self.ready_at(ability)
    }

    /// Starts the cooldown for `ability`. Zero-length cooldowns are not recorded.
    pub fn trigger(&mut self, ability: AbilityId, now: SimTime, cooldown: Duration) {
        if cooldown.is_zero() {
            return;
        }
        self.ready_at.insert(ability, now + cooldown);
    }

    /// Clears a cooldown (e.g. a reset proc).
    pub fn reset(&mut self, ability: AbilityId) {
        self.ready_at.remove(&ability);
    }

    /// Earliest cooldown that is still pending after `now`.
    pub fn next_ready_after(&self, now: SimTime) -> Option<SimTime> {
        self.ready_at.values().copied().filter(|t| *t > now).min()
    }
}
