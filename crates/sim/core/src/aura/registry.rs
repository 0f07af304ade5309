//! Timed-effect registry owned by a single unit.
//!
//! # Lifecycle
//!
//! An aura lives over `[applied_at, expires_at)`. A zero-stack aura is absent:
//! it is removed from the registry, never kept as an empty record.
//!
//! Gain and expire are edge-triggered. `on_gain` runs on absent -> present,
//! `on_expire` on present -> absent, exactly once per activation whether the
//! aura is deactivated explicitly or lapses when time passes `expires_at`.
//! Refreshing or stacking an active aura emits a separate event and leaves
//! the modifiers alone.

use std::collections::BTreeMap;

use core::time::Duration;

use super::modifiers::{ModifierSet, ModifierSource};
use crate::error::InvariantViolation;
use crate::ids::{AuraId, UnitId};
use crate::spellbook::AuraDefinition;
use crate::time::SimTime;

/// Key of an aura instance within a holder's registry.
///
/// Debuffs from several agents can sit on one target; the source keeps them
/// apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuraKey {
    pub aura: AuraId,
    pub source: UnitId,
}

impl AuraKey {
    pub fn new(aura: AuraId, source: UnitId) -> Self {
        Self { aura, source }
    }
}

/// Active aura record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuraInstance {
    pub key: AuraKey,
    pub applied_at: SimTime,
    pub expires_at: SimTime,
    pub stacks: u8,
    pub max_stacks: u8,
}

impl AuraInstance {
    pub fn is_active(&self, time: SimTime) -> bool {
        self.applied_at <= time && time < self.expires_at
    }

    pub fn remaining(&self, time: SimTime) -> Duration {
        self.expires_at.saturating_since(time)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpireCause {
    Natural,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuraEventKind {
    Gained,
    Refreshed,
    StacksChanged { from: u8, to: u8 },
    Expired(ExpireCause),
}

/// Lifecycle transition recorded by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuraEvent {
    pub at: SimTime,
    pub holder: UnitId,
    pub key: AuraKey,
    pub kind: AuraEventKind,
}

/// Collection of auras attached to one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuraRegistry {
    holder: UnitId,
    instances: BTreeMap<AuraKey, AuraInstance>,
    /// Modifiers each instance acquired on gain, released on expire.
    granted: BTreeMap<AuraKey, Vec<crate::ids::ModifierId>>,
}

impl AuraRegistry {
    pub fn new(holder: UnitId) -> Self {
        Self {
            holder,
            instances: BTreeMap::new(),
            granted: BTreeMap::new(),
        }
    }

    pub fn holder(&self) -> UnitId {
        self.holder
    }

    /// Activates or refreshes `def` from `source` for `duration`.
    ///
    /// Absent: stacks = 1, modifiers acquired, `Gained`. Present: stacks
    /// incremented up to the cap and the expiry refreshed.
    pub fn activate(
        &mut self,
        def: &AuraDefinition,
        source: UnitId,
        now: SimTime,
        duration: Duration,
        modifiers: &mut ModifierSet,
        events: &mut Vec<AuraEvent>,
    ) -> Result<AuraInstance, InvariantViolation> {
        let key = AuraKey::new(def.id, source);
        let expires_at = now + duration;

        if let Some(instance) = self.instances.get_mut(&key) {
            let from = instance.stacks;
            let to = from.saturating_add(1).min(instance.max_stacks);
            instance.stacks = to;
            instance.expires_at = expires_at;
            let kind = if from == to {
                AuraEventKind::Refreshed
            } else {
                AuraEventKind::StacksChanged { from, to }
            };
            let snapshot = *instance;
            events.push(self.event(now, key, kind));
            return Ok(snapshot);
        }

        if def.max_stacks == 0 {
            return Err(InvariantViolation::StacksOverMax {
                aura: def.id,
                stacks: 1,
                max: 0,
            });
        }

        let instance = AuraInstance {
            key,
            applied_at: now,
            expires_at,
            stacks: 1,
            max_stacks: def.max_stacks,
        };
        self.instances.insert(key, instance);

        let mod_source = self.modifier_source(key);
        for modifier in &def.modifiers {
            modifiers.acquire(*modifier, mod_source);
        }
        self.granted.insert(key, def.modifiers.clone());

        tracing::trace!(holder = %self.holder, aura = %def.id, %expires_at, "aura gained");
        events.push(self.event(now, key, AuraEventKind::Gained));
        Ok(instance)
    }

    /// Removes the aura immediately and runs its expire side effects.
    ///
    /// Returns false if it was already absent; calling this twice is a no-op.
    pub fn deactivate(
        &mut self,
        key: AuraKey,
        now: SimTime,
        modifiers: &mut ModifierSet,
        events: &mut Vec<AuraEvent>,
    ) -> Result<bool, InvariantViolation> {
        if !self.instances.contains_key(&key) {
            return Ok(false);
        }
        self.remove(key, now, ExpireCause::Cancelled, modifiers, events)?;
        Ok(true)
    }

    /// Removes one stack; the aura expires when the last stack goes.
    pub fn remove_stack(
        &mut self,
        key: AuraKey,
        now: SimTime,
        modifiers: &mut ModifierSet,
        events: &mut Vec<AuraEvent>,
    ) -> Result<(), InvariantViolation> {
        let Some(instance) = self.instances.get_mut(&key) else {
            return Err(InvariantViolation::StackUnderflow { aura: key.aura });
        };
        if instance.stacks <= 1 {
            return self.remove(key, now, ExpireCause::Cancelled, modifiers, events);
        }
        let from = instance.stacks;
        instance.stacks -= 1;
        let to = instance.stacks;
        events.push(self.event(now, key, AuraEventKind::StacksChanged { from, to }));
        Ok(())
    }

    /// Expires every aura whose lifetime ended at or before `now`, in expiry
    /// order.
    pub fn expire_due(
        &mut self,
        now: SimTime,
        modifiers: &mut ModifierSet,
        events: &mut Vec<AuraEvent>,
    ) -> Result<(), InvariantViolation> {
        let mut due: Vec<(SimTime, AuraKey)> = self
            .instances
            .values()
            .filter(|i| i.expires_at <= now)
            .map(|i| (i.expires_at, i.key))
            .collect();
        due.sort();

        for (at, key) in due {
            self.remove(key, at, ExpireCause::Natural, modifiers, events)?;
        }
        Ok(())
    }

    /// Overrides the expiry of an active aura (periodic effects align it with
    /// their last tick).
    pub fn set_expiry(&mut self, key: AuraKey, expires_at: SimTime) {
        if let Some(instance) = self.instances.get_mut(&key) {
            instance.expires_at = expires_at;
        }
    }

    fn remove(
        &mut self,
        key: AuraKey,
        at: SimTime,
        cause: ExpireCause,
        modifiers: &mut ModifierSet,
        events: &mut Vec<AuraEvent>,
    ) -> Result<(), InvariantViolation> {
        if self.instances.remove(&key).is_none() {
            return Ok(());
        }
        let mod_source = self.modifier_source(key);
        for modifier in self.granted.remove(&key).unwrap_or_default() {
            modifiers.release(modifier, mod_source)?;
        }
        tracing::trace!(holder = %self.holder, aura = %key.aura, ?cause, "aura expired");
        events.push(self.event(at, key, AuraEventKind::Expired(cause)));
        Ok(())
    }

    fn modifier_source(&self, key: AuraKey) -> ModifierSource {
        ModifierSource {
            holder: self.holder,
            aura: key.aura,
            applier: key.source,
        }
    }

    fn event(&self, at: SimTime, key: AuraKey, kind: AuraEventKind) -> AuraEvent {
        AuraEvent {
            at,
            holder: self.holder,
            key,
            kind,
        }
    }

    pub fn get(&self, key: AuraKey) -> Option<&AuraInstance> {
        self.instances.get(&key)
    }

    pub fn is_active(&self, key: AuraKey, time: SimTime) -> bool {
        self.get(key).is_some_and(|i| i.is_active(time))
    }

    /// `max(0, expires_at - time)`, zero if absent.
    pub fn remaining_duration(&self, key: AuraKey, time: SimTime) -> Duration {
        self.get(key)
            .map_or(Duration::ZERO, |instance| instance.remaining(time))
    }

    pub fn stacks(&self, key: AuraKey) -> u8 {
        self.get(key).map_or(0, |i| i.stacks)
    }

    pub fn next_expiry(&self) -> Option<SimTime> {
        self.instances.values().map(|i| i.expires_at).min()
    }

    pub fn keys(&self) -> impl Iterator<Item = AuraKey> + '_ {
        self.instances.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
