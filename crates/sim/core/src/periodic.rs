//! Multi-tick effects bound to an aura instance.
//!
//! A periodic effect captures a per-tick amount when applied and reuses it for
//! every tick unless it is rolling, in which case the caller supplies a fresh
//! snapshot at tick time. The effect ends when its ticks run out or when the
//! bound aura goes away, whichever comes first.

use std::collections::BTreeMap;

use core::time::Duration;

use crate::aura::AuraKey;
use crate::ids::UnitId;
use crate::spellbook::PeriodicDefinition;
use crate::time::SimTime;

/// Identifies a periodic effect: the unit carrying the bound aura plus the
/// aura instance key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodicKey {
    pub holder: UnitId,
    pub aura: AuraKey,
}

impl PeriodicKey {
    pub fn new(holder: UnitId, aura: AuraKey) -> Self {
        Self { holder, aura }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicEffect {
    pub key: PeriodicKey,
    pub snapshot: f64,
    pub tick_period: Duration,
    pub remaining_ticks: u32,
    pub next_tick_at: SimTime,
    pub rolling: bool,
}

impl PeriodicEffect {
    /// Time of the final scheduled tick.
    pub fn last_tick_at(&self) -> SimTime {
        let extra = self.tick_period * self.remaining_ticks.saturating_sub(1);
        self.next_tick_at + extra
    }
}

/// One resolved tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicTick {
    pub at: SimTime,
    pub key: PeriodicKey,
    pub amount: f64,
    /// Ticks left after this one.
    pub remaining: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeriodicEngine {
    effects: BTreeMap<PeriodicKey, PeriodicEffect>,
}

impl PeriodicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches or refreshes the effect for `key` at `now`.
    ///
    /// Returns the time of the last scheduled tick; the bound aura should
    /// expire then. Refreshing a rolling effect keeps the tick phase and resets
    /// the remaining count, so the pending partial tick is not lost. Refreshing
    /// a non-rolling effect restarts it from `now` with the new snapshot.
    pub fn apply(
        &mut self,
        key: PeriodicKey,
        def: &PeriodicDefinition,
        snapshot: f64,
        now: SimTime,
    ) -> SimTime {
        let tick_period = def.tick_period();

        if def.rolling {
            if let Some(effect) = self.effects.get_mut(&key) {
                effect.snapshot = snapshot;
                effect.remaining_ticks = def.tick_count;
                tracing::trace!(
                    holder = %key.holder,
                    aura = %key.aura.aura,
                    "rolling periodic extended"
                );
                return effect.last_tick_at();
            }
        }

        let effect = PeriodicEffect {
            key,
            snapshot,
            tick_period,
            remaining_ticks: def.tick_count,
            next_tick_at: now + tick_period,
            rolling: def.rolling,
        };
        self.effects.insert(key, effect);
        effect.last_tick_at()
    }

    pub fn get(&self, key: PeriodicKey) -> Option<&PeriodicEffect> {
        self.effects.get(&key)
    }

    pub fn is_rolling(&self, key: PeriodicKey) -> bool {
        self.effects.get(&key).is_some_and(|e| e.rolling)
    }

    /// Earliest pending tick, if any.
    pub fn next_tick_at(&self) -> Option<SimTime> {
        self.effects.values().map(|e| e.next_tick_at).min()
    }

    /// Effect with the earliest tick due at or before `now`.
    pub fn next_due(&self, now: SimTime) -> Option<PeriodicKey> {
        self.effects
            .values()
            .filter(|e| e.next_tick_at <= now)
            .min_by_key(|e| (e.next_tick_at, e.key))
            .map(|e| e.key)
    }

    /// Resolves the pending tick of `key`.
    ///
    /// `resnapshot` replaces the stored amount for rolling effects and is
    /// ignored otherwise. The effect is dropped after its final tick.
    pub fn tick(&mut self, key: PeriodicKey, resnapshot: Option<f64>) -> Option<PeriodicTick> {
        let effect = self.effects.get_mut(&key)?;
        if effect.rolling {
            if let Some(value) = resnapshot {
                effect.snapshot = value;
            }
        }

        let at = effect.next_tick_at;
        effect.remaining_ticks = effect.remaining_ticks.saturating_sub(1);
        effect.next_tick_at = at + effect.tick_period;
        let tick = PeriodicTick {
            at,
            key,
            amount: effect.snapshot,
            remaining: effect.remaining_ticks,
        };

        if tick.remaining == 0 {
            self.effects.remove(&key);
        }
        tracing::trace!(
            holder = %key.holder,
            aura = %key.aura.aura,
            %at,
            amount = tick.amount,
            "periodic tick"
        );
        Some(tick)
    }

    /// Drops the effect bound to `key`. Safe to call after it finished.
    pub fn cancel(&mut self, key: PeriodicKey) -> bool {
        self.effects.remove(&key).is_some()
    }

    /// Drops every effect carried by `holder`.
    pub fn cancel_holder(&mut self, holder: UnitId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|key, _| key.holder != holder);
        before - self.effects.len()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AuraId;

    const RIP: AuraId = AuraId(1079);

    fn key() -> PeriodicKey {
        PeriodicKey::new(UnitId::PRIMARY_TARGET, AuraKey::new(RIP, UnitId::AGENT))
    }

    fn bleed(rolling: bool) -> PeriodicDefinition {
        PeriodicDefinition {
            aura: RIP,
            tick_ms: 2_000,
            tick_count: 6,
            rolling,
        }
    }

    fn drain(engine: &mut PeriodicEngine, until: SimTime) -> Vec<PeriodicTick> {
        let mut ticks = Vec::new();
        while let Some(key) = engine.next_due(until) {
            ticks.extend(engine.tick(key, Some(999.0)));
        }
        ticks
    }

    #[test]
    fn non_rolling_total_matches_snapshot_times_count() {
        let mut engine = PeriodicEngine::new();
        let expires = engine.apply(key(), &bleed(false), 37.5, SimTime::ZERO);
        assert_eq!(expires, SimTime::from_secs(12));

        let ticks = drain(&mut engine, SimTime::from_secs(30));
        let total: f64 = ticks.iter().map(|t| t.amount).sum();

        assert_eq!(ticks.len(), 6);
        assert_eq!(total, 37.5 * 6.0);
        assert_eq!(ticks[0].at, SimTime::from_secs(2));
        assert_eq!(ticks[5].at, SimTime::from_secs(12));
        assert!(engine.is_empty());
    }

    #[test]
    fn non_rolling_refresh_restarts_and_resnapshots() {
        let mut engine = PeriodicEngine::new();
        engine.apply(key(), &bleed(false), 10.0, SimTime::ZERO);
        drain(&mut engine, SimTime::from_secs(5));

        let expires = engine.apply(key(), &bleed(false), 20.0, SimTime::from_secs(5));
        assert_eq!(expires, SimTime::from_secs(17));

        let effect = engine.get(key()).unwrap();
        assert_eq!(effect.remaining_ticks, 6);
        assert_eq!(effect.next_tick_at, SimTime::from_secs(7));
        assert_eq!(effect.snapshot, 20.0);
    }

    #[test]
    fn rolling_refresh_keeps_phase_and_extends() {
        let mut engine = PeriodicEngine::new();
        engine.apply(key(), &bleed(true), 10.0, SimTime::ZERO);
        drain(&mut engine, SimTime::from_secs(5));

        let expires = engine.apply(key(), &bleed(true), 10.0, SimTime::from_secs(5));
        // Next tick stays at 6s; six more ticks from there.
        assert_eq!(expires, SimTime::from_secs(16));
        assert_eq!(engine.get(key()).unwrap().next_tick_at, SimTime::from_secs(6));
    }

    #[test]
    fn rolling_ticks_take_live_snapshot() {
        let mut engine = PeriodicEngine::new();
        engine.apply(key(), &bleed(true), 10.0, SimTime::ZERO);
        let ticks = drain(&mut engine, SimTime::from_secs(2));
        assert_eq!(ticks[0].amount, 999.0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut engine = PeriodicEngine::new();
        engine.apply(key(), &bleed(false), 10.0, SimTime::ZERO);
        assert!(engine.cancel(key()));
        assert!(!engine.cancel(key()));
        assert_eq!(engine.next_tick_at(), None);
    }
}
