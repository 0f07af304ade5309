//! The reference [`Caster`]: one agent and the targets it acts on.
//!
//! The agent owns every piece of mutable combat state: clock, resource ledger,
//! point counter, cooldowns, action lock, its own auras, the auras it keeps on
//! its targets, periodic effects and pending impacts. Time only moves through
//! [`Agent::advance_to`], which resolves scheduled events in order:
//!
//! 1. deferred impacts due at the instant, in submission order
//! 2. periodic ticks due at the instant
//! 3. aura expiries at the instant
//!
//! so a periodic effect's last tick lands before its aura lapses.

use std::collections::BTreeMap;
use std::sync::Arc;

use core::time::Duration;

use crate::aura::{AuraEvent, AuraEventKind, AuraInstance, AuraKey, AuraRegistry, ModifierSet};
use crate::config::SimConfig;
use crate::cooldown::{ActionLock, CooldownTracker};
use crate::deferred::DeferredQueue;
use crate::env::{
    AuraForecast, Caster, CombatOracle, ForecastView, HitResult, ModifierForecast, Strike,
    StrikeRequest,
};
use crate::error::{CastError, InsufficientResource, InvariantViolation};
use crate::ids::{AbilityId, AuraId, ModifierId, UnitId};
use crate::periodic::{PeriodicEngine, PeriodicKey, PeriodicTick};
use crate::resource::{PointCounter, ResourceLedger, SpendReceipt};
use crate::spellbook::{AbilityDefinition, AuraHolder, ModifierKind, Spellbook};
use crate::time::{Clock, SimTime};

/// Result of a committed cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastOutcome {
    pub ability: AbilityId,
    pub target: UnitId,
    pub cast_at: SimTime,
    /// When the outcome's effects apply.
    pub resolve_at: SimTime,
    pub cost: f64,
    pub points_spent: u32,
    pub strike: Strike,
}

impl CastOutcome {
    pub fn is_deferred(&self) -> bool {
        self.resolve_at > self.cast_at
    }
}

/// Rolled outcome waiting for its resolve time.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Impact {
    ability: AbilityId,
    target: UnitId,
    strike: Strike,
    receipt: SpendReceipt,
    points: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CombatEvent {
    Cast {
        at: SimTime,
        ability: AbilityId,
        target: UnitId,
        cost: f64,
        points: u32,
    },
    Impact {
        at: SimTime,
        ability: AbilityId,
        target: UnitId,
        result: HitResult,
        amount: f64,
    },
    Refund {
        at: SimTime,
        ability: AbilityId,
        amount: f64,
    },
    Tick(PeriodicTick),
    Aura(AuraEvent),
    PointsWasted {
        at: SimTime,
        amount: u32,
    },
    TargetRemoved {
        at: SimTime,
        target: UnitId,
    },
}

/// Append-only record of everything the agent did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombatLog {
    events: Vec<CombatEvent>,
}

impl CombatLog {
    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Direct and periodic damage dealt.
    pub fn damage_done(&self) -> f64 {
        self.events
            .iter()
            .map(|event| match event {
                CombatEvent::Impact { amount, .. } => *amount,
                CombatEvent::Tick(tick) => tick.amount,
                _ => 0.0,
            })
            .sum()
    }

    pub fn casts_of(&self, ability: AbilityId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, CombatEvent::Cast { ability: a, .. } if *a == ability))
            .count()
    }

    pub fn refunded(&self) -> f64 {
        self.events
            .iter()
            .map(|event| match event {
                CombatEvent::Refund { amount, .. } => *amount,
                _ => 0.0,
            })
            .sum()
    }
}

/// Source ability and consumed points of a periodic effect, kept for
/// re-snapshotting rolling effects.
type PeriodicOrigin = (AbilityId, u32);

pub struct Agent {
    id: UnitId,
    clock: Clock,
    spellbook: Arc<Spellbook>,
    resource: ResourceLedger,
    points: PointCounter,
    cooldowns: CooldownTracker,
    lock: ActionLock,
    lock_duration: Duration,
    auras: AuraRegistry,
    targets: BTreeMap<UnitId, AuraRegistry>,
    modifiers: ModifierSet,
    periodic: PeriodicEngine,
    periodic_origins: BTreeMap<PeriodicKey, PeriodicOrigin>,
    impacts: DeferredQueue<Impact>,
    combat: Box<dyn CombatOracle>,
    forecast: Box<dyn ModifierForecast>,
    log: CombatLog,
    scratch: Vec<AuraEvent>,
}

impl core::fmt::Debug for Agent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("now", &self.clock.now())
            .field("resource", &self.resource.current())
            .field("points", &self.points.current())
            .field("auras", &self.auras.len())
            .field("targets", &self.targets.len())
            .field("pending_impacts", &self.impacts.len())
            .finish()
    }
}

impl Agent {
    /// Creates an agent at time zero facing [`UnitId::PRIMARY_TARGET`].
    pub fn new(
        config: &SimConfig,
        spellbook: Arc<Spellbook>,
        combat: Box<dyn CombatOracle>,
    ) -> Result<Self, InvariantViolation> {
        let resource = ResourceLedger::new(
            config.resource_start,
            config.resource_max,
            config.regen_per_tick,
            config.regen_tick(),
        )?;
        let id = UnitId::AGENT;
        let mut targets = BTreeMap::new();
        targets.insert(
            UnitId::PRIMARY_TARGET,
            AuraRegistry::new(UnitId::PRIMARY_TARGET),
        );

        Ok(Self {
            id,
            clock: Clock::new(),
            spellbook,
            resource,
            points: PointCounter::new(config.points_max),
            cooldowns: CooldownTracker::new(),
            lock: ActionLock::default(),
            lock_duration: config.action_lock(),
            auras: AuraRegistry::new(id),
            targets,
            modifiers: ModifierSet::new(),
            periodic: PeriodicEngine::new(),
            periodic_origins: BTreeMap::new(),
            impacts: DeferredQueue::new(),
            combat,
            forecast: Box::new(AuraForecast),
            log: CombatLog::default(),
            scratch: Vec::new(),
        })
    }

    pub fn with_forecast(mut self, forecast: Box<dyn ModifierForecast>) -> Self {
        self.forecast = forecast;
        self
    }

    /// Starts the agent with `points` already held.
    pub fn with_points(mut self, points: u32) -> Result<Self, InvariantViolation> {
        self.points = PointCounter::with_current(points, self.points.max())?;
        Ok(self)
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    pub fn auras(&self) -> &AuraRegistry {
        &self.auras
    }

    pub fn target_auras(&self, target: UnitId) -> Option<&AuraRegistry> {
        self.targets.get(&target)
    }

    pub fn periodic(&self) -> &PeriodicEngine {
        &self.periodic
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn pending_impacts(&self) -> usize {
        self.impacts.len()
    }

    pub fn targets(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.targets.keys().copied()
    }

    /// Adds a target. Returns false if it was already present.
    pub fn add_target(&mut self, target: UnitId) -> bool {
        if target == self.id || self.targets.contains_key(&target) {
            return false;
        }
        self.targets.insert(target, AuraRegistry::new(target));
        true
    }

    /// Removes a target, cancelling impacts in flight to it and every debuff
    /// the agent keeps on it. Removing an absent target is a no-op.
    pub fn remove_target(&mut self, target: UnitId) -> Result<bool, InvariantViolation> {
        let Some(mut registry) = self.targets.remove(&target) else {
            return Ok(false);
        };
        let now = self.clock.now();

        let keys: Vec<AuraKey> = registry.keys().collect();
        for key in keys {
            registry.deactivate(key, now, &mut self.modifiers, &mut self.scratch)?;
        }
        self.periodic.cancel_holder(target);
        self.periodic_origins.retain(|key, _| key.holder != target);
        let cancelled = self.impacts.cancel_where(|impact| impact.target == target);
        self.flush_aura_events();

        tracing::debug!(%target, cancelled, "target removed");
        self.log.push(CombatEvent::TargetRemoved { at: now, target });
        Ok(true)
    }

    fn registry(&self, holder: UnitId) -> Option<&AuraRegistry> {
        if holder == self.id {
            Some(&self.auras)
        } else {
            self.targets.get(&holder)
        }
    }

    fn own_aura(&self, holder: UnitId, aura: AuraId) -> Option<&AuraInstance> {
        self.registry(holder)?.get(AuraKey::new(aura, self.id))
    }

    fn forecast_view(&self) -> ForecastView<'_> {
        ForecastView {
            now: self.clock.now(),
            spellbook: &self.spellbook,
            modifiers: &self.modifiers,
            cooldowns: &self.cooldowns,
            agent: self.id,
            auras: &self.auras,
            targets: &self.targets,
        }
    }

    fn damage_multiplier(&self) -> f64 {
        self.modifiers
            .product(&self.spellbook, ModifierKind::DamageMultiplier)
    }

    /// Every reason `def` cannot be cast on `target` now, first one wins.
    fn check_castable(&self, def: &AbilityDefinition, target: UnitId) -> Result<f64, CastError> {
        let now = self.clock.now();
        if !def.is_helpful() && !self.targets.contains_key(&target) {
            return Err(CastError::UnknownTarget(target));
        }
        if !self.cooldowns.is_ready(def.id, now) {
            return Err(CastError::OnCooldown {
                ability: def.id,
                ready_at: self.cooldowns.ready_at(def.id),
            });
        }
        if !self.lock.is_ready(now) {
            return Err(CastError::ActionLocked {
                ready_at: self.lock.ready_at(),
            });
        }
        if let Some(aura) = def.requires_aura {
            if self.own_aura(self.id, aura).is_none() {
                return Err(CastError::MissingAura {
                    ability: def.id,
                    aura,
                });
            }
        }
        let cost = self.cost_of(def.id, now);
        if !self.resource.can_afford(cost) {
            return Err(InsufficientResource {
                requested: cost,
                available: self.resource.current(),
            }
            .into());
        }
        Ok(cost)
    }

    fn step_to(&mut self, time: SimTime) -> Result<(), InvariantViolation> {
        self.clock.advance_to(time)?;
        self.resource.advance_to(time);
        Ok(())
    }

    fn next_due_event(&self) -> Option<SimTime> {
        let expiries = core::iter::once(&self.auras)
            .chain(self.targets.values())
            .filter_map(AuraRegistry::next_expiry);
        self.impacts
            .next_due()
            .into_iter()
            .chain(self.periodic.next_tick_at())
            .chain(expiries)
            .min()
    }

    fn resolve_instant(&mut self, at: SimTime) -> Result<(), InvariantViolation> {
        while let Some((resolve_at, impact)) = self.impacts.pop_due(at) {
            self.apply_impact(resolve_at, impact)?;
        }
        while let Some(key) = self.periodic.next_due(at) {
            self.tick_periodic(key);
        }

        self.auras
            .expire_due(at, &mut self.modifiers, &mut self.scratch)?;
        for registry in self.targets.values_mut() {
            registry.expire_due(at, &mut self.modifiers, &mut self.scratch)?;
        }
        self.flush_aura_events();
        Ok(())
    }

    fn tick_periodic(&mut self, key: PeriodicKey) {
        let resnapshot = if self.periodic.is_rolling(key) {
            self.rolling_snapshot(key)
        } else {
            None
        };
        if let Some(tick) = self.periodic.tick(key, resnapshot) {
            if tick.remaining == 0 {
                self.periodic_origins.remove(&key);
            }
            self.log.push(CombatEvent::Tick(tick));
        }
    }

    fn rolling_snapshot(&mut self, key: PeriodicKey) -> Option<f64> {
        let (ability, points) = *self.periodic_origins.get(&key)?;
        let book = Arc::clone(&self.spellbook);
        let def = book.ability(ability).ok()?;
        let periodic = book.periodic(key.aura.aura)?;
        let request = StrikeRequest {
            ability: def,
            target: key.holder,
            at: self.clock.now(),
            points,
            damage_multiplier: self.damage_multiplier(),
        };
        Some(self.combat.periodic_snapshot(&request, periodic))
    }

    /// Drains registry events into the log. Expiry of an aura ends the
    /// periodic effect bound to it.
    fn flush_aura_events(&mut self) {
        for event in self.scratch.drain(..) {
            if let AuraEventKind::Expired(_) = event.kind {
                let key = PeriodicKey::new(event.holder, event.key);
                self.periodic.cancel(key);
                self.periodic_origins.remove(&key);
            }
            self.log.push(CombatEvent::Aura(event));
        }
    }

    fn apply_impact(&mut self, at: SimTime, mut impact: Impact) -> Result<(), InvariantViolation> {
        let book = Arc::clone(&self.spellbook);
        let Ok(def) = book.ability(impact.ability) else {
            return Ok(());
        };
        if !def.is_helpful() && !self.targets.contains_key(&impact.target) {
            return Ok(());
        }

        self.log.push(CombatEvent::Impact {
            at,
            ability: impact.ability,
            target: impact.target,
            result: impact.strike.result,
            amount: impact.strike.amount,
        });

        if !impact.strike.result.landed() {
            let amount = self
                .resource
                .refund_against(&mut impact.receipt, def.refund_on_miss);
            if amount > 0.0 {
                tracing::debug!(ability = %def.id, amount, "refund on miss");
                self.log.push(CombatEvent::Refund {
                    at,
                    ability: def.id,
                    amount,
                });
            }
            return Ok(());
        }

        if def.points_on_land > 0 {
            let wasted = self.points.gain(def.points_on_land);
            if wasted > 0 {
                self.log.push(CombatEvent::PointsWasted { at, amount: wasted });
            }
        }

        for application in &def.applies {
            if application.chance < 1.0 && !self.combat.proc(application.chance) {
                continue;
            }
            let Some(aura) = book.aura(application.aura) else {
                continue;
            };
            let holder = match application.holder {
                AuraHolder::Caster => self.id,
                AuraHolder::Target => impact.target,
            };
            let duration = aura.duration_for(impact.points);
            let registry = if holder == self.id {
                &mut self.auras
            } else {
                match self.targets.get_mut(&holder) {
                    Some(registry) => registry,
                    None => continue,
                }
            };
            let instance = registry.activate(
                aura,
                self.id,
                at,
                duration,
                &mut self.modifiers,
                &mut self.scratch,
            )?;

            if let Some(periodic) = book.periodic(aura.id) {
                let request = StrikeRequest {
                    ability: def,
                    target: holder,
                    at,
                    points: impact.points,
                    damage_multiplier: self.damage_multiplier(),
                };
                let snapshot = self.combat.periodic_snapshot(&request, periodic);
                let key = PeriodicKey::new(holder, instance.key);
                let last_tick = self.periodic.apply(key, periodic, snapshot, at);
                self.periodic_origins.insert(key, (def.id, impact.points));
                if let Some(registry) = self.targets.get_mut(&holder) {
                    registry.set_expiry(instance.key, last_tick);
                } else if holder == self.id {
                    self.auras.set_expiry(instance.key, last_tick);
                }
            }
        }
        self.flush_aura_events();
        Ok(())
    }
}

impl Caster for Agent {
    fn id(&self) -> UnitId {
        self.id
    }

    fn now(&self) -> SimTime {
        self.clock.now()
    }

    fn advance_to(&mut self, time: SimTime) -> Result<(), InvariantViolation> {
        if time < self.clock.now() {
            return Err(InvariantViolation::ClockBackwards {
                now: self.clock.now(),
                requested: time,
            });
        }
        while let Some(at) = self.next_due_event().filter(|at| *at <= time) {
            let at = at.max(self.clock.now());
            self.step_to(at)?;
            self.resolve_instant(at)?;
        }
        self.step_to(time)
    }

    fn spellbook(&self) -> &Spellbook {
        &self.spellbook
    }

    fn can_cast(&self, ability: AbilityId, target: UnitId) -> bool {
        self.spellbook
            .ability(ability)
            .and_then(|def| self.check_castable(def, target))
            .is_ok()
    }

    fn cast(&mut self, ability: AbilityId, target: UnitId) -> Result<CastOutcome, CastError> {
        let book = Arc::clone(&self.spellbook);
        let def = book.ability(ability)?;
        let cost = self.check_castable(def, target)?;
        let now = self.clock.now();

        let receipt = self.resource.spend(cost)?;
        let points = if def.is_finisher() {
            self.points.spend_all()
        } else {
            0
        };

        self.cooldowns.trigger(def.id, now, def.cooldown());
        let lock = if def.triggers_lock() {
            self.lock_duration.max(def.cast_time())
        } else {
            def.cast_time()
        };
        self.lock.engage(now, lock);

        // Castability already checked the consumed aura is up.
        if let Some(aura) = def.consumes_aura {
            let key = AuraKey::new(aura, self.id);
            self.auras
                .remove_stack(key, now, &mut self.modifiers, &mut self.scratch)?;
            self.flush_aura_events();
        }
        if def.grants_resource > 0.0 {
            self.resource.credit(def.grants_resource);
        }

        let strike = if def.is_helpful() {
            Strike {
                result: HitResult::Hit,
                amount: 0.0,
            }
        } else {
            let request = StrikeRequest {
                ability: def,
                target,
                at: now,
                points,
                damage_multiplier: self.damage_multiplier(),
            };
            self.combat.strike(&request)
        };

        let resolve_at = now + def.cast_time() + def.travel_time();
        tracing::debug!(
            ability = %def.id,
            label = %def.label,
            %target,
            cost,
            points,
            result = %strike.result,
            %resolve_at,
            "cast"
        );
        self.log.push(CombatEvent::Cast {
            at: now,
            ability: def.id,
            target,
            cost,
            points,
        });

        let impact = Impact {
            ability: def.id,
            target,
            strike,
            receipt,
            points,
        };
        if resolve_at > now {
            self.impacts.submit(resolve_at, impact);
        } else {
            self.apply_impact(now, impact)?;
        }

        Ok(CastOutcome {
            ability: def.id,
            target,
            cast_at: now,
            resolve_at,
            cost,
            points_spent: points,
            strike,
        })
    }

    fn cost_of(&self, ability: AbilityId, at: SimTime) -> f64 {
        let Ok(def) = self.spellbook.ability(ability) else {
            return f64::INFINITY;
        };
        def.cost_modifiers
            .iter()
            .filter(|modifier| self.is_modifier_active_at(**modifier, at))
            .filter_map(|modifier| self.spellbook.modifier(*modifier))
            .filter(|modifier| modifier.kind == ModifierKind::CostMultiplier)
            .fold(def.cost, |cost, modifier| cost * modifier.value)
    }

    fn is_modifier_active_at(&self, modifier: ModifierId, at: SimTime) -> bool {
        if at <= self.clock.now() {
            return self.modifiers.is_active(modifier);
        }
        self.forecast
            .is_active_at(&self.forecast_view(), modifier, at)
    }

    fn remaining_duration(&self, holder: UnitId, aura: AuraId) -> Duration {
        self.own_aura(holder, aura)
            .map_or(Duration::ZERO, |instance| {
                instance.remaining(self.clock.now())
            })
    }

    fn aura_expires_at(&self, holder: UnitId, aura: AuraId) -> Option<SimTime> {
        self.own_aura(holder, aura)
            .map(|instance| instance.expires_at)
    }

    fn stacks(&self, holder: UnitId, aura: AuraId) -> u8 {
        self.own_aura(holder, aura)
            .map_or(0, |instance| instance.stacks)
    }

    fn has_target(&self, target: UnitId) -> bool {
        self.targets.contains_key(&target)
    }

    fn resource(&self) -> &ResourceLedger {
        &self.resource
    }

    fn points(&self) -> &PointCounter {
        &self.points
    }

    fn ready_at(&self, ability: AbilityId) -> SimTime {
        self.cooldowns.ready_at(ability)
    }

    fn action_lock(&self) -> SimTime {
        self.lock.ready_at()
    }

    fn next_event_after(&self, time: SimTime) -> Option<SimTime> {
        let lock = Some(self.lock.ready_at()).filter(|at| *at > time);
        let expiries = core::iter::once(&self.auras)
            .chain(self.targets.values())
            .filter_map(AuraRegistry::next_expiry);
        self.impacts
            .next_due()
            .into_iter()
            .chain(self.periodic.next_tick_at())
            .chain(expiries)
            .chain(self.cooldowns.next_ready_after(time))
            .chain(lock)
            .filter(|at| *at > time)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{FixedCombat, ScriptedCombat};
    use crate::ids::ModifierId;
    use crate::spellbook::{
        AbilityFlags, AuraApplication, AuraDefinition, ModifierDefinition, PeriodicDefinition,
    };

    const SHRED: AbilityId = AbilityId(5221);
    const RAKE: AbilityId = AbilityId(1822);
    const BOLT: AbilityId = AbilityId(686);
    const RAKE_AURA: AuraId = AuraId(1822);
    const TIGER: AbilityId = AbilityId(5217);
    const TIGER_AURA: AuraId = AuraId(5217);
    const FURY: ModifierId = ModifierId(1);
    const CHARGE: AbilityId = AbilityId(49376);
    const POUNCE: AbilityId = AbilityId(9005);
    const STAMPEDE: AuraId = AuraId(81022);

    fn spellbook() -> Arc<Spellbook> {
        let mut book = Spellbook::default();
        book.insert_modifier(ModifierDefinition {
            id: FURY,
            label: "Fury".into(),
            kind: ModifierKind::DamageMultiplier,
            value: 1.5,
        })
        .unwrap();
        book.insert_aura(AuraDefinition::new(RAKE_AURA, "Rake", Duration::from_secs(9)))
            .unwrap();
        book.insert_aura(
            AuraDefinition::new(TIGER_AURA, "Tiger's Fury", Duration::from_secs(6))
                .with_modifier(FURY),
        )
        .unwrap();
        book.insert_aura(
            AuraDefinition::new(STAMPEDE, "Stampede", Duration::from_secs(10)).with_stacks(2),
        )
        .unwrap();
        book.insert_periodic(PeriodicDefinition {
            aura: RAKE_AURA,
            tick_ms: 3_000,
            tick_count: 3,
            rolling: false,
        })
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(SHRED, "Shred", 80.0)
                .with_points(1)
                .with_refund(0.8),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(RAKE, "Rake", 35.0)
                .with_points(1)
                .applying(AuraApplication::on_target(RAKE_AURA)),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(TIGER, "Tiger's Fury", 0.0)
                .with_flags(AbilityFlags::HELPFUL)
                .with_cooldown(Duration::from_secs(30))
                .applying(AuraApplication::on_caster(TIGER_AURA)),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(BOLT, "Shadow Bolt", 20.0)
                .with_refund(0.5)
                .with_cast_time(Duration::from_millis(2_500))
                .with_travel_time(Duration::from_millis(500)),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(CHARGE, "Feral Charge", 0.0)
                .with_flags(AbilityFlags::HELPFUL)
                .applying(AuraApplication::on_caster(STAMPEDE)),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(POUNCE, "Pounce", 0.0)
                .with_flags(AbilityFlags::HELPFUL)
                .requiring(STAMPEDE)
                .consuming(STAMPEDE),
        )
        .unwrap();
        book.validate().unwrap();
        Arc::new(book)
    }

    fn agent(combat: impl CombatOracle + 'static) -> Agent {
        Agent::new(&SimConfig::default(), spellbook(), Box::new(combat)).unwrap()
    }

    #[test]
    fn cast_spends_and_locks() {
        let mut agent = agent(FixedCombat::hitting(100.0));
        let outcome = agent.cast(SHRED, UnitId::PRIMARY_TARGET).unwrap();

        assert_eq!(outcome.cost, 80.0);
        assert_eq!(agent.resource().current(), 20.0);
        assert_eq!(agent.action_lock(), SimTime::from_secs(1));
        assert_eq!(agent.points().current(), 1);
        assert!(!agent.can_cast(SHRED, UnitId::PRIMARY_TARGET));
        assert_eq!(agent.log().damage_done(), 100.0);
    }

    #[test]
    fn failed_check_commits_nothing() {
        let mut agent = agent(FixedCombat::hitting(1.0));
        agent.cast(SHRED, UnitId::PRIMARY_TARGET).unwrap();
        agent.advance_to(SimTime::from_secs(1)).unwrap();

        let err = agent.cast(SHRED, UnitId::PRIMARY_TARGET).unwrap_err();
        assert!(matches!(err, CastError::Insufficient(_)));
        assert_eq!(agent.resource().current(), 30.0);
        assert_eq!(agent.log().casts_of(SHRED), 1);
    }

    #[test]
    fn miss_refunds_fraction_of_cost() {
        let mut agent = agent(ScriptedCombat::new([HitResult::Miss], 10.0));
        agent.cast(SHRED, UnitId::PRIMARY_TARGET).unwrap();

        assert_eq!(agent.resource().current(), 20.0 + 0.8 * 80.0);
        assert_eq!(agent.log().refunded(), 0.8 * 80.0);
        assert_eq!(agent.points().current(), 0);
    }

    #[test]
    fn deferred_miss_refunds_its_own_spend() {
        let mut agent = agent(ScriptedCombat::new([HitResult::Miss, HitResult::Hit], 10.0));
        agent.cast(BOLT, UnitId::PRIMARY_TARGET).unwrap();

        // Capped again by 2.5s; Rake is the most recent spend when Bolt lands.
        agent.advance_to(SimTime::from_millis(2_500)).unwrap();
        agent.cast(RAKE, UnitId::PRIMARY_TARGET).unwrap();
        assert_eq!(agent.resource().current(), 65.0);

        agent.advance_to(SimTime::from_secs(3)).unwrap();
        assert_eq!(agent.log().refunded(), 0.5 * 20.0);
        assert_eq!(agent.resource().current(), 65.0 + 10.0 + 10.0);
    }

    #[test]
    fn consuming_takes_one_stack_at_a_time() {
        let mut agent = agent(FixedCombat::hitting(1.0));
        agent.cast(CHARGE, UnitId::AGENT).unwrap();
        agent.cast(CHARGE, UnitId::AGENT).unwrap();
        assert_eq!(agent.stacks(UnitId::AGENT, STAMPEDE), 2);

        agent.cast(POUNCE, UnitId::AGENT).unwrap();
        assert_eq!(agent.stacks(UnitId::AGENT, STAMPEDE), 1);
        assert!(agent.is_aura_active(UnitId::AGENT, STAMPEDE));

        agent.cast(POUNCE, UnitId::AGENT).unwrap();
        assert!(!agent.is_aura_active(UnitId::AGENT, STAMPEDE));
        let err = agent.cast(POUNCE, UnitId::AGENT).unwrap_err();
        assert!(matches!(err, CastError::MissingAura { .. }));
    }

    #[test]
    fn debuff_ticks_with_snapshot_until_aura_lapses() {
        let mut agent = agent(FixedCombat::hitting(12.0));
        agent.cast(RAKE, UnitId::PRIMARY_TARGET).unwrap();
        assert_eq!(
            agent.aura_expires_at(UnitId::PRIMARY_TARGET, RAKE_AURA),
            Some(SimTime::from_secs(9))
        );

        agent.advance_to(SimTime::from_secs(20)).unwrap();
        let ticks: Vec<_> = agent
            .log()
            .events()
            .iter()
            .filter_map(|e| match e {
                CombatEvent::Tick(tick) => Some(tick.at),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, [3, 6, 9].map(SimTime::from_secs).to_vec());
        assert!(!agent.is_aura_active(UnitId::PRIMARY_TARGET, RAKE_AURA));
        assert_eq!(agent.log().damage_done(), 12.0 + 3.0 * 12.0);
    }

    #[test]
    fn helpful_aura_grants_modifier_until_expiry() {
        let mut agent = agent(FixedCombat::hitting(10.0));
        agent.cast(TIGER, UnitId::AGENT).unwrap();
        assert!(agent.modifiers().is_active(FURY));
        assert!(agent.is_modifier_active_at(FURY, SimTime::from_secs(5)));
        assert!(!agent.is_modifier_active_at(FURY, SimTime::from_secs(6)));

        agent.advance_to(SimTime::from_secs(6)).unwrap();
        assert!(!agent.modifiers().is_active(FURY));
    }

    #[test]
    fn cast_time_defers_impact_and_holds_lock() {
        let mut agent = agent(FixedCombat::hitting(50.0));
        let outcome = agent.cast(BOLT, UnitId::PRIMARY_TARGET).unwrap();

        assert!(outcome.is_deferred());
        assert_eq!(outcome.resolve_at, SimTime::from_secs(3));
        assert_eq!(agent.action_lock(), SimTime::from_millis(2_500));
        assert_eq!(agent.log().damage_done(), 0.0);
        assert_eq!(
            agent.next_event_after(SimTime::ZERO),
            Some(SimTime::from_millis(2_500))
        );

        agent.advance_to(SimTime::from_secs(3)).unwrap();
        assert_eq!(agent.log().damage_done(), 50.0);
        assert_eq!(agent.pending_impacts(), 0);
    }

    #[test]
    fn removing_target_cancels_impacts_and_debuffs() {
        let mut agent = agent(FixedCombat::hitting(50.0));
        agent.cast(RAKE, UnitId::PRIMARY_TARGET).unwrap();
        agent.advance_to(SimTime::from_secs(1)).unwrap();
        agent.cast(BOLT, UnitId::PRIMARY_TARGET).unwrap();

        assert!(agent.remove_target(UnitId::PRIMARY_TARGET).unwrap());
        assert!(!agent.remove_target(UnitId::PRIMARY_TARGET).unwrap());
        assert_eq!(agent.pending_impacts(), 0);
        assert!(agent.periodic().is_empty());

        agent.advance_to(SimTime::from_secs(10)).unwrap();
        assert_eq!(agent.log().damage_done(), 50.0);
    }

    #[test]
    fn clock_never_moves_backward() {
        let mut agent = agent(FixedCombat::hitting(1.0));
        agent.advance_to(SimTime::from_secs(2)).unwrap();
        assert!(agent.advance_to(SimTime::from_secs(1)).is_err());
    }
}
