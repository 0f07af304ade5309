//! Projection of modifier state to a future instant.
//!
//! The pooling planner prices each obligation at its due time, so it needs to
//! know whether a cost modifier will still (or already) be active then.

use std::collections::BTreeMap;

use crate::aura::{AuraKey, AuraRegistry, ModifierSet};
use crate::cooldown::CooldownTracker;
use crate::ids::{AbilityId, AuraId, ModifierId, UnitId};
use crate::spellbook::Spellbook;
use crate::time::SimTime;

/// Read-only view of the caster state a forecast may consult.
#[derive(Clone, Copy, Debug)]
pub struct ForecastView<'a> {
    pub now: SimTime,
    pub spellbook: &'a Spellbook,
    pub modifiers: &'a ModifierSet,
    pub cooldowns: &'a CooldownTracker,
    pub agent: UnitId,
    pub auras: &'a AuraRegistry,
    pub targets: &'a BTreeMap<UnitId, AuraRegistry>,
}

impl ForecastView<'_> {
    fn registry(&self, holder: UnitId) -> Option<&AuraRegistry> {
        if holder == self.agent {
            Some(self.auras)
        } else {
            self.targets.get(&holder)
        }
    }

    pub fn expires_at(&self, holder: UnitId, key: AuraKey) -> Option<SimTime> {
        self.registry(holder)?
            .get(key)
            .map(|instance| instance.expires_at)
    }
}

/// Predicts whether `modifier` is active at `at`.
pub trait ModifierForecast: Send + Sync {
    fn is_active_at(&self, view: &ForecastView<'_>, modifier: ModifierId, at: SimTime) -> bool;
}

/// Projects current auras only: a modifier stays active while some aura
/// granting it outlives `at`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuraForecast;

impl ModifierForecast for AuraForecast {
    fn is_active_at(&self, view: &ForecastView<'_>, modifier: ModifierId, at: SimTime) -> bool {
        view.modifiers.sources(modifier).any(|source| {
            let key = AuraKey::new(source.aura, source.applier);
            view.expires_at(source.holder, key)
                .is_some_and(|expires_at| at < expires_at)
        })
    }
}

/// A modifier granted by an aura that a cooldown ability applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownGrant {
    pub modifier: ModifierId,
    pub ability: AbilityId,
    pub aura: AuraId,
}

/// Current auras plus cooldowns assumed to be used as soon as they are ready.
#[derive(Clone, Debug, Default)]
pub struct CooldownForecast {
    grants: Vec<CooldownGrant>,
}

impl CooldownForecast {
    pub fn new(grants: impl IntoIterator<Item = CooldownGrant>) -> Self {
        Self {
            grants: grants.into_iter().collect(),
        }
    }

    pub fn grants(&self) -> &[CooldownGrant] {
        &self.grants
    }
}

impl ModifierForecast for CooldownForecast {
    fn is_active_at(&self, view: &ForecastView<'_>, modifier: ModifierId, at: SimTime) -> bool {
        if AuraForecast.is_active_at(view, modifier, at) {
            return true;
        }
        self.grants
            .iter()
            .filter(|grant| grant.modifier == modifier)
            .any(|grant| {
                let Some(aura) = view.spellbook.aura(grant.aura) else {
                    return false;
                };
                let used_at = view.cooldowns.ready_at(grant.ability).max(view.now);
                used_at <= at && at < used_at + aura.duration_for(0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraEvent;
    use crate::spellbook::{AuraDefinition, ModifierDefinition, ModifierKind};
    use core::time::Duration;

    const BERSERK: AbilityId = AbilityId(50334);
    const BERSERK_AURA: AuraId = AuraId(50334);
    const HALF_COST: ModifierId = ModifierId(1);

    fn spellbook() -> Spellbook {
        let mut book = Spellbook::default();
        book.insert_modifier(ModifierDefinition {
            id: HALF_COST,
            label: "Berserk".into(),
            kind: ModifierKind::CostMultiplier,
            value: 0.5,
        })
        .unwrap();
        book.insert_aura(
            AuraDefinition::new(BERSERK_AURA, "Berserk", Duration::from_secs(15))
                .with_modifier(HALF_COST),
        )
        .unwrap();
        book
    }

    fn forecast() -> CooldownForecast {
        CooldownForecast::new([CooldownGrant {
            modifier: HALF_COST,
            ability: BERSERK,
            aura: BERSERK_AURA,
        }])
    }

    #[test]
    fn cooldown_ready_later_predicts_window() {
        let book = spellbook();
        let mut cooldowns = CooldownTracker::new();
        cooldowns.trigger(BERSERK, SimTime::ZERO, Duration::from_secs(30));
        let auras = AuraRegistry::new(UnitId::AGENT);
        let targets = BTreeMap::new();
        let modifiers = ModifierSet::new();
        let view = ForecastView {
            now: SimTime::from_secs(20),
            spellbook: &book,
            modifiers: &modifiers,
            cooldowns: &cooldowns,
            agent: UnitId::AGENT,
            auras: &auras,
            targets: &targets,
        };

        let forecast = forecast();
        assert!(!forecast.is_active_at(&view, HALF_COST, SimTime::from_secs(25)));
        assert!(forecast.is_active_at(&view, HALF_COST, SimTime::from_secs(30)));
        assert!(forecast.is_active_at(&view, HALF_COST, SimTime::from_secs(44)));
        assert!(!forecast.is_active_at(&view, HALF_COST, SimTime::from_secs(45)));
    }

    #[test]
    fn active_aura_counts_until_it_expires() {
        let book = spellbook();
        let mut cooldowns = CooldownTracker::new();
        cooldowns.trigger(BERSERK, SimTime::ZERO, Duration::from_secs(180));
        let mut auras = AuraRegistry::new(UnitId::AGENT);
        let mut modifiers = ModifierSet::new();
        let mut events: Vec<AuraEvent> = Vec::new();
        let def = book.aura(BERSERK_AURA).unwrap();
        auras
            .activate(
                def,
                UnitId::AGENT,
                SimTime::ZERO,
                def.duration_for(0),
                &mut modifiers,
                &mut events,
            )
            .unwrap();
        let targets = BTreeMap::new();
        let view = ForecastView {
            now: SimTime::from_secs(1),
            spellbook: &book,
            modifiers: &modifiers,
            cooldowns: &cooldowns,
            agent: UnitId::AGENT,
            auras: &auras,
            targets: &targets,
        };

        assert!(AuraForecast.is_active_at(&view, HALF_COST, SimTime::from_secs(14)));
        assert!(!AuraForecast.is_active_at(&view, HALF_COST, SimTime::from_secs(15)));
        assert!(!forecast().is_active_at(&view, HALF_COST, SimTime::from_secs(16)));
    }
}
