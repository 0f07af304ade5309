//! Resource look-ahead for forced future spends.
//!
//! An [`ObligationRule`] says "when this aura of mine is about to run out, I
//! will have to cast that ability". Each planning pass turns the rules into a
//! sorted [`ObligationSet`], priced at the projected cost at the due time, and
//! derives the floating resource: the part of the balance lower-priority
//! actions must leave alone so those spends can still be met.

use arrayvec::ArrayVec;
use core::time::Duration;

use crate::config::SimConfig;
use crate::env::Caster;
use crate::error::SetupError;
use crate::ids::{AbilityId, AuraId, UnitId};
use crate::resource::ResourceLedger;
use crate::spellbook::Spellbook;
use crate::time::SimTime;

pub type ObligationCondition = Box<dyn Fn(&dyn Caster) -> bool + Send + Sync>;

/// Refresh obligation implied by an aura the agent keeps up.
pub struct ObligationRule {
    pub label: &'static str,
    /// Unit carrying the aura; the agent itself for buffs.
    pub holder: UnitId,
    pub aura: AuraId,
    /// Ability that services the obligation.
    pub ability: AbilityId,
    /// How long before expiry the spend is due.
    pub lead: Duration,
    condition: Option<ObligationCondition>,
}

impl core::fmt::Debug for ObligationRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObligationRule")
            .field("label", &self.label)
            .field("holder", &self.holder)
            .field("aura", &self.aura)
            .field("ability", &self.ability)
            .field("lead", &self.lead)
            .finish_non_exhaustive()
    }
}

impl ObligationRule {
    pub fn new(label: &'static str, holder: UnitId, aura: AuraId, ability: AbilityId) -> Self {
        Self {
            label,
            holder,
            aura,
            ability,
            lead: Duration::ZERO,
            condition: None,
        }
    }

    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    /// Only forecasts the obligation while `condition` holds.
    pub fn when(
        mut self,
        condition: impl Fn(&dyn Caster) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    fn forecast(&self, caster: &dyn Caster) -> Option<PendingObligation> {
        if let Some(condition) = &self.condition {
            if !condition(caster) {
                return None;
            }
        }
        let now = caster.now();
        let expires_at = caster.aura_expires_at(self.holder, self.aura)?;
        let due_at = expires_at.saturating_sub(self.lead).max(now);
        Some(PendingObligation {
            label: self.label,
            aura: self.aura,
            ability: self.ability,
            due_at,
            cost: caster.cost_of(self.ability, due_at),
        })
    }
}

/// Forecast forced spend. Recomputed on every planning pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingObligation {
    pub label: &'static str,
    pub aura: AuraId,
    pub ability: AbilityId,
    pub due_at: SimTime,
    pub cost: f64,
}

/// Obligations ordered by due time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObligationSet {
    pending: ArrayVec<PendingObligation, { SimConfig::MAX_OBLIGATIONS }>,
}

impl ObligationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts in due order. When full, the latest obligation is dropped;
    /// returns false if that was `obligation` itself.
    pub fn insert(&mut self, obligation: PendingObligation) -> bool {
        let index = self
            .pending
            .iter()
            .position(|o| o.due_at > obligation.due_at)
            .unwrap_or(self.pending.len());
        if self.pending.is_full() {
            if index == self.pending.len() {
                return false;
            }
            self.pending.pop();
        }
        self.pending.insert(index, obligation);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingObligation> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest due time strictly after `now`.
    pub fn next_due_after(&self, now: SimTime) -> Option<SimTime> {
        self.pending
            .iter()
            .map(|o| o.due_at)
            .find(|due_at| *due_at > now)
    }

    /// Drops obligations tied to `aura` once the refresh has been cast.
    pub fn remove_serviced(&mut self, aura: AuraId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|o| o.aura != aura);
        before - self.pending.len()
    }

    /// Resource that must stay banked at `now`: the summed cost of every
    /// obligation due before the ledger would next cap.
    ///
    /// Past the cap point regeneration is lost anyway, so later obligations
    /// do not float. Removing an obligation never raises the result.
    pub fn floating_resource(&self, now: SimTime, ledger: &ResourceLedger) -> f64 {
        let horizon = ledger
            .time_to_cap(now)
            .map_or(SimTime::NEVER, |to_cap| now + to_cap);
        self.pending
            .iter()
            .filter(|o| o.due_at < horizon)
            .map(|o| o.cost)
            .sum()
    }
}

/// The obligation rules of one archetype.
#[derive(Debug, Default)]
pub struct ObligationPlanner {
    rules: Vec<ObligationRule>,
}

impl ObligationPlanner {
    pub fn new(rules: Vec<ObligationRule>, spellbook: &Spellbook) -> Result<Self, SetupError> {
        for rule in &rules {
            spellbook.require_ability(rule.label, rule.ability)?;
            if !spellbook.has_aura(rule.aura) {
                return Err(SetupError::UnknownAura {
                    owner: rule.label.to_string(),
                    aura: rule.aura,
                });
            }
        }
        Ok(Self { rules })
    }

    /// A planner that never pools.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[ObligationRule] {
        &self.rules
    }

    pub fn plan(&self, caster: &dyn Caster) -> ObligationSet {
        let mut set = ObligationSet::new();
        for obligation in self.rules.iter().filter_map(|rule| rule.forecast(caster)) {
            if !set.insert(obligation) {
                tracing::warn!(label = obligation.label, "obligation dropped, planner is full");
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(current: f64) -> ResourceLedger {
        ResourceLedger::new(current, 100.0, 10.0, Duration::from_secs(1)).unwrap()
    }

    fn obligation(aura: u32, due_ms: u64, cost: f64) -> PendingObligation {
        PendingObligation {
            label: "refresh",
            aura: AuraId(aura),
            ability: AbilityId(aura),
            due_at: SimTime::from_millis(due_ms),
            cost,
        }
    }

    #[test]
    fn obligation_due_before_cap_floats_full_cost() {
        let mut set = ObligationSet::new();
        // Buff expires at 2s, refresh due 1s before that.
        set.insert(obligation(1, 1_000, 30.0));

        // Regeneration until the due time is not credited.
        assert_eq!(set.floating_resource(SimTime::ZERO, &energy(50.0)), 30.0);
    }

    #[test]
    fn obligations_past_the_cap_point_do_not_float() {
        let mut set = ObligationSet::new();
        set.insert(obligation(1, 9_000, 30.0));
        // Caps after 5s; the spend at 9s is paid from regeneration.
        assert_eq!(set.floating_resource(SimTime::ZERO, &energy(50.0)), 0.0);
        assert_eq!(set.floating_resource(SimTime::ZERO, &energy(100.0)), 0.0);
    }

    #[test]
    fn every_obligation_before_cap_counts() {
        let mut set = ObligationSet::new();
        set.insert(obligation(2, 4_000, 20.0));
        set.insert(obligation(1, 1_000, 30.0));
        set.insert(obligation(3, 9_500, 40.0));
        assert_eq!(set.iter().next().unwrap().aura, AuraId(1));

        // Caps after 9s: the first two float, the one at 9.5s does not.
        assert_eq!(set.floating_resource(SimTime::ZERO, &energy(10.0)), 50.0);
    }

    #[test]
    fn servicing_never_increases_floating() {
        let mut set = ObligationSet::new();
        set.insert(obligation(1, 500, 30.0));
        set.insert(obligation(2, 1_500, 40.0));
        set.insert(obligation(3, 2_000, 25.0));
        let ledger = energy(20.0);

        let mut previous = set.floating_resource(SimTime::ZERO, &ledger);
        for aura in [2, 1, 3] {
            set.remove_serviced(AuraId(aura));
            let floating = set.floating_resource(SimTime::ZERO, &ledger);
            assert!(floating <= previous, "{floating} > {previous}");
            previous = floating;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn full_set_keeps_earliest() {
        let mut set = ObligationSet::new();
        for i in 0..SimConfig::MAX_OBLIGATIONS as u64 {
            assert!(set.insert(obligation(i as u32, 1_000 + i, 1.0)));
        }
        assert!(!set.insert(obligation(99, 5_000, 1.0)));
        assert!(set.insert(obligation(98, 10, 1.0)));
        assert_eq!(set.len(), SimConfig::MAX_OBLIGATIONS);
        assert_eq!(set.next_due_after(SimTime::ZERO), Some(SimTime::from_millis(10)));
    }
}
