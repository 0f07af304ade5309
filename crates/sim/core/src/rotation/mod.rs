//! Priority-ordered rotation decisions.
//!
//! [`RotationEngine::evaluate`] is re-entrant: the driver calls it whenever
//! the agent may act, and it either casts the first rule that is both wanted
//! and possible, or returns the earliest time worth calling again.
//!
//! # Evaluation
//!
//! 1. Advance the caster to `now`. A held action lock yields `Wait` until it
//!    releases.
//! 2. Plan obligations and derive the floating resource.
//! 3. Walk the table in order. For each rule whose condition holds:
//!    - castable now with `resource - reserve >= cost`: cast it and stop
//!    - castable later: record the time it becomes possible, then stop
//!      (or continue for fall-through rules)
//!    - never castable (missing proc aura, cost above the pool size, gone
//!      target): skip it
//! 4. Without a cast, wait until the earliest of the recorded ready times,
//!    the next obligation due time and the caster's next scheduled event.
//!
//! A cast is only committed after its full cost has been checked against the
//! balance, so acting never drives the resource negative.

mod rule;

pub use rule::{Condition, OnBlocked, Rule, RuleContext, RuleTable, Tier};

use crate::env::Caster;
use crate::error::{CastError, ErrorSeverity, InvariantViolation, SimError};
use crate::ids::AbilityId;
use crate::pooling::{ObligationPlanner, ObligationSet};
use crate::time::SimTime;
use crate::unit::CastOutcome;

/// Result of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// A rule fired and its ability was cast.
    Acted {
        rule: &'static str,
        outcome: CastOutcome,
    },
    /// Nothing can be cast; evaluate again at `until`.
    Wait { until: SimTime },
}

impl Decision {
    pub fn acted(&self) -> bool {
        matches!(self, Self::Acted { .. })
    }

    /// `(must_wait, next_eligible)`: `(false, 0)` after acting,
    /// `(true, until)` otherwise.
    pub fn wake(&self) -> (bool, SimTime) {
        match self {
            Self::Acted { .. } => (false, SimTime::ZERO),
            Self::Wait { until } => (true, *until),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("rule '{rule}' passed its checks but {ability} was rejected: {source}")]
    Rejected {
        rule: &'static str,
        ability: AbilityId,
        source: CastError,
    },
}

impl SimError for EngineError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Invariant(_) => ErrorSeverity::Fatal,
            Self::Rejected { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Invariant(e) => e.error_code(),
            Self::Rejected { .. } => "ENGINE_CAST_REJECTED",
        }
    }
}

enum Readiness {
    Now,
    At(SimTime),
    Never,
}

/// One archetype's rule table plus its pooling obligations.
#[derive(Debug)]
pub struct RotationEngine {
    table: RuleTable,
    planner: ObligationPlanner,
}

impl RotationEngine {
    pub fn new(table: RuleTable, planner: ObligationPlanner) -> Self {
        Self { table, planner }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn planner(&self) -> &ObligationPlanner {
        &self.planner
    }

    /// Obligations as the planner sees them for `caster` right now.
    pub fn obligations(&self, caster: &dyn Caster) -> ObligationSet {
        self.planner.plan(caster)
    }

    pub fn evaluate<C: Caster>(
        &self,
        caster: &mut C,
        now: SimTime,
    ) -> Result<Decision, EngineError> {
        caster.advance_to(now)?;

        let lock = caster.action_lock();
        if lock > now {
            tracing::trace!(%now, %lock, "action lock held");
            return Ok(Decision::Wait { until: lock });
        }

        let view: &dyn Caster = &*caster;
        let obligations = self.planner.plan(view);
        let floating = obligations.floating_resource(now, view.resource());
        let ctx = RuleContext {
            caster: view,
            now,
            floating,
            obligations: &obligations,
        };

        let mut chosen = None;
        let mut ready_at: Option<SimTime> = None;
        for rule in self.table.iter() {
            if !rule.matches(&ctx) {
                continue;
            }
            match readiness(rule, &ctx) {
                Readiness::Now => {
                    chosen = Some(rule);
                    break;
                }
                Readiness::Never => continue,
                Readiness::At(at) => {
                    ready_at = Some(ready_at.map_or(at, |t| t.min(at)));
                    if rule.on_blocked == OnBlocked::Wait {
                        tracing::trace!(rule = rule.label, %at, floating, "rule blocked");
                        break;
                    }
                }
            }
        }

        if let Some(rule) = chosen {
            let outcome = caster.cast(rule.ability, rule.target).map_err(|err| match err {
                CastError::Invariant(violation) => EngineError::Invariant(violation),
                source => EngineError::Rejected {
                    rule: rule.label,
                    ability: rule.ability,
                    source,
                },
            })?;
            tracing::debug!(
                rule = rule.label,
                ability = %rule.ability,
                target = %rule.target,
                %now,
                floating,
                "act"
            );
            return Ok(Decision::Acted {
                rule: rule.label,
                outcome,
            });
        }

        let until = [
            ready_at,
            obligations.next_due_after(now),
            caster.next_event_after(now),
        ]
        .into_iter()
        .flatten()
        .filter(|at| *at > now)
        .min()
        .unwrap_or(SimTime::NEVER);

        tracing::debug!(%now, %until, floating, "wait");
        Ok(Decision::Wait { until })
    }
}

fn readiness(rule: &Rule, ctx: &RuleContext<'_>) -> Readiness {
    let caster = ctx.caster;
    let Ok(def) = caster.spellbook().ability(rule.ability) else {
        return Readiness::Never;
    };
    if let Some(aura) = def.requires_aura {
        if !caster.is_aura_active(caster.id(), aura) {
            return Readiness::Never;
        }
    }
    if !def.is_helpful() && !caster.has_target(rule.target) {
        return Readiness::Never;
    }

    let ledger = caster.resource();
    let cost = caster.cost_of(rule.ability, ctx.now);
    if !cost.is_finite() || cost > ledger.max() {
        return Readiness::Never;
    }

    let reserve = if rule.respects_pooling {
        ctx.floating
    } else {
        0.0
    };
    if caster.can_cast(rule.ability, rule.target) && ledger.can_afford(cost + reserve) {
        return Readiness::Now;
    }

    // A reserve pushing the need past the cap is released once the ledger
    // caps, since obligations beyond the cap point no longer float.
    let needed = (cost + reserve).min(ledger.max());
    let mut at = ledger
        .estimate_time_to_reach(needed, ctx.now)
        .map_or(SimTime::NEVER, |wait| ctx.now + wait);
    at = at.max(caster.ready_at(rule.ability));
    if def.triggers_lock() {
        at = at.max(caster.action_lock());
    }
    Readiness::At(at)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use core::time::Duration;
    use proptest::prelude::*;

    use super::*;
    use crate::config::SimConfig;
    use crate::env::{CombatOracle, FixedCombat, HitResult, ScriptedCombat};
    use crate::ids::{AuraId, ModifierId, UnitId};
    use crate::pooling::ObligationRule;
    use crate::spellbook::{
        AbilityDefinition, AbilityFlags, AuraApplication, AuraDefinition, ModifierDefinition,
        ModifierKind, Spellbook,
    };
    use crate::unit::Agent;

    const SHRED: AbilityId = AbilityId(5221);
    const CLAW: AbilityId = AbilityId(1082);
    const ROAR: AbilityId = AbilityId(52610);
    const ROAR_AURA: AuraId = AuraId(52610);
    const RAVAGE: AbilityId = AbilityId(6785);
    const STAMPEDE: AuraId = AuraId(81022);
    const BERSERK: AbilityId = AbilityId(50334);
    const BERSERK_AURA: AuraId = AuraId(50334);
    const HALF_COST: ModifierId = ModifierId(1);

    fn spellbook(shred_cost: f64) -> Arc<Spellbook> {
        let mut book = Spellbook::default();
        book.insert_modifier(ModifierDefinition {
            id: HALF_COST,
            label: "Berserk".into(),
            kind: ModifierKind::CostMultiplier,
            value: 0.5,
        })
        .unwrap();
        book.insert_aura(AuraDefinition::new(ROAR_AURA, "Roar", Duration::from_secs(6)))
            .unwrap();
        book.insert_aura(AuraDefinition::new(STAMPEDE, "Stampede", Duration::from_secs(10)))
            .unwrap();
        book.insert_aura(
            AuraDefinition::new(BERSERK_AURA, "Berserk", Duration::from_secs(15))
                .with_modifier(HALF_COST),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(SHRED, "Shred", shred_cost)
                .with_refund(0.8)
                .with_points(1)
                .with_cost_modifier(HALF_COST),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(CLAW, "Claw", 40.0)
                .with_points(1)
                .with_cost_modifier(HALF_COST),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(ROAR, "Roar", 30.0)
                .with_flags(AbilityFlags::TRIGGERS_LOCK | AbilityFlags::HELPFUL)
                .applying(AuraApplication::on_caster(ROAR_AURA)),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(RAVAGE, "Ravage", 0.0)
                .requiring(STAMPEDE)
                .consuming(STAMPEDE),
        )
        .unwrap();
        book.insert_ability(
            AbilityDefinition::new(BERSERK, "Berserk", 0.0)
                .with_flags(AbilityFlags::HELPFUL)
                .with_cooldown(Duration::from_secs(180))
                .applying(AuraApplication::on_caster(BERSERK_AURA)),
        )
        .unwrap();
        book.validate().unwrap();
        Arc::new(book)
    }

    fn config(start: f64, regen: f64) -> SimConfig {
        SimConfig {
            resource_start: start,
            regen_per_tick: regen,
            ..SimConfig::default()
        }
    }

    fn agent(
        book: Arc<Spellbook>,
        config: SimConfig,
        combat: impl CombatOracle + 'static,
    ) -> Agent {
        Agent::new(&config, book, Box::new(combat)).unwrap()
    }

    fn always_shred(book: &Spellbook) -> RotationEngine {
        let rules = vec![Rule::new("shred", Tier::Builder, SHRED)];
        let table = RuleTable::new(rules, book).unwrap();
        RotationEngine::new(table, ObligationPlanner::none())
    }

    #[test]
    fn acts_immediately_when_affordable() {
        let book = spellbook(80.0);
        let engine = always_shred(&book);
        let mut agent = agent(book, config(100.0, 10.0), FixedCombat::hitting(1.0));

        let decision = engine.evaluate(&mut agent, SimTime::ZERO).unwrap();

        assert_eq!(decision.wake(), (false, SimTime::ZERO));
        assert_eq!(agent.resource().current(), 20.0);
        assert_eq!(agent.action_lock(), SimTime::from_secs(1));
    }

    #[test]
    fn waits_for_regeneration_when_short() {
        let book = spellbook(80.0);
        let engine = always_shred(&book);
        let mut agent = agent(book, config(20.0, 10.0), FixedCombat::hitting(1.0));

        let decision = engine.evaluate(&mut agent, SimTime::ZERO).unwrap();

        assert_eq!(decision.wake(), (true, SimTime::from_secs(6)));
        assert_eq!(agent.resource().current(), 20.0);

        // Re-invoked at the returned time, the cast goes through.
        let decision = engine.evaluate(&mut agent, SimTime::from_secs(6)).unwrap();
        assert!(decision.acted());
        assert_eq!(agent.resource().current(), 0.0);
    }

    #[test]
    fn held_lock_defers_evaluation() {
        let book = spellbook(10.0);
        let engine = always_shred(&book);
        let mut agent = agent(book, config(100.0, 10.0), FixedCombat::hitting(1.0));

        assert!(engine.evaluate(&mut agent, SimTime::ZERO).unwrap().acted());
        let decision = engine.evaluate(&mut agent, SimTime::from_millis(400)).unwrap();
        assert_eq!(decision, Decision::Wait { until: SimTime::from_secs(1) });
    }

    #[test]
    fn builder_pools_for_upcoming_refresh() {
        let book = spellbook(80.0);
        let table = RuleTable::new(
            vec![
                Rule::new("roar", Tier::MaintainStacks, ROAR)
                    .on(UnitId::AGENT)
                    .when(|ctx| {
                        ctx.remaining(UnitId::AGENT, ROAR_AURA) <= Duration::from_secs(1)
                    }),
                Rule::new("claw", Tier::Builder, CLAW),
            ],
            &book,
        )
        .unwrap();
        let planner = ObligationPlanner::new(
            vec![
                ObligationRule::new("roar", UnitId::AGENT, ROAR_AURA, ROAR)
                    .with_lead(Duration::from_secs(1)),
            ],
            &book,
        )
        .unwrap();
        let engine = RotationEngine::new(table, planner);
        let mut agent = agent(book, config(70.0, 5.0), FixedCombat::hitting(1.0));

        // Roar lands at 0s (70 -> 40) and lasts until 6s.
        assert!(engine.evaluate(&mut agent, SimTime::ZERO).unwrap().acted());
        assert_eq!(agent.resource().current(), 40.0);

        // At 4s: 60 held and the refresh due at 5s floats 30, so Claw (40)
        // would dip into it.
        let now = SimTime::from_secs(4);
        agent.advance_to(now).unwrap();
        let obligations = engine.obligations(&agent);
        let pending = obligations.iter().next().unwrap();
        assert_eq!(pending.due_at, SimTime::from_secs(5));
        assert_eq!(pending.cost, 30.0);
        assert_eq!(obligations.floating_resource(now, agent.resource()), 30.0);

        let decision = engine.evaluate(&mut agent, now).unwrap();
        assert_eq!(decision, Decision::Wait { until: SimTime::from_secs(5) });
        assert_eq!(agent.resource().current(), 60.0);

        // At 5s the refresh itself fires.
        match engine.evaluate(&mut agent, SimTime::from_secs(5)).unwrap() {
            Decision::Acted { rule, .. } => assert_eq!(rule, "roar"),
            other => panic!("expected roar, got {other:?}"),
        }
    }

    #[test]
    fn regen_before_due_time_does_not_shrink_reserve() {
        let book = spellbook(42.0);
        let table = RuleTable::new(
            vec![
                Rule::new("roar", Tier::MaintainStacks, ROAR)
                    .on(UnitId::AGENT)
                    .when(|ctx| {
                        ctx.remaining(UnitId::AGENT, ROAR_AURA) <= Duration::from_secs(1)
                    }),
                Rule::new("shred", Tier::Builder, SHRED),
            ],
            &book,
        )
        .unwrap();
        let planner = ObligationPlanner::new(
            vec![
                ObligationRule::new("roar", UnitId::AGENT, ROAR_AURA, ROAR)
                    .with_lead(Duration::from_secs(1)),
            ],
            &book,
        )
        .unwrap();
        let engine = RotationEngine::new(table, planner);
        let mut agent = agent(book, config(80.0, 5.0), FixedCombat::hitting(1.0));
        assert!(engine.evaluate(&mut agent, SimTime::ZERO).unwrap().acted());

        // 70 held at 4s with 30 owed at 5s leaves 40, short of Shred's 42,
        // even though the 5 regenerated by then would cover the gap.
        let now = SimTime::from_secs(4);
        let decision = engine.evaluate(&mut agent, now).unwrap();
        assert_eq!(agent.resource().current(), 70.0);
        assert_eq!(decision, Decision::Wait { until: SimTime::from_secs(5) });
        assert_eq!(agent.log().casts_of(SHRED), 0);
    }

    #[test]
    fn miss_refunds_after_resolution() {
        let book = spellbook(80.0);
        let engine = always_shred(&book);
        let oracle = ScriptedCombat::new([HitResult::Miss], 1.0);
        let mut agent = agent(book, config(100.0, 10.0), oracle);

        assert!(engine.evaluate(&mut agent, SimTime::ZERO).unwrap().acted());
        assert_eq!(agent.resource().current(), 20.0 + 0.8 * 80.0);
    }

    #[test]
    fn first_matching_rule_wins() {
        let book = spellbook(40.0);
        let table = RuleTable::new(
            vec![
                Rule::new("claw", Tier::Builder, CLAW),
                Rule::new("shred", Tier::Builder, SHRED),
            ],
            &book,
        )
        .unwrap();
        let engine = RotationEngine::new(table, ObligationPlanner::none());
        let mut agent = agent(book, config(100.0, 10.0), FixedCombat::hitting(1.0));

        match engine.evaluate(&mut agent, SimTime::ZERO).unwrap() {
            Decision::Acted { rule, outcome } => {
                assert_eq!(rule, "claw");
                assert_eq!(outcome.ability, CLAW);
            }
            other => panic!("expected claw, got {other:?}"),
        }
    }

    #[test]
    fn reactive_rule_without_proc_falls_through() {
        let book = spellbook(40.0);
        let table = RuleTable::new(
            vec![
                Rule::new("ravage", Tier::Reactive, RAVAGE),
                Rule::new("shred", Tier::Builder, SHRED),
            ],
            &book,
        )
        .unwrap();
        let engine = RotationEngine::new(table, ObligationPlanner::none());
        let mut agent = agent(book, config(100.0, 10.0), FixedCombat::hitting(1.0));

        match engine.evaluate(&mut agent, SimTime::ZERO).unwrap() {
            Decision::Acted { rule, .. } => assert_eq!(rule, "shred"),
            other => panic!("expected shred, got {other:?}"),
        }
    }

    #[test]
    fn burst_cooldown_halves_cost() {
        let book = spellbook(80.0);
        let table = RuleTable::new(
            vec![
                Rule::new("berserk", Tier::Burst, BERSERK)
                    .on(UnitId::AGENT)
                    .when(|ctx| ctx.is_ready(BERSERK)),
                Rule::new("shred", Tier::Builder, SHRED),
            ],
            &book,
        )
        .unwrap();
        let engine = RotationEngine::new(table, ObligationPlanner::none());
        let mut agent = agent(book, config(60.0, 10.0), FixedCombat::hitting(1.0));

        assert!(engine.evaluate(&mut agent, SimTime::ZERO).unwrap().acted());
        assert!(agent.is_modifier_active_at(HALF_COST, SimTime::ZERO));

        // Berserk is on cooldown; Shred costs 40 while it lasts.
        assert!(engine.evaluate(&mut agent, SimTime::from_secs(1)).unwrap().acted());
        assert_eq!(agent.resource().current(), 70.0 - 40.0);
    }

    proptest! {
        #[test]
        fn acting_never_overdraws(start in 0.0f64..=100.0, cost in 0.0f64..=100.0) {
            let book = spellbook(cost);
            let engine = always_shred(&book);
            let mut agent = agent(book, config(start, 10.0), FixedCombat::hitting(1.0));

            let mut now = SimTime::ZERO;
            for _ in 0..8 {
                let decision = engine.evaluate(&mut agent, now).unwrap();
                prop_assert!(agent.resource().current() >= 0.0);
                match decision {
                    Decision::Acted { outcome, .. } => {
                        prop_assert!(outcome.cost <= agent.resource().max());
                    }
                    Decision::Wait { until } => {
                        prop_assert!(until > now);
                        now = until;
                    }
                }
            }
        }
    }
}
