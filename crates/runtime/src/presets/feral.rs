//! Energy melee priority list with pooling for the roar refresh.

use core::time::Duration;

use sim_content::archetype::feral::*;
use sim_core::{
    Caster, CooldownForecast, CooldownGrant, ObligationPlanner, ObligationRule, RotationEngine,
    Rule, RuleTable, SetupError, Spellbook, Tier, UnitId,
};

use super::Preset;

const TARGET: UnitId = UnitId::PRIMARY_TARGET;
const FINISH_AT: u32 = 5;
/// Resource headroom below the cap at which the dump rule fires.
const CAP_MARGIN: f64 = 10.0;

pub(super) fn preset(spellbook: &Spellbook) -> Result<Preset, SetupError> {
    Ok(Preset {
        engine: RotationEngine::new(rules(spellbook)?, obligations(spellbook)?),
        forecast: Box::new(CooldownForecast::new([CooldownGrant {
            modifier: BERSERK_DISCOUNT,
            ability: BERSERK,
            aura: BERSERKING,
        }])),
    })
}

fn rules(spellbook: &Spellbook) -> Result<RuleTable, SetupError> {
    RuleTable::new(
        vec![
            Rule::new("rake", Tier::MaintainDebuff, RAKE)
                .when(|ctx| !ctx.is_active(TARGET, RAKE_BLEED)),
            Rule::new("savage_roar", Tier::MaintainStacks, SAVAGE_ROAR)
                .when(|ctx| !ctx.has_buff(ROAR) && ctx.points() >= 1),
            Rule::new("ravage", Tier::Reactive, RAVAGE)
                .when(|ctx| ctx.has_buff(STAMPEDE))
                .falling_through(),
            Rule::new("feral_charge", Tier::Reactive, FERAL_CHARGE)
                .when(|ctx| ctx.is_ready(FERAL_CHARGE) && !ctx.has_buff(STAMPEDE))
                .falling_through(),
            Rule::new("berserk", Tier::Burst, BERSERK)
                .when(|ctx| ctx.is_ready(BERSERK))
                .falling_through(),
            Rule::new("ferocious_bite", Tier::Finisher, FEROCIOUS_BITE)
                .when(|ctx| ctx.points() >= FINISH_AT && ctx.has_buff(ROAR))
                .respecting_pooling(true)
                .falling_through(),
            Rule::new("shred", Tier::Builder, SHRED).when(|ctx| ctx.points() < FINISH_AT),
            Rule::new("shred_at_cap", Tier::Pool, SHRED)
                .when(|ctx| ctx.resource() >= ctx.caster.resource().max() - CAP_MARGIN),
        ],
        spellbook,
    )
}

fn obligations(spellbook: &Spellbook) -> Result<ObligationPlanner, SetupError> {
    ObligationPlanner::new(
        vec![
            ObligationRule::new("roar_refresh", UnitId::AGENT, ROAR, SAVAGE_ROAR),
            ObligationRule::new("roar_builder", UnitId::AGENT, ROAR, SHRED)
                .with_lead(Duration::from_secs(1))
                .when(|caster: &dyn Caster| caster.points().current() == 0),
        ],
        spellbook,
    )
}
