//! Mana caster priority list. Nothing here pools.

use core::time::Duration;

use sim_content::archetype::caster::*;
use sim_core::{
    AuraForecast, ObligationPlanner, RotationEngine, Rule, RuleTable, SetupError, Spellbook,
    Tier, UnitId,
};

use super::Preset;

const TARGET: UnitId = UnitId::PRIMARY_TARGET;
/// Immolate is recast this close to expiry so the new one lands as the old
/// one ends.
const IMMOLATE_LEAD: Duration = Duration::from_secs(2);
const TAP_BELOW: f64 = 0.15;

pub(super) fn preset(spellbook: &Spellbook) -> Result<Preset, SetupError> {
    let rules = RuleTable::new(
        vec![
            Rule::new("corruption", Tier::MaintainDebuff, CORRUPTION)
                .when(|ctx| !ctx.is_active(TARGET, CORRUPTION_DOT)),
            Rule::new("immolate", Tier::MaintainDebuff, IMMOLATE)
                .when(|ctx| ctx.remaining(TARGET, IMMOLATE_DOT) <= IMMOLATE_LEAD),
            Rule::new("life_tap", Tier::MaintainStacks, LIFE_TAP)
                .when(|ctx| ctx.resource() < ctx.caster.resource().max() * TAP_BELOW),
            Rule::new("shadow_bolt", Tier::Builder, SHADOW_BOLT),
        ],
        spellbook,
    )?;

    Ok(Preset {
        engine: RotationEngine::new(rules, ObligationPlanner::none()),
        forecast: Box::new(AuraForecast),
    })
}
