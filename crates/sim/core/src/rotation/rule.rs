//! Guarded rules and the ordered table they live in.

use core::time::Duration;

use crate::env::Caster;
use crate::error::SetupError;
use crate::ids::{AbilityId, AuraId, UnitId};
use crate::pooling::ObligationSet;
use crate::spellbook::Spellbook;
use crate::time::SimTime;

/// Precedence class of a rule. A table lists its rules in this order.
///
/// - `MaintainDebuff`: keep a debuff up on the target
/// - `MaintainStacks`: keep a buff, stack count or point-fed effect up
/// - `Reactive`: spend a proc or free-cast window
/// - `Burst`: use a burst cooldown inside its window
/// - `Finisher`: spend points once a threshold is reached
/// - `Builder`: generate points once resource allows
/// - `Pool`: hold resource for a forecast obligation
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Tier {
    MaintainDebuff,
    MaintainStacks,
    Reactive,
    Burst,
    Finisher,
    Builder,
    Pool,
}

impl Tier {
    /// Whether rules of this tier leave the floating resource alone by default.
    pub fn respects_pooling(self) -> bool {
        self >= Tier::Builder
    }
}

/// What the engine does when a rule's condition holds but the cast is not yet
/// possible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnBlocked {
    /// Stop and wait for this rule.
    #[default]
    Wait,
    /// Note its ready time and keep looking at lower rules.
    FallThrough,
}

/// State a rule condition may read.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub caster: &'a dyn Caster,
    pub now: SimTime,
    /// Resource held back for pending obligations.
    pub floating: f64,
    pub obligations: &'a ObligationSet,
}

impl RuleContext<'_> {
    pub fn resource(&self) -> f64 {
        self.caster.resource().current()
    }

    /// Resource available to rules that respect pooling.
    pub fn spendable(&self) -> f64 {
        (self.resource() - self.floating).max(0.0)
    }

    pub fn points(&self) -> u32 {
        self.caster.points().current()
    }

    pub fn is_active(&self, holder: UnitId, aura: AuraId) -> bool {
        self.caster.is_aura_active(holder, aura)
    }

    /// Buff on the caster itself.
    pub fn has_buff(&self, aura: AuraId) -> bool {
        self.caster.is_aura_active(self.caster.id(), aura)
    }

    pub fn remaining(&self, holder: UnitId, aura: AuraId) -> Duration {
        self.caster.remaining_duration(holder, aura)
    }

    pub fn stacks(&self, holder: UnitId, aura: AuraId) -> u8 {
        self.caster.stacks(holder, aura)
    }

    pub fn is_ready(&self, ability: AbilityId) -> bool {
        self.caster.ready_at(ability) <= self.now
    }
}

pub type Condition = Box<dyn Fn(&RuleContext<'_>) -> bool + Send + Sync>;

/// `(condition) -> (ability on target)`.
pub struct Rule {
    pub label: &'static str,
    pub tier: Tier,
    pub ability: AbilityId,
    pub target: UnitId,
    pub respects_pooling: bool,
    pub on_blocked: OnBlocked,
    condition: Option<Condition>,
}

impl core::fmt::Debug for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rule")
            .field("label", &self.label)
            .field("tier", &self.tier)
            .field("ability", &self.ability)
            .field("target", &self.target)
            .field("respects_pooling", &self.respects_pooling)
            .field("on_blocked", &self.on_blocked)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// An unconditional rule on the primary target.
    pub fn new(label: &'static str, tier: Tier, ability: AbilityId) -> Self {
        Self {
            label,
            tier,
            ability,
            target: UnitId::PRIMARY_TARGET,
            respects_pooling: tier.respects_pooling(),
            on_blocked: OnBlocked::default(),
            condition: None,
        }
    }

    pub fn on(mut self, target: UnitId) -> Self {
        self.target = target;
        self
    }

    pub fn when(
        mut self,
        condition: impl Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn respecting_pooling(mut self, respects: bool) -> Self {
        self.respects_pooling = respects;
        self
    }

    pub fn falling_through(mut self) -> Self {
        self.on_blocked = OnBlocked::FallThrough;
        self
    }

    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        self.condition.as_ref().is_none_or(|condition| condition(ctx))
    }
}

/// Rules of one archetype in fixed priority order.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Validates the table against `spellbook`.
    ///
    /// Fails if the table is empty, if a rule names an unknown ability, or if
    /// the tiers are not in precedence order.
    pub fn new(rules: Vec<Rule>, spellbook: &Spellbook) -> Result<Self, SetupError> {
        if rules.is_empty() {
            return Err(SetupError::EmptyRuleTable);
        }
        for rule in &rules {
            spellbook.require_ability(rule.label, rule.ability)?;
        }
        for pair in rules.windows(2) {
            let (previous, rule) = (&pair[0], &pair[1]);
            if rule.tier < previous.tier {
                return Err(SetupError::RuleOutOfOrder {
                    rule: rule.label.to_string(),
                    tier: rule.tier.into(),
                    previous: previous.tier.into(),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
