//! Static ability, aura, modifier and periodic-effect definitions.
//!
//! A [`Spellbook`] is assembled once at setup and validated: every id an
//! ability or aura references must be registered. Configuration gaps are
//! fatal here so that evaluation never has to discover them.

use std::collections::BTreeMap;

use bitflags::bitflags;
use core::time::Duration;

use crate::config::SimConfig;
use crate::error::{CastError, SetupError};
use crate::ids::{AbilityId, AuraId, ModifierId};

bitflags! {
    /// Behavioural flags of an ability.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct AbilityFlags: u8 {
        /// Engages the shared action lock.
        const TRIGGERS_LOCK = 1 << 0;
        /// Consumes every held point.
        const FINISHER      = 1 << 1;
        /// Targets the caster; always lands and skips outcome rolls.
        const HELPFUL       = 1 << 2;
    }
}

/// What a modifier scales.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierKind {
    CostMultiplier,
    DamageMultiplier,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifierDefinition {
    pub id: ModifierId,
    pub label: String,
    pub kind: ModifierKind,
    pub value: f64,
}

/// Which unit holds an applied aura.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuraHolder {
    #[default]
    Caster,
    Target,
}

/// Aura applied when an ability lands.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraApplication {
    pub aura: AuraId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub holder: AuraHolder,
    /// Probability of the application, rolled when the impact resolves.
    #[cfg_attr(feature = "serde", serde(default = "always"))]
    pub chance: f64,
}

#[cfg(feature = "serde")]
fn always() -> f64 {
    1.0
}

impl AuraApplication {
    pub fn on_caster(aura: AuraId) -> Self {
        Self {
            aura,
            holder: AuraHolder::Caster,
            chance: 1.0,
        }
    }

    pub fn on_target(aura: AuraId) -> Self {
        Self {
            aura,
            holder: AuraHolder::Target,
            chance: 1.0,
        }
    }

    pub fn with_chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }
}

/// Timed effect definition.
///
/// Gain and expire are strictly edge-triggered: modifiers listed here are
/// acquired on absent -> present and released on present -> absent. Stack
/// changes on an already active aura never re-run them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AuraDefinition {
    pub id: AuraId,
    pub label: String,
    pub duration_ms: u64,
    /// Extra duration per point consumed by the applying finisher.
    pub duration_per_point_ms: u64,
    pub max_stacks: u8,
    pub modifiers: Vec<ModifierId>,
}

impl Default for AuraDefinition {
    fn default() -> Self {
        Self {
            id: AuraId(0),
            label: String::new(),
            duration_ms: 0,
            duration_per_point_ms: 0,
            max_stacks: 1,
            modifiers: Vec::new(),
        }
    }
}

impl AuraDefinition {
    pub fn new(id: AuraId, label: impl Into<String>, duration: Duration) -> Self {
        Self {
            id,
            label: label.into(),
            duration_ms: crate::time::duration_millis(duration),
            ..Self::default()
        }
    }

    pub fn with_stacks(mut self, max_stacks: u8) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierId) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_duration_per_point(mut self, per_point: Duration) -> Self {
        self.duration_per_point_ms = crate::time::duration_millis(per_point);
        self
    }

    /// Duration of an application that consumed `points`.
    pub fn duration_for(&self, points: u32) -> Duration {
        Duration::from_millis(self.duration_ms + self.duration_per_point_ms * u64::from(points))
    }
}

/// Multi-tick effect bound to an aura.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodicDefinition {
    pub aura: AuraId,
    pub tick_ms: u64,
    pub tick_count: u32,
    /// Rolling effects re-snapshot on every tick and extend on refresh.
    /// Non-rolling effects reset the tick counter and re-snapshot on refresh.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rolling: bool,
}

impl PeriodicDefinition {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub label: String,
    pub cost: f64,
    /// Fraction of the cost credited back when the outcome does not land.
    pub refund_on_miss: f64,
    pub cooldown_ms: u64,
    pub cast_time_ms: u64,
    pub travel_time_ms: u64,
    pub flags: AbilityFlags,
    pub points_on_land: u32,
    /// Flat resource credited on cast.
    pub grants_resource: f64,
    pub applies: Vec<AuraApplication>,
    pub requires_aura: Option<AuraId>,
    pub consumes_aura: Option<AuraId>,
    pub cost_modifiers: Vec<ModifierId>,
}

impl Default for AbilityDefinition {
    fn default() -> Self {
        Self {
            id: AbilityId(0),
            label: String::new(),
            cost: 0.0,
            refund_on_miss: 0.0,
            cooldown_ms: 0,
            cast_time_ms: 0,
            travel_time_ms: 0,
            flags: AbilityFlags::TRIGGERS_LOCK,
            points_on_land: 0,
            grants_resource: 0.0,
            applies: Vec::new(),
            requires_aura: None,
            consumes_aura: None,
            cost_modifiers: Vec::new(),
        }
    }
}

impl AbilityDefinition {
    pub fn new(id: AbilityId, label: impl Into<String>, cost: f64) -> Self {
        Self {
            id,
            label: label.into(),
            cost,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: AbilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_refund(mut self, fraction: f64) -> Self {
        self.refund_on_miss = fraction;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = crate::time::duration_millis(cooldown);
        self
    }

    pub fn with_cast_time(mut self, cast_time: Duration) -> Self {
        self.cast_time_ms = crate::time::duration_millis(cast_time);
        self
    }

    pub fn with_travel_time(mut self, travel_time: Duration) -> Self {
        self.travel_time_ms = crate::time::duration_millis(travel_time);
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points_on_land = points;
        self
    }

    pub fn with_resource_grant(mut self, amount: f64) -> Self {
        self.grants_resource = amount;
        self
    }

    pub fn applying(mut self, application: AuraApplication) -> Self {
        self.applies.push(application);
        self
    }

    pub fn requiring(mut self, aura: AuraId) -> Self {
        self.requires_aura = Some(aura);
        self
    }

    pub fn consuming(mut self, aura: AuraId) -> Self {
        self.consumes_aura = Some(aura);
        self
    }

    pub fn with_cost_modifier(mut self, modifier: ModifierId) -> Self {
        self.cost_modifiers.push(modifier);
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn cast_time(&self) -> Duration {
        Duration::from_millis(self.cast_time_ms)
    }

    pub fn travel_time(&self) -> Duration {
        Duration::from_millis(self.travel_time_ms)
    }

    pub fn is_finisher(&self) -> bool {
        self.flags.contains(AbilityFlags::FINISHER)
    }

    pub fn is_helpful(&self) -> bool {
        self.flags.contains(AbilityFlags::HELPFUL)
    }

    pub fn triggers_lock(&self) -> bool {
        self.flags.contains(AbilityFlags::TRIGGERS_LOCK)
    }
}

/// Serialized spellbook layout.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellbookSpec {
    pub modifiers: Vec<ModifierDefinition>,
    pub auras: Vec<AuraDefinition>,
    pub periodics: Vec<PeriodicDefinition>,
    pub abilities: Vec<AbilityDefinition>,
}

/// Validated collection of static definitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spellbook {
    abilities: BTreeMap<AbilityId, AbilityDefinition>,
    auras: BTreeMap<AuraId, AuraDefinition>,
    modifiers: BTreeMap<ModifierId, ModifierDefinition>,
    periodics: BTreeMap<AuraId, PeriodicDefinition>,
}

impl Spellbook {
    /// Builds and validates a spellbook from its serialized layout.
    pub fn from_spec(spec: SpellbookSpec) -> Result<Self, SetupError> {
        let mut book = Self::default();
        for modifier in spec.modifiers {
            book.insert_modifier(modifier)?;
        }
        for aura in spec.auras {
            book.insert_aura(aura)?;
        }
        for periodic in spec.periodics {
            book.insert_periodic(periodic)?;
        }
        for ability in spec.abilities {
            book.insert_ability(ability)?;
        }
        book.validate()?;
        Ok(book)
    }

    pub fn insert_modifier(&mut self, def: ModifierDefinition) -> Result<(), SetupError> {
        if self.modifiers.contains_key(&def.id) {
            return Err(SetupError::Duplicate(def.id.to_string()));
        }
        self.modifiers.insert(def.id, def);
        Ok(())
    }

    pub fn insert_aura(&mut self, def: AuraDefinition) -> Result<(), SetupError> {
        if self.auras.contains_key(&def.id) {
            return Err(SetupError::Duplicate(def.id.to_string()));
        }
        if def.max_stacks == 0 || def.max_stacks > SimConfig::MAX_STACKS {
            return Err(SetupError::InvalidDefinition {
                owner: def.label,
                reason: "max_stacks must be between 1 and MAX_STACKS",
            });
        }
        self.auras.insert(def.id, def);
        Ok(())
    }

    pub fn insert_periodic(&mut self, def: PeriodicDefinition) -> Result<(), SetupError> {
        if self.periodics.contains_key(&def.aura) {
            return Err(SetupError::Duplicate(format!("periodic {}", def.aura)));
        }
        if def.tick_ms == 0 || def.tick_count == 0 {
            return Err(SetupError::InvalidDefinition {
                owner: format!("periodic {}", def.aura),
                reason: "tick period and tick count must be non-zero",
            });
        }
        self.periodics.insert(def.aura, def);
        Ok(())
    }

    pub fn insert_ability(&mut self, def: AbilityDefinition) -> Result<(), SetupError> {
        if self.abilities.contains_key(&def.id) {
            return Err(SetupError::Duplicate(def.id.to_string()));
        }
        if def.cost < 0.0 || !(0.0..=1.0).contains(&def.refund_on_miss) {
            return Err(SetupError::InvalidDefinition {
                owner: def.label,
                reason: "cost must be non-negative and refund a fraction",
            });
        }
        if def.consumes_aura.is_some() && def.consumes_aura != def.requires_aura {
            return Err(SetupError::InvalidDefinition {
                owner: def.label,
                reason: "a consumed aura must also be required",
            });
        }
        self.abilities.insert(def.id, def);
        Ok(())
    }

    /// Checks that every cross-reference resolves.
    pub fn validate(&self) -> Result<(), SetupError> {
        for aura in self.auras.values() {
            for modifier in &aura.modifiers {
                self.require_modifier(&aura.label, *modifier)?;
            }
        }
        for periodic in self.periodics.values() {
            self.require_aura(&format!("periodic {}", periodic.aura), periodic.aura)?;
        }
        for ability in self.abilities.values() {
            let owner = &ability.label;
            for application in &ability.applies {
                self.require_aura(owner, application.aura)?;
            }
            for aura in ability.requires_aura.iter().chain(&ability.consumes_aura) {
                self.require_aura(owner, *aura)?;
            }
            for modifier in &ability.cost_modifiers {
                self.require_modifier(owner, *modifier)?;
            }
        }
        Ok(())
    }

    fn require_aura(&self, owner: &str, aura: AuraId) -> Result<(), SetupError> {
        if self.auras.contains_key(&aura) {
            Ok(())
        } else {
            Err(SetupError::UnknownAura {
                owner: owner.to_string(),
                aura,
            })
        }
    }

    fn require_modifier(&self, owner: &str, modifier: ModifierId) -> Result<(), SetupError> {
        if self.modifiers.contains_key(&modifier) {
            Ok(())
        } else {
            Err(SetupError::UnknownModifier {
                owner: owner.to_string(),
                modifier,
            })
        }
    }

    /// Fails with a setup error if `ability` is missing.
    pub fn require_ability(&self, owner: &str, ability: AbilityId) -> Result<(), SetupError> {
        if self.abilities.contains_key(&ability) {
            Ok(())
        } else {
            Err(SetupError::UnknownAbility {
                owner: owner.to_string(),
                ability,
            })
        }
    }

    pub fn ability(&self, id: AbilityId) -> Result<&AbilityDefinition, CastError> {
        self.abilities.get(&id).ok_or(CastError::UnknownAbility(id))
    }

    pub fn aura(&self, id: AuraId) -> Option<&AuraDefinition> {
        self.auras.get(&id)
    }

    pub fn modifier(&self, id: ModifierId) -> Option<&ModifierDefinition> {
        self.modifiers.get(&id)
    }

    pub fn periodic(&self, aura: AuraId) -> Option<&PeriodicDefinition> {
        self.periodics.get(&aura)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values()
    }

    pub fn has_aura(&self, id: AuraId) -> bool {
        self.auras.contains_key(&id)
    }
}
