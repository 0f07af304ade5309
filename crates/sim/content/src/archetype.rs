//! Archetypes shipped with the crate and the ids their data files use.
//!
//! Rule presets refer to abilities and auras through these constants; the
//! embedded spellbooks must register every one of them.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Built-in archetype.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Archetype {
    /// Energy melee with finisher points and pooling.
    Feral,
    /// Mana caster with periodic effects and travel-time nukes.
    Caster,
}

/// Energy melee archetype.
pub mod feral {
    use sim_core::{AbilityId, AuraId, ModifierId};

    pub const SHRED: AbilityId = AbilityId(1);
    pub const RAKE: AbilityId = AbilityId(2);
    pub const SAVAGE_ROAR: AbilityId = AbilityId(3);
    pub const FEROCIOUS_BITE: AbilityId = AbilityId(4);
    pub const RAVAGE: AbilityId = AbilityId(5);
    pub const BERSERK: AbilityId = AbilityId(6);
    pub const FERAL_CHARGE: AbilityId = AbilityId(7);

    pub const RAKE_BLEED: AuraId = AuraId(1);
    pub const ROAR: AuraId = AuraId(2);
    /// Free ravage window opened by feral charge.
    pub const STAMPEDE: AuraId = AuraId(3);
    pub const BERSERKING: AuraId = AuraId(4);

    pub const BERSERK_DISCOUNT: ModifierId = ModifierId(1);
    pub const ROAR_DAMAGE: ModifierId = ModifierId(2);

    pub const ABILITIES: [AbilityId; 7] = [
        SHRED,
        RAKE,
        SAVAGE_ROAR,
        FEROCIOUS_BITE,
        RAVAGE,
        BERSERK,
        FERAL_CHARGE,
    ];
}

/// Mana caster archetype.
pub mod caster {
    use sim_core::{AbilityId, AuraId, ModifierId};

    pub const CORRUPTION: AbilityId = AbilityId(10);
    pub const IMMOLATE: AbilityId = AbilityId(11);
    pub const SHADOW_BOLT: AbilityId = AbilityId(12);
    pub const LIFE_TAP: AbilityId = AbilityId(13);

    pub const CORRUPTION_DOT: AuraId = AuraId(10);
    pub const IMMOLATE_DOT: AuraId = AuraId(11);
    pub const SHADOW_AND_FLAME: AuraId = AuraId(12);

    pub const SHADOW_VULNERABILITY: ModifierId = ModifierId(10);

    pub const ABILITIES: [AbilityId; 4] = [CORRUPTION, IMMOLATE, SHADOW_BOLT, LIFE_TAP];
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn names_round_trip() {
        assert_eq!(Archetype::Feral.to_string(), "feral");
        assert_eq!(Archetype::from_str("caster"), Ok(Archetype::Caster));
        assert!(Archetype::from_str("paladin").is_err());
    }
}
