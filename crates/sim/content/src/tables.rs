//! Outcome tables consumed by the runtime's combat oracle.
//!
//! The decision core never reads these: it only sees the rolled
//! [`HitResult`] and amount the oracle hands back.

use sim_core::{AbilityId, AuraId, HitResult};

/// Single-roll attack table.
///
/// One uniform roll in `[0, 1)` walks the bands in order: miss, dodge, crit,
/// and anything left is a plain hit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatTable {
    pub miss_chance: f64,
    pub dodge_chance: f64,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
}

impl Default for CombatTable {
    fn default() -> Self {
        Self {
            miss_chance: 0.0,
            dodge_chance: 0.0,
            crit_chance: 0.0,
            crit_multiplier: 2.0,
        }
    }
}

impl CombatTable {
    pub fn classify(&self, roll: f64) -> HitResult {
        let mut band = self.miss_chance;
        if roll < band {
            return HitResult::Miss;
        }
        band += self.dodge_chance;
        if roll < band {
            return HitResult::Dodge;
        }
        band += self.crit_chance;
        if roll < band {
            return HitResult::Crit;
        }
        HitResult::Hit
    }

    /// Sum of the non-hit bands; must not exceed one.
    pub fn coverage(&self) -> f64 {
        self.miss_chance + self.dodge_chance + self.crit_chance
    }
}

/// Direct damage of one ability.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageEntry {
    pub ability: AbilityId,
    pub base: f64,
    /// Symmetric spread around the mean, as a fraction of it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub variance: f64,
    /// Added per finisher point consumed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub per_point: f64,
}

impl DamageEntry {
    /// Rolled amount before multipliers; `roll` is uniform in `[0, 1)`.
    pub fn amount(&self, points: u32, roll: f64) -> f64 {
        let mean = self.base + self.per_point * f64::from(points);
        mean * (1.0 + self.variance * (2.0 * roll - 1.0))
    }
}

/// Per-tick damage of a periodic effect.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickEntry {
    pub aura: AuraId,
    pub amount: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub per_point: f64,
}

impl TickEntry {
    pub fn amount(&self, points: u32) -> f64 {
        self.amount + self.per_point * f64::from(points)
    }
}

/// Damage lookups for one archetype.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DamageTable {
    pub direct: Vec<DamageEntry>,
    pub ticks: Vec<TickEntry>,
}

impl DamageTable {
    pub fn direct(&self, ability: AbilityId) -> Option<&DamageEntry> {
        self.direct.iter().find(|entry| entry.ability == ability)
    }

    pub fn tick(&self, aura: AuraId) -> Option<&TickEntry> {
        self.ticks.iter().find(|entry| entry.aura == aura)
    }
}
