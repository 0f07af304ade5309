//! Rule tables for the built-in archetypes.
//!
//! A preset pairs a [`RotationEngine`] with the modifier forecast its
//! obligations need. Presets only reference ids from
//! [`sim_content::archetype`], so they build against any spellbook that
//! registers those ids.

mod caster;
mod feral;

use sim_content::Archetype;
use sim_core::{ModifierForecast, RotationEngine, SetupError, Spellbook};

pub struct Preset {
    pub engine: RotationEngine,
    pub forecast: Box<dyn ModifierForecast>,
}

impl core::fmt::Debug for Preset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Preset")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Builds the preset for `archetype`, validated against `spellbook`.
pub fn preset(archetype: Archetype, spellbook: &Spellbook) -> Result<Preset, SetupError> {
    match archetype {
        Archetype::Feral => feral::preset(spellbook),
        Archetype::Caster => caster::preset(spellbook),
    }
}
