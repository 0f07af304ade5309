//! Shared modifier toggles with per-source ownership.
//!
//! Several independent auras may grant the same modifier. Each grant is
//! recorded under its source, and the modifier stays active while any source
//! holds it, so one aura expiring never clobbers another's bonus.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::InvariantViolation;
use crate::ids::{AuraId, ModifierId, UnitId};
use crate::spellbook::{ModifierKind, Spellbook};

/// The aura instance that granted a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifierSource {
    /// Unit holding the aura.
    pub holder: UnitId,
    pub aura: AuraId,
    /// Unit that applied the aura.
    pub applier: UnitId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifierSet {
    sources: BTreeMap<ModifierId, BTreeSet<ModifierSource>>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `source` as holding `modifier`. Acquiring twice is a no-op.
    ///
    /// Returns true if the modifier became active.
    pub fn acquire(&mut self, modifier: ModifierId, source: ModifierSource) -> bool {
        let holders = self.sources.entry(modifier).or_default();
        let was_empty = holders.is_empty();
        holders.insert(source);
        was_empty
    }

    /// Drops `source`'s hold on `modifier`.
    ///
    /// Returns true if the modifier became inactive.
    pub fn release(
        &mut self,
        modifier: ModifierId,
        source: ModifierSource,
    ) -> Result<bool, InvariantViolation> {
        let Some(holders) = self.sources.get_mut(&modifier) else {
            return Err(InvariantViolation::ModifierNotHeld { modifier });
        };
        if !holders.remove(&source) {
            return Err(InvariantViolation::ModifierNotHeld { modifier });
        }
        if holders.is_empty() {
            self.sources.remove(&modifier);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_active(&self, modifier: ModifierId) -> bool {
        self.sources.contains_key(&modifier)
    }

    /// Number of sources currently holding `modifier`.
    pub fn holders(&self, modifier: ModifierId) -> usize {
        self.sources.get(&modifier).map_or(0, BTreeSet::len)
    }

    pub fn sources(&self, modifier: ModifierId) -> impl Iterator<Item = &ModifierSource> {
        self.sources.get(&modifier).into_iter().flatten()
    }

    /// Product of every active modifier of `kind`. Each modifier counts once
    /// regardless of how many sources hold it.
    pub fn product(&self, spellbook: &Spellbook, kind: ModifierKind) -> f64 {
        self.sources
            .keys()
            .filter_map(|id| spellbook.modifier(*id))
            .filter(|def| def.kind == kind)
            .map(|def| def.value)
            .product()
    }
}
