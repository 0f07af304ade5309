//! Static simulation content and its loaders.
//!
//! - [`archetype`]: the built-in archetypes and the ids their data uses
//! - [`tables`]: attack tables and damage lookups for the combat oracle
//! - [`loaders`]: RON archetype files and TOML configuration
//!
//! Content feeds the runtime's oracles and the agent's spellbook; the
//! decision core never reads files itself.

pub mod archetype;
pub mod tables;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use archetype::Archetype;
pub use tables::{CombatTable, DamageEntry, DamageTable, TickEntry};

#[cfg(feature = "loaders")]
pub use loaders::{ArchetypeContent, ArchetypeFile, ArchetypeLoader, ConfigLoader, ContentFactory};
