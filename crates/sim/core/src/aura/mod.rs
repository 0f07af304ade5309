//! Timed effects (auras) and the shared modifiers they toggle.
//!
//! Each unit owns an [`AuraRegistry`]. Gain and expire hooks are modelled as
//! acquire/release pairs against a [`ModifierSet`], keyed by the instance that
//! granted them rather than by stack count.

mod modifiers;
mod registry;

pub use modifiers::{ModifierSet, ModifierSource};
pub use registry::{AuraEvent, AuraEventKind, AuraInstance, AuraKey, AuraRegistry, ExpireCause};
