//! Simulation driver for the rotation core.
//!
//! `sim-core` decides what one agent does at one instant; this crate supplies
//! everything around that decision:
//! - [`simulation`] owns the loop that re-invokes the rotation at the
//!   instant it asks for
//! - [`combat`] rolls outcomes from an archetype's tables with a seeded RNG
//! - [`presets`] holds the built-in rule tables
//! - [`summary`] condenses a finished run
pub mod combat;
pub mod error;
pub mod presets;
pub mod simulation;
pub mod summary;

pub use combat::TableCombat;
pub use error::{Result, RuntimeError};
pub use presets::{Preset, preset};
pub use simulation::{Simulation, SimulationBuilder};
pub use summary::RunSummary;
