//! Loaders that turn RON/TOML files into validated core types.

pub mod archetype;
pub mod config;
pub mod factory;

pub use archetype::{ArchetypeContent, ArchetypeFile, ArchetypeLoader};
pub use config::ConfigLoader;
pub use factory::ContentFactory;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
