//! Content factory resolving archetype data against a data directory.

use std::path::{Path, PathBuf};

use crate::archetype::Archetype;
use crate::loaders::{ArchetypeContent, ArchetypeLoader, ConfigLoader, LoadResult};

/// Loads archetype content, preferring files under a data directory over the
/// embedded defaults.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml        overrides applied on top of the archetype config
/// └── archetypes/
///     ├── feral.ron
///     └── caster.ron
/// ```
///
/// Every file is optional.
#[derive(Debug, Clone, Default)]
pub struct ContentFactory {
    data_dir: Option<PathBuf>,
}

impl ContentFactory {
    /// A factory that only uses the embedded data.
    pub fn embedded() -> Self {
        Self { data_dir: None }
    }

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Loads an archetype and applies `config.toml` overrides if present.
    pub fn load(&self, archetype: Archetype) -> LoadResult<ArchetypeContent> {
        let Some(dir) = &self.data_dir else {
            return ArchetypeLoader::embedded(archetype);
        };

        let path = dir.join("archetypes").join(format!("{archetype}.ron"));
        let mut content = if path.exists() {
            ArchetypeLoader::load(&path)?
        } else {
            ArchetypeLoader::embedded(archetype)?
        };

        let overrides = dir.join("config.toml");
        if overrides.exists() {
            content.config = ConfigLoader::load_over(&content.config, &overrides)?;
        }
        Ok(content)
    }
}
