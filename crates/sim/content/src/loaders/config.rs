//! Simulation configuration loader.

use std::path::Path;

use sim_core::SimConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`SimConfig`] from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a complete config. Missing fields take the crate defaults.
    pub fn load(path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        let config: SimConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        Self::check(&config)?;
        Ok(config)
    }

    /// Loads a TOML file as overrides on top of `base`; fields the file
    /// leaves out keep their value from `base`.
    pub fn load_over(base: &SimConfig, path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        let overrides: toml::Table = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        let mut merged = toml::Table::try_from(base)
            .map_err(|e| anyhow::anyhow!("Failed to encode base config: {}", e))?;
        for (key, value) in overrides {
            merged.insert(key, value);
        }
        let config: SimConfig = merged
            .try_into()
            .map_err(|e| anyhow::anyhow!("Invalid config override in {}: {}", path.display(), e))?;
        Self::check(&config)?;
        Ok(config)
    }

    /// Rejects values the core cannot run with.
    pub fn check(config: &SimConfig) -> LoadResult<()> {
        anyhow::ensure!(config.regen_tick_ms > 0, "regen_tick_ms must be positive");
        anyhow::ensure!(
            config.resource_max > 0.0 && config.resource_max.is_finite(),
            "resource_max must be positive, got {}",
            config.resource_max
        );
        anyhow::ensure!(
            (0.0..=config.resource_max).contains(&config.resource_start),
            "resource_start {} outside 0..={}",
            config.resource_start,
            config.resource_max
        );
        anyhow::ensure!(
            config.regen_per_tick >= 0.0,
            "regen_per_tick must not be negative"
        );
        anyhow::ensure!(
            config.max_evaluations_per_instant > 0,
            "max_evaluations_per_instant must be positive"
        );
        Ok(())
    }
}
