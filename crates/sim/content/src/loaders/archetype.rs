//! Archetype data loader.
//!
//! One RON file per archetype carries its default config, outcome tables and
//! spellbook. The built-in files are embedded; a data directory may shadow
//! them (see [`crate::loaders::ContentFactory`]).

use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::{SimConfig, Spellbook, SpellbookSpec};

use crate::archetype::Archetype;
use crate::loaders::{LoadResult, read_file};
use crate::tables::{CombatTable, DamageTable};

/// On-disk layout of an archetype file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeFile {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub combat: CombatTable,
    #[serde(default)]
    pub damage: DamageTable,
    pub spellbook: SpellbookSpec,
}

/// Validated archetype data.
#[derive(Debug, Clone)]
pub struct ArchetypeContent {
    pub config: SimConfig,
    pub combat: CombatTable,
    pub damage: DamageTable,
    pub spellbook: Spellbook,
}

/// Loader for archetype RON files.
pub struct ArchetypeLoader;

impl ArchetypeLoader {
    /// Parses the archetype data compiled into the crate.
    pub fn embedded(archetype: Archetype) -> LoadResult<ArchetypeContent> {
        let source = match archetype {
            Archetype::Feral => include_str!("../../data/archetypes/feral.ron"),
            Archetype::Caster => include_str!("../../data/archetypes/caster.ron"),
        };
        Self::parse(source, &format!("embedded {archetype}"))
    }

    /// Loads an archetype from a RON file.
    pub fn load(path: &Path) -> LoadResult<ArchetypeContent> {
        let content = read_file(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parses and validates archetype RON. `origin` names the source in errors.
    pub fn parse(source: &str, origin: &str) -> LoadResult<ArchetypeContent> {
        let file: ArchetypeFile = ron::from_str(source)
            .map_err(|e| anyhow::anyhow!("Failed to parse archetype RON at {}: {}", origin, e))?;

        let spellbook = Spellbook::from_spec(file.spellbook)
            .map_err(|e| anyhow::anyhow!("Invalid spellbook in {}: {}", origin, e))?;
        crate::loaders::ConfigLoader::check(&file.config)?;
        check_tables(&file.combat, &file.damage, &spellbook, origin)?;

        Ok(ArchetypeContent {
            config: file.config,
            combat: file.combat,
            damage: file.damage,
            spellbook,
        })
    }
}

fn check_tables(
    combat: &CombatTable,
    damage: &DamageTable,
    spellbook: &Spellbook,
    origin: &str,
) -> LoadResult<()> {
    let chances = [combat.miss_chance, combat.dodge_chance, combat.crit_chance];
    anyhow::ensure!(
        chances.iter().all(|c| (0.0..=1.0).contains(c)) && combat.coverage() <= 1.0,
        "Combat table in {} has chances outside 0..=1 (miss {}, dodge {}, crit {})",
        origin,
        combat.miss_chance,
        combat.dodge_chance,
        combat.crit_chance
    );
    for entry in &damage.direct {
        anyhow::ensure!(
            spellbook.ability(entry.ability).is_ok(),
            "Damage entry in {} names unknown {}",
            origin,
            entry.ability
        );
    }
    for entry in &damage.ticks {
        anyhow::ensure!(
            spellbook.periodic(entry.aura).is_some(),
            "Tick entry in {} names {} which has no periodic effect",
            origin,
            entry.aura
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::{caster, feral};
    use sim_core::{AbilityFlags, AuraHolder};
    use strum::IntoEnumIterator;

    #[test]
    fn every_builtin_archetype_loads() {
        for archetype in Archetype::iter() {
            let content = ArchetypeLoader::embedded(archetype)
                .unwrap_or_else(|e| panic!("{archetype}: {e:#}"));
            assert!(content.spellbook.abilities().count() > 0);
        }
    }

    #[test]
    fn feral_ids_resolve() {
        let content = ArchetypeLoader::embedded(Archetype::Feral).unwrap();
        let book = &content.spellbook;
        for ability in feral::ABILITIES {
            assert!(book.ability(ability).is_ok(), "{ability} missing");
        }

        let roar = book.ability(feral::SAVAGE_ROAR).unwrap();
        assert!(roar.is_finisher() && roar.is_helpful());
        assert_eq!(roar.applies[0].holder, AuraHolder::Caster);

        let charge = book.ability(feral::FERAL_CHARGE).unwrap();
        assert_eq!(charge.flags, AbilityFlags::empty());

        let ravage = book.ability(feral::RAVAGE).unwrap();
        assert_eq!(ravage.requires_aura, Some(feral::STAMPEDE));
        assert_eq!(ravage.consumes_aura, Some(feral::STAMPEDE));

        assert!(book.periodic(feral::RAKE_BLEED).is_some());
        assert_eq!(content.config.points_max, 5);
    }

    #[test]
    fn caster_ids_resolve() {
        let content = ArchetypeLoader::embedded(Archetype::Caster).unwrap();
        let book = &content.spellbook;
        for ability in caster::ABILITIES {
            assert!(book.ability(ability).is_ok(), "{ability} missing");
        }
        let bolt = book.ability(caster::SHADOW_BOLT).unwrap();
        assert!(bolt.travel_time_ms > 0);
        assert_eq!(bolt.applies[0].chance, 0.25);
        assert!(content.damage.tick(caster::CORRUPTION_DOT).is_some());
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let source = r#"(
            spellbook: (
                abilities: [(id: 1, label: "Bad", cost: 10.0, applies: [(aura: 9)])],
            ),
        )"#;
        let err = ArchetypeLoader::parse(source, "inline").unwrap_err();
        assert!(err.to_string().contains("Invalid spellbook in inline"));
    }

    #[test]
    fn damage_for_unknown_ability_is_rejected() {
        let source = r#"(
            damage: (direct: [(ability: 3, base: 10.0)]),
            spellbook: (abilities: [(id: 1, label: "Ok", cost: 10.0)]),
        )"#;
        assert!(ArchetypeLoader::parse(source, "inline").is_err());
    }

    #[test]
    fn overfull_combat_table_is_rejected() {
        let source = r#"(
            combat: (miss_chance: 0.6, crit_chance: 0.6),
            spellbook: (abilities: [(id: 1, label: "Ok", cost: 10.0)]),
        )"#;
        assert!(ArchetypeLoader::parse(source, "inline").is_err());
    }

    #[test]
    fn file_on_disk_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.ron");
        std::fs::write(
            &path,
            r#"(spellbook: (abilities: [(id: 1, label: "Jab", cost: 5.0)]))"#,
        )
        .unwrap();

        let content = ArchetypeLoader::load(&path).unwrap();
        assert_eq!(content.spellbook.abilities().count(), 1);
        assert_eq!(content.config, SimConfig::default());
    }
}
