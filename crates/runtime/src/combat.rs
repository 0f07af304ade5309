//! Table-driven combat oracle.
//!
//! Every roll draws a fresh seed from the run seed, a per-oracle roll
//! counter and the target id, so two runs with the same seed and the same
//! decisions see the same outcomes.

use sim_content::{CombatTable, DamageTable};
use sim_core::{
    CombatOracle, HitResult, PcgRng, PeriodicDefinition, RngOracle, Strike, StrikeRequest,
    compute_seed,
};

const HIT_CONTEXT: u32 = 0;
const VARIANCE_CONTEXT: u32 = 2;
const PROC_CONTEXT: u32 = 3;

/// Seeded oracle backed by an archetype's attack and damage tables.
#[derive(Clone, Debug)]
pub struct TableCombat {
    table: CombatTable,
    damage: DamageTable,
    seed: u64,
    nonce: u64,
    rng: PcgRng,
}

impl TableCombat {
    pub fn new(table: CombatTable, damage: DamageTable, seed: u64) -> Self {
        Self {
            table,
            damage,
            seed,
            nonce: 0,
            rng: PcgRng,
        }
    }

    /// Rolls made so far.
    pub fn rolls(&self) -> u64 {
        self.nonce
    }

    fn next_seed(&mut self, unit: u32, context: u32) -> u64 {
        let seed = compute_seed(self.seed, self.nonce, unit, context);
        self.nonce += 1;
        seed
    }
}

impl CombatOracle for TableCombat {
    fn strike(&mut self, request: &StrikeRequest<'_>) -> Strike {
        let target = request.target.0;
        let hit_seed = self.next_seed(target, HIT_CONTEXT);
        let roll = self.rng.unit(hit_seed);
        let result = self.table.classify(roll);
        if !result.landed() {
            return Strike { result, amount: 0.0 };
        }

        let Some(entry) = self.damage.direct(request.ability.id).copied() else {
            return Strike { result, amount: 0.0 };
        };
        let variance_seed = self.next_seed(target, VARIANCE_CONTEXT);
        let variance = self.rng.unit(variance_seed);
        let mut amount = entry.amount(request.points, variance) * request.damage_multiplier;
        if result == HitResult::Crit {
            amount *= self.table.crit_multiplier;
        }
        Strike { result, amount }
    }

    fn periodic_snapshot(
        &mut self,
        request: &StrikeRequest<'_>,
        periodic: &PeriodicDefinition,
    ) -> f64 {
        self.damage
            .tick(periodic.aura)
            .map_or(0.0, |tick| tick.amount(request.points))
            * request.damage_multiplier
    }

    fn proc(&mut self, chance: f64) -> bool {
        let seed = self.next_seed(0, PROC_CONTEXT);
        self.rng.chance(seed, chance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_content::{DamageEntry, TickEntry};
    use sim_core::{AbilityDefinition, AbilityId, AuraId, SimTime, UnitId};

    fn tables(crit_chance: f64) -> (CombatTable, DamageTable) {
        let table = CombatTable {
            miss_chance: 0.0,
            dodge_chance: 0.0,
            crit_chance,
            crit_multiplier: 2.0,
        };
        let damage = DamageTable {
            direct: vec![DamageEntry {
                ability: AbilityId(1),
                base: 100.0,
                variance: 0.0,
                per_point: 20.0,
            }],
            ticks: vec![TickEntry {
                aura: AuraId(1),
                amount: 30.0,
                per_point: 0.0,
            }],
        };
        (table, damage)
    }

    fn request(ability: &AbilityDefinition, points: u32, multiplier: f64) -> StrikeRequest<'_> {
        StrikeRequest {
            ability,
            target: UnitId::PRIMARY_TARGET,
            at: SimTime::ZERO,
            points,
            damage_multiplier: multiplier,
        }
    }

    #[test]
    fn hits_apply_points_and_multiplier() {
        let (table, damage) = tables(0.0);
        let mut combat = TableCombat::new(table, damage, 1);
        let bite = AbilityDefinition::new(AbilityId(1), "Bite", 35.0);

        let strike = combat.strike(&request(&bite, 5, 1.5));
        assert_eq!(strike.result, HitResult::Hit);
        assert_eq!(strike.amount, 300.0);
    }

    #[test]
    fn certain_crit_doubles() {
        let (table, damage) = tables(1.0);
        let mut combat = TableCombat::new(table, damage, 1);
        let bite = AbilityDefinition::new(AbilityId(1), "Bite", 35.0);

        let strike = combat.strike(&request(&bite, 0, 1.0));
        assert_eq!(strike.result, HitResult::Crit);
        assert_eq!(strike.amount, 200.0);
    }

    #[test]
    fn certain_miss_deals_nothing() {
        let (mut table, damage) = tables(0.0);
        table.miss_chance = 1.0;
        let mut combat = TableCombat::new(table, damage, 1);
        let bite = AbilityDefinition::new(AbilityId(1), "Bite", 35.0);

        assert_eq!(combat.strike(&request(&bite, 0, 1.0)), Strike::MISS);
    }

    #[test]
    fn same_seed_replays() {
        let (mut table, damage) = tables(0.3);
        table.miss_chance = 0.2;
        let bite = AbilityDefinition::new(AbilityId(1), "Bite", 35.0);
        let mut first = TableCombat::new(table, damage.clone(), 42);
        let mut second = TableCombat::new(table, damage, 42);

        for _ in 0..32 {
            let req = request(&bite, 0, 1.0);
            assert_eq!(first.strike(&req), second.strike(&req));
            assert_eq!(first.proc(0.5), second.proc(0.5));
        }
        assert_eq!(first.rolls(), second.rolls());
    }

    #[test]
    fn snapshot_uses_tick_table() {
        let (table, damage) = tables(0.0);
        let mut combat = TableCombat::new(table, damage, 1);
        let rake = AbilityDefinition::new(AbilityId(2), "Rake", 35.0);
        let periodic = PeriodicDefinition {
            aura: AuraId(1),
            tick_ms: 3_000,
            tick_count: 3,
            rolling: false,
        };
        assert_eq!(combat.periodic_snapshot(&request(&rake, 0, 1.3), &periodic), 39.0);

        let unknown = PeriodicDefinition {
            aura: AuraId(9),
            ..periodic
        };
        assert_eq!(combat.periodic_snapshot(&request(&rake, 0, 1.3), &unknown), 0.0);
    }
}
