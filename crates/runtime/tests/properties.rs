use proptest::prelude::*;

use runtime::{RunSummary, Simulation};
use sim_content::{Archetype, ArchetypeLoader};
use sim_core::{Caster, SimTime};

fn run(archetype: Archetype, duration_ms: u64, seed: u64) -> (Simulation, RunSummary) {
    let mut content = ArchetypeLoader::embedded(archetype).unwrap();
    content.config.duration_ms = duration_ms;
    content.config.seed = seed;
    let mut sim = Simulation::from_content(archetype, content).unwrap();
    let summary = sim.run().unwrap();
    (sim, summary)
}

fn archetype() -> impl Strategy<Value = Archetype> {
    prop_oneof![Just(Archetype::Feral), Just(Archetype::Caster)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_seed_runs_to_the_end_within_bounds(
        archetype in archetype(),
        seed in any::<u64>(),
        duration_ms in 5_000u64..30_000,
    ) {
        let (sim, summary) = run(archetype, duration_ms, seed);

        prop_assert_eq!(sim.now(), SimTime::from_millis(duration_ms));
        prop_assert_eq!(summary.duration_ms, duration_ms);
        prop_assert!(summary.final_resource >= 0.0);
        prop_assert!(summary.final_resource <= sim.config().resource_max);
        prop_assert!(summary.final_points <= sim.agent().points().max());
        prop_assert!(summary.damage >= 0.0);
        prop_assert!(summary.total_casts() > 0);
    }

    #[test]
    fn runs_replay_from_their_seed(archetype in archetype(), seed in any::<u64>()) {
        let (_, first) = run(archetype, 15_000, seed);
        let (_, second) = run(archetype, 15_000, seed);
        prop_assert_eq!(first, second);
    }
}
