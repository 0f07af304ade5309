//! End-of-run report.

use std::collections::BTreeMap;
use std::fmt;

use core::time::Duration;
use serde::Serialize;

use sim_core::{Agent, Caster, CombatEvent};

/// Totals of one run, built from the agent's combat log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub duration_ms: u64,
    pub damage: f64,
    /// Casts per ability label.
    pub casts: BTreeMap<String, usize>,
    pub refunded: f64,
    /// Regeneration lost at the cap.
    pub wasted_resource: f64,
    pub wasted_points: u32,
    pub final_resource: f64,
    pub final_points: u32,
    pub evaluations: u64,
}

impl RunSummary {
    pub fn from_agent(agent: &Agent, duration: Duration, evaluations: u64) -> Self {
        let book = agent.spellbook();
        let mut casts = BTreeMap::new();
        let mut wasted_points = 0;
        for event in agent.log().events() {
            match event {
                CombatEvent::Cast { ability, .. } => {
                    let label = book
                        .ability(*ability)
                        .map_or_else(|_| ability.to_string(), |def| def.label.clone());
                    *casts.entry(label).or_insert(0) += 1;
                }
                CombatEvent::PointsWasted { amount, .. } => wasted_points += amount,
                _ => {}
            }
        }

        Self {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            damage: agent.log().damage_done(),
            casts,
            refunded: agent.log().refunded(),
            wasted_resource: agent.resource().wasted(),
            wasted_points,
            final_resource: agent.resource().current(),
            final_points: agent.points().current(),
            evaluations,
        }
    }

    /// Damage per second over the run.
    pub fn dps(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.damage * 1_000.0 / self.duration_ms as f64
    }

    pub fn casts_of(&self, label: &str) -> usize {
        self.casts.get(label).copied().unwrap_or(0)
    }

    pub fn total_casts(&self) -> usize {
        self.casts.values().sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:.1}s  damage {:.0}  dps {:.1}",
            self.duration_ms as f64 / 1_000.0,
            self.damage,
            self.dps()
        )?;
        for (label, count) in &self.casts {
            writeln!(f, "  {label:<16} {count:>5}")?;
        }
        write!(
            f,
            "  refunded {:.1}  wasted {:.1} resource / {} points  final {:.1} / {}",
            self.refunded,
            self.wasted_resource,
            self.wasted_points,
            self.final_resource,
            self.final_points
        )
    }
}
