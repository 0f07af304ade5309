//! The outer driver loop.
//!
//! The driver owns the only clock that matters: it evaluates the rotation,
//! and on `Wait` jumps straight to the earliest of the wake-up time, the
//! agent's next scheduled event and the next scripted target removal. After
//! an action it evaluates again at the same instant, so off-lock abilities
//! chain without time passing.

use std::sync::Arc;

use sim_content::{Archetype, ArchetypeContent};
use sim_core::{
    Agent, Caster, CombatOracle, ModifierForecast, RotationEngine, SimConfig, SimError, SimTime,
    Spellbook, UnitId,
};

use crate::combat::TableCombat;
use crate::error::{Result, RuntimeError};
use crate::presets;
use crate::summary::RunSummary;

/// One agent driven by one rotation until the configured duration.
#[derive(Debug)]
pub struct Simulation {
    agent: Agent,
    engine: RotationEngine,
    config: SimConfig,
    /// Scripted removals, ordered by time.
    removals: Vec<(SimTime, UnitId)>,
    evaluations: u64,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Wires an archetype's content to its preset and a seeded table oracle.
    pub fn from_content(archetype: Archetype, content: ArchetypeContent) -> Result<Self> {
        let spellbook = Arc::new(content.spellbook);
        let preset = presets::preset(archetype, &spellbook)?;
        let combat = TableCombat::new(content.combat, content.damage, content.config.seed);

        Self::builder()
            .config(content.config)
            .spellbook(spellbook)
            .engine(preset.engine)
            .forecast(preset.forecast)
            .combat(combat)
            .build()
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.agent.now()
    }

    /// Runs to the configured duration and reports.
    pub fn run(&mut self) -> Result<RunSummary> {
        let end = SimTime::ZERO + self.config.duration();
        tracing::info!(
            duration = %end,
            seed = self.config.seed,
            rules = self.engine.table().len(),
            "simulation started"
        );

        if let Err(err) = self.run_until(end) {
            tracing::error!(
                code = err.error_code(),
                severity = err.severity().as_str(),
                at = %self.agent.now(),
                "simulation aborted: {err}"
            );
            return Err(err);
        }

        let summary = self.summary();
        tracing::info!(
            damage = summary.damage,
            dps = summary.dps(),
            casts = summary.total_casts(),
            evaluations = summary.evaluations,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Drives the rotation until `end`, then settles every event due by then.
    pub fn run_until(&mut self, end: SimTime) -> Result<()> {
        let limit = self.config.max_evaluations_per_instant;
        let mut now = self.agent.now();
        let mut at_instant: u32 = 0;

        while now < end {
            self.apply_removals(now)?;
            if at_instant >= limit {
                return Err(RuntimeError::Stalled {
                    at: now,
                    evaluations: at_instant,
                });
            }
            at_instant += 1;
            self.evaluations += 1;

            let (must_wait, until) = self.engine.evaluate(&mut self.agent, now)?.wake();
            if !must_wait {
                continue;
            }

            let next = [
                Some(until),
                self.agent.next_event_after(now),
                self.removals.first().map(|(at, _)| *at),
            ]
            .into_iter()
            .flatten()
            .filter(|at| *at > now)
            .min()
            .map_or(end, |at| at.min(end));
            tracing::trace!(%now, %next, "advance");
            now = next;
            at_instant = 0;
        }

        self.apply_removals(end)?;
        self.agent.advance_to(end)?;
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let elapsed = self.agent.now().saturating_since(SimTime::ZERO);
        RunSummary::from_agent(&self.agent, elapsed, self.evaluations)
    }

    fn apply_removals(&mut self, now: SimTime) -> Result<()> {
        let due = self.removals.partition_point(|(at, _)| *at <= now);
        if due == 0 {
            return Ok(());
        }
        self.agent.advance_to(now)?;
        for (_, target) in self.removals.drain(..due) {
            self.agent.remove_target(target)?;
        }
        Ok(())
    }
}

/// Builder for [`Simulation`].
#[derive(Default)]
pub struct SimulationBuilder {
    config: SimConfig,
    spellbook: Option<Arc<Spellbook>>,
    engine: Option<RotationEngine>,
    forecast: Option<Box<dyn ModifierForecast>>,
    combat: Option<Box<dyn CombatOracle>>,
    targets: Vec<UnitId>,
    removals: Vec<(SimTime, UnitId)>,
}

impl SimulationBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn spellbook(mut self, spellbook: Arc<Spellbook>) -> Self {
        self.spellbook = Some(spellbook);
        self
    }

    pub fn engine(mut self, engine: RotationEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Modifier forecast for obligation pricing (default: current auras only).
    pub fn forecast(mut self, forecast: Box<dyn ModifierForecast>) -> Self {
        self.forecast = Some(forecast);
        self
    }

    pub fn combat(mut self, combat: impl CombatOracle + 'static) -> Self {
        self.combat = Some(Box::new(combat));
        self
    }

    /// Adds a target beside [`UnitId::PRIMARY_TARGET`].
    pub fn target(mut self, target: UnitId) -> Self {
        self.targets.push(target);
        self
    }

    /// Removes `target` at `at`, as if it died or left range.
    pub fn remove_target_at(mut self, at: SimTime, target: UnitId) -> Self {
        self.removals.push((at, target));
        self
    }

    pub fn build(self) -> Result<Simulation> {
        let spellbook = self
            .spellbook
            .ok_or(RuntimeError::MissingComponent("a spellbook"))?;
        let engine = self
            .engine
            .ok_or(RuntimeError::MissingComponent("a rotation engine"))?;
        let combat = self
            .combat
            .ok_or(RuntimeError::MissingComponent("a combat oracle"))?;

        let mut agent = Agent::new(&self.config, spellbook, combat)?;
        if let Some(forecast) = self.forecast {
            agent = agent.with_forecast(forecast);
        }
        for target in self.targets {
            agent.add_target(target);
        }

        let mut removals = self.removals;
        removals.sort_by_key(|(at, _)| *at);

        Ok(Simulation {
            agent,
            engine,
            config: self.config,
            removals,
            evaluations: 0,
        })
    }
}
