use core::time::Duration;

/// Simulation configuration constants and tunable parameters.
///
/// Durations are stored in milliseconds so the struct round-trips through
/// TOML without a custom duration format.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Shared action lock applied after every instantaneous action.
    pub action_lock_ms: u64,
    /// Resource pool size.
    pub resource_max: f64,
    /// Resource at the start of the run.
    pub resource_start: f64,
    /// Resource granted per regeneration tick.
    pub regen_per_tick: f64,
    /// Interval between regeneration ticks, measured from time zero.
    pub regen_tick_ms: u64,
    /// Upper bound of the point counter.
    pub points_max: u32,
    /// Length of a simulation run.
    pub duration_ms: u64,
    /// Seed for outcome rolls.
    pub seed: u64,
    /// Evaluations allowed at a single instant before the driver reports a stall.
    pub max_evaluations_per_instant: u32,
}

impl SimConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_STACKS: u8 = 20;
    pub const MAX_OBLIGATIONS: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ACTION_LOCK_MS: u64 = 1_000;
    pub const DEFAULT_RESOURCE_MAX: f64 = 100.0;
    pub const DEFAULT_REGEN_PER_TICK: f64 = 10.0;
    pub const DEFAULT_REGEN_TICK_MS: u64 = 1_000;
    pub const DEFAULT_POINTS_MAX: u32 = 5;
    pub const DEFAULT_DURATION_MS: u64 = 180_000;
    pub const DEFAULT_MAX_EVALUATIONS: u32 = 64;

    pub fn new() -> Self {
        Self {
            action_lock_ms: Self::DEFAULT_ACTION_LOCK_MS,
            resource_max: Self::DEFAULT_RESOURCE_MAX,
            resource_start: Self::DEFAULT_RESOURCE_MAX,
            regen_per_tick: Self::DEFAULT_REGEN_PER_TICK,
            regen_tick_ms: Self::DEFAULT_REGEN_TICK_MS,
            points_max: Self::DEFAULT_POINTS_MAX,
            duration_ms: Self::DEFAULT_DURATION_MS,
            seed: 0,
            max_evaluations_per_instant: Self::DEFAULT_MAX_EVALUATIONS,
        }
    }

    pub fn action_lock(&self) -> Duration {
        Duration::from_millis(self.action_lock_ms)
    }

    pub fn regen_tick(&self) -> Duration {
        Duration::from_millis(self.regen_tick_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
