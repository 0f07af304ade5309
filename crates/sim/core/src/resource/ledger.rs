//! Continuously regenerating primary resource.
//!
//! Regeneration is realized as discrete ticks at fixed boundaries measured
//! from time zero (`k * tick_period`), not from the last spend. A forecast of
//! "when will the balance reach X" therefore has to account for the part of
//! the current tick interval that has already elapsed.

use core::time::Duration;

use crate::error::{InsufficientResource, InvariantViolation};
use crate::time::{SimTime, duration_millis};

/// Tolerance for float comparisons against the balance.
const EPSILON: f64 = 1e-9;

/// Proof of a committed spend, used for refunds of deferred outcomes.
///
/// Refunds drawn against a receipt never add up to more than the spend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpendReceipt {
    pub amount: f64,
    refunded: f64,
}

impl SpendReceipt {
    pub const NONE: Self = Self {
        amount: 0.0,
        refunded: 0.0,
    };

    fn new(amount: f64) -> Self {
        Self {
            amount,
            refunded: 0.0,
        }
    }

    /// Amount already refunded against this spend.
    pub fn refunded(&self) -> f64 {
        self.refunded
    }

    /// Amount a refund of `fraction` may still credit back.
    pub fn refund_amount(&self, fraction: f64) -> f64 {
        (fraction.clamp(0.0, 1.0) * self.amount).min(self.amount - self.refunded)
    }
}

/// Primary resource with tick-based regeneration.
///
/// Invariant: `0 <= current <= max`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceLedger {
    current: f64,
    max: f64,
    regen_per_tick: f64,
    tick_ms: u64,
    /// Index of the last regeneration boundary already applied.
    applied_ticks: u64,
    last_spend: SpendReceipt,
    wasted: f64,
}

impl ResourceLedger {
    /// Creates a ledger anchored at time zero.
    pub fn new(
        current: f64,
        max: f64,
        regen_per_tick: f64,
        tick_period: Duration,
    ) -> Result<Self, InvariantViolation> {
        let tick_ms = duration_millis(tick_period);
        if tick_ms == 0 {
            return Err(InvariantViolation::ZeroRegenTick);
        }

        if !(0.0..=max).contains(&current) || regen_per_tick < 0.0 {
            return Err(InvariantViolation::ResourceOutOfRange { current, max });
        }

        Ok(Self {
            current,
            max,
            regen_per_tick,
            tick_ms,
            applied_ticks: 0,
            last_spend: SpendReceipt::NONE,
            wasted: 0.0,
        })
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn regen_per_tick(&self) -> f64 {
        self.regen_per_tick
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Amount of the most recent spend.
    pub fn last_spent(&self) -> f64 {
        self.last_spend.amount
    }

    /// Regeneration and credits lost to the cap so far.
    pub fn wasted(&self) -> f64 {
        self.wasted
    }

    /// Returns true if the balance covers `amount`.
    pub fn can_afford(&self, amount: f64) -> bool {
        self.current + EPSILON >= amount
    }

    /// Spends `amount` or fails without touching the balance.
    pub fn spend(&mut self, amount: f64) -> Result<SpendReceipt, InsufficientResource> {
        if !self.can_afford(amount) {
            return Err(InsufficientResource {
                requested: amount,
                available: self.current,
            });
        }
        self.current = (self.current - amount).max(0.0);
        self.last_spend = SpendReceipt::new(amount);
        Ok(self.last_spend)
    }

    /// Credits back `fraction` of the most recent spend.
    pub fn refund(&mut self, fraction: f64) -> f64 {
        let mut receipt = self.last_spend;
        let credited = self.refund_against(&mut receipt, fraction);
        self.last_spend = receipt;
        credited
    }

    /// Credits back `fraction` of the spend behind `receipt`.
    ///
    /// The refund is computed from the original amount, so partial refunds
    /// never compound rounding, and is bounded by what is left unrefunded.
    /// Returns the amount actually credited.
    pub fn refund_against(&mut self, receipt: &mut SpendReceipt, fraction: f64) -> f64 {
        let amount = receipt.refund_amount(fraction);
        receipt.refunded += amount;
        self.credit(amount)
    }

    /// Adds `amount` capped at max. Returns the amount actually credited.
    pub fn credit(&mut self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let room = self.max - self.current;
        if amount <= room {
            self.current += amount;
            amount
        } else {
            self.current = self.max;
            self.wasted += amount - room;
            room
        }
    }

    /// Applies every regeneration tick due up to and including `time`.
    pub fn advance_to(&mut self, time: SimTime) {
        let boundary = time.as_millis() / self.tick_ms;
        if boundary <= self.applied_ticks {
            return;
        }
        let due = boundary - self.applied_ticks;
        self.applied_ticks = boundary;
        self.credit(due as f64 * self.regen_per_tick);
    }

    /// Balance the ledger will hold at `time` with no further spends.
    pub fn projected_at(&self, time: SimTime) -> f64 {
        let boundary = time.as_millis() / self.tick_ms;
        let due = boundary.saturating_sub(self.applied_ticks);
        (self.current + due as f64 * self.regen_per_tick).min(self.max)
    }

    /// Time from `now` until the balance reaches `amount`.
    ///
    /// Pure projection. Returns `None` if `amount` can never be reached.
    pub fn estimate_time_to_reach(&self, amount: f64, now: SimTime) -> Option<Duration> {
        let balance = self.projected_at(now);
        if balance + EPSILON >= amount {
            return Some(Duration::ZERO);
        }
        if amount > self.max + EPSILON || self.regen_per_tick <= 0.0 {
            return None;
        }

        let ticks_needed = ((amount - balance) / self.regen_per_tick - EPSILON).ceil() as u64;
        let current_boundary = now.as_millis() / self.tick_ms;
        let target = (current_boundary + ticks_needed.max(1)) * self.tick_ms;
        Some(Duration::from_millis(target - now.as_millis()))
    }

    /// Time from `now` until the ledger caps out.
    pub fn time_to_cap(&self, now: SimTime) -> Option<Duration> {
        self.estimate_time_to_reach(self.max, now)
    }
}
