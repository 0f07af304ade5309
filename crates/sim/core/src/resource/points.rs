use crate::error::InvariantViolation;

/// Bounded discrete counter (combo points).
///
/// Invariant: `0 <= current <= max`. Gains past the cap are wasted, which is
/// a game rule. Finishers consume every held point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointCounter {
    current: u32,
    max: u32,
}

impl PointCounter {
    pub fn new(max: u32) -> Self {
        Self { current: 0, max }
    }

    pub fn with_current(current: u32, max: u32) -> Result<Self, InvariantViolation> {
        if current > max {
            return Err(InvariantViolation::PointsOverMax { current, max });
        }
        Ok(Self { current, max })
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.current == self.max
    }

    /// Adds points up to the cap. Returns the number of points wasted.
    pub fn gain(&mut self, amount: u32) -> u32 {
        let room = self.max - self.current;
        let applied = amount.min(room);
        self.current += applied;
        amount - applied
    }

    /// Consumes every held point and returns how many there were.
    pub fn spend_all(&mut self) -> u32 {
        core::mem::take(&mut self.current)
    }
}
