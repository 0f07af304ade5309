//! Deferred resolution of outcomes with travel time.
//!
//! Outcomes are rolled at cast time and queued here until their resolve time.
//! Entries due at the same instant come out in submission order.

use core::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::time::SimTime;

#[derive(Clone, Debug)]
struct Scheduled<T> {
    resolve_at: SimTime,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.resolve_at == other.resolve_at && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Resolve time first, then submission order.
impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.resolve_at
            .cmp(&other.resolve_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending outcomes keyed by resolve time.
#[derive(Clone, Debug)]
pub struct DeferredQueue<T> {
    pending: BinaryHeap<Reverse<Scheduled<T>>>,
    next_seq: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            pending: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, resolve_at: SimTime, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(Scheduled {
            resolve_at,
            seq,
            payload,
        }));
    }

    /// Removes every entry whose payload matches `predicate`. Entries that
    /// already resolved are gone, so repeating a cancel removes nothing.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|Reverse(entry)| !predicate(&entry.payload));
        before - self.pending.len()
    }

    /// Resolve time of the earliest pending entry.
    pub fn next_due(&self) -> Option<SimTime> {
        self.pending.peek().map(|Reverse(entry)| entry.resolve_at)
    }

    /// Pops the earliest entry if it is due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<(SimTime, T)> {
        if self.next_due()? > now {
            return None;
        }
        self.pending
            .pop()
            .map(|Reverse(entry)| (entry.resolve_at, entry.payload))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_instant_resolves_in_submission_order() {
        let mut queue = DeferredQueue::new();
        let at = SimTime::from_millis(1_500);
        queue.submit(at, "first");
        queue.submit(SimTime::from_millis(1_000), "earlier");
        queue.submit(at, "second");
        queue.submit(at, "third");

        let mut order = Vec::new();
        while let Some((_, payload)) = queue.pop_due(at) {
            order.push(payload);
        }
        assert_eq!(order, ["earlier", "first", "second", "third"]);
    }

    #[test]
    fn nothing_resolves_early() {
        let mut queue = DeferredQueue::new();
        queue.submit(SimTime::from_secs(2), 7u32);
        assert!(queue.pop_due(SimTime::from_millis(1_999)).is_none());
        assert_eq!(queue.pop_due(SimTime::from_secs(2)), Some((SimTime::from_secs(2), 7)));
    }

    #[test]
    fn cancel_after_resolution_is_a_no_op() {
        let mut queue = DeferredQueue::new();
        queue.submit(SimTime::from_secs(1), 1u32);
        assert!(queue.pop_due(SimTime::from_secs(1)).is_some());
        assert_eq!(queue.cancel_where(|target| *target == 1), 0);

        queue.submit(SimTime::from_secs(3), 2);
        assert_eq!(queue.cancel_where(|target| *target == 2), 1);
        assert_eq!(queue.cancel_where(|target| *target == 2), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_where_drops_matching_payloads() {
        let mut queue = DeferredQueue::new();
        queue.submit(SimTime::from_secs(1), 1u32);
        queue.submit(SimTime::from_secs(1), 2);
        queue.submit(SimTime::from_secs(2), 1);

        assert_eq!(queue.cancel_where(|target| *target == 1), 2);
        assert_eq!(queue.next_due(), Some(SimTime::from_secs(1)));
        assert_eq!(queue.len(), 1);
    }
}
