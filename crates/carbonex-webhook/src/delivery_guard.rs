//! Recent-delivery guard.
//!
//! Remembers the provider event ids of deliveries that already settled so
//! a redelivery is acknowledged without taking the ledger lock. The guard
//! is a fast path only: the stored `Payment` record stays the
//! authoritative idempotency gate, so an evicted id still settles once.
//!
//! Memory is bounded by an insertion-ordered cache; the oldest id is
//! evicted when the cache is full.

use std::collections::{HashSet, VecDeque};

/// Bounded set of settled provider event ids.
#[derive(Debug)]
pub struct DeliveryGuard {
    seen: HashSet<String>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<String>,
    max_size: usize,
}

impl DeliveryGuard {
    /// Create a guard holding at most `max_size` ids (minimum one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            seen: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Remember `event_id`. Returns `false` if it was already known.
    pub fn mark_settled(&mut self, event_id: &str) -> bool {
        if self.seen.contains(event_id) {
            return false;
        }
        if self.seen.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(event_id.to_string());
        self.order.push_back(event_id.to_string());
        true
    }

    #[must_use]
    pub fn is_settled(&self, event_id: &str) -> bool {
        self.seen.contains(event_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mark_ok() {
        let mut guard = DeliveryGuard::new(100);
        assert!(guard.mark_settled("evt_1"));
        assert!(guard.is_settled("evt_1"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn repeat_mark_reported() {
        let mut guard = DeliveryGuard::new(100);
        assert!(guard.mark_settled("evt_1"));
        assert!(!guard.mark_settled("evt_1"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = DeliveryGuard::new(3);
        for id in ["evt_1", "evt_2", "evt_3", "evt_4"] {
            assert!(guard.mark_settled(id));
        }
        assert_eq!(guard.len(), 3);
        assert!(!guard.is_settled("evt_1"), "evt_1 should have been evicted");
        assert!(guard.is_settled("evt_2"));
        assert!(guard.is_settled("evt_4"));

        // An evicted id is accepted again.
        assert!(guard.mark_settled("evt_1"));
        assert!(!guard.is_settled("evt_2"));
    }

    #[test]
    fn zero_size_holds_one() {
        let mut guard = DeliveryGuard::new(0);
        assert!(guard.is_empty());
        guard.mark_settled("evt_1");
        guard.mark_settled("evt_2");
        assert_eq!(guard.len(), 1);
        assert!(guard.is_settled("evt_2"));
    }
}
