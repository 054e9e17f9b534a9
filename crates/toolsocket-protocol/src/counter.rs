//! Outbound message id generation.
//!
//! Ids are correlation tokens, not global identifiers. Each counter
//! starts at a random offset in `0..10_000` so that independent sessions
//! sharing the same loaded library are unlikely to collide without
//! coordinating with the server, and increments by one per message
//! created. No uniqueness guarantee is made across processes.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Explicit id source owned by a session.
///
/// Cheap to share behind an `Arc`. Tests can pin the sequence with
/// [`MessageIdCounter::starting_at`].
#[derive(Debug)]
pub struct MessageIdCounter {
    next: AtomicU64,
}

impl MessageIdCounter {
    /// Create a counter starting at a random offset in `0..10_000`.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(rand::rng().random_range(0..10_000))
    }

    /// Create a counter with a deterministic first id.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id. Strictly increasing by one per call.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MessageIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_by_one() {
        let counter = MessageIdCounter::starting_at(41);
        assert_eq!(counter.next_id(), 41);
        assert_eq!(counter.next_id(), 42);
        assert_eq!(counter.next_id(), 43);
    }

    #[test]
    fn random_start_is_within_range() {
        for _ in 0..32 {
            let counter = MessageIdCounter::new();
            assert!(counter.next_id() < 10_000);
        }
    }

    #[test]
    fn counters_are_independent() {
        let a = MessageIdCounter::starting_at(0);
        let b = MessageIdCounter::starting_at(100);
        assert_eq!(a.next_id(), 0);
        assert_eq!(b.next_id(), 100);
        assert_eq!(a.next_id(), 1);
    }
}
