//! Human-referenceable order numbers.
//!
//! Order numbers look like `ORD-0001760601600000-0000003`: the creation time
//! in milliseconds followed by a per-millisecond sequence. Both parts are
//! zero-padded, so lexicographic order equals creation order.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Bits reserved for the per-millisecond sequence.
const SEQUENCE_BITS: u32 = 20;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// A unique, sortable order reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a value previously produced by [`OrderNumberGenerator`].
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lock-free generator of strictly increasing order numbers.
///
/// The state packs `(millis << 20) | sequence` into one atomic. Each call
/// takes `max(previous + 1, now << 20)`, so numbers never repeat even when
/// many orders share a millisecond or the wall clock steps backwards.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    state: AtomicU64,
}

impl OrderNumberGenerator {
    /// Create a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
        }
    }

    /// Produce the next order number using the current wall clock.
    pub fn next(&self) -> OrderNumber {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_at(now)
    }

    /// Produce the next order number as if the clock read `now_millis`.
    pub fn next_at(&self, now_millis: u64) -> OrderNumber {
        let floor = now_millis << SEQUENCE_BITS;
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(prev.saturating_add(1).max(floor))
            })
            .unwrap_or_else(|prev| prev);
        let value = previous.saturating_add(1).max(floor);

        let millis = value >> SEQUENCE_BITS;
        let sequence = value & SEQUENCE_MASK;
        OrderNumber(format!("ORD-{millis:016}-{sequence:07}"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_same_millisecond_numbers_are_distinct_and_ordered() {
        let generator = OrderNumberGenerator::new();
        let a = generator.next_at(1_760_601_600_000);
        let b = generator.next_at(1_760_601_600_000);
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a.as_str(), "ORD-0001760601600000-0000000");
        assert_eq!(b.as_str(), "ORD-0001760601600000-0000001");
    }

    #[test]
    fn test_clock_going_backwards_stays_monotonic() {
        let generator = OrderNumberGenerator::new();
        let later = generator.next_at(2_000);
        let earlier_clock = generator.next_at(1_000);
        assert!(earlier_clock > later);
    }

    #[test]
    fn test_new_millisecond_resets_sequence() {
        let generator = OrderNumberGenerator::new();
        let _ = generator.next_at(5);
        let _ = generator.next_at(5);
        let next = generator.next_at(6);
        assert!(next.as_str().ends_with("-0000000"));
    }

    #[test]
    fn test_concurrent_generation_is_collision_free() {
        let generator = Arc::new(OrderNumberGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..500).map(|_| generator.next_at(42)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap_or_default() {
                assert!(seen.insert(number));
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
