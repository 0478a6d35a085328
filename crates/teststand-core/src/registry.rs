//! Per-battery test sequence numbers.
//!
//! Maps an opaque battery key to a monotonically increasing counter.
//! Counters start at 1 on first allocation, are never reused or
//! decremented, and live only for the lifetime of the process (the
//! bridge explicitly does not persist across restarts).

use std::collections::BTreeMap;

use tokio::sync::Mutex;

/// Registry of per-battery test counters.
///
/// All allocations for a key run inside one mutex critical section, so
/// concurrent allocations for the same key can never observe the same
/// counter value (exactly-once increment under contention).
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    /// Battery key → last allocated test number.
    counters: Mutex<BTreeMap<String, u64>>,
}

impl SequenceRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            counters: Mutex::const_new(BTreeMap::new()),
        }
    }

    /// Allocate the next test number for `key`.
    ///
    /// Creates the key with counter 1 if absent, otherwise increments
    /// and returns the new value. Total over any non-empty key; the
    /// coordinator rejects empty keys before calling this.
    pub async fn allocate(&self, key: &str) -> u64 {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(key.to_owned()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Return the last allocated test number for `key`, if any.
    pub async fn count(&self, key: &str) -> Option<u64> {
        self.counters.lock().await.get(key).copied()
    }

    /// Number of distinct batteries that have been allocated at least
    /// one test number.
    pub async fn len(&self) -> usize {
        self.counters.lock().await.len()
    }

    /// Whether no battery has ever been allocated a test number.
    pub async fn is_empty(&self) -> bool {
        self.counters.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_allocation_is_one() {
        let registry = SequenceRegistry::new();
        assert_eq!(registry.allocate("B1").await, 1);
        assert_eq!(registry.count("B1").await, Some(1));
    }

    #[tokio::test]
    async fn sequential_allocations_count_up_without_gaps() {
        let registry = SequenceRegistry::new();
        for expected in 1..=5 {
            assert_eq!(registry.allocate("B1").await, expected);
        }
        assert_eq!(registry.count("B1").await, Some(5));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let registry = SequenceRegistry::new();
        assert_eq!(registry.allocate("B1").await, 1);
        assert_eq!(registry.allocate("B2").await, 1);
        assert_eq!(registry.allocate("B1").await, 2);
        assert_eq!(registry.count("B2").await, Some(1));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_key_has_no_count() {
        let registry = SequenceRegistry::new();
        assert_eq!(registry.count("missing").await, None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_same_key_allocations_are_unique() {
        use std::collections::BTreeSet;
        use std::sync::Arc;

        let registry = Arc::new(SequenceRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(
                async move { registry.allocate("B1").await },
            ));
        }

        let mut seen = BTreeSet::new();
        for handle in handles {
            let value = handle.await.unwrap_or(0);
            assert!(seen.insert(value), "duplicate test number {value}");
        }

        // Exactly 1..=32 with no gaps or repeats.
        assert_eq!(seen.len(), 32);
        assert_eq!(seen.first().copied(), Some(1));
        assert_eq!(seen.last().copied(), Some(32));
    }
}
