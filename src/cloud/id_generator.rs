// ABOUTME: Per-image generator of unique instance identifiers.
// ABOUTME: Backed by an atomic counter so concurrent callers never collide.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::InstanceId;

/// Produces identifiers that are distinct for the lifetime of the generator.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> InstanceId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        InstanceId::new(seq.to_string())
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_one() {
        let generator = IdGenerator::new();
        assert_eq!(generator.next_id().as_str(), "1");
        assert_eq!(generator.next_id().as_str(), "2");
    }

    #[test]
    fn concurrent_callers_get_distinct_ids() {
        let generator = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..500).map(|_| generator.next_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id generated");
            }
        }
        assert_eq!(seen.len(), 8 * 500);
    }
}
