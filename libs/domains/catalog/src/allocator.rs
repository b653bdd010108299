//! Product id allocation.
//!
//! Real books count upwards from 1, category placeholders count downwards
//! from 0. The extremum helpers give the starting point of each sequence;
//! allocation itself is an atomic increment-and-fetch so concurrent writers
//! never observe the same id.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::IdKind;

/// Next real id given every stored id: `max + 1`, or `1` for an empty catalog.
pub fn next_real_id<I>(ids: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    ids.into_iter().max().map_or(1, |max| max.max(0) + 1)
}

/// Next placeholder id given every stored id: `min - 1`, or `0` for an empty catalog.
pub fn next_placeholder_id<I>(ids: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    ids.into_iter().min().map_or(0, |min| min.min(1) - 1)
}

/// Last-allocated value for each sequence, as stored in a counter.
///
/// A fresh real counter sits at 0 so the first allocation yields 1; a fresh
/// placeholder counter sits at 1 so the first allocation yields 0.
pub fn counter_seed(kind: IdKind, max_id: Option<i64>, min_id: Option<i64>) -> i64 {
    match kind {
        IdKind::Real => max_id.unwrap_or(0).max(0),
        IdKind::Placeholder => min_id.unwrap_or(1).min(1),
    }
}

/// Pair of lock-free counters backing in-process allocation.
#[derive(Debug)]
pub struct IdSequence {
    real: AtomicI64,
    placeholder: AtomicI64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence {
    pub fn new() -> Self {
        Self {
            real: AtomicI64::new(counter_seed(IdKind::Real, None, None)),
            placeholder: AtomicI64::new(counter_seed(IdKind::Placeholder, None, None)),
        }
    }

    /// Increment-and-fetch for `kind`.
    pub fn allocate(&self, kind: IdKind) -> i64 {
        match kind {
            IdKind::Real => self.real.fetch_add(1, Ordering::SeqCst) + 1,
            IdKind::Placeholder => self.placeholder.fetch_sub(1, Ordering::SeqCst) - 1,
        }
    }

    /// Move the counter past `seed` without ever moving it backwards.
    pub fn seed(&self, kind: IdKind, seed: i64) {
        match kind {
            IdKind::Real => {
                self.real.fetch_max(seed, Ordering::SeqCst);
            }
            IdKind::Placeholder => {
                self.placeholder.fetch_min(seed, Ordering::SeqCst);
            }
        }
    }

    /// Last value handed out (or the seed if nothing was allocated yet).
    pub fn current(&self, kind: IdKind) -> i64 {
        match kind {
            IdKind::Real => self.real.load(Ordering::SeqCst),
            IdKind::Placeholder => self.placeholder.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_next_ids_on_empty_catalog() {
        assert_eq!(next_real_id(Vec::new()), 1);
        assert_eq!(next_placeholder_id(Vec::new()), 0);
    }

    #[test]
    fn test_next_ids_from_extremes() {
        let ids = vec![0, -1, 1, 2, 5];
        assert_eq!(next_real_id(ids.clone()), 6);
        assert_eq!(next_placeholder_id(ids), -2);
    }

    #[test]
    fn test_next_ids_with_only_one_kind_stored() {
        assert_eq!(next_real_id(vec![0, -1, -2]), 1);
        assert_eq!(next_placeholder_id(vec![3, 4]), 0);
    }

    #[test]
    fn test_counter_seed_matches_next_ids() {
        let ids = vec![-4, 0, 9];
        let max = ids.iter().copied().max();
        let min = ids.iter().copied().min();

        assert_eq!(counter_seed(IdKind::Real, max, min) + 1, next_real_id(ids.clone()));
        assert_eq!(counter_seed(IdKind::Placeholder, max, min) - 1, next_placeholder_id(ids));
    }

    #[test]
    fn test_sequence_starts_at_one_and_zero() {
        let seq = IdSequence::new();
        assert_eq!(seq.allocate(IdKind::Real), 1);
        assert_eq!(seq.allocate(IdKind::Real), 2);
        assert_eq!(seq.allocate(IdKind::Placeholder), 0);
        assert_eq!(seq.allocate(IdKind::Placeholder), -1);
    }

    #[test]
    fn test_seed_never_moves_backwards() {
        let seq = IdSequence::new();
        seq.seed(IdKind::Real, 10);
        seq.seed(IdKind::Real, 3);
        assert_eq!(seq.allocate(IdKind::Real), 11);

        seq.seed(IdKind::Placeholder, -5);
        seq.seed(IdKind::Placeholder, 0);
        assert_eq!(seq.allocate(IdKind::Placeholder), -6);
        assert_eq!(seq.current(IdKind::Placeholder), -6);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let seq = Arc::new(IdSequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || {
                    (0..100).map(|_| seq.allocate(IdKind::Real)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {} allocated twice", id);
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(seen.iter().copied().max(), Some(800));
    }
}
