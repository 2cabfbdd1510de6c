//! Memoization table for color computations.
//!
//! A thin wrapper over [HashMap] that counts hits and misses. Entries are never evicted: every
//! key is a vertex of the finite grid or a color set produced from one, so the table is bounded
//! by the grid size.
//!
//! # Users
//!
//! - [`ColorEngine`](crate::coloring::ColorEngine): vertex colors, keyed by vertex index
//! - [`OdeTransitionSystem`](crate::transition::OdeTransitionSystem): successor and
//!   predecessor lists, keyed by state
//! - [`RectangleSolver`](crate::solver::RectangleSolver): `minimize` results, keyed by the raw
//!   cover
//!
//! A lossy table would not do here: the coloring engine relies on every stored entry staying
//! readable, and the solver statistics count a miss as real simplification work.

use std::collections::HashMap;
use std::hash::Hash;

/// A lossless memo table with hit and miss counters.
///
/// Lookups take `&mut self` so that the counters can be updated; owners keep the table behind
/// a `RefCell`.
pub struct Cache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> Cache<K, V> {
    /// Creates a cache with room for `2^bits` entries before it has to grow.
    ///
    /// # Panics
    ///
    /// Panics if `bits > 31`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self {
            map: HashMap::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of lookups that found an entry.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of lookups that found nothing.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq,
{
    /// Looks up `key`, counting the lookup as a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any earlier entry.
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache() {
        let mut cache = Cache::<(u64, u64), i32>::new(3);

        cache.insert((1, 2), 3);
        cache.insert((2, 3), 1);

        assert_eq!(cache.get(&(1, 2)), Some(&3));
        assert_eq!(cache.get(&(2, 3)), Some(&1));
        assert_eq!(cache.get(&(2, 1)), None);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_empty_cache() {
        let mut cache = Cache::<usize, usize>::default();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&0), None);
        assert_eq!((cache.hits(), cache.misses()), (0, 1));

        cache.insert(0, 1);
        cache.insert(0, 2);
        assert!(!cache.is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&0), Some(&2));
    }

    #[test]
    #[should_panic(expected = "Bits should be in the range 0..=31")]
    fn test_too_many_bits() {
        let _ = Cache::<usize, usize>::new(32);
    }

    #[test]
    fn test_cache_grows() {
        let mut cache = Cache::<usize, Vec<usize>>::new(2);

        for i in 0..1000 {
            cache.insert(i, vec![i; 2]);
        }
        for i in 0..1000 {
            assert_eq!(cache.get(&i), Some(&vec![i; 2]));
        }
        assert_eq!(cache.misses(), 0);
    }
}
