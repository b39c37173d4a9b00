//! Probing schemes.
//!
//! A probing scheme turns a key into a sequence of cluster-aligned slot
//! indices. Each probe step visits one cluster of `cg_size * bucket_size`
//! contiguous slots, so iterators always start on a cluster boundary and
//! advance by whole clusters.

use core::marker::PhantomData;

use crate::hash::{Hash, HashOutput};

/// Iterator over the probe sequence of a single key.
///
/// Indices wrap modulo the table capacity. The starting index doubles as the
/// wrap detector: once `next` returns to it, the whole table has been
/// visited.
#[derive(Debug, Clone, Copy)]
pub struct ProbingIterator {
    curr_index: usize,
    step_size: usize,
    upper_bound: usize,
}

impl ProbingIterator {
    pub const fn new(start_index: usize, step_size: usize, upper_bound: usize) -> Self {
        Self {
            curr_index: start_index,
            step_size,
            upper_bound,
        }
    }

    /// Current slot index (always cluster-aligned).
    pub fn current(&self) -> usize {
        self.curr_index
    }

    /// Advances to the next cluster and returns its base index.
    pub fn next(&mut self) -> usize {
        self.curr_index = (self.curr_index + self.step_size) % self.upper_bound;
        self.curr_index
    }
}

/// Maps keys to probe sequences over a table of a given geometry.
pub trait ProbingScheme<Key>: Copy + Send + Sync + 'static {
    /// Number of cooperating lanes per probe step.
    const CG_SIZE: usize;

    /// Builds the probe iterator for `key` over a table of `capacity` slots
    /// grouped into buckets of `bucket_size`.
    fn make_iterator(&self, key: &Key, bucket_size: usize, capacity: usize) -> ProbingIterator;
}

/// Linear probing: consecutive clusters starting at the hash position.
pub struct LinearProbing<Key, Hasher, const CG_SIZE: usize = 1> {
    hasher: Hasher,
    _marker: PhantomData<Key>,
}

impl<Key, Hasher, const CG_SIZE: usize> LinearProbing<Key, Hasher, CG_SIZE> {
    pub const fn new(hasher: Hasher) -> Self {
        Self {
            hasher,
            _marker: PhantomData,
        }
    }
}

impl<Key, Hasher: Copy, const CG_SIZE: usize> Clone for LinearProbing<Key, Hasher, CG_SIZE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key, Hasher: Copy, const CG_SIZE: usize> Copy for LinearProbing<Key, Hasher, CG_SIZE> {}

impl<Key, Hasher: Default, const CG_SIZE: usize> Default for LinearProbing<Key, Hasher, CG_SIZE> {
    fn default() -> Self {
        Self::new(Hasher::default())
    }
}

impl<Key, Hasher, const CG_SIZE: usize> ProbingScheme<Key> for LinearProbing<Key, Hasher, CG_SIZE>
where
    Key: Copy + Send + Sync + 'static,
    Hasher: Hash<Key>,
{
    const CG_SIZE: usize = CG_SIZE;

    fn make_iterator(&self, key: &Key, bucket_size: usize, capacity: usize) -> ProbingIterator {
        let stride = bucket_size * CG_SIZE;
        let num_clusters = capacity / stride;
        let start = (self.hasher.hash(key).to_usize() % num_clusters) * stride;
        ProbingIterator::new(start, stride, capacity)
    }
}

/// Double hashing: the first hash picks the starting cluster, the second the
/// cluster step.
///
/// The step is a non-zero cluster count below the (prime) total cluster
/// count, so it is coprime with it and the sequence permutes every cluster.
pub struct DoubleHashing<Key, Hasher1, Hasher2, const CG_SIZE: usize = 1> {
    hasher1: Hasher1,
    hasher2: Hasher2,
    _marker: PhantomData<Key>,
}

impl<Key, Hasher1, Hasher2, const CG_SIZE: usize> DoubleHashing<Key, Hasher1, Hasher2, CG_SIZE> {
    pub const fn new(hasher1: Hasher1, hasher2: Hasher2) -> Self {
        Self {
            hasher1,
            hasher2,
            _marker: PhantomData,
        }
    }
}

impl<Key, Hasher1: Copy, Hasher2: Copy, const CG_SIZE: usize> Clone
    for DoubleHashing<Key, Hasher1, Hasher2, CG_SIZE>
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key, Hasher1: Copy, Hasher2: Copy, const CG_SIZE: usize> Copy
    for DoubleHashing<Key, Hasher1, Hasher2, CG_SIZE>
{
}

impl<Key, Hasher1: Default, Hasher2: Default, const CG_SIZE: usize> Default
    for DoubleHashing<Key, Hasher1, Hasher2, CG_SIZE>
{
    fn default() -> Self {
        Self::new(Hasher1::default(), Hasher2::default())
    }
}

impl<Key, Hasher1, Hasher2, const CG_SIZE: usize> ProbingScheme<Key>
    for DoubleHashing<Key, Hasher1, Hasher2, CG_SIZE>
where
    Key: Copy + Send + Sync + 'static,
    Hasher1: Hash<Key>,
    Hasher2: Hash<Key>,
{
    const CG_SIZE: usize = CG_SIZE;

    fn make_iterator(&self, key: &Key, bucket_size: usize, capacity: usize) -> ProbingIterator {
        let stride = bucket_size * CG_SIZE;
        let num_clusters = capacity / stride;
        let start = (self.hasher1.hash(key).to_usize() % num_clusters) * stride;
        let step_clusters = if num_clusters > 1 {
            self.hasher2.hash(key).to_usize() % (num_clusters - 1) + 1
        } else {
            1
        };
        ProbingIterator::new(start, step_clusters * stride, capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{IdentityHash, XXHash32, XXHash64};

    #[test]
    fn iterator_wraps_modulo_capacity() {
        let mut iter = ProbingIterator::new(8, 2, 10);
        assert_eq!(iter.current(), 8);
        assert_eq!(iter.next(), 0);
        assert_eq!(iter.next(), 2);
    }

    #[test]
    fn linear_probing_is_deterministic() {
        let scheme = LinearProbing::<u64, XXHash64<u64>>::default();
        let a = scheme.make_iterator(&17, 2, 22);
        let b = scheme.make_iterator(&17, 2, 22);
        assert_eq!(a.current(), b.current());
    }

    #[test]
    fn linear_probing_visits_every_cluster() {
        let scheme = LinearProbing::<u64, IdentityHash<u64>>::default();
        let capacity = 14; // 7 clusters of 2 slots
        let mut iter = scheme.make_iterator(&3, 2, capacity);
        let start = iter.current();
        assert_eq!(start % 2, 0);
        let mut visited = vec![start];
        loop {
            let idx = iter.next();
            if idx == start {
                break;
            }
            visited.push(idx);
        }
        visited.sort_unstable();
        assert_eq!(visited, vec![0, 2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn double_hashing_permutes_prime_cluster_count() {
        let scheme = DoubleHashing::<u64, XXHash64<u64>, XXHash64<u64>>::new(
            XXHash64::new(0),
            XXHash64::new(86_243),
        );
        let capacity = 11; // prime cluster count with bucket_size 1
        for key in 0u64..50 {
            let mut iter = scheme.make_iterator(&key, 1, capacity);
            let start = iter.current();
            let mut visited = vec![start];
            loop {
                let idx = iter.next();
                if idx == start {
                    break;
                }
                visited.push(idx);
            }
            visited.sort_unstable();
            assert_eq!(visited, (0..capacity).collect::<Vec<_>>());
        }
    }

    #[test]
    fn cooperative_stride_covers_whole_cluster() {
        let scheme = LinearProbing::<u32, XXHash32<u32>, 2>::default();
        let iter = scheme.make_iterator(&5, 2, 412);
        // cg_size 2 with bucket_size 2 probes clusters of 4 slots
        assert_eq!(iter.current() % 4, 0);
    }
}
