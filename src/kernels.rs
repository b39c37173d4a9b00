//! Data-parallel dispatch.
//!
//! Bulk operations fan work out across a pool of scoped worker threads, each
//! walking the input in a grid-stride loop. The worker count scales with the
//! amount of cooperative work in the launch, capped by the host parallelism.

use std::num::NonZeroUsize;

use tracing::trace;

/// Logical block size used to scale worker counts with launch size.
const BLOCK_SIZE: usize = 128;

/// Number of workers for a bulk launch of `num_keys` keys with `cg_size`
/// cooperating lanes per key.
pub(crate) fn worker_count(num_keys: usize, cg_size: usize) -> usize {
    let lanes = num_keys.saturating_mul(cg_size);
    let wanted = lanes.div_ceil(BLOCK_SIZE).max(1);
    let host = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    wanted.min(host)
}

/// Runs `body(i)` for every `i < count`, fanned out over `workers` threads.
///
/// Each worker handles the indices congruent to its id modulo `workers`.
/// Returns once every index has been processed.
pub(crate) fn parallel_for<F>(workers: usize, count: usize, body: F)
where
    F: Fn(usize) + Sync,
{
    if count == 0 {
        return;
    }
    trace!(workers, count, "dispatching bulk operation");
    if workers <= 1 {
        for i in 0..count {
            body(i);
        }
        return;
    }
    std::thread::scope(|scope| {
        for worker in 0..workers {
            let body = &body;
            scope.spawn(move || {
                let mut i = worker;
                while i < count {
                    body(i);
                    i += workers;
                }
            });
        }
    });
}

/// Raw output pointer that can be captured by stream tasks and workers.
///
/// Bulk operations write results through this pointer from multiple threads,
/// each to a distinct index.
#[derive(Clone, Copy)]
pub(crate) struct SendPtr<T>(pub(crate) *mut T);

// SAFETY: callers guarantee the pointee outlives every task holding the
// pointer and that concurrent writers target disjoint indices.
unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    /// Writes `value` at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be in bounds of the allocation and no other thread may
    /// access the same index concurrently.
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        self.0.add(index).write(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn worker_count_scales_with_launch() {
        assert_eq!(worker_count(0, 1), 1);
        assert_eq!(worker_count(1, 1), 1);
        assert_eq!(worker_count(128, 1), 1);
        assert!(worker_count(10_000, 2) >= worker_count(129, 1));
    }

    #[test]
    fn parallel_for_visits_every_index() {
        let hits = AtomicUsize::new(0);
        parallel_for(4, 1000, |_| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(hits.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn parallel_for_partitions_disjointly() {
        let seen: Vec<AtomicUsize> = (0..257).map(|_| AtomicUsize::new(0)).collect();
        parallel_for(3, seen.len(), |i| {
            seen[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(seen.iter().all(|s| s.load(Ordering::Relaxed) == 1));
    }
}
