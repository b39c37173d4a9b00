//! Memory-visibility scopes for table atomics.
//!
//! The scope is a type parameter chosen at container construction, never
//! switched at run time. It selects the orderings used for every slot load,
//! store, and compare-and-swap.

use core::sync::atomic::Ordering;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::System {}
    impl Sealed for super::Device {}
    impl Sealed for super::Thread {}
}

/// Maps a visibility scope to the atomic orderings used by slot accesses.
///
/// The set of scopes is closed; this trait is sealed.
pub trait ThreadScope: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    /// Ordering for slot and counter loads.
    const LOAD: Ordering;
    /// Ordering for slot stores (value publication).
    const STORE: Ordering;
    /// Success ordering for slot compare-and-swap.
    const CAS_SUCCESS: Ordering;
    /// Failure ordering for slot compare-and-swap.
    const CAS_FAILURE: Ordering;
}

/// System-wide scope: sequentially consistent, visible across the whole
/// process. The widest scope with the highest overhead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

/// Device-wide scope: acquire/release orderings. Recommended default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Device;

/// Thread scope: relaxed orderings, no cross-thread synchronization.
///
/// Only sound when no two workers touch the same slot concurrently, e.g.
/// single-threaded build phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Thread;

impl ThreadScope for System {
    const LOAD: Ordering = Ordering::SeqCst;
    const STORE: Ordering = Ordering::SeqCst;
    const CAS_SUCCESS: Ordering = Ordering::SeqCst;
    const CAS_FAILURE: Ordering = Ordering::SeqCst;
}

impl ThreadScope for Device {
    const LOAD: Ordering = Ordering::Acquire;
    const STORE: Ordering = Ordering::Release;
    const CAS_SUCCESS: Ordering = Ordering::AcqRel;
    const CAS_FAILURE: Ordering = Ordering::Acquire;
}

impl ThreadScope for Thread {
    const LOAD: Ordering = Ordering::Relaxed;
    const STORE: Ordering = Ordering::Relaxed;
    const CAS_SUCCESS: Ordering = Ordering::Relaxed;
    const CAS_FAILURE: Ordering = Ordering::Relaxed;
}
