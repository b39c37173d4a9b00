//! Allocator capability for table memory.
//!
//! Slot storage and the per-call counters are allocated through this trait
//! rather than directly, so callers can route table memory through arenas,
//! pinned pools, or instrumented allocators.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{Error, Result};

/// Supplies and releases raw table memory.
///
/// Implementations must be cheap to clone; a clone is stored next to every
/// allocation so the memory can be released by the same allocator even if the
/// owning container has been dropped.
pub trait DeviceAllocator: Clone + Send + Sync + 'static {
    /// Allocates a block described by `layout`.
    ///
    /// Returns [`Error::AllocationFailed`] when the underlying allocator
    /// cannot satisfy the request.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Releases a block previously returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must come from a call to `allocate` on an equal allocator with
    /// the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Default allocator backed by the global Rust allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalDeviceAllocator;

impl DeviceAllocator for GlobalDeviceAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: layout has non-zero size; table extents are never empty.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(Error::AllocationFailed {
            bytes: layout.size(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees ptr/layout came from our allocate.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}
