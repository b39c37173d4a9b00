//! Slot storage.
//!
//! Every slot is stored as one or two 64-bit atomic words: the key word,
//! followed by the value word for maps. Storing whole words keeps slot
//! updates lock-free on every platform with 64-bit atomics and sidesteps
//! mixed-size atomic access entirely.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::alloc::DeviceAllocator;
use crate::error::Result;
use crate::extent::Extent;
use crate::stream::Stream;

/// Key and value types storable in a 64-bit slot word.
///
/// Conversions must round-trip: `from_bits(to_bits(v)) == v` for every value
/// of the type.
pub trait SlotValue: Copy + Send + Sync + 'static {
    fn to_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_slot_value {
    ($($t:ty),*) => {
        $(
            impl SlotValue for $t {
                fn to_bits(self) -> u64 {
                    self as u64
                }

                fn from_bits(bits: u64) -> Self {
                    bits as $t
                }
            }
        )*
    };
}

impl_slot_value!(u8, u16, u32, u64, i8, i16, i32, i64, usize, isize);

/// Owned, allocator-backed array of atomic slot words.
///
/// Held behind an [`Arc`] so in-flight stream tasks keep the buffer alive
/// even if the owning container is dropped before synchronization.
pub(crate) struct SlotArray<A: DeviceAllocator> {
    ptr: NonNull<AtomicU64>,
    len: usize,
    alloc: A,
}

impl<A: DeviceAllocator> SlotArray<A> {
    pub(crate) fn new(len: usize, alloc: A) -> Result<Self> {
        debug_assert!(len > 0);
        let layout = match Layout::array::<AtomicU64>(len) {
            Ok(layout) => layout,
            Err(_) => {
                return Err(crate::error::Error::AllocationFailed {
                    bytes: len.saturating_mul(core::mem::size_of::<AtomicU64>()),
                })
            }
        };
        let raw = alloc.allocate(layout)?;
        let ptr = raw.cast::<AtomicU64>();
        // SAFETY: the allocation spans `len` words; zeroing them makes every
        // word a valid `AtomicU64` before the slice view below is formed.
        unsafe {
            core::ptr::write_bytes(ptr.as_ptr(), 0, len);
        }
        Ok(Self { ptr, len, alloc })
    }

    pub(crate) fn words(&self) -> &[AtomicU64] {
        // SAFETY: `ptr` points at `len` initialized words owned by `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<A: DeviceAllocator> Drop for SlotArray<A> {
    fn drop(&mut self) {
        if let Ok(layout) = Layout::array::<AtomicU64>(self.len) {
            // SAFETY: allocated with this allocator and layout in `new`.
            unsafe {
                self.alloc.deallocate(self.ptr.cast(), layout);
            }
        }
    }
}

// SAFETY: the buffer holds atomics and the allocator is Send + Sync.
unsafe impl<A: DeviceAllocator> Send for SlotArray<A> {}
unsafe impl<A: DeviceAllocator> Sync for SlotArray<A> {}

/// Bucketed slot storage for one container.
pub(crate) struct BucketStorage<A: DeviceAllocator, const BUCKET_SIZE: usize> {
    slots: Arc<SlotArray<A>>,
    extent: Extent,
    words_per_slot: usize,
}

impl<A: DeviceAllocator, const BUCKET_SIZE: usize> BucketStorage<A, BUCKET_SIZE> {
    pub(crate) fn new(extent: Extent, words_per_slot: usize, alloc: A) -> Result<Self> {
        let slots = SlotArray::new(extent.value() * words_per_slot, alloc)?;
        Ok(Self {
            slots: Arc::new(slots),
            extent,
            words_per_slot,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.extent.value()
    }

    pub(crate) fn num_buckets(&self) -> usize {
        self.extent.value() / BUCKET_SIZE
    }

    pub(crate) fn words_per_slot(&self) -> usize {
        self.words_per_slot
    }

    pub(crate) fn slots(&self) -> &Arc<SlotArray<A>> {
        &self.slots
    }

    pub(crate) fn view(&self) -> StorageView<'_> {
        StorageView {
            words: self.slots.words(),
            capacity: self.extent.value(),
            words_per_slot: self.words_per_slot,
        }
    }
}

/// Borrowed, copyable view over the slot words of a container.
#[derive(Clone, Copy)]
pub(crate) struct StorageView<'a> {
    words: &'a [AtomicU64],
    capacity: usize,
    words_per_slot: usize,
}

impl<'a> StorageView<'a> {
    pub(crate) fn from_words(
        words: &'a [AtomicU64],
        capacity: usize,
        words_per_slot: usize,
    ) -> Self {
        Self {
            words,
            capacity,
            words_per_slot,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn words_per_slot(&self) -> usize {
        self.words_per_slot
    }

    pub(crate) fn key_word(&self, slot: usize) -> &'a AtomicU64 {
        &self.words[slot * self.words_per_slot]
    }

    pub(crate) fn value_word(&self, slot: usize) -> &'a AtomicU64 {
        debug_assert_eq!(self.words_per_slot, 2);
        &self.words[slot * 2 + 1]
    }

    /// Overwrites every slot with the given sentinel words.
    ///
    /// Relaxed stores; callers order this against concurrent work through the
    /// stream the task runs on.
    pub(crate) fn fill(&self, key_bits: u64, value_bits: u64) {
        for slot in 0..self.capacity {
            self.key_word(slot).store(key_bits, Ordering::Relaxed);
            if self.words_per_slot == 2 {
                self.value_word(slot).store(value_bits, Ordering::Relaxed);
            }
        }
    }
}

/// A single atomic counter used by counting bulk operations.
pub(crate) struct CounterStorage<A: DeviceAllocator> {
    ptr: NonNull<AtomicU64>,
    alloc: A,
}

impl<A: DeviceAllocator> CounterStorage<A> {
    pub(crate) fn new(alloc: A) -> Result<Self> {
        let layout = Layout::new::<AtomicU64>();
        let raw = alloc.allocate(layout)?;
        let ptr = raw.cast::<AtomicU64>();
        unsafe {
            ptr.as_ptr().write(AtomicU64::new(0));
        }
        Ok(Self { ptr, alloc })
    }

    /// Enqueues a reset of the counter to zero.
    ///
    /// # Safety
    ///
    /// The counter must outlive the enqueued task: callers must synchronize
    /// `stream` before dropping `self`.
    pub(crate) unsafe fn reset(&self, stream: &Stream) -> Result<()> {
        let counter = self.as_ref();
        stream.enqueue(move || {
            counter.store(0);
        })
    }

    pub(crate) fn as_ref(&self) -> CounterRef {
        CounterRef(self.ptr.as_ptr())
    }

    /// Synchronizes the stream, then reads the counter.
    pub(crate) fn load_to_host(&self, stream: &Stream) -> Result<u64> {
        stream.synchronize()?;
        // SAFETY: `ptr` is valid and all writers finished at synchronize.
        Ok(unsafe { (*self.ptr.as_ptr()).load(Ordering::Acquire) })
    }
}

impl<A: DeviceAllocator> Drop for CounterStorage<A> {
    fn drop(&mut self) {
        // SAFETY: allocated with this allocator in `new`.
        unsafe {
            self.alloc
                .deallocate(self.ptr.cast(), Layout::new::<AtomicU64>());
        }
    }
}

/// Raw reference to a [`CounterStorage`] counter, copyable into stream tasks.
#[derive(Clone, Copy)]
pub(crate) struct CounterRef(*const AtomicU64);

// SAFETY: points at an AtomicU64 that counting flows keep alive until the
// stream carrying the tasks has been synchronized.
unsafe impl Send for CounterRef {}
unsafe impl Sync for CounterRef {}

impl CounterRef {
    pub(crate) fn add(&self, n: u64) {
        // SAFETY: see the Send impl; the pointee outlives every task.
        unsafe { (*self.0).fetch_add(n, Ordering::Relaxed) };
    }

    pub(crate) fn store(&self, n: u64) {
        // SAFETY: see the Send impl.
        unsafe { (*self.0).store(n, Ordering::Release) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::GlobalDeviceAllocator;

    #[test]
    fn slot_value_round_trips() {
        assert_eq!(i32::from_bits((-7i32).to_bits()), -7);
        assert_eq!(u64::from_bits(u64::MAX.to_bits()), u64::MAX);
        assert_eq!(i64::from_bits((-1i64).to_bits()), -1);
        assert_eq!(u8::from_bits(255u8.to_bits()), 255);
    }

    #[test]
    fn storage_geometry() -> Result<()> {
        let extent = crate::extent::valid_extent(100, 1, 2);
        let storage = BucketStorage::<_, 2>::new(extent, 2, GlobalDeviceAllocator)?;
        assert_eq!(storage.capacity() % 2, 0);
        assert_eq!(storage.num_buckets() * 2, storage.capacity());
        assert_eq!(storage.view().capacity(), storage.capacity());
        Ok(())
    }

    #[test]
    fn fill_writes_sentinels() -> Result<()> {
        let extent = crate::extent::valid_extent(4, 1, 1);
        let storage = BucketStorage::<_, 1>::new(extent, 2, GlobalDeviceAllocator)?;
        let view = storage.view();
        view.fill(u64::MAX, 7);
        for slot in 0..view.capacity() {
            assert_eq!(view.key_word(slot).load(Ordering::Relaxed), u64::MAX);
            assert_eq!(view.value_word(slot).load(Ordering::Relaxed), 7);
        }
        Ok(())
    }

    #[test]
    fn counter_reset_and_load() -> Result<()> {
        let stream = Stream::new();
        let counter = CounterStorage::new(GlobalDeviceAllocator)?;
        let counter_ref = counter.as_ref();
        unsafe { counter.reset(&stream)? };
        stream.enqueue(move || {
            counter_ref.add(3);
            counter_ref.add(4);
        })?;
        assert_eq!(counter.load_to_host(&stream)?, 7);
        Ok(())
    }
}
