//! Fixed-capacity concurrent map.

use core::marker::PhantomData;

use crate::alloc::{DeviceAllocator, GlobalDeviceAllocator};
use crate::error::{Error, Result};
use crate::hash::XXHash64;
use crate::kernels::SendPtr;
use crate::op::{self, Has, OperatorSet};
use crate::open_addressing::{DefaultKeyEqual, InsertResult, KeyEqual, OpenAddressingImpl, RefCore};
use crate::pair::Pair;
use crate::probing::{DoubleHashing, ProbingScheme};
use crate::scope::{self, ThreadScope};
use crate::storage::SlotValue;
use crate::stream::Stream;

/// A concurrent, fixed-capacity hash map built on bucketed open addressing.
///
/// Capacity is fixed at construction; the table never rehashes or grows. One
/// key value must be reserved as the empty sentinel and one value as the
/// empty-value sentinel; neither may be inserted. Bulk operations are
/// submitted to a [`Stream`] and fan out across worker threads, while
/// [`make_ref`](Self::make_ref) hands out copyable per-key refs for custom
/// concurrent workloads.
pub struct StaticMap<
    Key,
    Value,
    Scheme = DoubleHashing<Key, XXHash64<Key>, XXHash64<Key>>,
    const BUCKET_SIZE: usize = 1,
    KE = DefaultKeyEqual,
    SC = scope::Device,
    A = GlobalDeviceAllocator,
> where
    A: DeviceAllocator,
{
    impl_: OpenAddressingImpl<Key, Scheme, BUCKET_SIZE, KE, SC, A>,
    _marker: PhantomData<fn() -> Value>,
}

impl<Key, Value, Scheme, const BUCKET_SIZE: usize, KE, SC, A>
    StaticMap<Key, Value, Scheme, BUCKET_SIZE, KE, SC, A>
where
    Key: SlotValue,
    Value: SlotValue,
    Scheme: ProbingScheme<Key>,
    KE: KeyEqual<Key>,
    SC: ThreadScope,
    A: DeviceAllocator,
{
    /// Creates a map with at least `capacity` slots, all initialized to the
    /// empty sentinels on `stream`.
    ///
    /// The actual capacity is rounded up so the probe cluster count is prime;
    /// see [`capacity`](Self::capacity). Erasure stays disabled: the erased
    /// sentinel defaults to the empty sentinel.
    pub fn new(
        capacity: i64,
        empty_key: Key,
        empty_value: Value,
        key_equal: KE,
        scheme: Scheme,
        stream: &Stream,
    ) -> Result<Self>
    where
        A: Default,
    {
        Self::new_in(
            capacity,
            empty_key,
            empty_value,
            None,
            key_equal,
            scheme,
            A::default(),
            stream,
        )
    }

    /// Creates a map that also reserves an erased-key sentinel, enabling
    /// [`erase`](Self::erase).
    ///
    /// # Panics
    ///
    /// Panics if `erased_key` has the same bit pattern as `empty_key`.
    pub fn new_with_erased(
        capacity: i64,
        empty_key: Key,
        empty_value: Value,
        erased_key: Key,
        key_equal: KE,
        scheme: Scheme,
        stream: &Stream,
    ) -> Result<Self>
    where
        A: Default,
    {
        Self::new_in(
            capacity,
            empty_key,
            empty_value,
            Some(erased_key),
            key_equal,
            scheme,
            A::default(),
            stream,
        )
    }

    /// Creates a map sized to hold `desired_size` entries at the given load
    /// factor.
    ///
    /// # Panics
    ///
    /// Panics unless `0.0 < load_factor < 1.0`.
    pub fn with_load_factor(
        desired_size: usize,
        load_factor: f64,
        empty_key: Key,
        empty_value: Value,
        key_equal: KE,
        scheme: Scheme,
        stream: &Stream,
    ) -> Result<Self>
    where
        A: Default,
    {
        assert!(
            load_factor > 0.0 && load_factor < 1.0,
            "load factor must lie strictly between 0 and 1"
        );
        let capacity = (desired_size as f64 / load_factor).ceil() as i64;
        Self::new(capacity, empty_key, empty_value, key_equal, scheme, stream)
    }

    /// Creates a map whose storage comes from `allocator`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_in(
        capacity: i64,
        empty_key: Key,
        empty_value: Value,
        erased_key: Option<Key>,
        key_equal: KE,
        scheme: Scheme,
        allocator: A,
        stream: &Stream,
    ) -> Result<Self> {
        let empty_key_bits = empty_key.to_bits();
        let erased_key_bits = match erased_key {
            Some(erased) => {
                assert!(
                    erased.to_bits() != empty_key_bits,
                    "erased-key sentinel must differ from the empty-key sentinel"
                );
                erased.to_bits()
            }
            None => empty_key_bits,
        };
        let impl_ = OpenAddressingImpl::new(
            capacity,
            2,
            empty_key_bits,
            empty_value.to_bits(),
            erased_key_bits,
            key_equal,
            scheme,
            allocator,
            stream,
        )?;
        Ok(Self {
            impl_,
            _marker: PhantomData,
        })
    }

    /// Inserts key/value pairs and returns how many claimed a slot.
    ///
    /// Duplicates leave the mapped value untouched and do not count.
    /// Synchronizes `stream` before returning.
    pub fn insert(&mut self, entries: &[Pair<Key, Value>], stream: &Stream) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let entries: Vec<(Key, u64)> = entries.iter().map(|p| (p.first, p.second.to_bits())).collect();
        self.impl_
            .insert_with_count(stream, |counter| self.impl_.enqueue_insert(entries, counter, stream))
    }

    /// Asynchronous [`insert`](Self::insert) without the returned count.
    pub fn insert_async(&mut self, entries: &[Pair<Key, Value>], stream: &Stream) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let entries: Vec<(Key, u64)> = entries.iter().map(|p| (p.first, p.second.to_bits())).collect();
        self.impl_.enqueue_insert(entries, None, stream)
    }

    /// Inserts `entries[i]` only when `predicate(&stencil[i])` holds; returns
    /// how many participating entries claimed a slot.
    pub fn insert_if<T, P>(
        &mut self,
        entries: &[Pair<Key, Value>],
        stencil: &[T],
        predicate: P,
        stream: &Stream,
    ) -> Result<usize>
    where
        T: Copy + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        check_lengths(entries.len(), stencil.len())?;
        if entries.is_empty() {
            return Ok(0);
        }
        let entries: Vec<(Key, u64)> = entries.iter().map(|p| (p.first, p.second.to_bits())).collect();
        let stencil = stencil.to_vec();
        self.impl_.insert_with_count(stream, |counter| {
            self.impl_
                .enqueue_insert_if(entries, stencil, predicate, counter, stream)
        })
    }

    /// Asynchronous [`insert_if`](Self::insert_if) without the count.
    pub fn insert_if_async<T, P>(
        &mut self,
        entries: &[Pair<Key, Value>],
        stencil: &[T],
        predicate: P,
        stream: &Stream,
    ) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        check_lengths(entries.len(), stencil.len())?;
        if entries.is_empty() {
            return Ok(());
        }
        let entries: Vec<(Key, u64)> = entries.iter().map(|p| (p.first, p.second.to_bits())).collect();
        self.impl_
            .enqueue_insert_if(entries, stencil.to_vec(), predicate, None, stream)
    }

    /// Writes `out[i] = true` iff `keys[i]` is present. Synchronizes `stream`
    /// before returning.
    pub fn contains(&self, keys: &[Key], out: &mut [bool], stream: &Stream) -> Result<()> {
        check_lengths(keys.len(), out.len())?;
        if keys.is_empty() {
            return Ok(());
        }
        // SAFETY: `out` stays mutably borrowed until synchronize returns.
        unsafe { self.contains_async(keys, out.as_mut_ptr(), stream)? };
        stream.synchronize()
    }

    /// Asynchronous [`contains`](Self::contains) writing through a raw
    /// pointer.
    ///
    /// # Safety
    ///
    /// `out` must stay valid for `keys.len()` writes, with no other access,
    /// until `stream` has been synchronized.
    pub unsafe fn contains_async(&self, keys: &[Key], out: *mut bool, stream: &Stream) -> Result<()> {
        self.impl_
            .enqueue_contains(keys.to_vec(), SendPtr(out), stream)
    }

    /// [`contains`](Self::contains) restricted to entries whose stencil
    /// element satisfies `predicate`; skipped outputs are left untouched.
    pub fn contains_if<T, P>(
        &self,
        keys: &[Key],
        stencil: &[T],
        predicate: P,
        out: &mut [bool],
        stream: &Stream,
    ) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        check_lengths(keys.len(), stencil.len())?;
        check_lengths(keys.len(), out.len())?;
        if keys.is_empty() {
            return Ok(());
        }
        // SAFETY: `out` stays mutably borrowed until synchronize returns.
        unsafe { self.contains_if_async(keys, stencil, predicate, out.as_mut_ptr(), stream)? };
        stream.synchronize()
    }

    /// Asynchronous [`contains_if`](Self::contains_if).
    ///
    /// # Safety
    ///
    /// Same contract as [`contains_async`](Self::contains_async).
    pub unsafe fn contains_if_async<T, P>(
        &self,
        keys: &[Key],
        stencil: &[T],
        predicate: P,
        out: *mut bool,
        stream: &Stream,
    ) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        check_lengths(keys.len(), stencil.len())?;
        self.impl_.enqueue_contains_if(
            keys.to_vec(),
            stencil.to_vec(),
            predicate,
            SendPtr(out),
            stream,
        )
    }

    /// Writes the mapped value of `keys[i]` to `out[i]`, or the empty-value
    /// sentinel when absent. Synchronizes `stream` before returning.
    pub fn find(&self, keys: &[Key], out: &mut [Value], stream: &Stream) -> Result<()> {
        check_lengths(keys.len(), out.len())?;
        if keys.is_empty() {
            return Ok(());
        }
        // SAFETY: `out` stays mutably borrowed until synchronize returns.
        unsafe { self.find_async(keys, out.as_mut_ptr(), stream)? };
        stream.synchronize()
    }

    /// Asynchronous [`find`](Self::find) writing through a raw pointer.
    ///
    /// # Safety
    ///
    /// Same contract as [`contains_async`](Self::contains_async).
    pub unsafe fn find_async(&self, keys: &[Key], out: *mut Value, stream: &Stream) -> Result<()> {
        self.impl_.enqueue_find(keys.to_vec(), SendPtr(out), stream)
    }

    /// Erases the given keys. Synchronizes `stream` before returning.
    ///
    /// # Panics
    ///
    /// Panics unless the map was built with
    /// [`new_with_erased`](Self::new_with_erased).
    pub fn erase(&mut self, keys: &[Key], stream: &Stream) -> Result<()> {
        self.erase_async(keys, stream)?;
        stream.synchronize()
    }

    /// Asynchronous [`erase`](Self::erase).
    pub fn erase_async(&mut self, keys: &[Key], stream: &Stream) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.impl_.enqueue_erase(keys.to_vec(), stream)
    }

    /// Copies every entry into `out` and returns the number written.
    ///
    /// Fails with [`Error::OutputTooSmall`] when `out` cannot hold the
    /// current size. Concurrent mutation during retrieval gives unspecified
    /// (but memory-safe) contents.
    pub fn retrieve_all(&self, out: &mut [Pair<Key, Value>], stream: &Stream) -> Result<usize> {
        let size = self.size(stream)?;
        if out.len() < size {
            return Err(Error::OutputTooSmall {
                required: size,
                provided: out.len(),
            });
        }
        if size == 0 {
            return Ok(0);
        }
        let ptr = SendPtr(out.as_mut_ptr());
        self.impl_.enqueue_retrieve(
            size,
            move |index, key_bits, value_bits| {
                // SAFETY: indices are distinct and < size <= out.len(); the
                // output slice stays borrowed until synchronize returns.
                unsafe {
                    ptr.write(
                        index,
                        Pair::new(Key::from_bits(key_bits), Value::from_bits(value_bits)),
                    )
                };
            },
            stream,
        )?;
        stream.synchronize()?;
        Ok(size)
    }

    /// Resets every slot to the empty sentinels. Synchronizes `stream`.
    pub fn clear(&mut self, stream: &Stream) -> Result<()> {
        self.clear_async(stream)?;
        stream.synchronize()
    }

    /// Asynchronous [`clear`](Self::clear).
    pub fn clear_async(&mut self, stream: &Stream) -> Result<()> {
        self.impl_.enqueue_fill(stream)
    }

    /// Number of entries currently in the map. Synchronizes `stream`, then
    /// recounts occupied slots.
    pub fn size(&self, stream: &Stream) -> Result<usize> {
        self.impl_.count_occupied(stream)
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self, stream: &Stream) -> Result<bool> {
        Ok(self.size(stream)? == 0)
    }

    /// Actual slot count, rounded up from the requested capacity.
    pub fn capacity(&self) -> usize {
        self.impl_.capacity()
    }

    /// The reserved key marking empty slots.
    pub fn empty_key_sentinel(&self) -> Key {
        Key::from_bits(self.impl_.empty_key_bits())
    }

    /// The reserved value marking unwritten value words.
    pub fn empty_value_sentinel(&self) -> Value {
        Value::from_bits(self.impl_.empty_value_bits())
    }

    /// The reserved key marking erased slots, when erasure is enabled.
    pub fn erased_key_sentinel(&self) -> Option<Key> {
        let bits = self.impl_.erased_key_bits();
        if bits == self.impl_.empty_key_bits() {
            None
        } else {
            Some(Key::from_bits(bits))
        }
    }

    /// Creates a copyable per-key ref restricted to the given operator set.
    ///
    /// The ref borrows the map's storage; per-key calls on it are lock-free
    /// and may run from any thread.
    pub fn make_ref<O: OperatorSet>(
        &self,
        _operators: O,
    ) -> MapRef<'_, Key, Value, Scheme, BUCKET_SIZE, KE, SC, O> {
        MapRef {
            core: self.impl_.ref_core(),
            _marker: PhantomData,
        }
    }
}

fn check_lengths(inputs: usize, outputs: usize) -> Result<()> {
    if inputs != outputs {
        return Err(Error::LengthMismatch { inputs, outputs });
    }
    Ok(())
}

/// Copyable per-key view of a [`StaticMap`].
///
/// Only the methods matching the operator set used at
/// [`StaticMap::make_ref`] are available; requesting anything else fails to
/// compile.
pub struct MapRef<'a, Key, Value, Scheme, const BUCKET_SIZE: usize, KE, SC, O> {
    core: RefCore<'a, Key, Scheme, BUCKET_SIZE, KE, SC>,
    _marker: PhantomData<fn() -> (Value, O)>,
}

impl<'a, Key, Value, Scheme: Copy, const BUCKET_SIZE: usize, KE: Copy, SC, O> Clone
    for MapRef<'a, Key, Value, Scheme, BUCKET_SIZE, KE, SC, O>
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, Key, Value, Scheme: Copy, const BUCKET_SIZE: usize, KE: Copy, SC, O> Copy
    for MapRef<'a, Key, Value, Scheme, BUCKET_SIZE, KE, SC, O>
{
}

impl<'a, Key, Value, Scheme, const BUCKET_SIZE: usize, KE, SC, O>
    MapRef<'a, Key, Value, Scheme, BUCKET_SIZE, KE, SC, O>
where
    Key: SlotValue,
    Value: SlotValue,
    Scheme: ProbingScheme<Key>,
    KE: KeyEqual<Key>,
    SC: ThreadScope,
    O: OperatorSet,
{
    /// Slot count of the underlying map.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Inserts one key/value pair.
    pub fn insert(&self, key: Key, value: Value) -> InsertResult
    where
        O: Has<op::Insert>,
    {
        self.core.insert(key, value.to_bits())
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &Key) -> bool
    where
        O: Has<op::Contains>,
    {
        self.core.contains(key)
    }

    /// The value mapped to `key`, if present.
    pub fn find(&self, key: &Key) -> Option<Value>
    where
        O: Has<op::Find>,
    {
        self.core.find_value(key).map(Value::from_bits)
    }

    /// Erases `key`; returns whether it was present.
    pub fn erase(&self, key: &Key) -> bool
    where
        O: Has<op::Erase>,
    {
        self.core.erase(key)
    }
}
