//! Open-addressing core shared by the set and map containers.
//!
//! The host side ([`OpenAddressingImpl`]) owns the storage and drives bulk
//! operations through streams and the worker pool. The device side
//! ([`RefCore`]) is a copyable view that performs one probe sequence per
//! call; every per-key operation of the public refs lowers onto it.

use core::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::alloc::DeviceAllocator;
use crate::error::Result;
use crate::extent::valid_extent;
use crate::kernels::{parallel_for, worker_count, SendPtr};
use crate::probing::ProbingScheme;
use crate::scope::ThreadScope;
use crate::storage::{BucketStorage, CounterStorage, SlotArray, SlotValue, StorageView};
use crate::stream::Stream;

/// Outcome of comparing a probe key against one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EqualResult {
    /// Slot holds a different key.
    Unequal,
    /// Slot holds the probe key.
    Equal,
    /// Slot is empty; the probe sequence ends here.
    Empty,
    /// Slot is empty or erased and may be claimed by an insert.
    Available,
}

/// Key-equality predicate used during probing.
pub trait KeyEqual<Key>: Copy + Send + Sync + 'static {
    fn equal(&self, probe_key: &Key, slot_key: &Key) -> bool;
}

/// Bitwise equality via `PartialEq`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultKeyEqual;

impl<Key: PartialEq + Copy + Send + Sync + 'static> KeyEqual<Key> for DefaultKeyEqual {
    fn equal(&self, probe_key: &Key, slot_key: &Key) -> bool {
        probe_key == slot_key
    }
}

/// Wraps the user predicate with sentinel handling.
///
/// Sentinels are compared on raw bits before the predicate ever sees a slot
/// key, so user predicates never observe empty or erased slots.
struct EqualWrapper<Key, E> {
    key_equal: E,
    empty_key_bits: u64,
    erased_key_bits: u64,
    _marker: PhantomData<fn() -> Key>,
}

impl<Key, E: Copy> Clone for EqualWrapper<Key, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key, E: Copy> Copy for EqualWrapper<Key, E> {}

impl<Key: SlotValue, E: KeyEqual<Key>> EqualWrapper<Key, E> {
    fn new(key_equal: E, empty_key_bits: u64, erased_key_bits: u64) -> Self {
        Self {
            key_equal,
            empty_key_bits,
            erased_key_bits,
            _marker: PhantomData,
        }
    }

    /// Slot comparison on the insert path: erased slots are claimable.
    fn equal_for_insert(&self, probe_key: &Key, slot_bits: u64) -> EqualResult {
        if slot_bits == self.empty_key_bits || slot_bits == self.erased_key_bits {
            EqualResult::Available
        } else if self.key_equal.equal(probe_key, &Key::from_bits(slot_bits)) {
            EqualResult::Equal
        } else {
            EqualResult::Unequal
        }
    }

    /// Slot comparison on the lookup path: erased slots are skipped, only a
    /// truly empty slot terminates the probe sequence.
    fn equal_for_find(&self, probe_key: &Key, slot_bits: u64) -> EqualResult {
        if slot_bits == self.empty_key_bits {
            EqualResult::Empty
        } else if slot_bits == self.erased_key_bits {
            EqualResult::Unequal
        } else if self.key_equal.equal(probe_key, &Key::from_bits(slot_bits)) {
            EqualResult::Equal
        } else {
            EqualResult::Unequal
        }
    }
}

/// Outcome of a per-key insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The key was written into a previously free slot.
    Inserted,
    /// The key was already present; the table is unchanged.
    Duplicate,
    /// The probe sequence visited every cluster without finding a free slot.
    Full,
}

impl InsertResult {
    /// Whether the insert claimed a slot.
    pub fn inserted(self) -> bool {
        matches!(self, InsertResult::Inserted)
    }
}

/// Copyable probing engine over borrowed storage.
pub(crate) struct RefCore<'a, Key, Scheme, const BUCKET_SIZE: usize, KE, SC> {
    view: StorageView<'a>,
    empty_value_bits: u64,
    predicate: EqualWrapper<Key, KE>,
    scheme: Scheme,
    _marker: PhantomData<fn() -> SC>,
}

impl<'a, Key, Scheme: Copy, const BUCKET_SIZE: usize, KE: Copy, SC> Clone
    for RefCore<'a, Key, Scheme, BUCKET_SIZE, KE, SC>
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, Key, Scheme: Copy, const BUCKET_SIZE: usize, KE: Copy, SC> Copy
    for RefCore<'a, Key, Scheme, BUCKET_SIZE, KE, SC>
{
}

impl<'a, Key, Scheme, const BUCKET_SIZE: usize, KE, SC>
    RefCore<'a, Key, Scheme, BUCKET_SIZE, KE, SC>
where
    Key: SlotValue,
    Scheme: ProbingScheme<Key>,
    KE: KeyEqual<Key>,
    SC: ThreadScope,
{
    /// Slots visited per probe step.
    const CLUSTER: usize = BUCKET_SIZE * Scheme::CG_SIZE;

    pub(crate) fn capacity(&self) -> usize {
        self.view.capacity()
    }

    /// Inserts `key` with the given value word.
    ///
    /// Lock-free CAS loop: on contention the same slot is re-examined, so a
    /// racing insert of the same key is reported as [`InsertResult::Duplicate`]
    /// by exactly one of the racers losing the CAS.
    pub(crate) fn insert(&self, key: Key, value_bits: u64) -> InsertResult {
        let mut iter = self
            .scheme
            .make_iterator(&key, BUCKET_SIZE, self.view.capacity());
        let start = iter.current();
        loop {
            let base = iter.current();
            for offset in 0..Self::CLUSTER {
                let word = self.view.key_word(base + offset);
                let mut slot_bits = word.load(SC::LOAD);
                loop {
                    match self.predicate.equal_for_insert(&key, slot_bits) {
                        EqualResult::Equal => return InsertResult::Duplicate,
                        EqualResult::Unequal | EqualResult::Empty => break,
                        EqualResult::Available => {
                            match word.compare_exchange(
                                slot_bits,
                                key.to_bits(),
                                SC::CAS_SUCCESS,
                                SC::CAS_FAILURE,
                            ) {
                                Ok(_) => {
                                    if self.view.words_per_slot() == 2 {
                                        self.view
                                            .value_word(base + offset)
                                            .store(value_bits, SC::STORE);
                                    }
                                    return InsertResult::Inserted;
                                }
                                // Lost the race; re-examine what won the slot.
                                Err(current) => slot_bits = current,
                            }
                        }
                    }
                }
            }
            if iter.next() == start {
                return InsertResult::Full;
            }
        }
    }

    /// Finds the slot holding `key`, if present.
    ///
    /// A match anywhere in a cluster wins over an empty slot in the same
    /// cluster; an empty slot only terminates the sequence after the whole
    /// cluster has been examined.
    fn find_slot(&self, key: &Key) -> Option<usize> {
        let mut iter = self
            .scheme
            .make_iterator(key, BUCKET_SIZE, self.view.capacity());
        let start = iter.current();
        loop {
            let base = iter.current();
            let mut saw_empty = false;
            for offset in 0..Self::CLUSTER {
                let slot_bits = self.view.key_word(base + offset).load(SC::LOAD);
                match self.predicate.equal_for_find(key, slot_bits) {
                    EqualResult::Equal => return Some(base + offset),
                    EqualResult::Empty => saw_empty = true,
                    EqualResult::Unequal | EqualResult::Available => {}
                }
            }
            if saw_empty || iter.next() == start {
                return None;
            }
        }
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.find_slot(key).is_some()
    }

    /// Returns the payload word for `key`: the value word for maps, the
    /// stored key word for sets.
    ///
    /// The value word holds the empty-value sentinel while a concurrent
    /// inserter has claimed the key word but not yet published the value, so
    /// the wait spins until the value appears or the slot is erased from
    /// under us.
    pub(crate) fn find_value(&self, key: &Key) -> Option<u64> {
        let slot = self.find_slot(key)?;
        if self.view.words_per_slot() == 2 {
            loop {
                let bits = self.view.value_word(slot).load(SC::LOAD);
                if bits != self.empty_value_bits {
                    return Some(bits);
                }
                let key_bits = self.view.key_word(slot).load(SC::LOAD);
                match self.predicate.equal_for_find(key, key_bits) {
                    EqualResult::Equal => core::hint::spin_loop(),
                    _ => return None,
                }
            }
        } else {
            let bits = self.view.key_word(slot).load(SC::LOAD);
            match self.predicate.equal_for_find(key, bits) {
                EqualResult::Equal => Some(bits),
                _ => None,
            }
        }
    }

    /// Erases `key`, writing the erased sentinel into its slot.
    ///
    /// The value word is reset to the empty sentinel before the key word is
    /// released, so an insert reusing the slot never exposes the previous
    /// occupant's value. Erasing a key while another thread inserts the same
    /// key gives an unspecified outcome for that key, matching the insert
    /// race rules.
    pub(crate) fn erase(&self, key: &Key) -> bool {
        let mut iter = self
            .scheme
            .make_iterator(key, BUCKET_SIZE, self.view.capacity());
        let start = iter.current();
        loop {
            let base = iter.current();
            let mut saw_empty = false;
            for offset in 0..Self::CLUSTER {
                let word = self.view.key_word(base + offset);
                let mut slot_bits = word.load(SC::LOAD);
                loop {
                    match self.predicate.equal_for_find(key, slot_bits) {
                        EqualResult::Equal => {
                            if self.view.words_per_slot() == 2 {
                                self.view
                                    .value_word(base + offset)
                                    .store(self.empty_value_bits, SC::STORE);
                            }
                            match word.compare_exchange(
                                slot_bits,
                                self.predicate.erased_key_bits,
                                SC::CAS_SUCCESS,
                                SC::CAS_FAILURE,
                            ) {
                                Ok(_) => return true,
                                // Another eraser or the slot changed; re-examine.
                                Err(current) => slot_bits = current,
                            }
                        }
                        EqualResult::Empty => {
                            saw_empty = true;
                            break;
                        }
                        EqualResult::Unequal | EqualResult::Available => break,
                    }
                }
            }
            if saw_empty || iter.next() == start {
                return false;
            }
        }
    }

    /// Visits every occupied slot as `(key_bits, payload_bits)`.
    pub(crate) fn for_each_occupied<F: FnMut(u64, u64)>(&self, mut f: F) {
        for slot in 0..self.view.capacity() {
            let key_bits = self.view.key_word(slot).load(SC::LOAD);
            if key_bits != self.predicate.empty_key_bits
                && key_bits != self.predicate.erased_key_bits
            {
                let payload = if self.view.words_per_slot() == 2 {
                    self.view.value_word(slot).load(SC::LOAD)
                } else {
                    key_bits
                };
                f(key_bits, payload);
            }
        }
    }

    /// Whether the slot at `index` is occupied.
    fn slot_occupied(&self, index: usize) -> bool {
        let key_bits = self.view.key_word(index).load(SC::LOAD);
        key_bits != self.predicate.empty_key_bits && key_bits != self.predicate.erased_key_bits
    }
}

/// Owned, `Send` handle over the storage, cloned into every stream task.
///
/// Holds the slot array through an [`Arc`], so enqueued work stays sound even
/// if the container is dropped before the stream drains.
pub(crate) struct RefParts<Key, Scheme, const BUCKET_SIZE: usize, KE, SC, A: DeviceAllocator> {
    slots: Arc<SlotArray<A>>,
    capacity: usize,
    words_per_slot: usize,
    empty_key_bits: u64,
    empty_value_bits: u64,
    erased_key_bits: u64,
    key_equal: KE,
    scheme: Scheme,
    _marker: PhantomData<fn() -> (Key, SC)>,
}

impl<Key, Scheme: Copy, const BUCKET_SIZE: usize, KE: Copy, SC, A: DeviceAllocator> Clone
    for RefParts<Key, Scheme, BUCKET_SIZE, KE, SC, A>
{
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            capacity: self.capacity,
            words_per_slot: self.words_per_slot,
            empty_key_bits: self.empty_key_bits,
            empty_value_bits: self.empty_value_bits,
            erased_key_bits: self.erased_key_bits,
            key_equal: self.key_equal,
            scheme: self.scheme,
            _marker: PhantomData,
        }
    }
}

impl<Key, Scheme, const BUCKET_SIZE: usize, KE, SC, A> RefParts<Key, Scheme, BUCKET_SIZE, KE, SC, A>
where
    Key: SlotValue,
    Scheme: ProbingScheme<Key>,
    KE: KeyEqual<Key>,
    SC: ThreadScope,
    A: DeviceAllocator,
{
    pub(crate) fn core(&self) -> RefCore<'_, Key, Scheme, BUCKET_SIZE, KE, SC> {
        RefCore {
            view: StorageView::from_words(self.slots.words(), self.capacity, self.words_per_slot),
            empty_value_bits: self.empty_value_bits,
            predicate: EqualWrapper::new(self.key_equal, self.empty_key_bits, self.erased_key_bits),
            scheme: self.scheme,
            _marker: PhantomData,
        }
    }
}

/// Host-side engine shared by [`StaticSet`](crate::StaticSet) and
/// [`StaticMap`](crate::StaticMap).
pub(crate) struct OpenAddressingImpl<Key, Scheme, const BUCKET_SIZE: usize, KE, SC, A>
where
    A: DeviceAllocator,
{
    storage: BucketStorage<A, BUCKET_SIZE>,
    alloc: A,
    empty_key_bits: u64,
    empty_value_bits: u64,
    erased_key_bits: u64,
    key_equal: KE,
    scheme: Scheme,
    _marker: PhantomData<fn() -> (Key, SC)>,
}

impl<Key, Scheme, const BUCKET_SIZE: usize, KE, SC, A>
    OpenAddressingImpl<Key, Scheme, BUCKET_SIZE, KE, SC, A>
where
    Key: SlotValue,
    Scheme: ProbingScheme<Key>,
    KE: KeyEqual<Key>,
    SC: ThreadScope,
    A: DeviceAllocator,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        requested_capacity: i64,
        words_per_slot: usize,
        empty_key_bits: u64,
        empty_value_bits: u64,
        erased_key_bits: u64,
        key_equal: KE,
        scheme: Scheme,
        alloc: A,
        stream: &Stream,
    ) -> Result<Self> {
        let extent = valid_extent(requested_capacity, Scheme::CG_SIZE, BUCKET_SIZE);
        let storage = BucketStorage::new(extent, words_per_slot, alloc.clone())?;
        debug!(
            requested = requested_capacity,
            capacity = storage.capacity(),
            buckets = storage.num_buckets(),
            cg_size = Scheme::CG_SIZE,
            bucket_size = BUCKET_SIZE,
            "creating open-addressing storage"
        );
        let this = Self {
            storage,
            alloc,
            empty_key_bits,
            empty_value_bits,
            erased_key_bits,
            key_equal,
            scheme,
            _marker: PhantomData,
        };
        this.enqueue_fill(stream)?;
        Ok(this)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub(crate) fn empty_key_bits(&self) -> u64 {
        self.empty_key_bits
    }

    pub(crate) fn empty_value_bits(&self) -> u64 {
        self.empty_value_bits
    }

    pub(crate) fn erased_key_bits(&self) -> u64 {
        self.erased_key_bits
    }

    /// Borrowing probing core for the public refs.
    pub(crate) fn ref_core(&self) -> RefCore<'_, Key, Scheme, BUCKET_SIZE, KE, SC> {
        RefCore {
            view: self.storage.view(),
            empty_value_bits: self.empty_value_bits,
            predicate: EqualWrapper::new(self.key_equal, self.empty_key_bits, self.erased_key_bits),
            scheme: self.scheme,
            _marker: PhantomData,
        }
    }

    fn parts(&self) -> RefParts<Key, Scheme, BUCKET_SIZE, KE, SC, A> {
        RefParts {
            slots: Arc::clone(self.storage.slots()),
            capacity: self.storage.capacity(),
            words_per_slot: self.storage.words_per_slot(),
            empty_key_bits: self.empty_key_bits,
            empty_value_bits: self.empty_value_bits,
            erased_key_bits: self.erased_key_bits,
            key_equal: self.key_equal,
            scheme: self.scheme,
            _marker: PhantomData,
        }
    }

    /// Enqueues a reset of every slot to the empty sentinels.
    pub(crate) fn enqueue_fill(&self, stream: &Stream) -> Result<()> {
        let parts = self.parts();
        let empty_key_bits = self.empty_key_bits;
        let empty_value_bits = self.empty_value_bits;
        stream.enqueue(move || {
            StorageView::from_words(parts.slots.words(), parts.capacity, parts.words_per_slot)
                .fill(empty_key_bits, empty_value_bits);
        })
    }

    /// Enqueues a bulk insert; `counter` (when given) receives the number of
    /// entries that claimed a slot. Duplicates and rejected entries do not
    /// count.
    pub(crate) fn enqueue_insert(
        &self,
        entries: Vec<(Key, u64)>,
        counter: Option<crate::storage::CounterRef>,
        stream: &Stream,
    ) -> Result<()> {
        let parts = self.parts();
        let workers = worker_count(entries.len(), Scheme::CG_SIZE);
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, entries.len(), |i| {
                let (key, value_bits) = entries[i];
                if core.insert(key, value_bits).inserted() {
                    if let Some(counter) = counter {
                        counter.add(1);
                    }
                }
            });
        })
    }

    /// Enqueues a conditional bulk insert: entry `i` participates only when
    /// `predicate(&stencil[i])` holds.
    pub(crate) fn enqueue_insert_if<T, P>(
        &self,
        entries: Vec<(Key, u64)>,
        stencil: Vec<T>,
        predicate: P,
        counter: Option<crate::storage::CounterRef>,
        stream: &Stream,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let parts = self.parts();
        let workers = worker_count(entries.len(), Scheme::CG_SIZE);
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, entries.len(), |i| {
                if !predicate(&stencil[i]) {
                    return;
                }
                let (key, value_bits) = entries[i];
                if core.insert(key, value_bits).inserted() {
                    if let Some(counter) = counter {
                        counter.add(1);
                    }
                }
            });
        })
    }

    /// Enqueues a bulk membership test writing one `bool` per key.
    pub(crate) fn enqueue_contains(
        &self,
        keys: Vec<Key>,
        out: SendPtr<bool>,
        stream: &Stream,
    ) -> Result<()> {
        let parts = self.parts();
        let workers = worker_count(keys.len(), Scheme::CG_SIZE);
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, keys.len(), |i| {
                let found = core.contains(&keys[i]);
                // SAFETY: distinct `i` per iteration; the caller keeps the
                // output alive until the stream synchronizes.
                unsafe { out.write(i, found) };
            });
        })
    }

    /// Conditional membership test; outputs of skipped entries are untouched.
    pub(crate) fn enqueue_contains_if<T, P>(
        &self,
        keys: Vec<Key>,
        stencil: Vec<T>,
        predicate: P,
        out: SendPtr<bool>,
        stream: &Stream,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let parts = self.parts();
        let workers = worker_count(keys.len(), Scheme::CG_SIZE);
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, keys.len(), |i| {
                if !predicate(&stencil[i]) {
                    return;
                }
                let found = core.contains(&keys[i]);
                // SAFETY: distinct `i`; output outlives the stream work.
                unsafe { out.write(i, found) };
            });
        })
    }

    /// Enqueues a bulk lookup. Maps write the found value word, sets the
    /// stored key word; misses write the matching empty sentinel.
    pub(crate) fn enqueue_find<Out: SlotValue>(
        &self,
        keys: Vec<Key>,
        out: SendPtr<Out>,
        stream: &Stream,
    ) -> Result<()> {
        let parts = self.parts();
        let workers = worker_count(keys.len(), Scheme::CG_SIZE);
        let miss_bits = if self.storage.words_per_slot() == 2 {
            self.empty_value_bits
        } else {
            self.empty_key_bits
        };
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, keys.len(), |i| {
                let bits = core.find_value(&keys[i]).unwrap_or(miss_bits);
                // SAFETY: distinct `i`; output outlives the stream work.
                unsafe { out.write(i, Out::from_bits(bits)) };
            });
        })
    }

    /// Enqueues a bulk erase.
    pub(crate) fn enqueue_erase(&self, keys: Vec<Key>, stream: &Stream) -> Result<()> {
        assert!(
            self.erased_key_bits != self.empty_key_bits,
            "erase requires an erased-key sentinel distinct from the empty-key sentinel"
        );
        let parts = self.parts();
        let workers = worker_count(keys.len(), Scheme::CG_SIZE);
        stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, keys.len(), |i| {
                core.erase(&keys[i]);
            });
        })
    }

    /// Counts occupied slots: synchronizes the stream, then recounts.
    pub(crate) fn count_occupied(&self, stream: &Stream) -> Result<usize> {
        let counter = CounterStorage::new(self.alloc.clone())?;
        // SAFETY: every path below synchronizes before `counter` drops.
        unsafe { counter.reset(stream)? };
        let counter_ref = counter.as_ref();
        let parts = self.parts();
        let workers = worker_count(self.storage.capacity(), 1);
        let enqueued = stream.enqueue(move || {
            let core = parts.core();
            parallel_for(workers, core.capacity(), |slot| {
                if core.slot_occupied(slot) {
                    counter_ref.add(1);
                }
            });
        });
        if let Err(err) = enqueued {
            let _ = stream.synchronize();
            return Err(err);
        }
        Ok(counter.load_to_host(stream)? as usize)
    }

    /// Runs a counting bulk insert to completion.
    pub(crate) fn insert_with_count<F>(&self, stream: &Stream, enqueue: F) -> Result<usize>
    where
        F: FnOnce(Option<crate::storage::CounterRef>) -> Result<()>,
    {
        let counter = CounterStorage::new(self.alloc.clone())?;
        // SAFETY: synchronized below before `counter` drops.
        unsafe { counter.reset(stream)? };
        if let Err(err) = enqueue(Some(counter.as_ref())) {
            let _ = stream.synchronize();
            return Err(err);
        }
        Ok(counter.load_to_host(stream)? as usize)
    }

    /// Enqueues a serial scan copying up to `limit` occupied entries through
    /// `write`, which receives `(output_index, key_bits, payload_bits)`.
    pub(crate) fn enqueue_retrieve<F>(&self, limit: usize, write: F, stream: &Stream) -> Result<()>
    where
        F: Fn(usize, u64, u64) + Send + 'static,
    {
        let parts = self.parts();
        stream.enqueue(move || {
            let core = parts.core();
            let mut index = 0;
            core.for_each_occupied(|key_bits, payload_bits| {
                if index < limit {
                    write(index, key_bits, payload_bits);
                    index += 1;
                }
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::GlobalDeviceAllocator;
    use crate::hash::IdentityHash;
    use crate::probing::LinearProbing;
    use crate::scope;

    type Probing = LinearProbing<u64, IdentityHash<u64>>;
    type Impl = OpenAddressingImpl<u64, Probing, 1, DefaultKeyEqual, scope::Device, GlobalDeviceAllocator>;

    const EMPTY: u64 = u64::MAX;
    const ERASED: u64 = u64::MAX - 1;

    fn make_impl(capacity: i64, stream: &Stream) -> Result<Impl> {
        Impl::new(
            capacity,
            1,
            EMPTY,
            EMPTY,
            ERASED,
            DefaultKeyEqual,
            Probing::default(),
            GlobalDeviceAllocator,
            stream,
        )
    }

    #[test]
    fn insert_find_erase_cycle() -> Result<()> {
        let stream = Stream::new();
        let table = make_impl(8, &stream)?;
        stream.synchronize()?;

        let core = table.ref_core();
        assert!(core.insert(3, 3).inserted());
        assert_eq!(core.insert(3, 3), InsertResult::Duplicate);
        assert!(core.contains(&3));
        assert_eq!(core.find_value(&3), Some(3));
        assert!(core.erase(&3));
        assert!(!core.contains(&3));
        assert!(!core.erase(&3));
        Ok(())
    }

    #[test]
    fn erase_resets_the_value_word() -> Result<()> {
        use core::sync::atomic::Ordering::Relaxed;

        let stream = Stream::new();
        let table = Impl::new(
            8,
            2,
            EMPTY,
            EMPTY,
            ERASED,
            DefaultKeyEqual,
            Probing::default(),
            GlobalDeviceAllocator,
            &stream,
        )?;
        stream.synchronize()?;

        let core = table.ref_core();
        assert!(core.insert(3, 33).inserted());
        assert!(core.erase(&3));

        // Identity hash with unit stride: key 3 lives in slot 3. The slot
        // must be fully reset so a later insert cannot expose the old value.
        assert_eq!(core.view.key_word(3).load(Relaxed), ERASED);
        assert_eq!(core.view.value_word(3).load(Relaxed), EMPTY);

        assert!(core.insert(3, 44).inserted());
        assert_eq!(core.find_value(&3), Some(44));
        Ok(())
    }

    #[test]
    fn probe_chain_survives_erase() -> Result<()> {
        let stream = Stream::new();
        let table = make_impl(8, &stream)?;
        stream.synchronize()?;
        let capacity = table.capacity() as u64;

        let core = table.ref_core();
        // Two colliding keys; erasing the first must not hide the second.
        assert!(core.insert(1, 1).inserted());
        assert!(core.insert(1 + capacity, 1).inserted());
        assert!(core.erase(&1));
        assert!(core.contains(&(1 + capacity)));
        // The erased slot is reusable.
        assert!(core.insert(1 + 2 * capacity, 1).inserted());
        Ok(())
    }

    #[test]
    fn full_table_reports_full() -> Result<()> {
        let stream = Stream::new();
        let table = make_impl(4, &stream)?;
        stream.synchronize()?;

        let core = table.ref_core();
        let mut inserted = 0u64;
        let mut key = 0u64;
        while inserted < table.capacity() as u64 {
            if core.insert(key, key).inserted() {
                inserted += 1;
            }
            key += 1;
        }
        assert_eq!(core.insert(key + 1, 0), InsertResult::Full);
        Ok(())
    }

    #[test]
    fn bulk_insert_counts_unique_entries() -> Result<()> {
        let stream = Stream::new();
        let table = make_impl(64, &stream)?;
        let entries: Vec<(u64, u64)> = (0..32).map(|k| (k % 16, k)).collect();
        let count = table.insert_with_count(&stream, |counter| {
            table.enqueue_insert(entries.clone(), counter, &stream)
        })?;
        assert_eq!(count, 16);
        assert_eq!(table.count_occupied(&stream)?, 16);
        Ok(())
    }
}
