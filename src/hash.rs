//! Hash-function capability.
//!
//! Probing schemes consume hashers through the [`Hash`] trait. The shipped
//! implementations ([`XXHash32`], [`XXHash64`], [`IdentityHash`]) are
//! deterministic and byte-for-byte compatible with the canonical xxHash
//! digests, verified against published reference vectors in the tests.

mod identity;
mod xxhash;

pub use identity::IdentityHash;
pub use xxhash::{XXHash32, XXHash64};

/// Marker trait for valid hash digest widths.
///
/// Only `u32` and `u64` implement this trait.
pub trait HashOutput: Copy {
    /// Widens the digest for modulo arithmetic over slot indices.
    fn to_usize(self) -> usize;
}

impl HashOutput for u32 {
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl HashOutput for u64 {
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// A deterministic hash functor over a key type.
pub trait Hash<Key>: Copy + Send + Sync + 'static {
    /// Digest width produced by this hasher.
    type HashType: HashOutput;

    /// Hashes a key.
    fn hash(&self, key: &Key) -> Self::HashType;
}

/// Reinterprets a key as its raw little-endian byte representation.
///
/// Keys are required to be trivially copyable values without padding (the
/// primitive integers and arrays thereof used as table keys all qualify), so
/// every byte in the range is initialized.
pub(crate) fn bytes_of<T: Copy>(value: &T) -> &[u8] {
    // SAFETY: `value` is a valid, fully-initialized `T` for the lifetime of
    // the borrow, and the slice covers exactly `size_of::<T>()` readable
    // bytes starting at its address.
    unsafe {
        core::slice::from_raw_parts(value as *const T as *const u8, core::mem::size_of::<T>())
    }
}
