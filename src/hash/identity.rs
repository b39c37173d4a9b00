use core::marker::PhantomData;

use super::Hash;

/// Identity hasher for integral keys.
///
/// Returns the key value itself as the digest. Useful for pre-hashed or
/// uniformly distributed keys where rehashing would be wasted work.
pub struct IdentityHash<Key> {
    _marker: PhantomData<Key>,
}

impl<Key> IdentityHash<Key> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Key> Clone for IdentityHash<Key> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key> Copy for IdentityHash<Key> {}

impl<Key> Default for IdentityHash<Key> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_identity_hash_32 {
    ($($t:ty),*) => {
        $(
            impl Hash<$t> for IdentityHash<$t> {
                type HashType = u32;

                fn hash(&self, key: &$t) -> u32 {
                    *key as u32
                }
            }
        )*
    };
}

macro_rules! impl_identity_hash_64 {
    ($($t:ty),*) => {
        $(
            impl Hash<$t> for IdentityHash<$t> {
                type HashType = u64;

                fn hash(&self, key: &$t) -> u64 {
                    *key as u64
                }
            }
        )*
    };
}

impl_identity_hash_32!(u8, u16, u32, i8, i16, i32);
impl_identity_hash_64!(u64, i64, usize, isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_key() {
        let h32 = IdentityHash::<u32>::new();
        assert_eq!(h32.hash(&7), 7u32);

        let h64 = IdentityHash::<u64>::new();
        assert_eq!(h64.hash(&u64::MAX), u64::MAX);
    }

    #[test]
    fn signed_keys_widen_as_cast() {
        let h = IdentityHash::<i32>::new();
        assert_eq!(h.hash(&-1), u32::MAX);
    }
}
