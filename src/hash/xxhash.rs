use core::marker::PhantomData;

use super::{bytes_of, Hash};

const PRIME32_1: u32 = 0x9E37_79B1;
const PRIME32_2: u32 = 0x85EB_CA77;
const PRIME32_3: u32 = 0xC2B2_AE3D;
const PRIME32_4: u32 = 0x27D4_EB2F;
const PRIME32_5: u32 = 0x1656_67B1;

const PRIME64_1: u64 = 0x9E37_79B1_85EB_CA87;
const PRIME64_2: u64 = 0xC2B2_AE3D_27D4_EB4F;
const PRIME64_3: u64 = 0x1656_67B1_9E37_79F9;
const PRIME64_4: u64 = 0x85EB_CA77_C2B2_AE63;
const PRIME64_5: u64 = 0x27D4_EB2F_1656_67C5;

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

fn round32(acc: u32, input: u32) -> u32 {
    acc.wrapping_add(input.wrapping_mul(PRIME32_2))
        .rotate_left(13)
        .wrapping_mul(PRIME32_1)
}

fn xxhash32(bytes: &[u8], seed: u32) -> u32 {
    let len = bytes.len();
    let mut tail = bytes;

    let mut h = if len >= 16 {
        let mut v1 = seed.wrapping_add(PRIME32_1).wrapping_add(PRIME32_2);
        let mut v2 = seed.wrapping_add(PRIME32_2);
        let mut v3 = seed;
        let mut v4 = seed.wrapping_sub(PRIME32_1);
        while tail.len() >= 16 {
            v1 = round32(v1, read_u32(&tail[0..]));
            v2 = round32(v2, read_u32(&tail[4..]));
            v3 = round32(v3, read_u32(&tail[8..]));
            v4 = round32(v4, read_u32(&tail[12..]));
            tail = &tail[16..];
        }
        v1.rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18))
    } else {
        seed.wrapping_add(PRIME32_5)
    };

    h = h.wrapping_add(len as u32);

    while tail.len() >= 4 {
        h = h
            .wrapping_add(read_u32(tail).wrapping_mul(PRIME32_3))
            .rotate_left(17)
            .wrapping_mul(PRIME32_4);
        tail = &tail[4..];
    }
    for &byte in tail {
        h = h
            .wrapping_add((byte as u32).wrapping_mul(PRIME32_5))
            .rotate_left(11)
            .wrapping_mul(PRIME32_1);
    }

    h ^= h >> 15;
    h = h.wrapping_mul(PRIME32_2);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME32_3);
    h ^= h >> 16;
    h
}

fn round64(acc: u64, input: u64) -> u64 {
    acc.wrapping_add(input.wrapping_mul(PRIME64_2))
        .rotate_left(31)
        .wrapping_mul(PRIME64_1)
}

fn merge_round64(acc: u64, value: u64) -> u64 {
    (acc ^ round64(0, value))
        .wrapping_mul(PRIME64_1)
        .wrapping_add(PRIME64_4)
}

fn xxhash64(bytes: &[u8], seed: u64) -> u64 {
    let len = bytes.len();
    let mut tail = bytes;

    let mut h = if len >= 32 {
        let mut v1 = seed.wrapping_add(PRIME64_1).wrapping_add(PRIME64_2);
        let mut v2 = seed.wrapping_add(PRIME64_2);
        let mut v3 = seed;
        let mut v4 = seed.wrapping_sub(PRIME64_1);
        while tail.len() >= 32 {
            v1 = round64(v1, read_u64(&tail[0..]));
            v2 = round64(v2, read_u64(&tail[8..]));
            v3 = round64(v3, read_u64(&tail[16..]));
            v4 = round64(v4, read_u64(&tail[24..]));
            tail = &tail[32..];
        }
        let mut acc = v1
            .rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18));
        acc = merge_round64(acc, v1);
        acc = merge_round64(acc, v2);
        acc = merge_round64(acc, v3);
        merge_round64(acc, v4)
    } else {
        seed.wrapping_add(PRIME64_5)
    };

    h = h.wrapping_add(len as u64);

    while tail.len() >= 8 {
        h = (h ^ round64(0, read_u64(tail)))
            .rotate_left(27)
            .wrapping_mul(PRIME64_1)
            .wrapping_add(PRIME64_4);
        tail = &tail[8..];
    }
    if tail.len() >= 4 {
        h = (h ^ (read_u32(tail) as u64).wrapping_mul(PRIME64_1))
            .rotate_left(23)
            .wrapping_mul(PRIME64_2)
            .wrapping_add(PRIME64_3);
        tail = &tail[4..];
    }
    for &byte in tail {
        h = (h ^ (byte as u64).wrapping_mul(PRIME64_5))
            .rotate_left(11)
            .wrapping_mul(PRIME64_1);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME64_2);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME64_3);
    h ^= h >> 32;
    h
}

/// Seeded xxHash32 over the raw bytes of a key.
pub struct XXHash32<Key> {
    seed: u32,
    _marker: PhantomData<Key>,
}

impl<Key> XXHash32<Key> {
    pub const fn new(seed: u32) -> Self {
        Self {
            seed,
            _marker: PhantomData,
        }
    }
}

impl<Key> Clone for XXHash32<Key> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key> Copy for XXHash32<Key> {}

impl<Key> Default for XXHash32<Key> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<Key: Copy + Send + Sync + 'static> Hash<Key> for XXHash32<Key> {
    type HashType = u32;

    fn hash(&self, key: &Key) -> u32 {
        xxhash32(bytes_of(key), self.seed)
    }
}

/// Seeded xxHash64 over the raw bytes of a key.
pub struct XXHash64<Key> {
    seed: u64,
    _marker: PhantomData<Key>,
}

impl<Key> XXHash64<Key> {
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            _marker: PhantomData,
        }
    }
}

impl<Key> Clone for XXHash64<Key> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Key> Copy for XXHash64<Key> {}

impl<Key> Default for XXHash64<Key> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<Key: Copy + Send + Sync + 'static> Hash<Key> for XXHash64<Key> {
    type HashType = u64;

    fn hash(&self, key: &Key) -> u64 {
        xxhash64(bytes_of(key), self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Expected digests computed with the reference xxHash implementation
    // over the little-endian byte encoding of each key.

    #[test]
    fn xxhash32_reference_vectors() {
        assert_eq!(XXHash32::<u32>::new(0).hash(&0), 148_298_089);
        assert_eq!(XXHash32::<u32>::new(42).hash(&0), 2_132_181_312);
        assert_eq!(XXHash32::<u32>::new(0).hash(&42), 1_161_967_057);
        assert_eq!(XXHash32::<u32>::new(0).hash(&123_456_789), 2_987_034_094);
        assert_eq!(XXHash32::<u64>::new(0).hash(&0), 3_736_311_059);
    }

    #[test]
    fn xxhash32_wide_key() {
        let key: [u64; 4] = [1, 2, 3, 4];
        assert_eq!(XXHash32::<[u64; 4]>::new(0).hash(&key), 2_811_823_768);
    }

    #[test]
    fn xxhash64_reference_vectors() {
        assert_eq!(XXHash64::<u32>::new(0).hash(&0), 4_246_796_580_750_024_372);
        assert_eq!(XXHash64::<u32>::new(42).hash(&0), 3_614_696_996_920_510_707);
        assert_eq!(XXHash64::<u64>::new(0).hash(&0), 3_803_688_792_395_291_579);
        assert_eq!(
            XXHash64::<u64>::new(0).hash(&42),
            13_066_772_586_158_965_587
        );
        assert_eq!(
            XXHash64::<u64>::new(0).hash(&123_456_789),
            14_662_639_848_940_634_189
        );
    }

    #[test]
    fn xxhash64_wide_key() {
        let key: [u64; 4] = [1, 2, 3, 4];
        assert_eq!(
            XXHash64::<[u64; 4]>::new(0).hash(&key),
            8_356_527_653_647_720_045
        );
    }

    #[test]
    fn seed_changes_digest() {
        let a = XXHash64::<u64>::new(1).hash(&99);
        let b = XXHash64::<u64>::new(2).hash(&99);
        assert_ne!(a, b);
    }
}
