use crate::AffineTransform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over explicit little-endian bytes, so stored hashes stay
/// valid across toolchains and platforms.
struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 ^ b as u64).wrapping_mul(FNV_PRIME);
        }
    }
}

/// Fingerprint of the starting transforms of both groups of a pair.
///
/// A pairwise result is stale when the hash recomputed from the current
/// starting transforms differs from the one stored with it. The value is
/// persisted in reports, so the byte layout fed to the hasher is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub u64);

impl ContentHash {
    pub fn of_pair(a: &AffineTransform, b: &AffineTransform) -> Self {
        let mut h = Fnv1a::new();
        for t in [a, b] {
            h.write(&(t.dim() as u64).to_le_bytes());
            for v in t.matrix().iter() {
                h.write(&v.to_bits().to_le_bytes());
            }
        }
        Self(h.finish())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
