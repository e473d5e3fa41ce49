//! Modulus deduplication
//!
//! Emits each distinct canonical modulus once, preserving first-seen
//! order. Membership is tracked with a Bloom filter: queries can
//! false-positive, so a genuinely new modulus may be dropped with
//! probability bounded by the filter's false-positive rate. With the
//! default sizing (431,327,627 bits, 30 hashes, targeting n = 10^7)
//! that bound is 1e-9, which is accepted as a sampling property of
//! the audit.
//!
//! Hash indexes are derived by double hashing over a SHA-256 digest
//! of the modulus bytes: the first two 64-bit words of the digest
//! seed `h1 + i * h2`.

use crate::modulus::Modulus;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Default filter size in bits, targeting n = 10^7 at FP = 1e-9
pub const DEFAULT_FILTER_BITS: u64 = 431_327_627;

/// Default number of hash functions
pub const DEFAULT_FILTER_HASHES: u32 = 30;

/// A fixed-size Bloom filter over byte strings
pub struct BloomFilter {
    words: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Allocate a filter with the given bit count and hash count
    pub fn new(num_bits: u64, num_hashes: u32) -> Self {
        assert!(num_bits > 0 && num_hashes > 0);
        let words = vec![0u64; num_bits.div_ceil(64) as usize];
        Self {
            words,
            num_bits,
            num_hashes,
        }
    }

    fn indexes(&self, item: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let digest = Sha256::digest(item);
        let h1 = u64::from_le_bytes(digest[0..8].try_into().expect("digest is 32 bytes"));
        let h2 = u64::from_le_bytes(digest[8..16].try_into().expect("digest is 32 bytes"));
        let num_bits = self.num_bits;
        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }

    /// Query membership. True may be a false positive; false is exact.
    pub fn contains(&self, item: &[u8]) -> bool {
        self.indexes(item)
            .all(|bit| self.words[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0)
    }

    /// Insert and report whether the item was absent before. Combines
    /// the query and the set so each item hashes once.
    pub fn insert(&mut self, item: &[u8]) -> bool {
        let bits: Vec<u64> = self.indexes(item).collect();
        let mut was_absent = false;
        for bit in bits {
            let word = (bit / 64) as usize;
            let mask = 1u64 << (bit % 64);
            if self.words[word] & mask == 0 {
                was_absent = true;
                self.words[word] |= mask;
            }
        }
        was_absent
    }
}

/// First-seen-order unique filter over canonical moduli
pub struct Deduplicator {
    filter: BloomFilter,
    seen: u64,
    dropped: u64,
}

impl Deduplicator {
    /// Deduplicator with the default filter sizing
    pub fn new() -> Self {
        Self::with_filter(DEFAULT_FILTER_BITS, DEFAULT_FILTER_HASHES)
    }

    /// Deduplicator with explicit filter parameters (tests use small
    /// filters; callers with enough memory may size for exactness)
    pub fn with_filter(num_bits: u64, num_hashes: u32) -> Self {
        debug!(bits = num_bits, hashes = num_hashes, "Allocating Bloom filter");
        Self {
            filter: BloomFilter::new(num_bits, num_hashes),
            seen: 0,
            dropped: 0,
        }
    }

    /// Returns true when the modulus is new and should be kept.
    pub fn check_and_insert(&mut self, modulus: &Modulus) -> bool {
        self.seen += 1;
        let new = self.filter.insert(modulus.as_bytes());
        if !new {
            self.dropped += 1;
        }
        new
    }

    /// Total moduli offered
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Moduli dropped as already-present (or Bloom false positives)
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}
