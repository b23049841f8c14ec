// A fixed-size Bloom filter over hashable items.
//
// Bits live in a `Vec<u64>`. The k probe indices come from double hashing:
// two independent Fx hashes `h1`, `h2` (each passed through a splitmix64
// finalizer) give `h1 + i * h2 (mod m)`. False positives are possible,
// false negatives are not.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

const SECOND_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Size the filter for `expected` insertions at roughly the given false
    /// positive rate.
    pub fn with_rate(expected: usize, false_positive_rate: f64) -> Self {
        let n = expected.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;
        let m = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let k = ((m as f64 / n) * ln2).round().clamp(1.0, 16.0) as u32;
        Self::new(m, k)
    }

    pub fn new(num_bits: u64, num_hashes: u32) -> Self {
        let words = num_bits.div_ceil(64).max(1) as usize;
        Self {
            bits: vec![0; words],
            num_bits: words as u64 * 64,
            num_hashes: num_hashes.max(1),
        }
    }

    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        let (h1, h2) = hash_pair(item);
        for i in 0..self.num_hashes {
            let bit = self.index(h1, h2, i);
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    pub fn might_contain<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let (h1, h2) = hash_pair(item);
        (0..self.num_hashes).all(|i| {
            let bit = self.index(h1, h2, i);
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    fn index(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % self.num_bits
    }
}

fn hash_pair<T: Hash + ?Sized>(item: &T) -> (u64, u64) {
    let mut first = FxHasher::default();
    item.hash(&mut first);
    let mut second = FxHasher::default();
    SECOND_SEED.hash(&mut second);
    item.hash(&mut second);
    // h2 must never be zero.
    (mix(first.finish()), mix(second.finish()) | 1)
}

// splitmix64 finalizer. Fx alone leaves consecutive integers poorly spread.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let mut bloom = BloomFilter::with_rate(1000, 0.01);
        for i in 0..1000u32 {
            bloom.insert(&(i, i * 3));
        }
        for i in 0..1000u32 {
            assert!(bloom.might_contain(&(i, i * 3)));
        }
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let mut bloom = BloomFilter::with_rate(1000, 0.01);
        for i in 0..1000u64 {
            bloom.insert(&i);
        }
        let false_positives = (10_000..20_000u64).filter(|i| bloom.might_contain(i)).count();
        // 1% target; allow generous slack for hash quality.
        assert!(false_positives < 500, "{false_positives} false positives");
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let bloom = BloomFilter::new(128, 3);
        assert!(!bloom.might_contain(&42u32));
        assert_eq!(bloom.num_bits(), 128);
    }

    #[test]
    fn sizing_is_sane() {
        let bloom = BloomFilter::with_rate(1728, 0.01);
        assert!(bloom.num_bits() >= 1728 * 9);
        assert_eq!(bloom.num_hashes(), 7);
    }
}
