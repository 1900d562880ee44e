//! MinHash signatures and LSH band keys.
//!
//! Slot `i` of a signature is
//!
//! ```text
//! min over x in shingles of (a_i * x + b_i) mod P      P = 4294967311
//! ```
//!
//! folded into `u32` by keeping the low 32 bits. `(a_i, b_i)` come from
//! `splitmix64` over the seed and slot index, with `a_i` forced odd. An empty
//! shingle set yields a signature of `u32::MAX` in every slot.

use rayon::prelude::*;
use xxhash_rust::xxh3::xxh3_64;

/// Mersenne-like prime just above `u32::MAX`.
pub const MERSENNE_PRIME: u64 = 4_294_967_311;

/// Sentinel written to every slot of an empty set's signature.
pub const SENTINEL: u32 = u32::MAX;

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
const B_SALT: u64 = 0xD1B5_4A32_D192_ED03;

/// Per-slot affine coefficients, derived once per fingerprinter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    a: Vec<u64>,
    b: Vec<u64>,
}

impl HashFamily {
    pub fn new(num_hashes: usize, seed: u64) -> Self {
        let mut a = Vec::with_capacity(num_hashes);
        let mut b = Vec::with_capacity(num_hashes);
        for i in 0..num_hashes {
            let key = splitmix64(seed.wrapping_add((i as u64).wrapping_mul(GOLDEN)));
            a.push((key % (MERSENNE_PRIME - 1)) | 1);
            b.push(splitmix64(key ^ B_SALT) % MERSENNE_PRIME);
        }
        Self { a, b }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// MinHash signature of `shingles`. Slot order is fixed by the family, so
    /// the parallel path returns exactly what the sequential one does.
    pub fn signature(&self, shingles: &[u32], parallel: bool) -> Vec<u32> {
        if shingles.is_empty() {
            return vec![SENTINEL; self.len()];
        }
        if parallel {
            (0..self.len())
                .into_par_iter()
                .map(|slot| self.slot(shingles, slot))
                .collect()
        } else {
            (0..self.len()).map(|slot| self.slot(shingles, slot)).collect()
        }
    }

    #[inline]
    fn slot(&self, shingles: &[u32], slot: usize) -> u32 {
        let a = u128::from(self.a[slot]);
        let b = u128::from(self.b[slot]);
        let prime = u128::from(MERSENNE_PRIME);
        let mut minv = u64::MAX;
        for &x in shingles {
            let h = ((a * u128::from(x) + b) % prime) as u64;
            if h < minv {
                minv = h;
            }
        }
        (minv & 0xFFFF_FFFF) as u32
    }
}

/// One key per band: `lsh:<band>:<16 hex chars>`, where the digest is xxh3
/// over the comma-joined decimal slot values of that band.
pub fn band_keys(signature: &[u32], bands: usize) -> Vec<String> {
    if bands == 0 || signature.is_empty() {
        return Vec::new();
    }
    let rows = signature.len() / bands;
    signature
        .chunks(rows.max(1))
        .take(bands)
        .enumerate()
        .map(|(band, chunk)| {
            let joined = chunk
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("lsh:{band}:{:016x}", xxh3_64(joined.as_bytes()))
        })
        .collect()
}

#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
