use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Fixed seed for shingle hashing. Part of the fingerprint contract.
pub(crate) const SHINGLE_SEED: u64 = 0x5348_494E_474C_4531;

/// Stable 32-bit hash of a byte string (xxh3 truncated to the low 32 bits).
#[inline]
pub fn stable_u32(bytes: &[u8]) -> u32 {
    xxh3_64_with_seed(bytes, SHINGLE_SEED) as u32
}

/// Hash every `width`-character window of `text`.
///
/// Windows are counted in Unicode scalar values, not bytes. The set is empty
/// when `text` has fewer than `width` characters or `width` is zero.
pub fn shingle(text: &str, width: usize) -> HashSet<u32> {
    if width == 0 {
        return HashSet::new();
    }

    // Byte offset of every char start, plus the end of the string.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let chars = bounds.len();
    if chars < width {
        return HashSet::new();
    }
    bounds.push(text.len());

    let windows = chars - width + 1;
    let mut out = HashSet::with_capacity(windows);
    for start in 0..windows {
        let window = &text[bounds[start]..bounds[start + width]];
        out.insert(stable_u32(window.as_bytes()));
    }
    out
}
