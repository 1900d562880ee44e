//! Similarity metrics over shingle sets, signatures and raw vectors.
//!
//! The three metrics answer different questions and are not interchangeable:
//! [`jaccard`] is exact set overlap, [`signature_jaccard`] estimates it from
//! two MinHash signatures, and [`cosine`] is plain vector cosine over whatever
//! numbers it is given. Cosine over raw MinHash slot values is what the vector
//! store ranks by; it is monotone-ish in overlap but not calibrated to it.

use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("signature length mismatch: left has {left} slots, right has {right}")]
    LengthMismatch { left: usize, right: usize },
}

/// Exact Jaccard similarity `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets are identical (1.0); exactly one empty set scores 0.0.
pub fn jaccard(a: &HashSet<u32>, b: &HashSet<u32>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let inter = small.iter().filter(|v| large.contains(*v)).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Fraction of slots where the two signatures agree.
pub fn signature_jaccard(a: &[u32], b: &[u32]) -> Result<f64, MetricError> {
    if a.len() != b.len() {
        return Err(MetricError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(1.0);
    }
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
    Ok(matches as f64 / a.len() as f64)
}

/// Cosine `dot / (|a| * |b|)` over the overlapping prefix of `a` and `b`.
/// Returns 0.0 when either norm is zero.
pub fn cosine<T>(a: &[T], b: &[T]) -> f64
where
    T: Copy + Into<f64>,
{
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y): (f64, f64) = (x.into(), y.into());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
