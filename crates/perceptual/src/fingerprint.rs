//! The [`Fingerprinter`] and the embedding it produces.
//!
//! The embedding schema is part of the public contract: signature slots and
//! band keys are persisted by the stores, so any change to shingling, hashing
//! or the band digest re-keys existing data.

use std::collections::HashSet;

use canonical::{normalize, NormalizedText};
use serde::{Deserialize, Serialize};

use crate::config::{FingerprintConfig, FingerprintError};
use crate::minhash::{band_keys, HashFamily};
use crate::shingles::shingle;

/// Immutable fingerprint of one normalized log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LshEmbedding {
    /// `num_hashes` MinHash slots; all `u32::MAX` when nothing was shingled.
    pub signature: Vec<u32>,
    /// One `lsh:<band>:<digest>` key per band.
    pub band_keys: Vec<String>,
    /// Number of distinct shingles that fed the signature.
    pub shingle_count: usize,
}

impl LshEmbedding {
    /// True when the signature came from an empty shingle set.
    pub fn is_empty(&self) -> bool {
        self.shingle_count == 0
    }

    /// Signature slots as `f32`, the layout vector stores expect.
    pub fn to_vector(&self) -> Vec<f32> {
        self.signature.iter().map(|&v| v as f32).collect()
    }
}

/// Shingle/MinHash/LSH generator.
///
/// Built once from a validated [`FingerprintConfig`]; holds only immutable
/// state so it can be shared across threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    cfg: FingerprintConfig,
    family: HashFamily,
}

impl Fingerprinter {
    pub fn new(cfg: FingerprintConfig) -> Result<Self, FingerprintError> {
        cfg.validate()?;
        let family = HashFamily::new(cfg.num_hashes, cfg.seed);
        Ok(Self { cfg, family })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.cfg
    }

    pub fn num_hashes(&self) -> usize {
        self.cfg.num_hashes
    }

    pub fn rows_per_band(&self) -> usize {
        self.cfg.rows_per_band()
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        normalize(text, &self.cfg.normalize)
    }

    /// Shingle set of the normalized text. Empty for degenerate lines.
    pub fn shingles(&self, text: &str) -> HashSet<u32> {
        let normalized = self.normalize(text);
        if normalized.degenerate {
            return HashSet::new();
        }
        shingle(&normalized, self.cfg.shingle_size)
    }

    /// Normalize, shingle, sign and band `text`.
    pub fn fingerprint(&self, text: &str) -> LshEmbedding {
        let set = self.shingles(text);
        self.embed_shingles(&set)
    }

    /// Sign an already computed shingle set.
    pub fn embed_shingles(&self, set: &HashSet<u32>) -> LshEmbedding {
        // Sorted so the slot loop visits shingles in a stable order.
        let mut shingles: Vec<u32> = set.iter().copied().collect();
        shingles.sort_unstable();

        let signature = self.family.signature(&shingles, self.cfg.use_parallel);
        let band_keys = band_keys(&signature, self.cfg.bands);
        LshEmbedding {
            signature,
            band_keys,
            shingle_count: shingles.len(),
        }
    }
}
