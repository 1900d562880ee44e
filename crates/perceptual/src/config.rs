//! Fingerprinter configuration and construction errors.
//!
//! A [`FingerprintConfig`] fixes every parameter that influences a signature:
//! normalization flags, shingle width, number of hash functions, band count
//! and seed. Fingerprints produced under different configs are not
//! comparable.

use canonical::NormalizeConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Width of each character shingle.
    pub shingle_size: usize,
    /// Signature length (number of MinHash functions).
    pub num_hashes: usize,
    /// Number of LSH bands; must divide `num_hashes`.
    pub bands: usize,
    /// Seed for the hash family.
    pub seed: u64,
    /// Compute signature slots on the rayon pool. Output is identical either way.
    pub use_parallel: bool,
    pub normalize: NormalizeConfig,
}

impl FingerprintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shingle_size(mut self, shingle_size: usize) -> Self {
        self.shingle_size = shingle_size;
        self
    }

    pub fn with_num_hashes(mut self, num_hashes: usize) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn with_normalize(mut self, normalize: NormalizeConfig) -> Self {
        self.normalize = normalize;
        self
    }

    /// Shortcut for `normalize.min_length`.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.normalize.min_length = min_length;
        self
    }

    /// Rows per LSH band. Only meaningful after [`validate`](Self::validate).
    pub fn rows_per_band(&self) -> usize {
        if self.bands == 0 {
            0
        } else {
            self.num_hashes / self.bands
        }
    }

    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.shingle_size < 1 {
            return Err(FingerprintError::InvalidShingleSize {
                shingle_size: self.shingle_size,
            });
        }
        if self.num_hashes < 1 {
            return Err(FingerprintError::InvalidNumHashes {
                num_hashes: self.num_hashes,
            });
        }
        if self.bands < 1 {
            return Err(FingerprintError::InvalidBands { bands: self.bands });
        }
        if self.num_hashes % self.bands != 0 {
            return Err(FingerprintError::BandsDoNotDivide {
                num_hashes: self.num_hashes,
                bands: self.bands,
            });
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            shingle_size: 5,
            num_hashes: 128,
            bands: 32,
            seed: 0xF00D_BAAD_F00D_BAAD,
            use_parallel: false,
            normalize: NormalizeConfig::default(),
        }
    }
}

/// Fingerprinter construction failures. All of them are configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid config: shingle_size must be >= 1 (got {shingle_size})")]
    InvalidShingleSize { shingle_size: usize },

    #[error("invalid config: num_hashes must be >= 1 (got {num_hashes})")]
    InvalidNumHashes { num_hashes: usize },

    #[error("invalid config: bands must be >= 1 (got {bands})")]
    InvalidBands { bands: usize },

    #[error("invalid config: bands={bands} does not divide num_hashes={num_hashes}")]
    BandsDoNotDivide { num_hashes: usize, bands: usize },
}
