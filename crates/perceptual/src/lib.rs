//! # logdup perceptual fingerprinting
//!
//! Turns a raw log line into a compact, similarity-preserving fingerprint:
//!
//! 1.  **Normalization**: the line is rewritten by the canonical crate so
//!     volatile tokens collapse onto placeholders.
//! 2.  **Shingling**: every `shingle_size`-character window of the normalized
//!     text is hashed into a `u32` with a fixed-seed xxh3.
//! 3.  **MinHashing**: `num_hashes` affine hash functions modulo the prime
//!     `4294967311` reduce the shingle set to a fixed-length signature.
//! 4.  **Banding**: the signature is cut into `bands` equal slices and each
//!     slice is digested into an `lsh:<band>:<hex>` key.
//!
//! Invariant: for the same text and the same [`FingerprintConfig`], the
//! embedding is bit identical on every machine.
//!
//! ```
//! use perceptual::{signature_jaccard, FingerprintConfig, Fingerprinter};
//!
//! let fp = Fingerprinter::new(FingerprintConfig::default()).unwrap();
//! let a = fp.fingerprint("cache refresh took 181 ms on node-3");
//! let b = fp.fingerprint("cache refresh took 95 ms on node-3");
//! assert_eq!(a.signature.len(), 128);
//! assert_eq!(signature_jaccard(&a.signature, &b.signature).unwrap(), 1.0);
//! ```
pub mod config;
pub mod fingerprint;
pub mod metrics;
mod minhash;
mod shingles;

pub use crate::config::{FingerprintConfig, FingerprintError};
pub use crate::fingerprint::{Fingerprinter, LshEmbedding};
pub use crate::metrics::{cosine, jaccard, signature_jaccard, MetricError};
pub use crate::minhash::{band_keys, HashFamily, MERSENNE_PRIME, SENTINEL};
pub use crate::shingles::{shingle, stable_u32};
