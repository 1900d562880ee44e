//! Text → vector seam between the pipeline and the fingerprinter.

use index::Distance;
use perceptual::{signature_jaccard, FingerprintConfig, Fingerprinter, MetricError};

/// A vector ready for the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    /// The text produced no features (too short or below the configured
    /// minimum length). Such vectors carry no similarity information.
    pub degenerate: bool,
}

pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn vector_size(&self) -> usize;

    /// Distance the vector collection should be created with.
    fn distance(&self) -> Distance;

    fn embed(&self, text: &str) -> Embedding;

    fn embed_batch(&self, texts: &[&str]) -> Vec<Embedding> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Embedder-native similarity between two raw texts, computed from the
    /// embedder's exact features rather than the lossy `f32` vectors.
    fn compare(&self, a: &str, b: &str) -> Result<f64, MetricError>;
}

/// MinHash/LSH embedder.
///
/// The collection uses cosine distance over the raw signature slots, which
/// is not a calibrated estimate of Jaccard similarity. [`Embedder::compare`]
/// gives the slot-match rate instead.
#[derive(Debug, Clone)]
pub struct LshEmbedder {
    fingerprinter: Fingerprinter,
    distance: Distance,
}

impl LshEmbedder {
    pub fn new(cfg: FingerprintConfig) -> Result<Self, perceptual::FingerprintError> {
        Ok(Self {
            fingerprinter: Fingerprinter::new(cfg)?,
            distance: Distance::Cosine,
        })
    }

    /// Override the collection distance. Only the ordering of
    /// [`Distance::Cosine`] and [`Distance::Dot`] scores is meaningful for
    /// the duplicate threshold.
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }
}

impl Embedder for LshEmbedder {
    fn vector_size(&self) -> usize {
        self.fingerprinter.num_hashes()
    }

    fn distance(&self) -> Distance {
        self.distance
    }

    fn embed(&self, text: &str) -> Embedding {
        let fp = self.fingerprinter.fingerprint(text);
        Embedding {
            vector: fp.to_vector(),
            degenerate: fp.is_empty(),
        }
    }

    fn compare(&self, a: &str, b: &str) -> Result<f64, MetricError> {
        let a = self.fingerprinter.fingerprint(a);
        let b = self.fingerprinter.fingerprint(b);
        signature_jaccard(&a.signature, &b.signature)
    }
}
