//! Local hashed term-frequency vectorizer.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::Vectorizer;

lazy_static::lazy_static! {
    static ref TERM: Regex = Regex::new(r"\w+").expect("valid term pattern");
}

/// Hashes lower-cased terms into a fixed number of buckets.
///
/// Needs no model or network, so it doubles as the backend for tests and
/// offline runs. Vectors are L2-normalised. Buckets come from SHA-256, so
/// stored vectors stay comparable across builds.
#[derive(Debug, Clone)]
pub struct HashingVectorizer {
    dim: usize,
}

impl HashingVectorizer {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            anyhow::bail!("hashing vectorizer dimension must be > 0");
        }
        Ok(Self { dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// First 8 bytes of the term's SHA-256, little-endian, modulo `dim`.
    fn bucket(&self, term: &str) -> usize {
        let digest = Sha256::digest(term.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dim as u64) as usize
    }

    /// Vectorize synchronously.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for term in TERM.find_iter(text) {
            let term = term.as_str().to_lowercase();
            vector[self.bucket(&term)] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Vectorizer for HashingVectorizer {
    fn name(&self) -> &'static str {
        "hashing"
    }

    async fn vectorize(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }
}
