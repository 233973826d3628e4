//! Offline feature-hashing embedder.
//!
//! Each lower-cased alphanumeric word is hashed with SHA-256; the digest picks a
//! bucket and a sign. Term counts accumulate into the buckets and the result is
//! L2-normalized, so texts sharing words score high under cosine similarity.
//! Deterministic across runs and platforms.

use super::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::similarity::normalize;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub(super) const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
    model_id: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "hashing embedder dimension must be positive".into(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hashing-{dimension}"),
        })
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0_u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
