use async_trait::async_trait;
use ragkeep_core::{Embedding, EmbeddingError};

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = FNV_OFFSET ^ seed;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// In-process embedding model based on signed feature hashing of
/// lowercased word tokens.
///
/// Texts sharing vocabulary land close together under cosine similarity,
/// which is enough for local runs and tests without a model download.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return vec;
        }
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let token = token.to_lowercase();
            let bytes = token.as_bytes();
            let slot = (fnv1a(bytes, 0) % self.dimension as u64) as usize;
            let sign = if fnv1a(bytes, 1) & 1 == 0 { 1.0 } else { -1.0 };
            vec[slot] += sign;
        }
        vec
    }
}

#[async_trait]
impl Embedding for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.hash_to_vec(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Development embedder producing all-zero vectors.
///
/// Every similarity is zero, so queries return documents in insertion order.
#[derive(Clone, Debug)]
pub struct ZeroEmbedder {
    dimension: usize,
}

impl ZeroEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedding for ZeroEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(vec![vec![0.0; self.dimension]; texts.len()])
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
