use crate::error::{IngestError, Result};
use crate::traits::Embedder;
use async_trait::async_trait;

pub const DEFAULT_STUB_DIMENSION: usize = 384;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic offline embedder.
///
/// Vectors are pseudo-random unit vectors seeded from a hash of the text, so
/// identical text always maps to the identical vector and different texts are
/// nearly orthogonal. Useful for tests and for running the pipeline without a
/// model.
#[derive(Debug, Clone, Copy)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(IngestError::embedding("dimension must be > 0"));
        }
        Ok(Self { dimension })
    }

    /// Synchronous form of [`Embedder::embed`]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a_64(text.as_bytes()) ^ (self.dimension as u64).wrapping_mul(GOLDEN_GAMMA);
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| {
                // Top 23 bits of the draw become a mantissa in [1, 2).
                let mantissa = (next_u64(&mut state) >> 41) as u32;
                let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
                unit.mul_add(2.0, -1.0)
            })
            .collect();
        normalize(&mut vector);
        vector
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_STUB_DIMENSION,
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Cosine similarity, 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// splitmix64
fn next_u64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(GOLDEN_GAMMA);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_are_deterministic_unit_length() {
        let embedder = StubEmbedder::new(64).expect("dimension");
        let first = embedder.embed_sync("register map");
        let second = embedder.embed_sync("register map");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let norm = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[test]
    fn different_text_gives_different_vectors() {
        let embedder = StubEmbedder::default();
        let a = embedder.embed_sync("bank regs");
        let b = embedder.embed_sync("device sample");
        assert!(cosine_similarity(&a, &b) < 0.5);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(StubEmbedder::new(0).is_err());
    }

    #[test]
    fn cosine_handles_degenerate_input() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn async_embed_matches_sync() {
        let embedder = StubEmbedder::new(16).expect("dimension");
        let vector = embedder.embed("text").await.expect("embed");
        assert_eq!(vector, embedder.embed_sync("text"));
        assert_eq!(embedder.dimension(), 16);
    }
}
