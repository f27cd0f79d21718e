//! Text-to-vector embedding.
//!
//! [`EmbeddingProvider`] is the seam between the service and the sentence
//! model. The production provider ([`local::LocalEmbeddingProvider`]) runs
//! all-MiniLM-L6-v2 through ONNX Runtime and yields 384-dimensional,
//! L2-normalized vectors. Inference is CPU-bound; async callers go through
//! [`embed_blocking`] / [`embed_batch_blocking`].

pub mod local;

use std::sync::Arc;

use anyhow::{Context, Result};

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations must be deterministic: the same input yields the same vector.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Only `"local"` is supported. Fails if the model files are missing; run
/// `prodvec model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(local::LocalEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

/// Embed one text on the blocking thread pool.
pub async fn embed_blocking(provider: &Arc<dyn EmbeddingProvider>, text: &str) -> Result<Vec<f32>> {
    let provider = Arc::clone(provider);
    let text = text.to_owned();
    tokio::task::spawn_blocking(move || provider.embed(&text))
        .await
        .context("embedding task failed")?
}

/// Embed many texts on the blocking thread pool, preserving input order.
pub async fn embed_batch_blocking(
    provider: &Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>> {
    let provider = Arc::clone(provider);
    let expected = texts.len();
    let embeddings = tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        provider.embed_batch(&refs)
    })
    .await
    .context("embedding task failed")??;
    anyhow::ensure!(
        embeddings.len() == expected,
        "embedding provider returned {} vectors for {expected} inputs",
        embeddings.len()
    );
    Ok(embeddings)
}

/// Cosine similarity in `[-1, 1]`. Zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
