//! Local ONNX Runtime embedding provider for all-MiniLM-L6-v2.
//!
//! Pipeline: tokenize (truncate to 256, pad to batch longest) → ONNX forward
//! pass → attention-masked mean pooling → L2 normalization.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// all-MiniLM-L6-v2 was trained with sequences of at most 256 tokens.
const MAX_SEQ_LEN: usize = 256;

/// Token-level output names used by the sentence-transformers ONNX exports.
const HIDDEN_STATE_OUTPUTS: [&str; 2] = ["last_hidden_state", "token_embeddings"];

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Paths of the model artifacts inside the configured cache directory.
pub fn model_paths(config: &EmbeddingConfig) -> (PathBuf, PathBuf) {
    let cache_dir = crate::config::expand_tilde(&config.cache_dir);
    (cache_dir.join(MODEL_FILE), cache_dir.join(TOKENIZER_FILE))
}

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync and the Session is only reached through the Mutex.
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

/// Token ids and attention mask flattened row-major as `[batch, seq_len]`.
struct EncodedBatch {
    batch_size: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_path, tokenizer_path) = model_paths(config);
        ensure_present(&model_path, "ONNX model")?;
        ensure_present(&tokenizer_path, "tokenizer")?;

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;
        tracing::info!(model = %config.model, path = %model_path.display(), "ONNX model loaded");

        let tokenizer = load_tokenizer(&tokenizer_path)?;
        tracing::info!(path = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<EncodedBatch> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        Ok(EncodedBatch {
            batch_size,
            seq_len,
            input_ids,
            attention_mask,
        })
    }
}

fn ensure_present(path: &Path, what: &str) -> Result<()> {
    anyhow::ensure!(
        path.exists(),
        "{what} not found at {}. Run `prodvec model download` first.",
        path.display()
    );
    Ok(())
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQ_LEN,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
    tokenizer.with_padding(Some(tokenizers::PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    Ok(tokenizer)
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .context("model returned no embedding")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch = self.encode(texts)?;
        let shape = vec![batch.batch_size as i64, batch.seq_len as i64];
        let input_ids = Tensor::from_array((shape.clone(), batch.input_ids.into_boxed_slice()))?;
        let attention_mask =
            Tensor::from_array((shape.clone(), batch.attention_mask.clone().into_boxed_slice()))?;
        // Single-segment input: token_type_ids are all zero.
        let token_type_ids = Tensor::from_array((
            shape,
            vec![0i64; batch.batch_size * batch.seq_len].into_boxed_slice(),
        ))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        })?;

        // Output name depends on the ONNX export.
        let hidden = HIDDEN_STATE_OUTPUTS
            .iter()
            .find_map(|name| outputs.get(*name))
            .with_context(|| {
                format!("model produced none of the outputs {HIDDEN_STATE_OUTPUTS:?}")
            })?;
        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract hidden state tensor")?;
        let dims: &[i64] = &shape;
        let out_seq_len = check_hidden_shape(dims, data.len(), batch.batch_size, batch.seq_len)?;

        Ok((0..batch.batch_size)
            .map(|b| {
                let tokens = &data[b * out_seq_len * EMBEDDING_DIM..(b + 1) * out_seq_len * EMBEDDING_DIM];
                let mask = &batch.attention_mask[b * batch.seq_len..(b + 1) * batch.seq_len];
                l2_normalize(mean_pool(tokens, mask, EMBEDDING_DIM))
            })
            .collect())
    }
}

/// Validate the hidden state against the encoded batch and return its sequence length.
///
/// The shape must be `[batch_size, seq_len, EMBEDDING_DIM]` and fully backed by `data_len` values.
fn check_hidden_shape(dims: &[i64], data_len: usize, batch_size: usize, seq_len: usize) -> Result<usize> {
    anyhow::ensure!(
        dims.len() == 3
            && dims[0] == batch_size as i64
            && dims[1] == seq_len as i64
            && dims[2] == EMBEDDING_DIM as i64,
        "unexpected hidden state shape: {dims:?}, expected [{batch_size}, {seq_len}, {EMBEDDING_DIM}]"
    );
    anyhow::ensure!(
        data_len == batch_size * seq_len * EMBEDDING_DIM,
        "hidden state holds {data_len} values, expected {}",
        batch_size * seq_len * EMBEDDING_DIM
    );
    Ok(seq_len)
}

/// Average the token vectors whose mask is set. `tokens` is `[seq_len, dim]` row-major.
fn mean_pool(tokens: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for (token, &m) in tokens.chunks_exact(dim).zip(mask) {
        if m > 0 {
            sum.iter_mut().zip(token).for_each(|(s, t)| *s += t);
            count += 1;
        }
    }
    if count > 0 {
        sum.iter_mut().for_each(|s| *s /= count as f32);
    }
    sum
}

/// Scale to unit length. Zero vectors are returned unchanged.
fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
