//! Product vector index: documents, the search-engine seam, writes and reads.
//!
//! - [`backend`]: the [`SearchBackend`] trait over the engine operations we use
//! - [`elastic`]: Elasticsearch over its REST API
//! - [`memory`]: in-process index with exact cosine scoring
//! - [`query`]: request bodies shared by the backends
//! - [`writer`]: bulk upsert, partial update, deletes (log-and-swallow policy)
//! - [`reader`]: top-K recommendations by product id or free text

pub mod backend;
pub mod elastic;
pub mod memory;
pub mod query;
pub mod reader;
pub mod writer;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use backend::SearchBackend;
pub use reader::{RecommendError, Recommender};
pub use writer::{IndexWriter, WriteReport};

/// One product's entry in the search index, keyed by product id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub code: String,
    pub name: String,
    pub embedding: Vec<f32>,
}

/// A scored match, highest score first in every result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    /// Cosine similarity shifted by +1.0, so always in `[0, 2]`.
    pub score: f64,
}

/// Which documents a delete-by-query removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteQuery {
    All,
    Codes(Vec<String>),
}

/// Per-item outcome counts of a bulk request that reached the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub indexed: usize,
    pub failed: usize,
}

/// Largest `top_k` accepted, Elasticsearch's default `index.max_result_window`.
pub const MAX_TOP_K: usize = 10_000;

/// Number of results requested from a similarity query. Always in `1..=MAX_TOP_K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK(usize);

impl TopK {
    pub fn new(value: i64) -> Result<Self, String> {
        if value < 1 {
            return Err(format!("top_k must be >= 1, got {value}"));
        }
        if value > MAX_TOP_K as i64 {
            return Err(format!("top_k must be <= {MAX_TOP_K}, got {value}"));
        }
        Ok(Self(value as usize))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self(5)
    }
}

/// Errors surfaced by a [`SearchBackend`].
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Document or index absent.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("search engine unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected search engine response: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Create the configured search backend.
pub fn create_backend(config: &crate::config::SearchConfig) -> Result<Arc<dyn SearchBackend>> {
    match config.backend.as_str() {
        "elasticsearch" => Ok(Arc::new(elastic::ElasticClient::new(config)?)),
        "memory" => Ok(Arc::new(memory::MemoryIndex::new())),
        other => anyhow::bail!("unknown search backend: {other}. Supported: elasticsearch, memory"),
    }
}
