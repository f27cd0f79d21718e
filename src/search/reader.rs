//! Read path: top-K recommendations by stored product embedding or by free text.

use std::sync::Arc;

use super::backend::SearchBackend;
use super::{Recommendation, SearchError, TopK};
use crate::embedding::{embed_blocking, EmbeddingProvider};

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("product '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Search(SearchError),
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),
}

impl From<SearchError> for RecommendError {
    fn from(e: SearchError) -> Self {
        Self::Search(e)
    }
}

#[derive(Clone)]
pub struct Recommender {
    backend: Arc<dyn SearchBackend>,
    embedding: Arc<dyn EmbeddingProvider>,
}

impl Recommender {
    pub fn new(backend: Arc<dyn SearchBackend>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedding }
    }

    /// Products closest to the stored embedding of `product_id`.
    ///
    /// The product itself is not excluded and normally ranks first.
    pub async fn recommend_by_id(
        &self,
        product_id: &str,
        top_k: TopK,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let doc = self.backend.get(product_id).await.map_err(|e| match e {
            SearchError::NotFound(_) => RecommendError::NotFound(product_id.to_string()),
            other => RecommendError::Search(other),
        })?;
        self.nearest(&doc.embedding, top_k).await
    }

    /// Products closest to a freshly embedded query text.
    pub async fn recommend_by_query(
        &self,
        text: &str,
        top_k: TopK,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let vector = embed_blocking(&self.embedding, text)
            .await
            .map_err(RecommendError::Embedding)?;
        self.nearest(&vector, top_k).await
    }

    async fn nearest(&self, vector: &[f32], top_k: TopK) -> Result<Vec<Recommendation>, RecommendError> {
        let mut hits = self.backend.similar(vector, top_k.get()).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k.get());
        tracing::debug!(top_k = top_k.get(), returned = hits.len(), "similarity search");
        Ok(hits)
    }
}
