//! Write path: bulk upsert, partial update and deletes against the product index.
//!
//! Search-engine failures are logged and swallowed here; callers always get a
//! [`WriteReport`]. Only embedding failures are returned as errors.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use super::backend::SearchBackend;
use super::{DeleteQuery, IndexedDocument, SearchError};
use crate::catalog::{compose, ProductBatch};
use crate::embedding::{embed_batch_blocking, EmbeddingProvider};

/// Texts per inference call.
const EMBED_BATCH_SIZE: usize = 32;

/// What happened to a write, as far as the search engine told us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_found: usize,
}

impl WriteReport {
    fn record(&mut self, result: &Result<(), SearchError>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) if e.is_not_found() => self.not_found += 1,
            Err(_) => self.failed += 1,
        }
    }
}

#[derive(Clone)]
pub struct IndexWriter {
    backend: Arc<dyn SearchBackend>,
    embedding: Arc<dyn EmbeddingProvider>,
}

impl IndexWriter {
    pub fn new(backend: Arc<dyn SearchBackend>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedding }
    }

    /// Compose and embed one document per product, in product order.
    async fn build_documents(&self, batch: &ProductBatch) -> Result<Vec<IndexedDocument>> {
        let mut docs = Vec::with_capacity(batch.products.len());
        for chunk in batch.products.chunks(EMBED_BATCH_SIZE) {
            let texts = chunk
                .iter()
                .map(|p| compose(p, batch.attributes_for(p)))
                .collect();
            let embeddings = embed_batch_blocking(&self.embedding, texts).await?;
            docs.extend(chunk.iter().zip(embeddings).map(|(product, embedding)| {
                IndexedDocument {
                    id: product.id.clone(),
                    code: product.code.clone(),
                    name: product.name.clone(),
                    embedding,
                }
            }));
        }
        Ok(docs)
    }

    /// Index every product in `batch` with full-document replace, in one bulk request.
    ///
    /// With `replace_all` the whole index is wiped before the bulk write, so the
    /// index ends up holding exactly the products in `batch`.
    pub async fn upsert_all(&self, batch: &ProductBatch, replace_all: bool) -> Result<WriteReport> {
        let started = Instant::now();
        let docs = self.build_documents(batch).await?;
        let mut report = WriteReport {
            attempted: docs.len(),
            ..Default::default()
        };

        if replace_all {
            self.delete_all().await;
        }

        if docs.is_empty() {
            tracing::info!("bulk upsert: nothing to index");
            return Ok(report);
        }

        match self.backend.bulk_index(&docs).await {
            Ok(summary) => {
                report.succeeded = summary.indexed;
                report.failed = summary.failed;
                if summary.failed > 0 {
                    tracing::warn!(
                        indexed = summary.indexed,
                        failed = summary.failed,
                        "bulk upsert completed with item failures"
                    );
                } else {
                    tracing::info!(
                        indexed = summary.indexed,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "bulk upsert completed"
                    );
                }
            }
            Err(e) => {
                report.failed = docs.len();
                tracing::error!(error = %e, documents = docs.len(), "bulk upsert failed");
            }
        }
        Ok(report)
    }

    /// Re-embed each product and merge it into its existing document.
    ///
    /// Products whose document is missing are logged and skipped.
    pub async fn update_batch(&self, batch: &ProductBatch) -> Result<WriteReport> {
        let docs = self.build_documents(batch).await?;
        let mut report = WriteReport {
            attempted: docs.len(),
            ..Default::default()
        };

        for doc in &docs {
            let result = self.backend.update(doc).await;
            match &result {
                Ok(()) => tracing::debug!(id = %doc.id, "document updated"),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(id = %doc.id, "product with id '{}' not found in index", doc.id)
                }
                Err(e) => tracing::error!(id = %doc.id, error = %e, "document update failed"),
            }
            report.record(&result);
        }

        tracing::info!(
            attempted = report.attempted,
            updated = report.succeeded,
            not_found = report.not_found,
            failed = report.failed,
            "update batch finished"
        );
        Ok(report)
    }

    pub async fn delete_one(&self, id: &str) -> WriteReport {
        let result = self.backend.delete(id).await;
        match &result {
            Ok(()) => tracing::info!(id, "deleted product document"),
            Err(e) if e.is_not_found() => tracing::warn!(id, "product with id '{id}' not found"),
            Err(e) => tracing::error!(id, error = %e, "document delete failed"),
        }
        let mut report = WriteReport {
            attempted: 1,
            ..Default::default()
        };
        report.record(&result);
        report
    }

    /// Delete every document whose `code` is in `codes`.
    pub async fn delete_many(&self, codes: &[String]) -> WriteReport {
        if codes.is_empty() {
            tracing::info!("delete by codes: no codes given, nothing deleted");
            return WriteReport::default();
        }
        self.delete_matching(DeleteQuery::Codes(codes.to_vec()))
            .await
    }

    pub async fn delete_all(&self) -> WriteReport {
        self.delete_matching(DeleteQuery::All).await
    }

    async fn delete_matching(&self, query: DeleteQuery) -> WriteReport {
        let mut report = WriteReport::default();
        match self.backend.delete_by_query(&query).await {
            Ok(deleted) => {
                report.attempted = deleted as usize;
                report.succeeded = deleted as usize;
                tracing::info!(deleted, ?query, "deleted documents");
            }
            Err(e) if e.is_not_found() => {
                report.not_found = 1;
                tracing::warn!(error = %e, "index not found, nothing deleted");
            }
            Err(e) => {
                report.failed = 1;
                tracing::error!(error = %e, ?query, "delete by query failed");
            }
        }
        report
    }
}
