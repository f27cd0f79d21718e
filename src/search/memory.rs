//! In-process search backend.
//!
//! Mirrors the Elasticsearch behaviours the service relies on: the index is
//! created implicitly by a bulk write, operations against a missing index or
//! document report NotFound, and similarity uses the same shifted cosine
//! score. Scoring is exact (brute force over every document).

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::backend::SearchBackend;
use super::query::SCORE_SHIFT;
use super::{BulkSummary, DeleteQuery, IndexedDocument, Recommendation, SearchError};
use crate::embedding::cosine_similarity;

#[derive(Default)]
pub struct MemoryIndex {
    /// `None` until the index is created.
    docs: RwLock<Option<BTreeMap<String, IndexedDocument>>>,
}

impl MemoryIndex {
    /// A backend whose index does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, `None` when the index does not exist.
    pub fn doc_count(&self) -> Option<usize> {
        self.read(|docs| docs.map(BTreeMap::len))
    }

    pub fn ids(&self) -> Vec<String> {
        self.read(|docs| docs.map(|d| d.keys().cloned().collect()).unwrap_or_default())
    }

    fn read<T>(&self, f: impl FnOnce(Option<&BTreeMap<String, IndexedDocument>>) -> T) -> T {
        let guard = self.docs.read().unwrap_or_else(|e| e.into_inner());
        f(guard.as_ref())
    }

    fn write<T>(&self, f: impl FnOnce(&mut Option<BTreeMap<String, IndexedDocument>>) -> T) -> T {
        let mut guard = self.docs.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }
}

fn index_missing() -> SearchError {
    SearchError::NotFound("index 'memory'".into())
}

#[async_trait]
impl SearchBackend for MemoryIndex {
    async fn ping(&self) -> Result<String, SearchError> {
        Ok("memory".into())
    }

    async fn ensure_index(&self, _dims: usize) -> Result<bool, SearchError> {
        Ok(self.write(|docs| {
            if docs.is_some() {
                return false;
            }
            *docs = Some(BTreeMap::new());
            true
        }))
    }

    async fn bulk_index(&self, batch: &[IndexedDocument]) -> Result<BulkSummary, SearchError> {
        self.write(|docs| {
            let docs = docs.get_or_insert_with(BTreeMap::new);
            for doc in batch {
                docs.insert(doc.id.clone(), doc.clone());
            }
        });
        Ok(BulkSummary {
            indexed: batch.len(),
            failed: 0,
        })
    }

    async fn update(&self, doc: &IndexedDocument) -> Result<(), SearchError> {
        self.write(|docs| -> Result<(), SearchError> {
            let existing = docs
                .as_mut()
                .ok_or_else(index_missing)?
                .get_mut(&doc.id)
                .ok_or_else(|| SearchError::NotFound(format!("document '{}'", doc.id)))?;
            // Every field is supplied, so the merge replaces each one.
            existing.code = doc.code.clone();
            existing.name = doc.name.clone();
            existing.embedding = doc.embedding.clone();
            Ok(())
        })
    }

    async fn get(&self, id: &str) -> Result<IndexedDocument, SearchError> {
        self.read(|docs| -> Result<IndexedDocument, SearchError> {
            docs.ok_or_else(index_missing)?
                .get(id)
                .cloned()
                .ok_or_else(|| SearchError::NotFound(format!("document '{id}'")))
        })
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        self.write(|docs| -> Result<(), SearchError> {
            docs.as_mut()
                .ok_or_else(index_missing)?
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| SearchError::NotFound(format!("document '{id}'")))
        })
    }

    async fn delete_by_query(&self, query: &DeleteQuery) -> Result<u64, SearchError> {
        self.write(|docs| -> Result<u64, SearchError> {
            let docs = docs.as_mut().ok_or_else(index_missing)?;
            let before = docs.len();
            match query {
                DeleteQuery::All => docs.clear(),
                DeleteQuery::Codes(codes) => docs.retain(|_, doc| !codes.contains(&doc.code)),
            }
            Ok((before - docs.len()) as u64)
        })
    }

    async fn similar(&self, vector: &[f32], size: usize) -> Result<Vec<Recommendation>, SearchError> {
        self.read(|docs| -> Result<Vec<Recommendation>, SearchError> {
            let mut scored: Vec<Recommendation> = docs
                .ok_or_else(index_missing)?
                .values()
                .map(|doc| Recommendation {
                    id: doc.id.clone(),
                    name: doc.name.clone(),
                    score: cosine_similarity(vector, &doc.embedding) as f64 + SCORE_SHIFT,
                })
                .collect();
            scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
            scored.truncate(size);
            Ok(scored)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, code: &str, embedding: Vec<f32>) -> IndexedDocument {
        IndexedDocument {
            id: id.into(),
            code: code.into(),
            name: format!("name-{id}"),
            embedding,
        }
    }

    #[tokio::test]
    async fn missing_index_reports_not_found() {
        let index = MemoryIndex::new();
        assert_eq!(index.doc_count(), None);
        assert!(index.get("1").await.unwrap_err().is_not_found());
        assert!(index.delete("1").await.unwrap_err().is_not_found());
        assert!(index
            .delete_by_query(&DeleteQuery::All)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn bulk_creates_index_and_replaces_documents() {
        let index = MemoryIndex::new();
        index
            .bulk_index(&[doc("1", "A", vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .bulk_index(&[doc("1", "A2", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.doc_count(), Some(1));
        assert_eq!(index.get("1").await.unwrap().code, "A2");
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent() {
        let index = MemoryIndex::new();
        assert!(index.ensure_index(2).await.unwrap());
        assert!(!index.ensure_index(2).await.unwrap());
        assert_eq!(index.doc_count(), Some(0));
    }

    #[tokio::test]
    async fn delete_by_codes_keeps_others() {
        let index = MemoryIndex::new();
        index
            .bulk_index(&[
                doc("1", "A", vec![1.0]),
                doc("2", "B", vec![1.0]),
                doc("3", "C", vec![1.0]),
            ])
            .await
            .unwrap();
        let deleted = index
            .delete_by_query(&DeleteQuery::Codes(vec!["A".into(), "C".into()]))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(index.ids(), vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn similar_orders_by_shifted_cosine() {
        let index = MemoryIndex::new();
        index
            .bulk_index(&[
                doc("same", "A", vec![1.0, 0.0]),
                doc("orthogonal", "B", vec![0.0, 1.0]),
                doc("opposite", "C", vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.similar(&[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["same", "orthogonal", "opposite"]);
        assert!((hits[0].score - 2.0).abs() < 1e-6);
        assert!((hits[1].score - 1.0).abs() < 1e-6);
        assert!(hits[2].score.abs() < 1e-6);

        assert_eq!(index.similar(&[1.0, 0.0], 1).await.unwrap().len(), 1);
    }
}
