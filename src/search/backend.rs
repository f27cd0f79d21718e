use async_trait::async_trait;

use super::{BulkSummary, DeleteQuery, IndexedDocument, Recommendation, SearchError};

/// The search-engine operations the service depends on.
///
/// Every method addresses the single product index the backend was built
/// for. A missing index or document is reported as [`SearchError::NotFound`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Cluster version string, used as a startup and health check.
    async fn ping(&self) -> Result<String, SearchError>;

    /// Create the index with a `dense_vector` mapping of `dims` if it is missing.
    /// Returns `true` when the index was created by this call.
    async fn ensure_index(&self, dims: usize) -> Result<bool, SearchError>;

    /// Full-document replace of every document in one bulk request.
    async fn bulk_index(&self, docs: &[IndexedDocument]) -> Result<BulkSummary, SearchError>;

    /// Partial merge of `doc` into the existing document with the same id.
    async fn update(&self, doc: &IndexedDocument) -> Result<(), SearchError>;

    async fn get(&self, id: &str) -> Result<IndexedDocument, SearchError>;

    async fn delete(&self, id: &str) -> Result<(), SearchError>;

    /// Returns the number of documents deleted.
    async fn delete_by_query(&self, query: &DeleteQuery) -> Result<u64, SearchError>;

    /// Top `size` documents by `cosineSimilarity(vector, embedding) + 1.0`, best first.
    async fn similar(&self, vector: &[f32], size: usize) -> Result<Vec<Recommendation>, SearchError>;
}
