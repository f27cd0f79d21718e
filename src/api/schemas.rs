//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::search::Recommendation;

/// Body shared by bulk insert, update and the delete-by-codes endpoints.
///
/// An empty (or omitted) `codes` list means "all products" where that applies.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CodesRequest {
    #[serde(default)]
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Defaults to the configured `retrieval.default_top_k`.
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopKParams {
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when the search engine answers, `"degraded"` otherwise.
    pub status: String,
    pub search_engine: String,
}
