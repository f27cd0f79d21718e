//! HTTP API: routing, shared state, handlers and error mapping.

pub mod error;
pub mod handlers;
pub mod schemas;

use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post, put};
use axum::Router;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::embedding::EmbeddingProvider;
use crate::search::{IndexWriter, Recommender, SearchBackend};

pub use error::ApiError;

/// Process-wide collaborators, built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub backend: Arc<dyn SearchBackend>,
    pub writer: IndexWriter,
    pub recommender: Recommender,
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        backend: Arc<dyn SearchBackend>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db,
            writer: IndexWriter::new(Arc::clone(&backend), Arc::clone(&embedding)),
            recommender: Recommender::new(Arc::clone(&backend), embedding),
            backend,
            default_top_k: config.retrieval.default_top_k,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bulk_insert/", post(handlers::bulk_insert))
        .route("/update_product/", put(handlers::update_products))
        .route("/delete_product/{product_id}", delete(handlers::delete_product))
        .route("/delete_products/", delete(handlers::delete_products))
        .route("/delete_all_products/", delete(handlers::delete_all_products))
        .route("/recommendations/{product_id}", get(handlers::recommendations_by_id))
        .route("/recommendations/query/", post(handlers::recommendations_by_query))
        .route("/health", get(handlers::health))
        .with_state(state)
}
