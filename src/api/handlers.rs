use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;

use super::error::ApiError;
use super::schemas::{
    CodesRequest, HealthResponse, MessageResponse, QueryRequest, RecommendationsResponse,
    TopKParams,
};
use super::AppState;
use crate::catalog::ProductBatch;
use crate::search::TopK;

/// Load products and attributes for `codes` (all when empty) off the async runtime.
async fn load_batch(state: &AppState, codes: Vec<String>) -> Result<ProductBatch, ApiError> {
    let db = Arc::clone(&state.db);
    let batch = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        crate::db::products::load_batch(&conn, &codes)
    })
    .await??;
    Ok(batch)
}

fn resolve_top_k(requested: Option<i64>, default: usize) -> Result<TopK, ApiError> {
    let value = requested.unwrap_or(default as i64);
    TopK::new(value).map_err(ApiError::Validation)
}

pub async fn bulk_insert(
    State(state): State<AppState>,
    Json(request): Json<CodesRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let started = Instant::now();
    let replace_all = request.codes.is_empty();
    tracing::info!(codes = request.codes.len(), replace_all, "bulk_insert called");

    let batch = load_batch(&state, request.codes).await?;
    let report = state.writer.upsert_all(&batch, replace_all).await?;

    tracing::info!(
        ?report,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bulk_insert finished"
    );
    Ok(Json(MessageResponse::new("Bulk insert successful")))
}

pub async fn update_products(
    State(state): State<AppState>,
    Json(request): Json<CodesRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!(codes = request.codes.len(), "update_product called");
    let batch = load_batch(&state, request.codes).await?;
    state.writer.update_batch(&batch).await?;
    Ok(Json(MessageResponse::new("Product updated successfully")))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Json<MessageResponse> {
    tracing::info!(id = %product_id, "delete_product called");
    state.writer.delete_one(&product_id).await;
    Json(MessageResponse::new("Product deleted successfully"))
}

pub async fn delete_products(
    State(state): State<AppState>,
    Json(request): Json<CodesRequest>,
) -> Json<MessageResponse> {
    tracing::info!(codes = request.codes.len(), "delete_products called");
    state.writer.delete_many(&request.codes).await;
    Json(MessageResponse::new("Products deleted successfully"))
}

/// Wipes the index. Any request body is accepted and ignored.
pub async fn delete_all_products(State(state): State<AppState>) -> Json<MessageResponse> {
    tracing::info!("delete_all_products called");
    state.writer.delete_all().await;
    Json(MessageResponse::new("Products deleted successfully"))
}

pub async fn recommendations_by_id(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(params): Query<TopKParams>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let top_k = resolve_top_k(params.top_k, state.default_top_k)?;
    tracing::info!(id = %product_id, top_k = top_k.get(), "recommendations by id");
    let recommendations = state.recommender.recommend_by_id(&product_id, top_k).await?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn recommendations_by_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let top_k = resolve_top_k(request.top_k, state.default_top_k)?;
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".into()));
    }
    tracing::info!(query_len = request.query.len(), top_k = top_k.get(), "recommendations by query");
    let recommendations = state
        .recommender
        .recommend_by_query(&request.query, top_k)
        .await?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.backend.ping().await {
        Ok(version) => HealthResponse {
            status: "ok".into(),
            search_engine: version,
        },
        Err(e) => {
            tracing::warn!(error = %e, "search engine health check failed");
            HealthResponse {
                status: "degraded".into(),
                search_engine: e.to_string(),
            }
        }
    };
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_falls_back_to_default() {
        assert_eq!(resolve_top_k(None, 5).unwrap().get(), 5);
        assert_eq!(resolve_top_k(Some(2), 5).unwrap().get(), 2);
        assert!(matches!(resolve_top_k(Some(0), 5), Err(ApiError::Validation(_))));
        assert!(matches!(resolve_top_k(Some(-1), 5), Err(ApiError::Validation(_))));
    }
}
