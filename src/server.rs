//! HTTP server startup: builds the shared state and runs the axum router.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use prodvec::api::{self, AppState};
use prodvec::config::AppConfig;
use prodvec::embedding::{self, EmbeddingProvider};
use prodvec::search::{self, SearchBackend};
use prodvec::db;

/// Everything a request handler or CLI command needs, constructed once.
pub struct Services {
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub backend: Arc<dyn SearchBackend>,
    pub embedding: Arc<dyn EmbeddingProvider>,
}

/// Open the catalog, connect to the search engine, and load the embedding model.
pub async fn setup_services(config: &AppConfig) -> Result<Services> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "catalog database ready");

    let backend = search::create_backend(&config.search)?;
    match backend.ping().await {
        Ok(version) => tracing::info!(
            backend = %config.search.backend,
            url = %config.search.url,
            version = %version,
            "search engine reachable"
        ),
        Err(e) => tracing::warn!(url = %config.search.url, error = %e, "search engine not reachable at startup"),
    }

    let embedding = embedding::create_provider(&config.embedding)?;
    tracing::info!(model = %config.embedding.model, "embedding provider ready");

    match backend.ensure_index(embedding.dimensions()).await {
        Ok(true) => tracing::info!(index = %config.search.index, "created search index"),
        Ok(false) => tracing::debug!(index = %config.search.index, "search index exists"),
        Err(e) => tracing::warn!(index = %config.search.index, error = %e, "could not verify search index"),
    }

    Ok(Services {
        db: Arc::new(Mutex::new(conn)),
        backend,
        embedding,
    })
}

pub async fn serve(config: AppConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let services = setup_services(&config).await?;
    let state = AppState::new(services.db, services.backend, services.embedding, &config);
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "prodvec listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
