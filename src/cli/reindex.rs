//! CLI `reindex` command: the bulk insert path, run from the terminal.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use prodvec::config::AppConfig;
use prodvec::search::{IndexWriter, WriteReport};

/// Embed and index the given product codes, or rebuild the whole index when none are given.
pub async fn reindex(config: &AppConfig, codes: Vec<String>) -> Result<()> {
    let services = crate::server::setup_services(config).await?;
    let writer = IndexWriter::new(services.backend, services.embedding);

    println!(
        "Indexing into '{}'{}...",
        config.search.index,
        if codes.is_empty() { " (full rebuild)" } else { "" }
    );

    match index_codes(services.db, &writer, codes).await? {
        Some(report) => println!(
            "Indexed {} of {} product(s), {} failed.",
            report.succeeded, report.attempted, report.failed
        ),
        None => println!("No matching products in the catalog."),
    }
    Ok(())
}

/// Load `codes` (all when empty) and upsert them. A full rebuild always runs,
/// so an empty catalog empties the index. Returns `None` when a code subset
/// matched nothing and no write was made.
async fn index_codes(
    db: Arc<Mutex<Connection>>,
    writer: &IndexWriter,
    codes: Vec<String>,
) -> Result<Option<WriteReport>> {
    let replace_all = codes.is_empty();
    let batch = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        prodvec::db::products::load_batch(&conn, &codes)
    })
    .await?
    .context("failed to load products")?;

    if batch.products.is_empty() && !replace_all {
        return Ok(None);
    }
    Ok(Some(writer.upsert_all(&batch, replace_all).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodvec::catalog::Product;
    use prodvec::embedding::EmbeddingProvider;
    use prodvec::search::memory::MemoryIndex;
    use prodvec::search::{IndexedDocument, SearchBackend};

    struct ConstantEmbedder;

    impl EmbeddingProvider for ConstantEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 4])
        }
    }

    async fn stale_index() -> Arc<MemoryIndex> {
        let index = Arc::new(MemoryIndex::new());
        index
            .bulk_index(&[IndexedDocument {
                id: "old".into(),
                code: "OLD-01".into(),
                name: "Removed Product".into(),
                embedding: vec![1.0; 4],
            }])
            .await
            .unwrap();
        index
    }

    fn db(conn: Connection) -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(conn))
    }

    #[tokio::test]
    async fn full_rebuild_of_empty_catalog_empties_index() {
        let index = stale_index().await;
        let writer = IndexWriter::new(index.clone(), Arc::new(ConstantEmbedder));
        let conn = prodvec::db::open_memory_database().unwrap();

        let report = index_codes(db(conn), &writer, vec![]).await.unwrap();
        assert_eq!(report.map(|r| r.attempted), Some(0));
        assert_eq!(index.doc_count(), Some(0));
    }

    #[tokio::test]
    async fn unmatched_codes_leave_index_alone() {
        let index = stale_index().await;
        let writer = IndexWriter::new(index.clone(), Arc::new(ConstantEmbedder));
        let conn = prodvec::db::open_memory_database().unwrap();
        prodvec::db::products::upsert_product(&conn, &Product::new("1", "SH-01", "Red Shoe")).unwrap();

        let report = index_codes(db(conn), &writer, vec!["NOPE".into()]).await.unwrap();
        assert!(report.is_none());
        assert_eq!(index.ids(), vec!["old"]);
    }

    #[tokio::test]
    async fn full_rebuild_replaces_stale_documents() {
        let index = stale_index().await;
        let writer = IndexWriter::new(index.clone(), Arc::new(ConstantEmbedder));
        let conn = prodvec::db::open_memory_database().unwrap();
        prodvec::db::products::upsert_product(&conn, &Product::new("1", "SH-01", "Red Shoe")).unwrap();

        let report = index_codes(db(conn), &writer, vec![]).await.unwrap().unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(index.ids(), vec!["1"]);
    }
}
