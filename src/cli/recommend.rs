use anyhow::Result;

use prodvec::config::AppConfig;
use prodvec::search::{Recommender, TopK};

/// Print recommendations for a free-text query.
pub async fn recommend(config: &AppConfig, query: &str, top_k: i64) -> Result<()> {
    let top_k = TopK::new(top_k).map_err(anyhow::Error::msg)?;
    let services = crate::server::setup_services(config).await?;
    let recommender = Recommender::new(services.backend, services.embedding);

    let results = recommender.recommend_by_query(query, top_k).await?;
    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, rec) in results.iter().enumerate() {
        println!("  {}. {} [{}] (score: {:.4})", i + 1, rec.name, rec.id, rec.score);
    }
    Ok(())
}
