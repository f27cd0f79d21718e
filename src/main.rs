mod cli;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prodvec::config::AppConfig;

#[derive(Parser)]
#[command(name = "prodvec", version, about = "Product recommendation service over a vector index")]
struct Cli {
    /// Config file (defaults to ~/.prodvec/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Embed catalog products into the search index (all products when no codes are given)
    Reindex {
        codes: Vec<String>,
    },
    /// Print recommendations for a free-text query
    Recommend {
        query: String,
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        top_k: i64,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.prodvec/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
        Command::Reindex { codes } => cli::reindex::reindex(&config, codes).await?,
        Command::Recommend { query, top_k } => {
            cli::recommend::recommend(&config, &query, top_k).await?
        }
    }

    Ok(())
}
