//! Product recommendations over a dense-vector search index.
//!
//! prodvec reads products and their attributes from a SQLite catalog, embeds
//! each product's text with all-MiniLM-L6-v2 (384 dimensions), stores
//! `{id, code, name, embedding}` documents in Elasticsearch, and answers
//! "more like this" queries with a brute-force `script_score` cosine search.
//!
//! # Architecture
//!
//! - **Catalog**: SQLite via `rusqlite`, the source of truth for products
//! - **Embeddings**: local ONNX Runtime, inference on the blocking thread pool
//! - **Index**: Elasticsearch REST API (or an in-process index for development)
//! - **Transport**: JSON over HTTP with `axum`
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`catalog`]: Product records and embedding text composition
//! - [`db`]: SQLite schema, migrations and catalog queries
//! - [`embedding`]: Text-to-vector embedding via ONNX Runtime
//! - [`search`]: Search backends, index writer and recommender
//! - [`api`]: HTTP routes, request/response schemas and error mapping

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod embedding;
pub mod search;
