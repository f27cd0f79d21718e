#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use prodvec::api::AppState;
use prodvec::catalog::Product;
use prodvec::config::AppConfig;
use prodvec::db;
use prodvec::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use prodvec::search::memory::MemoryIndex;
use prodvec::search::{IndexWriter, Recommender, SearchBackend};
use rusqlite::Connection;

/// Deterministic bag-of-words embedder: each lowercase word increments one
/// FNV-1a bucket, then the vector is L2-normalized. Texts sharing words score
/// higher, which is enough to assert ranking without the ONNX model.
pub struct HashEmbedder;

fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % EMBEDDING_DIM as u64) as usize
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[bucket(&word.to_lowercase())] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// Embedder that always fails, for exercising the error path.
pub struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("model unavailable")
    }
}

/// In-memory catalog with three products:
///
/// | id | code   | name        | attribute  |
/// |----|--------|-------------|------------|
/// | 1  | SH-01  | Red Shoe    | color red  |
/// | 2  | SA-01  | Red Sandal  | color red  |
/// | 3  | LP-01  | Blue Laptop | color blue |
pub fn seeded_catalog() -> Connection {
    let conn = db::open_memory_database().unwrap();
    for (id, code, name, color) in [
        ("1", "SH-01", "Red Shoe", "red"),
        ("2", "SA-01", "Red Sandal", "red"),
        ("3", "LP-01", "Blue Laptop", "blue"),
    ] {
        db::products::upsert_product(&conn, &Product::new(id, code, name)).unwrap();
        db::products::insert_attribute(&conn, code, "color", color).unwrap();
    }
    conn
}

pub fn all_codes() -> Vec<String> {
    vec!["SH-01".into(), "SA-01".into(), "LP-01".into()]
}

pub fn embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbedder)
}

/// Writer and recommender over one shared in-memory index.
pub struct Harness {
    pub index: Arc<MemoryIndex>,
    pub writer: IndexWriter,
    pub recommender: Recommender,
}

pub fn harness() -> Harness {
    let index = Arc::new(MemoryIndex::new());
    let backend: Arc<dyn SearchBackend> = index.clone();
    Harness {
        writer: IndexWriter::new(Arc::clone(&backend), embedder()),
        recommender: Recommender::new(backend, embedder()),
        index,
    }
}

/// Router state over the seeded catalog and an empty in-memory index.
pub fn app_state() -> (AppState, Arc<MemoryIndex>) {
    let index = Arc::new(MemoryIndex::new());
    let state = AppState::new(
        Arc::new(Mutex::new(seeded_catalog())),
        index.clone(),
        embedder(),
        &AppConfig::default(),
    );
    (state, index)
}
