//! Elasticsearch request bodies.

use serde_json::{json, Value};

use super::{DeleteQuery, IndexedDocument};

/// Painless source for the shifted cosine score. The `+ 1.0` keeps scores non-negative.
pub const COSINE_SCRIPT: &str = "cosineSimilarity(params.query_vector, 'embedding') + 1.0";

/// Shift applied to raw cosine similarity by [`COSINE_SCRIPT`].
pub const SCORE_SHIFT: f64 = 1.0;

/// Brute-force scored search over every document.
pub fn script_score(vector: &[f32], size: usize) -> Value {
    json!({
        "query": {
            "script_score": {
                "query": {"match_all": {}},
                "script": {
                    "source": COSINE_SCRIPT,
                    "params": {"query_vector": vector}
                }
            }
        },
        "size": size,
        "_source": ["name"]
    })
}

pub fn delete_query(query: &DeleteQuery) -> Value {
    match query {
        DeleteQuery::All => json!({"query": {"match_all": {}}}),
        DeleteQuery::Codes(codes) => json!({"query": {"terms": {"code": codes}}}),
    }
}

/// Index settings and mappings for the product index.
pub fn index_mapping(dims: usize) -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "code": {"type": "keyword"},
                "name": {"type": "text"},
                "embedding": {"type": "dense_vector", "dims": dims}
            }
        }
    })
}

/// Newline-delimited bulk body with one unconditional `index` action per document.
pub fn bulk_index_body(index: &str, docs: &[IndexedDocument]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({"index": {"_index": index, "_id": doc.id}});
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

pub fn partial_update(doc: &IndexedDocument) -> Value {
    json!({"doc": doc})
}
