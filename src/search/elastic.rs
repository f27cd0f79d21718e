//! Elasticsearch backend over the REST API.
//!
//! One [`reqwest::Client`] per process, built from [`SearchConfig`]: API-key or
//! basic auth, optional custom CA, certificate verification toggle, request
//! timeout. Timed-out requests are retried up to `max_retries` times.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::backend::SearchBackend;
use super::{query, BulkSummary, DeleteQuery, IndexedDocument, Recommendation, SearchError};
use crate::config::SearchConfig;

pub struct ElasticClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
    /// `(username, password)` when no API key is configured.
    basic_auth: Option<(String, String)>,
    max_retries: usize,
}

impl ElasticClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        anyhow::ensure!(
            config.url.starts_with("http://") || config.url.starts_with("https://"),
            "search url must be an http(s) URL, got {}",
            config.url
        );
        anyhow::ensure!(!config.index.trim().is_empty(), "search index name must not be empty");

        let mut headers = HeaderMap::new();
        let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty());
        if let Some(key) = api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("ApiKey {}", key.trim()))
                    .context("invalid Elasticsearch API key")?,
            );
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_certs);

        if let Some(path) = config.ca_cert_path.as_deref() {
            let path = crate::config::expand_tilde(path);
            if path.exists() {
                let pem = std::fs::read(&path)
                    .with_context(|| format!("failed to read CA certificate {}", path.display()))?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .with_context(|| format!("invalid CA certificate {}", path.display()))?;
                builder = builder.add_root_certificate(cert);
            } else {
                tracing::debug!(path = %path.display(), "CA certificate not present, using system roots");
            }
        }

        let client = builder
            .build()
            .context("failed to build Elasticsearch HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            basic_auth: api_key
                .is_none()
                .then(|| (config.username.clone(), config.password.clone())),
            max_retries: config.max_retries,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));
        match &self.basic_auth {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// Send with retry on timeout. `build` is called once per attempt.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, SearchError> {
        let mut attempt = 0usize;
        loop {
            match build().send().await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_timeout() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, max = self.max_retries, "search request timed out, retrying");
                }
                Err(err) => return Err(SearchError::Transport(err)),
            }
        }
    }

    /// Map non-2xx statuses: 404 → [`SearchError::NotFound`], others → [`SearchError::Status`].
    async fn check(resp: Response, what: impl Into<String>) -> Result<Response, SearchError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SearchError::NotFound(what.into()));
        }
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, SearchError> {
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SearchError::Decode(e.to_string()))
    }

    /// `{index}/{endpoint}/{id}` with the id percent-encoded as a single path segment.
    fn doc_path(&self, endpoint: &str, id: &str) -> Result<String, SearchError> {
        Ok(format!("{}/{endpoint}/{}", self.index, encode_id(id)?))
    }

    fn index_missing(&self) -> String {
        format!("index '{}'", self.index)
    }
}

#[derive(Deserialize)]
struct InfoResponse {
    version: InfoVersion,
}

#[derive(Deserialize)]
struct InfoVersion {
    number: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<IndexedDocument>,
}

#[derive(Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Deserialize, Default)]
struct HitSource {
    #[serde(default)]
    name: String,
}

/// Percent-encode a document id for use as one URL path segment.
///
/// URL parsing resolves `.` and `..` segments (encoded or not), so those ids,
/// and the empty id, cannot address a document over the REST API.
fn encode_id(id: &str) -> Result<String, SearchError> {
    if matches!(id, "" | "." | "..") {
        return Err(SearchError::NotFound(format!("document '{id}'")));
    }
    Ok(urlencoding::encode(id).into_owned())
}

/// Count failed items in a bulk response. Each item is `{"<op>": {"status": ..}}`.
fn count_bulk_failures(items: &[Value]) -> usize {
    items
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .filter(|result| {
            result.get("error").is_some()
                || result
                    .get("status")
                    .and_then(Value::as_u64)
                    .is_some_and(|s| s >= 300)
        })
        .count()
}

#[async_trait]
impl SearchBackend for ElasticClient {
    async fn ping(&self) -> Result<String, SearchError> {
        let resp = self.send(|| self.request(Method::GET, "/")).await?;
        let resp = Self::check(resp, "cluster info").await?;
        let info: InfoResponse = Self::decode(resp).await?;
        Ok(info.version.number)
    }

    async fn ensure_index(&self, dims: usize) -> Result<bool, SearchError> {
        let resp = self.send(|| self.request(Method::HEAD, &self.index)).await?;
        match resp.status() {
            s if s.is_success() => return Ok(false),
            StatusCode::NOT_FOUND => {}
            s => {
                return Err(SearchError::Status {
                    status: s.as_u16(),
                    body: String::new(),
                })
            }
        }

        let mapping = query::index_mapping(dims);
        let resp = self
            .send(|| self.request(Method::PUT, &self.index).json(&mapping))
            .await?;
        Self::check(resp, self.index_missing()).await?;
        tracing::info!(index = %self.index, dims, "search index created");
        Ok(true)
    }

    async fn bulk_index(&self, docs: &[IndexedDocument]) -> Result<BulkSummary, SearchError> {
        if docs.is_empty() {
            return Ok(BulkSummary::default());
        }
        let body = query::bulk_index_body(&self.index, docs)
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        let resp = self
            .send(|| {
                self.request(Method::POST, "/_bulk?refresh=wait_for")
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body.clone())
            })
            .await?;
        let resp = Self::check(resp, "bulk endpoint").await?;
        let bulk: BulkResponse = Self::decode(resp).await?;

        let failed = if bulk.errors {
            count_bulk_failures(&bulk.items)
        } else {
            0
        };
        Ok(BulkSummary {
            indexed: docs.len().saturating_sub(failed),
            failed,
        })
    }

    async fn update(&self, doc: &IndexedDocument) -> Result<(), SearchError> {
        let path = self.doc_path("_update", &doc.id)?;
        let body = query::partial_update(doc);
        let resp = self
            .send(|| self.request(Method::POST, &path).json(&body))
            .await?;
        Self::check(resp, format!("document '{}'", doc.id)).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<IndexedDocument, SearchError> {
        let path = self.doc_path("_doc", id)?;
        let resp = self.send(|| self.request(Method::GET, &path)).await?;
        let resp = Self::check(resp, format!("document '{id}'")).await?;
        let got: GetResponse = Self::decode(resp).await?;
        match got.source {
            Some(doc) if got.found => Ok(doc),
            _ => Err(SearchError::NotFound(format!("document '{id}'"))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        let path = self.doc_path("_doc", id)?;
        let resp = self.send(|| self.request(Method::DELETE, &path)).await?;
        Self::check(resp, format!("document '{id}'")).await?;
        Ok(())
    }

    async fn delete_by_query(&self, query: &DeleteQuery) -> Result<u64, SearchError> {
        // Version conflicts must not abort a wipe, and the next read must see it.
        let path = format!("{}/_delete_by_query?conflicts=proceed&refresh=true", self.index);
        let body = query::delete_query(query);
        let resp = self
            .send(|| self.request(Method::POST, &path).json(&body))
            .await?;
        let resp = Self::check(resp, self.index_missing()).await?;
        let deleted: DeleteByQueryResponse = Self::decode(resp).await?;
        Ok(deleted.deleted)
    }

    async fn similar(&self, vector: &[f32], size: usize) -> Result<Vec<Recommendation>, SearchError> {
        let path = format!("{}/_search", self.index);
        let body = query::script_score(vector, size);
        let resp = self
            .send(|| self.request(Method::POST, &path).json(&body))
            .await?;
        let resp = Self::check(resp, self.index_missing()).await?;
        let found: SearchResponse = Self::decode(resp).await?;
        Ok(found
            .hits
            .hits
            .into_iter()
            .map(|hit| Recommendation {
                id: hit.id,
                name: hit.source.name,
                score: hit.score.unwrap_or(0.0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_http_url() {
        let config = SearchConfig {
            url: "localhost:9200".into(),
            ..Default::default()
        };
        assert!(ElasticClient::new(&config).is_err());
    }

    #[test]
    fn api_key_disables_basic_auth() {
        let config = SearchConfig {
            api_key: Some("abc123".into()),
            ..Default::default()
        };
        let client = ElasticClient::new(&config).unwrap();
        assert!(client.basic_auth.is_none());

        let client = ElasticClient::new(&SearchConfig::default()).unwrap();
        assert_eq!(
            client.basic_auth,
            Some(("elastic".to_string(), "changeme".to_string()))
        );
    }

    #[test]
    fn ids_are_encoded_as_one_segment() {
        assert_eq!(encode_id("SKU-1_a.b~c").unwrap(), "SKU-1_a.b~c");
        assert_eq!(encode_id("abc#1").unwrap(), "abc%231");
        assert_eq!(encode_id("a/b").unwrap(), "a%2Fb");
        assert_eq!(encode_id("a?x=1").unwrap(), "a%3Fx%3D1");
        assert_eq!(encode_id("red shoe").unwrap(), "red%20shoe");
        for id in ["", ".", ".."] {
            assert!(encode_id(id).unwrap_err().is_not_found(), "{id:?} must not reach the engine");
        }
    }

    #[test]
    fn bulk_failures_are_counted_per_item() {
        let items = vec![
            json!({"index": {"_id": "1", "status": 201}}),
            json!({"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}}),
            json!({"index": {"_id": "3", "status": 429}}),
        ];
        assert_eq!(count_bulk_failures(&items), 2);
    }
}
