use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::IndexConfig;
use crate::llm::embeddings::Embedder;
use crate::models::Passage;

/// Similarity-search capability. Results come back best-first, at most `k`.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Qdrant collection whose points carry passage text in their payload.
pub struct QdrantIndex {
    client: reqwest::Client,
    config: IndexConfig,
    embedder: Arc<dyn Embedder>,
}

impl QdrantIndex {
    pub fn new(client: reqwest::Client, config: IndexConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            client,
            config,
            embedder,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[async_trait]
impl SimilaritySearch for QdrantIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query for vector search")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.config.url.trim_end_matches('/'),
            self.config.collection
        );

        let mut req = self.client.post(&url).json(&SearchRequest {
            vector: &vector,
            limit: k,
            with_payload: true,
        });
        if let Some(key) = self.config.api_key.as_deref() {
            req = req.header("api-key", key);
        }

        let resp = req.send().await.context("Failed to call Qdrant search API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant search API returned {status}: {body}");
        }

        let body: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse Qdrant search response")?;

        Ok(points_to_passages(body.result, &self.config.content_key, k))
    }
}

/// Convert scored points to passages, preserving order. Points without text are skipped.
fn points_to_passages(points: Vec<ScoredPoint>, content_key: &str, k: usize) -> Vec<Passage> {
    points
        .into_iter()
        .filter_map(|point| {
            let mut payload = point.payload.unwrap_or_default();
            let content = match payload.remove(content_key) {
                Some(Value::String(s)) => s,
                _ => {
                    tracing::warn!("Skipping Qdrant point without a '{content_key}' string");
                    return None;
                }
            };
            let metadata = match payload.remove("metadata") {
                Some(Value::Object(m)) => m,
                _ => payload,
            };
            Some(Passage {
                content,
                metadata,
                score: Some(point.score),
            })
        })
        .take(k)
        .collect()
}
