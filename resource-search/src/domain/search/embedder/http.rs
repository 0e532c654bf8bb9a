//! Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
//!
//! Works with hosted APIs as well as self-hosted inference servers serving
//! sentence-transformer models such as `all-MiniLM-L6-v2`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EmbeddingSettings;
use crate::domain::search::traits::{Embedder, ProviderFactory, Result, SearchError};

const WARM_UP_TEXT: &str = "warm-up";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedder implementation calling a remote inference endpoint over HTTP.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{}", settings.api_base.trim_end_matches('/'), settings.path),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            dimensions: settings.dimensions,
        })
    }

    /// Build the client and confirm the endpoint answers with vectors of the
    /// configured size.
    pub async fn connect(settings: &EmbeddingSettings) -> Result<Self> {
        let embedder = Self::new(settings)?;
        let probe = embedder.embed(WARM_UP_TEXT).await?;
        debug!(dimensions = probe.len(), "Embedding endpoint answered warm-up probe");
        Ok(embedder)
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let vectors = into_ordered_vectors(response);
        if vectors.len() != texts.len() {
            return Err(SearchError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        for vector in &vectors {
            validate(vector, self.dimensions)?;
        }

        Ok(vectors)
    }
}

fn into_ordered_vectors(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut indexed: Vec<(usize, Vec<f32>)> = response
        .data
        .into_iter()
        .enumerate()
        .map(|(fallback, item)| (item.index.unwrap_or(fallback), item.embedding))
        .collect();

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vector)| vector).collect()
}

fn validate(vector: &[f32], dimensions: usize) -> Result<()> {
    if vector.len() != dimensions {
        return Err(SearchError::embedding(
            SearchError::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            }
            .to_string(),
        ));
    }

    if vector.iter().any(|x| !x.is_finite()) {
        return Err(SearchError::embedding("embedding contains non-finite values"));
    }

    Ok(())
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(SearchError::embedding("cannot embed empty text"));
        }

        let mut vectors = self.request(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| SearchError::embedding("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(SearchError::embedding("cannot embed empty text"));
        }

        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Creates [`HttpEmbedder`]s for the provider loader.
pub struct HttpProviderFactory {
    settings: EmbeddingSettings,
}

impl HttpProviderFactory {
    pub fn new(settings: EmbeddingSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ProviderFactory for HttpProviderFactory {
    async fn create(&self) -> Result<Arc<dyn Embedder>> {
        info!(
            model = %self.settings.model,
            dimensions = self.settings.dimensions,
            "Connecting to embedding endpoint"
        );
        let embedder = HttpEmbedder::connect(&self.settings).await?;
        Ok(Arc::new(embedder))
    }
}
