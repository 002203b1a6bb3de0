//! HTTP client for a remote embedding service.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Vectorizer;

/// Vectorizer backed by an embedding service exposing `POST /embed`.
pub struct EmbeddingServiceVectorizer {
    client: Client,
    base_url: String,
}

/// Request payload for one embedding.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

/// Response from the embedding service.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl EmbeddingServiceVectorizer {
    /// Create a new embedding service client.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the embedding service is healthy.
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl Vectorizer for EmbeddingServiceVectorizer {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn vectorize(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { input: text })
            .send()
            .await?;

        if response.status().is_success() {
            let result: EmbedResponse = response.json().await?;
            debug!(dimension = result.embedding.len(), "Embedding received");
            Ok(result.embedding)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(anyhow::anyhow!(
                "Embedding service returned {}: {}",
                status,
                text
            ))
        }
    }
}
