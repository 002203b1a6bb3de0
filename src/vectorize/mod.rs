//! Embedding backends and vector normalization.

mod hashing;
mod openai;
mod padding;
mod service;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ServiceConfig;

pub use hashing::HashingVectorizer;
pub use openai::OpenAiVectorizer;
pub use padding::{pad_vector, OverlengthPolicy, PaddingError};
pub use service::EmbeddingServiceVectorizer;

/// Turns text into a vector.
///
/// Backends are interchangeable and may produce different native
/// dimensions; callers pad the output with [`pad_vector`] before storage.
/// Errors are returned as-is, without retries.
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &'static str;

    /// Vectorize one text.
    async fn vectorize(&self, text: &str) -> Result<Vec<f32>>;
}

/// Available embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizerKind {
    /// Local hashed term-frequency vectors
    Hashing,
    /// Remote embedding service
    Service,
    /// OpenAI embeddings API
    OpenAi,
}

impl fmt::Display for VectorizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorizerKind::Hashing => write!(f, "hashing"),
            VectorizerKind::Service => write!(f, "service"),
            VectorizerKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for VectorizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" | "tfidf" => Ok(VectorizerKind::Hashing),
            "service" => Ok(VectorizerKind::Service),
            "openai" | "ada" => Ok(VectorizerKind::OpenAi),
            other => anyhow::bail!("unknown vectorizer: {other}"),
        }
    }
}

/// Build the backend selected by the configuration.
pub fn build_vectorizer(config: &ServiceConfig) -> Result<Arc<dyn Vectorizer>> {
    let vectorizer: Arc<dyn Vectorizer> = match config.vectorizer {
        VectorizerKind::Hashing => Arc::new(HashingVectorizer::new(config.hashing_dim)?),
        VectorizerKind::Service => {
            let url = config
                .embedding_service_url
                .as_deref()
                .context("EMBEDDING_SERVICE_URL is required for the service vectorizer")?;
            Arc::new(EmbeddingServiceVectorizer::new(url)?)
        }
        VectorizerKind::OpenAi => {
            let key = config
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required for the openai vectorizer")?;
            Arc::new(OpenAiVectorizer::new(key, &config.openai_embedding_model)?)
        }
    };
    Ok(vectorizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("hashing".parse::<VectorizerKind>().unwrap(), VectorizerKind::Hashing);
        assert_eq!("ADA".parse::<VectorizerKind>().unwrap(), VectorizerKind::OpenAi);
        assert!("bert".parse::<VectorizerKind>().is_err());
    }

    #[test]
    fn test_build_requires_credentials() {
        let config = ServiceConfig {
            vectorizer: VectorizerKind::OpenAi,
            ..Default::default()
        };
        assert!(build_vectorizer(&config).is_err());

        let config = ServiceConfig {
            vectorizer: VectorizerKind::Service,
            ..Default::default()
        };
        assert!(build_vectorizer(&config).is_err());

        let vectorizer = build_vectorizer(&ServiceConfig::default()).unwrap();
        assert_eq!(vectorizer.name(), "hashing");
    }
}
