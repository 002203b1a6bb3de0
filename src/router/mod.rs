//! Chunking strategy router.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunkers::{Chunker, SentenceWindowChunker, TokenWindowChunker};
use crate::types::{Chunk, ChunkConfig, Page};

/// Named chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Token-bounded windows with a character overlap tail (canonical)
    TokenWindow,
    /// Fixed sentence counts with sentence overlap
    SentenceWindow,
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkingStrategy::TokenWindow => write!(f, "token_window"),
            ChunkingStrategy::SentenceWindow => write!(f, "sentence_window"),
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token_window" | "token" => Ok(ChunkingStrategy::TokenWindow),
            "sentence_window" | "sentence" => Ok(ChunkingStrategy::SentenceWindow),
            other => anyhow::bail!("unknown chunking strategy: {other}"),
        }
    }
}

/// Router that selects a chunker by strategy name.
///
/// Both strategies live behind the [`Chunker`] trait; their logic is kept
/// apart rather than merged.
pub struct ChunkingRouter {
    /// Token-window chunker (canonical)
    token_window: Arc<TokenWindowChunker>,
    /// Sentence-window chunker (variant)
    sentence_window: Arc<SentenceWindowChunker>,
    /// Strategy used when none is requested
    default_strategy: ChunkingStrategy,
    /// Chunk budgets
    config: ChunkConfig,
}

impl ChunkingRouter {
    /// Create a router with the default budgets.
    pub fn new(default_strategy: ChunkingStrategy) -> Self {
        Self::with_config(default_strategy, ChunkConfig::default())
    }

    /// Create a router with custom budgets.
    pub fn with_config(default_strategy: ChunkingStrategy, config: ChunkConfig) -> Self {
        Self {
            token_window: Arc::new(TokenWindowChunker::new()),
            sentence_window: Arc::new(SentenceWindowChunker::new()),
            default_strategy,
            config,
        }
    }

    /// Get the chunker for a strategy.
    pub fn get_chunker(&self, strategy: ChunkingStrategy) -> Arc<dyn Chunker> {
        match strategy {
            ChunkingStrategy::TokenWindow => self.token_window.clone(),
            ChunkingStrategy::SentenceWindow => self.sentence_window.clone(),
        }
    }

    pub fn default_strategy(&self) -> ChunkingStrategy {
        self.default_strategy
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunk pages with the given strategy, or the default one.
    pub fn chunk(&self, pages: &[Page], strategy: Option<ChunkingStrategy>) -> Result<Vec<Chunk>> {
        let strategy = strategy.unwrap_or(self.default_strategy);
        let chunker = self.get_chunker(strategy);

        info!(
            chunker = chunker.name(),
            pages = pages.len(),
            "Chunking document"
        );

        chunker.chunk(pages, &self.config)
    }

    /// List all available chunkers.
    pub fn list_chunkers(&self) -> Vec<(&'static str, &'static str)> {
        [ChunkingStrategy::TokenWindow, ChunkingStrategy::SentenceWindow]
            .into_iter()
            .map(|s| {
                let chunker = self.get_chunker(s);
                (chunker.name(), chunker.description())
            })
            .collect()
    }
}

impl Default for ChunkingRouter {
    fn default() -> Self {
        Self::new(ChunkingStrategy::TokenWindow)
    }
}
