//! Embedding encoders
//!
//! Provides the [`Embedder`] trait consumed by the retriever and two encoders:
//! - an HTTP client for OpenAI-compatible embedding services (vLLM, TEI, OpenAI)
//! - a deterministic feature-hashing encoder for offline use

mod cache;
mod hashing;
mod http;
mod traits;

pub use cache::{embedding_cache_key, CacheStats, EmbeddingCache};
pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;
pub use traits::*;

use crate::config::{EmbeddingProvider, EmbeddingServiceConfig};
use crate::error::Result;
use std::sync::Arc;

/// Construct the encoder selected by configuration
pub fn embedder_from_config(config: &EmbeddingServiceConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(config.clone())?)),
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
    }
}
