//! HTTP-based embedder using an external OpenAI-compatible service

use super::cache::{embedding_cache_key, EmbeddingCache};
use super::traits::{l2_normalize, Embedder};
use crate::config::EmbeddingServiceConfig;
use crate::error::{MedRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Embedder that calls `{url}/v1/embeddings`
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: EmbeddingServiceConfig,
    cache: EmbeddingCache,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn new(config: EmbeddingServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            cache: EmbeddingCache::new(),
        })
    }

    async fn fetch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.url.trim_end_matches('/'));
        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| MedRagError::EncodingFailure(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MedRagError::EncodingFailure(format!(
                "embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            MedRagError::EncodingFailure(format!("malformed embedding response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(MedRagError::EncodingFailure(format!(
                "expected {} embeddings, service returned {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        let mut out = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            if item.embedding.len() != self.config.dimensions {
                return Err(MedRagError::EncodingFailure(format!(
                    "expected {} dimensions, service returned {}",
                    self.config.dimensions,
                    item.embedding.len()
                )));
            }
            let mut v = item.embedding;
            l2_normalize(&mut v);
            out.push(v);
        }
        Ok(out)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| MedRagError::EncodingFailure("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = embedding_cache_key(&self.config.model, text);
            match self.cache.get(&key) {
                Some(hit) => results.push(Some(hit)),
                None => {
                    results.push(None);
                    uncached_texts.push(text.clone());
                    uncached_indices.push(i);
                }
            }
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - uncached_texts.len(),
                uncached_texts.len()
            );

            let fetched = self.fetch(&uncached_texts).await?;
            for ((idx, text), embedding) in uncached_indices
                .iter()
                .zip(uncached_texts.iter())
                .zip(fetched.into_iter())
            {
                self.cache
                    .insert(embedding_cache_key(&self.config.model, text), embedding.clone());
                results[*idx] = Some(embedding);
            }
        }

        tracing::debug!(
            "Encoded {} texts in {}ms",
            texts.len(),
            start.elapsed().as_millis()
        );

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| MedRagError::EncodingFailure("missing embedding".to_string())))
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_is_encoding_failure() {
        let config = EmbeddingServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..EmbeddingServiceConfig::default()
        };
        let embedder = HttpEmbedder::new(config).unwrap();
        let err = embedder.embed("fever").await.unwrap_err();
        assert!(matches!(err, MedRagError::EncodingFailure(_)));
    }
}
