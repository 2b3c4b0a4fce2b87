//! Text embeddings via the hosted `/embeddings` endpoint.

use crate::chunking::ChunkedDocument;
use crate::config::AssistantConfig;
use crate::errors::resilience::{retry_with_backoff, RetryConfig};
use crate::errors::Result;
use crate::llm::post_json;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};

/// Anything that maps text to a dense vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn embed(&self, input: &str) -> Result<Vec<f32>>;
}

/// OpenAI-compatible embeddings provider
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AssistantConfig) -> Self {
        Self::new(client, &config.base_url, &config.api_key, &config.embedding_model)
    }

    /// Same endpoint, different model (an index records the model it was built with)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        let payload = json!({ "model": self.model, "input": input });
        let url = format!("{}/embeddings", self.base_url);
        let body = post_json(&self.client, &url, &self.api_key, &payload).await?;
        parse_embedding_response(&body)
    }
}

/// Pull `data[0].embedding` out of an embeddings response
pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>> {
    let v: Value = serde_json::from_str(body)?;
    let values = v["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| crate::api_error!("response contained no embedding"))?;

    let embedding: Vec<f32> = values
        .iter()
        .filter_map(|x| x.as_f64())
        .map(|x| x as f32)
        .collect();

    if embedding.is_empty() || embedding.len() != values.len() {
        return Err(crate::vector_error!(
            "embedding had {} usable values out of {}",
            embedding.len(),
            values.len()
        ));
    }
    Ok(embedding)
}

/// Embed every document in order. All vectors must share one dimension.
pub async fn create_embeddings(
    docs: &[ChunkedDocument],
    provider: &dyn EmbeddingProvider,
    retry: &RetryConfig,
) -> Result<Vec<Vec<f32>>> {
    let total = docs.len();
    log::info!("Creating embeddings for {} documents with {}", total, provider.model());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Embedding [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(total);
    for (i, doc) in docs.iter().enumerate() {
        let position = i + 1;
        if position % 100 == 0 {
            log::info!("Processing document {}/{}", position, total);
        }

        let embedding = retry_with_backoff("create embedding", retry, || {
            provider.embed(&doc.description)
        })
        .await?;

        if let Some(first) = embeddings.first() {
            if first.len() != embedding.len() {
                pb.abandon();
                return Err(crate::validation_error!(
                    "embedding dimension",
                    embedding.len(),
                    first.len()
                ));
            }
        }
        embeddings.push(embedding);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(embeddings)
}
