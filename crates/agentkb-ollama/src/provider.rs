//! Embedding and generation capabilities.

use crate::client::OllamaClient;
use crate::error::{OllamaError, OllamaResult};
use crate::types::{GenerateOptions, GenerateRequest};
use agentkb_config::OllamaConfig;
use async_trait::async_trait;
use tracing::debug;

/// Turns text into a fixed-length vector.
///
/// Implementations must fail rather than return an empty or placeholder
/// vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>>;

    /// Name of the embedding model, for logs.
    fn model(&self) -> &str;
}

/// Produces text from a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> OllamaResult<String>;

    /// Name of the generation model, for logs.
    fn model(&self) -> &str;
}

/// [`Embedder`] backed by Ollama's embeddings endpoint.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Ok(Self::new(
            OllamaClient::from_config(config)?,
            &config.embedding_model,
        ))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        let vector = self.client.embed(&self.model, text).await?;
        validate_embedding(&vector)?;
        debug!("Embedded {} chars into {} dimensions", text.len(), vector.len());
        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// [`Generator`] backed by Ollama's generate endpoint.
#[derive(Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Ok(Self::new(
            OllamaClient::from_config(config)?,
            &config.model,
            config.temperature,
        ))
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> OllamaResult<String> {
        let request = GenerateRequest::new(&self.model, prompt)
            .with_options(GenerateOptions::new().with_temperature(self.temperature));

        let response = self.client.generate(request).await?;
        Ok(response.response.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn validate_embedding(vector: &[f32]) -> OllamaResult<()> {
    if vector.is_empty() {
        return Err(OllamaError::ParseError(
            "embedding response contained no values".to_string(),
        ));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(OllamaError::ParseError(
            "embedding contains non-finite values".to_string(),
        ));
    }
    if vector.iter().all(|v| *v == 0.0) {
        return Err(OllamaError::ParseError(
            "embedding is an all-zero vector".to_string(),
        ));
    }
    Ok(())
}
