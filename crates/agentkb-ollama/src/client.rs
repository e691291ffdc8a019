//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::*;
use agentkb_config::OllamaConfig;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Client for interacting with Ollama's API.
///
/// Every request carries the configured timeout and fails with
/// [`OllamaError::Timeout`] when it expires.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Self::with_timeout(&config.host, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a client for `host` with an explicit request timeout.
    pub fn with_timeout(host: &str, timeout: Duration) -> OllamaResult<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(OllamaError::InvalidConfig("ollama host is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OllamaError::Http)?;

        Ok(Self {
            client,
            host: host.to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> OllamaResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, None).await?;

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if a specific model is available.
    pub async fn has_model(&self, model: &str) -> OllamaResult<bool> {
        let models = self.list_models().await?;
        // Check both exact match and model without tag
        Ok(models
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model))))
    }

    /// Generate an embedding for text.
    pub async fn embed(&self, model: &str, text: &str) -> OllamaResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.host);
        debug!(
            "Generating embedding with model {} for text length {}",
            model,
            text.len()
        );

        let request = EmbeddingRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, Some(model)).await?;

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| self.send_error(e))?;
        Ok(embedding_response.embedding)
    }

    /// Generate text (non-streaming).
    pub async fn generate(&self, request: GenerateRequest) -> OllamaResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, Some(&request.model)).await?;

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.send_error(e))?;
        Ok(generate_response)
    }

    fn send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_decode() {
            OllamaError::ParseError(e.to_string())
        } else {
            OllamaError::Http(e)
        }
    }
}

async fn check_status(response: Response, model: Option<&str>) -> OllamaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();

    if let Some(model) = model {
        if status.as_u16() == 404 || text.contains("not found") {
            return Err(OllamaError::ModelNotFound {
                model: model.to_string(),
            });
        }
    }

    Err(OllamaError::ApiError {
        status: status.as_u16(),
        message: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = OllamaConfig::default();
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
    }

    #[test]
    fn test_host_normalisation() {
        let client =
            OllamaClient::with_timeout(" http://gpu-box:11434/ ", Duration::from_secs(5)).unwrap();
        assert_eq!(client.host(), "http://gpu-box:11434");

        assert!(matches!(
            OllamaClient::with_timeout("  ", Duration::from_secs(5)),
            Err(OllamaError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        // Nothing listens on the discard port locally.
        let client =
            OllamaClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        let err = client.embed("nomic-embed-text", "hello").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
        assert!(!client.is_available().await);
    }
}
