//! Exponential backoff for transient embedding failures.

use agentkb_config::IngestionConfig;
use agentkb_ollama::OllamaResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How often and how patiently to retry a failed call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Backoff multiplier (delay *= multiplier after each retry).
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(config.embed_retries)
            .with_initial_delay(Duration::from_millis(config.retry_initial_delay_ms))
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Run `operation`, retrying only errors that `OllamaError::is_transient`
    /// reports as transient.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> OllamaResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OllamaResult<T>>,
    {
        let mut retries = 0;
        let mut delay = self.initial_delay;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if retries >= self.max_retries || !error.is_transient() {
                        return Err(error);
                    }
                    retries += 1;
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what, error, retries, self.max_retries, delay
                    );

                    sleep(delay).await;
                    delay = Duration::from_secs_f64(delay.as_secs_f64() * self.multiplier)
                        .min(self.max_delay);
                }
            }
        }
    }
}
