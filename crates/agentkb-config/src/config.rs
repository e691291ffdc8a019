//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl Config {
    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Apply `general.data_dir`, if set, to the given paths.
    pub fn resolve_paths(&self, paths: AppPaths) -> AppPaths {
        match &self.general.data_dir {
            Some(dir) => paths.with_data_dir(dir),
            None => paths,
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if !(1..=MAX_TOP_K).contains(&self.retrieval.top_k) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }
        if let Some(min) = self.retrieval.min_similarity {
            if !(-1.0..=1.0).contains(&min) {
                return Err(ConfigError::Invalid(
                    "retrieval.min_similarity must be between -1.0 and 1.0".to_string(),
                ));
            }
        }
        if self.ingestion.max_concurrent_jobs == 0
            || self.ingestion.queue_capacity == 0
            || self.ingestion.embed_concurrency == 0
        {
            return Err(ConfigError::Invalid(
                "ingestion concurrency and capacity settings must be at least 1".to_string(),
            ));
        }
        if self.ollama.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "ollama.timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set a single value addressed by a dotted key such as `ollama.model`.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["general", "data_dir"] => self.general.data_dir = Some(value.to_string()),
            ["ollama", "host"] => self.ollama.host = value.to_string(),
            ["ollama", "model"] => self.ollama.model = value.to_string(),
            ["ollama", "embedding_model"] => self.ollama.embedding_model = value.to_string(),
            ["ollama", "timeout_seconds"] => self.ollama.timeout_seconds = parse(key, value)?,
            ["ollama", "temperature"] => self.ollama.temperature = parse(key, value)?,
            ["chunking", "chunk_size"] => self.chunking.chunk_size = parse(key, value)?,
            ["chunking", "chunk_overlap"] => self.chunking.chunk_overlap = parse(key, value)?,
            ["retrieval", "top_k"] => self.retrieval.top_k = parse(key, value)?,
            ["retrieval", "min_similarity"] => {
                self.retrieval.min_similarity = match value {
                    "" | "none" => None,
                    v => Some(parse(key, v)?),
                }
            }
            ["ingestion", "max_concurrent_jobs"] => {
                self.ingestion.max_concurrent_jobs = parse(key, value)?
            }
            ["ingestion", "queue_capacity"] => self.ingestion.queue_capacity = parse(key, value)?,
            ["ingestion", "embed_concurrency"] => {
                self.ingestion.embed_concurrency = parse(key, value)?
            }
            ["ingestion", "embed_retries"] => self.ingestion.embed_retries = parse(key, value)?,
            ["ingestion", "retry_initial_delay_ms"] => {
                self.ingestion.retry_initial_delay_ms = parse(key, value)?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        self.validate()
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# agentkb configuration
# Per-agent document knowledge bases with grounded answers

[general]
# Directory for the database and stored uploads
# data_dir = "~/.local/share/agentkb"

[ollama]
# Ollama server address
host = "http://localhost:11434"

# Model used to generate answers
model = "llama3.2"

# Model used for document and query embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds (applies to embedding and generation)
timeout_seconds = 120

# Sampling temperature for answers
temperature = 0.2

[chunking]
# Maximum characters per chunk
chunk_size = 1000

# Characters shared between consecutive chunks
chunk_overlap = 150

[retrieval]
# Number of chunks retrieved per question
top_k = 4

# Drop retrieved chunks below this cosine similarity
# min_similarity = 0.3

[ingestion]
# Documents ingested at the same time
max_concurrent_jobs = 2

# Uploads that can wait in the queue
queue_capacity = 64

# Chunks embedded at the same time within one document
embed_concurrency = 4

# Retries for transient embedding failures (0 = fail the run immediately)
embed_retries = 0

# Delay before the first retry, doubled on each attempt
retry_initial_delay_ms = 500
"#
        .to_string()
    }
}

/// Largest accepted `retrieval.top_k`.
pub const MAX_TOP_K: usize = 20;

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
            temperature: 0.2,
        }
    }
}

/// Text chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Retrieval settings for answering questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_similarity: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_similarity: None,
        }
    }
}

/// Background ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_concurrent_jobs: usize,
    pub queue_capacity: usize,
    pub embed_concurrency: usize,
    pub embed_retries: u32,
    pub retry_initial_delay_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 64,
            embed_concurrency: 4,
            embed_retries: 0,
            retry_initial_delay_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.ingestion.embed_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_string_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.ollama.model, defaults.ollama.model);
        assert_eq!(config.chunking.chunk_size, defaults.chunking.chunk_size);
        assert_eq!(config.retrieval.top_k, defaults.retrieval.top_k);
        assert_eq!(config.retrieval.min_similarity, None);
        assert_eq!(
            config.ingestion.queue_capacity,
            defaults.ingestion.queue_capacity
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [ollama]
            model = "mistral"

            [retrieval]
            top_k = 3
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.retrieval.top_k, 3);
        // Defaults should still work
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.chunking.chunk_overlap, 150);
    }

    #[test]
    fn test_load_rejects_overlap_not_smaller_than_size() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [chunking]
            chunk_size = 100
            chunk_overlap = 100
            "#
        )
        .unwrap();

        let result = Config::load_from(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();

        config.set_value("ollama.model", "qwen2.5").unwrap();
        config.set_value("retrieval.top_k", "5").unwrap();
        config.set_value("retrieval.min_similarity", "0.25").unwrap();
        config.set_value("ingestion.embed_retries", "3").unwrap();

        assert_eq!(config.ollama.model, "qwen2.5");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.min_similarity, Some(0.25));
        assert_eq!(config.ingestion.embed_retries, 3);

        config.set_value("retrieval.min_similarity", "none").unwrap();
        assert_eq!(config.retrieval.min_similarity, None);
    }

    #[test]
    fn test_set_value_errors() {
        let mut config = Config::default();

        assert!(matches!(
            config.set_value("ollama.colour", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set_value("retrieval.top_k", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set_value("retrieval.top_k", "0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.chunking.chunk_size = 800;
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.chunking.chunk_size, 800);
    }

    #[test]
    fn test_resolve_paths_uses_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = Some("/var/lib/agentkb".to_string());

        let paths = config.resolve_paths(AppPaths::new().unwrap());
        assert_eq!(
            paths.database_file,
            std::path::PathBuf::from("/var/lib/agentkb/agentkb.db")
        );
    }
}
