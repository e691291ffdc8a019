//! Retrieval-augmented answering scoped to one agent's knowledge.

use crate::error::{PipelineError, PipelineResult};
use agentkb_config::RetrievalConfig;
use agentkb_core::{Answer, ScoredChunk};
use agentkb_db::Database;
use agentkb_ollama::{build_grounded_prompt, collect_sources, ContextItem, Embedder, Generator};
use std::sync::Arc;
use tracing::{debug, info};

/// Answers questions from the chunks of a single tenant.
pub struct Answerer {
    db: Arc<Database>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    min_similarity: Option<f32>,
}

impl Answerer {
    pub fn new(db: Arc<Database>, embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        let defaults = RetrievalConfig::default();
        Self {
            db,
            embedder,
            generator,
            top_k: defaults.top_k,
            min_similarity: defaults.min_similarity,
        }
    }

    pub fn from_config(
        db: Arc<Database>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        config: &RetrievalConfig,
    ) -> Self {
        Self::new(db, embedder, generator)
            .with_top_k(config.top_k)
            .with_min_similarity(config.min_similarity)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: Option<f32>) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Find the chunks of `tenant_id` most relevant to `query`.
    pub async fn retrieve(&self, tenant_id: &str, query: &str) -> PipelineResult<Vec<ScoredChunk>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(PipelineError::EmbeddingUnavailable)?;

        let mut results = self.db.search(tenant_id, &vector, self.top_k)?;
        if let Some(min) = self.min_similarity {
            results.retain(|r| r.similarity >= min);
        }

        debug!(
            "Retrieved {} chunks for agent {} (k = {})",
            results.len(),
            tenant_id,
            self.top_k
        );
        Ok(results)
    }

    /// Answer `query` using only the knowledge of `tenant_id`.
    ///
    /// When nothing relevant is indexed the fixed "insufficient information"
    /// answer is returned and the generator is not called.
    pub async fn answer(
        &self,
        tenant_id: &str,
        query: &str,
        system_prompt: &str,
    ) -> PipelineResult<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidInput("question is empty".to_string()));
        }

        let results = self.retrieve(tenant_id, query).await?;
        if results.is_empty() {
            info!("No knowledge found for agent {}", tenant_id);
            return Ok(Answer::insufficient_information());
        }

        let context: Vec<ContextItem> = results
            .iter()
            .map(|r| ContextItem {
                content: r.chunk.text.clone(),
                source: r.chunk.source_file_name.clone(),
                similarity: r.similarity,
            })
            .collect();
        for (i, item) in context.iter().enumerate() {
            debug!("Context [{}] {} ({:.3})", i + 1, item.source, item.similarity);
        }

        let prompt = build_grounded_prompt(system_prompt, query, &context);
        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(PipelineError::GenerationUnavailable)?;

        let sources = collect_sources(context.iter().map(|c| c.source.as_str()));
        Ok(Answer::new(text, sources))
    }
}
