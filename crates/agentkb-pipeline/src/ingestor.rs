//! Ingestion pipeline: parse, chunk, embed and index one document.
//!
//! A run moves through `received → parsed → chunked → indexed → done`.
//! Every chunk is embedded before anything is written, and the document's
//! chunks are replaced in a single transaction, so a run that fails or is
//! cancelled part way leaves no chunks behind.

use crate::chunker::{Chunker, Segment};
use crate::error::{PipelineError, PipelineResult};
use crate::parsers::parse_document;
use crate::retry::RetryPolicy;
use agentkb_config::Config;
use agentkb_core::{AgentId, Chunk, DocumentId, IngestStage, RunId, RunStatus};
use agentkb_db::Database;
use agentkb_ollama::{Embedder, OllamaResult};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One document to ingest under an existing run.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub run_id: RunId,
    pub tenant_id: AgentId,
    pub document_id: DocumentId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_id: RunId,
    pub document_id: DocumentId,
    pub status: RunStatus,
    /// Last stage the run reached.
    pub stage: IngestStage,
    pub chunk_count: usize,
    pub error: Option<String>,
}

impl IngestReport {
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }
}

/// Runs the ingestion pipeline for one document at a time.
pub struct Ingestor {
    db: Arc<Database>,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    retry: RetryPolicy,
    embed_concurrency: usize,
}

impl Ingestor {
    pub fn new(db: Arc<Database>, chunker: Chunker, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            db,
            chunker,
            embedder,
            retry: RetryPolicy::default(),
            embed_concurrency: 1,
        }
    }

    pub fn from_config(
        db: Arc<Database>,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> PipelineResult<Self> {
        Ok(Self::new(db, Chunker::from_config(&config.chunking)?, embedder)
            .with_retry(RetryPolicy::from_config(&config.ingestion))
            .with_embed_concurrency(config.ingestion.embed_concurrency))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of chunks embedded at the same time. Order is preserved.
    pub fn with_embed_concurrency(mut self, concurrency: usize) -> Self {
        self.embed_concurrency = concurrency.max(1);
        self
    }

    /// Run the pipeline for `job`.
    ///
    /// Never fails: errors are logged and recorded on the run, and the
    /// report says how far the run got.
    pub async fn ingest(&self, job: IngestJob) -> IngestReport {
        let IngestJob {
            run_id,
            tenant_id,
            document_id,
            file_name,
            bytes,
        } = job;

        info!("Ingesting {} for agent {}", file_name, tenant_id);
        if let Err(e) = self.db.start_run(&run_id) {
            warn!("Could not mark run {} as started: {}", run_id, e);
        }

        let mut stage = IngestStage::Received;
        let result = self
            .run_stages(&run_id, &tenant_id, &document_id, &file_name, bytes, &mut stage)
            .await;

        match result {
            Ok(chunk_count) => {
                if let Err(e) = self.db.complete_run(&run_id, chunk_count) {
                    warn!("Could not mark run {} as done: {}", run_id, e);
                }
                info!(
                    "Ingested {} for agent {}: {} chunks",
                    file_name, tenant_id, chunk_count
                );
                IngestReport {
                    run_id,
                    document_id,
                    status: RunStatus::Done,
                    stage: IngestStage::Done,
                    chunk_count,
                    error: None,
                }
            }
            Err(err) => {
                let message = err.to_string();
                error!(
                    tenant = %tenant_id,
                    file = %file_name,
                    document = %document_id,
                    stage = %stage,
                    error = %message,
                    "Ingestion failed"
                );
                if let Err(e) = self.db.fail_run(&run_id, stage, &message) {
                    warn!("Could not record failure of run {}: {}", run_id, e);
                }
                IngestReport {
                    run_id,
                    document_id,
                    status: RunStatus::Failed,
                    stage,
                    chunk_count: 0,
                    error: Some(message),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: &str,
        tenant_id: &str,
        document_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        stage: &mut IngestStage,
    ) -> PipelineResult<usize> {
        let name = file_name.to_string();
        let parsed = tokio::task::spawn_blocking(move || parse_document(&bytes, &name))
            .await
            .map_err(|e| PipelineError::ParseFailure(format!("parser crashed: {}", e)))??;
        self.advance(run_id, stage, IngestStage::Parsed);

        let segments = self.chunker.split(&parsed.units);
        debug!(
            "Split {} units of {} into {} chunks",
            parsed.units.len(),
            file_name,
            segments.len()
        );
        self.advance(run_id, stage, IngestStage::Chunked);

        let vectors = self.embed_all(&segments).await?;

        let chunks: Vec<Chunk> = segments
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (segment, vector))| {
                Chunk::new(tenant_id, document_id, file_name, i as i32, segment.text, vector)
            })
            .collect();

        let count = self
            .db
            .replace_document_chunks(document_id, &chunks)
            .map_err(PipelineError::IndexWriteFailure)?;
        self.advance(run_id, stage, IngestStage::Indexed);

        Ok(count)
    }

    /// Embed every segment, in order. The first failure aborts the rest.
    async fn embed_all(&self, segments: &[Segment]) -> PipelineResult<Vec<Vec<f32>>> {
        // Futures own their inputs: the run is spawned on the queue and must be `Send`.
        let requests: Vec<BoxFuture<'static, OllamaResult<Vec<f32>>>> = segments
            .iter()
            .map(|segment| {
                let embedder = Arc::clone(&self.embedder);
                let retry = self.retry.clone();
                let text = segment.text.clone();
                async move { retry.run("embedding", || embedder.embed(&text)).await }.boxed()
            })
            .collect();

        stream::iter(requests)
            .buffered(self.embed_concurrency)
            .try_collect()
            .await
            .map_err(PipelineError::EmbeddingUnavailable)
    }

    fn advance(&self, run_id: &str, stage: &mut IngestStage, next: IngestStage) {
        *stage = next;
        if let Err(e) = self.db.advance_run(run_id, next) {
            warn!("Could not record stage {} for run {}: {}", next, run_id, e);
        }
    }
}
