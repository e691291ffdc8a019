//! The knowledge base: agents, their documents and what they know.

use crate::answerer::Answerer;
use crate::blob::{BlobError, BlobStore, LocalBlobStore};
use crate::error::{PipelineError, PipelineResult};
use crate::ingestor::{IngestJob, Ingestor};
use crate::queue::IngestQueue;
use agentkb_config::{AppPaths, Config};
use agentkb_core::{
    Agent, AgentSummary, AgentUpdate, Answer, Document, FileFormat, IngestStage, IngestionRun,
    RunCounts, RunId, RunStatus,
};
use agentkb_db::{Database, DbError, RunFilter};
use agentkb_ollama::{Embedder, Generator, OllamaEmbedder, OllamaGenerator};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the database, blob store, ingestion queue and answerer.
///
/// Create one at startup and call [`KnowledgeBase::shutdown`] before exit so
/// queued ingestion finishes.
pub struct KnowledgeBase {
    db: Arc<Database>,
    blobs: Arc<dyn BlobStore>,
    answerer: Answerer,
    ingestor: Arc<Ingestor>,
    queue: IngestQueue,
    queue_capacity: usize,
    max_concurrent_jobs: usize,
}

impl KnowledgeBase {
    /// Wire the knowledge base from its parts. Must be called from within a
    /// tokio runtime.
    pub fn new(
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        config: &Config,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let ingestor = Arc::new(Ingestor::from_config(db.clone(), embedder.clone(), config)?);
        let queue_capacity = config.ingestion.queue_capacity;
        let max_concurrent_jobs = config.ingestion.max_concurrent_jobs;
        let queue = IngestQueue::start(ingestor.clone(), queue_capacity, max_concurrent_jobs);
        let answerer = Answerer::from_config(db.clone(), embedder, generator, &config.retrieval);

        Ok(Self {
            db,
            blobs,
            answerer,
            ingestor,
            queue,
            queue_capacity,
            max_concurrent_jobs,
        })
    }

    /// Open the on-disk database and blob store and connect to Ollama.
    pub fn open(config: &Config, paths: &AppPaths) -> PipelineResult<Self> {
        let db = Arc::new(Database::open(&paths.database_file)?);
        let blobs = Arc::new(LocalBlobStore::new(&paths.blob_dir));
        let embedder = OllamaEmbedder::from_config(&config.ollama)
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        let generator = OllamaGenerator::from_config(&config.ollama)
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        Self::new(db, blobs, Arc::new(embedder), Arc::new(generator), config)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // Agents

    pub fn create_agent(&self, name: &str, system_prompt: &str) -> PipelineResult<Agent> {
        let agent = Agent::new(name, system_prompt)?;
        self.db.create_agent(&agent)?;
        info!("Created agent {} ({})", agent.name, agent.id);
        Ok(agent)
    }

    pub fn get_agent(&self, id: &str) -> PipelineResult<Agent> {
        self.db.get_agent(id).map_err(|e| tenant_error(e, id))
    }

    /// Look an agent up by id, or by name when no id matches.
    pub fn find_agent(&self, id_or_name: &str) -> PipelineResult<Agent> {
        match self.db.get_agent(id_or_name) {
            Ok(agent) => return Ok(agent),
            Err(DbError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let mut matches: Vec<Agent> = self
            .db
            .list_agents()?
            .into_iter()
            .map(|summary| summary.agent)
            .filter(|agent| agent.name.eq_ignore_ascii_case(id_or_name))
            .collect();

        match matches.len() {
            0 => Err(PipelineError::TenantNotFound(id_or_name.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(PipelineError::InvalidInput(format!(
                "{} agents are named '{}', use the agent id",
                n, id_or_name
            ))),
        }
    }

    pub fn list_agents(&self) -> PipelineResult<Vec<AgentSummary>> {
        Ok(self.db.list_agents()?)
    }

    pub fn update_agent(&self, id: &str, update: &AgentUpdate) -> PipelineResult<Agent> {
        if update.is_empty() {
            return Err(PipelineError::InvalidInput("nothing to update".to_string()));
        }
        update.validate()?;
        self.db.update_agent(id, update).map_err(|e| tenant_error(e, id))
    }

    /// Delete an agent and everything it owns: knowledge, runs, stored
    /// files and documents, in that order.
    pub fn delete_agent(&self, id: &str) -> PipelineResult<()> {
        let agent = self.get_agent(id)?;

        let chunks = self.delete_tenant_knowledge(&agent.id)?;
        self.db.delete_runs_by_tenant(&agent.id)?;
        self.blobs.delete_tenant(&agent.id)?;
        let documents = self.db.delete_documents_by_tenant(&agent.id)?;
        self.db.delete_agent(&agent.id)?;

        info!(
            "Deleted agent {} with {} documents and {} chunks",
            agent.name, documents, chunks
        );
        Ok(())
    }

    // Documents

    /// Store a document and schedule its ingestion.
    ///
    /// The file name is claimed in the database before any bytes are
    /// written, so a rejected duplicate never touches the stored file.
    /// Returns as soon as the job is queued; ingestion outcome is visible
    /// through the returned run.
    pub async fn upload_document(
        &self,
        agent_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> PipelineResult<(Document, RunId)> {
        let file_name = base_name(file_name)?;
        FileFormat::from_file_name(&file_name)?;
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput(format!("{} is empty", file_name)));
        }

        let agent = self.get_agent(agent_id)?;
        let location = self.blobs.location(&agent.id, &file_name)?;
        let document = Document::new(&agent.id, &file_name, location);
        match self.db.create_document(&document) {
            Ok(()) => {}
            Err(DbError::Conflict(_)) => {
                return Err(PipelineError::DuplicateDocument { file_name });
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.blobs.put(&agent.id, &file_name, &bytes) {
            if let Err(cleanup) = self.db.delete_document(&document.id) {
                warn!("Could not release {} after a failed store: {}", file_name, cleanup);
            }
            return Err(e.into());
        }

        let run_id = match self.ingest(&document, bytes).await {
            Ok(run_id) => run_id,
            Err(e) => {
                self.discard_upload(&document);
                return Err(e);
            }
        };
        info!("Uploaded {} for agent {} (run {})", file_name, agent.name, run_id);
        Ok((document, run_id))
    }

    /// Undo an upload whose ingestion could not be scheduled.
    fn discard_upload(&self, document: &Document) {
        if let Err(e) = self.db.delete_runs_by_document(&document.id) {
            warn!("Could not remove runs of {}: {}", document.file_name, e);
        }
        if let Err(e) = self.db.delete_document(&document.id) {
            warn!("Could not remove {}: {}", document.file_name, e);
        }
        if let Err(e) = self.blobs.delete(&document.source_location) {
            warn!("Could not remove blob for {}: {}", document.file_name, e);
        }
    }

    pub fn list_documents(&self, agent_id: &str) -> PipelineResult<Vec<Document>> {
        let agent = self.get_agent(agent_id)?;
        Ok(self.db.list_documents(&agent.id)?)
    }

    /// Delete one document, its knowledge, its runs and its stored bytes.
    pub fn delete_document(&self, agent_id: &str, file_name: &str) -> PipelineResult<Document> {
        let agent = self.get_agent(agent_id)?;
        let document = self
            .db
            .find_document_by_name(&agent.id, file_name)?
            .ok_or_else(|| PipelineError::DocumentNotFound(file_name.to_string()))?;

        let chunks = self.delete_document_knowledge(&document.id)?;
        self.db.delete_runs_by_document(&document.id)?;
        self.blobs.delete(&document.source_location)?;
        self.db.delete_document(&document.id)?;

        info!("Deleted {} ({} chunks)", document.file_name, chunks);
        Ok(document)
    }

    // Produced interface

    /// Schedule ingestion of `bytes` for an existing document.
    pub async fn ingest(&self, document: &Document, bytes: Vec<u8>) -> PipelineResult<RunId> {
        let run = IngestionRun::new(document);
        self.db.create_run(&run)?;

        self.queue
            .submit(IngestJob {
                run_id: run.id.clone(),
                tenant_id: document.tenant_id.clone(),
                document_id: document.id.clone(),
                file_name: document.file_name.clone(),
                bytes,
            })
            .await?;

        Ok(run.id)
    }

    /// Answer a question as the given agent.
    pub async fn ask(&self, agent_id: &str, question: &str) -> PipelineResult<Answer> {
        let agent = self.get_agent(agent_id)?;
        self.answerer
            .answer(&agent.id, question, &agent.system_prompt)
            .await
    }

    /// Answer from `tenant_id`'s knowledge with an explicit system prompt.
    /// Fails with `TenantNotFound` for an unknown or deleted agent.
    pub async fn answer(
        &self,
        tenant_id: &str,
        query: &str,
        system_prompt: &str,
    ) -> PipelineResult<Answer> {
        let agent = self.get_agent(tenant_id)?;
        self.answerer.answer(&agent.id, query, system_prompt).await
    }

    /// Remove every chunk of a tenant. Returns the number removed.
    pub fn delete_tenant_knowledge(&self, tenant_id: &str) -> PipelineResult<usize> {
        let removed = self.db.delete_chunks_by_tenant(tenant_id)?;
        debug!("Removed {} chunks of agent {}", removed, tenant_id);
        Ok(removed)
    }

    /// Remove every chunk of a document. Returns the number removed.
    pub fn delete_document_knowledge(&self, document_id: &str) -> PipelineResult<usize> {
        let removed = self.db.delete_chunks_by_document(document_id)?;
        debug!("Removed {} chunks of document {}", removed, document_id);
        Ok(removed)
    }

    // Run management

    /// Queue every pending run again, including runs interrupted by a
    /// previous shutdown. Returns the number of jobs queued.
    pub async fn resume_pending(&self) -> PipelineResult<usize> {
        let interrupted = self.db.requeue_interrupted_runs()?;
        if interrupted > 0 {
            info!("Requeued {} interrupted runs", interrupted);
        }

        let mut queued = 0;
        for run in self.db.pending_runs()? {
            let document = match self.db.get_document(&run.document_id) {
                Ok(document) => document,
                Err(DbError::NotFound(_)) => {
                    self.db.fail_run(&run.id, IngestStage::Received, "document was deleted")?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let bytes = match self.blobs.read(&document.source_location) {
                Ok(bytes) => bytes,
                Err(BlobError::NotFound(location)) => {
                    warn!("Stored bytes of {} are missing at {}", document.file_name, location);
                    self.db
                        .fail_run(&run.id, IngestStage::Received, "stored file is missing")?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.queue
                .submit(IngestJob {
                    run_id: run.id,
                    tenant_id: document.tenant_id,
                    document_id: document.id,
                    file_name: document.file_name,
                    bytes,
                })
                .await?;
            queued += 1;
        }

        Ok(queued)
    }

    /// Reset failed runs to pending. Returns the number reset.
    pub fn retry_failed(&self, agent_id: Option<&str>) -> PipelineResult<usize> {
        let failed = self.runs(agent_id, Some(RunStatus::Failed))?;
        for run in &failed {
            self.db.reset_run(&run.id)?;
        }
        Ok(failed.len())
    }

    /// Ingestion runs, newest first.
    pub fn runs(
        &self,
        agent_id: Option<&str>,
        status: Option<RunStatus>,
    ) -> PipelineResult<Vec<IngestionRun>> {
        let filter = RunFilter {
            tenant_id: agent_id.map(str::to_string),
            status,
            limit: None,
        };
        Ok(self.db.list_runs(&filter)?)
    }

    pub fn run(&self, id: &str) -> PipelineResult<IngestionRun> {
        Ok(self.db.get_run(id)?)
    }

    pub fn run_counts(&self) -> PipelineResult<RunCounts> {
        Ok(self.db.run_counts()?)
    }

    /// Wait for every queued and running job to finish. New jobs are
    /// accepted again afterwards.
    pub async fn flush(&mut self) {
        let fresh = IngestQueue::start(
            self.ingestor.clone(),
            self.queue_capacity,
            self.max_concurrent_jobs,
        );
        std::mem::replace(&mut self.queue, fresh).shutdown().await;
    }

    /// Stop accepting uploads and wait for queued ingestion to finish.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}

fn tenant_error(err: DbError, id: &str) -> PipelineError {
    match err {
        DbError::NotFound(_) => PipelineError::TenantNotFound(id.to_string()),
        other => other.into(),
    }
}

/// The final path component of an uploaded file name.
fn base_name(file_name: &str) -> PipelineResult<String> {
    Path::new(file_name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PipelineError::InvalidInput(format!("invalid file name: {:?}", file_name)))
}
