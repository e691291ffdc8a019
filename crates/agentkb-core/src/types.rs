//! Core domain types for agentkb.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for agents. An agent id is also the tenant key.
pub type AgentId = String;

/// Unique identifier for uploaded documents.
pub type DocumentId = String;

/// Unique identifier for chunks.
pub type ChunkId = String;

/// Unique identifier for ingestion runs.
pub type RunId = String;

/// Minimum length of an agent name, in characters.
pub const MIN_AGENT_NAME_LEN: usize = 3;

/// Minimum length of an agent system prompt, in characters.
pub const MIN_SYSTEM_PROMPT_LEN: usize = 10;

/// Answer text returned when retrieval finds nothing for the tenant.
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information in my knowledge base to answer that question.";

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Document formats accepted for ingestion.
///
/// The set is closed: anything outside it is rejected at the boundary,
/// before a document is stored or an ingestion run is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Word,
    Excel,
    PowerPoint,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [
        FileFormat::Pdf,
        FileFormat::Word,
        FileFormat::Excel,
        FileFormat::PowerPoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Word => "word",
            FileFormat::Excel => "excel",
            FileFormat::PowerPoint => "powerpoint",
        }
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Word => "docx",
            FileFormat::Excel => "xlsx",
            FileFormat::PowerPoint => "pptx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "docx" => Some(FileFormat::Word),
            "xlsx" => Some(FileFormat::Excel),
            "pptx" => Some(FileFormat::PowerPoint),
            _ => None,
        }
    }

    /// Detect the format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat(file_name.to_string()))
    }

    /// Comma-separated list of accepted extensions, for messages.
    pub fn supported_extensions() -> String {
        Self::ALL
            .iter()
            .map(|f| format!(".{}", f.extension()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An agent owns a private set of documents and a system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let system_prompt = system_prompt.into();
        validate_agent_name(&name)?;
        validate_system_prompt(&system_prompt)?;

        Ok(Self {
            id: new_id(),
            name,
            system_prompt,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

pub fn validate_agent_name(name: &str) -> Result<()> {
    if name.trim().chars().count() < MIN_AGENT_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "agent name must be at least {} characters",
            MIN_AGENT_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_system_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().chars().count() < MIN_SYSTEM_PROMPT_LEN {
        return Err(Error::InvalidInput(format!(
            "system prompt must be at least {} characters",
            MIN_SYSTEM_PROMPT_LEN
        )));
    }
    Ok(())
}

/// Partial update for an agent.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub system_prompt: Option<String>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.system_prompt.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_agent_name(name)?;
        }
        if let Some(prompt) = &self.system_prompt {
            validate_system_prompt(prompt)?;
        }
        Ok(())
    }
}

/// Agent listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent: Agent,
    pub document_count: i64,
}

/// An uploaded source file. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: AgentId,
    pub file_name: String,
    pub source_location: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        tenant_id: impl Into<AgentId>,
        file_name: impl Into<String>,
        source_location: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            tenant_id: tenant_id.into(),
            file_name: file_name.into(),
            source_location: source_location.into(),
            uploaded_at: Utc::now(),
        }
    }

    pub fn format(&self) -> Result<FileFormat> {
        FileFormat::from_file_name(&self.file_name)
    }
}

/// An embedded slice of a document's text, tagged with its tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub tenant_id: AgentId,
    pub document_id: DocumentId,
    pub source_file_name: String,
    pub sequence_index: i32,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(
        tenant_id: impl Into<AgentId>,
        document_id: impl Into<DocumentId>,
        source_file_name: impl Into<String>,
        sequence_index: i32,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: new_id(),
            tenant_id: tenant_id.into(),
            document_id: document_id.into(),
            source_file_name: source_file_name.into(),
            sequence_index,
            text: text.into(),
            embedding,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// A grounded answer and the files it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

impl Answer {
    pub fn new(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }

    /// The fixed answer for a tenant with nothing relevant indexed.
    pub fn insufficient_information() -> Self {
        Self::new(INSUFFICIENT_INFORMATION, Vec::new())
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Status of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Processing => "processing",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RunStatus::Pending),
            "processing" => Some(RunStatus::Processing),
            "done" => Some(RunStatus::Done),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownVariant {
            kind: "run status",
            value: s.to_string(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The last stage an ingestion run reached.
///
/// Runs advance `Received -> Parsed -> Chunked -> Indexed -> Done`. A failed
/// run keeps the stage it was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    #[default]
    Received,
    Parsed,
    Chunked,
    Indexed,
    Done,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Parsed => "parsed",
            IngestStage::Chunked => "chunked",
            IngestStage::Indexed => "indexed",
            IngestStage::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "received" => Some(IngestStage::Received),
            "parsed" => Some(IngestStage::Parsed),
            "chunked" => Some(IngestStage::Chunked),
            "indexed" => Some(IngestStage::Indexed),
            "done" => Some(IngestStage::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One execution of the ingestion pipeline for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRun {
    pub id: RunId,
    pub tenant_id: AgentId,
    pub document_id: DocumentId,
    pub file_name: String,
    pub status: RunStatus,
    pub stage: IngestStage,
    pub error: Option<String>,
    pub chunk_count: i64,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IngestionRun {
    pub fn new(document: &Document) -> Self {
        Self {
            id: new_id(),
            tenant_id: document.tenant_id.clone(),
            document_id: document.id.clone(),
            file_name: document.file_name.clone(),
            status: RunStatus::Pending,
            stage: IngestStage::Received,
            error: None,
            chunk_count: 0,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Human-readable description of where the run stands.
    pub fn describe(&self) -> String {
        match self.status {
            RunStatus::Failed => format!("failed at {}", self.stage),
            RunStatus::Done => format!("done ({} chunks)", self.chunk_count),
            status => format!("{} ({})", status, self.stage),
        }
    }
}

/// Counts of ingestion runs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub pending: i64,
    pub processing: i64,
    pub done: i64,
    pub failed: i64,
}

impl RunCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.done + self.failed
    }
}
