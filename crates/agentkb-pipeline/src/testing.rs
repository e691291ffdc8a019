//! Deterministic stand-ins for the Ollama services, used by tests.

use agentkb_core::{Agent, Document, IngestionRun};
use agentkb_db::Database;
use agentkb_ollama::{Embedder, Generator, OllamaError, OllamaResult};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const DIMENSIONS: usize = 32;

/// Bag-of-words embedder: each lower-cased word adds weight to one bucket.
/// Texts that share words end up close to each other.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % (DIMENSIONS as u64 - 1)) as usize;
            vector[bucket] += 1.0;
        }
        // Keeps the vector non-zero for texts without words.
        vector[DIMENSIONS - 1] = 0.01;
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Keyword embedder that takes `delay` per call.
pub struct SlowEmbedder {
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(KeywordEmbedder::vector(text))
    }

    fn model(&self) -> &str {
        "slow-test"
    }
}

/// Embedder that fails on chosen calls (1-based) and embeds the rest.
pub struct FailingEmbedder {
    fail_from: usize,
    fail_until: usize,
    transient: bool,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    /// Fail permanently from call `n` onwards.
    pub fn from_call(n: usize) -> Self {
        Self {
            fail_from: n,
            fail_until: usize::MAX,
            transient: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` calls with a transient error.
    pub fn transient_for(n: usize) -> Self {
        Self {
            fail_from: 1,
            fail_until: n,
            transient: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from && call <= self.fail_until {
            return Err(if self.transient {
                OllamaError::ApiError {
                    status: 503,
                    message: "model is loading".to_string(),
                }
            } else {
                OllamaError::ApiError {
                    status: 400,
                    message: format!("embedding call {} rejected", call),
                }
            });
        }
        Ok(KeywordEmbedder::vector(text))
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

/// Generator that records prompts and returns a fixed reply.
pub struct RecordingGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> OllamaResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "recording-test"
    }
}

/// Generator whose server is never up.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> OllamaResult<String> {
        Err(OllamaError::ServerNotRunning {
            host: "http://localhost:11434".to_string(),
        })
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

/// Store an agent, one of its documents and a pending run for it.
pub fn seed_document(db: &Database, agent: &Agent, file_name: &str) -> (Document, IngestionRun) {
    if !db.agent_exists(&agent.id).unwrap() {
        db.create_agent(agent).unwrap();
    }
    let document = Document::new(&agent.id, file_name, format!("/blobs/{}", file_name));
    db.create_document(&document).unwrap();
    let run = IngestionRun::new(&document);
    db.create_run(&run).unwrap();
    (document, run)
}

pub fn agent(name: &str) -> Agent {
    Agent::new(name, format!("You are the {} assistant.", name)).unwrap()
}
