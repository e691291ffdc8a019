//! Background ingestion queue.
//!
//! Uploads hand jobs to a worker task over a bounded channel and return
//! at once. The worker runs each job on its own task, with at most
//! `max_concurrent` running at a time.

use crate::error::{PipelineError, PipelineResult};
use crate::ingestor::{IngestJob, Ingestor};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

/// Handle to the ingestion worker.
pub struct IngestQueue {
    sender: mpsc::Sender<IngestJob>,
    worker: JoinHandle<()>,
}

impl IngestQueue {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(ingestor: Arc<Ingestor>, capacity: usize, max_concurrent: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, ingestor, max_concurrent.max(1)));
        Self { sender, worker }
    }

    /// Enqueue a job. Waits only while the queue is full.
    pub async fn submit(&self, job: IngestJob) -> PipelineResult<()> {
        debug!("Queueing {} (run {})", job.file_name, job.run_id);
        self.sender
            .send(job)
            .await
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// A queue whose worker is gone; every submit fails.
    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self {
            sender,
            worker: tokio::spawn(async {}),
        }
    }

    /// Stop accepting jobs and wait for queued and running jobs to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!("Ingestion worker stopped abnormally: {}", e);
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<IngestJob>,
    ingestor: Arc<Ingestor>,
    max_concurrent: usize,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut tasks = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let ingestor = ingestor.clone();
        tasks.spawn(async move {
            let _permit = permit;
            ingestor.ingest(job).await
        });

        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                error!("Ingestion task panicked: {}", e);
            }
        }
    }

    let mut drained = 0;
    while let Some(finished) = tasks.join_next().await {
        match finished {
            Ok(_) => drained += 1,
            Err(e) => error!("Ingestion task panicked: {}", e),
        }
    }
    info!("Ingestion queue stopped ({} jobs finished during shutdown)", drained);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunker;
    use crate::parsers::fixtures;
    use crate::testing::{agent, seed_document, KeywordEmbedder};
    use agentkb_core::RunStatus;
    use agentkb_db::Database;

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let acme = agent("acme");
        let embedder = Arc::new(KeywordEmbedder::new());
        let ingestor = Arc::new(Ingestor::new(db.clone(), Chunker::default(), embedder));

        let queue = IngestQueue::start(ingestor, 2, 2);

        let mut runs = Vec::new();
        for i in 0..5 {
            let file_name = format!("doc{}.docx", i);
            let (document, run) = seed_document(&db, &acme, &file_name);
            queue
                .submit(IngestJob {
                    run_id: run.id.clone(),
                    tenant_id: acme.id.clone(),
                    document_id: document.id.clone(),
                    file_name,
                    bytes: fixtures::docx(&[&format!("Document number {} content", i)]),
                })
                .await
                .unwrap();
            runs.push(run.id);
        }

        queue.shutdown().await;

        for run_id in runs {
            assert_eq!(db.get_run(&run_id).unwrap().status, RunStatus::Done);
        }
        assert_eq!(db.count_chunks_by_tenant(&acme.id).unwrap(), 5);
    }
}
