//! Ingestion run status operations.

use super::{parse_optional_timestamp, parse_timestamp};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use agentkb_core::{IngestStage, IngestionRun, RunCounts, RunStatus};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

const RUN_COLUMNS: &str = "id, tenant_id, document_id, file_name, status, stage, error, chunk_count, attempts, created_at, started_at, completed_at";

/// Filter for listing ingestion runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub tenant_id: Option<String>,
    pub status: Option<RunStatus>,
    pub limit: Option<usize>,
}

impl RunFilter {
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Database {
    /// Record a new ingestion run.
    pub fn create_run(&self, run: &IngestionRun) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO ingestion_runs (id, tenant_id, document_id, file_name, status, stage, error, chunk_count, attempts, created_at, started_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                run.id,
                run.tenant_id,
                run.document_id,
                run.file_name,
                run.status.as_str(),
                run.stage.as_str(),
                run.error,
                run.chunk_count,
                run.attempts,
                run.created_at.to_rfc3339(),
                run.started_at.map(|dt| dt.to_rfc3339()),
                run.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )
        .map_err(|e| DbError::from_insert(e, format!("run {}", run.id)))?;
        Ok(())
    }

    /// Get a run by ID.
    pub fn get_run(&self, id: &str) -> DbResult<IngestionRun> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM ingestion_runs WHERE id = ?1", RUN_COLUMNS),
            params![id],
            row_to_run,
        )
        .map_err(|e| DbError::from_lookup(e, format!("Run not found: {}", id)))
    }

    /// Most recent run for a document.
    pub fn latest_run_for_document(&self, document_id: &str) -> DbResult<Option<IngestionRun>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                &format!(
                    "SELECT {} FROM ingestion_runs WHERE document_id = ?1 ORDER BY created_at DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                params![document_id],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    /// Mark a run as started: processing, back at `Received`, one more attempt.
    pub fn start_run(&self, id: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        self.update_run(
            id,
            "UPDATE ingestion_runs
             SET status = 'processing', stage = 'received', error = NULL,
                 started_at = ?2, completed_at = NULL, attempts = attempts + 1
             WHERE id = ?1",
            params![id, now],
        )
    }

    /// Record that a run reached a new stage.
    pub fn advance_run(&self, id: &str, stage: IngestStage) -> DbResult<()> {
        self.update_run(
            id,
            "UPDATE ingestion_runs SET stage = ?2 WHERE id = ?1",
            params![id, stage.as_str()],
        )
    }

    /// Mark a run as done.
    pub fn complete_run(&self, id: &str, chunk_count: usize) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        self.update_run(
            id,
            "UPDATE ingestion_runs
             SET status = 'done', stage = 'done', error = NULL, chunk_count = ?2, completed_at = ?3
             WHERE id = ?1",
            params![id, chunk_count as i64, now],
        )
    }

    /// Mark a run as failed at `stage`.
    pub fn fail_run(&self, id: &str, stage: IngestStage, error: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        self.update_run(
            id,
            "UPDATE ingestion_runs
             SET status = 'failed', stage = ?2, error = ?3, chunk_count = 0, completed_at = ?4
             WHERE id = ?1",
            params![id, stage.as_str(), error, now],
        )
    }

    /// Put a failed run back to pending so it can be resubmitted.
    pub fn reset_run(&self, id: &str) -> DbResult<()> {
        self.update_run(
            id,
            "UPDATE ingestion_runs
             SET status = 'pending', stage = 'received', error = NULL, started_at = NULL, completed_at = NULL
             WHERE id = ?1",
            params![id],
        )
    }

    /// Move runs left `processing` by an interrupted process back to pending.
    pub fn requeue_interrupted_runs(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "UPDATE ingestion_runs
             SET status = 'pending', stage = 'received', started_at = NULL
             WHERE status = 'processing'",
            [],
        )?;
        Ok(count)
    }

    /// List runs, newest first.
    pub fn list_runs(&self, filter: &RunFilter) -> DbResult<Vec<IngestionRun>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM ingestion_runs WHERE (?1 IS NULL OR tenant_id = ?1) AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC",
            RUN_COLUMNS
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.tenant_id, filter.status.map(|s| s.as_str())],
            row_to_run,
        )?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Pending runs in submission order.
    pub fn pending_runs(&self) -> DbResult<Vec<IngestionRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ingestion_runs WHERE status = 'pending' ORDER BY created_at ASC",
            RUN_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_run)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get run counts by status.
    pub fn run_counts(&self) -> DbResult<RunCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM ingestion_runs GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = RunCounts::default();
        for row in rows {
            let (status, count) = row?;
            match RunStatus::from_str(&status) {
                Some(RunStatus::Pending) => counts.pending = count,
                Some(RunStatus::Processing) => counts.processing = count,
                Some(RunStatus::Done) => counts.done = count,
                Some(RunStatus::Failed) => counts.failed = count,
                None => {}
            }
        }

        Ok(counts)
    }

    pub fn delete_runs_by_document(&self, document_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM ingestion_runs WHERE document_id = ?1",
            params![document_id],
        )?;
        Ok(count)
    }

    pub fn delete_runs_by_tenant(&self, tenant_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM ingestion_runs WHERE tenant_id = ?1",
            params![tenant_id],
        )?;
        Ok(count)
    }

    fn update_run(&self, id: &str, sql: &str, params: impl rusqlite::Params) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(sql, params)?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Run not found: {}", id)));
        }

        Ok(())
    }
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<IngestionRun> {
    let status_str: String = row.get(4)?;
    let stage_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;

    Ok(IngestionRun {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        document_id: row.get(2)?,
        file_name: row.get(3)?,
        status: RunStatus::from_str(&status_str).unwrap_or_default(),
        stage: IngestStage::from_str(&stage_str).unwrap_or_default(),
        error: row.get(6)?,
        chunk_count: row.get(7)?,
        attempts: row.get(8)?,
        created_at: parse_timestamp(&created_at_str),
        started_at: parse_optional_timestamp(row.get(10)?),
        completed_at: parse_optional_timestamp(row.get(11)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkb_core::Document;

    fn new_run(tenant: &str, file: &str) -> IngestionRun {
        let document = Document::new(tenant, file, format!("{}/{}", tenant, file));
        IngestionRun::new(&document)
    }

    #[test]
    fn test_run_success_workflow() {
        let db = Database::open_in_memory().unwrap();
        let run = new_run("t1", "guide.pdf");
        db.create_run(&run).unwrap();

        db.start_run(&run.id).unwrap();
        let started = db.get_run(&run.id).unwrap();
        assert_eq!(started.status, RunStatus::Processing);
        assert_eq!(started.attempts, 1);
        assert!(started.started_at.is_some());

        db.advance_run(&run.id, IngestStage::Parsed).unwrap();
        db.advance_run(&run.id, IngestStage::Chunked).unwrap();
        assert_eq!(db.get_run(&run.id).unwrap().stage, IngestStage::Chunked);

        db.complete_run(&run.id, 7).unwrap();
        let done = db.get_run(&run.id).unwrap();
        assert_eq!(done.status, RunStatus::Done);
        assert_eq!(done.stage, IngestStage::Done);
        assert_eq!(done.chunk_count, 7);
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_run_failure_and_reset() {
        let db = Database::open_in_memory().unwrap();
        let run = new_run("t1", "sheet.xlsx");
        db.create_run(&run).unwrap();
        db.start_run(&run.id).unwrap();

        db.fail_run(&run.id, IngestStage::Chunked, "embedding service unavailable")
            .unwrap();
        let failed = db.get_run(&run.id).unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.stage, IngestStage::Chunked);
        assert_eq!(
            failed.error.as_deref(),
            Some("embedding service unavailable")
        );

        db.reset_run(&run.id).unwrap();
        let reset = db.get_run(&run.id).unwrap();
        assert_eq!(reset.status, RunStatus::Pending);
        assert!(reset.error.is_none());
        assert_eq!(reset.attempts, 1);
    }

    #[test]
    fn test_missing_run() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_run("nope"), Err(DbError::NotFound(_))));
        assert!(matches!(
            db.complete_run("nope", 1),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_and_count_runs() {
        let db = Database::open_in_memory().unwrap();
        let a = new_run("t1", "a.pdf");
        let b = new_run("t1", "b.pdf");
        let c = new_run("t2", "c.pdf");
        for run in [&a, &b, &c] {
            db.create_run(run).unwrap();
        }
        db.start_run(&b.id).unwrap();
        db.fail_run(&b.id, IngestStage::Received, "boom").unwrap();

        let counts = db.run_counts().unwrap();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 3);

        assert_eq!(db.list_runs(&RunFilter::default()).unwrap().len(), 3);
        assert_eq!(db.list_runs(&RunFilter::for_tenant("t1")).unwrap().len(), 2);

        let failed = db
            .list_runs(&RunFilter::for_tenant("t1").with_status(RunStatus::Failed))
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, b.id);

        assert_eq!(
            db.list_runs(&RunFilter::default().with_limit(1)).unwrap().len(),
            1
        );

        let pending: Vec<_> = db.pending_runs().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&a.id) && pending.contains(&c.id));
    }

    #[test]
    fn test_requeue_interrupted_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let run = new_run("t1", "deck.pptx");
        db.create_run(&run).unwrap();
        db.start_run(&run.id).unwrap();

        assert_eq!(db.requeue_interrupted_runs().unwrap(), 1);
        assert_eq!(db.get_run(&run.id).unwrap().status, RunStatus::Pending);

        let latest = db.latest_run_for_document(&run.document_id).unwrap();
        assert_eq!(latest.map(|r| r.id), Some(run.id.clone()));

        assert_eq!(db.delete_runs_by_document(&run.document_id).unwrap(), 1);
        assert_eq!(db.delete_runs_by_tenant("t1").unwrap(), 0);
        assert!(db
            .latest_run_for_document(&run.document_id)
            .unwrap()
            .is_none());
    }
}
