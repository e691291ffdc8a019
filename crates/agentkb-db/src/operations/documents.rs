//! Document metadata operations.

use super::parse_timestamp;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use agentkb_core::Document;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

const DOCUMENT_COLUMNS: &str = "id, tenant_id, file_name, source_location, uploaded_at";

impl Database {
    /// Record an uploaded document.
    ///
    /// Fails with `Conflict` if the agent already has a document with the
    /// same file name.
    pub fn create_document(&self, document: &Document) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (id, tenant_id, file_name, source_location, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                document.id,
                document.tenant_id,
                document.file_name,
                document.source_location,
                document.uploaded_at.to_rfc3339(),
            ],
        )
        .map_err(|e| DbError::from_insert(e, format!("document {}", document.file_name)))?;
        Ok(())
    }

    /// Get a document by ID.
    pub fn get_document(&self, id: &str) -> DbResult<Document> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
            params![id],
            row_to_document,
        )
        .map_err(|e| DbError::from_lookup(e, format!("Document not found: {}", id)))
    }

    /// Find an agent's document by file name.
    pub fn find_document_by_name(
        &self,
        tenant_id: &str,
        file_name: &str,
    ) -> DbResult<Option<Document>> {
        let conn = self.conn()?;
        let document = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents WHERE tenant_id = ?1 AND file_name = ?2",
                    DOCUMENT_COLUMNS
                ),
                params![tenant_id, file_name],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    /// List an agent's documents in upload order.
    pub fn list_documents(&self, tenant_id: &str) -> DbResult<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE tenant_id = ?1 ORDER BY uploaded_at ASC, file_name ASC",
            DOCUMENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![tenant_id], row_to_document)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a document record together with its chunks.
    ///
    /// Runs in the same kind of write transaction as
    /// [`Database::replace_document_chunks`], so an ingestion finishing at
    /// the same moment either lands before and is removed here, or lands
    /// after and finds the document gone.
    pub fn delete_document(&self, id: &str) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Document not found: {}", id)));
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete every document record of an agent, with their chunks.
    pub fn delete_documents_by_tenant(&self, tenant_id: &str) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM chunks WHERE document_id IN (SELECT id FROM documents WHERE tenant_id = ?1)",
            params![tenant_id],
        )?;
        let count = tx.execute(
            "DELETE FROM documents WHERE tenant_id = ?1",
            params![tenant_id],
        )?;
        tx.commit()?;
        Ok(count)
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let uploaded_at_str: String = row.get(4)?;

    Ok(Document {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        file_name: row.get(2)?,
        source_location: row.get(3)?,
        uploaded_at: parse_timestamp(&uploaded_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkb_core::Agent;

    fn setup() -> (Database, Agent) {
        let db = Database::open_in_memory().unwrap();
        let agent = Agent::new("Handbook", "Answer HR questions from the handbook.").unwrap();
        db.create_agent(&agent).unwrap();
        (db, agent)
    }

    #[test]
    fn test_document_crud() {
        let (db, agent) = setup();
        let doc = Document::new(&agent.id, "handbook.pdf", format!("{}/handbook.pdf", agent.id));

        db.create_document(&doc).unwrap();

        let fetched = db.get_document(&doc.id).unwrap();
        assert_eq!(fetched.file_name, "handbook.pdf");
        assert_eq!(fetched.tenant_id, agent.id);

        let found = db.find_document_by_name(&agent.id, "handbook.pdf").unwrap();
        assert_eq!(found.map(|d| d.id), Some(doc.id.clone()));
        assert!(db
            .find_document_by_name(&agent.id, "other.pdf")
            .unwrap()
            .is_none());

        db.delete_document(&doc.id).unwrap();
        assert!(matches!(
            db.get_document(&doc.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_file_name_conflicts() {
        let (db, agent) = setup();
        let first = Document::new(&agent.id, "policy.docx", "a");
        let second = Document::new(&agent.id, "policy.docx", "b");

        db.create_document(&first).unwrap();
        assert!(matches!(
            db.create_document(&second),
            Err(DbError::Conflict(_))
        ));
    }

    #[test]
    fn test_document_requires_existing_agent() {
        let db = Database::open_in_memory().unwrap();
        let orphan = Document::new("no-such-agent", "x.pdf", "no-such-agent/x.pdf");
        assert!(matches!(
            db.create_document(&orphan),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_agent_deletion_cascades_to_documents() {
        let (db, agent) = setup();
        db.create_document(&Document::new(&agent.id, "a.pdf", "a")).unwrap();
        db.create_document(&Document::new(&agent.id, "b.xlsx", "b")).unwrap();
        assert_eq!(db.list_documents(&agent.id).unwrap().len(), 2);

        db.delete_agent(&agent.id).unwrap();
        assert!(db.list_documents(&agent.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_document_removes_its_chunks() {
        let (db, agent) = setup();
        let doc = Document::new(&agent.id, "a.pdf", "a");
        let other = Document::new(&agent.id, "b.pdf", "b");
        db.create_document(&doc).unwrap();
        db.create_document(&other).unwrap();
        db.insert_chunks(&[
            agentkb_core::Chunk::new(&agent.id, &doc.id, "a.pdf", 0, "alpha", vec![1.0, 0.0]),
            agentkb_core::Chunk::new(&agent.id, &other.id, "b.pdf", 0, "beta", vec![0.0, 1.0]),
        ])
        .unwrap();

        db.delete_document(&doc.id).unwrap();

        assert_eq!(db.count_chunks_by_document(&doc.id).unwrap(), 0);
        assert_eq!(db.count_chunks_by_document(&other.id).unwrap(), 1);

        assert_eq!(db.delete_documents_by_tenant(&agent.id).unwrap(), 1);
        assert_eq!(db.count_chunks_by_tenant(&agent.id).unwrap(), 0);
    }

    #[test]
    fn test_delete_documents_by_tenant() {
        let (db, agent) = setup();
        db.create_document(&Document::new(&agent.id, "a.pdf", "a")).unwrap();
        db.create_document(&Document::new(&agent.id, "b.pptx", "b")).unwrap();

        assert_eq!(db.delete_documents_by_tenant(&agent.id).unwrap(), 2);
        assert_eq!(db.delete_documents_by_tenant(&agent.id).unwrap(), 0);
    }
}
