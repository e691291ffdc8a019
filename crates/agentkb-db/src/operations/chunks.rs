//! Chunk index writes and deletes.

use super::vectors::{decode_vector, encode_vector};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use agentkb_core::Chunk;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

const INSERT_CHUNK: &str = r#"
    INSERT INTO chunks (id, tenant_id, document_id, source_file_name, sequence_index, content, embedding, dimensions)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

impl Database {
    /// Add one chunk to the index.
    pub fn insert_chunk(&self, chunk: &Chunk) -> DbResult<()> {
        self.insert_chunks(std::slice::from_ref(chunk)).map(|_| ())
    }

    /// Add chunks to the index in a single transaction.
    ///
    /// Either every chunk is stored or none is. All vectors must share the
    /// dimension of the vectors already in the index.
    pub fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_in_tx(&tx, chunks)?;
        tx.commit()?;

        debug!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Replace all chunks of a document with `chunks` in one transaction.
    ///
    /// Re-running ingestion for a document never leaves stale or duplicated
    /// chunks behind. Fails with `NotFound`, writing nothing, when the
    /// document record no longer exists.
    pub fn replace_document_chunks(&self, document_id: &str, chunks: &[Chunk]) -> DbResult<usize> {
        if let Some(stray) = chunks.iter().find(|c| c.document_id != document_id) {
            return Err(DbError::InvalidData(format!(
                "chunk {} belongs to document {}, not {}",
                stray.id, stray.document_id, document_id
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM documents WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DbError::NotFound(format!("Document not found: {}", document_id)));
        }

        let removed = tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;
        insert_in_tx(&tx, chunks)?;
        tx.commit()?;

        if removed > 0 {
            debug!("Replaced {} stale chunks for document {}", removed, document_id);
        }
        Ok(chunks.len())
    }

    /// Get all chunks of a document in sequence order.
    pub fn chunks_by_document(&self, document_id: &str) -> DbResult<Vec<Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tenant_id, document_id, source_file_name, sequence_index, content, embedding, dimensions
            FROM chunks WHERE document_id = ?1 ORDER BY sequence_index ASC, seq ASC
            "#,
        )?;

        let rows = stmt.query_map(params![document_id], |row| {
            let bytes: Vec<u8> = row.get(6)?;
            let dimensions: i64 = row.get(7)?;
            Ok((
                Chunk {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    document_id: row.get(2)?,
                    source_file_name: row.get(3)?,
                    sequence_index: row.get(4)?,
                    text: row.get(5)?,
                    embedding: Vec::new(),
                },
                bytes,
                dimensions,
            ))
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            let (mut chunk, bytes, dimensions) = row?;
            chunk.embedding = decode_vector(&bytes, dimensions)?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Remove every chunk derived from a document. Returns the number removed.
    pub fn delete_chunks_by_document(&self, document_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;
        Ok(count)
    }

    /// Remove every chunk owned by a tenant. Returns the number removed.
    pub fn delete_chunks_by_tenant(&self, tenant_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM chunks WHERE tenant_id = ?1",
            params![tenant_id],
        )?;
        Ok(count)
    }

    pub fn count_chunks_by_tenant(&self, tenant_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE tenant_id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_chunks_by_document(&self, document_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Dimension of the vectors in the index, if it holds any.
    pub fn index_dimensions(&self) -> DbResult<Option<usize>> {
        let conn = self.conn()?;
        stored_dimensions(&conn)
    }
}

fn stored_dimensions(conn: &rusqlite::Connection) -> DbResult<Option<usize>> {
    let dims: Option<i64> = conn
        .query_row("SELECT dimensions FROM chunks LIMIT 1", [], |row| row.get(0))
        .optional()?;
    Ok(dims.map(|d| d as usize))
}

fn insert_in_tx(tx: &Transaction, chunks: &[Chunk]) -> DbResult<()> {
    let Some(first) = chunks.first() else {
        return Ok(());
    };

    let expected = stored_dimensions(tx)?.unwrap_or(first.dimensions());
    if expected == 0 {
        return Err(DbError::InvalidData(format!(
            "chunk {} has an empty embedding",
            first.id
        )));
    }

    let mut stmt = tx.prepare(INSERT_CHUNK)?;
    for chunk in chunks {
        if chunk.dimensions() != expected {
            return Err(DbError::DimensionMismatch {
                expected,
                actual: chunk.dimensions(),
            });
        }

        stmt.execute(params![
            chunk.id,
            chunk.tenant_id,
            chunk.document_id,
            chunk.source_file_name,
            chunk.sequence_index,
            chunk.text,
            encode_vector(&chunk.embedding),
            chunk.dimensions() as i64,
        ])
        .map_err(|e| DbError::from_insert(e, format!("chunk {}", chunk.id)))?;
    }

    Ok(())
}
