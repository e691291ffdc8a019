//! Tenant-scoped similarity search over the chunk index.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use agentkb_core::{Chunk, ScoredChunk};
use rusqlite::params;
use std::cmp::Ordering;

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8], dimensions: i64) -> DbResult<Vec<f32>> {
    if dimensions < 0 || bytes.len() != dimensions as usize * 4 {
        return Err(DbError::InvalidData(format!(
            "stored vector has {} bytes for {} dimensions",
            bytes.len(),
            dimensions
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl Database {
    /// Find the `k` chunks of `tenant_id` most similar to `query_vector`.
    ///
    /// Only the tenant's own chunks are read, so ranking never sees another
    /// tenant's data. Results are ordered by descending cosine similarity;
    /// equal scores keep insertion order. An empty result is not an error.
    ///
    /// This is a brute-force scan, fine for per-agent collections of a few
    /// tens of thousands of chunks.
    pub fn search(
        &self,
        tenant_id: &str,
        query_vector: &[f32],
        k: usize,
    ) -> DbResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tenant_id, document_id, source_file_name, sequence_index, content, embedding, dimensions
            FROM chunks
            WHERE tenant_id = ?1
            ORDER BY seq ASC
            "#,
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            let chunk = Chunk {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                document_id: row.get(2)?,
                source_file_name: row.get(3)?,
                sequence_index: row.get(4)?,
                text: row.get(5)?,
                embedding: Vec::new(),
            };
            let bytes: Vec<u8> = row.get(6)?;
            let dimensions: i64 = row.get(7)?;
            Ok((chunk, bytes, dimensions))
        })?;

        let mut results: Vec<ScoredChunk> = Vec::new();

        for row in rows {
            let (mut chunk, bytes, dimensions) = row?;
            let vector = decode_vector(&bytes, dimensions)?;

            if vector.len() != query_vector.len() {
                return Err(DbError::DimensionMismatch {
                    expected: vector.len(),
                    actual: query_vector.len(),
                });
            }

            let similarity = cosine_similarity(query_vector, &vector);
            chunk.embedding = vector;
            results.push(ScoredChunk { chunk, similarity });
        }

        // Stable sort: ties (including 0.0 against -0.0) stay in insertion order.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }
}
