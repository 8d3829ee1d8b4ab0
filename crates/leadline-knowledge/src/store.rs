// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed tenant document store with embedding BLOBs.
//!
//! Every read is filtered by tenant in SQL. Rows coming back are checked
//! again before they leave this module.

use leadline_core::types::DocumentChunk;
use leadline_core::{LeadlineError, TenantId};
use leadline_storage::Database;
use leadline_storage::database::map_tr_err;
use rusqlite::params;
use tracing::{debug, error};

use crate::types::{blob_to_vec, l2_distance, vec_to_blob};

/// id, tenant_id, document_id, source_path, chunk_index, total_chunks, text, embedding
type ChunkRow = (String, String, String, String, u32, u32, String, Vec<u8>);

/// A chunk paired with its embedding, ready to be stored.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// Persistent store for ingested document chunks.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts chunks in one transaction.
    pub async fn insert_chunks(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize, LeadlineError> {
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let inserted = insert_all(&tx, &chunks)?;
                tx.commit()?;
                Ok(inserted)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Removes every chunk of one source file for the tenant.
    pub async fn delete_source(
        &self,
        tenant_id: &TenantId,
        source_path: &str,
    ) -> Result<usize, LeadlineError> {
        let tenant = tenant_id.as_str().to_string();
        let source = source_path.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM document_chunks WHERE tenant_id = ?1 AND source_path = ?2",
                    params![tenant, source],
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Atomically swaps the chunks of one source file for new ones.
    /// Returns `(removed, inserted)`.
    pub async fn replace_source(
        &self,
        tenant_id: &TenantId,
        source_path: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(usize, usize), LeadlineError> {
        if let Some(stray) = chunks
            .iter()
            .find(|c| c.chunk.tenant_id != *tenant_id || c.chunk.source_path != source_path)
        {
            return Err(LeadlineError::TenantViolation(format!(
                "chunk {} does not belong to {tenant_id}:{source_path}",
                stray.chunk.id
            )));
        }

        let tenant = tenant_id.as_str().to_string();
        let source = source_path.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(usize, usize), rusqlite::Error> {
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM document_chunks WHERE tenant_id = ?1 AND source_path = ?2",
                    params![tenant, source],
                )?;
                let inserted = insert_all(&tx, &chunks)?;
                tx.commit()?;
                Ok((removed, inserted))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Nearest chunks of this tenant by L2 distance, closest first.
    ///
    /// Rows whose embedding dimension differs from the query are skipped.
    /// A row of a different tenant is a [`LeadlineError::TenantViolation`].
    pub async fn search(
        &self,
        tenant_id: &TenantId,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(DocumentChunk, f32)>, LeadlineError> {
        let tenant = tenant_id.as_str().to_string();
        let rows = self
            .db
            .connection()
            .call(move |conn| -> Result<Vec<ChunkRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, tenant_id, document_id, source_path, chunk_index, total_chunks, text, embedding
                     FROM document_chunks WHERE tenant_id = ?1",
                )?;
                let rows = stmt.query_map(params![tenant], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for (id, row_tenant, document_id, source_path, chunk_index, total_chunks, text, blob) in rows {
            if row_tenant != tenant_id.as_str() {
                error!(tenant_id = %tenant_id, row_tenant = %row_tenant, chunk_id = %id, "cross-tenant row in search result");
                return Err(LeadlineError::TenantViolation(format!(
                    "chunk {id} belongs to another tenant"
                )));
            }
            let Some(distance) = l2_distance(query, &blob_to_vec(&blob)) else {
                debug!(chunk_id = %id, "skipping chunk with mismatched embedding dimension");
                continue;
            };
            let chunk = DocumentChunk {
                id,
                text,
                tenant_id: tenant_id.clone(),
                document_id,
                chunk_index,
                total_chunks,
                source_path,
            };
            scored.push((chunk, distance));
        }

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Number of chunks stored for the tenant.
    pub async fn count(&self, tenant_id: &TenantId) -> Result<usize, LeadlineError> {
        let tenant = tenant_id.as_str().to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM document_chunks WHERE tenant_id = ?1",
                    params![tenant],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
            .map(|n| usize::try_from(n).unwrap_or(0))
    }
}

fn insert_all(tx: &rusqlite::Transaction<'_>, chunks: &[EmbeddedChunk]) -> Result<usize, rusqlite::Error> {
    let mut stmt = tx.prepare(
        "INSERT INTO document_chunks
             (id, tenant_id, document_id, source_path, chunk_index, total_chunks, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut inserted = 0;
    for EmbeddedChunk { chunk, embedding } in chunks {
        inserted += stmt.execute(params![
            chunk.id,
            chunk.tenant_id.as_str(),
            chunk.document_id,
            chunk.source_path,
            chunk.chunk_index,
            chunk.total_chunks,
            chunk.text,
            vec_to_blob(embedding),
        ])?;
    }
    Ok(inserted)
}
