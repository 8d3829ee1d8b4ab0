// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline ingestion of tenant documents into the retrieval corpus.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use leadline_core::types::{DocumentChunk, EmbeddingInput};
use leadline_core::{EmbeddingAdapter, LeadlineError, TenantId};
use tracing::{info, warn};

use crate::chunker::SemanticChunker;
use crate::store::{DocumentStore, EmbeddedChunk};

const INGESTIBLE_EXTENSIONS: &[&str] = &["txt", "md"];

/// Result of ingesting a directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub failed: Vec<PathBuf>,
}

pub struct Ingestor {
    chunker: SemanticChunker,
    embedder: Arc<dyn EmbeddingAdapter>,
    store: DocumentStore,
}

impl Ingestor {
    pub fn new(
        chunker: SemanticChunker,
        embedder: Arc<dyn EmbeddingAdapter>,
        store: DocumentStore,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Chunks, embeds and stores one file, replacing whatever was stored
    /// for the same path. Returns the number of chunks written.
    pub async fn ingest_file(&self, tenant_id: &TenantId, path: &Path) -> Result<usize, LeadlineError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            LeadlineError::Internal(format!("failed to read {}: {e}", path.display()))
        })?;
        let source_path = path.display().to_string();

        let pieces = self.chunker.chunk(&text).await?;
        if pieces.is_empty() {
            let removed = self.store.delete_source(tenant_id, &source_path).await?;
            info!(tenant_id = %tenant_id, source = %source_path, removed, "empty document, nothing stored");
            return Ok(0);
        }

        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: pieces.clone(),
            })
            .await?;
        if output.embeddings.len() != pieces.len() {
            return Err(LeadlineError::embedding(format!(
                "expected {} chunk embeddings, got {}",
                pieces.len(),
                output.embeddings.len()
            )));
        }

        let document_id = uuid::Uuid::new_v4().to_string();
        let total = u32::try_from(pieces.len())
            .map_err(|_| LeadlineError::Internal(format!("too many chunks in {source_path}")))?;
        let chunks: Vec<EmbeddedChunk> = pieces
            .into_iter()
            .zip(output.embeddings)
            .zip(1..=total)
            .map(|((text, embedding), index)| EmbeddedChunk {
                chunk: DocumentChunk {
                    id: uuid::Uuid::new_v4().to_string(),
                    text,
                    tenant_id: tenant_id.clone(),
                    document_id: document_id.clone(),
                    chunk_index: index,
                    total_chunks: total,
                    source_path: source_path.clone(),
                },
                embedding,
            })
            .collect();

        let (removed, inserted) = self
            .store
            .replace_source(tenant_id, &source_path, chunks)
            .await?;
        info!(
            tenant_id = %tenant_id,
            source = %source_path,
            document_id = %document_id,
            removed,
            inserted,
            "document ingested"
        );
        Ok(inserted)
    }

    /// Ingests every `.txt` and `.md` file under `dir`, recursively.
    /// A failing file is logged and skipped.
    pub async fn ingest_dir(&self, tenant_id: &TenantId, dir: &Path) -> Result<IngestReport, LeadlineError> {
        let files = collect_files(dir).await?;
        let mut report = IngestReport::default();
        for file in files {
            match self.ingest_file(tenant_id, &file).await {
                Ok(chunks) => {
                    report.files += 1;
                    report.chunks += chunks;
                }
                Err(e) => {
                    warn!(tenant_id = %tenant_id, file = %file.display(), error = %e, "ingestion failed");
                    report.failed.push(file);
                }
            }
        }
        Ok(report)
    }
}

async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, LeadlineError> {
    let io_err = |dir: &Path, e: std::io::Error| {
        LeadlineError::Internal(format!("failed to read directory {}: {e}", dir.display()))
    };

    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| io_err(dir.as_path(), e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(dir.as_path(), e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| io_err(dir.as_path(), e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| INGESTIBLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
