// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadline ingest` command implementation.

use std::path::Path;

use leadline_config::model::LeadlineConfig;
use leadline_core::{LeadlineError, TenantId};
use leadline_knowledge::{DocumentStore, IngestReport, Ingestor, ModelManager, SemanticChunker};
use leadline_storage::Database;
use tracing::{info, warn};

use crate::models;

/// Runs the `leadline ingest` command.
pub async fn run_ingest(config: &LeadlineConfig, tenant: &str, path: &Path) -> Result<(), LeadlineError> {
    let tenant_id = TenantId::new(tenant)?;
    let db = Database::from_config(&config.storage).await?;

    let manager = ModelManager::new(models::data_dir(config));
    let embedder = models::load_embedder(&manager, config).await?;
    let chunker = SemanticChunker::new(
        embedder.clone(),
        config.ingest.breakpoint_percentile,
        config.ingest.max_chunk_chars,
    );
    let store = DocumentStore::new(db.clone());
    let ingestor = Ingestor::new(chunker, embedder, store.clone());

    let report = ingest_path(&ingestor, &tenant_id, path).await?;
    let total = store.count(&tenant_id).await?;
    println!(
        "ingested {} file(s), {} chunk(s) for tenant {tenant_id}; {total} chunk(s) stored",
        report.files, report.chunks
    );
    for failed in &report.failed {
        println!("failed: {}", failed.display());
    }

    db.close().await?;
    if report.files == 0 && !report.failed.is_empty() {
        return Err(LeadlineError::Internal(format!(
            "no documents under {} could be ingested",
            path.display()
        )));
    }
    Ok(())
}

/// Ingests a single file or every supported file under a directory.
pub async fn ingest_path(
    ingestor: &Ingestor,
    tenant_id: &TenantId,
    path: &Path,
) -> Result<IngestReport, LeadlineError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        LeadlineError::Internal(format!("cannot read {}: {e}", path.display()))
    })?;

    let report = if metadata.is_dir() {
        ingestor.ingest_dir(tenant_id, path).await?
    } else {
        let chunks = ingestor.ingest_file(tenant_id, path).await?;
        IngestReport {
            files: 1,
            chunks,
            failed: Vec::new(),
        }
    };

    if report.failed.is_empty() {
        info!(tenant_id = %tenant_id, files = report.files, chunks = report.chunks, "ingestion complete");
    } else {
        warn!(
            tenant_id = %tenant_id,
            files = report.files,
            failed = report.failed.len(),
            "ingestion finished with failures"
        );
    }
    Ok(report)
}
