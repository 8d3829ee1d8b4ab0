// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves and loads the ONNX retrieval models.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use leadline_config::model::LeadlineConfig;
use leadline_core::{EmbeddingAdapter, LeadlineError, RerankAdapter};
use leadline_knowledge::{ModelManager, ModelSpec, OnnxEmbedder, OnnxReranker};
use tracing::info;

/// Root directory for downloaded models: `retrieval.model_dir`, else the
/// database's directory.
pub fn data_dir(config: &LeadlineConfig) -> PathBuf {
    match &config.retrieval.model_dir {
        Some(dir) => PathBuf::from(dir),
        None => Path::new(&config.storage.database_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Downloads the embedding model if missing and loads it.
pub async fn load_embedder(
    manager: &ModelManager,
    config: &LeadlineConfig,
) -> Result<Arc<dyn EmbeddingAdapter>, LeadlineError> {
    let spec = ModelSpec::lookup(&config.retrieval.embedding_model)?;
    let path = manager.ensure(&spec).await?;
    info!(model = spec.name, path = %path.display(), "embedding model ready");
    Ok(Arc::new(OnnxEmbedder::new(&path)?))
}

/// Downloads the cross-encoder if missing and loads it.
pub async fn load_reranker(
    manager: &ModelManager,
    config: &LeadlineConfig,
) -> Result<Arc<dyn RerankAdapter>, LeadlineError> {
    let spec = ModelSpec::lookup(&config.retrieval.reranker_model)?;
    let path = manager.ensure(&spec).await?;
    info!(model = spec.name, path = %path.display(), "reranker model ready");
    Ok(Arc::new(OnnxReranker::new(&path)?))
}
