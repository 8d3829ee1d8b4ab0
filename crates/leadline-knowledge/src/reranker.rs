// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-encoder reranker (ms-marco-MiniLM-L-6-v2) on ONNX Runtime.
//!
//! Each (query, passage) pair is encoded jointly and the single output logit
//! is the relevance score. Higher is more relevant; scores are unbounded.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use leadline_core::traits::{PluginAdapter, RerankAdapter};
use leadline_core::types::{RerankInput, RerankOutput};
use leadline_core::{AdapterType, HealthStatus, LeadlineError};

use crate::onnx::OnnxModel;

const MAX_TOKENS: usize = 512;

pub struct OnnxReranker {
    model: Arc<OnnxModel>,
}

impl OnnxReranker {
    pub fn new(model_path: &Path) -> Result<Self, LeadlineError> {
        Ok(Self {
            model: Arc::new(OnnxModel::load(model_path, MAX_TOKENS)?),
        })
    }
}

fn score_pair(model: &OnnxModel, query: &str, passage: &str) -> Result<f32, LeadlineError> {
    let encoding = model.encode((query, passage))?;
    let (shape, data) = model.infer(&encoding)?;
    data.first()
        .copied()
        .ok_or_else(|| LeadlineError::embedding(format!("empty reranker output, shape {shape:?}")))
}

#[async_trait]
impl PluginAdapter for OnnxReranker {
    fn name(&self) -> &str {
        "onnx-reranker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reranker
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        if self.model.is_healthy() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("ONNX session lock poisoned".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl RerankAdapter for OnnxReranker {
    async fn rerank(&self, input: RerankInput) -> Result<RerankOutput, LeadlineError> {
        let model = Arc::clone(&self.model);
        let count = input.documents.len();
        let scores = tokio::task::spawn_blocking(move || {
            input
                .documents
                .iter()
                .map(|doc| score_pair(&model, &input.query, doc))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| LeadlineError::embedding(format!("rerank task failed: {e}")))??;

        debug!(pairs = count, "reranked");
        Ok(RerankOutput { scores })
    }
}
