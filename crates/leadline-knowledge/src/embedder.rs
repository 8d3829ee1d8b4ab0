// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX embedding adapter for local inference using all-MiniLM-L6-v2.
//!
//! Produces 384-dimensional, L2-normalized embeddings on CPU. Inference runs
//! on the blocking thread pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use leadline_core::traits::{EmbeddingAdapter, PluginAdapter};
use leadline_core::types::{EmbeddingInput, EmbeddingOutput};
use leadline_core::{AdapterType, HealthStatus, LeadlineError};

use crate::onnx::OnnxModel;

/// Embedding dimensions for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Longest token sequence fed to the model.
const MAX_TOKENS: usize = 256;

/// ONNX-based sentence embedder.
pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
}

impl OnnxEmbedder {
    /// Loads the model at `model_path`; `tokenizer.json` must sit beside it.
    pub fn new(model_path: &Path) -> Result<Self, LeadlineError> {
        Ok(Self {
            model: Arc::new(OnnxModel::load(model_path, MAX_TOKENS)?),
        })
    }
}

fn embed_text(model: &OnnxModel, text: &str) -> Result<Vec<f32>, LeadlineError> {
    let encoding = model.encode(text)?;
    let (shape, data) = model.infer(&encoding)?;

    // Output is [1, seq_len, hidden].
    let hidden = shape
        .last()
        .and_then(|&h| usize::try_from(h).ok())
        .filter(|&h| h > 0)
        .ok_or_else(|| LeadlineError::embedding(format!("unexpected output shape {shape:?}")))?;
    let mask = encoding.get_attention_mask();
    Ok(l2_normalize(&mean_pool(&data, mask, hidden)))
}

/// Attention-masked mean over token embeddings.
fn mean_pool(embeddings: &[f32], attention_mask: &[u32], hidden: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token, &mask) in embeddings.chunks_exact(hidden).zip(attention_mask) {
        if mask == 0 {
            continue;
        }
        for (acc, value) in sum.iter_mut().zip(token) {
            *acc += value;
        }
        count += 1.0;
    }

    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
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
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LeadlineError> {
        let model = Arc::clone(&self.model);
        let embeddings = tokio::task::spawn_blocking(move || {
            input
                .texts
                .iter()
                .map(|text| embed_text(&model, text))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| LeadlineError::embedding(format!("embedding task failed: {e}")))??;

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: EMBEDDING_DIM,
        })
    }
}
