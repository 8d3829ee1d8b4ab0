// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding and rerank models.
//!
//! Vectors are derived from a hash of the text, so equal texts always embed
//! equally and no model files are needed.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use leadline_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, RerankInput, RerankOutput,
};
use leadline_core::{EmbeddingAdapter, LeadlineError, PluginAdapter, RerankAdapter};

/// Deterministic embedder with optional fixed vectors per text.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    fixed: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl MockEmbedder {
    /// Hash-derived vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fixed: HashMap::new(),
            fail: false,
        }
    }

    /// Exact vectors for the listed texts; other texts fall back to hashing
    /// with the same dimensionality.
    pub fn with_fixed(vectors: Vec<(&str, Vec<f32>)>) -> Self {
        let dimensions = vectors.first().map(|(_, v)| v.len()).unwrap_or(4);
        Self {
            dimensions,
            fixed: vectors
                .into_iter()
                .map(|(text, v)| (text.to_string(), v))
                .collect(),
            fail: false,
        }
    }

    /// An embedder whose every call fails.
    pub fn failing(dimensions: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimensions)
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.fixed.get(text) {
            return v.clone();
        }
        (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                // Map to [-1, 1].
                (hasher.finish() % 2001) as f32 / 1000.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LeadlineError> {
        if self.fail {
            return Err(LeadlineError::embedding("mock embedder configured to fail"));
        }
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

/// Reranker that scores documents from a lookup table (0.0 when absent).
///
/// Clones share the record of the last call.
#[derive(Debug, Clone, Default)]
pub struct MockReranker {
    scores: Arc<HashMap<String, f32>>,
    last_document_count: Arc<Mutex<Option<usize>>>,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores(scores: Vec<(&str, f32)>) -> Self {
        Self {
            scores: Arc::new(
                scores
                    .into_iter()
                    .map(|(doc, score)| (doc.to_string(), score))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Number of candidates passed to the most recent call, if any.
    pub fn last_document_count(&self) -> Option<usize> {
        self.last_document_count
            .lock()
            .map(|count| *count)
            .unwrap_or(None)
    }
}

#[async_trait]
impl PluginAdapter for MockReranker {
    fn name(&self) -> &str {
        "mock-reranker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reranker
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl RerankAdapter for MockReranker {
    async fn rerank(&self, input: RerankInput) -> Result<RerankOutput, LeadlineError> {
        if let Ok(mut count) = self.last_document_count.lock() {
            *count = Some(input.documents.len());
        }
        Ok(RerankOutput {
            scores: input
                .documents
                .iter()
                .map(|doc| self.scores.get(doc).copied().unwrap_or(0.0))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_vectors_are_stable() {
        let embedder = MockEmbedder::new(6);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["same".into(), "same".into(), "other".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 6);
        assert_eq!(out.embeddings[0], out.embeddings[1]);
        assert_ne!(out.embeddings[0], out.embeddings[2]);
        assert!(out.embeddings[0].iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn fixed_vectors_win_and_set_dimensions() {
        let embedder = MockEmbedder::with_fixed(vec![("known", vec![1.0, 0.0, 0.0])]);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["known".into(), "unknown".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.embeddings[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(out.embeddings[1].len(), 3);
    }

    #[tokio::test]
    async fn reranker_records_candidate_count() {
        let reranker = MockReranker::with_scores(vec![("a", 2.5)]);
        assert_eq!(reranker.last_document_count(), None);

        let out = reranker
            .clone()
            .rerank(RerankInput {
                query: "q".into(),
                documents: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.scores, vec![2.5, 0.0]);
        assert_eq!(reranker.last_document_count(), Some(2));
    }
}
