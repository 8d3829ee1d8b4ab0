// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-stage retrieval: vector search over the tenant's chunks, then
//! cross-encoder reranking.
//!
//! 1. Embed the query
//! 2. Fetch `2 * top_k` nearest chunks by L2 distance
//! 3. Rerank every candidate against the query
//! 4. Sort by rerank score descending, drop those under `min_rerank_score`
//! 5. Keep `top_k`

use std::sync::Arc;
use std::time::Duration;

use leadline_config::model::RetrievalConfig;
use leadline_core::types::{EmbeddingInput, RerankInput};
use leadline_core::{EmbeddingAdapter, LeadlineError, RerankAdapter, TenantId, with_timeout};
use tracing::debug;

use crate::store::DocumentStore;
use crate::types::{RetrievedChunk, distance_to_similarity};

/// Candidate pool size relative to `top_k`.
const CANDIDATE_FACTOR: usize = 2;

pub struct Retriever {
    store: DocumentStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    reranker: Arc<dyn RerankAdapter>,
    min_rerank_score: Option<f32>,
    call_timeout: Duration,
}

impl Retriever {
    pub fn new(
        store: DocumentStore,
        embedder: Arc<dyn EmbeddingAdapter>,
        reranker: Arc<dyn RerankAdapter>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            min_rerank_score: config.min_rerank_score,
            call_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// The `top_k` most relevant chunks of `tenant_id`'s corpus, best first.
    pub async fn query(
        &self,
        text: &str,
        tenant_id: &TenantId,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, LeadlineError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let output = with_timeout(
            self.call_timeout,
            self.embedder.embed(EmbeddingInput {
                texts: vec![text.to_string()],
            }),
        )
        .await?;
        let query_vec = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LeadlineError::embedding("embedding returned no vectors"))?;

        let candidates = with_timeout(
            self.call_timeout,
            self.store
                .search(tenant_id, &query_vec, top_k.saturating_mul(CANDIDATE_FACTOR)),
        )
        .await?;
        if candidates.is_empty() {
            debug!(tenant_id = %tenant_id, "no candidates for query");
            return Ok(Vec::new());
        }

        let scores = with_timeout(
            self.call_timeout,
            self.reranker.rerank(RerankInput {
                query: text.to_string(),
                documents: candidates.iter().map(|(c, _)| c.text.clone()).collect(),
            }),
        )
        .await?
        .scores;
        if scores.len() != candidates.len() {
            return Err(LeadlineError::embedding(format!(
                "reranker scored {} of {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut ranked: Vec<RetrievedChunk> = candidates
            .into_iter()
            .zip(scores)
            .map(|((chunk, distance), rerank_score)| RetrievedChunk {
                chunk,
                distance,
                similarity: distance_to_similarity(distance),
                rerank_score,
            })
            .filter(|r| self.min_rerank_score.is_none_or(|min| r.rerank_score >= min))
            .collect();
        ranked.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);

        for hit in &ranked {
            debug!(
                tenant_id = %tenant_id,
                chunk_id = %hit.chunk.id,
                distance = hit.distance,
                similarity = hit.similarity,
                rerank_score = hit.rerank_score,
                "retrieved chunk"
            );
        }
        Ok(ranked)
    }
}
