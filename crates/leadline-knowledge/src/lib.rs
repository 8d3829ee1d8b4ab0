// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant knowledge base for Leadline.
//!
//! Documents are split by [`chunker::SemanticChunker`], embedded locally with
//! [`OnnxEmbedder`] and stored per tenant in SQLite. [`Retriever`] answers
//! queries with vector search followed by [`OnnxReranker`] cross-encoder
//! scoring. Models are fetched on first use by [`ModelManager`].

pub mod chunker;
pub mod embedder;
pub mod ingest;
pub mod model_manager;
mod onnx;
pub mod reranker;
pub mod retriever;
pub mod store;
pub mod types;

pub use chunker::SemanticChunker;
pub use embedder::OnnxEmbedder;
pub use ingest::{IngestReport, Ingestor};
pub use model_manager::{MARCO_RERANKER, MINILM_EMBEDDER, ModelManager, ModelSpec};
pub use reranker::OnnxReranker;
pub use retriever::Retriever;
pub use store::{DocumentStore, EmbeddedChunk};
pub use types::RetrievedChunk;
