// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Model-facing adapters extend the [`PluginAdapter`] base trait. All traits
//! use `#[async_trait]` so they can be shared as `Arc<dyn Trait>`.

pub mod adapter;
pub mod embedding;
pub mod lead_store;
pub mod provider;
pub mod rerank;
pub mod session_store;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use lead_store::LeadStore;
pub use provider::ProviderAdapter;
pub use rerank::RerankAdapter;
pub use session_store::SessionStore;
