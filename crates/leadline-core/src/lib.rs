// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadline lead-capture bot.
//!
//! Provides the error type, the domain types shared across crates, and the
//! adapter traits that the storage, model, and agent crates plug into.

pub mod deadline;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use deadline::with_timeout;
pub use error::LeadlineError;
pub use types::{
    AdapterType, HealthStatus, Identity, Message, Role, Sentiment, SentimentLabel, Session,
    SessionKey, TenantId,
};

pub use traits::{
    EmbeddingAdapter, LeadStore, PluginAdapter, ProviderAdapter, RerankAdapter, SessionStore,
};
