// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rerank adapter trait for pairwise relevance scoring.

use async_trait::async_trait;

use crate::error::LeadlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{RerankInput, RerankOutput};

/// Adapter that jointly scores (query, passage) pairs, cross-encoder style.
#[async_trait]
pub trait RerankAdapter: PluginAdapter {
    /// Scores every document against the query. Output order matches input order.
    async fn rerank(&self, input: RerankInput) -> Result<RerankOutput, LeadlineError>;
}
