// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead store trait for durable lead records.

use async_trait::async_trait;

use crate::error::LeadlineError;
use crate::types::{LeadRecord, Sentiment, TenantId};

/// Summary stored on a lead before the conversation is finalized.
pub const PLACEHOLDER_SUMMARY: &str = "Conversation in progress";

/// Durable lead records, written in two phases: placeholder, then patch.
#[async_trait]
pub trait LeadStore: Send + Sync + 'static {
    /// Inserts a placeholder lead (neutral sentiment, [`PLACEHOLDER_SUMMARY`]).
    /// Returns the new row id.
    async fn capture_initial_contact(
        &self,
        tenant_id: &TenantId,
        phone_number: &str,
        username: &str,
    ) -> Result<i64, LeadlineError>;

    /// Updates the most recent lead for this tenant and phone number.
    /// Returns `false` when no such lead exists.
    async fn patch_latest(
        &self,
        tenant_id: &TenantId,
        phone_number: &str,
        summary: &str,
        sentiment: Sentiment,
    ) -> Result<bool, LeadlineError>;

    /// All leads of one tenant, newest first.
    async fn list_leads(&self, tenant_id: &TenantId) -> Result<Vec<LeadRecord>, LeadlineError>;
}
