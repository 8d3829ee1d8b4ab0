// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`LeadStore`] trait.

use async_trait::async_trait;
use tracing::{debug, info};

use leadline_core::traits::lead_store::PLACEHOLDER_SUMMARY;
use leadline_core::types::LeadRecord;
use leadline_core::{LeadStore, LeadlineError, Sentiment, SentimentLabel, TenantId};

use crate::database::Database;
use crate::queries::leads;

/// Lead store over the `leads` table.
pub struct SqliteLeadStore {
    db: Database,
}

impl SqliteLeadStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn capture_initial_contact(
        &self,
        tenant_id: &TenantId,
        phone_number: &str,
        username: &str,
    ) -> Result<i64, LeadlineError> {
        let id = leads::insert_lead(
            &self.db,
            tenant_id,
            phone_number,
            username,
            PLACEHOLDER_SUMMARY,
            SentimentLabel::Neutral,
            0.0,
        )
        .await?;
        info!(tenant_id = %tenant_id, lead_id = id, "initial contact captured");
        Ok(id)
    }

    async fn patch_latest(
        &self,
        tenant_id: &TenantId,
        phone_number: &str,
        summary: &str,
        sentiment: Sentiment,
    ) -> Result<bool, LeadlineError> {
        let patched = leads::patch_latest(
            &self.db,
            tenant_id,
            phone_number,
            summary,
            sentiment.label(),
            sentiment.score(),
        )
        .await?;
        debug!(tenant_id = %tenant_id, patched, "lead patch applied");
        Ok(patched)
    }

    async fn list_leads(&self, tenant_id: &TenantId) -> Result<Vec<LeadRecord>, LeadlineError> {
        leads::list_for_tenant(&self.db, tenant_id).await
    }
}
