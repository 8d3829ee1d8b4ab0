// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadline leads` command implementation.

use leadline_config::model::LeadlineConfig;
use leadline_core::{LeadStore, LeadlineError, TenantId};
use leadline_storage::{Database, SqliteLeadStore};

/// Runs the `leadline leads` command, printing JSON to stdout.
pub async fn run_leads(config: &LeadlineConfig, tenant: &str) -> Result<(), LeadlineError> {
    let tenant_id = TenantId::new(tenant)?;
    let db = Database::from_config(&config.storage).await?;
    let store = SqliteLeadStore::new(db.clone());

    let json = leads_json(&store, &tenant_id).await?;
    println!("{json}");

    db.close().await
}

/// Renders a tenant's leads, newest first, as pretty JSON.
pub async fn leads_json(store: &dyn LeadStore, tenant_id: &TenantId) -> Result<String, LeadlineError> {
    let leads = store.list_leads(tenant_id).await?;
    serde_json::to_string_pretty(&leads)
        .map_err(|e| LeadlineError::Internal(format!("failed to serialize leads: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_core::{Sentiment, SentimentLabel};

    #[tokio::test]
    async fn leads_render_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("leads.db").to_str().unwrap())
            .await
            .unwrap();
        let store = SqliteLeadStore::new(db);
        let tenant = TenantId::new("+15550001").unwrap();

        store.capture_initial_contact(&tenant, "+15559991", "Asha").await.unwrap();
        store.capture_initial_contact(&tenant, "+15559992", "Ravi").await.unwrap();
        store
            .patch_latest(
                &tenant,
                "+15559991",
                "Wants a quote.",
                Sentiment::new(SentimentLabel::Positive, 0.6),
            )
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&leads_json(&store, &tenant).await.unwrap()).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["username"], "Ravi");
        assert_eq!(rows[1]["summary"], "Wants a quote.");
    }

    #[tokio::test]
    async fn unknown_tenant_renders_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("leads.db").to_str().unwrap())
            .await
            .unwrap();
        let store = SqliteLeadStore::new(db);
        let json = leads_json(&store, &TenantId::new("nobody").unwrap()).await.unwrap();
        assert_eq!(json, "[]");
    }
}
