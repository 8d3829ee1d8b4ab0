// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead record CRUD operations.

use leadline_core::types::LeadRecord;
use leadline_core::{LeadlineError, SentimentLabel, TenantId};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};

/// Inserts a lead and returns its row id.
pub async fn insert_lead(
    db: &Database,
    tenant_id: &TenantId,
    phone_number: &str,
    username: &str,
    summary: &str,
    label: SentimentLabel,
    score: f64,
) -> Result<i64, LeadlineError> {
    let tenant_id = tenant_id.as_str().to_string();
    let phone_number = phone_number.to_string();
    let username = username.to_string();
    let summary = summary.to_string();
    let label = label.as_str();

    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO leads (tenant_id, phone_number, username, summary, sentiment_label, sentiment_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![tenant_id, phone_number, username, summary, label, score],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Updates summary and sentiment on the newest lead for (tenant, phone).
/// Returns `false` if there is none.
pub async fn patch_latest(
    db: &Database,
    tenant_id: &TenantId,
    phone_number: &str,
    summary: &str,
    label: SentimentLabel,
    score: f64,
) -> Result<bool, LeadlineError> {
    let tenant_id = tenant_id.as_str().to_string();
    let phone_number = phone_number.to_string();
    let summary = summary.to_string();
    let label = label.as_str();

    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE leads SET summary = ?3, sentiment_label = ?4, sentiment_score = ?5
                 WHERE id = (
                     SELECT id FROM leads
                     WHERE tenant_id = ?1 AND phone_number = ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1
                 )",
                params![tenant_id, phone_number, summary, label, score],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All leads of a tenant, newest first.
pub async fn list_for_tenant(
    db: &Database,
    tenant_id: &TenantId,
) -> Result<Vec<LeadRecord>, LeadlineError> {
    let tenant_id = tenant_id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<LeadRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, phone_number, username, summary, sentiment_label,
                        sentiment_score, is_contacted, created_at
                 FROM leads WHERE tenant_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![tenant_id], row_to_lead)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_lead(row: &rusqlite::Row<'_>) -> Result<LeadRecord, rusqlite::Error> {
    let tenant: String = row.get(1)?;
    let tenant_id = TenantId::new(tenant)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let label: String = row.get(5)?;
    let sentiment_label = SentimentLabel::from_str_value(&label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown sentiment label `{label}`").into(),
        )
    })?;

    Ok(LeadRecord {
        id: row.get(0)?,
        tenant_id,
        phone_number: row.get(2)?,
        username: row.get(3)?,
        summary: row.get(4)?,
        sentiment_label,
        sentiment_score: row.get(6)?,
        is_contacted: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    #[tokio::test]
    async fn patch_touches_only_newest_row() {
        let (db, _dir) = setup_db().await;
        let t = tenant("+15550001");
        let first = insert_lead(&db, &t, "+4477", "Ann", "old", SentimentLabel::Neutral, 0.0)
            .await
            .unwrap();
        let second = insert_lead(&db, &t, "+4477", "Ann", "new", SentimentLabel::Neutral, 0.0)
            .await
            .unwrap();

        assert!(
            patch_latest(&db, &t, "+4477", "Wants a quote", SentimentLabel::Positive, 0.8)
                .await
                .unwrap()
        );

        let leads = list_for_tenant(&db, &t).await.unwrap();
        let by_id = |id| leads.iter().find(|l| l.id == id).unwrap();
        assert_eq!(by_id(second).summary, "Wants a quote");
        assert_eq!(by_id(second).sentiment_label, SentimentLabel::Positive);
        assert_eq!(by_id(first).summary, "old");
    }

    #[tokio::test]
    async fn patch_without_row_returns_false() {
        let (db, _dir) = setup_db().await;
        let patched = patch_latest(
            &db,
            &tenant("+1"),
            "+2",
            "s",
            SentimentLabel::Negative,
            -0.5,
        )
        .await
        .unwrap();
        assert!(!patched);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_tenant() {
        let (db, _dir) = setup_db().await;
        insert_lead(&db, &tenant("A"), "+1", "x", "s", SentimentLabel::Neutral, 0.0)
            .await
            .unwrap();
        insert_lead(&db, &tenant("B"), "+1", "y", "s", SentimentLabel::Neutral, 0.0)
            .await
            .unwrap();

        let leads = list_for_tenant(&db, &tenant("A")).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].username, "x");
        assert!(!leads[0].is_contacted);
    }

    #[tokio::test]
    async fn patch_does_not_cross_tenants() {
        let (db, _dir) = setup_db().await;
        insert_lead(&db, &tenant("A"), "+1", "x", "keep", SentimentLabel::Neutral, 0.0)
            .await
            .unwrap();

        let patched = patch_latest(&db, &tenant("B"), "+1", "leak", SentimentLabel::Positive, 1.0)
            .await
            .unwrap();
        assert!(!patched);
        assert_eq!(list_for_tenant(&db, &tenant("A")).await.unwrap()[0].summary, "keep");
    }
}
