// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL key/value records backing the session store.
//!
//! Expiry is a unix timestamp in seconds. A record is live while
//! `expires_at > now`.

use leadline_core::LeadlineError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Upserts every `(key, value)` pair in one transaction with the same expiry.
pub async fn put_records(
    db: &Database,
    records: Vec<(String, String)>,
    expires_at: i64,
) -> Result<(), LeadlineError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO session_records (record_key, value, expires_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(record_key) DO UPDATE SET
                         value = excluded.value,
                         expires_at = excluded.expires_at",
                )?;
                for (key, value) in &records {
                    stmt.execute(params![key, value, expires_at])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Returns the value of a live record.
pub async fn get_record(db: &Database, key: &str, now: i64) -> Result<Option<String>, LeadlineError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM session_records WHERE record_key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes the given keys and returns how many rows were removed.
pub async fn delete_records(db: &Database, keys: Vec<String>) -> Result<usize, LeadlineError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let mut removed = 0;
            let mut stmt = conn.prepare("DELETE FROM session_records WHERE record_key = ?1")?;
            for key in &keys {
                removed += stmt.execute(params![key])?;
            }
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Removes every record whose expiry is at or before `now`.
pub async fn purge_expired(db: &Database, now: i64) -> Result<usize, LeadlineError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM session_records WHERE expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}
