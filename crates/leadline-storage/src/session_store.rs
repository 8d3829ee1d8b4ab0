// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionStore`] trait.
//!
//! Each session is two records: `history:{key}` holds the message list and
//! `leadstate:{key}` holds [`SessionMetadata`]. Both are written together and
//! share one expiry, refreshed on every save.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use leadline_config::model::SessionConfig;
use leadline_core::types::SessionMetadata;
use leadline_core::{Identity, LeadlineError, Message, Session, SessionKey, SessionStore, with_timeout};

use crate::database::Database;
use crate::queries::session_records;

fn history_key(key: &SessionKey) -> String {
    format!("history:{key}")
}

fn state_key(key: &SessionKey) -> String {
    format!("leadstate:{key}")
}

/// Session store over the `session_records` table.
pub struct SqliteSessionStore {
    db: Database,
    ttl: Duration,
    call_timeout: Duration,
}

impl SqliteSessionStore {
    pub fn new(db: Database, ttl: Duration, call_timeout: Duration) -> Self {
        Self {
            db,
            ttl,
            call_timeout,
        }
    }

    pub fn from_config(db: Database, config: &SessionConfig) -> Self {
        Self::new(
            db,
            Duration::from_secs(config.ttl_secs),
            Duration::from_secs(config.store_timeout_secs),
        )
    }

    async fn load(&self, key: &SessionKey) -> Result<Option<Session>, LeadlineError> {
        let now = Utc::now().timestamp();
        let (state, history) = with_timeout(self.call_timeout, async {
            let state = session_records::get_record(&self.db, &state_key(key), now).await?;
            let history = session_records::get_record(&self.db, &history_key(key), now).await?;
            Ok((state, history))
        })
        .await?;

        let Some(state) = state else {
            return Ok(None);
        };
        let metadata: SessionMetadata =
            serde_json::from_str(&state).map_err(LeadlineError::storage)?;
        let messages: Vec<Message> = match history {
            Some(history) => serde_json::from_str(&history).map_err(LeadlineError::storage)?,
            None => Vec::new(),
        };
        Ok(Some(Session::restore(metadata, messages)))
    }

    async fn store(&self, key: &SessionKey, session: &Session) -> Result<(), LeadlineError> {
        let history = serde_json::to_string(session.messages()).map_err(LeadlineError::storage)?;
        let state = serde_json::to_string(&session.metadata()).map_err(LeadlineError::storage)?;
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);

        with_timeout(
            self.call_timeout,
            session_records::put_records(
                &self.db,
                vec![(history_key(key), history), (state_key(key), state)],
                expires_at,
            ),
        )
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, key: &SessionKey, identity: &Identity) -> Session {
        match self.load(key).await {
            Ok(Some(session)) => {
                debug!(session_key = %key, messages = session.messages().len(), "session loaded");
                session
            }
            Ok(None) => Session::new(identity),
            Err(e) => {
                warn!(session_key = %key, error = %e, "unreadable session state, starting fresh");
                Session::new(identity)
            }
        }
    }

    async fn save(&self, key: &SessionKey, session: &Session) {
        if let Err(e) = self.store(key, session).await {
            warn!(session_key = %key, error = %e, "failed to persist session");
        }
    }

    async fn delete(&self, key: &SessionKey) {
        let keys = vec![history_key(key), state_key(key)];
        match with_timeout(
            self.call_timeout,
            session_records::delete_records(&self.db, keys),
        )
        .await
        {
            Ok(removed) => debug!(session_key = %key, removed, "session records deleted"),
            Err(e) => warn!(session_key = %key, error = %e, "failed to delete session records"),
        }
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now().timestamp();
        match with_timeout(
            self.call_timeout,
            session_records::purge_expired(&self.db, now),
        )
        .await
        {
            Ok(purged) => purged,
            Err(e) => {
                warn!(error = %e, "failed to purge expired session records");
                0
            }
        }
    }
}
