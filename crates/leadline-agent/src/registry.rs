// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide registry of active conversations.
//!
//! Written by every inbound turn and scanned by the inactivity monitor.
//! Scans work on a point-in-time [`snapshot`](SessionRegistry::snapshot),
//! so concurrent inserts and removals never disturb an iteration.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use leadline_core::{Identity, SessionKey};

/// What the monitor needs to know about one tracked conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub identity: Identity,
    pub last_active: Option<DateTime<Utc>>,
    pub finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl ActiveSession {
    fn new(identity: &Identity, last_active: Option<DateTime<Utc>>) -> Self {
        Self {
            identity: identity.clone(),
            last_active,
            finalized: false,
            finalized_at: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, ActiveSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `key` without an activity time. A finalized entry is
    /// replaced by a new lifetime; an active one is left untouched.
    pub fn register(&self, key: &SessionKey, identity: &Identity) {
        self.sessions
            .entry(key.clone())
            .and_modify(|entry| {
                if entry.finalized {
                    *entry = ActiveSession::new(identity, None);
                }
            })
            .or_insert_with(|| ActiveSession::new(identity, None));
    }

    /// Records activity at `at`. Touching a finalized entry starts a new lifetime.
    pub fn touch(&self, key: &SessionKey, identity: &Identity, at: DateTime<Utc>) {
        self.sessions
            .entry(key.clone())
            .and_modify(|entry| {
                if entry.finalized {
                    *entry = ActiveSession::new(identity, Some(at));
                } else {
                    entry.identity = identity.clone();
                    entry.last_active = Some(at);
                }
            })
            .or_insert_with(|| ActiveSession::new(identity, Some(at)));
    }

    pub fn get(&self, key: &SessionKey) -> Option<ActiveSession> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    /// Copies every entry out of the map.
    pub fn snapshot(&self) -> Vec<(SessionKey, ActiveSession)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Marks the entry finalized. Returns `false` if it was missing or
    /// already finalized, so at most one caller wins.
    pub fn mark_finalized(&self, key: &SessionKey, at: DateTime<Utc>) -> bool {
        match self.sessions.get_mut(key) {
            Some(mut entry) if !entry.finalized => {
                entry.finalized = true;
                entry.finalized_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, key: &SessionKey) -> Option<ActiveSession> {
        self.sessions.remove(key).map(|(_, entry)| entry)
    }

    /// Drops finalized entries finalized before `older_than`. Returns the count.
    pub fn prune_finalized(&self, older_than: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            !(entry.finalized && entry.finalized_at.is_some_and(|at| at < older_than))
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
