// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait for durable, TTL-bounded conversation state.

use async_trait::async_trait;

use crate::types::{Identity, Session, SessionKey};

/// Per-user conversation state keyed by [`SessionKey`].
///
/// None of these methods fail from the caller's point of view: unreadable
/// records are treated as absent and write failures are logged by the
/// implementation. Callers serialize access per key.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the stored session, or a fresh one for `identity`.
    async fn get_or_create(&self, key: &SessionKey, identity: &Identity) -> Session;

    /// Persists the session and refreshes its expiry.
    async fn save(&self, key: &SessionKey, session: &Session);

    /// Removes all persisted state for the key. Idempotent.
    async fn delete(&self, key: &SessionKey);

    /// Drops records whose expiry has passed and returns how many were removed.
    async fn purge_expired(&self) -> usize;
}
