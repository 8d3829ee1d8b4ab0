// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session-key turn serialization.
//!
//! An inbound turn and a monitor finalization for the same key hold the
//! same mutex, so they never interleave. Different keys never contend.

use std::sync::Arc;

use dashmap::DashMap;
use leadline_core::SessionKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct TurnLocks {
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        // The map shard guard must be released before awaiting.
        let mutex = self.locks.entry(key.clone()).or_default().value().clone();
        mutex.lock_owned().await
    }

    /// Forgets locks nobody holds or waits on. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
