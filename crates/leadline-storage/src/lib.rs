// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Leadline lead-capture bot.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, the TTL session store and the
//! lead store. The document corpus lives in the same database and is queried
//! by `leadline-knowledge`.

pub mod database;
pub mod lead_store;
pub mod migrations;
pub mod queries;
pub mod session_store;

pub use database::Database;
pub use lead_store::SqliteLeadStore;
pub use session_store::SqliteSessionStore;
