// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadline integration tests.
//!
//! Provides mock adapters and a harness for deterministic tests that need
//! no network access or downloaded models.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock LLM provider with a queue of replies
//! - [`MockEmbedder`] / [`MockReranker`] - Deterministic retrieval models
//! - [`TestHarness`] - The full conversation stack over a temporary database

pub mod harness;
pub mod mock_models;
pub mod mock_provider;

pub use harness::{HARNESS_FALLBACK, TestHarness, TestHarnessBuilder};
pub use mock_models::{MockEmbedder, MockReranker};
pub use mock_provider::{DEFAULT_MOCK_REPLY, MockProvider};
