// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation core of the Leadline lead-capture bot.
//!
//! - [`InboundHandler`] runs one turn per inbound message, serialized per
//!   session key by [`TurnLocks`].
//! - [`ConversationEngine`] makes the retrieval-augmented model call and
//!   owns the summarizer and sentiment scorer.
//! - [`InactivityMonitor`] finalizes idle conversations tracked in the
//!   [`SessionRegistry`].

pub mod engine;
pub mod ingress;
pub mod locks;
pub mod monitor;
pub mod prompts;
pub mod registry;
pub mod shutdown;

pub use engine::{ConversationEngine, EngineSettings, TurnState, parse_sentiment};
pub use ingress::InboundHandler;
pub use locks::TurnLocks;
pub use monitor::{FinalizeOutcome, InactivityMonitor, MonitorSettings, PassReport};
pub use registry::{ActiveSession, SessionRegistry};
pub use shutdown::install_signal_handler;
