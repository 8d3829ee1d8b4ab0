// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp webhook ingress for Leadline.
//!
//! Accepts Twilio-style form callbacks, maps the business number to a
//! tenant and the sender to a user, runs one conversation turn through the
//! [`InboundHandler`](leadline_agent::InboundHandler) and answers with a
//! TwiML message.

pub mod handlers;
pub mod server;
pub mod twiml;

pub use handlers::{CHANNEL, InboundForm, strip_channel_prefix};
pub use server::{WebhookState, router, start_server};
