// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the WhatsApp webhook.
//!
//! Handles POST {webhook_path} and GET /health.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use leadline_core::{Identity, LeadlineError, SessionKey, TenantId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server::WebhookState;
use crate::twiml;

/// Channel name used as the session key prefix.
pub const CHANNEL: &str = "whatsapp";

const DEFAULT_DISPLAY_NAME: &str = "User";

/// Form body of a Twilio inbound message callback.
#[derive(Debug, Default, Deserialize)]
pub struct InboundForm {
    /// Business number the message was sent to, e.g. `whatsapp:+14155238886`.
    #[serde(rename = "To", default)]
    pub to: String,
    /// Sender number.
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Sender's WhatsApp profile name, when shared.
    #[serde(rename = "ProfileName", default)]
    pub profile_name: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Conversations currently tracked by the registry.
    pub active_sessions: usize,
}

/// POST {webhook_path}
///
/// Runs one conversation turn and answers with TwiML. Every outcome is a
/// 200 so the provider never retries a delivered message.
pub async fn post_inbound(
    State(state): State<WebhookState>,
    form: Result<Form<InboundForm>, FormRejection>,
) -> Response {
    let reply = match form {
        Ok(Form(form)) => match handle_turn(&state, form).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "webhook turn failed");
                state.apology.clone()
            }
        },
        Err(rejection) => {
            warn!(error = %rejection, "malformed webhook payload");
            state.apology.clone()
        }
    };
    twiml_reply(&reply)
}

async fn handle_turn(state: &WebhookState, form: InboundForm) -> Result<String, LeadlineError> {
    let tenant_id = TenantId::new(strip_channel_prefix(&form.to))?;
    let user_id = strip_channel_prefix(&form.from);
    let display_name = form
        .profile_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME);

    let session_key = SessionKey::for_channel(CHANNEL, &tenant_id, user_id)?;
    let identity = Identity::new(tenant_id.clone(), user_id, display_name);
    debug!(session_key = %session_key, "inbound whatsapp message");

    state
        .handler
        .handle_inbound(&session_key, &tenant_id, &identity, &form.body)
        .await
}

/// GET /health
pub async fn get_health(State(state): State<WebhookState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.registry.len(),
    })
}

/// Removes the `whatsapp:` address prefix Twilio puts on both numbers.
pub fn strip_channel_prefix(address: &str) -> &str {
    let address = address.trim();
    address
        .strip_prefix("whatsapp:")
        .map(str::trim)
        .unwrap_or(address)
}

fn twiml_reply(text: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, twiml::TWIML_CONTENT_TYPE)],
        twiml::message_response(text),
    )
        .into_response()
}
