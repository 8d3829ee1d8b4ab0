// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the webhook.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use leadline_agent::{InboundHandler, SessionRegistry};
use leadline_config::model::WhatsAppConfig;
use leadline_core::LeadlineError;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::handlers;

const HEALTH_PATH: &str = "/health";

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub handler: Arc<InboundHandler>,
    pub registry: Arc<SessionRegistry>,
    /// Reply sent when a request cannot be turned into a conversation turn.
    pub apology: String,
    pub start_time: Instant,
}

impl WebhookState {
    pub fn new(
        handler: Arc<InboundHandler>,
        registry: Arc<SessionRegistry>,
        apology: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            registry,
            apology: apology.into(),
            start_time: Instant::now(),
        }
    }
}

/// Builds the webhook router.
///
/// Routes:
/// - POST `webhook_path` (Twilio form callback, TwiML reply)
/// - GET /health
pub fn router(webhook_path: &str, state: WebhookState) -> Result<Router, LeadlineError> {
    let path = normalize_path(webhook_path)?;
    Ok(Router::new()
        .route(&path, post(handlers::post_inbound))
        .route(HEALTH_PATH, get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn normalize_path(webhook_path: &str) -> Result<String, LeadlineError> {
    let trimmed = webhook_path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(LeadlineError::Config(
            "whatsapp.webhook_path must not be empty or \"/\"".into(),
        ));
    }
    let path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    if path == HEALTH_PATH {
        return Err(LeadlineError::Config(format!(
            "whatsapp.webhook_path must not be {HEALTH_PATH}"
        )));
    }
    Ok(path)
}

/// Serves the webhook until `cancel` fires, then drains in-flight requests.
pub async fn start_server(
    config: &WhatsAppConfig,
    state: WebhookState,
    cancel: CancellationToken,
) -> Result<(), LeadlineError> {
    let app = router(&config.webhook_path, state)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadlineError::Channel {
            message: format!("failed to bind webhook to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!(
        addr = %addr,
        webhook_path = %config.webhook_path,
        "whatsapp webhook listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| LeadlineError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("whatsapp webhook stopped");
    Ok(())
}
