// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine: one retrieval-augmented model call per turn, plus
//! the summarizer and sentiment scorer used at finalization.
//!
//! None of the public operations surface external failures. A failed
//! model or retrieval call becomes the fallback reply, a failed summary
//! becomes an empty string, and a failed score becomes (Neutral, 0.0).

use std::sync::Arc;
use std::time::Duration;

use leadline_config::LeadlineConfig;
use leadline_core::types::ProviderRequest;
use leadline_core::{
    LeadlineError, Message, ProviderAdapter, Role, Sentiment, SentimentLabel, Session, with_timeout,
};
use leadline_knowledge::Retriever;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::prompts;

/// Where a session stands in its two-state turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// The newest message is from the user and awaits a reply.
    Generating,
    /// The reply has been handed off; waiting for the next inbound message.
    AwaitingHuman,
}

impl TurnState {
    pub fn of(session: &Session) -> Self {
        match session.messages().last() {
            Some(m) if m.role() == Role::User => Self::Generating,
            _ => Self::AwaitingHuman,
        }
    }
}

/// Engine tuning, resolved once at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub instruction: String,
    pub fallback_reply: String,
    pub top_k: usize,
    /// Bound on the reply model call.
    pub reply_timeout: Duration,
    /// Bound on each summarize and score call.
    pub finalize_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &LeadlineConfig, instruction: String) -> Self {
        // Each attempt may take the full HTTP timeout plus the 1s retry pause.
        let per_attempt = config.llm.timeout_secs.saturating_add(1);
        let attempts = u64::from(config.llm.max_retries).saturating_add(1);
        Self {
            instruction,
            fallback_reply: config.agent.fallback_reply.clone(),
            top_k: config.retrieval.top_k,
            reply_timeout: Duration::from_secs(per_attempt.saturating_mul(attempts)),
            finalize_timeout: Duration::from_secs(config.monitor.call_timeout_secs),
        }
    }
}

pub struct ConversationEngine {
    provider: Arc<dyn ProviderAdapter>,
    retriever: Arc<Retriever>,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        retriever: Arc<Retriever>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            retriever,
            settings,
        }
    }

    /// Answers the latest user message and appends exactly one assistant
    /// message to `session`.
    ///
    /// Provider, retrieval and timeout failures become the fallback reply.
    /// A finalized session, a session with no user message to answer, and
    /// a tenant violation are errors and leave `session` untouched.
    pub async fn respond(&self, session: &mut Session) -> Result<String, LeadlineError> {
        if session.is_finalized() {
            return Err(LeadlineError::Internal(
                "respond called on a finalized session".into(),
            ));
        }

        let reply = match self.generate(session).await {
            Ok(text) => text,
            Err(e @ (LeadlineError::TenantViolation(_) | LeadlineError::Internal(_))) => {
                return Err(e);
            }
            Err(e) => {
                warn!(
                    tenant_id = %session.tenant_id,
                    user_id = %session.user_id,
                    error = %e,
                    "reply generation failed, sending fallback"
                );
                self.settings.fallback_reply.clone()
            }
        };

        session.push(Message::assistant(reply.clone()))?;
        Ok(reply)
    }

    async fn generate(&self, session: &Session) -> Result<String, LeadlineError> {
        let question = session
            .last_user_message()
            .ok_or_else(|| LeadlineError::Internal("no user message to answer".into()))?;

        let context = self
            .retriever
            .query(question.content(), &session.tenant_id, self.settings.top_k)
            .await?;
        debug!(
            tenant_id = %session.tenant_id,
            chunks = context.len(),
            "context retrieved for turn"
        );

        let mut messages = Vec::with_capacity(session.messages().len() + 1);
        messages.push(Message::system(prompts::system_message(
            &self.settings.instruction,
            &session.identity(),
            &context,
        )));
        messages.extend(
            session
                .messages()
                .iter()
                .filter(|m| m.role() != Role::System)
                .cloned(),
        );

        let response = with_timeout(
            self.settings.reply_timeout,
            self.provider.complete(ProviderRequest::new(messages)),
        )
        .await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(LeadlineError::Provider {
                message: "model returned an empty reply".into(),
                source: None,
            });
        }
        Ok(text.to_string())
    }

    /// Summarizes the conversation for the sales team. Empty on failure.
    pub async fn summarize(&self, session: &Session) -> String {
        if session.messages().is_empty() {
            return String::new();
        }

        let prompt = prompts::summary_prompt(
            &prompts::transcript(session.messages()),
            &session.display_name,
            &session.user_id,
        );
        let request = ProviderRequest::new(vec![Message::system(prompt)]);
        match with_timeout(self.settings.finalize_timeout, self.provider.complete(request)).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(
                    tenant_id = %session.tenant_id,
                    user_id = %session.user_id,
                    error = %e,
                    "summarization failed, using empty summary"
                );
                String::new()
            }
        }
    }

    /// Scores a summary. Any failure yields exactly (Neutral, 0.0).
    pub async fn score_sentiment(&self, summary: &str) -> Sentiment {
        if summary.trim().is_empty() {
            return Sentiment::neutral();
        }

        let mut request = ProviderRequest::new(vec![Message::user(prompts::sentiment_prompt(summary))]);
        request.temperature = Some(0.0);
        let raw = match with_timeout(self.settings.finalize_timeout, self.provider.complete(request)).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "sentiment scoring failed, defaulting to neutral");
                return Sentiment::neutral();
            }
        };

        match parse_sentiment(&raw) {
            Some(sentiment) => sentiment,
            None => {
                warn!(raw = %raw, "unparseable sentiment output, defaulting to neutral");
                Sentiment::neutral()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawSentiment {
    sentiment_label: String,
    sentiment_score: f64,
}

/// Extracts `{sentiment_label, sentiment_score}` from model output.
///
/// Text around the outermost braces (code fences, preamble) is ignored.
/// The score is clamped to [-1.0, 1.0].
pub fn parse_sentiment(raw: &str) -> Option<Sentiment> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let parsed: RawSentiment = serde_json::from_str(&raw[start..=end]).ok()?;
    let label = SentimentLabel::from_str_value(&parsed.sentiment_label)?;
    Some(Sentiment::new(label, parsed.sentiment_score))
}
