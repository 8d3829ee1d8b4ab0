// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the adapter traits and the conversation core.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LeadlineError;

// --- Identifiers ---

/// Business account whose corpus and leads are isolated from other tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id. Blank ids are a contract violation.
    pub fn new(id: impl Into<String>) -> Result<Self, LeadlineError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(LeadlineError::TenantViolation(
                "tenant id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = LeadlineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of one conversation, e.g. `whatsapp:+15550001:+15550002`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Creates a session key. Blank keys are rejected.
    pub fn new(key: impl Into<String>) -> Result<Self, LeadlineError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(LeadlineError::Internal("session key must not be empty".into()));
        }
        Ok(Self(key))
    }

    /// Builds the key for a user talking to a tenant over a channel.
    pub fn for_channel(
        channel: &str,
        tenant_id: &TenantId,
        user_id: &str,
    ) -> Result<Self, LeadlineError> {
        if user_id.trim().is_empty() {
            return Err(LeadlineError::Internal("user id must not be empty".into()));
        }
        Self::new(format!("{channel}:{tenant_id}:{}", user_id.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    Embedding,
    Reranker,
}

// --- Conversation ---

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One immutable conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<BTreeMap<String, String>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attaches metadata. Only available while building the message.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()
    }
}

/// Who a conversation is with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub tenant_id: TenantId,
    /// End-user address, e.g. the WhatsApp phone number.
    pub user_id: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(tenant_id: TenantId, user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Sentiment label assigned to a finalized conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Convert to the string stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }

    /// Parse a label, ignoring case and surrounding whitespace.
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentiment label with a score always inside [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    label: SentimentLabel,
    score: f64,
}

impl Sentiment {
    /// Creates a sentiment, clamping the score. NaN becomes 0.0.
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(-1.0, 1.0)
        };
        Self { label, score }
    }

    /// The fallback used whenever the scorer output cannot be trusted.
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }
    }

    pub fn label(&self) -> SentimentLabel {
        self.label
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

/// Persisted per-session metadata (everything except the message history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub tenant_id: TenantId,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finalized: bool,
    #[serde(default)]
    pub conversation_summary: Option<String>,
    #[serde(default)]
    pub sentiment_label: Option<SentimentLabel>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

/// One user's conversation state.
///
/// The message history is append-only and frozen once the session is
/// finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    messages: Vec<Message>,
    pub tenant_id: TenantId,
    pub user_id: String,
    pub display_name: String,
    last_active: Option<DateTime<Utc>>,
    finalized: bool,
    conversation_summary: Option<String>,
    sentiment_label: Option<SentimentLabel>,
    sentiment_score: Option<f64>,
}

impl Session {
    /// A fresh session with empty history.
    pub fn new(identity: &Identity) -> Self {
        Self {
            messages: Vec::new(),
            tenant_id: identity.tenant_id.clone(),
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            last_active: None,
            finalized: false,
            conversation_summary: None,
            sentiment_label: None,
            sentiment_score: None,
        }
    }

    /// Rebuilds a session from its two persisted records.
    pub fn restore(metadata: SessionMetadata, messages: Vec<Message>) -> Self {
        Self {
            messages,
            tenant_id: metadata.tenant_id,
            user_id: metadata.user_id,
            display_name: metadata.display_name,
            last_active: metadata.last_active,
            finalized: metadata.finalized,
            conversation_summary: metadata.conversation_summary,
            sentiment_label: metadata.sentiment_label,
            sentiment_score: metadata.sentiment_score,
        }
    }

    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            last_active: self.last_active,
            finalized: self.finalized,
            conversation_summary: self.conversation_summary.clone(),
            sentiment_label: self.sentiment_label,
            sentiment_score: self.sentiment_score,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(
            self.tenant_id.clone(),
            self.user_id.clone(),
            self.display_name.clone(),
        )
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.last_active
    }

    /// Stamps the latest activity time. A finalized session rejects it.
    pub fn set_last_active(&mut self, at: DateTime<Utc>) -> Result<(), LeadlineError> {
        if self.finalized {
            return Err(LeadlineError::Internal(
                "cannot touch a finalized session".into(),
            ));
        }
        self.last_active = Some(at);
        Ok(())
    }

    pub fn conversation_summary(&self) -> Option<&str> {
        self.conversation_summary.as_deref()
    }

    /// The finalization sentiment, present once the session is finalized.
    pub fn sentiment(&self) -> Option<Sentiment> {
        match (self.sentiment_label, self.sentiment_score) {
            (Some(label), Some(score)) => Some(Sentiment::new(label, score)),
            _ => None,
        }
    }

    /// Appends a message. A finalized session rejects all mutation.
    pub fn push(&mut self, message: Message) -> Result<(), LeadlineError> {
        if self.finalized {
            return Err(LeadlineError::Internal(
                "cannot append to a finalized session".into(),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    /// The most recent user-authored message, ignoring assistant replies.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role() == Role::User)
    }

    /// Records the finalization results. Fails if already finalized.
    pub fn finalize(&mut self, summary: String, sentiment: Sentiment) -> Result<(), LeadlineError> {
        if self.finalized {
            return Err(LeadlineError::Internal("session already finalized".into()));
        }
        self.conversation_summary = Some(summary);
        self.sentiment_label = Some(sentiment.label());
        self.sentiment_score = Some(sentiment.score());
        self.finalized = true;
        Ok(())
    }
}

// --- Retrieval corpus ---

/// A chunk of an ingested tenant document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub tenant_id: TenantId,
    pub document_id: String,
    /// 1-based position within the source document.
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub source_path: String,
}

// --- Lead records ---

/// A durable lead row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: i64,
    pub tenant_id: TenantId,
    pub phone_number: String,
    pub username: String,
    pub summary: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
    pub is_contacted: bool,
    pub created_at: String,
}

// --- Provider types ---

/// A single completion request to the language model.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Full model input, system instruction first.
    pub messages: Vec<Message>,
    /// Overrides the configured maximum output tokens.
    pub max_tokens: Option<u32>,
    /// Overrides the configured sampling temperature.
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The model's reply to a [`ProviderRequest`].
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

// --- Embedding and rerank types ---

/// Texts to embed.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// One vector per input text, in input order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// A query and the candidate passages to score against it.
#[derive(Debug, Clone)]
pub struct RerankInput {
    pub query: String,
    pub documents: Vec<String>,
}

/// One relevance score per candidate, in input order. Higher is more relevant.
#[derive(Debug, Clone)]
pub struct RerankOutput {
    pub scores: Vec<f32>,
}
