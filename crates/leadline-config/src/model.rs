// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadline lead-capture bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadlineConfig {
    /// Agent identity and reply behavior.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Language model endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session store settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Document retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Document ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Inactivity monitor settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// WhatsApp webhook settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Agent identity and reply behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system instruction. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a text file containing the system instruction.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Reply sent when a turn cannot be answered.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_agent_name() -> String {
    "leadline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fallback_reply() -> String {
    "Sorry, I'm having trouble responding right now. Please try again in a moment.".to_string()
}

/// OpenAI-compatible chat completion endpoint (Groq by default).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_llm_model")]
    pub model_name: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API key. `None` falls back to the `api_key_env` variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP timeout per request, in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient HTTP errors (429, 500, 502, 503).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model_name: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    512
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    1
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadline").join("leadline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("leadline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Sliding expiry of each session record, refreshed on every save.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on a single session store call, in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_store_timeout_secs() -> u64 {
    5
}

/// Retrieval pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of chunks injected into each model call.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Drop reranked candidates scoring below this value. `None` keeps all.
    #[serde(default)]
    pub min_rerank_score: Option<f32>,

    /// Name of the sentence embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Name of the cross-encoder rerank model.
    #[serde(default = "default_reranker_model")]
    pub reranker_model: String,

    /// Directory holding downloaded model files. Defaults next to the database.
    #[serde(default)]
    pub model_dir: Option<String>,

    /// Upper bound on each embed, search, and rerank call, in seconds.
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_rerank_score: None,
            embedding_model: default_embedding_model(),
            reranker_model: default_reranker_model(),
            model_dir: None,
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_reranker_model() -> String {
    "ms-marco-MiniLM-L-6-v2".to_string()
}

fn default_retrieval_timeout_secs() -> u64 {
    10
}

/// Document ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Percentile of adjacent-sentence distances treated as a topic break.
    #[serde(default = "default_breakpoint_percentile")]
    pub breakpoint_percentile: f64,

    /// Hard upper bound on chunk length, in characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            breakpoint_percentile: default_breakpoint_percentile(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

fn default_breakpoint_percentile() -> f64 {
    90.0
}

fn default_max_chunk_chars() -> usize {
    1500
}

/// Inactivity monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Seconds between scans of the active-session registry.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Minutes of silence after which a conversation is finalized.
    #[serde(default = "default_inactivity_threshold_mins")]
    pub inactivity_threshold_mins: u64,

    /// Upper bound on each summarize, score, and lead patch call, in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            inactivity_threshold_mins: default_inactivity_threshold_mins(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_inactivity_threshold_mins() -> u64 {
    2
}

fn default_call_timeout_secs() -> u64 {
    45
}

/// WhatsApp webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Serve the webhook. When false, `serve` only runs the monitor.
    #[serde(default = "default_whatsapp_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route receiving inbound provider callbacks.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_whatsapp_enabled(),
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_whatsapp_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_webhook_path() -> String {
    "/whatsapp".to_string()
}
