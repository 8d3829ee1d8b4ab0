// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scenarios.
//!
//! `TestHarness` wires the real storage, retrieval, and agent crates to mock
//! models over a temporary SQLite database, and exposes one method per
//! external trigger: an inbound message, a document ingest, a monitor pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use leadline_agent::prompts;
use leadline_agent::{
    ConversationEngine, EngineSettings, InactivityMonitor, InboundHandler, MonitorSettings,
    PassReport, SessionRegistry, TurnLocks,
};
use leadline_config::model::RetrievalConfig;
use leadline_core::types::LeadRecord;
use leadline_core::{
    EmbeddingAdapter, Identity, LeadStore, LeadlineError, Session, SessionKey, SessionStore,
    TenantId,
};
use leadline_knowledge::{DocumentStore, Ingestor, Retriever, SemanticChunker};
use leadline_storage::{Database, SqliteLeadStore, SqliteSessionStore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mock_models::{MockEmbedder, MockReranker};
use crate::mock_provider::MockProvider;

/// Reply used when a turn fails.
pub const HARNESS_FALLBACK: &str = "Sorry, something went wrong. Please try again.";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    provider: Option<MockProvider>,
    embedder: Option<MockEmbedder>,
    reranker: MockReranker,
    system_prompt: Option<String>,
    inactivity_threshold: TimeDelta,
    top_k: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            provider: None,
            embedder: None,
            reranker: MockReranker::new(),
            system_prompt: None,
            inactivity_threshold: TimeDelta::minutes(2),
            top_k: 5,
        }
    }

    /// Queues model replies, consumed in call order across turns and finalization.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Uses a preconfigured provider instead of a response queue.
    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_reranker(mut self, reranker: MockReranker) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_inactivity_threshold(mut self, threshold: TimeDelta) -> Self {
        self.inactivity_threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn build(self) -> Result<TestHarness, LeadlineError> {
        let temp_dir = tempfile::TempDir::new().map_err(LeadlineError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let session_store = Arc::new(SqliteSessionStore::new(
            db.clone(),
            Duration::from_secs(86_400),
            Duration::from_secs(5),
        ));
        let lead_store = Arc::new(SqliteLeadStore::new(db.clone()));
        let documents = DocumentStore::new(db.clone());

        let provider = self
            .provider
            .unwrap_or_else(|| MockProvider::with_responses(self.responses));
        let embedder: Arc<dyn EmbeddingAdapter> =
            Arc::new(self.embedder.unwrap_or_else(|| MockEmbedder::new(8)));

        let retriever = Retriever::new(
            documents.clone(),
            embedder.clone(),
            Arc::new(self.reranker.clone()),
            &RetrievalConfig::default(),
        );
        let engine = Arc::new(ConversationEngine::new(
            Arc::new(provider.clone()),
            Arc::new(retriever),
            EngineSettings {
                instruction: self
                    .system_prompt
                    .unwrap_or_else(|| prompts::default_instruction("leadline")),
                fallback_reply: HARNESS_FALLBACK.to_string(),
                top_k: self.top_k,
                reply_timeout: Duration::from_secs(5),
                finalize_timeout: Duration::from_secs(5),
            },
        ));

        let registry = Arc::new(SessionRegistry::new());
        let locks = Arc::new(TurnLocks::new());
        let handler = Arc::new(InboundHandler::new(
            session_store.clone(),
            lead_store.clone(),
            engine.clone(),
            registry.clone(),
            locks.clone(),
            Duration::from_secs(5),
        ));
        let monitor = Arc::new(InactivityMonitor::new(
            registry.clone(),
            locks,
            session_store.clone(),
            lead_store.clone(),
            engine,
            MonitorSettings {
                poll_interval: Duration::from_millis(50),
                inactivity_threshold: self.inactivity_threshold,
                call_timeout: Duration::from_secs(5),
                retention: TimeDelta::hours(24),
            },
        ));
        let ingestor = Ingestor::new(
            SemanticChunker::new(embedder.clone(), 90.0, 500),
            embedder,
            documents.clone(),
        );

        Ok(TestHarness {
            provider,
            reranker: self.reranker,
            db,
            session_store,
            lead_store,
            documents,
            registry,
            handler,
            monitor,
            ingestor,
            temp_dir,
        })
    }
}

/// A complete conversation stack over a temporary database.
pub struct TestHarness {
    pub provider: MockProvider,
    pub reranker: MockReranker,
    pub db: Database,
    pub session_store: Arc<SqliteSessionStore>,
    pub lead_store: Arc<SqliteLeadStore>,
    pub documents: DocumentStore,
    pub registry: Arc<SessionRegistry>,
    pub handler: Arc<InboundHandler>,
    pub monitor: Arc<InactivityMonitor>,
    ingestor: Ingestor,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The session key the WhatsApp ingress would derive.
    pub fn key_for(tenant: &TenantId, user_id: &str) -> Result<SessionKey, LeadlineError> {
        SessionKey::for_channel("whatsapp", tenant, user_id)
    }

    /// Delivers one inbound message and returns the reply.
    pub async fn send(
        &self,
        tenant: &TenantId,
        user_id: &str,
        display_name: &str,
        text: &str,
    ) -> Result<String, LeadlineError> {
        let identity = Identity::new(tenant.clone(), user_id, display_name);
        let key = Self::key_for(tenant, user_id)?;
        self.handler.handle_inbound(&key, tenant, &identity, text).await
    }

    /// The stored session for a user, or a fresh one if nothing is stored.
    pub async fn session(&self, tenant: &TenantId, user_id: &str) -> Result<Session, LeadlineError> {
        let identity = Identity::new(tenant.clone(), user_id, "User");
        let key = Self::key_for(tenant, user_id)?;
        Ok(self.session_store.get_or_create(&key, &identity).await)
    }

    /// Writes `text` to a file named `name` and ingests it for `tenant`.
    pub async fn ingest_text(
        &self,
        tenant: &TenantId,
        name: &str,
        text: &str,
    ) -> Result<usize, LeadlineError> {
        let path = self.temp_dir.path().join(name);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| LeadlineError::Internal(format!("failed to write {name}: {e}")))?;
        self.ingestor.ingest_file(tenant, &path).await
    }

    /// Runs one monitor pass as of `now`.
    pub async fn run_monitor_pass(&self, now: DateTime<Utc>) -> PassReport {
        let report = self.monitor.run_pass(now, &CancellationToken::new()).await;
        debug!(?report, "harness monitor pass");
        report
    }

    pub async fn leads(&self, tenant: &TenantId) -> Result<Vec<LeadRecord>, LeadlineError> {
        self.lead_store.list_leads(tenant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("+15550001").unwrap()
    }

    #[tokio::test]
    async fn send_returns_queued_reply() {
        let harness = TestHarness::builder()
            .with_mock_responses(vec!["custom response".into()])
            .build()
            .await
            .unwrap();
        let reply = harness.send(&tenant(), "+15559999", "Asha", "hello").await.unwrap();
        assert_eq!(reply, "custom response");
        assert_eq!(harness.session(&tenant(), "+15559999").await.unwrap().messages().len(), 2);
    }

    #[tokio::test]
    async fn harnesses_do_not_share_state() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();
        h1.send(&tenant(), "+15559999", "Asha", "hi").await.unwrap();

        assert_eq!(h1.leads(&tenant()).await.unwrap().len(), 1);
        assert!(h2.leads(&tenant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingest_text_populates_corpus() {
        let harness = TestHarness::builder().build().await.unwrap();
        let written = harness
            .ingest_text(&tenant(), "faq.md", "We open at nine. We close at five.")
            .await
            .unwrap();
        assert!(written >= 1);
        assert_eq!(harness.documents.count(&tenant()).await.unwrap(), written);
    }
}
