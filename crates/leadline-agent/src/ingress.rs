// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound turn handling: the channel-independent core behind the webhook.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leadline_core::{
    Identity, LeadStore, LeadlineError, Message, Session, SessionKey, SessionStore, TenantId,
    with_timeout,
};
use tracing::{debug, info, warn};

use crate::engine::ConversationEngine;
use crate::locks::TurnLocks;
use crate::registry::SessionRegistry;

pub struct InboundHandler {
    sessions: Arc<dyn SessionStore>,
    leads: Arc<dyn LeadStore>,
    engine: Arc<ConversationEngine>,
    registry: Arc<SessionRegistry>,
    locks: Arc<TurnLocks>,
    lead_timeout: Duration,
}

impl InboundHandler {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        leads: Arc<dyn LeadStore>,
        engine: Arc<ConversationEngine>,
        registry: Arc<SessionRegistry>,
        locks: Arc<TurnLocks>,
        lead_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            leads,
            engine,
            registry,
            locks,
            lead_timeout,
        }
    }

    /// Runs one conversation turn and returns the reply text.
    ///
    /// External failures degrade to a fallback reply. Only contract
    /// violations, such as an identity belonging to another tenant, are
    /// returned as errors.
    pub async fn handle_inbound(
        &self,
        session_key: &SessionKey,
        tenant_id: &TenantId,
        identity: &Identity,
        text: &str,
    ) -> Result<String, LeadlineError> {
        if identity.tenant_id != *tenant_id {
            return Err(LeadlineError::TenantViolation(format!(
                "identity for tenant {} used on a turn for tenant {tenant_id}",
                identity.tenant_id
            )));
        }

        let _turn = self.locks.lock(session_key).await;

        let mut session = self.sessions.get_or_create(session_key, identity).await;
        if session.tenant_id != *tenant_id {
            return Err(LeadlineError::TenantViolation(format!(
                "session {session_key} belongs to tenant {}",
                session.tenant_id
            )));
        }
        if session.is_finalized() {
            debug!(session_key = %session_key, "stored session already finalized, starting fresh");
            session = Session::new(identity);
        }

        let fresh = session.messages().is_empty();
        if fresh {
            self.registry.register(session_key, identity);
            self.capture_lead(tenant_id, identity).await;
        }

        let message = if fresh {
            Message::user(text).with_metadata(BTreeMap::from([
                ("tenant_id".to_string(), tenant_id.to_string()),
                ("user_id".to_string(), identity.user_id.clone()),
                ("display_name".to_string(), identity.display_name.clone()),
            ]))
        } else {
            Message::user(text)
        };
        session.push(message)?;

        let reply = self.engine.respond(&mut session).await?;

        // Stamped once the reply exists, so a turn in flight never reads as idle.
        let replied_at = Utc::now();
        session.set_last_active(replied_at)?;
        self.registry.touch(session_key, identity, replied_at);
        self.sessions.save(session_key, &session).await;

        debug!(
            session_key = %session_key,
            messages = session.messages().len(),
            "turn complete"
        );
        Ok(reply)
    }

    /// Writes the placeholder lead row. Failure is logged and the turn goes on.
    async fn capture_lead(&self, tenant_id: &TenantId, identity: &Identity) {
        let result = with_timeout(
            self.lead_timeout,
            self.leads.capture_initial_contact(
                tenant_id,
                &identity.user_id,
                &identity.display_name,
            ),
        )
        .await;
        match result {
            Ok(lead_id) => info!(
                tenant_id = %tenant_id,
                user_id = %identity.user_id,
                lead_id,
                "initial contact captured"
            ),
            Err(e) => warn!(
                tenant_id = %tenant_id,
                user_id = %identity.user_id,
                error = %e,
                "failed to capture initial contact"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::prompts;
    use leadline_config::model::RetrievalConfig;
    use leadline_core::Role;
    use leadline_core::traits::lead_store::PLACEHOLDER_SUMMARY;
    use leadline_knowledge::{DocumentStore, Retriever};
    use leadline_storage::{Database, SqliteLeadStore, SqliteSessionStore};
    use leadline_test_utils::{MockEmbedder, MockProvider, MockReranker};

    struct Fixture {
        handler: Arc<InboundHandler>,
        sessions: Arc<SqliteSessionStore>,
        leads: Arc<SqliteLeadStore>,
        registry: Arc<SessionRegistry>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(provider: MockProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("ingress.db").to_str().unwrap())
            .await
            .unwrap();
        let sessions = Arc::new(SqliteSessionStore::new(
            db.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(5),
        ));
        let leads = Arc::new(SqliteLeadStore::new(db.clone()));
        let retriever = Retriever::new(
            DocumentStore::new(db),
            Arc::new(MockEmbedder::new(4)),
            Arc::new(MockReranker::new()),
            &RetrievalConfig::default(),
        );
        let engine = ConversationEngine::new(
            Arc::new(provider),
            Arc::new(retriever),
            EngineSettings {
                instruction: prompts::default_instruction("leadline"),
                fallback_reply: "fallback".into(),
                top_k: 3,
                reply_timeout: Duration::from_secs(2),
                finalize_timeout: Duration::from_secs(2),
            },
        );
        let registry = Arc::new(SessionRegistry::new());
        let handler = Arc::new(InboundHandler::new(
            sessions.clone(),
            leads.clone(),
            Arc::new(engine),
            registry.clone(),
            Arc::new(TurnLocks::new()),
            Duration::from_secs(5),
        ));
        Fixture {
            handler,
            sessions,
            leads,
            registry,
            _dir: dir,
        }
    }

    fn tenant() -> TenantId {
        TenantId::new("+15550001").unwrap()
    }

    fn user(n: u32) -> (SessionKey, Identity) {
        let user_id = format!("+1555999{n}");
        let key = SessionKey::for_channel("whatsapp", &tenant(), &user_id).unwrap();
        (key, Identity::new(tenant(), user_id, "Asha"))
    }

    #[tokio::test]
    async fn first_turn_captures_lead_and_persists_session() {
        let f = fixture(MockProvider::with_responses(vec!["Hello! How can I help?".into()])).await;
        let (key, identity) = user(1);

        let reply = f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();
        assert_eq!(reply, "Hello! How can I help?");

        let leads = f.leads.list_leads(&tenant()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].summary, PLACEHOLDER_SUMMARY);
        assert_eq!(leads[0].phone_number, identity.user_id);

        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert_eq!(stored.messages().len(), 2);
        assert_eq!(stored.messages()[0].role(), Role::User);
        let meta = stored.messages()[0].metadata().unwrap();
        assert_eq!(meta["tenant_id"], "+15550001");
        assert_eq!(meta["display_name"], "Asha");
        assert!(stored.last_active().is_some());

        let entry = f.registry.get(&key).unwrap();
        assert!(entry.last_active.is_some() && !entry.finalized);
    }

    #[tokio::test]
    async fn later_turns_append_without_new_lead() {
        let f = fixture(MockProvider::new()).await;
        let (key, identity) = user(1);
        for text in ["Hi", "Do you do weekends?", "Great"] {
            f.handler.handle_inbound(&key, &tenant(), &identity, text).await.unwrap();
        }

        assert_eq!(f.leads.list_leads(&tenant()).await.unwrap().len(), 1);
        let stored = f.sessions.get_or_create(&key, &identity).await;
        let contents: Vec<&str> = stored.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents.len(), 6);
        assert_eq!(contents[2], "Do you do weekends?");
        assert!(stored.messages()[2].metadata().is_none());
    }

    #[tokio::test]
    async fn provider_outage_still_replies() {
        let f = fixture(MockProvider::failing()).await;
        let (key, identity) = user(1);
        let reply = f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();
        assert_eq!(reply, "fallback");
        assert_eq!(f.sessions.get_or_create(&key, &identity).await.messages().len(), 2);
    }

    #[tokio::test]
    async fn foreign_identity_is_rejected() {
        let f = fixture(MockProvider::new()).await;
        let (key, _) = user(1);
        let other = Identity::new(TenantId::new("+15550002").unwrap(), "+15559991", "Eve");
        let err = f
            .handler
            .handle_inbound(&key, &tenant(), &other, "Hi")
            .await
            .unwrap_err();
        assert!(matches!(err, LeadlineError::TenantViolation(_)));
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn empty_text_is_a_normal_turn() {
        let f = fixture(MockProvider::new()).await;
        let (key, identity) = user(1);
        assert!(f.handler.handle_inbound(&key, &tenant(), &identity, "").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_on_one_key_lose_nothing() {
        let f = fixture(MockProvider::new()).await;
        let (key, identity) = user(1);

        let mut tasks = Vec::new();
        for i in 0..6 {
            let (handler, key, identity) = (f.handler.clone(), key.clone(), identity.clone());
            tasks.push(tokio::spawn(async move {
                handler
                    .handle_inbound(&key, &tenant(), &identity, &format!("message {i}"))
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert_eq!(stored.messages().len(), 12);
        let roles: Vec<Role> = stored.messages().iter().map(|m| m.role()).collect();
        for pair in roles.chunks(2) {
            assert_eq!(pair, [Role::User, Role::Assistant]);
        }
        assert_eq!(f.leads.list_leads(&tenant()).await.unwrap().len(), 1);
    }
}
