// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inactivity monitor: finalizes conversations that have gone quiet.
//!
//! A single background loop wakes every `poll_interval`, scans a snapshot of
//! the [`SessionRegistry`], and for each session idle past the threshold:
//! summarize -> score sentiment -> patch the lead row -> mark finalized ->
//! persist the finalized state -> delete the session records.
//!
//! A failing session is logged and retried on the next pass. A panicking
//! pass is caught and the loop resumes on the next tick.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use leadline_config::LeadlineConfig;
use leadline_core::{
    Identity, LeadStore, LeadlineError, Sentiment, SessionKey, SessionStore, with_timeout,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::ConversationEngine;
use crate::locks::TurnLocks;
use crate::registry::SessionRegistry;

/// Timing knobs for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Silence longer than this finalizes a session.
    pub inactivity_threshold: TimeDelta,
    /// Bound on each lead store call.
    pub call_timeout: Duration,
    /// Finalized registry entries older than this are forgotten.
    pub retention: TimeDelta,
}

impl MonitorSettings {
    pub fn from_config(config: &LeadlineConfig) -> Self {
        let threshold_mins = i64::try_from(config.monitor.inactivity_threshold_mins).unwrap_or(i64::MAX);
        let ttl_secs = i64::try_from(config.session.ttl_secs).unwrap_or(i64::MAX);
        Self {
            poll_interval: Duration::from_secs(config.monitor.poll_interval_secs),
            inactivity_threshold: TimeDelta::try_minutes(threshold_mins).unwrap_or(TimeDelta::MAX),
            call_timeout: Duration::from_secs(config.monitor.call_timeout_secs),
            retention: TimeDelta::try_seconds(ttl_secs).unwrap_or(TimeDelta::MAX),
        }
    }
}

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub scanned: usize,
    pub finalized: usize,
    pub failed: usize,
    /// Already finalized, never active, or changed under the lock.
    pub skipped: usize,
    /// Expired session-store records reclaimed.
    pub purged: usize,
}

/// Result of finalizing one session.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub summary: String,
    pub sentiment: Sentiment,
}

pub struct InactivityMonitor {
    registry: Arc<SessionRegistry>,
    locks: Arc<TurnLocks>,
    sessions: Arc<dyn SessionStore>,
    leads: Arc<dyn LeadStore>,
    engine: Arc<ConversationEngine>,
    settings: MonitorSettings,
}

impl InactivityMonitor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        locks: Arc<TurnLocks>,
        sessions: Arc<dyn SessionStore>,
        leads: Arc<dyn LeadStore>,
        engine: Arc<ConversationEngine>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            registry,
            locks,
            sessions,
            leads,
            engine,
            settings,
        }
    }

    /// Runs passes until `cancel` fires. Cancellation only interrupts the
    /// wait between passes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            threshold_secs = self.settings.inactivity_threshold.num_seconds(),
            "inactivity monitor started"
        );
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match AssertUnwindSafe(self.run_pass(Utc::now(), &cancel))
                .catch_unwind()
                .await
            {
                Ok(report) if report.finalized > 0 || report.failed > 0 => {
                    info!(
                        scanned = report.scanned,
                        finalized = report.finalized,
                        failed = report.failed,
                        purged = report.purged,
                        "inactivity pass complete"
                    );
                }
                Ok(report) => debug!(scanned = report.scanned, purged = report.purged, "inactivity pass complete"),
                Err(_) => error!("inactivity pass panicked, resuming on next tick"),
            }
        }
        info!("inactivity monitor stopped");
    }

    /// One scan over the registry as of `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> PassReport {
        let mut report = PassReport::default();

        for (key, entry) in self.registry.snapshot() {
            if cancel.is_cancelled() {
                debug!("cancelled mid-pass, leaving remaining sessions");
                break;
            }
            report.scanned += 1;
            if entry.finalized || entry.last_active.is_none() {
                report.skipped += 1;
                continue;
            }
            if !self.is_idle(entry.last_active, now) {
                continue;
            }

            match self.finalize(&key, now).await {
                Ok(Some(_)) => report.finalized += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(session_key = %key, error = %e, "finalization failed, will retry");
                    report.failed += 1;
                }
            }
        }

        report.purged = self.sessions.purge_expired().await;
        let pruned = now
            .checked_sub_signed(self.settings.retention)
            .map_or(0, |cutoff| self.registry.prune_finalized(cutoff));
        let unlocked = self.locks.prune();
        if pruned > 0 || unlocked > 0 {
            debug!(pruned, unlocked, "registry housekeeping");
        }
        report
    }

    fn is_idle(&self, last_active: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_active.is_some_and(|at| now - at > self.settings.inactivity_threshold)
    }

    /// Finalizes one session if it is still idle and not yet finalized.
    ///
    /// Returns `None` without calling the model when there is nothing to do.
    /// If the lead patch fails the entry stays unfinalized.
    pub async fn finalize(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> Result<Option<FinalizeOutcome>, LeadlineError> {
        let _turn = self.locks.lock(key).await;

        // Re-check under the lock: a turn may have landed since the snapshot.
        let Some(entry) = self.registry.get(key) else {
            return Ok(None);
        };
        if entry.finalized || !self.is_idle(entry.last_active, now) {
            return Ok(None);
        }

        let mut session = self.sessions.get_or_create(key, &entry.identity).await;
        if session.is_finalized() {
            self.registry.mark_finalized(key, now);
            return Ok(None);
        }

        let summary = self.engine.summarize(&session).await;
        let sentiment = self.engine.score_sentiment(&summary).await;
        self.patch_lead(&session.identity(), &summary, sentiment).await?;

        session.finalize(summary.clone(), sentiment)?;
        self.registry.mark_finalized(key, now);
        // If the delete fails the stored record still reads as finalized.
        self.sessions.save(key, &session).await;
        self.sessions.delete(key).await;

        info!(
            session_key = %key,
            tenant_id = %session.tenant_id,
            messages = session.messages().len(),
            sentiment = %sentiment.label(),
            score = sentiment.score(),
            "conversation finalized"
        );
        Ok(Some(FinalizeOutcome { summary, sentiment }))
    }

    /// Patches the newest lead row, creating one first if the placeholder
    /// insert never landed.
    async fn patch_lead(
        &self,
        identity: &Identity,
        summary: &str,
        sentiment: Sentiment,
    ) -> Result<(), LeadlineError> {
        let timeout = self.settings.call_timeout;
        let tenant_id = &identity.tenant_id;
        let phone = identity.user_id.as_str();

        let patched = with_timeout(
            timeout,
            self.leads.patch_latest(tenant_id, phone, summary, sentiment),
        )
        .await?;
        if patched {
            return Ok(());
        }

        warn!(tenant_id = %tenant_id, user_id = %phone, "no lead row to patch, capturing one now");
        with_timeout(
            timeout,
            self.leads
                .capture_initial_contact(tenant_id, phone, &identity.display_name),
        )
        .await?;
        let patched = with_timeout(
            timeout,
            self.leads.patch_latest(tenant_id, phone, summary, sentiment),
        )
        .await?;
        if patched {
            Ok(())
        } else {
            Err(LeadlineError::Internal(format!(
                "lead row for {phone} vanished before it could be patched"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::ingress::InboundHandler;
    use crate::prompts;
    use async_trait::async_trait;
    use leadline_config::model::RetrievalConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use leadline_core::traits::lead_store::PLACEHOLDER_SUMMARY;
    use leadline_core::types::LeadRecord;
    use leadline_core::{Session, SentimentLabel, TenantId};
    use leadline_knowledge::{DocumentStore, Retriever};
    use leadline_storage::{Database, SqliteLeadStore, SqliteSessionStore};
    use leadline_test_utils::{MockEmbedder, MockProvider, MockReranker};

    /// Real lead store whose patch fails for one phone number, and panics
    /// for the first `panics_left` calls.
    struct FlakyLeads {
        inner: Arc<SqliteLeadStore>,
        broken_phone: Option<&'static str>,
        panics_left: AtomicUsize,
    }

    #[async_trait]
    impl LeadStore for FlakyLeads {
        async fn capture_initial_contact(
            &self,
            tenant_id: &TenantId,
            phone_number: &str,
            username: &str,
        ) -> Result<i64, LeadlineError> {
            self.inner
                .capture_initial_contact(tenant_id, phone_number, username)
                .await
        }

        async fn patch_latest(
            &self,
            tenant_id: &TenantId,
            phone_number: &str,
            summary: &str,
            sentiment: Sentiment,
        ) -> Result<bool, LeadlineError> {
            if self
                .panics_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                panic!("lead store connection dropped");
            }
            if self.broken_phone == Some(phone_number) {
                return Err(LeadlineError::Internal("database is locked".into()));
            }
            self.inner
                .patch_latest(tenant_id, phone_number, summary, sentiment)
                .await
        }

        async fn list_leads(&self, tenant_id: &TenantId) -> Result<Vec<LeadRecord>, LeadlineError> {
            self.inner.list_leads(tenant_id).await
        }
    }

    /// Real session store whose delete never removes anything.
    struct UndeletableSessions {
        inner: Arc<SqliteSessionStore>,
    }

    #[async_trait]
    impl SessionStore for UndeletableSessions {
        async fn get_or_create(&self, key: &SessionKey, identity: &Identity) -> Session {
            self.inner.get_or_create(key, identity).await
        }

        async fn save(&self, key: &SessionKey, session: &Session) {
            self.inner.save(key, session).await;
        }

        async fn delete(&self, _key: &SessionKey) {}

        async fn purge_expired(&self) -> usize {
            self.inner.purge_expired().await
        }
    }

    struct Options {
        broken_phone: Option<&'static str>,
        panicking_patches: usize,
        undeletable_sessions: bool,
        inactivity_threshold: TimeDelta,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                broken_phone: None,
                panicking_patches: 0,
                undeletable_sessions: false,
                inactivity_threshold: TimeDelta::minutes(2),
            }
        }
    }

    struct Fixture {
        handler: InboundHandler,
        monitor: InactivityMonitor,
        provider: MockProvider,
        sessions: Arc<SqliteSessionStore>,
        leads: Arc<SqliteLeadStore>,
        registry: Arc<SessionRegistry>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(provider: MockProvider, broken_phone: Option<&'static str>) -> Fixture {
        fixture_with(
            provider,
            Options {
                broken_phone,
                ..Options::default()
            },
        )
        .await
    }

    async fn fixture_with(provider: MockProvider, options: Options) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("monitor.db").to_str().unwrap())
            .await
            .unwrap();
        let sessions = Arc::new(SqliteSessionStore::new(
            db.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(5),
        ));
        let shared_sessions: Arc<dyn SessionStore> = if options.undeletable_sessions {
            Arc::new(UndeletableSessions {
                inner: sessions.clone(),
            })
        } else {
            sessions.clone()
        };
        let leads = Arc::new(SqliteLeadStore::new(db.clone()));
        let monitor_leads: Arc<dyn LeadStore> = Arc::new(FlakyLeads {
            inner: leads.clone(),
            broken_phone: options.broken_phone,
            panics_left: AtomicUsize::new(options.panicking_patches),
        });
        let retriever = Retriever::new(
            DocumentStore::new(db),
            Arc::new(MockEmbedder::new(4)),
            Arc::new(MockReranker::new()),
            &RetrievalConfig::default(),
        );
        let engine = Arc::new(ConversationEngine::new(
            Arc::new(provider.clone()),
            Arc::new(retriever),
            EngineSettings {
                instruction: prompts::default_instruction("leadline"),
                fallback_reply: "fallback".into(),
                top_k: 3,
                reply_timeout: Duration::from_secs(2),
                finalize_timeout: Duration::from_secs(2),
            },
        ));
        let registry = Arc::new(SessionRegistry::new());
        let locks = Arc::new(TurnLocks::new());
        let handler = InboundHandler::new(
            shared_sessions.clone(),
            leads.clone(),
            engine.clone(),
            registry.clone(),
            locks.clone(),
            Duration::from_secs(5),
        );
        let monitor = InactivityMonitor::new(
            registry.clone(),
            locks,
            shared_sessions,
            monitor_leads,
            engine,
            MonitorSettings {
                poll_interval: Duration::from_millis(20),
                inactivity_threshold: options.inactivity_threshold,
                call_timeout: Duration::from_secs(5),
                retention: TimeDelta::hours(24),
            },
        );
        Fixture {
            handler,
            monitor,
            provider,
            sessions,
            leads,
            registry,
            _dir: dir,
        }
    }

    fn tenant() -> TenantId {
        TenantId::new("+15550001").unwrap()
    }

    fn user() -> (SessionKey, Identity) {
        let key = SessionKey::for_channel("whatsapp", &tenant(), "+15559999").unwrap();
        (key, Identity::new(tenant(), "+15559999", "Asha"))
    }

    fn scripted() -> MockProvider {
        MockProvider::with_responses(vec![
            "Hello! How can I help?".into(),
            "Asha wants a weekend cleaning quote.".into(),
            r#"{"sentiment_label": "Positive", "sentiment_score": 0.7}"#.into(),
        ])
    }

    #[tokio::test]
    async fn idle_session_is_finalized_once() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let later = Utc::now() + TimeDelta::minutes(3);
        let never = CancellationToken::new();
        let first = f.monitor.run_pass(later, &never).await;
        assert_eq!((first.scanned, first.finalized, first.failed), (1, 1, 0));

        let lead = &f.leads.list_leads(&tenant()).await.unwrap()[0];
        assert_eq!(lead.summary, "Asha wants a weekend cleaning quote.");
        assert_eq!(lead.sentiment_label, SentimentLabel::Positive);
        assert_eq!(lead.sentiment_score, 0.7);
        assert!(f.registry.get(&key).unwrap().finalized);
        assert!(f.sessions.get_or_create(&key, &identity).await.messages().is_empty());

        let calls = f.provider.call_count().await;
        let second = f.monitor.run_pass(later + TimeDelta::minutes(1), &never).await;
        assert_eq!((second.finalized, second.skipped), (0, 1));
        assert_eq!(f.provider.call_count().await, calls);
    }

    #[tokio::test]
    async fn active_session_is_left_alone() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let report = f
            .monitor
            .run_pass(Utc::now() + TimeDelta::seconds(30), &CancellationToken::new())
            .await;
        assert_eq!((report.scanned, report.finalized, report.skipped), (1, 0, 0));
        assert!(!f.registry.get(&key).unwrap().finalized);
    }

    #[tokio::test]
    async fn finalize_twice_is_a_noop() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();
        let later = Utc::now() + TimeDelta::minutes(5);

        let outcome = f.monitor.finalize(&key, later).await.unwrap().unwrap();
        assert_eq!(outcome.sentiment.label(), SentimentLabel::Positive);
        assert!(f.monitor.finalize(&key, later).await.unwrap().is_none());
        assert_eq!(f.provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn entry_without_activity_is_skipped() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.registry.register(&key, &identity);

        let report = f
            .monitor
            .run_pass(Utc::now() + TimeDelta::hours(1), &CancellationToken::new())
            .await;
        assert_eq!((report.scanned, report.skipped, report.finalized), (1, 1, 0));
        assert_eq!(f.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn patch_failure_leaves_session_for_retry() {
        let f = fixture(scripted(), Some("+15559999")).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let report = f
            .monitor
            .run_pass(Utc::now() + TimeDelta::minutes(3), &CancellationToken::new())
            .await;
        assert_eq!((report.finalized, report.failed), (0, 1));
        assert!(!f.registry.get(&key).unwrap().finalized);
        assert_eq!(f.sessions.get_or_create(&key, &identity).await.messages().len(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_scan() {
        let f = fixture(MockProvider::new(), Some("+15550001")).await;
        let tenant = tenant();
        let mut keys = Vec::new();
        for n in 0..3 {
            let user_id = format!("+1555000{n}");
            let key = SessionKey::for_channel("whatsapp", &tenant, &user_id).unwrap();
            let identity = Identity::new(tenant.clone(), user_id, "User");
            f.handler.handle_inbound(&key, &tenant, &identity, "Hi").await.unwrap();
            keys.push(key);
        }
        let report = f
            .monitor
            .run_pass(Utc::now() + TimeDelta::minutes(3), &CancellationToken::new())
            .await;
        assert_eq!((report.scanned, report.finalized, report.failed), (3, 2, 1));
        let finalized: Vec<bool> = keys.iter().map(|k| f.registry.get(k).unwrap().finalized).collect();
        assert_eq!(finalized, [true, false, true]);
    }

    #[tokio::test]
    async fn missing_lead_row_is_captured_then_patched() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        // Activity recorded without the ingress path, so no placeholder row exists.
        f.registry.touch(&key, &identity, Utc::now());

        let outcome = f
            .monitor
            .finalize(&key, Utc::now() + TimeDelta::minutes(3))
            .await
            .unwrap();
        assert!(outcome.is_some());
        let leads = f.leads.list_leads(&tenant()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].summary, "");
    }

    #[tokio::test]
    async fn cancelled_pass_starts_no_finalization() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = f.monitor.run_pass(Utc::now() + TimeDelta::minutes(3), &cancel).await;
        assert_eq!(report.scanned, 0);
        assert!(!f.registry.get(&key).unwrap().finalized);
    }

    #[tokio::test]
    async fn run_loop_stops_on_cancel() {
        let f = fixture(MockProvider::new(), None).await;
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            stopper.cancel();
        });

        tokio::time::timeout(Duration::from_secs(2), f.monitor.run(cancel))
            .await
            .expect("monitor should stop after cancellation");
    }

    #[tokio::test]
    async fn turn_after_finalize_starts_new_lifetime() {
        let f = fixture(scripted(), None).await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();
        f.monitor
            .finalize(&key, Utc::now() + TimeDelta::minutes(3))
            .await
            .unwrap();

        f.handler.handle_inbound(&key, &tenant(), &identity, "Back again").await.unwrap();
        let entry = f.registry.get(&key).unwrap();
        assert!(!entry.finalized);
        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert_eq!(stored.messages()[0].content(), "Back again");
        assert_eq!(f.leads.list_leads(&tenant()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_still_leaves_session_finalized() {
        let f = fixture_with(
            scripted(),
            Options {
                undeletable_sessions: true,
                ..Options::default()
            },
        )
        .await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let later = Utc::now() + TimeDelta::minutes(3);
        assert!(f.monitor.finalize(&key, later).await.unwrap().is_some());
        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert!(stored.is_finalized());
        assert_eq!(stored.conversation_summary(), Some("Asha wants a weekend cleaning quote."));

        let calls = f.provider.call_count().await;
        let again = f
            .monitor
            .run_pass(later + TimeDelta::minutes(1), &CancellationToken::new())
            .await;
        assert_eq!((again.finalized, again.skipped), (0, 1));
        assert_eq!(f.provider.call_count().await, calls);

        f.handler.handle_inbound(&key, &tenant(), &identity, "Back again").await.unwrap();
        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert!(!stored.is_finalized());
        let contents: Vec<&str> = stored.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, ["Back again", "mock response"]);

        let leads = f.leads.list_leads(&tenant()).await.unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].summary, PLACEHOLDER_SUMMARY);
        assert_eq!(leads[1].summary, "Asha wants a weekend cleaning quote.");
    }

    #[tokio::test]
    async fn run_loop_recovers_from_a_panicking_pass() {
        let provider = MockProvider::with_responses(vec![
            "Hello! How can I help?".into(),
            "Asha wants a quote.".into(),
            r#"{"sentiment_label": "Positive", "sentiment_score": 0.7}"#.into(),
            "Asha wants a weekend cleaning quote.".into(),
            r#"{"sentiment_label": "Positive", "sentiment_score": 0.9}"#.into(),
        ]);
        let f = fixture_with(
            provider,
            Options {
                panicking_patches: 1,
                inactivity_threshold: TimeDelta::zero(),
                ..Options::default()
            },
        )
        .await;
        let (key, identity) = user();
        f.handler.handle_inbound(&key, &tenant(), &identity, "Hi").await.unwrap();

        let cancel = CancellationToken::new();
        let watcher = async {
            for _ in 0..200 {
                if f.registry.get(&key).is_some_and(|entry| entry.finalized) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            cancel.cancel();
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(f.monitor.run(cancel.clone()), watcher)
        })
        .await
        .expect("monitor should stop after cancellation");

        assert!(f.registry.get(&key).unwrap().finalized);
        let lead = &f.leads.list_leads(&tenant()).await.unwrap()[0];
        assert_eq!(lead.summary, "Asha wants a weekend cleaning quote.");
        assert_eq!(lead.sentiment_score, 0.9);
        assert_eq!(f.provider.call_count().await, 5);
    }

    #[tokio::test]
    async fn slow_turn_is_not_finalized_mid_reply() {
        let provider = MockProvider::new().with_delay(Duration::from_millis(400));
        let f = fixture_with(
            provider,
            Options {
                inactivity_threshold: TimeDelta::milliseconds(50),
                ..Options::default()
            },
        )
        .await;
        let (key, identity) = user();
        f.registry.touch(&key, &identity, Utc::now());

        let tenant = tenant();
        let turn = f.handler.handle_inbound(&key, &tenant, &identity, "Hi");
        let sweep = async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            f.monitor.finalize(&key, Utc::now()).await
        };
        let (reply, outcome) = tokio::join!(turn, sweep);

        assert_eq!(reply.unwrap(), "mock response");
        assert!(outcome.unwrap().is_none());
        assert!(!f.registry.get(&key).unwrap().finalized);
        assert_eq!(f.provider.call_count().await, 1);
        let stored = f.sessions.get_or_create(&key, &identity).await;
        assert_eq!(stored.messages().len(), 2);
    }
}
