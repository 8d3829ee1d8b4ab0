// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadline serve` command implementation.
//!
//! Opens the database, loads the retrieval models, builds one shared
//! provider client, then runs the WhatsApp webhook and the inactivity
//! monitor until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use leadline_agent::{
    ConversationEngine, EngineSettings, InactivityMonitor, InboundHandler, MonitorSettings,
    SessionRegistry, TurnLocks, install_signal_handler, prompts,
};
use leadline_config::model::LeadlineConfig;
use leadline_core::{LeadStore, LeadlineError, ProviderAdapter, SessionStore};
use leadline_knowledge::{DocumentStore, ModelManager, Retriever};
use leadline_openai::OpenAiProvider;
use leadline_storage::{Database, SqliteLeadStore, SqliteSessionStore};
use leadline_whatsapp::WebhookState;
use tracing::{info, warn};

use crate::models;

/// Runs the `leadline serve` command.
pub async fn run_serve(config: LeadlineConfig) -> Result<(), LeadlineError> {
    info!(agent = %config.agent.name, "starting leadline");

    let db = Database::from_config(&config.storage).await?;

    let manager = ModelManager::new(models::data_dir(&config));
    let embedder = models::load_embedder(&manager, &config).await?;
    let reranker = models::load_reranker(&manager, &config).await?;
    let retriever = Arc::new(Retriever::new(
        DocumentStore::new(db.clone()),
        embedder,
        reranker,
        &config.retrieval,
    ));

    let provider: Arc<dyn ProviderAdapter> = Arc::new(OpenAiProvider::from_config(&config.llm)?);
    let instruction = prompts::load_instruction(
        &config.agent.name,
        &config.agent.system_prompt,
        &config.agent.system_prompt_file,
    )
    .await;
    let engine = Arc::new(ConversationEngine::new(
        provider,
        retriever,
        EngineSettings::from_config(&config, instruction),
    ));

    let sessions: Arc<dyn SessionStore> =
        Arc::new(SqliteSessionStore::from_config(db.clone(), &config.session));
    let leads: Arc<dyn LeadStore> = Arc::new(SqliteLeadStore::new(db.clone()));
    let registry = Arc::new(SessionRegistry::new());
    let locks = Arc::new(TurnLocks::new());

    let handler = Arc::new(InboundHandler::new(
        sessions.clone(),
        leads.clone(),
        engine.clone(),
        registry.clone(),
        locks.clone(),
        Duration::from_secs(config.session.store_timeout_secs),
    ));
    let monitor = InactivityMonitor::new(
        registry.clone(),
        locks,
        sessions,
        leads,
        engine,
        MonitorSettings::from_config(&config),
    );

    let cancel = install_signal_handler();
    let monitor_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    let served = if config.whatsapp.enabled {
        let state = WebhookState::new(handler, registry, config.agent.fallback_reply.clone());
        leadline_whatsapp::start_server(&config.whatsapp, state, cancel.clone()).await
    } else {
        info!("whatsapp webhook disabled, running the inactivity monitor only");
        cancel.cancelled().await;
        Ok(())
    };

    // A server error must stop the monitor too.
    cancel.cancel();
    if let Err(e) = monitor_task.await {
        warn!(error = %e, "inactivity monitor task ended abnormally");
    }

    if let Err(e) = db.close().await {
        warn!(error = %e, "failed to close database cleanly");
    }

    info!("leadline stopped");
    served
}
