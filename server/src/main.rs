// server/src/main.rs

mod api;

use anyhow::Context;
use gemini_client::GeminiClient;
use krishi_config::ServiceConfig;
use orchestrator::{KnowledgeBase, Orchestrator, PipelineSettings, PromptRules};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use crate::api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    krishi_config::load_env_files();
    init_tracing();
    info!("[Server] Initializing...");

    let config = ServiceConfig::from_env().context("configuration error")?;

    let knowledge = match &config.knowledge_path {
        Some(path) => KnowledgeBase::load(path)?,
        None => KnowledgeBase::market_rates(),
    };
    let rules = match &config.rules_path {
        Some(path) => PromptRules::load(path)?,
        None => PromptRules::default(),
    };

    let gemini = GeminiClient::new(&config.gemini)?;
    let model = gemini.model().to_string();
    let orchestrator = Orchestrator::new(
        Arc::new(gemini),
        knowledge,
        rules,
        PipelineSettings {
            default_language: config.default_language.clone(),
            echo_errors: config.echo_errors,
        },
    );

    let shared_state = Arc::new(AppState {
        orchestrator,
        model,
    });
    let app = api::router(shared_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!("[Server] Krishi server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("[Server] Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("[Server] Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("[Server] Shutdown signal received");
}
