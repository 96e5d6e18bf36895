//! Restyle server — rewrite short Korean texts in a requested tone.

mod api;
mod cli;
mod error;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use restyle_ai::{LocalBackend, RemoteBackend, Transformer};
use restyle_core::config::AppConfig;
use restyle_core::{lifecycle, GenerationResult};
use tokio::signal;

use cli::{BackendKind, Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    lifecycle::init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref());
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Serve { backend } => serve(config, backend).await,
        Commands::Transform {
            backend,
            style,
            text,
        } => transform_once(config, backend, &style, &text).await,
    }
}

fn backend_label(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Local => "local",
        BackendKind::Remote => "remote",
    }
}

/// Build the transformer for `kind`. The local model loads in the background
/// so the server can answer (with `NotReady`) while weights are read.
fn build_transformer(config: &AppConfig, kind: BackendKind) -> Result<Transformer> {
    match kind {
        BackendKind::Local => {
            let backend = Arc::new(LocalBackend::new(config.local.clone()));
            let loader = backend.clone();
            tokio::spawn(async move {
                if let Err(e) = loader.load().await {
                    tracing::error!("Local model unavailable: {e:#}");
                }
            });
            Ok(Transformer::local(backend))
        }
        BackendKind::Remote => {
            let backend = RemoteBackend::from_env(config.remote.clone())
                .context("Failed to initialise remote backend")?;
            Ok(Transformer::remote(Arc::new(backend)))
        }
    }
}

async fn serve(config: AppConfig, kind: BackendKind) -> Result<()> {
    lifecycle::log_startup(backend_label(kind));

    let transformer = build_transformer(&config, kind)?;
    let app = api::create_router(AppState::new(transformer), &config.server.allowed_origins);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    lifecycle::log_shutdown();
    Ok(())
}

async fn transform_once(config: AppConfig, kind: BackendKind, style: &str, text: &str) -> Result<()> {
    let transformer = match kind {
        BackendKind::Local => {
            let backend = Arc::new(LocalBackend::new(config.local.clone()));
            backend.load().await?;
            Transformer::local(backend)
        }
        BackendKind::Remote => Transformer::remote(Arc::new(RemoteBackend::from_env(
            config.remote.clone(),
        )?)),
    };

    match transformer.transform(text, style).await {
        GenerationResult::Text(output) => {
            println!("{output}");
            Ok(())
        }
        GenerationResult::Error(e) => Err(e.into()),
    }
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
