use anyhow::Result;
use shopwise_core::config::{AppConfig, LoadOptions};
use shopwise_server::{bootstrap_with_config, router, AppState};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use shopwise_core::config::LogFormat::*;

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be live before bootstrap emits its events
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        backend = app.storage.backend_name(),
        llm_provider = app.orchestrator.llm_provider(),
        "shopwise-server listening"
    );

    let state = AppState { orchestrator: app.orchestrator, storage: app.storage };
    axum::serve(listener, router(state)).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "shopwise-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for ctrl-c"
        );
    }
}
