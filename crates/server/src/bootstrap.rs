use std::sync::Arc;

use chrono::Utc;
use shopwise_agent::{build_client, AgentError, LlmError, SalesOrchestrator};
use shopwise_core::config::{AppConfig, ConfigError, LoadOptions};
use shopwise_core::domain::catalog::ProductQuery;
use shopwise_db::{connect_with_settings, migrations, DemoDataset, RepositoryError, Storage};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub storage: Storage,
    pub orchestrator: Arc<SalesOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("demo data seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("orchestrator setup failed: {0}")]
    Agent(#[source] AgentError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        "starting application bootstrap"
    );

    let storage = open_storage(&config).await?;

    if config.store.seed_demo_data {
        seed_if_empty(&storage).await?;
    }

    let llm = build_client(&config).map_err(BootstrapError::Llm)?;
    let orchestrator = SalesOrchestrator::new(storage.clone(), llm, config.agent.clone())
        .map_err(BootstrapError::Agent)?;
    info!(
        event_name = "system.bootstrap.orchestrator_ready",
        correlation_id = "bootstrap",
        backend = storage.backend_name(),
        "orchestrator ready"
    );

    Ok(Application { config, storage, orchestrator: Arc::new(orchestrator) })
}

async fn open_storage(config: &AppConfig) -> Result<Storage, BootstrapError> {
    let Some(url) = config.database.url.as_deref() else {
        info!(
            event_name = "system.bootstrap.memory_storage",
            correlation_id = "bootstrap",
            "no database url configured, using in-memory storage"
        );
        return Ok(Storage::in_memory());
    };

    let pool =
        connect_with_settings(url, config.database.max_connections, config.database.timeout_secs)
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    Ok(Storage::sql(pool))
}

/// Loads the demo dataset unless the catalogue already has products.
async fn seed_if_empty(storage: &Storage) -> Result<(), BootstrapError> {
    let existing = storage
        .catalog
        .list_products(&ProductQuery { limit: 1, ..ProductQuery::default() })
        .await
        .map_err(BootstrapError::Seed)?;
    if !existing.is_empty() {
        info!(
            event_name = "system.bootstrap.seed_skipped",
            correlation_id = "bootstrap",
            "catalogue already populated"
        );
        return Ok(());
    }

    let summary =
        DemoDataset::standard(Utc::now()).load(storage).await.map_err(BootstrapError::Seed)?;
    info!(
        event_name = "system.bootstrap.demo_data_seeded",
        correlation_id = "bootstrap",
        products = summary.products,
        customers = summary.customers,
        coupons = summary.coupons,
        "demo data loaded"
    );
    Ok(())
}
