use anyhow::{Context, Result};
use integrations::IntegrationsConfig;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use urbanova_core::config::CoreConfig;
use urbanova_core::services::{ConciergeServices, Repositories};

/// Initialize dotenvy
pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Initialize tracing; a JSON file layer is added when `ENABLE_FILE_LOGGING` is set
///
/// The returned guard must be held for the lifetime of the process.
pub fn init_tracing(service_name: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!(
        "info,{}=debug,api=debug,worker=debug,urbanova_core=debug,sqlx=warn",
        service_name
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let file_logging = std::env::var("ENABLE_FILE_LOGGING")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if !file_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return None;
    }

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs/app".to_string());
    let now = chrono::Local::now().format("%y-%m-%d-%H-%M-%S").to_string();
    let filename = format!("urbanova-{}.log.{}.jsonl", service_name, now);

    let file_appender = tracing_appender::rolling::never(&log_dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    Some(guard)
}

/// Initialize the database pool and apply migrations
pub async fn init_db(config: &CoreConfig, database_url: &str) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        "✓ Database pool established (max_connections: {})",
        config.db_max_connections
    );

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    Ok(pool)
}

/// Wire repositories and provider adapters into the service bundle
///
/// Without `DATABASE_URL` everything lives in process memory.
pub async fn build_services(
    core: &CoreConfig,
    integrations: &IntegrationsConfig,
    max_retry_count: u32,
) -> Result<ConciergeServices> {
    let repos = match &core.database_url {
        Some(url) => Repositories::postgres(init_db(core, url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Repositories::in_memory()
        }
    };
    let adapters = integrations::build_adapters(integrations)?;

    Ok(ConciergeServices::new(core, repos, adapters, max_retry_count))
}
