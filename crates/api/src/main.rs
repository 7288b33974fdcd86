use anyhow::Result;
use api::AppState;
use integrations::IntegrationsConfig;

#[tokio::main]
async fn main() -> Result<()> {
    urbanova_shared::init_env();
    let _guard = urbanova_shared::init_tracing("api");

    tracing::info!("Starting Urbanova API server");

    let config = api::config::Config::from_env()?;
    let integrations = IntegrationsConfig::from_env()?;
    tracing::info!(
        "Server configuration loaded: {}:{}",
        config.host,
        config.port
    );

    // Reminders are only delivered by the worker; the retry budget is irrelevant here
    let services = urbanova_shared::build_services(&config, &integrations, 1).await?;

    api::run_api(AppState::new(services), &config).await
}
