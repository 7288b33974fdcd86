use anyhow::Result;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use urbanova_core::services::ConciergeServices;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    urbanova_shared::init_env();

    // Guard must outlive the process so buffered logs are flushed
    let _guard = urbanova_shared::init_tracing("server");

    tracing::info!("🚀 Starting Urbanova unified server");

    let config = config::UnifiedConfig::from_env()?;
    tracing::info!("✓ Configuration loaded");

    // One service bundle so the API and the worker see the same store
    let services = urbanova_shared::build_services(
        &config.core,
        &config.integrations,
        config.worker.max_retry_count,
    )
    .await?;

    let shutdown = CancellationToken::new();

    let api_handle = spawn_api(services.clone(), config.clone(), shutdown.clone());
    let worker_handle = spawn_worker(services, config, shutdown.clone());

    tracing::info!("✓ All services started");

    wait_for_shutdown().await?;
    tracing::info!("📡 Shutdown signal received");

    shutdown.cancel();

    let (api, worker) = tokio::join!(api_handle, worker_handle);
    for (name, joined) in [("api", api), ("worker", worker)] {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("{} service failed: {:?}", name, e),
            Err(e) => tracing::error!("{} task panicked: {}", name, e),
        }
    }

    tracing::info!("✓ All services stopped gracefully");
    Ok(())
}

fn spawn_api(
    services: ConciergeServices,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let state = api::AppState::new(services);
        let api_config = config.to_api_config();

        tokio::select! {
            result = api::run_api(state, &api_config) => {
                tracing::error!("API service exited: {:?}", result);
                result
            }
            _ = shutdown.cancelled() => {
                tracing::info!("API service shutting down");
                Ok(())
            }
        }
    })
}

fn spawn_worker(
    services: ConciergeServices,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        worker::run_worker(services, config.to_worker_config(), Some(shutdown)).await
    })
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c().await?;

    Ok(())
}
