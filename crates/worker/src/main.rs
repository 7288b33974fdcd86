//! Urbanova Worker - standalone reminder delivery binary
//!
//! For library usage, see the worker crate's lib.rs.

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    urbanova_shared::init_env();
    let _guard = urbanova_shared::init_tracing("worker");

    info!("Starting Urbanova worker (standalone mode)");

    let config = worker::Config::from_env()?;
    let services =
        urbanova_shared::build_services(&config, &config.integrations, config.max_retry_count)
            .await?;

    // No shutdown token in standalone mode
    worker::run_worker(services, config, None).await
}
