use std::sync::Arc;

use safepath::{Config, SafetyService, api};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    // 1. Configuration: defaults < SAFEPATH_CONFIG file < env
    let config = Config::load()?;

    // 2. Safety grid, seeded reports, routing provider
    let service = Arc::new(SafetyService::from_config(&config)?);
    log::info!(
        "Safety grid ready: {} cells, {} reports",
        service.grid().len(),
        service.reports().len()
    );

    // 3. Router
    let app = api::router(service);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("API server running on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
