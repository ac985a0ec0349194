use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use loyalty_relay_api::{app, config::Config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics();

    info!("Starting Loyalty Relay v{}", env!("CARGO_PKG_VERSION"));

    // Outbound clients
    let store = Arc::new(services::RecordApiClient::new(&config.store)?);
    let mailer = Arc::new(services::EmailApiClient::new(&config.email)?);

    // Build application
    let addr = config.socket_addr()?;
    let app = app::create_app(config, store, mailer);

    // Start server
    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
