use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use query_executor::{config::Config, jobs, routes::create_router, utils::shutdown_signal, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    query_executor::utils::init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Job registry is fixed from here on
    let registry = jobs::default_registry(&config.arxiv)?;
    info!(sources = ?registry.list_sources(), "Job registry ready");

    let state = AppState::new(config.clone(), registry);
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HOST/PORT: {}", e))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}
