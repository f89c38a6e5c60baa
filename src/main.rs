use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pr_policy_gate::api::{self, AppState};
use pr_policy_gate::config::AppConfig;
use pr_policy_gate::database::Database;
use pr_policy_gate::enforcement::DecisionLogger;
use pr_policy_gate::host::bridge::HostBridge;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pr_policy_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PR policy gate");

    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let database = Database::new(&config.database_url).await?;
    database.run_migrations().await?;
    info!("Database ready at {}", config.database_url);

    let bridge = Arc::new(HostBridge::new(
        &config.host_base_url,
        config.host_api_token.clone(),
    )?);
    info!("Host bridge at {}", config.host_base_url);

    let state = AppState::new(
        Arc::new(database),
        bridge.clone(),
        bridge,
        config.search,
        DecisionLogger::from_settings(&config.decisions),
    );
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
