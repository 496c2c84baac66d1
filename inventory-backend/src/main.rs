use inventory_backend::config::Config;
use inventory_backend::create_app;
use inventory_db::Database;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing for structured logging, RUST_LOG wins when set
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting inventory backend...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: env={}, port={}, db_path={}, body_limit={}KB, timeout={}s, token_ttl={}h",
        config.app_env,
        config.port,
        config.database_path,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
        config.jwt_expiration.as_secs() / 3600
    );

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database at {}: {}", config.database_path, e);
            std::process::exit(1);
        }
    };

    let app = create_app(db, &config);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Server listening on {} in {} mode", addr, config.app_env);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = result {
        tracing::error!("Axum server error: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
