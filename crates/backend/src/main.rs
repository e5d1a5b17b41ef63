mod domain;
mod handlers;
mod routes;
mod shared;
mod system;

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{header, Method};
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use shared::app_state::AppState;
use shared::config;
use system::middleware::request_logger::request_logger;
use system::tasks::worker::CleanupWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = config::load_config().context("Failed to load configuration")?;

    // Initialize database (schema is bootstrapped on every start)
    let db_path = config::get_database_path(&config);
    let db = shared::data::db::initialize_database(&db_path)
        .await
        .with_context(|| format!("db init failed: {}", db_path.display()))?;

    let jwt_secret = system::auth::jwt::get_or_create_jwt_secret(&db).await?;

    // Ensure admin user exists
    system::initialization::ensure_admin_user_exists(&db, &config.auth).await?;

    if config.cleanup.enabled {
        let worker = CleanupWorker::new(db.clone(), &config.cleanup.schedule)?;
        tokio::spawn(async move { worker.run_loop().await });
    } else {
        tracing::info!("Expired code cleanup worker is disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    let state = AppState::new(db, config, jwt_secret);
    let app = routes::configure_routes(state)
        .layer(middleware::from_fn(request_logger))
        .layer(cors);

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Port {} is already in use. Please ensure no other process is using this port.",
                    addr.port()
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
