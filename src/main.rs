//! kawayan-relay server entry point.
//!
//! Starts the Axum HTTP server with the REST lifecycle endpoints and the
//! signaling WebSocket, plus the stale-call reconciliation sweep.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use kawayan_relay::api;
use kawayan_relay::app_state::AppState;
use kawayan_relay::auth::AuthKeys;
use kawayan_relay::config::RelayConfig;
use kawayan_relay::domain::RoomRegistry;
use kawayan_relay::persistence::SqliteStore;
use kawayan_relay::relay::handler::ws_handler;
use kawayan_relay::service::{CallService, run_sweep};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(addr = %config.listen_addr, "starting kawayan-relay");

    // Open the database and create the schema
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_connect_timeout_secs,
        ))
        .connect(&config.database_url)
        .await?;
    let store = SqliteStore::new(pool);
    store
        .init_schema()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Build domain and service layers
    let registry = Arc::new(RoomRegistry::new(config.room_capacity));
    let call_service = Arc::new(CallService::new(
        store,
        Arc::clone(&registry),
        config.active_call_ttl_secs,
    ));

    // Reconciliation sweep for abandoned active-call rows
    tokio::spawn(run_sweep(
        Arc::clone(&call_service),
        config.sweep_interval_secs,
    ));

    // Build application state
    let app_state = AppState {
        registry,
        call_service,
        auth: AuthKeys::from_secret(&config.jwt_secret),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
