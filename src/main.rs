//! jest-market server entry point.
//!
//! Starts the Axum HTTP server over a PostgreSQL-backed store.

use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jest_market::api;
use jest_market::app_state::AppState;
use jest_market::config::MarketConfig;
use jest_market::domain::EventBus;
use jest_market::persistence::PostgresStore;
use jest_market::service::{CartService, MissionService, NoopGateway, PurchaseService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = MarketConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting jest-market");

    // Migrations run before the first request is accepted.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(config.database_connect_timeout())
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PostgresStore::new(pool));
    let event_bus = EventBus::new(config.event_bus_capacity);
    let mission_service = Arc::new(MissionService::new(Arc::clone(&store), event_bus.clone()));
    let cart_service = Arc::new(CartService::new(Arc::clone(&store)));
    let purchase_service = Arc::new(PurchaseService::new(
        Arc::clone(&store),
        Arc::new(NoopGateway),
        mission_service,
        event_bus.clone(),
    ));

    let app_state = AppState {
        purchase_service,
        cart_service,
        store,
        event_bus,
    };

    let mut app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .with_state(app_state);
    if config.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
