//! Store Congestion Sync Backend
//!
//! Keeps a live view of stores, their crowd-sourced congestion status and hashtags,
//! backed by SQLite with an in-process change feed pushing new reports to the view.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod query;
mod realtime;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::SignInRegistry;
use config::Config;
use db::Repository;
use realtime::ChangeFeed;
use sync::SyncSession;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SyncSession>,
    pub sign_ins: SignInRegistry,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Store Congestion Sync Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CONGESTION_API_PSK). Authentication is disabled!");
    }

    // Initialize database and change feed
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool, ChangeFeed::new(config.feed_capacity)));

    if let Some(seed_path) = &config.seed_path {
        let inserted = db::seed_from_file(&repo, seed_path).await?;
        tracing::info!("Seed inserted {} stores", inserted);
    }

    // Subscribe and run the initial load
    let session = Arc::new(SyncSession::start(repo).await?);

    let state = AppState {
        session: session.clone(),
        sign_ins: SignInRegistry::new(),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    tracing::info!("Shut down");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Session
        .route("/session", get(api::get_session))
        .route("/session/reload", post(api::reload_session))
        // Stores
        .route("/stores", get(api::list_stores))
        .route("/stores/{id}", get(api::get_store))
        .route(
            "/stores/{id}/status",
            get(api::get_current_status).post(api::submit_status),
        )
        .route("/stores/{id}/status/history", get(api::get_status_history))
        .route("/stores/{id}/tags", get(api::list_store_tags))
        .route(
            "/stores/{id}/tags/{tag_id}",
            post(api::add_store_tag).delete(api::remove_store_tag),
        )
        // Statuses and tags
        .route("/statuses", get(api::list_statuses))
        .route("/tags", get(api::list_tags))
        // Sign-in
        .route(
            "/auth/session",
            get(api::get_auth_session)
                .post(api::sign_in)
                .delete(api::sign_out),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
