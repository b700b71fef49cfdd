mod api;
mod config;
mod error;
mod models;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{
    AuthService, CooldownTracker, LocationRegistry, PgRegistrationStore, ProximityDispatcher,
    SessionManager, SpotifyClient,
};
use axum::{
    http::{header, Method},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,songdrop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await?;
    tracing::info!("Database migrations completed");

    // Initialize services
    let spotify = Arc::new(SpotifyClient::new(&config));
    let registry = Arc::new(LocationRegistry::new(Arc::new(PgRegistrationStore::new(db))));
    let cooldowns = Arc::new(CooldownTracker::new(config.song_cooldown));
    let sessions = Arc::new(SessionManager::new(registry.clone(), config.default_radius_km));
    let dispatcher = Arc::new(ProximityDispatcher::new(
        registry.clone(),
        cooldowns,
        spotify.clone(),
        config.enqueue_timeout,
    ));

    // Warm the drop cache so the first location update doesn't pay for it
    match registry.all().await {
        Ok(drops) => tracing::info!("{} song drops registered", drops.len()),
        Err(e) => tracing::error!("Failed to load song drops: {:?}", e),
    }

    let app_state = Arc::new(AppState {
        auth_service: Arc::new(AuthService::new(&config)),
        registry,
        sessions,
        dispatcher,
        spotify,
    });

    let app = Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(api::user_routes())
                .merge(api::registration_routes())
                .with_state(app_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
