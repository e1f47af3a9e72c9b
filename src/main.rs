use moto_portal::{
    AppState, HttpIdentityProvider, create_router,
    client::{ApiClient, ClientState},
    config::{AppConfig, Env},
    provider::ProviderState,
    refresher::REFRESH_PERIOD,
    session::{MirrorState, PostgresSessionMirror, SessionRegistry},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing every core
/// component: configuration, logging, the session mirror, the identity
/// provider, session rehydration, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "moto_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty print for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal starting in {:?} mode", config.env);

    // 4. Session Mirror Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres_mirror = PostgresSessionMirror::new(pool);

    // LOCAL-ONLY: create the session table if running against a fresh database.
    if config.env == Env::Local {
        if let Err(e) = postgres_mirror.ensure_schema().await {
            tracing::error!("session schema setup failed: {e}");
        }
    }

    let mirror = Arc::new(postgres_mirror) as MirrorState;

    // 5. Identity Provider Initialization
    let provider = Arc::new(HttpIdentityProvider::new(
        &config.identity_url,
        &config.identity_api_key,
    )) as ProviderState;

    // 6. Session Rehydration
    // Restores mirrored customer sessions from before the last restart and
    // hands each one a fresh token refresher.
    let sessions =
        SessionRegistry::rehydrate(mirror.clone(), provider.clone(), REFRESH_PERIOD).await;

    // 7. Upstream Client Initialization
    let client = Arc::new(ApiClient::new(&config.upstream_url)) as ClientState;

    // 8. Unified State Assembly
    let app_state = AppState {
        client,
        provider,
        sessions,
        mirror,
        config,
    };

    // 9. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
