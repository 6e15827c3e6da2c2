use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linklet::{api, clock::SystemClock, config::Settings, db, redirect, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // Determine database URL
    let db_url = settings
        .database_url
        .clone()
        .or_else(|| {
            settings
                .database_path
                .as_ref()
                .map(|p| format!("sqlite:{}", p))
        })
        .unwrap_or_else(|| {
            #[cfg(feature = "postgres")]
            {
                "postgres://localhost/linklet".to_string()
            }
            #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
            {
                "sqlite:linklet.db?mode=rwc".to_string()
            }
        });

    info!("Connecting to database...");
    let pool = db::create_pool(&db_url).await?;
    info!("Database connected");

    // Run migrations
    info!("Running migrations...");
    db::run_migrations(&pool).await?;
    info!("Migrations complete");

    // Create app state
    let state = AppState::new(pool, settings.clone(), Arc::new(SystemClock));

    // CORS layer
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    // Build router. The slug catch-all goes last so /health and /api
    // stay reachable.
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/api/urls", post(api::create_url).get(api::list_urls))
        .route("/api/urls/{slug}/analytics", get(api::url_analytics))
        .route("/{slug}", get(redirect::follow))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::new(
        settings.host.parse().unwrap_or([0, 0, 0, 0].into()),
        settings.port,
    );
    info!("Starting server on {}", addr);
    info!("Short links served under {}", settings.base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
