// EV Registry - Web Server
// REST API with Axum over the SQLite registry

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ev_registry::api::{router, AppState};
use ev_registry::{logging, CarRepository, Config, QueryLog};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::load().context("Failed to load configuration")?;
    let addr = config.bind_address()?;

    let repo = CarRepository::open(&config.database.path).with_context(|| {
        format!("Failed to open database: {}", config.database.path.display())
    })?;
    info!(path = %config.database.path.display(), "database opened");

    let queries = Arc::new(QueryLog::new(config.telemetry.query_log_capacity));
    let state = AppState::new(repo, queries);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/Makes", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
