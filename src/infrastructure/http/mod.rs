pub mod request_id;

use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, voiceover::VoiceoverController};
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use request_id::request_id_middleware;

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    voiceover_controller: Arc<VoiceoverController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let voiceover_routes = Router::new()
        .route(
            "/api/voiceovers/regenerate",
            post(VoiceoverController::regenerate),
        )
        .with_state(voiceover_controller.clone());

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool.clone())
        .merge(voiceover_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
