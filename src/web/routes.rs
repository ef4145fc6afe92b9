use axum::{
    routing::{any, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::ws::ws_handler;
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // WebSocket control channel
        .route("/ws", any(ws_handler))
        // Negotiation without a control socket
        .route("/offer", post(handlers::offer))
        // Session control
        .route("/sessions", get(handlers::list_sessions))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/:id/processing", post(handlers::set_processing))
        .route("/sessions/:id/mode", post(handlers::set_mode))
        // Configuration
        .route("/config", get(handlers::config::get_all_config))
        .route("/config/pipeline", patch(handlers::config::update_pipeline_config));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
