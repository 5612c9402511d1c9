//! Request Gateway: the HTTP surface of the session control plane.
//!
//! Each handler authenticates, rate-limits, validates, dispatches to the
//! Lifecycle Engine, and lets the single [`error::GatewayError`] mapper turn
//! whatever comes back into a response. No handler maps errors itself.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod state;

pub use state::AppState;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the application router. Auth runs after CORS/trace but before any
/// handler; health and metrics bypass it entirely (see [`auth::auth_middleware`]).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::DELETE]);

    Router::new()
        .route("/session/create", post(handlers::create_session))
        .route("/session/:uuid/wake", post(handlers::wake_session))
        .route("/session/:uuid/sleep", post(handlers::sleep_session))
        .route("/session/:uuid/scale", post(handlers::scale_session))
        .route("/session/:uuid/chat", post(handlers::chat_session))
        .route("/session/:uuid/status", get(handlers::session_status))
        .route("/session/:uuid", delete(handlers::delete_session))
        .route("/sessions", get(handlers::list_sessions))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
