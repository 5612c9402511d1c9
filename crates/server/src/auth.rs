//! API-key authentication middleware.
//!
//! The header `X-API-Key` or `Authorization: Bearer <key>` must equal the
//! configured key, compared in constant time. Missing credential -> 401;
//! wrong credential -> 403. When no key is configured, authentication is
//! disabled and every request passes through.

use crate::error::GatewayError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use constant_time_eq::constant_time_eq;
use sessionctl_core::ControlPlaneError;

const PUBLIC_PATHS: &[&str] = &["/health", "/metrics"];

pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if PUBLIC_PATHS.contains(&path) {
        return next.run(request).await;
    }

    let Some(expected_key) = state.settings.auth.api_key.as_deref() else {
        return next.run(request).await;
    };

    match extract_credential(&request) {
        None => GatewayError::new(ControlPlaneError::AuthMissing).into_response(),
        Some(provided) if constant_time_eq(provided.as_bytes(), expected_key.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => GatewayError::new(ControlPlaneError::AuthInvalid).into_response(),
    }
}

fn extract_credential(request: &Request) -> Option<String> {
    if let Some(key) = request.headers().get("X-API-Key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}
