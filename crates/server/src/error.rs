//! Single place the Gateway turns a [`ControlPlaneError`] into an HTTP
//! response. Never duplicated per handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sessionctl_core::ControlPlaneError;
use serde_json::json;
use tracing::{error, warn};

/// Wraps a [`ControlPlaneError`] with the one piece of context the generic
/// mapping can't infer from the error alone: whether `SessionNotFound` means
/// "404, the resource is gone" (on `DELETE`) or "400, bad request" (everywhere
/// else a UUID is a path parameter).
pub struct GatewayError {
    inner: ControlPlaneError,
    not_found_is_404: bool,
}

impl GatewayError {
    pub fn new(inner: ControlPlaneError) -> Self {
        Self { inner, not_found_is_404: false }
    }

    pub fn for_delete(inner: ControlPlaneError) -> Self {
        Self { inner, not_found_is_404: true }
    }
}

impl From<ControlPlaneError> for GatewayError {
    fn from(inner: ControlPlaneError) -> Self {
        Self::new(inner)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind = self.inner.kind();
        let (status, body) = match &self.inner {
            ControlPlaneError::AuthMissing => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "API key required" }))
            }
            ControlPlaneError::AuthInvalid => {
                (StatusCode::FORBIDDEN, json!({ "error": "invalid API key" }))
            }
            ControlPlaneError::ValidationError(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ControlPlaneError::SessionNotFound(uuid) => {
                let status = if self.not_found_is_404 { StatusCode::NOT_FOUND } else { StatusCode::BAD_REQUEST };
                (status, json!({ "error": format!("session not found: {uuid}") }))
            }
            ControlPlaneError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "rate limit exceeded", "retry_after": retry_after_secs }),
            ),
            ControlPlaneError::OrchestratorError(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
            ControlPlaneError::StoreUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
            }
            ControlPlaneError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal error" }),
            ),
        };

        if status.is_server_error() {
            error!(kind, status = status.as_u16(), error = %self.inner, "request failed");
        } else {
            warn!(kind, status = status.as_u16(), error = %self.inner, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}
