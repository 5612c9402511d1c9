//! Error taxonomy shared by every component.
//!
//! A single closed enum crosses every internal boundary; `From` impls convert
//! collaborator errors (store, orchestrator, HTTP) into it at the point they're
//! raised so the Gateway has exactly one place to map errors onto HTTP.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("API key required")]
    AuthMissing,

    #[error("invalid API key")]
    AuthInvalid,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("orchestrator error: {0}")]
    OrchestratorError(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlPlaneError {
    /// Short machine-readable kind, used in log fields and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthMissing => "AuthMissing",
            Self::AuthInvalid => "AuthInvalid",
            Self::ValidationError(_) => "ValidationError",
            Self::SessionNotFound(_) => "SessionNotFound",
            Self::RateLimited { .. } => "RateLimited",
            Self::OrchestratorError(_) => "OrchestratorError",
            Self::StoreUnavailable(_) => "StoreUnavailable",
            Self::Internal(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;
