//! Route handlers: parse the body, validate required fields, dispatch to the
//! Lifecycle Engine, map the outcome to the documented response shape.

use axum::extract::{ConnectInfo, Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sessionctl_core::types::ScaleDirection;
use sessionctl_core::ControlPlaneError;
use sessionctl_lifecycle::ChatOutcome;
use std::net::SocketAddr;

use crate::error::GatewayError;
use crate::rate_limit::Endpoint;
use crate::state::AppState;

fn caller_ip(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    user_id: String,
}

pub async fn create_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Create).await?;
    let created = state.lifecycle.create(&request.user_id).await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(serde_json::json!({
            "uuid": created.uuid,
            "user_id": created.user_id,
            "status": created.status.as_str(),
            "created_at": created.created_at.to_rfc3339(),
            "workspace_url": created.workspace_url,
        })),
    ))
}

pub async fn wake_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Wake).await?;
    state.lifecycle.wake(&uuid).await?;
    Ok(axum::Json(serde_json::json!({
        "uuid": uuid,
        "action": "wake",
        "status": "waking",
    })))
}

pub async fn sleep_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Sleep).await?;
    state.lifecycle.sleep(&uuid).await?;
    Ok(axum::Json(serde_json::json!({
        "uuid": uuid,
        "action": "sleep",
        "status": "sleeping",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    scale: String,
}

pub async fn scale_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
    Json(request): Json<ScaleRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Scale).await?;
    let direction = ScaleDirection::parse(&request.scale).ok_or_else(|| {
        GatewayError::new(ControlPlaneError::ValidationError(format!(
            "unknown scale value: {}",
            request.scale
        )))
    })?;
    state.lifecycle.scale(&uuid, direction).await?;
    let action = match direction {
        ScaleDirection::Up => "scale_up",
        ScaleDirection::Down => "scale_down",
    };
    Ok(axum::Json(serde_json::json!({
        "uuid": uuid,
        "action": action,
        "status": "success",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    message: String,
}

pub async fn chat_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Chat).await?;
    match state.lifecycle.chat(&uuid, &request.message).await? {
        ChatOutcome::Processed(pod_response) => Ok((
            StatusCode::OK,
            axum::Json(serde_json::json!({ "status": "processed", "pod_response": pod_response })),
        )),
        ChatOutcome::Queued => Ok((
            StatusCode::ACCEPTED,
            axum::Json(serde_json::json!({ "status": "queued" })),
        )),
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    uuid: String,
    session: serde_json::Value,
    queue_length: i64,
    replicas: i32,
    timestamp: String,
}

pub async fn session_status(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Status).await?;
    let session = state.registry.require(&uuid).await?;
    let queue_length = state.store.list_length(&sessionctl_core::naming::queue_key(&uuid)).await?;
    let replicas = state
        .orchestrator
        .get_deployment_status(&uuid)
        .await?
        .map(|s| s.spec_replicas)
        .unwrap_or(0);

    Ok(axum::Json(StatusResponse {
        uuid: uuid.clone(),
        session: serde_json::json!({
            "uuid": session.uuid,
            "user_id": session.user_id,
            "status": session.status.as_str(),
            "created_at": session.created_at.to_rfc3339(),
            "last_activity": session.last_activity.to_rfc3339(),
        }),
        queue_length,
        replicas,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Delete).await?;
    state.lifecycle.terminate(&uuid).await.map_err(GatewayError::for_delete)?;
    Ok(axum::Json(serde_json::json!({ "uuid": uuid, "status": "terminated" })))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, GatewayError> {
    state.rate_limiter.check(&caller_ip(&addr), Endpoint::Status).await?;
    let sessions = state.registry.list().await?;
    let total = sessions.len();
    let sessions: Vec<_> = sessions
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "uuid": s.uuid,
                "user_id": s.user_id,
                "status": s.status.as_str(),
                "created_at": s.created_at.to_rfc3339(),
                "last_activity": s.last_activity.to_rfc3339(),
            })
        })
        .collect();
    Ok(axum::Json(serde_json::json!({ "total": total, "sessions": sessions })))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.ping().await.is_ok();
    let status = if store_ok { "healthy" } else { "degraded" };
    let status_code = if store_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status_code,
        axum::Json(serde_json::json!({
            "status": status,
            "redis": if store_ok { "ok" } else { "unreachable" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(sessions) = state.registry.list().await {
        let total = sessions.len() as f64;
        let active = sessions
            .iter()
            .filter(|s| s.status == sessionctl_core::SessionStatus::Running)
            .count() as f64;
        let sleeping = sessions
            .iter()
            .filter(|s| s.status == sessionctl_core::SessionStatus::Sleeping)
            .count() as f64;
        metrics::gauge!("sessionctl_total_sessions").set(total);
        metrics::gauge!("sessionctl_active_sessions").set(active);
        metrics::gauge!("sessionctl_sleeping_sessions").set(sleeping);
    }
    state.metrics_handle.render()
}
