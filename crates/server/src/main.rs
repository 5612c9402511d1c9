//! Session control plane entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use sessionctl_config::load_settings;
use sessionctl_orchestrator::{KubeOrchestratorClient, OrchestratorClient};
use sessionctl_server::{create_router, AppState};
use sessionctl_store::{RedisStoreClient, StoreClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("SESSIONCTL_ENV").ok();
    // Fails process startup on any bad or missing configuration rather than
    // starting half-configured with defaults.
    let settings = load_settings(env.as_deref())?;

    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting session control plane");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install metrics recorder: {e}"))?;

    let store: Arc<dyn StoreClient> = Arc::new(RedisStoreClient::connect(&settings.redis).await?);
    tracing::info!(host = %settings.redis.host, port = settings.redis.port, "connected to redis");

    let orchestrator: Arc<dyn OrchestratorClient> =
        Arc::new(KubeOrchestratorClient::connect(settings.profile.namespace.clone()).await?);
    tracing::info!(namespace = %settings.profile.namespace, "connected to kubernetes");

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    let state = AppState::new(settings, store, orchestrator, metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
