//! HTTP listener and top-level server wiring.
//!
//! This module:
//! - Serves the liveness probe (`GET /` -> `200 ok`).
//! - Upgrades `GET /socket` to a WebSocket and assigns each
//!   connection a `ConnId`.
//! - Spawns a per-client task to handle I/O.
//! - On shutdown, closes live connections and stops every dispatch
//!   worker.
//!
//! The per-client logic lives in `client`; session state lives in
//! `registry`.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::backend::{Backend, TaskSource};
use crate::broadcast::RoomBroadcaster;
use crate::client;
use crate::config::Config;
use crate::http_backend::HttpBackend;
use crate::registry::SessionRegistry;
use crate::router::EventRouter;
use crate::transport::Hub;
use crate::types::next_conn_id;

/// WebSocket endpoint for capture clients.
pub const SOCKET_PATH: &str = "/socket";

/// Body of the liveness probe.
pub const HEALTH_BODY: &str = "ok";

/// Everything a connection task needs, cheaply cloneable.
#[derive(Clone)]
pub struct BrokerState {
    pub hub: Arc<Hub>,
    pub registry: Arc<SessionRegistry>,
    pub router: Arc<EventRouter>,
}

impl BrokerState {
    /// Wire up hub, registry and router around one backend.
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: Backend + TaskSource + 'static,
    {
        let hub = Arc::new(Hub::new());
        let broadcaster = RoomBroadcaster::new(hub.clone());
        let registry = Arc::new(SessionRegistry::new(
            broadcaster,
            backend.clone(),
            backend.clone(),
        ));
        let router = Arc::new(EventRouter::new(registry.clone(), backend));
        BrokerState {
            hub,
            registry,
            router,
        }
    }
}

/// Build the axum router for `state`.
pub fn app(state: BrokerState) -> Router {
    Router::new()
        .route("/", get(health))
        .route(SOCKET_PATH, get(upgrade))
        .with_state(state)
}

async fn health() -> &'static str {
    HEALTH_BODY
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<BrokerState>) -> impl IntoResponse {
    let conn = next_conn_id();
    ws.on_upgrade(move |socket| client::run_client(conn, socket, state))
}

/// Serve on `listener` until `shutdown` resolves, then tear down
/// connections and workers.
pub async fn serve<F>(listener: TcpListener, state: BrokerState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "capture broker listening");

    // Graceful shutdown does not track upgraded sockets.
    let hub = state.hub.clone();
    let shutdown = async move {
        shutdown.await;
        info!(
            connections = hub.connection_count(),
            "shutting down, closing client connections"
        );
        hub.close_all();
    };

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    state.registry.shutdown().await;
    Ok(())
}

/// Run the broker with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(&config.backend_url)?);
    backend.wait_until_reachable().await;

    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve(listener, BrokerState::new(backend), shutdown_signal()).await?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("received kill/term signal");
}
