//! Inbound event routing.
//!
//! One handler per event kind. Handlers validate what they must,
//! resolve the connection's connect code through the registry, and
//! make at most one backend call. Backend failures are logged and
//! dropped; nothing is retried and nothing is reported to the client.
//!
//! | Event          | Validation         | Effect                                  |
//! |----------------|--------------------|-----------------------------------------|
//! | `connectCode`  | length == 8        | register + connection `true`            |
//! | `botID`        | none               | promote (join room, start worker)       |
//! | `taskFailed`   | none               | task status `false`                     |
//! | `taskComplete` | none               | task status `true`                      |
//! | `lobby`        | lobby schema       | lobby event                             |
//! | `state`        | integer            | state event                             |
//! | `player`       | none               | player event                            |
//! | `gameover`     | none               | game-over event                         |

use std::sync::Arc;

use broker_core::{parse_game_phase, CaptureEvent, Lobby, TaskStatus};
use broker_protocol::InboundEvent;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::registry::{Promotion, SessionRegistry};
use crate::types::ConnId;

pub struct EventRouter {
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn Backend>,
}

impl EventRouter {
    pub fn new(registry: Arc<SessionRegistry>, backend: Arc<dyn Backend>) -> Self {
        EventRouter { registry, backend }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handle one event from `conn`.
    pub async fn dispatch(&self, conn: ConnId, event: InboundEvent) {
        match event {
            InboundEvent::ConnectCode(raw) => self.on_connect_code(conn, &raw).await,
            InboundEvent::BotId(id) => self.on_bot_id(conn, id).await,
            InboundEvent::TaskFailed(task_id) => {
                self.on_task_status(conn, &task_id, TaskStatus::Failed).await
            }
            InboundEvent::TaskComplete(task_id) => {
                self.on_task_status(conn, &task_id, TaskStatus::Complete).await
            }
            InboundEvent::Lobby(raw) => self.on_lobby(conn, raw).await,
            InboundEvent::State(raw) => self.on_state(conn, raw).await,
            InboundEvent::Player(raw) => {
                debug!(%conn, payload = %raw, "player update");
                self.forward(conn, CaptureEvent::player(raw)).await
            }
            InboundEvent::GameOver(raw) => {
                debug!(%conn, payload = %raw, "game over");
                self.forward(conn, CaptureEvent::game_over(raw)).await
            }
        }
    }

    /// Connection went away, for whatever `reason`.
    pub async fn on_disconnect(&self, conn: ConnId, reason: &str) {
        info!(%conn, reason, "client connection closed");
        if let Some(code) = self.registry.remove(conn).await {
            debug!(%conn, %code, "session binding released");
        }
    }

    async fn on_connect_code(&self, conn: ConnId, raw: &str) {
        info!(%conn, code = raw, "received connect code");
        let Ok(code) = self.registry.register(conn, raw).await else {
            return;
        };
        if let Err(e) = self
            .backend
            .record_event(&code, &CaptureEvent::connection(true))
            .await
        {
            warn!(%conn, %code, error = %e, "failed to record connection");
        }
    }

    async fn on_bot_id(&self, conn: ConnId, id: Option<i64>) {
        match id {
            Some(id) => info!(%conn, bot_id = id, "received bot id"),
            None => info!(%conn, "received bot id without a numeric value"),
        }
        match self.registry.promote(conn).await {
            Promotion::Started | Promotion::AlreadyRunning => {}
            Promotion::Deferred => debug!(%conn, "promotion deferred"),
            Promotion::Gone => debug!(%conn, "connection gone before promotion finished"),
        }
    }

    async fn on_task_status(&self, conn: ConnId, task_id: &str, status: TaskStatus) {
        debug!(%conn, task_id, %status, "task status from client");
        if let Err(e) = self.backend.set_task_status(task_id, status).await {
            warn!(%conn, task_id, %status, error = %e, "failed to update task status");
        }
    }

    async fn on_lobby(&self, conn: ConnId, raw: String) {
        debug!(%conn, payload = %raw, "lobby");
        if let Err(e) = Lobby::parse(&raw) {
            warn!(%conn, error = %e, "dropping lobby event");
            return;
        }
        self.forward(conn, CaptureEvent::lobby(raw)).await;
    }

    async fn on_state(&self, conn: ConnId, raw: String) {
        debug!(%conn, phase = %raw, "phase received from capture");
        if let Err(e) = parse_game_phase(&raw) {
            warn!(%conn, error = %e, "dropping state event");
            return;
        }
        self.forward(conn, CaptureEvent::state(raw)).await;
    }

    /// Record `event` under the connection's code; no-op if unbound.
    async fn forward(&self, conn: ConnId, event: CaptureEvent) {
        let Some(code) = self.registry.lookup(conn).await else {
            debug!(%conn, kind = event.kind.as_str(), "event from unbound connection dropped");
            return;
        };
        if let Err(e) = self.backend.record_event(&code, &event).await {
            warn!(%conn, %code, kind = event.kind.as_str(), error = %e, "failed to record event");
        }
    }
}
