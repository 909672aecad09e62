//! Capture events forwarded to the backend.
//!
//! The broker never interprets payloads beyond the validation done in
//! [`crate::lobby`]; whatever the capture client sent is passed on as
//! an opaque string tagged with its [`EventKind`].

use serde::{Deserialize, Serialize};

/// Kind of observation a capture client reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Capture client connected (`"true"`) or went away (`"false"`).
    Connection,

    /// Lobby snapshot (code, region, map).
    Lobby,

    /// Game phase change, as an integer.
    State,

    /// Player update.
    Player,

    /// Game finished.
    GameOver,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connection => "connection",
            EventKind::Lobby => "lobby",
            EventKind::State => "state",
            EventKind::Player => "player",
            EventKind::GameOver => "game_over",
        }
    }
}

/// One event destined for the backend's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Opaque payload, forwarded verbatim.
    pub payload: String,
}

impl CaptureEvent {
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        CaptureEvent {
            kind,
            payload: payload.into(),
        }
    }

    /// Connection-state event; payload is `"true"` or `"false"`.
    pub fn connection(connected: bool) -> Self {
        CaptureEvent::new(EventKind::Connection, connected.to_string())
    }

    pub fn lobby(payload: impl Into<String>) -> Self {
        CaptureEvent::new(EventKind::Lobby, payload)
    }

    pub fn state(payload: impl Into<String>) -> Self {
        CaptureEvent::new(EventKind::State, payload)
    }

    pub fn player(payload: impl Into<String>) -> Self {
        CaptureEvent::new(EventKind::Player, payload)
    }

    pub fn game_over(payload: impl Into<String>) -> Self {
        CaptureEvent::new(EventKind::GameOver, payload)
    }
}
