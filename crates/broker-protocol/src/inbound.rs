//! Classification of client frames.
//!
//! Maps a decoded [`Frame`] onto the closed set of events the broker
//! understands. No semantic validation happens here (connect-code
//! length, lobby schema, phase parsing); that is the router's job so
//! it can decide between dropping the event and closing the
//! connection.

use serde_json::Value;

use crate::frame::{Frame, ProtocolError};
use crate::wire_types::*;

/// An event received from a capture client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Offer of a connect code (unvalidated).
    ConnectCode(String),

    /// Client identity. `None` when the data was not an integer.
    BotId(Option<i64>),

    /// Task with this id could not be applied.
    TaskFailed(String),

    /// Task with this id was applied.
    TaskComplete(String),

    /// Raw lobby payload.
    Lobby(String),

    /// Raw game-phase payload.
    State(String),

    /// Raw player payload.
    Player(String),

    /// Raw game-over payload.
    GameOver(String),
}

impl InboundEvent {
    /// Classify a frame by its event name.
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let text = frame.data_text();
        let event = match frame.event.as_str() {
            EVENT_CONNECT_CODE => InboundEvent::ConnectCode(text),
            EVENT_BOT_ID => InboundEvent::BotId(bot_id(&frame.data)),
            EVENT_TASK_FAILED => InboundEvent::TaskFailed(require_text(&frame, text)?),
            EVENT_TASK_COMPLETE => InboundEvent::TaskComplete(require_text(&frame, text)?),
            EVENT_LOBBY => InboundEvent::Lobby(text),
            EVENT_STATE => InboundEvent::State(text),
            EVENT_PLAYER => InboundEvent::Player(text),
            EVENT_GAME_OVER => InboundEvent::GameOver(text),
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }

    /// Wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::ConnectCode(_) => EVENT_CONNECT_CODE,
            InboundEvent::BotId(_) => EVENT_BOT_ID,
            InboundEvent::TaskFailed(_) => EVENT_TASK_FAILED,
            InboundEvent::TaskComplete(_) => EVENT_TASK_COMPLETE,
            InboundEvent::Lobby(_) => EVENT_LOBBY,
            InboundEvent::State(_) => EVENT_STATE,
            InboundEvent::Player(_) => EVENT_PLAYER,
            InboundEvent::GameOver(_) => EVENT_GAME_OVER,
        }
    }
}

/// Decode a text message straight into an [`InboundEvent`].
pub fn decode_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    InboundEvent::from_frame(crate::frame::decode_frame(text)?)
}

fn bot_id(data: &Value) -> Option<i64> {
    match data {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn require_text(frame: &Frame, text: String) -> Result<String, ProtocolError> {
    if text.is_empty() || frame.data.is_null() {
        return Err(ProtocolError::BadData {
            event: frame.event.clone(),
            expected: "a task id",
        });
    }
    Ok(text)
}
