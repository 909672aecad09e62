// crates/broker-protocol/src/frame.rs

//! JSON frame envelope.
//!
//! Every WebSocket text message is one JSON object:
//!
//! ```text
//! {"event": "<name>", "data": <any JSON value>}
//! ```
//!
//! `data` defaults to `null` when absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use broker_core::ModifyTask;

use crate::wire_types::EVENT_MODIFY;

/// Errors produced while decoding or encoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    #[error("event {event:?} expects {expected}")]
    BadData {
        event: String,
        expected: &'static str,
    },
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,

    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Frame {
            event: event.into(),
            data,
        }
    }

    /// Payload as text.
    ///
    /// A JSON string yields its contents; any other value is
    /// re-serialized as compact JSON.
    pub fn data_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Decode a single text message into a [`Frame`].
pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a [`Frame`] as compact JSON text.
pub fn encode_frame(frame: &Frame) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

/// Encode the `modify` broadcast for a pending task.
pub fn encode_modify(task: &ModifyTask) -> Result<String, ProtocolError> {
    let data = serde_json::to_value(task)?;
    encode_frame(&Frame::new(EVENT_MODIFY, data))
}
