//! Payload validation for lobby and game-phase events.
//!
//! Only these two event kinds are checked before forwarding; every
//! other payload goes to the backend untouched.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lobby snapshot reported by a capture client.
///
/// Missing fields fall back to defaults and unknown fields are
/// ignored; a field of the wrong type is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    #[serde(rename = "LobbyCode", default)]
    pub lobby_code: String,

    #[serde(rename = "Region", default)]
    pub region: i64,

    #[serde(rename = "Map", default)]
    pub play_map: i64,
}

impl Lobby {
    /// Decode a raw lobby payload.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(CoreError::InvalidLobby)
    }
}

/// Parse a game-phase payload as a decimal integer.
///
/// Accepts an optional leading sign; surrounding whitespace is not
/// accepted.
pub fn parse_game_phase(raw: &str) -> Result<i64, CoreError> {
    raw.parse::<i64>().map_err(|source| CoreError::InvalidGamePhase {
        raw: raw.to_string(),
        source,
    })
}
