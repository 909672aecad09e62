//! Error types for the broker domain layer.
//!
//! Everything here is a validation failure on data offered by a
//! capture client. None of these are fatal to the process; the
//! server layer decides whether to drop the event or close the
//! connection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Connect code had the wrong length (in bytes).
    #[error("connect code must be {expected} bytes, got {actual}")]
    InvalidConnectCode { expected: usize, actual: usize },

    /// Lobby payload did not decode into the lobby schema.
    #[error("invalid lobby payload: {0}")]
    InvalidLobby(#[source] serde_json::Error),

    /// Game phase payload was not an integer.
    #[error("invalid game phase {raw:?}: {source}")]
    InvalidGamePhase {
        raw: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
