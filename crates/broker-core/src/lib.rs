//! broker-core
//!
//! Pure capture-broker domain logic:
//! - connect codes (session identifiers)
//! - capture events forwarded to the backend
//! - mute/deafen tasks pulled from the backend
//! - payload validation (lobby schema, game phase)

pub mod connect_code;
pub mod event;
pub mod task;
pub mod lobby;
pub mod error;

pub use connect_code::{ConnectCode, CONNECT_CODE_LEN};
pub use event::{CaptureEvent, EventKind};
pub use task::{ModifyTask, PatchParams, TaskStatus};
pub use lobby::{parse_game_phase, Lobby};
pub use error::CoreError;
