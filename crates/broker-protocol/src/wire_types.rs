//! Low-level wire constants.
//!
//! Event names are part of the contract with deployed capture
//! clients and must not change.

/// Session-code offer (client → broker). Data: the connect code.
pub const EVENT_CONNECT_CODE: &str = "connectCode";

/// Client identity (client → broker). Data: numeric bot id.
pub const EVENT_BOT_ID: &str = "botID";

/// A task could not be applied (client → broker). Data: task id.
pub const EVENT_TASK_FAILED: &str = "taskFailed";

/// A task was applied (client → broker). Data: task id.
pub const EVENT_TASK_COMPLETE: &str = "taskComplete";

/// Lobby snapshot (client → broker). Data: lobby JSON.
pub const EVENT_LOBBY: &str = "lobby";

/// Game phase (client → broker). Data: integer phase.
pub const EVENT_STATE: &str = "state";

/// Player update (client → broker).
pub const EVENT_PLAYER: &str = "player";

/// Game over (client → broker).
pub const EVENT_GAME_OVER: &str = "gameover";

/// Pending task broadcast (broker → room). Data: task object.
pub const EVENT_MODIFY: &str = "modify";

/// All event names a client may send.
pub const INBOUND_EVENTS: [&str; 8] = [
    EVENT_CONNECT_CODE,
    EVENT_BOT_ID,
    EVENT_TASK_FAILED,
    EVENT_TASK_COMPLETE,
    EVENT_LOBBY,
    EVENT_STATE,
    EVENT_PLAYER,
    EVENT_GAME_OVER,
];
