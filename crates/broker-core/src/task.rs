//! Mute/deafen tasks handed out by the backend.
//!
//! The backend queues one [`ModifyTask`] per voice change it wants a
//! capture client to apply. The broker relays the task to every
//! client in the session's room and later reports back a
//! [`TaskStatus`] once some client says it succeeded or failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Voice state to apply to one guild member.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchParams {
    pub deaf: bool,
    pub mute: bool,
}

/// A pending modify task, as stored in the backend queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyTask {
    #[serde(rename = "guildID")]
    pub guild_id: u64,

    #[serde(rename = "userID")]
    pub user_id: u64,

    pub parameters: PatchParams,

    /// Backend-assigned identifier, echoed by clients in
    /// `taskComplete` / `taskFailed`.
    #[serde(rename = "taskID")]
    pub task_id: String,
}

/// Outcome of a task as reported by a capture client.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Complete,
    Failed,
}

impl TaskStatus {
    /// Wire representation used by the backend (`"true"` / `"false"`).
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Complete => "true",
            TaskStatus::Failed => "false",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
