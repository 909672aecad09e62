//! Control-plane backend seam.
//!
//! The broker talks to the backend through two narrow traits so the
//! registry, router and dispatch workers can be exercised against
//! in-memory fakes, and so the polling strategy can be swapped
//! without touching the worker.
//!
//! - [`Backend`]: fire-and-forget writes (events, task outcomes)
//! - [`TaskSource`]: pulling the next pending task for a session

use async_trait::async_trait;
use broker_core::{CaptureEvent, ConnectCode, ModifyTask, TaskStatus};
use thiserror::Error;

/// Errors returned by backend calls. Callers log and move on.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("backend sent an undecodable body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Writes into the backend's event log and task table.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Append one capture event for the session named by `code`.
    async fn record_event(&self, code: &ConnectCode, event: &CaptureEvent) -> Result<(), BackendError>;

    /// Report the outcome of a previously broadcast task.
    async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), BackendError>;
}

/// Source of pending tasks for a session.
///
/// Implementations may block (long-poll) until a task is available.
/// `Ok(None)` means "nothing right now"; the caller simply asks again.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn poll_task(&self, code: &ConnectCode) -> Result<Option<ModifyTask>, BackendError>;
}
