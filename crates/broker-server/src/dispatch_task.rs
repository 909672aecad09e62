//! Per-session dispatch worker.
//!
//! One of these runs for every connect code that has a promoted
//! connection. It owns nothing but its code and termination signal:
//!
//! ```text
//! loop {
//!     signal fired?         -> stop
//!     poll backend for code -> task? broadcast `modify` to the room
//! }
//! ```
//!
//! The signal is only checked between polls. A poll in flight is
//! never cut short, so teardown can lag by up to one poll; whatever
//! that last poll returns is dropped, not broadcast.

use std::sync::Arc;

use broker_core::ConnectCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::backend::TaskSource;
use crate::broadcast::RoomBroadcaster;

/// Run the dispatch loop for `code` until `signal` fires.
///
/// Returns the number of tasks broadcast.
pub async fn run_dispatch_worker(
    code: ConnectCode,
    signal: CancellationToken,
    source: Arc<dyn TaskSource>,
    broadcaster: RoomBroadcaster,
) -> u64 {
    let mut dispatched = 0u64;

    loop {
        if signal.is_cancelled() {
            info!(%code, dispatched, "dispatch worker stopped");
            return dispatched;
        }

        let polled = source.poll_task(&code).await;
        if signal.is_cancelled() {
            if let Ok(Some(task)) = &polled {
                warn!(%code, task_id = %task.task_id, "worker stopped mid-poll, task not delivered");
            }
            info!(%code, dispatched, "dispatch worker stopped");
            return dispatched;
        }

        match polled {
            Ok(Some(task)) => match broadcaster.broadcast_task(&code, &task) {
                Ok(delivered) => {
                    dispatched += 1;
                    info!(%code, task_id = %task.task_id, delivered, "broadcast task to room");
                }
                Err(e) => warn!(%code, task_id = %task.task_id, error = %e, "failed to encode task"),
            },
            Ok(None) => trace!(%code, "poll returned no task"),
            Err(e) => debug!(%code, error = %e, "task poll failed"),
        }

        // Busy-poll, but let other tasks on this worker thread run.
        tokio::task::yield_now().await;
    }
}
