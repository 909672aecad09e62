//! Session registry.
//!
//! Binds live connections to connect codes and decides when a
//! session's dispatch worker runs. State lives in two per-connection
//! maps (`conn -> code`, `conn -> termination signal`) plus the set
//! of live workers keyed by code, all behind one `RwLock`:
//!
//! - `register` / `remove` take the write lock.
//! - `promote` looks up under the read lock and only takes the write
//!   lock for worker bookkeeping; the worker is spawned after the lock
//!   is released.
//!
//! At most one worker runs per connect code. The worker belongs to
//! the connection whose promotion started it and is signalled when
//! that connection is removed. Its entry stays until the task has
//! actually returned, so a worker still finishing its last poll
//! blocks a new one for the same code.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use broker_core::{CaptureEvent, ConnectCode, CoreError};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::backend::{Backend, TaskSource};
use crate::broadcast::RoomBroadcaster;
use crate::dispatch_task::run_dispatch_worker;
use crate::types::ConnId;

/// Outcome of [`SessionRegistry::promote`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// Joined the room and started the session's worker.
    Started,

    /// Joined the room; a worker for this code was already running.
    AlreadyRunning,

    /// No connect code (or no termination signal) for this connection
    /// yet. Nothing happened; the client has to promote again later.
    Deferred,

    /// The connection was removed while promotion was in progress.
    Gone,
}

#[derive(Debug)]
struct ActiveWorker {
    id: u64,
    owner: ConnId,
    signal: CancellationToken,
    /// Fires after the task returned and this entry was dropped.
    done: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    codes: HashMap<ConnId, ConnectCode>,
    signals: HashMap<ConnId, CancellationToken>,
    workers: HashMap<ConnectCode, ActiveWorker>,
}

pub struct SessionRegistry {
    inner: Arc<RwLock<Inner>>,
    broadcaster: RoomBroadcaster,
    backend: Arc<dyn Backend>,
    tasks: Arc<dyn TaskSource>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    ordering_violations: AtomicU64,
    next_worker_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new(
        broadcaster: RoomBroadcaster,
        backend: Arc<dyn Backend>,
        tasks: Arc<dyn TaskSource>,
    ) -> Self {
        SessionRegistry {
            inner: Arc::new(RwLock::new(Inner::default())),
            broadcaster,
            backend,
            tasks,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            ordering_violations: AtomicU64::new(0),
            next_worker_id: AtomicU64::new(0),
        }
    }

    /// Bind `conn` to the connect code `raw`.
    ///
    /// A code of the wrong length closes the connection and leaves the
    /// registry untouched. Registering an already-bound connection
    /// overwrites the previous binding and signal.
    pub async fn register(&self, conn: ConnId, raw: &str) -> Result<ConnectCode, CoreError> {
        let code = match ConnectCode::parse(raw) {
            Ok(code) => code,
            Err(e) => {
                warn!(%conn, offered = raw, error = %e, "rejecting connect code, closing connection");
                self.broadcaster.close(conn);
                return Err(e);
            }
        };

        let signal = self.shutdown.child_token();
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.codes.insert(conn, code.clone()) {
            warn!(%conn, %previous, %code, "connection registered twice; previous binding overwritten");
        }
        inner.signals.insert(conn, signal);
        drop(inner);

        info!(%conn, %code, "connect code registered");
        Ok(code)
    }

    /// Activate `conn`: join its session room and make sure the
    /// session's dispatch worker is running.
    pub async fn promote(&self, conn: ConnId) -> Promotion {
        let bound = {
            let inner = self.inner.read().await;
            inner
                .codes
                .get(&conn)
                .map(|code| (code.clone(), inner.signals.get(&conn).cloned()))
        };
        let Some((code, signal)) = bound else {
            self.note_ordering_violation(conn, None);
            return Promotion::Deferred;
        };

        self.broadcaster.join(conn, &code);

        let Some(signal) = signal else {
            self.note_ordering_violation(conn, Some(&code));
            return Promotion::Deferred;
        };

        let (id, done) = loop {
            let draining = {
                let mut inner = self.inner.write().await;
                if signal.is_cancelled() || inner.codes.get(&conn) != Some(&code) {
                    debug!(%conn, %code, "connection went away during promotion");
                    return Promotion::Gone;
                }
                match inner.workers.get(&code) {
                    Some(active) if !active.signal.is_cancelled() => {
                        debug!(%conn, %code, owner = %active.owner, "worker already running");
                        return Promotion::AlreadyRunning;
                    }
                    Some(active) => active.done.clone(),
                    None => {
                        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
                        let done = CancellationToken::new();
                        inner.workers.insert(
                            code.clone(),
                            ActiveWorker {
                                id,
                                owner: conn,
                                signal: signal.clone(),
                                done: done.clone(),
                            },
                        );
                        break (id, done);
                    }
                }
            };
            debug!(%conn, %code, "previous worker still finishing its poll, waiting");
            draining.cancelled().await;
        };

        info!(%conn, %code, "starting dispatch worker");
        let worker = run_dispatch_worker(
            code.clone(),
            signal,
            Arc::clone(&self.tasks),
            self.broadcaster.clone(),
        );
        let inner = Arc::clone(&self.inner);
        self.tracker.spawn(async move {
            worker.await;
            let mut guard = inner.write().await;
            if guard.workers.get(&code).is_some_and(|w| w.id == id) {
                guard.workers.remove(&code);
            }
            drop(guard);
            done.cancel();
        });
        Promotion::Started
    }

    /// Tear down everything held for `conn`.
    ///
    /// Local state is always cleared first; the backend notification
    /// and room clearing that follow are best effort.
    pub async fn remove(&self, conn: ConnId) -> Option<ConnectCode> {
        let (code, signal) = {
            let mut inner = self.inner.write().await;
            let code = inner.codes.remove(&conn);
            let signal = inner.signals.remove(&conn);
            for (worker_code, worker) in inner.workers.iter().filter(|(_, w)| w.owner == conn) {
                debug!(%conn, code = %worker_code, "stopping owned dispatch worker");
                worker.signal.cancel();
            }
            (code, signal)
        };

        if let Some(signal) = signal {
            signal.cancel();
        }

        if let Some(code) = &code {
            if let Err(e) = self
                .backend
                .record_event(code, &CaptureEvent::connection(false))
                .await
            {
                warn!(%conn, %code, error = %e, "failed to record disconnect");
            }
            self.broadcaster.clear(code);
        }

        code
    }

    /// Connect code bound to `conn`, if any.
    pub async fn lookup(&self, conn: ConnId) -> Option<ConnectCode> {
        self.inner.read().await.codes.get(&conn).cloned()
    }

    /// Whether a termination signal is currently held for `conn`.
    #[cfg(test)]
    pub(crate) async fn has_signal(&self, conn: ConnId) -> bool {
        self.inner.read().await.signals.contains_key(&conn)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.codes.len()
    }

    /// Codes with a running, unsignalled worker, sorted.
    pub async fn active_workers(&self) -> Vec<ConnectCode> {
        let inner = self.inner.read().await;
        let mut codes: Vec<ConnectCode> = inner
            .workers
            .iter()
            .filter(|(_, w)| !w.signal.is_cancelled())
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }

    /// Connection owning the worker for `code`.
    #[cfg(test)]
    pub(crate) async fn worker_owner(&self, code: &ConnectCode) -> Option<ConnId> {
        self.inner.read().await.workers.get(code).map(|w| w.owner)
    }

    /// Worker tasks that have not returned yet, signalled or not.
    #[cfg(test)]
    pub(crate) async fn tracked_workers(&self) -> usize {
        self.inner.read().await.workers.len()
    }

    /// Number of client-identity events that arrived before a code.
    pub fn ordering_violations(&self) -> u64 {
        self.ordering_violations.load(Ordering::Relaxed)
    }

    /// Stop every worker and wait for all of them to return.
    ///
    /// A worker blocked in a poll finishes that poll first.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("all dispatch workers stopped");
    }

    fn note_ordering_violation(&self, conn: ConnId, code: Option<&ConnectCode>) {
        let total = self.ordering_violations.fetch_add(1, Ordering::Relaxed) + 1;
        match code {
            Some(code) => warn!(
                %conn, %code, total,
                "no termination signal for connection; client identity arrived before connect code"
            ),
            None => warn!(
                %conn, total,
                "client identity before connect code; promotion deferred until the client retries"
            ),
        }
    }
}
