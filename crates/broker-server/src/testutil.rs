//! In-memory backend used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use broker_core::{CaptureEvent, ConnectCode, ModifyTask, TaskStatus};

use crate::backend::{Backend, BackendError, TaskSource};

/// Records every write and serves tasks from per-code queues.
#[derive(Debug, Default)]
pub struct FakeBackend {
    events: Mutex<Vec<(ConnectCode, CaptureEvent)>>,
    statuses: Mutex<Vec<(String, TaskStatus)>>,
    queues: Mutex<HashMap<ConnectCode, VecDeque<ModifyTask>>>,
    polls: Mutex<HashMap<ConnectCode, usize>>,
    fail_writes: AtomicBool,
}

impl FakeBackend {
    pub fn events(&self) -> Vec<(ConnectCode, CaptureEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, TaskStatus)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn push_task(&self, code: &ConnectCode, task: ModifyTask) {
        self.queues
            .lock()
            .unwrap()
            .entry(code.clone())
            .or_default()
            .push_back(task);
    }

    pub fn poll_count(&self, code: &ConnectCode) -> usize {
        self.polls.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    /// Make `record_event` / `set_task_status` fail (after recording).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn write_result(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BackendError::Status {
                status: 503,
                url: "fake://backend".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn record_event(&self, code: &ConnectCode, event: &CaptureEvent) -> Result<(), BackendError> {
        self.events.lock().unwrap().push((code.clone(), event.clone()));
        self.write_result()
    }

    async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), BackendError> {
        self.statuses.lock().unwrap().push((task_id.to_string(), status));
        self.write_result()
    }
}

#[async_trait]
impl TaskSource for FakeBackend {
    async fn poll_task(&self, code: &ConnectCode) -> Result<Option<ModifyTask>, BackendError> {
        *self.polls.lock().unwrap().entry(code.clone()).or_default() += 1;
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get_mut(code)
            .and_then(|q| q.pop_front()))
    }
}
