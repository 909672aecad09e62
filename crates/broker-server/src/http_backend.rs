//! HTTP implementation of the backend traits.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Call            | Request                                   | Success                    |
//! |-----------------|-------------------------------------------|----------------------------|
//! | record_event    | `POST /capture/{code}/event` (JSON event) | any 2xx                    |
//! | set_task_status | `POST /capture/task/{id}/{true\|false}`   | any 2xx                    |
//! | poll_task       | `POST /capture/{code}/task`               | 200 + task, 204/404 = none |
//! | probe           | `GET /`                                   | any 2xx                    |
//!
//! No call is retried here. Timeouts are whatever the backend's
//! long-poll window is; the client itself only bounds connection setup.

use std::time::Duration;

use async_trait::async_trait;
use broker_core::{CaptureEvent, ConnectCode, ModifyTask, TaskStatus};
use reqwest::StatusCode;
use tracing::{debug, error, info};

use crate::backend::{Backend, BackendError, TaskSource};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Backend client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(HttpBackend {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// One reachability check against `GET /`.
    pub async fn probe(&self) -> Result<(), BackendError> {
        let url = format!("{}/", self.base_url);
        let resp = self.client.get(&url).send().await?;
        ensure_success(resp.status(), &url)
    }

    /// Block until the backend answers [`HttpBackend::probe`],
    /// retrying once per interval. Only used during startup.
    pub async fn wait_until_reachable(&self) {
        loop {
            match self.probe().await {
                Ok(()) => {
                    info!(backend = %self.base_url, "backend reachable");
                    return;
                }
                Err(e) => {
                    error!(
                        backend = %self.base_url,
                        error = %e,
                        "backend unreachable, retrying every second"
                    );
                    tokio::time::sleep(PROBE_RETRY_INTERVAL).await;
                }
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn record_event(&self, code: &ConnectCode, event: &CaptureEvent) -> Result<(), BackendError> {
        let url = self.url(&format!("/capture/{}/event", code));
        let resp = self.client.post(&url).json(event).send().await?;
        ensure_success(resp.status(), &url)
    }

    async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), BackendError> {
        let url = self.url(&format!("/capture/task/{}/{}", task_id, status));
        let resp = self.client.post(&url).send().await?;
        ensure_success(resp.status(), &url)
    }
}

#[async_trait]
impl TaskSource for HttpBackend {
    async fn poll_task(&self, code: &ConnectCode) -> Result<Option<ModifyTask>, BackendError> {
        let url = self.url(&format!("/capture/{}/task", code));
        let resp = self.client.post(&url).send().await?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp.bytes().await?;
                let task = serde_json::from_slice(&body)?;
                Ok(Some(task))
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                debug!(%code, "no pending task");
                Ok(None)
            }
            status => Err(BackendError::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}

fn ensure_success(status: StatusCode, url: &str) -> Result<(), BackendError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(BackendError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
