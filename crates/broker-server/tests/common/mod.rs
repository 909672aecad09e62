// crates/broker-server/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use broker_core::{CaptureEvent, ConnectCode, ModifyTask, PatchParams, TaskStatus};
use broker_server::backend::{Backend, BackendError, TaskSource};
use broker_server::server::{serve, BrokerState, SOCKET_PATH};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Stand-in for the control plane. Empty polls park briefly, like a
/// long-poll that timed out.
#[derive(Default)]
pub struct MockBackend {
    events: Mutex<Vec<(String, CaptureEvent)>>,
    statuses: Mutex<Vec<(String, TaskStatus)>>,
    queues: Mutex<HashMap<String, VecDeque<ModifyTask>>>,
}

impl MockBackend {
    pub fn events(&self) -> Vec<(String, CaptureEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, code: &str) -> Vec<CaptureEvent> {
        self.events()
            .into_iter()
            .filter(|(c, _)| c == code)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn statuses(&self) -> Vec<(String, TaskStatus)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn push_task(&self, code: &str, task: ModifyTask) {
        self.queues
            .lock()
            .unwrap()
            .entry(code.to_string())
            .or_default()
            .push_back(task);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn record_event(&self, code: &ConnectCode, event: &CaptureEvent) -> Result<(), BackendError> {
        self.events
            .lock()
            .unwrap()
            .push((code.to_string(), event.clone()));
        Ok(())
    }

    async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), BackendError> {
        self.statuses.lock().unwrap().push((task_id.to_string(), status));
        Ok(())
    }
}

#[async_trait]
impl TaskSource for MockBackend {
    async fn poll_task(&self, code: &ConnectCode) -> Result<Option<ModifyTask>, BackendError> {
        let next = self
            .queues
            .lock()
            .unwrap()
            .get_mut(code.as_str())
            .and_then(|q| q.pop_front());
        if next.is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(next)
    }
}

pub fn task(id: &str) -> ModifyTask {
    ModifyTask {
        guild_id: 754,
        user_id: 1001,
        parameters: PatchParams { deaf: false, mute: true },
        task_id: id.to_string(),
    }
}

/// A broker running on an ephemeral port.
pub struct TestBroker {
    pub addr: SocketAddr,
    pub state: BrokerState,
    pub backend: Arc<MockBackend>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestBroker {
    pub async fn start() -> Self {
        let backend = Arc::new(MockBackend::default());
        let state = BrokerState::new(backend.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = stopped.await;
        }));

        TestBroker {
            addr,
            state,
            backend,
            stop: Some(stop),
            handle,
        }
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}{}", self.addr, SOCKET_PATH)
    }

    pub async fn connect(&self) -> TestClient {
        let (ws, _) = connect_async(self.socket_url()).await.unwrap();
        TestClient { ws }
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("broker did not shut down")
            .unwrap()
            .unwrap();
    }
}

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn emit(&mut self, event: &str, data: serde_json::Value) {
        let frame = serde_json::json!({ "event": event, "data": data });
        self.ws.send(Message::text(frame.to_string())).await.unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    /// Next text frame as JSON, or `None` if the socket closed.
    pub async fn next_frame(&mut self, wait: Duration) -> Option<serde_json::Value> {
        loop {
            let msg = tokio::time::timeout(wait, self.ws.next()).await.ok()??;
            match msg {
                Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Whether the server closed the socket within `wait`.
    pub async fn closed_by_server(&mut self, wait: Duration) -> bool {
        match tokio::time::timeout(wait, self.ws.next()).await {
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) => true,
            _ => false,
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
