// crates/broker-server/src/client.rs

//! Per-connection I/O loop.
//!
//! Each accepted WebSocket gets:
//! - a writer task draining the connection's outbound channel,
//! - a reader loop (this task) decoding frames and handing events to
//!   the [`EventRouter`] one at a time, in arrival order.
//!
//! In-order handling means a `connectCode` is always registered
//! before a later `botID` promotes. The cost: while a backend call
//! for this connection hangs (the HTTP client only bounds connection
//! setup), its later frames wait and so does the close check, so
//! disconnect cleanup runs only after that call returns.
//!
//! When the reader stops (client close, transport error, or the
//! server closing the connection) the router runs disconnect cleanup
//! and the connection is detached from the hub.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use broker_protocol::decode_inbound;

use crate::router::EventRouter;
use crate::server::BrokerState;
use crate::types::{ConnId, Outbound, OutboundRx, OutboundTx};

/// Run the client I/O loop for a single connection.
pub async fn run_client(conn: ConnId, socket: WebSocket, state: BrokerState) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
    let closed = state.hub.attach(conn, out_tx);
    info!(%conn, "connected");

    // Writer task: consume outbound frames and write them to the socket.
    let writer = tokio::spawn(async move {
        while let Some(out) = out_rx.recv().await {
            match out {
                Outbound::Frame(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        debug!(%conn, error = %e, "write failed");
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let reason = read_loop(conn, &mut stream, &closed, &state.router).await;

    state.router.on_disconnect(conn, &reason).await;
    state.hub.detach(conn);
    let _ = writer.await;
}

async fn read_loop(
    conn: ConnId,
    stream: &mut SplitStream<WebSocket>,
    closed: &CancellationToken,
    router: &EventRouter,
) -> String {
    loop {
        let msg = tokio::select! {
            biased;
            _ = closed.cancelled() => return "server closed connection".to_string(),
            msg = stream.next() => msg,
        };

        match msg {
            None => return "client went away".to_string(),
            Some(Err(e)) => return format!("transport error: {e}"),
            Some(Ok(Message::Close(frame))) => {
                return match frame {
                    Some(frame) if !frame.reason.as_str().is_empty() => {
                        format!("client closed: {}", frame.reason.as_str())
                    }
                    _ => "client closed".to_string(),
                };
            }
            Some(Ok(Message::Text(text))) => match decode_inbound(text.as_str()) {
                Ok(event) => {
                    debug!(%conn, event = event.name(), "inbound event");
                    router.dispatch(conn, event).await;
                }
                Err(e) => warn!(%conn, error = %e, "dropping undecodable frame"),
            },
            Some(Ok(Message::Binary(_))) => debug!(%conn, "ignoring binary frame"),
            Some(Ok(_)) => {}
        }
    }
}
