//! Connection table and room membership.
//!
//! The [`Hub`] is the transport-side bookkeeping for live sockets:
//! it owns each connection's outbound channel and close signal, and
//! tracks which connections sit in which room. The rest of the
//! broker only reaches it through the [`Transport`] trait.

use std::collections::HashSet;

use broker_core::ConnectCode;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::types::{ConnId, Outbound, OutboundTx};

/// Membership and delivery primitives the broker core relies on.
pub trait Transport: Send + Sync {
    /// Add `conn` to the room for `room`. Joining twice is harmless.
    fn join(&self, conn: ConnId, room: &ConnectCode);

    /// Send `frame` to every connection currently in `room`.
    /// Returns the number of connections it was handed to.
    fn broadcast_to_room(&self, room: &ConnectCode, frame: &str) -> usize;

    /// Drop every member from `room`.
    fn clear_room(&self, room: &ConnectCode);

    /// Terminate `conn` from the server side.
    fn close(&self, conn: ConnId);
}

/// Per-connection state held by the hub.
#[derive(Debug)]
struct ConnectionHandle {
    tx: OutboundTx,
    closed: CancellationToken,
}

/// In-process transport: connections, their outbound channels, rooms.
#[derive(Debug, Default)]
pub struct Hub {
    connections: DashMap<ConnId, ConnectionHandle>,
    rooms: DashMap<ConnectCode, HashSet<ConnId>>,
}

impl Hub {
    pub fn new() -> Self {
        Hub::default()
    }

    /// Start tracking a connection. The returned token fires when the
    /// server decides to close it.
    pub fn attach(&self, conn: ConnId, tx: OutboundTx) -> CancellationToken {
        let closed = CancellationToken::new();
        self.connections.insert(
            conn,
            ConnectionHandle {
                tx,
                closed: closed.clone(),
            },
        );
        closed
    }

    /// Forget a connection and remove it from every room.
    pub fn detach(&self, conn: ConnId) {
        self.connections.remove(&conn);
        self.rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Close every live connection (server shutdown).
    pub fn close_all(&self) {
        for handle in self.connections.iter() {
            let _ = handle.tx.send(Outbound::Close);
            handle.closed.cancel();
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Members of `room`, sorted.
    pub fn room_members(&self, room: &ConnectCode) -> Vec<ConnId> {
        let mut members: Vec<ConnId> = self
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

impl Transport for Hub {
    fn join(&self, conn: ConnId, room: &ConnectCode) {
        if !self.connections.contains_key(&conn) {
            debug!(%conn, %room, "join for unknown connection ignored");
            return;
        }
        self.rooms.entry(room.clone()).or_default().insert(conn);
    }

    fn broadcast_to_room(&self, room: &ConnectCode, frame: &str) -> usize {
        // Snapshot members so no room shard is held while sending.
        let members: Vec<ConnId> = match self.rooms.get(room) {
            Some(m) => m.iter().copied().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for conn in members {
            if let Some(handle) = self.connections.get(&conn) {
                if handle.tx.send(Outbound::Frame(frame.to_string())).is_ok() {
                    delivered += 1;
                }
            }
        }
        trace!(%room, delivered, "room broadcast");
        delivered
    }

    fn clear_room(&self, room: &ConnectCode) {
        self.rooms.remove(room);
    }

    fn close(&self, conn: ConnId) {
        if let Some(handle) = self.connections.get(&conn) {
            let _ = handle.tx.send(Outbound::Close);
            handle.closed.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn code(s: &str) -> ConnectCode {
        ConnectCode::parse(s).unwrap()
    }

    #[test]
    fn broadcast_reaches_only_room_members() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        hub.attach(ConnId(1), tx_a);
        hub.attach(ConnId(2), tx_b);
        hub.attach(ConnId(3), tx_c);

        hub.join(ConnId(1), &code("AAAAAAAA"));
        hub.join(ConnId(2), &code("AAAAAAAA"));
        hub.join(ConnId(3), &code("BBBBBBBB"));

        assert_eq!(hub.broadcast_to_room(&code("AAAAAAAA"), "hello"), 2);
        assert_eq!(rx_a.try_recv().unwrap(), Outbound::Frame("hello".into()));
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::Frame("hello".into()));
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn clear_room_empties_membership() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.attach(ConnId(1), tx);
        hub.join(ConnId(1), &code("AAAAAAAA"));
        hub.clear_room(&code("AAAAAAAA"));

        assert_eq!(hub.broadcast_to_room(&code("AAAAAAAA"), "x"), 0);
        assert!(rx.try_recv().is_err());
        assert!(hub.room_members(&code("AAAAAAAA")).is_empty());
    }

    #[test]
    fn join_ignores_unknown_connections() {
        let hub = Hub::new();
        hub.join(ConnId(42), &code("AAAAAAAA"));
        assert!(hub.room_members(&code("AAAAAAAA")).is_empty());
    }

    #[test]
    fn close_signals_writer_and_reader() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let closed = hub.attach(ConnId(1), tx);
        hub.close(ConnId(1));

        assert!(closed.is_cancelled());
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn detach_drops_room_entries() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.attach(ConnId(1), tx);
        hub.join(ConnId(1), &code("AAAAAAAA"));
        hub.detach(ConnId(1));

        assert_eq!(hub.connection_count(), 0);
        assert!(hub.room_members(&code("AAAAAAAA")).is_empty());
        assert_eq!(hub.broadcast_to_room(&code("AAAAAAAA"), "x"), 0);
    }
}
