//! Room-scoped fan-out.
//!
//! Thin, stateless layer over [`Transport`]: encodes `modify` frames
//! and hands them to the transport's room primitives. Delivery covers
//! the members present at call time; a connection joining
//! concurrently may or may not see a given broadcast.

use std::sync::Arc;

use broker_core::{ConnectCode, ModifyTask};
use broker_protocol::{encode_modify, ProtocolError};
use tracing::debug;

use crate::transport::Transport;
use crate::types::ConnId;

#[derive(Clone)]
pub struct RoomBroadcaster {
    transport: Arc<dyn Transport>,
}

impl RoomBroadcaster {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        RoomBroadcaster { transport }
    }

    /// Deliver a pending task as a `modify` frame.
    pub fn broadcast_task(&self, room: &ConnectCode, task: &ModifyTask) -> Result<usize, ProtocolError> {
        let text = encode_modify(task)?;
        Ok(self.deliver(room, broker_protocol::wire_types::EVENT_MODIFY, &text))
    }

    pub fn join(&self, conn: ConnId, room: &ConnectCode) {
        self.transport.join(conn, room);
    }

    pub fn clear(&self, room: &ConnectCode) {
        self.transport.clear_room(room);
    }

    pub fn close(&self, conn: ConnId) {
        self.transport.close(conn);
    }

    fn deliver(&self, room: &ConnectCode, event: &str, text: &str) -> usize {
        let delivered = self.transport.broadcast_to_room(room, text);
        if delivered == 0 {
            debug!(%room, event, "broadcast to empty room");
        }
        delivered
    }
}
