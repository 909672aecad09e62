//! broker-protocol
//!
//! Wire-level encoding/decoding for the capture transport.
//!
//! This crate is responsible for turning WebSocket text frames into
//! logical inbound events and turning outbound tasks back into text.
//!
//! - [`wire_types`] : event names and other wire constants
//! - [`frame`]      : the `{"event": .., "data": ..}` envelope
//! - [`inbound`]    : classification of client frames into [`InboundEvent`]

pub mod wire_types;
pub mod frame;
pub mod inbound;

pub use frame::{decode_frame, encode_frame, encode_modify, Frame, ProtocolError};
pub use inbound::{decode_inbound, InboundEvent};
