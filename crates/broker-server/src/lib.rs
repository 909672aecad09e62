//! broker-server
//!
//! Capture broker: binds capture-client WebSocket connections to game
//! sessions (connect codes), forwards their observations to the
//! control-plane backend, and relays the backend's pending mute/deafen
//! tasks back to every client in the session's room.

pub mod config;
pub mod types;
pub mod server;
pub mod backend;
pub mod http_backend;
pub mod transport;
pub mod broadcast;
pub mod registry;
pub mod router;
pub mod telemetry;

// these are internal modules, not re-exported
mod client;
mod dispatch_task;

#[cfg(test)]
mod testutil;
