//! WebSocket layer: wire protocol, relay handler and peer client

pub mod client;
pub mod handler;
pub mod protocol;

pub use client::{ClientError, PeerLink};
pub use protocol::{MoveDirection, PeerMsg, WeaponKind};
