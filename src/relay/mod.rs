//! Message relay between peers

pub mod hub;

pub use hub::{ConnId, RelayHub, RelayMode};
