//! Headless peer: console input, game loop and relay link

pub mod console;
pub mod runtime;

pub use console::{parse_command, SharedInput};
pub use runtime::{run_peer, PeerDriver};
