//! Tank Duel - turn-based two-player artillery over a message relay
//!
//! - `game`: per-peer match state machine, units, ballistics and physics
//! - `relay` / `ws` / `http`: the relay server and the wire protocol
//! - `peer`: headless peer runtime driving a match over a relay link

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod peer;
pub mod relay;
pub mod util;
pub mod ws;

/// Crate version, reported at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
