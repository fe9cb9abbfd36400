//! Shared wire types for the Follower Maze server, plus optional async
//! clients (behind the `client` feature) for the event source and user
//! client roles.

#![deny(clippy::unwrap_used)]
#![forbid(unsafe_code)]

pub mod wire;

#[cfg(feature = "client")]
pub mod client;

pub use wire::{DEFAULT_CLIENT_PORT, DEFAULT_EVENT_PORT, LineTerminator, strip_terminator};
