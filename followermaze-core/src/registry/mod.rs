//! User-facing state: the follower graph and the connected clients.
//!
//! - [`FollowerGraph`]: single owner, mutated only while an event is being
//!   processed.
//! - [`ClientRegistry`]: shared between connection handling, delivery
//!   workers and fan-out.

mod clients;
mod follower_graph;

pub use clients::{ClientConnection, ClientRegistry, ConnectionId};
pub use follower_graph::FollowerGraph;
