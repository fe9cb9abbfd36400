#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod events;
pub mod fanout;
pub mod notify;
pub mod processors;
pub mod registry;
pub mod sequencing;

#[cfg(test)]
pub(crate) mod testing;
