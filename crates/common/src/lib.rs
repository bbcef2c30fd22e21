//! Identifier types shared across the order lifecycle crates.

pub mod types;

pub use types::{OrderId, ParseIdError, UserId};
