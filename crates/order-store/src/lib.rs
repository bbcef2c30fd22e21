//! Order persistence for the lifecycle service.
//!
//! [`OrderStore`] is the seam the lifecycle controller talks to.
//! [`InMemoryOrderStore`] backs tests and single-process deployments without a
//! database; [`PostgresOrderStore`] keeps orders in an `orders` table.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
