//! PostgreSQL adapters.
//!
//! Production storage for the metering ports. Every mutation is either a
//! single atomic SQL statement or a single transaction; the read-then-
//! write pattern the ports forbid does not appear here.

mod metering_store;
mod subscription_reader;

pub use metering_store::PostgresMeteringStore;
pub use subscription_reader::PostgresSubscriptionReader;
