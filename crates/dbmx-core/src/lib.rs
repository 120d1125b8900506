//! dbmx Core - Core abstractions shared by the dbmx crates
//!
//! This crate defines:
//!
//! - `Connection` - Trait for physical database connections
//! - `Driver` / `DriverRegistry` - How pools open connections
//! - `TransactionIsolation` - Isolation levels applied to new connections
//! - `DbmxError` / `Result` - The common error type

mod connection;
mod driver;
mod error;
pub mod transaction;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use transaction::TransactionIsolation;
