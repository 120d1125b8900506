//! Connection pooling for database connections
//!
//! This module provides the pool the managed data sources wrap: sizing
//! limits, borrow timeouts, validation queries and idle eviction.
//!
//! # Example
//!
//! ```ignore
//! use dbmx_connection::{BasicPool, PoolSettings};
//!
//! let settings = PoolSettings {
//!     url: Some("postgres://localhost/app".into()),
//!     max_active: 20,
//!     ..PoolSettings::default()
//! };
//!
//! let pool = BasicPool::new(settings, drivers);
//! let conn = pool.get().await?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod pool;
mod settings;
mod stats;

#[cfg(test)]
mod tests;

pub use pool::{BasicPool, PooledConnection};
pub use settings::{Password, PoolSettings};
pub use stats::PoolStats;
