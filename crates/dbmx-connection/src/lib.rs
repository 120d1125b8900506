//! dbmx Connection - Managed connection pools
//!
//! This crate provides:
//! - `BasicPool` - A lazily started connection pool over a registered driver
//! - `DataSource` - The interface shared by pools and their wrappers
//! - `ManagedDataSource` - A pool registered with a management registry
//! - `DataSourceFactory` - Builds managed pools from flat property maps

mod data_source;
pub mod factory;
mod managed;
mod pool;

#[cfg(test)]
mod testing;

pub use data_source::{Capability, DataSource, Unwrapped};
pub use factory::{DATA_SOURCE_CLASS_NAME, DataSourceFactory, RefAddr, Reference};
pub use managed::{DEFAULT_DOMAIN, ManagedDataSource, TYPE_KEY, default_name};
pub use pool::{BasicPool, Password, PoolSettings, PoolStats, PooledConnection};
