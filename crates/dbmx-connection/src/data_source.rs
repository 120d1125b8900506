//! The data source interface shared by pools and their managed wrappers

use std::fmt;

use async_trait::async_trait;
use dbmx_core::Result;
use dbmx_monitor::ManagedResource;

use crate::managed::ManagedDataSource;
use crate::pool::{BasicPool, PoolSettings, PoolStats, PooledConnection};

/// Capabilities a caller can ask a data source for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Any [`DataSource`]
    DataSource,
    /// The concrete [`BasicPool`]
    BasicPool,
    /// The [`ManagedDataSource`] wrapper
    ManagedDataSource,
    /// The resource view held by a management registry
    ManagedResource,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::DataSource => write!(f, "DataSource"),
            Capability::BasicPool => write!(f, "BasicPool"),
            Capability::ManagedDataSource => write!(f, "ManagedDataSource"),
            Capability::ManagedResource => write!(f, "ManagedResource"),
        }
    }
}

/// A data source viewed through one of its capabilities
pub enum Unwrapped<'a> {
    DataSource(&'a dyn DataSource),
    BasicPool(&'a BasicPool),
    ManagedDataSource(&'a ManagedDataSource),
    ManagedResource(&'a dyn ManagedResource),
}

impl Unwrapped<'_> {
    pub fn capability(&self) -> Capability {
        match self {
            Unwrapped::DataSource(_) => Capability::DataSource,
            Unwrapped::BasicPool(_) => Capability::BasicPool,
            Unwrapped::ManagedDataSource(_) => Capability::ManagedDataSource,
            Unwrapped::ManagedResource(_) => Capability::ManagedResource,
        }
    }
}

/// A pooled source of database connections
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Borrow a connection, starting the pool on first use
    async fn get_connection(&self) -> Result<PooledConnection>;

    /// Open the initial connections now instead of on first borrow
    async fn start(&self) -> Result<()>;

    /// Close idle connections and refuse further borrows
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Snapshot of the current settings
    fn settings(&self) -> PoolSettings;

    fn stats(&self) -> PoolStats;

    /// Number of borrowed connections
    fn num_active(&self) -> i32;

    /// Number of idle connections
    fn num_idle(&self) -> i32;

    fn max_active(&self) -> i32;

    fn set_max_active(&self, max_active: i32);

    fn max_idle(&self) -> i32;

    fn set_max_idle(&self, max_idle: i32);

    fn min_idle(&self) -> i32;

    fn set_min_idle(&self, min_idle: i32);

    /// Borrow wait limit in milliseconds
    fn max_wait(&self) -> i64;

    fn set_max_wait(&self, max_wait: i64);

    fn initial_size(&self) -> i32;

    fn url(&self) -> Option<String>;

    fn username(&self) -> Option<String>;

    /// Whether [`DataSource::unwrap_as`] succeeds for `capability`
    fn is_wrapper_for(&self, capability: Capability) -> bool;

    /// View this data source through `capability`
    fn unwrap_as(&self, capability: Capability) -> Result<Unwrapped<'_>>;
}
