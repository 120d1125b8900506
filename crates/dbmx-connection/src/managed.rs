//! Pools exposed to a management registry
//!
//! A [`ManagedDataSource`] owns a [`BasicPool`](crate::BasicPool) and
//! registers itself under an [`ObjectName`](dbmx_monitor::ObjectName) when
//! constructed, so operators can read the pool's counters and adjust its
//! limits through any [`ManagementRegistry`](dbmx_monitor::ManagementRegistry).

mod data_source;


pub use data_source::{DEFAULT_DOMAIN, ManagedDataSource, TYPE_KEY, default_name};
