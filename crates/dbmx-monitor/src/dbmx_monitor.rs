//! dbmx Monitor - Management registry for running resources
//!
//! This crate provides a process-level directory of managed resources:
//! - `ObjectName` - Structured `domain:key=value` names
//! - `ManagedAttribute` - Static attribute tables with descriptions
//! - `ManagementRegistry` - Register, query, read and write attributes by name

pub mod attribute;
mod error;
pub mod name;
pub mod registry;

pub use attribute::*;
pub use error::MonitorError;
pub use name::ObjectName;
pub use registry::*;
