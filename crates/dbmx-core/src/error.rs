//! Error types for dbmx

use dbmx_monitor::MonitorError;
use thiserror::Error;

/// Core error type for dbmx operations
#[derive(Error, Debug)]
pub enum DbmxError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Management error: {0}")]
    Management(#[from] MonitorError),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Pool is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for dbmx operations
pub type Result<T> = std::result::Result<T, DbmxError>;
