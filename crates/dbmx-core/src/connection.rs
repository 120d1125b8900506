//! Connection trait used by pooled data sources

use crate::{Result, TransactionIsolation};
use async_trait::async_trait;

/// A physical database connection handed out by a driver
///
/// The session setters have no-op default implementations so that drivers
/// without a notion of catalogs or read-only sessions only implement what
/// they support.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement, returning the number of affected rows
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Set the auto-commit mode of the session
    async fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        tracing::trace!(auto_commit, "auto-commit not handled by driver");
        Ok(())
    }

    /// Mark the session read-only
    async fn set_read_only(&self, read_only: bool) -> Result<()> {
        tracing::trace!(read_only, "read-only not handled by driver");
        Ok(())
    }

    /// Set the transaction isolation level of the session
    async fn set_transaction_isolation(&self, isolation: TransactionIsolation) -> Result<()> {
        tracing::trace!(level = isolation.level(), "isolation not handled by driver");
        Ok(())
    }

    /// Switch the session to the given catalog
    async fn set_catalog(&self, catalog: &str) -> Result<()> {
        tracing::trace!(catalog, "catalog not handled by driver");
        Ok(())
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
