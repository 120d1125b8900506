//! Mock driver shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dbmx_core::{
    ConnectSpec, Connection, DbmxError, Driver, DriverRegistry, Result, TransactionIsolation,
};
use parking_lot::Mutex;

/// Connection recording the statements and session settings it received
pub struct MockConnection {
    pub id: usize,
    closed: AtomicBool,
    /// Validation fails once this is set
    pub broken: AtomicBool,
    pub executed: Mutex<Vec<String>>,
    pub isolation: Mutex<Option<TransactionIsolation>>,
    pub catalog: Mutex<Option<String>>,
    pub auto_commit: Mutex<Option<bool>>,
}

impl MockConnection {
    fn new(id: usize) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            broken: AtomicBool::new(false),
            executed: Mutex::new(Vec::new()),
            isolation: Mutex::new(None),
            catalog: Mutex::new(None),
            auto_commit: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DbmxError::Query("connection reset".into()));
        }
        self.executed.lock().push(sql.to_string());
        Ok(0)
    }

    async fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        *self.auto_commit.lock() = Some(auto_commit);
        Ok(())
    }

    async fn set_transaction_isolation(&self, isolation: TransactionIsolation) -> Result<()> {
        *self.isolation.lock() = Some(isolation);
        Ok(())
    }

    async fn set_catalog(&self, catalog: &str) -> Result<()> {
        *self.catalog.lock() = Some(catalog.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Driver handing out `MockConnection`s and keeping them for inspection
#[derive(Default)]
pub struct MockDriver {
    counter: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub connections: Mutex<Vec<Arc<MockConnection>>>,
    pub last_spec: Mutex<Option<ConnectSpec>>,
}

impl MockDriver {
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.connections.lock()[index].clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn accepts_url(&self, url: &str) -> bool {
        url.starts_with("mock:")
    }

    async fn connect(&self, spec: &ConnectSpec) -> Result<Arc<dyn Connection>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DbmxError::Connection("connection refused".into()));
        }
        *self.last_spec.lock() = Some(spec.clone());
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(MockConnection::new(id));
        self.connections.lock().push(connection.clone());
        Ok(connection as Arc<dyn Connection>)
    }
}

/// A registry holding a single `MockDriver`
pub fn mock_drivers() -> (Arc<MockDriver>, Arc<DriverRegistry>) {
    let driver = Arc::new(MockDriver::default());
    let mut registry = DriverRegistry::new();
    registry.register(driver.clone());
    (driver, Arc::new(registry))
}
