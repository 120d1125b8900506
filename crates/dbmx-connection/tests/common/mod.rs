//! Helpers shared by the integration tests

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dbmx_connection::DataSourceFactory;
use dbmx_core::{ConnectSpec, Connection, Driver, DriverRegistry, Result};
use dbmx_monitor::InMemoryRegistry;
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Connection that accepts every statement
pub struct StubConnection {
    closed: AtomicBool,
}

#[async_trait]
impl Connection for StubConnection {
    fn driver_name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, _sql: &str) -> Result<u64> {
        Ok(0)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Driver for `stub:` urls counting the connections it opens
#[derive(Default)]
pub struct StubDriver {
    opened: AtomicUsize,
}

impl StubDriver {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for StubDriver {
    fn name(&self) -> &str {
        "stub"
    }

    fn accepts_url(&self, url: &str) -> bool {
        url.starts_with("stub:")
    }

    async fn connect(&self, _spec: &ConnectSpec) -> Result<Arc<dyn Connection>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubConnection {
            closed: AtomicBool::new(false),
        }))
    }
}

/// A factory wired to a fresh registry and a stub driver
pub struct Harness {
    pub driver: Arc<StubDriver>,
    pub registry: Arc<InMemoryRegistry>,
    pub factory: DataSourceFactory,
}

impl Harness {
    pub fn new() -> Self {
        let driver = Arc::new(StubDriver::default());
        let mut drivers = DriverRegistry::new();
        drivers.register(driver.clone());
        let registry = InMemoryRegistry::shared();
        let factory = DataSourceFactory::new(registry.clone(), Arc::new(drivers));
        Self {
            driver,
            registry,
            factory,
        }
    }
}

pub fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Collects formatted log output so tests can assert on diagnostics
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
