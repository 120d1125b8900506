//! Database driver trait and registry

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Connection, DbmxError, Result};

/// Everything a driver needs to open a physical connection
#[derive(Clone, Default)]
pub struct ConnectSpec {
    /// Connection URL (e.g. "postgres://localhost/app")
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Extra driver-specific connection properties
    pub properties: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectSpec")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("properties", &self.properties)
            .finish()
    }
}

/// A database driver able to open connections
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver identifier, matched against the configured driver class name
    fn name(&self) -> &str;

    /// Whether this driver understands the given URL
    fn accepts_url(&self, url: &str) -> bool;

    /// Open a new connection
    async fn connect(&self, spec: &ConnectSpec) -> Result<Arc<dyn Connection>>;
}

/// Registry of available database drivers
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        let driver = self.drivers.get(name).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Find the first driver accepting a URL
    pub fn for_url(&self, url: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .values()
            .find(|driver| driver.accepts_url(url))
            .cloned()
    }

    /// Resolve the driver for a pool: by explicit name when given,
    /// otherwise by URL
    pub fn resolve(&self, name: Option<&str>, url: Option<&str>) -> Result<Arc<dyn Driver>> {
        match (name, url) {
            (Some(name), _) => self
                .get(name)
                .ok_or_else(|| DbmxError::Driver(format!("Unknown driver: {}", name))),
            (None, Some(url)) => self
                .for_url(url)
                .ok_or_else(|| DbmxError::Driver(format!("No suitable driver for url: {}", url))),
            (None, None) => Err(DbmxError::Configuration(
                "neither driverClassName nor url is set".into(),
            )),
        }
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}
