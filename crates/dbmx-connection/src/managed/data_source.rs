use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dbmx_core::Result;
use dbmx_monitor::{
    Manageable, ManagedAttribute, ManagedResource, ManagementRegistry, MonitorError, ObjectName,
    ValueType,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::data_source::{Capability, DataSource, Unwrapped};
use crate::pool::{BasicPool, PoolSettings, PoolStats, PooledConnection};

/// Domain of generated registration names
pub const DEFAULT_DOMAIN: &str = "dbmx.pool";

/// Property key of generated registration names
pub const TYPE_KEY: &str = "ManagedDataSource";

/// A fresh registration name, unique per call
pub fn default_name() -> String {
    format!("{DEFAULT_DOMAIN}:{TYPE_KEY}={TYPE_KEY}-{}", Uuid::new_v4())
}

/// A [`BasicPool`] registered with a management registry
///
/// The six managed operations (`num_active`, `num_idle` and the
/// `max_active`, `max_idle`, `min_idle`, `max_wait` accessors) are
/// serialized on a per-instance monitor lock. Everything else is forwarded
/// to the pool as is.
///
/// The registry keeps the wrapper alive until [`DataSource::close`]
/// unregisters it.
pub struct ManagedDataSource {
    name: ObjectName,
    pool: BasicPool,
    registry: Arc<dyn ManagementRegistry>,
    monitor: Mutex<()>,
}

impl ManagedDataSource {
    /// Wrap `pool` and register it under a generated name
    pub fn new(pool: BasicPool, registry: Arc<dyn ManagementRegistry>) -> Result<Arc<Self>> {
        Self::with_name(&default_name(), pool, registry)
    }

    /// Wrap `pool` and register it under `name`
    ///
    /// Fails with [`DbmxError::Management`](dbmx_core::DbmxError::Management)
    /// when `name` is malformed or already registered.
    pub fn with_name(
        name: &str,
        pool: BasicPool,
        registry: Arc<dyn ManagementRegistry>,
    ) -> Result<Arc<Self>> {
        let name = ObjectName::parse(name)?;
        let managed = Arc::new(Self {
            name,
            pool,
            registry,
            monitor: Mutex::new(()),
        });
        managed.register()?;
        Ok(managed)
    }

    fn register(self: &Arc<Self>) -> Result<()> {
        let _guard = self.monitor.lock();
        let resource: Arc<dyn ManagedResource> = self.clone();
        self.registry.register(self.name.clone(), resource)?;
        tracing::info!(name = %self.name, "registered managed data source");
        Ok(())
    }

    /// Name this data source is registered under
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// The wrapped pool
    pub fn pool(&self) -> &BasicPool {
        &self.pool
    }

    fn unregister(&self) {
        let _guard = self.monitor.lock();
        match self.registry.unregister(&self.name) {
            Ok(()) => tracing::info!(name = %self.name, "unregistered managed data source"),
            Err(MonitorError::NotRegistered(_)) => {}
            Err(e) => tracing::warn!(name = %self.name, error = %e, "failed to unregister"),
        }
    }
}

impl fmt::Debug for ManagedDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedDataSource")
            .field("name", &self.name.as_str())
            .field("stats", &self.pool.stats())
            .finish()
    }
}

#[async_trait]
impl DataSource for ManagedDataSource {
    async fn get_connection(&self) -> Result<PooledConnection> {
        self.pool.get_connection().await
    }

    async fn start(&self) -> Result<()> {
        self.pool.start().await
    }

    /// Unregister, then close the pool
    async fn close(&self) -> Result<()> {
        self.unregister();
        DataSource::close(&self.pool).await
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    fn settings(&self) -> PoolSettings {
        self.pool.settings()
    }

    fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    fn num_active(&self) -> i32 {
        let _guard = self.monitor.lock();
        self.pool.num_active()
    }

    fn num_idle(&self) -> i32 {
        let _guard = self.monitor.lock();
        self.pool.num_idle()
    }

    fn max_active(&self) -> i32 {
        let _guard = self.monitor.lock();
        self.pool.max_active()
    }

    fn set_max_active(&self, max_active: i32) {
        let _guard = self.monitor.lock();
        self.pool.set_max_active(max_active);
    }

    fn max_idle(&self) -> i32 {
        let _guard = self.monitor.lock();
        self.pool.max_idle()
    }

    fn set_max_idle(&self, max_idle: i32) {
        let _guard = self.monitor.lock();
        self.pool.set_max_idle(max_idle);
    }

    fn min_idle(&self) -> i32 {
        let _guard = self.monitor.lock();
        self.pool.min_idle()
    }

    fn set_min_idle(&self, min_idle: i32) {
        let _guard = self.monitor.lock();
        self.pool.set_min_idle(min_idle);
    }

    fn max_wait(&self) -> i64 {
        let _guard = self.monitor.lock();
        self.pool.max_wait()
    }

    fn set_max_wait(&self, max_wait: i64) {
        let _guard = self.monitor.lock();
        self.pool.set_max_wait(max_wait);
    }

    fn initial_size(&self) -> i32 {
        self.pool.initial_size()
    }

    fn url(&self) -> Option<String> {
        self.pool.url()
    }

    fn username(&self) -> Option<String> {
        self.pool.username()
    }

    fn is_wrapper_for(&self, capability: Capability) -> bool {
        match capability {
            Capability::DataSource | Capability::ManagedDataSource | Capability::ManagedResource => {
                true
            }
            other => self.pool.is_wrapper_for(other),
        }
    }

    fn unwrap_as(&self, capability: Capability) -> Result<Unwrapped<'_>> {
        match capability {
            Capability::DataSource => Ok(Unwrapped::DataSource(self)),
            Capability::ManagedDataSource => Ok(Unwrapped::ManagedDataSource(self)),
            Capability::ManagedResource => Ok(Unwrapped::ManagedResource(self)),
            other => self.pool.unwrap_as(other),
        }
    }
}

type Attr = ManagedAttribute<ManagedDataSource>;

static ATTRIBUTES: [Attr; 8] = [
    Attr::read_only(
        "NumActive",
        ValueType::Int,
        "The current number of active connections that have been allocated from this data source.",
        |ds| ds.num_active().into(),
    ),
    Attr::read_only(
        "NumIdle",
        ValueType::Int,
        "The current number of idle connections that are waiting to be allocated from this data source.",
        |ds| ds.num_idle().into(),
    ),
    Attr::read_write(
        "MaxActive",
        ValueType::Int,
        "The maximum number of active connections that can be allocated at the same time.",
        |ds| ds.max_active().into(),
        |ds, value| {
            ds.set_max_active(value.to_int("MaxActive")?);
            Ok(())
        },
    ),
    Attr::read_write(
        "MaxIdle",
        ValueType::Int,
        "The maximum number of connections that can remain idle in the pool.",
        |ds| ds.max_idle().into(),
        |ds, value| {
            ds.set_max_idle(value.to_int("MaxIdle")?);
            Ok(())
        },
    ),
    Attr::read_write(
        "MinIdle",
        ValueType::Int,
        "The minimum number of idle connections in the pool.",
        |ds| ds.min_idle().into(),
        |ds, value| {
            ds.set_min_idle(value.to_int("MinIdle")?);
            Ok(())
        },
    ),
    Attr::read_write(
        "MaxWait",
        ValueType::Long,
        "The maximum number of milliseconds that the pool will wait for a connection to be returned before throwing an exception.",
        |ds| ds.max_wait().into(),
        |ds, value| {
            ds.set_max_wait(value.to_long("MaxWait")?);
            Ok(())
        },
    ),
    Attr::read_only(
        "Url",
        ValueType::Text,
        "The connection URL passed to the driver.",
        |ds| ds.url().unwrap_or_default().into(),
    ),
    Attr::read_only(
        "Username",
        ValueType::Text,
        "The connection user name passed to the driver.",
        |ds| ds.username().unwrap_or_default().into(),
    ),
];

impl Manageable for ManagedDataSource {
    fn attribute_table() -> &'static [ManagedAttribute<Self>] {
        &ATTRIBUTES
    }
}
