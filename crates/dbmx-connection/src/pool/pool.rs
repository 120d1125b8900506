//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use dbmx_core::{Connection, DbmxError, Driver, DriverRegistry, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use super::settings::PoolSettings;
use super::stats::PoolStats;
use crate::data_source::{Capability, DataSource, Unwrapped};

/// An idle connection with metadata
struct IdleConnection {
    connection: Arc<dyn Connection>,
    idle_since: Instant,
    /// Set when the connection came back with `test_on_return` enabled
    needs_validation: bool,
}

impl IdleConnection {
    fn new(connection: Arc<dyn Connection>, needs_validation: bool) -> Self {
        Self {
            connection,
            idle_since: Instant::now(),
            needs_validation,
        }
    }
}

#[derive(Default)]
struct PoolState {
    idle: VecDeque<IdleConnection>,
    active: usize,
    pending: usize,
}

impl PoolState {
    fn total(&self) -> usize {
        self.active + self.idle.len() + self.pending
    }
}

/// Outcome of trying to claim a connection slot
enum Claim {
    Idle(IdleConnection),
    Create,
    Exhausted,
}

struct PoolShared {
    settings: RwLock<PoolSettings>,
    drivers: Arc<DriverRegistry>,
    driver: Mutex<Option<Arc<dyn Driver>>>,
    state: Mutex<PoolState>,
    /// Signalled whenever a slot frees up
    released: Notify,
    /// Held while starting; the flag records a completed start
    started: tokio::sync::Mutex<bool>,
    closed: AtomicBool,
    waiting: AtomicUsize,
    created: AtomicU64,
    destroyed: AtomicU64,
}

impl PoolShared {
    fn claim(&self) -> Claim {
        let settings = self.settings.read();
        let mut state = self.state.lock();
        if let Some(idle) = state.idle.pop_front() {
            state.active += 1;
            Claim::Idle(idle)
        } else if !settings.at_capacity(state.total()) {
            state.pending += 1;
            Claim::Create
        } else {
            Claim::Exhausted
        }
    }

    /// Finish a `Claim::Create`; a successful creation becomes active
    fn finish_create(&self, success: bool) {
        {
            let mut state = self.state.lock();
            state.pending -= 1;
            if success {
                state.active += 1;
            }
        }
        if !success {
            self.released.notify_one();
        }
    }

    /// Open a connection and apply the session defaults to it
    async fn create_connection(&self) -> Result<Arc<dyn Connection>> {
        let driver = self
            .driver
            .lock()
            .clone()
            .ok_or_else(|| DbmxError::Connection("pool has not been started".into()))?;
        let settings = self.settings.read().clone();

        let connection = driver.connect(&settings.connect_spec()).await?;
        if let Err(e) = Self::prepare(&*connection, &settings).await {
            tracing::warn!(error = %e, "failed to initialize new connection");
            let _ = connection.close().await;
            return Err(e);
        }

        let created = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(driver = %driver.name(), created, "opened pooled connection");
        Ok(connection)
    }

    async fn prepare(connection: &dyn Connection, settings: &PoolSettings) -> Result<()> {
        for sql in &settings.connection_init_sqls {
            connection.execute(sql).await?;
        }
        connection
            .set_auto_commit(settings.default_auto_commit)
            .await?;
        if let Some(read_only) = settings.default_read_only {
            connection.set_read_only(read_only).await?;
        }
        if !settings.default_transaction_isolation.is_unknown() {
            connection
                .set_transaction_isolation(settings.default_transaction_isolation)
                .await?;
        }
        if let Some(catalog) = &settings.default_catalog {
            connection.set_catalog(catalog).await?;
        }
        Ok(())
    }

    /// Run the validation query, if any
    async fn validate(&self, connection: &dyn Connection) -> bool {
        if connection.is_closed() {
            return false;
        }
        let (query, timeout) = {
            let settings = self.settings.read();
            (settings.validation_query.clone(), settings.validation_timeout())
        };
        let Some(query) = query else {
            return true;
        };

        let outcome = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, connection.execute(&query))
                .await
                .unwrap_or_else(|_| Err(DbmxError::Timeout("validation query".into()))),
            None => connection.execute(&query).await,
        };
        if let Err(e) = &outcome {
            tracing::debug!(error = %e, "connection failed validation");
        }
        outcome.is_ok()
    }

    /// Drop a connection that was counted as active
    async fn discard_active(&self, connection: Arc<dyn Connection>) {
        self.state.lock().active -= 1;
        self.released.notify_one();
        self.destroy(connection).await;
    }

    async fn destroy(&self, connection: Arc<dyn Connection>) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = connection.close().await {
            tracing::debug!(error = %e, "error closing discarded connection");
        }
    }

    /// Take back a borrowed connection. Runs inside `Drop`, so discarded
    /// connections are closed on the current runtime when there is one.
    fn release(&self, connection: Arc<dyn Connection>) {
        let (max_idle, test_on_return) = {
            let settings = self.settings.read();
            (settings.max_idle, settings.test_on_return)
        };

        let discarded = {
            let mut state = self.state.lock();
            state.active -= 1;
            let idle_full = max_idle >= 0 && state.idle.len() >= max_idle as usize;
            if self.closed.load(Ordering::SeqCst) || connection.is_closed() || idle_full {
                Some(connection)
            } else {
                state
                    .idle
                    .push_back(IdleConnection::new(connection, test_on_return));
                None
            }
        };
        self.released.notify_one();

        if let Some(connection) = discarded {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if connection.is_closed() {
                return;
            }
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let _ = connection.close().await;
                    });
                }
                Err(_) => tracing::debug!("no runtime to close discarded connection on"),
            }
        }
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            active: state.active,
            idle: state.idle.len(),
            pending: state.pending,
            waiting: self.waiting.load(Ordering::SeqCst),
            created: self.created.load(Ordering::SeqCst),
            destroyed: self.destroyed.load(Ordering::SeqCst),
        }
    }
}

/// A connection pool handing out connections from a registered driver
///
/// The pool starts lazily: the driver is resolved and `initial_size`
/// connections are opened on the first borrow or on an explicit
/// [`BasicPool::start`]. Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct BasicPool {
    shared: Arc<PoolShared>,
}

impl BasicPool {
    /// Create a pool with the given settings, resolving drivers from `drivers`
    pub fn new(settings: PoolSettings, drivers: Arc<DriverRegistry>) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                settings: RwLock::new(settings),
                drivers,
                driver: Mutex::new(None),
                state: Mutex::new(PoolState::default()),
                released: Notify::new(),
                started: tokio::sync::Mutex::new(false),
                closed: AtomicBool::new(false),
                waiting: AtomicUsize::new(0),
                created: AtomicU64::new(0),
                destroyed: AtomicU64::new(0),
            }),
        }
    }

    /// Start the pool: resolve the driver and open `initial_size` connections.
    ///
    /// Subsequent calls are no-ops. When warm-up fails the connections
    /// opened so far are closed and the pool stays unstarted.
    pub async fn start(&self) -> Result<()> {
        let mut started = self.shared.started.lock().await;
        if *started {
            return Ok(());
        }
        if self.is_closed() {
            return Err(DbmxError::Closed);
        }

        let settings = self.shared.settings.read().clone();
        let driver = self.shared.drivers.resolve(
            settings.driver_class_name.as_deref(),
            settings.url.as_deref(),
        )?;
        *self.shared.driver.lock() = Some(driver);

        for _ in 0..settings.initial_size.max(0) {
            match self.shared.create_connection().await {
                Ok(connection) => {
                    let mut state = self.shared.state.lock();
                    state.idle.push_back(IdleConnection::new(connection, false));
                }
                Err(e) => {
                    self.close_idle().await;
                    return Err(e);
                }
            }
        }

        if let Some(interval) = settings.eviction_interval() {
            self.spawn_evictor(interval);
        }

        *started = true;
        tracing::info!(
            initial_size = settings.initial_size,
            max_active = settings.max_active,
            "connection pool started"
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.shared
            .started
            .try_lock()
            .map(|started| *started)
            .unwrap_or(false)
    }

    /// Get a connection from the pool
    ///
    /// This will:
    /// 1. Reuse an idle connection, validating it when `test_on_borrow` is set
    /// 2. Otherwise open a new connection while under `max_active`
    /// 3. Otherwise wait for a connection to be returned, up to `max_wait`
    pub async fn get(&self) -> Result<PooledConnection> {
        self.start().await?;

        let shared = &self.shared;
        let (max_wait, test_on_borrow) = {
            let settings = shared.settings.read();
            (settings.max_wait_duration(), settings.test_on_borrow)
        };
        let deadline = max_wait.map(|wait| tokio::time::Instant::now() + wait);

        loop {
            // Registered before claiming so a release, close or settings
            // change racing with the claim still wakes this borrower.
            let mut notified = pin!(shared.released.notified());
            notified.as_mut().enable();

            if self.is_closed() {
                return Err(DbmxError::Closed);
            }

            match shared.claim() {
                Claim::Idle(idle) => {
                    let check = test_on_borrow || idle.needs_validation;
                    if check && !shared.validate(&*idle.connection).await {
                        shared.discard_active(idle.connection).await;
                        continue;
                    }
                    return Ok(self.lend(idle.connection));
                }
                Claim::Create => {
                    let created = shared.create_connection().await;
                    shared.finish_create(created.is_ok());
                    return created.map(|connection| self.lend(connection));
                }
                Claim::Exhausted => {
                    shared.waiting.fetch_add(1, Ordering::SeqCst);
                    let timed_out = match deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, notified)
                            .await
                            .is_err(),
                        None => {
                            notified.await;
                            false
                        }
                    };
                    shared.waiting.fetch_sub(1, Ordering::SeqCst);

                    if timed_out {
                        return Err(DbmxError::Timeout(format!(
                            "Timed out waiting for connection (maxWait: {}ms)",
                            self.max_wait()
                        )));
                    }
                }
            }
        }
    }

    fn lend(&self, connection: Arc<dyn Connection>) -> PooledConnection {
        let allow_underlying = self
            .shared
            .settings
            .read()
            .access_to_underlying_connection_allowed;
        PooledConnection {
            connection: Some(connection),
            pool: self.shared.clone(),
            allow_underlying,
        }
    }

    /// Run one eviction pass, returning the number of connections evicted.
    ///
    /// Examines up to `num_tests_per_eviction_run` idle connections (a
    /// negative value examines `1/n` of them), evicting those idle longer
    /// than `min_evictable_idle_time_millis` and, with `test_while_idle`,
    /// those failing validation. The pool is then topped up to `min_idle`.
    pub async fn evict(&self) -> Result<usize> {
        let shared = &self.shared;
        let (tests, min_evictable, test_while_idle) = {
            let settings = shared.settings.read();
            (
                settings.num_tests_per_eviction_run,
                settings.min_evictable_idle_time(),
                settings.test_while_idle,
            )
        };

        let candidates: Vec<IdleConnection> = {
            let mut state = shared.state.lock();
            let idle = state.idle.len();
            let count = if tests >= 0 {
                tests as usize
            } else {
                idle.div_ceil(tests.unsigned_abs() as usize)
            };
            let count = count.min(idle);
            state.idle.drain(..count).collect()
        };

        let mut evicted = 0;
        let mut survivors = Vec::with_capacity(candidates.len());
        for idle in candidates {
            let expired = min_evictable.is_some_and(|limit| idle.idle_since.elapsed() > limit);
            let keep = !expired && (!test_while_idle || shared.validate(&*idle.connection).await);
            if keep {
                survivors.push(idle);
            } else {
                shared.destroy(idle.connection).await;
                evicted += 1;
            }
        }
        shared.state.lock().idle.extend(survivors);
        if evicted > 0 {
            shared.released.notify_one();
            tracing::debug!(evicted, "evicted idle connections");
        }

        self.ensure_min_idle().await?;
        Ok(evicted)
    }

    /// Open connections until `min_idle` idle connections exist or the pool is full
    async fn ensure_min_idle(&self) -> Result<()> {
        if !self.is_started() || self.is_closed() {
            return Ok(());
        }
        let shared = &self.shared;
        loop {
            {
                let settings = shared.settings.read();
                let mut state = shared.state.lock();
                let min_idle = settings.min_idle.max(0) as usize;
                if state.idle.len() + state.pending >= min_idle
                    || settings.at_capacity(state.total())
                {
                    return Ok(());
                }
                state.pending += 1;
            }

            let created = shared.create_connection().await;
            let mut state = shared.state.lock();
            state.pending -= 1;
            state.idle.push_back(IdleConnection::new(created?, false));
        }
    }

    fn spawn_evictor(&self, interval: std::time::Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no runtime available, idle eviction disabled");
            return;
        };
        let weak: Weak<PoolShared> = Arc::downgrade(&self.shared);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
                let pool = BasicPool { shared };
                if let Err(e) = pool.evict().await {
                    tracing::warn!(error = %e, "eviction run failed");
                }
            }
        });
    }

    /// Close all idle connections in the pool
    pub async fn close_idle(&self) {
        let connections: Vec<_> = self.shared.state.lock().idle.drain(..).collect();
        for idle in connections {
            self.shared.destroy(idle.connection).await;
        }
    }

    /// Change settings in place
    ///
    /// Limits apply to subsequent borrows; waiting borrowers are woken up
    /// so they observe a raised `max_active`.
    pub fn update_settings(&self, update: impl FnOnce(&mut PoolSettings)) {
        update(&mut *self.shared.settings.write());
        self.shared.released.notify_waiters();
    }

    /// Number of physical connections opened so far
    pub fn created_count(&self) -> u64 {
        self.shared.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for BasicPool {
    async fn get_connection(&self) -> Result<PooledConnection> {
        self.get().await
    }

    async fn start(&self) -> Result<()> {
        BasicPool::start(self).await
    }

    async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.close_idle().await;
        self.shared.released.notify_waiters();
        tracing::info!(stats = ?self.shared.stats(), "connection pool closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn settings(&self) -> PoolSettings {
        self.shared.settings.read().clone()
    }

    fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    fn num_active(&self) -> i32 {
        self.shared.state.lock().active as i32
    }

    fn num_idle(&self) -> i32 {
        self.shared.state.lock().idle.len() as i32
    }

    fn max_active(&self) -> i32 {
        self.shared.settings.read().max_active
    }

    fn set_max_active(&self, max_active: i32) {
        self.update_settings(|settings| settings.max_active = max_active);
    }

    fn max_idle(&self) -> i32 {
        self.shared.settings.read().max_idle
    }

    fn set_max_idle(&self, max_idle: i32) {
        self.update_settings(|settings| settings.max_idle = max_idle);
    }

    fn min_idle(&self) -> i32 {
        self.shared.settings.read().min_idle
    }

    fn set_min_idle(&self, min_idle: i32) {
        self.update_settings(|settings| settings.min_idle = min_idle);
    }

    fn max_wait(&self) -> i64 {
        self.shared.settings.read().max_wait
    }

    fn set_max_wait(&self, max_wait: i64) {
        self.update_settings(|settings| settings.max_wait = max_wait);
    }

    fn initial_size(&self) -> i32 {
        self.shared.settings.read().initial_size
    }

    fn url(&self) -> Option<String> {
        self.shared.settings.read().url.clone()
    }

    fn username(&self) -> Option<String> {
        self.shared.settings.read().username.clone()
    }

    fn is_wrapper_for(&self, capability: Capability) -> bool {
        matches!(capability, Capability::DataSource | Capability::BasicPool)
    }

    fn unwrap_as(&self, capability: Capability) -> Result<Unwrapped<'_>> {
        match capability {
            Capability::DataSource => Ok(Unwrapped::DataSource(self)),
            Capability::BasicPool => Ok(Unwrapped::BasicPool(self)),
            other => Err(DbmxError::NotSupported(format!(
                "BasicPool is not a wrapper for {}",
                other
            ))),
        }
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is automatically returned to the pool.
pub struct PooledConnection {
    connection: Option<Arc<dyn Connection>>,
    pool: Arc<PoolShared>,
    allow_underlying: bool,
}

impl PooledConnection {
    /// The physical connection, when `access_to_underlying_connection_allowed` is set
    pub fn underlying(&self) -> Option<&Arc<dyn Connection>> {
        if self.allow_underlying {
            self.connection.as_ref()
        } else {
            None
        }
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        match &self.connection {
            Some(connection) => connection.as_ref(),
            None => unreachable!("connection is only taken in drop"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(connection);
        }
    }
}
