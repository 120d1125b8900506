//! Pool settings

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use dbmx_core::{ConnectSpec, TransactionIsolation};
use serde::{Deserialize, Serialize};

/// A password that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

/// Configuration of a [`BasicPool`](super::BasicPool)
///
/// Limits follow the usual pool conventions: a negative `max_active`,
/// `max_idle` or `max_open_prepared_statements` means no limit, and a
/// non-positive `max_wait` makes borrowers wait indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolSettings {
    /// Auto-commit state of new connections
    pub default_auto_commit: bool,
    /// Read-only state of new connections; `None` keeps the driver default
    pub default_read_only: Option<bool>,
    /// Isolation of new connections; `Unknown` keeps the driver default
    pub default_transaction_isolation: TransactionIsolation,
    pub default_catalog: Option<String>,
    /// Name of the driver in the driver registry
    pub driver_class_name: Option<String>,
    /// Maximum number of connections, borrowed or idle
    pub max_active: i32,
    /// Maximum number of idle connections kept in the pool
    pub max_idle: i32,
    /// Idle connections the evictor tops the pool up to
    pub min_idle: i32,
    /// Connections created when the pool starts
    pub initial_size: i32,
    /// Milliseconds a borrower waits for a free connection
    pub max_wait: i64,
    pub test_on_borrow: bool,
    pub test_on_return: bool,
    /// Milliseconds between background eviction runs; non-positive disables the evictor
    pub time_between_eviction_runs_millis: i64,
    /// Idle connections examined per eviction run; negative means `1/n` of the idle set
    pub num_tests_per_eviction_run: i32,
    /// Milliseconds a connection may sit idle before it becomes evictable
    pub min_evictable_idle_time_millis: i64,
    pub test_while_idle: bool,
    pub username: Option<String>,
    pub password: Option<Password>,
    pub url: Option<String>,
    /// Query used to validate connections
    pub validation_query: Option<String>,
    /// Seconds before a validation query is abandoned; non-positive means no timeout
    pub validation_query_timeout: i32,
    /// Statements executed on every new connection
    #[serde(rename = "initConnectionSqls")]
    pub connection_init_sqls: Vec<String>,
    pub access_to_underlying_connection_allowed: bool,
    pub remove_abandoned: bool,
    /// Seconds before a borrowed connection counts as abandoned
    pub remove_abandoned_timeout: i32,
    pub log_abandoned: bool,
    pub pool_prepared_statements: bool,
    pub max_open_prepared_statements: i32,
    /// Extra properties handed to the driver
    pub connection_properties: BTreeMap<String, String>,
}

impl PoolSettings {
    /// Borrow wait limit, `None` when borrowers wait indefinitely
    pub fn max_wait_duration(&self) -> Option<Duration> {
        (self.max_wait > 0).then(|| Duration::from_millis(self.max_wait as u64))
    }

    /// Validation query timeout, `None` when unbounded
    pub fn validation_timeout(&self) -> Option<Duration> {
        (self.validation_query_timeout > 0)
            .then(|| Duration::from_secs(self.validation_query_timeout as u64))
    }

    /// Interval of the background evictor, `None` when disabled
    pub fn eviction_interval(&self) -> Option<Duration> {
        (self.time_between_eviction_runs_millis > 0)
            .then(|| Duration::from_millis(self.time_between_eviction_runs_millis as u64))
    }

    /// Idle time after which a connection may be evicted, `None` when never
    pub fn min_evictable_idle_time(&self) -> Option<Duration> {
        (self.min_evictable_idle_time_millis > 0)
            .then(|| Duration::from_millis(self.min_evictable_idle_time_millis as u64))
    }

    /// Whether `count` connections reach the `max_active` limit
    pub fn at_capacity(&self, count: usize) -> bool {
        self.max_active >= 0 && count >= self.max_active as usize
    }

    /// Driver-facing part of the settings
    pub fn connect_spec(&self) -> ConnectSpec {
        ConnectSpec {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.as_ref().map(|p| p.expose().to_string()),
            properties: self.connection_properties.clone(),
        }
    }
}

impl Default for PoolSettings {
    /// Defaults:
    /// - max_active: 8, max_idle: 8, min_idle: 0, initial_size: 0
    /// - max_wait: -1 (wait indefinitely)
    /// - test_on_borrow: true, evictor disabled, 3 tests per run
    /// - connections evictable after 30 minutes idle
    /// - abandoned timeout: 300 seconds
    fn default() -> Self {
        Self {
            default_auto_commit: true,
            default_read_only: None,
            default_transaction_isolation: TransactionIsolation::Unknown,
            default_catalog: None,
            driver_class_name: None,
            max_active: 8,
            max_idle: 8,
            min_idle: 0,
            initial_size: 0,
            max_wait: -1,
            test_on_borrow: true,
            test_on_return: false,
            time_between_eviction_runs_millis: -1,
            num_tests_per_eviction_run: 3,
            min_evictable_idle_time_millis: 30 * 60 * 1000,
            test_while_idle: false,
            username: None,
            password: None,
            url: None,
            validation_query: None,
            validation_query_timeout: -1,
            connection_init_sqls: Vec::new(),
            access_to_underlying_connection_allowed: false,
            remove_abandoned: false,
            remove_abandoned_timeout: 300,
            log_abandoned: false,
            pool_prepared_statements: false,
            max_open_prepared_statements: -1,
            connection_properties: BTreeMap::new(),
        }
    }
}
