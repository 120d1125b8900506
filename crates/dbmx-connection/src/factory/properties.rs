//! Property keys and value coercion
//!
//! Configuration arrives as a flat map of string keys to string values.
//! Booleans are lenient: only `"true"` (any case) is true. Integers are
//! strict and fail with a [`DbmxError::Configuration`] naming the key.

use std::collections::{BTreeMap, HashMap};

use dbmx_core::{DbmxError, Result, TransactionIsolation};

use crate::pool::{Password, PoolSettings};

pub const PROP_DEFAULT_AUTO_COMMIT: &str = "defaultAutoCommit";
pub const PROP_DEFAULT_READ_ONLY: &str = "defaultReadOnly";
pub const PROP_DEFAULT_TRANSACTION_ISOLATION: &str = "defaultTransactionIsolation";
pub const PROP_DEFAULT_CATALOG: &str = "defaultCatalog";
pub const PROP_DRIVER_CLASS_NAME: &str = "driverClassName";
pub const PROP_MAX_ACTIVE: &str = "maxActive";
pub const PROP_MAX_IDLE: &str = "maxIdle";
pub const PROP_MIN_IDLE: &str = "minIdle";
pub const PROP_INITIAL_SIZE: &str = "initialSize";
pub const PROP_MAX_WAIT: &str = "maxWait";
pub const PROP_TEST_ON_BORROW: &str = "testOnBorrow";
pub const PROP_TEST_ON_RETURN: &str = "testOnReturn";
pub const PROP_TIME_BETWEEN_EVICTION_RUNS_MILLIS: &str = "timeBetweenEvictionRunsMillis";
pub const PROP_NUM_TESTS_PER_EVICTION_RUN: &str = "numTestsPerEvictionRun";
pub const PROP_MIN_EVICTABLE_IDLE_TIME_MILLIS: &str = "minEvictableIdleTimeMillis";
pub const PROP_TEST_WHILE_IDLE: &str = "testWhileIdle";
pub const PROP_PASSWORD: &str = "password";
pub const PROP_URL: &str = "url";
pub const PROP_USERNAME: &str = "username";
pub const PROP_VALIDATION_QUERY: &str = "validationQuery";
pub const PROP_VALIDATION_QUERY_TIMEOUT: &str = "validationQueryTimeout";
pub const PROP_INIT_CONNECTION_SQLS: &str = "initConnectionSqls";
pub const PROP_ACCESS_TO_UNDERLYING_CONNECTION_ALLOWED: &str =
    "accessToUnderlyingConnectionAllowed";
pub const PROP_REMOVE_ABANDONED: &str = "removeAbandoned";
pub const PROP_REMOVE_ABANDONED_TIMEOUT: &str = "removeAbandonedTimeout";
pub const PROP_LOG_ABANDONED: &str = "logAbandoned";
pub const PROP_POOL_PREPARED_STATEMENTS: &str = "poolPreparedStatements";
pub const PROP_MAX_OPEN_PREPARED_STATEMENTS: &str = "maxOpenPreparedStatements";
pub const PROP_CONNECTION_PROPERTIES: &str = "connectionProperties";
/// Registration name of the managed data source
pub const PROP_MBEAN_NAME: &str = "mbeanName";

/// Every key the factory recognizes
pub const ALL_PROPERTIES: [&str; 30] = [
    PROP_DEFAULT_AUTO_COMMIT,
    PROP_DEFAULT_READ_ONLY,
    PROP_DEFAULT_TRANSACTION_ISOLATION,
    PROP_DEFAULT_CATALOG,
    PROP_DRIVER_CLASS_NAME,
    PROP_MAX_ACTIVE,
    PROP_MAX_IDLE,
    PROP_MIN_IDLE,
    PROP_INITIAL_SIZE,
    PROP_MAX_WAIT,
    PROP_TEST_ON_BORROW,
    PROP_TEST_ON_RETURN,
    PROP_TIME_BETWEEN_EVICTION_RUNS_MILLIS,
    PROP_NUM_TESTS_PER_EVICTION_RUN,
    PROP_MIN_EVICTABLE_IDLE_TIME_MILLIS,
    PROP_TEST_WHILE_IDLE,
    PROP_PASSWORD,
    PROP_URL,
    PROP_USERNAME,
    PROP_VALIDATION_QUERY,
    PROP_VALIDATION_QUERY_TIMEOUT,
    PROP_INIT_CONNECTION_SQLS,
    PROP_ACCESS_TO_UNDERLYING_CONNECTION_ALLOWED,
    PROP_REMOVE_ABANDONED,
    PROP_REMOVE_ABANDONED_TIMEOUT,
    PROP_LOG_ABANDONED,
    PROP_POOL_PREPARED_STATEMENTS,
    PROP_MAX_OPEN_PREPARED_STATEMENTS,
    PROP_CONNECTION_PROPERTIES,
    PROP_MBEAN_NAME,
];

/// `true` only for a case-insensitive `"true"`
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

pub fn parse_int(key: &str, value: &str) -> Result<i32> {
    value.parse().map_err(|e| invalid_number(key, value, e))
}

pub fn parse_long(key: &str, value: &str) -> Result<i64> {
    value.parse().map_err(|e| invalid_number(key, value, e))
}

fn invalid_number(key: &str, value: &str, error: std::num::ParseIntError) -> DbmxError {
    DbmxError::Configuration(format!(
        "invalid value for {}: {:?} ({})",
        key, value, error
    ))
}

/// Split `initConnectionSqls` on `;`, skipping empty statements
pub fn split_init_sqls(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|sql| !sql.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `connectionProperties`: `;`-separated `key=value`, `key:value` or
/// `key value` entries. A bare key maps to an empty value and entries
/// starting with `#` or `!` are comments.
pub fn parse_connection_properties(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && !entry.starts_with(['#', '!']))
        .map(split_property_entry)
        .collect()
}

/// The key ends at the first `=`, `:` or whitespace. Whitespace after it,
/// then at most one `=` or `:`, then more whitespace are skipped.
fn split_property_entry(entry: &str) -> (String, String) {
    let Some(at) = entry.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) else {
        return (entry.to_string(), String::new());
    };
    let key = &entry[..at];
    let rest = entry[at..].trim_start();
    let rest = match entry[at..].chars().next() {
        Some('=' | ':') => &entry[at + 1..],
        _ => rest.strip_prefix(['=', ':']).unwrap_or(rest),
    };
    (key.to_string(), rest.trim().to_string())
}

/// Build pool settings from a property map
///
/// Absent keys keep their defaults and unrecognized keys are ignored.
pub fn settings_from_properties(properties: &HashMap<String, String>) -> Result<PoolSettings> {
    let mut settings = PoolSettings::default();
    let get = |key: &str| properties.get(key).map(String::as_str);

    if let Some(value) = get(PROP_DEFAULT_AUTO_COMMIT) {
        settings.default_auto_commit = parse_bool(value);
    }
    if let Some(value) = get(PROP_DEFAULT_READ_ONLY) {
        settings.default_read_only = Some(parse_bool(value));
    }
    if let Some(value) = get(PROP_DEFAULT_TRANSACTION_ISOLATION) {
        settings.default_transaction_isolation = TransactionIsolation::parse_lenient(value);
    }
    if let Some(value) = get(PROP_DEFAULT_CATALOG) {
        settings.default_catalog = Some(value.to_string());
    }
    if let Some(value) = get(PROP_DRIVER_CLASS_NAME) {
        settings.driver_class_name = Some(value.to_string());
    }
    if let Some(value) = get(PROP_MAX_ACTIVE) {
        settings.max_active = parse_int(PROP_MAX_ACTIVE, value)?;
    }
    if let Some(value) = get(PROP_MAX_IDLE) {
        settings.max_idle = parse_int(PROP_MAX_IDLE, value)?;
    }
    if let Some(value) = get(PROP_MIN_IDLE) {
        settings.min_idle = parse_int(PROP_MIN_IDLE, value)?;
    }
    if let Some(value) = get(PROP_INITIAL_SIZE) {
        settings.initial_size = parse_int(PROP_INITIAL_SIZE, value)?;
    }
    if let Some(value) = get(PROP_MAX_WAIT) {
        settings.max_wait = parse_long(PROP_MAX_WAIT, value)?;
    }
    if let Some(value) = get(PROP_TEST_ON_BORROW) {
        settings.test_on_borrow = parse_bool(value);
    }
    if let Some(value) = get(PROP_TEST_ON_RETURN) {
        settings.test_on_return = parse_bool(value);
    }
    if let Some(value) = get(PROP_TIME_BETWEEN_EVICTION_RUNS_MILLIS) {
        settings.time_between_eviction_runs_millis =
            parse_long(PROP_TIME_BETWEEN_EVICTION_RUNS_MILLIS, value)?;
    }
    if let Some(value) = get(PROP_NUM_TESTS_PER_EVICTION_RUN) {
        settings.num_tests_per_eviction_run = parse_int(PROP_NUM_TESTS_PER_EVICTION_RUN, value)?;
    }
    if let Some(value) = get(PROP_MIN_EVICTABLE_IDLE_TIME_MILLIS) {
        settings.min_evictable_idle_time_millis =
            parse_long(PROP_MIN_EVICTABLE_IDLE_TIME_MILLIS, value)?;
    }
    if let Some(value) = get(PROP_TEST_WHILE_IDLE) {
        settings.test_while_idle = parse_bool(value);
    }
    if let Some(value) = get(PROP_PASSWORD) {
        settings.password = Some(Password::new(value));
    }
    if let Some(value) = get(PROP_URL) {
        settings.url = Some(value.to_string());
    }
    if let Some(value) = get(PROP_USERNAME) {
        settings.username = Some(value.to_string());
    }
    if let Some(value) = get(PROP_VALIDATION_QUERY) {
        settings.validation_query = Some(value.to_string());
    }
    if let Some(value) = get(PROP_VALIDATION_QUERY_TIMEOUT) {
        settings.validation_query_timeout = parse_int(PROP_VALIDATION_QUERY_TIMEOUT, value)?;
    }
    if let Some(value) = get(PROP_INIT_CONNECTION_SQLS) {
        settings.connection_init_sqls = split_init_sqls(value);
    }
    if let Some(value) = get(PROP_ACCESS_TO_UNDERLYING_CONNECTION_ALLOWED) {
        settings.access_to_underlying_connection_allowed = parse_bool(value);
    }
    if let Some(value) = get(PROP_REMOVE_ABANDONED) {
        settings.remove_abandoned = parse_bool(value);
    }
    if let Some(value) = get(PROP_REMOVE_ABANDONED_TIMEOUT) {
        settings.remove_abandoned_timeout = parse_int(PROP_REMOVE_ABANDONED_TIMEOUT, value)?;
    }
    if let Some(value) = get(PROP_LOG_ABANDONED) {
        settings.log_abandoned = parse_bool(value);
    }
    if let Some(value) = get(PROP_POOL_PREPARED_STATEMENTS) {
        settings.pool_prepared_statements = parse_bool(value);
    }
    if let Some(value) = get(PROP_MAX_OPEN_PREPARED_STATEMENTS) {
        settings.max_open_prepared_statements =
            parse_int(PROP_MAX_OPEN_PREPARED_STATEMENTS, value)?;
    }
    if let Some(value) = get(PROP_CONNECTION_PROPERTIES) {
        settings.connection_properties = parse_connection_properties(value);
    }

    Ok(settings)
}

/// Read a flat TOML table of scalars into a property map
///
/// Strings are taken as is; integers, floats and booleans use their
/// display form. Arrays, tables and datetimes are rejected.
pub fn properties_from_toml(source: &str) -> Result<HashMap<String, String>> {
    let table: toml::Table = source
        .parse()
        .map_err(|e: toml::de::Error| DbmxError::Configuration(e.to_string()))?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(DbmxError::Configuration(format!(
                        "property {} must be a string, number or boolean, found {}",
                        key,
                        other.type_str()
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}
