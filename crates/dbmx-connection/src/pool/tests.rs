//! Tests for connection pool functionality

use std::sync::atomic::Ordering;
use std::time::Duration;

use dbmx_core::{Connection, DbmxError, TransactionIsolation};
use pretty_assertions::assert_eq;

use super::{BasicPool, Password, PoolSettings, PoolStats};
use crate::data_source::{Capability, DataSource, Unwrapped};
use crate::testing::mock_drivers;

fn mock_settings() -> PoolSettings {
    PoolSettings {
        url: Some("mock:test".into()),
        ..PoolSettings::default()
    }
}

// =============================================================================
// PoolSettings tests
// =============================================================================

#[test]
fn test_settings_defaults() {
    let settings = PoolSettings::default();
    assert_eq!(settings.max_active, 8);
    assert_eq!(settings.max_idle, 8);
    assert_eq!(settings.min_idle, 0);
    assert_eq!(settings.initial_size, 0);
    assert_eq!(settings.max_wait, -1);
    assert!(settings.test_on_borrow);
    assert_eq!(settings.default_transaction_isolation, TransactionIsolation::Unknown);
    assert!(settings.max_wait_duration().is_none());
    assert!(settings.eviction_interval().is_none());
    assert_eq!(
        settings.min_evictable_idle_time(),
        Some(Duration::from_secs(30 * 60))
    );
}

#[test]
fn test_settings_capacity() {
    let mut settings = PoolSettings::default();
    settings.max_active = 2;
    assert!(!settings.at_capacity(1));
    assert!(settings.at_capacity(2));
    settings.max_active = -1;
    assert!(!settings.at_capacity(10_000));
}

#[test]
fn test_settings_serialization_uses_property_names() {
    let settings = PoolSettings {
        max_active: 42,
        connection_init_sqls: vec!["SET search_path TO app".into()],
        password: Some(Password::new("secret")),
        ..PoolSettings::default()
    };

    let json = serde_json::to_value(&settings).expect("serialize");
    assert_eq!(json["maxActive"], 42);
    assert_eq!(json["initConnectionSqls"][0], "SET search_path TO app");
    assert_eq!(json["defaultTransactionIsolation"], -1);

    let parsed: PoolSettings =
        serde_json::from_str(r#"{"maxWait": 250, "testWhileIdle": true}"#).expect("deserialize");
    assert_eq!(parsed.max_wait, 250);
    assert!(parsed.test_while_idle);
    assert_eq!(parsed.max_active, 8);
}

#[test]
fn test_password_hidden_from_debug() {
    let settings = PoolSettings {
        password: Some(Password::new("hunter2")),
        ..PoolSettings::default()
    };
    assert!(!format!("{:?}", settings).contains("hunter2"));
}

#[test]
fn test_pool_stats_utilization() {
    let stats = PoolStats {
        active: 3,
        idle: 1,
        ..PoolStats::default()
    };
    assert_eq!(stats.total(), 4);
    assert!((stats.utilization() - 0.75).abs() < 0.001);
    assert!((PoolStats::default().utilization() - 0.0).abs() < 0.001);
    assert!(!stats.is_exhausted());
}

// =============================================================================
// BasicPool tests
// =============================================================================

#[tokio::test]
async fn test_pool_starts_lazily() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            initial_size: 3,
            ..mock_settings()
        },
        drivers,
    );

    assert!(!pool.is_started());
    assert_eq!(driver.count(), 0);

    pool.start().await.expect("start");
    assert!(pool.is_started());
    assert_eq!(pool.created_count(), 3);
    assert_eq!(pool.num_idle(), 3);

    // starting again does not open more connections
    pool.start().await.expect("start again");
    assert_eq!(driver.count(), 3);
}

#[tokio::test]
async fn test_pool_get_connection() {
    let (_driver, drivers) = mock_drivers();
    let pool = BasicPool::new(mock_settings(), drivers);

    let conn = pool.get().await.expect("get connection");
    assert_eq!(conn.driver_name(), "mock");
    assert_eq!(pool.num_active(), 1);
    assert_eq!(pool.num_idle(), 0);
}

#[tokio::test]
async fn test_pool_connection_return() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(mock_settings(), drivers);

    {
        let _conn = pool.get().await.expect("get connection");
        assert_eq!(pool.num_active(), 1);
    }

    assert_eq!(pool.num_active(), 0);
    assert_eq!(pool.num_idle(), 1);

    // Getting another connection should reuse the idle one
    let _conn2 = pool.get().await.expect("get connection");
    assert_eq!(driver.count(), 1);
}

#[tokio::test]
async fn test_pool_max_active_limit() {
    let (_driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_active: 2,
            max_wait: 50,
            ..mock_settings()
        },
        drivers,
    );

    let conn1 = pool.get().await.expect("get connection 1");
    let conn2 = pool.get().await.expect("get connection 2");
    assert_eq!(pool.num_active(), 2);

    let err = pool.get().await.err().expect("third borrow must time out");
    assert!(matches!(err, DbmxError::Timeout(_)));
    assert!(err.to_string().contains("Timed out"));

    drop(conn1);
    drop(conn2);
    assert_eq!(pool.num_idle(), 2);
}

#[tokio::test]
async fn test_pool_unlimited_max_active() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_active: -1,
            ..mock_settings()
        },
        drivers,
    );

    let mut held = Vec::new();
    for _ in 0..20 {
        held.push(pool.get().await.expect("get"));
    }
    assert_eq!(pool.num_active(), 20);
    assert_eq!(driver.count(), 20);
}

#[tokio::test]
async fn test_waiting_borrower_receives_returned_connection() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_active: 1,
            ..mock_settings()
        },
        drivers,
    );

    let conn = pool.get().await.expect("get");
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await.map(|conn| conn.driver_name().to_string()) })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.stats().waiting, 1);
    drop(conn);

    let name = waiter.await.expect("join").expect("waiter got a connection");
    assert_eq!(name, "mock");
    assert_eq!(driver.count(), 1);
}

#[tokio::test]
async fn test_raising_max_active_wakes_waiters() {
    let (_driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_active: 1,
            ..mock_settings()
        },
        drivers,
    );

    let _held = pool.get().await.expect("get");
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await.is_ok() })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.set_max_active(2);
    assert!(waiter.await.expect("join"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_wakes_every_waiting_borrower() {
    for round in 0..50 {
        let (_driver, drivers) = mock_drivers();
        let pool = BasicPool::new(
            PoolSettings {
                max_active: 1,
                ..mock_settings()
            },
            drivers,
        );
        let held = pool.get().await.expect("get");

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.get().await.err() })
            })
            .collect();

        // vary how far the borrowers get before the pool closes
        for _ in 0..round % 5 {
            tokio::task::yield_now().await;
        }
        DataSource::close(&pool).await.expect("close");

        for waiter in waiters {
            let outcome = tokio::time::timeout(Duration::from_secs(5), waiter)
                .await
                .expect("borrower woken after close")
                .expect("join");
            assert!(matches!(outcome, Some(DbmxError::Closed)));
        }
        drop(held);
    }
}

#[tokio::test]
async fn test_max_idle_discards_surplus() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_idle: 1,
            ..mock_settings()
        },
        drivers,
    );

    let conn1 = pool.get().await.expect("get");
    let conn2 = pool.get().await.expect("get");
    drop(conn1);
    drop(conn2);

    assert_eq!(pool.num_idle(), 1);
    assert_eq!(pool.stats().destroyed, 1);
    tokio::task::yield_now().await;
    assert!(driver.connection(1).is_closed());
}

#[tokio::test]
async fn test_broken_connection_replaced_on_borrow() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            validation_query: Some("SELECT 1".into()),
            ..mock_settings()
        },
        drivers,
    );

    drop(pool.get().await.expect("get"));
    driver.connection(0).broken.store(true, Ordering::SeqCst);

    let conn = pool.get().await.expect("get replacement");
    assert_eq!(driver.count(), 2);
    assert!(driver.connection(0).is_closed());
    assert_eq!(pool.num_active(), 1);
    drop(conn);
}

#[tokio::test]
async fn test_no_validation_without_test_on_borrow() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            validation_query: Some("SELECT 1".into()),
            test_on_borrow: false,
            ..mock_settings()
        },
        drivers,
    );

    drop(pool.get().await.expect("get"));
    let _conn = pool.get().await.expect("get again");
    assert!(driver.connection(0).executed.lock().is_empty());
}

#[tokio::test]
async fn test_test_on_return_validates_next_borrow() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            validation_query: Some("SELECT 1".into()),
            test_on_borrow: false,
            test_on_return: true,
            ..mock_settings()
        },
        drivers,
    );

    drop(pool.get().await.expect("get"));
    let _conn = pool.get().await.expect("get again");
    assert_eq!(*driver.connection(0).executed.lock(), vec!["SELECT 1".to_string()]);
}

#[tokio::test]
async fn test_new_connections_receive_defaults() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            default_auto_commit: false,
            default_transaction_isolation: TransactionIsolation::Serializable,
            default_catalog: Some("sales".into()),
            connection_init_sqls: vec!["SET TIME ZONE 'UTC'".into(), "SET ROLE app".into()],
            username: Some("app".into()),
            password: Some(Password::new("pw")),
            ..mock_settings()
        },
        drivers,
    );

    let _conn = pool.get().await.expect("get");
    let mock = driver.connection(0);
    assert_eq!(
        *mock.executed.lock(),
        vec!["SET TIME ZONE 'UTC'".to_string(), "SET ROLE app".to_string()]
    );
    assert_eq!(*mock.auto_commit.lock(), Some(false));
    assert_eq!(*mock.isolation.lock(), Some(TransactionIsolation::Serializable));
    assert_eq!(mock.catalog.lock().as_deref(), Some("sales"));

    let spec = driver.last_spec.lock().clone().expect("spec");
    assert_eq!(spec.username.as_deref(), Some("app"));
    assert_eq!(spec.password.as_deref(), Some("pw"));
}

#[tokio::test]
async fn test_unknown_isolation_left_to_driver() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(mock_settings(), drivers);
    let _conn = pool.get().await.expect("get");
    assert_eq!(*driver.connection(0).isolation.lock(), None);
}

#[tokio::test]
async fn test_start_with_unknown_driver_fails() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            initial_size: 2,
            driver_class_name: Some("missing".into()),
            ..mock_settings()
        },
        drivers,
    );

    let err = pool.start().await.unwrap_err();
    assert!(matches!(err, DbmxError::Driver(_)));
    assert!(!pool.is_started());
    assert_eq!(driver.count(), 0);
}

#[tokio::test]
async fn test_connect_failure_releases_slot() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            max_active: 1,
            ..mock_settings()
        },
        drivers,
    );

    driver.fail_connect.store(true, Ordering::SeqCst);
    assert!(pool.get().await.is_err());
    assert_eq!(pool.stats().pending, 0);

    driver.fail_connect.store(false, Ordering::SeqCst);
    assert!(pool.get().await.is_ok());
}

#[tokio::test]
async fn test_evict_expired_connections() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            initial_size: 3,
            min_evictable_idle_time_millis: 1,
            num_tests_per_eviction_run: 2,
            ..mock_settings()
        },
        drivers,
    );
    pool.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(pool.evict().await.expect("evict"), 2);
    assert_eq!(pool.num_idle(), 1);
    assert!(driver.connection(0).is_closed());
    assert!(driver.connection(1).is_closed());
    assert!(!driver.connection(2).is_closed());
}

#[tokio::test]
async fn test_evict_tops_up_min_idle() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            min_idle: 2,
            ..mock_settings()
        },
        drivers,
    );
    pool.start().await.expect("start");
    assert_eq!(pool.num_idle(), 0);

    assert_eq!(pool.evict().await.expect("evict"), 0);
    assert_eq!(pool.num_idle(), 2);
    assert_eq!(driver.count(), 2);
}

#[tokio::test]
async fn test_evict_while_idle_drops_broken() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            initial_size: 2,
            test_while_idle: true,
            validation_query: Some("SELECT 1".into()),
            num_tests_per_eviction_run: -1,
            ..mock_settings()
        },
        drivers,
    );
    pool.start().await.expect("start");
    driver.connection(1).broken.store(true, Ordering::SeqCst);

    assert_eq!(pool.evict().await.expect("evict"), 1);
    assert_eq!(pool.num_idle(), 1);
}

#[tokio::test]
async fn test_close_pool() {
    let (driver, drivers) = mock_drivers();
    let pool = BasicPool::new(
        PoolSettings {
            initial_size: 2,
            ..mock_settings()
        },
        drivers,
    );
    pool.start().await.expect("start");

    let held = pool.get().await.expect("get");
    DataSource::close(&pool).await.expect("close");
    assert!(pool.is_closed());
    assert_eq!(pool.num_idle(), 0);
    assert!(driver.connection(1).is_closed());

    assert!(matches!(pool.get().await.err(), Some(DbmxError::Closed)));

    // connections returned after close are discarded
    drop(held);
    assert_eq!(pool.num_idle(), 0);
    assert_eq!(pool.num_active(), 0);
}

#[tokio::test]
async fn test_underlying_connection_access() {
    let (_driver, drivers) = mock_drivers();
    let guarded = BasicPool::new(mock_settings(), drivers.clone());
    let conn = guarded.get().await.expect("get");
    assert!(conn.underlying().is_none());

    let open = BasicPool::new(
        PoolSettings {
            access_to_underlying_connection_allowed: true,
            ..mock_settings()
        },
        drivers,
    );
    let conn = open.get().await.expect("get");
    assert!(conn.underlying().is_some());
}

#[test]
fn test_pool_capabilities() {
    let (_driver, drivers) = mock_drivers();
    let pool = BasicPool::new(mock_settings(), drivers);

    assert!(pool.is_wrapper_for(Capability::BasicPool));
    assert!(pool.is_wrapper_for(Capability::DataSource));
    assert!(!pool.is_wrapper_for(Capability::ManagedDataSource));

    assert!(matches!(
        pool.unwrap_as(Capability::BasicPool),
        Ok(Unwrapped::BasicPool(_))
    ));
    assert!(matches!(
        pool.unwrap_as(Capability::ManagedResource),
        Err(DbmxError::NotSupported(_))
    ));
}
