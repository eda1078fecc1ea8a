//! Tests for the SQL store against in-memory SQLite.

use std::time::Duration;

use crate::sql::{DatabaseType, SqlAuth, SqlAuthConfig, SqlStore};
use crate::store::{UserRecord, UserStore};
use crate::{AuthError, Authenticator};

/// Create a test store with in-memory SQLite and the schema in place.
async fn setup_test_db() -> SqlAuth {
    let config = SqlAuthConfig::new("sqlite::memory:").max_connections(1);
    let auth = SqlAuth::connect(&config).await.expect("Failed to connect");
    auth.store()
        .init_schema()
        .await
        .expect("Failed to create table");
    auth
}

/// Insert a test user.
async fn insert_user(store: &SqlStore, record: &UserRecord) {
    let insert = r#"
        INSERT INTO users (password, quota, download, upload, speed_sent, speed_recv)
        VALUES (?, ?, ?, ?, ?, ?)
    "#;

    sqlx::query(insert)
        .bind(&record.hash)
        .bind(record.quota)
        .bind(record.download)
        .bind(record.upload)
        .bind(record.speed_sent)
        .bind(record.speed_recv)
        .execute(store.pool())
        .await
        .expect("Failed to insert user");
}

async fn delete_user(store: &SqlStore, hash: &str) {
    sqlx::query("DELETE FROM users WHERE password = ?")
        .bind(hash)
        .execute(store.pool())
        .await
        .expect("Failed to delete user");
}

#[tokio::test]
async fn test_database_type_detection() {
    assert_eq!(
        DatabaseType::from_url("postgres://localhost/db"),
        Some(DatabaseType::PostgreSQL)
    );
    assert_eq!(
        DatabaseType::from_url("mysql://localhost/db"),
        Some(DatabaseType::MySQL)
    );
    assert_eq!(
        DatabaseType::from_url("mariadb://localhost/db"),
        Some(DatabaseType::MySQL)
    );
    assert_eq!(
        DatabaseType::from_url("sqlite::memory:"),
        Some(DatabaseType::SQLite)
    );
    assert_eq!(DatabaseType::from_url("invalid://localhost"), None);
}

#[tokio::test]
async fn test_connect_sqlite() {
    let auth = setup_test_db().await;
    assert_eq!(auth.store().database_type(), DatabaseType::SQLite);
    assert_eq!(auth.check_rate(), Duration::from_secs(60));
}

#[tokio::test]
async fn test_invalid_database_url() {
    let config = SqlAuthConfig::new("invalid://localhost/db");
    let result = SqlAuth::connect(&config).await;

    assert!(matches!(result, Err(AuthError::Backend(_))));
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let config = SqlAuthConfig::new("sqlite::memory:").check_rate(0);
    let result = SqlAuth::connect(&config).await;

    assert!(matches!(result, Err(AuthError::Config(_))));
}

#[tokio::test]
async fn test_find_by_hash() {
    let auth = setup_test_db().await;
    let record = UserRecord::new("u1")
        .with_quota(1000)
        .with_usage(10, 20)
        .with_speed_limit(30, 40);
    insert_user(auth.store(), &record).await;

    let found = auth.store().find_by_hash("u1").await.unwrap();
    assert_eq!(found, Some(record));
    assert_eq!(auth.store().find_by_hash("u2").await.unwrap(), None);
}

#[tokio::test]
async fn test_add_traffic_reports_affected_rows() {
    let auth = setup_test_db().await;
    insert_user(auth.store(), &UserRecord::new("u1").with_usage(100, 0)).await;

    let affected = auth.store().add_traffic("u1", 500, 600).await.unwrap();
    assert_eq!(affected, 1);
    let affected = auth.store().add_traffic("ghost", 1, 1).await.unwrap();
    assert_eq!(affected, 0);

    let row = auth.store().find_by_hash("u1").await.unwrap().unwrap();
    assert_eq!(row.download, 700);
    assert_eq!(row.upload, 500);
}

#[tokio::test]
async fn test_load_users() {
    let auth = setup_test_db().await;
    insert_user(auth.store(), &UserRecord::new("a")).await;
    insert_user(auth.store(), &UserRecord::new("b").with_quota(5)).await;

    let scan = auth.store().load_users().await.unwrap();
    assert!(scan.error.is_none());
    let mut hashes: Vec<_> = scan.records.iter().map(|r| r.hash.as_str()).collect();
    hashes.sort_unstable();
    assert_eq!(hashes, ["a", "b"]);
}

#[tokio::test]
async fn test_load_users_stops_at_undecodable_row() {
    let auth = setup_test_db().await;
    insert_user(auth.store(), &UserRecord::new("a")).await;
    // SQLite keeps the text as-is in an INTEGER column
    sqlx::query("INSERT INTO users (password, quota) VALUES ('b', 'lots')")
        .execute(auth.store().pool())
        .await
        .unwrap();

    let scan = auth.store().load_users().await.unwrap();
    assert!(matches!(scan.error, Some(AuthError::Decode(_))));
    assert_eq!(scan.records.len(), 1);
    assert_eq!(scan.records[0].hash, "a");
}

#[tokio::test]
async fn test_scenario_quota_exhaustion() {
    let auth = setup_test_db().await;
    insert_user(auth.store(), &UserRecord::new("u1").with_quota(1000)).await;

    let user = auth.authorize("u1").await.unwrap();
    user.add_traffic(600, 500);
    auth.reconcile_once().await.unwrap();

    let row = auth.store().find_by_hash("u1").await.unwrap().unwrap();
    assert_eq!(row.download, 600);
    assert_eq!(row.upload, 500);
    assert!(!auth.cache().contains("u1"));

    assert!(matches!(
        auth.verify("u1").await,
        Err(AuthError::QuotaExceeded)
    ));
}

#[tokio::test]
async fn test_scenario_row_deleted_while_cached() {
    let auth = setup_test_db().await;
    insert_user(auth.store(), &UserRecord::new("u1")).await;

    let user = auth.authorize("u1").await.unwrap();
    user.add_traffic(1, 1);
    delete_user(auth.store(), "u1").await;

    let flushed = auth.flush().await;
    assert_eq!(flushed.evicted, 1);
    assert!(!auth.cache().contains("u1"));
    assert!(auth.authorize("u1").await.is_none());
}

#[tokio::test]
async fn test_debug_impl_hides_credentials() {
    let auth = setup_test_db().await;
    let debug_str = format!("{:?}", auth);

    assert!(!debug_str.contains("memory"));
    assert!(debug_str.contains("StoreAuth"));
    assert!(debug_str.contains("SqlStore"));
}
