//! SQL queries for different databases.

/// Add traffic to a user (PostgreSQL).
pub const ADD_TRAFFIC_PG: &str = r#"
UPDATE users
SET upload = upload + $1, download = download + $2
WHERE password = $3
"#;

/// Add traffic to a user (MySQL/SQLite).
pub const ADD_TRAFFIC_MYSQL: &str = r#"
UPDATE users
SET upload = upload + ?, download = download + ?
WHERE password = ?
"#;

/// Scan all users (all databases).
pub const LOAD_USERS: &str = r#"
SELECT password, quota, download, upload, speed_sent, speed_recv
FROM users
"#;

/// Find user by hash (PostgreSQL).
pub const FIND_BY_HASH_PG: &str = r#"
SELECT password, quota, download, upload, speed_sent, speed_recv
FROM users
WHERE password = $1
"#;

/// Find user by hash (MySQL/SQLite).
pub const FIND_BY_HASH_MYSQL: &str = r#"
SELECT password, quota, download, upload, speed_sent, speed_recv
FROM users
WHERE password = ?
"#;

/// Table schema (MySQL/MariaDB).
pub const SCHEMA_MYSQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    password VARCHAR(255) NOT NULL PRIMARY KEY,
    quota BIGINT NOT NULL DEFAULT 0,
    download BIGINT NOT NULL DEFAULT 0,
    upload BIGINT NOT NULL DEFAULT 0,
    speed_sent INT NOT NULL DEFAULT 0,
    speed_recv INT NOT NULL DEFAULT 0
)
"#;

/// Table schema (PostgreSQL).
pub const SCHEMA_PG: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    password VARCHAR(255) NOT NULL PRIMARY KEY,
    quota BIGINT NOT NULL DEFAULT 0,
    download BIGINT NOT NULL DEFAULT 0,
    upload BIGINT NOT NULL DEFAULT 0,
    speed_sent INTEGER NOT NULL DEFAULT 0,
    speed_recv INTEGER NOT NULL DEFAULT 0
)
"#;

/// Table schema (SQLite).
pub const SCHEMA_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    password TEXT NOT NULL PRIMARY KEY,
    quota INTEGER NOT NULL DEFAULT 0,
    download INTEGER NOT NULL DEFAULT 0,
    upload INTEGER NOT NULL DEFAULT 0,
    speed_sent INTEGER NOT NULL DEFAULT 0,
    speed_recv INTEGER NOT NULL DEFAULT 0
)
"#;
