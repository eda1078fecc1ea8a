//! CLI module for trojan-statistic.
//!
//! Manages the `users` table read by the SQL store and can run the
//! reconciliation loop standalone.
//!
//! # Usage
//!
//! ```bash
//! # Initialize database schema
//! trojan-statistic init -d sqlite:users.db
//!
//! # Add a user with a 10 GB quota
//! trojan-statistic add -d sqlite:users.db -p mypassword -q 10GB
//!
//! # List all users
//! trojan-statistic list -d sqlite:users.db
//!
//! # Cap a user's upstream speed to 1 MB/s
//! trojan-statistic update -d sqlite:users.db -p mypassword --speed-sent 1MB
//!
//! # Keep the table in sync with a running cache until Ctrl-C
//! trojan-statistic sync -c statistic.toml
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, load_config, validate_config};
use crate::sql::{DatabaseType, SqlAuth, SqlAuthConfig, SqlStore};
use crate::{is_admitted, sha224_hex};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Trojan statistic management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trojan-statistic",
    version,
    about = "Manage trojan users, quotas and traffic accounting"
)]
pub struct StatisticArgs {
    #[command(subcommand)]
    pub command: StatisticCommands,
}

/// Identifies a user either by password or by stored hash.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct UserTarget {
    /// User password (will be hashed).
    #[arg(short, long)]
    pub password: Option<String>,

    /// Credential hash as stored in the table.
    #[arg(long)]
    pub hash: Option<String>,
}

impl UserTarget {
    fn hash(&self) -> String {
        match &self.hash {
            Some(h) => h.clone(),
            None => sha224_hex(self.password.as_deref().unwrap_or_default()),
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum StatisticCommands {
    /// Initialize database schema.
    Init {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },

    /// Add a new user.
    Add {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        #[command(flatten)]
        target: UserTarget,

        /// Quota (e.g., "10GB", "500MB", "0" for unlimited).
        #[arg(short, long, default_value = "0")]
        quota: String,

        /// Upstream speed limit per second (e.g., "1MB", "0" for unlimited).
        #[arg(long, default_value = "0")]
        speed_sent: String,

        /// Downstream speed limit per second (e.g., "1MB", "0" for unlimited).
        #[arg(long, default_value = "0")]
        speed_recv: String,
    },

    /// Remove a user.
    Remove {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        #[command(flatten)]
        target: UserTarget,
    },

    /// List all users.
    List {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// Output format (table, json, csv).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Update quota or speed limits.
    Update {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        #[command(flatten)]
        target: UserTarget,

        /// New quota.
        #[arg(short, long)]
        quota: Option<String>,

        /// New upstream speed limit per second.
        #[arg(long)]
        speed_sent: Option<String>,

        /// New downstream speed limit per second.
        #[arg(long)]
        speed_recv: Option<String>,
    },

    /// Reset persisted traffic for a user.
    ResetTraffic {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// Reset every user.
        #[arg(long, conflicts_with_all = ["password", "hash"])]
        all: bool,

        /// User password (will be hashed).
        #[arg(short, long)]
        password: Option<String>,

        /// Credential hash as stored in the table.
        #[arg(long)]
        hash: Option<String>,
    },

    /// Show password hash (for manual configuration).
    Hash {
        /// Password to hash.
        password: String,
    },

    /// Run the reconciliation loop until interrupted.
    Sync {
        /// Path to the config file (.toml, .json or .yaml).
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured log level.
        #[arg(long)]
        log_level: Option<String>,
    },
}

/// User row for display.
#[derive(Tabled, Serialize)]
struct UserDisplay {
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Quota")]
    quota: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Speed Sent")]
    speed_sent: String,
    #[tabled(rename = "Speed Recv")]
    speed_recv: String,
    #[tabled(rename = "Admitted")]
    admitted: String,
}

/// Run the CLI with the given arguments.
pub async fn run(args: StatisticArgs) -> CliResult {
    match args.command {
        StatisticCommands::Init { database } => {
            connect(&database).await?.init_schema().await?;
            println!("Database schema initialized successfully.");
            Ok(())
        }
        StatisticCommands::Add {
            database,
            target,
            quota,
            speed_sent,
            speed_recv,
        } => add_user(&database, &target, &quota, &speed_sent, &speed_recv).await,
        StatisticCommands::Remove { database, target } => remove_user(&database, &target).await,
        StatisticCommands::List { database, format } => list_users(&database, &format).await,
        StatisticCommands::Update {
            database,
            target,
            quota,
            speed_sent,
            speed_recv,
        } => {
            update_user(
                &database,
                &target,
                quota.as_deref(),
                speed_sent.as_deref(),
                speed_recv.as_deref(),
            )
            .await
        }
        StatisticCommands::ResetTraffic {
            database,
            all,
            password,
            hash,
        } => {
            let target = match (all, hash, password) {
                (true, _, _) => None,
                (false, Some(h), _) => Some(h),
                (false, None, Some(p)) => Some(sha224_hex(&p)),
                (false, None, None) => return Err("Must specify --all, --hash, or --password".into()),
            };
            reset_traffic(&database, target.as_deref()).await
        }
        StatisticCommands::Hash { password } => {
            println!("{}", sha224_hex(&password));
            Ok(())
        }
        StatisticCommands::Sync { config, log_level } => sync(config, log_level).await,
    }
}

/// Connect to database.
async fn connect(url: &str) -> Result<SqlStore, Box<dyn std::error::Error>> {
    let config = SqlAuthConfig::new(url).max_connections(1);
    Ok(SqlStore::connect(&config).await?)
}

/// Positional placeholder for the store's dialect.
fn placeholder(db_type: DatabaseType, n: usize) -> String {
    match db_type {
        DatabaseType::PostgreSQL => format!("${n}"),
        DatabaseType::MySQL | DatabaseType::SQLite => "?".to_string(),
    }
}

/// Parse size string (e.g., "10GB", "500MB") to bytes.
#[allow(clippy::cast_possible_truncation)]
fn parse_bytes(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim().to_uppercase();
    if s == "0" || s.is_empty() {
        return Ok(0);
    }

    let (num, unit) = if let Some(n) = s.strip_suffix("TB") {
        (n, 1024i64 * 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("GB") {
        (n, 1024i64 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024i64 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024i64)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1i64)
    } else {
        (s.as_str(), 1i64)
    };

    let value: f64 = num.trim().parse()?;
    if value < 0.0 {
        return Err(format!("negative size: {s}").into());
    }
    Ok((value * unit as f64) as i64)
}

/// Parse a per-second speed limit; the columns are 32-bit.
fn parse_speed(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let bytes = parse_bytes(s)?;
    if bytes > i64::from(i32::MAX) {
        return Err(format!("speed limit {s} exceeds {} bytes/s", i32::MAX).into());
    }
    Ok(bytes)
}

/// Format bytes to human readable string.
#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;
    const TB: i64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a limit where non-positive means unlimited.
fn format_limit(bytes: i64, suffix: &str) -> String {
    if bytes <= 0 {
        "Unlimited".to_string()
    } else {
        format!("{}{}", format_bytes(bytes), suffix)
    }
}

/// Add a new user.
async fn add_user(
    url: &str,
    target: &UserTarget,
    quota: &str,
    speed_sent: &str,
    speed_recv: &str,
) -> CliResult {
    let store = connect(url).await?;
    let hash = target.hash();
    let quota = parse_bytes(quota)?;
    let speed_sent = parse_speed(speed_sent)?;
    let speed_recv = parse_speed(speed_recv)?;

    let db = store.database_type();
    let query = format!(
        "INSERT INTO users (password, quota, download, upload, speed_sent, speed_recv) VALUES ({}, {}, 0, 0, {}, {})",
        placeholder(db, 1),
        placeholder(db, 2),
        placeholder(db, 3),
        placeholder(db, 4),
    );

    sqlx::query(&query)
        .bind(&hash)
        .bind(quota)
        .bind(speed_sent)
        .bind(speed_recv)
        .execute(store.pool())
        .await?;

    println!("User added successfully.");
    println!("  Hash: {}", hash);
    println!("  Quota: {}", format_limit(quota, ""));
    println!("  Speed sent: {}", format_limit(speed_sent, "/s"));
    println!("  Speed recv: {}", format_limit(speed_recv, "/s"));

    Ok(())
}

/// Remove a user.
async fn remove_user(url: &str, target: &UserTarget) -> CliResult {
    let store = connect(url).await?;
    let query = format!(
        "DELETE FROM users WHERE password = {}",
        placeholder(store.database_type(), 1)
    );

    let result = sqlx::query(&query)
        .bind(target.hash())
        .execute(store.pool())
        .await?;

    if result.rows_affected() > 0 {
        println!("User removed successfully.");
    } else {
        println!("No user found matching the criteria.");
    }

    Ok(())
}

/// List all users.
async fn list_users(url: &str, format: &str) -> CliResult {
    use crate::store::UserStore;

    let store = connect(url).await?;
    let scan = store.load_users().await?;
    if let Some(e) = scan.error {
        warn!(error = %e, "listing stopped at an undecodable row");
    }

    if scan.records.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    let mut records = scan.records;
    records.sort_by(|a, b| a.hash.cmp(&b.hash));

    let users: Vec<UserDisplay> = records
        .iter()
        .map(|r| UserDisplay {
            hash: r.hash.clone(),
            quota: format_limit(r.quota, ""),
            download: format_bytes(r.download),
            upload: format_bytes(r.upload),
            speed_sent: format_limit(r.speed_sent, "/s"),
            speed_recv: format_limit(r.speed_recv, "/s"),
            admitted: if is_admitted(r.quota, r.download, r.upload) {
                "Yes"
            } else {
                "No"
            }
            .to_string(),
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&users)?),
        "csv" => {
            println!("hash,quota,download,upload,speed_sent,speed_recv,admitted");
            for r in &records {
                println!(
                    "{},{},{},{},{},{},{}",
                    r.hash,
                    r.quota,
                    r.download,
                    r.upload,
                    r.speed_sent,
                    r.speed_recv,
                    r.is_admitted()
                );
            }
        }
        _ => println!("{}", Table::new(users)),
    }

    Ok(())
}

/// Update quota and speed limits.
async fn update_user(
    url: &str,
    target: &UserTarget,
    quota: Option<&str>,
    speed_sent: Option<&str>,
    speed_recv: Option<&str>,
) -> CliResult {
    let mut updates: Vec<(&str, i64)> = Vec::new();
    if let Some(q) = quota {
        updates.push(("quota", parse_bytes(q)?));
    }
    if let Some(s) = speed_sent {
        updates.push(("speed_sent", parse_speed(s)?));
    }
    if let Some(s) = speed_recv {
        updates.push(("speed_recv", parse_speed(s)?));
    }

    if updates.is_empty() {
        println!("No updates specified.");
        return Ok(());
    }

    let store = connect(url).await?;
    let db = store.database_type();
    let set_clause = updates
        .iter()
        .enumerate()
        .map(|(i, (col, _))| format!("{} = {}", col, placeholder(db, i + 1)))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "UPDATE users SET {} WHERE password = {}",
        set_clause,
        placeholder(db, updates.len() + 1)
    );

    let mut q = sqlx::query(&query);
    for (_, v) in &updates {
        q = q.bind(*v);
    }
    let result = q.bind(target.hash()).execute(store.pool()).await?;

    if result.rows_affected() > 0 {
        println!("User updated successfully.");
    } else {
        println!("No user found matching the criteria.");
    }

    Ok(())
}

/// Reset persisted traffic for one user, or everyone when `hash` is `None`.
async fn reset_traffic(url: &str, hash: Option<&str>) -> CliResult {
    let store = connect(url).await?;

    let affected = match hash {
        None => {
            sqlx::query("UPDATE users SET download = 0, upload = 0")
                .execute(store.pool())
                .await?
                .rows_affected()
        }
        Some(h) => {
            let query = format!(
                "UPDATE users SET download = 0, upload = 0 WHERE password = {}",
                placeholder(store.database_type(), 1)
            );
            sqlx::query(&query)
                .bind(h)
                .execute(store.pool())
                .await?
                .rows_affected()
        }
    };

    if affected > 0 {
        println!("Traffic reset for {} user(s).", affected);
    } else {
        println!("No user found matching the criteria.");
    }

    Ok(())
}

/// Run the reconciliation loop until a shutdown signal, then flush once more.
async fn sync(path: PathBuf, log_level: Option<String>) -> CliResult {
    let mut config = load_config(&path)?;
    if let Some(level) = log_level {
        config.logging.level = Some(level);
    }
    validate_config(&config)?;
    init_tracing(&config.logging);

    let auth = Arc::new(SqlAuth::connect(&config.mysql).await?);
    info!(check_rate = config.mysql.check_rate, "statistic sync started");

    let shutdown = CancellationToken::new();
    let handle = auth.clone().spawn(shutdown.clone());

    shutdown_signal_handler().await;
    info!("shutdown signal received");
    shutdown.cancel();
    handle.await?;

    auth.flush().await;
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize tracing subscriber from logging config.
fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    for (module, level) in &config.filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let to_stdout = config.output.as_deref() == Some("stdout");

    let registry = tracing_subscriber::registry().with(filter);
    match (format, to_stdout) {
        ("json", true) => registry.with(fmt::layer().json().with_writer(io::stdout)).init(),
        ("json", false) => registry.with(fmt::layer().json().with_writer(io::stderr)).init(),
        ("compact", true) => registry.with(fmt::layer().compact().with_writer(io::stdout)).init(),
        ("compact", false) => registry.with(fmt::layer().compact().with_writer(io::stderr)).init(),
        (_, true) => registry.with(fmt::layer().with_writer(io::stdout)).init(),
        (_, false) => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}
