use async_trait::async_trait;
use log::{debug, error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::Connection;
use std::path::Path;
use std::time::Duration;

use crate::config::settings::SqliteConfig;
use crate::storage::models::{LogRecord, StoredReading};
use crate::utils::error::PersistenceError;

pub const READINGS_TABLE: &str = "tank_readings";

/// Destination for per-cycle records. Must never fail the caller.
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn append(&self, record: &LogRecord);
    fn destination(&self) -> String;
}

/// Append-only SQLite log of measured tank levels.
///
/// No connection outlives a single call: the initializer and every writer
/// open their own, so the store is never shared across threads.
#[derive(Debug, Clone)]
pub struct PersistenceLog {
    config: SqliteConfig,
}

impl PersistenceLog {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.config.database_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .journal_mode(if self.config.enable_wal {
                SqliteJournalMode::Wal
            } else {
                SqliteJournalMode::Delete
            })
            .synchronous(SqliteSynchronous::Normal)
    }

    async fn open(&self) -> Result<SqliteConnection, PersistenceError> {
        Ok(SqliteConnection::connect_with(&self.connect_options()).await?)
    }

    pub async fn initialize(&self) -> Result<(), PersistenceError> {
        let path = &self.config.database_path;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if self.config.reset_on_start && path.exists() {
            std::fs::remove_file(path)?;
            for suffix in ["-wal", "-shm"] {
                let mut sidecar = path.as_os_str().to_owned();
                sidecar.push(suffix);
                let _ = std::fs::remove_file(sidecar);
            }
            info!("🗑️  Deleted existing database file: {}", path.display());
        }

        info!("🗄️  Initializing SQLite database: {}", path.display());
        let mut conn = self.open().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tank_readings (
                timestamp TEXT NOT NULL,
                big_tank_gallons REAL NOT NULL,
                tank1_gallons REAL NOT NULL,
                tank2_gallons REAL NOT NULL
            )
        "#,
        )
        .execute(&mut conn)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tank_readings_timestamp ON tank_readings(timestamp)")
            .execute(&mut conn)
            .await?;

        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(READINGS_TABLE)
        .fetch_one(&mut conn)
        .await?;

        conn.close().await?;

        if exists == 0 {
            return Err(PersistenceError::SchemaMissing(READINGS_TABLE));
        }

        info!(
            "✅ SQLite database ready (WAL: {}, busy timeout: {}ms)",
            self.config.enable_wal, self.config.busy_timeout_ms
        );
        Ok(())
    }

    /// Inserts one record in its own connection and transaction.
    pub async fn try_append(&self, record: &LogRecord) -> Result<(), PersistenceError> {
        let mut conn = self.open().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tank_readings (timestamp, big_tank_gallons, tank1_gallons, tank2_gallons)
            VALUES (?, ?, ?, ?)
        "#,
        )
        .bind(record.timestamp_text())
        .bind(record.big_tank_gallons)
        .bind(record.tank1_gallons)
        .bind(record.tank2_gallons)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        conn.close().await?;
        Ok(())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredReading>, PersistenceError> {
        let mut conn = self.open().await?;
        let readings = sqlx::query_as::<_, StoredReading>(
            r#"
            SELECT timestamp, big_tank_gallons, tank1_gallons, tank2_gallons
            FROM tank_readings
            ORDER BY rowid DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;
        Ok(readings)
    }

    pub async fn count(&self) -> Result<i64, PersistenceError> {
        let mut conn = self.open().await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tank_readings")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(total)
    }
}

#[async_trait]
impl ReadingSink for PersistenceLog {
    async fn append(&self, record: &LogRecord) {
        match self.try_append(record).await {
            Ok(()) => debug!(
                "💾 Logged tank levels: timestamp={}, Big Tank={:.2}, Tank 1={:.2}, Tank 2={:.2}",
                record.timestamp_text(),
                record.big_tank_gallons,
                record.tank1_gallons,
                record.tank2_gallons
            ),
            Err(e) => error!("❌ Failed to log tank levels to database, record dropped: {}", e),
        }
    }

    fn destination(&self) -> String {
        self.database_path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::MeasuredLevels;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> PersistenceLog {
        PersistenceLog::new(SqliteConfig {
            database_path: dir.path().join("data").join("tank_levels.db"),
            ..SqliteConfig::default()
        })
    }

    fn record(big: f64) -> LogRecord {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        LogRecord::new(
            at,
            &MeasuredLevels {
                big,
                tank1: 3051.8,
                tank2: 1333.54,
            },
        )
    }

    #[tokio::test]
    async fn test_initialize_then_append() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.initialize().await.unwrap();

        log.append(&record(291004.44)).await;
        log.append(&record(100.0)).await;

        assert_eq!(log.count().await.unwrap(), 2);
        let rows = log.recent(10).await.unwrap();
        assert_eq!(rows[0].big_tank_gallons, 100.0);
        assert_eq!(rows[1].big_tank_gallons, 291004.44);
        assert_eq!(rows[1].timestamp, "2024-05-01 08:30:00");
        assert_eq!(rows[1].tank2_gallons, 1333.54);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent_and_uses_wal() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.initialize().await.unwrap();
        log.append(&record(1.0)).await;
        log.initialize().await.unwrap();

        assert_eq!(log.count().await.unwrap(), 1);

        let mut conn = log.open().await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_reset_on_start_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.initialize().await.unwrap();
        log.append(&record(1.0)).await;

        let fresh = PersistenceLog::new(SqliteConfig {
            reset_on_start: true,
            ..log.config.clone()
        });
        fresh.initialize().await.unwrap();

        assert_eq!(fresh.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_failure_is_absorbed() {
        let dir = TempDir::new().unwrap();
        // Never initialized: the table does not exist.
        let log = log_in(&dir);
        std::fs::create_dir_all(dir.path().join("data")).unwrap();

        assert!(log.try_append(&record(1.0)).await.is_err());
        log.append(&record(1.0)).await;
    }
}
