//! Database handle over SQLite via sqlx.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::{error::StoreError, items::SqliteItemStore, migrations::run::run_migrations};

/// How long a caller waits for a pooled connection before the operation
/// fails. Pool exhaustion is the only backpressure the store applies.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Central store handle. Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time, not inside a migration: SQLite refuses to change
    /// `journal_mode` inside a transaction and sqlx wraps each migration in one.
    pub async fn open(db_path: &Path, max_connections: u32) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        Self::with_options(opts, max_connections).await
    }

    /// Connect using a `sqlite:` URL, e.g. `sqlite://vault.db?mode=rwc`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::db("parsing database url"))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        Self::with_options(opts, max_connections).await
    }

    async fn with_options(
        opts: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(opts)
            .await
            .map_err(StoreError::db("connecting to database"))?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Item operations bound to this store's pool.
    pub fn items(&self) -> SqliteItemStore {
        SqliteItemStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::Store;

    #[tokio::test]
    async fn open_creates_item_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("vault.db"), 2)
            .await
            .expect("open store");

        for table in ["item", "item_data", "meta"] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&store.pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "{table} table should exist");
        }
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");
        Store::open(&path, 1).await.unwrap().close().await;
        assert!(Store::open(&path, 1).await.is_ok());
    }

    #[tokio::test]
    async fn payload_rows_require_a_parent_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("vault.db"), 1).await.unwrap();

        let orphan = sqlx::query("INSERT INTO item_data (item_id, data) VALUES ('nope', x'00')")
            .execute(&store.pool)
            .await;
        assert!(orphan.is_err(), "foreign keys must be enforced");
    }

    #[tokio::test]
    async fn connect_accepts_sqlite_urls() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("url.db").display());
        assert!(Store::connect(&url, 1).await.is_ok());
    }
}
