//! Opening the catalog database.

use exn::ResultExt;
use sqlx::sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    /// Private to a single connection; gone once it closes.
    Memory,
}

impl Target {
    /// Sync writes one unit at a time; the other connections serve readers
    /// such as the resolver. An in-memory catalog only exists inside one
    /// connection, so it gets exactly one.
    fn max_connections(&self) -> u32 {
        match self {
            Self::File(_) => 5,
            Self::Memory => 1,
        }
    }

    fn options(&self) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // Page upserts for a large archive run in one transaction while
            // the resolver keeps reading.
            .busy_timeout(Duration::from_millis(1500))
            .auto_vacuum(SqliteAutoVacuum::None)
            // Applied by sqlx on every new connection, not just the first.
            .pragma("wal_autocheckpoint", "800")
            .pragma("cache_size", "-8192")
            .pragma("temp_store", "MEMORY")
            .pragma("mmap_size", "33554432")
            .pragma("analysis_limit", "1000");
        match self {
            Self::File(path) => options.filename(path).create_if_missing(true),
            Self::Memory => options.filename(":memory:"),
        }
    }
}

/// Connection pool for the catalog. Wrap it in a
/// [`Repository`](crate::Repository) to run queries.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(target: Target) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(target.max_connections())
            .connect_with(target.options())
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the catalog at `path`, creating the file and its parent directory
    /// when missing. Pending migrations are applied before returning.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
        }
        Self::open(Target::File(path.to_path_buf())).await
    }

    /// A fresh, migrated catalog held in memory.
    ///
    /// Not gated behind `#[cfg(test)]`: the library crate's tests use it too.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Target::Memory).await
    }

    #[instrument("migrating catalog", skip_all)]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to return, then close the pool.
    pub async fn close(&self) {
        // Refresh planner statistics; failure here is harmless.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pragma(db: &Database, name: &str) -> i64 {
        sqlx::query_scalar(&format!("PRAGMA {name}")).fetch_one(db.pool()).await.unwrap()
    }

    #[tokio::test]
    async fn test_memory_catalog_is_migrated() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        // Already applied; a second run is a no-op.
        db.migrate().await.unwrap();
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_connection_settings() {
        let db = Database::connect_in_memory().await.unwrap();
        assert_eq!(pragma(&db, "foreign_keys").await, 1);
        assert_eq!(pragma(&db, "wal_autocheckpoint").await, 800);
        assert_eq!(pragma(&db, "cache_size").await, -8192);
        db.close().await;
    }

    #[test]
    fn test_pool_sizes() {
        assert_eq!(Target::Memory.max_connections(), 1);
        assert!(Target::File("catalog.db".into()).max_connections() > 1);
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");
        let db = Database::connect(&path).await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('comics', 'pages') ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(tables, vec!["comics".to_string(), "pages".to_string()]);
        db.close().await;
        assert!(path.exists());
    }
}
