//! `SQLite` storage backend.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{AccountBackend, PreferenceStore};
use crate::Result;

/// Backend storing accounts, metadata and preferences in `SQLite`.
///
/// Account names are the primary key of `accounts`, so a name registered
/// under one account type cannot be registered under another.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) the database at the given path.
    ///
    /// Creates the tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let backend = Self { pool };
        backend.initialize().await?;
        debug!("Opened account database at {database_path}");
        Ok(backend)
    }

    /// Create an in-memory backend for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let backend = Self { pool };
        backend.initialize().await?;
        Ok(backend)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                name TEXT PRIMARY KEY NOT NULL,
                account_type TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS account_metadata (
                account_name TEXT NOT NULL REFERENCES accounts(name) ON DELETE CASCADE,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (account_name, key)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl AccountBackend for SqliteBackend {
    async fn list_accounts(&self, account_type: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT name FROM accounts
            WHERE account_type = ?
            ORDER BY rowid ASC
            ",
        )
        .bind(account_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn create_account(&self, account_type: &str, name: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO accounts (name, account_type) VALUES (?, ?)")
            .bind(name)
            .bind(account_type)
            .execute(&self.pool)
            .await?;

        let created = result.rows_affected() == 1;
        if created {
            debug!("Inserted account row {name}");
        }
        Ok(created)
    }

    async fn delete_account(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM account_metadata WHERE account_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM accounts WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Deleted account row {name}");
        Ok(())
    }

    async fn metadata(&self, name: &str, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM account_metadata WHERE account_name = ? AND key = ?")
            .bind(name)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set_metadata(&self, name: &str, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO account_metadata (account_name, key, value)
            VALUES (?, ?, ?)
            ON CONFLICT(account_name, key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(name)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl PreferenceStore for SqliteBackend {
    async fn string(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO preferences (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
