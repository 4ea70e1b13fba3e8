//! services/app/src/adapters/kv_store.rs
//!
//! This module contains the storage adapter, the concrete implementation of the
//! `KeyValueStore` port from the `core` crate. Values are opaque serialized text
//! kept in a single SQLite table managed with `sqlx`.

use async_trait::async_trait;
use juriscan_core::ports::{KeyValueStore, PortError, PortResult};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `KeyValueStore` port.
#[derive(Clone)]
pub struct SqliteKvAdapter {
    pool: SqlitePool,
}

impl SqliteKvAdapter {
    /// Creates a new `SqliteKvAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a private in-memory store. Used by tests.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        // Every connection to `sqlite::memory:` is a separate database, so keep one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run storage migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(FromRow)]
struct ValueRecord {
    value: String,
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for SqliteKvAdapter {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, ValueRecord>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE
            SET value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteKvAdapter {
        let store = SqliteKvAdapter::in_memory().await.unwrap();
        store.run_migrations().await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        assert_eq!(store().await.get("juriscan_theme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_and_remove_deletes() {
        let store = store().await;
        store.set("juriscan_theme", "light").await.unwrap();
        store.set("juriscan_theme", "dark").await.unwrap();
        assert_eq!(store.get("juriscan_theme").await.unwrap().as_deref(), Some("dark"));

        store.remove("juriscan_theme").await.unwrap();
        assert_eq!(store.get("juriscan_theme").await.unwrap(), None);
        // Removing twice is fine.
        store.remove("juriscan_theme").await.unwrap();
    }
}
