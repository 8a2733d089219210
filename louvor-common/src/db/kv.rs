//! Key-value storage backends
//!
//! The document store persists each collection as a JSON string under a
//! single key. Both backends expose the same four operations; the SQLite
//! backend is used by the running modules, the in-memory backend by tests
//! and ephemeral tooling.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage backend for the document store
///
/// Cloning is cheap: the SQLite variant clones the pool handle, the
/// in-memory variant clones the shared map.
#[derive(Clone)]
pub enum StorageBackend {
    /// Persistent storage in the `storage` table of the module database
    Sqlite(SqlitePool),
    /// Volatile storage in a process-local map
    Memory(Arc<Mutex<HashMap<String, String>>>),
}

impl StorageBackend {
    /// Create an empty in-memory backend
    pub fn memory() -> Self {
        StorageBackend::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Read the value stored under `key`
    ///
    /// Returns `None` if the key has never been written.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            StorageBackend::Sqlite(pool) => {
                let value: Option<String> =
                    sqlx::query_scalar("SELECT value FROM storage WHERE key = ?")
                        .bind(key)
                        .fetch_optional(pool)
                        .await?;
                Ok(value)
            }
            StorageBackend::Memory(map) => {
                let map = map
                    .lock()
                    .map_err(|_| Error::Internal("storage mutex poisoned".to_string()))?;
                Ok(map.get(key).cloned())
            }
        }
    }

    /// Write `value` under `key`, replacing any previous value
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            StorageBackend::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO storage (key, value, updated_at)
                    VALUES (?, ?, CURRENT_TIMESTAMP)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
                    "#,
                )
                .bind(key)
                .bind(value)
                .execute(pool)
                .await?;
                Ok(())
            }
            StorageBackend::Memory(map) => {
                let mut map = map
                    .lock()
                    .map_err(|_| Error::Internal("storage mutex poisoned".to_string()))?;
                map.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    /// Delete the value stored under `key`
    ///
    /// Deleting an absent key is not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        match self {
            StorageBackend::Sqlite(pool) => {
                sqlx::query("DELETE FROM storage WHERE key = ?")
                    .bind(key)
                    .execute(pool)
                    .await?;
                Ok(())
            }
            StorageBackend::Memory(map) => {
                let mut map = map
                    .lock()
                    .map_err(|_| Error::Internal("storage mutex poisoned".to_string()))?;
                map.remove(key);
                Ok(())
            }
        }
    }

    /// List all stored keys in ascending order
    pub async fn keys(&self) -> Result<Vec<String>> {
        match self {
            StorageBackend::Sqlite(pool) => {
                let keys: Vec<String> =
                    sqlx::query_scalar("SELECT key FROM storage ORDER BY key ASC")
                        .fetch_all(pool)
                        .await?;
                Ok(keys)
            }
            StorageBackend::Memory(map) => {
                let map = map
                    .lock()
                    .map_err(|_| Error::Internal("storage mutex poisoned".to_string()))?;
                let mut keys: Vec<String> = map.keys().cloned().collect();
                keys.sort();
                Ok(keys)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_storage_table;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_sqlite_backend() -> StorageBackend {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_storage_table(&pool).await.unwrap();
        StorageBackend::Sqlite(pool)
    }

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = StorageBackend::memory();

        assert_eq!(backend.get("usuarios").await.unwrap(), None);

        backend.set("usuarios", "[]").await.unwrap();
        assert_eq!(
            backend.get("usuarios").await.unwrap(),
            Some("[]".to_string())
        );

        backend.set("usuarios", "[{\"id\":\"u1\"}]").await.unwrap();
        assert_eq!(
            backend.get("usuarios").await.unwrap(),
            Some("[{\"id\":\"u1\"}]".to_string())
        );

        backend.remove("usuarios").await.unwrap();
        assert_eq!(backend.get("usuarios").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_backend_remove_absent_key() {
        let backend = StorageBackend::memory();
        backend.remove("nunca_escrito").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_backend_keys_sorted() {
        let backend = StorageBackend::memory();
        backend.set("musicas", "[]").await.unwrap();
        backend.set("escalas", "[]").await.unwrap();
        backend.set("usuarios", "[]").await.unwrap();

        let keys = backend.keys().await.unwrap();
        assert_eq!(keys, vec!["escalas", "musicas", "usuarios"]);
    }

    #[tokio::test]
    async fn test_sqlite_backend_roundtrip() {
        let backend = setup_sqlite_backend().await;

        assert_eq!(backend.get("ministerios").await.unwrap(), None);

        backend.set("ministerios", "[]").await.unwrap();
        assert_eq!(
            backend.get("ministerios").await.unwrap(),
            Some("[]".to_string())
        );

        // Upsert replaces the previous value
        backend
            .set("ministerios", "[{\"id\":\"m1\"}]")
            .await
            .unwrap();
        assert_eq!(
            backend.get("ministerios").await.unwrap(),
            Some("[{\"id\":\"m1\"}]".to_string())
        );

        backend.remove("ministerios").await.unwrap();
        assert_eq!(backend.get("ministerios").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_backend_keys_sorted() {
        let backend = setup_sqlite_backend().await;
        backend.set("usuarios", "[]").await.unwrap();
        backend.set("escalas", "[]").await.unwrap();

        let keys = backend.keys().await.unwrap();
        assert_eq!(keys, vec!["escalas", "usuarios"]);
    }
}
