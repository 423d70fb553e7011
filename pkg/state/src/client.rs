use serde::Serialize;
use slatedb::Db;
use slatedb::object_store::ObjectStore;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::memory::InMemory;
use slatedb::object_store::path::Path;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::info;

use crate::lock::KeyLocks;
use crate::watch::{EventLog, EventType};
use pkg_constants::state::{EVENT_CHANNEL_CAPACITY, KEY_LOCK_STRIPES};

/// Persistent state store backed by SlateDB.
///
/// Every `put`/`delete` is also recorded in `event_log`, which is how
/// controllers learn about mutations. Writes to a key are serialized with
/// any [`KeyGuard`] held on it.
#[derive(Clone)]
pub struct StateStore {
    db: Db,
    locks: KeyLocks,
    pub event_log: EventLog,
}

/// Exclusive write access to one key for a read-check-write sequence.
///
/// Plain `put`/`delete` calls on the same key wait until the guard is
/// dropped. Do not call them on the guarded key while holding it.
pub struct KeyGuard {
    store: StateStore,
    key: String,
    _lock: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub async fn get(&self) -> anyhow::Result<Option<Vec<u8>>> {
        self.store.get(&self.key).await
    }

    pub async fn put(&self, value: &[u8]) -> anyhow::Result<()> {
        self.store.write(&self.key, value).await
    }

    pub async fn put_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let data = serde_json::to_vec(value)?;
        self.put(&data).await
    }

    pub async fn delete(&self) -> anyhow::Result<()> {
        self.store.remove(&self.key).await
    }
}

impl StateStore {
    /// Open (or create) a state store rooted at `path` on the local filesystem.
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        info!("Opening SlateDB state store at {}", path);

        // Ensure the data directory exists before opening the object store
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory {}: {}", path, e))?;

        let object_store = Arc::new(
            LocalFileSystem::new_with_prefix(path)
                .map_err(|e| anyhow::anyhow!("Failed to create local object store: {}", e))?,
        );
        Self::open(object_store).await
    }

    /// Open a store whose data lives only in memory. Used by tests.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::open(Arc::new(InMemory::new())).await
    }

    async fn open(object_store: Arc<dyn ObjectStore>) -> anyhow::Result<Self> {
        let db = Db::open(Path::from("/"), object_store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open SlateDB: {}", e))?;
        Ok(Self {
            db,
            locks: KeyLocks::new(KEY_LOCK_STRIPES),
            event_log: EventLog::new(EVENT_CHANNEL_CAPACITY),
        })
    }

    /// Take the write lock for `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let lock = self.locks.lock(key).await;
        KeyGuard {
            store: self.clone(),
            key: key.to_string(),
            _lock: lock,
        }
    }

    /// Store a value under the given key.
    pub async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.lock(key).await.put(value).await
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.lock(key).await.put_json(value).await
    }

    /// Retrieve the value for a key, or `None` if it does not exist.
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.db.get(key.as_bytes()).await {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("SlateDB get failed: {}", e)),
        }
    }

    /// Delete a key from the store.
    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.lock(key).await.delete().await
    }

    async fn write(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.db
            .put(key.as_bytes(), value)
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB put failed: {}", e))?;
        self.event_log.emit(EventType::Put, key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.db
            .delete(key.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB delete failed: {}", e))?;
        self.event_log.emit(EventType::Delete, key);
        Ok(())
    }

    /// List all key-value pairs whose keys start with `prefix`.
    /// Returns them as `(key_string, raw_bytes)`.
    pub async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
        let mut results = Vec::new();
        let mut iter = self
            .db
            .scan_prefix(prefix.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan_prefix failed: {}", e))?;

        while let Some(kv) = iter
            .next()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan failed: {}", e))?
        {
            let key = String::from_utf8_lossy(&kv.key).to_string();
            results.push((key, kv.value.to_vec()));
        }
        Ok(results)
    }

    /// Gracefully close the state store.
    pub async fn close(self) -> anyhow::Result<()> {
        info!("Closing SlateDB state store");
        self.db
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB close failed: {}", e))
    }
}
