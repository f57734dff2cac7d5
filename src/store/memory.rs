//! In-memory storage implementation

use super::snapshot::{self, SnapshotError};
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<String, String, BuildHasherDefault<SipHasher13>>;

/// In-memory key-value store
///
/// A single readers-writer lock guards the whole mapping: `get` and
/// `save_snapshot` take the read side, `set` and `load_snapshot` the write
/// side. The lock is tokio's fair RwLock, so a queued writer is not starved
/// by a stream of readers, and acquiring it is the only await point of every
/// operation except the snapshot file I/O.
pub struct KvStore {
    map: RwLock<StoreMap>,
}

impl KvStore {
    /// Create a new store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        KvStore {
            map: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            )),
        }
    }

    /// Get the current value of a key, `None` if it was never set
    pub async fn get(&self, key: &str) -> Option<String> {
        let map = self.map.read().await;
        map.get(key).cloned()
    }

    /// Insert a key or overwrite its value
    ///
    /// Once this returns, every subsequent `get` observes the new value.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let value_len = value.len();

        let mut map = self.map.write().await;
        let replaced = map.insert(key.clone(), value).is_some();
        debug!(key = %key, value_len, replaced, "set applied");
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write every entry to `path`, replacing its previous content
    ///
    /// The image is built under the read lock and written after the lock is
    /// released, so it reflects one instant without holding writers back for
    /// the duration of the disk I/O. Returns the number of entries saved.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();

        let (image, count) = {
            let map = self.map.read().await;
            let image = snapshot::encode_snapshot(map.iter()).map_err(SnapshotError::Encode)?;
            (image, map.len())
        };

        snapshot::write_atomic(path, &image).await?;
        info!("Saved {} entries to snapshot {:?} ({} bytes)", count, path, image.len());
        Ok(count)
    }

    /// Merge the snapshot at `path` into the mapping
    ///
    /// Holds the write lock for the whole operation. A missing file is not an
    /// error and leaves the store unchanged. The file is fully parsed before
    /// any entry is applied, so a malformed snapshot changes nothing.
    /// Returns the number of entries loaded.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();
        let mut map = self.map.write().await;

        let image = match snapshot::read_image(path).await? {
            Some(image) => image,
            None => {
                info!("No snapshot at {:?}, nothing to load", path);
                return Ok(0);
            }
        };

        let entries = snapshot::decode_snapshot(&image).map_err(|source| {
            SnapshotError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let count = entries.len();
        map.extend(entries);

        info!("Loaded {} entries from snapshot {:?}", count, path);
        Ok(count)
    }

    /// Hold the write lock, for tests that need a blocked store
    #[cfg(test)]
    pub(crate) async fn lock_exclusive(&self) -> tokio::sync::RwLockWriteGuard<'_, StoreMap> {
        self.map.write().await
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}
