use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};

/// Key the keyed-string store variant uses for the database image.
pub const BROWSER_IMAGE_KEY: &str = "alara_sqlite_db_bin";

/// File name the filesystem variant writes inside its data directory.
pub const DB_FILE_NAME: &str = "alara.sqlite";

/// Host-specific durable key/blob persistence.
///
/// Implementations are chosen once at construction time; call sites never
/// branch on the host environment. Saves are advisory: the caller logs a
/// failure and keeps running with its in-memory state as the source of
/// truth until the next successful save. Load errors are surfaced, so a
/// present-but-unreadable image is never silently replaced.
#[async_trait]
pub trait DurableBlobStore: Send + Sync {
    /// Returns the bytes stored under `key`, or `None` if nothing was saved.
    async fn load(&self, key: &str) -> Result<Option<Bytes>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    async fn save(&self, key: &str, bytes: Bytes) -> Result<()>;
}

/// Filesystem store: one fixed-name file inside a data directory that is
/// created on first save. Absent file reads as `None`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl DurableBlobStore for FsBlobStore {
    async fn load(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.file_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageUnavailable(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn save(&self, key: &str, bytes: Bytes) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::StorageUnavailable(format!("create {}: {e}", self.root.display()))
        })?;
        let path = self.file_path(key);
        // Write a sibling first so a concurrent reader never sees a torn file.
        let tmp = self.root.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("rename {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), "database image saved");
        Ok(())
    }
}

/// In-process keyed-string store with browser-profile semantics: values are
/// held as base64 text because the backing store only takes strings, and an
/// optional quota turns oversized saves into soft failures. Nothing survives
/// the process.
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Store that rejects any save whose encoded value exceeds `quota_bytes`,
    /// mimicking a browser profile running out of quota.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::StorageUnavailable("keyed store lock poisoned".into()))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableBlobStore for MemoryBlobStore {
    async fn load(&self, key: &str) -> Result<Option<Bytes>> {
        let encoded = match self.entries()?.get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| Error::StorageUnavailable(format!("stored value for {key}: {e}")))?;
        Ok(Some(Bytes::from(bytes)))
    }

    async fn save(&self, key: &str, bytes: Bytes) -> Result<()> {
        let encoded = BASE64.encode(&bytes);
        if let Some(quota) = self.quota_bytes {
            if encoded.len() > quota {
                return Err(Error::StorageUnavailable(format!(
                    "quota exceeded: {} > {quota} bytes for {key}",
                    encoded.len()
                )));
            }
        }
        debug!(key, bytes = bytes.len(), "database image saved");
        self.entries()?.insert(key.to_owned(), encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryBlobStore::new();
        store
            .save(BROWSER_IMAGE_KEY, Bytes::from_static(b"\x00\x01binary"))
            .await
            .unwrap();
        let loaded = store.load(BROWSER_IMAGE_KEY).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"\x00\x01binary"[..]));
    }

    #[tokio::test]
    async fn memory_store_missing_key_is_absent() {
        let store = MemoryBlobStore::new();
        assert!(store.load("nothing_here").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_quota_is_a_soft_failure() {
        let store = MemoryBlobStore::with_quota(8);
        let err = store
            .save(BROWSER_IMAGE_KEY, Bytes::from(vec![0u8; 64]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
        // Nothing was stored, the key still reads as absent.
        assert!(store.load(BROWSER_IMAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fs_store_creates_dir_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let store = FsBlobStore::new(&root);
        store
            .save(DB_FILE_NAME, Bytes::from_static(b"image-bytes"))
            .await
            .unwrap();
        assert!(root.join(DB_FILE_NAME).is_file());
        let loaded = store.load(DB_FILE_NAME).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"image-bytes"[..]));
    }

    #[tokio::test]
    async fn fs_store_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("data"));
        assert!(store.load(DB_FILE_NAME).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fs_store_overwrites_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("data"));
        store
            .save(DB_FILE_NAME, Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .save(DB_FILE_NAME, Bytes::from_static(b"second"))
            .await
            .unwrap();
        let loaded = store.load(DB_FILE_NAME).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"second"[..]));
    }
}
