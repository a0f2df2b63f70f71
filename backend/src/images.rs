use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::debug;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub modified: OffsetDateTime,
}

/// Object storage for costume images, addressed by slash-separated keys.
#[rocket::async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Images directly under `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredImage>, StoreError>;
}

/// Rejects keys that would escape the storage root.
fn checked_key(key: &str) -> Result<&Path, StoreError> {
    let path = Path::new(key);
    if key.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(StoreError::Storage(format!("Invalid object key: {key}")));
    }
    Ok(path)
}

pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[rocket::async_trait]
impl ImageStore for DiskImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.root.join(checked_key(key)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored image {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.root.join(checked_key(key)?);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.root.join(checked_key(key)?);
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredImage>, StoreError> {
        let dir = self.root.join(checked_key(prefix)?);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                images.push(StoredImage {
                    key: format!("{}/{}", prefix.trim_end_matches('/'), entry.file_name().to_string_lossy()),
                    modified: OffsetDateTime::from(metadata.modified()?),
                });
            }
        }
        images.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(images)
    }
}

#[derive(Debug, Default)]
pub struct MemoryImageStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, OffsetDateTime)>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, (Vec<u8>, OffsetDateTime)>>, StoreError> {
        self.objects.lock().map_err(|_| StoreError::LockFailed)
    }
}

#[rocket::async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        checked_key(key)?;
        self.objects()?.insert(key.to_string(), (bytes, OffsetDateTime::now_utc()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects()?.get(key).map(|(bytes, _)| bytes.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects()?.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredImage>, StoreError> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self.objects()?
            .iter()
            .filter(|(k, _)| k.strip_prefix(&dir).is_some_and(|rest| !rest.contains('/')))
            .map(|(key, (_, modified))| StoredImage { key: key.clone(), modified: *modified })
            .collect())
    }
}
