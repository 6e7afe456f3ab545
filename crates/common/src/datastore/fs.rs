use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Datastore, DatastoreError};
use crate::block_store::write_atomic;

/// Datastore keeping one file per key under a root directory.
///  `/local/filesroot` lives at `<root>/local/filesroot`.
#[derive(Debug, Clone)]
pub struct FsDatastore {
    root: Arc<PathBuf>,
    tmp_counter: Arc<AtomicU64>,
}

impl FsDatastore {
    pub async fn open(path: &Path) -> Result<Self, DatastoreError> {
        tokio::fs::create_dir_all(path).await?;
        Ok(Self {
            root: Arc::new(path.to_path_buf()),
            tmp_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, DatastoreError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let valid = relative.components().count() > 0
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(DatastoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Unique sibling temp name; concurrent writers of one key never share it
    fn tmp_path(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", name, n))
    }
}

#[async_trait]
impl Datastore for FsDatastore {
    async fn get(&self, key: &str) -> Result<Bytes, DatastoreError> {
        match tokio::fs::read(self.key_path(key)?).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DatastoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), DatastoreError> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path(&path);
        write_atomic(&tmp, &path, &value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DatastoreError> {
        match tokio::fs::remove_file(self.key_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_roundtrip_nested_key() {
        let temp_dir = TempDir::new().unwrap();
        let ds = FsDatastore::open(temp_dir.path()).await.unwrap();

        assert!(ds.get("/local/pins").await.unwrap_err().is_not_found());
        ds.put("/local/pins", Bytes::from_static(b"root")).await.unwrap();
        assert_eq!(ds.get("/local/pins").await.unwrap().as_ref(), b"root");
        assert!(temp_dir.path().join("local").join("pins").exists());

        ds.delete("/local/pins").await.unwrap();
        assert!(ds.get("/local/pins").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let ds = FsDatastore::open(temp_dir.path()).await.unwrap();

        assert!(matches!(
            ds.get("/../etc/passwd").await,
            Err(DatastoreError::InvalidKey(_))
        ));
        assert!(matches!(
            ds.put("/", Bytes::new()).await,
            Err(DatastoreError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_puts_to_one_key() {
        let temp_dir = TempDir::new().unwrap();
        let ds = FsDatastore::open(temp_dir.path()).await.unwrap();

        let writers: Vec<_> = (0..16u8)
            .map(|i| {
                let ds = ds.clone();
                tokio::spawn(async move { ds.put("/local/filesroot", Bytes::from(vec![i])).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let value = ds.get("/local/filesroot").await.unwrap();
        assert_eq!(value.len(), 1);
        let leftovers = std::fs::read_dir(temp_dir.path().join("local"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }
}
