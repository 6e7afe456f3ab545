use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BlockStore, BlockStoreError, StoredKey};
use crate::linked_data::{BlockKey, Cid};

/// One file per block, named by the base32 block key.
///
/// Writes go to a dot-prefixed temp file and are renamed into place, so
///  a reader never sees a partial block. Dot files are never listed.
#[derive(Debug, Clone)]
pub struct FsBlockStore {
    root: Arc<PathBuf>,
    tmp_counter: Arc<AtomicU64>,
}

impl FsBlockStore {
    /// Open (creating if needed) a block store rooted at `path`
    pub async fn open(path: &Path) -> Result<Self, BlockStoreError> {
        tracing::debug!("FsBlockStore::open called with path: {:?}", path);
        tokio::fs::create_dir_all(path).await?;
        Ok(Self {
            root: Arc::new(path.to_path_buf()),
            tmp_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn block_path(&self, cid: &Cid) -> PathBuf {
        self.root.join(BlockKey::from(cid).to_string())
    }

    fn tmp_path(&self, cid: &Cid) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{}.{}.tmp", BlockKey::from(cid), n))
    }
}

/// Write `data` to `tmp`, then rename it over `path`. On any failure the
///  temp file is removed, so no partial dot-file outlives the call.
pub(crate) async fn write_atomic(tmp: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let written = match tokio::fs::write(tmp, data).await {
        Ok(()) => tokio::fs::rename(tmp, path).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(tmp).await;
    }
    written
}

fn not_found(err: std::io::Error, cid: &Cid) -> BlockStoreError {
    if err.kind() == ErrorKind::NotFound {
        BlockStoreError::NotFound(*cid)
    } else {
        BlockStoreError::Io(err)
    }
}

#[async_trait]
impl BlockStore for FsBlockStore {
    async fn has(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        Ok(tokio::fs::try_exists(self.block_path(cid)).await?)
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        let data = tokio::fs::read(self.block_path(cid))
            .await
            .map_err(|e| not_found(e, cid))?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), BlockStoreError> {
        let path = self.block_path(cid);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(cid = %cid, "block already present, skipping write");
            return Ok(());
        }

        let tmp = self.tmp_path(cid);
        write_atomic(&tmp, &path, &data).await?;

        tracing::debug!(cid = %cid, size = data.len(), "block written");
        Ok(())
    }

    async fn delete(&self, cid: &Cid) -> Result<(), BlockStoreError> {
        tokio::fs::remove_file(self.block_path(cid))
            .await
            .map_err(|e| not_found(e, cid))
    }

    async fn list(&self) -> Result<Vec<StoredKey>, BlockStoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.as_path()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let key = match name.parse::<BlockKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "unparseable key in block store");
                    None
                }
            };
            keys.push(StoredKey { name, key });
        }

        Ok(keys)
    }

    async fn size(&self, cid: &Cid) -> Result<usize, BlockStoreError> {
        let metadata = tokio::fs::metadata(self.block_path(cid))
            .await
            .map_err(|e| not_found(e, cid))?;
        Ok(metadata.len() as usize)
    }
}
