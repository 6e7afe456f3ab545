use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{Datastore, DatastoreError};

/// In-memory datastore, used by ephemeral repos and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    inner: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, key: &str) -> Result<Bytes, DatastoreError> {
        self.inner
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| DatastoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), DatastoreError> {
        self.inner.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DatastoreError> {
        self.inner.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let ds = MemoryDatastore::new();
        let err = ds.get("/local/filesroot").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let ds = MemoryDatastore::new();
        ds.put("/a", Bytes::from_static(b"1")).await.unwrap();
        assert_eq!(ds.get("/a").await.unwrap().as_ref(), b"1");

        ds.delete("/a").await.unwrap();
        ds.delete("/a").await.unwrap();
        assert!(ds.get("/a").await.unwrap_err().is_not_found());
    }
}
