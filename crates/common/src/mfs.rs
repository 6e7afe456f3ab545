//! Pointer to the root of the mutable filesystem tree.
//!
//! The tree itself is maintained elsewhere; this store only needs to
//!  know its root so collection can protect it.

use anyhow::anyhow;
use bytes::Bytes;

use crate::datastore::{Datastore, DatastoreError, MFS_ROOT_KEY};
use crate::linked_data::Cid;

/// Current MFS root. `NotFound` means no tree has been created yet.
pub async fn root(datastore: &dyn Datastore) -> Result<Cid, DatastoreError> {
    let bytes = datastore.get(MFS_ROOT_KEY).await?;
    Cid::try_from(bytes.as_ref())
        .map_err(|e| DatastoreError::Default(anyhow!("invalid mfs root pointer: {}", e)))
}

pub async fn set_root(datastore: &dyn Datastore, cid: &Cid) -> Result<(), DatastoreError> {
    datastore
        .put(MFS_ROOT_KEY, Bytes::from(cid.to_bytes()))
        .await
}
