use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::clients::ObjectStorage;
use crate::error::{ErrorKind, TransferResult};
use crate::types::ObjectRef;

/// In-memory object storage.
///
/// Objects are listed in key order.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<ObjectRef, Vec<u8>>>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `body` under `bucket`/`key`, replacing any previous content.
    pub async fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut objects = self.objects.lock().await;
        objects.insert(ObjectRef::new(bucket, key), body.into());
    }
}

impl ObjectStorage for MemoryObjectStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> TransferResult<Vec<ObjectRef>> {
        let objects = self.objects.lock().await;

        Ok(objects
            .keys()
            .filter(|object| object.bucket == bucket && object.key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object(&self, object: &ObjectRef) -> TransferResult<Vec<u8>> {
        let objects = self.objects.lock().await;

        match objects.get(object) {
            Some(body) => Ok(body.clone()),
            None => bail!(
                ErrorKind::ObjectStorageFailed,
                "Object not found",
                object.to_string()
            ),
        }
    }
}
