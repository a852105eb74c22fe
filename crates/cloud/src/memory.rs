//! In-process object store.
//!
//! Keeps objects in a map and issues URLs under a configurable base. Each
//! step can be made to fail, which is how publication failures are
//! exercised in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::storage::{object_url, ObjectStore, StorageError, StoredObject};

/// A stored object as seen by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub public: bool,
}

#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    public_base_url: String,
    objects: Mutex<HashMap<String, MemoryObject>>,
    fail_put: AtomicBool,
    fail_set_public: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
            objects: Mutex::new(HashMap::new()),
            fail_put: AtomicBool::new(false),
            fail_set_public: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put` fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set_public` fail.
    pub fn fail_visibility(&self, fail: bool) {
        self.fail_set_public.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryObject>> {
        // A poisoned map is still a consistent map of complete objects.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "simulated upload failure".to_string(),
            });
        }

        self.lock().insert(
            key.to_string(),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
                public: false,
            },
        );

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }

    async fn set_public(&self, object: &StoredObject) -> Result<(), StorageError> {
        if self.fail_set_public.load(Ordering::SeqCst) {
            return Err(StorageError::Visibility {
                key: object.key.clone(),
                message: "simulated visibility failure".to_string(),
            });
        }

        match self.lock().get_mut(&object.key) {
            Some(stored) => {
                stored.public = true;
                Ok(())
            }
            None => Err(StorageError::Visibility {
                key: object.key.clone(),
                message: "no such object".to_string(),
            }),
        }
    }

    async fn public_url(&self, object: &StoredObject) -> Result<String, StorageError> {
        match self.lock().get(&object.key) {
            Some(stored) if stored.public => {
                object_url(&self.public_base_url, &object.bucket, &object.key)
            }
            Some(_) => Err(StorageError::Url {
                key: object.key.clone(),
                message: "object is not public".to_string(),
            }),
            None => Err(StorageError::Url {
                key: object.key.clone(),
                message: "no such object".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
