//! Storage client used by the gallery: one handle per bucket, injected into
//! the services that need it.

use crate::{
    models::bucket::BucketAccess,
    services::storage_service::{StorageResult, StorageService},
};
use async_trait::async_trait;
use bytes::Bytes;

/// Payload of a stored object and the content type it was saved with.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// A single logical bucket of durable object storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key` and return the key it is retrievable by.
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Read the whole object stored under `key`.
    async fn load(&self, key: &str) -> StorageResult<StoredFile>;

    /// Delete the object stored under `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Anonymous URL for `key`, or `None` when the bucket is not public.
    fn url(&self, key: &str) -> Option<String>;
}

/// `Storage` bound to one bucket of the local object store.
#[derive(Clone)]
pub struct BucketStorage {
    service: StorageService,
    bucket: String,
    access: BucketAccess,
    base_url: String,
}

impl BucketStorage {
    /// Make sure the bucket exists with the requested access mode and return
    /// a client bound to it.
    pub async fn connect(
        service: StorageService,
        bucket: impl Into<String>,
        access: BucketAccess,
        base_url: impl Into<String>,
    ) -> StorageResult<Self> {
        let bucket = bucket.into();
        service.ensure_bucket(&bucket, access).await?;
        Ok(Self {
            service,
            bucket,
            access,
            base_url: base_url.into(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Storage for BucketStorage {
    async fn save(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        self.service
            .put_object(&self.bucket, key, Some(content_type.to_string()), data)
            .await?;
        Ok(key.to_string())
    }

    async fn load(&self, key: &str) -> StorageResult<StoredFile> {
        let (object, data) = self.service.read_object(&self.bucket, key).await?;
        Ok(StoredFile {
            data,
            content_type: object.content_type,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.service.delete_object(&self.bucket, key).await?;
        Ok(())
    }

    fn url(&self, key: &str) -> Option<String> {
        match self.access {
            BucketAccess::PublicRead => {
                Some(format!("{}/media/{}/{}", self.base_url, self.bucket, key))
            }
            BucketAccess::Private => None,
        }
    }
}

/// In-memory `Storage` used by service tests. Records delete calls and can be
/// told to fail them.
#[cfg(test)]
pub mod memory {
    use super::*;
    use crate::services::storage_service::StorageError;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    pub struct MemoryStorage {
        files: Arc<Mutex<HashMap<String, StoredFile>>>,
        deletes: Arc<Mutex<Vec<String>>>,
        fail_deletes: Arc<Mutex<bool>>,
        public: bool,
    }

    impl MemoryStorage {
        pub fn private() -> Self {
            Self::default()
        }

        pub fn public() -> Self {
            Self {
                public: true,
                ..Self::default()
            }
        }

        pub fn fail_deletes(&self, fail: bool) {
            *self.fail_deletes.lock().unwrap() = fail;
        }

        pub fn has_file(&self, key: &str) -> bool {
            self.files.lock().unwrap().contains_key(key)
        }

        pub fn get_file(&self, key: &str) -> Option<Bytes> {
            self.files.lock().unwrap().get(key).map(|f| f.data.clone())
        }

        pub fn file_count(&self) -> usize {
            self.files.lock().unwrap().len()
        }

        pub fn delete_calls(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn save(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
            let file = StoredFile {
                data,
                content_type: Some(content_type.to_string()),
            };
            self.files.lock().unwrap().insert(key.to_string(), file);
            Ok(key.to_string())
        }

        async fn load(&self, key: &str) -> StorageResult<StoredFile> {
            let file = self.files.lock().unwrap().get(key).cloned();
            file.ok_or_else(|| StorageError::ObjectNotFound {
                bucket: "memory".into(),
                key: key.to_string(),
            })
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.deletes.lock().unwrap().push(key.to_string());
            if *self.fail_deletes.lock().unwrap() {
                return Err(StorageError::Io(std::io::Error::other("delete refused")));
            }
            self.files.lock().unwrap().remove(key);
            Ok(())
        }

        fn url(&self, key: &str) -> Option<String> {
            self.public.then(|| format!("/media/memory/{}", key))
        }
    }
}
