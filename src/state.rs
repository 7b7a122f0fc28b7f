//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    models::bucket::BucketAccess,
    services::{
        gallery_service::GalleryService,
        storage::BucketStorage,
        storage_service::{StorageResult, StorageService},
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Albums, photos and the ingestion pipeline.
    pub gallery: GalleryService,
    /// Direct access to the object store, used for public media and probes.
    pub objects: StorageService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the object store, both gallery buckets and the gallery service
    /// from configuration. Buckets are created when missing.
    pub async fn build(db: Arc<SqlitePool>, config: AppConfig) -> StorageResult<Self> {
        let objects = StorageService::new(db.clone(), config.storage_dir.clone());

        let originals = BucketStorage::connect(
            objects.clone(),
            config.originals_bucket.clone(),
            BucketAccess::Private,
            config.public_base_url.clone(),
        )
        .await?;
        let public = BucketStorage::connect(
            objects.clone(),
            config.public_bucket.clone(),
            BucketAccess::PublicRead,
            config.public_base_url.clone(),
        )
        .await?;
        info!(
            originals = originals.bucket(),
            public = public.bucket(),
            "storage buckets ready"
        );

        let gallery = GalleryService::new(db, Arc::new(originals), Arc::new(public));
        Ok(Self {
            gallery,
            objects,
            config: Arc::new(config),
        })
    }
}
