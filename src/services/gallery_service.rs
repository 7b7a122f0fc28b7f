//! src/services/gallery_service.rs
//!
//! GalleryService: albums and photos on top of SQLite, with the image
//! ingestion pipeline run in two explicit phases:
//! - `create_photo` stores the original and inserts the row
//! - `process_photo` extracts metadata and produces the derived variants
//!
//! Originals go to a private bucket, variants to a public-read one. Both are
//! injected as `Storage` handles.

use crate::{
    db::is_unique_violation,
    models::{
        album::{Album, AlbumUpdate, NewAlbum, slugify},
        photo::{Photo, PhotoView},
    },
    processing::variants::{self, VariantError, VariantSettings, Wanted},
    services::storage::Storage,
    services::storage_service::StorageError,
};
use bytes::Bytes;
use chrono::Utc;
use image::ImageFormat;
use serde::Serialize;
use sqlx::{SqlitePool, types::Json};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("album `{0}` not found")]
    AlbumNotFound(String),
    #[error("photo `{0}` not found")]
    PhotoNotFound(Uuid),
    #[error("an album with slug `{0}` already exists")]
    SlugConflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Image(#[from] VariantError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessOutcome {
    Processed,
    /// Both variants already existed; nothing was done.
    AlreadyProcessed,
}

#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    /// Set when the photo row was created but processing failed. Such a photo
    /// can be processed again later.
    pub photo_id: Option<Uuid>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub album: String,
    pub created: usize,
    pub photos: Vec<Uuid>,
    pub failures: Vec<UploadFailure>,
}

const ALBUM_COLUMNS: &str = "id, name, slug, description, date_created, date_updated";

const PHOTO_COLUMNS: &str = "id, album_id, name, original_image, thumbnail, large, author, exif, \
                             latitude, longitude, date_created, date_updated";

const VARIANT_CONTENT_TYPE: &str = "image/jpeg";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct GalleryService {
    db: Arc<SqlitePool>,
    originals: Arc<dyn Storage>,
    public: Arc<dyn Storage>,
    settings: VariantSettings,
}

impl GalleryService {
    pub fn new(db: Arc<SqlitePool>, originals: Arc<dyn Storage>, public: Arc<dyn Storage>) -> Self {
        Self {
            db,
            originals,
            public,
            settings: VariantSettings::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Albums
    // ---------------------------------------------------------------------

    /// Create an album. The slug defaults to `slugify(name)`.
    pub async fn create_album(&self, new: NewAlbum) -> GalleryResult<Album> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(GalleryError::InvalidInput("album name must not be empty".into()));
        }

        let slug = match new.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => {
                if slugify(slug) != slug {
                    return Err(GalleryError::InvalidInput(format!(
                        "slug `{}` is not URL-safe",
                        slug
                    )));
                }
                slug.to_string()
            }
            _ => slugify(name),
        };
        if slug.is_empty() {
            return Err(GalleryError::InvalidInput(format!(
                "cannot derive a slug from `{}`",
                name
            )));
        }

        let now = Utc::now();
        let album = sqlx::query_as::<_, Album>(&format!(
            "INSERT INTO albums ({cols}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {cols}",
            cols = ALBUM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&slug)
        .bind(new.description)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                GalleryError::SlugConflict(slug.clone())
            } else {
                GalleryError::Sqlx(err)
            }
        })?;

        info!(album = %album.slug, "created album");
        Ok(album)
    }

    /// Update name and description. The slug only changes when the stored
    /// one is empty, in which case it is derived from the (new) name.
    pub async fn update_album(&self, slug: &str, update: AlbumUpdate) -> GalleryResult<Album> {
        let album = self.get_album(slug).await?;

        let name = match update.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(GalleryError::InvalidInput("album name must not be empty".into()));
            }
            Some(name) => name.to_string(),
            None => album.name.clone(),
        };
        let description = update.description.or(album.description);
        let new_slug = if album.slug.is_empty() {
            slugify(&name)
        } else {
            album.slug.clone()
        };

        sqlx::query_as::<_, Album>(&format!(
            "UPDATE albums SET name = ?, slug = ?, description = ?, date_updated = ?
             WHERE id = ? RETURNING {}",
            ALBUM_COLUMNS
        ))
        .bind(&name)
        .bind(&new_slug)
        .bind(description)
        .bind(Utc::now())
        .bind(album.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                GalleryError::SlugConflict(new_slug.clone())
            } else {
                GalleryError::Sqlx(err)
            }
        })
    }

    /// All albums, newest first.
    pub async fn list_albums(&self) -> GalleryResult<Vec<Album>> {
        Ok(sqlx::query_as::<_, Album>(&format!(
            "SELECT {} FROM albums ORDER BY date_created DESC, rowid DESC",
            ALBUM_COLUMNS
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn get_album(&self, slug: &str) -> GalleryResult<Album> {
        sqlx::query_as::<_, Album>(&format!(
            "SELECT {} FROM albums WHERE slug = ?",
            ALBUM_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| GalleryError::AlbumNotFound(slug.to_string()))
    }

    async fn album_by_id(&self, id: Uuid) -> GalleryResult<Album> {
        sqlx::query_as::<_, Album>(&format!(
            "SELECT {} FROM albums WHERE id = ?",
            ALBUM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| GalleryError::AlbumNotFound(id.to_string()))
    }

    /// Delete an album together with its photos and their stored files.
    pub async fn delete_album(&self, slug: &str) -> GalleryResult<()> {
        let album = self.get_album(slug).await?;
        let photos = self.photos_of(&album).await?;
        for photo in &photos {
            self.remove_photo(photo).await?;
        }

        sqlx::query("DELETE FROM albums WHERE id = ?")
            .bind(album.id)
            .execute(&*self.db)
            .await?;

        info!(album = %album.slug, photos = photos.len(), "deleted album");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Photos
    // ---------------------------------------------------------------------

    /// Photos of an album, newest first.
    pub async fn list_photos(&self, album_slug: &str) -> GalleryResult<Vec<Photo>> {
        let album = self.get_album(album_slug).await?;
        self.photos_of(&album).await
    }

    async fn photos_of(&self, album: &Album) -> GalleryResult<Vec<Photo>> {
        Ok(sqlx::query_as::<_, Photo>(&format!(
            "SELECT {} FROM photos WHERE album_id = ? ORDER BY date_created DESC, rowid DESC",
            PHOTO_COLUMNS
        ))
        .bind(album.id)
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn get_photo(&self, id: Uuid) -> GalleryResult<Photo> {
        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {} FROM photos WHERE id = ?",
            PHOTO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(GalleryError::PhotoNotFound(id))
    }

    /// First phase of ingestion: store the original and insert the row.
    /// No image work happens here.
    pub async fn create_photo(
        &self,
        album: &Album,
        file: UploadFile,
        author: Option<String>,
    ) -> GalleryResult<Photo> {
        if file.data.is_empty() {
            return Err(GalleryError::InvalidInput(format!(
                "file `{}` is empty",
                file.filename
            )));
        }

        let ext = extension(&file.filename);
        let content_type = file
            .content_type
            .filter(|ct| !ct.is_empty())
            .or_else(|| {
                ext.and_then(ImageFormat::from_extension)
                    .map(|f| f.to_mime_type().to_string())
            })
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let key = storage_key(&album.slug, ext);
        let key = self.originals.save(&key, file.data, &content_type).await?;
        let name = if file.filename.trim().is_empty() {
            key.clone()
        } else {
            file.filename.trim().to_string()
        };

        let now = Utc::now();
        let inserted = sqlx::query_as::<_, Photo>(&format!(
            "INSERT INTO photos (id, album_id, name, original_image, author, date_created, date_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            PHOTO_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(album.id)
        .bind(&name)
        .bind(&key)
        .bind(author)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(photo) => {
                debug!(photo_id = %photo.id, key = %key, album = %album.slug, "stored original");
                Ok(photo)
            }
            Err(err) => {
                if let Err(cleanup) = self.originals.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "failed to remove orphaned original");
                }
                Err(GalleryError::Sqlx(err))
            }
        }
    }

    /// Second phase of ingestion: metadata, GPS and derived variants.
    ///
    /// Does nothing for a photo that already has both variants. Otherwise
    /// only the missing parts are produced. Whatever succeeded is saved in a
    /// single update before the first failure, if any, is returned.
    ///
    /// The update only applies while the variant columns still hold what was
    /// read at the start. When another run got there first, the variants
    /// produced here are removed again and the stored row is returned as
    /// `AlreadyProcessed`.
    pub async fn process_photo(&self, id: Uuid) -> GalleryResult<(Photo, ProcessOutcome)> {
        let photo = self.get_photo(id).await?;
        if photo.is_processed() {
            debug!(photo_id = %id, "photo already processed");
            return Ok((photo, ProcessOutcome::AlreadyProcessed));
        }

        let album = self.album_by_id(photo.album_id).await?;
        let original = self.originals.load(&photo.original_image).await?.data;

        let wanted = Wanted {
            metadata: photo.exif.is_none(),
            thumbnail: photo.thumbnail.is_none(),
            large: photo.large.is_none(),
        };
        let settings = self.settings;
        let processed = tokio::task::spawn_blocking(move || {
            variants::process(&original, wanted, &settings)
        })
        .await?;

        let mut failure: Option<GalleryError> = processed.error.map(GalleryError::from);
        let mut saved = Vec::new();

        let mut thumbnail = photo.thumbnail.clone();
        if let Some(bytes) = processed.thumbnail {
            match self.save_variant(&album.slug, bytes).await {
                Ok(key) => {
                    saved.push(key.clone());
                    thumbnail = Some(key);
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        let mut large = photo.large.clone();
        if let Some(bytes) = processed.large {
            match self.save_variant(&album.slug, bytes).await {
                Ok(key) => {
                    saved.push(key.clone());
                    large = Some(key);
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        let (exif, latitude, longitude) = match processed.metadata {
            Some(doc) => {
                if processed.coordinates.is_none() {
                    debug!(photo_id = %id, "no usable GPS data");
                }
                let (lat, lon) = processed.coordinates.unzip();
                (Some(Json(doc)), lat, lon)
            }
            None => (photo.exif.clone(), photo.latitude, photo.longitude),
        };

        let updated = sqlx::query_as::<_, Photo>(&format!(
            "UPDATE photos SET thumbnail = ?, large = ?, exif = ?, latitude = ?, longitude = ?,
                 date_updated = ?
             WHERE id = ? AND thumbnail IS ? AND large IS ? RETURNING {}",
            PHOTO_COLUMNS
        ))
        .bind(&thumbnail)
        .bind(&large)
        .bind(exif)
        .bind(latitude)
        .bind(longitude)
        .bind(Utc::now())
        .bind(id)
        .bind(&photo.thumbnail)
        .bind(&photo.large)
        .fetch_optional(&*self.db)
        .await;

        let updated = match updated {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.release_variants(id, &saved).await;
                let current = self.get_photo(id).await?;
                debug!(photo_id = %id, discarded = saved.len(), "photo updated concurrently");
                return Ok((current, ProcessOutcome::AlreadyProcessed));
            }
            Err(err) => {
                self.release_variants(id, &saved).await;
                return Err(GalleryError::Sqlx(err));
            }
        };

        if let Some(err) = failure {
            error!(photo_id = %id, error = %err, "photo processing failed");
            return Err(err);
        }

        info!(
            photo_id = %id,
            album = %album.slug,
            thumbnail = ?updated.thumbnail,
            large = ?updated.large,
            "processed photo"
        );
        Ok((updated, ProcessOutcome::Processed))
    }

    /// Best-effort removal of variants that never made it into the row.
    async fn release_variants(&self, photo_id: Uuid, keys: &[String]) {
        for key in keys {
            if let Err(err) = self.public.delete(key).await {
                warn!(
                    photo_id = %photo_id,
                    key = %key,
                    error = %err,
                    "failed to remove unused variant"
                );
            }
        }
    }

    async fn save_variant(&self, album_slug: &str, data: Bytes) -> GalleryResult<String> {
        let key = storage_key(album_slug, Some("jpg"));
        Ok(self.public.save(&key, data, VARIANT_CONTENT_TYPE).await?)
    }

    /// Create and process every file in turn. Failures are collected per
    /// file; a missing album fails the whole upload.
    pub async fn upload(
        &self,
        album_slug: &str,
        files: Vec<UploadFile>,
        author: Option<String>,
    ) -> GalleryResult<UploadReport> {
        let album = self.get_album(album_slug).await?;
        let mut report = UploadReport {
            album: album.slug.clone(),
            created: 0,
            photos: Vec::new(),
            failures: Vec::new(),
        };

        for file in files {
            let filename = file.filename.clone();
            let photo = match self.create_photo(&album, file, author.clone()).await {
                Ok(photo) => photo,
                Err(err) => {
                    warn!(album = %album.slug, filename = %filename, error = %err, "upload rejected");
                    report.failures.push(UploadFailure {
                        filename,
                        photo_id: None,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            report.created += 1;
            report.photos.push(photo.id);

            if let Err(err) = self.process_photo(photo.id).await {
                report.failures.push(UploadFailure {
                    filename,
                    photo_id: Some(photo.id),
                    error: err.to_string(),
                });
            }
        }

        info!(
            album = %report.album,
            created = report.created,
            failed = report.failures.len(),
            "upload finished"
        );
        Ok(report)
    }

    /// Delete the photo row, then release its stored files.
    pub async fn delete_photo(&self, id: Uuid) -> GalleryResult<()> {
        let photo = self.get_photo(id).await?;
        self.remove_photo(&photo).await
    }

    async fn remove_photo(&self, photo: &Photo) -> GalleryResult<()> {
        sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(photo.id)
            .execute(&*self.db)
            .await?;
        self.release_files(photo).await;
        Ok(())
    }

    /// Best-effort removal of the original, thumbnail and large files. Each
    /// delete is attempted regardless of the others.
    async fn release_files(&self, photo: &Photo) {
        let files = [
            (&self.originals, Some(&photo.original_image)),
            (&self.public, photo.thumbnail.as_ref()),
            (&self.public, photo.large.as_ref()),
        ];
        for (storage, key) in files {
            let Some(key) = key else { continue };
            match storage.delete(key).await {
                Ok(()) => debug!(photo_id = %photo.id, key = %key, "released file"),
                Err(err) => {
                    warn!(photo_id = %photo.id, key = %key, error = %err, "failed to release file")
                }
            }
        }
    }

    /// Bytes and content type of the original upload. The content type is the
    /// one recorded when the file was stored.
    pub async fn load_original(&self, photo: &Photo) -> GalleryResult<(Bytes, String)> {
        let stored = self.originals.load(&photo.original_image).await?;
        let content_type = stored
            .content_type
            .filter(|ct| !ct.is_empty())
            .or_else(|| {
                ImageFormat::from_path(&photo.original_image)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        Ok((stored.data, content_type))
    }

    pub fn photo_view(&self, photo: Photo) -> PhotoView {
        PhotoView {
            id: photo.id,
            album_id: photo.album_id,
            original_url: format!("/photos/{}/original", photo.id),
            thumbnail_url: photo.thumbnail.as_deref().and_then(|k| self.public.url(k)),
            large_url: photo.large.as_deref().and_then(|k| self.public.url(k)),
            name: photo.name,
            author: photo.author,
            exif: photo.exif.map(|Json(v)| v),
            latitude: photo.latitude,
            longitude: photo.longitude,
            date_created: photo.date_created,
            date_updated: photo.date_updated,
        }
    }
}

/// Extension of `filename` if it is a plain ASCII alphanumeric suffix.
fn extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// `photos/{album}/{random hex}[.{ext}]`
fn storage_key(album_slug: &str, ext: Option<&str>) -> String {
    let stem = Uuid::new_v4().simple();
    match ext {
        Some(ext) => format!("photos/{}/{}.{}", album_slug, stem, ext.to_ascii_lowercase()),
        None => format!("photos/{}/{}", album_slug, stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        processing::{
            metadata::tests::{jpeg_with_exif, sample_fields},
            variants::decode,
        },
        services::storage::memory::MemoryStorage,
    };
    use image::GenericImageView;
    use serde_json::json;

    struct Fixture {
        gallery: GalleryService,
        originals: MemoryStorage,
        public: MemoryStorage,
    }

    async fn fixture() -> Fixture {
        let originals = MemoryStorage::private();
        let public = MemoryStorage::public();
        let gallery = GalleryService::new(
            Arc::new(test_pool().await),
            Arc::new(originals.clone()),
            Arc::new(public.clone()),
        );
        Fixture {
            gallery,
            originals,
            public,
        }
    }

    async fn album(gallery: &GalleryService, name: &str) -> Album {
        gallery
            .create_album(NewAlbum {
                name: name.into(),
                ..NewAlbum::default()
            })
            .await
            .unwrap()
    }

    fn file(name: &str, data: Vec<u8>) -> UploadFile {
        UploadFile {
            filename: name.into(),
            content_type: Some("image/jpeg".into()),
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_storage_key_layout() {
        let key = storage_key("trip", Some("JPG"));
        let rest = key.strip_prefix("photos/trip/").unwrap();
        let (stem, ext) = rest.split_once('.').unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(ext, "jpg");
        assert_ne!(storage_key("trip", Some("jpg")), storage_key("trip", Some("jpg")));

        assert_eq!(extension("beach.png"), Some("png"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension("odd.j/pg"), None);
    }

    #[tokio::test]
    async fn test_create_album_derives_slug() {
        let f = fixture().await;
        let created = album(&f.gallery, "Summer Trip 2024").await;
        assert_eq!(created.slug, "summer-trip-2024");
        assert_eq!(f.gallery.get_album("summer-trip-2024").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_create_album_rejects_bad_slugs() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;

        let dup = f
            .gallery
            .create_album(NewAlbum {
                name: "Another".into(),
                slug: Some("trip".into()),
                description: None,
            })
            .await;
        assert!(matches!(dup, Err(GalleryError::SlugConflict(s)) if s == "trip"));

        let empty = f
            .gallery
            .create_album(NewAlbum {
                name: "!!!".into(),
                ..NewAlbum::default()
            })
            .await;
        assert!(matches!(empty, Err(GalleryError::InvalidInput(_))));

        let unsafe_slug = f
            .gallery
            .create_album(NewAlbum {
                name: "x".into(),
                slug: Some("Not A Slug".into()),
                description: None,
            })
            .await;
        assert!(matches!(unsafe_slug, Err(GalleryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_album_keeps_slug() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;
        let updated = f
            .gallery
            .update_album(
                "trip",
                AlbumUpdate {
                    name: Some("Renamed Trip".into()),
                    description: Some("beach days".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "trip");
        assert_eq!(updated.name, "Renamed Trip");
        assert_eq!(updated.description.as_deref(), Some("beach days"));
        assert!(updated.date_updated >= updated.date_created);
    }

    #[tokio::test]
    async fn test_update_album_fills_empty_slug() {
        let f = fixture().await;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO albums (id, name, slug, date_created, date_updated) VALUES (?, ?, '', ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind("Legacy")
        .bind(now)
        .bind(now)
        .execute(&*f.gallery.db)
        .await
        .unwrap();

        let updated = f
            .gallery
            .update_album(
                "",
                AlbumUpdate {
                    name: Some("Old Imports".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "old-imports");
    }

    #[tokio::test]
    async fn test_list_albums_newest_first() {
        let f = fixture().await;
        album(&f.gallery, "First").await;
        album(&f.gallery, "Second").await;
        let slugs: Vec<String> = f
            .gallery
            .list_albums()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.slug)
            .collect();
        assert_eq!(slugs, ["second", "first"]);
    }

    #[tokio::test]
    async fn test_upload_processes_photo_end_to_end() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;

        let data = jpeg_with_exif(400, 200, &sample_fields(6));
        let report = f
            .gallery
            .upload("trip", vec![file("beach.JPG", data)], Some("ana".into()))
            .await
            .unwrap();
        assert_eq!(report.album, "trip");
        assert_eq!(report.created, 1);
        assert!(report.failures.is_empty());

        let photos = f.gallery.list_photos("trip").await.unwrap();
        assert_eq!(photos.len(), 1);
        let photo = &photos[0];
        assert_eq!(photo.name, "beach.JPG");
        assert_eq!(photo.author.as_deref(), Some("ana"));
        assert!(photo.original_image.starts_with("photos/trip/"));
        assert!(photo.original_image.ends_with(".jpg"));
        assert!(f.originals.has_file(&photo.original_image));

        let thumb_key = photo.thumbnail.as_deref().unwrap();
        let large_key = photo.large.as_deref().unwrap();
        assert!(!thumb_key.is_empty() && !large_key.is_empty());
        assert_ne!(thumb_key, large_key);
        assert_ne!(thumb_key, photo.original_image);
        let thumb = decode(&f.public.get_file(thumb_key).unwrap()).unwrap();
        assert_eq!(thumb.dimensions(), (256, 256));
        let large = decode(&f.public.get_file(large_key).unwrap()).unwrap();
        assert_eq!(large.dimensions(), (200, 400));

        let exif = &photo.exif.as_ref().unwrap().0;
        assert!(exif.is_object());
        assert_eq!(exif["Make"], json!("Acme"));
        assert!(exif.get("MakerNote").is_none());
        assert_eq!(exif["GPSInfo"]["GPSLatitudeRef"], json!("S"));
        assert!((photo.latitude.unwrap() + 10.5).abs() < 1e-9);
        assert!((photo.longitude.unwrap() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_process_is_idempotent() {
        let f = fixture().await;
        let trip = album(&f.gallery, "Trip").await;
        let photo = f
            .gallery
            .create_photo(&trip, file("a.jpg", jpeg_with_exif(64, 48, &[])), None)
            .await
            .unwrap();
        assert!(photo.thumbnail.is_none() && photo.exif.is_none());

        let (first, outcome) = f.gallery.process_photo(photo.id).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Processed);
        assert_eq!(f.public.file_count(), 2);

        let (second, outcome) = f.gallery.process_photo(photo.id).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::AlreadyProcessed);
        assert_eq!(second.thumbnail, first.thumbnail);
        assert_eq!(f.public.file_count(), 2);
    }

    #[tokio::test]
    async fn test_process_fills_only_missing_variant() {
        let f = fixture().await;
        let trip = album(&f.gallery, "Trip").await;
        let photo = f
            .gallery
            .create_photo(&trip, file("a.jpg", jpeg_with_exif(64, 48, &[])), None)
            .await
            .unwrap();
        let (processed, _) = f.gallery.process_photo(photo.id).await.unwrap();

        sqlx::query("UPDATE photos SET large = NULL WHERE id = ?")
            .bind(photo.id)
            .execute(&*f.gallery.db)
            .await
            .unwrap();

        let (again, outcome) = f.gallery.process_photo(photo.id).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Processed);
        assert_eq!(again.thumbnail, processed.thumbnail);
        assert!(again.large.is_some());
        assert_ne!(again.large, processed.large);
        assert_eq!(again.exif.map(|j| j.0), processed.exif.map(|j| j.0));
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_reported() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;
        let report = f
            .gallery
            .upload(
                "trip",
                vec![file("notes.jpg", b"plain text".to_vec()), file("empty.jpg", vec![])],
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].photo_id, Some(report.photos[0]));
        assert!(report.failures[0].error.contains("decode"));
        assert_eq!(report.failures[1].photo_id, None);

        let photo = f.gallery.get_photo(report.photos[0]).await.unwrap();
        assert!(photo.thumbnail.is_none() && photo.large.is_none());
        assert_eq!(photo.exif.map(|j| j.0), Some(json!({})));
        assert!(photo.latitude.is_none());

        let again = f.gallery.process_photo(photo.id).await;
        assert!(matches!(again, Err(GalleryError::Image(VariantError::Decode(_)))));
    }

    #[tokio::test]
    async fn test_upload_to_missing_album() {
        let f = fixture().await;
        let err = f.gallery.upload("nope", vec![], None).await.unwrap_err();
        assert!(matches!(err, GalleryError::AlbumNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_photo_releases_all_files_despite_failures() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;
        let report = f
            .gallery
            .upload("trip", vec![file("a.jpg", jpeg_with_exif(32, 32, &[]))], None)
            .await
            .unwrap();
        let id = report.photos[0];
        let photo = f.gallery.get_photo(id).await.unwrap();

        f.originals.fail_deletes(true);
        f.public.fail_deletes(true);
        f.gallery.delete_photo(id).await.unwrap();

        let mut deleted = f.originals.delete_calls();
        deleted.extend(f.public.delete_calls());
        assert_eq!(deleted.len(), 3);
        assert!(deleted.contains(&photo.original_image));
        assert!(deleted.contains(photo.thumbnail.as_ref().unwrap()));
        assert!(deleted.contains(photo.large.as_ref().unwrap()));
        assert!(matches!(
            f.gallery.get_photo(id).await,
            Err(GalleryError::PhotoNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_album_cascades() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;
        f.gallery
            .upload(
                "trip",
                vec![
                    file("a.jpg", jpeg_with_exif(32, 32, &[])),
                    file("b.jpg", jpeg_with_exif(32, 32, &[])),
                ],
                None,
            )
            .await
            .unwrap();

        f.gallery.delete_album("trip").await.unwrap();
        assert_eq!(f.originals.file_count(), 0);
        assert_eq!(f.public.file_count(), 0);
        assert!(matches!(
            f.gallery.get_album("trip").await,
            Err(GalleryError::AlbumNotFound(_))
        ));
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos")
            .fetch_one(&*f.gallery.db)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn test_photo_view_urls() {
        let f = fixture().await;
        album(&f.gallery, "Trip").await;
        let report = f
            .gallery
            .upload("trip", vec![file("a.jpg", jpeg_with_exif(32, 32, &[]))], None)
            .await
            .unwrap();
        let photo = f.gallery.get_photo(report.photos[0]).await.unwrap();
        let thumb_key = photo.thumbnail.clone().unwrap();

        let view = f.gallery.photo_view(photo);
        assert_eq!(view.original_url, format!("/photos/{}/original", view.id));
        assert_eq!(view.thumbnail_url, Some(format!("/media/memory/{}", thumb_key)));
        assert!(view.large_url.is_some());
        assert_eq!(view.exif, Some(json!({})));
    }

    #[tokio::test]
    async fn test_load_original_content_type() {
        let f = fixture().await;
        let trip = album(&f.gallery, "Trip").await;
        let data = jpeg_with_exif(16, 16, &[]);
        let photo = f
            .gallery
            .create_photo(&trip, file("x.jpeg", data.clone()), None)
            .await
            .unwrap();
        let (bytes, content_type) = f.gallery.load_original(&photo).await.unwrap();
        assert_eq!(&bytes[..], &data[..]);
        assert_eq!(content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_load_original_uses_stored_content_type() {
        let f = fixture().await;
        let trip = album(&f.gallery, "Trip").await;
        let scan = UploadFile {
            filename: "scan".into(),
            content_type: Some("image/png".into()),
            data: Bytes::from_static(b"png bytes"),
        };
        let photo = f.gallery.create_photo(&trip, scan, None).await.unwrap();
        assert!(!photo.original_image.contains('.'));

        let (_, content_type) = f.gallery.load_original(&photo).await.unwrap();
        assert_eq!(content_type, "image/png");

        let mislabeled = UploadFile {
            filename: "photo.jpg".into(),
            content_type: Some("image/webp".into()),
            data: Bytes::from_static(b"webp bytes"),
        };
        let photo = f.gallery.create_photo(&trip, mislabeled, None).await.unwrap();
        let (_, content_type) = f.gallery.load_original(&photo).await.unwrap();
        assert_eq!(content_type, "image/webp");
    }

    #[tokio::test]
    async fn test_concurrent_processing_keeps_one_set_of_variants() {
        let f = fixture().await;
        let trip = album(&f.gallery, "Trip").await;
        let photo = f
            .gallery
            .create_photo(&trip, file("a.jpg", jpeg_with_exif(64, 48, &[])), None)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            f.gallery.process_photo(photo.id),
            f.gallery.process_photo(photo.id)
        );
        let (a, a_outcome) = a.unwrap();
        let (b, b_outcome) = b.unwrap();
        let processed = [a_outcome, b_outcome]
            .iter()
            .filter(|o| **o == ProcessOutcome::Processed)
            .count();
        assert_eq!(processed, 1);
        assert_eq!(a.thumbnail, b.thumbnail);
        assert_eq!(a.large, b.large);

        let stored = f.gallery.get_photo(photo.id).await.unwrap();
        assert_eq!(f.public.file_count(), 2);
        assert!(f.public.has_file(stored.thumbnail.as_deref().unwrap()));
        assert!(f.public.has_file(stored.large.as_deref().unwrap()));

        f.gallery.delete_photo(photo.id).await.unwrap();
        assert_eq!(f.public.file_count(), 0);
        assert_eq!(f.originals.file_count(), 0);
    }
}
