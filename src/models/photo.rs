//! A photo belongs to exactly one album and references up to three stored
//! files: the original upload and two derived variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Photo {
    pub id: Uuid,
    pub album_id: Uuid,

    /// Display name, defaults to the uploaded filename.
    pub name: String,

    /// Key of the original upload in the private bucket.
    pub original_image: String,

    /// Key of the 256x256 thumbnail in the public bucket, once processed.
    pub thumbnail: Option<String>,

    /// Key of the width-capped rendition in the public bucket, once processed.
    pub large: Option<String>,

    /// Name of the uploading user, when known.
    pub author: Option<String>,

    /// Sanitized EXIF metadata.
    pub exif: Option<Json<Value>>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Photo {
    /// True once both derived variants have been stored.
    pub fn is_processed(&self) -> bool {
        self.thumbnail.is_some() && self.large.is_some()
    }
}

/// Public representation of a photo with resolved URLs.
#[derive(Serialize, Debug)]
pub struct PhotoView {
    pub id: Uuid,
    pub album_id: Uuid,
    pub name: String,
    pub original_url: String,
    pub thumbnail_url: Option<String>,
    pub large_url: Option<String>,
    pub author: Option<String>,
    pub exif: Option<Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}
