//! Represents a logical bucket, a top-level container for stored files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Who may read the objects of a bucket.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum BucketAccess {
    /// Only reachable through authenticated application routes.
    Private,
    /// Served anonymously by URL, no signed query required.
    PublicRead,
}

/// A storage bucket.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    /// Unique identifier for this bucket (UUID for internal DB use).
    pub id: Uuid,

    /// Bucket name (must conform to DNS naming rules).
    pub name: String,

    /// Access-control mode for the objects in this bucket.
    pub access: BucketAccess,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}
