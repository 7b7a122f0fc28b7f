//! An album groups photos under a URL-safe slug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Album {
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Unique, URL-safe identifier. Derived from `name` when not provided and
    /// never changed afterwards unless it is empty.
    pub slug: String,

    pub description: Option<String>,

    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Fields accepted when creating an album.
#[derive(Deserialize, Debug, Default)]
pub struct NewAlbum {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Fields accepted when updating an album. `None` leaves a field untouched.
#[derive(Deserialize, Debug, Default)]
pub struct AlbumUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Build a URL-safe slug from a display name.
///
/// Accented letters are folded to their ASCII base (NFKD, then combining
/// marks dropped). ASCII alphanumerics and underscores are kept lowercased,
/// runs of whitespace and hyphens become a single hyphen, and anything else
/// is dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.nfkd() {
        if !c.is_ascii() && !c.is_whitespace() {
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }
    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}
