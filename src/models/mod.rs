//! Core data models for the gallery service.
//!
//! Buckets and objects describe the storage backend; albums and photos are
//! the gallery itself. All of them map to database tables via
//! `sqlx::FromRow` and serialize as JSON via `serde`.

pub mod album;
pub mod bucket;
pub mod object;
pub mod photo;
