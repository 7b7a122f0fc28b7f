//! Image ingestion building blocks: metadata extraction and sanitizing,
//! GPS resolution, orientation correction and variant generation.
//!
//! Everything here is synchronous and free of I/O so it can run inside
//! `spawn_blocking` and be tested without a runtime.

pub mod gps;
pub mod metadata;
pub mod orientation;
pub mod sanitize;
pub mod variants;
