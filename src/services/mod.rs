pub mod gallery_service;
pub mod storage;
pub mod storage_service;
