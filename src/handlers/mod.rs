pub mod album_handlers;
pub mod health_handlers;
pub mod media_handlers;
pub mod photo_handlers;
