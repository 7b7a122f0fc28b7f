//! Thumbnail and large-rendition generation.

use super::{metadata, orientation};
use bytes::Bytes;
use image::{
    DynamicImage, GenericImageView, ImageError, ImageReader, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use serde_json::Value;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("could not decode image: {0}")]
    Decode(#[source] ImageError),

    #[error("could not encode {variant}: {source}")]
    Encode {
        variant: &'static str,
        #[source]
        source: ImageError,
    },

    #[error("image has no pixels")]
    Empty,
}

/// Size and quality settings for the derived variants.
#[derive(Debug, Clone, Copy)]
pub struct VariantSettings {
    pub thumbnail_size: u32,
    pub thumbnail_quality: u8,
    pub large_max_width: u32,
    pub large_quality: u8,
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            thumbnail_size: 256,
            thumbnail_quality: 85,
            large_max_width: 2000,
            large_quality: 90,
        }
    }
}

/// Decode an encoded image, sniffing the format from its bytes.
pub fn decode(data: &[u8]) -> Result<DynamicImage, VariantError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| VariantError::Decode(ImageError::IoError(e)))?
        .decode()
        .map_err(VariantError::Decode)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(VariantError::Empty);
    }
    Ok(img)
}

/// Centered square crop: `(side, left, top)`, offsets floored.
pub fn crop_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    (side, (width - side) / 2, (height - side) / 2)
}

/// Target size of the large rendition. Images no wider than `max_width` keep
/// their dimensions.
pub fn large_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled as u32).max(1))
}

pub fn make_thumbnail(img: &DynamicImage, settings: &VariantSettings) -> DynamicImage {
    let (side, left, top) = crop_square(img.width(), img.height());
    img.crop_imm(left, top, side, side).resize_exact(
        settings.thumbnail_size,
        settings.thumbnail_size,
        FilterType::Lanczos3,
    )
}

pub fn make_large(img: &DynamicImage, settings: &VariantSettings) -> DynamicImage {
    let (width, height) = large_dimensions(img.width(), img.height(), settings.large_max_width);
    if (width, height) == img.dimensions() {
        return img.clone();
    }
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(
    img: &DynamicImage,
    quality: u8,
    variant: &'static str,
) -> Result<Bytes, VariantError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|source| VariantError::Encode { variant, source })?;
    Ok(Bytes::from(buf))
}

/// Result of running the pipeline over one original.
///
/// Parts that were not requested stay `None`. A failed variant is also
/// `None` and the first failure is kept in `error`.
#[derive(Debug, Default)]
pub struct Processed {
    pub metadata: Option<Value>,
    pub coordinates: Option<(f64, f64)>,
    pub thumbnail: Option<Bytes>,
    pub large: Option<Bytes>,
    pub error: Option<VariantError>,
}

/// What `process` should produce.
#[derive(Debug, Clone, Copy)]
pub struct Wanted {
    pub metadata: bool,
    pub thumbnail: bool,
    pub large: bool,
}

/// Run metadata extraction and variant generation over an encoded original.
///
/// Metadata never fails: an unreadable EXIF block gives an empty document.
/// The two variants are produced independently of each other.
pub fn process(data: &[u8], wanted: Wanted, settings: &VariantSettings) -> Processed {
    let exif = metadata::read_exif(data);
    let mut out = Processed::default();
    if wanted.metadata {
        let doc = metadata::extract(exif.as_ref());
        out.coordinates = super::gps::resolve(&doc);
        out.metadata = Some(doc);
    }

    if !wanted.thumbnail && !wanted.large {
        return out;
    }

    let img = match decode(data) {
        Ok(img) => orientation::apply(img, metadata::orientation(exif.as_ref())),
        Err(err) => {
            out.error = Some(err);
            return out;
        }
    };

    if wanted.thumbnail {
        let thumb = make_thumbnail(&img, settings);
        match encode_jpeg(&thumb, settings.thumbnail_quality, "thumbnail") {
            Ok(bytes) => out.thumbnail = Some(bytes),
            Err(err) => out.error = Some(err),
        }
    }
    if wanted.large {
        let large = make_large(&img, settings);
        match encode_jpeg(&large, settings.large_quality, "large") {
            Ok(bytes) => out.large = Some(bytes),
            Err(err) => {
                out.error.get_or_insert(err);
            }
        }
    }

    out
}
