//! EXIF extraction into the JSON document stored with each photo.
//!
//! Top-level keys are tag names (or the numeric tag code when the tag is not
//! known), GPS tags are nested under `"GPSInfo"`. Maker notes are dropped.

use super::sanitize::{RawValue, sanitize};
use exif::{Context, Exif, Field, In, Reader, Tag, Value as ExifValue};
use serde_json::{Map, Value};
use std::io::Cursor;
use tracing::debug;

pub const GPS_INFO_KEY: &str = "GPSInfo";

/// Tags never copied into the metadata document.
const SKIPPED_TAGS: [Tag; 4] = [
    Tag::MakerNote,
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
];

/// Parse the EXIF block of an encoded image. A missing or unreadable block
/// yields `None`.
pub fn read_exif(data: &[u8]) -> Option<Exif> {
    match Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => Some(exif),
        Err(err) => {
            debug!(error = %err, "no readable EXIF block");
            None
        }
    }
}

/// Build the sanitized metadata document. Always returns a JSON object,
/// empty when the image carries no EXIF.
pub fn extract(exif: Option<&Exif>) -> Value {
    let Some(exif) = exif else {
        return Value::Object(Map::new());
    };

    let mut entries = Vec::new();
    let mut gps = Vec::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        if SKIPPED_TAGS.contains(&field.tag) {
            continue;
        }
        match field.tag.context() {
            Context::Tiff | Context::Exif => entries.push((tag_name(field.tag), raw_value(field))),
            Context::Gps => gps.push((tag_name(field.tag), raw_value(field))),
            _ => {}
        }
    }
    if !gps.is_empty() {
        entries.push((GPS_INFO_KEY.to_string(), RawValue::Map(gps)));
    }

    sanitize(&RawValue::Map(entries))
}

/// Orientation flag (1–8) of the primary image, if present.
pub fn orientation(exif: Option<&Exif>) -> Option<u32> {
    exif?
        .get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Human-readable tag name, or the numeric code for unknown tags.
fn tag_name(tag: Tag) -> String {
    match tag.description() {
        Some(_) => tag.to_string(),
        None => tag.number().to_string(),
    }
}

/// Map an EXIF field value onto `RawValue`. Single-component values become
/// scalars, multi-component values become sequences.
fn raw_value(field: &Field) -> RawValue {
    match &field.value {
        ExifValue::Byte(v) => collapse(v.iter().map(|&b| RawValue::Int(b.into()))),
        ExifValue::SByte(v) => collapse(v.iter().map(|&b| RawValue::Int(b.into()))),
        ExifValue::Short(v) => collapse(v.iter().map(|&n| RawValue::Int(n.into()))),
        ExifValue::SShort(v) => collapse(v.iter().map(|&n| RawValue::Int(n.into()))),
        ExifValue::Long(v) => collapse(v.iter().map(|&n| RawValue::Int(n.into()))),
        ExifValue::SLong(v) => collapse(v.iter().map(|&n| RawValue::Int(n.into()))),
        ExifValue::Float(v) => collapse(v.iter().map(|&f| RawValue::Float(f.into()))),
        ExifValue::Double(v) => collapse(v.iter().map(|&f| RawValue::Float(f))),
        ExifValue::Rational(v) => collapse(v.iter().map(|r| RawValue::Rational {
            num: r.num.into(),
            denom: r.denom.into(),
        })),
        ExifValue::SRational(v) => collapse(v.iter().map(|r| RawValue::Rational {
            num: r.num.into(),
            denom: r.denom.into(),
        })),
        ExifValue::Ascii(v) => collapse(v.iter().map(|s| {
            RawValue::Text(
                String::from_utf8_lossy(s)
                    .trim_end_matches('\0')
                    .to_string(),
            )
        })),
        ExifValue::Undefined(bytes, _) => RawValue::Bytes(bytes.clone()),
        ExifValue::Unknown(..) => RawValue::Text(field.display_value().to_string()),
    }
}

fn collapse(items: impl Iterator<Item = RawValue>) -> RawValue {
    let mut items: Vec<RawValue> = items.collect();
    if items.len() == 1 {
        items.remove(0)
    } else {
        RawValue::Seq(items)
    }
}
