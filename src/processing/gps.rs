//! Signed decimal coordinates from sanitized EXIF metadata.

use super::metadata::GPS_INFO_KEY;
use serde_json::Value;
use tracing::debug;

/// Resolve `(latitude, longitude)` from the `GPSInfo` entry of sanitized
/// metadata.
///
/// Latitude and longitude are degree/minute/second triples; a `GPSLatitudeRef`
/// of `"S"` or a `GPSLongitudeRef` of `"W"` makes the value negative. Missing
/// or malformed data yields `None`.
pub fn resolve(metadata: &Value) -> Option<(f64, f64)> {
    let gps = metadata.get(GPS_INFO_KEY)?;
    if gps.as_object().is_none_or(|map| map.is_empty()) {
        return None;
    }

    let coords = dms_entry(gps, "GPSLatitude", "GPSLatitudeRef", "S")
        .zip(dms_entry(gps, "GPSLongitude", "GPSLongitudeRef", "W"));
    if coords.is_none() {
        debug!("GPSInfo present but latitude/longitude could not be read");
    }
    coords
}

fn dms_entry(gps: &Value, key: &str, ref_key: &str, negative_ref: &str) -> Option<f64> {
    let degrees = to_degrees(gps.get(key)?)?;
    match gps.get(ref_key).and_then(Value::as_str) {
        Some(hemisphere) if hemisphere == negative_ref => Some(-degrees),
        _ => Some(degrees),
    }
}

/// `degrees + minutes / 60 + seconds / 3600` for an exact `[d, m, s]` triple.
fn to_degrees(value: &Value) -> Option<f64> {
    match value.as_array()?.as_slice() {
        [d, m, s] => Some(d.as_f64()? + m.as_f64()? / 60.0 + s.as_f64()? / 3600.0),
        _ => None,
    }
}
