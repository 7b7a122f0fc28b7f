//! Conversion of raw metadata values into JSON-safe values.

use serde_json::{Map, Number, Value};

/// A metadata value as read from an image, before sanitizing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Seq(Vec<RawValue>),
    /// Ordered entries. A repeated key replaces the earlier value.
    Map(Vec<(String, RawValue)>),
    /// Fraction as stored by EXIF; the denominator may be zero.
    Rational { num: i64, denom: i64 },
    /// Opaque bytes (EXIF "undefined" type, vendor blobs).
    Bytes(Vec<u8>),
}

/// Convert `value` into a value made only of JSON types.
///
/// Primitives pass through, sequences and mappings are converted element by
/// element with their order kept. Anything else is turned into a number when
/// it has a finite floating-point value, and into text otherwise. Never fails.
pub fn sanitize(value: &RawValue) -> Value {
    match value {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Int(i) => Value::Number((*i).into()),
        RawValue::Float(f) => float_or_text(*f, || f.to_string()),
        RawValue::Text(s) => Value::String(s.clone()),
        RawValue::Seq(items) => Value::Array(items.iter().map(sanitize).collect()),
        RawValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), sanitize(item));
            }
            Value::Object(map)
        }
        RawValue::Rational { num, denom } => {
            let text = || format!("{}/{}", num, denom);
            if *denom == 0 {
                Value::String(text())
            } else {
                float_or_text(*num as f64 / *denom as f64, text)
            }
        }
        RawValue::Bytes(bytes) => {
            let parsed = std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse::<f64>().ok());
            match parsed {
                Some(f) => float_or_text(f, || bytes.escape_ascii().to_string()),
                None => Value::String(bytes.escape_ascii().to_string()),
            }
        }
    }
}

/// JSON has no NaN or infinities; those fall back to their text form.
fn float_or_text(f: f64, text: impl FnOnce() -> String) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(sanitize(&RawValue::Null), Value::Null);
        assert_eq!(sanitize(&RawValue::Bool(true)), json!(true));
        assert_eq!(sanitize(&RawValue::Int(-7)), json!(-7));
        assert_eq!(sanitize(&RawValue::Float(2.5)), json!(2.5));
        assert_eq!(sanitize(&RawValue::Text("Canon".into())), json!("Canon"));
    }

    #[test]
    fn test_nested_structure_is_preserved() {
        let raw = RawValue::Map(vec![
            ("Make".into(), RawValue::Text("Acme".into())),
            (
                "GPSInfo".into(),
                RawValue::Map(vec![(
                    "GPSLatitude".into(),
                    RawValue::Seq(vec![RawValue::Int(10), RawValue::Int(30), RawValue::Int(0)]),
                )]),
            ),
            ("Flags".into(), RawValue::Seq(vec![RawValue::Bool(false), RawValue::Null])),
        ]);

        let value = sanitize(&raw);
        assert_eq!(
            value,
            json!({
                "Make": "Acme",
                "GPSInfo": {"GPSLatitude": [10, 30, 0]},
                "Flags": [false, null],
            })
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["Make", "GPSInfo", "Flags"]);
    }

    #[test]
    fn test_rationals_become_floats() {
        assert_eq!(sanitize(&RawValue::Rational { num: 1, denom: 4 }), json!(0.25));
        assert_eq!(sanitize(&RawValue::Rational { num: -3, denom: 2 }), json!(-1.5));
    }

    #[test]
    fn test_unrepresentable_values_become_text() {
        assert_eq!(sanitize(&RawValue::Rational { num: 1, denom: 0 }), json!("1/0"));
        assert_eq!(sanitize(&RawValue::Float(f64::NAN)), json!("NaN"));
        assert_eq!(sanitize(&RawValue::Float(f64::INFINITY)), json!("inf"));
    }

    #[test]
    fn test_bytes_try_number_then_text() {
        assert_eq!(sanitize(&RawValue::Bytes(b"0230".to_vec())), json!(230.0));
        assert_eq!(
            sanitize(&RawValue::Bytes(vec![0x01, b'A', 0xff])),
            json!("\\x01A\\xff")
        );
    }

    #[test]
    fn test_repeated_map_key_keeps_last() {
        let raw = RawValue::Map(vec![
            ("k".into(), RawValue::Int(1)),
            ("k".into(), RawValue::Int(2)),
        ]);
        assert_eq!(sanitize(&raw), json!({"k": 2}));
    }
}
