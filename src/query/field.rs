//! Field extraction
//!
//! Pulls one named field out of a JSON object record without building the
//! whole document. The top-level object is walked key by key: the wanted
//! key is compared in place, its value decoded as a scalar, and every other
//! value skipped with `IgnoredAny`.
//!
//! Nothing here fails. A missing field, a value of the wrong type or a
//! malformed record all produce the zero value (`""` or `0`), so one bad row
//! cannot abort a scan.

use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

/// Scalar value found under a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Field absent or record unreadable
    Missing,
    Str(String),
    Int(i64),
    /// Present, but neither a string nor an integer
    Other,
}

impl FieldValue {
    /// String payload, `""` for anything else
    pub fn into_string(self) -> String {
        match self {
            FieldValue::Str(s) => s,
            _ => String::new(),
        }
    }

    /// Integer payload, `0` for anything else
    pub fn as_int(&self) -> i64 {
        match self {
            FieldValue::Int(n) => *n,
            _ => 0,
        }
    }
}

/// String value of `field`, or `""`
pub fn extract_str(record: &[u8], field: &str) -> String {
    locate(record, field).into_string()
}

/// Integer value of `field`, or `0`
///
/// Only JSON integers in `i64` range count; floats and numeric strings
/// read as `0`.
pub fn extract_int(record: &[u8], field: &str) -> i64 {
    locate(record, field).as_int()
}

/// Find `field` in the top-level object of `record`
///
/// The whole record must be well-formed JSON; trailing garbage or a syntax
/// error anywhere yields `Missing` even if the field was already seen.
pub fn locate(record: &[u8], field: &str) -> FieldValue {
    let mut de = serde_json::Deserializer::from_slice(record);
    let found = FieldLocator { field }
        .deserialize(&mut de)
        .and_then(|value| de.end().map(|()| value));

    match found {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!("Unreadable record while extracting '{}': {}", field, e);
            FieldValue::Missing
        }
    }
}

// =============================================================================
// Partial Decoding
// =============================================================================

/// Walks the top-level object looking for one key
struct FieldLocator<'f> {
    field: &'f str,
}

impl<'de> DeserializeSeed<'de> for FieldLocator<'_> {
    type Value = FieldValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for FieldLocator<'_> {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object record")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut found = FieldValue::Missing;
        while let Some(is_target) = map.next_key_seed(KeyIs(self.field))? {
            // First occurrence wins; the rest of the object is still walked
            // so malformed content further on is detected.
            if is_target && found == FieldValue::Missing {
                found = map.next_value::<Scalar>()?.0;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

/// Compares a map key against the wanted name without allocating
struct KeyIs<'f>(&'f str);

impl<'de> DeserializeSeed<'de> for KeyIs<'_> {
    type Value = bool;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for KeyIs<'_> {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, key: &str) -> Result<bool, E> {
        Ok(key == self.0)
    }
}

/// Decodes a field value as string, integer or "something else"
struct Scalar(FieldValue);

impl<'de> de::Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor).map(Scalar)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Str(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        Ok(i64::try_from(v).map_or(FieldValue::Other, FieldValue::Int))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Other)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Other)
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Other)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldValue, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(FieldValue::Other)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldValue, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(FieldValue::Other)
    }
}
