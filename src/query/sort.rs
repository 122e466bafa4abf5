//! Sort keys
//!
//! Orders records by a chain of fields. Each key carries a direction and a
//! comparison type; the first key that tells two records apart decides.
//!
//! String keys compare case-sensitively (plain byte order), unlike the
//! case-insensitive string filters in [`condition`](super::condition).
//! A field filtered with `Matches "tx"` may therefore still sort `"TX"`
//! before `"tx"`.

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;
use super::field;

/// Direction and comparison type of a [`SortKey`]
///
/// Wire codes: `AscString=0, DescString=1, AscInt=2, DescInt=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SortDir {
    #[default]
    AscString,
    DescString,
    AscInt,
    DescInt,
}

impl TryFrom<i64> for SortDir {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SortDir::AscString),
            1 => Ok(SortDir::DescString),
            2 => Ok(SortDir::AscInt),
            3 => Ok(SortDir::DescInt),
            other => Err(format!("invalid sort direction {}", other)),
        }
    }
}

impl From<SortDir> for i64 {
    fn from(dir: SortDir) -> Self {
        match dir {
            SortDir::AscString => 0,
            SortDir::DescString => 1,
            SortDir::AscInt => 2,
            SortDir::DescInt => 3,
        }
    }
}

impl FromStr for SortDir {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascstring" => Ok(SortDir::AscString),
            "desc" | "descstring" => Ok(SortDir::DescString),
            "ascint" => Ok(SortDir::AscInt),
            "descint" => Ok(SortDir::DescInt),
            other => Err(SiftError::Protocol(format!("unknown sort direction '{}'", other))),
        }
    }
}

impl SortDir {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortDir::DescString | SortDir::DescInt)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, SortDir::AscInt | SortDir::DescInt)
    }
}

/// One level of a multi-level sort order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    #[serde(rename = "fld", default)]
    pub field: String,

    #[serde(default)]
    pub dir: SortDir,
}

impl SortKey {
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDir::AscString)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDir::DescString)
    }

    /// Compare two records on this key alone (direction applied)
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let ord = if self.dir.is_int() {
            field::extract_int(a, &self.field).cmp(&field::extract_int(b, &self.field))
        } else {
            field::extract_str(a, &self.field).cmp(&field::extract_str(b, &self.field))
        };

        if self.dir.is_descending() {
            ord.reverse()
        } else {
            ord
        }
    }

    /// Extracted, direction-aware value of this key for one record
    fn value_of(&self, record: &[u8]) -> SortValue {
        match self.dir {
            SortDir::AscString => SortValue::Str(field::extract_str(record, &self.field)),
            SortDir::DescString => SortValue::RevStr(Reverse(field::extract_str(record, &self.field))),
            SortDir::AscInt => SortValue::Int(field::extract_int(record, &self.field)),
            SortDir::DescInt => SortValue::RevInt(Reverse(field::extract_int(record, &self.field))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.field, self.dir)
    }
}

impl FromStr for SortKey {
    type Err = SiftError;

    /// Parses `field:dir` (e.g. `city:desc`); a bare `field` sorts ascending
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((field, dir)) if !field.is_empty() => Ok(Self::new(field, dir.parse()?)),
            None if !s.is_empty() => Ok(Self::asc(s)),
            _ => Err(SiftError::Protocol(format!("sort key '{}' is not field:dir", s))),
        }
    }
}

/// Order two records by `keys`; `Equal` when every key ties
pub fn compare(a: &[u8], b: &[u8], keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| key.compare(a, b))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable sort of `records` by `keys`
///
/// Field values are extracted once per record rather than once per
/// comparison. The cached key orders exactly as [`compare`] does, and ties
/// keep their incoming order.
pub fn sort_records<T: AsRef<[u8]>>(records: &mut [T], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by_cached_key(|record| {
        keys.iter()
            .map(|key| key.value_of(record.as_ref()))
            .collect::<Vec<_>>()
    });
}

/// Cached sort value; each position of a key vector always holds the same
/// variant, so the derived ordering only ever compares like with like.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Str(String),
    RevStr(Reverse<String>),
    Int(i64),
    RevInt(Reverse<i64>),
}
