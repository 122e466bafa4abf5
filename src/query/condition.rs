//! Find conditions
//!
//! A condition tests one field of a record. A list of conditions is
//! AND-combined and stops at the first condition that fails.
//!
//! String operators compare case-insensitively: both the record value and
//! the operand are lower-cased first. This is fixed behaviour, not an
//! option.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;
use super::field;

/// Comparison operator of a [`FindCondition`]
///
/// Encoded on the wire as an integer, in declaration order starting at 0.
/// Codes outside that range decode to `Unrecognized` instead of failing the
/// request; such a condition never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FindOp {
    /// Record string value contains the operand
    #[default]
    Contains,
    /// Record string value equals the operand
    Matches,
    /// Record string value starts with the operand
    StartsWith,
    LessThanString,
    GreaterThanString,
    LessThanInt,
    GreaterThanInt,
    EqualToInt,
    Unrecognized(i64),
}

impl From<i64> for FindOp {
    fn from(code: i64) -> Self {
        match code {
            0 => FindOp::Contains,
            1 => FindOp::Matches,
            2 => FindOp::StartsWith,
            3 => FindOp::LessThanString,
            4 => FindOp::GreaterThanString,
            5 => FindOp::LessThanInt,
            6 => FindOp::GreaterThanInt,
            7 => FindOp::EqualToInt,
            other => FindOp::Unrecognized(other),
        }
    }
}

impl From<FindOp> for i64 {
    fn from(op: FindOp) -> Self {
        match op {
            FindOp::Contains => 0,
            FindOp::Matches => 1,
            FindOp::StartsWith => 2,
            FindOp::LessThanString => 3,
            FindOp::GreaterThanString => 4,
            FindOp::LessThanInt => 5,
            FindOp::GreaterThanInt => 6,
            FindOp::EqualToInt => 7,
            FindOp::Unrecognized(code) => code,
        }
    }
}

impl FromStr for FindOp {
    type Err = SiftError;

    /// Parses operator names as typed on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Ok(FindOp::Contains),
            "matches" | "eq" => Ok(FindOp::Matches),
            "startswith" | "prefix" => Ok(FindOp::StartsWith),
            "lessthanstring" | "lt" => Ok(FindOp::LessThanString),
            "greaterthanstring" | "gt" => Ok(FindOp::GreaterThanString),
            "lessthanint" | "lti" => Ok(FindOp::LessThanInt),
            "greaterthanint" | "gti" => Ok(FindOp::GreaterThanInt),
            "equaltoint" | "eqi" => Ok(FindOp::EqualToInt),
            other => Err(SiftError::Protocol(format!("unknown find operator '{}'", other))),
        }
    }
}

impl FindOp {
    /// Whether the operator reads the record's integer value
    pub fn is_int(&self) -> bool {
        matches!(
            self,
            FindOp::LessThanInt | FindOp::GreaterThanInt | FindOp::EqualToInt
        )
    }
}

/// One predicate over a single record field
///
/// Only one of `str_value`/`int_value` is read, depending on `op`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FindCondition {
    #[serde(rename = "fld", default)]
    pub field: String,

    #[serde(default)]
    pub op: FindOp,

    #[serde(rename = "valStr", default)]
    pub str_value: String,

    #[serde(rename = "valInt", default)]
    pub int_value: i64,
}

impl FindCondition {
    /// Condition with a string operand
    pub fn string(field: impl Into<String>, op: FindOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            str_value: value.into(),
            int_value: 0,
        }
    }

    /// Condition with an integer operand
    pub fn int(field: impl Into<String>, op: FindOp, value: i64) -> Self {
        Self {
            field: field.into(),
            op,
            str_value: String::new(),
            int_value: value,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::string(field, FindOp::Contains, value)
    }

    pub fn matches(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::string(field, FindOp::Matches, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::string(field, FindOp::StartsWith, value)
    }

    pub fn equal_to(field: impl Into<String>, value: i64) -> Self {
        Self::int(field, FindOp::EqualToInt, value)
    }

    /// Test this condition against one record
    pub fn test(&self, record: &[u8]) -> bool {
        match self.op {
            FindOp::Contains => self.test_str(record, |value, operand| value.contains(operand)),
            FindOp::Matches => self.test_str(record, |value, operand| value == operand),
            FindOp::StartsWith => self.test_str(record, |value, operand| value.starts_with(operand)),
            FindOp::LessThanString => self.test_str(record, |value, operand| value < operand),
            FindOp::GreaterThanString => self.test_str(record, |value, operand| value > operand),
            FindOp::LessThanInt => field::extract_int(record, &self.field) < self.int_value,
            FindOp::GreaterThanInt => field::extract_int(record, &self.field) > self.int_value,
            FindOp::EqualToInt => field::extract_int(record, &self.field) == self.int_value,
            FindOp::Unrecognized(code) => {
                tracing::error!("invalid find op {} on field '{}'", code, self.field);
                false
            }
        }
    }

    fn test_str(&self, record: &[u8], compare: impl FnOnce(&str, &str) -> bool) -> bool {
        let value = field::extract_str(record, &self.field).to_lowercase();
        let operand = self.str_value.to_lowercase();
        compare(&value, &operand)
    }
}

impl fmt::Display for FindCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.is_int() {
            write!(f, "{} {:?} {}", self.field, self.op, self.int_value)
        } else {
            write!(f, "{} {:?} {:?}", self.field, self.op, self.str_value)
        }
    }
}

impl FromStr for FindCondition {
    type Err = SiftError;

    /// Parses `field:op:value`, e.g. `st:matches:tx` or `companyId:eqi:2`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (field, op, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(field), Some(op), Some(value)) if !field.is_empty() => (field, op, value),
            _ => {
                return Err(SiftError::Protocol(format!(
                    "find condition '{}' is not field:op:value",
                    s
                )))
            }
        };

        let op: FindOp = op.parse()?;
        if op.is_int() {
            let value = value.parse::<i64>().map_err(|e| {
                SiftError::Protocol(format!("find condition '{}': {}", s, e))
            })?;
            Ok(Self::int(field, op, value))
        } else {
            Ok(Self::string(field, op, value))
        }
    }
}

/// AND of all conditions; an empty list keeps every record
pub fn evaluate(record: &[u8], conditions: &[FindCondition]) -> bool {
    conditions.iter().all(|condition| condition.test(record))
}
