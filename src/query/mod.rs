//! Query Module
//!
//! Schema-less filtering and sorting of JSON object records.
//!
//! ## Components
//! - `field`: partial-decode extraction of one string/int field
//! - `condition`: AND-combined find conditions (case-insensitive strings)
//! - `sort`: multi-key, stable, direction-aware ordering
//! - `budget`: deadline/cancellation checks during scans
//! - `executor`: bounded cursor scan tying the above together

pub mod field;
mod budget;
mod condition;
mod executor;
mod sort;

pub use budget::ScanBudget;
pub use condition::{evaluate, FindCondition, FindOp};
pub use executor::{get_all, query, QuerySpec, ScanOptions};
pub use field::{extract_int, extract_str, FieldValue};
pub use sort::{compare, sort_records, SortDir, SortKey};
