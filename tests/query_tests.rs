//! Tests for the query components
//!
//! These tests verify:
//! - Find conditions per operator, AND semantics, case-insensitivity
//! - Unrecognized operators exclude the record
//! - Multi-key, direction-aware sorting with stable ties
//! - Query executor range bounds, filtering, ordering and cancellation

use std::cmp::Ordering;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytes::Bytes;
use siftkv::config::{Config, WalSyncStrategy};
use siftkv::error::SiftError;
use siftkv::query::{
    self, compare, evaluate, sort_records, FindCondition, FindOp, QuerySpec, ScanBudget,
    ScanOptions, SortDir, SortKey,
};
use siftkv::store::Store;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const PLANO: &[u8] = br#"{"id":"a1","city":"Plano","st":"TX","zip":75024,"address":"12 Elm"}"#;
const AUSTIN: &[u8] = br#"{"id":"a2","city":"Austin","st":"TX","zip":78701,"address":"9 Oak"}"#;
const PITTSBURGH: &[u8] = br#"{"id":"a3","city":"Pittsburgh","st":"pa","zip":15222,"address":"1 Main"}"#;

fn location_records() -> Vec<(&'static str, &'static str)> {
    vec![
        ("a1", r#"{"id":"a1","city":"Plano","st":"TX","zip":75024,"address":"12 Elm"}"#),
        ("a2", r#"{"id":"a2","city":"Austin","st":"TX","zip":78701,"address":"9 Oak"}"#),
        ("a3", r#"{"id":"a3","city":"Pittsburgh","st":"pa","zip":15222,"address":"1 Main"}"#),
        ("a4", r#"{"id":"a4","city":"Austin","st":"TX","zip":78702,"address":"3 Pine"}"#),
        ("a5", r#"{"id":"a5","city":"Erie","st":"PA","zip":16501,"address":"7 Lake"}"#),
        ("a6", r#"{"id":"a6","city":"Plano","st":"TX","zip":75023,"address":"5 Ash"}"#),
    ]
}

/// Store with a `location` bucket keyed by id
fn setup_location_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build();
    let store = Store::open(&config).unwrap();
    store
        .update(|txn| {
            txn.create_bucket("location")?;
            let mut bucket = txn.bucket_mut("location")?;
            for (key, rec) in location_records() {
                bucket.put(key.as_bytes(), rec.as_bytes())?;
            }
            Ok(())
        })
        .unwrap();
    (temp_dir, store)
}

fn ids(recs: &[Bytes]) -> Vec<String> {
    recs.iter().map(|r| query::extract_str(r, "id")).collect()
}

fn run(store: &Store, spec: &QuerySpec<'_>) -> Vec<String> {
    let txn = store.begin_read();
    ids(&query::query(&txn, spec, &ScanOptions::default()).unwrap())
}

// =============================================================================
// Condition Tests
// =============================================================================

#[test]
fn test_string_operators() {
    assert!(FindCondition::contains("city", "lan").test(PLANO));
    assert!(!FindCondition::contains("city", "xyz").test(PLANO));
    assert!(FindCondition::matches("city", "plano").test(PLANO));
    assert!(!FindCondition::matches("city", "plan").test(PLANO));
    assert!(FindCondition::starts_with("city", "pl").test(PLANO));
    assert!(!FindCondition::starts_with("city", "an").test(PLANO));
    assert!(FindCondition::string("city", FindOp::LessThanString, "b").test(AUSTIN));
    assert!(!FindCondition::string("city", FindOp::LessThanString, "austin").test(AUSTIN));
    assert!(FindCondition::string("city", FindOp::GreaterThanString, "b").test(PLANO));
    assert!(!FindCondition::string("city", FindOp::GreaterThanString, "plano").test(PLANO));
}

#[test]
fn test_int_operators() {
    assert!(FindCondition::int("zip", FindOp::LessThanInt, 75025).test(PLANO));
    assert!(!FindCondition::int("zip", FindOp::LessThanInt, 75024).test(PLANO));
    assert!(FindCondition::int("zip", FindOp::GreaterThanInt, 75023).test(PLANO));
    assert!(!FindCondition::int("zip", FindOp::GreaterThanInt, 75024).test(PLANO));
    assert!(FindCondition::equal_to("zip", 75024).test(PLANO));
    assert!(!FindCondition::equal_to("zip", 75025).test(PLANO));
}

#[test]
fn test_matches_is_case_insensitive() {
    // Record holds "pa"; operand "PA" still matches
    assert!(FindCondition::matches("st", "PA").test(PITTSBURGH));
    // Record holds "TX"; operand "tx" still matches
    assert!(FindCondition::matches("st", "tx").test(AUSTIN));
    assert!(FindCondition::contains("city", "USTI").test(AUSTIN));
    assert!(FindCondition::starts_with("city", "PITTS").test(PITTSBURGH));
}

#[test]
fn test_evaluate_is_and_of_conditions() {
    let cases = [
        vec![FindCondition::matches("st", "tx")],
        vec![FindCondition::matches("st", "tx"), FindCondition::contains("city", "pla")],
        vec![FindCondition::matches("st", "tx"), FindCondition::contains("city", "aus")],
        vec![
            FindCondition::matches("st", "tx"),
            FindCondition::int("zip", FindOp::GreaterThanInt, 70000),
            FindCondition::starts_with("address", "1"),
        ],
    ];

    for conditions in &cases {
        for record in [PLANO, AUSTIN, PITTSBURGH] {
            let expected = conditions.iter().all(|c| c.test(record));
            assert_eq!(evaluate(record, conditions), expected, "conditions {:?}", conditions);
        }
    }
}

#[test]
fn test_empty_condition_list_keeps_everything() {
    assert!(evaluate(PLANO, &[]));
    assert!(evaluate(b"not json at all", &[]));
}

#[test]
fn test_missing_field_is_zero_value() {
    // Absent string reads as "": it starts with and contains the empty operand
    assert!(FindCondition::starts_with("county", "").test(PLANO));
    assert!(!FindCondition::matches("county", "collin").test(PLANO));
    // Absent int reads as 0
    assert!(FindCondition::equal_to("population", 0).test(PLANO));
    assert!(FindCondition::int("population", FindOp::LessThanInt, 1).test(PLANO));
}

#[test]
fn test_wrong_type_is_zero_value() {
    // zip is an int: as a string it reads ""
    assert!(FindCondition::matches("zip", "").test(PLANO));
    // city is a string: as an int it reads 0
    assert!(FindCondition::equal_to("city", 0).test(PLANO));
}

#[test]
fn test_malformed_record_never_panics() {
    let broken: &[u8] = br#"{"id":"x1","city":"Plano""#;
    assert!(!FindCondition::matches("city", "plano").test(broken));
    assert!(FindCondition::equal_to("zip", 0).test(broken));
}

#[test]
fn test_unrecognized_operator_excludes_record() {
    let conditions = vec![
        FindCondition::matches("st", "tx"),
        FindCondition::string("city", FindOp::Unrecognized(42), "plano"),
    ];

    assert!(!evaluate(PLANO, &conditions));
}

#[test]
fn test_condition_from_str() {
    let c: FindCondition = "st:matches:tx".parse().unwrap();
    assert_eq!(c, FindCondition::matches("st", "tx"));

    let c: FindCondition = "zip:eqi:75024".parse().unwrap();
    assert_eq!(c, FindCondition::equal_to("zip", 75024));

    let c: FindCondition = "note:contains:a:b".parse().unwrap();
    assert_eq!(c.str_value, "a:b");

    assert!("zip:eqi:abc".parse::<FindCondition>().is_err());
    assert!("zip:bogus:1".parse::<FindCondition>().is_err());
    assert!("zip".parse::<FindCondition>().is_err());
}

// =============================================================================
// Sort Tests
// =============================================================================

#[test]
fn test_compare_single_key() {
    let asc = [SortKey::asc("city")];
    let desc = [SortKey::desc("city")];

    assert_eq!(compare(AUSTIN, PLANO, &asc), Ordering::Less);
    assert_eq!(compare(AUSTIN, PLANO, &desc), Ordering::Greater);
    assert_eq!(compare(PLANO, PLANO, &asc), Ordering::Equal);
}

#[test]
fn test_compare_int_keys() {
    let asc = [SortKey::new("zip", SortDir::AscInt)];
    let desc = [SortKey::new("zip", SortDir::DescInt)];

    // 15222 < 75024 numerically
    assert_eq!(compare(PITTSBURGH, PLANO, &asc), Ordering::Less);
    assert_eq!(compare(PITTSBURGH, PLANO, &desc), Ordering::Greater);
}

#[test]
fn test_int_sort_is_numeric_not_lexicographic() {
    let mut recs: Vec<&[u8]> = vec![&br#"{"n":100}"#[..], &br#"{"n":9}"#[..], &br#"{"n":20}"#[..]];
    sort_records(&mut recs, &[SortKey::new("n", SortDir::AscInt)]);

    let values: Vec<i64> = recs.iter().map(|r| query::extract_int(r, "n")).collect();
    assert_eq!(values, vec![9, 20, 100]);
}

#[test]
fn test_string_sort_is_case_sensitive() {
    let mut recs: Vec<&[u8]> = vec![&br#"{"s":"tx"}"#[..], &br#"{"s":"TX"}"#[..], &br#"{"s":"Tx"}"#[..]];
    sort_records(&mut recs, &[SortKey::asc("s")]);

    let values: Vec<String> = recs.iter().map(|r| query::extract_str(r, "s")).collect();
    assert_eq!(values, vec!["TX", "Tx", "tx"]);
}

#[test]
fn test_later_keys_break_ties() {
    let (_temp, store) = setup_location_store();
    let sort_keys = [SortKey::desc("city"), SortKey::asc("address")];

    let result = run(&store, &QuerySpec::all("location").sort_keys(&sort_keys));

    // Plano(12 Elm, 5 Ash), Pittsburgh, Erie, Austin(3 Pine, 9 Oak)
    assert_eq!(result, vec!["a1", "a6", "a3", "a5", "a4", "a2"]);
}

#[test]
fn test_sort_is_stable_on_full_ties() {
    let (_temp, store) = setup_location_store();
    let sort_keys = [SortKey::asc("st")];

    let result = run(&store, &QuerySpec::all("location").sort_keys(&sort_keys));

    // "PA" < "TX" < "pa"; ties keep ascending key order
    assert_eq!(result, vec!["a5", "a1", "a2", "a4", "a6", "a3"]);
}

#[test]
fn test_sort_records_agrees_with_compare() {
    let keys = [SortKey::desc("city"), SortKey::new("zip", SortDir::AscInt)];
    let mut recs: Vec<Bytes> = location_records()
        .into_iter()
        .map(|(_, r)| Bytes::from(r))
        .collect();

    sort_records(&mut recs, &keys);

    assert!(recs
        .windows(2)
        .all(|w| compare(&w[0], &w[1], &keys) != Ordering::Greater));
}

#[test]
fn test_sort_key_from_str() {
    assert_eq!("city:desc".parse::<SortKey>().unwrap(), SortKey::desc("city"));
    assert_eq!("city".parse::<SortKey>().unwrap(), SortKey::asc("city"));
    assert_eq!(
        "zip:descint".parse::<SortKey>().unwrap(),
        SortKey::new("zip", SortDir::DescInt)
    );
    assert!("zip:sideways".parse::<SortKey>().is_err());
}

// =============================================================================
// Executor Tests
// =============================================================================

#[test]
fn test_query_without_conditions_returns_key_order() {
    let (_temp, store) = setup_location_store();

    let result = run(&store, &QuerySpec::all("location"));

    assert_eq!(result, vec!["a1", "a2", "a3", "a4", "a5", "a6"]);
}

#[test]
fn test_query_range_is_inclusive() {
    let (_temp, store) = setup_location_store();

    let result = run(&store, &QuerySpec::all("location").range(Some(&b"a2"[..]), Some(&b"a4"[..])));

    assert_eq!(result, vec!["a2", "a3", "a4"]);
}

#[test]
fn test_query_open_ended_ranges() {
    let (_temp, store) = setup_location_store();

    assert_eq!(
        run(&store, &QuerySpec::all("location").range(Some(&b"a5"[..]), None)),
        vec!["a5", "a6"]
    );
    assert_eq!(
        run(&store, &QuerySpec::all("location").range(None, Some(&b"a1"[..]))),
        vec!["a1"]
    );
    assert!(run(&store, &QuerySpec::all("location").range(Some(&b"b"[..]), None)).is_empty());
}

#[test]
fn test_query_filters_then_sorts() {
    let (_temp, store) = setup_location_store();
    let conditions = [FindCondition::matches("st", "tx")];
    let sort_keys = [SortKey::asc("city"), SortKey::new("zip", SortDir::DescInt)];

    let result = run(
        &store,
        &QuerySpec::all("location")
            .conditions(&conditions)
            .sort_keys(&sort_keys),
    );

    assert_eq!(result, vec!["a4", "a2", "a1", "a6"]);
}

#[test]
fn test_query_range_applies_before_filter() {
    let (_temp, store) = setup_location_store();
    let conditions = [FindCondition::matches("st", "tx")];

    let result = run(
        &store,
        &QuerySpec::all("location")
            .range(Some(&b"a2"[..]), Some(&b"a5"[..]))
            .conditions(&conditions),
    );

    assert_eq!(result, vec!["a2", "a4"]);
}

#[test]
fn test_query_missing_bucket() {
    let (_temp, store) = setup_location_store();
    let txn = store.begin_read();

    let result = query::query(&txn, &QuerySpec::all("nope"), &ScanOptions::default());

    assert!(matches!(result, Err(SiftError::BucketNotFound(name)) if name == "nope"));
}

#[test]
fn test_query_results_outlive_transaction() {
    let (_temp, store) = setup_location_store();

    let recs = {
        let txn = store.begin_read();
        query::get_all(&txn, "location", None, None, &ScanOptions::default()).unwrap()
    };
    store.update(|txn| txn.delete_bucket("location")).unwrap();

    assert_eq!(recs.len(), 6);
    assert_eq!(&recs[0][..], PLANO);
}

#[test]
fn test_query_cancelled_by_flag() {
    let (_temp, store) = setup_location_store();
    let txn = store.begin_read();
    let options = ScanOptions {
        capacity_hint: 8,
        budget: ScanBudget::unbounded().with_cancel_flag(Arc::new(AtomicBool::new(true))),
    };

    let result = query::query(&txn, &QuerySpec::all("location"), &options);

    assert!(matches!(result, Err(SiftError::Cancelled(_))));
}

#[test]
fn test_query_deadline_exceeded() {
    let (_temp, store) = setup_location_store();
    let txn = store.begin_read();
    let options = ScanOptions {
        capacity_hint: 8,
        budget: ScanBudget::unbounded().with_timeout(Some(std::time::Duration::ZERO)),
    };

    let result = query::query(&txn, &QuerySpec::all("location"), &options);

    assert!(matches!(result, Err(SiftError::Cancelled(_))));
}

#[test]
fn test_empty_bucket_scan_is_ok() {
    let (_temp, store) = setup_location_store();
    store.update(|txn| txn.create_bucket("empty")).unwrap();
    let txn = store.begin_read();

    let recs = query::get_all(&txn, "empty", None, None, &ScanOptions::default()).unwrap();

    assert!(recs.is_empty());
}
