//! Benchmarks for SiftKV query operations

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use siftkv::config::Config;
use siftkv::engine::Engine;
use siftkv::protocol::{BktRequest, BucketOp, GetAllRequest, PutRequest, QryRequest, Request};
use siftkv::query::{evaluate, sort_records, FindCondition, FindOp, SortDir, SortKey};
use tempfile::TempDir;

const CITIES: [&str; 5] = ["Plano", "Austin", "Pittsburgh", "Erie", "Dallas"];
const STATES: [&str; 5] = ["TX", "TX", "PA", "PA", "TX"];

fn record(i: usize) -> Bytes {
    Bytes::from(format!(
        r#"{{"id":"k{:06}","city":"{}","st":"{}","zip":{},"note":"padding text for a realistic record"}}"#,
        i,
        CITIES[i % 5],
        STATES[i % 5],
        10_000 + (i * 7919) % 90_000
    ))
}

fn setup_engine(count: usize) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(Config::builder().data_dir(temp_dir.path()).build()).unwrap();
    engine.execute(&Request::Bkt(BktRequest {
        bucket: "location".to_string(),
        operation: BucketOp::Create,
    }));
    engine.execute(&Request::Put(PutRequest {
        bucket: "location".to_string(),
        key_field: "id".to_string(),
        recs: (0..count).map(record).collect(),
    }));
    (temp_dir, engine)
}

fn query_benchmarks(c: &mut Criterion) {
    let (_temp, engine) = setup_engine(10_000);

    let filtered_sorted = Request::Qry(QryRequest {
        bucket: "location".to_string(),
        find_conditions: vec![
            FindCondition::matches("st", "tx"),
            FindCondition::int("zip", FindOp::GreaterThanInt, 50_000),
        ],
        sort_flds: vec![SortKey::asc("city"), SortKey::new("zip", SortDir::DescInt)],
        start_key: None,
        end_key: None,
    });
    c.bench_function("qry_filter_sort_10k", |b| {
        b.iter(|| black_box(engine.execute(&filtered_sorted)))
    });

    let range = Request::GetAll(GetAllRequest {
        bucket: "location".to_string(),
        start_key: Some("k001000".to_string()),
        end_key: Some("k001999".to_string()),
    });
    c.bench_function("getall_range_1k", |b| b.iter(|| black_box(engine.execute(&range))));
}

fn evaluator_benchmarks(c: &mut Criterion) {
    let rec = record(42);
    let conditions = vec![
        FindCondition::contains("city", "aus"),
        FindCondition::int("zip", FindOp::LessThanInt, 99_999),
    ];
    c.bench_function("evaluate_two_conditions", |b| {
        b.iter(|| black_box(evaluate(&rec, &conditions)))
    });

    let records: Vec<Bytes> = (0..1_000).map(record).collect();
    let keys = vec![SortKey::desc("city"), SortKey::new("zip", SortDir::AscInt)];
    c.bench_function("sort_1k_two_keys", |b| {
        b.iter_batched(
            || records.clone(),
            |mut batch| sort_records(&mut batch, &keys),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, query_benchmarks, evaluator_benchmarks);
criterion_main!(benches);
