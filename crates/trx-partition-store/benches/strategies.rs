//! Benchmark: partition lifecycle and insert strategy cost.
//!
//! Measures each step of the partitioned write path in isolation, then the
//! four insert strategies end to end:
//!
//! 1. **Unpartitioned**: plain insert into the flat table.
//! 2. **Partitioned**: insert into the parent; the child is created once
//!    during setup.
//! 3. **Partitioned dynamic**: child creation attempted before every insert.
//! 4. **Partitioned dynamic cached**: child creation only on a cache miss.
//!
//! Every insert targets the same day, so strategy 4 measures the steady-state
//! cache hit. Runs against `MemoryStore` by default; with `--features
//! pg-tests` and `DATABASE_URL` set, the same groups also run against
//! PostgreSQL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tokio::runtime::Runtime;

use trx_partition_core::{PartitionName, Transaction};
use trx_partition_store::{
    InsertStrategy, Ledger, MemoryStore, PartitionCache, PartitionManager, RecordStore,
};

// ─── Fixtures ───────────────────────────────────────────────────────────

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn at(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
}

fn memory_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()
}

/// Build a ledger with both tables and `day`'s child table in place.
///
/// The child is created on the backend directly, so the ledger's cache
/// starts cold and the cached strategy pays exactly one miss.
fn prepared_ledger<B>(rt: &Runtime, backend: Arc<B>, day: NaiveDate) -> Ledger
where
    B: PartitionManager + RecordStore + 'static,
{
    rt.block_on(async {
        backend.ensure_base_table().await.unwrap();
        backend.ensure_parent_table().await.unwrap();
        backend.ensure_child_table(day).await.unwrap();
    });
    Ledger::new(backend, PartitionCache::new())
}

fn criterion_config() -> Criterion {
    Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .configure_from_args()
}

// ─── Naming ─────────────────────────────────────────────────────────────

fn bench_naming(c: &mut Criterion) {
    let mut group = c.benchmark_group("naming");
    let day = memory_day();

    group.bench_function("partition_name_for_date", |b| {
        b.iter(|| PartitionName::for_date(std::hint::black_box(day)));
    });

    group.bench_function("sample_transaction", |b| {
        let at = at(day);
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            Transaction::sample(i, "1", at)
        });
    });

    group.finish();
}

// ─── Schema ─────────────────────────────────────────────────────────────

fn bench_schema<B>(c: &mut Criterion, label: &str, rt: &Runtime, backend: &Arc<B>, day: NaiveDate)
where
    B: PartitionManager + RecordStore + 'static,
{
    let mut group = c.benchmark_group(format!("schema/{label}"));

    group.bench_function("ensure_base_table", |b| {
        b.iter(|| rt.block_on(backend.ensure_base_table()).unwrap());
    });

    group.bench_function("ensure_parent_table", |b| {
        b.iter(|| rt.block_on(backend.ensure_parent_table()).unwrap());
    });

    // Repeated creation of one day: every call after the first is a no-op DDL.
    group.bench_function("ensure_child_table", |b| {
        b.iter(|| rt.block_on(backend.ensure_child_table(day)).unwrap());
    });

    let name = PartitionName::for_date(day);
    group.bench_function("child_table_exists", |b| {
        b.iter(|| {
            let exists = rt.block_on(backend.child_table_exists(&name)).unwrap();
            assert!(exists);
        });
    });

    group.finish();
}

// ─── Inserts ────────────────────────────────────────────────────────────

fn bench_inserts<B>(c: &mut Criterion, label: &str, rt: &Runtime, backend: &Arc<B>, day: NaiveDate)
where
    B: PartitionManager + RecordStore + 'static,
{
    let mut group = c.benchmark_group(format!("insert/{label}"));
    group.throughput(Throughput::Elements(1));
    let at = at(day);

    for strategy in InsertStrategy::ALL {
        // Fresh cache per strategy so the cached path starts cold.
        let ledger = prepared_ledger(rt, Arc::clone(backend), day);

        let mut i = 0usize;
        group.bench_function(strategy.as_str(), |b| {
            b.iter_batched(
                || {
                    i += 1;
                    Transaction::sample(i, "1", at)
                },
                |trx| {
                    let stored = rt.block_on(ledger.insert(strategy, &trx)).unwrap();
                    assert_eq!(stored.id, trx.id);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ─── Backends ───────────────────────────────────────────────────────────

fn bench_memory(c: &mut Criterion) {
    let rt = runtime();
    let day = memory_day();

    let backend = Arc::new(MemoryStore::new());
    prepared_ledger(&rt, Arc::clone(&backend), day);
    bench_schema(c, "memory", &rt, &backend, day);
    bench_inserts(c, "memory", &rt, &backend, day);
}

#[cfg(feature = "pg-tests")]
fn bench_postgres(c: &mut Criterion) {
    use trx_partition_store::{PgConfig, PgStore};

    let rt = runtime();
    let day = NaiveDate::from_ymd_opt(2032, 1, 1).unwrap();

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for pg-tests");
    let backend = rt.block_on(async {
        let store = PgStore::connect(&PgConfig {
            url,
            ..PgConfig::default()
        })
        .await
        .unwrap();
        Arc::new(store)
    });

    prepared_ledger(&rt, Arc::clone(&backend), day);
    bench_schema(c, "postgres", &rt, &backend, day);
    bench_inserts(c, "postgres", &rt, &backend, day);
}

#[cfg(not(feature = "pg-tests"))]
criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_naming, bench_memory
}

#[cfg(feature = "pg-tests")]
criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_naming, bench_memory, bench_postgres
}

criterion_main!(benches);
