use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tempfile::TempDir;

use mesa::config::{Config, ConfigBuilder};
use mesa::database::{Database, DatabaseConfig};
use mesa::operations::{
    rank_candidates, AvailabilityRequest, IntakeOptions, ReleaseOptions, ReservationRequest,
};
use mesa::{
    Actor, Coordinator, FixedClock, FusionState, MemoryAuditSink, Origin, ReservationId, Role,
    Table, TableId, TableStatus, Zone, ZoneId,
};

const FLOOR_SIZES: &[u32] = &[10, 40, 120];
const BOOKED_SIZES: &[u32] = &[0, 50, 200];

type BenchCoordinator = Coordinator<FixedClock, MemoryAuditSink>;

fn service_time(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 20)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid service time")
}

fn manager() -> Actor {
    Actor::new("bench", Role::Manager)
}

fn benchmark_config() -> Config {
    ConfigBuilder::new()
        .skip_env()
        .skip_files()
        .build()
        .expect("failed to build benchmark configuration")
}

/// A floor of `tables` tables, every other one combinable, in two zones.
fn floor(tables: u32) -> Vec<Table> {
    (1..=tables)
        .map(|number| Table {
            id: TableId(i64::from(number)),
            number,
            zone_id: ZoneId(i64::from(number % 2) + 1),
            capacity: 2 + number % 4,
            max_combined_capacity: 12,
            combinable: number % 2 == 0,
            active: true,
            fusion: FusionState::Individual,
            status: TableStatus::Free,
            version: 0,
        })
        .collect()
}

fn setup_coordinator(tables: u32) -> (TempDir, BenchCoordinator) {
    let temp_dir = TempDir::new().expect("failed to create temporary directory");
    let db = Database::open(DatabaseConfig::new(temp_dir.path().join("mesa.db")))
        .expect("failed to open temporary database");
    let mut mesa = Coordinator::new(
        db,
        &benchmark_config(),
        FixedClock::new(service_time(10, 0)),
        MemoryAuditSink::new(),
    );

    let hall = mesa
        .add_zone(&Zone::new("hall", "Hall", 400).expect("valid zone"), &manager())
        .expect("failed to add zone");
    for number in 1..=tables {
        let table = Table::builder(number, hall.id, 2 + number % 4)
            .combinable(number % 2 == 0)
            .max_combined_capacity(12)
            .build()
            .expect("valid table");
        mesa.add_table(&table, &manager()).expect("failed to add table");
    }
    (temp_dir, mesa)
}

fn book(mesa: &mut BenchCoordinator, start: NaiveDateTime, index: u32) -> ReservationId {
    let request = ReservationRequest::new(format!("Guest {index}"), 2, start.date(), start.time())
        .with_phone(format!("6{index:08}"))
        .with_origin(Origin::Phone);
    mesa.create_reservation(IntakeOptions::new(request, manager()))
        .expect("failed to book")
        .reservation
        .id()
}

/// Books `count` reservations spread across the evening, each on a table.
fn populate(mesa: &mut BenchCoordinator, tables: u32, count: u32) {
    for index in 0..count {
        let start = service_time(19 + index % 4, (index % 2) * 30);
        let id = book(mesa, start, index);
        let table = mesa
            .table_by_number(index % tables + 1)
            .expect("seeded table");
        // overlaps once the floor is full
        let _ = mesa.assign_tables(id, vec![table.id], &manager());
    }
}

fn bench_rank_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_candidates");
    for &size in FLOOR_SIZES {
        let tables = floor(size);
        let busy: BTreeMap<TableId, ReservationId> = (1..=size / 3)
            .map(|n| (TableId(i64::from(n * 3)), ReservationId(1)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let ranked = rank_candidates(black_box(&tables), &busy, 8, Some(ZoneId(1)));
                black_box(ranked.len());
            });
        });
    }
    group.finish();
}

fn bench_find_candidate_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_candidate_tables");
    for &booked in BOOKED_SIZES {
        let (_temp_dir, mut mesa) = setup_coordinator(40);
        populate(&mut mesa, 40, booked);
        let date = service_time(0, 0).date();
        let time = service_time(20, 0).time();

        group.bench_with_input(BenchmarkId::from_parameter(booked), &booked, |b, _| {
            b.iter(|| {
                let candidates = mesa
                    .find_candidate_tables(&AvailabilityRequest::new(date, time, 4))
                    .expect("failed to search");
                black_box(candidates.len());
            });
        });
    }
    group.finish();
}

fn bench_assign_and_release(c: &mut Criterion) {
    c.bench_function("assign_and_release", |b| {
        b.iter_batched(
            || {
                let (temp_dir, mut mesa) = setup_coordinator(10);
                let id = book(&mut mesa, service_time(21, 0), 0);
                let tables = vec![mesa.table_by_number(2).expect("seeded table").id];
                (temp_dir, mesa, id, tables)
            },
            |(temp_dir, mut mesa, id, tables)| {
                let _temp_dir = temp_dir;
                let assigned = mesa
                    .assign_tables(id, tables, &manager())
                    .expect("failed to assign");
                black_box(assigned.capacity);
                let released = mesa
                    .release(ReleaseOptions::new(id, manager()))
                    .expect("failed to release");
                black_box(released.actions_taken);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    availability_bench,
    bench_rank_candidates,
    bench_find_candidate_tables,
    bench_assign_and_release
);
criterion_main!(availability_bench);
