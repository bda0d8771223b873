// Partcustid packer hot-path benchmarks.

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use warehouse_sim::master_data::{MasterData, WorkstationCapacityRow};
use warehouse_sim::packer::{pack, PartcustidGroup};
use warehouse_sim::station::StationPool;

fn pool_with(floor: u8, fixed: u32, temp: u32) -> StationPool {
    let mut md = MasterData::new();
    md.add_station_capacity(WorkstationCapacityRow { floor, fixed_stations: fixed, temp_stations: temp });
    StationPool::build(&md)
}

fn groups_of(n: usize, minutes: f64) -> Vec<PartcustidGroup> {
    (0..n)
        .map(|i| PartcustidGroup {
            partcustid: format!("CUST{i}"),
            task_ids: vec![format!("T{i}")],
            workload_minutes: minutes,
        })
        .collect()
}

fn bench_pack_small_wave(c: &mut Criterion) {
    let mut group = c.benchmark_group("packer_small_wave");
    let pool = pool_with(3, 20, 10);

    group.bench_function("12_groups_fit_one_station", |b| {
        let groups = groups_of(12, 2.0);
        b.iter(|| {
            let used = HashSet::new();
            let result = pack(black_box(&pool), 3, groups.clone(), 12, 30.0, &used);
            black_box(result)
        });
    });

    group.finish();
}

fn bench_pack_by_wave_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("packer_by_wave_size");
    let pool = pool_with(3, 30, 20);

    for &n in &[10usize, 50, 200, 500] {
        group.bench_with_input(BenchmarkId::new("partcustids", n), &n, |b, &n| {
            let groups = groups_of(n, 3.0);
            b.iter(|| {
                let used = HashSet::new();
                let result = pack(black_box(&pool), 3, groups.clone(), 12, 30.0, &used);
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_pack_capacity_exhausted(c: &mut Criterion) {
    let mut group = c.benchmark_group("packer_capacity_exhausted");
    let pool = pool_with(3, 2, 0);

    group.bench_function("far_more_groups_than_stations", |b| {
        let groups = groups_of(200, 25.0);
        b.iter(|| {
            let used = HashSet::new();
            let result = pack(black_box(&pool), 3, groups.clone(), 12, 30.0, &used);
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pack_small_wave, bench_pack_by_wave_size, bench_pack_capacity_exhausted);
criterion_main!(benches);
