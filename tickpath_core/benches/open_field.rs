// Open-field search benchmarks.
//
// Every cell is traversable, so these measure the raw cost of the tick loop:
// node allocation, heuristic evaluation, frontier churn and region dedup.
// Long targets may end on the iteration budget rather than `Found`; the
// measurement covers the whole call either way.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tickpath_core::{
    CellInfo, Environment, EnvironmentId, Material, Pathfinder, PathfinderConfig, Position,
    WorldProvider,
};

fn open_world() -> Arc<dyn WorldProvider> {
    Arc::new(|_: &Position| Some(CellInfo::open(Material(0))))
}

fn bench_open_field(c: &mut Criterion) {
    let env = Environment::new(EnvironmentId(0), "bench", -64, 320).shared();
    let mut group = c.benchmark_group("open_field");
    for &diagonal in &[false, true] {
        let config = PathfinderConfig {
            allowing_diagonal: diagonal,
            ..PathfinderConfig::default()
        };
        let pathfinder = Pathfinder::new(config, open_world()).expect("valid config");
        for &distance in &[8.0, 16.0, 32.0] {
            let start = Position::new(&env, 0.0, 0.0, 0.0);
            let target = Position::new(&env, distance, 0.0, distance / 2.0);
            let label = if diagonal { "diagonal" } else { "straight" };
            group.bench_with_input(
                BenchmarkId::new(label, distance as u32),
                &target,
                |b, target| {
                    b.iter(|| {
                        let result = pathfinder
                            .find_path(black_box(&start), target, &[])
                            .expect("no filters to resolve")
                            .wait();
                        black_box((result.state(), result.path().len()));
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_open_field);
criterion_main!(benches);
