//! Registry benchmarks: entity churn, component access and view iteration.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sbx_ecs::{Entity, Registry};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

struct Frozen;

fn position(i: u64) -> Position {
    Position {
        x: i as f32,
        y: 0.0,
        z: 0.0,
    }
}

const VELOCITY: Velocity = Velocity {
    x: 1.0,
    y: 0.0,
    z: 0.0,
};

/// Every entity gets a position; every `stride`-th also gets a velocity.
/// A stride of zero attaches no velocities.
fn populate(count: u64, stride: u64) -> (Registry, Vec<Entity>) {
    let mut registry = Registry::with_capacity(count as usize);
    let entities = (0..count)
        .map(|i| {
            let e = registry.create();
            registry.attach(e, position(i)).unwrap();
            if stride != 0 && i % stride == 0 {
                registry.attach(e, VELOCITY).unwrap();
            }
            e
        })
        .collect();
    (registry, entities)
}

fn entity_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("create", count), &count, |b, &count| {
            b.iter(|| {
                let mut registry = Registry::new();
                for _ in 0..count {
                    black_box(registry.create());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("destroy_recycle", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || populate(count, 2),
                    |(mut registry, entities)| {
                        for entity in entities {
                            registry.destroy(entity).unwrap();
                            black_box(registry.create());
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn component_access_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_access");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("get", count), &count, |b, &count| {
            let (registry, entities) = populate(count, 1);
            b.iter(|| {
                for &entity in &entities {
                    black_box(registry.get::<Position>(entity).ok());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("get_mut", count), &count, |b, &count| {
            let (mut registry, entities) = populate(count, 1);
            b.iter(|| {
                for &entity in &entities {
                    if let Some(pos) = registry.try_get_mut::<Position>(entity) {
                        pos.x += 1.0;
                    }
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("attach_detach", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || populate(count, 0),
                    |(mut registry, entities)| {
                        for &entity in &entities {
                            registry.attach(entity, VELOCITY).unwrap();
                        }
                        for &entity in &entities {
                            black_box(registry.detach::<Velocity>(entity).ok());
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn view_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("view");

    for count in [1000, 10000] {
        group.throughput(Throughput::Elements(count));

        // Both stores hold the same entities in the same order: zipped.
        group.bench_with_input(BenchmarkId::new("aligned", count), &count, |b, &count| {
            let (mut registry, _) = populate(count, 1);
            b.iter(|| {
                for (_, pos, vel) in registry.view_mut::<(Position, Velocity)>() {
                    pos.x += vel.x;
                    pos.y += vel.y;
                    pos.z += vel.z;
                }
            });
        });

        // Velocity on every fourth entity: driven by the smaller store.
        group.bench_with_input(BenchmarkId::new("probe", count), &count, |b, &count| {
            let (mut registry, _) = populate(count, 4);
            b.iter(|| {
                for (_, pos, vel) in registry.view_mut::<(Position, Velocity)>() {
                    pos.x += vel.x;
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("without", count), &count, |b, &count| {
            let (mut registry, entities) = populate(count, 1);
            for entity in entities.iter().step_by(2) {
                registry.attach(*entity, Frozen).unwrap();
            }
            b.iter(|| {
                let mut sum = 0.0;
                for (_, pos) in registry.view::<(Position,)>().without::<Frozen>() {
                    sum += pos.x;
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    entity_benchmarks,
    component_access_benchmarks,
    view_benchmarks,
);

criterion_main!(benches);
