//! # ECS Performance Benchmark
//!
//! REQUIREMENTS:
//! - Masked iteration over 100k slots without allocating
//! - Pool rent/return in the tens of nanoseconds
//!
//! Run with: `cargo bench --package overworld_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use overworld_core::{Component, ComponentMask, ComponentStorage, ObjectPool, World};

#[derive(Clone, Copy, Default)]
struct Tile {
    x: i32,
    y: i32,
}

impl Component for Tile {
    const ID: u8 = 0;
}

#[derive(Clone, Copy, Default)]
struct Mover;

impl Component for Mover {
    const ID: u8 = 1;
}

fn populated(count: usize) -> (World, ComponentStorage<Tile>) {
    let mut world = World::new(count);
    let mut tiles = ComponentStorage::new(count);
    for i in 0..count {
        let id = world.spawn();
        tiles.set(id.slot(), Tile { x: i as i32, y: 0 });
        world.attach::<Tile>(id);
        if i % 2 == 0 {
            world.attach::<Mover>(id);
        }
    }
    (world, tiles)
}

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_entities");
    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::new(count);
                for _ in 0..count {
                    black_box(world.spawn());
                }
                world.alive_count()
            });
        });
    }
    group.finish();
}

fn bench_masked_query(c: &mut Criterion) {
    let (world, tiles) = populated(100_000);
    let mask = ComponentMask::of::<Tile>().with::<Mover>();

    c.bench_function("query_movers_100k", |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for id in world.query(mask) {
                if let Some(tile) = tiles.get(id.slot()) {
                    sum += i64::from(tile.x + tile.y);
                }
            }
            black_box(sum)
        });
    });
}

fn bench_pool_cycle(c: &mut Criterion) {
    let pool: ObjectPool<[u64; 8]> = ObjectPool::new(32);
    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            let item = pool.acquire();
            black_box(&item);
            pool.release(item);
        });
    });
}

criterion_group!(benches, bench_spawn, bench_masked_query, bench_pool_cycle);
criterion_main!(benches);
