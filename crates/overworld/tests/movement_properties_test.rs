//! # Movement Property Tests
//!
//! Invariants that must hold after every tick, exercised over crowds of
//! movers wandering a walled map.

use std::sync::Arc;

use overworld::{
    Body, Direction, EntityId, GridMap, MoveBlocked, MoveCompleted, MovementConfig, MovementState, Simulation,
    TileCoord, TileFlags, TileLocation,
};
use parking_lot::Mutex;

const MAP: i32 = 3;

fn arena(config: MovementConfig) -> Simulation {
    let mut sim = Simulation::new(config).unwrap();
    let mut map = GridMap::filled(MAP, 16, 16, TileFlags::OPEN).unwrap();
    for i in 0..16 {
        map.set_flags(TileCoord::new(i, 0), TileFlags::BLOCKED);
        map.set_flags(TileCoord::new(i, 15), TileFlags::BLOCKED);
        map.set_flags(TileCoord::new(0, i), TileFlags::BLOCKED);
        map.set_flags(TileCoord::new(15, i), TileFlags::BLOCKED);
    }
    sim.load_map(map);
    sim
}

fn crowd(sim: &mut Simulation, count: i32) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            let x = 1 + i % 14;
            let y = 1 + (i / 14) * 2;
            sim.spawn_actor(TileLocation::new(MAP, x, y)).unwrap()
        })
        .collect()
}

/// Deterministic direction pattern so runs are reproducible.
fn wander(tick: usize, i: usize) -> Direction {
    Direction::ALL[(tick / 3 + i * 7) % 4]
}

/// Test: idle entities always sit exactly on their tile.
#[test]
fn test_idle_implies_zero_offset() {
    let mut sim = arena(MovementConfig::default());
    let movers = crowd(&mut sim, 20);

    for tick in 0..200 {
        for (i, &id) in movers.iter().enumerate() {
            if tick % 2 == 0 {
                sim.request_move(id, wander(tick, i)).unwrap();
            }
        }
        sim.tick(0.05);

        for &id in &movers {
            let position = sim.position(id).unwrap();
            if sim.movement_state(id) == Some(MovementState::Idle) {
                assert!(position.is_snapped(), "idle entity {id:?} has an offset");
            }
        }
    }
}

/// Test: every mover sits in exactly one dynamic bucket, on its own tile.
#[test]
fn test_one_dynamic_bucket_per_mover() {
    let mut sim = arena(MovementConfig::default());
    let movers = crowd(&mut sim, 20);

    for tick in 0..100 {
        for (i, &id) in movers.iter().enumerate() {
            sim.request_move(id, wander(tick, i)).unwrap();
        }
        sim.tick(0.07);

        for &id in &movers {
            let buckets: Vec<TileLocation> = sim
                .spatial()
                .dynamic_entries()
                .filter(|(_, ids)| ids.contains(&id))
                .map(|(location, _)| location)
                .collect();
            assert_eq!(buckets, vec![sim.position(id).unwrap().location()]);
        }
    }
}

/// Test: no two movers ever share a tile or head for the same one.
#[test]
fn test_no_shared_tiles() {
    let mut sim = arena(MovementConfig::default());
    let movers = crowd(&mut sim, 30);

    for tick in 0..150 {
        for (i, &id) in movers.iter().enumerate() {
            sim.request_move(id, wander(tick, i)).unwrap();
        }
        sim.tick(0.06);

        let mut claimed: Vec<TileCoord> = movers
            .iter()
            .map(|&id| match sim.movement_state(id) {
                Some(MovementState::Moving(step)) => step.to,
                _ => sim.position(id).unwrap().tile(),
            })
            .collect();
        claimed.sort();
        let before = claimed.len();
        claimed.dedup();
        assert_eq!(claimed.len(), before, "two movers claimed one tile on tick {tick}");
    }
}

/// Test: re-indexing static tiles twice gives the same partition.
#[test]
fn test_static_invalidation_is_idempotent() {
    let mut sim = arena(MovementConfig::default());
    for x in 3..8 {
        sim.spawn_static(TileLocation::new(MAP, x, 7), Body::OBSTACLE).unwrap();
    }
    sim.spawn_static(TileLocation::new(MAP, 4, 4), Body::DECORATION).unwrap();

    let snapshot = |sim: &Simulation| {
        let mut entries: Vec<(TileLocation, Vec<EntityId>)> = sim
            .spatial()
            .static_entries()
            .map(|(location, ids)| (location, ids.to_vec()))
            .collect();
        entries.sort();
        entries
    };

    sim.tick(0.0);
    let first = snapshot(&sim);
    assert_eq!(first.len(), 6);

    sim.invalidate_static_tiles();
    sim.invalidate_static_tiles();
    sim.tick(0.0);
    assert_eq!(snapshot(&sim), first);
}

/// Test: holding a direction chains steps without an idle frame.
#[test]
fn test_held_input_never_idles() {
    let mut sim = arena(MovementConfig::default());
    let runner = sim.spawn_actor(TileLocation::new(MAP, 1, 5)).unwrap();

    for _ in 0..40 {
        sim.request_move(runner, Direction::East).unwrap();
        sim.tick(0.05);
        assert!(
            matches!(sim.movement_state(runner), Some(MovementState::Moving(_))),
            "runner went idle while input was held"
        );
    }

    // 2 s at 4 tiles/s, less float slack on the last step.
    let x = sim.position(runner).unwrap().tile().x;
    assert!((7..=9).contains(&x), "runner ended at x = {x}");
}

/// Test: turning and reversing under held input chains across arrivals.
#[test]
fn test_held_input_turns_without_idling() {
    let mut sim = arena(MovementConfig::default());
    let blocked = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&blocked);
    sim.events()
        .subscribe::<MoveBlocked, _>(0, move |e| sink.lock().push(e.reason));
    let runner = sim.spawn_actor(TileLocation::new(MAP, 7, 7)).unwrap();

    let pattern = [Direction::East, Direction::West, Direction::West, Direction::South, Direction::North];
    for tick in 0..100 {
        sim.request_move(runner, pattern[(tick / 10) % pattern.len()]).unwrap();
        sim.tick(0.05);
        assert!(
            matches!(sim.movement_state(runner), Some(MovementState::Moving(_))),
            "runner went idle on tick {tick}"
        );
    }
    assert!(blocked.lock().is_empty(), "runner blocked: {:?}", blocked.lock());
}

/// Test: a held walk raises exactly one MoveCompleted per tile entered.
#[test]
fn test_one_completion_per_tile() {
    let mut sim = arena(MovementConfig::default());
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&arrivals);
    sim.events()
        .subscribe::<MoveCompleted, _>(0, move |e| sink.lock().push(e.to));
    let runner = sim.spawn_actor(TileLocation::new(MAP, 1, 5)).unwrap();

    for _ in 0..40 {
        sim.request_move(runner, Direction::East).unwrap();
        sim.tick(0.05);
    }

    let reached = sim.position(runner).unwrap().tile().x;
    let expected: Vec<TileCoord> = (2..=reached).map(|x| TileCoord::new(x, 5)).collect();
    assert!(!expected.is_empty());
    assert_eq!(*arrivals.lock(), expected);
}

/// Test: identical requests produce identical routes.
#[test]
fn test_path_requests_are_deterministic() {
    let route_for = || {
        let mut sim = arena(MovementConfig::default());
        for y in 1..12 {
            sim.spawn_static(TileLocation::new(MAP, 7, y), Body::OBSTACLE).unwrap();
        }
        let walker = sim.spawn_actor(TileLocation::new(MAP, 2, 2)).unwrap();
        assert!(sim.request_path(walker, TileLocation::new(MAP, 12, 3)));
        sim.tick(0.0);
        sim.route(walker).unwrap().waypoints.clone()
    };

    let first = route_for();
    assert!(!first.is_empty());
    assert_eq!(first.last(), Some(&TileCoord::new(12, 3)));
    for _ in 0..5 {
        assert_eq!(route_for(), first);
    }
}

/// Test: the parallel and serial planners reach the same state.
#[test]
fn test_parallel_matches_serial() {
    let run = |threshold: usize| {
        let mut sim = arena(MovementConfig::default().with_parallel_threshold(threshold));
        let movers = crowd(&mut sim, 40);
        let mut parallel_ticks = 0;
        for tick in 0..120 {
            for (i, &id) in movers.iter().enumerate() {
                sim.request_move(id, wander(tick, i)).unwrap();
            }
            if sim.tick(0.05).parallel {
                parallel_ticks += 1;
            }
        }
        let tiles: Vec<TileCoord> = movers.iter().map(|&id| sim.position(id).unwrap().tile()).collect();
        (tiles, parallel_ticks)
    };

    let (serial, serial_ticks) = run(usize::MAX);
    let (parallel, parallel_ticks) = run(8);
    assert_eq!(serial_ticks, 0);
    assert_eq!(parallel_ticks, 120);
    assert_eq!(serial, parallel);
}

/// Test: a mover never stands on a wall tile.
#[test]
fn test_movers_stay_on_walkable_tiles() {
    let mut sim = arena(MovementConfig::default());
    let movers = crowd(&mut sim, 25);

    for tick in 0..150 {
        for (i, &id) in movers.iter().enumerate() {
            sim.request_move(id, wander(tick, i)).unwrap();
        }
        sim.tick(0.08);
        for &id in &movers {
            let tile = sim.position(id).unwrap().tile();
            let flags = sim.maps().flags(MAP, tile).unwrap();
            assert!(flags.walkable, "{id:?} stands on a wall at {tile:?}");
        }
    }
}
