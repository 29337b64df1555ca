//! # Movement Scenario Tests
//!
//! End-to-end walks through the public `Simulation` interface: plain steps,
//! blocked steps, ledges, cancellation, routes and teleports.

use std::sync::Arc;

use overworld::{
    BlockReason, Body, Direction, GridMap, MoveBlocked, MoveCompleted, MoveStarted, MovementConfig, MovementError,
    MovementState, Simulation, TileCoord, TileFlags, TileLocation,
};
use parking_lot::Mutex;

const MAP: i32 = 1;

fn open_sim(width: i32, height: i32) -> Simulation {
    let mut sim = Simulation::new(MovementConfig::default().with_entity_capacity(64)).unwrap();
    sim.load_map(GridMap::filled(MAP, width, height, TileFlags::OPEN).unwrap());
    sim
}

fn record<E>(sim: &Simulation) -> Arc<Mutex<Vec<E>>>
where
    E: overworld::Event + Clone,
{
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    sim.events().subscribe::<E, _>(0, move |e| sink.lock().push(e.clone()));
    log
}

/// Test: one tile east at 4 tiles/s completes within a single 0.25 s tick.
#[test]
fn test_single_step_east() {
    let mut sim = open_sim(5, 5);
    let completed = record::<MoveCompleted>(&sim);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();

    sim.request_move(player, Direction::East).unwrap();
    let stats = sim.tick(0.25);

    let position = sim.position(player).unwrap();
    assert_eq!(position.tile(), TileCoord::new(1, 0));
    assert_eq!(position.pixel_offset_x, 0.0);
    assert_eq!(position.pixel_offset_y, 0.0);
    assert_eq!(sim.movement_state(player), Some(MovementState::Idle));
    assert_eq!(stats.moves_started, 1);
    assert_eq!(stats.moves_completed, 1);

    let completed = completed.lock();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].entity, player);
    assert_eq!(completed[0].from, TileCoord::new(0, 0));
    assert_eq!(completed[0].to, TileCoord::new(1, 0));
}

/// Test: a half-finished step interpolates the pixel offset.
#[test]
fn test_step_interpolates_offset() {
    let mut sim = open_sim(5, 5);
    let player = sim.spawn_actor(TileLocation::new(MAP, 2, 2)).unwrap();

    sim.request_move(player, Direction::South).unwrap();
    sim.tick(0.125);

    let position = sim.position(player).unwrap();
    assert_eq!(position.tile(), TileCoord::new(2, 2));
    assert!((position.pixel_offset_y - 8.0).abs() < 1e-3);
    assert_eq!(position.pixel_offset_x, 0.0);
    assert!(matches!(sim.movement_state(player), Some(MovementState::Moving(_))));
}

/// Test: walking into an impassable tile raises one MoveBlocked and leaves
/// the entity idle where it was.
#[test]
fn test_blocked_by_impassable_tile() {
    let mut sim = open_sim(5, 5);
    sim.map_mut(MAP).unwrap().set_flags(TileCoord::new(3, 2), TileFlags::BLOCKED);
    let blocked = record::<MoveBlocked>(&sim);
    let player = sim.spawn_actor(TileLocation::new(MAP, 2, 2)).unwrap();

    sim.request_move(player, Direction::East).unwrap();
    let stats = sim.tick(0.25);

    assert_eq!(stats.moves_blocked, 1);
    assert_eq!(stats.moves_started, 0);
    assert_eq!(sim.position(player).unwrap().tile(), TileCoord::new(2, 2));
    assert_eq!(sim.movement_state(player), Some(MovementState::Idle));
    assert_eq!(sim.facing(player), Some(Direction::East));

    let blocked = blocked.lock();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].reason, BlockReason::Impassable);
    assert_eq!(blocked[0].target, TileCoord::new(3, 2));
}

/// Test: a solid entity blocks the tile it stands on.
#[test]
fn test_blocked_by_entity() {
    let mut sim = open_sim(5, 5);
    let blocked = record::<MoveBlocked>(&sim);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    sim.spawn_actor(TileLocation::new(MAP, 1, 0)).unwrap();

    sim.request_move(player, Direction::East).unwrap();
    sim.tick(0.25);

    assert_eq!(sim.position(player).unwrap().tile(), TileCoord::new(0, 0));
    assert_eq!(blocked.lock()[0].reason, BlockReason::EntityOccupied);
}

/// Test: a south ledge can only be taken from the north, and lands two
/// tiles past the ledge.
#[test]
fn test_ledge_jump() {
    let mut sim = open_sim(8, 8);
    sim.map_mut(MAP)
        .unwrap()
        .set_flags(TileCoord::new(3, 3), TileFlags::ledge(Direction::South));
    let blocked = record::<MoveBlocked>(&sim);
    let started = record::<MoveStarted>(&sim);

    let climber = sim.spawn_actor(TileLocation::new(MAP, 3, 4)).unwrap();
    sim.request_move(climber, Direction::North).unwrap();
    sim.tick(0.25);
    assert_eq!(sim.position(climber).unwrap().tile(), TileCoord::new(3, 4));
    assert_eq!(blocked.lock()[0].reason, BlockReason::WrongLedgeApproach);
    sim.despawn(climber).unwrap();

    let jumper = sim.spawn_actor(TileLocation::new(MAP, 3, 2)).unwrap();
    sim.request_move(jumper, Direction::South).unwrap();
    sim.tick(0.25);
    assert_eq!(started.lock()[0].ledge_jump, Some(Direction::South));
    assert_eq!(started.lock()[0].to, TileCoord::new(3, 5));
    match sim.movement_state(jumper) {
        Some(MovementState::Moving(step)) => {
            assert_eq!(step.to, TileCoord::new(3, 5));
            assert!((step.duration - 0.5).abs() < 1e-6);
        }
        other => panic!("jumper should be mid-air, got {other:?}"),
    }

    // The jump is timed as two tiles at walking speed.
    sim.tick(0.25);
    let position = sim.position(jumper).unwrap();
    assert_eq!(position.tile(), TileCoord::new(3, 5));
    assert!(position.is_snapped());
    assert_eq!(sim.movement_state(jumper), Some(MovementState::Idle));
}

/// Test: a handler that cancels MoveStarted keeps the entity in place.
#[test]
fn test_cancelled_move() {
    let mut sim = open_sim(5, 5);
    let completed = record::<MoveCompleted>(&sim);
    sim.events().subscribe::<MoveStarted, _>(10, |e| e.cancel());
    let player = sim.spawn_actor(TileLocation::new(MAP, 2, 2)).unwrap();

    sim.request_move(player, Direction::North).unwrap();
    let stats = sim.tick(0.25);

    assert_eq!(stats.moves_cancelled, 1);
    assert_eq!(stats.moves_started, 0);
    assert_eq!(sim.position(player).unwrap().tile(), TileCoord::new(2, 2));
    assert_eq!(sim.movement_state(player), Some(MovementState::Idle));
    assert!(completed.lock().is_empty());
}

/// Test: lower-priority handlers observe an earlier cancellation.
#[test]
fn test_handler_priority_sees_cancel() {
    let mut sim = open_sim(5, 5);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    sim.events().subscribe::<MoveStarted, _>(-5, move |e| sink.lock().push(e.cancelled));
    sim.events().subscribe::<MoveStarted, _>(5, |e| e.cancel());
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();

    sim.request_move(player, Direction::East).unwrap();
    sim.tick(0.1);

    assert_eq!(*seen.lock(), vec![true]);
}

/// Test: a requested path is followed to the goal around a wall.
#[test]
fn test_route_following_around_wall() {
    let mut sim = open_sim(6, 6);
    {
        let map = sim.map_mut(MAP).unwrap();
        for y in 0..5 {
            map.set_flags(TileCoord::new(2, y), TileFlags::BLOCKED);
        }
    }
    let walker = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    let goal = TileLocation::new(MAP, 4, 0);
    assert!(sim.request_path(walker, goal));

    let first = sim.tick(0.0);
    assert_eq!(first.paths_solved, 1);
    assert!(!sim.route(walker).unwrap().is_empty());

    for _ in 0..60 {
        sim.tick(0.1);
    }
    assert_eq!(sim.position(walker).unwrap().tile(), goal.coord());
    assert!(sim.route(walker).unwrap().is_empty());
    assert_eq!(sim.stats().moves_blocked, 0);
}

/// Test: an unreachable goal leaves the route empty.
#[test]
fn test_unreachable_path() {
    let mut sim = open_sim(5, 5);
    {
        let map = sim.map_mut(MAP).unwrap();
        for y in 0..5 {
            map.set_flags(TileCoord::new(2, y), TileFlags::BLOCKED);
        }
    }
    let walker = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    assert!(sim.request_path(walker, TileLocation::new(MAP, 4, 4)));

    let stats = sim.tick(0.0);
    assert_eq!(stats.paths_failed, 1);
    assert!(sim.route(walker).unwrap().is_empty());
}

/// Test: an obstacle dropped onto a route forces a re-plan.
#[test]
fn test_blocked_route_replans() {
    let mut sim = open_sim(5, 5);
    let walker = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    let goal = TileLocation::new(MAP, 4, 0);
    assert!(sim.request_path(walker, goal));
    sim.tick(0.0);

    sim.spawn_static(TileLocation::new(MAP, 2, 0), Body::OBSTACLE).unwrap();
    for _ in 0..40 {
        sim.tick(0.25);
    }

    assert_eq!(sim.position(walker).unwrap().tile(), goal.coord());
    assert!(sim.stats().moves_blocked >= 1);
    assert!(sim.stats().paths_solved >= 2);
}

/// Test: teleport snaps, idles, and moves the index entry immediately.
#[test]
fn test_teleport() {
    let mut sim = open_sim(5, 5);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    sim.request_move(player, Direction::East).unwrap();
    sim.tick(0.1);

    sim.teleport(player, MAP, 4, 4).unwrap();

    let position = sim.position(player).unwrap();
    assert_eq!(position.tile(), TileCoord::new(4, 4));
    assert!(position.is_snapped());
    assert_eq!(sim.movement_state(player), Some(MovementState::Idle));
    assert!(sim.spatial().query(TileLocation::new(MAP, 0, 0)).is_empty());
    assert_eq!(
        sim.spatial().query(TileLocation::new(MAP, 4, 4)).dynamic_ids(),
        &[player]
    );
    assert_eq!(sim.teleport(player, 7, 0, 0), Err(MovementError::UnknownMap(7)));
}

/// Test: teleporting off the map is a contract violation.
#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "outside map"))]
fn test_teleport_out_of_range() {
    let mut sim = open_sim(5, 5);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    assert_eq!(
        sim.teleport(player, MAP, 9, 9),
        Err(MovementError::TileOutOfRange { map_id: MAP, x: 9, y: 9 })
    );
}

/// Test: a speed change applies to the next move.
#[test]
fn test_set_speed() {
    let mut sim = open_sim(5, 5);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();
    sim.set_speed(player, 8.0).unwrap();
    assert!(sim.set_speed(player, 0.0).is_err());

    sim.request_move(player, Direction::East).unwrap();
    sim.tick(0.125);
    assert_eq!(sim.position(player).unwrap().tile(), TileCoord::new(1, 0));
}

/// Test: event instances are recycled across many ticks.
#[test]
fn test_event_pool_recycles() {
    let mut sim = open_sim(5, 5);
    let player = sim.spawn_actor(TileLocation::new(MAP, 0, 0)).unwrap();

    for i in 0..40 {
        let direction = if i % 2 == 0 { Direction::East } else { Direction::West };
        sim.request_move(player, direction).unwrap();
        sim.tick(0.25);
    }

    let stats = sim.events().pool_stats::<MoveCompleted>();
    assert_eq!(stats.acquired, 40);
    assert_eq!(stats.released, 40);
    assert_eq!(stats.overflow_allocations, 0);
}
