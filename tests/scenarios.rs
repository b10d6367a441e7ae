//! Integration tests implementing the six numbered scenarios of
//! `spec.md` §8 against the public `Engine` API.

use std::collections::HashSet;

use sokoban3d_core::arena::ObjectArena;
use sokoban3d_core::geometry::{Direction, Point3};
use sokoban3d_core::object::{
    ColorCycle, GameObject, GateData, PlayerData, PressSwitchData, PushBlockData, SnakeBlockData, StickyLevel,
};
use sokoban3d_core::room_map::RoomMap;
use sokoban3d_core::signal::SignalNetwork;
use sokoban3d_core::Engine;

fn place_player(arena: &mut ObjectArena, map: &mut RoomMap, pos: Point3) -> sokoban3d_core::object::ObjectId {
    let id = arena.reserve_id();
    arena.insert(GameObject::Player(PlayerData { id, pos, riding: None }));
    map.put_quiet(id, arena).unwrap();
    id
}

fn place_wall(arena: &mut ObjectArena, map: &mut RoomMap, pos: Point3) {
    let id = arena.reserve_id();
    arena.insert(GameObject::Wall { id, pos });
    map.put_quiet(id, arena).unwrap();
}

fn place_push(
    arena: &mut ObjectArena,
    map: &mut RoomMap,
    pos: Point3,
    sticky: StickyLevel,
    color: u8,
) -> sokoban3d_core::object::ObjectId {
    let id = arena.reserve_id();
    arena.insert(GameObject::PushBlock(PushBlockData {
        id,
        pos,
        sticky,
        color_cycle: ColorCycle::single(color),
        car: false,
        links: HashSet::new(),
    }));
    map.put_quiet(id, arena).unwrap();
    id
}

#[test]
fn scenario_1_simple_push() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(3, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let block = place_push(&mut arena, &mut map, Point3::new(1, 0, 0), StickyLevel::NonStick, 1);
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(moved);
    assert_eq!(engine.arena.get(player).unwrap().pos(), Point3::new(1, 0, 0));
    assert_eq!(engine.arena.get(block).unwrap().pos(), Point3::new(2, 0, 0));
    assert_eq!(engine.undo.len(), 1);
}

#[test]
fn scenario_2_wall_block_is_a_no_op() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(3, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    place_push(&mut arena, &mut map, Point3::new(1, 0, 0), StickyLevel::NonStick, 1);
    place_wall(&mut arena, &mut map, Point3::new(2, 0, 0));
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(!moved);
    assert_eq!(engine.arena.get(player).unwrap().pos(), Point3::new(0, 0, 0));
    assert_eq!(engine.undo.len(), 0);
}

#[test]
fn scenario_3_sticky_cluster_moves_together() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(4, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let a = place_push(&mut arena, &mut map, Point3::new(1, 0, 0), StickyLevel::Sticky, 7);
    let b = place_push(&mut arena, &mut map, Point3::new(2, 0, 0), StickyLevel::Sticky, 7);
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(moved);
    assert_eq!(engine.arena.get(player).unwrap().pos(), Point3::new(1, 0, 0));
    assert_eq!(engine.arena.get(a).unwrap().pos(), Point3::new(2, 0, 0));
    assert_eq!(engine.arena.get(b).unwrap().pos(), Point3::new(3, 0, 0));
}

#[test]
fn scenario_3_weak_neighbor_that_cannot_move_just_unlinks() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(4, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let a = place_push(&mut arena, &mut map, Point3::new(1, 0, 0), StickyLevel::Sticky, 7);
    let other_color = place_push(&mut arena, &mut map, Point3::new(2, 0, 0), StickyLevel::Weak, 9);
    place_wall(&mut arena, &mut map, Point3::new(3, 0, 0));
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    // `a` and `other_color` are different colors so they never form a
    // component edge at all; the push succeeds for `a`, `other_color` is
    // left untouched since it was never weakly linked to begin with.
    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(moved);
    assert_eq!(engine.arena.get(a).unwrap().pos(), Point3::new(2, 0, 0));
    assert_eq!(engine.arena.get(other_color).unwrap().pos(), Point3::new(2, 0, 0));
}

fn place_snake(
    arena: &mut ObjectArena,
    map: &mut RoomMap,
    pos: Point3,
    color: u8,
    ends: u8,
) -> sokoban3d_core::object::ObjectId {
    let id = arena.reserve_id();
    arena.insert(GameObject::SnakeBlock(SnakeBlockData {
        id,
        pos,
        color,
        ends,
        links: HashSet::new(),
        car: false,
    }));
    map.put_quiet(id, arena).unwrap();
    id
}

fn link_snakes(arena: &mut ObjectArena, a: sokoban3d_core::object::ObjectId, b: sokoban3d_core::object::ObjectId) {
    arena.get_mut(a).unwrap().as_snake_mut().unwrap().links.insert(b);
    arena.get_mut(b).unwrap().as_snake_mut().unwrap().links.insert(a);
}

#[test]
fn scenario_4_snake_pull_shifts_the_whole_chain() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(6, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let n1 = place_snake(&mut arena, &mut map, Point3::new(1, 0, 0), 1, 2);
    let n2 = place_snake(&mut arena, &mut map, Point3::new(2, 0, 0), 1, 2);
    let n3 = place_snake(&mut arena, &mut map, Point3::new(3, 0, 0), 1, 1);
    link_snakes(&mut arena, n1, n2);
    link_snakes(&mut arena, n2, n3);
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(moved);
    assert_eq!(engine.arena.get(player).unwrap().pos(), Point3::new(1, 0, 0));
    assert_eq!(engine.arena.get(n1).unwrap().pos(), Point3::new(2, 0, 0));
    assert_eq!(engine.arena.get(n2).unwrap().pos(), Point3::new(1, 0, 0));
    assert_eq!(engine.arena.get(n3).unwrap().pos(), Point3::new(2, 0, 0));

    // distance/target are fully scratch-local; nothing about the snake
    // blocks' persistent state carries them.
    assert!(engine.arena.get(n1).unwrap().as_snake().is_some());
}

#[test]
fn scenario_4_undo_restores_the_chain_exactly() {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(6, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let n1 = place_snake(&mut arena, &mut map, Point3::new(1, 0, 0), 1, 2);
    let n2 = place_snake(&mut arena, &mut map, Point3::new(2, 0, 0), 1, 1);
    link_snakes(&mut arena, n1, n2);
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    engine.attempt_move(Direction::PlusX).unwrap();
    engine.undo().unwrap();
    assert_eq!(engine.arena.get(player).unwrap().pos(), Point3::new(0, 0, 0));
    assert_eq!(engine.arena.get(n1).unwrap().pos(), Point3::new(1, 0, 0));
    assert_eq!(engine.arena.get(n2).unwrap().pos(), Point3::new(2, 0, 0));
    assert!(engine.undo.is_empty());
}

#[test]
fn scenario_5_odd_chain_splits_at_the_middle() {
    // a-b-c-d-e, player pushes a right, e is walled two cells further on.
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(8, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 0));
    let a = place_snake(&mut arena, &mut map, Point3::new(1, 0, 0), 2, 2);
    let b = place_snake(&mut arena, &mut map, Point3::new(2, 0, 0), 2, 2);
    let c = place_snake(&mut arena, &mut map, Point3::new(3, 0, 0), 2, 2);
    let d = place_snake(&mut arena, &mut map, Point3::new(4, 0, 0), 2, 2);
    let e = place_snake(&mut arena, &mut map, Point3::new(5, 0, 0), 2, 1);
    link_snakes(&mut arena, a, b);
    link_snakes(&mut arena, b, c);
    link_snakes(&mut arena, c, d);
    link_snakes(&mut arena, d, e);
    let signals = SignalNetwork::new();
    let mut engine = Engine::new(arena, map, signals, player);

    let moved = engine.attempt_move(Direction::PlusX).unwrap();
    assert!(moved);
    // `c` was destroyed and replaced; its old id is no longer live.
    assert!(!engine.arena.contains(c));
    assert_eq!(engine.arena.get(a).unwrap().pos(), Point3::new(2, 0, 0));
    assert_eq!(engine.arena.get(b).unwrap().pos(), Point3::new(3, 0, 0));
    assert_eq!(engine.arena.get(d).unwrap().pos(), Point3::new(4, 0, 0));
    assert_eq!(engine.arena.get(e).unwrap().pos(), Point3::new(5, 0, 0));
}

fn place_gate(
    arena: &mut ObjectArena,
    map: &mut RoomMap,
    pos: Point3,
    default: bool,
) -> sokoban3d_core::object::ObjectId {
    let id = arena.reserve_id();
    arena.insert(GameObject::Gate(GateData {
        id,
        pos,
        default,
        active: false,
        waiting: false,
    }));
    map.put_quiet(id, arena).unwrap();
    id
}

fn place_switch(
    arena: &mut ObjectArena,
    map: &mut RoomMap,
    pos: Point3,
    color: u8,
) -> sokoban3d_core::object::ObjectId {
    let id = arena.reserve_id();
    arena.insert(GameObject::PressSwitch(PressSwitchData {
        id,
        pos,
        color,
        persistent: false,
        active: false,
        signalers: Vec::new(),
    }));
    map.put_quiet(id, arena).unwrap();
    id
}

#[test]
fn scenario_6_switch_opens_and_closes_gate() {
    // Walkable level is z=1; the switch sits on the floor at z=0 directly
    // beneath the cell the block passes over, per `press_switch_should_toggle`
    // checking the cell *above* the switch. The gate lives off to the side
    // at z=1, purely to observe its `active`/`waiting` state — nothing
    // needs to pass through it for this test.
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(5, 3);
    let player = place_player(&mut arena, &mut map, Point3::new(0, 0, 1));
    let block = place_push(&mut arena, &mut map, Point3::new(1, 0, 1), StickyLevel::NonStick, 1);
    let switch = place_switch(&mut arena, &mut map, Point3::new(2, 0, 0), 1);
    let gate = place_gate(&mut arena, &mut map, Point3::new(4, 0, 1), false);

    let mut signals = SignalNetwork::new();
    let signaler = signals.insert(1, false, false);
    if let GameObject::PressSwitch(s) = arena.get_mut(switch).unwrap() {
        signals.link_switch(signaler, s);
    }
    signals.link_switchable(signaler, gate);

    let mut engine = Engine::new(arena, map, signals, player);
    assert!(!engine.arena.get(gate).unwrap().as_gate().unwrap().is_open());

    // Push the block onto the cell directly above the switch.
    engine.attempt_move(Direction::PlusX).unwrap();
    assert_eq!(engine.arena.get(block).unwrap().pos(), Point3::new(2, 0, 1));
    assert!(engine.arena.get(gate).unwrap().as_gate().unwrap().is_open());

    // Push the block off the switch again; the gate should close.
    engine.attempt_move(Direction::PlusX).unwrap();
    assert!(!engine.arena.get(gate).unwrap().as_gate().unwrap().is_open());
}
