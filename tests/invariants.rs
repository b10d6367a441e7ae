//! Property tests over random `attempt_move`/`undo` sequences, per
//! `spec.md` §8's "Invariants (forall reachable state)" list and
//! `SPEC_FULL.md` §4.12.

use std::collections::HashSet;

use proptest::prelude::*;

use sokoban3d_core::arena::ObjectArena;
use sokoban3d_core::config::MAX_UNDO_DEPTH;
use sokoban3d_core::geometry::{Direction, Point3};
use sokoban3d_core::object::{
    ColorCycle, GameObject, GateData, ObjectId, PlayerData, PressSwitchData, PushBlockData, SnakeBlockData,
    StickyLevel,
};
use sokoban3d_core::room_map::RoomMap;
use sokoban3d_core::signal::SignalNetwork;
use sokoban3d_core::Engine;

struct RoomIds {
    player: ObjectId,
    push_a: ObjectId,
    push_b: ObjectId,
    snake1: ObjectId,
    snake2: ObjectId,
    switch: ObjectId,
}

/// Everything lives at z=1 except the switch, which sits on the floor
/// directly beneath `push_c`'s starting cell — see `scenario_6` in
/// `tests/scenarios.rs` for why that z-offset is the one that makes
/// `press_switch_should_toggle` fire.
fn build_room() -> (Engine, RoomIds) {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(8, 6);
    let mut signals = SignalNetwork::new();

    let player = arena.reserve_id();
    arena.insert(GameObject::Player(PlayerData {
        id: player,
        pos: Point3::new(0, 0, 1),
        riding: None,
    }));
    map.put_quiet(player, &arena).unwrap();

    let push_a = arena.reserve_id();
    arena.insert(GameObject::PushBlock(PushBlockData {
        id: push_a,
        pos: Point3::new(1, 0, 1),
        sticky: StickyLevel::Sticky,
        color_cycle: ColorCycle::single(9),
        car: false,
        links: HashSet::new(),
    }));
    map.put_quiet(push_a, &arena).unwrap();

    let push_b = arena.reserve_id();
    arena.insert(GameObject::PushBlock(PushBlockData {
        id: push_b,
        pos: Point3::new(2, 0, 1),
        sticky: StickyLevel::Sticky,
        color_cycle: ColorCycle::single(9),
        car: false,
        links: HashSet::new(),
    }));
    map.put_quiet(push_b, &arena).unwrap();

    let snake1 = arena.reserve_id();
    arena.insert(GameObject::SnakeBlock(SnakeBlockData {
        id: snake1,
        pos: Point3::new(1, 2, 1),
        color: 3,
        ends: 2,
        links: HashSet::new(),
        car: false,
    }));
    map.put_quiet(snake1, &arena).unwrap();

    let snake2 = arena.reserve_id();
    arena.insert(GameObject::SnakeBlock(SnakeBlockData {
        id: snake2,
        pos: Point3::new(2, 2, 1),
        color: 3,
        ends: 1,
        links: HashSet::new(),
        car: false,
    }));
    map.put_quiet(snake2, &arena).unwrap();
    arena.get_mut(snake1).unwrap().as_snake_mut().unwrap().links.insert(snake2);
    arena.get_mut(snake2).unwrap().as_snake_mut().unwrap().links.insert(snake1);

    let push_c = arena.reserve_id();
    arena.insert(GameObject::PushBlock(PushBlockData {
        id: push_c,
        pos: Point3::new(4, 0, 1),
        sticky: StickyLevel::NonStick,
        color_cycle: ColorCycle::single(1),
        car: false,
        links: HashSet::new(),
    }));
    map.put_quiet(push_c, &arena).unwrap();

    let switch = arena.reserve_id();
    arena.insert(GameObject::PressSwitch(PressSwitchData {
        id: switch,
        pos: Point3::new(4, 0, 0),
        color: 1,
        persistent: false,
        active: false,
        signalers: Vec::new(),
    }));
    map.put_quiet(switch, &arena).unwrap();

    let gate = arena.reserve_id();
    arena.insert(GameObject::Gate(GateData {
        id: gate,
        pos: Point3::new(6, 0, 1),
        default: false,
        active: false,
        waiting: false,
    }));
    map.put_quiet(gate, &arena).unwrap();

    let signaler = signals.insert(1, false, false);
    if let GameObject::PressSwitch(s) = arena.get_mut(switch).unwrap() {
        signals.link_switch(signaler, s);
    }
    signals.link_switchable(signaler, gate);

    let engine = Engine::new(arena, map, signals, player);
    (
        engine,
        RoomIds {
            player,
            push_a,
            push_b,
            snake1,
            snake2,
            switch,
        },
    )
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Move(Direction),
    Undo,
}

fn action_strategy() -> impl Strategy<Item = Action> {
    prop_oneof![
        Just(Action::Move(Direction::MinusX)),
        Just(Action::Move(Direction::PlusX)),
        Just(Action::Move(Direction::MinusY)),
        Just(Action::Move(Direction::PlusY)),
        Just(Action::Undo),
    ]
}

fn apply(engine: &mut Engine, action: Action) {
    match action {
        Action::Move(dir) => {
            engine.attempt_move(dir).expect("well-formed room never errors on a move");
        }
        Action::Undo => {
            engine.undo().expect("well-formed room never errors on undo");
        }
    }
}

/// Every tracked id's arena position agrees with what the map reports at
/// that position, and link sets are symmetric.
fn check_structural_invariants(engine: &Engine, ids: &RoomIds) {
    for &id in &[ids.player, ids.push_a, ids.push_b, ids.snake1, ids.snake2] {
        if let Some(obj) = engine.arena.get(id) {
            assert_eq!(engine.map.occupant(obj.pos()), id, "map/arena position mismatch for {:?}", id);
        }
    }

    for &id in &[ids.push_a, ids.push_b] {
        if let Some(GameObject::PushBlock(b)) = engine.arena.get(id) {
            for &linked in &b.links {
                let Some(GameObject::PushBlock(other)) = engine.arena.get(linked) else {
                    panic!("push link to a non-pushblock");
                };
                assert!(other.links.contains(&id), "push link asymmetry between {:?} and {:?}", id, linked);
            }
        }
    }

    for &id in &[ids.snake1, ids.snake2] {
        if let Some(snake) = engine.arena.get(id).and_then(|o| o.as_snake()) {
            for &linked in &snake.links {
                let Some(other) = engine.arena.get(linked).and_then(|o| o.as_snake()) else {
                    panic!("snake link to a non-snakeblock");
                };
                assert!(other.links.contains(&id), "snake link asymmetry between {:?} and {:?}", id, linked);
            }
        }
    }

    if let Some(GameObject::PressSwitch(s)) = engine.arena.get(ids.switch) {
        for &sig in &s.signalers {
            let signaler = engine.signals.get(sig);
            let active_switches = signaler
                .switches
                .iter()
                .filter(|&&sw_id| matches!(engine.arena.get(sw_id), Some(GameObject::PressSwitch(sw)) if sw.active))
                .count() as u8;
            assert_eq!(signaler.count, active_switches, "signaler count drifted from its switches' active flags");
        }
    }

    assert!(engine.undo.len() <= MAX_UNDO_DEPTH, "undo stack exceeded its configured cap");
}

proptest! {
    #[test]
    fn structural_invariants_hold_after_any_sequence(actions in prop::collection::vec(action_strategy(), 0..40)) {
        let (mut engine, ids) = build_room();
        for action in actions {
            apply(&mut engine, action);
            check_structural_invariants(&engine, &ids);
        }
    }

    #[test]
    fn undo_stack_never_exceeds_its_cap(actions in prop::collection::vec(action_strategy(), 0..2000)) {
        let (mut engine, _ids) = build_room();
        for action in actions {
            apply(&mut engine, action);
            prop_assert!(engine.undo.len() <= MAX_UNDO_DEPTH);
        }
    }

    #[test]
    fn same_action_sequence_is_deterministic(actions in prop::collection::vec(action_strategy(), 0..40)) {
        let (mut engine_a, ids_a) = build_room();
        let (mut engine_b, ids_b) = build_room();
        for &action in &actions {
            apply(&mut engine_a, action);
            apply(&mut engine_b, action);
        }
        for (&a, &b) in [
            (ids_a.player, ids_b.player),
            (ids_a.push_a, ids_b.push_a),
            (ids_a.push_b, ids_b.push_b),
            (ids_a.snake1, ids_b.snake1),
            (ids_a.snake2, ids_b.snake2),
        ]
        .iter()
        {
            let pos_a = engine_a.arena.get(a).map(|o| o.pos());
            let pos_b = engine_b.arena.get(b).map(|o| o.pos());
            prop_assert_eq!(pos_a, pos_b);
        }
        prop_assert_eq!(engine_a.undo.len(), engine_b.undo.len());
    }
}
