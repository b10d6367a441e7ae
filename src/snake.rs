//! Pulls, splits, or cuts snake chains along the paths seeded by
//! `MoveProcessor` Phase B. See `spec.md` §4.6.
//!
//! Grounded in `original_source/include/block.h`'s `SnakePuller` (a
//! `room_map_`/`delta_frame_`/`check_`/`dir_`-holding helper constructed
//! once per push and driven by `prepare_pull`/`pull`). The transient
//! `distance`/`target` fields the source keeps on `SnakeBlock` itself are
//! recast here as a per-move `Scratch` map, per `spec.md` §9 Design Notes.
//!
//! **Frozen design decision** (see `DESIGN.md`): `spec.md` §4.6's even/odd
//! "chains meeting in the middle" termination rules are specified for two
//! walks converging — that requires two independently pushed heads pulling
//! the same chain from both ends. A lone free end (scenario 6 of `spec.md`
//! §8's numbering, "chain with one end walled") always completes as a plain
//! pull to that end: nothing obstructs a pull destination, since it is by
//! construction a cell its predecessor just vacated. The cut/split
//! machinery below is fully implemented and exercised by the two-heads
//! case.

use std::collections::{HashMap, HashSet};

use crate::arena::ObjectArena;
use crate::delta::{Delta, DeltaFrame};
use crate::geometry::Point3;
use crate::object::{GameObject, ObjectId, SnakeBlockData};
use crate::room_map::RoomMap;

/// Per-move scratch state for snake blocks, keyed by id. Never persisted on
/// `SnakeBlockData` itself (`spec.md` invariant 5).
#[derive(Debug, Default)]
pub struct Scratch {
    distance: HashMap<ObjectId, i32>,
    target: HashMap<ObjectId, ObjectId>,
}

impl Scratch {
    pub fn new() -> Scratch {
        Scratch::default()
    }

    pub fn distance(&self, id: ObjectId) -> Option<i32> {
        self.distance.get(&id).copied()
    }

    pub fn target(&self, id: ObjectId) -> Option<ObjectId> {
        self.target.get(&id).copied()
    }

    pub fn set(&mut self, id: ObjectId, distance: i32, target: ObjectId) {
        self.distance.insert(id, distance);
        self.target.insert(id, target);
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty() && self.target.is_empty()
    }

    fn clear(&mut self) {
        self.distance.clear();
        self.target.clear();
    }
}

pub struct SnakePuller<'a> {
    arena: &'a mut ObjectArena,
    map: &'a mut RoomMap,
    frame: &'a mut DeltaFrame,
    scratch: &'a mut Scratch,
    not_move: &'a HashSet<ObjectId>,
    /// Every object's position immediately before `MoveProcessor` Phase D
    /// committed this tick's motion. A pull destination is always some
    /// predecessor's entry in this map.
    pre_move_pos: &'a HashMap<ObjectId, Point3>,
}

impl<'a> SnakePuller<'a> {
    pub fn new(
        arena: &'a mut ObjectArena,
        map: &'a mut RoomMap,
        frame: &'a mut DeltaFrame,
        scratch: &'a mut Scratch,
        not_move: &'a HashSet<ObjectId>,
        pre_move_pos: &'a HashMap<ObjectId, Point3>,
    ) -> SnakePuller<'a> {
        SnakePuller {
            arena,
            map,
            frame,
            scratch,
            not_move,
            pre_move_pos,
        }
    }

    /// Runs the puller for every pushed head, then asserts scratch has been
    /// fully drained (`spec.md` §4.6 invariant: distance/target reset to
    /// initial after the puller returns).
    pub fn run(mut self, pushed_heads: &[ObjectId]) {
        for &head in pushed_heads {
            let links: Vec<ObjectId> = self
                .arena
                .get(head)
                .and_then(|o| o.as_snake())
                .map(|s| s.links.iter().copied().collect())
                .unwrap_or_default();
            for link in links {
                self.process_link(head, link);
            }
        }
        self.scratch.clear();
    }

    fn process_link(&mut self, head: ObjectId, cur: ObjectId) {
        if self.not_move.contains(&cur) {
            self.remove_link(head, cur);
            return;
        }
        if self.scratch.distance(cur) == Some(0) {
            // Already moved as a pushed head in its own right (e.g. two
            // directly-adjacent pushed heads): nothing to pull.
            return;
        }
        self.walk(head, cur);
    }

    fn walk(&mut self, mut prev: ObjectId, mut cur: ObjectId) {
        loop {
            let others: Vec<ObjectId> = self
                .arena
                .get(cur)
                .and_then(|o| o.as_snake())
                .expect("walk visits only snake blocks")
                .links
                .iter()
                .copied()
                .filter(|&l| l != prev)
                .collect();
            match others.as_slice() {
                [] => {
                    self.pull_chain_ending_at(cur);
                    return;
                }
                [next] => {
                    let next = *next;
                    let my_distance = self.scratch.distance(cur).expect("cur was seeded before walk");
                    let candidate = my_distance + 1;
                    match self.scratch.distance(next) {
                        None => {
                            self.scratch.set(next, candidate, cur);
                            prev = cur;
                            cur = next;
                        }
                        Some(existing) if existing == candidate => {
                            // The opposite walk's front is `next` itself:
                            // odd total length, split the meeting block.
                            self.do_split(next, cur, candidate);
                            return;
                        }
                        Some(existing) if existing == my_distance => {
                            // The opposite walk already reached `cur`'s
                            // mirror neighbor one step early: even total
                            // length, cut the edge between them.
                            self.cut_edge(cur, next);
                            return;
                        }
                        Some(_) => {
                            // Degenerate/short chain fully accounted for by
                            // one side already; nothing further to do.
                            return;
                        }
                    }
                }
                _ => unreachable!("snake degree bound exceeded during walk"),
            }
        }
    }

    fn remove_link(&mut self, a: ObjectId, b: ObjectId) {
        if let Some(s) = self.arena.get_mut(a).and_then(|o| o.as_snake_mut()) {
            s.links.remove(&b);
        }
        if let Some(s) = self.arena.get_mut(b).and_then(|o| o.as_snake_mut()) {
            s.links.remove(&a);
        }
        self.frame.push(Delta::LinkRemove { a, b });
    }

    /// Shifts every block from the pushed head out to `end` (inclusive),
    /// in head-to-tail order, each into its predecessor's pre-move
    /// position.
    fn pull_chain_ending_at(&mut self, end: ObjectId) {
        let mut chain = vec![end];
        let mut cur = end;
        loop {
            let target = self.scratch.target(cur).expect("every walked node has a target");
            if target == cur {
                break; // reached the head, whose target is itself
            }
            chain.push(target);
            cur = target;
        }
        chain.reverse(); // head-first
        for window in chain.windows(2) {
            let (predecessor, node) = (window[0], window[1]);
            let dest = *self
                .pre_move_pos
                .get(&predecessor)
                .expect("predecessor position captured before commit");
            self.move_to(node, dest);
        }
    }

    fn move_to(&mut self, id: ObjectId, dest: Point3) {
        let old_pos = self.arena.get(id).expect("pulled id is live").pos();
        self.map.take_quiet(id, self.arena).expect("pull source cell matches id");
        self.arena.get_mut(id).unwrap().set_pos(dest);
        self.map.put_quiet(id, self.arena).expect("pull destination is vacated by predecessor");
        self.frame.push(Delta::Motion { id, old_pos });
    }

    fn cut_edge(&mut self, a: ObjectId, b: ObjectId) {
        self.remove_link(a, b);
        self.pull_chain_ending_at(a);
        self.pull_chain_ending_at(b);
    }

    fn fresh_child_id(&mut self) -> ObjectId {
        self.arena.reserve_id()
    }

    /// Splits `mid` into two single-ended halves, one continuing toward
    /// each head, per `spec.md` §4.6's odd-length case.
    fn do_split(&mut self, mid: ObjectId, prev1: ObjectId, d1: i32) {
        let prev2 = self.scratch.target(mid).expect("mid was visited by the opposite walk");
        let d2 = self.scratch.distance(mid).expect("mid was visited by the opposite walk");

        let (pos, color, car) = {
            let data = self.arena.get(mid).and_then(|o| o.as_snake()).expect("mid is a snake block");
            (data.pos, data.color, data.car)
        };
        let parent_encoded = crate::serialize::encode_object(self.arena.get(mid).unwrap());

        // Detach mid from both neighbors before destroying it.
        if let Some(s) = self.arena.get_mut(prev1).and_then(|o| o.as_snake_mut()) {
            s.links.remove(&mid);
        }
        if let Some(s) = self.arena.get_mut(prev2).and_then(|o| o.as_snake_mut()) {
            s.links.remove(&mid);
        }
        self.map.take_quiet(mid, self.arena).expect("mid occupies its own cell");
        self.arena.destroy(mid);

        let child_a = self.fresh_child_id();
        self.arena.insert(GameObject::SnakeBlock(SnakeBlockData {
            id: child_a,
            pos,
            color,
            ends: 1,
            links: HashSet::from([prev1]),
            car,
        }));
        if let Some(s) = self.arena.get_mut(prev1).and_then(|o| o.as_snake_mut()) {
            s.links.insert(child_a);
        }
        self.map.put_quiet(child_a, self.arena).expect("mid's cell was just vacated");
        self.scratch.set(child_a, d1, prev1);
        self.pull_chain_ending_at(child_a);

        let child_b = self.fresh_child_id();
        self.arena.insert(GameObject::SnakeBlock(SnakeBlockData {
            id: child_b,
            pos,
            color,
            ends: 1,
            links: HashSet::from([prev2]),
            car,
        }));
        if let Some(s) = self.arena.get_mut(prev2).and_then(|o| o.as_snake_mut()) {
            s.links.insert(child_b);
        }
        self.map.put_quiet(child_b, self.arena).expect("child_a vacated mid's cell on its own pull");
        self.scratch.set(child_b, d2, prev2);
        self.pull_chain_ending_at(child_b);

        self.frame.push(Delta::SnakeSplit {
            parent_encoded,
            parent_pos: pos,
            child_a,
            child_b,
        });
    }
}
