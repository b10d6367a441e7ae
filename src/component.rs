//! Groups blocks into *strong* and *weak* cohorts for a single push, per
//! `spec.md` §4.4.
//!
//! Grounded in `original_source/src/block.cpp`'s
//! `Block::make_weak_component` / `StickyBlock::make_strong_component`,
//! which BFS/DFS over `room_map->view(cur->shifted_pos(d))` comparing
//! `color()`. These are scratch structures for a single move step — they
//! hold ids only, matching `spec.md`'s note that components never own
//! anything.

use std::collections::{HashSet, VecDeque};

use crate::arena::ObjectArena;
use crate::geometry::DIRECTIONS;
use crate::object::{ObjectId, StickyLevel};
use crate::room_map::RoomMap;

/// The set of objects that must move together: a push on one member demands
/// a push on all. Singleton for everything except `Sticky` push blocks.
#[derive(Debug, Default)]
pub struct StrongComponent {
    pub ids: HashSet<ObjectId>,
}

/// The set of objects that may be dragged along, but whose refusal to move
/// does not veto the push. Superset of the strong component for `Sticky`
/// seeds (it additionally reaches `Weak` neighbors).
#[derive(Debug, Default)]
pub struct WeakComponent {
    pub ids: HashSet<ObjectId>,
}

fn bfs_same_color(
    seed: ObjectId,
    arena: &ObjectArena,
    map: &RoomMap,
    accepts: impl Fn(StickyLevel) -> bool,
) -> HashSet<ObjectId> {
    let color = arena
        .get(seed)
        .and_then(|o| o.link_color())
        .expect("bfs_same_color seed must have a link color");
    let mut seen = HashSet::new();
    seen.insert(seed);
    let mut queue = VecDeque::new();
    queue.push_back(seed);
    while let Some(cur) = queue.pop_front() {
        let cur_pos = arena.get(cur).expect("component member missing from arena").pos();
        for d in DIRECTIONS {
            let neighbor_pos = cur_pos + d.offset();
            let neighbor = map.occupant(neighbor_pos);
            if neighbor.is_none() || seen.contains(&neighbor) {
                continue;
            }
            let Some(obj) = arena.get(neighbor) else { continue };
            let Some(level) = obj.sticky_level() else { continue };
            if accepts(level) && obj.link_color() == Some(color) {
                seen.insert(neighbor);
                queue.push_back(neighbor);
            }
        }
    }
    seen
}

pub struct ComponentBuilder;

impl ComponentBuilder {
    /// Only `Sticky` push blocks form a non-trivial strong component
    /// (`Sticky`↔`Sticky` is the only strong edge, `spec.md` §4.4).
    pub fn build_strong(seed: ObjectId, arena: &ObjectArena, map: &RoomMap) -> StrongComponent {
        let sticky = arena.get(seed).and_then(|o| o.sticky_level()) == Some(StickyLevel::Sticky);
        let ids = if sticky {
            bfs_same_color(seed, arena, map, |lvl| lvl == StickyLevel::Sticky)
        } else {
            HashSet::from([seed])
        };
        StrongComponent { ids }
    }

    /// `Sticky` and `Weak` push blocks both participate in weak components;
    /// `NonStick` blocks (and anything that isn't a push block) are always
    /// singletons.
    pub fn build_weak(seed: ObjectId, arena: &ObjectArena, map: &RoomMap) -> WeakComponent {
        let level = arena.get(seed).and_then(|o| o.sticky_level());
        let ids = match level {
            Some(StickyLevel::Sticky) | Some(StickyLevel::Weak) => {
                bfs_same_color(seed, arena, map, |lvl| lvl != StickyLevel::NonStick)
            }
            _ => HashSet::from([seed]),
        };
        WeakComponent { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::object::{ColorCycle, GameObject, PushBlockData};

    fn push(arena: &mut ObjectArena, pos: Point3, sticky: StickyLevel, color: u8) -> ObjectId {
        let id = arena.reserve_id();
        arena.insert(GameObject::PushBlock(PushBlockData {
            id,
            pos,
            sticky,
            color_cycle: ColorCycle::single(color),
            car: false,
            links: HashSet::new(),
        }));
        id
    }

    #[test]
    fn nonstick_blocks_are_always_singleton() {
        let mut arena = ObjectArena::new();
        let mut map = RoomMap::new(5, 5);
        let a = push(&mut arena, Point3::new(0, 0, 0), StickyLevel::NonStick, 1);
        let b = push(&mut arena, Point3::new(1, 0, 0), StickyLevel::NonStick, 1);
        map.put_quiet(a, &arena).unwrap();
        map.put_quiet(b, &arena).unwrap();
        let strong = ComponentBuilder::build_strong(a, &arena, &map);
        assert_eq!(strong.ids, HashSet::from([a]));
    }

    #[test]
    fn sticky_cluster_forms_one_strong_component() {
        let mut arena = ObjectArena::new();
        let mut map = RoomMap::new(5, 5);
        let a = push(&mut arena, Point3::new(0, 0, 0), StickyLevel::Sticky, 7);
        let b = push(&mut arena, Point3::new(1, 0, 0), StickyLevel::Sticky, 7);
        let c = push(&mut arena, Point3::new(2, 0, 0), StickyLevel::Sticky, 7);
        for id in [a, b, c] {
            map.put_quiet(id, &arena).unwrap();
        }
        let strong = ComponentBuilder::build_strong(a, &arena, &map);
        assert_eq!(strong.ids, HashSet::from([a, b, c]));
    }

    #[test]
    fn sticky_weak_edge_is_weak_only() {
        let mut arena = ObjectArena::new();
        let mut map = RoomMap::new(5, 5);
        let a = push(&mut arena, Point3::new(0, 0, 0), StickyLevel::Sticky, 7);
        let b = push(&mut arena, Point3::new(1, 0, 0), StickyLevel::Weak, 7);
        map.put_quiet(a, &arena).unwrap();
        map.put_quiet(b, &arena).unwrap();
        let strong = ComponentBuilder::build_strong(a, &arena, &map);
        assert_eq!(strong.ids, HashSet::from([a]));
        let weak = ComponentBuilder::build_weak(a, &arena, &map);
        assert_eq!(weak.ids, HashSet::from([a, b]));
    }

    #[test]
    fn different_colors_never_join() {
        let mut arena = ObjectArena::new();
        let mut map = RoomMap::new(5, 5);
        let a = push(&mut arena, Point3::new(0, 0, 0), StickyLevel::Sticky, 1);
        let b = push(&mut arena, Point3::new(1, 0, 0), StickyLevel::Sticky, 2);
        map.put_quiet(a, &arena).unwrap();
        map.put_quiet(b, &arena).unwrap();
        let strong = ComponentBuilder::build_strong(a, &arena, &map);
        assert_eq!(strong.ids, HashSet::from([a]));
    }
}
