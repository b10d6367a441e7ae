//! Resolves a single directional push. See `spec.md` §4.5 for Phases A–G.
//!
//! Grounded in the prototype's `WorldMap::move_solid`
//! (`examples/buffalocat-sokoban-prototype-rust/src/main.rs`), which walks a
//! strong component, checks the cell ahead of every member, and recurses
//! into whatever block it finds — the same "bad set" memoized recursion
//! shape, just over a single flat component rather than the strong/weak/
//! snake/signal phases this engine adds. The snake-head seeding of Phase B
//! and the weak-link dragging of Phase C are new generalizations grounded
//! in `original_source/src/block.cpp` (`Block::push`, `SnakeBlock::push`).

use std::collections::{HashMap, HashSet};

use crate::arena::ObjectArena;
use crate::component::ComponentBuilder;
use crate::delta::{Delta, DeltaFrame};
use crate::error::CoreError;
use crate::geometry::{Direction, Point3, DIRECTIONS};
use crate::object::{GameObject, ObjectId, StickyLevel};
use crate::room_map::RoomMap;
use crate::signal::{self, SignalNetwork};
use crate::snake::{Scratch, SnakePuller};

pub struct MoveProcessor<'a> {
    arena: &'a mut ObjectArena,
    map: &'a mut RoomMap,
    signals: &'a mut SignalNetwork,
    dir: Direction,
    frame: DeltaFrame,
    verdict: HashMap<ObjectId, bool>,
    movable: HashSet<ObjectId>,
    not_move: HashSet<ObjectId>,
    pre_move_pos: HashMap<ObjectId, Point3>,
    link_update: HashSet<ObjectId>,
    snake_heads: Vec<ObjectId>,
    scratch: Scratch,
}

impl<'a> MoveProcessor<'a> {
    /// Resolves `player_id`'s push in `dir`. Returns whether anything moved;
    /// the caller (`Engine::attempt_move`) is responsible for pushing the
    /// returned frame onto the undo stack when non-empty.
    #[tracing::instrument(level = "debug", skip(arena, map, signals))]
    pub fn run(
        arena: &'a mut ObjectArena,
        map: &'a mut RoomMap,
        signals: &'a mut SignalNetwork,
        player_id: ObjectId,
        dir: Direction,
    ) -> Result<(bool, DeltaFrame), CoreError> {
        let mut mp = MoveProcessor {
            arena,
            map,
            signals,
            dir,
            frame: DeltaFrame::new(),
            verdict: HashMap::new(),
            movable: HashSet::new(),
            not_move: HashSet::new(),
            pre_move_pos: HashMap::new(),
            link_update: HashSet::new(),
            snake_heads: Vec::new(),
            scratch: Scratch::new(),
        };
        let moved = mp.resolve(player_id)?;
        Ok((moved, mp.frame))
    }

    fn resolve(&mut self, player_id: ObjectId) -> Result<bool, CoreError> {
        let player = self
            .arena
            .get(player_id)
            .and_then(|o| o.as_player())
            .ok_or(CoreError::UnknownObject(player_id))?
            .clone();

        let mut initial = HashSet::new();
        initial.insert(player_id);
        if let Some(car) = player.riding {
            let strong = ComponentBuilder::build_strong(car, self.arena, self.map);
            initial.extend(strong.ids);
        }

        // Phase A — Gather.
        if !self.resolve_component(initial)? {
            tracing::debug!("push refused during gather");
            return Ok(false);
        }

        // Phase C — Weak links. Iterate a snapshot: `resolve_component` may
        // grow `self.movable` as weak neighbors succeed.
        for id in self.movable.clone() {
            let level = self.arena.get(id).and_then(|o| o.sticky_level());
            if level.is_none() {
                continue;
            }
            let weak = ComponentBuilder::build_weak(id, self.arena, self.map);
            for w in weak.ids {
                if self.movable.contains(&w) {
                    continue;
                }
                if !self.try_push(w)? {
                    self.link_update.insert(w);
                }
            }
        }

        // Phase B's seeding is performed once Phases A and C have fully
        // settled `self.movable` (snake blocks only ever join it as singleton
        // strong components, so the set is final at this point).
        for &head in &self.snake_heads {
            self.scratch.set(head, 0, head);
        }
        for &head in &self.snake_heads.clone() {
            let links: Vec<ObjectId> = self
                .arena
                .get(head)
                .and_then(|o| o.as_snake())
                .map(|s| s.links.iter().copied().collect())
                .unwrap_or_default();
            for link in links {
                if self.scratch.target(link).is_none() {
                    self.scratch.set(link, 1, head);
                }
            }
        }

        // Phase D — Commit, front-to-back relative to `dir`.
        let mut ordered: Vec<ObjectId> = self.movable.iter().copied().collect();
        let offset = self.dir.offset();
        ordered.sort_by_key(|id| std::cmp::Reverse(self.pre_move_pos[id].dot(offset)));
        for id in ordered {
            self.map.shift(id, self.dir, self.arena, &mut self.frame)?;
        }
        tracing::debug!(count = self.movable.len(), "commit complete");

        // Phase E — Snake pull.
        if !self.snake_heads.is_empty() {
            let puller = SnakePuller::new(
                self.arena,
                self.map,
                &mut self.frame,
                &mut self.scratch,
                &self.not_move,
                &self.pre_move_pos,
            );
            puller.run(&self.snake_heads);
            tracing::debug!(heads = self.snake_heads.len(), "snake pull complete");
        }

        // Phase F — Link refresh.
        self.refresh_sticky_links();
        self.refresh_snake_links();

        // Phase G — Signal propagation.
        self.propagate_signals();

        Ok(true)
    }

    fn mark(&mut self, ids: &HashSet<ObjectId>, verdict: bool) {
        for &id in ids {
            self.verdict.insert(id, verdict);
            if verdict {
                if self.movable.insert(id) {
                    let pos = self.arena.get(id).expect("marked id is live").pos();
                    self.pre_move_pos.insert(id, pos);
                    if matches!(self.arena.get(id), Some(GameObject::SnakeBlock(_))) {
                        self.snake_heads.push(id);
                    }
                }
            } else {
                self.not_move.insert(id);
            }
        }
    }

    fn resolve_component(&mut self, ids: HashSet<ObjectId>) -> Result<bool, CoreError> {
        for &id in &ids {
            let pos = self.arena.get(id).ok_or(CoreError::UnknownObject(id))?.pos();
            let ahead = pos + self.dir.offset();
            match self.map.view(ahead) {
                None => {}
                Some(occ) if occ == ObjectId::WALL => {
                    tracing::warn!(?id, "push refused: wall ahead");
                    self.mark(&ids, false);
                    return Ok(false);
                }
                Some(occ) if occ.is_none() => {}
                Some(occ) => {
                    if ids.contains(&occ) {
                        continue;
                    }
                    if let Some(gate) = self.arena.get(occ).and_then(|o| o.as_gate()) {
                        if gate.is_blocking() {
                            tracing::warn!(?id, "push refused: closed gate ahead");
                            self.mark(&ids, false);
                            return Ok(false);
                        }
                        continue;
                    }
                    if !self.arena.get(occ).map(|o| o.is_pushable()).unwrap_or(false) {
                        self.mark(&ids, false);
                        return Ok(false);
                    }
                    if !self.movable.contains(&occ) && !self.try_push(occ)? {
                        self.mark(&ids, false);
                        return Ok(false);
                    }
                }
            }
        }
        self.mark(&ids, true);
        Ok(true)
    }

    fn try_push(&mut self, seed: ObjectId) -> Result<bool, CoreError> {
        if let Some(&v) = self.verdict.get(&seed) {
            return Ok(v);
        }
        let strong = ComponentBuilder::build_strong(seed, self.arena, self.map);
        self.resolve_component(strong.ids)
    }

    fn refresh_sticky_links(&mut self) {
        let candidates: Vec<ObjectId> = self.movable.iter().copied().chain(self.link_update.iter().copied()).collect();
        for id in candidates {
            let Some(GameObject::PushBlock(b)) = self.arena.get(id) else { continue };
            if b.sticky != StickyLevel::Sticky {
                continue;
            }
            let pos = b.pos;
            let color = b.color_cycle.color();
            let old_links = b.links.clone();
            let mut new_links = HashSet::new();
            for d in DIRECTIONS {
                let n = self.map.occupant(pos + d.offset());
                if n.is_none() {
                    continue;
                }
                if let Some(GameObject::PushBlock(nb)) = self.arena.get(n) {
                    if nb.sticky == StickyLevel::Sticky && nb.color_cycle.color() == color {
                        new_links.insert(n);
                    }
                }
            }
            for &added in new_links.difference(&old_links) {
                self.set_push_link(id, added, true);
                self.frame.push(Delta::LinkAdd { a: id, b: added });
            }
            for &removed in old_links.difference(&new_links) {
                self.set_push_link(id, removed, false);
                self.frame.push(Delta::LinkRemove { a: id, b: removed });
            }
        }
    }

    fn set_push_link(&mut self, a: ObjectId, b: ObjectId, add: bool) {
        for (x, y) in [(a, b), (b, a)] {
            if let Some(GameObject::PushBlock(p)) = self.arena.get_mut(x) {
                if add {
                    p.links.insert(y);
                } else {
                    p.links.remove(&y);
                }
            }
        }
    }

    fn refresh_snake_links(&mut self) {
        for id in self.movable.clone() {
            let Some(snake) = self.arena.get(id).and_then(|o| o.as_snake()) else { continue };
            if !snake.has_room_for_link() {
                continue;
            }
            let pos = snake.pos;
            let color = snake.color;
            let existing = snake.links.clone();
            let mut candidate = None;
            let mut count = 0;
            for d in DIRECTIONS {
                let n = self.map.occupant(pos + d.offset());
                if n.is_none() || existing.contains(&n) || n == id {
                    continue;
                }
                if let Some(ns) = self.arena.get(n).and_then(|o| o.as_snake()) {
                    if ns.color == color && ns.has_room_for_link() {
                        count += 1;
                        candidate = Some(n);
                    }
                }
            }
            if count == 1 {
                let n = candidate.unwrap();
                if let Some(s) = self.arena.get_mut(id).and_then(|o| o.as_snake_mut()) {
                    s.links.insert(n);
                }
                if let Some(s) = self.arena.get_mut(n).and_then(|o| o.as_snake_mut()) {
                    s.links.insert(id);
                }
                self.frame.push(Delta::LinkAdd { a: id, b: n });
            }
        }
    }

    fn propagate_signals(&mut self) {
        let floor_update = self.frame.touched_positions(self.arena);
        let mut dirty_signalers = HashSet::new();

        let mut switch_ids = Vec::new();
        for pos in &floor_update {
            let here = self.map.occupant(*pos);
            if let Some(GameObject::PressSwitch(_)) = self.arena.get(here) {
                switch_ids.push(here);
            }
            let below = self.map.occupant(Point3::new(pos.x, pos.y, pos.z - 1));
            if let Some(GameObject::PressSwitch(_)) = self.arena.get(below) {
                switch_ids.push(below);
            }
        }
        switch_ids.sort_by_key(|id| id.0);
        switch_ids.dedup();

        for switch_id in switch_ids {
            let Some(GameObject::PressSwitch(s)) = self.arena.get(switch_id) else { continue };
            if !signal::press_switch_should_toggle(s, self.map) {
                continue;
            }
            let old_active = s.active;
            let new_active = !old_active;
            let signalers = s.signalers.clone();
            if let Some(GameObject::PressSwitch(s)) = self.arena.get_mut(switch_id) {
                s.active = new_active;
            }
            self.frame.push(Delta::SwitchToggle { id: switch_id, old_active });
            for sig in signalers {
                self.signals.adjust_count(sig, new_active);
                dirty_signalers.insert(sig);
            }
        }

        for sig in dirty_signalers {
            if !self.signals.should_toggle(sig) {
                continue;
            }
            self.signals.toggle(sig);
            self.frame.push(Delta::SignalerToggle { id: sig });
            let new_active = self.signals.get(sig).active;
            let switchables = self.signals.get(sig).switchables.clone();
            for switchable in switchables {
                if let Some(gate) = self.arena.get_mut(switchable).and_then(|o| o.as_gate_mut()) {
                    signal::gate_receive_signal(gate, new_active, self.map, &mut self.frame);
                }
            }
        }

        let switchable_ids: Vec<ObjectId> = self.signals.all_switchables().collect();
        for id in switchable_ids {
            if let Some(gate) = self.arena.get_mut(id).and_then(|o| o.as_gate_mut()) {
                signal::gate_check_waiting(gate, self.map, &mut self.frame);
            }
        }
    }
}
