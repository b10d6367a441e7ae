//! The reversible mutation journal: `Delta`, `DeltaFrame`, `UndoStack`.
//!
//! Grounded in the prototype's `Delta`/`DeltaFrame`/`UndoStack`
//! (`examples/buffalocat-sokoban-prototype-rust/src/main.rs`), which uses a
//! `Box<dyn Delta>` trait object per mutation kind. Per `spec.md` §9 Design
//! Notes, this is recast as a single tagged enum with one `revert` entry
//! point, avoiding the heap allocation and dynamic dispatch per delta that
//! the prototype pays for.

use std::collections::{HashSet, VecDeque};

use crate::arena::ObjectArena;
use crate::error::CoreError;
use crate::geometry::Point3;
use crate::object::ObjectId;
use crate::room_map::RoomMap;
use crate::serialize;
use crate::signal::{SignalNetwork, SignalerId};

/// One reversible mutation. See `spec.md` §4.3 for the full catalogue.
#[derive(Debug)]
pub enum Delta {
    Motion { id: ObjectId, old_pos: Point3 },
    Creation { id: ObjectId },
    /// `spec.md` specifies storing "a full serialization of the object" so
    /// undo can re-hydrate it without the arena ever having to keep a
    /// dangling reference alive; `encoded` is that serialized form, produced
    /// by `serialize::encode_object`.
    Deletion { encoded: Vec<u8>, old_pos: Point3 },
    LinkAdd { a: ObjectId, b: ObjectId },
    LinkRemove { a: ObjectId, b: ObjectId },
    /// Reverting a split destroys both children, re-hydrates the parent from
    /// its pre-split serialized form (which already carries its original
    /// link set), and re-inserts it into the arena and map.
    SnakeSplit {
        parent_encoded: Vec<u8>,
        parent_pos: Point3,
        child_a: ObjectId,
        child_b: ObjectId,
    },
    ColorCycle { id: ObjectId, old_index: usize },
    /// A `PressSwitch` flipped `active` and adjusted every linked
    /// signaler's `count` by one. Mirrors `PressSwitch::check_send_signal`
    /// pushing a `SwitchToggleDelta` before calling `toggle()`
    /// (`original_source/src/switch.cpp:169-180`).
    SwitchToggle { id: ObjectId, old_active: bool },
    SwitchableToggle { id: ObjectId, old_active: bool, old_waiting: bool },
    SignalerToggle { id: SignalerId },
    SnakeLinksReplace { id: ObjectId, old_links: HashSet<ObjectId> },
}

impl Delta {
    fn revert(
        &self,
        arena: &mut ObjectArena,
        map: &mut RoomMap,
        signals: &mut SignalNetwork,
    ) -> Result<(), CoreError> {
        match self {
            Delta::Motion { id, old_pos } => {
                map.take_quiet(*id, arena)?;
                arena
                    .get_mut(*id)
                    .ok_or(CoreError::UnknownObject(*id))?
                    .set_pos(*old_pos);
                map.put_quiet(*id, arena)?;
                Ok(())
            }
            Delta::Creation { id } => {
                let pos = arena.get(*id).ok_or(CoreError::UnknownObject(*id))?.pos();
                map.take_quiet_at(pos)?;
                arena.destroy(*id);
                Ok(())
            }
            Delta::Deletion { encoded, old_pos } => {
                let obj = serialize::decode_object(encoded)?;
                debug_assert_eq!(obj.pos(), *old_pos);
                let id = obj.id();
                arena.restore(obj);
                map.put_quiet(id, arena)?;
                Ok(())
            }
            Delta::SnakeSplit {
                parent_encoded,
                parent_pos,
                child_a,
                child_b,
            } => {
                for child in [*child_a, *child_b] {
                    if arena.contains(child) {
                        map.take_quiet(child, arena)?;
                        arena.destroy(child);
                    }
                }
                let parent = serialize::decode_object(parent_encoded)?;
                debug_assert_eq!(parent.pos(), *parent_pos);
                let id = parent.id();
                arena.restore(parent);
                map.put_quiet(id, arena)?;
                Ok(())
            }
            Delta::LinkAdd { a, b } => {
                unlink(arena, *a, *b);
                Ok(())
            }
            Delta::LinkRemove { a, b } => {
                link(arena, *a, *b);
                Ok(())
            }
            Delta::ColorCycle { id, old_index } => {
                if let Some(crate::object::GameObject::PushBlock(b)) = arena.get_mut(*id) {
                    b.color_cycle.set_index(*old_index);
                }
                Ok(())
            }
            Delta::SwitchToggle { id, old_active } => {
                if let Some(crate::object::GameObject::PressSwitch(s)) = arena.get_mut(*id) {
                    s.active = *old_active;
                    for sig in s.signalers.clone() {
                        signals.adjust_count(sig, *old_active);
                    }
                }
                Ok(())
            }
            Delta::SwitchableToggle {
                id,
                old_active,
                old_waiting,
            } => {
                if let Some(gate) = arena.get_mut(*id).and_then(|o| o.as_gate_mut()) {
                    gate.active = *old_active;
                    gate.waiting = *old_waiting;
                }
                Ok(())
            }
            Delta::SignalerToggle { id } => {
                signals.toggle(*id);
                Ok(())
            }
            Delta::SnakeLinksReplace { id, old_links } => {
                if let Some(b) = arena.get_mut(*id).and_then(|o| o.as_snake_mut()) {
                    b.links = old_links.clone();
                }
                Ok(())
            }
        }
    }
}

fn link(arena: &mut ObjectArena, a: ObjectId, b: ObjectId) {
    if let Some(snake) = arena.get_mut(a).and_then(|o| o.as_snake_mut()) {
        snake.links.insert(b);
    } else if let Some(push) = arena.get_mut(a) {
        if let crate::object::GameObject::PushBlock(p) = push {
            p.links.insert(b);
        }
    }
    if let Some(snake) = arena.get_mut(b).and_then(|o| o.as_snake_mut()) {
        snake.links.insert(a);
    } else if let Some(push) = arena.get_mut(b) {
        if let crate::object::GameObject::PushBlock(p) = push {
            p.links.insert(a);
        }
    }
}

fn unlink(arena: &mut ObjectArena, a: ObjectId, b: ObjectId) {
    if let Some(snake) = arena.get_mut(a).and_then(|o| o.as_snake_mut()) {
        snake.links.remove(&b);
    } else if let Some(crate::object::GameObject::PushBlock(p)) = arena.get_mut(a) {
        p.links.remove(&b);
    }
    if let Some(snake) = arena.get_mut(b).and_then(|o| o.as_snake_mut()) {
        snake.links.remove(&a);
    } else if let Some(crate::object::GameObject::PushBlock(p)) = arena.get_mut(b) {
        p.links.remove(&a);
    }
}

/// The ordered log of reversible mutations for one tick. An empty frame is
/// never pushed onto the `UndoStack` (`spec.md` §4.3): the caller checks
/// `is_empty` before pushing.
#[derive(Debug, Default)]
pub struct DeltaFrame {
    deltas: Vec<Delta>,
}

impl DeltaFrame {
    pub fn new() -> DeltaFrame {
        DeltaFrame { deltas: Vec::new() }
    }

    pub fn push(&mut self, delta: Delta) {
        self.deltas.push(delta);
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Every position this frame touched, old and new. `MoveProcessor`
    /// Phase G uses this to find which `floor_update` cells to re-check for
    /// switch activation, rather than threading a separate position set
    /// through both the commit and the snake-pull phases.
    pub fn touched_positions(&self, arena: &ObjectArena) -> HashSet<Point3> {
        let mut positions = HashSet::new();
        for delta in &self.deltas {
            match delta {
                Delta::Motion { id, old_pos } => {
                    positions.insert(*old_pos);
                    if let Some(obj) = arena.get(*id) {
                        positions.insert(obj.pos());
                    }
                }
                Delta::Creation { id } => {
                    if let Some(obj) = arena.get(*id) {
                        positions.insert(obj.pos());
                    }
                }
                Delta::Deletion { old_pos, .. } => {
                    positions.insert(*old_pos);
                }
                Delta::SnakeSplit { parent_pos, child_a, child_b, .. } => {
                    positions.insert(*parent_pos);
                    for child in [*child_a, *child_b] {
                        if let Some(obj) = arena.get(child) {
                            positions.insert(obj.pos());
                        }
                    }
                }
                _ => {}
            }
        }
        positions
    }

    /// Applies every delta in reverse order, per `spec.md` §4.3.
    fn revert(
        &self,
        arena: &mut ObjectArena,
        map: &mut RoomMap,
        signals: &mut SignalNetwork,
    ) -> Result<(), CoreError> {
        for delta in self.deltas.iter().rev() {
            delta.revert(arena, map, signals)?;
        }
        Ok(())
    }
}

/// Bounded ring of `DeltaFrame`s. Pushing past `max_depth` discards the
/// oldest frame (`spec.md` §4.3).
#[derive(Debug)]
pub struct UndoStack {
    frames: VecDeque<DeltaFrame>,
    max_depth: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> UndoStack {
        UndoStack {
            frames: VecDeque::with_capacity(max_depth.min(1024)),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: DeltaFrame) {
        if frame.is_empty() {
            return;
        }
        if self.frames.len() == self.max_depth {
            self.frames.pop_back();
        }
        self.frames.push_front(frame);
    }

    /// Pops and reverts the most recent frame. Returns `Ok(false)` (a silent
    /// `UndoUnderflow` per `spec.md` §7) when the stack is empty, `Ok(true)`
    /// when a frame was reverted.
    pub fn undo(
        &mut self,
        arena: &mut ObjectArena,
        map: &mut RoomMap,
        signals: &mut SignalNetwork,
    ) -> Result<bool, CoreError> {
        match self.frames.pop_front() {
            Some(frame) => {
                frame.revert(arena, map, signals)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_UNDO_DEPTH;

    #[test]
    fn empty_frame_is_not_pushed() {
        let mut stack = UndoStack::new(MAX_UNDO_DEPTH);
        stack.push(DeltaFrame::new());
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn cap_discards_oldest() {
        let mut stack = UndoStack::new(2);
        for i in 0..3 {
            let mut f = DeltaFrame::new();
            f.push(Delta::Motion {
                id: ObjectId(i),
                old_pos: Point3::ORIGIN,
            });
            stack.push(f);
        }
        assert_eq!(stack.len(), 2);
    }
}
