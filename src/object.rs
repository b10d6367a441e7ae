//! The `GameObject` sum type and its variant payloads.
//!
//! The original C++ source (`original_source/include/block.h`) models this
//! with a `GameObject -> Block -> {PushBlock, SnakeBlock}` inheritance chain
//! and virtual dispatch. Per `spec.md` §9 Design Notes, this is recast as a
//! single tagged enum: behavior that genuinely varies by variant is a method
//! on `GameObject` that matches on `self`, rather than a vtable.

use std::collections::HashSet;

/// Opaque stable id. `NONE` (0) marks "no object"; `WALL` (1) is the
/// sentinel returned for any out-of-bounds horizontal query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NONE: ObjectId = ObjectId(0);
    pub const WALL: ObjectId = ObjectId(1);

    pub fn is_none(self) -> bool {
        self == ObjectId::NONE
    }
}

/// An ordered, non-empty sequence of color bytes with a current index.
/// Editor-only: no move-resolution operation advances a `ColorCycle`
/// (`spec.md` §9's last Open Question, frozen as editor-only state here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCycle {
    colors: Vec<u8>,
    index: usize,
}

impl ColorCycle {
    /// Panics if `colors` is empty: a `ColorCycle` is specified as
    /// non-empty (`spec.md` §3), and constructing one from the editor or
    /// the deserializer with zero colors is a loader bug, not a runtime
    /// condition to recover from.
    pub fn new(colors: Vec<u8>) -> ColorCycle {
        assert!(!colors.is_empty(), "ColorCycle must have at least one color");
        ColorCycle { colors, index: 0 }
    }

    pub fn single(color: u8) -> ColorCycle {
        ColorCycle::new(vec![color])
    }

    /// Reconstructs a cycle with an explicit starting index, e.g. from the
    /// wire format. Panics under the same condition as [`ColorCycle::new`].
    pub fn from_parts(colors: Vec<u8>, index: usize) -> ColorCycle {
        let mut cycle = ColorCycle::new(colors);
        cycle.set_index(index);
        cycle
    }

    pub fn color(&self) -> u8 {
        self.colors[self.index]
    }

    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        debug_assert!(index < self.colors.len());
        self.index = index % self.colors.len();
    }

    pub fn insert_color(&mut self, color: u8) {
        self.colors.push(color);
    }

    /// Advances the cycle one step (or one step backward when `undo` is
    /// true). Returns `false` without moving the index when there is only
    /// one color — callers should treat that as "nothing to journal",
    /// mirroring `Block::cycle_color` in `original_source/src/block.cpp`.
    pub fn cycle(&mut self, undo: bool) -> bool {
        if self.colors.len() == 1 {
            return false;
        }
        let len = self.colors.len();
        self.index = if undo {
            (self.index + len - 1) % len
        } else {
            (self.index + 1) % len
        };
        true
    }
}

/// Stickiness class of a push block. Determines strong/weak adjacency
/// (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyLevel {
    NonStick,
    Weak,
    Sticky,
}

use crate::geometry::Point3;

#[derive(Debug, Clone)]
pub struct PushBlockData {
    pub id: ObjectId,
    pub pos: Point3,
    pub sticky: StickyLevel,
    pub color_cycle: ColorCycle,
    pub car: bool,
    /// Persisted strong (`Sticky`↔`Sticky`) bonds, refreshed by
    /// `MoveProcessor` Phase F after every commit. `Weak`/`NonStick` blocks
    /// never populate this — their adjacency is recomputed fresh by
    /// `ComponentBuilder` on every push instead of persisted.
    pub links: HashSet<ObjectId>,
}

/// A snake block's persistent state. `distance`/`target` are *not* stored
/// here — `spec.md` invariant 5 requires them to be zero/none outside a
/// move step, and the design notes recast them as a per-move
/// `ScratchContext` (see `move_processor::Scratch`) keyed by id instead.
#[derive(Debug, Clone)]
pub struct SnakeBlockData {
    pub id: ObjectId,
    pub pos: Point3,
    pub color: u8,
    pub ends: u8,
    pub links: HashSet<ObjectId>,
    pub car: bool,
}

impl SnakeBlockData {
    pub fn has_room_for_link(&self) -> bool {
        (self.links.len() as u8) < self.ends
    }
}

#[derive(Debug, Clone)]
pub struct PressSwitchData {
    pub id: ObjectId,
    pub pos: Point3,
    pub color: u8,
    pub persistent: bool,
    pub active: bool,
    pub signalers: Vec<crate::signal::SignalerId>,
}

/// The player itself. Modeled as a plain `GameObject` variant (rather than
/// living outside the arena) so `RoomMap`/`ComponentBuilder` see it like any
/// other occupant — `original_source/include/common.h`'s `ObjCode::Player`
/// and `RidingState` motivate keeping it a first-class object instead of a
/// bolt-on field on `Engine`.
#[derive(Debug, Clone)]
pub struct PlayerData {
    pub id: ObjectId,
    pub pos: Point3,
    /// The car currently being ridden, if any. A player rides at most one
    /// car at a time (`spec.md` glossary: "Car").
    pub riding: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct GateData {
    pub id: ObjectId,
    pub pos: Point3,
    pub default: bool,
    pub active: bool,
    pub waiting: bool,
}

impl GateData {
    /// `default XOR active` — see `spec.md` §3 invariant 7.
    pub fn is_open(&self) -> bool {
        self.default ^ self.active
    }

    pub fn is_blocking(&self) -> bool {
        !self.is_open()
    }
}

/// The tagged sum type replacing the source's `GameObject -> Block ->
/// {PushBlock, SnakeBlock}` inheritance chain.
#[derive(Debug, Clone)]
pub enum GameObject {
    Wall { id: ObjectId, pos: Point3 },
    PushBlock(PushBlockData),
    SnakeBlock(SnakeBlockData),
    PressSwitch(PressSwitchData),
    Gate(GateData),
    Player(PlayerData),
}

impl GameObject {
    pub fn id(&self) -> ObjectId {
        match self {
            GameObject::Wall { id, .. } => *id,
            GameObject::PushBlock(b) => b.id,
            GameObject::SnakeBlock(b) => b.id,
            GameObject::PressSwitch(s) => s.id,
            GameObject::Gate(g) => g.id,
            GameObject::Player(p) => p.id,
        }
    }

    pub fn pos(&self) -> Point3 {
        match self {
            GameObject::Wall { pos, .. } => *pos,
            GameObject::PushBlock(b) => b.pos,
            GameObject::SnakeBlock(b) => b.pos,
            GameObject::PressSwitch(s) => s.pos,
            GameObject::Gate(g) => g.pos,
            GameObject::Player(p) => p.pos,
        }
    }

    pub fn set_pos(&mut self, pos: Point3) {
        match self {
            GameObject::Wall { pos: p, .. } => *p = pos,
            GameObject::PushBlock(b) => b.pos = pos,
            GameObject::SnakeBlock(b) => b.pos = pos,
            GameObject::PressSwitch(s) => s.pos = pos,
            GameObject::Gate(g) => g.pos = pos,
            GameObject::Player(p) => p.pos = pos,
        }
    }

    /// Whether a push can ever move this object at all. Walls, gates, and
    /// the player are never pushable — the player only ever initiates a
    /// push, never receives one.
    pub fn is_pushable(&self) -> bool {
        !matches!(self, GameObject::Wall { .. } | GameObject::Gate(_) | GameObject::Player(_))
    }

    /// `Some(level)` for push blocks, `None` for everything else —
    /// `ComponentBuilder` uses this to decide strong/weak adjacency.
    pub fn sticky_level(&self) -> Option<StickyLevel> {
        match self {
            GameObject::PushBlock(b) => Some(b.sticky),
            _ => None,
        }
    }

    /// The adjacency color used for sticky/weak/snake linking. Push blocks
    /// use their `ColorCycle`'s current color; snake blocks have a plain
    /// color; everything else has none.
    pub fn link_color(&self) -> Option<u8> {
        match self {
            GameObject::PushBlock(b) => Some(b.color_cycle.color()),
            GameObject::SnakeBlock(b) => Some(b.color),
            _ => None,
        }
    }

    pub fn as_snake(&self) -> Option<&SnakeBlockData> {
        match self {
            GameObject::SnakeBlock(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_snake_mut(&mut self) -> Option<&mut SnakeBlockData> {
        match self {
            GameObject::SnakeBlock(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_gate(&self) -> Option<&GateData> {
        match self {
            GameObject::Gate(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_gate_mut(&mut self) -> Option<&mut GateData> {
        match self {
            GameObject::Gate(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_press_switch(&self) -> Option<&PressSwitchData> {
        match self {
            GameObject::PressSwitch(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_press_switch_mut(&mut self) -> Option<&mut PressSwitchData> {
        match self {
            GameObject::PressSwitch(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_car(&self) -> bool {
        match self {
            GameObject::PushBlock(b) => b.car,
            GameObject::SnakeBlock(b) => b.car,
            _ => false,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerData> {
        match self {
            GameObject::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match self {
            GameObject::Player(p) => Some(p),
            _ => None,
        }
    }
}
