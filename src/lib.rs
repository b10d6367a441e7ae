//! Move-resolution and undo core for a 3D Sokoban-style puzzle engine.
//!
//! `Engine` is the one public type a host needs to hold: it owns the
//! `ObjectArena`, `RoomMap`, `UndoStack`, and `SignalNetwork`, and exposes
//! the three synchronous entry points the prototype's `main.rs` used to call
//! directly on `WorldMap`/`UndoStack` (`world_map.move_solid(...)`,
//! `undo_stack.pop(&mut world_map)`): `attempt_move`, `undo`, `apply_edit`.

pub mod arena;
pub mod component;
pub mod config;
pub mod delta;
pub mod error;
pub mod geometry;
pub mod move_processor;
pub mod object;
pub mod room_map;
pub mod serialize;
pub mod signal;
pub mod snake;

use crate::arena::ObjectArena;
use crate::config::MAX_UNDO_DEPTH;
use crate::delta::{Delta, DeltaFrame, UndoStack};
use crate::error::CoreError;
use crate::geometry::{Direction, Point3};
use crate::move_processor::MoveProcessor;
use crate::object::{GameObject, ObjectId};
use crate::room_map::RoomMap;
use crate::signal::SignalNetwork;

/// Editor-only mutations. Unlike `attempt_move`, these bypass push
/// resolution entirely — they are direct map surgery — but are still
/// journaled so the editor's own undo works the same way as play undo
/// (`spec.md` §4.8 / `SPEC_FULL.md` §4.8).
#[derive(Debug)]
pub enum EditorCommand {
    /// `obj`'s id must already have been reserved via
    /// `Engine::reserve_id`, matching the arena's "reserve, then
    /// construct with the final id in hand" convention.
    Place(GameObject),
    Destroy(ObjectId),
    CycleColor { id: ObjectId, undo: bool },
}

/// One tick's input, per `spec.md` §6: "a function delivering
/// `Option<Direction | Undo | EditorCommand>`".
#[derive(Debug)]
pub enum PlayerInput {
    Move(Direction),
    Undo,
    Edit(EditorCommand),
}

pub trait InputSource {
    fn poll(&mut self) -> Option<PlayerInput>;
}

/// The render sink named in `spec.md` §6: `draw_cube(model_matrix, color,
/// tex_coord)` plus `set_model/color/tex`. `Engine::render` walks `RoomMap`
/// and issues these calls; the sink itself is stateless from the core's
/// point of view, matching the prototype's injected `WindowCanvas` except
/// this trait carries no `sdl2` dependency.
pub trait RenderSink {
    fn set_model(&mut self, pos: Point3);
    fn set_color(&mut self, r: u8, g: u8, b: u8);
    fn set_tex(&mut self, tex_coord: u8);
    fn draw_cube(&mut self);
}

/// Resolves a `GameObject` variant to the render sink calls that draw it.
/// Lives here rather than on `GameObject` itself, since drawing is a host
/// concern the core only describes, never performs.
fn draw_object(obj: &GameObject, sink: &mut dyn RenderSink) {
    let (color, tex) = match obj {
        GameObject::Wall { .. } => ((80, 20, 50), 0),
        GameObject::PushBlock(b) => {
            let c = b.color_cycle.color();
            ((c, 180, 100), 1)
        }
        GameObject::SnakeBlock(b) => ((b.color, 90, 200), 2),
        GameObject::PressSwitch(s) => {
            let base = if s.active { 255 } else { 90 };
            ((base, s.color, 40), 3)
        }
        GameObject::Gate(g) => {
            if g.is_open() {
                ((40, 200, 40), 4)
            } else {
                ((200, 40, 40), 4)
            }
        }
        GameObject::Player(_) => ((230, 240, 200), 5),
    };
    sink.set_model(obj.pos());
    sink.set_color(color.0, color.1, color.2);
    sink.set_tex(tex);
    sink.draw_cube();
}

/// Owns every piece of state a move or undo can touch. The façade named in
/// `SPEC_FULL.md` §4.8.
pub struct Engine {
    pub arena: ObjectArena,
    pub map: RoomMap,
    pub undo: UndoStack,
    pub signals: SignalNetwork,
    pub player: ObjectId,
}

impl Engine {
    pub fn new(arena: ObjectArena, map: RoomMap, signals: SignalNetwork, player: ObjectId) -> Engine {
        Engine {
            arena,
            map,
            undo: UndoStack::new(MAX_UNDO_DEPTH),
            signals,
            player,
        }
    }

    pub fn reserve_id(&mut self) -> ObjectId {
        self.arena.reserve_id()
    }

    /// Resolves a single directional push. Returns whether anything moved;
    /// a fully refused push is `Ok(false)`, not an error (`spec.md` §7).
    #[tracing::instrument(level = "info", skip(self))]
    pub fn attempt_move(&mut self, dir: Direction) -> Result<bool, CoreError> {
        let (moved, frame) = MoveProcessor::run(&mut self.arena, &mut self.map, &mut self.signals, self.player, dir)?;
        if moved {
            tracing::info!(deltas = frame.len(), "move committed");
            self.undo.push(frame);
        } else {
            tracing::debug!("move refused");
        }
        Ok(moved)
    }

    /// Pops and reverts the most recent frame. `spec.md` §7 specifies
    /// `UndoUnderflow` as a silent no-op, so this never errors on an empty
    /// stack — it simply has nothing to do.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn undo(&mut self) -> Result<(), CoreError> {
        let reverted = self.undo.undo(&mut self.arena, &mut self.map, &mut self.signals)?;
        tracing::info!(reverted, "undo requested");
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self, cmd))]
    pub fn apply_edit(&mut self, cmd: EditorCommand) -> Result<(), CoreError> {
        let mut frame = DeltaFrame::new();
        match cmd {
            EditorCommand::Place(obj) => {
                let id = self.arena.insert(obj);
                self.map.put(id, &self.arena, &mut frame)?;
            }
            EditorCommand::Destroy(id) => {
                self.map.take(id, &mut self.arena, &mut frame)?;
            }
            EditorCommand::CycleColor { id, undo } => {
                if let Some(GameObject::PushBlock(b)) = self.arena.get_mut(id) {
                    let old_index = b.color_cycle.index();
                    if b.color_cycle.cycle(undo) {
                        frame.push(Delta::ColorCycle { id, old_index });
                    }
                }
            }
        }
        if !frame.is_empty() {
            tracing::info!(deltas = frame.len(), "edit applied");
            self.undo.push(frame);
        }
        Ok(())
    }

    /// Walks every occupied cell across every known z-layer and issues
    /// `draw_cube` calls to `sink`, in row-major (y, then x) order within
    /// each layer. `spec.md` §6: "the core walks the map each frame and
    /// issues these calls".
    pub fn render(&self, sink: &mut dyn RenderSink) {
        let mut zs: Vec<i32> = self.map.z_layers().collect();
        zs.sort_unstable();
        for z in zs {
            for y in 0..self.map.height() {
                for x in 0..self.map.width() {
                    let id = self.map.occupant(Point3::new(x, y, z));
                    if id.is_none() {
                        continue;
                    }
                    if let Some(obj) = self.arena.get(id) {
                        draw_object(obj, sink);
                    }
                }
            }
        }
    }
}
