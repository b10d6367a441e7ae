//! Errors the core can raise. See `spec.md` §7.

use thiserror::Error;

use crate::geometry::Point3;
use crate::object::ObjectId;

/// Errors surfaced by `Engine`, `RoomMap`, and the wire codec.
///
/// `InvalidMove` from `spec.md` §7 is deliberately absent here: a fully
/// refused push is not an error, it is `Engine::attempt_move` returning
/// `Ok(false)`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two objects were about to occupy the same map cell. This indicates a
    /// bug in the move resolver, not a reachable game state; callers should
    /// treat it as fatal and not attempt to recover.
    #[error("map conflict at {pos:?}: cell already holds object {existing:?}, tried to place {incoming:?}")]
    MapConflict {
        pos: Point3,
        existing: ObjectId,
        incoming: ObjectId,
    },

    /// Deserialization encountered a byte sequence that does not describe a
    /// valid object or map section.
    #[error("corrupt object data: {reason}")]
    CorruptObject { reason: String },

    /// `RoomMap::take`/`put` journaled operation referenced an id the arena
    /// does not have (a live-object invariant violation).
    #[error("object {0:?} is not live in the arena")]
    UnknownObject(ObjectId),
}

// `UndoUnderflow` from `spec.md` §7 is, like `InvalidMove`, deliberately not
// a `CoreError` variant: popping an empty `UndoStack` is a silent no-op.
// `Engine::undo` returns `Ok(())` having reverted nothing; a caller who wants
// to tell the two cases apart can check `engine.undo.is_empty()` directly.
