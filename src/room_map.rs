//! Per-layer spatial index: `(x, y, z) -> ObjectId`.
//!
//! Grounded in the prototype's `WorldMap`/`MapCell` (a dense
//! `Vec<Vec<MapCell>>` of per-layer `Vec<Box<dyn GameObject>>`), generalized
//! per `spec.md` §3/§4.2 into the "newer, layered `RoomMap`" the spec calls
//! out as superseding the flat `WorldMap`: horizontal layers are addressed
//! by `z`, ground level (`z == 0`) is a dense array sized to the room
//! (objects are everywhere, so paying the allocation up front wins), and
//! any other `z` is a sparse map created lazily (most rooms only ever put
//! one or two objects above floor level — a gate and whatever sits on it).

use std::collections::HashMap;

use crate::arena::ObjectArena;
use crate::delta::{Delta, DeltaFrame};
use crate::error::CoreError;
use crate::geometry::{Direction, Point3};
use crate::object::ObjectId;

#[derive(Debug)]
enum MapLayer {
    Dense { width: i32, height: i32, cells: Vec<ObjectId> },
    Sparse(HashMap<(i32, i32), ObjectId>),
}

impl MapLayer {
    fn dense(width: i32, height: i32) -> MapLayer {
        MapLayer::Dense {
            width,
            height,
            cells: vec![ObjectId::NONE; (width * height) as usize],
        }
    }

    fn get(&self, x: i32, y: i32) -> ObjectId {
        match self {
            MapLayer::Dense { width, height, cells } => {
                if x < 0 || y < 0 || x >= *width || y >= *height {
                    ObjectId::NONE
                } else {
                    cells[(y * *width + x) as usize]
                }
            }
            MapLayer::Sparse(map) => map.get(&(x, y)).copied().unwrap_or(ObjectId::NONE),
        }
    }

    fn set(&mut self, x: i32, y: i32, id: ObjectId) {
        match self {
            MapLayer::Dense { width, height, cells } => {
                debug_assert!(x >= 0 && y >= 0 && x < *width && y < *height);
                cells[(y * *width + x) as usize] = id;
            }
            MapLayer::Sparse(map) => {
                if id.is_none() {
                    map.remove(&(x, y));
                } else {
                    map.insert((x, y), id);
                }
            }
        }
    }
}

/// The spatial index. Horizontal queries outside `[0,width) x [0,height)`
/// return the `Wall` sentinel id, per `spec.md` §4.2 regardless of `z`.
#[derive(Debug)]
pub struct RoomMap {
    width: i32,
    height: i32,
    layers: HashMap<i32, MapLayer>,
}

impl RoomMap {
    pub fn new(width: i32, height: i32) -> RoomMap {
        let mut layers = HashMap::new();
        layers.insert(0, MapLayer::dense(width, height));
        RoomMap { width, height, layers }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Every z-layer that currently exists (has been touched by at least
    /// one `put`/`put_quiet`, or is the ground floor). Used by `Engine::render`
    /// to walk the map without needing to guess the vertical extent.
    pub fn z_layers(&self) -> impl Iterator<Item = i32> + '_ {
        self.layers.keys().copied()
    }

    fn in_horizontal_bounds(&self, p: Point3) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    /// `Some(Wall)` out of horizontal bounds, `None` if no layer exists at
    /// `p.z`, `Some(NONE)` for an empty cell in an existing layer,
    /// `Some(id)` otherwise.
    pub fn view(&self, p: Point3) -> Option<ObjectId> {
        if !self.in_horizontal_bounds(p) {
            return Some(ObjectId::WALL);
        }
        self.layers.get(&p.z).map(|layer| layer.get(p.x, p.y))
    }

    /// Collapses the `view` distinction into "what, if anything, occupies
    /// this cell physically" — a missing layer and an empty cell both read
    /// as `ObjectId::NONE`. This is what `ComponentBuilder` and
    /// `MoveProcessor` use; only the signal-propagation "is there a layer at
    /// all above this gate" check needs the finer-grained `view`.
    pub fn occupant(&self, p: Point3) -> ObjectId {
        self.view(p).unwrap_or(ObjectId::NONE)
    }

    fn layer_mut_for(&mut self, z: i32) -> &mut MapLayer {
        self.layers.entry(z).or_insert_with(|| MapLayer::Sparse(HashMap::new()))
    }

    /// Inserts `id` (whose position is read from the arena) without
    /// journaling. Fails with `MapConflict` if the cell is already occupied.
    pub fn put_quiet(&mut self, id: ObjectId, arena: &ObjectArena) -> Result<(), CoreError> {
        let obj = arena.get(id).ok_or(CoreError::UnknownObject(id))?;
        let pos = obj.pos();
        let existing = self.occupant(pos);
        if !existing.is_none() {
            return Err(CoreError::MapConflict {
                pos,
                existing,
                incoming: id,
            });
        }
        self.layer_mut_for(pos.z).set(pos.x, pos.y, id);
        Ok(())
    }

    /// Removes `id` (whose position is read from the arena) without
    /// journaling.
    pub fn take_quiet(&mut self, id: ObjectId, arena: &ObjectArena) -> Result<(), CoreError> {
        let obj = arena.get(id).ok_or(CoreError::UnknownObject(id))?;
        let pos = obj.pos();
        self.layer_mut_for(pos.z).set(pos.x, pos.y, ObjectId::NONE);
        Ok(())
    }

    /// Removes whatever occupies `pos`, regardless of id. Used to revert a
    /// `Creation` delta, where the arena id is about to be destroyed anyway.
    pub fn take_quiet_at(&mut self, pos: Point3) -> Result<Option<ObjectId>, CoreError> {
        let existing = self.occupant(pos);
        if existing.is_none() {
            return Ok(None);
        }
        self.layer_mut_for(pos.z).set(pos.x, pos.y, ObjectId::NONE);
        Ok(Some(existing))
    }

    /// Journaled insert: places `id` and appends a `Creation` delta.
    pub fn put(&mut self, id: ObjectId, arena: &ObjectArena, frame: &mut DeltaFrame) -> Result<(), CoreError> {
        self.put_quiet(id, arena)?;
        frame.push(Delta::Creation { id });
        Ok(())
    }

    /// Journaled removal: serializes the object into a `Deletion` delta,
    /// removes it from the map, and destroys it in the arena.
    pub fn take(&mut self, id: ObjectId, arena: &mut ObjectArena, frame: &mut DeltaFrame) -> Result<(), CoreError> {
        let obj = arena.get(id).ok_or(CoreError::UnknownObject(id))?;
        let old_pos = obj.pos();
        let encoded = crate::serialize::encode_object(obj);
        self.take_quiet(id, arena)?;
        arena.destroy(id);
        frame.push(Delta::Deletion { encoded, old_pos });
        Ok(())
    }

    /// Equivalent to take-quiet, mutate position, put-quiet, then append a
    /// `Motion` delta (`spec.md` §4.2).
    pub fn shift(
        &mut self,
        id: ObjectId,
        dir: Direction,
        arena: &mut ObjectArena,
        frame: &mut DeltaFrame,
    ) -> Result<(), CoreError> {
        let old_pos = arena.get(id).ok_or(CoreError::UnknownObject(id))?.pos();
        self.take_quiet(id, arena)?;
        let new_pos = old_pos + dir.offset();
        arena.get_mut(id).ok_or(CoreError::UnknownObject(id))?.set_pos(new_pos);
        self.put_quiet(id, arena)?;
        frame.push(Delta::Motion { id, old_pos });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::GameObject;

    fn wall_at(arena: &mut ObjectArena, pos: Point3) -> ObjectId {
        let id = arena.reserve_id();
        arena.insert(GameObject::Wall { id, pos });
        id
    }

    #[test]
    fn out_of_horizontal_bounds_is_wall_sentinel() {
        let map = RoomMap::new(4, 4);
        assert_eq!(map.view(Point3::new(-1, 0, 0)), Some(ObjectId::WALL));
        assert_eq!(map.view(Point3::new(4, 0, 0)), Some(ObjectId::WALL));
    }

    #[test]
    fn missing_z_layer_is_none() {
        let map = RoomMap::new(4, 4);
        assert_eq!(map.view(Point3::new(0, 0, 5)), None);
    }

    #[test]
    fn put_then_view_then_take_round_trips() {
        let mut map = RoomMap::new(4, 4);
        let mut arena = ObjectArena::new();
        let id = wall_at(&mut arena, Point3::new(1, 1, 0));
        map.put_quiet(id, &arena).unwrap();
        assert_eq!(map.occupant(Point3::new(1, 1, 0)), id);
        map.take_quiet(id, &arena).unwrap();
        assert_eq!(map.occupant(Point3::new(1, 1, 0)), ObjectId::NONE);
    }

    #[test]
    fn put_quiet_conflict_is_map_conflict() {
        let mut map = RoomMap::new(4, 4);
        let mut arena = ObjectArena::new();
        let a = wall_at(&mut arena, Point3::new(2, 2, 0));
        let b = wall_at(&mut arena, Point3::new(2, 2, 0));
        map.put_quiet(a, &arena).unwrap();
        assert!(matches!(map.put_quiet(b, &arena), Err(CoreError::MapConflict { .. })));
    }

    #[test]
    fn shift_journals_a_motion_delta_and_moves_the_object() {
        let mut map = RoomMap::new(4, 4);
        let mut arena = ObjectArena::new();
        let id = wall_at(&mut arena, Point3::new(1, 1, 0));
        map.put_quiet(id, &arena).unwrap();
        let mut frame = DeltaFrame::new();
        map.shift(id, Direction::PlusX, &mut arena, &mut frame).unwrap();
        assert_eq!(arena.get(id).unwrap().pos(), Point3::new(2, 1, 0));
        assert_eq!(map.occupant(Point3::new(2, 1, 0)), id);
        assert_eq!(map.occupant(Point3::new(1, 1, 0)), ObjectId::NONE);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn sparse_layer_is_created_lazily_above_floor() {
        let mut map = RoomMap::new(4, 4);
        let mut arena = ObjectArena::new();
        let id = wall_at(&mut arena, Point3::new(0, 0, 3));
        map.put(id, &arena, &mut DeltaFrame::new()).unwrap();
        assert_eq!(map.occupant(Point3::new(0, 0, 3)), id);
        assert_eq!(map.view(Point3::new(0, 0, 3)), Some(id));
    }
}
