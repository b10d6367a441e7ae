//! The bespoke byte-oriented wire format named in `spec.md` §6.
//!
//! Grounded in `original_source`'s `MapFileO`/`MapFileI` helpers (referenced
//! throughout `src/block.cpp` and `src/switch.cpp` as `file << color_;` /
//! `file.read_point3()`): a fixed, order-sensitive byte stream, not a
//! self-describing `serde` format. `ObjCode`/`MapCode` values are frozen by
//! `spec.md` §6 ("values are fixed and must never be reused"), so this
//! module hand-rolls the codec rather than deriving it.

use crate::error::CoreError;
use crate::geometry::Point3;
use crate::object::{
    ColorCycle, GameObject, GateData, PlayerData, PressSwitchData, PushBlockData, SnakeBlockData,
    StickyLevel,
};
use std::collections::HashSet;

/// Fixed `ObjCode` byte values. Never renumber these — they are a wire
/// contract (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjCode {
    None = 0,
    Wall = 1,
    NonStickBlock = 2,
    WeakBlock = 3,
    StickyBlock = 4,
    SnakeBlock = 5,
    Player = 6,
    Gate = 7,
    PressSwitch = 8,
    PlayerWall = 9,
    Door = 10,
}

impl ObjCode {
    fn from_byte(b: u8) -> Option<ObjCode> {
        Some(match b {
            0 => ObjCode::None,
            1 => ObjCode::Wall,
            2 => ObjCode::NonStickBlock,
            3 => ObjCode::WeakBlock,
            4 => ObjCode::StickyBlock,
            5 => ObjCode::SnakeBlock,
            6 => ObjCode::Player,
            7 => ObjCode::Gate,
            8 => ObjCode::PressSwitch,
            9 => ObjCode::PlayerWall,
            10 => ObjCode::Door,
            _ => return None,
        })
    }
}

/// Fixed `MapCode` section markers for whole-room files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MapCode {
    SmallDims = 1,
    PlayerDefault = 2,
    Objects = 3,
    CameraRect = 4,
    SnakeLink = 5,
    DoorDest = 6,
    Signaler = 7,
    End = 255,
}

/// Append-only byte writer, mirroring `MapFileO`.
#[derive(Debug, Default)]
pub struct MapWriter {
    bytes: Vec<u8>,
}

impl MapWriter {
    pub fn new() -> MapWriter {
        MapWriter { bytes: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_point3(&mut self, p: Point3) {
        self.write_i32(p.x);
        self.write_i32(p.y);
        self.write_i32(p.z);
    }

    pub fn write_bytes(&mut self, buf: &[u8]) {
        self.write_u32(buf.len() as u32);
        self.bytes.extend_from_slice(buf);
    }
}

/// Cursor-based byte reader, mirroring `MapFileI`.
pub struct MapReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MapReader<'a> {
    pub fn new(bytes: &'a [u8]) -> MapReader<'a> {
        MapReader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.pos + n > self.bytes.len() {
            return Err(CoreError::CorruptObject {
                reason: format!("truncated payload: wanted {n} bytes at offset {}", self.pos),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CoreError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, CoreError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_point3(&mut self) -> Result<Point3, CoreError> {
        Ok(Point3::new(self.read_i32()?, self.read_i32()?, self.read_i32()?))
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8], CoreError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }
}

/// Encodes a single object as `{ObjCode, Point3, per-type payload}`
/// (`spec.md` §6). A `PushBlock`'s full `ColorCycle` (every color plus the
/// current index) is written, not just the active color, so a round trip
/// through this codec never drops the cycle's other entries. Link sets are
/// encoded as ids relative to nothing (raw `u32`s) — resolving them back
/// into live links after a whole-room load is the loader's job, same as the
/// original's two-pass `SnakeLink` section.
pub fn encode_object(obj: &GameObject) -> Vec<u8> {
    let mut w = MapWriter::new();
    match obj {
        GameObject::Wall { id, pos } => {
            w.write_u8(ObjCode::Wall as u8);
            w.write_point3(*pos);
            w.write_u32(id.0);
        }
        GameObject::PushBlock(b) => {
            let code = match b.sticky {
                StickyLevel::NonStick => ObjCode::NonStickBlock,
                StickyLevel::Weak => ObjCode::WeakBlock,
                StickyLevel::Sticky => ObjCode::StickyBlock,
            };
            w.write_u8(code as u8);
            w.write_point3(b.pos);
            w.write_u32(b.id.0);
            w.write_bool(b.car);
            let colors = b.color_cycle.colors();
            w.write_u8(colors.len() as u8);
            for &c in colors {
                w.write_u8(c);
            }
            w.write_u8(b.color_cycle.index() as u8);
            w.write_u8(b.links.len() as u8);
            for link in &b.links {
                w.write_u32(link.0);
            }
        }
        GameObject::SnakeBlock(b) => {
            w.write_u8(ObjCode::SnakeBlock as u8);
            w.write_point3(b.pos);
            w.write_u32(b.id.0);
            w.write_bool(b.car);
            w.write_u8(b.color);
            w.write_u8(b.ends);
            w.write_u8(b.links.len() as u8);
            for link in &b.links {
                w.write_u32(link.0);
            }
        }
        GameObject::PressSwitch(s) => {
            w.write_u8(ObjCode::PressSwitch as u8);
            w.write_point3(s.pos);
            w.write_u32(s.id.0);
            w.write_u8(s.color);
            w.write_bool(s.persistent);
            w.write_bool(s.active);
        }
        GameObject::Gate(g) => {
            w.write_u8(ObjCode::Gate as u8);
            w.write_point3(g.pos);
            w.write_u32(g.id.0);
            w.write_bool(g.default);
            w.write_bool(g.active);
            w.write_bool(g.waiting);
        }
        GameObject::Player(p) => {
            w.write_u8(ObjCode::Player as u8);
            w.write_point3(p.pos);
            w.write_u32(p.id.0);
            w.write_u32(p.riding.unwrap_or(crate::object::ObjectId::NONE).0);
        }
    }
    w.into_bytes()
}

/// Inverse of [`encode_object`]. `PressSwitch::signalers` is left empty on
/// decode; re-linking switches to signalers is the whole-room loader's job
/// (the `Signaler` `MapCode` section, read after all objects).
pub fn decode_object(bytes: &[u8]) -> Result<GameObject, CoreError> {
    let mut r = MapReader::new(bytes);
    let code_byte = r.read_u8()?;
    let pos = r.read_point3()?;
    let code = ObjCode::from_byte(code_byte).ok_or_else(|| CoreError::CorruptObject {
        reason: format!("unknown ObjCode byte {code_byte}"),
    })?;
    let obj = match code {
        ObjCode::None => {
            return Err(CoreError::CorruptObject {
                reason: "encountered NONE ObjCode inside an object record".into(),
            })
        }
        ObjCode::Wall => {
            let id = crate::object::ObjectId(r.read_u32()?);
            GameObject::Wall { id, pos }
        }
        ObjCode::NonStickBlock | ObjCode::WeakBlock | ObjCode::StickyBlock => {
            let id = crate::object::ObjectId(r.read_u32()?);
            let car = r.read_bool()?;
            let color_count = r.read_u8()?;
            let mut colors = Vec::with_capacity(color_count as usize);
            for _ in 0..color_count {
                colors.push(r.read_u8()?);
            }
            let index = r.read_u8()? as usize;
            let n = r.read_u8()?;
            let mut links = HashSet::new();
            for _ in 0..n {
                links.insert(crate::object::ObjectId(r.read_u32()?));
            }
            let sticky = match code {
                ObjCode::NonStickBlock => StickyLevel::NonStick,
                ObjCode::WeakBlock => StickyLevel::Weak,
                ObjCode::StickyBlock => StickyLevel::Sticky,
                _ => unreachable!(),
            };
            GameObject::PushBlock(PushBlockData {
                id,
                pos,
                sticky,
                color_cycle: ColorCycle::from_parts(colors, index),
                car,
                links,
            })
        }
        ObjCode::SnakeBlock => {
            let id = crate::object::ObjectId(r.read_u32()?);
            let car = r.read_bool()?;
            let color = r.read_u8()?;
            let ends = r.read_u8()?;
            let n = r.read_u8()?;
            let mut links = HashSet::new();
            for _ in 0..n {
                links.insert(crate::object::ObjectId(r.read_u32()?));
            }
            GameObject::SnakeBlock(SnakeBlockData {
                id,
                pos,
                color,
                ends,
                links,
                car,
            })
        }
        ObjCode::PressSwitch => {
            let id = crate::object::ObjectId(r.read_u32()?);
            let color = r.read_u8()?;
            let persistent = r.read_bool()?;
            let active = r.read_bool()?;
            GameObject::PressSwitch(PressSwitchData {
                id,
                pos,
                color,
                persistent,
                active,
                signalers: Vec::new(),
            })
        }
        ObjCode::Gate => {
            let id = crate::object::ObjectId(r.read_u32()?);
            let default = r.read_bool()?;
            let active = r.read_bool()?;
            let waiting = r.read_bool()?;
            GameObject::Gate(GateData {
                id,
                pos,
                default,
                active,
                waiting,
            })
        }
        ObjCode::Player => {
            let id = crate::object::ObjectId(r.read_u32()?);
            let riding_raw = crate::object::ObjectId(r.read_u32()?);
            let riding = if riding_raw.is_none() { None } else { Some(riding_raw) };
            GameObject::Player(PlayerData { id, pos, riding })
        }
        ObjCode::PlayerWall | ObjCode::Door => {
            return Err(CoreError::CorruptObject {
                reason: format!("{code:?} is a render-only placeholder with no core representation"),
            })
        }
    };
    Ok(obj)
}
