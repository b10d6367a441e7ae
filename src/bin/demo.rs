extern crate sdl2;

use std::collections::HashSet;
use std::time::Duration;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::WindowCanvas;

use sokoban3d_core::arena::ObjectArena;
use sokoban3d_core::config::{DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, MAX_COOLDOWN};
use sokoban3d_core::geometry::{Direction, Point3};
use sokoban3d_core::object::{ColorCycle, GameObject, PlayerData, PushBlockData, StickyLevel};
use sokoban3d_core::room_map::RoomMap;
use sokoban3d_core::signal::SignalNetwork;
use sokoban3d_core::{Engine, RenderSink};

const SCREEN_WIDTH: u32 = 800;
const SCREEN_HEIGHT: u32 = 600;
const MESH: i32 = 40;

/// Draws straight onto a `WindowCanvas`, mirroring the prototype's
/// `GameObject::draw(&self, canvas: &mut WindowCanvas)` method — the only
/// difference is the core hands this sink objects by description
/// (`set_model`/`set_color`/`set_tex`, then `draw_cube`) instead of calling
/// a method the object itself implements.
struct CanvasSink<'a> {
    canvas: &'a mut WindowCanvas,
    pos: Point3,
    color: Color,
}

impl<'a> CanvasSink<'a> {
    fn new(canvas: &'a mut WindowCanvas) -> CanvasSink<'a> {
        CanvasSink {
            canvas,
            pos: Point3::ORIGIN,
            color: Color::RGB(0, 0, 0),
        }
    }
}

impl<'a> RenderSink for CanvasSink<'a> {
    fn set_model(&mut self, pos: Point3) {
        self.pos = pos;
    }

    fn set_color(&mut self, r: u8, g: u8, b: u8) {
        self.color = Color::RGB(r, g, b);
    }

    // The demo is a top-down 2D projection of the 3D core, so texture
    // coordinates don't correspond to anything drawable; tracked only to
    // exercise the `RenderSink` contract the way a real 3D host would use it.
    fn set_tex(&mut self, _tex_coord: u8) {}

    fn draw_cube(&mut self) {
        self.canvas.set_draw_color(self.color);
        let rect = Rect::new(MESH * self.pos.x, MESH * self.pos.y, MESH as u32, MESH as u32);
        self.canvas.fill_rect(rect).expect("failed to draw cube rect");
    }
}

fn build_room() -> Engine {
    let mut arena = ObjectArena::new();
    let mut map = RoomMap::new(DEFAULT_BOARD_WIDTH, DEFAULT_BOARD_HEIGHT);
    let signals = SignalNetwork::new();

    let player_id = arena.reserve_id();
    arena.insert(GameObject::Player(PlayerData {
        id: player_id,
        pos: Point3::new(3, 3, 0),
        riding: None,
    }));
    map.put_quiet(player_id, &arena).unwrap();

    let wall_id = arena.reserve_id();
    arena.insert(GameObject::Wall {
        id: wall_id,
        pos: Point3::new(5, 5, 0),
    });
    map.put_quiet(wall_id, &arena).unwrap();

    let block_id = arena.reserve_id();
    arena.insert(GameObject::PushBlock(PushBlockData {
        id: block_id,
        pos: Point3::new(8, 4, 0),
        sticky: StickyLevel::NonStick,
        color_cycle: ColorCycle::single(100),
        car: false,
        links: HashSet::new(),
    }));
    map.put_quiet(block_id, &arena).unwrap();

    Engine::new(arena, map, signals, player_id)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let sdl = sdl2::init().unwrap();
    let video_subsystem = sdl.video().unwrap();
    let window = video_subsystem.window("sokoban3d", SCREEN_WIDTH, SCREEN_HEIGHT).build().unwrap();
    let mut canvas = window.into_canvas().build().unwrap();

    let mut key_movement = std::collections::HashMap::new();
    {
        use Keycode::*;
        key_movement.insert(Left, Direction::MinusX);
        key_movement.insert(Right, Direction::PlusX);
        key_movement.insert(Down, Direction::MinusY);
        key_movement.insert(Up, Direction::PlusY);
    }

    let mut buffered_key: Option<Keycode> = None;
    let mut buffered_fresh = false;
    let mut prev_keys = HashSet::new();
    let mut undo_cooldown = 0u32;

    let mut event_pump = sdl.event_pump().unwrap();
    let mut engine = build_room();

    'mainloop: loop {
        canvas.set_draw_color(Color::RGB(150, 100, 150));
        canvas.clear();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => break 'mainloop,
                _ => (),
            }
        }

        let keys: HashSet<Keycode> = event_pump.keyboard_state().pressed_scancodes().filter_map(Keycode::from_scancode).collect();
        let new_keys = &keys - &prev_keys;

        for key in new_keys.iter() {
            if key_movement.contains_key(key) {
                buffered_key = Some(*key);
                buffered_fresh = true;
            }
        }

        if !buffered_fresh && (buffered_key.is_none() || !keys.contains(&buffered_key.unwrap())) {
            buffered_key = None;
            for key in key_movement.keys() {
                if keys.contains(key) {
                    buffered_key = Some(*key);
                }
            }
        }

        if let Some(key) = buffered_key {
            let dir = *key_movement.get(&key).unwrap();
            if engine.attempt_move(dir).expect("move resolution is infallible on a well-formed room") {
                undo_cooldown = 0;
                buffered_fresh = false;
            }
        }

        if new_keys.contains(&Keycode::Z) {
            engine.undo().expect("undo is infallible on a well-formed room");
            undo_cooldown = MAX_COOLDOWN;
        } else if keys.contains(&Keycode::Z) && undo_cooldown == 0 {
            engine.undo().expect("undo is infallible on a well-formed room");
            undo_cooldown = MAX_COOLDOWN;
        }

        if undo_cooldown > 0 {
            undo_cooldown -= 1;
        }

        {
            let mut sink = CanvasSink::new(&mut canvas);
            engine.render(&mut sink);
        }

        prev_keys = keys;
        canvas.present();
        std::thread::sleep(Duration::new(0, 1_000_000_000u32 / 60));
    }
}
