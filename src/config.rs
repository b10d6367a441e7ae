//! Tunable constants. No environment variables, no config file — the core
//! consumes only these compiled-in defaults (see `spec.md` §6).

/// Oldest frames are discarded once the undo stack reaches this many entries.
pub const MAX_UNDO_DEPTH: usize = 1000;

/// Animation/cooldown budget a host may use to throttle repeated undo input;
/// the core itself does not use this directly, but exposes it for hosts that
/// want to reproduce a held-key debounce on top of `Engine::undo`.
pub const MAX_COOLDOWN: u32 = 5;

/// Default room width in cells, used when a host constructs a `RoomMap`
/// without an explicit size (e.g. a fresh editor room).
pub const DEFAULT_BOARD_WIDTH: i32 = 17;

/// Default room height in cells.
pub const DEFAULT_BOARD_HEIGHT: i32 = 13;
