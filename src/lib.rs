//! Tumble Tower - A two-player block stacking game
//!
//! Core modules:
//! - `sim`: Deterministic game core (tower, turns, bounds and rest checks)
//! - `settings`: Tunable parameters, persisted in LocalStorage on web
//! - `error`: Error taxonomy shared by the core and the host

pub mod error;
pub mod settings;
pub mod sim;

pub use error::GameError;
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Physics timestep advanced once per animation frame
    pub const PHYSICS_DT: f32 = 1.0 / 600.0;

    /// Tower shape
    pub const LAYER_COUNT: u32 = 10;
    pub const BLOCKS_PER_LAYER: u32 = 3;
    pub const BLOCK_COUNT: u32 = LAYER_COUNT * BLOCKS_PER_LAYER;

    /// Block dimensions (width along the layout axis, height, length)
    pub const BLOCK_WIDTH: f32 = 0.06;
    pub const BLOCK_HEIGHT: f32 = 0.03;
    pub const BLOCK_LENGTH: f32 = 0.18;

    /// Height of the table the tower stands on
    pub const GROUND_HEIGHT: f32 = 0.9;

    /// Square footprint used by the out-of-bounds test
    pub const BOUNDS_FOOTPRINT: f32 = 0.03;
    /// Tower bounds half extent on X and Z (centered on the origin)
    pub const TOWER_HALF_EXTENT: f32 = 0.1;

    /// Linear and angular speed at or below which a block counts as settled
    pub const REST_THRESHOLD: f32 = 0.1;
    /// Interval between rest polls while a turn switch is pending
    pub const REST_POLL_INTERVAL_MS: f64 = 100.0;
    /// Force the turn switch if blocks never settle
    pub const REST_TIMEOUT_MS: f64 = 10_000.0;

    /// World units per screen pixel while dragging
    pub const DRAG_SENSITIVITY: f32 = 0.001;

    /// Where removed blocks are parked so they never collide again
    pub const PARKING_POSITION: Vec3 = Vec3::new(-100.0, -100.0, -100.0);

    /// Physics world defaults
    pub const GRAVITY: f32 = 9.82;
    pub const LINEAR_DAMPING: f32 = 0.05;
    pub const ANGULAR_DAMPING: f32 = 0.05;
}

/// Project a vector onto the horizontal (X/Z) plane and renormalize.
///
/// Returns zero when the vector is vertical.
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Convert client pixel coordinates to normalized device coordinates
/// (x right, y up, both in [-1, 1]).
#[inline]
pub fn client_to_ndc(x: f32, y: f32, width: f32, height: f32) -> glam::Vec2 {
    glam::Vec2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}
