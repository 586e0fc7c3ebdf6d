//! Deterministic game core
//!
//! All gameplay decisions live here. This module must stay pure:
//! - Physics is stepped through the `PhysicsWorld` trait only
//! - Time comes in as a frame timestamp, never read from a clock
//! - Stable iteration order (by block ID)
//! - No rendering or platform dependencies

pub mod bounds;
pub mod camera;
pub mod layout;
pub mod physics;
pub mod pick;
pub mod rest;
pub mod state;
pub mod tick;

pub use bounds::{TowerBounds, is_outside_tower};
pub use camera::{Camera, Ray};
pub use layout::build_tower;
pub use physics::{PhysicsWorld, StackWorld};
pub use pick::{pick, ray_box_distance};
pub use rest::{all_at_rest, is_at_rest};
pub use state::{
    Block, BlockId, Body, GameEvent, GameState, Interaction, Outcome, PendingSwitch, Player,
    Visual, VisualId, STABILIZING_TEXT, TIE_TEXT,
};
pub use tick::{InputEvent, tick};
