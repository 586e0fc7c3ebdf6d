//! Camera basis for dragging and picking
//!
//! Dragging only uses the camera's yaw: forward is flattened onto the ground
//! plane so a block never moves vertically under the pointer.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::flatten;

/// A ray in world space (direction normalized)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

/// Perspective camera looking from `eye` at `target`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.2, 0.9),
            target: Vec3::new(0.0, 1.0, 0.0),
            fov_y: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }
}

impl Camera {
    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    /// Horizontal drag axes: (forward, right), both on the X/Z plane
    pub fn drag_basis(&self) -> (Vec3, Vec3) {
        let forward = flatten(self.forward());
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        (forward, right)
    }

    /// World-space X/Z movement for a screen-space pointer delta.
    ///
    /// Screen right moves along the camera's right; screen up (negative
    /// pixel y) moves away from the camera.
    pub fn drag_movement(&self, delta: Vec2, sensitivity: f32) -> Vec3 {
        let (forward, right) = self.drag_basis();
        let movement = delta * sensitivity;
        let world = right * movement.x + forward * -movement.y;
        Vec3::new(world.x, 0.0, world.z)
    }

    /// Ray through a point given in normalized device coordinates
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let forward = self.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_h = (self.fov_y / 2.0).tan();
        let half_w = half_h * self.aspect;

        let dir = (forward + right * ndc.x * half_w + up * ndc.y * half_h).normalize_or_zero();
        Ray {
            origin: self.eye,
            dir,
        }
    }
}
