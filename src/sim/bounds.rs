//! Tower bounds containment
//!
//! A block only counts as taken out of the tower once its whole footprint
//! sits past one side of the tower rectangle. Being off-center, or clear on
//! a diagonal through different sides, is not enough.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::TOWER_HALF_EXTENT;

/// Axis-aligned tower rectangle in the X/Z plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for TowerBounds {
    fn default() -> Self {
        Self::centered(TOWER_HALF_EXTENT, TOWER_HALF_EXTENT)
    }
}

impl TowerBounds {
    /// Rectangle centered on the origin
    pub fn centered(half_x: f32, half_z: f32) -> Self {
        Self {
            min_x: -half_x,
            max_x: half_x,
            min_z: -half_z,
            max_z: half_z,
        }
    }

    /// Footprint corners of a square of side `footprint` centered at `position`
    /// (height ignored), as (x, z) pairs.
    #[inline]
    pub fn corners(position: Vec3, footprint: f32) -> [Vec2; 4] {
        let h = footprint / 2.0;
        [
            Vec2::new(position.x + h, position.z + h),
            Vec2::new(position.x + h, position.z - h),
            Vec2::new(position.x - h, position.z + h),
            Vec2::new(position.x - h, position.z - h),
        ]
    }

    /// True only if all four footprint corners lie strictly beyond the same
    /// single boundary. A corner exactly on a boundary is still inside.
    pub fn is_outside(&self, position: Vec3, footprint: f32) -> bool {
        let corners = Self::corners(position, footprint);

        let right = corners.iter().all(|c| c.x > self.max_x);
        let left = corners.iter().all(|c| c.x < self.min_x);
        let front = corners.iter().all(|c| c.y > self.max_z);
        let back = corners.iter().all(|c| c.y < self.min_z);

        right || left || front || back
    }
}

/// Out-of-bounds test against an explicit tower rectangle
#[inline]
pub fn is_outside_tower(position: Vec3, footprint: f32, bounds: &TowerBounds) -> bool {
    bounds.is_outside(position, footprint)
}
