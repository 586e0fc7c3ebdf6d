//! Tower construction
//!
//! Layers of three side-by-side blocks, alternating direction each layer.
//! Even layers run lengthwise along Z and are spread across X; odd layers are
//! turned a quarter and spread across Z.

use glam::Vec3;

use super::state::{Block, BlockId, Body, Visual, VisualId};
use crate::consts::*;

/// Rest pose of block `index` in a freshly built tower: (center, half extents, yaw)
pub fn block_pose(index: u32) -> (Vec3, Vec3, f32) {
    let layer = index / BLOCKS_PER_LAYER;
    let slot = index % BLOCKS_PER_LAYER;
    let along_x = layer % 2 == 0;

    let offset = -BLOCK_WIDTH + slot as f32 * BLOCK_WIDTH;
    let y = GROUND_HEIGHT + BLOCK_HEIGHT / 2.0 + layer as f32 * BLOCK_HEIGHT;

    if along_x {
        (
            Vec3::new(offset, y, 0.0),
            Vec3::new(BLOCK_WIDTH / 2.0, BLOCK_HEIGHT / 2.0, BLOCK_LENGTH / 2.0),
            0.0,
        )
    } else {
        (
            Vec3::new(0.0, y, offset),
            Vec3::new(BLOCK_LENGTH / 2.0, BLOCK_HEIGHT / 2.0, BLOCK_WIDTH / 2.0),
            std::f32::consts::FRAC_PI_2,
        )
    }
}

/// Build `count` blocks and their visuals, ids assigned in creation order.
/// Each block and its visual reference each other.
pub fn build_tower(count: u32) -> (Vec<Block>, Vec<Visual>) {
    let mut blocks = Vec::with_capacity(count as usize);
    let mut visuals = Vec::with_capacity(count as usize);

    for index in 0..count {
        let (position, half_extents, yaw) = block_pose(index);
        let id = BlockId(index);
        let visual = VisualId(index);

        blocks.push(Block {
            id,
            visual,
            body: Body::new(position, half_extents, yaw),
            removed: false,
            missing: false,
        });
        visuals.push(Visual {
            id: visual,
            block: id,
            position,
            yaw,
            half_extents,
            visible: true,
        });
    }

    (blocks, visuals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::TowerBounds;

    #[test]
    fn test_tower_shape() {
        let (blocks, visuals) = build_tower(BLOCK_COUNT);
        assert_eq!(blocks.len(), 30);
        assert_eq!(visuals.len(), 30);

        // Bottom layer spread across X
        assert!((blocks[0].body.position.x + 0.06).abs() < 1e-6);
        assert!(blocks[1].body.position.x.abs() < 1e-6);
        assert!((blocks[2].body.position.x - 0.06).abs() < 1e-6);

        // Second layer turned and spread across Z
        assert!((blocks[3].body.position.z + 0.06).abs() < 1e-6);
        assert!(blocks[3].body.position.x.abs() < 1e-6);
        assert!(blocks[3].body.yaw > 1.5);
    }

    #[test]
    fn test_layers_stack_flush() {
        let (blocks, _) = build_tower(BLOCK_COUNT);
        assert!((blocks[0].body.bottom() - GROUND_HEIGHT).abs() < 1e-6);
        for layer in 1..LAYER_COUNT {
            let below = &blocks[((layer - 1) * BLOCKS_PER_LAYER) as usize].body;
            let above = &blocks[(layer * BLOCKS_PER_LAYER) as usize].body;
            assert!((above.bottom() - below.top()).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fresh_tower_is_inside_bounds() {
        let (blocks, _) = build_tower(BLOCK_COUNT);
        let bounds = TowerBounds::default();
        for block in &blocks {
            assert!(!bounds.is_outside(block.body.position, BOUNDS_FOOTPRINT));
        }
    }
}
