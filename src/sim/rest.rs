//! Rest detection
//!
//! Polled while a turn switch is pending. Only blocks a player has touched
//! are inspected; the rest of the tower is not waited on.

use std::collections::BTreeSet;

use super::state::{Block, BlockId, Body};

/// Both linear and angular speed at or below `threshold`
#[inline]
pub fn is_at_rest(body: &Body, threshold: f32) -> bool {
    body.velocity.length() <= threshold && body.angular_velocity.length() <= threshold
}

/// Every selected block is at rest. Vacuously true for an empty selection.
pub fn all_at_rest(blocks: &[Block], selection: &BTreeSet<BlockId>, threshold: f32) -> bool {
    selection.iter().all(|id| {
        blocks
            .get(id.0 as usize)
            .map(|b| is_at_rest(&b.body, threshold))
            .unwrap_or(true)
    })
}
