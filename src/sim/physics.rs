//! Physics stepping
//!
//! The game core only needs bodies advanced in place by a fixed timestep.
//! `StackWorld` is a small deterministic stepper for a tower of axis-aligned
//! blocks. It handles:
//!
//! - gravity and damping, with landing on the ground or the highest support
//! - slide-off of a body whose center is not over what holds it up
//! - side contacts: overlapping neighbours are pushed apart on the ground plane
//! - friction carry of a body whose only support is being dragged
//!
//! Held bodies (the one under the pointer) are kinematic: they go exactly where
//! input puts them and shove free bodies out of the way.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::state::Body;
use crate::consts::*;

/// Penetration tolerated when deciding a body lies on top of another
const CONTACT_SLOP: f32 = 1e-3;
/// Side-by-side blocks that merely touch do not support each other
const OVERLAP_EPS: f32 = 1e-5;
/// Horizontal speed given to a body sliding off an edge (m/s)
const TIP_SPEED: f32 = 0.5;
/// Passes over all pairs when separating side contacts
const SEPARATION_PASSES: usize = 4;

/// Anything that can advance simulation bodies by `dt`.
///
/// Static bodies (mass 0) must never move.
pub trait PhysicsWorld {
    fn step(&mut self, bodies: &mut [Body], dt: f32);
}

/// Stacking world: infinite ground plane, axis-aligned boxes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackWorld {
    pub gravity: f32,
    pub ground_height: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Positions at the end of the previous step, for held-body displacement
    #[serde(skip)]
    previous: Vec<Vec3>,
}

impl Default for StackWorld {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            ground_height: GROUND_HEIGHT,
            linear_damping: LINEAR_DAMPING,
            angular_damping: ANGULAR_DAMPING,
            previous: Vec::new(),
        }
    }
}

/// X/Z rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
struct Patch {
    min: Vec2,
    max: Vec2,
}

impl Patch {
    fn footprint(body: &Body) -> Self {
        let center = Vec2::new(body.position.x, body.position.z);
        let half = Vec2::new(body.half_extents.x, body.half_extents.z);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    fn intersect(self, other: Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn clamp(self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// What a body is resting on (or about to land on)
#[derive(Debug, Clone, PartialEq)]
struct Contact {
    /// Height of the highest surface below
    height: f32,
    /// Bodies whose top forms that surface; empty means the ground
    supports: Vec<usize>,
    /// Bounding rectangle of where the body touches its supports
    patch: Option<Patch>,
}

impl Contact {
    /// The one body holding this one up, if there is exactly one
    fn sole_support(&self) -> Option<usize> {
        match self.supports.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Unit direction the body slides off in, or `None` when its center is
    /// over the contact patch (or it stands on the ground).
    fn overhang(&self, body: &Body) -> Option<Vec2> {
        let patch = self.patch?;
        let center = Vec2::new(body.position.x, body.position.z);
        let off = center - patch.clamp(center);
        if off.length() <= OVERLAP_EPS {
            return None;
        }
        Some(off.normalize())
    }
}

/// Do the X/Z footprints of two bodies overlap (touching excluded)?
fn footprints_overlap(a: &Body, b: &Body) -> bool {
    let reach = a.half_extents + b.half_extents;
    let d = (a.position - b.position).abs();
    d.x < reach.x - OVERLAP_EPS && d.z < reach.z - OVERLAP_EPS
}

/// Move a body out of a side contact and drop any velocity into it
fn shove(body: &mut Body, by: Vec3) {
    body.position += by;
    let normal = by.normalize_or_zero();
    let into = body.velocity.dot(normal);
    if into < 0.0 {
        body.velocity -= normal * into;
    }
}

impl StackWorld {
    /// Highest surface under body `index` that it is resting on or above
    fn contact(&self, bodies: &[Body], index: usize) -> Contact {
        let body = &bodies[index];
        let bottom = body.bottom();
        let below: Vec<usize> = (0..bodies.len())
            .filter(|&j| {
                j != index
                    && bodies[j].top() <= bottom + CONTACT_SLOP
                    && footprints_overlap(body, &bodies[j])
            })
            .collect();

        let height = below
            .iter()
            .map(|&j| bodies[j].top())
            .fold(self.ground_height, f32::max);
        if height <= self.ground_height {
            return Contact {
                height: self.ground_height,
                supports: Vec::new(),
                patch: None,
            };
        }

        let supports: Vec<usize> = below
            .into_iter()
            .filter(|&j| bodies[j].top() >= height - CONTACT_SLOP)
            .collect();
        let own = Patch::footprint(body);
        let patch = supports
            .iter()
            .map(|&j| own.intersect(Patch::footprint(&bodies[j])))
            .reduce(Patch::union);

        Contact {
            height,
            supports,
            patch,
        }
    }

    /// Push overlapping boxes apart along the X/Z axis of least penetration.
    ///
    /// Only boxes whose heights overlap by more than the contact slop count,
    /// so a block resting on another is left alone. Held and static bodies
    /// do not give way.
    fn separate(&self, bodies: &mut [Body]) {
        for _ in 0..SEPARATION_PASSES {
            let mut moved = false;
            for i in 0..bodies.len() {
                for j in (i + 1)..bodies.len() {
                    let (free_i, free_j) = (bodies[i].is_free(), bodies[j].is_free());
                    if !free_i && !free_j {
                        continue;
                    }

                    let reach = bodies[i].half_extents + bodies[j].half_extents;
                    let d = bodies[j].position - bodies[i].position;
                    let overlap = reach - d.abs();
                    if overlap.x <= OVERLAP_EPS
                        || overlap.z <= OVERLAP_EPS
                        || overlap.y <= CONTACT_SLOP
                    {
                        continue;
                    }

                    let (axis, depth, along) = if overlap.x <= overlap.z {
                        (Vec3::X, overlap.x, d.x)
                    } else {
                        (Vec3::Z, overlap.z, d.z)
                    };
                    let push = axis * depth * if along >= 0.0 { 1.0 } else { -1.0 };
                    let (share_i, share_j) = match (free_i, free_j) {
                        (true, true) => (0.5, 0.5),
                        (true, false) => (1.0, 0.0),
                        _ => (0.0, 1.0),
                    };

                    if share_i > 0.0 {
                        shove(&mut bodies[i], -push * share_i);
                    }
                    if share_j > 0.0 {
                        shove(&mut bodies[j], push * share_j);
                    }
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }
}

impl PhysicsWorld for StackWorld {
    fn step(&mut self, bodies: &mut [Body], dt: f32) {
        if self.previous.len() != bodies.len() {
            self.previous = bodies.iter().map(|b| b.position).collect();
        }

        // Horizontal displacement handed to whatever rides on each body
        let mut carry = vec![Vec3::ZERO; bodies.len()];
        for (i, body) in bodies.iter().enumerate() {
            if body.held {
                let d = body.position - self.previous[i];
                carry[i] = Vec3::new(d.x, 0.0, d.z);
            }
        }

        // Lowest first, so a support has settled before what rests on it
        let mut order: Vec<usize> = (0..bodies.len())
            .filter(|&i| bodies[i].is_free())
            .collect();
        order.sort_by(|&a, &b| {
            bodies[a]
                .bottom()
                .partial_cmp(&bodies[b].bottom())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let linear_decay = (1.0 - self.linear_damping).powf(dt);
        let angular_decay = (1.0 - self.angular_damping).powf(dt);

        for i in order {
            let mut contact = self.contact(bodies, i);
            if let Some(support) = contact.sole_support() {
                if carry[support] != Vec3::ZERO {
                    bodies[i].position += carry[support];
                    carry[i] = carry[support];
                    contact = self.contact(bodies, i);
                }
            }
            let overhang = contact.overhang(&bodies[i]);
            let body = &mut bodies[i];

            body.velocity *= linear_decay;
            body.angular_velocity *= angular_decay;
            body.velocity.y -= self.gravity * dt;

            body.position += body.velocity * dt;
            body.yaw += body.angular_velocity.y * dt;

            if body.bottom() > contact.height {
                continue;
            }
            match overhang {
                // Landed: no bounce, full friction
                None => {
                    body.position.y = contact.height + body.half_extents.y;
                    body.velocity = Vec3::ZERO;
                    body.angular_velocity = Vec3::ZERO;
                }
                // Center hangs past the edge: keep falling and slide off
                Some(dir) => {
                    let speed = body.velocity.x * dir.x + body.velocity.z * dir.y;
                    if speed < TIP_SPEED {
                        body.velocity.x = dir.x * TIP_SPEED;
                        body.velocity.z = dir.y * TIP_SPEED;
                    }
                }
            }
        }

        self.separate(bodies);
        self.previous = bodies.iter().map(|b| b.position).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::build_tower;
    use crate::sim::rest::is_at_rest;

    fn tower_bodies() -> Vec<Body> {
        build_tower(BLOCK_COUNT).0.into_iter().map(|b| b.body).collect()
    }

    #[test]
    fn test_fresh_tower_stays_put() {
        let mut world = StackWorld::default();
        let mut bodies = tower_bodies();
        let before = bodies.clone();

        for _ in 0..600 {
            world.step(&mut bodies, PHYSICS_DT);
        }

        for (a, b) in before.iter().zip(&bodies) {
            assert!((a.position - b.position).length() < 1e-4);
            assert!(is_at_rest(b, REST_THRESHOLD));
        }
    }

    #[test]
    fn test_unsupported_block_falls_to_ground() {
        let mut world = StackWorld::default();
        let half = Vec3::new(0.03, 0.015, 0.09);
        let mut bodies = vec![Body::new(Vec3::new(0.5, 1.2, 0.0), half, 0.0)];

        world.step(&mut bodies, 1.0 / 60.0);
        assert!(bodies[0].velocity.y < 0.0);

        for _ in 0..120 {
            world.step(&mut bodies, 1.0 / 60.0);
        }
        assert!((bodies[0].bottom() - GROUND_HEIGHT).abs() < 1e-5);
        assert_eq!(bodies[0].velocity, Vec3::ZERO);
    }

    #[test]
    fn test_block_lands_on_block_below() {
        let mut world = StackWorld::default();
        let half = Vec3::new(0.03, 0.015, 0.09);
        let base = Body::new(Vec3::new(0.0, GROUND_HEIGHT + 0.015, 0.0), half, 0.0);
        let dropped = Body::new(Vec3::new(0.01, 1.1, 0.0), half, 0.0);
        let mut bodies = vec![base, dropped];

        for _ in 0..120 {
            world.step(&mut bodies, 1.0 / 60.0);
        }
        assert!((bodies[1].bottom() - bodies[0].top()).abs() < 1e-5);
    }

    #[test]
    fn test_static_bodies_never_move() {
        let mut world = StackWorld::default();
        let mut body = Body::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::splat(0.01), 0.0);
        body.mass = 0.0;
        let mut bodies = vec![body];

        world.step(&mut bodies, 1.0 / 60.0);
        assert_eq!(bodies[0].position, Vec3::splat(-100.0));
    }

    #[test]
    fn test_removing_middle_block_keeps_layer_above() {
        let mut world = StackWorld::default();
        let mut bodies = tower_bodies();
        let above_y = bodies[3].position.y;

        // Park the middle bottom block out of the way
        bodies[1].mass = 0.0;
        bodies[1].position = PARKING_POSITION;

        for _ in 0..600 {
            world.step(&mut bodies, PHYSICS_DT);
        }
        assert!((bodies[3].position.y - above_y).abs() < 1e-4);
    }

    fn long_x() -> Vec3 {
        Vec3::new(0.09, 0.015, 0.03)
    }

    fn long_z() -> Vec3 {
        Vec3::new(0.03, 0.015, 0.09)
    }

    #[test]
    fn test_held_body_ignores_gravity() {
        let mut world = StackWorld::default();
        let mut held = Body::new(Vec3::new(0.0, 1.2, 0.0), long_z(), 0.0);
        held.held = true;
        let mut bodies = vec![held];

        for _ in 0..60 {
            world.step(&mut bodies, 1.0 / 60.0);
        }
        assert_eq!(bodies[0].position, Vec3::new(0.0, 1.2, 0.0));
    }

    #[test]
    fn test_held_body_pushes_neighbour_sideways() {
        let mut world = StackWorld::default();
        let y = GROUND_HEIGHT + 0.015;
        let mut held = Body::new(Vec3::new(0.0, y, 0.0), long_z(), 0.0);
        held.held = true;
        let neighbour = Body::new(Vec3::new(0.06, y, 0.0), long_z(), 0.0);
        let mut bodies = vec![held, neighbour];

        world.step(&mut bodies, PHYSICS_DT);
        assert!((bodies[1].position.x - 0.06).abs() < 1e-6);

        bodies[0].position.x += 0.02;
        world.step(&mut bodies, PHYSICS_DT);

        assert!((bodies[0].position.x - 0.02).abs() < 1e-6);
        assert!((bodies[1].position.x - 0.08).abs() < 1e-5);
        assert!((bodies[1].position.z).abs() < 1e-6);
    }

    #[test]
    fn test_free_bodies_share_the_push() {
        let mut world = StackWorld::default();
        let y = GROUND_HEIGHT + 0.015;
        let mut bodies = vec![
            Body::new(Vec3::new(0.0, y, 0.0), long_z(), 0.0),
            Body::new(Vec3::new(0.04, y, 0.0), long_z(), 0.0),
        ];

        world.step(&mut bodies, PHYSICS_DT);

        let gap = bodies[1].position.x - bodies[0].position.x;
        assert!((gap - 0.06).abs() < 1e-5);
        assert!((bodies[0].position.x + 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_stacked_blocks_are_not_pushed_apart() {
        let mut world = StackWorld::default();
        let mut bodies = tower_bodies();
        bodies.truncate(6);
        let before: Vec<Vec3> = bodies.iter().map(|b| b.position).collect();

        world.step(&mut bodies, PHYSICS_DT);

        for (a, b) in before.iter().zip(&bodies) {
            assert!((*a - b.position).length() < 1e-5);
        }
    }

    #[test]
    fn test_block_on_dragged_block_is_carried() {
        let mut world = StackWorld::default();
        let base_y = GROUND_HEIGHT + 0.015;
        let mut base = Body::new(Vec3::new(0.0, base_y, 0.0), long_z(), 0.0);
        base.held = true;
        let rider = Body::new(Vec3::new(0.0, base_y + 0.03, 0.0), long_x(), 0.0);
        let mut bodies = vec![base, rider];

        world.step(&mut bodies, PHYSICS_DT);
        for _ in 0..5 {
            bodies[0].position.x += 0.01;
            world.step(&mut bodies, PHYSICS_DT);
        }

        assert!((bodies[1].position.x - 0.05).abs() < 1e-5);
        assert!((bodies[1].bottom() - bodies[0].top()).abs() < 1e-5);
    }

    #[test]
    fn test_block_with_other_supports_is_not_carried() {
        let mut world = StackWorld::default();
        let mut bodies = tower_bodies();
        bodies[1].held = true;

        world.step(&mut bodies, PHYSICS_DT);
        bodies[1].position.x += 0.01;
        world.step(&mut bodies, PHYSICS_DT);

        // Layer above still rests on blocks 0 and 2
        assert!(bodies[3].position.x.abs() < 1e-6);
        // Block 2 was shoved aside by the same amount
        assert!((bodies[2].position.x - 0.07).abs() < 1e-5);
    }

    #[test]
    fn test_overhanging_block_slides_off() {
        let mut world = StackWorld::default();
        let base_y = GROUND_HEIGHT + 0.015;
        let mut base = Body::new(Vec3::new(0.06, base_y, 0.0), long_z(), 0.0);
        base.mass = 0.0;
        let top = Body::new(Vec3::new(0.0, base_y + 0.03, 0.0), long_x(), 0.0);
        let mut bodies = vec![base, top];

        world.step(&mut bodies, 1.0 / 60.0);
        assert!(bodies[1].velocity.x < 0.0);
        assert!(bodies[1].bottom() < bodies[0].top());

        for _ in 0..120 {
            world.step(&mut bodies, 1.0 / 60.0);
        }
        assert!((bodies[1].bottom() - GROUND_HEIGHT).abs() < 1e-5);
        assert!(bodies[1].position.x < -0.05);
        assert_eq!(bodies[1].velocity, Vec3::ZERO);
    }

    #[test]
    fn test_layer_slides_off_single_edge_support() {
        let mut world = StackWorld::default();
        let mut bodies = tower_bodies();
        for i in [0, 1] {
            bodies[i].mass = 0.0;
            bodies[i].position = PARKING_POSITION;
        }
        let before = bodies[3].position;

        for _ in 0..60 {
            world.step(&mut bodies, 1.0 / 60.0);
        }
        assert!(bodies[3].position.y < before.y - 0.02);
    }
}
