//! Rejection-sampling placement for new snakes and powerups.
//!
//! Candidates are drawn uniformly over the world until one clears every
//! obstacle. There is no attempt limit: a world with no free space keeps
//! sampling, so a warning is logged periodically to make that visible.

use crate::collision::Aabb;
use crate::world::Snake;
use log::warn;
use rand::Rng;
use shared::{Direction, Vector2D, Wall};
use std::collections::BTreeMap;

/// Clearance kept between a new snake and any wall.
pub const SNAKE_WALL_CLEARANCE: f64 = 45.0;
/// Clearance kept between a new snake and any living snake segment.
pub const SNAKE_SNAKE_CLEARANCE: f64 = 25.0;
/// Half thickness of the new snake's own box.
pub const SNAKE_BODY_HALF_WIDTH: f64 = 5.0;
/// Clearance kept between a new powerup and any wall.
pub const POWERUP_WALL_CLEARANCE: f64 = 35.0;
/// Half size of a powerup.
pub const POWERUP_RADIUS: f64 = 8.0;

const ATTEMPT_WARNING_INTERVAL: u64 = 10_000;

/// Uniform integer point in `[-half, half)` on both axes.
pub fn random_point<R: Rng + ?Sized>(rng: &mut R, world_size: u32) -> Vector2D {
    let half = (world_size / 2).max(1) as i64;
    Vector2D::new(
        rng.gen_range(-half..half) as f64,
        rng.gen_range(-half..half) as f64,
    )
}

/// Tail and head of a straight snake of `length` facing `direction` that
/// stays inside the world and clear of walls and living snakes.
pub fn snake_body<R: Rng + ?Sized>(
    rng: &mut R,
    world_size: u32,
    walls: &BTreeMap<u32, Wall>,
    snakes: &BTreeMap<u32, Snake>,
    direction: Direction,
    length: f64,
) -> Vec<Vector2D> {
    let half = (world_size / 2) as f64;
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;
        if attempts % ATTEMPT_WARNING_INTERVAL == 0 {
            warn!("No free snake spawn found after {} attempts", attempts);
        }

        let tail = random_point(rng, world_size);
        let head = tail + direction.to_vector() * length;
        let body = Aabb::around_segment(tail, head, SNAKE_BODY_HALF_WIDTH);

        if body.inside(half) && snake_spot_is_clear(&body, world_size, walls, snakes) {
            return vec![tail, head];
        }
    }
}

fn snake_spot_is_clear(
    body: &Aabb,
    world_size: u32,
    walls: &BTreeMap<u32, Wall>,
    snakes: &BTreeMap<u32, Snake>,
) -> bool {
    let blocked_by_wall = walls
        .values()
        .any(|wall| body.intersects(&Aabb::around_wall(wall, SNAKE_WALL_CLEARANCE)));
    if blocked_by_wall {
        return false;
    }

    !snakes.values().filter(|s| s.alive).any(|other| {
        other
            .solid_segments(world_size as f64)
            .any(|(a, b)| body.intersects(&Aabb::around_segment(a, b, SNAKE_SNAKE_CLEARANCE)))
    })
}

/// A powerup location clear of every wall.
pub fn powerup_location<R: Rng + ?Sized>(
    rng: &mut R,
    world_size: u32,
    walls: &BTreeMap<u32, Wall>,
) -> Vector2D {
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;
        if attempts % ATTEMPT_WARNING_INTERVAL == 0 {
            warn!("No free powerup spawn found after {} attempts", attempts);
        }

        let location = random_point(rng, world_size);
        let footprint = Aabb::around_point(location, POWERUP_RADIUS);
        let blocked = walls
            .values()
            .any(|wall| footprint.intersects(&Aabb::around_wall(wall, POWERUP_WALL_CLEARANCE)));
        if !blocked {
            return location;
        }
    }
}
