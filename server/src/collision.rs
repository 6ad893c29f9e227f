//! Axis-aligned overlap tests between snake heads and everything they can hit,
//! plus wraparound at the world edge.
//!
//! The paddings match the sprite sizes clients draw, not the geometry.

use crate::world::{Powerup, Snake};
use log::debug;
use shared::vector::DIRECTION_EPSILON;
use shared::{is_teleport_segment, Vector2D, Wall};
use std::collections::BTreeMap;

/// A head within this distance of a powerup on both axes collects it.
pub const POWERUP_PICKUP_RANGE: f64 = 13.0;
/// Half thickness of a wall block.
pub const WALL_HALF_WIDTH: f64 = 25.0;
/// Half size of a snake head.
pub const HEAD_HALF_WIDTH: f64 = 5.0;
/// Half thickness of a snake body segment.
pub const SEGMENT_HALF_WIDTH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Aabb {
    pub fn around_point(p: Vector2D, padding: f64) -> Self {
        Self {
            left: p.x - padding,
            right: p.x + padding,
            top: p.y - padding,
            bottom: p.y + padding,
        }
    }

    pub fn around_segment(a: Vector2D, b: Vector2D, padding: f64) -> Self {
        Self {
            left: a.x.min(b.x) - padding,
            right: a.x.max(b.x) + padding,
            top: a.y.min(b.y) - padding,
            bottom: a.y.max(b.y) + padding,
        }
    }

    pub fn around_wall(wall: &Wall, padding: f64) -> Self {
        Self::around_segment(wall.p1, wall.p2, padding)
    }

    /// Strict overlap; boxes that only touch do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// True when the box lies strictly inside `[-half, half]` on both axes.
    pub fn inside(&self, half: f64) -> bool {
        self.left > -half && self.right < half && self.top > -half && self.bottom < half
    }
}

/// Every living snake collects every powerup its head overlaps this tick.
pub fn snakes_eat_powerups(snakes: &mut BTreeMap<u32, Snake>, powerups: &mut BTreeMap<u32, Powerup>) {
    for snake in snakes.values_mut().filter(|s| s.alive) {
        let reach = Aabb::around_point(snake.head(), POWERUP_PICKUP_RANGE);
        for powerup in powerups.values_mut() {
            if reach.intersects(&Aabb::around_point(powerup.location, 0.0)) {
                debug!("Snake {} collected powerup {}", snake.id, powerup.id);
                powerup.died.raise();
                snake.score += 1;
                snake.growing = true;
                snake.frames_since_eaten = 0;
            }
        }
    }
}

pub fn snakes_hit_walls(snakes: &mut BTreeMap<u32, Snake>, walls: &BTreeMap<u32, Wall>) {
    for snake in snakes.values_mut().filter(|s| s.alive) {
        let head = Aabb::around_point(snake.head(), HEAD_HALF_WIDTH);
        if let Some(wall) = walls
            .values()
            .find(|w| head.intersects(&Aabb::around_wall(w, WALL_HALF_WIDTH)))
        {
            debug!("Snake {} hit wall {}", snake.id, wall.id);
            snake.kill();
        }
    }
}

/// A living snake dies when its head overlaps any segment of another living snake.
///
/// Snakes are resolved one at a time in id order, so a snake killed earlier in
/// the pass no longer counts as an obstacle for later ones.
pub fn snakes_hit_snakes(snakes: &mut BTreeMap<u32, Snake>, world_size: f64) {
    let ids: Vec<u32> = snakes.keys().copied().collect();

    for id in ids {
        let culprit = match snakes.get(&id) {
            Some(player) if player.alive => {
                let head = Aabb::around_point(player.head(), HEAD_HALF_WIDTH);
                snakes
                    .values()
                    .filter(|other| other.alive && other.id != id)
                    .find(|other| {
                        other.solid_segments(world_size).any(|(a, b)| {
                            head.intersects(&Aabb::around_segment(a, b, SEGMENT_HALF_WIDTH))
                        })
                    })
                    .map(|other| other.id)
            }
            _ => None,
        };

        if let Some(other) = culprit {
            if let Some(player) = snakes.get_mut(&id) {
                debug!("Snake {} ran into snake {}", id, other);
                player.kill();
            }
        }
    }
}

pub fn snakes_hit_themselves(snakes: &mut BTreeMap<u32, Snake>, world_size: f64) {
    for snake in snakes.values_mut().filter(|s| s.alive) {
        if hits_own_body(snake, world_size) {
            debug!("Snake {} ran into itself", snake.id);
            snake.kill();
        }
    }
}

/// Only segments behind the most recent one running against the head's
/// direction can be reached; everything nearer the head is skipped.
fn hits_own_body(snake: &Snake, world_size: f64) -> bool {
    let body = &snake.body;
    let opposite = snake.direction.opposite().to_vector();

    let mut check_index = 0;
    for i in (1..body.len()).rev() {
        let (a, b) = (body[i - 1], body[i]);
        if is_teleport_segment(a, b, world_size) {
            continue;
        }
        if (b - a).normalize().approx_eq(&opposite, DIRECTION_EPSILON) {
            check_index = i - 1;
            break;
        }
    }

    let head = Aabb::around_point(snake.head(), HEAD_HALF_WIDTH);
    (1..=check_index).rev().any(|i| {
        let (a, b) = (body[i - 1], body[i]);
        !is_teleport_segment(a, b, world_size)
            && head.intersects(&Aabb::around_segment(a, b, SEGMENT_HALF_WIDTH))
    })
}

/// Heads past the edge reappear mirrored on the far side. Two vertices are
/// appended per axis crossed: the mirrored point and the new head, so the
/// jump is recorded as its own segment.
pub fn wrap_snakes(snakes: &mut BTreeMap<u32, Snake>, half: f64) {
    for snake in snakes.values_mut().filter(|s| s.alive) {
        let head = snake.head();
        if head.x.abs() >= half {
            let mirrored = Vector2D::new(-head.x, head.y);
            snake.body.push(mirrored);
            snake.body.push(mirrored);
        }

        let head = snake.head();
        if head.y.abs() >= half {
            let mirrored = Vector2D::new(head.x, -head.y);
            snake.body.push(mirrored);
            snake.body.push(mirrored);
        }
    }
}
