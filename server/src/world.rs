//! Authoritative world state: walls, snakes, powerups and the per-world
//! counters, plus the per-tick update order.

use crate::collision;
use crate::flag::EventFlag;
use crate::settings::TickRules;
use crate::spawn;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    is_teleport_segment, push_record, Direction, PowerupRecord, SnakeRecord, Vector2D, Wall,
};
use std::collections::BTreeMap;

/// Minimum length of the newest segment, along its own axis, before another turn is allowed.
pub const MIN_TURN_SEGMENT: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct Snake {
    pub id: u32,
    pub name: String,
    /// Tail first, head last. Interior vertices are turn points.
    pub body: Vec<Vector2D>,
    pub direction: Direction,
    pub score: u32,
    pub alive: bool,
    pub died: EventFlag,
    pub disconnected: bool,
    pub join: EventFlag,
    pub growing: bool,
    pub frames_since_eaten: u32,
    pub frames_since_died: u32,
}

impl Snake {
    /// A freshly joined, living snake.
    pub fn new(id: u32, name: impl Into<String>, body: Vec<Vector2D>, direction: Direction) -> Self {
        Self {
            id,
            name: name.into(),
            body,
            direction,
            score: 0,
            alive: true,
            died: EventFlag::default(),
            disconnected: false,
            join: EventFlag::raised(),
            growing: false,
            frames_since_eaten: 0,
            frames_since_died: 0,
        }
    }

    pub fn head(&self) -> Vector2D {
        self.body.last().copied().unwrap_or_default()
    }

    pub fn tail(&self) -> Vector2D {
        self.body.first().copied().unwrap_or_default()
    }

    /// Consecutive vertex pairs, tail first, skipping wraparound jumps.
    pub fn solid_segments(
        &self,
        world_size: f64,
    ) -> impl Iterator<Item = (Vector2D, Vector2D)> + '_ {
        self.body
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            // The wraparound jump is not body, so it never blocks.
            .filter(move |(a, b)| !is_teleport_segment(*a, *b, world_size))
    }

    pub fn kill(&mut self) {
        self.died.raise();
        self.alive = false;
        self.score = 0;
        self.frames_since_died = 0;
    }

    /// Wire view for one snapshot; consumes the one-shot flags.
    fn take_record(&mut self) -> SnakeRecord {
        SnakeRecord {
            id: self.id,
            name: self.name.clone(),
            body: self.body.clone(),
            dir: self.direction.to_vector(),
            score: self.score,
            died: self.died.take(),
            alive: self.alive,
            disconnected: self.disconnected,
            join: self.join.take(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Powerup {
    pub id: u32,
    pub location: Vector2D,
    pub died: EventFlag,
}

impl Powerup {
    pub fn new(id: u32, location: Vector2D) -> Self {
        Self {
            id,
            location,
            died: EventFlag::default(),
        }
    }
}

pub struct World {
    world_size: u32,
    walls: BTreeMap<u32, Wall>,
    pub(crate) snakes: BTreeMap<u32, Snake>,
    pub(crate) powerups: BTreeMap<u32, Powerup>,
    total_powerups_ever: u32,
    frames_since_last_powerup: u32,
    rng: StdRng,
}

impl World {
    pub fn new(world_size: u32, walls: impl IntoIterator<Item = Wall>) -> Self {
        Self::with_rng(world_size, walls, StdRng::from_entropy())
    }

    /// Same as [`World::new`] with a caller-supplied generator, for reproducible runs.
    pub fn with_rng(world_size: u32, walls: impl IntoIterator<Item = Wall>, rng: StdRng) -> Self {
        Self {
            world_size,
            walls: walls.into_iter().map(|w| (w.id, w)).collect(),
            snakes: BTreeMap::new(),
            powerups: BTreeMap::new(),
            total_powerups_ever: 0,
            frames_since_last_powerup: 0,
            rng,
        }
    }

    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Half the world side, rounded down like the integer settings value.
    pub fn half_size(&self) -> f64 {
        (self.world_size / 2) as f64
    }

    pub fn walls(&self) -> &BTreeMap<u32, Wall> {
        &self.walls
    }

    pub fn snakes(&self) -> &BTreeMap<u32, Snake> {
        &self.snakes
    }

    pub fn snake(&self, id: u32) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    pub fn snake_mut(&mut self, id: u32) -> Option<&mut Snake> {
        self.snakes.get_mut(&id)
    }

    pub fn powerups(&self) -> &BTreeMap<u32, Powerup> {
        &self.powerups
    }

    pub fn total_powerups_ever(&self) -> u32 {
        self.total_powerups_ever
    }

    /// Spawns a snake for a newly joined player, facing a random axis direction.
    pub fn add_snake(&mut self, id: u32, name: impl Into<String>, length: f64) {
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        let body = spawn::snake_body(
            &mut self.rng,
            self.world_size,
            &self.walls,
            &self.snakes,
            direction,
            length,
        );
        let snake = Snake::new(id, name, body, direction);
        info!(
            "Added snake {} ({}) heading {:?} at {:?}",
            id,
            snake.name,
            direction,
            snake.head()
        );
        self.snakes.insert(id, snake);
    }

    /// Inserts a snake as-is, replacing any snake with the same id.
    pub fn insert_snake(&mut self, snake: Snake) {
        self.snakes.insert(snake.id, snake);
    }

    pub fn remove_snake(&mut self, id: u32) -> Option<Snake> {
        self.snakes.remove(&id)
    }

    /// Transport-error path: the snake is reported dead in the next snapshot, then removed.
    pub fn mark_disconnected(&mut self, id: u32) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.disconnected = true;
            snake.died.raise();
        }
    }

    /// Applies a movement request. Returns whether the snake actually turned.
    ///
    /// Only quarter turns are legal, and once the snake has a corner the newest
    /// segment must be at least [`MIN_TURN_SEGMENT`] long before turning again.
    pub fn change_direction(&mut self, id: u32, requested: Direction) -> bool {
        let snake = match self.snakes.get_mut(&id) {
            Some(snake) => snake,
            None => return false,
        };

        if !requested.is_orthogonal_to(snake.direction) {
            return false;
        }

        let n = snake.body.len();
        if n >= 3 {
            let head = snake.body[n - 1];
            let corner = snake.body[n - 2];
            let travelled = if snake.direction.is_vertical() {
                (head.y - corner.y).abs()
            } else {
                (head.x - corner.x).abs()
            };
            if travelled < MIN_TURN_SEGMENT {
                return false;
            }
        }

        let head = snake.head();
        snake.body.push(head);
        snake.direction = requested;
        true
    }

    /// Moves every living snake one step and handles respawn countdowns.
    pub fn advance_positions(&mut self, rules: &TickRules) {
        let ids: Vec<u32> = self.snakes.keys().copied().collect();

        for id in ids {
            let respawn_direction = match self.snakes.get_mut(&id) {
                Some(snake) if !snake.alive => {
                    if snake.frames_since_died < rules.respawn_delay {
                        snake.frames_since_died += 1;
                        continue;
                    }
                    Some(snake.direction)
                }
                Some(_) => None,
                None => continue,
            };

            if let Some(direction) = respawn_direction {
                let body = spawn::snake_body(
                    &mut self.rng,
                    self.world_size,
                    &self.walls,
                    &self.snakes,
                    direction,
                    rules.start_length,
                );
                if let Some(snake) = self.snakes.get_mut(&id) {
                    debug!("Respawning snake {} at {:?}", id, body.last());
                    snake.body = body;
                    snake.alive = true;
                    snake.growing = false;
                    snake.frames_since_eaten = 0;
                }
            }

            let half = self.half_size();
            if let Some(snake) = self.snakes.get_mut(&id) {
                advance_snake(snake, rules, half);
            }
        }
    }

    /// Fills the world with its initial powerups.
    pub fn add_first_powerups(&mut self, max_powerups: usize) {
        for _ in 0..max_powerups {
            self.spawn_powerup();
        }
    }

    /// Counts down the powerup timer; on expiry spawns one powerup if under the cap
    /// and draws a new delay in `[0, max_delay)`.
    pub fn update_powerups(&mut self, max_powerups: usize, max_delay: u32) {
        if self.frames_since_last_powerup > 0 {
            self.frames_since_last_powerup -= 1;
            return;
        }

        if self.powerups.len() < max_powerups {
            self.spawn_powerup();
        }
        self.frames_since_last_powerup = self.rng.gen_range(0..max_delay.max(1));
    }

    /// Places a powerup at a fixed location, bypassing the spawn planner.
    pub fn place_powerup(&mut self, location: Vector2D) -> u32 {
        let id = self.next_powerup_id();
        self.powerups.insert(id, Powerup::new(id, location));
        id
    }

    fn spawn_powerup(&mut self) -> u32 {
        let location = spawn::powerup_location(&mut self.rng, self.world_size, &self.walls);
        self.place_powerup(location)
    }

    fn next_powerup_id(&mut self) -> u32 {
        let id = self.total_powerups_ever;
        self.total_powerups_ever += 1;
        id
    }

    /// One simulation step, in the fixed order the protocol relies on.
    pub fn tick(&mut self, rules: &TickRules) {
        self.advance_positions(rules);
        self.update_powerups(rules.max_powerups, rules.max_powerup_delay);

        let world_size = self.world_size as f64;
        let half = self.half_size();
        collision::snakes_eat_powerups(&mut self.snakes, &mut self.powerups);
        collision::snakes_hit_walls(&mut self.snakes, &self.walls);
        collision::snakes_hit_snakes(&mut self.snakes, world_size);
        collision::snakes_hit_themselves(&mut self.snakes, world_size);
        collision::wrap_snakes(&mut self.snakes, half);
    }

    /// Serializes every snake then every powerup, one JSON record per line.
    ///
    /// Consumes the one-shot flags, then drops disconnected snakes and
    /// collected powerups so each is reported exactly once more.
    pub fn snapshot(&mut self) -> String {
        let mut frame = String::new();

        let mut departed = Vec::new();
        for snake in self.snakes.values_mut() {
            if snake.disconnected {
                snake.died.raise();
                snake.alive = false;
                departed.push(snake.id);
            }
            if let Err(e) = push_record(&mut frame, &snake.take_record()) {
                error!("Failed to encode snake {}: {}", snake.id, e);
            }
        }
        for id in departed {
            self.snakes.remove(&id);
            info!("Removed snake {}", id);
        }

        let mut collected = Vec::new();
        for powerup in self.powerups.values_mut() {
            let record = PowerupRecord {
                id: powerup.id,
                location: powerup.location,
                died: powerup.died.take(),
            };
            if record.died {
                collected.push(powerup.id);
            }
            if let Err(e) = push_record(&mut frame, &record) {
                error!("Failed to encode powerup {}: {}", powerup.id, e);
            }
        }
        for id in collected {
            self.powerups.remove(&id);
        }

        frame
    }
}

/// Tail then head movement for one living snake.
fn advance_snake(snake: &mut Snake, rules: &TickRules, half: f64) {
    if snake.body.len() < 2 {
        return;
    }

    if snake.growing {
        snake.frames_since_eaten += 1;
        if snake.frames_since_eaten >= rules.growth_frames {
            snake.growing = false;
        }
    } else {
        let tail = snake.body[0];
        let next = snake.body[1];
        let remaining = (next - tail).magnitude();

        if remaining <= rules.speed && snake.body.len() > 2 {
            snake.body.remove(0);
        } else {
            snake.body[0] += (next - tail).normalize() * rules.speed;
        }

        let tail = snake.body[0];
        if (tail.x.abs() >= half || tail.y.abs() >= half) && snake.body.len() > 2 {
            snake.body.remove(0);
        }
    }

    let step = snake.direction.to_vector() * rules.speed;
    if let Some(head) = snake.body.last_mut() {
        *head += step;
    }
}
