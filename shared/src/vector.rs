use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Tolerance used when comparing unit vectors produced by normalization.
pub const DIRECTION_EPSILON: f64 = 1e-9;

/// Represents a vector in 2D world space.
///
/// Serializes with the upper-case `X`/`Y` keys the wire protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2D {
    /// Value along the x-axis.
    /// Positive direction is to the right.
    #[serde(rename = "X")]
    pub x: f64,
    /// Value along the y-axis.
    /// Positive direction is down.
    #[serde(rename = "Y")]
    pub y: f64,
}

impl Vector2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the normalized vector, or the zero vector if the magnitude is zero.
    pub fn normalize(&self) -> Vector2D {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2D::default()
        } else {
            Vector2D {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vector2D {
        Vector2D {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Vector2D, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, other: Vector2D) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, scalar: f64) -> Vector2D {
        self.scale(scalar)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

/// One of the four axis directions a snake can travel in.
///
/// Deserializes from the lowercase names clients send in movement commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit vector for this direction. Up is negative y.
    pub fn to_vector(self) -> Vector2D {
        match self {
            Direction::Up => Vector2D::new(0.0, -1.0),
            Direction::Right => Vector2D::new(1.0, 0.0),
            Direction::Down => Vector2D::new(0.0, 1.0),
            Direction::Left => Vector2D::new(-1.0, 0.0),
        }
    }

    /// Maps a unit vector back onto a direction, if it is one of the four.
    pub fn from_vector(v: Vector2D) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| d.to_vector().approx_eq(&v, DIRECTION_EPSILON))
    }

    /// Lowercase wire name, as used in movement commands.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// True when `other` is a quarter turn away from `self`.
    pub fn is_orthogonal_to(self, other: Direction) -> bool {
        self.is_vertical() != other.is_vertical()
    }
}
