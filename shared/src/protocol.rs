//! Newline-delimited JSON records exchanged between server and clients.
//!
//! Handshake (server → client): the player id, the world size, then one
//! [`Wall`] record per line. Steady state (server → client): one
//! [`SnakeRecord`] per snake followed by one [`PowerupRecord`] per powerup,
//! every tick. Client → server: the display name once, then
//! `{"moving":"up"|"down"|"left"|"right"}` lines.

use crate::vector::{Direction, Vector2D};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no recognised type key: {0}")]
    UnknownRecord(String),

    #[error("invalid handshake line {line:?}: expected {expected}")]
    Handshake { line: String, expected: &'static str },
}

/// Static, axis-aligned obstacle tiled in 50-unit blocks between `p1` and `p2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(rename = "wall", alias = "ID")]
    pub id: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

impl Wall {
    pub fn new(id: u32, p1: Vector2D, p2: Vector2D) -> Self {
        Self { id, p1, p2 }
    }

    /// Walls must be horizontal or vertical.
    pub fn is_axis_aligned(&self) -> bool {
        self.p1.x == self.p2.x || self.p1.y == self.p2.y
    }
}

/// Per-tick wire view of a snake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeRecord {
    #[serde(rename = "snake")]
    pub id: u32,
    pub name: String,
    pub body: Vec<Vector2D>,
    pub dir: Vector2D,
    pub score: u32,
    pub died: bool,
    pub alive: bool,
    #[serde(rename = "dc")]
    pub disconnected: bool,
    pub join: bool,
}

impl SnakeRecord {
    pub fn head(&self) -> Option<Vector2D> {
        self.body.last().copied()
    }
}

/// Per-tick wire view of a powerup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerupRecord {
    #[serde(rename = "power")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vector2D,
    pub died: bool,
}

/// Any record the server can send after the two handshake header lines.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRecord {
    Wall(Wall),
    Snake(SnakeRecord),
    Powerup(PowerupRecord),
}

impl ServerRecord {
    /// Decodes one line, picking the variant from its discriminating key.
    pub fn decode(line: &str) -> Result<ServerRecord, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(line.trim_end())?;
        let object = match value.as_object() {
            Some(object) => object,
            None => return Err(ProtocolError::UnknownRecord(line.to_string())),
        };

        if object.contains_key("snake") {
            Ok(ServerRecord::Snake(serde_json::from_value(value)?))
        } else if object.contains_key("power") {
            Ok(ServerRecord::Powerup(serde_json::from_value(value)?))
        } else if object.contains_key("wall") {
            Ok(ServerRecord::Wall(serde_json::from_value(value)?))
        } else {
            Err(ProtocolError::UnknownRecord(line.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct MoveCommand {
    moving: Direction,
}

/// Parses a client movement line such as `{"moving":"left"}`.
pub fn decode_command(line: &str) -> Result<Direction, ProtocolError> {
    let command: MoveCommand = serde_json::from_str(line.trim_end())?;
    Ok(command.moving)
}

/// Client-side encoding of a movement command, newline included.
pub fn encode_command(direction: Direction) -> String {
    format!("{{\"moving\":\"{}\"}}\n", direction.as_str())
}

/// Appends `record` as one JSON line.
pub fn push_record<T: Serialize>(out: &mut String, record: &T) -> Result<(), ProtocolError> {
    out.push_str(&serde_json::to_string(record)?);
    out.push('\n');
    Ok(())
}

/// Builds the full server → client handshake: id, world size, walls.
pub fn encode_handshake<'a, I>(
    player_id: u32,
    world_size: u32,
    walls: I,
) -> Result<String, ProtocolError>
where
    I: IntoIterator<Item = &'a Wall>,
{
    let mut out = format!("{}\n{}\n", player_id, world_size);
    for wall in walls {
        push_record(&mut out, wall)?;
    }
    Ok(out)
}

/// Parses one of the two numeric handshake header lines.
pub fn decode_header(line: &str, expected: &'static str) -> Result<u32, ProtocolError> {
    line.trim()
        .parse()
        .map_err(|_| ProtocolError::Handshake {
            line: line.to_string(),
            expected,
        })
}

/// Segments at least a world wide are the jump recorded by wraparound, not body.
pub fn is_teleport_segment(a: Vector2D, b: Vector2D, world_size: f64) -> bool {
    (b - a).magnitude() >= world_size
}
