use crate::protocol::{
    decode_header, PowerupRecord, ProtocolError, ServerRecord, SnakeRecord, Wall,
};
use std::collections::BTreeMap;

/// Client-side mirror of the server world, rebuilt from the line stream.
#[derive(Debug, Clone)]
pub struct ClientWorld {
    pub player_id: u32,
    pub world_size: u32,
    pub walls: BTreeMap<u32, Wall>,
    pub snakes: BTreeMap<u32, SnakeRecord>,
    pub powerups: BTreeMap<u32, PowerupRecord>,
}

impl ClientWorld {
    /// Builds the mirror from the two handshake header lines.
    pub fn from_handshake(id_line: &str, size_line: &str) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: decode_header(id_line, "player id")?,
            world_size: decode_header(size_line, "world size")?,
            walls: BTreeMap::new(),
            snakes: BTreeMap::new(),
            powerups: BTreeMap::new(),
        })
    }

    pub fn apply_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let record = ServerRecord::decode(line)?;
        self.apply(record);
        Ok(())
    }

    /// Disconnected snakes and collected powerups are dropped; everything else is upserted.
    pub fn apply(&mut self, record: ServerRecord) {
        match record {
            ServerRecord::Wall(wall) => {
                self.walls.insert(wall.id, wall);
            }
            ServerRecord::Snake(snake) => {
                if snake.disconnected {
                    self.snakes.remove(&snake.id);
                } else {
                    self.snakes.insert(snake.id, snake);
                }
            }
            ServerRecord::Powerup(powerup) => {
                if powerup.died {
                    self.powerups.remove(&powerup.id);
                } else {
                    self.powerups.insert(powerup.id, powerup);
                }
            }
        }
    }

    /// This client's own snake, once the server has spawned it.
    pub fn player(&self) -> Option<&SnakeRecord> {
        self.snakes.get(&self.player_id)
    }
}
