//! Types shared by the snake server and its clients: the vector primitive,
//! the newline-delimited JSON protocol, and a client-side world mirror.

pub mod client_world;
pub mod protocol;
pub mod vector;

pub use client_world::ClientWorld;
pub use protocol::{
    decode_command, decode_header, encode_command, encode_handshake, is_teleport_segment,
    push_record, PowerupRecord, ProtocolError, ServerRecord, SnakeRecord, Wall,
};
pub use vector::{Direction, Vector2D};

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 11000;
