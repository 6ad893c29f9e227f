//! # Snake Arena Server Library
//!
//! This library provides the authoritative server for the multiplayer snake
//! game. It owns the canonical world, applies player turns, resolves every
//! collision and broadcasts a snapshot of the world to all connected clients
//! once per frame.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Snakes, powerups and walls live only on the server. Clients send nothing
//! but their name and direction requests; everything they draw comes from
//! the per-frame snapshot.
//!
//! ### Session Management
//! Handles the lifecycle of each TCP connection:
//! - Name line and handshake (player id, world size, walls)
//! - Movement command decoding
//! - Disconnect detection and cleanup
//!
//! ### State Broadcasting
//! Every frame the world is serialized once as newline-delimited JSON and the
//! same frame is queued on every session. A client that cannot keep up loses
//! frames instead of slowing the loop down.
//!
//! ## Architecture Design
//!
//! ### Single Owner Game Loop
//! One task owns the [`world::World`]. Connection tasks never touch it; they
//! send [`game::GameEvent`]s that the loop applies between ticks. The tick
//! itself is driven by a tokio interval, so a frame starts no earlier than
//! the configured period after the previous one.
//!
//! ### Deterministic Ordering
//! Snakes and powerups are stored in id order and the per-tick update order is
//! fixed: movement, powerup spawning, powerup pickup, wall hits, snake hits,
//! self hits, wraparound.
//!
//! ## Module Organization
//!
//! - `settings`: JSON settings file and the per-tick rules derived from it
//! - `flag`: one-shot flags reported by exactly one snapshot
//! - `world`: world tables, movement, respawn and snapshot encoding
//! - `collision`: bounding-box collision passes
//! - `spawn`: rejection-sampled placement of snakes and powerups
//! - `session`: registry of connected players and their outbound queues
//! - `network`: TCP accept loop and per-connection tasks
//! - `game`: the game loop and the [`game::GameServer`] entry point
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameServer;
//! use server::settings::GameSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let settings = GameSettings::load("settings.json")?;
//!     let server = GameServer::bind("0.0.0.0:11000", settings).await?;
//!     server.run().await
//! }
//! ```

pub mod collision;
pub mod flag;
pub mod game;
pub mod network;
pub mod session;
pub mod settings;
pub mod spawn;
pub mod world;
