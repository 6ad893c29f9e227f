//! The game loop: a single task that owns the world, applies client events
//! as they arrive and runs one simulation step per frame period.

use crate::network::{accept_loop, ConnectionContext};
use crate::session::{Frame, SessionRegistry};
use crate::settings::{GameSettings, TickRules};
use crate::world::World;
use log::{debug, info};
use shared::Direction;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Ticks between periodic statistics log lines.
const STATS_INTERVAL_TICKS: u64 = 60;

/// Messages sent from connection tasks to the game loop
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Handshake finished; the player needs a snake.
    Joined { id: u32, name: String },
    /// A well-formed movement command.
    Command { id: u32, direction: Direction },
    /// The transport closed or failed.
    Left { id: u32 },
}

/// World plus the bookkeeping the loop needs between ticks.
pub struct GameLoop {
    world: World,
    rules: TickRules,
    sessions: Arc<RwLock<SessionRegistry>>,
    tick: u64,
}

impl GameLoop {
    pub fn new(world: World, rules: TickRules, sessions: Arc<RwLock<SessionRegistry>>) -> Self {
        Self {
            world,
            rules,
            sessions,
            tick: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Applies an event immediately, between ticks.
    pub fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Joined { id, name } => {
                self.world.add_snake(id, name, self.rules.start_length);
            }
            GameEvent::Command { id, direction } => {
                if !self.world.change_direction(id, direction) {
                    debug!("Ignored turn {:?} for snake {}", direction, id);
                }
            }
            GameEvent::Left { id } => self.world.mark_disconnected(id),
        }
    }

    /// Advances the world one frame and hands the snapshot to every session.
    pub async fn step(&mut self) {
        self.world.tick(&self.rules);
        self.tick += 1;

        let snapshot = self.world.snapshot();
        let sessions = self.sessions.read().await;
        if !snapshot.is_empty() && !sessions.is_empty() {
            let report = sessions.broadcast(&Frame::from(snapshot));
            if report.dropped > 0 {
                debug!("Tick {}: {} frames dropped", self.tick, report.dropped);
            }
        }

        if self.tick % STATS_INTERVAL_TICKS == 0 && !sessions.is_empty() {
            debug!(
                "Tick {}: {} clients, {} snakes, {} powerups",
                self.tick,
                sessions.len(),
                self.world.snakes().len(),
                self.world.powerups().len()
            );
        }
    }
}

/// Listener plus settings; `run` starts accepting and simulating.
pub struct GameServer {
    listener: TcpListener,
    settings: GameSettings,
    sessions: Arc<RwLock<SessionRegistry>>,
}

impl GameServer {
    pub async fn bind(
        addr: &str,
        settings: GameSettings,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(GameServer {
            listener,
            settings,
            sessions: Arc::new(RwLock::new(SessionRegistry::new())),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn sessions(&self) -> Arc<RwLock<SessionRegistry>> {
        Arc::clone(&self.sessions)
    }

    /// Runs until the process is stopped.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let GameServer {
            listener,
            settings,
            sessions,
        } = self;
        let rules = settings.tick_rules();

        let mut world = World::new(settings.universe_size, settings.walls.iter().cloned());
        world.add_first_powerups(rules.max_powerups);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let ctx = ConnectionContext {
            sessions: Arc::clone(&sessions),
            world_size: settings.universe_size,
            walls: Arc::new(settings.walls.clone()),
            events: events_tx,
        };
        let acceptor = tokio::spawn(accept_loop(listener, ctx));

        let mut game = GameLoop::new(world, rules, sessions);
        let mut ticker = interval(Duration::from_millis(settings.ms_per_frame));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let started = Instant::now();

        info!(
            "Game loop started: {} ms per frame, world size {}, {} walls",
            settings.ms_per_frame,
            settings.universe_size,
            settings.walls.len()
        );

        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => game.handle_event(event),
                    None => break,
                },
                _ = ticker.tick() => game.step().await,
            }
        }

        info!(
            "Game loop stopped after {} ticks in {:.1}s",
            game.tick_count(),
            started.elapsed().as_secs_f32()
        );
        acceptor.abort();
        Ok(())
    }
}
