//! Registry of connected players and their outbound queues.
//!
//! This module tracks every session that has completed the handshake:
//! - Session id assignment and handshake queuing
//! - Fire-and-forget broadcast of world snapshots
//! - Deregistration when the transport reports an error
//!
//! A session only becomes visible to broadcasts after its handshake has been
//! queued, so clients always see their id, the world size and the walls
//! before the first snapshot.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Frames are shared between sessions; each queue holds a reference.
pub type Frame = Arc<str>;

/// A player connection that has sent its name and received the handshake.
#[derive(Debug)]
pub struct Session {
    /// Player id, also the id of the player's snake
    pub id: u32,
    /// Display name the client sent
    pub name: String,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// When the handshake completed
    pub joined_at: Instant,
    outbound: mpsc::Sender<Frame>,
}

impl Session {
    pub fn connected_for(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

/// Outcome of delivering one frame to every session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
    pub closed: usize,
}

pub struct SessionRegistry {
    /// Live sessions indexed by player id
    sessions: HashMap<u32, Session>,
    /// Next id handed out; ids are never reused
    next_session_id: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Assigns an id, queues the handshake built by `greeting`, and registers the session.
    ///
    /// Returns `None` if the handshake could not be queued, in which case the
    /// session is not registered and the id is not consumed.
    pub fn register<F>(
        &mut self,
        name: String,
        addr: SocketAddr,
        outbound: mpsc::Sender<Frame>,
        greeting: F,
    ) -> Option<u32>
    where
        F: FnOnce(u32) -> Option<String>,
    {
        let id = self.next_session_id;
        let handshake = greeting(id)?;
        if let Err(e) = outbound.try_send(Frame::from(handshake)) {
            warn!("Could not queue handshake for {}: {}", addr, e);
            return None;
        }

        self.next_session_id += 1;
        info!("Client {} ({}) joined from {}", id, name, addr);
        self.sessions.insert(
            id,
            Session {
                id,
                name,
                addr,
                joined_at: Instant::now(),
                outbound,
            },
        );
        Some(id)
    }

    /// Removes a session. Returns true if it was still registered.
    pub fn remove(&mut self, id: u32) -> bool {
        if let Some(session) = self.sessions.remove(&id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                session.id,
                session.name,
                session.connected_for().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Queues `frame` on every session without waiting.
    ///
    /// A full queue drops this frame for that client only; a closed queue
    /// belongs to a connection that is already tearing down.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for session in self.sessions.values() {
            match session.outbound.try_send(Arc::clone(frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Client {} is not keeping up, dropping frame", session.id);
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Client {} outbound queue closed", session.id);
                    report.closed += 1;
                }
            }
        }
        report
    }

    pub fn get(&self, id: u32) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
