//! TCP transport: accepts connections, performs the name/handshake exchange,
//! forwards movement commands to the game loop and drains each session's
//! outbound queue.

use crate::game::GameEvent;
use crate::session::{Frame, SessionRegistry};
use log::{debug, error, info, warn};
use shared::{decode_command, encode_handshake, Wall};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// Snapshots buffered per client before frames start being dropped.
pub const OUTBOUND_QUEUE_FRAMES: usize = 64;

/// Everything a connection task needs from the server.
#[derive(Clone)]
pub struct ConnectionContext {
    pub sessions: Arc<RwLock<SessionRegistry>>,
    pub world_size: u32,
    pub walls: Arc<Vec<Wall>>,
    pub events: mpsc::UnboundedSender<GameEvent>,
}

/// Accepts clients forever, one task per connection.
pub async fn accept_loop(listener: TcpListener, ctx: ConnectionContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Client connected from {}", addr);
                tokio::spawn(handle_connection(stream, addr, ctx.clone()));
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: ConnectionContext) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Could not disable Nagle for {}: {}", addr, e);
    }
    let (reader, writer) = stream.into_split();
    serve_connection(reader, writer, addr, ctx).await;
}

/// Runs one client from its name line until the transport closes.
pub async fn serve_connection<R, W>(reader: R, writer: W, addr: SocketAddr, ctx: ConnectionContext)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    let name = match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => {
            debug!("{} closed before sending a name", addr);
            return;
        }
        Ok(_) => String::from_utf8_lossy(&buf).trim().to_string(),
        Err(e) => {
            warn!("Error reading name from {}: {}", addr, e);
            return;
        }
    };

    let (outbound, frames) = mpsc::channel(OUTBOUND_QUEUE_FRAMES);
    let registered = {
        let mut sessions = ctx.sessions.write().await;
        sessions.register(name.clone(), addr, outbound, |id| {
            match encode_handshake(id, ctx.world_size, ctx.walls.iter()) {
                Ok(handshake) => Some(handshake),
                Err(e) => {
                    error!("Failed to encode handshake for {}: {}", addr, e);
                    None
                }
            }
        })
    };
    let Some(id) = registered else {
        return;
    };

    let mut writer_task = tokio::spawn(write_frames(writer, frames));

    if ctx.events.send(GameEvent::Joined { id, name }).is_ok() {
        tokio::select! {
            result = read_commands(&mut reader, id, &ctx.events) => match result {
                Ok(()) => info!("Client {} closed the connection", id),
                Err(e) => warn!("Read error from client {}: {}", id, e),
            },
            result = &mut writer_task => match result {
                Ok(Ok(())) => debug!("Outbound stream for client {} ended", id),
                Ok(Err(e)) => warn!("Write error to client {}: {}", id, e),
                Err(e) => error!("Writer task for client {} failed: {}", id, e),
            },
        }
    } else {
        error!("Game loop is gone, dropping client {}", id);
    }

    ctx.sessions.write().await.remove(id);
    let _ = ctx.events.send(GameEvent::Left { id });
    writer_task.abort();
}

/// Forwards well-formed movement commands until EOF.
///
/// Lines are read as raw bytes so that invalid UTF-8 is discarded like any
/// other malformed command instead of ending the session.
pub async fn read_commands<R>(
    reader: &mut R,
    id: u32,
    events: &mpsc::UnboundedSender<GameEvent>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                debug!("Discarding malformed command from client {}: {}", id, e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match decode_command(line) {
            Ok(direction) => {
                if events.send(GameEvent::Command { id, direction }).is_err() {
                    return Ok(());
                }
            }
            Err(e) => debug!("Discarding malformed command from client {}: {}", id, e),
        }
    }
}

/// Writes queued frames verbatim until every sender is gone.
pub async fn write_frames<W>(mut writer: W, mut frames: mpsc::Receiver<Frame>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        writer.write_all(frame.as_bytes()).await?;
    }
    writer.shutdown().await
}
