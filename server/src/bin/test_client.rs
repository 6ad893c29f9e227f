//! Headless bot that joins a server over the real protocol and turns at random.

use clap::Parser;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use shared::{encode_command, ClientWorld, Direction, DEFAULT_PORT};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{interval, sleep};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,
    /// Player name sent in the handshake
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// Seconds to play before disconnecting
    #[clap(short, long, default_value = "30")]
    duration: u64,
    /// Milliseconds between random turns
    #[clap(short, long, default_value = "1000")]
    turn_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    info!("Connected to {}", args.server);

    let (reader, mut writer) = stream.into_split();
    writer.write_all(format!("{}\n", args.name).as_bytes()).await?;

    let mut lines = BufReader::new(reader).lines();
    let id_line = lines.next_line().await?.ok_or("server closed during handshake")?;
    let size_line = lines.next_line().await?.ok_or("server closed during handshake")?;
    let mut world = ClientWorld::from_handshake(&id_line, &size_line)?;
    info!(
        "Joined as player {} in a world of size {}",
        world.player_id, world.world_size
    );

    let mut turns = interval(Duration::from_millis(args.turn_interval));
    let deadline = sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        frames += 1;
                        if let Err(e) = world.apply_line(&line) {
                            warn!("Bad line from server: {}", e);
                        }
                    }
                    None => {
                        info!("Server closed the connection");
                        break;
                    }
                }
            }
            _ = turns.tick() => {
                let direction = Direction::ALL
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(Direction::Up);
                debug!("Turning {:?}", direction);
                writer.write_all(encode_command(direction).as_bytes()).await?;

                match world.player() {
                    Some(snake) => info!(
                        "Score {} ({}), {} snakes, {} powerups, {} walls",
                        snake.score,
                        if snake.alive { "alive" } else { "dead" },
                        world.snakes.len(),
                        world.powerups.len(),
                        world.walls.len()
                    ),
                    None => debug!("Waiting for our snake to appear"),
                }
            }
            _ = &mut deadline => {
                info!("Played for {}s, leaving", args.duration);
                break;
            }
        }
    }

    info!("Received {} records", frames);
    writer.shutdown().await?;
    Ok(())
}
