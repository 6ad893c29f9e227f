//! Integration tests for the snake server
//!
//! These tests validate cross-component interactions: the wire format as a
//! client sees it, whole-game scenarios driven tick by tick, and a real TCP
//! session against a running server.

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::game::GameServer;
use server::settings::{GameSettings, TickRules};
use server::world::{Snake, World};
use shared::{
    encode_command, ClientWorld, Direction, ServerRecord, SnakeRecord, Vector2D, Wall,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;

const TIMEOUT: Duration = Duration::from_secs(5);

fn v(x: f64, y: f64) -> Vector2D {
    Vector2D::new(x, y)
}

fn rules(respawn_delay: u32) -> TickRules {
    TickRules {
        speed: 3.0,
        growth_frames: 12,
        respawn_delay,
        start_length: 120.0,
        max_powerups: 0,
        max_powerup_delay: 200,
    }
}

fn snake_records(frame: &str) -> Vec<SnakeRecord> {
    frame
        .lines()
        .filter_map(|line| match ServerRecord::decode(line) {
            Ok(ServerRecord::Snake(snake)) => Some(snake),
            _ => None,
        })
        .collect()
}

/// WIRE FORMAT TESTS
mod protocol_tests {
    use super::*;

    /// A client mirror fed by real snapshots tracks joins, pickups and departures
    #[test]
    fn client_world_follows_snapshots() {
        let mut world = World::with_rng(2000, Vec::new(), StdRng::seed_from_u64(1));
        world.insert_snake(Snake::new(1, "alice", vec![v(0.0, 100.0), v(80.0, 100.0)], Direction::Right));
        world.insert_snake(Snake::new(2, "bob", vec![v(0.0, -300.0), v(0.0, -180.0)], Direction::Down));
        world.place_powerup(v(90.0, 100.0));

        let handshake = shared::encode_handshake(1, 2000, world.walls().values()).unwrap();
        let mut header = handshake.lines();
        let mut client =
            ClientWorld::from_handshake(header.next().unwrap(), header.next().unwrap()).unwrap();

        for line in world.snapshot().lines() {
            client.apply_line(line).unwrap();
        }
        assert_eq!(client.player_id, 1);
        assert_eq!(client.player().unwrap().name, "alice");
        assert_eq!(client.snakes.len(), 2);
        assert_eq!(client.powerups.len(), 1);

        world.tick(&rules(10));
        world.mark_disconnected(2);
        for line in world.snapshot().lines() {
            client.apply_line(line).unwrap();
        }

        assert_eq!(client.snakes.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(client.player().unwrap().score, 1);
        assert!(client.powerups.is_empty());
    }

    /// Snapshot lines carry every field the protocol names
    #[test]
    fn snapshot_line_fields() {
        let mut world = World::with_rng(2000, Vec::new(), StdRng::seed_from_u64(2));
        world.insert_snake(Snake::new(
            4,
            "dora",
            vec![v(0.0, 0.0), v(0.0, -120.0)],
            Direction::Up,
        ));
        let frame = world.snapshot();
        let value: serde_json::Value = serde_json::from_str(frame.lines().next().unwrap()).unwrap();

        for key in ["snake", "name", "body", "dir", "score", "died", "alive", "dc", "join"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["dir"]["X"], 0.0);
        assert_eq!(value["dir"]["Y"], -1.0);
        assert_eq!(value["join"], true);
    }

    #[test]
    fn command_encoding_matches_server_decoding() {
        for direction in Direction::ALL {
            let line = encode_command(direction);
            assert!(line.ends_with('\n'));
            assert_eq!(shared::decode_command(&line).unwrap(), direction);
        }
    }
}

/// WHOLE-GAME SCENARIOS
mod scenario_tests {
    use super::*;

    /// A snake running into a wall dies, stays out for the respawn delay, then returns
    #[test]
    fn wall_death_and_respawn() {
        let wall = Wall::new(0, v(0.0, 0.0), v(0.0, 100.0));
        let mut world = World::with_rng(2000, vec![wall], StdRng::seed_from_u64(9));
        let mut snake = Snake::new(1, "runner", vec![v(-200.0, 50.0), v(-80.0, 50.0)], Direction::Right);
        snake.score = 4;
        world.insert_snake(snake);
        world.snapshot();

        let rules = rules(10);
        for _ in 0..16 {
            world.tick(&rules);
            assert!(world.snake(1).unwrap().alive);
        }

        world.tick(&rules);
        let snake = world.snake(1).unwrap();
        assert!(!snake.alive);
        assert_eq!(snake.score, 0);

        let records = snake_records(&world.snapshot());
        assert!(records[0].died);
        assert!(!records[0].alive);
        let records = snake_records(&world.snapshot());
        assert!(!records[0].died, "death is reported once");

        for _ in 0..10 {
            world.tick(&rules);
            assert!(!world.snake(1).unwrap().alive);
        }

        world.tick(&rules);
        let snake = world.snake(1).unwrap();
        assert!(snake.alive);
        assert_eq!(snake.body.len(), 2);
        assert!(((snake.head() - snake.tail()).magnitude() - 120.0).abs() < 1e-9);
        assert_eq!(snake.direction, Direction::Right);
    }

    /// Eating a powerup scores, removes the powerup after one report, and holds the tail
    #[test]
    fn powerup_pickup_and_growth() {
        let mut world = World::with_rng(2000, Vec::new(), StdRng::seed_from_u64(3));
        world.insert_snake(Snake::new(1, "eater", vec![v(0.0, 100.0), v(80.0, 100.0)], Direction::Right));
        let powerup = world.place_powerup(v(100.0, 100.0));
        world.snapshot();

        let rules = rules(10);
        world.tick(&rules);
        world.tick(&rules);
        assert_eq!(world.snake(1).unwrap().score, 0);

        world.tick(&rules);
        assert_eq!(world.snake(1).unwrap().score, 1);
        assert!(world.snake(1).unwrap().growing);

        let frame = world.snapshot();
        let collected = frame
            .lines()
            .filter_map(|line| match ServerRecord::decode(line) {
                Ok(ServerRecord::Powerup(p)) => Some(p),
                _ => None,
            })
            .find(|p| p.id == powerup)
            .unwrap();
        assert!(collected.died);
        assert!(world.powerups().get(&powerup).is_none());

        let tail = world.snake(1).unwrap().tail();
        for _ in 0..12 {
            world.tick(&rules);
            assert!(world.snake(1).unwrap().tail().approx_eq(&tail, 1e-9));
        }
        world.tick(&rules);
        assert!(world.snake(1).unwrap().tail().approx_eq(&(tail + v(3.0, 0.0)), 1e-9));
    }

    /// Crossing the edge appends the jump and continues from the far side
    #[test]
    fn wraparound_mirrors_head() {
        let mut world = World::with_rng(2000, Vec::new(), StdRng::seed_from_u64(4));
        world.insert_snake(Snake::new(1, "edge", vec![v(880.0, 0.0), v(998.0, 0.0)], Direction::Right));

        world.tick(&rules(10));
        let snake = world.snake(1).unwrap();
        assert_eq!(snake.body.len(), 4);
        assert!(snake.head().approx_eq(&v(-1001.0, 0.0), 1e-9));

        world.tick(&rules(10));
        let snake = world.snake(1).unwrap();
        assert!(snake.alive);
        assert!(snake.head().approx_eq(&v(-998.0, 0.0), 1e-9));
    }

    /// Head-on into another snake's body kills only the runner
    #[test]
    fn snake_collision_kills_runner() {
        let mut world = World::with_rng(2000, Vec::new(), StdRng::seed_from_u64(5));
        world.insert_snake(Snake::new(1, "runner", vec![v(-100.0, 0.0), v(-20.0, 0.0)], Direction::Right));
        world.insert_snake(Snake::new(2, "block", vec![v(0.0, -100.0), v(0.0, 60.0)], Direction::Down));

        let rules = rules(100);
        let mut ticks = 0;
        while world.snake(1).unwrap().alive && ticks < 20 {
            world.tick(&rules);
            ticks += 1;
        }

        assert_eq!(ticks, 4);
        assert!(!world.snake(1).unwrap().alive);
        assert!(world.snake(2).unwrap().alive);
    }
}

/// REAL TCP SESSION TESTS
mod network_tests {
    use super::*;

    async fn start_server() -> std::net::SocketAddr {
        let settings = GameSettings::from_json(
            r#"{
                "MSPerFrame": 10,
                "RespawnRate": 20,
                "UniverseSize": 1000,
                "MaxPowerups": 3,
                "Walls": [
                    {"wall": 0, "p1": {"X": -300, "Y": 300}, "p2": {"X": 300, "Y": 300}}
                ]
            }"#,
        )
        .unwrap();
        let server = GameServer::bind("127.0.0.1:0", settings).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn join(
        addr: std::net::SocketAddr,
        name: &str,
    ) -> (ClientWorld, Lines<BufReader<OwnedReadHalf>>, tokio::net::tcp::OwnedWriteHalf) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(format!("{}\n", name).as_bytes()).await.unwrap();

        let mut lines = BufReader::new(reader).lines();
        let id = lines.next_line().await.unwrap().unwrap();
        let size = lines.next_line().await.unwrap().unwrap();
        let mut world = ClientWorld::from_handshake(&id, &size).unwrap();
        let wall = lines.next_line().await.unwrap().unwrap();
        world.apply_line(&wall).unwrap();
        (world, lines, writer)
    }

    /// Reads records until one satisfies `pred`.
    async fn wait_for_snake<F>(
        lines: &mut Lines<BufReader<OwnedReadHalf>>,
        world: &mut ClientWorld,
        mut pred: F,
    ) -> SnakeRecord
    where
        F: FnMut(&SnakeRecord) -> bool,
    {
        timeout(TIMEOUT, async {
            loop {
                let line = lines.next_line().await.unwrap().expect("server closed");
                let record = ServerRecord::decode(&line).unwrap();
                world.apply(record.clone());
                if let ServerRecord::Snake(snake) = record {
                    if pred(&snake) {
                        return snake;
                    }
                }
            }
        })
        .await
        .expect("timed out waiting for snake record")
    }

    #[tokio::test]
    async fn handshake_then_join() {
        let addr = start_server().await;
        let (mut world, mut lines, _writer) = join(addr, "alice").await;

        assert_eq!(world.player_id, 1);
        assert_eq!(world.world_size, 1000);
        assert_eq!(world.walls.len(), 1);

        let me = wait_for_snake(&mut lines, &mut world, |s| s.id == 1).await;
        assert!(me.join);
        assert_eq!(me.name, "alice");
        assert!(me.alive);

        let again = wait_for_snake(&mut lines, &mut world, |s| s.id == 1).await;
        assert!(!again.join);
    }

    #[tokio::test]
    async fn turn_command_changes_direction() {
        let addr = start_server().await;
        let (mut world, mut lines, mut writer) = join(addr, "turner").await;

        let me = wait_for_snake(&mut lines, &mut world, |s| s.id == 1).await;
        let current = Direction::from_vector(me.dir).unwrap();
        let turn = Direction::ALL
            .into_iter()
            .find(|d| d.is_orthogonal_to(current))
            .unwrap();

        writer.write_all(b"not a command\n").await.unwrap();

        // A turn right after a wraparound can be refused, so keep asking.
        let mut turned = None;
        for _ in 0..20 {
            writer.write_all(encode_command(turn).as_bytes()).await.unwrap();
            let me = wait_for_snake(&mut lines, &mut world, |s| s.id == 1).await;
            if Direction::from_vector(me.dir) == Some(turn) {
                turned = Some(me);
                break;
            }
        }
        assert!(turned.is_some(), "snake never turned {:?}", turn);
    }

    #[tokio::test]
    async fn disconnect_is_reported_to_peers() {
        let addr = start_server().await;
        let (mut alice, mut alice_lines, _alice_writer) = join(addr, "alice").await;
        let (mut bob, mut bob_lines, bob_writer) = join(addr, "bob").await;
        assert_eq!(bob.player_id, 2);

        wait_for_snake(&mut alice_lines, &mut alice, |s| s.id == 2).await;
        wait_for_snake(&mut bob_lines, &mut bob, |s| s.id == 2).await;

        drop(bob_writer);
        drop(bob_lines);

        let gone = wait_for_snake(&mut alice_lines, &mut alice, |s| s.id == 2 && s.disconnected).await;
        assert!(gone.died);
        assert!(!gone.alive);
        assert!(!alice.snakes.contains_key(&2));

        // The departed snake is never reported again.
        for _ in 0..5 {
            let me = wait_for_snake(&mut alice_lines, &mut alice, |s| s.id == 1 || s.id == 2).await;
            assert_eq!(me.id, 1);
        }
    }
}

/// CONFIGURATION TESTS
mod settings_tests {
    use super::*;

    /// The bundled settings file loads and validates
    #[test]
    fn bundled_settings_load() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/settings.json");
        let settings = GameSettings::load(path).unwrap();

        assert_eq!(settings.universe_size, 2000);
        assert_eq!(settings.walls.len(), 6);
        assert!(settings.walls.iter().all(|w| w.is_axis_aligned()));
        assert_eq!(settings.tick_rules().speed, 3.0);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        assert!(GameSettings::load("does/not/exist.json").is_err());
    }
}
