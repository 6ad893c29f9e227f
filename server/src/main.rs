use clap::Parser;
use log::{error, info};
use server::game::GameServer;
use server::settings::GameSettings;
use shared::DEFAULT_PORT;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Settings file describing the world
    #[clap(short, long, default_value = "settings.json")]
    settings: PathBuf,
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Missing settings are fatal before anything is bound.
    let settings = match GameSettings::load(&args.settings) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Could not load {}: {}", args.settings.display(), e);
            return Err(e.into());
        }
    };
    info!(
        "Loaded {} ({} walls, world size {})",
        args.settings.display(),
        settings.walls.len(),
        settings.universe_size
    );

    let address = format!("{}:{}", args.host, args.port);
    let server = GameServer::bind(&address, settings).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
