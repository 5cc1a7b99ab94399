use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::level::Level;
use server::network::Server;
use server::simulation::Simulation;

/// Parses command-line arguments, builds the level and runs the server until
/// it stops or Ctrl+C is pressed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::parse();

    let mut level = match &config.level {
        Some(path) => Level::load(path)?,
        None => Level::embedded()?,
    };
    if let Some(grid) = config.snap_grid {
        level = level.snapped(grid);
    }
    info!("Loaded level with {} records", level.records().len());

    let simulation = Simulation::new(config.simulation(), &level)?;
    let mut server = Server::new(
        &config.address(),
        config.tick_duration(),
        config.max_clients,
        simulation,
    )
    .await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
