//! Command line and simulation settings.

use clap::Parser;
use shared::constants::{
    BUILD_TIME_MS, MAX_STEP_MS, PLAY_TIME_MS, ROUND_LIMIT, SNAPSHOT_RATE, TICK_RATE, WORLD_BOTTOM_Y,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Simulation ticks per second
    #[clap(short, long, default_value_t = TICK_RATE)]
    pub tick_rate: u32,
    /// Snapshot broadcasts per second
    #[clap(long, default_value_t = SNAPSHOT_RATE)]
    pub snapshot_rate: u32,
    /// Maximum number of connected players
    #[clap(short, long, default_value = "16")]
    pub max_clients: usize,
    /// Rounds played before returning to the lobby
    #[clap(long, default_value_t = ROUND_LIMIT)]
    pub round_limit: u32,
    /// Length of the building phase in milliseconds
    #[clap(long, default_value_t = BUILD_TIME_MS)]
    pub build_time_ms: u64,
    /// Length of the playing phase in milliseconds
    #[clap(long, default_value_t = PLAY_TIME_MS)]
    pub play_time_ms: u64,
    /// Level file to load instead of the built-in level
    #[clap(short, long)]
    pub level: Option<PathBuf>,
    /// Snap level geometry to a grid of this size
    #[clap(long)]
    pub snap_grid: Option<f32>,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fixed delay between the end of one tick and the start of the next.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_rate.max(1) as u64)
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            snapshot_interval_ms: 1000 / self.snapshot_rate.max(1) as u64,
            round_limit: self.round_limit,
            build_time_ms: self.build_time_ms,
            play_time_ms: self.play_time_ms,
            ..SimulationConfig::default()
        }
    }
}

/// Tunables of the authoritative simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Upper bound for a single physics step.
    pub max_step_ms: u64,
    pub snapshot_interval_ms: u64,
    pub round_limit: u32,
    pub build_time_ms: u64,
    pub play_time_ms: u64,
    pub world_bottom_y: f32,
    /// Spread players randomly across the starting zone instead of stacking
    /// them on its center.
    pub spawn_jitter: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_step_ms: MAX_STEP_MS,
            snapshot_interval_ms: 1000 / SNAPSHOT_RATE as u64,
            round_limit: ROUND_LIMIT,
            build_time_ms: BUILD_TIME_MS,
            play_time_ms: PLAY_TIME_MS,
            world_bottom_y: WORLD_BOTTOM_Y,
            spawn_jitter: true,
        }
    }
}
