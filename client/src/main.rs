use clap::Parser;
use client::network::NetworkClient;
use client::session::Session;
use log::{error, info};
use macroquad::window::Conf;
use shared::constants::TICK_RATE;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name shown above your player
    #[arg(short = 'n', long, default_value = "player")]
    name: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Platformer".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let server: SocketAddr = args.server.parse()?;

    info!("Connecting to: {}", server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Controls: A/D or arrows to move, Space to jump, I for debug, R to reconnect");

    let network = NetworkClient::new(server, args.fake_ping);
    let tick_duration = Duration::from_millis(1000 / TICK_RATE as u64);
    let mut session = Session::new(args.name, network, tick_duration);
    session.run().await
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run(Args::parse()).await {
        error!("Client stopped: {}", e);
    }
}
