use clap::Parser;
use client::network::{Robot, RobotConfig};
use client::robot::World;
use log::info;
use shared::{Orientation, Position, DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Name to log in with
    #[arg(short = 'n', long, default_value = "Mnau")]
    name: String,

    /// Key id to log in with
    #[arg(short = 'k', long, default_value = "0")]
    key_id: i32,

    /// Starting x coordinate (random when omitted)
    #[arg(short = 'x', long, allow_hyphen_values = true, requires = "y")]
    x: Option<i32>,

    /// Starting y coordinate (random when omitted)
    #[arg(short = 'y', long, allow_hyphen_values = true, requires = "x")]
    y: Option<i32>,

    /// Starting heading: X+, X-, Y+ or Y-
    #[arg(long)]
    heading: Option<Orientation>,

    /// How far from the origin a random start may be
    #[arg(long, default_value = "10")]
    range: i32,

    /// Number of randomly placed obstacles
    #[arg(short = 'o', long, default_value = "0")]
    obstacles: usize,

    /// Secret message to hand over at the origin
    #[arg(long, default_value = "Tajna zprava.")]
    secret: String,

    /// Recharge before every n-th answer
    #[arg(short = 'r', long)]
    recharge_every: Option<u32>,

    /// How long a recharge takes, in milliseconds
    #[arg(long, default_value = "1000")]
    recharge_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut rng = rand::thread_rng();
    let random = World::random(&mut rng, args.range, args.obstacles);
    let position = match (args.x, args.y) {
        (Some(x), Some(y)) => Position::new(x, y),
        _ => random.position(),
    };
    let heading = args.heading.unwrap_or(random.heading());
    let world = World::new(position, heading)
        .with_obstacles(random.obstacles().copied())
        .with_secret(args.secret);

    info!("Starting at {} facing {}", position, heading);
    for obstacle in world.obstacles() {
        info!("Obstacle at {}", obstacle);
    }

    let mut config = RobotConfig::new(args.name, args.key_id);
    config.recharge_every = args.recharge_every;
    config.recharge_for = Duration::from_millis(args.recharge_ms);

    let robot = Robot::connect(&args.server, world, config).await?;
    let trip = robot.run().await?;

    info!(
        "Reached {} with {} moves, {} turns and {} recharges",
        trip.position,
        trip.moves(),
        trip.turns(),
        trip.recharges
    );

    Ok(())
}
