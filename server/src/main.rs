use clap::Parser;
use log::info;
use server::config::{ServerConfig, Timeouts};
use server::network::Server;
use shared::DEFAULT_PORT;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, then serves robots until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Time to wait for each robot message, in milliseconds
        #[clap(short, long, default_value = "1000")]
        timeout_ms: u64,
        /// Time to wait for a recharging robot, in milliseconds
        #[clap(short, long, default_value = "5000")]
        recharging_timeout_ms: u64,
    }

    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let timeouts = Timeouts::new(
        Duration::from_millis(args.timeout_ms),
        Duration::from_millis(args.recharging_timeout_ms),
    )?;
    let config = ServerConfig::new(format!("{}:{}", args.host, args.port), timeouts);
    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
