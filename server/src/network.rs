//! Server network layer accepting robot connections over TCP

use crate::config::ServerConfig;
use crate::session::run_session;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Listens for robots and runs one independent session task per connection
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&config.address).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever. A failing session never stops the loop.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!(
            "Server started (timeout {:?}, recharging {:?})",
            self.config.timeouts.normal(),
            self.config.timeouts.recharging()
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        handle_connection(stream, addr, &config).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, config: &ServerConfig) {
    info!("Robot connected from {}", addr);
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    match run_session(stream, config).await {
        Ok(report) => info!(
            "Robot {:?} from {} delivered {:?}",
            report.name, addr, report.secret
        ),
        Err(e) => warn!("Session with {} ended: {}", addr, e),
    }
}
