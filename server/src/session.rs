//! One robot connection from login to logout.

use crate::auth::Authenticator;
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::framer::Framer;
use crate::navigator::navigate;
use log::{debug, info};
use shared::{KeyTable, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};

/// What a completed session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub name: String,
    pub secret: String,
}

/// Authenticates the robot, pilots it to the origin, picks up the secret and
/// logs it out. The connection is closed whatever the outcome; failures have
/// already been answered on the wire when this returns.
pub async fn run_session<S>(stream: S, config: &ServerConfig) -> Result<SessionReport, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framer = Framer::new(stream, config.timeouts);
    let result = pilot(&mut framer, &config.keys).await;
    if let Err(e) = framer.close().await {
        debug!("Closing connection failed: {}", e);
    }
    result
}

async fn pilot<S>(framer: &mut Framer<S>, keys: &KeyTable) -> Result<SessionReport, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let identity = Authenticator::new(keys).authenticate(framer).await?;
    info!("Robot {:?} logged in", identity.name);

    navigate(framer).await?;

    framer.send(&ServerMessage::GetMessage).await?;
    let secret = framer.read_secret().await?;
    info!("Secret from {:?}: {:?}", identity.name, secret);

    framer.send(&ServerMessage::Logout).await?;
    Ok(SessionReport {
        name: identity.name,
        secret,
    })
}
