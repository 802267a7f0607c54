//! Challenge-response login of a robot.

use crate::error::SessionError;
use crate::framer::Framer;
use log::{debug, info};
use shared::{name_hash, KeyTable, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};

/// Robot that completed the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub hash: u16,
}

pub struct Authenticator<'a> {
    keys: &'a KeyTable,
}

impl<'a> Authenticator<'a> {
    pub fn new(keys: &'a KeyTable) -> Self {
        Self { keys }
    }

    /// Runs the handshake: name, key id, server code, robot code.
    ///
    /// Answers `200 OK` on success. Every failure has already been answered
    /// on the wire by the time the error is returned.
    pub async fn authenticate<S>(&self, framer: &mut Framer<S>) -> Result<Identity, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let name = framer.read_name().await?;

        framer.send(&ServerMessage::KeyRequest).await?;
        let key_id = framer.read_key_id().await?;
        let Some(pair) = self.keys.get(key_id) else {
            return Err(framer.reject(SessionError::KeyOutOfRange(key_id)).await);
        };

        let hash = name_hash(&name);
        info!(
            "Login of {:?} with key {} (server {}, client {}), hash {}",
            name, key_id, pair.server, pair.client, hash
        );
        framer
            .send(&ServerMessage::Confirmation(pair.server_confirmation(hash)))
            .await?;

        let confirmation = framer.read_confirmation().await?;
        let robot_hash = pair.decode_client_confirmation(confirmation);
        debug!("Hash from robot code: {}", robot_hash);

        if robot_hash != i64::from(hash) {
            return Err(framer.reject(SessionError::LoginFailed { name }).await);
        }

        framer.send(&ServerMessage::Ok).await?;
        Ok(Identity { name, hash })
    }
}
