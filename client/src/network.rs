use crate::robot::World;
use log::{debug, info, warn};
use shared::{
    frame, name_hash, KeyTable, Position, ServerMessage, FULL_POWER, RECHARGING, TERMINATOR,
};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{sleep, timeout};

#[derive(Debug, Error)]
pub enum RobotError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("server stayed silent for {0:?}")]
    Timeout(Duration),

    #[error("server sent unexpected {0:?}")]
    Unexpected(String),

    #[error("server refused: {0}")]
    Rejected(ServerMessage),

    #[error("no key with id {0}")]
    UnknownKey(i32),

    #[error("server code {code} does not prove knowledge of key {key_id}")]
    Impostor { code: u16, key_id: i32 },
}

#[derive(Debug, Clone)]
pub struct RobotConfig {
    pub name: String,
    pub key_id: i32,
    /// Recharge before every n-th answer.
    pub recharge_every: Option<u32>,
    pub recharge_for: Duration,
    pub read_timeout: Duration,
}

impl RobotConfig {
    pub fn new(name: impl Into<String>, key_id: i32) -> Self {
        Self {
            name: name.into(),
            key_id,
            recharge_every: None,
            recharge_for: Duration::from_millis(100),
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// What happened during one visit to the server.
#[derive(Debug, Clone)]
pub struct Trip {
    pub commands: Vec<ServerMessage>,
    pub position: Position,
    pub recharges: u32,
    pub delivered_secret: bool,
}

impl Trip {
    pub fn moves(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, ServerMessage::Move))
            .count()
    }

    pub fn turns(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, ServerMessage::TurnLeft | ServerMessage::TurnRight))
            .count()
    }
}

pub struct Robot<S> {
    stream: BufStream<S>,
    world: World,
    config: RobotConfig,
    answers: u32,
    recharges: u32,
}

impl Robot<TcpStream> {
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        world: World,
        config: RobotConfig,
    ) -> Result<Self, RobotError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", stream.peer_addr()?);
        Ok(Self::new(stream, world, config))
    }
}

impl<S> Robot<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, world: World, config: RobotConfig) -> Self {
        Self {
            stream: BufStream::new(stream),
            world,
            config,
            answers: 0,
            recharges: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Logs in, obeys commands until `LOGOUT`, and reports the trip.
    pub async fn run(mut self) -> Result<Trip, RobotError> {
        self.login().await?;

        let mut commands = Vec::new();
        let mut delivered_secret = false;
        loop {
            let command = self.receive_message().await?;
            debug!("Command {}", command);
            commands.push(command);

            match command {
                ServerMessage::Logout => break,
                ServerMessage::GetMessage => delivered_secret = true,
                c if c.is_error() => return Err(RobotError::Rejected(c)),
                _ => {}
            }

            match self.world.respond(command) {
                Some(answer) => self.answer(&answer).await?,
                None => return Err(RobotError::Unexpected(command.to_string())),
            }
        }

        info!(
            "Logged out at {} after {} commands",
            self.world.position(),
            commands.len()
        );
        Ok(Trip {
            commands,
            position: self.world.position(),
            recharges: self.recharges,
            delivered_secret,
        })
    }

    async fn login(&mut self) -> Result<(), RobotError> {
        let name = self.config.name.clone();
        let key_id = self.config.key_id;

        self.send(&name).await?;
        self.expect(ServerMessage::KeyRequest).await?;
        self.answer(&key_id.to_string()).await?;

        let code = match self.receive_message().await? {
            ServerMessage::Confirmation(code) => code,
            other if other.is_error() => return Err(RobotError::Rejected(other)),
            other => return Err(RobotError::Unexpected(other.to_string())),
        };
        let pair = KeyTable::default()
            .get(key_id)
            .ok_or(RobotError::UnknownKey(key_id))?;

        let hash = name_hash(&name);
        if pair.decode_server_confirmation(code) != hash {
            warn!("Server code {} does not match hash {}", code, hash);
            return Err(RobotError::Impostor { code, key_id });
        }

        self.answer(&pair.client_confirmation(hash).to_string())
            .await?;
        self.expect(ServerMessage::Ok).await?;
        info!("Logged in as {:?}", name);
        Ok(())
    }

    async fn expect(&mut self, expected: ServerMessage) -> Result<(), RobotError> {
        match self.receive_message().await? {
            message if message == expected => Ok(()),
            message if message.is_error() => Err(RobotError::Rejected(message)),
            message => Err(RobotError::Unexpected(message.to_string())),
        }
    }

    /// Sends an answer, recharging first when it is due.
    async fn answer(&mut self, content: &str) -> Result<(), RobotError> {
        self.answers += 1;
        if let Some(every) = self.config.recharge_every.filter(|n| *n > 0) {
            if self.answers % every == 0 {
                debug!("Recharging for {:?}", self.config.recharge_for);
                self.send(RECHARGING).await?;
                sleep(self.config.recharge_for).await;
                self.send(FULL_POWER).await?;
                self.recharges += 1;
            }
        }
        self.send(content).await
    }

    async fn send(&mut self, content: &str) -> Result<(), RobotError> {
        self.stream.write_all(&frame(content)).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn receive_message(&mut self) -> Result<ServerMessage, RobotError> {
        let text = self.receive().await?;
        ServerMessage::parse(&text).ok_or(RobotError::Unexpected(text))
    }

    async fn receive(&mut self) -> Result<String, RobotError> {
        let limit = self.config.read_timeout;
        let mut bytes = Vec::new();
        loop {
            let read = timeout(limit, self.stream.read_until(TERMINATOR[1], &mut bytes))
                .await
                .map_err(|_| RobotError::Timeout(limit))??;
            if read == 0 {
                let closed = io::Error::new(io::ErrorKind::UnexpectedEof, "server hung up");
                return Err(closed.into());
            }
            if let Some(content) = bytes.strip_suffix(TERMINATOR) {
                return Ok(String::from_utf8_lossy(content).into_owned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Orientation;
    use tokio_test::io::{Builder, Mock};

    fn robot(mock: Mock, world: World) -> Robot<Mock> {
        Robot::new(mock, world, RobotConfig::new("Mnau", 0))
    }

    fn login(builder: &mut Builder) -> &mut Builder {
        builder
            .write(&frame("Mnau"))
            .read(b"107 KEY REQUEST\x07\x08")
            .write(&frame("0"))
            .read(b"30803\x07\x08")
            .write(&frame("39821"))
            .read(b"200 OK\x07\x08")
    }

    #[tokio::test]
    async fn test_obeys_commands_until_logout() {
        let mock = login(&mut Builder::new())
            .read(b"102 MOVE\x07\x08")
            .write(&frame("OK 1 0"))
            .read(b"103 TURN LEFT\x07\x08")
            .write(&frame("OK 1 0"))
            .read(b"105 GET MESSAGE\x07\x08")
            .write(&frame("Tajna zprava."))
            .read(b"106 LOGOUT\x07\x08")
            .build();

        let world = World::new(Position::new(0, 0), Orientation::XPlus);
        let trip = robot(mock, world).run().await.unwrap();

        assert_eq!(trip.moves(), 1);
        assert_eq!(trip.turns(), 1);
        assert_eq!(trip.position, Position::new(1, 0));
        assert!(trip.delivered_secret);
        assert_eq!(trip.recharges, 0);
    }

    #[tokio::test]
    async fn test_frames_split_across_reads() {
        let mock = Builder::new()
            .write(&frame("Mnau"))
            .read(b"107 KEY REQ")
            .read(b"UEST\x07")
            .read(b"\x08")
            .write(&frame("0"))
            .read(b"30803\x07\x08")
            .write(&frame("39821"))
            .read(b"200 OK\x07\x08106 LOGOUT\x07\x08")
            .build();

        let world = World::new(Position::new(2, 2), Orientation::YMinus);
        let trip = robot(mock, world).run().await.unwrap();
        assert_eq!(trip.commands, vec![ServerMessage::Logout]);
        assert!(!trip.delivered_secret);
    }

    #[tokio::test]
    async fn test_recharges_on_schedule() {
        let mock = Builder::new()
            .write(&frame("Mnau"))
            .read(b"107 KEY REQUEST\x07\x08")
            .write(&frame("0"))
            .read(b"30803\x07\x08")
            .write(&frame(RECHARGING))
            .write(&frame(FULL_POWER))
            .write(&frame("39821"))
            .read(b"200 OK\x07\x08")
            .read(b"106 LOGOUT\x07\x08")
            .build();

        let mut config = RobotConfig::new("Mnau", 0);
        config.recharge_every = Some(2);
        config.recharge_for = Duration::from_millis(10);

        let world = World::new(Position::new(0, 1), Orientation::YMinus);
        let trip = Robot::new(mock, world, config).run().await.unwrap();
        assert_eq!(trip.recharges, 1);
    }

    #[tokio::test]
    async fn test_rejects_impostor_server() {
        let mock = Builder::new()
            .write(&frame("Mnau"))
            .read(b"107 KEY REQUEST\x07\x08")
            .write(&frame("0"))
            .read(b"30804\x07\x08")
            .build();

        let world = World::new(Position::new(1, 1), Orientation::XPlus);
        let err = robot(mock, world).run().await.unwrap_err();
        assert!(matches!(err, RobotError::Impostor { code: 30804, key_id: 0 }));
    }

    #[tokio::test]
    async fn test_error_code_ends_trip() {
        let mock = Builder::new()
            .write(&frame("Mnau"))
            .read(b"107 KEY REQUEST\x07\x08")
            .write(&frame("0"))
            .read(b"303 KEY OUT OF RANGE\x07\x08")
            .build();

        let world = World::new(Position::new(1, 1), Orientation::XPlus);
        let err = robot(mock, world).run().await.unwrap_err();
        assert!(matches!(err, RobotError::Rejected(ServerMessage::KeyOutOfRange)));
    }

    #[tokio::test]
    async fn test_server_hangup() {
        let mock = Builder::new()
            .write(&frame("Mnau"))
            .read(b"107 KEY")
            .build();

        let world = World::new(Position::new(1, 1), Orientation::XPlus);
        let err = robot(mock, world).run().await.unwrap_err();
        assert!(matches!(err, RobotError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }
}
