//! Wire vocabulary and data model shared by the pilot server and the robot.
//!
//! Everything here is plain data: message texts, framing constants, grid
//! positions, headings and the authentication key table. The async plumbing
//! lives in the `server` and `client` crates.

use std::fmt;
use std::str::FromStr;

/// Two-byte sequence closing every message in both directions.
pub const TERMINATOR: &[u8; 2] = b"\x07\x08";

/// Smallest receive buffer, terminator included. `RECHARGING` has to fit.
pub const MIN_FRAME_LEN: usize = 12;

pub const NAME_MAX_LEN: usize = 18;
pub const KEY_ID_MAX_LEN: usize = 3;
pub const CONFIRMATION_MAX_LEN: usize = 5;
pub const REPORT_MAX_LEN: usize = 10;
pub const SECRET_MAX_LEN: usize = 98;

pub const RECHARGING: &str = "RECHARGING";
pub const FULL_POWER: &str = "FULL POWER";

pub const DEFAULT_PORT: u16 = 1111;

/// Every message the server can put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    Move,
    TurnLeft,
    TurnRight,
    GetMessage,
    Logout,
    KeyRequest,
    Ok,
    LoginFailed,
    SyntaxError,
    LogicError,
    KeyOutOfRange,
    /// Bare decimal code sent during the handshake.
    Confirmation(u16),
}

const CATALOG: [ServerMessage; 11] = [
    ServerMessage::Move,
    ServerMessage::TurnLeft,
    ServerMessage::TurnRight,
    ServerMessage::GetMessage,
    ServerMessage::Logout,
    ServerMessage::KeyRequest,
    ServerMessage::Ok,
    ServerMessage::LoginFailed,
    ServerMessage::SyntaxError,
    ServerMessage::LogicError,
    ServerMessage::KeyOutOfRange,
];

impl ServerMessage {
    /// Fixed catalog text, `None` for the numeric confirmation.
    pub fn text(&self) -> Option<&'static str> {
        let text = match self {
            ServerMessage::Move => "102 MOVE",
            ServerMessage::TurnLeft => "103 TURN LEFT",
            ServerMessage::TurnRight => "104 TURN RIGHT",
            ServerMessage::GetMessage => "105 GET MESSAGE",
            ServerMessage::Logout => "106 LOGOUT",
            ServerMessage::KeyRequest => "107 KEY REQUEST",
            ServerMessage::Ok => "200 OK",
            ServerMessage::LoginFailed => "300 LOGIN FAILED",
            ServerMessage::SyntaxError => "301 SYNTAX ERROR",
            ServerMessage::LogicError => "302 LOGIC ERROR",
            ServerMessage::KeyOutOfRange => "303 KEY OUT OF RANGE",
            ServerMessage::Confirmation(_) => return None,
        };
        Some(text)
    }

    /// Wire bytes with the terminator appended.
    pub fn encode(&self) -> Vec<u8> {
        frame(&self.to_string())
    }

    /// Maps received wire text back to a message.
    pub fn parse(text: &str) -> Option<ServerMessage> {
        if let Some(message) = CATALOG.iter().find(|m| m.text() == Some(text)) {
            return Some(*message);
        }
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            return text.parse().ok().map(ServerMessage::Confirmation);
        }
        None
    }

    /// Error codes end the conversation on the robot's side.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ServerMessage::LoginFailed
                | ServerMessage::SyntaxError
                | ServerMessage::LogicError
                | ServerMessage::KeyOutOfRange
        )
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.text(), self) {
            (Some(text), _) => f.write_str(text),
            (None, ServerMessage::Confirmation(code)) => write!(f, "{}", code),
            (None, _) => Ok(()),
        }
    }
}

/// Appends the terminator to arbitrary content.
pub fn frame(content: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(content.len() + TERMINATOR.len());
    bytes.extend_from_slice(content.as_bytes());
    bytes.extend_from_slice(TERMINATOR);
    bytes
}

/// Grid coordinate reported by the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_target(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    pub fn on_axis(&self) -> bool {
        self.x == 0 || self.y == 0
    }

    /// Renders the robot's answer to a movement command.
    pub fn report(&self) -> String {
        format!("OK {} {}", self.x, self.y)
    }

    /// Accepts exactly `OK <int> <int>`, single spaces, nothing trailing.
    pub fn parse_report(text: &str) -> Option<Position> {
        let mut parts = text.split(' ');
        if parts.next()? != "OK" {
            return None;
        }
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Position::new(x, y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

impl Turn {
    pub fn command(&self) -> ServerMessage {
        match self {
            Turn::Left => ServerMessage::TurnLeft,
            Turn::Right => ServerMessage::TurnRight,
        }
    }
}

/// Heading of the robot along one of the grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    XPlus,
    XMinus,
    YPlus,
    YMinus,
}

// Indexed by orientation, then [left, right].
const TRANSITIONS: [[Orientation; 2]; 4] = [
    [Orientation::YPlus, Orientation::YMinus],
    [Orientation::YMinus, Orientation::YPlus],
    [Orientation::XMinus, Orientation::XPlus],
    [Orientation::XPlus, Orientation::XMinus],
];

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::XPlus,
        Orientation::XMinus,
        Orientation::YPlus,
        Orientation::YMinus,
    ];

    pub fn turn_left(self) -> Orientation {
        TRANSITIONS[self as usize][0]
    }

    pub fn turn_right(self) -> Orientation {
        TRANSITIONS[self as usize][1]
    }

    pub fn apply(self, turn: Turn) -> Orientation {
        match turn {
            Turn::Left => self.turn_left(),
            Turn::Right => self.turn_right(),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::XPlus | Orientation::XMinus)
    }

    /// Infers the heading from two positions one step apart.
    ///
    /// Returns `None` when the positions are equal or differ on both axes,
    /// since neither tells which way the robot faces.
    pub fn from_step(from: Position, to: Position) -> Option<Orientation> {
        if from.x == to.x && from.y != to.y {
            Some(if from.y > to.y {
                Orientation::YMinus
            } else {
                Orientation::YPlus
            })
        } else if from.y == to.y && from.x != to.x {
            Some(if from.x > to.x {
                Orientation::XMinus
            } else {
                Orientation::XPlus
            })
        } else {
            None
        }
    }

    /// Unit displacement of one step in this heading.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::XPlus => (1, 0),
            Orientation::XMinus => (-1, 0),
            Orientation::YPlus => (0, 1),
            Orientation::YMinus => (0, -1),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::XPlus => "X+",
            Orientation::XMinus => "X-",
            Orientation::YPlus => "Y+",
            Orientation::YMinus => "Y-",
        };
        f.write_str(name)
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Orientation::ALL
            .into_iter()
            .find(|o| o.to_string() == s)
            .ok_or_else(|| format!("unknown heading {:?}, expected X+, X-, Y+ or Y-", s))
    }
}

/// Length of message content as the protocol counts it, in UTF-16 code
/// units. Characters outside the Basic Multilingual Plane count twice.
pub fn wire_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Hash of a robot name: sum of its UTF-16 code units times 1000, modulo 2^16.
pub fn name_hash(name: &str) -> u16 {
    let sum: u64 = name.encode_utf16().map(u64::from).sum();
    ((sum * 1000) % 65536) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub server: u16,
    pub client: u16,
}

impl KeyPair {
    pub const fn new(server: u16, client: u16) -> Self {
        Self { server, client }
    }

    /// Code the server sends for a name hash.
    pub fn server_confirmation(&self, hash: u16) -> u16 {
        hash.wrapping_add(self.server)
    }

    /// Code the robot answers with for a name hash.
    pub fn client_confirmation(&self, hash: u16) -> u16 {
        hash.wrapping_add(self.client)
    }

    /// Recovers the hash the robot used from its confirmation code.
    pub fn decode_client_confirmation(&self, confirmation: i32) -> i64 {
        (i64::from(confirmation) - i64::from(self.client) + 65536) % 65536
    }

    /// Recovers the hash from the server's code, as the robot does.
    pub fn decode_server_confirmation(&self, confirmation: u16) -> u16 {
        confirmation.wrapping_sub(self.server)
    }
}

/// Read-only key pairs indexed by key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable {
    pairs: Vec<KeyPair>,
}

impl KeyTable {
    pub fn new(pairs: Vec<KeyPair>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, id: i32) -> Option<KeyPair> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.pairs.get(index))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new(vec![
            KeyPair::new(23019, 32037),
            KeyPair::new(32037, 29295),
            KeyPair::new(18789, 13603),
            KeyPair::new(16443, 29533),
            KeyPair::new(18189, 21952),
        ])
    }
}
