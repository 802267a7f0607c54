//! Failure kinds of a robot session and the wire reply each one owes.

use shared::{Position, ServerMessage};
use std::time::Duration;
use thiserror::Error;

/// Every way a session can end early. All of them are terminal for the
/// connection; the variant decides what, if anything, is sent before closing.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Terminator missing or buffer exhausted before it arrived.
    #[error("malformed frame: {0:?}")]
    Framing(String),

    /// Field too long, not numeric, or a malformed move report.
    #[error("invalid {field}: {content:?}")]
    Syntax {
        field: &'static str,
        content: String,
    },

    #[error("key id {0} is not registered")]
    KeyOutOfRange(i32),

    #[error("confirmation for {name:?} does not match")]
    LoginFailed { name: String },

    /// Recharge interrupt misuse.
    #[error("logic error: {0}")]
    Logic(&'static str),

    #[error("no message within {0:?}")]
    Timeout(Duration),

    /// The robot cannot be steered any further from what it reported.
    #[error("navigation stuck at {position}: {reason}")]
    Navigation {
        position: Position,
        reason: &'static str,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn syntax(field: &'static str, content: impl Into<String>) -> Self {
        SessionError::Syntax {
            field,
            content: content.into(),
        }
    }

    /// Response owed to the robot before the connection is closed.
    pub fn reply(&self) -> Option<ServerMessage> {
        match self {
            SessionError::Framing(_) | SessionError::Syntax { .. } => {
                Some(ServerMessage::SyntaxError)
            }
            SessionError::KeyOutOfRange(_) => Some(ServerMessage::KeyOutOfRange),
            SessionError::LoginFailed { .. } => Some(ServerMessage::LoginFailed),
            SessionError::Logic(_) => Some(ServerMessage::LogicError),
            SessionError::Timeout(_) | SessionError::Navigation { .. } | SessionError::Io(_) => {
                None
            }
        }
    }
}

/// Rejected server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("recharging timeout {recharging:?} must exceed the normal timeout {normal:?}")]
    RechargeNotLonger {
        normal: Duration,
        recharging: Duration,
    },

    #[error("timeouts must be non-zero")]
    ZeroTimeout,
}
