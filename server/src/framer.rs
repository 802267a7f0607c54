//! Terminator-delimited message transport for one robot connection
//!
//! Every message in both directions ends with `\x07\x08`. Reads are bounded:
//! the framer never buffers more than the field being read may occupy, so a
//! robot that never sends the terminator is cut off early instead of being
//! allowed to stream arbitrary data.
//!
//! The robot may interrupt any exchange with `RECHARGING`. The framer then
//! waits for `FULL POWER` under the longer recharging timeout and resumes
//! reading the message that was originally requested, so callers never see
//! either interrupt text.

use crate::config::Timeouts;
use crate::error::SessionError;
use log::{debug, warn};
use shared::{
    wire_len, Position, ServerMessage, CONFIRMATION_MAX_LEN, FULL_POWER, KEY_ID_MAX_LEN,
    MIN_FRAME_LEN, NAME_MAX_LEN, RECHARGING, REPORT_MAX_LEN, SECRET_MAX_LEN, TERMINATOR,
};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::time;

/// Message-level view of a robot connection
pub struct Framer<S> {
    stream: BufStream<S>,
    timeouts: Timeouts,
    /// Limit for the next read, raised only during a recharge interrupt
    read_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Framer<S> {
    pub fn new(stream: S, timeouts: Timeouts) -> Self {
        Self {
            stream: BufStream::new(stream),
            timeouts,
            read_timeout: timeouts.normal(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Writes one message and flushes it to the robot.
    pub async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        debug!("Sending: {}", message);
        self.stream.write_all(&message.encode()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Sends the reply `err` owes, if any, and hands the error back for
    /// propagation. A failed delivery is logged; the original error wins.
    pub async fn reject(&mut self, err: SessionError) -> SessionError {
        if let Some(reply) = err.reply() {
            if let Err(send_err) = self.send(&reply).await {
                warn!("Could not deliver {}: {}", reply, send_err);
            }
        }
        err
    }

    /// Flushes pending output and shuts the connection down.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Receives the next message, handling recharge interrupts transparently.
    pub async fn receive(&mut self, max_content: usize) -> Result<String, SessionError> {
        let mut content = self.next_frame(max_content).await?;
        loop {
            if content == FULL_POWER {
                let err = SessionError::Logic("FULL POWER without RECHARGING");
                return Err(self.reject(err).await);
            }
            if content != RECHARGING {
                return Ok(content);
            }

            debug!(
                "Robot recharging, waiting up to {:?}",
                self.timeouts.recharging()
            );
            self.read_timeout = self.timeouts.recharging();
            let resumed = self.next_frame(max_content).await?;
            if resumed != FULL_POWER {
                let err = SessionError::Logic("message received while recharging");
                return Err(self.reject(err).await);
            }
            self.read_timeout = self.timeouts.normal();
            content = self.next_frame(max_content).await?;
        }
    }

    /// Reads one raw frame under the active timeout and strips the terminator.
    async fn next_frame(&mut self, max_content: usize) -> Result<String, SessionError> {
        let capacity = (max_content + TERMINATOR.len()).max(MIN_FRAME_LEN);
        let limit = self.read_timeout;

        let bytes = match time::timeout(limit, read_frame(&mut self.stream, capacity)).await {
            Ok(result) => result?,
            Err(_) => return Err(SessionError::Timeout(limit)),
        };

        if bytes.is_empty() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "robot hung up").into());
        }

        match bytes.strip_suffix(TERMINATOR) {
            Some(content) => {
                let text = String::from_utf8_lossy(content).into_owned();
                debug!("Received: {:?}", text);
                Ok(text)
            }
            None => {
                let partial = String::from_utf8_lossy(&bytes).into_owned();
                warn!("Bad message ending: {:?}", partial);
                Err(self.reject(SessionError::Framing(partial)).await)
            }
        }
    }

    /// Robot name, at most 18 characters.
    pub async fn read_name(&mut self) -> Result<String, SessionError> {
        let name = self.receive(NAME_MAX_LEN).await?;
        if wire_len(&name) > NAME_MAX_LEN {
            return Err(self.reject(SessionError::syntax("name", name)).await);
        }
        Ok(name)
    }

    pub async fn read_key_id(&mut self) -> Result<i32, SessionError> {
        self.read_number("key id", KEY_ID_MAX_LEN).await
    }

    pub async fn read_confirmation(&mut self) -> Result<i32, SessionError> {
        self.read_number("confirmation", CONFIRMATION_MAX_LEN).await
    }

    async fn read_number(
        &mut self,
        field: &'static str,
        max_len: usize,
    ) -> Result<i32, SessionError> {
        let text = self.receive(max_len).await?;
        if wire_len(&text) > max_len {
            return Err(self.reject(SessionError::syntax(field, text)).await);
        }
        match text.parse::<i32>() {
            Ok(number) => Ok(number),
            Err(_) => Err(self.reject(SessionError::syntax(field, text)).await),
        }
    }

    /// Position report answering a movement or turn command.
    pub async fn read_position(&mut self) -> Result<Position, SessionError> {
        let text = self.receive(REPORT_MAX_LEN).await?;
        match Position::parse_report(&text) {
            Some(position) => Ok(position),
            None => Err(self.reject(SessionError::syntax("move report", text)).await),
        }
    }

    pub async fn read_secret(&mut self) -> Result<String, SessionError> {
        let secret = self.receive(SECRET_MAX_LEN).await?;
        if wire_len(&secret) > SECRET_MAX_LEN {
            return Err(self.reject(SessionError::syntax("secret", secret)).await);
        }
        Ok(secret)
    }

    /// Sends a command and reads the position report it produces.
    pub async fn command(&mut self, message: ServerMessage) -> Result<Position, SessionError> {
        self.send(&message).await?;
        self.read_position().await
    }
}

/// Reads bytes until the terminator, the capacity or the end of the stream,
/// whichever comes first. Capacity is counted in UTF-16 code units of the
/// decoded text, and a started character is always read to its end.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, capacity: usize) -> io::Result<Vec<u8>> {
    let mut frame = Vec::with_capacity(capacity);
    let mut units = 0;
    let mut pending: usize = 0;
    let mut byte = [0u8; 1];
    while (units < capacity || pending > 0) && !frame.ends_with(TERMINATOR) {
        if reader.read(&mut byte).await? == 0 {
            break;
        }
        let b = byte[0];
        frame.push(b);
        if b & 0xC0 == 0x80 {
            pending = pending.saturating_sub(1);
        } else {
            let width = utf8_width(b);
            units += if width == 4 { 2 } else { 1 };
            pending = width - 1;
        }
    }
    Ok(frame)
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
