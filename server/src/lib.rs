//! # Robot Pilot Server Library
//!
//! This library implements a TCP server that remotely pilots simple robots to
//! the coordinate `[0, 0]`, where each robot picks up a secret message and
//! hands it over before logging out.
//!
//! ## Protocol Overview
//!
//! Messages are plain text closed by the two bytes `\x07\x08` in both
//! directions. The server speaks only from a fixed catalog of numbered
//! commands (`102 MOVE`, `103 TURN LEFT`, ...) plus one bare numeric code
//! during login. The robot answers every movement command with its position
//! as `OK <x> <y>`.
//!
//! A session runs through three phases:
//!
//! 1. **Login** - the robot sends its name and a key id, the server answers
//!    with a code derived from the name hash and the server key, and the
//!    robot proves it knows the matching client key.
//! 2. **Navigation** - the server infers the robot's heading from its first
//!    moves and steers it around obstacles using relative turns only.
//! 3. **Pick-up** - at the origin the server asks for the secret and logs the
//!    robot out.
//!
//! At any point the robot may announce `RECHARGING`; the server then waits
//! under a longer timeout for `FULL POWER` before resuming the exchange.
//!
//! ## Module Organization
//!
//! ### Framer Module (`framer`)
//! Reads and writes terminated messages, enforces per-field length limits and
//! the read timeouts, and hides the recharge interrupt from its callers.
//!
//! ### Auth Module (`auth`)
//! Challenge-response login against the read-only key table.
//!
//! ### Navigator Module (`navigator`)
//! Dead-reckoning state machine and the turn decision tables.
//!
//! ### Session Module (`session`)
//! Sequences login, navigation, pick-up and logout for one connection.
//!
//! ### Network Module (`network`)
//! TCP listener spawning one task per robot. Sessions share nothing but the
//! configuration.
//!
//! ## Error Handling
//!
//! Every failure is terminal for its connection. Each [`error::SessionError`]
//! variant knows which reply (`301 SYNTAX ERROR`, `302 LOGIC ERROR`, ...) it
//! owes the robot; timeouts close the connection silently.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{ServerConfig, Timeouts};
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1:1111", Timeouts::default());
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod framer;
pub mod navigator;
pub mod network;
pub mod session;
