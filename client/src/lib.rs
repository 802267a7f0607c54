//! # Simulated Robot Library
//!
//! This library provides a robot that can be piloted by the server. It is used
//! for manual experiments from the command line and as the counterpart in the
//! end-to-end tests.
//!
//! ## Module Organization
//!
//! ### Robot Module (`robot`)
//! The simulated world: a position, a heading and a set of obstacles. Moving
//! into an obstacle leaves the robot where it was, which is exactly what the
//! server has to detect from the reported coordinates.
//!
//! ### Network Module (`network`)
//! Speaks the robot side of the protocol over any async stream:
//! - Login with a name and key id, verifying the server's code before
//!   answering with its own
//! - Answering `MOVE`, `TURN LEFT`, `TURN RIGHT` and `GET MESSAGE`
//! - Optional `RECHARGING` / `FULL POWER` pauses on a fixed schedule
//!
//! A run ends at `LOGOUT` or at the first error code from the server.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Robot, RobotConfig};
//! use client::robot::World;
//! use shared::{Orientation, Position};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let world = World::new(Position::new(3, -2), Orientation::YPlus)
//!         .with_obstacles([Position::new(3, 0)]);
//!     let robot = Robot::connect("127.0.0.1:1111", world, RobotConfig::new("Mnau", 0)).await?;
//!
//!     let trip = robot.run().await?;
//!     println!("{} moves, {} turns", trip.moves(), trip.turns());
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod robot;
