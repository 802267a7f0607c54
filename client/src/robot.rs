//! The simulated world the robot drives around in.

use rand::Rng;
use shared::{Orientation, Position, ServerMessage, Turn};
use std::collections::HashSet;

/// Minimum Chebyshev distance between random obstacles.
const OBSTACLE_SPACING: i32 = 3;

#[derive(Debug, Clone)]
pub struct World {
    position: Position,
    heading: Orientation,
    obstacles: HashSet<Position>,
    secret: String,
}

impl World {
    pub fn new(position: Position, heading: Orientation) -> Self {
        Self {
            position,
            heading,
            obstacles: HashSet::new(),
            secret: "Tajna zprava.".to_string(),
        }
    }

    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = Position>) -> Self {
        self.obstacles.extend(
            obstacles
                .into_iter()
                .filter(|cell| !cell.is_target() && *cell != self.position),
        );
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Random start within `range` of the origin plus up to `obstacles`
    /// well separated obstacles. Never starts on the origin.
    pub fn random<R: Rng>(rng: &mut R, range: i32, obstacles: usize) -> Self {
        let range = range.max(1);
        let position = loop {
            let candidate = random_cell(rng, range);
            if !candidate.is_target() {
                break candidate;
            }
        };
        let heading = Orientation::ALL[rng.gen_range(0..Orientation::ALL.len())];

        let mut world = World::new(position, heading);
        let mut attempts = 0;
        while world.obstacles.len() < obstacles && attempts < obstacles * 50 {
            attempts += 1;
            let cell = random_cell(rng, range);
            if cell.is_target() || cell == position {
                continue;
            }
            let crowded = world.obstacles.iter().any(|other| {
                (other.x - cell.x).abs() < OBSTACLE_SPACING
                    && (other.y - cell.y).abs() < OBSTACLE_SPACING
            });
            if !crowded {
                world.obstacles.insert(cell);
            }
        }
        world
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn heading(&self) -> Orientation {
        self.heading
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Position> {
        self.obstacles.iter()
    }

    /// Moves one cell forward unless an obstacle is in the way.
    pub fn step(&mut self) -> Position {
        let (dx, dy) = self.heading.delta();
        let next = Position::new(self.position.x + dx, self.position.y + dy);
        if !self.obstacles.contains(&next) {
            self.position = next;
        }
        self.position
    }

    pub fn turn(&mut self, turn: Turn) -> Position {
        self.heading = self.heading.apply(turn);
        self.position
    }

    /// Position answer as the robot puts it on the wire.
    pub fn report(&self) -> String {
        self.position.report()
    }

    /// Carries out a server command and returns the frame content to
    /// answer with, `None` for anything that takes no answer.
    pub fn respond(&mut self, command: ServerMessage) -> Option<String> {
        match command {
            ServerMessage::Move => {
                self.step();
                Some(self.report())
            }
            ServerMessage::TurnLeft | ServerMessage::TurnRight => {
                let turn = if command == ServerMessage::TurnLeft {
                    Turn::Left
                } else {
                    Turn::Right
                };
                self.turn(turn);
                Some(self.report())
            }
            ServerMessage::GetMessage => Some(self.secret.clone()),
            _ => None,
        }
    }
}

fn random_cell<R: Rng>(rng: &mut R, range: i32) -> Position {
    Position::new(rng.gen_range(-range..=range), rng.gen_range(-range..=range))
}
