//! Dead-reckoning navigation of a robot to the origin
//!
//! The robot only ever reports its position; it never says which way it
//! faces. The navigator infers the heading from the first two moves, then
//! steers with relative turns only:
//!
//! - Two moves reveal the heading. A blocked first move is retried once per
//!   heading after a left turn.
//! - The robot is turned toward the origin, twice, since a robot on an axis
//!   facing away needs two corrections.
//! - The main loop moves until the origin is reached, turning around
//!   obstacles and onto the remaining axis once one coordinate is zero.

use crate::error::SessionError;
use crate::framer::Framer;
use log::{debug, info};
use shared::{Orientation, Position, ServerMessage, Turn};
use tokio::io::{AsyncRead, AsyncWrite};

use Orientation::{XMinus, XPlus, YMinus, YPlus};

/// Turns keyed by quadrant: the heading that gets a left turn, then the one
/// that gets a right turn. Quadrants are I (x>=0, y>=0), II (x<=0, y>=0),
/// III (x<=0, y<=0) and IV (x>=0, y<=0); a position on an axis is in two.
type TurnTable = [(Orientation, Orientation); 4];

/// Points the robot at the origin along the larger remaining leg.
const TOWARD_ORIGIN: TurnTable = [
    (YPlus, XPlus),
    (XMinus, YPlus),
    (YMinus, XMinus),
    (XPlus, YMinus),
];

/// Steps sideways past an obstacle onto the other axis direction.
const AROUND_OBSTACLE: TurnTable = [
    (XMinus, YMinus),
    (YMinus, XPlus),
    (XPlus, YPlus),
    (YPlus, XMinus),
];

/// Headings tried before a robot blocked at start-up is given up on.
const HEADINGS_TO_TRY: u32 = 4;

/// Last known position and inferred heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    pub fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Turn that faces the robot toward the origin, `None` if it already is.
    pub fn toward_origin(&self) -> Option<Turn> {
        self.lookup(&TOWARD_ORIGIN)
    }

    /// Turn that routes the robot around a blocked step.
    pub fn around_obstacle(&self) -> Option<Turn> {
        self.lookup(&AROUND_OBSTACLE)
    }

    /// On an axis, heading along it, so further moves cannot reach the origin.
    pub fn facing_along_axis(&self) -> bool {
        let horizontal = self.orientation.is_horizontal();
        (self.position.x == 0 && horizontal) || (self.position.y == 0 && !horizontal)
    }

    fn quadrants(&self) -> [bool; 4] {
        let Position { x, y } = self.position;
        [
            x >= 0 && y >= 0,
            x <= 0 && y >= 0,
            x <= 0 && y <= 0,
            x >= 0 && y <= 0,
        ]
    }

    fn lookup(&self, table: &TurnTable) -> Option<Turn> {
        let quadrants = self.quadrants();
        let hits = |pick: fn(&(Orientation, Orientation)) -> Orientation| {
            table
                .iter()
                .zip(quadrants)
                .any(|(entry, inside)| inside && pick(entry) == self.orientation)
        };

        if hits(|entry| entry.0) {
            Some(Turn::Left)
        } else if hits(|entry| entry.1) {
            Some(Turn::Right)
        } else {
            None
        }
    }
}

/// Steers one robot over its framer.
pub struct Navigator<'f, S> {
    framer: &'f mut Framer<S>,
    pose: Pose,
    moves: u32,
    obstacles: u32,
}

impl<'f, S: AsyncRead + AsyncWrite + Unpin> Navigator<'f, S> {
    /// Discovers position and heading, then faces the robot toward the
    /// origin. Returns `None` when the robot reached the origin on the way.
    pub async fn locate(framer: &'f mut Framer<S>) -> Result<Option<Self>, SessionError> {
        let mut first = framer.command(ServerMessage::Move).await?;
        if first.is_target() {
            return Ok(None);
        }
        let mut second = framer.command(ServerMessage::Move).await?;
        if second.is_target() {
            return Ok(None);
        }

        let mut moves = 2;
        let mut tried = 1;
        while first == second {
            if tried == HEADINGS_TO_TRY {
                return Err(SessionError::Navigation {
                    position: second,
                    reason: "blocked in every direction",
                });
            }
            tried += 1;
            info!("Blocked at {} before heading is known, turning left", second);

            first = framer.command(ServerMessage::TurnLeft).await?;
            if first.is_target() {
                return Ok(None);
            }
            second = framer.command(ServerMessage::Move).await?;
            if second.is_target() {
                return Ok(None);
            }
            moves += 1;
        }

        let Some(orientation) = Orientation::from_step(first, second) else {
            return Err(SessionError::Navigation {
                position: second,
                reason: "reported positions are not one step apart",
            });
        };
        debug!("Robot at {} facing {}", second, orientation);

        let mut navigator = Self {
            framer,
            pose: Pose::new(second, orientation),
            moves,
            obstacles: 0,
        };
        navigator.face_origin().await?;
        navigator.face_origin().await?;
        Ok(Some(navigator))
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Moves the robot until it reports the origin.
    pub async fn drive(mut self) -> Result<Position, SessionError> {
        while !self.pose.position.is_target() {
            let mut next = self.step().await?;

            if next == self.pose.position {
                self.obstacles += 1;
                info!(
                    "Obstacle ahead of {} facing {}",
                    self.pose.position, self.pose.orientation
                );
                let from_axis = self.pose.position.on_axis();

                self.avoid_obstacle().await?;
                next = self.step().await?;
                self.pose.position = next;
                // Leaving an axis changes which heading points at the origin.
                if from_axis && !next.is_target() {
                    self.face_origin().await?;
                }
            }

            self.pose.position = next;
            debug!(
                "Robot at {} facing {}",
                self.pose.position, self.pose.orientation
            );

            if !next.is_target() && self.pose.facing_along_axis() {
                let Some(turn) = self.pose.around_obstacle() else {
                    return Err(SessionError::Navigation {
                        position: next,
                        reason: "no turn leaves the axis",
                    });
                };
                self.turn(turn).await?;
            }
        }

        info!(
            "Target reached after {} moves and {} obstacles",
            self.moves, self.obstacles
        );
        Ok(self.pose.position)
    }

    async fn step(&mut self) -> Result<Position, SessionError> {
        self.moves += 1;
        self.framer.command(ServerMessage::Move).await
    }

    async fn face_origin(&mut self) -> Result<(), SessionError> {
        if let Some(turn) = self.pose.toward_origin() {
            self.turn(turn).await?;
            debug!("Robot oriented to {}", self.pose.orientation);
        }
        Ok(())
    }

    async fn avoid_obstacle(&mut self) -> Result<(), SessionError> {
        match self.pose.around_obstacle() {
            Some(turn) => {
                self.turn(turn).await?;
                debug!("Robot reoriented to {}", self.pose.orientation);
            }
            None => debug!("No turn around obstacle, retrying the move"),
        }
        Ok(())
    }

    /// Turning never moves the robot, so the reported position is dropped.
    async fn turn(&mut self, turn: Turn) -> Result<(), SessionError> {
        self.framer.command(turn.command()).await?;
        self.pose.orientation = self.pose.orientation.apply(turn);
        Ok(())
    }
}

/// Pilots the robot from wherever it stands to the origin.
pub async fn navigate<S>(framer: &mut Framer<S>) -> Result<Position, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match Navigator::locate(framer).await? {
        Some(navigator) => navigator.drive().await,
        None => {
            info!("Target reached while locating the robot");
            Ok(Position::new(0, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use shared::{frame, FULL_POWER, RECHARGING};
    use std::time::Duration;
    use tokio_test::io::{Builder, Mock};

    fn framer(mock: Mock) -> Framer<Mock> {
        let timeouts =
            Timeouts::new(Duration::from_millis(200), Duration::from_millis(800)).unwrap();
        Framer::new(mock, timeouts)
    }

    /// Scripts a robot answering each command with a position report.
    fn robot(exchanges: &[(ServerMessage, (i32, i32))]) -> Mock {
        let mut builder = Builder::new();
        for (command, (x, y)) in exchanges {
            builder.write(&command.encode());
            builder.read(&frame(&Position::new(*x, *y).report()));
        }
        builder.build()
    }

    use ServerMessage::{Move, TurnLeft, TurnRight};

    fn pose(x: i32, y: i32, orientation: Orientation) -> Pose {
        Pose::new(Position::new(x, y), orientation)
    }

    #[test]
    fn test_toward_origin_table() {
        // Facing away on one leg turns onto the other leg.
        assert_eq!(pose(3, 5, YPlus).toward_origin(), Some(Turn::Left));
        assert_eq!(pose(3, 5, XPlus).toward_origin(), Some(Turn::Right));
        assert_eq!(pose(-3, 5, XMinus).toward_origin(), Some(Turn::Left));
        assert_eq!(pose(-3, 5, YPlus).toward_origin(), Some(Turn::Right));
        assert_eq!(pose(-3, -5, YMinus).toward_origin(), Some(Turn::Left));
        assert_eq!(pose(-3, -5, XMinus).toward_origin(), Some(Turn::Right));
        assert_eq!(pose(3, -5, XPlus).toward_origin(), Some(Turn::Left));
        assert_eq!(pose(3, -5, YMinus).toward_origin(), Some(Turn::Right));

        // Already heading toward the origin.
        assert_eq!(pose(3, 5, XMinus).toward_origin(), None);
        assert_eq!(pose(3, 5, YMinus).toward_origin(), None);
        assert_eq!(pose(-3, -5, XPlus).toward_origin(), None);
        assert_eq!(pose(-3, -5, YPlus).toward_origin(), None);
    }

    #[test]
    fn test_toward_origin_twice_from_axis() {
        // On the y axis facing away: one correction is not enough.
        let mut current = pose(0, 5, YPlus);
        for _ in 0..2 {
            if let Some(turn) = current.toward_origin() {
                current.orientation = current.orientation.apply(turn);
            }
        }
        assert_eq!(current.orientation, YMinus);

        let mut current = pose(-4, 0, XMinus);
        for _ in 0..2 {
            if let Some(turn) = current.toward_origin() {
                current.orientation = current.orientation.apply(turn);
            }
        }
        assert_eq!(current.orientation, XPlus);
    }

    #[test]
    fn test_around_obstacle_table() {
        assert_eq!(pose(3, 5, XMinus).around_obstacle(), Some(Turn::Left));
        assert_eq!(pose(3, 5, YMinus).around_obstacle(), Some(Turn::Right));
        assert_eq!(pose(-3, 5, YMinus).around_obstacle(), Some(Turn::Left));
        assert_eq!(pose(-3, 5, XPlus).around_obstacle(), Some(Turn::Right));
        assert_eq!(pose(-3, -5, XPlus).around_obstacle(), Some(Turn::Left));
        assert_eq!(pose(-3, -5, YPlus).around_obstacle(), Some(Turn::Right));
        assert_eq!(pose(3, -5, YPlus).around_obstacle(), Some(Turn::Left));
        assert_eq!(pose(3, -5, XMinus).around_obstacle(), Some(Turn::Right));

        // Facing away from the origin has no obstacle turn.
        assert_eq!(pose(3, 5, XPlus).around_obstacle(), None);
    }

    #[test]
    fn test_axis_realignment_always_has_a_turn() {
        for coordinate in [-7, -1, 1, 7] {
            for orientation in Orientation::ALL {
                for current in [pose(0, coordinate, orientation), pose(coordinate, 0, orientation)] {
                    if current.facing_along_axis() {
                        assert!(current.around_obstacle().is_some(), "{:?}", current);
                    }
                }
            }
        }
    }

    #[test]
    fn test_facing_along_axis() {
        assert!(pose(0, 4, XMinus).facing_along_axis());
        assert!(pose(4, 0, YPlus).facing_along_axis());
        assert!(!pose(0, 4, YMinus).facing_along_axis());
        assert!(!pose(4, 0, XMinus).facing_along_axis());
        assert!(!pose(2, 4, XMinus).facing_along_axis());
    }

    #[tokio::test]
    async fn test_target_reached_during_locate() {
        let mock = robot(&[(Move, (0, 0))]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));

        let mock = robot(&[(Move, (0, 1)), (Move, (0, 0))]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }

    #[tokio::test]
    async fn test_locate_after_blocked_start_uses_second_pair() {
        let mock = robot(&[
            (Move, (3, 3)),
            (Move, (3, 3)),
            (TurnLeft, (3, 3)),
            (Move, (2, 3)),
        ]);
        let mut conn = framer(mock);

        let navigator = Navigator::locate(&mut conn).await.unwrap().unwrap();
        assert_eq!(navigator.pose(), pose(2, 3, XMinus));
    }

    #[tokio::test]
    async fn test_locate_turns_twice_on_axis_facing_away() {
        let mock = robot(&[
            (Move, (0, 4)),
            (Move, (0, 5)),
            (TurnLeft, (0, 5)),
            (TurnLeft, (0, 5)),
        ]);
        let mut conn = framer(mock);

        let navigator = Navigator::locate(&mut conn).await.unwrap().unwrap();
        assert_eq!(navigator.pose(), pose(0, 5, YMinus));
    }

    #[tokio::test]
    async fn test_locate_gives_up_when_boxed_in() {
        let mock = robot(&[
            (Move, (1, 1)),
            (Move, (1, 1)),
            (TurnLeft, (1, 1)),
            (Move, (1, 1)),
            (TurnLeft, (1, 1)),
            (Move, (1, 1)),
            (TurnLeft, (1, 1)),
            (Move, (1, 1)),
        ]);
        let mut conn = framer(mock);

        let err = navigate(&mut conn).await.unwrap_err();
        assert!(matches!(err, SessionError::Navigation { .. }));
    }

    #[tokio::test]
    async fn test_locate_rejects_jump() {
        let mock = robot(&[(Move, (1, 1)), (Move, (2, 2))]);
        let mut conn = framer(mock);

        let err = navigate(&mut conn).await.unwrap_err();
        assert!(matches!(err, SessionError::Navigation { position, .. } if position == Position::new(2, 2)));
    }

    #[tokio::test]
    async fn test_straight_run_to_target() {
        let mock = robot(&[(Move, (2, 0)), (Move, (1, 0)), (Move, (0, 0))]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }

    #[tokio::test]
    async fn test_turn_onto_remaining_axis() {
        let mock = robot(&[
            (Move, (2, 3)),
            (Move, (1, 3)),
            (Move, (0, 3)),
            (TurnLeft, (0, 3)),
            (Move, (0, 2)),
            (Move, (0, 1)),
            (Move, (0, 0)),
        ]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }

    #[tokio::test]
    async fn test_obstacle_off_axis_takes_one_turn() {
        let mock = robot(&[
            (Move, (-2, -1)),
            (Move, (-1, -1)),
            (Move, (-1, -1)),
            (TurnLeft, (-1, -1)),
            (Move, (-1, 0)),
            (TurnRight, (-1, 0)),
            (Move, (0, 0)),
        ]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }

    #[tokio::test]
    async fn test_obstacle_on_axis_adds_origin_correction() {
        let mock = robot(&[
            (Move, (0, 3)),
            (Move, (0, 2)),
            (Move, (0, 2)),
            (TurnLeft, (0, 2)),
            (Move, (1, 2)),
            (TurnRight, (1, 2)),
            (Move, (1, 1)),
            (Move, (1, 0)),
            (TurnRight, (1, 0)),
            (Move, (0, 0)),
        ]);
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }

    #[tokio::test]
    async fn test_recharging_mid_move_resumes_without_resend() {
        let mock = Builder::new()
            .write(&Move.encode())
            .read(&frame("OK 0 1"))
            .write(&Move.encode())
            .read(&frame(RECHARGING))
            .read(&frame(FULL_POWER))
            .read(&frame("OK 0 0"))
            .build();
        let mut conn = framer(mock);
        assert_eq!(navigate(&mut conn).await.unwrap(), Position::new(0, 0));
    }
}
