//! Simulation seam and field layout.
//!
//! The match controller treats the rigid-body engine as an opaque
//! collaborator behind the `Simulation` trait: it only needs poses, impulse
//! application, sleep detection, and placement. The concrete engine lives in
//! `rapier`.

pub mod rapier;

pub use rapier::RapierSimulation;

use crate::ws::protocol::{Pose, Vec2};

/// Bodies tracked by a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Player(usize),
    Ball,
}

/// All bodies, in the order they appear in published snapshots
pub const BODIES: [Body; 3] = [Body::Player(0), Body::Player(1), Body::Ball];

/// Opaque rigid-body engine seam
pub trait Simulation {
    /// Advance the simulation by one fixed tick
    fn step(&mut self);

    /// Current pose of a body
    fn pose(&self, body: Body) -> Pose;

    /// Apply an instantaneous impulse to a body, waking it
    fn apply_impulse(&mut self, body: Body, impulse: Vec2);

    /// Whether the engine put the body to sleep
    fn is_asleep(&self, body: Body) -> bool;

    /// Teleport a body to a pose and zero its velocities
    fn place(&mut self, body: Body, pose: Pose);
}

// Field geometry, matching the client bundle
pub const FIELD_WIDTH: f32 = 1000.0;
pub const FIELD_HEIGHT: f32 = 500.0;
pub const BORDER_SIZE: f32 = 20.0;
pub const GOAL_WIDTH: f32 = 80.0;
pub const PLAYER_DIAMETER: f32 = 30.0;
pub const BALL_DIAMETER: f32 = 50.0;

/// Maximum drag magnitude; longer drags are clamped, not rejected
pub const MAX_DRAG: f32 = 100.0;
/// Impulse applied by a full-length drag
pub const FORCE_SCALE: f32 = 0.02;
/// A ball past this margin on either side has entered a goal
pub const GOAL_MARGIN: f32 = BORDER_SIZE;

/// Starting layout after room creation and after every goal
pub fn starting_pose(body: Body) -> Pose {
    match body {
        Body::Player(0) => Pose { x: 100.0, y: FIELD_HEIGHT / 2.0, rot: 0.0 },
        Body::Player(_) => Pose { x: FIELD_WIDTH - 100.0, y: FIELD_HEIGHT / 2.0, rot: 0.0 },
        Body::Ball => Pose { x: FIELD_WIDTH / 2.0, y: FIELD_HEIGHT / 2.0, rot: 0.0 },
    }
}

/// Index of the scoring player if the ball has crossed a goal line.
///
/// The left goal belongs to player 0, so a breach there scores for player 1,
/// and vice versa.
pub fn goal_scorer(ball_x: f32) -> Option<usize> {
    if ball_x < GOAL_MARGIN {
        Some(1)
    } else if ball_x > FIELD_WIDTH - GOAL_MARGIN {
        Some(0)
    } else {
        None
    }
}
