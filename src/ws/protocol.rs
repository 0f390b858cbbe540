//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A body pose on the field: position plus rotation in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

/// A 2D vector carried by aim and move events (drag offset or force
/// direction, magnitude-clamped by the sender)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scaled(&self, factor: f32) -> Vec2 {
        Vec2 {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Pose {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.rot.is_finite()
    }
}

/// Full room state as exchanged on the wire.
///
/// The relay replaces its stored copy of every field except `players` and
/// `spectators`, which are bookkeeping tied to live connections and only ever
/// mutated server-side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Join-ordered participant ids; the first two slots are the players
    pub players: Vec<Uuid>,
    /// Participants beyond the first two player slots
    pub spectators: Vec<Uuid>,
    /// Index of the player currently entitled to aim and move
    pub turn: usize,
    /// True from move commit until the authoritative client publishes settle
    pub moving: bool,
    /// One settled pose per player body
    pub player_coords: Vec<Pose>,
    /// Ball pose; `None` means the room was never initialized
    pub ball: Option<Pose>,
    /// Goals per player slot
    pub score: [u32; 2],
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Publish the authoritative post-shot (or initial) room state
    MatchSnapshot { room: RoomSnapshot },

    /// Ephemeral aim preview while dragging; never mutates stored state
    AimPreview { vec: Vec2 },

    /// Commit the shot: peers apply the vector as an impulse and start
    /// simulating locally
    MoveCommit { vec: Vec2 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection; tells the client its session token
    Welcome { session_id: Uuid, server_time: u64 },

    /// Authoritative room state (join, publish, or roster change)
    MatchSnapshot { room: RoomSnapshot },

    /// Relayed aim preview from the turn-holder
    AimPreview { vec: Vec2 },

    /// Relayed move commit from the turn-holder
    MoveCommit { vec: Vec2 },
}
