//! Authoritative room state and the pure turn/acceptance rules.
//!
//! Everything here is synchronous and side-effect free; the per-room task in
//! `relay` owns one `RoomState` and is the only component allowed to mutate
//! it. Mutation from the wire happens via whole-snapshot replacement only.

use uuid::Uuid;

use crate::ws::protocol::{Pose, RoomSnapshot};

/// Number of player slots; later joiners become spectators
pub const MAX_PLAYERS: usize = 2;

/// Role assigned to a participant at join time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Spectator,
}

/// Server-side copy of a room
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    pub players: Vec<Uuid>,
    pub spectators: Vec<Uuid>,
    pub turn: usize,
    pub moving: bool,
    pub player_coords: Vec<Pose>,
    pub ball: Option<Pose>,
    pub score: [u32; 2],
}

impl RoomState {
    /// Fresh room: no participants, turn 0, ball never initialized
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire representation of the current state
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self.players.clone(),
            spectators: self.spectators.clone(),
            turn: self.turn,
            moving: self.moving,
            player_coords: self.player_coords.clone(),
            ball: self.ball,
            score: self.score,
        }
    }

    /// Add a participant: player slots fill in join order, capped at two
    pub fn add_participant(&mut self, session_id: Uuid) -> Role {
        if self.players.len() < MAX_PLAYERS {
            self.players.push(session_id);
            Role::Player
        } else {
            self.spectators.push(session_id);
            Role::Spectator
        }
    }

    /// Remove a participant from whichever list holds it
    pub fn remove_participant(&mut self, session_id: Uuid) -> Option<Role> {
        if let Some(idx) = self.players.iter().position(|p| *p == session_id) {
            self.players.remove(idx);
            // Keep `turn` pointing at a filled slot for the next joiner
            if self.turn >= self.players.len() {
                self.turn = 0;
            }
            return Some(Role::Player);
        }
        if let Some(idx) = self.spectators.iter().position(|p| *p == session_id) {
            self.spectators.remove(idx);
            return Some(Role::Spectator);
        }
        None
    }

    /// The participant currently entitled to aim and move
    pub fn turn_holder(&self) -> Option<Uuid> {
        self.players.get(self.turn).copied()
    }

    pub fn is_turn_holder(&self, session_id: Uuid) -> bool {
        self.turn_holder() == Some(session_id)
    }

    /// Whether an aim or move from `session_id` is currently acceptable:
    /// both slots filled, nothing in motion, sender holds the turn
    pub fn can_act(&self, session_id: Uuid) -> bool {
        self.players.len() == MAX_PLAYERS && !self.moving && self.is_turn_holder(session_id)
    }

    /// True until the first initialization snapshot has been accepted
    pub fn uninitialized(&self) -> bool {
        self.ball.is_none()
    }

    /// Whether a published snapshot from `sender` replaces the stored state.
    ///
    /// Accepted only for the moving -> settled transition: the sender holds
    /// the turn and declares `moving == false` while this state was either
    /// mid-shot or never initialized. Everything else is silently dropped.
    pub fn accepts_snapshot(&self, sender: Uuid, incoming: &RoomSnapshot) -> bool {
        if !Self::well_formed(incoming) {
            return false;
        }
        if !self.is_turn_holder(sender) {
            return false;
        }
        !incoming.moving && (self.moving || self.uninitialized())
    }

    /// Structural validation; the original relay had none, hardened here
    fn well_formed(incoming: &RoomSnapshot) -> bool {
        if incoming.turn >= MAX_PLAYERS {
            return false;
        }
        if incoming.player_coords.len() != MAX_PLAYERS {
            return false;
        }
        if !incoming.player_coords.iter().all(Pose::is_finite) {
            return false;
        }
        match incoming.ball {
            Some(pose) => pose.is_finite(),
            // A published snapshot must carry an initialized ball
            None => false,
        }
    }

    /// Replace the stored state from an accepted snapshot.
    ///
    /// Participant lists are bookkeeping tied to live connections and are
    /// never taken from the wire. `turn` is recomputed by the relay so a
    /// publisher cannot keep the shot for itself:
    /// - the first initialization snapshot keeps turn 0,
    /// - a goal hands the turn to the side that was scored against,
    /// - a plain settle alternates.
    pub fn apply_snapshot(&mut self, incoming: &RoomSnapshot) {
        self.turn = self.next_turn(incoming);
        self.moving = incoming.moving;
        self.player_coords = incoming.player_coords.clone();
        self.ball = incoming.ball;
        self.score = incoming.score;
    }

    fn next_turn(&self, incoming: &RoomSnapshot) -> usize {
        if self.uninitialized() && !self.moving {
            // First initialization snapshot, player 0 keeps the shot
            return 0;
        }
        if incoming.score[1] > self.score[1] {
            // Left goal breached, the conceding side shoots next
            return 0;
        }
        if incoming.score[0] > self.score[0] {
            return 1;
        }
        (self.turn + 1) % MAX_PLAYERS
    }
}
