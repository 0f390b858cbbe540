//! Client match controller: the turn state machine.
//!
//! Transport-agnostic: the host loop feeds it `ServerMsg`s and pointer
//! gestures, drives `tick`, and drains queued `ClientMsg`s to the relay. The
//! controller owns the local simulation; whenever an authoritative snapshot
//! arrives, bodies are resynced from it wholesale and any local drift is
//! discarded.

use std::collections::VecDeque;

use tracing::debug;
use uuid::Uuid;

use crate::client::aim::{clamp_drag, drag_to_impulse};
use crate::room::MAX_PLAYERS;
use crate::sim::{goal_scorer, starting_pose, Body, Simulation, BODIES};
use crate::ws::protocol::{ClientMsg, Pose, RoomSnapshot, ServerMsg, Vec2};

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No room loaded yet
    Idle,
    /// Room loaded, not free to act (not our turn, or a shot is resolving
    /// elsewhere)
    Waiting,
    /// Our turn, pointer engaged on our own body
    Aiming,
    /// A move was applied locally; simulation running until settle
    Committed,
}

pub struct MatchController<S: Simulation> {
    sim: S,
    session_id: Uuid,
    phase: Phase,
    /// Local mirror of the room, replaced wholesale on every snapshot
    room: Option<RoomSnapshot>,
    /// Own slot in the player list, if a player at all
    player_index: Option<usize>,
    /// Set when the pending commit originated locally; that client is the
    /// authoritative one and publishes the settled snapshot
    acting: bool,
    /// Current clamped drag while aiming
    drag: Option<Vec2>,
    /// Last aim preview received from the opponent, for rendering
    peer_aim: Option<Vec2>,
    outbound: VecDeque<ClientMsg>,
}

impl<S: Simulation> MatchController<S> {
    pub fn new(sim: S, session_id: Uuid) -> Self {
        Self {
            sim,
            session_id,
            phase: Phase::Idle,
            room: None,
            player_index: None,
            acting: false,
            drag: None,
            peer_aim: None,
            outbound: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn room(&self) -> Option<&RoomSnapshot> {
        self.room.as_ref()
    }

    pub fn player_index(&self) -> Option<usize> {
        self.player_index
    }

    pub fn peer_aim(&self) -> Option<Vec2> {
        self.peer_aim
    }

    /// Messages queued for the relay, in order
    pub fn drain_outbound(&mut self) -> Vec<ClientMsg> {
        self.outbound.drain(..).collect()
    }

    /// Feed one message received from the relay
    pub fn handle_server_msg(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Welcome { session_id, .. } => {
                self.session_id = session_id;
            }
            ServerMsg::MatchSnapshot { room } => self.on_snapshot(room),
            ServerMsg::AimPreview { vec } => {
                self.peer_aim = Some(vec);
            }
            ServerMsg::MoveCommit { vec } => self.commit(vec, false),
        }
    }

    fn on_snapshot(&mut self, room: RoomSnapshot) {
        self.player_index = room.players.iter().position(|p| *p == self.session_id);

        if room.ball.is_none() {
            // Fresh room. The first player initializes it; everyone else
            // keeps the mirror and waits for the authoritative snapshot.
            if self.player_index == Some(0) {
                let init = initial_snapshot(&room);
                debug!("Initializing fresh room");
                self.load(init.clone());
                self.outbound.push_back(ClientMsg::MatchSnapshot { room: init });
            } else {
                self.room = Some(room);
            }
            return;
        }

        if room.moving {
            // Roster update mid-shot; remember it but keep simulating
            self.room = Some(room);
            return;
        }

        self.load(room);
    }

    /// Replace the mirror and resync every body from the snapshot
    fn load(&mut self, room: RoomSnapshot) {
        for (i, pose) in room.player_coords.iter().enumerate().take(2) {
            self.sim.place(Body::Player(i), *pose);
        }
        if let Some(ball) = room.ball {
            self.sim.place(Body::Ball, ball);
        }
        self.room = Some(room);
        self.phase = Phase::Waiting;
        self.acting = false;
        self.drag = None;
        self.peer_aim = None;
    }

    /// Whether this client may start a drag right now
    pub fn can_aim(&self) -> bool {
        let Some(room) = &self.room else {
            return false;
        };
        matches!(self.phase, Phase::Waiting | Phase::Aiming)
            && !room.moving
            && room.players.len() == 2
            && self.player_index == Some(room.turn)
    }

    /// Pointer engaged on the own body
    pub fn begin_aim(&mut self) {
        if self.can_aim() {
            self.phase = Phase::Aiming;
            self.drag = Some(Vec2::ZERO);
        }
    }

    /// Pointer moved while aiming; emits a preview for the other clients
    pub fn aim_to(&mut self, cursor: Vec2) {
        if self.phase != Phase::Aiming {
            return;
        }
        let Some(index) = self.player_index else {
            return;
        };
        let own = self.sim.pose(Body::Player(index));
        let drag = clamp_drag(Vec2::new(own.x - cursor.x, own.y - cursor.y));
        self.drag = Some(drag);
        self.outbound.push_back(ClientMsg::AimPreview { vec: drag });
    }

    /// Pointer released: commit the shot
    pub fn release(&mut self) {
        if self.phase != Phase::Aiming {
            return;
        }
        match self.drag.take() {
            Some(drag) if drag.magnitude() > 0.0 => {
                self.outbound.push_back(ClientMsg::MoveCommit { vec: drag });
                self.commit(drag, true);
            }
            _ => {
                // Aborted drag
                self.phase = Phase::Waiting;
            }
        }
    }

    /// Apply a committed move (local or relayed) to the turn-holder's body
    fn commit(&mut self, vec: Vec2, acting: bool) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.moving || room.players.len() != 2 {
            return;
        }
        let turn = room.turn;
        room.moving = true;
        self.sim.apply_impulse(Body::Player(turn), drag_to_impulse(vec));
        self.acting = acting;
        self.peer_aim = None;
        self.phase = Phase::Committed;
    }

    /// One host-loop tick. Steps the simulation while a shot resolves; the
    /// acting client additionally detects settlement and publishes. Everyone
    /// else waits for the authoritative snapshot instead of trusting their
    /// own replica.
    pub fn tick(&mut self) {
        if self.phase != Phase::Committed {
            return;
        }
        self.sim.step();
        if !self.acting {
            return;
        }

        let ball = self.sim.pose(Body::Ball);
        if let Some(scorer) = goal_scorer(ball.x) {
            if let Some(room) = self.room.as_mut() {
                room.score[scorer] += 1;
                // The conceding side shoots next, goal or not asleep
                room.turn = if scorer == 1 { 0 } else { 1 };
            }
            for body in BODIES {
                self.sim.place(body, starting_pose(body));
            }
            self.publish_settled();
        } else if self.all_asleep() {
            if let Some(room) = self.room.as_mut() {
                room.turn = (room.turn + 1) % 2;
            }
            self.publish_settled();
        }
    }

    fn all_asleep(&self) -> bool {
        BODIES.iter().all(|b| self.sim.is_asleep(*b))
    }

    /// Snapshot current poses, clear `moving`, hand authority back
    fn publish_settled(&mut self) {
        let player_coords: Vec<Pose> = (0..MAX_PLAYERS)
            .map(|i| self.sim.pose(Body::Player(i)))
            .collect();
        let ball = self.sim.pose(Body::Ball);

        if let Some(room) = self.room.as_mut() {
            room.player_coords = player_coords;
            room.ball = Some(ball);
            room.moving = false;
            self.outbound.push_back(ClientMsg::MatchSnapshot { room: room.clone() });
        }
        self.phase = Phase::Waiting;
        self.acting = false;
    }
}

/// Default snapshot the first player publishes into a fresh room
fn initial_snapshot(room: &RoomSnapshot) -> RoomSnapshot {
    RoomSnapshot {
        players: room.players.clone(),
        spectators: room.spectators.clone(),
        turn: 0,
        moving: false,
        player_coords: vec![starting_pose(Body::Player(0)), starting_pose(Body::Player(1))],
        ball: Some(starting_pose(Body::Ball)),
        score: [0, 0],
    }
}
