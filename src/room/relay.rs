//! Per-room relay task.
//!
//! Each room is owned by exactly one task that processes inbound events
//! strictly in receipt order, so every authority check and the mutation it
//! guards happen inside a single handler step. The task never simulates
//! physics; it gates who may act and fans events out to the roster.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::room::registry::RoomRegistry;
use crate::room::state::{Role, RoomState};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Inbound events for a room task
#[derive(Debug)]
pub enum RoomEvent {
    /// A connection joined the room; `tx` is its outbound message queue
    Join {
        session_id: Uuid,
        tx: mpsc::Sender<ServerMsg>,
    },
    /// A connection disconnected
    Leave { session_id: Uuid },
    /// A protocol event from a connected participant
    Message { session_id: Uuid, msg: ClientMsg },
}

/// A live connection registered with the room
struct Participant {
    session_id: Uuid,
    tx: mpsc::Sender<ServerMsg>,
}

/// Owns one room's state and participant roster
pub struct RoomTask {
    code: String,
    state: RoomState,
    roster: Vec<Participant>,
    registry: Arc<RoomRegistry>,
    participant_count: Arc<AtomicUsize>,
}

impl RoomTask {
    pub fn new(
        code: String,
        registry: Arc<RoomRegistry>,
        participant_count: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            code,
            state: RoomState::new(),
            roster: Vec::new(),
            registry,
            participant_count,
        }
    }

    /// Process events until the last player leaves, then drop out of the
    /// registry. Dropping the roster closes every participant's queue.
    pub async fn run(mut self, mut events: mpsc::Receiver<RoomEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self.registry.remove(&self.code);
        info!(room = %self.code, "Room destroyed");
    }

    /// Handle one event; returns false once the room should be destroyed
    pub fn handle_event(&mut self, event: RoomEvent) -> bool {
        match event {
            RoomEvent::Join { session_id, tx } => {
                self.handle_join(session_id, tx);
                true
            }
            RoomEvent::Leave { session_id } => self.handle_leave(session_id),
            RoomEvent::Message { session_id, msg } => {
                self.handle_message(session_id, msg);
                true
            }
        }
    }

    /// Read-only view for tests and diagnostics
    pub fn state(&self) -> &RoomState {
        &self.state
    }

    fn handle_join(&mut self, session_id: Uuid, tx: mpsc::Sender<ServerMsg>) {
        let role = self.state.add_participant(session_id);
        self.roster.push(Participant { session_id, tx });
        self.participant_count
            .store(self.roster.len(), Ordering::Relaxed);

        info!(room = %self.code, session = %session_id, ?role, "Participant joined");

        // The joiner always gets the current state; a player join can shift
        // roles and turn downstream, so everyone else gets it too
        let snapshot = ServerMsg::MatchSnapshot {
            room: self.state.snapshot(),
        };
        self.send_to(session_id, snapshot.clone());
        if role == Role::Player {
            self.broadcast_except(session_id, snapshot);
        }
    }

    fn handle_leave(&mut self, session_id: Uuid) -> bool {
        let Some(role) = self.state.remove_participant(session_id) else {
            return true;
        };
        self.roster.retain(|p| p.session_id != session_id);
        self.participant_count
            .store(self.roster.len(), Ordering::Relaxed);

        info!(room = %self.code, session = %session_id, ?role, "Participant left");

        if self.state.players.is_empty() || self.roster.is_empty() {
            return false;
        }

        // Remaining clients detect the missing opponent from the roster
        self.broadcast_all(ServerMsg::MatchSnapshot {
            room: self.state.snapshot(),
        });
        true
    }

    fn handle_message(&mut self, sender: Uuid, msg: ClientMsg) {
        match msg {
            ClientMsg::MatchSnapshot { room } => {
                if self.state.accepts_snapshot(sender, &room) {
                    self.state.apply_snapshot(&room);
                    debug!(
                        room = %self.code,
                        turn = self.state.turn,
                        score = ?self.state.score,
                        "Snapshot accepted"
                    );
                    self.broadcast_all(ServerMsg::MatchSnapshot {
                        room: self.state.snapshot(),
                    });
                } else {
                    // Fire-and-forget: the sender gets no error back
                    debug!(room = %self.code, session = %sender, "Snapshot dropped");
                }
            }
            ClientMsg::AimPreview { vec } => {
                if self.state.can_act(sender) && vec.is_finite() {
                    self.broadcast_except(sender, ServerMsg::AimPreview { vec });
                }
            }
            ClientMsg::MoveCommit { vec } => {
                if self.state.can_act(sender) && vec.is_finite() {
                    // Mutual exclusion until the turn-holder publishes settle
                    self.state.moving = true;
                    self.broadcast_except(sender, ServerMsg::MoveCommit { vec });
                }
            }
        }
    }

    fn send_to(&self, session_id: Uuid, msg: ServerMsg) {
        if let Some(participant) = self.roster.iter().find(|p| p.session_id == session_id) {
            Self::push(&self.code, participant, msg);
        }
    }

    fn broadcast_all(&self, msg: ServerMsg) {
        for participant in &self.roster {
            Self::push(&self.code, participant, msg.clone());
        }
    }

    fn broadcast_except(&self, sender: Uuid, msg: ServerMsg) {
        for participant in self.roster.iter().filter(|p| p.session_id != sender) {
            Self::push(&self.code, participant, msg.clone());
        }
    }

    /// Non-blocking push; a participant with a full queue misses the message
    /// rather than stalling the room
    fn push(code: &str, participant: &Participant, msg: ServerMsg) {
        if let Err(e) = participant.tx.try_send(msg) {
            warn!(
                room = %code,
                session = %participant.session_id,
                error = %e,
                "Dropping message for slow participant"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{Pose, RoomSnapshot, Vec2};

    fn task() -> RoomTask {
        RoomTask::new(
            "ABCDE".to_string(),
            Arc::new(RoomRegistry::new()),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn join(task: &mut RoomTask) -> (Uuid, mpsc::Receiver<ServerMsg>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(16);
        assert!(task.handle_event(RoomEvent::Join { session_id, tx }));
        (session_id, rx)
    }

    fn settled(task: &RoomTask) -> RoomSnapshot {
        RoomSnapshot {
            moving: false,
            player_coords: vec![
                Pose { x: 100.0, y: 250.0, rot: 0.0 },
                Pose { x: 900.0, y: 250.0, rot: 0.0 },
            ],
            ball: Some(Pose { x: 500.0, y: 250.0, rot: 0.0 }),
            ..task.state().snapshot()
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    fn expect_snapshot(msg: &ServerMsg) -> &RoomSnapshot {
        match msg {
            ServerMsg::MatchSnapshot { room } => room,
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_join_receives_uninitialized_snapshot() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);

        let msgs = drain(&mut rx_a);
        assert_eq!(msgs.len(), 1);
        let room = expect_snapshot(&msgs[0]);
        assert_eq!(room.players, vec![a]);
        assert_eq!(room.ball, None);
        assert_eq!(room.turn, 0);
    }

    #[tokio::test]
    async fn initial_publish_is_stored_without_turn_advance() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);
        drain(&mut rx_a);

        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::MatchSnapshot {
                room: settled(&task),
            },
        });

        assert_eq!(task.state().turn, 0);
        assert!(task.state().ball.is_some());
        let msgs = drain(&mut rx_a);
        assert_eq!(msgs.len(), 1);
        assert_eq!(expect_snapshot(&msgs[0]).turn, 0);
    }

    #[tokio::test]
    async fn move_commit_is_forwarded_to_everyone_else() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);
        let (_b, mut rx_b) = join(&mut task);
        let (_c, mut rx_c) = join(&mut task);

        // Initialize via player 0
        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::MatchSnapshot {
                room: settled(&task),
            },
        });
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::MoveCommit {
                vec: Vec2::new(50.0, 0.0),
            },
        });

        assert!(task.state().moving);
        assert!(drain(&mut rx_a).is_empty());
        assert!(matches!(
            drain(&mut rx_b).as_slice(),
            [ServerMsg::MoveCommit { vec }] if *vec == Vec2::new(50.0, 0.0)
        ));
        assert!(matches!(
            drain(&mut rx_c).as_slice(),
            [ServerMsg::MoveCommit { .. }]
        ));

        // Mutual exclusion: nothing further is forwarded while moving
        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::AimPreview {
                vec: Vec2::new(1.0, 1.0),
            },
        });
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn aim_from_non_turn_holder_is_dropped() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);
        let (b, mut rx_b) = join(&mut task);
        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::MatchSnapshot {
                room: settled(&task),
            },
        });
        drain(&mut rx_a);
        drain(&mut rx_b);

        task.handle_event(RoomEvent::Message {
            session_id: b,
            msg: ClientMsg::AimPreview {
                vec: Vec2::new(3.0, 4.0),
            },
        });
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn unauthorized_publish_is_dropped_silently() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);
        let (b, mut rx_b) = join(&mut task);
        task.handle_event(RoomEvent::Message {
            session_id: a,
            msg: ClientMsg::MatchSnapshot {
                room: settled(&task),
            },
        });
        drain(&mut rx_a);
        drain(&mut rx_b);

        let stored_before = task.state().snapshot();
        let mut forged = settled(&task);
        forged.score = [0, 5];
        task.handle_event(RoomEvent::Message {
            session_id: b,
            msg: ClientMsg::MatchSnapshot { room: forged },
        });

        assert_eq!(task.state().snapshot(), stored_before);
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn spectator_join_does_not_disturb_players_or_turn() {
        let mut task = task();
        let (a, mut rx_a) = join(&mut task);
        let (b, mut rx_b) = join(&mut task);
        drain(&mut rx_a);
        drain(&mut rx_b);

        let (c, mut rx_c) = join(&mut task);

        let msgs = drain(&mut rx_c);
        assert_eq!(msgs.len(), 1);
        let room = expect_snapshot(&msgs[0]);
        assert_eq!(room.players, vec![a, b]);
        assert_eq!(room.spectators, vec![c]);
        assert_eq!(room.turn, 0);
        // Spectator joins are not re-broadcast to the players
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn room_closes_when_last_player_leaves() {
        let mut task = task();
        let (a, _rx_a) = join(&mut task);
        let (b, mut rx_b) = join(&mut task);
        let (_c, _rx_c) = join(&mut task);
        drain(&mut rx_b);

        assert!(task.handle_event(RoomEvent::Leave { session_id: a }));
        // Remaining participants are told about the missing opponent
        let msgs = drain(&mut rx_b);
        assert_eq!(msgs.len(), 1);
        assert_eq!(expect_snapshot(&msgs[0]).players, vec![b]);

        assert!(!task.handle_event(RoomEvent::Leave { session_id: b }));
    }
}
