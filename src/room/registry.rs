//! Live room table and room code generation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

use crate::room::relay::{RoomEvent, RoomTask};
use crate::room::RelayError;

/// Length of the alphabetic room codes in URLs
pub const ROOM_CODE_LEN: usize = 5;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Collision retry cap; the original looped forever on an exhausted space
const MAX_CODE_ATTEMPTS: usize = 64;

/// Capacity of a room's inbound event queue
const ROOM_EVENT_BUFFER: usize = 256;

/// Handle to a running room task
#[derive(Clone)]
pub struct RoomHandle {
    pub code: String,
    pub event_tx: mpsc::Sender<RoomEvent>,
    pub participant_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn participant_count(&self) -> usize {
        self.participant_count.load(Ordering::Relaxed)
    }
}

/// Registry of all live rooms, owned by the relay process
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create an empty room under a fresh unique code and spawn its task
    pub fn create_room(self: &Arc<Self>) -> Result<String, RelayError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = random_code(&mut rng);
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let (event_tx, event_rx) = mpsc::channel(ROOM_EVENT_BUFFER);
                    let participant_count = Arc::new(AtomicUsize::new(0));
                    entry.insert(RoomHandle {
                        code: code.clone(),
                        event_tx,
                        participant_count: participant_count.clone(),
                    });

                    let task = RoomTask::new(code.clone(), self.clone(), participant_count);
                    tokio::spawn(task.run(event_rx));

                    info!(room = %code, "Room created");
                    return Ok(code);
                }
            }
        }
        Err(RelayError::RoomExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Look up a live room by code
    pub fn get(&self, code: &str) -> Result<RoomHandle, RelayError> {
        self.rooms
            .get(code)
            .map(|r| r.value().clone())
            .ok_or(RelayError::RoomNotFound)
    }

    /// Drop a room from the table (called by its task on destruction)
    pub fn remove(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.remove(code).map(|(_, h)| h)
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_participants(&self) -> usize {
        self.rooms
            .iter()
            .map(|r| r.value().participant_count())
            .sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn random_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
