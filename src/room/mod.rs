//! Room lifecycle: state rules, live registry, and per-room relay tasks

pub mod registry;
pub mod relay;
pub mod state;

pub use registry::{RoomHandle, RoomRegistry, ROOM_CODE_LEN};
pub use relay::{RoomEvent, RoomTask};
pub use state::{Role, RoomState, MAX_PLAYERS};

/// Relay-level failures surfaced to the HTTP layer. Per-event protocol
/// violations are not errors, they are silent drops.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("room not found")]
    RoomNotFound,

    #[error("no free room code after {0} attempts")]
    RoomExhausted(usize),
}
