//! Air pool relay - room, turn, and state synchronization for a two-player
//! drag-and-release physics game.
//!
//! The relay never simulates physics. It gates who may act (the turn-holder),
//! forwards opaque aim/move vectors, and stores the terminal snapshot the
//! authoritative client publishes after each shot. The client-side match
//! controller and its rigid-body simulation seam live here too so the whole
//! protocol can be tested in one process.

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod room;
pub mod sim;
pub mod util;
pub mod ws;
