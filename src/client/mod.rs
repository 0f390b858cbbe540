//! Client-side match controller and aim handling

pub mod aim;
pub mod controller;

pub use controller::{MatchController, Phase};
