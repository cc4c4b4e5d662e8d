//! Controller-side implementations of `solder_traits::Transport`.
//!
//! The only link shipped here is [`SimulatedController`], a loopback stand-in
//! for the Arduino that answers every command with the acks and telemetry the
//! real firmware would push. The serial bridge lives outside this workspace.

pub mod error;
pub mod sim;

pub use error::SimError;
pub use sim::{SimHandle, SimulatedController};
