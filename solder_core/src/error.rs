use thiserror::Error;

use crate::events::CommandClass;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsoleError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("sequence busy: only allowed while idle")]
    SequenceBusy,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("transport unavailable")]
    TransportUnavailable,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{0} command already in flight")]
    CommandInFlight(CommandClass),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Typed result for the calculator, orchestrator and dispatcher.
pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
