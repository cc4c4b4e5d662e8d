use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulated controller disconnected")]
    Disconnected,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SimError>;
