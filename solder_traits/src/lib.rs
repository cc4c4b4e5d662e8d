pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One event pushed by the controller link, as received.
///
/// `payload` is the raw JSON text; decoding happens at the reconciliation
/// boundary so a malformed payload can never take the link down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub name: String,
    pub payload: String,
}

impl InboundEvent {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// Outbound side of the controller link (serial bridge, simulator, ...).
pub trait Transport {
    /// Fire-and-forget send of a named event with a JSON payload.
    fn send(
        &mut self,
        event: &str,
        payload_json: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Whether the link is currently open.
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &mut self,
        event: &str,
        payload_json: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(event, payload_json)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
