//! Maps `Box<dyn Error>` from the `Transport` seam to typed `ConsoleError`.
//!
//! `solder_traits::Transport` returns boxed errors so any link (serial bridge,
//! simulator) can plug in; this module narrows them down, with a
//! feature-gated downcast for `solder_hardware::SimError`.

use crate::error::ConsoleError;

/// Map a transport send failure to a typed `ConsoleError`.
///
/// Known simulator errors are downcast first, then the message is inspected
/// for signs of a dropped link.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ConsoleError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(sim) = e.downcast_ref::<solder_hardware::SimError>() {
            return match sim {
                solder_hardware::SimError::Disconnected => ConsoleError::TransportUnavailable,
                other => ConsoleError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if ["not connected", "disconnected", "closed", "unavailable"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ConsoleError::TransportUnavailable
    } else {
        ConsoleError::Transport(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(msg: &str) -> Box<dyn std::error::Error + Send + Sync> {
        msg.into()
    }

    #[test]
    fn link_loss_messages_become_unavailable() {
        assert_eq!(
            map_transport_error(boxed("port closed").as_ref()),
            ConsoleError::TransportUnavailable
        );
        assert_eq!(
            map_transport_error(boxed("Device Disconnected").as_ref()),
            ConsoleError::TransportUnavailable
        );
    }

    #[test]
    fn other_messages_are_kept() {
        assert_eq!(
            map_transport_error(boxed("write buffer full").as_ref()),
            ConsoleError::Transport("write buffer full".into())
        );
    }
}
