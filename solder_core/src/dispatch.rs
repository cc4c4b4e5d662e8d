//! Outbound command dispatch with acknowledgment correlation.
//!
//! Acknowledged commands get a request id and a table entry *before* they are
//! sent; the first matching ack event removes the oldest entry waiting for it.
//! There is no timeout: an entry stays until its ack arrives or the caller
//! abandons the class. `sent_at_ms` is kept so a timeout sweep can be added
//! without touching call sites.

use std::collections::BTreeMap;

use serde::Serialize;
use solder_traits::Transport;
use tracing::{debug, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::events::{Command, CommandClass};
use crate::transport_error::map_transport_error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCommand {
    pub id: u64,
    pub name: &'static str,
    pub ack_event: &'static str,
    pub class: CommandClass,
    pub sent_at_ms: u64,
}

/// A pending command resolved by its ack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub id: u64,
    pub name: &'static str,
    pub class: CommandClass,
    pub round_trip_ms: u64,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    next_id: u64,
    pending: BTreeMap<u64, PendingCommand>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `cmd`. Returns the request id for acknowledged commands.
    ///
    /// `now_ms` is the session clock (used for round trips), `timestamp_ms`
    /// the wall-clock stamp put into the payload.
    pub fn dispatch<T: Transport + ?Sized>(
        &mut self,
        transport: Option<&mut T>,
        cmd: &Command,
        now_ms: u64,
        timestamp_ms: u64,
    ) -> ConsoleResult<Option<u64>> {
        let name = cmd.name();
        let Some(transport) = transport.filter(|t| t.is_connected()) else {
            warn!(command = name, "no connected transport; command dropped");
            return Err(ConsoleError::TransportUnavailable);
        };

        let id = match (cmd.class(), cmd.ack_event()) {
            (Some(class), Some(ack_event)) => {
                if self.is_in_flight(class) {
                    warn!(command = name, %class, "command class already in flight");
                    return Err(ConsoleError::CommandInFlight(class));
                }
                self.next_id += 1;
                let id = self.next_id;
                self.pending.insert(
                    id,
                    PendingCommand {
                        id,
                        name,
                        ack_event,
                        class,
                        sent_at_ms: now_ms,
                    },
                );
                Some(id)
            }
            _ => None,
        };

        let payload = cmd.payload(timestamp_ms).to_string();
        if let Err(e) = transport.send(name, &payload) {
            if let Some(id) = id {
                self.pending.remove(&id);
            }
            let err = map_transport_error(e.as_ref());
            warn!(command = name, error = %err, "send failed");
            return Err(err);
        }
        debug!(command = name, request_id = ?id, payload = %payload, "command sent");
        Ok(id)
    }

    /// Resolve the oldest pending command waiting for `event`.
    pub fn acknowledge(&mut self, event: &str, now_ms: u64) -> Option<Acknowledgement> {
        let id = self
            .pending
            .values()
            .find(|p| p.ack_event == event)
            .map(|p| p.id)?;
        let p = self.pending.remove(&id)?;
        let ack = Acknowledgement {
            id,
            name: p.name,
            class: p.class,
            round_trip_ms: now_ms.saturating_sub(p.sent_at_ms),
        };
        debug!(
            command = ack.name,
            request_id = id,
            round_trip_ms = ack.round_trip_ms,
            "acknowledged"
        );
        Some(ack)
    }

    pub fn is_in_flight(&self, class: CommandClass) -> bool {
        self.pending.values().any(|p| p.class == class)
    }

    /// Distinct classes with an outstanding command, in class order.
    pub fn in_flight_classes(&self) -> Vec<CommandClass> {
        let mut classes: Vec<_> = self.pending.values().map(|p| p.class).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingCommand> {
        self.pending.values()
    }

    /// Forget every outstanding command of `class`; returns how many were dropped.
    pub fn abandon(&mut self, class: CommandClass) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, p| p.class != class);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            warn!(%class, dropped, "pending commands abandoned");
        }
        dropped
    }
}
