//! Test and helper transports for solder_core

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use solder_traits::Transport;

/// Records every sent `(event, payload)` pair; clones share the log and the
/// connection flag, so a test can keep a handle after moving one into a session.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    connected: Arc<AtomicBool>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            sent: Arc::default(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Copy of everything sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Names of sent events, in order.
    pub fn sent_names(&self) -> Vec<String> {
        self.sent().into_iter().map(|(n, _)| n).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.sent.lock() {
            g.clear();
        }
    }
}

impl Transport for RecordingTransport {
    fn send(
        &mut self,
        event: &str,
        payload_json: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent
            .lock()
            .map_err(|_| "recording transport poisoned")?
            .push((event.to_owned(), payload_json.to_owned()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// A connected transport whose every send fails with the given message.
pub struct FailingTransport(pub &'static str);

impl Transport for FailingTransport {
    fn send(
        &mut self,
        _event: &str,
        _payload_json: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other(self.0)))
    }

    fn is_connected(&self) -> bool {
        true
    }
}
