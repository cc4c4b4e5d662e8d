//! Loopback controller.
//!
//! Every `send` is answered synchronously by pushing the replies onto the
//! inbound channel, followed by a heartbeat. Moves and feeds complete
//! instantly; the console sees the same event names and payload shapes as
//! from the firmware.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender};
use serde_json::{Map, Value, json};
use solder_traits::{InboundEvent, Transport};
use tracing::{debug, warn};

use crate::error::{Result, SimError};

/// Solder alloy density (g/mm³), used to turn fed length into spool weight.
const SOLDER_DENSITY_G_MM3: f64 = 0.0085;
/// Tip temperature when the heater is off (°C).
const AMBIENT_C: f64 = 25.0;

#[derive(Debug)]
struct SimState {
    connected: bool,
    z_mm: f64,
    tip_target_c: Option<f64>,
    heater_on: bool,
    wire_diameter_mm: f64,
    full_length_mm: f64,
    remaining_length_mm: f64,
    initial_weight_g: f64,
    tared: bool,
    feeds: u32,
    break_on_feed: Option<u32>,
    pending_break: Option<String>,
}

impl SimState {
    fn grams_per_mm(&self) -> f64 {
        let r = self.wire_diameter_mm / 2.0;
        std::f64::consts::PI * r * r * SOLDER_DENSITY_G_MM3
    }

    fn remaining_percentage(&self) -> f64 {
        if self.full_length_mm <= 0.0 {
            return 0.0;
        }
        (100.0 * self.remaining_length_mm / self.full_length_mm).clamp(0.0, 100.0)
    }

    fn net_weight_g(&self) -> f64 {
        let used = self.full_length_mm - self.remaining_length_mm;
        (self.initial_weight_g - used * self.grams_per_mm()).max(0.0)
    }
}

/// Test/CLI handle to poke the simulator while a session owns it.
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
    tx: Sender<InboundEvent>,
}

impl SimHandle {
    pub fn set_connected(&self, connected: bool) {
        lock(&self.state).connected = connected;
    }

    /// Push a wire break right now.
    pub fn inject_wire_break(&self, message: &str) {
        let _ = self.tx.send(wire_break_event(message));
    }

    /// Break the wire during the `n`-th feed (1-based) instead of completing it.
    pub fn break_on_feed(&self, n: u32) {
        lock(&self.state).break_on_feed = Some(n);
    }

    /// Current simulated Z.
    pub fn z_mm(&self) -> f64 {
        lock(&self.state).z_mm
    }

    pub fn remaining_length_mm(&self) -> f64 {
        lock(&self.state).remaining_length_mm
    }
}

#[derive(Debug)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
    tx: Sender<InboundEvent>,
}

impl SimulatedController {
    /// Controller pushing its replies into `tx`.
    pub fn new(tx: Sender<InboundEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                connected: true,
                z_mm: 0.0,
                tip_target_c: None,
                heater_on: false,
                wire_diameter_mm: 0.8,
                full_length_mm: 100_000.0,
                remaining_length_mm: 100_000.0,
                initial_weight_g: 500.0,
                tared: false,
                feeds: 0,
                break_on_feed: None,
                pending_break: None,
            })),
            tx,
        }
    }

    /// Controller plus the receiving end of its telemetry.
    pub fn with_channel() -> (Self, Receiver<InboundEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Start from a partially used spool.
    #[must_use]
    pub fn with_spool(self, full_length_mm: f64, remaining_length_mm: f64) -> Self {
        {
            let mut s = lock(&self.state);
            s.full_length_mm = full_length_mm;
            s.remaining_length_mm = remaining_length_mm.clamp(0.0, full_length_mm);
        }
        self
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
            tx: self.tx.clone(),
        }
    }

    fn respond(&self, event: &str, p: &Map<String, Value>) -> Result<Vec<InboundEvent>> {
        let mut s = lock(&self.state);
        let mut out = Vec::new();
        match event {
            "axis:jog" => {
                let step = num(event, p, "stepSize")?;
                let down = match p.get("direction").and_then(Value::as_str) {
                    Some("down") => true,
                    Some("up") => false,
                    other => {
                        return Err(SimError::InvalidPayload {
                            event: event.into(),
                            reason: format!("direction must be up|down, got {other:?}"),
                        });
                    }
                };
                s.z_mm = if down { s.z_mm - step } else { (s.z_mm + step).min(0.0) };
                out.push(ev("position:update", json!({"z": s.z_mm, "isMoving": true})));
                out.push(ev("axis:jog:ack", json!({"z": s.z_mm})));
                out.push(ev("position:update", json!({"z": s.z_mm, "isMoving": false})));
            }
            "axis:home" => {
                s.z_mm = 0.0;
                out.push(ev("axis:home:ack", json!({"z": 0.0})));
                out.push(ev("position:update", json!({"z": 0.0, "isMoving": false})));
            }
            "axis:save" => out.push(ev("axis:save:ack", json!({"z": s.z_mm}))),
            "tip:target:set" => {
                s.tip_target_c = Some(num(event, p, "target")?);
                out.push(tip_status(&s));
            }
            "tip:heater:set" => {
                s.heater_on = p.get("enabled").and_then(Value::as_bool).unwrap_or(false);
                out.push(tip_status(&s));
            }
            "wire:feed:start" => feed(&mut s, event, p, &mut out)?,
            "spool:config:set" => {
                if let Some(d) = p.get("wireDiameterMm").and_then(Value::as_f64) {
                    s.wire_diameter_mm = d;
                }
                if let Some(w) = p.get("initialWeightG").and_then(Value::as_f64) {
                    s.initial_weight_g = w;
                }
                if let Some(l) = p.get("fullLengthMm").and_then(Value::as_f64) {
                    s.full_length_mm = l;
                    s.remaining_length_mm = s.remaining_length_mm.min(l);
                }
                out.push(ev("spool:config:response", json!({"ok": true})));
                out.push(spool_update(&s, 0.0, 0.0));
            }
            "spool:reset" => {
                s.remaining_length_mm = s.full_length_mm;
                s.tared = false;
                out.push(ev("spool:reset:response", json!({"ok": true})));
                out.push(spool_update(&s, 0.0, 0.0));
            }
            "spool:tare" => {
                s.tared = true;
                out.push(ev("spool:tare:response", json!({"ok": true})));
                out.push(spool_update(&s, 0.0, 0.0));
            }
            "sequence:start" | "sequence:stop" | "sequence:pause" | "sequence:resume" => {
                let status = event.trim_start_matches("sequence:");
                out.push(ev("sequence:update", json!({"status": status})));
            }
            e if e.starts_with("sequence:") && e.ends_with(":set") => {
                let ack = e.replace(":set", ":ack");
                let mut body = p.clone();
                body.insert("ok".into(), Value::Bool(true));
                out.push(ev(&ack, Value::Object(body)));
            }
            e if e.ends_with(":state:request") => {
                out.push(state_reply(&s, e.trim_end_matches(":state:request")));
            }
            other => return Err(SimError::UnknownCommand(other.into())),
        }
        Ok(out)
    }
}

impl Transport for SimulatedController {
    fn send(
        &mut self,
        event: &str,
        payload_json: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !lock(&self.state).connected {
            return Err(Box::new(SimError::Disconnected));
        }
        let payload: Value =
            serde_json::from_str(payload_json).map_err(|e| SimError::InvalidPayload {
                event: event.into(),
                reason: e.to_string(),
            })?;
        let empty = Map::new();
        let obj = payload.as_object().unwrap_or(&empty);
        let mut replies = self.respond(event, obj).inspect_err(|e| {
            warn!(event, error = %e, "simulator rejected command");
        })?;
        if let Some(msg) = lock(&self.state).pending_break.take() {
            replies.push(wire_break_event(&msg));
        }
        replies.push(ev("arduino:data:received", json!({"timestamp": unix_millis()})));
        debug!(event, replies = replies.len(), "simulator replied");
        for r in replies {
            self.tx.send(r).map_err(|_| SimError::Disconnected)?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

fn feed(
    s: &mut SimState,
    event: &str,
    p: &Map<String, Value>,
    out: &mut Vec<InboundEvent>,
) -> Result<()> {
    let length = num(event, p, "length")?;
    let rate = p.get("rate").and_then(Value::as_f64).unwrap_or(0.0);
    s.feeds += 1;
    out.push(ev("wire:feed:status", json!({"status": "feeding"})));
    if s.break_on_feed == Some(s.feeds) {
        let msg = format!("wire break during feed {}", s.feeds);
        out.push(ev(
            "wire:feed:status",
            json!({"status": "error", "wireBreak": true, "message": msg}),
        ));
        s.pending_break = Some(msg);
        return Ok(());
    }
    let used = length.min(s.remaining_length_mm);
    s.remaining_length_mm -= used;
    out.push(spool_update(s, used, rate));
    out.push(ev(
        "wire:feed:status",
        json!({"status": "completed", "completedAt": unix_millis()}),
    ));
    Ok(())
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // A panic while holding the lock leaves plain data behind; keep going.
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn ev(name: &str, payload: Value) -> InboundEvent {
    InboundEvent::new(name, payload.to_string())
}

fn num(event: &str, p: &Map<String, Value>, key: &str) -> Result<f64> {
    p.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| SimError::InvalidPayload {
            event: event.into(),
            reason: format!("missing numeric {key}"),
        })
}

fn wire_break_event(message: &str) -> InboundEvent {
    ev(
        "wire:break",
        json!({"detected": true, "timestamp": unix_millis(), "message": message}),
    )
}

fn tip_status(s: &SimState) -> InboundEvent {
    let current = match (s.heater_on, s.tip_target_c) {
        (true, Some(t)) => t,
        _ => AMBIENT_C,
    };
    ev(
        "tip:status",
        json!({
            "target": s.tip_target_c,
            "heater": s.heater_on,
            "status": if s.heater_on { "ready" } else { "off" },
            "current": current,
        }),
    )
}

fn spool_update(s: &SimState, used_mm: f64, rate: f64) -> InboundEvent {
    ev(
        "spool:update",
        json!({
            "wireDiameterMm": s.wire_diameter_mm,
            "remainingPercentage": s.remaining_percentage(),
            "remainingLengthMm": s.remaining_length_mm,
            "isFeeding": false,
            "netWeightG": s.net_weight_g(),
            "initialWeightG": s.initial_weight_g,
            "isTared": s.tared,
            "lastCycleWireLengthUsedMm": used_mm,
            "currentFeedRateMmPerS": rate,
        }),
    )
}

fn state_reply(s: &SimState, subsystem: &str) -> InboundEvent {
    match subsystem {
        "position" => ev("position:update", json!({"z": s.z_mm, "isMoving": false})),
        "tip" => tip_status(s),
        "spool" => spool_update(s, 0.0, 0.0),
        "flux" => ev("flux:update", json!({"percentage": 75, "unit": "%", "force": true})),
        "fan" => ev("fan:update", json!({"machine": true, "tip": s.heater_on})),
        "sequence" => ev("sequence:update", json!({"status": "idle"})),
        other => ev(&format!("{other}:update"), json!({"enabled": false})),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
