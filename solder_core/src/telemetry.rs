//! Long-lived machine state merged from inbound telemetry.
//!
//! Each record is updated by shallow merge: fields present in a patch
//! overwrite, absent fields keep their previous values. Updates are applied in
//! arrival order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::config::{SpoolCfg, TelemetryCfg};
use crate::events::{
    AuxSubsystem, FanPatch, FluxPatch, PositionPatch, SpoolPatch, TelemetryEvent, TipPatch,
    WireBreakPatch, WireFeedPatch,
};
use crate::util::unix_millis;

/// Remaining wire at or below this percentage raises the low-wire alert.
pub const WIRE_LOW_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    /// Z in mm; never above 0 (the home position).
    pub z_mm: f64,
    pub is_moving: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipState {
    pub target_c: Option<f64>,
    pub current_c: Option<f64>,
    pub heater_on: bool,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpoolAlert {
    None,
    Low,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoolState {
    pub wire_diameter_mm: f64,
    pub remaining_percentage: f64,
    pub remaining_length_mm: f64,
    pub is_feeding: bool,
    pub net_weight_g: f64,
    pub initial_weight_g: f64,
    pub is_tared: bool,
    pub last_cycle_wire_length_used_mm: f64,
    pub current_feed_rate_mm_per_s: f64,
}

impl SpoolState {
    pub fn new(cfg: &SpoolCfg, wire_diameter_mm: f64) -> Self {
        Self {
            wire_diameter_mm,
            remaining_percentage: 100.0,
            remaining_length_mm: cfg.full_length_mm,
            is_feeding: false,
            net_weight_g: cfg.initial_weight_g,
            initial_weight_g: cfg.initial_weight_g,
            is_tared: false,
            last_cycle_wire_length_used_mm: 0.0,
            current_feed_rate_mm_per_s: 0.0,
        }
    }

    pub fn is_wire_empty(&self) -> bool {
        self.remaining_percentage <= 0.0
    }

    pub fn is_wire_low(&self) -> bool {
        self.remaining_percentage <= WIRE_LOW_PERCENT
    }

    /// Empty wins over low.
    pub fn alert(&self) -> SpoolAlert {
        if self.is_wire_empty() {
            SpoolAlert::Empty
        } else if self.is_wire_low() {
            SpoolAlert::Low
        } else {
            SpoolAlert::None
        }
    }

    /// Optimistic tare applied before the controller confirms it.
    pub fn apply_tare(&mut self) {
        self.is_tared = true;
        self.net_weight_g = self.initial_weight_g;
    }

    /// Back to a full spool, keeping the configured wire diameter.
    pub fn reset(&mut self, cfg: &SpoolCfg) {
        *self = Self::new(cfg, self.wire_diameter_mm);
    }

    fn merge(&mut self, p: &SpoolPatch) {
        if let Some(v) = p.wire_diameter_mm {
            self.wire_diameter_mm = v;
        }
        if let Some(v) = p.remaining_percentage {
            self.remaining_percentage = v.clamp(0.0, 100.0);
        }
        if let Some(v) = p.remaining_length_mm {
            self.remaining_length_mm = v.max(0.0);
        }
        if let Some(v) = p.is_feeding {
            self.is_feeding = v;
        }
        if let Some(v) = p.net_weight_g {
            self.net_weight_g = v;
        }
        if let Some(v) = p.initial_weight_g {
            self.initial_weight_g = v;
        }
        if let Some(v) = p.is_tared {
            self.is_tared = v;
        }
        if let Some(v) = p.last_cycle_wire_length_used_mm {
            self.last_cycle_wire_length_used_mm = v;
        }
        if let Some(v) = p.current_feed_rate_mm_per_s {
            self.current_feed_rate_mm_per_s = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxState {
    /// Last accepted level (percent).
    pub percentage: Option<f64>,
    pub unit: Option<String>,
    pub volume: Option<f64>,
    pub message: Option<String>,
    pub updated_at: Option<u64>,
}

#[allow(clippy::cast_possible_truncation)]
fn rounded(x: f64) -> i64 {
    x.round() as i64
}

/// Flux level hysteresis.
///
/// A new level is taken when its rounded value rises above the last accepted
/// rounded value, drops by at least one whole percent, is forced, or nothing
/// was accepted yet. Readings that round to the same percent are ignored, so
/// 80 then 79.6 keeps showing 80.
pub fn flux_update_accepted(prev: Option<f64>, new: f64, forced: bool) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    if forced {
        return true;
    }
    let (prev, new) = (rounded(prev), rounded(new));
    new > prev || prev - new >= 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanState {
    pub machine: bool,
    pub tip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFeedState {
    pub status: Option<String>,
    pub message: Option<String>,
    pub completed_at: Option<u64>,
    pub wire_break: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBreakFault {
    pub detected: bool,
    pub timestamp_ms: Option<u64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    /// Port open but no recent heartbeat.
    Connected,
    Streaming,
}

/// Position after a merge, reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReport {
    pub z_mm: f64,
    pub is_moving: bool,
}

/// What one event did to the reconciled state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reconciled {
    pub changed: bool,
    /// A wire break was newly latched by this event.
    pub wire_break_detected: bool,
    pub feed_completed: bool,
    pub position: Option<PositionReport>,
}

#[derive(Debug, Clone)]
pub struct Telemetry {
    pub position: PositionState,
    pub tip: TipState,
    pub spool: SpoolState,
    pub flux: FluxState,
    pub fans: FanState,
    pub wire_feed: WireFeedState,
    pub wire_break: WireBreakFault,
    pub aux: BTreeMap<AuxSubsystem, Map<String, Value>>,
    pub firmware_sequence: Map<String, Value>,
    last_heartbeat_ms: Option<u64>,
    heartbeat_timeout_ms: u64,
    spool_cfg: SpoolCfg,
}

impl Telemetry {
    pub fn new(cfg: &TelemetryCfg, spool: &SpoolCfg, wire_diameter_mm: f64) -> Self {
        Self {
            position: PositionState::default(),
            tip: TipState::default(),
            spool: SpoolState::new(spool, wire_diameter_mm),
            flux: FluxState::default(),
            fans: FanState::default(),
            wire_feed: WireFeedState::default(),
            wire_break: WireBreakFault::default(),
            aux: BTreeMap::new(),
            firmware_sequence: Map::new(),
            last_heartbeat_ms: None,
            heartbeat_timeout_ms: cfg.heartbeat_timeout_ms,
            spool_cfg: *spool,
        }
    }

    pub fn apply(&mut self, ev: &TelemetryEvent, now_ms: u64) -> Reconciled {
        let mut out = Reconciled {
            changed: true,
            ..Reconciled::default()
        };
        match ev {
            TelemetryEvent::Position(p) => {
                self.merge_position(p);
                out.position = Some(PositionReport {
                    z_mm: self.position.z_mm,
                    is_moving: self.position.is_moving,
                });
            }
            TelemetryEvent::TipStatus(p) => self.merge_tip(p),
            TelemetryEvent::WireFeedStatus(p) => {
                self.merge_wire_feed(p);
                if p.wire_break == Some(true) {
                    let msg = p
                        .message
                        .clone()
                        .unwrap_or_else(|| "wire break reported during feed".into());
                    out.wire_break_detected = self.latch_wire_break(None, msg);
                } else if p.is_completion() {
                    out.feed_completed = true;
                }
            }
            TelemetryEvent::WireBreak(p) => out.wire_break_detected = self.on_wire_break(p),
            TelemetryEvent::Spool(p) => self.spool.merge(p),
            TelemetryEvent::Sequence(m) => shallow_merge(&mut self.firmware_sequence, m),
            TelemetryEvent::Flux(p) => out.changed = self.merge_flux(p),
            TelemetryEvent::Fan(p) => self.merge_fans(p),
            TelemetryEvent::Aux(which, m) => shallow_merge(self.aux.entry(*which).or_default(), m),
            TelemetryEvent::Heartbeat { .. } => {
                self.last_heartbeat_ms = Some(now_ms);
                out.changed = false;
            }
        }
        out
    }

    pub fn link_state(&self, connected: bool, now_ms: u64) -> LinkState {
        if !connected {
            return LinkState::Disconnected;
        }
        match self.last_heartbeat_ms {
            Some(t) if now_ms.saturating_sub(t) < self.heartbeat_timeout_ms => LinkState::Streaming,
            _ => LinkState::Connected,
        }
    }

    pub fn last_heartbeat_ms(&self) -> Option<u64> {
        self.last_heartbeat_ms
    }

    /// Returns whether a fault was showing.
    pub fn dismiss_wire_break(&mut self) -> bool {
        let was = self.wire_break.detected;
        self.wire_break = WireBreakFault::default();
        self.wire_feed.wire_break = false;
        was
    }

    pub fn reset_spool(&mut self) {
        let cfg = self.spool_cfg;
        self.spool.reset(&cfg);
    }

    fn merge_position(&mut self, p: &PositionPatch) {
        if let Some(z) = p.z {
            if z > 0.0 {
                trace!(z, "z above home clamped to 0");
            }
            self.position.z_mm = z.min(0.0);
        }
        if let Some(m) = p.is_moving {
            self.position.is_moving = m;
        }
    }

    fn merge_tip(&mut self, p: &TipPatch) {
        if let Some(v) = p.target {
            self.tip.target_c = Some(v);
        }
        if let Some(v) = p.current {
            self.tip.current_c = Some(v);
        }
        if let Some(v) = p.heater {
            self.tip.heater_on = v;
        }
        if let Some(v) = &p.status {
            self.tip.status = Some(v.clone());
        }
    }

    fn merge_wire_feed(&mut self, p: &WireFeedPatch) {
        if let Some(v) = &p.status {
            self.wire_feed.status = Some(v.clone());
        }
        if let Some(v) = &p.message {
            self.wire_feed.message = Some(v.clone());
        }
        if let Some(v) = p.completed_at {
            self.wire_feed.completed_at = Some(v);
        }
        if let Some(v) = p.wire_break {
            self.wire_feed.wire_break = v;
        }
    }

    fn on_wire_break(&mut self, p: &WireBreakPatch) -> bool {
        if p.detected != Some(true) {
            // Only the operator clears a latched break.
            return false;
        }
        let msg = p.message.clone().unwrap_or_else(|| "wire break detected".into());
        self.latch_wire_break(p.timestamp, msg)
    }

    fn latch_wire_break(&mut self, timestamp_ms: Option<u64>, message: String) -> bool {
        let newly = !self.wire_break.detected;
        warn!(message = %message, "wire break");
        self.wire_break = WireBreakFault {
            detected: true,
            timestamp_ms: Some(timestamp_ms.unwrap_or_else(unix_millis)),
            message: Some(message),
        };
        newly
    }

    fn merge_flux(&mut self, p: &FluxPatch) -> bool {
        let mut changed = false;
        if let Some(v) = p.value {
            if flux_update_accepted(self.flux.percentage, v, p.forced) {
                self.flux.percentage = Some(v);
                changed = true;
            } else {
                debug!(value = v, "flux update within hysteresis band ignored");
            }
        }
        if let Some(v) = &p.unit {
            self.flux.unit = Some(v.clone());
            changed = true;
        }
        if let Some(v) = p.volume {
            self.flux.volume = Some(v);
            changed = true;
        }
        if let Some(v) = &p.message {
            self.flux.message = Some(v.clone());
            changed = true;
        }
        if let Some(v) = p.updated_at {
            self.flux.updated_at = Some(v);
        }
        changed
    }

    fn merge_fans(&mut self, p: &FanPatch) {
        if let Some(v) = p.machine {
            self.fans.machine = v;
        }
        if let Some(v) = p.tip {
            self.fans.tip = v;
        }
    }
}

fn shallow_merge(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (k, v) in from {
        into.insert(k.clone(), v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_rules() {
        assert!(flux_update_accepted(None, 12.0, false));
        assert!(flux_update_accepted(Some(80.0), 79.0, false));
        assert!(!flux_update_accepted(Some(80.0), 79.6, false));
        assert!(flux_update_accepted(Some(80.0), 79.6, true));
        assert!(flux_update_accepted(Some(50.0), 51.0, false));
        assert!(!flux_update_accepted(Some(50.0), 50.4, false));
    }

    #[test]
    fn spool_alert_prefers_empty() {
        let mut s = SpoolState::new(&SpoolCfg::default(), 0.8);
        assert_eq!(s.alert(), SpoolAlert::None);
        s.remaining_percentage = 10.0;
        assert_eq!(s.alert(), SpoolAlert::Low);
        s.remaining_percentage = 0.0;
        assert!(s.is_wire_low());
        assert_eq!(s.alert(), SpoolAlert::Empty);
    }
}
