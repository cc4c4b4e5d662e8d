//! Named events exchanged with the controller.
//!
//! Outbound: [`Command`] knows its event name, JSON payload, acknowledgment
//! event and in-flight class. Inbound: [`decode`] turns `(name, payload)` into
//! a [`TelemetryEvent`]. Every field is read on its own; a field with the
//! wrong type is dropped and the rest of the payload still applies.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::trace;

use crate::sequence::{PadJob, SequenceConfig};

/// Commands of one class are never outstanding twice at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandClass {
    /// jog, home, save
    Motion,
    /// tare, reset, config
    Spool,
    PreHeatDwell,
    Cooling,
    FluxTiming,
    MultiplePasses,
    LargePadThreshold,
    PassesPerLargePad,
}

impl CommandClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::Spool => "spool",
            Self::PreHeatDwell => "preheat-dwell",
            Self::Cooling => "cooling",
            Self::FluxTiming => "flux-timing",
            Self::MultiplePasses => "multiple-passes",
            Self::LargePadThreshold => "large-pad-threshold",
            Self::PassesPerLargePad => "passes-per-large-pad",
        }
    }
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JogDirection {
    Up,
    Down,
}

impl JogDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Fields sent with `spool:config:set`; absent fields are left to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoolConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_diameter_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_weight_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_length_mm: Option<f64>,
}

/// Subsystems that answer a `<name>:state:request` pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Position,
    Tip,
    Spool,
    Flux,
    Fan,
    FumeExtractor,
    FluxMist,
    AirBreeze,
    AirJetPressure,
    Sequence,
}

impl Subsystem {
    pub const ALL: [Self; 10] = [
        Self::Position,
        Self::Tip,
        Self::Spool,
        Self::Flux,
        Self::Fan,
        Self::FumeExtractor,
        Self::FluxMist,
        Self::AirBreeze,
        Self::AirJetPressure,
        Self::Sequence,
    ];

    pub const fn request_event(self) -> &'static str {
        match self {
            Self::Position => "position:state:request",
            Self::Tip => "tip:state:request",
            Self::Spool => "spool:state:request",
            Self::Flux => "flux:state:request",
            Self::Fan => "fan:state:request",
            Self::FumeExtractor => "fumeExtractor:state:request",
            Self::FluxMist => "fluxMist:state:request",
            Self::AirBreeze => "airBreeze:state:request",
            Self::AirJetPressure => "airJetPressure:state:request",
            Self::Sequence => "sequence:state:request",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Jog {
        direction: JogDirection,
        step_mm: f64,
    },
    Home,
    SavePosition,
    SetTipTarget {
        target_c: f64,
    },
    SetHeater {
        enabled: bool,
    },
    FeedWire {
        length_mm: f64,
        diameter_mm: f64,
        rate_mm_s: f64,
    },
    ConfigureSpool(SpoolConfig),
    ResetSpool,
    TareSpool,
    StartSequence {
        pads: Vec<PadJob>,
        options: SequenceConfig,
    },
    StopSequence,
    PauseSequence,
    ResumeSequence,
    SetPreHeatDwell {
        time_ms: u64,
    },
    SetCooling {
        time_ms: u64,
    },
    SetFluxTiming {
        enabled: bool,
    },
    SetMultiplePasses {
        enabled: bool,
    },
    SetLargePadThreshold {
        threshold_mm2: f64,
    },
    SetPassesPerLargePad {
        passes: u32,
    },
    RequestState(Subsystem),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Jog { .. } => "axis:jog",
            Self::Home => "axis:home",
            Self::SavePosition => "axis:save",
            Self::SetTipTarget { .. } => "tip:target:set",
            Self::SetHeater { .. } => "tip:heater:set",
            Self::FeedWire { .. } => "wire:feed:start",
            Self::ConfigureSpool(_) => "spool:config:set",
            Self::ResetSpool => "spool:reset",
            Self::TareSpool => "spool:tare",
            Self::StartSequence { .. } => "sequence:start",
            Self::StopSequence => "sequence:stop",
            Self::PauseSequence => "sequence:pause",
            Self::ResumeSequence => "sequence:resume",
            Self::SetPreHeatDwell { .. } => "sequence:preheat-dwell:set",
            Self::SetCooling { .. } => "sequence:cooling:set",
            Self::SetFluxTiming { .. } => "sequence:flux-timing:set",
            Self::SetMultiplePasses { .. } => "sequence:multiple-passes:set",
            Self::SetLargePadThreshold { .. } => "sequence:large-pad-threshold:set",
            Self::SetPassesPerLargePad { .. } => "sequence:passes-per-large-pad:set",
            Self::RequestState(s) => s.request_event(),
        }
    }

    /// Event the controller answers with, if this command is acknowledged.
    pub const fn ack_event(&self) -> Option<&'static str> {
        match self {
            Self::Jog { .. } => Some("axis:jog:ack"),
            Self::Home => Some("axis:home:ack"),
            Self::SavePosition => Some("axis:save:ack"),
            Self::ConfigureSpool(_) => Some("spool:config:response"),
            Self::ResetSpool => Some("spool:reset:response"),
            Self::TareSpool => Some("spool:tare:response"),
            Self::SetPreHeatDwell { .. } => Some("sequence:preheat-dwell:ack"),
            Self::SetCooling { .. } => Some("sequence:cooling:ack"),
            Self::SetFluxTiming { .. } => Some("sequence:flux-timing:ack"),
            Self::SetMultiplePasses { .. } => Some("sequence:multiple-passes:ack"),
            Self::SetLargePadThreshold { .. } => Some("sequence:large-pad-threshold:ack"),
            Self::SetPassesPerLargePad { .. } => Some("sequence:passes-per-large-pad:ack"),
            _ => None,
        }
    }

    /// In-flight class; only acknowledged commands have one.
    pub const fn class(&self) -> Option<CommandClass> {
        match self {
            Self::Jog { .. } | Self::Home | Self::SavePosition => Some(CommandClass::Motion),
            Self::ConfigureSpool(_) | Self::ResetSpool | Self::TareSpool => {
                Some(CommandClass::Spool)
            }
            Self::SetPreHeatDwell { .. } => Some(CommandClass::PreHeatDwell),
            Self::SetCooling { .. } => Some(CommandClass::Cooling),
            Self::SetFluxTiming { .. } => Some(CommandClass::FluxTiming),
            Self::SetMultiplePasses { .. } => Some(CommandClass::MultiplePasses),
            Self::SetLargePadThreshold { .. } => Some(CommandClass::LargePadThreshold),
            Self::SetPassesPerLargePad { .. } => Some(CommandClass::PassesPerLargePad),
            _ => None,
        }
    }

    /// JSON payload; `timestamp_ms` is wall-clock time for the commands that carry one.
    pub fn payload(&self, timestamp_ms: u64) -> Value {
        match self {
            Self::Jog { direction, step_mm } => json!({
                "axis": "z",
                "direction": direction.as_str(),
                "stepSize": step_mm,
                "timestamp": timestamp_ms,
            }),
            Self::Home | Self::SavePosition => json!({ "timestamp": timestamp_ms }),
            Self::SetTipTarget { target_c } => json!({
                "target": target_c,
                "unit": "C",
                "timestamp": timestamp_ms,
            }),
            Self::SetHeater { enabled } => json!({ "enabled": enabled, "timestamp": timestamp_ms }),
            Self::FeedWire {
                length_mm,
                diameter_mm,
                rate_mm_s,
            } => json!({
                "length": length_mm,
                "diameter": diameter_mm,
                "rate": rate_mm_s,
                "unit": "mm",
                "rateUnit": "mm/s",
                "timestamp": timestamp_ms,
            }),
            Self::ConfigureSpool(cfg) => serde_json::to_value(cfg).unwrap_or_else(|_| json!({})),
            Self::StartSequence { pads, options } => json!({
                "padPositions": pads,
                "options": options,
            }),
            Self::ResetSpool
            | Self::TareSpool
            | Self::StopSequence
            | Self::PauseSequence
            | Self::ResumeSequence => json!({}),
            Self::SetPreHeatDwell { time_ms } | Self::SetCooling { time_ms } => {
                json!({ "timeMs": time_ms })
            }
            Self::SetFluxTiming { enabled } | Self::SetMultiplePasses { enabled } => {
                json!({ "enabled": enabled })
            }
            Self::SetLargePadThreshold { threshold_mm2 } => {
                json!({ "thresholdMm2": threshold_mm2 })
            }
            Self::SetPassesPerLargePad { passes } => json!({ "passes": passes }),
            Self::RequestState(_) => json!({ "timestamp": timestamp_ms }),
        }
    }
}

// ── Inbound telemetry ──

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionPatch {
    pub z: Option<f64>,
    pub is_moving: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TipPatch {
    pub target: Option<f64>,
    pub heater: Option<bool>,
    pub status: Option<String>,
    pub current: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireFeedPatch {
    pub status: Option<String>,
    pub message: Option<String>,
    pub completed_at: Option<u64>,
    pub wire_break: Option<bool>,
}

impl WireFeedPatch {
    /// True when this status report ends a feed.
    pub fn is_completion(&self) -> bool {
        self.completed_at.is_some()
            || self
                .status
                .as_deref()
                .is_some_and(|s| matches!(s, "completed" | "complete" | "done"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireBreakPatch {
    pub detected: Option<bool>,
    pub timestamp: Option<u64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpoolPatch {
    pub wire_diameter_mm: Option<f64>,
    pub remaining_percentage: Option<f64>,
    pub remaining_length_mm: Option<f64>,
    pub is_feeding: Option<bool>,
    pub net_weight_g: Option<f64>,
    pub initial_weight_g: Option<f64>,
    pub is_tared: Option<bool>,
    pub last_cycle_wire_length_used_mm: Option<f64>,
    pub current_feed_rate_mm_per_s: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxPatch {
    /// First numeric of `value`, `percentage`, `level`.
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub volume: Option<f64>,
    pub message: Option<String>,
    pub updated_at: Option<u64>,
    pub forced: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanPatch {
    pub machine: Option<bool>,
    pub tip: Option<bool>,
}

/// Air and fume subsystems that are displayed but never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuxSubsystem {
    FumeExtractor,
    FluxMist,
    AirBreeze,
    AirJetPressure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Position(PositionPatch),
    TipStatus(TipPatch),
    WireFeedStatus(WireFeedPatch),
    WireBreak(WireBreakPatch),
    Spool(SpoolPatch),
    /// Firmware's own view of the sequence, kept for diagnostics.
    Sequence(Map<String, Value>),
    Flux(FluxPatch),
    Fan(FanPatch),
    Aux(AuxSubsystem, Map<String, Value>),
    Heartbeat { timestamp: Option<u64> },
}

/// Decode one inbound event. `None` for unknown names and for non-object
/// payloads, except the heartbeat, which counts whatever it carries.
pub fn decode(name: &str, payload: &Value) -> Option<TelemetryEvent> {
    if name == "arduino:data:received" && !payload.is_object() {
        return Some(TelemetryEvent::Heartbeat { timestamp: None });
    }
    let Some(obj) = payload.as_object() else {
        trace!(event = name, "non-object payload ignored");
        return None;
    };
    let f = Fields { event: name, obj };
    let ev = match name {
        "position:update" => TelemetryEvent::Position(PositionPatch {
            z: f.num("z"),
            is_moving: f.boolean("isMoving"),
        }),
        "tip:status" => TelemetryEvent::TipStatus(TipPatch {
            target: f.num("target"),
            heater: f.boolean("heater"),
            status: f.string("status"),
            current: f.num("current"),
        }),
        "wire:feed:status" => TelemetryEvent::WireFeedStatus(WireFeedPatch {
            status: f.string("status"),
            message: f.string("message"),
            completed_at: f.millis("completedAt"),
            wire_break: f.boolean("wireBreak"),
        }),
        "wire:break" => TelemetryEvent::WireBreak(WireBreakPatch {
            detected: f.boolean("detected"),
            timestamp: f.millis("timestamp"),
            message: f.string("message"),
        }),
        "spool:update" => TelemetryEvent::Spool(SpoolPatch {
            wire_diameter_mm: f.num_any(&["wireDiameterMm", "wireDiameter"]),
            remaining_percentage: f.num("remainingPercentage"),
            remaining_length_mm: f.num_any(&["remainingLengthMm", "remainingLength"]),
            is_feeding: f.boolean("isFeeding"),
            net_weight_g: f.num_any(&["netWeightG", "netWeight"]),
            initial_weight_g: f.num_any(&["initialWeightG", "initialWeight"]),
            is_tared: f.boolean("isTared"),
            last_cycle_wire_length_used_mm: f
                .num_any(&["lastCycleWireLengthUsedMm", "lastCycleWireLengthUsed"]),
            current_feed_rate_mm_per_s: f
                .num_any(&["currentFeedRateMmPerS", "currentFeedRate"]),
        }),
        "sequence:update" => TelemetryEvent::Sequence(obj.clone()),
        "flux:update" => TelemetryEvent::Flux(FluxPatch {
            value: f.num_any(&["value", "percentage", "level"]),
            unit: f.string("unit"),
            volume: f.num("volume"),
            message: f.string("message"),
            updated_at: f.millis("updatedAt"),
            forced: f.boolean("force").or_else(|| f.boolean("forced")) == Some(true),
        }),
        "fan:update" => TelemetryEvent::Fan(FanPatch {
            machine: f.boolean("machine"),
            tip: f.boolean("tip"),
        }),
        "fumeExtractor:update" => TelemetryEvent::Aux(AuxSubsystem::FumeExtractor, obj.clone()),
        "fluxMist:update" => TelemetryEvent::Aux(AuxSubsystem::FluxMist, obj.clone()),
        "airBreeze:update" => TelemetryEvent::Aux(AuxSubsystem::AirBreeze, obj.clone()),
        "airJetPressure:update" => TelemetryEvent::Aux(AuxSubsystem::AirJetPressure, obj.clone()),
        "arduino:data:received" => TelemetryEvent::Heartbeat {
            timestamp: f.millis("timestamp"),
        },
        _ => {
            trace!(event = name, "unknown event ignored");
            return None;
        }
    };
    Some(ev)
}

/// Field-by-field reader that drops (and traces) wrongly typed values.
struct Fields<'a> {
    event: &'a str,
    obj: &'a Map<String, Value>,
}

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn dropped(&self, key: &str, v: &Value) {
        trace!(event = self.event, field = key, value = %v, "malformed field dropped");
    }

    fn num(&self, key: &str) -> Option<f64> {
        let v = self.get(key)?;
        match v.as_f64().filter(|x| x.is_finite()) {
            Some(x) => Some(x),
            None => {
                self.dropped(key, v);
                None
            }
        }
    }

    /// First key holding a number; wrongly typed keys are skipped.
    fn num_any(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.num(k))
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        let v = self.get(key)?;
        v.as_bool().or_else(|| {
            self.dropped(key, v);
            None
        })
    }

    fn string(&self, key: &str) -> Option<String> {
        let v = self.get(key)?;
        match v.as_str() {
            Some(s) => Some(s.to_owned()),
            None => {
                self.dropped(key, v);
                None
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn millis(&self, key: &str) -> Option<u64> {
        let v = self.get(key)?;
        if let Some(n) = v.as_u64() {
            return Some(n);
        }
        match v.as_f64() {
            Some(x) if x.is_finite() && x >= 0.0 => Some(x as u64),
            _ => {
                self.dropped(key, v);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_acks_swap_set_for_ack() {
        let cmds = [
            Command::SetPreHeatDwell { time_ms: 1 },
            Command::SetCooling { time_ms: 1 },
            Command::SetFluxTiming { enabled: true },
            Command::SetMultiplePasses { enabled: true },
            Command::SetLargePadThreshold { threshold_mm2: 1.0 },
            Command::SetPassesPerLargePad { passes: 1 },
        ];
        for c in cmds {
            let expected = c.name().replace(":set", ":ack");
            assert_eq!(c.ack_event(), Some(expected.as_str()));
            assert!(c.class().is_some());
        }
    }

    #[test]
    fn notifications_have_no_class() {
        for c in [
            Command::StopSequence,
            Command::SetHeater { enabled: true },
            Command::RequestState(Subsystem::Flux),
        ] {
            assert!(c.ack_event().is_none());
            assert!(c.class().is_none());
        }
    }

    #[test]
    fn malformed_fields_are_dropped_individually() {
        let ev = decode(
            "tip:status",
            &json!({"target": "hot", "heater": true, "current": 301.5}),
        );
        assert_eq!(
            ev,
            Some(TelemetryEvent::TipStatus(TipPatch {
                target: None,
                heater: Some(true),
                status: None,
                current: Some(301.5),
            }))
        );
    }

    #[test]
    fn flux_value_falls_back_through_keys() {
        let Some(TelemetryEvent::Flux(p)) =
            decode("flux:update", &json!({"value": "n/a", "level": 42, "forced": true}))
        else {
            panic!("expected flux event");
        };
        assert_eq!(p.value, Some(42.0));
        assert!(p.forced);
    }

    #[test]
    fn non_objects_and_unknown_names_are_ignored() {
        assert!(decode("position:update", &json!([1, 2])).is_none());
        assert!(decode("position:update", &json!("z=3")).is_none());
        assert!(decode("laser:update", &json!({})).is_none());
    }

    #[test]
    fn heartbeat_ignores_payload_shape() {
        for payload in [Value::Null, json!(1_760_000_000_000_u64), json!("ping"), json!([])] {
            assert_eq!(
                decode("arduino:data:received", &payload),
                Some(TelemetryEvent::Heartbeat { timestamp: None }),
                "{payload}"
            );
        }
    }
}
