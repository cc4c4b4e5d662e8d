use serde_json::{Value, json};
use solder_core::mocks::{FailingTransport, RecordingTransport};
use solder_core::{
    CommandClass, ConsoleCfg, ConsoleError, ConsoleSession, JogDirection, LinkState, PadGeometry,
    PadJob, SequenceConfig, SequenceEffect, Stage,
};
use solder_traits::InboundEvent;
use solder_traits::clock::test_clock::TestClock;

fn session_with(
    cfg: ConsoleCfg,
) -> (ConsoleSession<RecordingTransport>, RecordingTransport, TestClock) {
    let t = RecordingTransport::new();
    let clock = TestClock::new();
    let s = ConsoleSession::builder()
        .with_transport(t.clone())
        .with_clock(clock.clone())
        .with_config(cfg)
        .build()
        .expect("valid config");
    (s, t, clock)
}

fn session() -> (ConsoleSession<RecordingTransport>, RecordingTransport, TestClock) {
    session_with(ConsoleCfg::default())
}

fn pad(label: &str, z_mm: f64) -> PadJob {
    PadJob {
        label: label.into(),
        z_mm,
        area_mm2: 4.0,
        wire_length_mm: 3.98,
        wire_diameter_mm: 0.8,
    }
}

fn payload_of(t: &RecordingTransport, name: &str) -> Value {
    let (_, p) = t
        .sent()
        .into_iter()
        .rev()
        .find(|(n, _)| n == name)
        .unwrap_or_else(|| panic!("{name} not sent; sent: {:?}", t.sent_names()));
    serde_json::from_str(&p).unwrap()
}

#[test]
fn full_run_turns_effects_into_commands() {
    let (mut s, t, clock) = session();
    s.start_sequence(vec![pad("J1", -5.0)]).unwrap();
    assert_eq!(t.sent_names(), vec!["sequence:start"]);
    let start = payload_of(&t, "sequence:start");
    assert_eq!(start["padPositions"][0]["label"], "J1");
    assert_eq!(start["options"]["coolingMs"], 3000);
    assert_eq!(s.sequence_state().stage, Stage::FluxApplication);

    clock.advance_ms(500);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Positioning);
    let jog = payload_of(&t, "axis:jog");
    assert_eq!(jog["direction"], "down");
    assert_eq!(jog["stepSize"], 5.0);
    assert!(s.is_in_flight(CommandClass::Motion));

    s.handle_event("axis:jog:ack", "{}");
    assert!(!s.is_in_flight(CommandClass::Motion));
    s.handle_event("position:update", r#"{"z": -5.0, "isMoving": false}"#);
    assert_eq!(s.sequence_state().stage, Stage::PreHeatDwell);

    clock.advance_ms(2_000);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Dispense);
    let feed = payload_of(&t, "wire:feed:start");
    assert_eq!(feed["length"], 3.98);
    assert_eq!(feed["rate"], 5.0);
    assert_eq!(feed["rateUnit"], "mm/s");

    s.handle_event("wire:feed:status", r#"{"status": "completed"}"#);
    assert_eq!(s.sequence_state().stage, Stage::Cooling);

    clock.advance_ms(3_000);
    s.tick();
    let st = s.sequence_state();
    assert_eq!(st.stage, Stage::Idle);
    assert_eq!(st.progress_percent, 100);
    assert_eq!(st.last_completed_label.as_deref(), Some("J1"));
}

#[test]
fn pad_at_current_height_skips_the_jog() {
    let (mut s, t, clock) = session();
    s.start_sequence(vec![pad("home", 0.0)]).unwrap();
    clock.advance_ms(500);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::PreHeatDwell);
    assert!(!t.sent_names().iter().any(|n| n == "axis:jog"));
}

#[test]
fn wire_break_during_run_forces_error() {
    let (mut s, t, _clock) = session();
    s.start_sequence(vec![pad("J1", -1.0)]).unwrap();
    s.handle_event(
        "wire:break",
        r#"{"detected": true, "timestamp": 42, "message": "no tension"}"#,
    );
    let snap = s.snapshot();
    assert_eq!(snap.sequence.stage, Stage::Error);
    assert_eq!(
        snap.sequence.error_message.as_deref(),
        Some("wire break: no tension")
    );
    assert!(snap.wire_break.detected);
    assert_eq!(t.sent_names().last().map(String::as_str), Some("sequence:stop"));

    // A latched break blocks a new run until dismissed.
    s.stop_sequence().unwrap();
    assert!(matches!(
        s.start_sequence(vec![pad("J1", -1.0)]),
        Err(ConsoleError::HardwareFault(_))
    ));
    assert!(s.dismiss_wire_break());
    s.start_sequence(vec![pad("J1", -1.0)]).unwrap();
}

#[test]
fn serial_disconnect_during_run_forces_error() {
    let (mut s, t, _clock) = session();
    s.start_sequence(vec![pad("J1", -1.0)]).unwrap();
    t.set_connected(false);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Error);
    assert_eq!(s.link_state(), LinkState::Disconnected);
    s.dismiss_error().unwrap();
    assert_eq!(s.sequence_state().stage, Stage::Idle);
}

#[test]
fn empty_pad_list_uses_saved_position() {
    let (mut s, _t, _clock) = session();
    assert!(matches!(
        s.start_sequence(vec![]),
        Err(ConsoleError::InvalidInput(_))
    ));

    s.set_pad_geometry(PadGeometry::Square { side: 2.0 }).unwrap();
    s.save_position().unwrap();
    s.handle_event("axis:save:ack", r#"{"z": -6.5}"#);
    assert_eq!(s.snapshot().saved_z_mm, Some(-6.5));

    s.start_sequence(vec![]).unwrap();
    let st = s.sequence_state();
    assert_eq!(st.total_pads, 1);
    assert!(st.is_active);
}

#[test]
fn start_while_running_is_busy() {
    let (mut s, _t, _clock) = session();
    s.start_sequence(vec![pad("a", -1.0)]).unwrap();
    assert_eq!(s.start_sequence(vec![]), Err(ConsoleError::SequenceBusy));
}

#[test]
fn sequence_config_batch_sends_one_command_per_field() {
    let (mut s, t, _clock) = session();
    let cfg = SequenceConfig {
        cooling_ms: 1_500,
        multiple_passes_enabled: true,
        ..SequenceConfig::default()
    };
    s.apply_sequence_config(cfg).unwrap();
    assert_eq!(
        t.sent_names(),
        vec![
            "sequence:preheat-dwell:set",
            "sequence:cooling:set",
            "sequence:flux-timing:set",
            "sequence:multiple-passes:set",
            "sequence:large-pad-threshold:set",
            "sequence:passes-per-large-pad:set",
        ]
    );
    assert_eq!(payload_of(&t, "sequence:cooling:set")["timeMs"], 1_500);
    assert_eq!(s.snapshot().sequence_config, cfg);

    // Unacknowledged batch blocks the next one.
    assert_eq!(
        s.apply_sequence_config(SequenceConfig::default()),
        Err(ConsoleError::CommandInFlight(CommandClass::PreHeatDwell))
    );
    for ack in [
        "sequence:preheat-dwell:ack",
        "sequence:cooling:ack",
        "sequence:flux-timing:ack",
        "sequence:multiple-passes:ack",
        "sequence:large-pad-threshold:ack",
        "sequence:passes-per-large-pad:ack",
    ] {
        s.handle_event(ack, "{}");
    }
    assert!(s.snapshot().pending_commands.is_empty());

    s.start_sequence(vec![pad("a", -1.0)]).unwrap();
    assert_eq!(
        s.apply_sequence_config(SequenceConfig::default()),
        Err(ConsoleError::SequenceBusy)
    );
    assert_eq!(s.snapshot().sequence_config, cfg);
}

#[test]
fn manual_motion_is_refused_during_a_run() {
    let (mut s, _t, _clock) = session();
    s.start_sequence(vec![pad("a", -1.0)]).unwrap();
    assert!(matches!(
        s.jog(JogDirection::Up, 1.0),
        Err(ConsoleError::InvalidState(_))
    ));
    assert!(matches!(s.feed_wire(2.0), Err(ConsoleError::InvalidState(_))));
}

#[test]
fn commands_without_transport_record_a_status() {
    let mut s = ConsoleSession::builder().build().unwrap();
    assert_eq!(s.home(), Err(ConsoleError::TransportUnavailable));
    assert!(s.status_message().unwrap().contains("axis:home dropped"));
    assert_eq!(s.link_state(), LinkState::Disconnected);
    assert_eq!(
        s.start_sequence(vec![pad("a", -1.0)]),
        Err(ConsoleError::TransportUnavailable)
    );
}

#[test]
fn suggested_temperature_is_sent_on_request_only() {
    let (mut s, t, _clock) = session();
    assert!(matches!(
        s.apply_suggested_temperature(),
        Err(ConsoleError::InvalidState(_))
    ));
    let plan = s
        .set_pad_geometry(PadGeometry::Rectangle {
            length: 5.0,
            width: 2.0,
        })
        .unwrap();
    assert!(t.sent().is_empty(), "calculator edits never send");
    let applied = s.apply_suggested_temperature().unwrap();
    assert_eq!(Some(applied), plan.thermal.compensated_temp_c);
    assert_eq!(applied, 351);
    let p = payload_of(&t, "tip:target:set");
    assert_eq!(p["target"], 351.0);
    assert_eq!(p["unit"], "C");
}

#[test]
fn spool_commands_update_optimistically() {
    let (mut s, t, _clock) = session();
    s.handle_event("spool:update", r#"{"remainingPercentage": 40, "netWeightG": 200}"#);
    s.tare_spool().unwrap();
    assert!(s.snapshot().spool.is_tared);
    assert_eq!(
        s.reset_spool(),
        Err(ConsoleError::CommandInFlight(CommandClass::Spool))
    );
    s.handle_event("spool:tare:response", r#"{"ok": true}"#);
    s.reset_spool().unwrap();
    let snap = s.snapshot();
    assert_eq!(snap.spool.remaining_percentage, 100.0);
    assert!(!snap.spool.is_tared);
    assert_eq!(t.sent_names(), vec!["spool:tare", "spool:reset"]);
}

#[test]
fn pump_drains_inbound_in_order() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TestClock::new();
    let t = RecordingTransport::new();
    let mut s = ConsoleSession::builder()
        .with_transport(t)
        .with_clock(clock.clone())
        .with_inbound(rx)
        .build()
        .unwrap();
    tx.send(InboundEvent::new("position:update", r#"{"z": -2.0}"#))
        .unwrap();
    tx.send(InboundEvent::new("position:update", r#"{"z": 3.0}"#))
        .unwrap();
    tx.send(InboundEvent::new("arduino:data:received", "{}"))
        .unwrap();
    tx.send(InboundEvent::new("flux:update", "not json")).unwrap();
    assert_eq!(s.pump(), 4);
    assert_eq!(s.snapshot().position.z_mm, 0.0);
    assert_eq!(s.link_state(), LinkState::Streaming);

    clock.advance_ms(2_000);
    assert_eq!(s.link_state(), LinkState::Connected);
}

#[test]
fn snapshot_serializes_camel_case() {
    let (mut s, _t, _clock) = session();
    s.set_pad_geometry(PadGeometry::Circle { radius: 1.0 }).unwrap();
    s.handle_event("fluxMist:update", r#"{"enabled": true}"#);
    let v = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(v["link"], "connected");
    assert_eq!(v["sequence"]["stage"], "idle");
    assert_eq!(v["spoolAlert"], "none");
    assert_eq!(v["padPlan"]["geometry"]["shape"], "circle");
    assert_eq!(v["aux"]["fluxMist"], json!({"enabled": true}));
}

#[test]
fn effect_sink_sees_every_stage() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TestClock::new();
    let cfg = ConsoleCfg {
        sequence: SequenceConfig {
            pre_heat_dwell_ms: 0,
            cooling_ms: 0,
            flux_application_ms: 0,
            ..SequenceConfig::default()
        },
        ..ConsoleCfg::default()
    };
    let mut s = ConsoleSession::builder()
        .with_transport(RecordingTransport::new())
        .with_clock(clock)
        .with_config(cfg)
        .with_effect_sink(tx)
        .build()
        .unwrap();
    s.start_sequence(vec![pad("home", 0.0)]).unwrap();
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::PreHeatDwell);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Dispense);
    s.handle_event("wire:feed:status", r#"{"status": "completed"}"#);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Idle);

    let stages: Vec<Stage> = rx
        .try_iter()
        .filter_map(|e| match e {
            SequenceEffect::StageEntered { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::FluxApplication,
            Stage::Positioning,
            Stage::PreHeatDwell,
            Stage::Dispense,
            Stage::Cooling,
        ]
    );
}

fn fast_cfg() -> ConsoleCfg {
    ConsoleCfg {
        sequence: SequenceConfig {
            pre_heat_dwell_ms: 0,
            cooling_ms: 0,
            flux_application_ms: 0,
            ..SequenceConfig::default()
        },
        ..ConsoleCfg::default()
    }
}

fn jogs(t: &RecordingTransport) -> Vec<Value> {
    t.sent()
        .into_iter()
        .filter(|(n, _)| n == "axis:jog")
        .map(|(_, p)| serde_json::from_str(&p).unwrap())
        .collect()
}

#[test]
fn start_waits_for_operator_jog_to_land() {
    let (mut s, t, clock) = session();
    s.jog(JogDirection::Down, 1.0).unwrap();
    assert_eq!(
        s.start_sequence(vec![pad("J1", -5.0)]),
        Err(ConsoleError::CommandInFlight(CommandClass::Motion))
    );
    assert!(!s.sequence_state().is_active);
    assert!(s.status_message().unwrap().contains("not started"));

    s.handle_event("axis:jog:ack", "{}");
    s.handle_event("position:update", r#"{"z": -1.0, "isMoving": false}"#);
    s.start_sequence(vec![pad("J1", -5.0)]).unwrap();
    clock.advance_ms(500);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Positioning);
    let sent = jogs(&t);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["direction"], "down");
    assert_eq!(sent[1]["stepSize"], 4.0);

    s.handle_event("axis:jog:ack", "{}");
    s.handle_event("position:update", r#"{"z": -5.0, "isMoving": false}"#);
    assert_eq!(s.sequence_state().stage, Stage::PreHeatDwell);
}

#[test]
fn positioning_move_deferred_behind_unacked_jog_is_reissued() {
    let (mut s, t, _clock) = session_with(fast_cfg());
    s.start_sequence(vec![pad("J1", -5.0), pad("J2", -6.0)]).unwrap();
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Positioning);
    assert_eq!(jogs(&t).len(), 1);

    // Position lands before the controller acknowledges the jog.
    s.handle_event("position:update", r#"{"z": -5.0, "isMoving": false}"#);
    s.tick();
    assert_eq!(s.sequence_state().stage, Stage::Dispense);
    s.handle_event("wire:feed:status", r#"{"status": "completed"}"#);
    for _ in 0..5 {
        if s.sequence_state().current_pad == 1 && s.sequence_state().stage == Stage::Positioning {
            break;
        }
        s.tick();
    }
    assert_eq!(s.sequence_state().current_pad, 1);
    assert_eq!(s.sequence_state().stage, Stage::Positioning);
    assert_eq!(jogs(&t).len(), 1, "second move waits for the first ack");

    s.handle_event("axis:jog:ack", "{}");
    let sent = jogs(&t);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["stepSize"], 1.0);

    s.handle_event("axis:jog:ack", "{}");
    s.handle_event("position:update", r#"{"z": -6.0, "isMoving": false}"#);
    assert_eq!(s.sequence_state().stage, Stage::PreHeatDwell);
}

#[test]
fn heartbeat_counts_whatever_the_payload() {
    for payload in ["", "null", "1760000000000", "{}"] {
        let (mut s, _t, clock) = session();
        clock.advance_ms(5_000);
        assert_eq!(s.link_state(), LinkState::Connected);
        s.handle_event("arduino:data:received", payload);
        assert_eq!(s.link_state(), LinkState::Streaming, "payload {payload:?}");
    }
}

#[test]
fn failed_config_send_keeps_previous_config() {
    let mut s = ConsoleSession::builder()
        .with_transport(FailingTransport("io error"))
        .build()
        .unwrap();
    let before = s.snapshot().sequence_config;
    let cfg = SequenceConfig {
        cooling_ms: 9_999,
        ..SequenceConfig::default()
    };
    assert!(matches!(
        s.apply_sequence_config(cfg),
        Err(ConsoleError::Transport(_))
    ));
    assert_eq!(s.snapshot().sequence_config, before);
    assert!(s.status_message().unwrap().contains("not applied"));
    assert!(s.snapshot().pending_commands.is_empty());
}

#[test]
fn config_batch_without_link_records_a_status() {
    let (mut s, t, _clock) = session();
    t.set_connected(false);
    assert_eq!(
        s.apply_sequence_config(SequenceConfig::default()),
        Err(ConsoleError::TransportUnavailable)
    );
    assert!(s.status_message().unwrap().contains("not connected"));
}

#[test]
fn save_ack_without_z_uses_reported_position() {
    let (mut s, _t, _clock) = session();
    s.handle_event("position:update", r#"{"z": -3.25, "isMoving": false}"#);
    s.save_position().unwrap();
    s.handle_event("axis:save:ack", "not json");
    assert_eq!(s.snapshot().saved_z_mm, Some(-3.25));
    assert!(!s.is_in_flight(CommandClass::Motion));
}
