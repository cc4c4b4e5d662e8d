use crossbeam_channel::Receiver;
use rstest::rstest;
use serde_json::Value;
use solder_hardware::{SimError, SimulatedController};
use solder_traits::{InboundEvent, Transport};

fn drain(rx: &Receiver<InboundEvent>) -> Vec<(String, Value)> {
    rx.try_iter()
        .map(|e| {
            let v = serde_json::from_str(&e.payload).expect("sim emits json");
            (e.name, v)
        })
        .collect()
}

fn names(events: &[(String, Value)]) -> Vec<&str> {
    events.iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn jog_acks_and_settles() {
    let (mut sim, rx) = SimulatedController::with_channel();
    sim.send("axis:jog", r#"{"axis":"z","direction":"down","stepSize":2.5}"#)
        .unwrap();
    let evs = drain(&rx);
    assert_eq!(
        names(&evs),
        vec![
            "position:update",
            "axis:jog:ack",
            "position:update",
            "arduino:data:received"
        ]
    );
    assert_eq!(evs[2].1["z"], -2.5);
    assert_eq!(evs[2].1["isMoving"], false);

    // Up never goes above home.
    sim.send("axis:jog", r#"{"direction":"up","stepSize":10}"#)
        .unwrap();
    assert_eq!(sim.handle().z_mm(), 0.0);
}

#[test]
fn save_ack_reports_current_height() {
    let (mut sim, rx) = SimulatedController::with_channel();
    sim.send("axis:jog", r#"{"direction":"down","stepSize":4}"#)
        .unwrap();
    drain(&rx);
    sim.send("axis:save", "{}").unwrap();
    let evs = drain(&rx);
    assert_eq!(evs[0].0, "axis:save:ack");
    assert_eq!(evs[0].1["z"], -4.0);
}

#[test]
fn disconnected_sim_refuses_sends() {
    let (mut sim, rx) = SimulatedController::with_channel();
    sim.handle().set_connected(false);
    assert!(!sim.is_connected());
    let err = sim.send("axis:home", "{}").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::Disconnected)
    ));
    assert!(rx.is_empty());
}

#[test]
fn feed_consumes_spool() {
    let (sim, rx) = SimulatedController::with_channel();
    let mut sim = sim.with_spool(1_000.0, 500.0);
    sim.send("wire:feed:start", r#"{"length":100,"rate":5}"#)
        .unwrap();
    let evs = drain(&rx);
    let spool = &evs.iter().find(|(n, _)| n == "spool:update").unwrap().1;
    assert_eq!(spool["remainingPercentage"], 40.0);
    assert_eq!(spool["lastCycleWireLengthUsedMm"], 100.0);
    let last_status = evs
        .iter()
        .rev()
        .find(|(n, _)| n == "wire:feed:status")
        .unwrap();
    assert_eq!(last_status.1["status"], "completed");
    assert_eq!(sim.handle().remaining_length_mm(), 400.0);
}

#[test]
fn configured_feed_breaks_the_wire() {
    let (mut sim, rx) = SimulatedController::with_channel();
    sim.handle().break_on_feed(2);
    sim.send("wire:feed:start", r#"{"length":1}"#).unwrap();
    assert!(!names(&drain(&rx)).contains(&"wire:break"));

    sim.send("wire:feed:start", r#"{"length":1}"#).unwrap();
    let evs = drain(&rx);
    assert!(!evs.iter().any(|(_, v)| v["status"] == "completed"));
    let (_, brk) = evs.iter().find(|(n, _)| n == "wire:break").unwrap();
    assert_eq!(brk["detected"], true);
    assert_eq!(brk["message"], "wire break during feed 2");
}

#[test]
fn injected_break_arrives_without_a_command() {
    let (sim, rx) = SimulatedController::with_channel();
    sim.handle().inject_wire_break("tension lost");
    let evs = drain(&rx);
    assert_eq!(names(&evs), vec!["wire:break"]);
}

#[rstest]
#[case("sequence:cooling:set", r#"{"timeMs":1200}"#, "sequence:cooling:ack")]
#[case("sequence:multiple-passes:set", r#"{"enabled":true}"#, "sequence:multiple-passes:ack")]
#[case("spool:tare", "{}", "spool:tare:response")]
#[case("spool:reset", "{}", "spool:reset:response")]
#[case("spool:config:set", r#"{"wireDiameterMm":0.5}"#, "spool:config:response")]
#[case("tip:target:set", r#"{"target":350,"unit":"C"}"#, "tip:status")]
#[case("position:state:request", "{}", "position:update")]
fn commands_get_their_reply(#[case] cmd: &str, #[case] payload: &str, #[case] reply: &str) {
    let (mut sim, rx) = SimulatedController::with_channel();
    sim.send(cmd, payload).unwrap();
    let evs = drain(&rx);
    assert_eq!(evs[0].0, reply, "replies to {cmd}: {:?}", names(&evs));
}

#[rstest]
#[case("laser:fire", "{}")]
#[case("axis:jog", r#"{"direction":"sideways","stepSize":1}"#)]
#[case("tip:target:set", "{}")]
#[case("axis:home", "not json")]
fn bad_commands_are_errors(#[case] cmd: &str, #[case] payload: &str) {
    let (mut sim, rx) = SimulatedController::with_channel();
    let err = sim.send(cmd, payload).unwrap_err();
    assert!(err.downcast_ref::<SimError>().is_some(), "{err}");
    assert!(rx.is_empty());
}
