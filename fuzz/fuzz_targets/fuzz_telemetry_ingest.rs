#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use solder_core::mocks::RecordingTransport;
use solder_core::{ConsoleSession, PadJob};

const NAMES: &[&str] = &[
    "position:update",
    "tip:status",
    "wire:feed:status",
    "wire:break",
    "spool:update",
    "sequence:update",
    "flux:update",
    "fan:update",
    "fumeExtractor:update",
    "arduino:data:received",
    "axis:jog:ack",
    "axis:save:ack",
    "spool:tare:response",
    "sequence:cooling:ack",
];

#[derive(Arbitrary, Debug)]
struct Input {
    start_run: bool,
    events: Vec<(u8, String)>,
}

fuzz_target!(|input: Input| {
    let Ok(mut session) = ConsoleSession::builder()
        .with_transport(RecordingTransport::new())
        .build()
    else {
        return;
    };
    if input.start_run {
        let _ = session.start_sequence(vec![PadJob {
            label: "F1".into(),
            z_mm: -1.0,
            area_mm2: 4.0,
            wire_length_mm: 4.0,
            wire_diameter_mm: 0.8,
        }]);
    }
    for (idx, payload) in input.events.iter().take(64) {
        let name = NAMES[usize::from(*idx) % NAMES.len()];
        session.handle_event(name, payload);
        session.tick();
        let snap = session.snapshot();
        // Reconciled state stays inside its documented ranges.
        assert!(snap.position.z_mm <= 0.0);
        assert!((0.0..=100.0).contains(&snap.spool.remaining_percentage));
        assert!(serde_json::to_string(&snap).is_ok());
    }
});
