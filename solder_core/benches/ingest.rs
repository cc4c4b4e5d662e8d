use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use solder_core::ConsoleSession;
use solder_core::mocks::RecordingTransport;

// Mixed telemetry stream roughly shaped like a busy serial link.
fn synth_events(n: usize, seed: u32) -> Vec<(&'static str, String)> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        let r = next();
        let ev = match r % 6 {
            0 => ("position:update", format!(r#"{{"z": -{}.{}, "isMoving": {}}}"#, r % 20, r % 10, i % 2 == 0)),
            1 => ("tip:status", format!(r#"{{"current": {}, "heater": true}}"#, 300 + r % 60)),
            2 => ("flux:update", format!(r#"{{"percentage": {}}}"#, 40 + r % 5)),
            3 => ("spool:update", format!(r#"{{"remainingPercentage": {}, "netWeightG": {}}}"#, r % 100, r % 500)),
            4 => ("arduino:data:received", format!(r#"{{"timestamp": {i}}}"#)),
            _ => ("fumeExtractor:update", format!(r#"{{"speed": {}}}"#, r % 100)),
        };
        v.push(ev);
    }
    v
}

pub fn bench_ingest(c: &mut Criterion) {
    let mut g = c.benchmark_group("telemetry_ingest");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p solder_core --bench ingest
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for &n in &[1_000usize, 10_000] {
        let events = synth_events(n, 0xC0FFEE);
        g.bench_function(format!("handle_event_{n}"), |b| {
            b.iter_batched(
                || {
                    ConsoleSession::builder()
                        .with_transport(RecordingTransport::new())
                        .build()
                        .unwrap()
                },
                |mut s| {
                    for (name, payload) in &events {
                        s.handle_event(black_box(name), black_box(payload));
                    }
                    black_box(s.snapshot());
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(ingest, bench_ingest);
criterion_main!(ingest);
