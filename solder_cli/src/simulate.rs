//! Sequence runs and link checks against the loopback controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use eyre::{Result, WrapErr, eyre};
use serde_json::json;
use solder_core::sequence::HaltReason;
use solder_core::{
    CommandClass, ConsoleCfg, ConsoleError, ConsoleSession, LinkState, PadJob, PadPlan,
    SequenceEffect, Stage, Subsystem,
};
use solder_hardware::SimulatedController;

use crate::error_fmt::Interrupted;

const POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub pads: usize,
    pub last_label: Option<String>,
    pub elapsed_ms: u64,
    pub wire_used_mm: f64,
}

/// 1-based feed number that dispenses the first pass of pad `pad` (1-based).
fn feed_index_for_pad(cfg: &ConsoleCfg, pads: &[(PadJob, PadPlan)], pad: usize) -> Result<u32> {
    if pad == 0 || pad > pads.len() {
        return Err(ConsoleError::InvalidInput(format!(
            "--inject-wire-break-at-pad must be within 1..={}, got {pad}",
            pads.len()
        ))
        .into());
    }
    let before: u32 = pads[..pad - 1]
        .iter()
        .map(|(job, _)| cfg.sequence.passes_for(job.area_mm2))
        .sum();
    Ok(before + 1)
}

pub fn run_sequence(
    cfg: ConsoleCfg,
    pads: &[(PadJob, PadPlan)],
    break_at_pad: Option<usize>,
    timeout: Duration,
    shutdown: &AtomicBool,
    json_mode: bool,
) -> Result<RunSummary> {
    let (sim, rx) = SimulatedController::with_channel();
    let handle = sim.handle();
    if let Some(pad) = break_at_pad {
        let feed = feed_index_for_pad(&cfg, pads, pad)?;
        tracing::info!(pad, feed, "wire break armed");
        handle.break_on_feed(feed);
    }
    let (fx_tx, fx_rx) = crossbeam_channel::unbounded();
    let mut session = ConsoleSession::builder()
        .with_transport(sim)
        .with_inbound(rx)
        .with_effect_sink(fx_tx)
        .with_config(cfg)
        .build()
        .wrap_err("assemble console session")?;

    let jobs: Vec<PadJob> = pads.iter().map(|(job, _)| job.clone()).collect();
    let wire_used_mm: f64 = jobs
        .iter()
        .map(|j| j.wire_length_mm * f64::from(session.config().sequence.passes_for(j.area_mm2)))
        .sum();
    let started = Instant::now();
    session.start_sequence(jobs)?;

    loop {
        session.pump();
        report_effects(&fx_rx, pads, json_mode);

        let state = session.sequence_state();
        if state.stage == Stage::Error {
            let msg = state
                .error_message
                .clone()
                .unwrap_or_else(|| "sequence error".into());
            return Err(ConsoleError::HardwareFault(msg).into());
        }
        if state.stage == Stage::Idle && !state.is_active {
            return Ok(RunSummary {
                pads: pads.len(),
                last_label: state.last_completed_label.clone(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                wire_used_mm,
            });
        }
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!("interrupted; stopping sequence");
            let _ = session.stop_sequence();
            report_effects(&fx_rx, pads, json_mode);
            return Err(Interrupted.into());
        }
        if started.elapsed() > timeout {
            let _ = session.stop_sequence();
            return Err(eyre!(
                "sequence did not finish within {} ms (stage {:?})",
                timeout.as_millis(),
                session.sequence_state().stage
            ));
        }
        std::thread::sleep(POLL);
    }
}

fn report_effects(fx: &Receiver<SequenceEffect>, pads: &[(PadJob, PadPlan)], json_mode: bool) {
    let label_of = |pad: usize| pads.get(pad).map_or("?", |(job, _)| job.label.as_str());
    for effect in fx.try_iter() {
        match effect {
            SequenceEffect::StageEntered { stage, pad, pass } => {
                if json_mode {
                    println!(
                        "{}",
                        json!({"event": "stage", "stage": stage, "pad": pad + 1, "label": label_of(pad), "pass": pass + 1})
                    );
                } else {
                    println!(
                        "[pad {}/{} {} pass {}] {stage:?}",
                        pad + 1,
                        pads.len(),
                        label_of(pad),
                        pass + 1
                    );
                }
            }
            SequenceEffect::PadFinished { label, .. } if !json_mode => {
                println!("pad {label} done");
            }
            SequenceEffect::Halted(HaltReason::Fault(msg)) => {
                if json_mode {
                    println!("{}", json!({"event": "halted", "message": msg}));
                } else {
                    println!("sequence halted: {msg}");
                }
            }
            _ => {}
        }
    }
}

pub fn print_summary(summary: &RunSummary, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "event": "complete",
                "pads": summary.pads,
                "lastLabel": summary.last_label,
                "elapsedMs": summary.elapsed_ms,
                "wireUsedMm": summary.wire_used_mm,
            })
        );
    } else {
        println!(
            "sequence complete: {} pad(s), last {}, {:.2} mm wire, {} ms",
            summary.pads,
            summary.last_label.as_deref().unwrap_or("-"),
            summary.wire_used_mm,
            summary.elapsed_ms
        );
    }
}

/// Home the simulated axis and ask for position; the link must stream and ack.
pub fn self_check(cfg: ConsoleCfg) -> Result<LinkState> {
    let (sim, rx) = SimulatedController::with_channel();
    let mut session = ConsoleSession::builder()
        .with_transport(sim)
        .with_inbound(rx)
        .with_config(cfg)
        .build()
        .wrap_err("assemble console session")?;
    session.home().wrap_err("home axis")?;
    session
        .request_state(Subsystem::Position)
        .wrap_err("request position")?;
    session.pump();
    if session.is_in_flight(CommandClass::Motion) {
        eyre::bail!("simulated controller did not acknowledge axis:home");
    }
    let link = session.link_state();
    if link != LinkState::Streaming {
        eyre::bail!("simulated link is {link:?}, expected streaming");
    }
    tracing::info!(?link, "self-check passed");
    Ok(link)
}
