//! The console session: single owner of every piece of console state.
//!
//! Inbound telemetry is reconciled, routed to the orchestrator, and the
//! resulting effects are turned into outbound commands. Operator actions go
//! through the same dispatcher, so the per-class in-flight guard applies to
//! manual and automatic commands alike. Readers get a [`ConsoleSnapshot`].

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use serde_json::{Map, Value};
use solder_traits::{Clock, InboundEvent, MonotonicClock, Transport};
use tracing::{debug, info, trace, warn};

use crate::config::ConsoleCfg;
use crate::dispatch::Dispatcher;
use crate::error::{ConsoleError, ConsoleResult, Result};
use crate::events::{self, AuxSubsystem, Command, CommandClass, JogDirection, SpoolConfig, Subsystem};
use crate::geometry::{PadCalculator, PadGeometry, PadPlan};
use crate::sequence::{
    HaltReason, Orchestrator, PadJob, SequenceConfig, SequenceEffect, SequenceState, Stage,
};
use crate::telemetry::{
    FanState, FluxState, LinkState, PositionState, SpoolAlert, SpoolState, Telemetry, TipState,
    WireBreakFault, WireFeedState,
};
use crate::util::{is_positive, unix_millis};

/// Boxed transport used when the concrete link type is chosen at runtime.
pub type DynTransport = Box<dyn Transport + Send>;

/// Label of the pad synthesized from the saved position.
pub const SAVED_POSITION_LABEL: &str = "saved position";

/// Read-only copy of everything the session owns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSnapshot {
    pub link: LinkState,
    pub position: PositionState,
    pub saved_z_mm: Option<f64>,
    pub tip: TipState,
    pub spool: SpoolState,
    pub spool_alert: SpoolAlert,
    pub flux: FluxState,
    pub fans: FanState,
    pub aux: BTreeMap<AuxSubsystem, Map<String, Value>>,
    pub wire_feed: WireFeedState,
    pub wire_break: WireBreakFault,
    pub sequence: SequenceState,
    pub sequence_config: SequenceConfig,
    pub firmware_sequence: Map<String, Value>,
    pub pad_plan: Option<PadPlan>,
    pub pending_commands: Vec<CommandClass>,
    pub status_message: Option<String>,
}

pub struct ConsoleSession<T: Transport = DynTransport> {
    transport: Option<T>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    inbound: Option<Receiver<InboundEvent>>,
    effects: Option<Sender<SequenceEffect>>,
    cfg: ConsoleCfg,
    calculator: PadCalculator,
    telemetry: Telemetry,
    orchestrator: Orchestrator,
    dispatcher: Dispatcher,
    saved_z_mm: Option<f64>,
    /// Pad height still to be reached once the outstanding move has settled.
    owed_z_mm: Option<f64>,
    /// A position report arrived after the last motion command went out.
    position_since_motion: bool,
    was_connected: bool,
    status_message: Option<String>,
}

impl<T: Transport> core::fmt::Debug for ConsoleSession<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("has_transport", &self.transport.is_some())
            .field("stage", &self.orchestrator.state().stage)
            .field("pending", &self.dispatcher.in_flight_classes())
            .finish_non_exhaustive()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

pub struct ConsoleSessionBuilder<T: Transport = DynTransport> {
    transport: Option<T>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    inbound: Option<Receiver<InboundEvent>>,
    effects: Option<Sender<SequenceEffect>>,
    config: ConsoleCfg,
}

impl Default for ConsoleSessionBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            clock: None,
            inbound: None,
            effects: None,
            config: ConsoleCfg::default(),
        }
    }
}

impl ConsoleSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Transport> ConsoleSessionBuilder<T> {
    /// Bind the outbound link. A session without one still calculates and
    /// reconciles, but every command fails with `TransportUnavailable`.
    pub fn with_transport<U: Transport>(self, transport: U) -> ConsoleSessionBuilder<U> {
        ConsoleSessionBuilder {
            transport: Some(transport),
            clock: self.clock,
            inbound: self.inbound,
            effects: self.effects,
            config: self.config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Queue drained by [`ConsoleSession::pump`].
    pub fn with_inbound(mut self, rx: Receiver<InboundEvent>) -> Self {
        self.inbound = Some(rx);
        self
    }

    /// Copy of every sequence effect as the session executes it.
    pub fn with_effect_sink(mut self, tx: Sender<SequenceEffect>) -> Self {
        self.effects = Some(tx);
        self
    }

    pub fn with_config(mut self, config: ConsoleCfg) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ConsoleSession<T>> {
        self.config.validate().map_err(eyre::Report::new)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let cfg = self.config;
        let was_connected = self.transport.as_ref().is_some_and(Transport::is_connected);
        Ok(ConsoleSession {
            transport: self.transport,
            epoch: clock.now(),
            clock,
            inbound: self.inbound,
            effects: self.effects,
            calculator: PadCalculator::new(cfg.wire.diameter_mm, cfg.wire.steps_per_mm, cfg.thermal),
            telemetry: Telemetry::new(&cfg.telemetry, &cfg.spool, cfg.wire.diameter_mm),
            orchestrator: Orchestrator::new(cfg.sequence, cfg.telemetry.z_tolerance_mm),
            dispatcher: Dispatcher::new(),
            saved_z_mm: None,
            owed_z_mm: None,
            position_since_motion: true,
            was_connected,
            status_message: None,
            cfg,
        })
    }
}

impl ConsoleSession {
    pub fn builder() -> ConsoleSessionBuilder {
        ConsoleSessionBuilder::default()
    }
}

impl<T: Transport> ConsoleSession<T> {
    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn config(&self) -> &ConsoleCfg {
        &self.cfg
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn sequence_state(&self) -> &SequenceState {
        self.orchestrator.state()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn link_state(&self) -> LinkState {
        let connected = self.transport.as_ref().is_some_and(Transport::is_connected);
        self.telemetry.link_state(connected, self.now_ms())
    }

    pub fn is_in_flight(&self, class: CommandClass) -> bool {
        self.dispatcher.is_in_flight(class)
    }

    /// Drop outstanding commands of `class` that will never be acknowledged.
    pub fn abandon_pending(&mut self, class: CommandClass) -> usize {
        self.dispatcher.abandon(class)
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    /// Apply one inbound event. Malformed payloads are ignored.
    pub fn handle_event(&mut self, name: &str, payload_json: &str) {
        let payload: Value = serde_json::from_str(payload_json).unwrap_or_else(|e| {
            trace!(event = name, error = %e, "payload is not JSON");
            Value::Null
        });
        let now = self.now_ms();

        if let Some(ack) = self.dispatcher.acknowledge(name, now) {
            if name == "axis:save:ack" {
                let z = match payload.get("z").and_then(Value::as_f64) {
                    Some(z) if z.is_finite() => z.min(0.0),
                    _ => {
                        let z = self.telemetry.position.z_mm;
                        debug!(z_mm = z, "axis:save:ack without z; using reported position");
                        z
                    }
                };
                self.saved_z_mm = Some(z);
                info!(z_mm = z, "position saved");
            }
            self.status_message = Some(format!("{} acknowledged", ack.name));
            if ack.class == CommandClass::Motion {
                self.settle_owed_move();
            }
            return;
        }

        let Some(ev) = events::decode(name, &payload) else {
            return;
        };
        let r = self.telemetry.apply(&ev, now);
        let mut fx = Vec::new();
        if r.wire_break_detected {
            let msg = self
                .telemetry
                .wire_break
                .message
                .clone()
                .unwrap_or_else(|| "wire break".into());
            self.status_message = Some(format!("wire break: {msg}"));
            fx.extend(self.orchestrator.fault(format!("wire break: {msg}")));
        }
        if r.feed_completed {
            fx.extend(self.orchestrator.on_dispense_complete(now));
        }
        if let Some(p) = r.position {
            self.position_since_motion = true;
            fx.extend(self.orchestrator.on_position(p.z_mm, p.is_moving, now));
        }
        self.run_effects(fx);
        if r.position.is_some() {
            self.settle_owed_move();
        }
    }

    /// Reissue a positioning move that had to wait for another motion
    /// command, once that command is acknowledged and the axis reported
    /// where it stopped.
    fn settle_owed_move(&mut self) {
        if self.owed_z_mm.is_none()
            || self.dispatcher.is_in_flight(CommandClass::Motion)
            || !self.position_since_motion
            || self.telemetry.position.is_moving
        {
            return;
        }
        let Some(z_mm) = self.owed_z_mm.take() else {
            return;
        };
        if self.orchestrator.state().stage != Stage::Positioning {
            return;
        }
        debug!(z_mm, "motion settled; reissuing positioning move");
        self.run_effects(vec![SequenceEffect::MoveZ { z_mm }]);
    }

    /// Drain the inbound queue in arrival order, then [`tick`](Self::tick).
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(ev) = self.inbound.as_ref().and_then(|rx| rx.try_recv().ok()) {
            self.handle_event(&ev.name, &ev.payload);
            handled += 1;
        }
        self.tick();
        handled
    }

    /// Advance stage timers and watch for a dropped serial link.
    pub fn tick(&mut self) {
        let connected = self.transport.as_ref().is_some_and(Transport::is_connected);
        if self.was_connected && !connected {
            warn!("serial link lost");
            self.status_message = Some("serial link lost".into());
            let fx = self.orchestrator.fault("serial link lost");
            self.run_effects(fx);
        } else if !self.was_connected && connected {
            info!("serial link up");
        }
        self.was_connected = connected;

        let now = self.now_ms();
        let fx = self.orchestrator.tick(now);
        self.run_effects(fx);
    }

    // ── Command plumbing ─────────────────────────────────────────────────────

    fn send(&mut self, cmd: &Command) -> ConsoleResult<Option<u64>> {
        let now = self.now_ms();
        let res = self
            .dispatcher
            .dispatch(self.transport.as_mut(), cmd, now, unix_millis());
        if res.is_ok() && cmd.class() == Some(CommandClass::Motion) {
            self.position_since_motion = false;
        }
        if let Err(e) = &res {
            self.status_message = Some(match e {
                ConsoleError::TransportUnavailable => {
                    format!("controller not connected; {} dropped", cmd.name())
                }
                other => format!("{}: {other}", cmd.name()),
            });
        }
        res
    }

    fn run_effects(&mut self, fx: Vec<SequenceEffect>) {
        let mut queue: VecDeque<SequenceEffect> = fx.into();
        while let Some(effect) = queue.pop_front() {
            if let Some(tx) = &self.effects {
                // A dropped observer must not stall the run.
                let _ = tx.send(effect.clone());
            }
            let follow_up = self.execute(effect);
            queue.extend(follow_up);
        }
    }

    fn execute(&mut self, effect: SequenceEffect) -> Vec<SequenceEffect> {
        let now = self.now_ms();
        match effect {
            SequenceEffect::Started { pads } => {
                let cmd = Command::StartSequence {
                    pads,
                    options: *self.orchestrator.config(),
                };
                self.notify(&cmd);
            }
            SequenceEffect::StageEntered { stage, pad, pass } => {
                debug!(?stage, pad, pass, "stage");
                self.status_message = Some(format!("{stage:?} (pad {}, pass {})", pad + 1, pass + 1));
            }
            SequenceEffect::MoveZ { z_mm } => {
                let current = self.telemetry.position.z_mm;
                let delta = z_mm - current;
                if delta.abs() <= self.cfg.telemetry.z_tolerance_mm {
                    return self.orchestrator.on_position(current, false, now);
                }
                if self.dispatcher.is_in_flight(CommandClass::Motion) {
                    debug!(z_mm, "motion already in flight; positioning move deferred");
                    self.owed_z_mm = Some(z_mm);
                    return Vec::new();
                }
                let cmd = Command::Jog {
                    direction: if delta < 0.0 {
                        JogDirection::Down
                    } else {
                        JogDirection::Up
                    },
                    step_mm: delta.abs(),
                };
                if let Err(e) = self.send(&cmd) {
                    return self.orchestrator.fault(format!("positioning move failed: {e}"));
                }
            }
            SequenceEffect::FeedWire {
                length_mm,
                diameter_mm,
            } => {
                let cmd = Command::FeedWire {
                    length_mm,
                    diameter_mm,
                    rate_mm_s: self.cfg.wire.feed_rate_mm_s,
                };
                if let Err(e) = self.send(&cmd) {
                    return self.orchestrator.fault(format!("wire feed failed: {e}"));
                }
            }
            SequenceEffect::PadFinished { pad, label } => {
                info!(pad, %label, "pad finished");
            }
            SequenceEffect::Paused => self.notify(&Command::PauseSequence),
            SequenceEffect::Resumed { .. } => self.notify(&Command::ResumeSequence),
            SequenceEffect::Completed { label } => {
                self.status_message = Some(match label {
                    Some(l) => format!("sequence complete; last pad {l}"),
                    None => "sequence complete".into(),
                });
            }
            SequenceEffect::Halted(reason) => {
                self.owed_z_mm = None;
                self.notify(&Command::StopSequence);
                if let HaltReason::Fault(msg) = reason {
                    self.status_message = Some(format!("sequence halted: {msg}"));
                }
            }
        }
        Vec::new()
    }

    /// Best-effort run-state notification; the console stays authoritative.
    fn notify(&mut self, cmd: &Command) {
        if let Err(e) = self.send(cmd) {
            warn!(command = cmd.name(), error = %e, "controller not notified");
        }
    }

    fn require_manual_motion(&self) -> ConsoleResult<()> {
        if self.orchestrator.state().is_active {
            return Err(ConsoleError::InvalidState(
                "manual control is disabled while a sequence is running".into(),
            ));
        }
        Ok(())
    }

    // ── Operator commands ────────────────────────────────────────────────────

    pub fn jog(&mut self, direction: JogDirection, step_mm: f64) -> ConsoleResult<Option<u64>> {
        if !is_positive(step_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "jog step must be > 0, got {step_mm}"
            )));
        }
        self.require_manual_motion()?;
        self.send(&Command::Jog { direction, step_mm })
    }

    pub fn home(&mut self) -> ConsoleResult<Option<u64>> {
        self.require_manual_motion()?;
        self.send(&Command::Home)
    }

    /// Ask the controller to save the current Z; the ack records it.
    pub fn save_position(&mut self) -> ConsoleResult<Option<u64>> {
        self.require_manual_motion()?;
        self.send(&Command::SavePosition)
    }

    pub fn set_tip_target(&mut self, target_c: f64) -> ConsoleResult<()> {
        if !is_positive(target_c) {
            return Err(ConsoleError::InvalidInput(format!(
                "tip target must be > 0, got {target_c}"
            )));
        }
        self.send(&Command::SetTipTarget { target_c })?;
        Ok(())
    }

    pub fn set_heater(&mut self, enabled: bool) -> ConsoleResult<()> {
        self.send(&Command::SetHeater { enabled })?;
        Ok(())
    }

    /// Send the current plan's suggested temperature to the heater.
    pub fn apply_suggested_temperature(&mut self) -> ConsoleResult<i32> {
        let target = self
            .calculator
            .plan()
            .and_then(|p| p.thermal.compensated_temp_c)
            .ok_or_else(|| ConsoleError::InvalidState("no pad plan to take a temperature from".into()))?;
        self.set_tip_target(f64::from(target))?;
        info!(target_c = target, "suggested temperature applied");
        Ok(target)
    }

    /// Manual feed using the calculator's wire diameter.
    pub fn feed_wire(&mut self, length_mm: f64) -> ConsoleResult<()> {
        if !is_positive(length_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "feed length must be > 0, got {length_mm}"
            )));
        }
        self.require_manual_motion()?;
        if self.telemetry.spool.is_wire_empty() {
            return Err(ConsoleError::InvalidState("wire spool is empty".into()));
        }
        self.send(&Command::FeedWire {
            length_mm,
            diameter_mm: self.calculator.wire_diameter_mm(),
            rate_mm_s: self.cfg.wire.feed_rate_mm_s,
        })?;
        Ok(())
    }

    pub fn tare_spool(&mut self) -> ConsoleResult<Option<u64>> {
        let id = self.send(&Command::TareSpool)?;
        self.telemetry.spool.apply_tare();
        Ok(id)
    }

    pub fn reset_spool(&mut self) -> ConsoleResult<Option<u64>> {
        let id = self.send(&Command::ResetSpool)?;
        self.telemetry.reset_spool();
        Ok(id)
    }

    pub fn configure_spool(&mut self, cfg: SpoolConfig) -> ConsoleResult<Option<u64>> {
        for (name, v) in [
            ("wire diameter", cfg.wire_diameter_mm),
            ("full length", cfg.full_length_mm),
        ] {
            if let Some(v) = v
                && !is_positive(v)
            {
                return Err(ConsoleError::InvalidInput(format!("spool {name} must be > 0")));
            }
        }
        if cfg.initial_weight_g.is_some_and(|w| !w.is_finite() || w < 0.0) {
            return Err(ConsoleError::InvalidInput(
                "spool initial weight must be >= 0".into(),
            ));
        }
        let id = self.send(&Command::ConfigureSpool(cfg))?;
        let spool = &mut self.telemetry.spool;
        if let Some(d) = cfg.wire_diameter_mm {
            spool.wire_diameter_mm = d;
        }
        if let Some(w) = cfg.initial_weight_g {
            spool.initial_weight_g = w;
        }
        Ok(id)
    }

    pub fn request_state(&mut self, subsystem: Subsystem) -> ConsoleResult<()> {
        self.send(&Command::RequestState(subsystem))?;
        Ok(())
    }

    /// Start a run. An empty list solders one pad at the saved position
    /// using the current calculator plan.
    pub fn start_sequence(&mut self, pads: Vec<PadJob>) -> ConsoleResult<()> {
        if !self.orchestrator.is_idle() {
            return Err(ConsoleError::SequenceBusy);
        }
        let pads = if pads.is_empty() {
            match (self.saved_z_mm, self.calculator.plan()) {
                (Some(z), Some(plan)) => vec![PadJob::from_plan(SAVED_POSITION_LABEL, z, plan)],
                _ => {
                    return Err(ConsoleError::InvalidInput(
                        "no pads and no saved position with a pad plan".into(),
                    ));
                }
            }
        } else {
            pads
        };
        if !self.transport.as_ref().is_some_and(Transport::is_connected) {
            self.status_message = Some("controller not connected; sequence not started".into());
            return Err(ConsoleError::TransportUnavailable);
        }
        if self.telemetry.wire_break.detected {
            return Err(ConsoleError::HardwareFault(
                "wire break must be dismissed before starting".into(),
            ));
        }
        // An operator move still in flight would land somewhere else.
        if self.dispatcher.is_in_flight(CommandClass::Motion) {
            self.status_message = Some("axis still moving; sequence not started".into());
            return Err(ConsoleError::CommandInFlight(CommandClass::Motion));
        }
        self.owed_z_mm = None;
        let now = self.now_ms();
        let fx = self.orchestrator.start(pads, now)?;
        self.run_effects(fx);
        Ok(())
    }

    pub fn pause_sequence(&mut self) -> ConsoleResult<()> {
        let fx = self.orchestrator.pause()?;
        self.run_effects(fx);
        Ok(())
    }

    pub fn resume_sequence(&mut self) -> ConsoleResult<()> {
        let now = self.now_ms();
        let fx = self.orchestrator.resume(now)?;
        self.run_effects(fx);
        Ok(())
    }

    pub fn stop_sequence(&mut self) -> ConsoleResult<()> {
        let fx = self.orchestrator.stop()?;
        self.run_effects(fx);
        self.status_message = Some("sequence stopped".into());
        Ok(())
    }

    /// Validate and apply a whole configuration, then mirror each firmware
    /// field with its own `sequence:*:set` command. If a send fails the
    /// local configuration is restored; fields already sent stay sent.
    pub fn apply_sequence_config(&mut self, cfg: SequenceConfig) -> ConsoleResult<()> {
        if !self.orchestrator.is_idle() {
            return Err(ConsoleError::SequenceBusy);
        }
        cfg.validate()?;
        if !self.transport.as_ref().is_some_and(Transport::is_connected) {
            self.status_message =
                Some("controller not connected; sequence configuration not applied".into());
            return Err(ConsoleError::TransportUnavailable);
        }
        let cmds = [
            Command::SetPreHeatDwell {
                time_ms: cfg.pre_heat_dwell_ms,
            },
            Command::SetCooling {
                time_ms: cfg.cooling_ms,
            },
            Command::SetFluxTiming {
                enabled: cfg.flux_before_pre_heat_enabled,
            },
            Command::SetMultiplePasses {
                enabled: cfg.multiple_passes_enabled,
            },
            Command::SetLargePadThreshold {
                threshold_mm2: cfg.large_pad_threshold_mm2,
            },
            Command::SetPassesPerLargePad {
                passes: cfg.passes_per_large_pad,
            },
        ];
        if let Some(class) = cmds
            .iter()
            .filter_map(Command::class)
            .find(|c| self.dispatcher.is_in_flight(*c))
        {
            return Err(ConsoleError::CommandInFlight(class));
        }
        let previous = *self.orchestrator.config();
        self.orchestrator.apply_config(cfg)?;
        for cmd in &cmds {
            if let Err(e) = self.send(cmd) {
                if let Err(restore) = self.orchestrator.apply_config(previous) {
                    warn!(error = %restore, "previous sequence configuration not restored");
                }
                warn!(command = cmd.name(), error = %e, "sequence configuration rolled back");
                self.status_message = Some(format!(
                    "sequence configuration not applied; {} failed: {e}",
                    cmd.name()
                ));
                return Err(e);
            }
        }
        self.status_message = Some("sequence configuration applied".into());
        Ok(())
    }

    /// Returns whether a fault was showing.
    pub fn dismiss_wire_break(&mut self) -> bool {
        self.telemetry.dismiss_wire_break()
    }

    pub fn dismiss_error(&mut self) -> ConsoleResult<()> {
        self.orchestrator.dismiss_error()?;
        self.status_message = None;
        Ok(())
    }

    // ── Calculator ───────────────────────────────────────────────────────────

    pub fn set_pad_geometry(&mut self, geometry: PadGeometry) -> ConsoleResult<PadPlan> {
        self.calculator.set_geometry(geometry)
    }

    pub fn set_solder_height(&mut self, height_mm: f64) -> ConsoleResult<PadPlan> {
        self.calculator.set_solder_height(height_mm)
    }

    pub fn set_wire_diameter(&mut self, diameter_mm: f64) -> ConsoleResult<PadPlan> {
        self.calculator.set_wire_diameter(diameter_mm)
    }

    pub fn pad_plan(&self) -> Option<&PadPlan> {
        self.calculator.plan()
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        let t = &self.telemetry;
        ConsoleSnapshot {
            link: self.link_state(),
            position: t.position,
            saved_z_mm: self.saved_z_mm,
            tip: t.tip.clone(),
            spool: t.spool,
            spool_alert: t.spool.alert(),
            flux: t.flux.clone(),
            fans: t.fans,
            aux: t.aux.clone(),
            wire_feed: t.wire_feed.clone(),
            wire_break: t.wire_break.clone(),
            sequence: self.orchestrator.state().clone(),
            sequence_config: *self.orchestrator.config(),
            firmware_sequence: t.firmware_sequence.clone(),
            pad_plan: self.calculator.plan().copied(),
            pending_commands: self.dispatcher.in_flight_classes(),
            status_message: self.status_message.clone(),
        }
    }
}
