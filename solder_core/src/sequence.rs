//! Soldering sequence state machine.
//!
//! The orchestrator is authoritative for the run: it owns the stage, pad and
//! pass counters and decides every transition. It never talks to the
//! transport; each call returns [`SequenceEffect`]s that the session turns
//! into commands.
//!
//! One pass on one pad runs these stages in order:
//!
//! ```text
//! flux first:  FluxApplication -> Positioning -> PreHeatDwell -> Dispense -> Cooling [-> Cleaning]
//! flux after:  Positioning -> FluxApplication -> PreHeatDwell -> Dispense -> Cooling [-> Cleaning]
//! ```
//!
//! Timed stages advance on [`Orchestrator::tick`]; `Positioning` waits for a
//! settled position report and `Dispense` for the wire feed completion.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::geometry::PadPlan;
use crate::util::is_positive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Idle,
    Positioning,
    FluxApplication,
    PreHeatDwell,
    Dispense,
    Cooling,
    Cleaning,
    Error,
}

impl Stage {
    /// Stages that end on a timer rather than a hardware report.
    pub const fn is_timed(self) -> bool {
        matches!(
            self,
            Self::FluxApplication | Self::PreHeatDwell | Self::Cooling | Self::Cleaning
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceConfig {
    pub pre_heat_dwell_ms: u64,
    pub cooling_ms: u64,
    pub flux_before_pre_heat_enabled: bool,
    pub multiple_passes_enabled: bool,
    pub large_pad_threshold_mm2: f64,
    pub passes_per_large_pad: u32,
    pub flux_application_ms: u64,
    pub cleaning_enabled: bool,
    pub cleaning_ms: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            pre_heat_dwell_ms: 2_000,
            cooling_ms: 3_000,
            flux_before_pre_heat_enabled: true,
            multiple_passes_enabled: false,
            large_pad_threshold_mm2: 50.0,
            passes_per_large_pad: 2,
            flux_application_ms: 500,
            cleaning_enabled: false,
            cleaning_ms: 300,
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.passes_per_large_pad == 0 {
            return Err(ConsoleError::InvalidInput(
                "passes per large pad must be >= 1".into(),
            ));
        }
        if !is_positive(self.large_pad_threshold_mm2) {
            return Err(ConsoleError::InvalidInput(format!(
                "large pad threshold must be > 0, got {}",
                self.large_pad_threshold_mm2
            )));
        }
        Ok(())
    }

    /// Number of passes for a pad of this area.
    pub fn passes_for(&self, area_mm2: f64) -> u32 {
        if self.multiple_passes_enabled && area_mm2 >= self.large_pad_threshold_mm2 {
            self.passes_per_large_pad
        } else {
            1
        }
    }

    /// Stage order of one pass.
    pub fn pass_stages(&self) -> Vec<Stage> {
        let mut stages = if self.flux_before_pre_heat_enabled {
            vec![Stage::FluxApplication, Stage::Positioning]
        } else {
            vec![Stage::Positioning, Stage::FluxApplication]
        };
        stages.extend([Stage::PreHeatDwell, Stage::Dispense, Stage::Cooling]);
        if self.cleaning_enabled {
            stages.push(Stage::Cleaning);
        }
        stages
    }

    fn duration_ms(&self, stage: Stage) -> u64 {
        match stage {
            Stage::FluxApplication => self.flux_application_ms,
            Stage::PreHeatDwell => self.pre_heat_dwell_ms,
            Stage::Cooling => self.cooling_ms,
            Stage::Cleaning => self.cleaning_ms,
            _ => 0,
        }
    }
}

/// One pad of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PadJob {
    pub label: String,
    /// Working height; 0 is home, lower is negative.
    pub z_mm: f64,
    pub area_mm2: f64,
    pub wire_length_mm: f64,
    pub wire_diameter_mm: f64,
}

impl PadJob {
    pub fn from_plan(label: impl Into<String>, z_mm: f64, plan: &PadPlan) -> Self {
        Self {
            label: label.into(),
            z_mm,
            area_mm2: plan.area_mm2,
            wire_length_mm: plan.wire.length_mm,
            wire_diameter_mm: plan.wire_diameter_mm,
        }
    }

    fn validate(&self) -> ConsoleResult<()> {
        if !self.z_mm.is_finite() || self.z_mm > 0.0 {
            return Err(ConsoleError::InvalidInput(format!(
                "pad {}: z must be <= 0, got {}",
                self.label, self.z_mm
            )));
        }
        if !is_positive(self.area_mm2) || !is_positive(self.wire_length_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "pad {}: area and wire length must be > 0",
                self.label
            )));
        }
        if !is_positive(self.wire_diameter_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "pad {}: wire diameter must be > 0",
                self.label
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub stage: Stage,
    pub is_active: bool,
    pub is_paused: bool,
    pub current_pad: usize,
    pub total_pads: usize,
    pub current_pass: u32,
    pub max_passes: u32,
    pub progress_percent: u8,
    pub last_completed_label: Option<String>,
    pub error_message: Option<String>,
}

impl Default for SequenceState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            is_active: false,
            is_paused: false,
            current_pad: 0,
            total_pads: 0,
            current_pass: 0,
            max_passes: 1,
            progress_percent: 0,
            last_completed_label: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    Stopped,
    Fault(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceEffect {
    /// Run started; the controller is told which pads are coming.
    Started { pads: Vec<PadJob> },
    StageEntered { stage: Stage, pad: usize, pass: u32 },
    MoveZ { z_mm: f64 },
    FeedWire { length_mm: f64, diameter_mm: f64 },
    PadFinished { pad: usize, label: String },
    Paused,
    Resumed { stage: Stage },
    Completed { label: Option<String> },
    Halted(HaltReason),
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SequenceConfig,
    state: SequenceState,
    pads: Vec<PadJob>,
    stages: Vec<Stage>,
    stage_idx: usize,
    stage_started_ms: u64,
    /// Completion of an event-driven stage seen while paused.
    latched: bool,
    z_tolerance_mm: f64,
}

impl Orchestrator {
    pub fn new(config: SequenceConfig, z_tolerance_mm: f64) -> Self {
        Self {
            config,
            state: SequenceState::default(),
            pads: Vec::new(),
            stages: Vec::new(),
            stage_idx: 0,
            stage_started_ms: 0,
            latched: false,
            z_tolerance_mm,
        }
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn is_idle(&self) -> bool {
        self.state.stage == Stage::Idle
    }

    /// Pad currently being worked, if a run is in progress.
    pub fn current_job(&self) -> Option<&PadJob> {
        if self.state.is_active {
            self.pads.get(self.state.current_pad)
        } else {
            None
        }
    }

    /// Replace the configuration; only allowed while idle.
    pub fn apply_config(&mut self, config: SequenceConfig) -> ConsoleResult<()> {
        if !self.is_idle() {
            return Err(ConsoleError::SequenceBusy);
        }
        config.validate()?;
        debug!(?config, "sequence config applied");
        self.config = config;
        Ok(())
    }

    pub fn start(&mut self, pads: Vec<PadJob>, now_ms: u64) -> ConsoleResult<Vec<SequenceEffect>> {
        if !self.is_idle() {
            return Err(ConsoleError::SequenceBusy);
        }
        if pads.is_empty() {
            return Err(ConsoleError::InvalidInput("no pads to solder".into()));
        }
        for pad in &pads {
            pad.validate()?;
        }
        info!(pads = pads.len(), "sequence started");
        self.stages = self.config.pass_stages();
        self.state = SequenceState {
            is_active: true,
            total_pads: pads.len(),
            max_passes: self.config.passes_for(pads[0].area_mm2),
            last_completed_label: self.state.last_completed_label.take(),
            ..SequenceState::default()
        };
        self.pads = pads;
        self.stage_idx = 0;
        self.latched = false;
        let mut fx = vec![SequenceEffect::Started {
            pads: self.pads.clone(),
        }];
        self.enter_stage(now_ms, &mut fx);
        Ok(fx)
    }

    /// Advance timed stages whose duration has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SequenceEffect> {
        let mut fx = Vec::new();
        while self.state.is_active && !self.state.is_paused && self.state.stage.is_timed() {
            let elapsed = now_ms.saturating_sub(self.stage_started_ms);
            if elapsed < self.config.duration_ms(self.state.stage) {
                break;
            }
            self.advance(now_ms, &mut fx);
        }
        fx
    }

    /// Position report; completes `Positioning` once settled at the pad's Z.
    pub fn on_position(&mut self, z_mm: f64, is_moving: bool, now_ms: u64) -> Vec<SequenceEffect> {
        let mut fx = Vec::new();
        if self.state.stage != Stage::Positioning || is_moving {
            return fx;
        }
        let Some(target) = self.current_job().map(|j| j.z_mm) else {
            return fx;
        };
        if (z_mm - target).abs() > self.z_tolerance_mm {
            return fx;
        }
        self.complete_event_stage(now_ms, &mut fx);
        fx
    }

    /// Wire feed finished; completes `Dispense`.
    pub fn on_dispense_complete(&mut self, now_ms: u64) -> Vec<SequenceEffect> {
        let mut fx = Vec::new();
        if self.state.stage == Stage::Dispense {
            self.complete_event_stage(now_ms, &mut fx);
        }
        fx
    }

    pub fn pause(&mut self) -> ConsoleResult<Vec<SequenceEffect>> {
        if !self.state.is_active || self.state.is_paused {
            return Err(ConsoleError::InvalidState(format!(
                "cannot pause while {:?}{}",
                self.state.stage,
                if self.state.is_paused { " (paused)" } else { "" }
            )));
        }
        self.state.is_paused = true;
        info!(stage = ?self.state.stage, "sequence paused");
        Ok(vec![SequenceEffect::Paused])
    }

    /// Back to the suspended stage; timers restart from their full duration.
    pub fn resume(&mut self, now_ms: u64) -> ConsoleResult<Vec<SequenceEffect>> {
        if !self.state.is_paused {
            return Err(ConsoleError::InvalidState("sequence is not paused".into()));
        }
        self.state.is_paused = false;
        let stage = self.state.stage;
        info!(?stage, "sequence resumed");
        let mut fx = vec![SequenceEffect::Resumed { stage }];
        if std::mem::take(&mut self.latched) {
            self.advance(now_ms, &mut fx);
        } else if stage.is_timed() {
            self.stage_started_ms = now_ms;
        } else if let (Stage::Positioning, Some(job)) = (stage, self.current_job()) {
            fx.push(SequenceEffect::MoveZ { z_mm: job.z_mm });
        }
        Ok(fx)
    }

    /// Abandon the run (or clear an error) and return to idle.
    pub fn stop(&mut self) -> ConsoleResult<Vec<SequenceEffect>> {
        if self.is_idle() {
            return Err(ConsoleError::InvalidState("sequence is not running".into()));
        }
        info!(stage = ?self.state.stage, pad = self.state.current_pad, "sequence stopped");
        self.reset_to_idle();
        Ok(vec![SequenceEffect::Halted(HaltReason::Stopped)])
    }

    /// Hardware fault; forces `Error` during an active run, ignored otherwise.
    pub fn fault(&mut self, message: impl Into<String>) -> Vec<SequenceEffect> {
        if !self.state.is_active {
            return Vec::new();
        }
        let message = message.into();
        warn!(stage = ?self.state.stage, pad = self.state.current_pad, %message, "sequence fault");
        self.state.stage = Stage::Error;
        self.state.is_active = false;
        self.state.is_paused = false;
        self.state.error_message = Some(message.clone());
        self.latched = false;
        vec![SequenceEffect::Halted(HaltReason::Fault(message))]
    }

    pub fn dismiss_error(&mut self) -> ConsoleResult<()> {
        if self.state.stage != Stage::Error {
            return Err(ConsoleError::InvalidState("no sequence error to dismiss".into()));
        }
        self.reset_to_idle();
        Ok(())
    }

    fn reset_to_idle(&mut self) {
        self.state = SequenceState {
            last_completed_label: self.state.last_completed_label.take(),
            ..SequenceState::default()
        };
        self.pads.clear();
        self.stages.clear();
        self.stage_idx = 0;
        self.latched = false;
    }

    fn complete_event_stage(&mut self, now_ms: u64, fx: &mut Vec<SequenceEffect>) {
        if self.state.is_paused {
            debug!(stage = ?self.state.stage, "completion latched while paused");
            self.latched = true;
        } else {
            self.advance(now_ms, fx);
        }
    }

    fn enter_stage(&mut self, now_ms: u64, fx: &mut Vec<SequenceEffect>) {
        let stage = self.stages[self.stage_idx];
        self.state.stage = stage;
        self.stage_started_ms = now_ms;
        self.update_progress();
        debug!(
            ?stage,
            pad = self.state.current_pad,
            pass = self.state.current_pass,
            "stage entered"
        );
        fx.push(SequenceEffect::StageEntered {
            stage,
            pad: self.state.current_pad,
            pass: self.state.current_pass,
        });
        let job = &self.pads[self.state.current_pad];
        match stage {
            Stage::Positioning => fx.push(SequenceEffect::MoveZ { z_mm: job.z_mm }),
            Stage::Dispense => fx.push(SequenceEffect::FeedWire {
                length_mm: job.wire_length_mm,
                diameter_mm: job.wire_diameter_mm,
            }),
            _ => {}
        }
    }

    fn advance(&mut self, now_ms: u64, fx: &mut Vec<SequenceEffect>) {
        if self.stage_idx + 1 < self.stages.len() {
            self.stage_idx += 1;
            self.enter_stage(now_ms, fx);
            return;
        }
        self.stage_idx = 0;
        if self.state.current_pass + 1 < self.state.max_passes {
            self.state.current_pass += 1;
            self.enter_stage(now_ms, fx);
            return;
        }

        let pad = self.state.current_pad;
        let label = self.pads[pad].label.clone();
        self.state.last_completed_label = Some(label.clone());
        fx.push(SequenceEffect::PadFinished { pad, label });

        if pad + 1 < self.pads.len() {
            self.state.current_pad += 1;
            self.state.current_pass = 0;
            self.state.max_passes = self.config.passes_for(self.pads[pad + 1].area_mm2);
            self.enter_stage(now_ms, fx);
            return;
        }

        info!(pads = self.pads.len(), "sequence complete");
        self.state.stage = Stage::Idle;
        self.state.is_active = false;
        self.state.progress_percent = 100;
        self.pads.clear();
        self.stages.clear();
        fx.push(SequenceEffect::Completed {
            label: self.state.last_completed_label.clone(),
        });
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn update_progress(&mut self) {
        let s = &self.state;
        if s.total_pads == 0 {
            self.state.progress_percent = 0;
            return;
        }
        let done = s.current_pad as f64 + f64::from(s.current_pass) / f64::from(s.max_passes.max(1));
        let pct = (100.0 * done / s.total_pads as f64).round().clamp(0.0, 100.0);
        self.state.progress_percent = pct as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flux_ordering_follows_config() {
        let mut cfg = SequenceConfig::default();
        assert_eq!(
            cfg.pass_stages(),
            vec![
                Stage::FluxApplication,
                Stage::Positioning,
                Stage::PreHeatDwell,
                Stage::Dispense,
                Stage::Cooling
            ]
        );
        cfg.flux_before_pre_heat_enabled = false;
        cfg.cleaning_enabled = true;
        assert_eq!(
            cfg.pass_stages(),
            vec![
                Stage::Positioning,
                Stage::FluxApplication,
                Stage::PreHeatDwell,
                Stage::Dispense,
                Stage::Cooling,
                Stage::Cleaning
            ]
        );
    }

    #[test]
    fn passes_only_for_large_pads_when_enabled() {
        let mut cfg = SequenceConfig {
            large_pad_threshold_mm2: 10.0,
            passes_per_large_pad: 3,
            ..SequenceConfig::default()
        };
        assert_eq!(cfg.passes_for(25.0), 1);
        cfg.multiple_passes_enabled = true;
        assert_eq!(cfg.passes_for(25.0), 3);
        assert_eq!(cfg.passes_for(9.9), 1);
    }
}
