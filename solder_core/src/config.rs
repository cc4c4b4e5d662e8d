//! Runtime configuration for the console core.
//!
//! These mirror the TOML sections in `solder_config`; see `conversions` for
//! the mapping. Defaults match the controller firmware.

use crate::error::BuildError;
use crate::sequence::SequenceConfig;
use crate::util::is_positive;

/// Thermal compensation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalCfg {
    /// Base tip temperature before compensation (°C).
    pub base_temp_c: f64,
    /// Degrees added per sqrt(mm²) of pad area.
    pub factor: f64,
    /// Lower clamp for the suggested temperature (°C).
    pub min_temp_c: f64,
    /// Upper clamp for the suggested temperature (°C).
    pub max_temp_c: f64,
}

impl Default for ThermalCfg {
    fn default() -> Self {
        Self {
            base_temp_c: 345.0,
            factor: 2.0,
            min_temp_c: 280.0,
            max_temp_c: 400.0,
        }
    }
}

/// Wire and feeder parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireCfg {
    pub diameter_mm: f64,
    pub feed_rate_mm_s: f64,
    /// Feeder calibration; 8 steps per millimetre on the stock feeder.
    pub steps_per_mm: f64,
}

impl Default for WireCfg {
    fn default() -> Self {
        Self {
            diameter_mm: 0.8,
            feed_rate_mm_s: 5.0,
            steps_per_mm: crate::geometry::STEPS_PER_MM,
        }
    }
}

/// Telemetry reconciliation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryCfg {
    /// Connected links without a heartbeat for this long report "not streaming".
    pub heartbeat_timeout_ms: u64,
    /// Positioning completes once |z - target| <= z_tolerance_mm.
    pub z_tolerance_mm: f64,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 2_000,
            z_tolerance_mm: 0.05,
        }
    }
}

/// Spool defaults used at session start and on reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpoolCfg {
    pub initial_weight_g: f64,
    pub full_length_mm: f64,
}

impl Default for SpoolCfg {
    fn default() -> Self {
        Self {
            initial_weight_g: 500.0,
            full_length_mm: 100_000.0,
        }
    }
}

/// Everything a `ConsoleSession` needs besides its transport and clock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsoleCfg {
    pub wire: WireCfg,
    pub thermal: ThermalCfg,
    pub telemetry: TelemetryCfg,
    pub spool: SpoolCfg,
    pub sequence: SequenceConfig,
}

impl ConsoleCfg {
    /// Non-panicking validation used by the session builder.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !is_positive(self.wire.diameter_mm) {
            return Err(BuildError::InvalidConfig("wire diameter must be > 0"));
        }
        if !is_positive(self.wire.feed_rate_mm_s) {
            return Err(BuildError::InvalidConfig("wire feed rate must be > 0"));
        }
        if !is_positive(self.wire.steps_per_mm) {
            return Err(BuildError::InvalidConfig("steps_per_mm must be > 0"));
        }
        if !(self.thermal.min_temp_c < self.thermal.max_temp_c) {
            return Err(BuildError::InvalidConfig(
                "thermal min_temp_c must be < max_temp_c",
            ));
        }
        if self.telemetry.heartbeat_timeout_ms == 0 {
            return Err(BuildError::InvalidConfig("heartbeat_timeout_ms must be >= 1"));
        }
        if !is_positive(self.telemetry.z_tolerance_mm) {
            return Err(BuildError::InvalidConfig("z_tolerance_mm must be > 0"));
        }
        if !is_positive(self.spool.full_length_mm) {
            return Err(BuildError::InvalidConfig("spool full_length_mm must be > 0"));
        }
        if self.sequence.validate().is_err() {
            return Err(BuildError::InvalidConfig("sequence configuration is invalid"));
        }
        Ok(())
    }
}
