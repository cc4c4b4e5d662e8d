#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and pad list parsing for the soldering console.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; defaults match the controller firmware.
//! - The pad list CSV loader enforces exact headers so a shifted column can
//!   never silently turn a radius into a Z height.
use serde::Deserialize;

/// Pad list CSV schema.
///
/// Expected headers:
/// label,shape,z_mm,a_mm,b_mm,solder_height_mm
///
/// `a_mm`/`b_mm` by shape: square (side, -), rectangle (length, width),
/// circle (radius, -), concentric (outer radius, inner radius).
///
/// Example:
/// label,shape,z_mm,a_mm,b_mm,solder_height_mm
/// J1-1,square,-12.5,3.0,,0.5
/// TP4,concentric,-12.0,2.0,0.6,0.4
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PadRow {
    pub label: String,
    pub shape: PadShape,
    pub z_mm: f64,
    pub a_mm: f64,
    #[serde(default)]
    pub b_mm: Option<f64>,
    pub solder_height_mm: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PadShape {
    Square,
    Rectangle,
    Circle,
    Concentric,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WireCfg {
    /// Solder wire diameter in millimetres.
    pub diameter_mm: f64,
    /// Feed rate used for dispensing (mm/s).
    pub feed_rate_mm_s: f64,
}

impl Default for WireCfg {
    fn default() -> Self {
        Self {
            diameter_mm: 0.8,
            feed_rate_mm_s: 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Wire feeder steps per millimetre of wire.
    pub steps_per_mm: f64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self { steps_per_mm: 8.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThermalCfg {
    pub base_temp_c: f64,
    /// Degrees added per sqrt(mm²) of pad area.
    pub factor: f64,
    pub min_temp_c: f64,
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SequenceCfg {
    pub pre_heat_dwell_ms: u64,
    pub cooling_ms: u64,
    /// Apply flux before lowering/pre-heat (true) or right after lowering (false)
    pub flux_before_pre_heat: bool,
    pub multiple_passes: bool,
    pub large_pad_threshold_mm2: f64,
    pub passes_per_large_pad: u32,
    pub flux_application_ms: u64,
    /// Air-jet clean after cooling
    pub cleaning_enabled: bool,
    pub cleaning_ms: u64,
}

impl Default for SequenceCfg {
    fn default() -> Self {
        Self {
            pre_heat_dwell_ms: 2_000,
            cooling_ms: 3_000,
            flux_before_pre_heat: true,
            multiple_passes: false,
            large_pad_threshold_mm2: 50.0,
            passes_per_large_pad: 2,
            flux_application_ms: 500,
            cleaning_enabled: false,
            cleaning_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryCfg {
    /// Link is "connected but not streaming" after this long without a heartbeat.
    pub heartbeat_timeout_ms: u64,
    /// Positioning completes once |z - target| is within this band.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpoolCfg {
    /// Spool weight with full wire, before taring (grams)
    pub initial_weight_g: f64,
    /// Wire length on a full spool (mm)
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub wire: WireCfg,
    pub calibration: CalibrationCfg,
    pub thermal: ThermalCfg,
    pub sequence: SequenceCfg,
    pub telemetry: TelemetryCfg,
    pub spool: SpoolCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_pads_csv(path: &std::path::Path) -> eyre::Result<Vec<PadRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open pad list CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["label", "shape", "z_mm", "a_mm", "b_mm", "solder_height_mm"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "pad list CSV must have headers '{}', got: {}",
            expected.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<PadRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("pad list CSV {:?} contains no pads", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Wire
        if !(self.wire.diameter_mm.is_finite() && self.wire.diameter_mm > 0.0) {
            eyre::bail!("wire.diameter_mm must be > 0");
        }
        if !(self.wire.feed_rate_mm_s.is_finite() && self.wire.feed_rate_mm_s > 0.0) {
            eyre::bail!("wire.feed_rate_mm_s must be > 0");
        }

        // Calibration
        if !(self.calibration.steps_per_mm.is_finite() && self.calibration.steps_per_mm > 0.0) {
            eyre::bail!("calibration.steps_per_mm must be > 0");
        }

        // Thermal
        let t = &self.thermal;
        if !(t.base_temp_c.is_finite() && t.factor.is_finite()) {
            eyre::bail!("thermal.base_temp_c and thermal.factor must be finite");
        }
        if t.factor.is_sign_negative() {
            eyre::bail!("thermal.factor must be >= 0");
        }
        if !(t.min_temp_c.is_finite() && t.max_temp_c.is_finite()) || t.min_temp_c >= t.max_temp_c
        {
            eyre::bail!("thermal.min_temp_c must be < thermal.max_temp_c");
        }

        // Sequence
        let s = &self.sequence;
        if s.passes_per_large_pad == 0 {
            eyre::bail!("sequence.passes_per_large_pad must be >= 1");
        }
        if !(s.large_pad_threshold_mm2.is_finite() && s.large_pad_threshold_mm2 > 0.0) {
            eyre::bail!("sequence.large_pad_threshold_mm2 must be > 0");
        }
        const TEN_MIN_MS: u64 = 10 * 60 * 1000;
        if s.pre_heat_dwell_ms > TEN_MIN_MS || s.cooling_ms > TEN_MIN_MS {
            eyre::bail!("sequence dwell/cooling times are unreasonably large (>10min)");
        }

        // Telemetry
        if self.telemetry.heartbeat_timeout_ms == 0 {
            eyre::bail!("telemetry.heartbeat_timeout_ms must be >= 1");
        }
        if !(self.telemetry.z_tolerance_mm.is_finite() && self.telemetry.z_tolerance_mm > 0.0) {
            eyre::bail!("telemetry.z_tolerance_mm must be > 0");
        }

        // Spool
        if !(self.spool.full_length_mm.is_finite() && self.spool.full_length_mm > 0.0) {
            eyre::bail!("spool.full_length_mm must be > 0");
        }
        if self.spool.initial_weight_g.is_sign_negative() {
            eyre::bail!("spool.initial_weight_g must be >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
