//! `From` implementations bridging `solder_config` types to `solder_core` types.

use crate::config::{ConsoleCfg, SpoolCfg, TelemetryCfg, ThermalCfg, WireCfg};
use crate::error::{ConsoleError, ConsoleResult};
use crate::geometry::{PadGeometry, PadPlan};
use crate::sequence::{PadJob, SequenceConfig};

// ── ThermalCfg ───────────────────────────────────────────────────────────────

impl From<&solder_config::ThermalCfg> for ThermalCfg {
    fn from(c: &solder_config::ThermalCfg) -> Self {
        Self {
            base_temp_c: c.base_temp_c,
            factor: c.factor,
            min_temp_c: c.min_temp_c,
            max_temp_c: c.max_temp_c,
        }
    }
}

// ── SequenceConfig ───────────────────────────────────────────────────────────

impl From<&solder_config::SequenceCfg> for SequenceConfig {
    fn from(c: &solder_config::SequenceCfg) -> Self {
        Self {
            pre_heat_dwell_ms: c.pre_heat_dwell_ms,
            cooling_ms: c.cooling_ms,
            flux_before_pre_heat_enabled: c.flux_before_pre_heat,
            multiple_passes_enabled: c.multiple_passes,
            large_pad_threshold_mm2: c.large_pad_threshold_mm2,
            passes_per_large_pad: c.passes_per_large_pad,
            flux_application_ms: c.flux_application_ms,
            cleaning_enabled: c.cleaning_enabled,
            cleaning_ms: c.cleaning_ms,
        }
    }
}

// ── TelemetryCfg / SpoolCfg ──────────────────────────────────────────────────

impl From<&solder_config::TelemetryCfg> for TelemetryCfg {
    fn from(c: &solder_config::TelemetryCfg) -> Self {
        Self {
            heartbeat_timeout_ms: c.heartbeat_timeout_ms,
            z_tolerance_mm: c.z_tolerance_mm,
        }
    }
}

impl From<&solder_config::SpoolCfg> for SpoolCfg {
    fn from(c: &solder_config::SpoolCfg) -> Self {
        Self {
            initial_weight_g: c.initial_weight_g,
            full_length_mm: c.full_length_mm,
        }
    }
}

// ── ConsoleCfg ───────────────────────────────────────────────────────────────

impl From<&solder_config::Config> for ConsoleCfg {
    fn from(c: &solder_config::Config) -> Self {
        Self {
            wire: WireCfg {
                diameter_mm: c.wire.diameter_mm,
                feed_rate_mm_s: c.wire.feed_rate_mm_s,
                steps_per_mm: c.calibration.steps_per_mm,
            },
            thermal: (&c.thermal).into(),
            telemetry: (&c.telemetry).into(),
            spool: (&c.spool).into(),
            sequence: (&c.sequence).into(),
        }
    }
}

// ── Pad rows ─────────────────────────────────────────────────────────────────

impl TryFrom<&solder_config::PadRow> for PadGeometry {
    type Error = ConsoleError;

    fn try_from(r: &solder_config::PadRow) -> ConsoleResult<Self> {
        use solder_config::PadShape;
        let second = || {
            r.b_mm.ok_or_else(|| {
                ConsoleError::InvalidGeometry(format!(
                    "pad {}: b_mm is required for {:?}",
                    r.label, r.shape
                ))
            })
        };
        let g = match r.shape {
            PadShape::Square => Self::Square { side: r.a_mm },
            PadShape::Rectangle => Self::Rectangle {
                length: r.a_mm,
                width: second()?,
            },
            PadShape::Circle => Self::Circle { radius: r.a_mm },
            PadShape::Concentric => Self::Concentric {
                outer_radius: r.a_mm,
                inner_radius: second()?,
            },
        };
        g.validate().map_err(|e| match e {
            ConsoleError::InvalidGeometry(m) => {
                ConsoleError::InvalidGeometry(format!("pad {}: {m}", r.label))
            }
            other => other,
        })?;
        Ok(g)
    }
}

/// Plan every row of a pad list with the configured wire and thermal model.
///
/// Fails on the first invalid row, naming its label.
pub fn plan_pad_rows(
    rows: &[solder_config::PadRow],
    cfg: &ConsoleCfg,
) -> ConsoleResult<Vec<(PadJob, PadPlan)>> {
    rows.iter()
        .map(|r| {
            let geometry = PadGeometry::try_from(r)?;
            let plan = PadPlan::compute(
                &geometry,
                r.solder_height_mm,
                cfg.wire.diameter_mm,
                &cfg.thermal,
                cfg.wire.steps_per_mm,
            )
            .map_err(|e| match e {
                ConsoleError::InvalidInput(m) => {
                    ConsoleError::InvalidInput(format!("pad {}: {m}", r.label))
                }
                other => other,
            })?;
            Ok((PadJob::from_plan(r.label.clone(), r.z_mm, &plan), plan))
        })
        .collect()
}
