//! Tip temperature suggestion from pad area.
//!
//! Larger pads sink more heat, so the suggested target grows with the square
//! root of the area. The result is only a suggestion: the session sends it to
//! the heater when the operator asks for it.

use serde::Serialize;

use crate::config::ThermalCfg;
use crate::geometry::PadSizeCategory;
use crate::util::{is_positive, round_to};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalCompensation {
    pub category: Option<PadSizeCategory>,
    /// Suggested tip target (°C), clamped and rounded.
    pub compensated_temp_c: Option<i32>,
    /// Degrees added on top of the base temperature, one decimal.
    pub compensation_c: f64,
}

impl ThermalCompensation {
    const NONE: Self = Self {
        category: None,
        compensated_temp_c: None,
        compensation_c: 0.0,
    };
}

/// Compensation with the stock parameters (345 °C base, factor 2, 280..=400 °C).
pub fn compute_compensation(area_mm2: f64) -> ThermalCompensation {
    compute_compensation_with(area_mm2, &ThermalCfg::default())
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute_compensation_with(area_mm2: f64, cfg: &ThermalCfg) -> ThermalCompensation {
    if !is_positive(area_mm2) {
        return ThermalCompensation::NONE;
    }
    let compensation_c = round_to(area_mm2.sqrt() * cfg.factor, 1);
    let target = (cfg.base_temp_c + compensation_c).clamp(cfg.min_temp_c, cfg.max_temp_c);
    ThermalCompensation {
        category: PadSizeCategory::from_area(area_mm2),
        // Clamped to a validated [min, max] range, so the cast cannot overflow.
        compensated_temp_c: Some(target.round() as i32),
        compensation_c,
    }
}
