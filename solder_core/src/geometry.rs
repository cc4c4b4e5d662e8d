//! Pad geometry, solder volume and wire feed calculations.
//!
//! Everything here is pure. `PadCalculator` holds the editable inputs and
//! recomputes the whole derived group (area, volume, wire length, steps,
//! thermal suggestion) on every edit, so a caller never sees a plan that mixes
//! old and new inputs.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::ThermalCfg;
use crate::error::{ConsoleError, ConsoleResult};
use crate::thermal::{ThermalCompensation, compute_compensation_with};
use crate::util::is_positive;

/// Wire feeder steps per millimetre of wire (stock feeder calibration).
pub const STEPS_PER_MM: f64 = 8.0;

/// Pads below this area (mm²) are small.
pub const SMALL_PAD_MAX_MM2: f64 = 10.0;
/// Pads below this area (mm²) are medium; everything else is large.
pub const MEDIUM_PAD_MAX_MM2: f64 = 50.0;

/// Shape of a solder pad. All dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum PadGeometry {
    Square {
        side: f64,
    },
    Rectangle {
        length: f64,
        width: f64,
    },
    Circle {
        radius: f64,
    },
    /// Annular pad (plated through-hole ring).
    Concentric {
        #[serde(rename = "outerRadius")]
        outer_radius: f64,
        #[serde(rename = "innerRadius")]
        inner_radius: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadSizeCategory {
    Small,
    Medium,
    Large,
}

impl PadSizeCategory {
    /// Category for a pad area; `None` when the area is not a positive number.
    pub fn from_area(area_mm2: f64) -> Option<Self> {
        if !is_positive(area_mm2) {
            return None;
        }
        Some(if area_mm2 < SMALL_PAD_MAX_MM2 {
            Self::Small
        } else if area_mm2 < MEDIUM_PAD_MAX_MM2 {
            Self::Medium
        } else {
            Self::Large
        })
    }
}

fn require_dim(name: &str, v: f64) -> ConsoleResult<()> {
    if is_positive(v) {
        Ok(())
    } else {
        Err(ConsoleError::InvalidGeometry(format!(
            "{name} must be > 0, got {v}"
        )))
    }
}

impl PadGeometry {
    pub fn validate(&self) -> ConsoleResult<()> {
        match *self {
            Self::Square { side } => require_dim("side", side),
            Self::Rectangle { length, width } => {
                require_dim("length", length)?;
                require_dim("width", width)
            }
            Self::Circle { radius } => require_dim("radius", radius),
            Self::Concentric {
                outer_radius,
                inner_radius,
            } => {
                require_dim("outer radius", outer_radius)?;
                require_dim("inner radius", inner_radius)?;
                if outer_radius <= inner_radius {
                    return Err(ConsoleError::InvalidGeometry(format!(
                        "outer radius ({outer_radius}) must exceed inner radius ({inner_radius})"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Pad area in mm².
    pub fn area(&self) -> ConsoleResult<f64> {
        self.validate()?;
        Ok(match *self {
            Self::Square { side } => side * side,
            Self::Rectangle { length, width } => length * width,
            Self::Circle { radius } => PI * radius * radius,
            Self::Concentric {
                outer_radius,
                inner_radius,
            } => PI * (outer_radius * outer_radius - inner_radius * inner_radius),
        })
    }

    pub fn category(&self) -> ConsoleResult<PadSizeCategory> {
        let area = self.area()?;
        PadSizeCategory::from_area(area)
            .ok_or_else(|| ConsoleError::InvalidGeometry(format!("area must be > 0, got {area}")))
    }
}

pub fn compute_area(geometry: &PadGeometry) -> ConsoleResult<f64> {
    geometry.area()
}

/// Solder to deposit on one pad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolderDeposit {
    pub geometry: PadGeometry,
    pub solder_height_mm: f64,
}

impl SolderDeposit {
    pub fn new(geometry: PadGeometry, solder_height_mm: f64) -> ConsoleResult<Self> {
        geometry.validate()?;
        if !is_positive(solder_height_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "solder height must be > 0, got {solder_height_mm}"
            )));
        }
        Ok(Self {
            geometry,
            solder_height_mm,
        })
    }

    pub fn volume_mm3(&self) -> ConsoleResult<f64> {
        Ok(self.geometry.area()? * self.solder_height_mm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpec {
    pub diameter_mm: f64,
}

impl WireSpec {
    pub fn new(diameter_mm: f64) -> ConsoleResult<Self> {
        if !is_positive(diameter_mm) {
            return Err(ConsoleError::InvalidInput(format!(
                "wire diameter must be > 0, got {diameter_mm}"
            )));
        }
        Ok(Self { diameter_mm })
    }

    /// Solder volume contained in one millimetre of wire (mm³/mm).
    pub fn volume_per_mm(&self) -> f64 {
        let r = self.diameter_mm / 2.0;
        PI * r * r
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFeedPlan {
    pub volume_mm3: f64,
    pub length_mm: f64,
    pub step_count: u64,
}

pub fn compute_wire_feed_plan(
    area_mm2: f64,
    height_mm: f64,
    diameter_mm: f64,
) -> ConsoleResult<WireFeedPlan> {
    compute_wire_feed_plan_with(area_mm2, height_mm, diameter_mm, STEPS_PER_MM)
}

/// Same as [`compute_wire_feed_plan`] with an explicit feeder calibration.
pub fn compute_wire_feed_plan_with(
    area_mm2: f64,
    height_mm: f64,
    diameter_mm: f64,
    steps_per_mm: f64,
) -> ConsoleResult<WireFeedPlan> {
    if !is_positive(area_mm2) {
        return Err(ConsoleError::InvalidInput(format!(
            "pad area must be > 0, got {area_mm2}"
        )));
    }
    if !is_positive(height_mm) {
        return Err(ConsoleError::InvalidInput(format!(
            "solder height must be > 0, got {height_mm}"
        )));
    }
    if !is_positive(steps_per_mm) {
        return Err(ConsoleError::InvalidInput(format!(
            "steps per mm must be > 0, got {steps_per_mm}"
        )));
    }
    let wire = WireSpec::new(diameter_mm)?;
    let volume_per_mm = wire.volume_per_mm();
    if !is_positive(volume_per_mm) {
        return Err(ConsoleError::InvalidInput(format!(
            "wire volume per mm must be > 0, got {volume_per_mm}"
        )));
    }
    let volume_mm3 = area_mm2 * height_mm;
    let length_mm = volume_mm3 / volume_per_mm;
    let steps = (length_mm * steps_per_mm).ceil();
    if !steps.is_finite() || steps > u64::MAX as f64 {
        return Err(ConsoleError::InvalidInput(format!(
            "wire length {length_mm} mm is out of range"
        )));
    }
    Ok(WireFeedPlan {
        volume_mm3,
        length_mm,
        step_count: steps as u64,
    })
}

/// Every derived quantity for one pad, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PadPlan {
    pub geometry: PadGeometry,
    pub solder_height_mm: f64,
    pub wire_diameter_mm: f64,
    pub area_mm2: f64,
    pub category: PadSizeCategory,
    pub wire: WireFeedPlan,
    pub thermal: ThermalCompensation,
}

impl PadPlan {
    pub fn compute(
        geometry: &PadGeometry,
        solder_height_mm: f64,
        wire_diameter_mm: f64,
        thermal: &ThermalCfg,
        steps_per_mm: f64,
    ) -> ConsoleResult<Self> {
        let deposit = SolderDeposit::new(*geometry, solder_height_mm)?;
        let area_mm2 = deposit.geometry.area()?;
        let category = deposit.geometry.category()?;
        let wire =
            compute_wire_feed_plan_with(area_mm2, solder_height_mm, wire_diameter_mm, steps_per_mm)?;
        Ok(Self {
            geometry: *geometry,
            solder_height_mm,
            wire_diameter_mm,
            area_mm2,
            category,
            wire,
            thermal: compute_compensation_with(area_mm2, thermal),
        })
    }
}

/// Editable calculator inputs plus the plan derived from them.
#[derive(Debug, Clone)]
pub struct PadCalculator {
    geometry: Option<PadGeometry>,
    solder_height_mm: f64,
    wire_diameter_mm: f64,
    steps_per_mm: f64,
    thermal: ThermalCfg,
    plan: Option<PadPlan>,
}

impl PadCalculator {
    /// Default solder height for a fresh calculator (mm).
    pub const DEFAULT_SOLDER_HEIGHT_MM: f64 = 0.5;

    pub fn new(wire_diameter_mm: f64, steps_per_mm: f64, thermal: ThermalCfg) -> Self {
        Self {
            geometry: None,
            solder_height_mm: Self::DEFAULT_SOLDER_HEIGHT_MM,
            wire_diameter_mm,
            steps_per_mm,
            thermal,
            plan: None,
        }
    }

    pub fn set_geometry(&mut self, geometry: PadGeometry) -> ConsoleResult<PadPlan> {
        self.geometry = Some(geometry);
        self.recompute()
    }

    pub fn set_solder_height(&mut self, height_mm: f64) -> ConsoleResult<PadPlan> {
        self.solder_height_mm = height_mm;
        self.recompute()
    }

    pub fn set_wire_diameter(&mut self, diameter_mm: f64) -> ConsoleResult<PadPlan> {
        self.wire_diameter_mm = diameter_mm;
        self.recompute()
    }

    pub fn geometry(&self) -> Option<&PadGeometry> {
        self.geometry.as_ref()
    }

    pub fn solder_height_mm(&self) -> f64 {
        self.solder_height_mm
    }

    pub fn wire_diameter_mm(&self) -> f64 {
        self.wire_diameter_mm
    }

    /// Current plan; `None` until the inputs form a valid pad.
    pub fn plan(&self) -> Option<&PadPlan> {
        self.plan.as_ref()
    }

    fn recompute(&mut self) -> ConsoleResult<PadPlan> {
        // Drop the old group first so a failed edit never leaves stale results.
        self.plan = None;
        let geometry = self
            .geometry
            .ok_or_else(|| ConsoleError::InvalidGeometry("no pad geometry selected".into()))?;
        let plan = PadPlan::compute(
            &geometry,
            self.solder_height_mm,
            self.wire_diameter_mm,
            &self.thermal,
            self.steps_per_mm,
        )?;
        self.plan = Some(plan);
        Ok(plan)
    }
}
