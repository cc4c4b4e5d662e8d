//! Pad planning: turn flags or a pad list into jobs and print their plans.

use eyre::{Result, WrapErr};
use serde_json::json;
use solder_config::{PadRow, PadShape};
use solder_core::conversions::plan_pad_rows;
use solder_core::{ConsoleCfg, ConsoleError, PadJob, PadPlan, PadSizeCategory};

use crate::cli::{PadArgs, ShapeArg};

/// Plan every requested pad. `--diameter` overrides the configured wire.
pub fn collect_pads(args: &PadArgs, cfg: &mut ConsoleCfg) -> Result<Vec<(PadJob, PadPlan)>> {
    if let Some(d) = args.diameter {
        cfg.wire.diameter_mm = d;
    }
    let rows = match &args.pads {
        Some(path) => solder_config::load_pads_csv(path)
            .wrap_err_with(|| format!("load pad list {}", path.display()))?,
        None => vec![single_row(args)?],
    };
    tracing::debug!(pads = rows.len(), "planning pads");
    Ok(plan_pad_rows(&rows, cfg)?)
}

fn single_row(args: &PadArgs) -> Result<PadRow, ConsoleError> {
    let need = |flag: &str, v: Option<f64>, shape: &str| {
        v.ok_or_else(|| ConsoleError::InvalidInput(format!("--{flag} is required for a {shape} pad")))
    };
    let Some(shape) = args.shape else {
        return Err(ConsoleError::InvalidInput("--shape or --pads is required".into()));
    };
    let (shape, a_mm, b_mm) = match shape {
        ShapeArg::Square => (PadShape::Square, need("side", args.side, "square")?, None),
        ShapeArg::Rectangle => (
            PadShape::Rectangle,
            need("length", args.length, "rectangle")?,
            Some(need("width", args.width, "rectangle")?),
        ),
        ShapeArg::Circle => (PadShape::Circle, need("radius", args.radius, "circle")?, None),
        ShapeArg::Concentric => (
            PadShape::Concentric,
            need("outer-radius", args.outer_radius, "concentric")?,
            Some(need("inner-radius", args.inner_radius, "concentric")?),
        ),
    };
    Ok(PadRow {
        label: args.label.clone(),
        shape,
        z_mm: args.z,
        a_mm,
        b_mm,
        solder_height_mm: args.height,
    })
}

pub fn print_plans(pads: &[(PadJob, PadPlan)], json_mode: bool) {
    for (job, plan) in pads {
        if json_mode {
            println!(
                "{}",
                json!({ "label": job.label, "zMm": job.z_mm, "plan": plan })
            );
        } else {
            println!("{}", describe(job, plan));
        }
    }
}

fn describe(job: &PadJob, plan: &PadPlan) -> String {
    let category = match plan.category {
        PadSizeCategory::Small => "small",
        PadSizeCategory::Medium => "medium",
        PadSizeCategory::Large => "large",
    };
    let temp = plan.thermal.compensated_temp_c.map_or_else(
        || "-".to_string(),
        |t| format!("{t} °C (+{:.1})", plan.thermal.compensation_c),
    );
    format!(
        "{}: area {:.3} mm² ({category}), volume {:.3} mm³, wire {:.3} mm / {} steps, tip {temp}",
        job.label, plan.area_mm2, plan.wire.volume_mm3, plan.wire.length_mm, plan.wire.step_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn pad_args(extra: &[&str]) -> PadArgs {
        let mut argv = vec!["solder", "plan"];
        argv.extend_from_slice(extra);
        match crate::cli::Cli::parse_from(argv).cmd {
            crate::cli::Commands::Plan { pads } => pads,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rectangle_needs_both_sides() {
        let args = pad_args(&["--shape", "rectangle", "--length", "5"]);
        let err = single_row(&args).unwrap_err();
        assert_eq!(
            err,
            ConsoleError::InvalidInput("--width is required for a rectangle pad".into())
        );
    }

    #[test]
    fn diameter_flag_overrides_config() {
        let args = pad_args(&["--shape", "square", "--side", "2", "--diameter", "0.5"]);
        let mut cfg = ConsoleCfg::default();
        let pads = collect_pads(&args, &mut cfg).unwrap();
        assert_eq!(cfg.wire.diameter_mm, 0.5);
        assert_eq!(pads[0].1.wire_diameter_mm, 0.5);
        assert_eq!(pads[0].0.label, "pad");
        assert_eq!(pads[0].0.z_mm, -5.0);
    }

    #[test]
    fn description_keeps_label_case() {
        let args = pad_args(&["--shape", "circle", "--radius", "1", "--label", "J7"]);
        let mut cfg = ConsoleCfg::default();
        let pads = collect_pads(&args, &mut cfg).unwrap();
        let line = describe(&pads[0].0, &pads[0].1);
        assert!(line.starts_with("J7: area 3.142 mm² (small)"), "{line}");
    }
}
