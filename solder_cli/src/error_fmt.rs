//! Human-readable error descriptions and structured JSON error formatting.

use solder_core::error::{BuildError, ConsoleError};

/// Operator pressed Ctrl-C during `simulate`; the run was stopped.
#[derive(Debug, thiserror::Error)]
#[error("interrupted by operator")]
pub struct Interrupted;

/// Stable name of the error kind, used as `reason` in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<Interrupted>().is_some() {
        return "Interrupted";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::InvalidGeometry(_)) => "InvalidGeometry",
        Some(ConsoleError::InvalidInput(_)) => "InvalidInput",
        Some(ConsoleError::SequenceBusy) => "SequenceBusy",
        Some(ConsoleError::InvalidState(_)) => "InvalidState",
        Some(ConsoleError::HardwareFault(_)) => "HardwareFault",
        Some(ConsoleError::TransportUnavailable) => "TransportUnavailable",
        Some(ConsoleError::Transport(_)) => "Transport",
        Some(ConsoleError::CommandInFlight(_)) => "CommandInFlight",
        None => "Error",
    }
}

/// Map an `eyre::Report` to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if err.downcast_ref::<Interrupted>().is_some() {
        return "What happened: The run was interrupted (Ctrl-C).\nLikely causes: Operator stop.\nHow to fix: Nothing to fix; the sequence was stopped and the controller notified.".to_string();
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. `solder self-check` validates it without running anything."
        );
    }

    if let Some(ce) = err.downcast_ref::<ConsoleError>() {
        return match ce {
            ConsoleError::InvalidGeometry(msg) => format!(
                "What happened: Pad geometry is invalid ({msg}).\nLikely causes: A zero or negative dimension, or an inner radius not smaller than the outer radius.\nHow to fix: Correct the pad dimensions (flags or pad list CSV) and rerun."
            ),
            ConsoleError::InvalidInput(msg) => format!(
                "What happened: Invalid input ({msg}).\nLikely causes: Missing flag, a positive Z height, or a non-positive solder height or wire diameter.\nHow to fix: Check the values named above; Z is 0 at home and negative below it."
            ),
            ConsoleError::HardwareFault(msg) => format!(
                "What happened: The sequence stopped on a hardware fault ({msg}).\nLikely causes: Wire break, tangled spool, or the controller link dropped mid-run.\nHow to fix: Clear the fault at the machine, re-thread the wire if needed, then start a new run."
            ),
            ConsoleError::TransportUnavailable | ConsoleError::Transport(_) => format!(
                "What happened: Could not talk to the controller ({ce}).\nLikely causes: Link disconnected or the controller stopped responding.\nHow to fix: Reconnect the controller and rerun."
            ),
            ConsoleError::SequenceBusy
            | ConsoleError::InvalidState(_)
            | ConsoleError::CommandInFlight(_) => format!(
                "What happened: Command refused ({ce}).\nLikely causes: A sequence is running or an earlier command has not been acknowledged.\nHow to fix: Wait for the run or the acknowledgement, then retry."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let lower = chain(err).to_ascii_lowercase();

    if err.downcast_ref::<toml::de::Error>().is_some() || lower.contains("parse toml") {
        return format!(
            "What happened: The config file is not valid TOML.\nLikely causes: Typo, wrong value type, or an unknown section layout.\nHow to fix: Fix the file and rerun. Details: {}",
            chain(err)
        );
    }

    if lower.starts_with("invalid configuration") {
        return format!(
            "What happened: Invalid configuration ({}).\nLikely causes: Out-of-range value in the TOML.\nHow to fix: Edit the key named above, then rerun.",
            err.root_cause()
        );
    }

    if lower.contains("pad list csv must have headers") {
        return "Invalid headers in pad list CSV. Expected 'label,shape,z_mm,a_mm,b_mm,solder_height_mm'.".to_string();
    }

    // Generic fallback
    format!(
        "Something went wrong: {}\nHow to fix: Re-run with --log-level=debug for details.",
        chain(err)
    )
}

fn chain(err: &eyre::Report) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Map console errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<Interrupted>().is_some() {
        return 2;
    }
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::HardwareFault(_)) => 3,
        Some(ConsoleError::TransportUnavailable | ConsoleError::Transport(_)) => 4,
        Some(ConsoleError::InvalidGeometry(_) | ConsoleError::InvalidInput(_)) => 5,
        Some(
            ConsoleError::SequenceBusy
            | ConsoleError::InvalidState(_)
            | ConsoleError::CommandInFlight(_),
        ) => 6,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exitCode": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(ConsoleError::HardwareFault("wire break: snap".into()), 3, "HardwareFault")]
    #[case(ConsoleError::TransportUnavailable, 4, "TransportUnavailable")]
    #[case(ConsoleError::InvalidGeometry("side must be > 0".into()), 5, "InvalidGeometry")]
    #[case(ConsoleError::SequenceBusy, 6, "SequenceBusy")]
    fn console_errors_map_through_context(
        #[case] e: ConsoleError,
        #[case] code: i32,
        #[case] reason: &str,
    ) {
        let report = Err::<(), _>(e).wrap_err("simulate").unwrap_err();
        assert_eq!(exit_code_for_error(&report), code);
        assert_eq!(reason_name(&report), reason);
        assert!(humanize(&report).starts_with("What happened:"));
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let report = eyre::Report::new(Interrupted);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "Interrupted");
        assert_eq!(v["exitCode"], 2);
        assert!(v["message"].as_str().unwrap().contains("Ctrl-C"));
    }

    #[test]
    fn unknown_errors_fall_back_to_generic() {
        let report = eyre::eyre!("disk on fire");
        assert_eq!(exit_code_for_error(&report), 1);
        assert!(humanize(&report).contains("disk on fire"));
    }
}
