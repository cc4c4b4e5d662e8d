mod cli;
mod error_fmt;
mod logging;
mod plan;
mod simulate;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use solder_core::ConsoleCfg;

use crate::cli::{Cli, Commands, JSON_MODE};

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            let json = JSON_MODE.get().copied().unwrap_or(false);
            tracing::error!(error = %err, "command failed");
            if json {
                println!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            error_fmt::exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let config = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .or(config.logging.level.as_deref())
        .unwrap_or("info");
    logging::init(cli.json, level, &config.logging)?;
    let mut console_cfg = ConsoleCfg::from(&config);

    match cli.cmd {
        Commands::Plan { pads } => {
            let planned = plan::collect_pads(&pads, &mut console_cfg)?;
            plan::print_plans(&planned, cli.json);
        }
        Commands::Simulate {
            pads,
            inject_wire_break_at_pad,
            timeout_ms,
        } => {
            let planned = plan::collect_pads(&pads, &mut console_cfg)?;
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            let summary = simulate::run_sequence(
                console_cfg,
                &planned,
                inject_wire_break_at_pad,
                Duration::from_millis(timeout_ms),
                &shutdown,
                cli.json,
            )?;
            simulate::print_summary(&summary, cli.json);
        }
        Commands::SelfCheck => {
            let link = simulate::self_check(console_cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({"ok": true, "config": cli.config, "link": link})
                );
            } else {
                println!("self-check ok: config valid, simulated link {link:?}");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<solder_config::Config> {
    let Some(path) = path else {
        return Ok(solder_config::Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let config = solder_config::load_toml(&text)
        .wrap_err_with(|| format!("parse TOML {}", path.display()))?;
    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}
