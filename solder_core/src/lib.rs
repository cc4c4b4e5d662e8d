#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Control core of the soldering robot operator console (hardware-agnostic).
//!
//! The controller is reached only through `solder_traits::Transport`
//! (outbound named events) and a queue of `InboundEvent`s (telemetry).
//!
//! ## Architecture
//!
//! - **Calculator**: pad area, solder volume, wire length and feeder steps (`geometry`)
//! - **Thermal**: suggested tip temperature from pad area (`thermal`)
//! - **Telemetry**: shallow-merge reconciliation, flux hysteresis, link liveness (`telemetry`, `events`)
//! - **Sequence**: the per-pad stage machine with passes, pause/resume and faults (`sequence`)
//! - **Dispatch**: ack correlation and per-class in-flight guard (`dispatch`)
//! - **Session**: single owner tying it all together, with snapshots (`session`)
//!
//! ## Units
//!
//! Lengths in millimetres, areas in mm², volumes in mm³, temperatures in °C,
//! durations in milliseconds of the session clock.

pub mod config;
pub mod conversions;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod geometry;
pub mod mocks;
pub mod sequence;
pub mod session;
pub mod telemetry;
pub mod thermal;
pub mod transport_error;
pub mod util;

pub use config::{ConsoleCfg, SpoolCfg, TelemetryCfg, ThermalCfg, WireCfg};
pub use dispatch::{Acknowledgement, Dispatcher, PendingCommand};
pub use error::{BuildError, ConsoleError, ConsoleResult, Report, Result};
pub use events::{Command, CommandClass, JogDirection, SpoolConfig, Subsystem, TelemetryEvent};
pub use geometry::{
    PadCalculator, PadGeometry, PadPlan, PadSizeCategory, WireFeedPlan, compute_area,
    compute_wire_feed_plan,
};
pub use sequence::{Orchestrator, PadJob, SequenceConfig, SequenceEffect, SequenceState, Stage};
pub use session::{ConsoleSession, ConsoleSessionBuilder, ConsoleSnapshot};
pub use telemetry::{LinkState, SpoolAlert, Telemetry};
pub use thermal::{ThermalCompensation, compute_compensation};
