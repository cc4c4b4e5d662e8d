use rstest::rstest;
use solder_core::error::BuildError;
use solder_core::{ConsoleCfg, ConsoleSession, SequenceConfig};

#[rstest]
#[case::zero_wire(ConsoleCfg { wire: solder_core::WireCfg { diameter_mm: 0.0, ..Default::default() }, ..Default::default() })]
#[case::inverted_clamp(ConsoleCfg { thermal: solder_core::ThermalCfg { min_temp_c: 400.0, max_temp_c: 300.0, ..Default::default() }, ..Default::default() })]
#[case::zero_heartbeat(ConsoleCfg { telemetry: solder_core::TelemetryCfg { heartbeat_timeout_ms: 0, ..Default::default() }, ..Default::default() })]
#[case::zero_passes(ConsoleCfg { sequence: SequenceConfig { passes_per_large_pad: 0, ..Default::default() }, ..Default::default() })]
fn invalid_config_yields_typed_build_error(#[case] cfg: ConsoleCfg) {
    let err = ConsoleSession::builder()
        .with_config(cfg)
        .build()
        .expect_err("should fail with InvalidConfig");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(_)) => {}
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[test]
fn defaults_build_without_transport() {
    let s = ConsoleSession::builder().build().expect("defaults are valid");
    assert!(s.transport().is_none());
    assert!(s.pad_plan().is_none());
}
