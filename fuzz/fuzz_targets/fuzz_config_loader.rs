#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = solder_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config must always build a session.
        let console = solder_core::ConsoleCfg::from(&cfg);
        assert!(
            solder_core::ConsoleSession::builder()
                .with_config(console)
                .build()
                .is_ok()
        );
    }
});
