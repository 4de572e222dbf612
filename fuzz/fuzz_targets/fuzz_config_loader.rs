#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<lumen_config::Config>(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must build an engine.
        let engine_cfg = lumen_core::EngineConfig::from(&cfg);
        let _ = lumen_core::CalibrationEngine::new(engine_cfg);
    }
});
