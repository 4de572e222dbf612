#![no_main]
use libfuzzer_sys::fuzz_target;

// Well beyond direct sunlight; keeps the span floor representable.
const MAX_ABS_LUX: f64 = 1e9;

fuzz_target!(|data: &[u8]| {
    let Ok(trace) = lumen_config::read_trace(data) else {
        return;
    };
    if trace.samples().any(|l| l.abs() > MAX_ABS_LUX) {
        return;
    }
    let mut engine = lumen_core::CalibrationEngine::new(lumen_core::EngineConfig::default());
    let max_duty = engine.config().output.max_duty;
    for d in lumen_core::runner::replay(&mut engine, trace.samples()) {
        assert!(d.duty <= max_duty);
        assert!(d.bounds.max > d.bounds.min);
    }
});
