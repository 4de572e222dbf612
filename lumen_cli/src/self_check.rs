//! The `self-check` command.

use lumen_core::controller::validate_engine_config;
use lumen_core::util::ticks_per_sample;
use lumen_core::{EngineConfig, Filter};

/// What `self-check` found.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub filter: &'static str,
    pub degraded: bool,
    /// Savitzky–Golay only: effective window, order and coefficient sum.
    pub savgol: Option<(usize, usize, f64)>,
    pub ticks_per_sample: u64,
    pub window_capacity: usize,
    pub hardware_lux: Option<f64>,
}

pub fn self_check(cfg: &lumen_config::Config) -> eyre::Result<CheckReport> {
    let engine_cfg = EngineConfig::from(cfg);
    validate_engine_config(&engine_cfg)?;

    let filter = Filter::from_kind(engine_cfg.filter);
    let savgol = match &filter {
        Filter::SavitzkyGolay(sg) => Some((
            sg.window(),
            sg.poly_order(),
            sg.coefficients().iter().sum::<f64>(),
        )),
        _ => None,
    };
    if filter.is_degraded() {
        tracing::warn!("Savitzky–Golay fit is singular; filter runs as a plain moving average");
    }

    Ok(CheckReport {
        filter: filter.name(),
        degraded: filter.is_degraded(),
        savgol,
        ticks_per_sample: ticks_per_sample(engine_cfg.timing.tick_ms, engine_cfg.timing.sample_ms),
        window_capacity: engine_cfg.calibration.window_capacity,
        hardware_lux: probe_hardware(cfg)?,
    })
}

/// Open the hardware backend and take one reading from each input.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn probe_hardware(cfg: &lumen_config::Config) -> eyre::Result<Option<f64>> {
    use eyre::WrapErr;
    use lumen_core::hw_error::map_hw_error;
    use lumen_traits::{ControlPanel, LuxSensor};

    let mut b = crate::backend::hardware(cfg)?;
    let lux = b
        .sensor
        .read_lux()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading light sensor")?;
    let panel = b
        .panel
        .poll()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("polling control panel")?;
    tracing::info!(lux, ?panel, "hardware probe ok");
    Ok(Some(lux))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn probe_hardware(_cfg: &lumen_config::Config) -> eyre::Result<Option<f64>> {
    Ok(None)
}

pub fn print_report(r: &CheckReport, json: bool) {
    if json {
        let line = serde_json::json!({
            "ok": true,
            "filter": r.filter,
            "degraded": r.degraded,
            "savgol_window": r.savgol.map(|s| s.0),
            "savgol_poly_order": r.savgol.map(|s| s.1),
            "savgol_coeff_sum": r.savgol.map(|s| s.2),
            "ticks_per_sample": r.ticks_per_sample,
            "window_capacity": r.window_capacity,
            "hardware_lux": r.hardware_lux,
        });
        println!("{line}");
        return;
    }
    println!("Self-check OK");
    println!("Filter: {}{}", r.filter, if r.degraded { " (degraded)" } else { "" });
    if let Some((window, order, sum)) = r.savgol {
        println!("Savitzky–Golay: window {window}, order {order}, coefficient sum {sum:.6}");
    }
    println!(
        "Timing: one sample every {} ticks; calibration window {} samples",
        r.ticks_per_sample, r.window_capacity
    );
    match r.hardware_lux {
        Some(lux) => println!("Hardware: sensor reads {lux:.1} lux"),
        None => println!("Hardware: simulated backend"),
    }
}
