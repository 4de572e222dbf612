//! The `replay` command: push a recorded trace through the engine offline.

use std::io::Write;
use std::path::Path;

use lumen_core::controller::validate_engine_config;
use lumen_core::runner::replay;
use lumen_core::{CalibrationEngine, Diagnostics, EngineConfig};

/// Replay `path` and print one line per sample. Returns the number of samples.
pub fn replay_trace(cfg: &lumen_config::Config, path: &Path, json: bool) -> eyre::Result<usize> {
    let trace = lumen_config::load_trace_csv(path)?;
    let engine_cfg = EngineConfig::from(cfg);
    validate_engine_config(&engine_cfg)?;

    let mut engine = CalibrationEngine::new(engine_cfg);
    let diags = replay(&mut engine, trace.samples());
    tracing::info!(samples = diags.len(), trace = %path.display(), "replay done");

    let mut out = std::io::stdout().lock();
    for (row, d) in trace.rows.iter().zip(&diags) {
        if json {
            writeln!(out, "{}", json_line(row.timestamp, d))?;
        } else {
            writeln!(out, "{}", text_line(row.timestamp, d))?;
        }
    }
    if !json && let Some(d) = diags.last() {
        writeln!(
            out,
            "Replayed {} samples; final bounds [{:.1}, {:.1}] lux, duty {}",
            diags.len(),
            d.bounds.min,
            d.bounds.max,
            d.duty
        )?;
    }
    Ok(diags.len())
}

fn json_line(timestamp: u64, d: &Diagnostics) -> serde_json::Value {
    serde_json::json!({
        "timestamp": timestamp,
        "raw_lux": d.raw_lux,
        "filtered_lux": d.filtered_lux,
        "min_lux": d.bounds.min,
        "max_lux": d.bounds.max,
        "duty": d.duty,
    })
}

fn text_line(timestamp: u64, d: &Diagnostics) -> String {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
    format!(
        "{timestamp:>10}  raw {:>9}  filtered {:>9}  bounds [{:.1}, {:.1}]  duty {}",
        fmt(d.raw_lux),
        fmt(d.filtered_lux),
        d.bounds.min,
        d.bounds.max,
        d.duty
    )
}
