//! The `run` command: backend assembly, the control loop and its report.

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use eyre::WrapErr;
use lumen_core::runner::{self, RunParams, RunSummary};
use lumen_core::util::{as_micros_u64, ticks_per_sample};
use lumen_core::{DynController, EngineConfig};
use lumen_traits::PanelSnapshot;

use crate::backend;
use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// Flags of the `run` command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: Option<u64>,
    /// Initial switches for the simulated panel.
    pub panel: PanelSnapshot,
    pub trace: Option<PathBuf>,
    pub stats: bool,
    pub rt: bool,
    pub rt_lock: Option<RtLock>,
}

/// Everything printed after a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub backend: &'static str,
    pub summary: RunSummary,
    pub duration_ms: u64,
    /// Writes seen by the simulated LED, when simulated.
    pub led_writes: Option<u64>,
}

pub fn run_loop(
    cfg: &lumen_config::Config,
    opts: &RunOptions,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunReport> {
    setup_rt_once(opts.rt, opts.rt_lock.unwrap_or(RtLock::os_default()));

    let engine_cfg = EngineConfig::from(cfg);

    let trace = opts
        .trace
        .as_deref()
        .map(lumen_config::load_trace_csv)
        .transpose()?;

    let backend = select_backend(cfg, opts, trace.as_ref())?;

    // A trace run ends once every row has been sampled. Manual mode never
    // reads the sensor, so it falls back to the nominal tick count; an empty
    // trace runs no ticks.
    let trace_rows = if opts.ticks.is_none() && backend.name == "sim" {
        trace.as_ref().map(|t| t.len() as u64)
    } else {
        None
    };
    let max_ticks = opts.ticks.or_else(|| {
        trace_rows.filter(|&rows| rows == 0 || !opts.panel.auto_mode).map(|rows| {
            let per_sample = ticks_per_sample(engine_cfg.timing.tick_ms, engine_cfg.timing.sample_ms);
            rows.saturating_mul(per_sample)
        })
    });

    let backend_name = backend.name;
    let sim_led = backend.sim_led.clone();
    let mut controller = DynController::builder()
        .with_sensor(backend.sensor)
        .with_actuator(backend.actuator)
        .with_panel(backend.panel)
        .with_config(engine_cfg)
        .build()
        .wrap_err("building controller")?;

    let latencies: Rc<RefCell<Vec<u64>>> = Rc::default();
    let on_tick: Box<dyn FnMut(&lumen_core::Diagnostics, std::time::Duration)> = {
        let latencies = Rc::clone(&latencies);
        let stats = opts.stats;
        let stop = Arc::clone(&shutdown);
        let mut sampled: u64 = 0;
        Box::new(move |d, took| {
            if stats {
                latencies.borrow_mut().push(as_micros_u64(took));
            }
            if d.sampled {
                sampled += 1;
                if trace_rows.is_some_and(|rows| sampled >= rows) {
                    tracing::info!(rows = sampled, "trace exhausted");
                    stop.store(true, Ordering::Relaxed);
                }
                tracing::debug!(
                    tick = d.tick,
                    mode = %d.mode,
                    raw_lux = ?d.raw_lux,
                    filtered_lux = ?d.filtered_lux,
                    min_lux = d.bounds.min,
                    max_lux = d.bounds.max,
                    duty = d.duty,
                    "sample"
                );
            }
        })
    };

    tracing::info!(backend = backend_name, max_ticks = ?max_ticks, "run start");
    let started = Instant::now();
    let summary = runner::run(
        &mut controller,
        RunParams {
            max_ticks,
            shutdown: Some(shutdown),
            on_tick: Some(on_tick),
        },
    )?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if opts.stats {
        print_stats(&latencies.borrow(), &summary, cfg.timing.tick_ms);
    }

    Ok(RunReport {
        backend: backend_name,
        summary,
        duration_ms,
        led_writes: sim_led.map(|l| l.writes()),
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn select_backend(
    cfg: &lumen_config::Config,
    opts: &RunOptions,
    trace: Option<&lumen_config::Trace>,
) -> eyre::Result<backend::Backend> {
    if trace.is_some() || opts.panel != PanelSnapshot::default() {
        tracing::warn!("--trace/--manual/--pot/--off only affect the simulated backend; ignoring");
    }
    backend::hardware(cfg)
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn select_backend(
    cfg: &lumen_config::Config,
    opts: &RunOptions,
    trace: Option<&lumen_config::Trace>,
) -> eyre::Result<backend::Backend> {
    Ok(backend::simulated(cfg, opts.panel, trace))
}

/// Print the run outcome to stdout, as one JSON object with `json`.
pub fn print_report(report: &RunReport, json: bool) -> eyre::Result<()> {
    let s = &report.summary;
    let last = s.last;
    let mut out = std::io::stdout().lock();
    if json {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let line = serde_json::json!({
            "timestamp": timestamp,
            "backend": report.backend,
            "ticks": s.ticks,
            "samples": s.samples,
            "sensor_faults": s.sensor_faults,
            "overruns": s.overruns,
            "max_step_us": s.max_step_us,
            "duration_ms": report.duration_ms,
            "led_writes": report.led_writes,
            "mode": last.map(|d| d.mode.as_str()),
            "led_enabled": last.map(|d| d.led_enabled),
            "duty": last.map(|d| d.duty),
            "filtered_lux": last.and_then(|d| d.filtered_lux),
            "min_lux": last.map(|d| d.bounds.min),
            "max_lux": last.map(|d| d.bounds.max),
        });
        writeln!(out, "{line}")?;
        return Ok(());
    }

    writeln!(
        out,
        "Run complete: {} ticks, {} samples, {} sensor faults ({} backend, {} ms)",
        s.ticks, s.samples, s.sensor_faults, report.backend, report.duration_ms
    )?;
    if let Some(d) = last {
        let filtered = d
            .filtered_lux
            .map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
        writeln!(
            out,
            "Last tick: mode {}, LED {}, duty {}, filtered {filtered} lux, bounds [{:.1}, {:.1}] lux",
            d.mode,
            if d.led_enabled { "on" } else { "off" },
            d.duty,
            d.bounds.min,
            d.bounds.max
        )?;
    }
    Ok(())
}

/// Print latency/jitter stats to stderr.
fn print_stats(latencies: &[u64], summary: &RunSummary, tick_ms: u64) {
    if latencies.is_empty() {
        return;
    }
    let period_us = tick_ms.saturating_mul(1000);
    let min = latencies.iter().copied().min().unwrap_or(0);
    let max = latencies.iter().copied().max().unwrap_or(0);
    let avg = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
    let stdev = if latencies.len() > 1 {
        let var = latencies
            .iter()
            .map(|&x| (x as f64 - avg).powi(2))
            .sum::<f64>()
            / (latencies.len() as f64 - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    eprintln!("\n--- Lumen Stats ---");
    eprintln!("Ticks: {}", summary.ticks);
    eprintln!("Samples: {}", summary.samples);
    eprintln!("Period (us): {period_us}");
    eprintln!("Step latency min/avg/max/stdev (us): {min} / {avg:.1} / {max} / {stdev:.1}");
    eprintln!("Overruns (> period): {}", summary.overruns);
    eprintln!("-------------------\n");
}
