//! Fixed-period control loop and offline trace replay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lumen_traits::{Actuator, ControlPanel, LuxSensor, PanelSnapshot};

use crate::controller::LightController;
use crate::engine::{CalibrationEngine, Diagnostics};
use crate::error::Result;
use crate::util::as_micros_u64;

/// Loop bounds and hooks for [`run`].
#[derive(Default)]
pub struct RunParams {
    /// Stop after this many ticks. `None` runs until `shutdown` is set.
    pub max_ticks: Option<u64>,
    /// Checked before every tick.
    pub shutdown: Option<Arc<AtomicBool>>,
    /// Called with each tick's diagnostics and how long the step took.
    pub on_tick: Option<Box<dyn FnMut(&Diagnostics, Duration)>>,
}

impl core::fmt::Debug for RunParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunParams")
            .field("max_ticks", &self.max_ticks)
            .field("shutdown", &self.shutdown.is_some())
            .field("on_tick", &self.on_tick.is_some())
            .finish()
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Sensor samples consumed.
    pub samples: u64,
    pub sensor_faults: u64,
    /// Steps that took longer than the tick period.
    pub overruns: u64,
    /// Slowest step in microseconds.
    pub max_step_us: u64,
    pub last: Option<Diagnostics>,
}

/// Run `controller` until `max_ticks` or shutdown.
///
/// Each iteration is one `step()` followed by the fixed tick delay. A slow step
/// is counted as an overrun; the delay is not shortened to compensate. On exit,
/// including on error, the LED is driven dark (best effort).
pub fn run<S, A, P>(
    controller: &mut LightController<S, A, P>,
    mut params: RunParams,
) -> Result<RunSummary>
where
    S: LuxSensor,
    A: Actuator,
    P: ControlPanel,
{
    let period = controller.tick_period();
    let clock = Arc::clone(controller.clock());
    let mut summary = RunSummary::default();
    tracing::info!(
        period_ms = period.as_millis() as u64,
        max_ticks = ?params.max_ticks,
        "control loop starting"
    );

    let outcome = loop {
        if params.max_ticks.is_some_and(|n| summary.ticks >= n) {
            break Ok(());
        }
        if params
            .shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            tracing::info!("shutdown requested");
            break Ok(());
        }

        let started = clock.now();
        let diag = match controller.step() {
            Ok(d) => d,
            Err(e) => break Err(e),
        };
        let took = clock.now().saturating_duration_since(started);

        summary.ticks += 1;
        if diag.sampled {
            summary.samples += 1;
        }
        summary.sensor_faults = diag.sensor_faults;
        summary.max_step_us = summary.max_step_us.max(as_micros_u64(took));
        if took > period {
            summary.overruns += 1;
            tracing::debug!(tick = diag.tick, took_us = as_micros_u64(took), "tick overrun");
        }
        summary.last = Some(diag);
        if let Some(cb) = params.on_tick.as_mut() {
            cb(&diag, took);
        }

        clock.sleep(period);
    };

    if let Err(e) = controller.shutdown() {
        tracing::warn!(error = %e, "failed to turn LED off on exit");
    }
    outcome?;
    tracing::info!(
        ticks = summary.ticks,
        samples = summary.samples,
        sensor_faults = summary.sensor_faults,
        overruns = summary.overruns,
        "control loop stopped"
    );
    Ok(summary)
}

/// Feed a recorded trace through `engine`, one sample per sampling event.
///
/// Time advances by `sample_ms` per sample with the LED enabled in Auto mode;
/// nothing sleeps. The engine is reset first.
pub fn replay<I>(engine: &mut CalibrationEngine, samples: I) -> Vec<Diagnostics>
where
    I: IntoIterator<Item = f64>,
{
    engine.reset();
    let step_ms = engine.config().timing.sample_ms.max(1);
    let panel = PanelSnapshot {
        led_enabled: true,
        auto_mode: true,
        pot_raw: 0,
    };
    samples
        .into_iter()
        .zip(0u64..)
        .map(|(lux, i)| {
            engine.tick(i.saturating_mul(step_ms), panel, || lux.is_finite().then_some(lux))
        })
        .collect()
}
