//! The per-tick calibration pipeline.
//!
//! `CalibrationEngine` owns every piece of control state: the active filter,
//! the calibration window, the estimator scratch space, the live bounds and
//! the mode arbiter. The control loop calls [`CalibrationEngine::tick`] once
//! per period; nothing else mutates engine state.

use lumen_traits::PanelSnapshot;

use crate::bounds::{Bounds, BoundsSmoother, RobustBoundsEstimator};
use crate::calibration::CalibrationWindow;
use crate::config::{EngineConfig, SensorFaultPolicy};
use crate::filter::Filter;
use crate::mapper::{duty_from_lux, manual_duty};
use crate::mode::{Mode, ModeArbiter};

/// Read-only view of one tick, for display and logging collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Zero-based tick counter.
    pub tick: u64,
    pub mode: Mode,
    pub led_enabled: bool,
    /// True when a sensor sample was consumed this tick.
    pub sampled: bool,
    /// Last raw sample fed to the filter, if any.
    pub raw_lux: Option<f64>,
    /// Last filter output, if any.
    pub filtered_lux: Option<f64>,
    pub bounds: Bounds,
    /// Duty handed to the actuator, already gated and in `[0, max_duty]`.
    pub duty: u16,
    /// Total failed sensor reads so far.
    pub sensor_faults: u64,
}

/// Result of pushing one raw sample through the Auto pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub filtered: f64,
    pub bounds: Bounds,
    /// Ungated candidate duty.
    pub duty: u16,
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    cfg: EngineConfig,
    filter: Filter,
    window: CalibrationWindow,
    estimator: RobustBoundsEstimator,
    smoother: BoundsSmoother,
    arbiter: ModeArbiter,
    ticks: u64,
    last_sample_ms: Option<u64>,
    auto_duty: u16,
    last_raw: Option<f64>,
    last_filtered: Option<f64>,
    sensor_faults: u64,
}

impl CalibrationEngine {
    /// Build the engine. All buffers are sized here; `tick` does not allocate.
    pub fn new(cfg: EngineConfig) -> Self {
        let capacity = cfg.calibration.window_capacity.max(1);
        Self {
            filter: Filter::from_kind(cfg.filter),
            window: CalibrationWindow::new(capacity),
            estimator: RobustBoundsEstimator::with_capacity(capacity),
            smoother: BoundsSmoother::new(cfg.calibration.blend_alpha, cfg.calibration.initial),
            arbiter: ModeArbiter::new(cfg.dwell_ticks),
            cfg,
            ticks: 0,
            last_sample_ms: None,
            auto_duty: 0,
            last_raw: None,
            last_filtered: None,
            sensor_faults: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn window(&self) -> &CalibrationWindow {
        &self.window
    }

    pub fn bounds(&self) -> Bounds {
        self.smoother.live()
    }

    pub fn mode(&self) -> Mode {
        self.arbiter.current()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn sensor_faults(&self) -> u64 {
        self.sensor_faults
    }

    /// Return to the freshly constructed state, keeping configuration and
    /// precomputed filter coefficients.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.window.clear();
        self.smoother = BoundsSmoother::new(
            self.cfg.calibration.blend_alpha,
            self.cfg.calibration.initial,
        );
        self.arbiter = ModeArbiter::new(self.cfg.dwell_ticks);
        self.ticks = 0;
        self.last_sample_ms = None;
        self.auto_duty = 0;
        self.last_raw = None;
        self.last_filtered = None;
        self.sensor_faults = 0;
    }

    /// Whether an Auto tick at `now_ms` would pull a new sample.
    pub fn sample_due(&self, now_ms: u64) -> bool {
        self.last_sample_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.cfg.timing.sample_ms)
    }

    /// Run one control tick.
    ///
    /// `read` is called at most once, only in Auto mode when a sample is due.
    /// It returns `None` for a failed read, which is replaced according to the
    /// configured [`SensorFaultPolicy`].
    pub fn tick<F>(&mut self, now_ms: u64, panel: PanelSnapshot, read: F) -> Diagnostics
    where
        F: FnOnce() -> Option<f64>,
    {
        let mode = self.arbiter.arbitrate(panel.auto_mode);
        let mut sampled = false;

        let candidate = match mode {
            Mode::Auto => {
                if self.sample_due(now_ms) {
                    self.last_sample_ms = Some(now_ms);
                    let raw = self.resolve_reading(read());
                    self.process_sample(raw);
                    sampled = true;
                }
                self.auto_duty
            }
            Mode::Manual => manual_duty(
                panel.pot_raw,
                self.cfg.output.adc_max,
                self.cfg.output.max_duty,
            ),
        };
        let duty = ModeArbiter::gate(panel.led_enabled, candidate);

        let diag = Diagnostics {
            tick: self.ticks,
            mode,
            led_enabled: panel.led_enabled,
            sampled,
            raw_lux: self.last_raw,
            filtered_lux: self.last_filtered,
            bounds: self.smoother.live(),
            duty,
            sensor_faults: self.sensor_faults,
        };
        self.ticks = self.ticks.wrapping_add(1);
        tracing::trace!(tick = diag.tick, mode = %mode, duty, sampled, "tick");
        diag
    }

    /// Push one raw sample through filter, window, estimator, smoother and
    /// mapper. The resulting duty is remembered as the held Auto duty.
    pub fn process_sample(&mut self, raw: f64) -> SampleOutcome {
        let filtered = self.filter.process(raw);
        self.window.add(filtered);
        if self.cfg.calibration.adaptive {
            let estimate = self.estimator.estimate(&self.window, self.smoother.live());
            self.smoother.blend(estimate);
        }
        let bounds = self.smoother.live();
        let duty = duty_from_lux(filtered, bounds, self.cfg.output.max_duty);

        self.last_raw = Some(raw);
        self.last_filtered = Some(filtered);
        self.auto_duty = duty;
        tracing::debug!(
            raw,
            filtered,
            min = bounds.min,
            max = bounds.max,
            duty,
            "sample"
        );
        SampleOutcome {
            filtered,
            bounds,
            duty,
        }
    }

    fn resolve_reading(&mut self, reading: Option<f64>) -> f64 {
        match reading {
            Some(lux) => lux,
            None => {
                self.sensor_faults += 1;
                match self.cfg.fault_policy {
                    SensorFaultPolicy::Hold => self.last_raw.unwrap_or(0.0),
                    SensorFaultPolicy::Zero => 0.0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterKind;

    fn auto_on() -> PanelSnapshot {
        PanelSnapshot {
            led_enabled: true,
            auto_mode: true,
            pot_raw: 0,
        }
    }

    #[test]
    fn first_auto_tick_samples_immediately() {
        let mut e = CalibrationEngine::new(EngineConfig::default());
        let d = e.tick(0, auto_on(), || Some(500.0));
        assert!(d.sampled);
        assert_eq!(d.duty, 512);
        assert_eq!(d.tick, 0);
    }

    #[test]
    fn duty_is_held_between_samples() {
        let mut e = CalibrationEngine::new(EngineConfig::default());
        let first = e.tick(0, auto_on(), || Some(500.0));
        let mut calls = 0;
        let held = e.tick(10, auto_on(), || {
            calls += 1;
            Some(0.0)
        });
        assert_eq!(calls, 0);
        assert!(!held.sampled);
        assert_eq!(held.duty, first.duty);
        assert!(e.tick(500, auto_on(), || Some(500.0)).sampled);
    }

    #[test]
    fn hold_policy_reuses_last_good_reading() {
        let mut e = CalibrationEngine::new(EngineConfig::default());
        e.tick(0, auto_on(), || Some(300.0));
        let d = e.tick(500, auto_on(), || None);
        assert_eq!(d.raw_lux, Some(300.0));
        assert_eq!(d.sensor_faults, 1);
    }

    #[test]
    fn zero_policy_feeds_zero() {
        let cfg = EngineConfig {
            fault_policy: SensorFaultPolicy::Zero,
            ..EngineConfig::default()
        };
        let mut e = CalibrationEngine::new(cfg);
        e.tick(0, auto_on(), || Some(300.0));
        let d = e.tick(500, auto_on(), || None);
        assert_eq!(d.raw_lux, Some(0.0));
    }

    #[test]
    fn fixed_scale_keeps_initial_bounds() {
        let mut cfg = EngineConfig {
            filter: FilterKind::ExponentialMovingAverage { alpha: 1.0 },
            ..EngineConfig::default()
        };
        cfg.calibration.adaptive = false;
        cfg.calibration.initial = Bounds::new(0.0, 2750.0);
        let mut e = CalibrationEngine::new(cfg);
        let out = e.process_sample(1375.0);
        assert_eq!(out.bounds, Bounds::new(0.0, 2750.0));
        assert_eq!(out.duty, 512);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut e = CalibrationEngine::new(EngineConfig::default());
        for i in 0..5 {
            e.tick(i * 500, auto_on(), || Some(800.0));
        }
        e.reset();
        assert_eq!(e.ticks(), 0);
        assert_eq!(e.window().available(), 0);
        assert_eq!(e.bounds(), Bounds::default());
        assert!(e.sample_due(0));
    }
}
