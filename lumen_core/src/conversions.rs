//! `From` implementations bridging `lumen_config` types to `lumen_core` types.

use crate::bounds::Bounds;
use crate::config::{
    CalibrationCfg, EngineConfig, FilterKind, OutputCfg, SensorFaultPolicy, TimingCfg,
};

// ── FilterKind ───────────────────────────────────────────────────────────────

impl From<&lumen_config::FilterCfg> for FilterKind {
    fn from(c: &lumen_config::FilterCfg) -> Self {
        match c.kind {
            lumen_config::FilterType::Sma => Self::SimpleMovingAverage { window: c.window },
            lumen_config::FilterType::Ema => Self::ExponentialMovingAverage { alpha: c.alpha },
            lumen_config::FilterType::SavitzkyGolay => Self::SavitzkyGolay {
                window: c.window,
                poly_order: c.poly_order,
            },
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&lumen_config::Calibration> for CalibrationCfg {
    fn from(c: &lumen_config::Calibration) -> Self {
        Self {
            window_capacity: c.window_capacity,
            blend_alpha: c.blend_alpha,
            initial: Bounds::new(c.initial_min_lux, c.initial_max_lux),
            adaptive: c.adaptive,
        }
    }
}

// ── TimingCfg / OutputCfg ────────────────────────────────────────────────────

impl From<&lumen_config::Timing> for TimingCfg {
    fn from(c: &lumen_config::Timing) -> Self {
        Self {
            tick_ms: c.tick_ms,
            sample_ms: c.sample_ms,
        }
    }
}

impl From<&lumen_config::Output> for OutputCfg {
    fn from(c: &lumen_config::Output) -> Self {
        Self {
            max_duty: c.max_duty,
            adc_max: c.adc_max,
        }
    }
}

impl From<lumen_config::FaultPolicy> for SensorFaultPolicy {
    fn from(p: lumen_config::FaultPolicy) -> Self {
        match p {
            lumen_config::FaultPolicy::Hold => Self::Hold,
            lumen_config::FaultPolicy::Zero => Self::Zero,
        }
    }
}

// ── EngineConfig ─────────────────────────────────────────────────────────────

impl From<&lumen_config::Config> for EngineConfig {
    fn from(c: &lumen_config::Config) -> Self {
        Self {
            filter: FilterKind::from(&c.filter),
            calibration: CalibrationCfg::from(&c.calibration),
            timing: TimingCfg::from(&c.timing),
            output: OutputCfg::from(&c.output),
            dwell_ticks: c.mode.dwell_ticks,
            fault_policy: c.sensor.fault_policy.into(),
        }
    }
}
