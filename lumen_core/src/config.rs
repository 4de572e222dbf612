//! Runtime configuration for the calibration engine.
//!
//! These are the structs `CalibrationEngine` is built from. They are separate
//! from the TOML-deserialized config in `lumen_config`; see `conversions`.

use crate::bounds::Bounds;

/// Smoother selection and parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    SimpleMovingAverage { window: usize },
    /// `alpha` in (0, 1].
    ExponentialMovingAverage { alpha: f64 },
    /// An even `window` is widened to the next odd size.
    SavitzkyGolay { window: usize, poly_order: usize },
}

impl Default for FilterKind {
    fn default() -> Self {
        Self::ExponentialMovingAverage { alpha: 0.1 }
    }
}

/// Calibration window and bounds tracking.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationCfg {
    /// Capacity W of the calibration window.
    pub window_capacity: usize,
    /// Blend rate of new estimates into the live bounds.
    pub blend_alpha: f64,
    /// Live bounds before the first estimate.
    pub initial: Bounds,
    /// When false the live bounds stay at `initial` (fixed-scale mapping).
    pub adaptive: bool,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            // 5 minutes at 500 ms
            window_capacity: 600,
            blend_alpha: 0.05,
            initial: Bounds::default(),
            adaptive: true,
        }
    }
}

/// Loop timing.
#[derive(Debug, Clone, Copy)]
pub struct TimingCfg {
    /// Fixed delay between ticks.
    pub tick_ms: u64,
    /// Minimum time between two Auto-mode sensor samples.
    pub sample_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            sample_ms: 500,
        }
    }
}

/// Duty range and potentiometer scale.
#[derive(Debug, Clone, Copy)]
pub struct OutputCfg {
    pub max_duty: u16,
    pub adc_max: u16,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            max_duty: 1023,
            adc_max: 4095,
        }
    }
}

/// What a failed sensor read turns into before it reaches the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFaultPolicy {
    /// Re-use the last good raw sample (0 if there is none yet).
    #[default]
    Hold,
    /// Feed 0 lux.
    Zero,
}

/// Full engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub filter: FilterKind,
    pub calibration: CalibrationCfg,
    pub timing: TimingCfg,
    pub output: OutputCfg,
    /// Consecutive ticks a mode change must persist; 0 disables dwell.
    pub dwell_ticks: u32,
    pub fault_policy: SensorFaultPolicy,
}
