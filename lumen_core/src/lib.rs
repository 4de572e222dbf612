#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::must_use_candidate
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Adaptive light-matching core (hardware-agnostic).
//!
//! Converts averaged ambient-light readings into an LED duty command so that
//! indoor light follows outdoor light. All hardware interactions go through
//! the `lumen_traits` boundary traits.
//!
//! ## Pipeline
//!
//! Per sampling event in Auto mode:
//!
//! `raw lux → Filter → CalibrationWindow → RobustBoundsEstimator → BoundsSmoother → duty`
//!
//! Manual mode maps the potentiometer straight onto the duty range. The
//! on/off switch gates both paths every tick.
//!
//! - **Filtering**: SMA, EMA and Savitzky–Golay (`filter`, `savgol`)
//! - **Calibration**: fixed-capacity window of filtered lux (`calibration`, `ring`)
//! - **Bounds**: median/MAD range estimate, exponential blend (`bounds`)
//! - **Mapping**: clamped linear lux→duty, integer pot→duty (`mapper`)
//! - **Mode**: auto/manual arbitration with optional dwell (`mode`)
//! - **Engine**: one value that owns all of the above (`engine`)
//! - **Controller / runner**: collaborators, fixed-period loop, replay
//!
//! The numeric pipeline never fails. Degenerate inputs resolve to defined
//! values: empty windows keep the previous bounds, collapsed ranges get a
//! 1 lux span, singular Savitzky–Golay fits use uniform weights.

pub mod bounds;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod mapper;
pub mod mocks;
pub mod mode;
pub mod ring;
pub mod runner;
pub mod savgol;
pub mod util;

pub use bounds::{Bounds, BoundsSmoother, RobustBoundsEstimator};
pub use calibration::CalibrationWindow;
pub use config::{
    CalibrationCfg, EngineConfig, FilterKind, OutputCfg, SensorFaultPolicy, TimingCfg,
};
pub use controller::{DynController, LightController, LightControllerBuilder, Missing, Set};
pub use engine::{CalibrationEngine, Diagnostics, SampleOutcome};
pub use error::{BuildError, LumenError, Result};
pub use filter::Filter;
pub use mapper::{duty_from_lux, linear_map, manual_duty};
pub use mode::{Mode, ModeArbiter};
pub use runner::{RunParams, RunSummary};
