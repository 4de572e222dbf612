//! Binds the engine to its collaborators.
//!
//! `LightController` polls the panel, lets the engine pull a sensor sample when
//! one is due, and writes the resulting duty to the actuator. The type-state
//! builder enforces at compile time that sensor, actuator and panel are
//! provided before `build()` is available; `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use lumen_traits::{Actuator, Clock, ControlPanel, LuxSensor, MonotonicClock};

use crate::config::EngineConfig;
use crate::engine::{CalibrationEngine, Diagnostics};
use crate::error::{BuildError, Result};
use crate::hw_error::map_hw_error;
use crate::util::tick_period;

/// Controller over boxed collaborators, as produced by the builder.
pub type DynController =
    LightController<Box<dyn LuxSensor>, Box<dyn Actuator>, Box<dyn ControlPanel>>;

pub struct LightController<S, A, P> {
    engine: CalibrationEngine,
    sensor: S,
    actuator: A,
    panel: P,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_written: Option<u16>,
}

impl<S, A, P> core::fmt::Debug for LightController<S, A, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LightController")
            .field("mode", &self.engine.mode())
            .field("bounds", &self.engine.bounds())
            .field("ticks", &self.engine.ticks())
            .field("last_written", &self.last_written)
            .finish_non_exhaustive()
    }
}

impl DynController {
    pub fn builder() -> LightControllerBuilder<Missing, Missing, Missing> {
        LightControllerBuilder::default()
    }
}

impl<S, A, P> LightController<S, A, P>
where
    S: LuxSensor,
    A: Actuator,
    P: ControlPanel,
{
    /// Validate `cfg` and build a controller on the monotonic clock.
    pub fn new(sensor: S, actuator: A, panel: P, cfg: EngineConfig) -> Result<Self> {
        Self::with_clock(sensor, actuator, panel, cfg, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        sensor: S,
        actuator: A,
        panel: P,
        cfg: EngineConfig,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        validate_engine_config(&cfg).map_err(eyre::Report::new)?;
        let epoch = clock.now();
        Ok(Self {
            engine: CalibrationEngine::new(cfg),
            sensor,
            actuator,
            panel,
            clock,
            epoch,
            last_written: None,
        })
    }

    pub fn engine(&self) -> &CalibrationEngine {
        &self.engine
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn tick_period(&self) -> Duration {
        tick_period(self.engine.config().timing.tick_ms)
    }

    /// Milliseconds since construction on the controller's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// One control tick: poll panel, run the engine, write the duty.
    ///
    /// Sensor failures never abort the tick; they are counted and replaced
    /// according to the fault policy. Panel and actuator failures are returned.
    pub fn step(&mut self) -> Result<Diagnostics> {
        let snapshot = self
            .panel
            .poll()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("polling control panel")?;

        let now = self.clock.ms_since(self.epoch);
        let sensor = &mut self.sensor;
        let diag = self.engine.tick(now, snapshot, || match sensor.read_lux() {
            Ok(lux) if lux.is_finite() => Some(lux),
            Ok(lux) => {
                tracing::warn!(lux, "sensor returned a non-finite reading");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "sensor read failed");
                None
            }
        });

        if self.last_written != Some(diag.duty) {
            self.actuator
                .set_duty(diag.duty)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("writing LED duty")?;
            self.last_written = Some(diag.duty);
        }
        Ok(diag)
    }

    /// Drive the LED dark.
    pub fn shutdown(&mut self) -> Result<()> {
        self.actuator
            .set_duty(0)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("turning LED off")?;
        self.last_written = Some(0);
        Ok(())
    }
}

/// Reject configurations the engine cannot run with.
pub fn validate_engine_config(cfg: &EngineConfig) -> std::result::Result<(), BuildError> {
    use crate::config::FilterKind;

    match cfg.filter {
        FilterKind::SimpleMovingAverage { window } if window == 0 => {
            return Err(BuildError::InvalidConfig("filter.window must be >= 1"));
        }
        FilterKind::ExponentialMovingAverage { alpha } if !(alpha > 0.0 && alpha <= 1.0) => {
            return Err(BuildError::InvalidConfig("filter.alpha must be in (0.0, 1.0]"));
        }
        FilterKind::SavitzkyGolay { window, .. } if window == 0 => {
            return Err(BuildError::InvalidConfig("filter.window must be >= 1"));
        }
        _ => {}
    }
    let cal = &cfg.calibration;
    if cal.window_capacity == 0 {
        return Err(BuildError::InvalidConfig(
            "calibration.window_capacity must be >= 1",
        ));
    }
    if !(cal.blend_alpha > 0.0 && cal.blend_alpha <= 1.0) {
        return Err(BuildError::InvalidConfig(
            "calibration.blend_alpha must be in (0.0, 1.0]",
        ));
    }
    if !(cal.initial.min.is_finite() && cal.initial.max.is_finite())
        || cal.initial.max <= cal.initial.min
    {
        return Err(BuildError::InvalidConfig(
            "calibration initial bounds must be finite with max > min",
        ));
    }
    if cfg.timing.tick_ms == 0 {
        return Err(BuildError::InvalidConfig("timing.tick_ms must be >= 1"));
    }
    if cfg.timing.sample_ms < cfg.timing.tick_ms {
        return Err(BuildError::InvalidConfig(
            "timing.sample_ms must be >= timing.tick_ms",
        ));
    }
    if cfg.output.max_duty == 0 {
        return Err(BuildError::InvalidConfig("output.max_duty must be >= 1"));
    }
    if cfg.output.adc_max == 0 {
        return Err(BuildError::InvalidConfig("output.adc_max must be >= 1"));
    }
    Ok(())
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for a boxed `LightController`.
pub struct LightControllerBuilder<S, A, P> {
    sensor: Option<Box<dyn LuxSensor>>,
    actuator: Option<Box<dyn Actuator>>,
    panel: Option<Box<dyn ControlPanel>>,
    config: Option<EngineConfig>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _a: PhantomData<A>,
    _p: PhantomData<P>,
}

impl Default for LightControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            actuator: None,
            panel: None,
            config: None,
            clock: None,
            _s: PhantomData,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<S, A, P> LightControllerBuilder<S, A, P> {
    pub fn with_config(mut self, cfg: EngineConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build without compile-time guarantees; reports the first missing piece.
    pub fn try_build(self) -> Result<DynController> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let panel = self
            .panel
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPanel))?;
        let cfg = self.config.unwrap_or_default();
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        LightController::with_clock(sensor, actuator, panel, cfg, clock)
    }
}

impl<A, P> LightControllerBuilder<Missing, A, P> {
    pub fn with_sensor(
        self,
        sensor: impl LuxSensor + 'static,
    ) -> LightControllerBuilder<Set, A, P> {
        LightControllerBuilder {
            sensor: Some(Box::new(sensor)),
            actuator: self.actuator,
            panel: self.panel,
            config: self.config,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<S, P> LightControllerBuilder<S, Missing, P> {
    pub fn with_actuator(
        self,
        actuator: impl Actuator + 'static,
    ) -> LightControllerBuilder<S, Set, P> {
        LightControllerBuilder {
            sensor: self.sensor,
            actuator: Some(Box::new(actuator)),
            panel: self.panel,
            config: self.config,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<S, A> LightControllerBuilder<S, A, Missing> {
    pub fn with_panel(
        self,
        panel: impl ControlPanel + 'static,
    ) -> LightControllerBuilder<S, A, Set> {
        LightControllerBuilder {
            sensor: self.sensor,
            actuator: self.actuator,
            panel: Some(Box::new(panel)),
            config: self.config,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl LightControllerBuilder<Set, Set, Set> {
    /// Build once all collaborators are present. Configuration is still
    /// validated.
    pub fn build(self) -> Result<DynController> {
        self.try_build()
    }
}
