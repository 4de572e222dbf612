//! Boundary traits between the light-matching core and its collaborators.
//!
//! Everything the core needs from the outside world (a lux reading, the
//! operator switches, a PWM output, time) goes through these traits so the
//! control logic stays hardware-agnostic.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Source of averaged ambient-light readings.
///
/// One call is one sampling event. Implementations that combine several
/// physical channels are expected to sample them close enough in time to be
/// treated as simultaneous.
pub trait LuxSensor {
    fn read_lux(&mut self) -> Result<f64, BoxError>;
}

/// Sink for the LED duty command, already constrained to `[0, max_duty]`.
pub trait Actuator {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError>;
}

/// Operator inputs polled once per tick.
pub trait ControlPanel {
    fn poll(&mut self) -> Result<PanelSnapshot, BoxError>;
}

/// Plain snapshot of the operator inputs. Debouncing, if any, happened
/// before this value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSnapshot {
    /// On/off switch; when false the LED is forced dark.
    pub led_enabled: bool,
    /// Auto/manual switch; true selects the light-matching path.
    pub auto_mode: bool,
    /// Raw potentiometer ADC count used in manual mode.
    pub pot_raw: u16,
}

impl Default for PanelSnapshot {
    fn default() -> Self {
        Self {
            led_enabled: true,
            auto_mode: true,
            pot_raw: 0,
        }
    }
}

impl<T: LuxSensor + ?Sized> LuxSensor for Box<T> {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        (**self).read_lux()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError> {
        (**self).set_duty(duty)
    }
}

impl<T: ControlPanel + ?Sized> ControlPanel for Box<T> {
    fn poll(&mut self) -> Result<PanelSnapshot, BoxError> {
        (**self).poll()
    }
}
