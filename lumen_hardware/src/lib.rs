//! Collaborators for the light-matching controller.
//!
//! The simulated backend (always available) provides synthetic daylight,
//! trace playback, a settable control panel and an LED that only records its
//! duty. The `hardware` feature adds Raspberry Pi drivers built on `rppal`:
//! VEML7700 light sensors on I2C, an MCP3208 ADC for the potentiometer,
//! hardware PWM for the LED and GPIO switches.
pub mod error;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hardware;

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use lumen_traits::{Actuator, BoxError, ControlPanel, LuxSensor, PanelSnapshot};

use crate::error::HwError;

/// Parameters of the synthetic daylight signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaylightProfile {
    pub base_lux: f64,
    /// Peak deviation of the sine from `base_lux`.
    pub swing_lux: f64,
    /// Sine period in sensor reads; 0 disables the swing.
    pub period_samples: u64,
    /// Uniform noise amplitude.
    pub noise_lux: f64,
    /// Replace every Nth read with `spike_lux`; 0 disables spikes.
    pub spike_every: u64,
    pub spike_lux: f64,
}

impl Default for DaylightProfile {
    fn default() -> Self {
        Self {
            base_lux: 500.0,
            swing_lux: 0.0,
            period_samples: 0,
            noise_lux: 0.0,
            spike_every: 0,
            spike_lux: 0.0,
        }
    }
}

/// Deterministic synthetic daylight: sine + noise + periodic spikes, clamped
/// at 0 lux.
pub struct SimulatedDaylight {
    profile: DaylightProfile,
    reads: u64,
    rng: u32,
}

impl SimulatedDaylight {
    pub fn new(profile: DaylightProfile) -> Self {
        Self {
            profile,
            reads: 0,
            rng: 0x9E37_79B9,
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    // xorshift32 in [-1, 1)
    fn next_noise(&mut self) -> f64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0) * 2.0 - 1.0
    }

    fn level(&mut self, n: u64) -> f64 {
        let p = self.profile;
        if p.spike_every > 0 && (n + 1) % p.spike_every == 0 {
            return p.spike_lux;
        }
        let swing = if p.period_samples > 0 {
            let phase = (n % p.period_samples) as f64 / p.period_samples as f64;
            p.swing_lux * (phase * std::f64::consts::TAU).sin()
        } else {
            0.0
        };
        let noise = if p.noise_lux > 0.0 {
            p.noise_lux * self.next_noise()
        } else {
            0.0
        };
        (p.base_lux + swing + noise).max(0.0)
    }
}

impl LuxSensor for SimulatedDaylight {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        let n = self.reads;
        self.reads += 1;
        let lux = self.level(n);
        tracing::trace!(lux, read = n, "simulated daylight");
        Ok(lux)
    }
}

/// Plays back recorded samples, then reports a timeout once exhausted.
pub struct TraceSensor {
    samples: VecDeque<f64>,
}

impl TraceSensor {
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl LuxSensor for TraceSensor {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        self.samples
            .pop_front()
            .ok_or_else(|| Box::new(HwError::Timeout) as BoxError)
    }
}

/// Averages two sensors facing the same window.
///
/// If one channel fails the other is used alone; only when both fail is an
/// error returned.
pub struct DualSensor<A, B> {
    a: A,
    b: B,
}

impl<A: LuxSensor, B: LuxSensor> DualSensor<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A: LuxSensor, B: LuxSensor> LuxSensor for DualSensor<A, B> {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        match (self.a.read_lux(), self.b.read_lux()) {
            (Ok(a), Ok(b)) => Ok((a + b) / 2.0),
            (Ok(v), Err(e)) | (Err(e), Ok(v)) => {
                tracing::warn!(error = %e, "one light sensor failed; using the other");
                Ok(v)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }
}

/// Panel whose switches are set programmatically. Clones share state.
#[derive(Clone, Default)]
pub struct SharedPanel {
    state: Rc<Cell<PanelSnapshot>>,
}

impl SharedPanel {
    pub fn new(snapshot: PanelSnapshot) -> Self {
        Self {
            state: Rc::new(Cell::new(snapshot)),
        }
    }

    pub fn set(&self, snapshot: PanelSnapshot) {
        self.state.set(snapshot);
    }

    pub fn get(&self) -> PanelSnapshot {
        self.state.get()
    }
}

impl ControlPanel for SharedPanel {
    fn poll(&mut self) -> Result<PanelSnapshot, BoxError> {
        Ok(self.state.get())
    }
}

/// LED that records the last duty and how many writes it received.
#[derive(Clone, Default)]
pub struct SimulatedLed {
    duty: Rc<Cell<u16>>,
    writes: Rc<Cell<u64>>,
}

impl SimulatedLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }

    pub fn writes(&self) -> u64 {
        self.writes.get()
    }
}

impl Actuator for SimulatedLed {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError> {
        tracing::debug!(duty, "LED duty (simulated)");
        self.duty.set(duty);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_profile_is_constant() {
        let mut s = SimulatedDaylight::new(DaylightProfile::default());
        for _ in 0..10 {
            assert_eq!(s.read_lux().unwrap(), 500.0);
        }
    }

    #[test]
    fn spikes_land_on_every_nth_read() {
        let mut s = SimulatedDaylight::new(DaylightProfile {
            spike_every: 3,
            spike_lux: 9000.0,
            ..DaylightProfile::default()
        });
        let v: Vec<f64> = (0..6).map(|_| s.read_lux().unwrap()).collect();
        assert_eq!(v, vec![500.0, 500.0, 9000.0, 500.0, 500.0, 9000.0]);
    }

    #[test]
    fn led_clones_share_state() {
        let led = SimulatedLed::new();
        let mut handle = led.clone();
        handle.set_duty(321).unwrap();
        assert_eq!(led.duty(), 321);
        assert_eq!(led.writes(), 1);
    }
}
