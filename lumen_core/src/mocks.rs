//! Test and helper mocks for lumen_core

use std::sync::{Arc, Mutex};

use lumen_traits::{Actuator, BoxError, ControlPanel, LuxSensor, PanelSnapshot};

/// A sensor that always reports the same lux.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSensor(pub f64);

impl LuxSensor for ConstantSensor {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        Ok(self.0)
    }
}

/// A sensor that always errors; useful for exercising the fault policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSensor;

impl LuxSensor for FailingSensor {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        Err(Box::new(std::io::Error::other("sensor unavailable")))
    }
}

/// Actuator that records every duty written. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    writes: Arc<Mutex<Vec<u16>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<u16> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<u16> {
        self.writes.lock().ok().and_then(|w| w.last().copied())
    }
}

impl Actuator for RecordingActuator {
    fn set_duty(&mut self, duty: u16) -> Result<(), BoxError> {
        if let Ok(mut w) = self.writes.lock() {
            w.push(duty);
        }
        Ok(())
    }
}

/// Panel returning a fixed snapshot. Clones share the snapshot, so tests can
/// flip switches while the controller owns a copy.
#[derive(Debug, Clone, Default)]
pub struct FixedPanel {
    state: Arc<Mutex<PanelSnapshot>>,
}

impl FixedPanel {
    pub fn new(snapshot: PanelSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn set(&self, snapshot: PanelSnapshot) {
        if let Ok(mut s) = self.state.lock() {
            *s = snapshot;
        }
    }
}

impl ControlPanel for FixedPanel {
    fn poll(&mut self) -> Result<PanelSnapshot, BoxError> {
        self.state
            .lock()
            .map(|s| *s)
            .map_err(|_| "panel state poisoned".into())
    }
}
