//! Collaborator assembly: simulated (default) or Raspberry Pi hardware.

use lumen_config::{Config, Simulation, Trace};
use lumen_hardware::{DaylightProfile, SharedPanel, SimulatedDaylight, SimulatedLed, TraceSensor};
use lumen_traits::{Actuator, ControlPanel, LuxSensor, PanelSnapshot};

/// Sensor, LED and panel for one controller.
pub struct Backend {
    pub name: &'static str,
    pub sensor: Box<dyn LuxSensor>,
    pub actuator: Box<dyn Actuator>,
    pub panel: Box<dyn ControlPanel>,
    /// Handle onto the simulated LED, to report writes after the run.
    pub sim_led: Option<SimulatedLed>,
}

pub fn daylight_profile(sim: &Simulation) -> DaylightProfile {
    DaylightProfile {
        base_lux: sim.base_lux,
        swing_lux: sim.swing_lux,
        period_samples: sim.period_samples,
        noise_lux: sim.noise_lux,
        spike_every: sim.spike_every,
        spike_lux: sim.spike_lux,
    }
}

/// Simulated backend. Reads come from `trace` when given, otherwise from the
/// `[simulation]` daylight profile. The panel is fixed at `panel`.
pub fn simulated(cfg: &Config, panel: PanelSnapshot, trace: Option<&Trace>) -> Backend {
    let sensor: Box<dyn LuxSensor> = match trace {
        Some(t) => Box::new(TraceSensor::new(t.samples())),
        None => Box::new(SimulatedDaylight::new(daylight_profile(&cfg.simulation))),
    };
    let led = SimulatedLed::new();
    tracing::info!(
        source = if trace.is_some() { "trace" } else { "daylight" },
        led_enabled = panel.led_enabled,
        auto_mode = panel.auto_mode,
        pot_raw = panel.pot_raw,
        "simulated backend ready"
    );
    Backend {
        name: "sim",
        sensor,
        actuator: Box::new(led.clone()),
        panel: Box::new(SharedPanel::new(panel)),
        sim_led: Some(led),
    }
}

/// Raspberry Pi backend built from `[pins]` and `[hardware]`.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn hardware(cfg: &Config) -> eyre::Result<Backend> {
    use eyre::WrapErr;
    use lumen_core::LumenError;
    use lumen_hardware::DualSensor;
    use lumen_hardware::hardware::{GpioPanel, PanelPins, PwmLed, Veml7700};

    let pins = cfg.pins.as_ref().ok_or_else(|| {
        eyre::Report::new(LumenError::Config(
            "the hardware backend requires a [pins] section".into(),
        ))
    })?;
    let address = cfg.hardware.sensor_address;

    let a = Veml7700::new(pins.sensor_a_bus, address).wrap_err("open light sensor A")?;
    let sensor: Box<dyn LuxSensor> = match pins.sensor_b_bus {
        Some(bus) => {
            let b = Veml7700::new(bus, address).wrap_err("open light sensor B")?;
            Box::new(DualSensor::new(a, b))
        }
        None => Box::new(a),
    };
    let led = PwmLed::new(
        pins.led_pwm_channel,
        cfg.hardware.pwm_frequency_hz,
        cfg.output.max_duty,
    )
    .wrap_err("open LED PWM")?;
    let panel = GpioPanel::new(PanelPins {
        switch_led: pins.switch_led,
        switch_auto: pins.switch_auto,
        pot_channel: pins.pot_adc_channel,
        led_active_low: pins.led_switch_active_low,
        auto_active_low: pins.auto_switch_active_low,
    })
    .wrap_err("open control panel")?;

    tracing::info!(
        sensor_a_bus = pins.sensor_a_bus,
        sensor_b_bus = ?pins.sensor_b_bus,
        pwm_channel = pins.led_pwm_channel,
        "hardware backend ready"
    );
    Ok(Backend {
        name: "hardware",
        sensor,
        actuator: Box::new(led),
        panel: Box::new(panel),
        sim_led: None,
    })
}
