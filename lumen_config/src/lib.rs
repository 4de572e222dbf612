#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and trace parsing for the light-matching controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Trace CSV loader enforces the sensor module's `timestamp,lux1,lux2`
//!   header and averages the two channels into one sample per row.
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::de::Deserializer;

/// Trace CSV schema, as printed by the dual-sensor module.
///
/// Expected headers:
/// timestamp,lux1,lux2
///
/// Example:
/// timestamp,lux1,lux2
/// 1000,512.3,498.7
/// 1500,515.0,501.2
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    /// Milliseconds since the module booted.
    pub timestamp: u64,
    pub lux1: f64,
    pub lux2: f64,
}

impl TraceRow {
    /// The averaged reading the controller consumes.
    pub fn lux(&self) -> f64 {
        (self.lux1 + self.lux2) / 2.0
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[serde(alias = "moving_average")]
    Sma,
    #[default]
    Ema,
    #[serde(alias = "savgol", alias = "sg")]
    SavitzkyGolay,
}

#[derive(Debug, Deserialize)]
pub struct FilterCfg {
    pub kind: FilterType,
    /// Window for SMA and Savitzky–Golay. An even Savitzky–Golay window is
    /// widened to the next odd size.
    #[serde(default = "default_filter_window")]
    pub window: usize,
    /// EMA smoothing factor in (0.0, 1.0].
    #[serde(default = "default_filter_alpha")]
    pub alpha: f64,
    /// Savitzky–Golay polynomial order.
    #[serde(default = "default_poly_order")]
    pub poly_order: usize,
}

fn default_filter_window() -> usize {
    11
}

fn default_filter_alpha() -> f64 {
    0.1
}

fn default_poly_order() -> usize {
    3
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Capacity of the calibration window in samples (600 = 5 min at 500 ms).
    pub window_capacity: usize,
    /// Blend rate of new bound estimates into the live bounds.
    pub blend_alpha: f64,
    pub initial_min_lux: f64,
    pub initial_max_lux: f64,
    /// When false the initial bounds are a fixed scale and never re-estimated.
    pub adaptive: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            window_capacity: 600,
            blend_alpha: 0.05,
            initial_min_lux: 0.0,
            initial_max_lux: 1000.0,
            adaptive: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Fixed delay between control ticks (ms).
    pub tick_ms: u64,
    /// Sampling cadence in Auto mode (ms). Also accepts "sample_period_ms".
    #[serde(alias = "sample_period_ms")]
    pub sample_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            sample_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    /// Top of the PWM duty scale (1023 for 10-bit).
    pub max_duty: u16,
    /// Top of the potentiometer ADC scale (4095 for 12-bit).
    pub adc_max: u16,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            max_duty: 1023,
            adc_max: 4095,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ModeCfg {
    /// Consecutive ticks a mode switch must hold before it takes effect (0 = immediate).
    pub dwell_ticks: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Re-use the last good reading.
    #[default]
    Hold,
    /// Treat a failed read as 0 lux.
    Zero,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SensorCfg {
    pub fault_policy: FaultPolicy,
}

/// Raspberry Pi wiring; only read by the hardware backend.
#[derive(Debug, Deserialize)]
pub struct Pins {
    /// Hardware PWM channel driving the LED (0 or 1).
    pub led_pwm_channel: u8,
    /// BCM GPIO of the LED on/off switch.
    pub switch_led: u8,
    /// BCM GPIO of the auto/manual switch.
    pub switch_auto: u8,
    /// MCP3008 channel of the potentiometer.
    pub pot_adc_channel: u8,
    /// I2C bus of the first light sensor.
    pub sensor_a_bus: u8,
    /// I2C bus of the second light sensor; single-sensor rigs omit it.
    pub sensor_b_bus: Option<u8>,
    /// On/off switch reads low when the LED should be on.
    #[serde(default)]
    pub led_switch_active_low: bool,
    /// Auto/manual switch reads low in Auto.
    #[serde(default = "default_true")]
    pub auto_switch_active_low: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// PWM carrier frequency.
    pub pwm_frequency_hz: f64,
    /// I2C address of the light sensors. Accepts `16` or `"0x10"`.
    #[serde(deserialize_with = "de_i2c_address")]
    pub sensor_address: u16,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: 5000.0,
            sensor_address: 0x10,
        }
    }
}

/// Synthetic daylight for the simulated backend.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    pub base_lux: f64,
    /// Peak deviation of the daylight sine from `base_lux`.
    pub swing_lux: f64,
    /// Sine period in sensor reads; 0 disables the swing.
    pub period_samples: u64,
    /// Uniform noise amplitude added to every read.
    pub noise_lux: f64,
    /// Inject a spike every N sensor reads; 0 disables spikes.
    pub spike_every: u64,
    pub spike_lux: f64,
}

impl Default for Simulation {
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub filter: FilterCfg,
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub mode: ModeCfg,
    #[serde(default)]
    pub sensor: SensorCfg,
    /// Wiring for the hardware backend.
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub simulation: Simulation,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Filter
        match self.filter.kind {
            FilterType::Sma | FilterType::SavitzkyGolay if self.filter.window == 0 => {
                eyre::bail!("filter.window must be >= 1");
            }
            FilterType::Ema if !(self.filter.alpha > 0.0 && self.filter.alpha <= 1.0) => {
                eyre::bail!("filter.alpha must be in (0.0, 1.0]");
            }
            _ => {}
        }
        if self.filter.window > 4096 {
            eyre::bail!("filter.window is unreasonably large (>4096)");
        }
        if self.filter.poly_order > 10 {
            eyre::bail!("filter.poly_order must be <= 10");
        }

        // Calibration
        let cal = &self.calibration;
        if cal.window_capacity == 0 {
            eyre::bail!("calibration.window_capacity must be >= 1");
        }
        if cal.window_capacity > 1_000_000 {
            eyre::bail!("calibration.window_capacity is unreasonably large (>1000000)");
        }
        if !(cal.blend_alpha > 0.0 && cal.blend_alpha <= 1.0) {
            eyre::bail!("calibration.blend_alpha must be in (0.0, 1.0]");
        }
        if !cal.initial_min_lux.is_finite() || !cal.initial_max_lux.is_finite() {
            eyre::bail!("calibration.initial_min_lux and initial_max_lux must be finite");
        }
        if cal.initial_max_lux <= cal.initial_min_lux {
            eyre::bail!("calibration.initial_max_lux must be > calibration.initial_min_lux");
        }

        // Timing
        if self.timing.tick_ms == 0 {
            eyre::bail!("timing.tick_ms must be >= 1");
        }
        if self.timing.sample_ms < self.timing.tick_ms {
            eyre::bail!("timing.sample_ms must be >= timing.tick_ms");
        }

        // Output
        if self.output.max_duty == 0 {
            eyre::bail!("output.max_duty must be >= 1");
        }
        if self.output.adc_max == 0 {
            eyre::bail!("output.adc_max must be >= 1");
        }

        // Pins
        if let Some(p) = &self.pins {
            if p.led_pwm_channel > 1 {
                eyre::bail!("pins.led_pwm_channel must be 0 or 1");
            }
            if p.pot_adc_channel > 7 {
                eyre::bail!("pins.pot_adc_channel must be in [0, 7]");
            }
            if p.switch_led == p.switch_auto {
                eyre::bail!("pins.switch_led and pins.switch_auto must differ");
            }
        }

        // Hardware
        if !(self.hardware.pwm_frequency_hz > 0.0) {
            eyre::bail!("hardware.pwm_frequency_hz must be > 0");
        }

        // Simulation
        let sim = &self.simulation;
        if ![sim.base_lux, sim.swing_lux, sim.noise_lux, sim.spike_lux]
            .iter()
            .all(|v| v.is_finite())
        {
            eyre::bail!("simulation lux values must be finite");
        }
        if sim.base_lux < 0.0 || sim.swing_lux < 0.0 || sim.noise_lux < 0.0 {
            eyre::bail!("simulation.base_lux, swing_lux and noise_lux must be >= 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// A parsed trace: per-row averaged lux plus the original timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub rows: Vec<TraceRow>,
}

impl Trace {
    /// Averaged lux, one per row.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(TraceRow::lux)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<TraceRow>> for Trace {
    type Error = eyre::Report;
    fn try_from(rows: Vec<TraceRow>) -> Result<Self, Self::Error> {
        for (i, pair) in rows.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                // Line numbers count the header as line 1.
                eyre::bail!(
                    "trace timestamps must be non-decreasing (row {} goes back from {} to {})",
                    i + 3,
                    pair[0].timestamp,
                    pair[1].timestamp
                );
            }
        }
        if let Some((i, r)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| !(r.lux1.is_finite() && r.lux2.is_finite()))
        {
            eyre::bail!("trace row {} has a non-finite lux value: {:?}", i + 2, r);
        }
        Ok(Self { rows })
    }
}

/// Parse a trace from any reader. The header must be exactly `timestamp,lux1,lux2`.
pub fn read_trace<R: Read>(reader: R) -> eyre::Result<Trace> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["timestamp", "lux1", "lux2"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'timestamp,lux1,lux2', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Trace::try_from(rows)
}

pub fn load_trace_csv(path: &Path) -> eyre::Result<Trace> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    read_trace(file).map_err(|e| e.wrap_err(format!("loading trace {}", path.display())))
}

/// Accept either a bare `u16` or a `"0x.."` string for I2C addresses.
fn de_i2c_address<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AddrToml {
        Num(u16),
        Text(String),
    }

    match AddrToml::deserialize(deserializer)? {
        AddrToml::Num(n) => Ok(n),
        AddrToml::Text(s) => {
            let t = s.trim();
            let parsed = t
                .strip_prefix("0x")
                .or_else(|| t.strip_prefix("0X"))
                .map_or_else(|| t.parse::<u16>(), |hex| u16::from_str_radix(hex, 16));
            parsed.map_err(|e| serde::de::Error::custom(format!("invalid I2C address {s:?}: {e}")))
        }
    }
}
