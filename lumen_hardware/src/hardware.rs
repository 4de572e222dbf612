//! Raspberry Pi drivers (`rppal`).

use rppal::gpio::{Gpio, InputPin};
use rppal::i2c::I2c;
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use lumen_traits::{Actuator, BoxError, ControlPanel, LuxSensor, PanelSnapshot};

use crate::error::{HwError, Result};
use crate::util::retry_on_timeout;

/// Default 7-bit I2C address of the VEML7700.
pub const VEML7700_ADDRESS: u16 = 0x10;

const VEML_REG_CONF: u8 = 0x00;
const VEML_REG_ALS: u8 = 0x04;
// Gain x1, 100 ms integration, powered on.
const VEML_CONF_GAIN1_IT100: u16 = 0x0000;
// Lux per count at gain x1, 100 ms integration.
const VEML_LUX_PER_COUNT: f64 = 0.0576;

/// VEML7700 ambient light sensor on one I2C bus.
pub struct Veml7700 {
    i2c: I2c,
}

impl Veml7700 {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let [lo, hi] = VEML_CONF_GAIN1_IT100.to_le_bytes();
        i2c.write(&[VEML_REG_CONF, lo, hi])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        tracing::info!(bus, address, "VEML7700 configured (gain x1, 100 ms)");
        Ok(Self { i2c })
    }

    fn read_counts(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[VEML_REG_ALS], &mut buf)
            .map_err(|e| match e {
                rppal::i2c::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    HwError::Timeout
                }
                other => HwError::I2c(other.to_string()),
            })?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl LuxSensor for Veml7700 {
    fn read_lux(&mut self) -> std::result::Result<f64, BoxError> {
        let counts = retry_on_timeout(2, || self.read_counts())?;
        Ok(f64::from(counts) * VEML_LUX_PER_COUNT)
    }
}

/// MCP3208 12-bit ADC on SPI0/CE0.
pub struct Mcp3208 {
    spi: Spi,
}

impl Mcp3208 {
    pub fn new() -> Result<Self> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self { spi })
    }

    /// Single-ended conversion of `channel` (0..=7), 0..=4095.
    pub fn read(&mut self, channel: u8) -> Result<u16> {
        let ch = channel & 0x07;
        let tx = [0x06 | (ch >> 2), (ch & 0x03) << 6, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok((u16::from(rx[1] & 0x0F) << 8) | u16::from(rx[2]))
    }
}

/// LED driven by a hardware PWM channel.
pub struct PwmLed {
    pwm: Pwm,
    max_duty: u16,
}

impl PwmLed {
    /// Open `channel` (0 or 1) at `frequency_hz`, starting dark.
    pub fn new(channel: u8, frequency_hz: f64, max_duty: u16) -> Result<Self> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("no PWM channel {other}"))),
        };
        let pwm = Pwm::with_frequency(channel, frequency_hz, 0.0, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(Self {
            pwm,
            max_duty: max_duty.max(1),
        })
    }
}

impl Actuator for PwmLed {
    fn set_duty(&mut self, duty: u16) -> std::result::Result<(), BoxError> {
        let cycle = f64::from(duty.min(self.max_duty)) / f64::from(self.max_duty);
        self.pwm
            .set_duty_cycle(cycle)
            .map_err(|e| Box::new(HwError::Pwm(e.to_string())) as BoxError)
    }
}

/// Wiring of the operator panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelPins {
    pub switch_led: u8,
    pub switch_auto: u8,
    pub pot_channel: u8,
    pub led_active_low: bool,
    pub auto_active_low: bool,
}

/// On/off and auto/manual switches on GPIO with pull-ups, potentiometer on
/// the MCP3208.
pub struct GpioPanel {
    led_switch: InputPin,
    auto_switch: InputPin,
    adc: Mcp3208,
    pins: PanelPins,
}

impl GpioPanel {
    pub fn new(pins: PanelPins) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let led_switch = gpio
            .get(pins.switch_led)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pullup();
        let auto_switch = gpio
            .get(pins.switch_auto)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pullup();
        Ok(Self {
            led_switch,
            auto_switch,
            adc: Mcp3208::new()?,
            pins,
        })
    }
}

impl ControlPanel for GpioPanel {
    fn poll(&mut self) -> std::result::Result<PanelSnapshot, BoxError> {
        let led_enabled = self.led_switch.is_low() == self.pins.led_active_low;
        let auto_mode = self.auto_switch.is_low() == self.pins.auto_active_low;
        let pot_raw = self.adc.read(self.pins.pot_channel)?;
        Ok(PanelSnapshot {
            led_enabled,
            auto_mode,
            pot_raw,
        })
    }
}
