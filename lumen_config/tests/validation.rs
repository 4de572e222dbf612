use lumen_config::{FaultPolicy, FilterType, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[filter]
kind = "ema"
alpha = 0.1

[calibration]
window_capacity = 600
blend_alpha = 0.05
initial_min_lux = 0.0
initial_max_lux = 1000.0

[timing]
tick_ms = 10
sample_ms = 500

[output]
max_duty = 1023
adc_max = 4095
"#;

fn with_override(section: &str, body: &str) -> String {
    // Later tables of the same name are a TOML error, so replace the section.
    let mut out = String::new();
    let mut skipping = false;
    for line in BASE.lines() {
        if line.starts_with('[') {
            skipping = line == format!("[{section}]");
            if skipping {
                out.push_str(&format!("[{section}]\n{body}\n"));
            }
        }
        if !skipping {
            out.push_str(line);
            out.push('\n');
        }
    }
    if !out.contains(&format!("[{section}]")) {
        out.push_str(&format!("[{section}]\n{body}\n"));
    }
    out
}

#[test]
fn full_example_is_valid() {
    let toml = r#"
[filter]
kind = "savitzky_golay"
window = 11
poly_order = 3

[calibration]
window_capacity = 600
blend_alpha = 0.05
adaptive = true

[timing]
tick_ms = 10
sample_ms = 500

[mode]
dwell_ticks = 3

[sensor]
fault_policy = "zero"

[pins]
led_pwm_channel = 0
switch_led = 14
switch_auto = 27
pot_adc_channel = 0
sensor_a_bus = 1
sensor_b_bus = 3

[hardware]
sensor_address = "0x10"

[simulation]
base_lux = 800.0
swing_lux = 300.0
period_samples = 120
noise_lux = 10.0

[logging]
file = "lumen.log"
level = "info"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.filter.kind, FilterType::SavitzkyGolay);
    assert_eq!(cfg.mode.dwell_ticks, 3);
    assert_eq!(cfg.sensor.fault_policy, FaultPolicy::Zero);
    assert_eq!(cfg.hardware.sensor_address, 0x10);
    let pins = cfg.pins.expect("pins present");
    assert_eq!(pins.sensor_b_bus, Some(3));
    assert!(pins.auto_switch_active_low);
    assert!(!pins.led_switch_active_low);
}

#[rstest]
#[case::ema_alpha_zero("filter", "kind = \"ema\"\nalpha = 0.0", "filter.alpha must be in (0.0, 1.0]")]
#[case::ema_alpha_big("filter", "kind = \"ema\"\nalpha = 1.5", "filter.alpha must be in (0.0, 1.0]")]
#[case::sma_window_zero("filter", "kind = \"sma\"\nwindow = 0", "filter.window must be >= 1")]
#[case::capacity_zero("calibration", "window_capacity = 0", "calibration.window_capacity must be >= 1")]
#[case::blend_zero("calibration", "blend_alpha = 0.0", "calibration.blend_alpha must be in (0.0, 1.0]")]
#[case::inverted_initial(
    "calibration",
    "initial_min_lux = 10.0\ninitial_max_lux = 5.0",
    "initial_max_lux must be >"
)]
#[case::tick_zero("timing", "tick_ms = 0", "timing.tick_ms must be >= 1")]
#[case::sample_faster_than_tick("timing", "tick_ms = 100\nsample_ms = 50", "timing.sample_ms must be >= timing.tick_ms")]
#[case::max_duty_zero("output", "max_duty = 0", "output.max_duty must be >= 1")]
#[case::adc_zero("output", "adc_max = 0", "output.adc_max must be >= 1")]
#[case::rotation("logging", "rotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] section: &str, #[case] body: &str, #[case] needle: &str) {
    let toml = with_override(section, body);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "unexpected error: {err}\n---\n{toml}"
    );
}

#[test]
fn same_switch_pin_is_rejected() {
    let toml = with_override(
        "pins",
        "led_pwm_channel = 0\nswitch_led = 14\nswitch_auto = 14\npot_adc_channel = 0\nsensor_a_bus = 1",
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate pins");
    assert!(format!("{err}").contains("must differ"));
}

#[test]
fn unknown_filter_kind_fails_to_parse() {
    let toml = with_override("filter", "kind = \"kalman\"");
    assert!(load_toml(&toml).is_err());
}

#[test]
fn missing_filter_section_fails_to_parse() {
    assert!(load_toml("[timing]\ntick_ms = 10\n").is_err());
}

#[test]
fn bad_i2c_address_string_fails_to_parse() {
    let toml = with_override("hardware", "sensor_address = \"0xZZ\"");
    let err = load_toml(&toml).expect_err("invalid address");
    assert!(err.to_string().contains("invalid I2C address"));
}
