//! Human-readable error descriptions and structured JSON error formatting.

use lumen_core::error::{BuildError, LumenError};
use lumen_hardware::error::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No light sensor was provided to the controller.\nLikely causes: The sensor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No LED output was provided to the controller.\nLikely causes: The PWM backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the LED driver is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingPanel => {
                "What happened: No control panel was provided to the controller.\nLikely causes: The switches/potentiometer backend failed to initialize.\nHow to fix: Ensure the panel is created successfully and passed via with_panel(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `lumen self-check`."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LumenError>() {
        return match le {
            LumenError::Timeout => "What happened: A hardware read timed out.\nLikely causes: Light sensor or ADC not wired correctly, no power/ground, or wrong I2C bus.\nHow to fix: Verify the [pins] buses and sensor power, then run `lumen self-check`.".to_string(),
            LumenError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
            ),
            LumenError::Hardware(msg) | LumenError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Incorrect pin/bus numbers or insufficient GPIO/I2C/SPI permissions.\nHow to fix: Fix the [pins] values; ensure the process may access /dev/gpiomem, /dev/i2c-* and /dev/spidev*."
            ),
            LumenError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Hardware error ({he}).\nLikely causes: Device not present on the configured bus or missing permissions.\nHow to fix: Check wiring and the [pins]/[hardware] sections, then run `lumen self-check`."
        );
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'timestamp,lux1,lux2'.".to_string();
    }

    if lower.contains("trace timestamps must be non-decreasing")
        || lower.contains("invalid csv row")
        || lower.contains("non-finite lux")
    {
        return format!(
            "What happened: The trace file could not be used ({lower}).\nLikely causes: Hand-edited or truncated CSV.\nHow to fix: Re-record the trace or fix the offending row."
        );
    }

    if lower.contains("read config") || lower.contains("no such file") {
        return format!(
            "What happened: Could not read a required file.\nLikely causes: Wrong --config or --trace path.\nHow to fix: Check the path and rerun. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 configuration, 4 timeout, 5 hardware, 6 internal state, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    if let Some(le) = err.downcast_ref::<LumenError>() {
        return match le {
            LumenError::Config(_) => 3,
            LumenError::Timeout => 4,
            LumenError::Hardware(_) | LumenError::HardwareFault(_) => 5,
            LumenError::State(_) => 6,
        };
    }
    if let Some(he) = err.downcast_ref::<HwError>() {
        return if matches!(he, HwError::Timeout) { 4 } else { 5 };
    }
    1
}

/// Short machine-readable name for the error class.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        3 => "Config",
        4 => "Timeout",
        5 => "Hardware",
        6 => "State",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": error_reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
