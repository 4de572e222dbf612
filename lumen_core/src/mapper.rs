//! Lux and potentiometer scaling onto the duty range.

use crate::bounds::Bounds;

/// Clamped linear interpolation of `x` from `[in_min, in_max]` onto
/// `[out_min, out_max]`. A degenerate input range maps everything to `out_min`.
#[inline]
pub fn linear_map(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max <= in_min {
        return out_min;
    }
    let t = ((x - in_min) / (in_max - in_min)).clamp(0.0, 1.0);
    out_min + t * (out_max - out_min)
}

/// Duty for a filtered lux value within the live bounds, rounded to nearest.
#[inline]
pub fn duty_from_lux(lux: f64, bounds: Bounds, max_duty: u16) -> u16 {
    let mapped = linear_map(lux, bounds.min, bounds.max, 0.0, f64::from(max_duty));
    if mapped.is_nan() {
        return 0;
    }
    // Saturating float->int cast; the clamp keeps it inside the duty range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let duty = mapped.round().clamp(0.0, f64::from(max_duty)) as u16;
    duty
}

/// Integer potentiometer mapping, truncating like a microcontroller `map`.
#[inline]
pub fn manual_duty(pot_raw: u16, adc_max: u16, max_duty: u16) -> u16 {
    if adc_max == 0 {
        return 0;
    }
    let raw = u32::from(pot_raw.min(adc_max));
    let duty = raw * u32::from(max_duty) / u32::from(adc_max);
    u16::try_from(duty).unwrap_or(max_duty).min(max_duty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_to_nearest() {
        let b = Bounds::new(0.0, 100.0);
        // 50% of 1023 is 511.5
        assert_eq!(duty_from_lux(50.0, b, 1023), 512);
        assert_eq!(duty_from_lux(0.04, b, 1023), 0);
    }

    #[test]
    fn nan_lux_is_dark() {
        assert_eq!(duty_from_lux(f64::NAN, Bounds::new(0.0, 1.0), 1023), 0);
    }

    #[test]
    fn manual_full_scale() {
        assert_eq!(manual_duty(4095, 4095, 1023), 1023);
        assert_eq!(manual_duty(0, 4095, 1023), 0);
        // Out-of-range reading is clamped.
        assert_eq!(manual_duty(5000, 4095, 1023), 1023);
    }
}
