use lumen_core::{Bounds, duty_from_lux, linear_map, manual_duty};
use rstest::rstest;

#[rstest]
#[case::mid(50.0, 0.0, 100.0, 511.5)]
#[case::below(-10.0, 0.0, 100.0, 0.0)]
#[case::above(150.0, 0.0, 100.0, 1023.0)]
#[case::lower_edge(0.0, 0.0, 100.0, 0.0)]
#[case::upper_edge(100.0, 0.0, 100.0, 1023.0)]
#[case::degenerate(42.0, 5.0, 5.0, 0.0)]
#[case::inverted(42.0, 10.0, 5.0, 0.0)]
fn linear_map_cases(
    #[case] x: f64,
    #[case] in_min: f64,
    #[case] in_max: f64,
    #[case] expected: f64,
) {
    let got = linear_map(x, in_min, in_max, 0.0, 1023.0);
    assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
}

#[test]
fn midpoint_duty_is_511_or_512() {
    let d = duty_from_lux(50.0, Bounds::new(0.0, 100.0), 1023);
    assert!((511..=512).contains(&d));
}

#[rstest]
#[case(2048, 511)]
#[case(4095, 1023)]
#[case(0, 0)]
#[case(1, 0)]
#[case(4094, 1022)]
fn manual_map_truncates(#[case] raw: u16, #[case] expected: u16) {
    assert_eq!(manual_duty(raw, 4095, 1023), expected);
}

#[test]
fn auto_duty_never_exceeds_max() {
    let b = Bounds::new(100.0, 200.0);
    for lux in [-1e9, 0.0, 99.9, 150.0, 200.0, 1e12, f64::INFINITY] {
        let d = duty_from_lux(lux, b, 255);
        assert!(d <= 255);
    }
}
