use lumen_hardware::error::HwError;
use lumen_hardware::{
    DaylightProfile, DualSensor, SharedPanel, SimulatedDaylight, SimulatedLed, TraceSensor,
};
use lumen_traits::{Actuator, BoxError, ControlPanel, LuxSensor, PanelSnapshot};
use rstest::rstest;

struct Fixed(Result<f64, &'static str>);

impl LuxSensor for Fixed {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        self.0.map_err(Into::into)
    }
}

#[rstest]
#[case::both_ok(Ok(400.0), Ok(600.0), Some(500.0))]
#[case::a_failed(Err("a down"), Ok(600.0), Some(600.0))]
#[case::b_failed(Ok(400.0), Err("b down"), Some(400.0))]
#[case::both_failed(Err("a down"), Err("b down"), None)]
fn dual_sensor_averages_or_degrades(
    #[case] a: Result<f64, &'static str>,
    #[case] b: Result<f64, &'static str>,
    #[case] expected: Option<f64>,
) {
    let mut s = DualSensor::new(Fixed(a), Fixed(b));
    assert_eq!(s.read_lux().ok(), expected);
}

#[test]
fn trace_sensor_times_out_when_exhausted() {
    let mut s = TraceSensor::new([1.0, 2.0]);
    assert_eq!(s.read_lux().expect("first"), 1.0);
    assert_eq!(s.read_lux().expect("second"), 2.0);
    assert_eq!(s.remaining(), 0);
    let err = s.read_lux().expect_err("exhausted");
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Timeout)));
}

#[test]
fn daylight_swing_follows_a_sine() {
    let mut s = SimulatedDaylight::new(DaylightProfile {
        base_lux: 1000.0,
        swing_lux: 400.0,
        period_samples: 4,
        ..DaylightProfile::default()
    });
    let v: Vec<f64> = (0..4).map(|_| s.read_lux().expect("read")).collect();
    let expected = [1000.0, 1400.0, 1000.0, 600.0];
    for (got, want) in v.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{got} vs {want}");
    }
    assert_eq!(s.reads(), 4);
}

#[test]
fn daylight_noise_is_bounded_and_never_negative() {
    let mut s = SimulatedDaylight::new(DaylightProfile {
        base_lux: 10.0,
        noise_lux: 25.0,
        ..DaylightProfile::default()
    });
    for _ in 0..1000 {
        let lux = s.read_lux().expect("read");
        assert!((0.0..=35.0).contains(&lux));
    }
}

#[test]
fn shared_panel_reflects_updates() {
    let panel = SharedPanel::new(PanelSnapshot::default());
    let mut handle = panel.clone();
    panel.set(PanelSnapshot {
        led_enabled: false,
        auto_mode: false,
        pot_raw: 77,
    });
    let snap = handle.poll().expect("poll");
    assert!(!snap.led_enabled);
    assert_eq!(snap.pot_raw, 77);
}

#[test]
fn simulated_led_counts_writes() {
    let led = SimulatedLed::new();
    let mut h = led.clone();
    h.set_duty(10).expect("write");
    h.set_duty(0).expect("write");
    assert_eq!(led.duty(), 0);
    assert_eq!(led.writes(), 2);
}
