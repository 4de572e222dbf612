use lumen_core::CalibrationWindow;
use proptest::prelude::*;

proptest! {
    #[test]
    fn chronological_copy_is_insertion_order(
        capacity in 1usize..64,
        extra in 0usize..200,
    ) {
        let total = capacity + extra;
        let mut w = CalibrationWindow::new(capacity);
        for i in 0..total {
            w.add(i as f64);
        }
        prop_assert_eq!(w.available(), capacity);

        let mut out = vec![f64::NAN; capacity];
        let n = w.copy_chronological(&mut out);
        prop_assert_eq!(n, capacity);
        let expected: Vec<f64> = (extra..total).map(|i| i as f64).collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn partial_window_starts_at_first_insert(capacity in 2usize..64, fill in 1usize..64) {
        prop_assume!(fill < capacity);
        let mut w = CalibrationWindow::new(capacity);
        for i in 0..fill {
            w.add(i as f64);
        }
        prop_assert_eq!(w.available(), fill);
        prop_assert!(!w.is_full());
        let got: Vec<f64> = w.iter().collect();
        let expected: Vec<f64> = (0..fill).map(|i| i as f64).collect();
        prop_assert_eq!(got, expected);
    }
}
