//! Streaming smoothers applied to each raw lux sample.
//!
//! The set of smoothers is closed and chosen once from [`FilterKind`], so the
//! bank is an enum rather than a trait object.

use crate::config::FilterKind;
use crate::ring::RingBuffer;
use crate::savgol::SavitzkyGolay;

/// Simple moving average over the last `N` raw samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    ring: RingBuffer,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            ring: RingBuffer::new(window),
            sum: 0.0,
        }
    }

    pub fn window(&self) -> usize {
        self.ring.capacity()
    }

    /// Push `value`; returns the expanding mean until the window fills, then
    /// the mean of the last `N` samples.
    pub fn process(&mut self, value: f64) -> f64 {
        if let Some(evicted) = self.ring.push(value) {
            self.sum -= evicted;
        }
        self.sum += value;
        self.sum / self.ring.len() as f64
    }

    pub fn reset(&mut self) {
        self.ring.clear();
        self.sum = 0.0;
    }
}

/// Exponential moving average. The first sample seeds the state.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f64,
    state: Option<f64>,
}

impl Ema {
    /// `alpha` is clamped to `[0, 1]`; a NaN alpha behaves like 1 (no smoothing).
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(0.0, 1.0) };
        Self { alpha, state: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn process(&mut self, value: f64) -> f64 {
        let next = match self.state {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// The filter bank.
#[derive(Debug, Clone)]
pub enum Filter {
    SimpleMovingAverage(MovingAverage),
    ExponentialMovingAverage(Ema),
    SavitzkyGolay(SavitzkyGolay),
}

impl Filter {
    pub fn from_kind(kind: FilterKind) -> Self {
        match kind {
            FilterKind::SimpleMovingAverage { window } => {
                Self::SimpleMovingAverage(MovingAverage::new(window))
            }
            FilterKind::ExponentialMovingAverage { alpha } => {
                Self::ExponentialMovingAverage(Ema::new(alpha))
            }
            FilterKind::SavitzkyGolay { window, poly_order } => {
                Self::SavitzkyGolay(SavitzkyGolay::new(window, poly_order))
            }
        }
    }

    #[inline]
    pub fn process(&mut self, value: f64) -> f64 {
        match self {
            Self::SimpleMovingAverage(f) => f.process(value),
            Self::ExponentialMovingAverage(f) => f.process(value),
            Self::SavitzkyGolay(f) => f.process(value),
        }
    }

    /// Drop runtime history. Savitzky–Golay coefficients are kept.
    pub fn reset(&mut self) {
        match self {
            Self::SimpleMovingAverage(f) => f.reset(),
            Self::ExponentialMovingAverage(f) => f.reset(),
            Self::SavitzkyGolay(f) => f.reset(),
        }
    }

    /// Only a Savitzky–Golay filter whose coefficient solve failed is degraded.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::SavitzkyGolay(f) if f.is_degraded())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SimpleMovingAverage(_) => "sma",
            Self::ExponentialMovingAverage(_) => "ema",
            Self::SavitzkyGolay(_) => "savitzky_golay",
        }
    }
}

impl From<FilterKind> for Filter {
    fn from(kind: FilterKind) -> Self {
        Self::from_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_expands_then_slides() {
        let mut f = MovingAverage::new(3);
        assert_eq!(f.process(3.0), 3.0);
        assert_eq!(f.process(6.0), 4.5);
        assert_eq!(f.process(9.0), 6.0);
        // 3.0 evicted
        assert_eq!(f.process(12.0), 9.0);
    }

    #[test]
    fn ema_seeds_with_first_sample() {
        let mut f = Ema::new(0.1);
        assert_eq!(f.process(250.0), 250.0);
        let next = f.process(350.0);
        assert!((next - 260.0).abs() < 1e-12);
    }

    #[test]
    fn reset_forgets_history() {
        let mut f = Filter::from_kind(FilterKind::SimpleMovingAverage { window: 4 });
        f.process(100.0);
        f.process(200.0);
        f.reset();
        assert_eq!(f.process(10.0), 10.0);
    }

    #[test]
    fn only_singular_savgol_is_degraded() {
        let ok = Filter::from_kind(FilterKind::SavitzkyGolay { window: 11, poly_order: 3 });
        let bad = Filter::from_kind(FilterKind::SavitzkyGolay { window: 1, poly_order: 1 });
        let ema = Filter::from_kind(FilterKind::ExponentialMovingAverage { alpha: 0.5 });
        assert!(!ok.is_degraded());
        assert!(bad.is_degraded());
        assert!(!ema.is_degraded());
    }
}
