//! Outlier-robust range estimation and smoothing of the live actuation range.
//!
//! [`RobustBoundsEstimator`] turns the calibration window into a `[min, max]`
//! pair using median/MAD rejection. [`BoundsSmoother`] blends each estimate
//! into the live bounds so the range drifts rather than jumps.

use crate::calibration::CalibrationWindow;

/// Normal-consistency factor for the median absolute deviation.
pub const MAD_SCALE: f64 = 1.4826;
/// Normal-consistency factor for the mean absolute deviation.
pub const MEAN_AD_SCALE: f64 = 1.2533;
/// Inlier threshold in multiples of sigma.
pub const REJECT_SIGMAS: f64 = 3.0;
/// Spread at or below this counts as zero.
pub const SIGMA_EPSILON: f64 = 1e-9;
/// Minimum span forced onto degenerate bounds.
pub const MIN_SPAN: f64 = 1.0;
/// `max <= min + FLOOR_TOLERANCE` is treated as degenerate.
pub const FLOOR_TOLERANCE: f64 = 1e-3;

/// Lux range used to scale readings onto the duty range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Force `max = min + MIN_SPAN` when the range is empty or inverted.
    ///
    /// Past 2^53 one lux is below the spacing of `f64`, so the span grows to
    /// at least one unit in the last place of `min` and `max > min` still holds.
    #[must_use]
    pub fn with_floor(self) -> Self {
        if self.max <= self.min + FLOOR_TOLERANCE {
            let span = MIN_SPAN.max(self.min.abs() * f64::EPSILON);
            Self {
                min: self.min,
                max: self.min + span,
            }
        } else {
            self
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0.0, 1000.0)
    }
}

/// Median/MAD range estimator with scratch space reserved up front.
#[derive(Debug, Clone)]
pub struct RobustBoundsEstimator {
    sorted: Vec<f64>,
    deviations: Vec<f64>,
}

impl RobustBoundsEstimator {
    /// Reserve scratch for up to `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sorted: Vec::with_capacity(capacity),
            deviations: Vec::with_capacity(capacity),
        }
    }

    /// Estimate bounds from the window contents, or return `previous` when the
    /// window is empty.
    pub fn estimate(&mut self, window: &CalibrationWindow, previous: Bounds) -> Bounds {
        self.sorted.clear();
        self.sorted.extend(window.iter());
        self.estimate_scratch(previous)
    }

    /// Same as [`estimate`](Self::estimate) over an arbitrary slice.
    pub fn estimate_slice(&mut self, samples: &[f64], previous: Bounds) -> Bounds {
        self.sorted.clear();
        self.sorted.extend_from_slice(samples);
        self.estimate_scratch(previous)
    }

    fn estimate_scratch(&mut self, previous: Bounds) -> Bounds {
        if self.sorted.is_empty() {
            return previous;
        }
        self.sorted.sort_unstable_by(f64::total_cmp);
        let median = median_of_sorted(&self.sorted);

        self.deviations.clear();
        self.deviations
            .extend(self.sorted.iter().map(|x| (x - median).abs()));
        let mean_ad = self.deviations.iter().sum::<f64>() / self.deviations.len() as f64;
        self.deviations.sort_unstable_by(f64::total_cmp);
        let mad = median_of_sorted(&self.deviations);

        let mut sigma = MAD_SCALE * mad;
        if sigma <= SIGMA_EPSILON {
            // More than half the samples sit on the median; fall back to the
            // mean deviation so a lone spike is still rejected.
            sigma = MEAN_AD_SCALE * mean_ad;
        }
        if sigma <= SIGMA_EPSILON {
            // Every sample equals the median.
            let lo = self.sorted[0];
            let hi = self.sorted[self.sorted.len() - 1];
            return Bounds::new(lo, hi);
        }

        let threshold = REJECT_SIGMAS * sigma;
        // `sorted` is ordered, so the inliers form one contiguous run.
        let mut inliers = self
            .sorted
            .iter()
            .copied()
            .filter(|x| (x - median).abs() <= threshold);
        match inliers.next() {
            Some(lo) => {
                let hi = inliers.last().unwrap_or(lo);
                Bounds::new(lo, hi)
            }
            None => Bounds::new(median, median),
        }
    }
}

fn median_of_sorted(v: &[f64]) -> f64 {
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

/// Exponential blend of estimated bounds into the live range.
#[derive(Debug, Clone, Copy)]
pub struct BoundsSmoother {
    alpha: f64,
    live: Bounds,
}

impl BoundsSmoother {
    /// `alpha` is clamped to `[0, 1]`. The initial range gets the span floor
    /// applied immediately.
    pub fn new(alpha: f64, initial: Bounds) -> Self {
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        Self {
            alpha,
            live: initial.with_floor(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn live(&self) -> Bounds {
        self.live
    }

    /// Blend `estimate` into the live bounds and return the result.
    pub fn blend(&mut self, estimate: Bounds) -> Bounds {
        let a = self.alpha;
        let blended = Bounds::new(
            (1.0 - a) * self.live.min + a * estimate.min,
            (1.0 - a) * self.live.max + a * estimate.max,
        );
        self.live = blended.with_floor();
        self.live
    }
}
