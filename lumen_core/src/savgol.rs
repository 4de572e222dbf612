//! Savitzky–Golay smoothing.
//!
//! The convolution coefficients are the first row of `(AᵗA)⁻¹Aᵗ`, where `A`
//! is the `window × (poly_order + 1)` design matrix of centred integer offsets
//! raised to the powers `0..=poly_order`. That row evaluates the least-squares
//! polynomial at the window centre, so the coefficients sum to one.
//!
//! `AᵗA` is inverted with Gauss–Jordan elimination and partial pivoting. A
//! pivot whose magnitude is below [`PIVOT_EPSILON`] marks the matrix singular;
//! the filter then uses uniform `1/window` coefficients (a plain moving
//! average) instead of failing.

use crate::ring::RingBuffer;

/// Smallest pivot magnitude accepted during elimination.
pub const PIVOT_EPSILON: f64 = 1e-12;
// Row-elimination factors smaller than this are skipped.
const FACTOR_EPSILON: f64 = 1e-15;

/// Invert the row-major `n × n` matrix `mat`. Returns `None` when a pivot is
/// below [`PIVOT_EPSILON`].
pub fn invert_matrix(mat: &[f64], n: usize) -> Option<Vec<f64>> {
    debug_assert_eq!(mat.len(), n * n);
    let w = 2 * n;
    // Augmented [mat | I]
    let mut aug = vec![0.0f64; n * w];
    for r in 0..n {
        aug[r * w..r * w + n].copy_from_slice(&mat[r * n..r * n + n]);
        aug[r * w + n + r] = 1.0;
    }

    for col in 0..n {
        let mut pivot = col;
        let mut max_abs = aug[col * w + col].abs();
        for r in (col + 1)..n {
            let v = aug[r * w + col].abs();
            if v > max_abs {
                max_abs = v;
                pivot = r;
            }
        }
        if max_abs < PIVOT_EPSILON {
            return None;
        }
        if pivot != col {
            for c in 0..w {
                aug.swap(col * w + c, pivot * w + c);
            }
        }

        let pv = aug[col * w + col];
        for c in 0..w {
            aug[col * w + c] /= pv;
        }

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r * w + col];
            if factor.abs() < FACTOR_EPSILON {
                continue;
            }
            for c in 0..w {
                aug[r * w + c] -= factor * aug[col * w + c];
            }
        }
    }

    let mut inv = vec![0.0f64; n * n];
    for r in 0..n {
        inv[r * n..r * n + n].copy_from_slice(&aug[r * w + n..r * w + w]);
    }
    Some(inv)
}

/// Compute smoothing coefficients for an odd `window`, or `None` if the
/// normal equations are singular.
pub fn coefficients(window: usize, poly_order: usize) -> Option<Vec<f64>> {
    let rows = window;
    let cols = poly_order + 1;
    let half = (window as i64 - 1) / 2;

    let mut a = vec![0.0f64; rows * cols];
    for r in 0..rows {
        let j = (r as i64 - half) as f64;
        let mut val = 1.0;
        for p in 0..cols {
            a[r * cols + p] = val;
            val *= j;
        }
    }

    let mut ata = vec![0.0f64; cols * cols];
    for i in 0..cols {
        for j in 0..cols {
            ata[i * cols + j] = (0..rows).map(|r| a[r * cols + i] * a[r * cols + j]).sum();
        }
    }

    let inv = invert_matrix(&ata, cols)?;
    // Only row 0 of (AᵗA)⁻¹Aᵗ is needed: c_j = Σ_k inv[0][k] · A[j][k]
    let coeffs = (0..rows)
        .map(|j| (0..cols).map(|k| inv[k] * a[j * cols + k]).sum())
        .collect();
    Some(coeffs)
}

/// Streaming Savitzky–Golay smoother.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    coeffs: Box<[f64]>,
    ring: RingBuffer,
    poly_order: usize,
    degraded: bool,
}

impl SavitzkyGolay {
    /// Build the filter. An even `window` is widened by one so the fit has a
    /// centre sample; a zero window is treated as one.
    pub fn new(window: usize, poly_order: usize) -> Self {
        let window = match window.max(1) {
            w if w % 2 == 0 => w + 1,
            w => w,
        };
        let (coeffs, degraded) = match coefficients(window, poly_order) {
            Some(c) => (c, false),
            None => {
                tracing::warn!(
                    window,
                    poly_order,
                    "savitzky-golay normal equations singular; using uniform coefficients"
                );
                (vec![1.0 / window as f64; window], true)
            }
        };
        Self {
            coeffs: coeffs.into_boxed_slice(),
            ring: RingBuffer::new(window),
            poly_order,
            degraded,
        }
    }

    pub fn window(&self) -> usize {
        self.coeffs.len()
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// True when the coefficient solve failed and uniform weights are in use.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn process(&mut self, value: f64) -> f64 {
        self.ring.push(value);
        if !self.ring.is_full() {
            // Expanding mean until the window fills.
            let n = self.ring.len();
            return self.ring.iter().sum::<f64>() / n as f64;
        }
        self.coeffs
            .iter()
            .zip(self.ring.iter())
            .map(|(c, v)| c * v)
            .sum()
    }

    pub fn reset(&mut self) {
        self.ring.clear();
    }
}
