//! Rolling history of filtered lux used to re-estimate the actuation range.

use crate::ring::RingBuffer;

/// Fixed-capacity window of recent filtered samples.
///
/// Capacity is set once; the oldest sample is overwritten when full.
#[derive(Debug, Clone)]
pub struct CalibrationWindow {
    ring: RingBuffer,
}

impl CalibrationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.ring.push(value);
    }

    /// Number of samples currently stored, at most `capacity()`.
    pub fn available(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Write the stored samples oldest-to-newest into `dest`, returning how many
    /// were written.
    pub fn copy_chronological(&self, dest: &mut [f64]) -> usize {
        self.ring.copy_chronological(dest)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.ring.iter()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::CalibrationWindow;

    #[test]
    fn keeps_most_recent_capacity_samples() {
        let mut w = CalibrationWindow::new(600);
        for i in 0..605 {
            w.add(f64::from(i));
        }
        assert_eq!(w.available(), 600);
        let mut out = vec![0.0; 600];
        assert_eq!(w.copy_chronological(&mut out), 600);
        assert_eq!(out[0], 5.0);
        assert_eq!(out[599], 604.0);
    }
}
