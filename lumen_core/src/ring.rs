//! Fixed-capacity ring of `f64` samples.
//!
//! Storage is allocated once at construction and never resized. When full,
//! each push overwrites the oldest sample. Chronological iteration starts at
//! the write cursor once the ring has wrapped, and at index 0 before that.

#[derive(Debug, Clone)]
pub struct RingBuffer {
    buf: Box<[f64]>,
    // Next slot to overwrite.
    cursor: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a ring holding at most `capacity` samples (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)].into_boxed_slice(),
            cursor: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// Store `value`, returning the sample it evicted when the ring was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = self.is_full().then(|| self.buf[self.cursor]);
        self.buf[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.buf.len();
        if self.len < self.buf.len() {
            self.len += 1;
        }
        evicted
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = if self.is_full() { self.cursor } else { 0 };
        let cap = self.buf.len();
        (0..self.len).map(move |i| self.buf[(start + i) % cap])
    }

    /// Copy samples oldest-to-newest into the front of `dest`; returns the count
    /// written. `dest` shorter than `len()` receives the oldest samples only.
    pub fn copy_chronological(&self, dest: &mut [f64]) -> usize {
        let mut n = 0;
        for (slot, v) in dest.iter_mut().zip(self.iter()) {
            *slot = v;
            n += 1;
        }
        n
    }

    /// Forget all samples; capacity is kept.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }
}
