//! Auto/manual arbitration.

use std::fmt;

/// Actuation path selected for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Duty follows filtered lux within the live bounds.
    Auto,
    /// Duty follows the potentiometer.
    Manual,
}

impl Mode {
    pub fn from_switch(auto: bool) -> Self {
        if auto { Self::Auto } else { Self::Manual }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses the mode from the auto/manual switch.
///
/// With `dwell_ticks == 0` the switch is followed immediately. Otherwise a
/// change must be requested on `dwell_ticks` consecutive ticks first.
#[derive(Debug, Clone)]
pub struct ModeArbiter {
    current: Mode,
    dwell_ticks: u32,
    pending: u32,
    started: bool,
}

impl ModeArbiter {
    pub fn new(dwell_ticks: u32) -> Self {
        Self {
            current: Mode::Auto,
            dwell_ticks,
            pending: 0,
            started: false,
        }
    }

    pub fn current(&self) -> Mode {
        self.current
    }

    /// Feed this tick's switch reading and return the mode to act on.
    pub fn arbitrate(&mut self, auto_switch: bool) -> Mode {
        let requested = Mode::from_switch(auto_switch);
        if !self.started {
            // The first reading is adopted as-is.
            self.started = true;
            self.current = requested;
            return requested;
        }
        if requested == self.current {
            self.pending = 0;
            return self.current;
        }
        self.pending += 1;
        if self.pending >= self.dwell_ticks {
            tracing::debug!(from = %self.current, to = %requested, "mode change");
            self.current = requested;
            self.pending = 0;
        }
        self.current
    }

    /// Apply the on/off override. Off always wins.
    #[inline]
    pub fn gate(led_enabled: bool, duty: u16) -> u16 {
        if led_enabled { duty } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dwell_follows_switch() {
        let mut a = ModeArbiter::new(0);
        assert_eq!(a.arbitrate(true), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Manual);
        assert_eq!(a.arbitrate(true), Mode::Auto);
    }

    #[test]
    fn dwell_ignores_short_bounce() {
        let mut a = ModeArbiter::new(3);
        assert_eq!(a.arbitrate(true), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Auto);
        // Bounce back resets the count.
        assert_eq!(a.arbitrate(true), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Auto);
        assert_eq!(a.arbitrate(false), Mode::Manual);
    }

    #[test]
    fn first_reading_is_adopted_without_dwell() {
        let mut a = ModeArbiter::new(10);
        assert_eq!(a.arbitrate(false), Mode::Manual);
    }

    #[test]
    fn off_switch_forces_zero() {
        assert_eq!(ModeArbiter::gate(false, 700), 0);
        assert_eq!(ModeArbiter::gate(true, 700), 700);
    }
}
