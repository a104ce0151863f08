//! Edge, pulse and timer primitives
//!
//! [`TimedTrigger`] schedules "do X in T seconds" from inside the per-sample
//! loop. The remaining types are the small helpers every module uses to read
//! trigger inputs and drive trigger outputs.

use crate::port::{SignalKind, TRIGGER_THRESHOLDS};

/// Countdown timer that reports the tick on which it runs out.
///
/// Re-arming never shortens a wait that is already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimedTrigger {
    remaining: f64,
}

impl TimedTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }

    /// Arm for `duration` seconds, keeping any longer wait already pending
    pub fn trigger(&mut self, duration: f64) {
        if duration > self.remaining {
            self.remaining = duration;
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Seconds left before the timer fires
    pub fn remaining(&self) -> f64 {
        self.remaining.max(0.0)
    }

    /// Advance by `delta_time`. Returns true only on the tick where the timer
    /// goes from active to expired.
    pub fn process(&mut self, delta_time: f64) -> bool {
        let was_active = self.is_active();
        if was_active {
            self.remaining -= delta_time;
        }
        was_active && !self.is_active()
    }
}

/// Hysteresis comparator turning a raw voltage into rising edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchmittTrigger {
    low: f64,
    high: f64,
    state: bool,
}

impl SchmittTrigger {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            state: false,
        }
    }

    /// Edge detector for an input of `kind`, if that kind has edges
    pub fn for_kind(kind: SignalKind) -> Option<Self> {
        kind.edge_thresholds().map(|(low, high)| Self::new(low, high))
    }

    pub fn reset(&mut self) {
        self.state = false;
    }

    /// Returns true when the input crosses `high` while the trigger is low
    pub fn process(&mut self, input: f64) -> bool {
        if self.state {
            if input <= self.low {
                self.state = false;
            }
            false
        } else if input >= self.high {
            self.state = true;
            true
        } else {
            false
        }
    }
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        let (low, high) = TRIGGER_THRESHOLDS;
        Self::new(low, high)
    }
}

/// Rising-edge detector for a boolean condition
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BooleanTrigger {
    state: bool,
}

impl BooleanTrigger {
    pub fn reset(&mut self) {
        self.state = false;
    }

    pub fn process(&mut self, state: bool) -> bool {
        let triggered = state && !self.state;
        self.state = state;
        triggered
    }
}

/// Holds its output high for a fixed time after being triggered
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseGenerator {
    remaining: f64,
}

impl PulseGenerator {
    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }

    /// Start a pulse, extending one already running if this is longer
    pub fn trigger(&mut self, duration: f64) {
        if duration > self.remaining {
            self.remaining = duration;
        }
    }

    /// Advance by `delta_time`; true while the pulse is high
    pub fn process(&mut self, delta_time: f64) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= delta_time;
            true
        } else {
            false
        }
    }
}
