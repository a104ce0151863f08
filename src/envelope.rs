//! Hold/Release Envelope
//!
//! A two-stage amplitude envelope for one-shot sounds. The hold stage sits at
//! unity, optionally starting above it ("punch") and decaying back to 1.0 by
//! the end of the stage. The release stage ramps linearly to zero.
//!
//! ```text
//!   1+2p ┐╲
//!        │ ╲___________
//!   1.0  │             ╲
//!        │              ╲
//!   0.0  └───────────────╲──────→
//!          Hold          Release  Idle
//! ```

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Hold,
    Release,
    Idle,
}

impl EnvelopeStage {
    fn next(self) -> Self {
        match self {
            EnvelopeStage::Hold => EnvelopeStage::Release,
            EnvelopeStage::Release | EnvelopeStage::Idle => EnvelopeStage::Idle,
        }
    }
}

/// Hold/release envelope generator with punch
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    stage: EnvelopeStage,
    elapsed: usize,
    hold_length: usize,
    release_length: usize,
    punch: f64,
}

impl EnvelopeGenerator {
    /// A stopped envelope
    pub fn new() -> Self {
        Self {
            stage: EnvelopeStage::Idle,
            elapsed: 0,
            hold_length: 0,
            release_length: 0,
            punch: 0.0,
        }
    }

    /// Begin a new hold stage. Durations are truncated to whole samples;
    /// negative durations count as zero.
    pub fn start(&mut self, sample_rate: f64, hold_time: f64, release_time: f64, punch: f64) {
        self.elapsed = 0;
        self.stage = EnvelopeStage::Hold;
        self.hold_length = seconds_to_samples(hold_time, sample_rate);
        self.release_length = seconds_to_samples(release_time, sample_rate);
        self.punch = punch;
    }

    /// Go idle immediately
    pub fn stop(&mut self) {
        self.stage = EnvelopeStage::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn hold_samples(&self) -> usize {
        self.hold_length
    }

    pub fn release_samples(&self) -> usize {
        self.release_length
    }

    fn stage_length(&self) -> usize {
        match self.stage {
            EnvelopeStage::Hold => self.hold_length,
            EnvelopeStage::Release => self.release_length,
            EnvelopeStage::Idle => 0,
        }
    }

    /// Advance one sample and return the amplitude
    pub fn process(&mut self) -> f64 {
        while self.stage != EnvelopeStage::Idle {
            let length = self.stage_length();
            self.elapsed += 1;
            if self.elapsed <= length {
                // length >= elapsed >= 1 here
                let fraction = (length - self.elapsed) as f64 / length as f64;
                return match self.stage {
                    EnvelopeStage::Hold => 1.0 + fraction * 2.0 * self.punch,
                    EnvelopeStage::Release => fraction,
                    EnvelopeStage::Idle => 0.0,
                };
            }

            self.elapsed -= length;
            self.stage = self.stage.next();
        }

        0.0
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    // float-to-int `as` saturates: negatives and NaN become 0
    (seconds * sample_rate) as usize
}
