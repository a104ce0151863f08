//! Supersampled Oscillators
//!
//! All three voices share one integer phase accumulator. A period is counted
//! in sub-steps; each output sample advances the phase `supersampling` times
//! and averages the sub-step values, which keeps the naive square and saw
//! edges from aliasing too badly.
//!
//! - [`Voice::Tone`]: square/saw blend through a fixed DC-blocking high-pass.
//! - [`Voice::Pulse`]: bare 50% square, no filtering.
//! - [`Voice::BlendSlide`]: square/saw/noise blend with a resonant low-pass,
//!   an adjustable high-pass and a per-sample period slide.

use crate::rng::Rng;

/// Sub-steps per output sample used by the sound modules
pub const DEFAULT_SUPERSAMPLING: u32 = 8;

/// Largest accepted sub-step count
pub const MAX_SUPERSAMPLING: u32 = 256;

/// Noise redraws per oscillator period
pub const NOISE_BUCKETS: u32 = 32;

/// Longest Tone/Pulse period, in output samples
const TONE_MAX_PERIOD: u32 = 12_500;

/// Longest BlendSlide period, in output samples
const SLIDE_MAX_PERIOD: u32 = 50_000;

/// Fixed feedback of the Tone high-pass
const TONE_HIGH_PASS: f64 = 0.999;

/// Which waveform generator an [`Oscillator`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorKind {
    Tone,
    Pulse,
    BlendSlide,
}

/// High-pass state of the Tone voice
#[derive(Debug, Clone, Default)]
pub struct ToneState {
    last: f64,
    high_pass: f64,
}

/// Noise that holds each random value for one bucket of the period
#[derive(Debug, Clone)]
pub struct SteppedNoise {
    value: f64,
    bucket: Option<u32>,
    rng: Rng,
}

impl SteppedNoise {
    pub fn new(rng: Rng) -> Self {
        Self {
            value: 0.0,
            bucket: None,
            rng,
        }
    }

    /// Noise for `phase`, redrawn only when the phase enters a new bucket
    pub fn sample(&mut self, phase: u32, period: u32) -> f64 {
        let bucket = (u64::from(phase) * u64::from(NOISE_BUCKETS) / u64::from(period)) as u32;
        if self.bucket != Some(bucket) {
            self.bucket = Some(bucket);
            self.value = self.rng.next_centered();
        }
        self.value
    }
}

/// Filter, slide and noise state of the BlendSlide voice
#[derive(Debug, Clone)]
pub struct BlendSlideState {
    exact_period: f64,
    slide: f64,
    noise: SteppedNoise,
    low_pass: f64,
    low_pass_delta: f64,
    low_pass_coeff: f64,
    high_pass: f64,
    high_pass_coeff: f64,
}

impl BlendSlideState {
    fn new(rng: Rng) -> Self {
        Self {
            exact_period: 1.0,
            slide: 1.0,
            noise: SteppedNoise::new(rng),
            low_pass: 0.0,
            low_pass_delta: 0.0,
            low_pass_coeff: 0.1,
            high_pass: 0.0,
            high_pass_coeff: 0.0,
        }
    }

    /// Resonant low-pass: a damped second-order integrator
    fn low_pass(&mut self, sample: f64) -> f64 {
        let w = self.low_pass_coeff;
        self.low_pass_delta += (sample - self.low_pass) * w;
        let damping = 5.0 / (1.0 + (0.4 * w) * (0.4 * w) * 20.0) * (0.04 + w);
        self.low_pass_delta -= self.low_pass_delta * damping;
        self.low_pass += self.low_pass_delta;
        self.low_pass
    }
}

/// Per-voice waveform and filter state
#[derive(Debug, Clone)]
pub enum Voice {
    Tone(ToneState),
    Pulse,
    BlendSlide(Box<BlendSlideState>),
}

/// Supersampled phase-accumulator oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: u32,
    period: u32,
    supersampling: u32,
    voice: Voice,
}

impl Oscillator {
    fn with_voice(voice: Voice) -> Self {
        Self {
            phase: 0,
            period: DEFAULT_SUPERSAMPLING,
            supersampling: DEFAULT_SUPERSAMPLING,
            voice,
        }
    }

    /// Square/saw blend with a fixed high-pass
    pub fn tone() -> Self {
        Self::with_voice(Voice::Tone(ToneState::default()))
    }

    /// Plain 50% square
    pub fn pulse() -> Self {
        Self::with_voice(Voice::Pulse)
    }

    /// Three-way blend with filters and slide, noise seeded from the clock
    pub fn blend_slide() -> Self {
        Self::blend_slide_with_rng(Rng::default())
    }

    /// Three-way blend with filters and slide, drawing noise from `rng`
    pub fn blend_slide_with_rng(rng: Rng) -> Self {
        Self::with_voice(Voice::BlendSlide(Box::new(BlendSlideState::new(rng))))
    }

    /// Change the sub-step count, kept within 1..=[`MAX_SUPERSAMPLING`].
    /// The period is re-clamped.
    pub fn with_supersampling(mut self, supersampling: u32) -> Self {
        self.supersampling = supersampling.clamp(1, MAX_SUPERSAMPLING);
        self.period = self.clamp_period(i64::from(self.period));
        self
    }

    pub fn kind(&self) -> OscillatorKind {
        match self.voice {
            Voice::Tone(_) => OscillatorKind::Tone,
            Voice::Pulse => OscillatorKind::Pulse,
            Voice::BlendSlide(_) => OscillatorKind::BlendSlide,
        }
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Current working period in sub-steps
    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn supersampling(&self) -> u32 {
        self.supersampling
    }

    /// Largest allowed period in sub-steps
    pub fn max_period(&self) -> u32 {
        let samples = match self.voice {
            Voice::Tone(_) | Voice::Pulse => TONE_MAX_PERIOD,
            Voice::BlendSlide(_) => SLIDE_MAX_PERIOD,
        };
        samples.saturating_mul(self.supersampling)
    }

    fn clamp_period(&self, period: i64) -> u32 {
        period.clamp(i64::from(self.supersampling), i64::from(self.max_period())) as u32
    }

    /// Set the period from a duration in seconds.
    ///
    /// `period_seconds` already includes the supersampling factor, so one
    /// sub-step lasts `1 / sample_rate`.
    pub fn set_period(&mut self, sample_rate: f64, period_seconds: f64) {
        let exact = period_seconds * sample_rate;
        self.period = self.clamp_period(exact as i64);
        if let Voice::BlendSlide(state) = &mut self.voice {
            state.exact_period = exact;
        }
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0;
    }

    /// Clear filter memories. Noise and slide are left as they are.
    pub fn reset_filter(&mut self) {
        match &mut self.voice {
            Voice::Tone(state) => {
                state.last = 0.0;
                state.high_pass = 0.0;
            }
            Voice::Pulse => {}
            Voice::BlendSlide(state) => {
                state.low_pass = 0.0;
                state.low_pass_delta = 0.0;
                state.high_pass = 0.0;
            }
        }
    }

    /// Low-pass amount in [0, 1]; ignored by Tone and Pulse
    pub fn set_low_pass(&mut self, value: f64) {
        if let Voice::BlendSlide(state) = &mut self.voice {
            let v = 0.1 + 0.9 * value;
            state.low_pass_coeff = v * v * v * 0.1;
        }
    }

    /// High-pass amount in [0, 1]; ignored by Tone and Pulse
    pub fn set_high_pass(&mut self, value: f64) {
        if let Voice::BlendSlide(state) = &mut self.voice {
            state.high_pass_coeff = value * value * 0.1;
        }
    }

    /// Slide amount in [-1, 1]; ignored by Tone and Pulse
    pub fn set_slide(&mut self, value: f64) {
        if let Voice::BlendSlide(state) = &mut self.voice {
            state.slide = 1.0 + value * value * value * 0.01;
        }
    }

    /// Produce one output sample.
    ///
    /// `blend` is 0..1 for Tone and 0..3 for BlendSlide; `duty` is the
    /// fraction of the period the square spends high. Pulse ignores both.
    pub fn process(&mut self, blend: f64, duty: f64) -> f64 {
        if let Voice::BlendSlide(state) = &mut self.voice {
            state.exact_period *= state.slide;
            let period = state.exact_period as i64;
            let clamped = period.clamp(
                i64::from(self.supersampling),
                i64::from(SLIDE_MAX_PERIOD.saturating_mul(self.supersampling)),
            );
            if clamped != period {
                state.exact_period = clamped as f64;
                state.slide = 1.0;
            }
            self.period = clamped as u32;
        }

        let Self {
            phase,
            period,
            supersampling,
            voice,
        } = self;
        let period = *period;
        let duty = (duty * f64::from(period)) as i64;

        let mut sum = 0.0;
        for _ in 0..*supersampling {
            *phase = (*phase + 1) % period;
            let (square, saw) = base_waves(*phase, period, duty);

            sum += match voice {
                Voice::Tone(state) => {
                    let sample = (1.0 - blend) * square + blend * saw;
                    let previous = state.last;
                    state.last = sample;
                    state.high_pass += sample - previous;
                    state.high_pass *= TONE_HIGH_PASS;
                    state.high_pass
                }
                Voice::Pulse => {
                    if *phase * 2 / period == 0 {
                        0.5
                    } else {
                        -0.5
                    }
                }
                Voice::BlendSlide(state) => {
                    let noise = state.noise.sample(*phase, period);
                    let sample = blend_three(blend, square, saw, noise);
                    let previous = state.low_pass;
                    let filtered = state.low_pass(sample);
                    state.high_pass += filtered - previous;
                    state.high_pass -= state.high_pass * state.high_pass_coeff;
                    state.high_pass
                }
            };
        }

        sum / f64::from(*supersampling)
    }
}

/// Square (±0.5) and falling saw (1 → -1) at `phase`
#[inline]
fn base_waves(phase: u32, period: u32, duty: i64) -> (f64, f64) {
    let fp = f64::from(phase) / f64::from(period);
    let square = if i64::from(phase) <= duty { 0.5 } else { -0.5 };
    (square, 1.0 - fp * 2.0)
}

/// Crossfade square → saw → noise → square as `blend` runs 0 → 3.
///
/// Each boundary value belongs to the lower segment: 1.0 is pure saw from
/// the square/saw pair and 2.0 is pure noise from the saw/noise pair.
#[inline]
pub fn blend_three(blend: f64, square: f64, saw: f64, noise: f64) -> f64 {
    if blend <= 1.0 {
        (1.0 - blend) * square + blend * saw
    } else if blend <= 2.0 {
        (2.0 - blend) * saw + (blend - 1.0) * noise
    } else {
        (3.0 - blend) * noise + (blend - 2.0) * square
    }
}
