//! Sound Presets
//!
//! Knob settings for the three sound modules as plain serde data, plus the
//! randomizers that roll a fresh sound. Randomization is a pure sampling step:
//! hand it any `rand::Rng` (seeded for reproducible results) and apply the
//! returned set to a module.
//!
//! # Example
//!
//! ```ignore
//! use blipfx::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = Rng::seed_from_u64(7);
//! let params = CoinParams::random(&mut rng, 44100.0);
//!
//! let mut coin = Coin::new(44100.0);
//! coin.apply_params(&params);
//!
//! let json = params.to_json()?;
//! ```
//!
//! Sampled values follow fixed hand-tuned distributions and are not limited
//! to the knob ranges; modules clamp them when applied.

use crate::modules::FREQ_C4;
use crate::oscillator::DEFAULT_SUPERSAMPLING;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sample rate the distributions were tuned at
const REFERENCE_RATE: f64 = 44100.0;

/// Error types for preset handling
#[derive(Debug, Clone, PartialEq)]
pub enum PresetError {
    /// Malformed or mistyped JSON
    Json(String),
    /// Sound name not recognised
    UnknownSound(String),
}

impl std::fmt::Display for PresetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetError::Json(msg) => write!(f, "Invalid preset JSON: {}", msg),
            PresetError::UnknownSound(name) => write!(f, "Unknown sound: {}", name),
        }
    }
}

impl std::error::Error for PresetError {}

impl From<serde_json::Error> for PresetError {
    fn from(err: serde_json::Error) -> Self {
        PresetError::Json(err.to_string())
    }
}

/// Uniform draw from {0, 1/10000, ..., 1}
fn frnd<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    f64::from(rng.gen_range(0..=10_000u32)) / 10_000.0
}

/// Uniform integer draw from 0..=n
fn rnd<R: Rng + ?Sized>(rng: &mut R, n: u32) -> f64 {
    f64::from(rng.gen_range(0..=n))
}

/// Frequency knob value (semitones from C4) producing a period in seconds
fn semitones_for_period(period: f64) -> f64 {
    libm::log2(f64::from(DEFAULT_SUPERSAMPLING) / FREQ_C4 / period) * 12.0
}

/// Period drawn as `100 / (base^2 + 0.001)` reference samples
fn random_period(base: f64) -> f64 {
    100.0 / (base * base + 0.001) / REFERENCE_RATE
}

/// Seconds for a squared draw scaled by 100000 reference samples
fn squared_time(base: f64) -> f64 {
    base * base * 100_000.0 / REFERENCE_RATE
}

/// Which sound module a parameter set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    Blip,
    Coin,
    Hit,
}

impl SoundKind {
    pub const ALL: [SoundKind; 3] = [SoundKind::Blip, SoundKind::Coin, SoundKind::Hit];

    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Blip => "blip",
            SoundKind::Coin => "coin",
            SoundKind::Hit => "hit",
        }
    }

    /// Look up a sound by name, ignoring ASCII case
    pub fn from_name(name: &str) -> Result<Self, PresetError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PresetError::UnknownSound(name.to_string()))
    }

    /// Roll a random parameter set for this sound
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R, sample_rate: f64) -> SoundParams {
        match self {
            SoundKind::Blip => SoundParams::Blip(BlipParams::random(rng)),
            SoundKind::Coin => SoundParams::Coin(CoinParams::random(rng, sample_rate)),
            SoundKind::Hit => SoundParams::Hit(HitParams::random(rng)),
        }
    }
}

/// Knob settings of a [`Blip`](crate::modules::Blip)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlipParams {
    /// Semitones from C4
    pub frequency: f64,
    /// 0 = square, 1 = saw
    pub blend: f64,
    pub pulse_width: f64,
    /// Seconds
    pub hold: f64,
    /// Seconds
    pub release: f64,
}

impl Default for BlipParams {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            blend: 0.0,
            pulse_width: 0.5,
            hold: 0.05,
            release: 0.01,
        }
    }
}

impl BlipParams {
    /// A short pitched beep, either pure square or pure saw
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let frequency = semitones_for_period(random_period(0.2 + frnd(rng) * 0.4));
        let blend = rnd(rng, 1);
        let hold = squared_time(0.1 + frnd(rng) * 0.1);
        let release = squared_time(frnd(rng) * 0.2);
        let pulse_width = 0.5 - frnd(rng) * 0.3;

        Self {
            frequency,
            blend,
            pulse_width,
            hold,
            release,
        }
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Knob settings of a [`Coin`](crate::modules::Coin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinParams {
    /// Semitones from C4
    pub frequency: f64,
    /// Pitch jump in semitones applied after `mod_time`
    pub frequency_mod: f64,
    /// Seconds from trigger to pitch jump
    pub mod_time: f64,
    pub punch: f64,
    /// Seconds
    pub hold: f64,
    /// Seconds
    pub release: f64,
}

impl Default for CoinParams {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            frequency_mod: 0.0,
            mod_time: 0.15,
            punch: 0.6,
            hold: 0.05,
            release: 0.01,
        }
    }
}

impl CoinParams {
    /// A pickup chime, usually with an upward pitch jump.
    ///
    /// The jump size is tuned in reference samples, so it is rescaled for
    /// `sample_rate`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, sample_rate: f64) -> Self {
        let frequency = semitones_for_period(random_period(0.4 + frnd(rng) * 0.5));
        let hold = squared_time(frnd(rng) * 0.1);
        let release = squared_time(0.1 + frnd(rng) * 0.4);
        let punch = 0.3 + frnd(rng) * 0.3;

        let mod_time = if rnd(rng, 1) == 1.0 {
            let base = 0.5 - frnd(rng) * 0.2;
            (base * base * 20_000.0 + 32.0) / REFERENCE_RATE
        } else {
            0.0
        };

        let base = 0.2 + frnd(rng) * 0.4;
        let ratio = 1.0 - base * base * 0.9;
        let frequency_mod = libm::log2(ratio) * -12.0 * REFERENCE_RATE / sample_rate;

        Self {
            frequency,
            frequency_mod,
            mod_time,
            punch,
            hold,
            release,
        }
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Knob settings of a [`Hit`](crate::modules::Hit)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitParams {
    /// Semitones from C4
    pub frequency: f64,
    /// Positive values slide the pitch up
    pub slide: f64,
    /// 0 = square, 1 = saw, 2 = noise, 3 = square again
    pub blend: f64,
    pub pulse_width: f64,
    /// Seconds
    pub hold: f64,
    /// Seconds
    pub release: f64,
    pub high_pass: f64,
    pub low_pass: f64,
}

impl Default for HitParams {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            slide: 0.0,
            blend: 0.0,
            pulse_width: 0.5,
            hold: 0.05,
            release: 0.01,
            high_pass: 0.0,
            low_pass: 0.0,
        }
    }
}

impl HitParams {
    /// A falling percussive hit, square, saw or noise based
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let frequency = semitones_for_period(random_period(0.2 + frnd(rng) * 0.6));
        let blend = rnd(rng, 2);
        let pulse_width = frnd(rng) * 0.6;
        let hold = squared_time(frnd(rng) * 0.1);
        let release = squared_time(0.1 + frnd(rng) * 0.2);
        let slide = 0.3 + frnd(rng) * 0.4;
        let high_pass = if rnd(rng, 1) != 0.0 {
            frnd(rng) * 0.3
        } else {
            0.0
        };
        let low_pass = 0.6 + frnd(rng) * 0.4;

        Self {
            frequency,
            slide,
            blend,
            pulse_width,
            hold,
            release,
            high_pass,
            low_pass,
        }
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A parameter set tagged with the sound it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sound", rename_all = "lowercase")]
pub enum SoundParams {
    Blip(BlipParams),
    Coin(CoinParams),
    Hit(HitParams),
}

impl SoundParams {
    pub fn kind(&self) -> SoundKind {
        match self {
            SoundParams::Blip(_) => SoundKind::Blip,
            SoundParams::Coin(_) => SoundKind::Coin,
            SoundParams::Hit(_) => SoundKind::Hit,
        }
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng as XorShift;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    #[test]
    fn test_semitones_for_period_reference() {
        // one supersampled period of C4 is the 0 semitone point
        let period = f64::from(DEFAULT_SUPERSAMPLING) / FREQ_C4;
        assert_abs_diff_eq!(semitones_for_period(period), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(semitones_for_period(period / 2.0), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_blip_random_ranges() {
        let mut rng = XorShift::seed_from_u64(1);
        for _ in 0..500 {
            let p = BlipParams::random(&mut rng);
            assert!((-11.0..28.0).contains(&p.frequency), "{:?}", p);
            assert!(p.blend == 0.0 || p.blend == 1.0);
            assert!((0.2..=0.5).contains(&p.pulse_width));
            assert!((0.022..0.091).contains(&p.hold));
            assert!((0.0..0.091).contains(&p.release));
        }
    }

    #[test]
    fn test_coin_random_ranges() {
        let mut rng = XorShift::seed_from_u64(2);
        let mut jumps = 0;
        for _ in 0..500 {
            let p = CoinParams::random(&mut rng, 44100.0);
            assert!((0.3..=0.6).contains(&p.punch));
            assert!(p.frequency_mod >= 0.0 && p.frequency_mod < 24.0, "{:?}", p);
            if p.mod_time > 0.0 {
                jumps += 1;
                assert!(p.mod_time < 0.12);
            }
        }
        assert!(jumps > 100 && jumps < 400, "{} jumps", jumps);
    }

    #[test]
    fn test_coin_mod_scales_with_sample_rate() {
        let a = CoinParams::random(&mut XorShift::seed_from_u64(3), 44100.0);
        let b = CoinParams::random(&mut XorShift::seed_from_u64(3), 88200.0);
        assert_abs_diff_eq!(a.frequency_mod, b.frequency_mod * 2.0, epsilon = 1e-9);
        assert_eq!(a.frequency, b.frequency);
    }

    #[test]
    fn test_hit_random_ranges() {
        let mut rng = XorShift::seed_from_u64(4);
        for _ in 0..500 {
            let p = HitParams::random(&mut rng);
            assert!([0.0, 1.0, 2.0].contains(&p.blend));
            assert!((0.3..=0.7).contains(&p.slide));
            assert!((0.0..=0.3).contains(&p.high_pass));
            assert!((0.6..=1.0).contains(&p.low_pass));
            assert!((0.0..=0.6).contains(&p.pulse_width));
        }
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = HitParams::random(&mut XorShift::seed_from_u64(99));
        let b = HitParams::random(&mut XorShift::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sound_kind_from_name() {
        assert_eq!(SoundKind::from_name("coin"), Ok(SoundKind::Coin));
        assert_eq!(SoundKind::from_name("HIT"), Ok(SoundKind::Hit));
        assert_eq!(
            SoundKind::from_name("laser"),
            Err(PresetError::UnknownSound("laser".into()))
        );
    }

    #[test]
    fn test_json_missing_fields_use_defaults() {
        let p = BlipParams::from_json(r#"{ "frequency": 7.0 }"#).unwrap();
        assert_eq!(p.frequency, 7.0);
        assert_eq!(p.pulse_width, 0.5);
        assert_eq!(p.hold, 0.05);
    }

    #[test]
    fn test_tagged_params_json() {
        let params = SoundKind::Coin.random(&mut XorShift::seed_from_u64(5), 44100.0);
        let json = params.to_json().unwrap();
        assert!(json.contains(r#""sound": "coin""#));

        let loaded = SoundParams::from_json(&json).unwrap();
        assert_eq!(loaded.kind(), SoundKind::Coin);
        match (loaded, params) {
            (SoundParams::Coin(a), SoundParams::Coin(b)) => {
                assert_abs_diff_eq!(a.frequency, b.frequency, epsilon = 1e-12);
                assert_abs_diff_eq!(a.mod_time, b.mod_time, epsilon = 1e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        let err = HitParams::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PresetError::Json(_)));
        assert!(err.to_string().contains("Invalid preset JSON"));

        let err = SoundParams::from_json(r#"{ "sound": "laser" }"#).unwrap_err();
        assert!(matches!(err, PresetError::Json(_)));
    }

    #[test]
    fn test_preset_error_display() {
        let err = PresetError::UnknownSound("Test".into());
        assert!(err.to_string().contains("Test"));
    }
}
