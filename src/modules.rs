//! Sound Effect Modules
//!
//! Triggered one-shot voices built from an [`Oscillator`] and an
//! [`EnvelopeGenerator`], plus a delayed trigger source to fire them:
//!
//! - [`Blip`]: square/saw beep
//! - [`Coin`]: punchy pulse with a delayed pitch jump
//! - [`Hit`]: filtered square/saw/noise with pitch slide
//! - [`DTrig`]: trigger delay, free-running when unpatched
//!
//! A sound module whose trigger input is unpatched plays its oscillator
//! continuously and follows pitch changes live. Once a trigger is patched the
//! oscillator is gated by the envelope and pitch is sampled on each trigger.
//! All outputs are reduced to 8 bits.

use crate::envelope::EnvelopeGenerator;
use crate::oscillator::{Oscillator, DEFAULT_SUPERSAMPLING};
use crate::port::{
    GraphModule, ParamDef, ParamId, Params, PortDef, PortId, PortSpec, PortValues, SignalKind,
};
use crate::presets::{BlipParams, CoinParams, HitParams};
use crate::quantize::quantize_clamped;
use crate::rng::Rng;
use crate::trigger::{PulseGenerator, SchmittTrigger, TimedTrigger};
use log::debug;

/// Frequency of C4 in Hz, the 0 semitone reference of every frequency knob
pub const FREQ_C4: f64 = 261.6256;

/// Length of the pitch-change trigger emitted by [`Coin`]
const MOD_TRIGGER_LENGTH: f64 = 1e-3;

const TRIGGER_HIGH: f64 = 10.0;

/// Supersampled oscillator period in seconds for a frequency knob (semitones
/// from C4) and a 1V/oct pitch input.
pub fn period_seconds(frequency: f64, pitch: f64) -> f64 {
    f64::from(DEFAULT_SUPERSAMPLING) / FREQ_C4 * libm::exp2(-frequency / 12.0 - pitch)
}

/// Hold time after an optional exponential CV (one octave per volt)
fn modulated_hold(hold: f64, cv: Option<f64>) -> f64 {
    match cv {
        Some(cv) => (hold * libm::exp2(cv)).clamp(0.0005, 0.5),
        None => hold,
    }
}

/// Release time after an optional exponential CV
fn modulated_release(release: f64, cv: Option<f64>) -> f64 {
    match cv {
        Some(cv) => (release.max(1e-5) * libm::exp2(cv)).min(0.5),
        None => release,
    }
}

#[inline]
fn audio_out(sample: f64) -> f64 {
    quantize_clamped::<8>(sample) * 5.0
}

#[inline]
fn envelope_out(level: f64) -> f64 {
    quantize_clamped::<8>(level) * 10.0
}

/// Edge detector for input `port`, using the thresholds of its declared kind
fn edge_detector(spec: &PortSpec, port: PortId) -> SchmittTrigger {
    spec.input_by_id(port)
        .and_then(|def| SchmittTrigger::for_kind(def.kind))
        .unwrap_or_default()
}

/// Trigger input reader shared by the sound modules
#[derive(Debug, Clone, Copy)]
struct PlayInput {
    port: PortId,
    schmitt: SchmittTrigger,
}

impl PlayInput {
    fn new(spec: &PortSpec, port: PortId) -> Self {
        Self {
            port,
            schmitt: edge_detector(spec, port),
        }
    }

    /// Returns (patched, rising edge). An unpatched input reads as 0V.
    fn process(&mut self, inputs: &PortValues) -> (bool, bool) {
        let patched = inputs.has(self.port);
        let edge = self.schmitt.process(inputs.get_or(self.port, 0.0));
        (patched, edge)
    }

    fn reset(&mut self) {
        self.schmitt.reset();
    }
}

fn frequency_param(id: ParamId) -> ParamDef {
    ParamDef::new(id, "frequency", -54.0, 54.0, 0.0).with_unit("semitones")
}

fn hold_param(id: ParamId) -> ParamDef {
    ParamDef::new(id, "hold", 0.001, 0.25, 0.05).with_unit("s")
}

fn release_param(id: ParamId) -> ParamDef {
    ParamDef::new(id, "release", 0.0, 0.25, 0.01).with_unit("s")
}

/// Blip: square/saw beep
///
/// # Ports
///
/// Inputs: `pitch` (1V/oct), `blend`, `pw`, `hold`, `release` (CVs), `trig`.
/// Outputs: `env` (0..10V), `out` (±5V).
///
/// Blend and pulse width CVs add 0.1 per volt to their knobs. Hold and
/// release CVs scale the knob times by one octave per volt.
pub struct Blip {
    osc: Oscillator,
    envelope: EnvelopeGenerator,
    play: PlayInput,
    params: Params,
    sample_rate: f64,
    spec: PortSpec,
}

impl Blip {
    pub const FREQUENCY: ParamId = 0;
    pub const BLEND: ParamId = 1;
    pub const PULSE_WIDTH: ParamId = 2;
    pub const HOLD: ParamId = 3;
    pub const RELEASE: ParamId = 4;

    pub fn new(sample_rate: f64) -> Self {
        let spec = PortSpec {
            inputs: vec![
                PortDef::new(0, "pitch", SignalKind::VoltPerOctave)
                    .with_label("1V/octave pitch"),
                PortDef::new(1, "blend", SignalKind::CvBipolar).with_label("Blend"),
                PortDef::new(2, "pw", SignalKind::CvBipolar)
                    .with_label("Pulse width modulation"),
                PortDef::new(3, "hold", SignalKind::CvBipolar).with_label("Hold time"),
                PortDef::new(4, "release", SignalKind::CvBipolar).with_label("Release time"),
                PortDef::new(5, "trig", SignalKind::Trigger).with_label("Trigger"),
            ],
            outputs: vec![
                PortDef::new(10, "env", SignalKind::CvUnipolar).with_label("Envelope"),
                PortDef::new(11, "out", SignalKind::Audio).with_label("Output"),
            ],
        };

        Self {
            osc: Oscillator::tone(),
            envelope: EnvelopeGenerator::new(),
            play: PlayInput::new(&spec, 5),
            params: Params::new(vec![
                frequency_param(Self::FREQUENCY),
                ParamDef::new(Self::BLEND, "blend", 0.0, 1.0, 0.0),
                ParamDef::new(Self::PULSE_WIDTH, "pulse width", 0.01, 0.99, 0.5),
                hold_param(Self::HOLD),
                release_param(Self::RELEASE),
            ]),
            sample_rate,
            spec,
        }
    }

    pub fn params_snapshot(&self) -> BlipParams {
        BlipParams {
            frequency: self.params.value(Self::FREQUENCY),
            blend: self.params.value(Self::BLEND),
            pulse_width: self.params.value(Self::PULSE_WIDTH),
            hold: self.params.value(Self::HOLD),
            release: self.params.value(Self::RELEASE),
        }
    }

    /// Set every knob from a preset, clamping to the knob ranges
    pub fn apply_params(&mut self, preset: &BlipParams) {
        debug!("blip: applying {:?}", preset);
        self.params.set(Self::FREQUENCY, preset.frequency);
        self.params.set(Self::BLEND, preset.blend);
        self.params.set(Self::PULSE_WIDTH, preset.pulse_width);
        self.params.set(Self::HOLD, preset.hold);
        self.params.set(Self::RELEASE, preset.release);
    }

    pub fn randomize<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.apply_params(&BlipParams::random(rng));
    }
}

impl Default for Blip {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for Blip {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let pitch = inputs.get_or(0, 0.0);
        let blend_cv = inputs.get_or(1, 0.0);
        let pw_cv = inputs.get_or(2, 0.0);
        let (patched, triggered) = self.play.process(inputs);

        if triggered || !patched {
            let period = period_seconds(self.params.value(Self::FREQUENCY), pitch);
            self.osc.set_period(self.sample_rate, period);
        }

        if triggered {
            self.osc.reset_phase();
            self.osc.reset_filter();
            let hold = modulated_hold(self.params.value(Self::HOLD), inputs.get(3));
            let release = modulated_release(self.params.value(Self::RELEASE), inputs.get(4));
            self.envelope.start(self.sample_rate, hold, release, 0.0);
        }

        let blend = (self.params.value(Self::BLEND) + blend_cv * 0.1).clamp(0.0, 1.0);
        let duty = (self.params.value(Self::PULSE_WIDTH) + pw_cv * 0.1).clamp(0.01, 0.99);
        let sample = self.osc.process(blend, duty);
        let env = self.envelope.process();
        let out = if patched { sample * env } else { sample };

        outputs.set(10, envelope_out(env));
        outputs.set(11, audio_out(out));
    }

    fn reset(&mut self) {
        self.play.reset();
        self.envelope.stop();
        self.osc.reset_phase();
        self.osc.reset_filter();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn params(&self) -> &[ParamDef] {
        self.params.defs()
    }

    fn get_param(&self, id: ParamId) -> Option<f64> {
        self.params.get(id)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        self.params.set(id, value);
    }

    fn type_id(&self) -> &'static str {
        "blip"
    }
}

/// Coin: pulse wave with punch and a delayed pitch jump
///
/// # Ports
///
/// Inputs: `pitch` (1V/oct), `pitch_mod` (1V/oct jump), `mod_time`, `hold`,
/// `release` (CVs), `trig`.
/// Outputs: `mod_trig`, `env`, `out`.
///
/// `mod_time` seconds after each trigger the pitch jumps by the frequency
/// mod knob plus `pitch_mod`, and `mod_trig` emits a 1 ms pulse. The jump is
/// disabled while the trigger input is unpatched.
pub struct Coin {
    osc: Oscillator,
    envelope: EnvelopeGenerator,
    play: PlayInput,
    mod_timer: TimedTrigger,
    mod_pulse: PulseGenerator,
    base_period: f64,
    params: Params,
    sample_rate: f64,
    spec: PortSpec,
}

impl Coin {
    pub const FREQUENCY: ParamId = 0;
    pub const FREQUENCY_MOD: ParamId = 1;
    pub const MOD_TIME: ParamId = 2;
    pub const PUNCH: ParamId = 3;
    pub const HOLD: ParamId = 4;
    pub const RELEASE: ParamId = 5;

    pub fn new(sample_rate: f64) -> Self {
        let spec = PortSpec {
            inputs: vec![
                PortDef::new(0, "pitch", SignalKind::VoltPerOctave)
                    .with_label("1V/octave pitch"),
                PortDef::new(1, "pitch_mod", SignalKind::VoltPerOctave)
                    .with_label("1V/octave pitch change"),
                PortDef::new(2, "mod_time", SignalKind::CvBipolar)
                    .with_label("Pitch change time"),
                PortDef::new(3, "hold", SignalKind::CvBipolar).with_label("Hold time"),
                PortDef::new(4, "release", SignalKind::CvBipolar).with_label("Release time"),
                PortDef::new(5, "trig", SignalKind::Trigger).with_label("Trigger"),
            ],
            outputs: vec![
                PortDef::new(10, "mod_trig", SignalKind::Trigger)
                    .with_label("Pitch change trigger"),
                PortDef::new(11, "env", SignalKind::CvUnipolar).with_label("Envelope"),
                PortDef::new(12, "out", SignalKind::Audio).with_label("Output"),
            ],
        };

        Self {
            osc: Oscillator::pulse(),
            envelope: EnvelopeGenerator::new(),
            play: PlayInput::new(&spec, 5),
            mod_timer: TimedTrigger::new(),
            mod_pulse: PulseGenerator::default(),
            base_period: 1.0,
            params: Params::new(vec![
                frequency_param(Self::FREQUENCY),
                ParamDef::new(Self::FREQUENCY_MOD, "frequency mod", -24.0, 24.0, 0.0)
                    .with_unit("semitones"),
                ParamDef::new(Self::MOD_TIME, "mod time", 0.0, 0.4, 0.15).with_unit("s"),
                ParamDef::new(Self::PUNCH, "punch", 0.3, 0.6, 1.0),
                hold_param(Self::HOLD),
                release_param(Self::RELEASE),
            ]),
            sample_rate,
            spec,
        }
    }

    pub fn params_snapshot(&self) -> CoinParams {
        CoinParams {
            frequency: self.params.value(Self::FREQUENCY),
            frequency_mod: self.params.value(Self::FREQUENCY_MOD),
            mod_time: self.params.value(Self::MOD_TIME),
            punch: self.params.value(Self::PUNCH),
            hold: self.params.value(Self::HOLD),
            release: self.params.value(Self::RELEASE),
        }
    }

    pub fn apply_params(&mut self, preset: &CoinParams) {
        debug!("coin: applying {:?}", preset);
        self.params.set(Self::FREQUENCY, preset.frequency);
        self.params.set(Self::FREQUENCY_MOD, preset.frequency_mod);
        self.params.set(Self::MOD_TIME, preset.mod_time);
        self.params.set(Self::PUNCH, preset.punch);
        self.params.set(Self::HOLD, preset.hold);
        self.params.set(Self::RELEASE, preset.release);
    }

    /// Roll new knob values; the pitch jump is tuned for the current rate
    pub fn randomize<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.apply_params(&CoinParams::random(rng, self.sample_rate));
    }
}

impl Default for Coin {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for Coin {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let pitch = inputs.get_or(0, 0.0);
        let pitch_mod = inputs.get_or(1, 0.0);
        let (patched, triggered) = self.play.process(inputs);
        let dt = 1.0 / self.sample_rate;

        if triggered || !patched {
            self.base_period = period_seconds(self.params.value(Self::FREQUENCY), pitch);
            self.osc.set_period(self.sample_rate, self.base_period);
        }

        if !patched {
            self.mod_timer.reset();
        } else if triggered {
            let mod_time = match inputs.get(2) {
                Some(cv) => (self.params.value(Self::MOD_TIME).max(1e-5) * libm::exp2(cv)).min(0.8),
                None => self.params.value(Self::MOD_TIME),
            };
            self.mod_timer.trigger(mod_time);
            self.osc.reset_phase();

            let hold = modulated_hold(self.params.value(Self::HOLD), inputs.get(3));
            let release = modulated_release(self.params.value(Self::RELEASE), inputs.get(4));
            let punch = self.params.value(Self::PUNCH);
            self.envelope.start(self.sample_rate, hold, release, punch);
        }

        if self.mod_timer.process(dt) {
            let ratio = libm::exp2(-self.params.value(Self::FREQUENCY_MOD) / 12.0 - pitch_mod);
            self.osc.set_period(self.sample_rate, self.base_period * ratio);
            self.mod_pulse.trigger(MOD_TRIGGER_LENGTH);
        }

        let sample = self.osc.process(0.0, 0.0);
        let env = self.envelope.process();
        let out = if patched { sample * env } else { sample };

        let mod_high = self.mod_pulse.process(dt);
        outputs.set(10, if mod_high { TRIGGER_HIGH } else { 0.0 });
        outputs.set(11, envelope_out(env));
        outputs.set(12, audio_out(out));
    }

    fn reset(&mut self) {
        self.play.reset();
        self.mod_timer.reset();
        self.mod_pulse.reset();
        self.envelope.stop();
        self.osc.reset_phase();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn params(&self) -> &[ParamDef] {
        self.params.defs()
    }

    fn get_param(&self, id: ParamId) -> Option<f64> {
        self.params.get(id)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        self.params.set(id, value);
    }

    fn type_id(&self) -> &'static str {
        "coin"
    }
}

/// Hit: filtered square/saw/noise with pitch slide
///
/// # Ports
///
/// Inputs: `pitch` (1V/oct), `slide`, `blend`, `pw`, `hold`, `release`
/// (CVs), `trig`.
/// Outputs: `env`, `out`.
///
/// Slide is sampled on each trigger; positive knob values bend the pitch
/// up. The blend CV adds 0.3 per volt across the 0..3 blend range.
pub struct Hit {
    osc: Oscillator,
    envelope: EnvelopeGenerator,
    play: PlayInput,
    params: Params,
    sample_rate: f64,
    spec: PortSpec,
}

impl Hit {
    pub const FREQUENCY: ParamId = 0;
    pub const SLIDE: ParamId = 1;
    pub const BLEND: ParamId = 2;
    pub const PULSE_WIDTH: ParamId = 3;
    pub const HOLD: ParamId = 4;
    pub const RELEASE: ParamId = 5;
    pub const HIGH_PASS: ParamId = 6;
    pub const LOW_PASS: ParamId = 7;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_rng(sample_rate, Rng::default())
    }

    /// Build with a given noise source
    pub fn with_rng(sample_rate: f64, rng: Rng) -> Self {
        let spec = PortSpec {
            inputs: vec![
                PortDef::new(0, "pitch", SignalKind::VoltPerOctave)
                    .with_label("1V/octave pitch"),
                PortDef::new(1, "slide", SignalKind::CvBipolar).with_label("Slide"),
                PortDef::new(2, "blend", SignalKind::CvBipolar).with_label("Blend"),
                PortDef::new(3, "pw", SignalKind::CvBipolar)
                    .with_label("Pulse width modulation"),
                PortDef::new(4, "hold", SignalKind::CvBipolar).with_label("Hold time"),
                PortDef::new(5, "release", SignalKind::CvBipolar).with_label("Release time"),
                PortDef::new(6, "trig", SignalKind::Trigger).with_label("Trigger"),
            ],
            outputs: vec![
                PortDef::new(10, "env", SignalKind::CvUnipolar).with_label("Envelope"),
                PortDef::new(11, "out", SignalKind::Audio).with_label("Output"),
            ],
        };

        Self {
            osc: Oscillator::blend_slide_with_rng(rng),
            envelope: EnvelopeGenerator::new(),
            play: PlayInput::new(&spec, 6),
            params: Params::new(vec![
                frequency_param(Self::FREQUENCY),
                ParamDef::new(Self::SLIDE, "slide", -1.0, 1.0, 0.0),
                ParamDef::new(Self::BLEND, "blend", 0.0, 3.0, 0.0),
                ParamDef::new(Self::PULSE_WIDTH, "pulse width", 0.01, 0.99, 0.5),
                hold_param(Self::HOLD),
                release_param(Self::RELEASE),
                ParamDef::new(Self::HIGH_PASS, "high pass", 0.0, 1.0, 0.0),
                ParamDef::new(Self::LOW_PASS, "low pass", 0.0, 1.0, 0.0),
            ]),
            sample_rate,
            spec,
        }
    }

    pub fn params_snapshot(&self) -> HitParams {
        HitParams {
            frequency: self.params.value(Self::FREQUENCY),
            slide: self.params.value(Self::SLIDE),
            blend: self.params.value(Self::BLEND),
            pulse_width: self.params.value(Self::PULSE_WIDTH),
            hold: self.params.value(Self::HOLD),
            release: self.params.value(Self::RELEASE),
            high_pass: self.params.value(Self::HIGH_PASS),
            low_pass: self.params.value(Self::LOW_PASS),
        }
    }

    pub fn apply_params(&mut self, preset: &HitParams) {
        debug!("hit: applying {:?}", preset);
        self.params.set(Self::FREQUENCY, preset.frequency);
        self.params.set(Self::SLIDE, preset.slide);
        self.params.set(Self::BLEND, preset.blend);
        self.params.set(Self::PULSE_WIDTH, preset.pulse_width);
        self.params.set(Self::HOLD, preset.hold);
        self.params.set(Self::RELEASE, preset.release);
        self.params.set(Self::HIGH_PASS, preset.high_pass);
        self.params.set(Self::LOW_PASS, preset.low_pass);
    }

    pub fn randomize<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.apply_params(&HitParams::random(rng));
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for Hit {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let pitch = inputs.get_or(0, 0.0);
        let slide_cv = inputs.get_or(1, 0.0);
        let blend_cv = inputs.get_or(2, 0.0);
        let pw_cv = inputs.get_or(3, 0.0);
        let (patched, triggered) = self.play.process(inputs);

        if triggered || !patched {
            let period = period_seconds(self.params.value(Self::FREQUENCY), pitch);
            self.osc.set_period(self.sample_rate, period);
            self.osc.set_low_pass(self.params.value(Self::LOW_PASS));
            self.osc.set_high_pass(self.params.value(Self::HIGH_PASS));
        }

        if triggered {
            self.osc.reset_phase();
            self.osc.reset_filter();
            let slide = (-self.params.value(Self::SLIDE) - slide_cv * 0.1).clamp(-1.0, 1.0);
            self.osc.set_slide(slide);

            let hold = modulated_hold(self.params.value(Self::HOLD), inputs.get(4));
            let release = modulated_release(self.params.value(Self::RELEASE), inputs.get(5));
            self.envelope.start(self.sample_rate, hold, release, 0.0);
        }

        let blend = (self.params.value(Self::BLEND) + blend_cv * 0.3).clamp(0.0, 3.0);
        let duty = (self.params.value(Self::PULSE_WIDTH) + pw_cv * 0.1).clamp(0.01, 0.99);
        let sample = self.osc.process(blend, duty);
        let env = self.envelope.process();
        let out = if patched { sample * env } else { sample };

        outputs.set(10, envelope_out(env));
        outputs.set(11, audio_out(out));
    }

    fn reset(&mut self) {
        self.play.reset();
        self.envelope.stop();
        self.osc.reset_phase();
        self.osc.reset_filter();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn params(&self) -> &[ParamDef] {
        self.params.defs()
    }

    fn get_param(&self, id: ParamId) -> Option<f64> {
        self.params.get(id)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        self.params.set(id, value);
    }

    fn type_id(&self) -> &'static str {
        "hit"
    }
}

/// D-Trig: delayed trigger
///
/// # Ports
///
/// Inputs: `delay` (CV), `trig`, `gate` (CV).
/// Outputs: `trig` (10V for the gate length).
///
/// Each input trigger schedules an output pulse `delay` seconds later;
/// re-triggering while a delay is pending keeps the longer wait. With the
/// trigger input unpatched the module re-arms itself and free-runs with a
/// period of roughly `delay`.
pub struct DTrig {
    play: SchmittTrigger,
    timer: TimedTrigger,
    pulse: PulseGenerator,
    params: Params,
    sample_rate: f64,
    spec: PortSpec,
}

impl DTrig {
    pub const DELAY: ParamId = 0;
    pub const GATE_LENGTH: ParamId = 1;

    pub fn new(sample_rate: f64) -> Self {
        let spec = PortSpec {
            inputs: vec![
                PortDef::new(0, "delay", SignalKind::CvBipolar).with_label("Delay time"),
                PortDef::new(1, "trig", SignalKind::Trigger).with_label("Trigger"),
                PortDef::new(2, "gate", SignalKind::CvBipolar).with_label("Gate length"),
            ],
            outputs: vec![PortDef::new(10, "trig", SignalKind::Trigger).with_label("Trigger")],
        };

        Self {
            play: edge_detector(&spec, 1),
            timer: TimedTrigger::new(),
            pulse: PulseGenerator::default(),
            params: Params::new(vec![
                ParamDef::new(Self::DELAY, "delay", 1.5e-3, 2.0, 0.15).with_unit("s"),
                ParamDef::new(Self::GATE_LENGTH, "gate length", 1e-3, 1.0, 1e-3).with_unit("s"),
            ]),
            sample_rate,
            spec,
        }
    }
}

impl Default for DTrig {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for DTrig {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let dt = 1.0 / self.sample_rate;
        let triggered = self.play.process(inputs.get_or(1, 0.0));
        let free_running = !inputs.has(1) && !self.timer.is_active();

        if triggered || free_running {
            let delay = self.params.value(Self::DELAY);
            let delay = match inputs.get(0) {
                Some(cv) => (delay * libm::exp2(cv)).min(5.0),
                None => delay,
            };
            self.timer.trigger(delay);
        }

        if self.timer.process(dt) {
            let length = self.params.value(Self::GATE_LENGTH);
            let length = match inputs.get(2) {
                Some(cv) => (length * libm::exp2(cv)).clamp(1e-3, 5.0),
                None => length,
            };
            self.pulse.trigger(length);
        }

        let high = self.pulse.process(dt);
        outputs.set(10, if high { TRIGGER_HIGH } else { 0.0 });
    }

    fn reset(&mut self) {
        self.play.reset();
        self.timer.reset();
        self.pulse.reset();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn params(&self) -> &[ParamDef] {
        self.params.defs()
    }

    fn get_param(&self, id: ParamId) -> Option<f64> {
        self.params.get(id)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        self.params.set(id, value);
    }

    fn type_id(&self) -> &'static str {
        "d-trig"
    }
}
