//! Polyphonic Signal Selector
//!
//! [`Utp`] picks channels out of a polyphonic signal under CV control and
//! reports each newly selected channel with a short trigger. [`Utox`] sits to
//! its right and performs a further mono selection on the same signal, which
//! it receives over the expander link instead of a cable. Any number of
//! `Utox` modules can be chained; each forwards what it received.

use crate::port::{GraphModule, PortDef, PortSpec, PortValues, SignalKind, Voltages, MAX_CHANNELS};
use crate::trigger::{BooleanTrigger, PulseGenerator};
use serde::{Deserialize, Serialize};

/// Length of the selection trigger, in seconds
const TRIGGER_LENGTH: f64 = 1e-3;

const GATE_HIGH: f64 = 10.0;

/// CV range mapped across the available channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoltageRange {
    #[default]
    Unipolar10,
    Unipolar5,
    Unipolar1,
    Bipolar10,
    Bipolar5,
    Bipolar2p5,
    Bipolar1,
}

impl VoltageRange {
    pub const ALL: [VoltageRange; 7] = [
        VoltageRange::Unipolar10,
        VoltageRange::Unipolar5,
        VoltageRange::Unipolar1,
        VoltageRange::Bipolar10,
        VoltageRange::Bipolar5,
        VoltageRange::Bipolar2p5,
        VoltageRange::Bipolar1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VoltageRange::Unipolar10 => "0V - 10V",
            VoltageRange::Unipolar5 => "0V - 5V",
            VoltageRange::Unipolar1 => "0V - 1V",
            VoltageRange::Bipolar10 => "-10V - 10V",
            VoltageRange::Bipolar5 => "-5V - 5V",
            VoltageRange::Bipolar2p5 => "-2.5V - 2.5V",
            VoltageRange::Bipolar1 => "-1V - 1V",
        }
    }

    pub fn minimum(&self) -> f64 {
        match self {
            VoltageRange::Unipolar10 | VoltageRange::Unipolar5 | VoltageRange::Unipolar1 => 0.0,
            VoltageRange::Bipolar10 => -10.0,
            VoltageRange::Bipolar5 => -5.0,
            VoltageRange::Bipolar2p5 => -2.5,
            VoltageRange::Bipolar1 => -1.0,
        }
    }

    pub fn maximum(&self) -> f64 {
        match self {
            VoltageRange::Unipolar10 | VoltageRange::Bipolar10 => 10.0,
            VoltageRange::Unipolar5 | VoltageRange::Bipolar5 => 5.0,
            VoltageRange::Bipolar2p5 => 2.5,
            VoltageRange::Unipolar1 | VoltageRange::Bipolar1 => 1.0,
        }
    }
}

/// Map a CV to the nearest of `channels` evenly spaced channel indices.
///
/// `minimum` selects channel 0 and `maximum` the last channel; voltages
/// outside the range stick to the ends.
pub fn channel_index(channels: usize, voltage: f64, minimum: f64, maximum: f64) -> usize {
    if channels <= 1 {
        return 0;
    }

    let last = channels - 1;
    let position = last as f64 * ((voltage - minimum) / (maximum - minimum)) + 0.5;
    (position as i64).clamp(0, last as i64) as usize
}

/// Signal snapshot handed from a module to its right neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpanderMessage {
    pub channels: usize,
    pub inputs: [f64; MAX_CHANNELS],
}

impl ExpanderMessage {
    pub fn from_voltages(voltages: &Voltages) -> Self {
        let mut inputs = [0.0; MAX_CHANNELS];
        inputs[..voltages.channels()].copy_from_slice(voltages.as_slice());
        Self {
            channels: voltages.channels(),
            inputs,
        }
    }

    pub fn get(&self, channel: usize) -> f64 {
        self.inputs.get(channel).copied().unwrap_or(0.0)
    }
}

impl Default for ExpanderMessage {
    /// Full width, all channels at 0V
    fn default() -> Self {
        Self {
            channels: MAX_CHANNELS,
            inputs: [0.0; MAX_CHANNELS],
        }
    }
}

/// Double-buffered message slot on a module's left side.
///
/// The left neighbour writes into the producer buffer during its tick and
/// requests a flip; the host swaps the buffers once every module has run, so
/// the owner always reads the previous tick's message.
#[derive(Debug, Clone, Default)]
pub struct ExpanderLink {
    producer: ExpanderMessage,
    consumer: ExpanderMessage,
    flip_requested: bool,
    left_type: Option<&'static str>,
}

impl ExpanderLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn producer_mut(&mut self) -> &mut ExpanderMessage {
        &mut self.producer
    }

    pub fn consumer(&self) -> &ExpanderMessage {
        &self.consumer
    }

    pub fn request_flip(&mut self) {
        self.flip_requested = true;
    }

    /// Write a message and request the flip in one go
    pub fn publish(&mut self, message: ExpanderMessage) {
        self.producer = message;
        self.flip_requested = true;
    }

    /// Swap buffers if a flip was requested. Returns whether it happened.
    pub fn flip(&mut self) -> bool {
        if !self.flip_requested {
            return false;
        }
        std::mem::swap(&mut self.producer, &mut self.consumer);
        self.flip_requested = false;
        true
    }

    /// Type id of the module currently placed to the left
    pub fn left_type(&self) -> Option<&'static str> {
        self.left_type
    }

    pub fn set_left_type(&mut self, left_type: Option<&'static str>) {
        self.left_type = left_type;
    }
}

/// Polyphonic CV-controlled channel selector.
///
/// # Ports
///
/// Inputs: `cv` (selector), `in` (polyphonic signal).
/// Outputs: `gate`, `trig`, `out`.
///
/// With a polyphonic CV, output channel *i* carries the input channel chosen
/// by CV channel *i* and its gate is high. With a mono CV a single channel is
/// chosen and only that channel of `gate` and `out` is driven. A 1 ms trigger
/// fires on output channel *i* whenever input channel *i* becomes selected.
pub struct Utp {
    range: VoltageRange,
    sample_rate: f64,
    triggers: [BooleanTrigger; MAX_CHANNELS],
    pulses: [PulseGenerator; MAX_CHANNELS],
    signal: Voltages,
    spec: PortSpec,
}

impl Utp {
    pub const TYPE_ID: &'static str = "ut-p";

    pub fn new(sample_rate: f64) -> Self {
        Self {
            range: VoltageRange::default(),
            sample_rate,
            triggers: [BooleanTrigger::default(); MAX_CHANNELS],
            pulses: [PulseGenerator::default(); MAX_CHANNELS],
            signal: Voltages::empty(),
            spec: PortSpec {
                inputs: vec![
                    PortDef::new(0, "cv", SignalKind::CvUnipolar).with_label("Selector"),
                    PortDef::new(1, "in", SignalKind::Audio).with_label("Signal"),
                ],
                outputs: vec![
                    PortDef::new(10, "gate", SignalKind::Gate).with_label("Gate"),
                    PortDef::new(11, "trig", SignalKind::Trigger).with_label("Trigger"),
                    PortDef::new(12, "out", SignalKind::Audio).with_label("Selected signal"),
                ],
            },
        }
    }

    pub fn voltage_range(&self) -> VoltageRange {
        self.range
    }

    pub fn set_voltage_range(&mut self, range: VoltageRange) {
        self.range = range;
    }
}

impl Default for Utp {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for Utp {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let (minimum, maximum) = (self.range.minimum(), self.range.maximum());
        let cv = inputs.poly(0).copied().unwrap_or_default();
        let signal = inputs.poly(1).copied().unwrap_or_default();

        let input_channels = signal.channels();
        let poly_cv = cv.is_polyphonic();
        let output_channels = if poly_cv {
            cv.channels()
        } else {
            input_channels.max(1)
        };

        let mut gate = Voltages::empty();
        gate.set_channels(output_channels);
        let mut selected = gate;
        let mut trigger = gate;

        if input_channels > 0 {
            if poly_cv {
                for i in 0..output_channels {
                    let channel = channel_index(input_channels, cv.get(i), minimum, maximum);
                    gate.set(i, GATE_HIGH);
                    selected.set(i, signal.get(channel));
                    if self.triggers[i].process(channel == i) {
                        self.pulses[i].trigger(TRIGGER_LENGTH);
                    }
                }
            } else {
                let channel = channel_index(input_channels, cv.get(0), minimum, maximum);
                gate.set(channel, GATE_HIGH);
                selected.set(channel, signal.get(channel));
                for i in 0..output_channels {
                    if self.triggers[i].process(channel == i) {
                        self.pulses[i].trigger(TRIGGER_LENGTH);
                    }
                }
            }
        }

        let first_unused = if input_channels > 0 { output_channels } else { 0 };
        for i in first_unused..MAX_CHANNELS {
            self.triggers[i].reset();
            self.pulses[i].reset();
        }

        let dt = 1.0 / self.sample_rate;
        for i in 0..output_channels {
            let high = self.pulses[i].process(dt);
            trigger.set(i, if high { GATE_HIGH } else { 0.0 });
        }

        outputs.set_poly(10, gate);
        outputs.set_poly(11, trigger);
        outputs.set_poly(12, selected);
        self.signal = signal;
    }

    fn reset(&mut self) {
        for trigger in &mut self.triggers {
            trigger.reset();
        }
        for pulse in &mut self.pulses {
            pulse.reset();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn expander_message(&self, right_type: &'static str) -> Option<ExpanderMessage> {
        (right_type == Utox::TYPE_ID).then(|| ExpanderMessage::from_voltages(&self.signal))
    }
}

/// Mono selector expander for [`Utp`].
///
/// # Ports
///
/// Inputs: `cv` (selector).
/// Outputs: `trig`, `out`.
///
/// Reads the signal published by a `Utp` or `Utox` directly to its left. With
/// any other neighbour it sees sixteen channels of 0V.
pub struct Utox {
    range: VoltageRange,
    sample_rate: f64,
    link: ExpanderLink,
    trigger: BooleanTrigger,
    pulse: PulseGenerator,
    selected: usize,
    received: ExpanderMessage,
    spec: PortSpec,
}

impl Utox {
    pub const TYPE_ID: &'static str = "ut-ox";

    pub fn new(sample_rate: f64) -> Self {
        Self {
            range: VoltageRange::default(),
            sample_rate,
            link: ExpanderLink::new(),
            trigger: BooleanTrigger::default(),
            pulse: PulseGenerator::default(),
            selected: 0,
            received: ExpanderMessage::default(),
            spec: PortSpec {
                inputs: vec![PortDef::new(0, "cv", SignalKind::CvUnipolar).with_label("Selector")],
                outputs: vec![
                    PortDef::new(10, "trig", SignalKind::Trigger).with_label("Trigger"),
                    PortDef::new(11, "out", SignalKind::Audio).with_label("Selected signal"),
                ],
            },
        }
    }

    pub fn voltage_range(&self) -> VoltageRange {
        self.range
    }

    pub fn set_voltage_range(&mut self, range: VoltageRange) {
        self.range = range;
    }

    /// Channel picked on the last tick
    pub fn selected(&self) -> usize {
        self.selected
    }

    fn has_valid_source(&self) -> bool {
        matches!(
            self.link.left_type(),
            Some(Utp::TYPE_ID) | Some(Utox::TYPE_ID)
        )
    }
}

impl Default for Utox {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl GraphModule for Utox {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let message = if self.has_valid_source() {
            *self.link.consumer()
        } else {
            ExpanderMessage::default()
        };

        let previous = self.selected;
        self.selected = channel_index(
            message.channels.min(MAX_CHANNELS),
            inputs.get_or(0, 0.0),
            self.range.minimum(),
            self.range.maximum(),
        );
        outputs.set(11, message.get(self.selected));

        if self.trigger.process(self.selected != previous) {
            self.pulse.trigger(TRIGGER_LENGTH);
        }
        let high = self.pulse.process(1.0 / self.sample_rate);
        outputs.set(10, if high { GATE_HIGH } else { 0.0 });

        self.received = message;
    }

    fn reset(&mut self) {
        self.trigger.reset();
        self.pulse.reset();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn left_expander_mut(&mut self) -> Option<&mut ExpanderLink> {
        Some(&mut self.link)
    }

    fn expander_message(&self, right_type: &'static str) -> Option<ExpanderMessage> {
        (right_type == Utox::TYPE_ID).then_some(self.received)
    }
}
