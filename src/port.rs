//! Signal Conventions and Port System
//!
//! This module defines the signal types, port and parameter definitions, the
//! polyphonic voltage container carried on every port, and the type-erased
//! [`GraphModule`] interface the host drives once per sample.

use crate::selector::{ExpanderLink, ExpanderMessage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a port within a module
pub type PortId = u32;

/// Unique identifier for a parameter within a module
pub type ParamId = u32;

/// Maximum number of polyphonic channels a single port can carry
pub const MAX_CHANNELS: usize = 16;

/// Hysteresis (low, high) of gate and trigger inputs, in volts
pub const TRIGGER_THRESHOLDS: (f64, f64) = (0.1, 2.0);

/// Semantic signal classification following hardware modular conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Audio signal, typically ±5V peak
    Audio,

    /// Bipolar control voltage, ±5V
    CvBipolar,

    /// Unipolar control voltage, 0–10V (envelopes)
    CvUnipolar,

    /// Pitch CV following 1V/octave standard
    /// Reference: 0V = C4 (261.63 Hz)
    VoltPerOctave,

    /// Gate signal, 0V (low) or +10V (high) while active
    Gate,

    /// Trigger signal, short pulse at +10V
    Trigger,
}

impl SignalKind {
    /// Hysteresis thresholds (low, high) for edge detection on this kind
    pub fn edge_thresholds(&self) -> Option<(f64, f64)> {
        match self {
            SignalKind::Gate | SignalKind::Trigger => Some(TRIGGER_THRESHOLDS),
            _ => None,
        }
    }
}

/// Definition of a single port (input or output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    /// Unique identifier within the module
    pub id: PortId,

    /// Short name used for patching (e.g., "voct", "trig", "out")
    pub name: String,

    /// Human-readable description shown by hosts
    pub label: String,

    /// Signal type
    pub kind: SignalKind,
}

impl PortDef {
    pub fn new(id: PortId, name: impl Into<String>, kind: SignalKind) -> Self {
        let name = name.into();
        Self {
            id,
            label: name.clone(),
            name,
            kind,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

}

/// Specification of all ports for a module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
}

impl PortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_by_name(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn input_by_id(&self, id: PortId) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.id == id)
    }

    pub fn output_by_id(&self, id: PortId) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.id == id)
    }
}

/// Up to [`MAX_CHANNELS`] voltages travelling on one port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voltages {
    channels: usize,
    values: [f64; MAX_CHANNELS],
}

impl Voltages {
    /// A port carrying no channels
    pub const fn empty() -> Self {
        Self {
            channels: 0,
            values: [0.0; MAX_CHANNELS],
        }
    }

    /// A monophonic voltage
    pub fn mono(value: f64) -> Self {
        let mut v = Self::empty();
        v.channels = 1;
        v.values[0] = value;
        v
    }

    /// Build from a slice; channels beyond [`MAX_CHANNELS`] are dropped
    pub fn from_slice(values: &[f64]) -> Self {
        let mut v = Self::empty();
        v.channels = values.len().min(MAX_CHANNELS);
        v.values[..v.channels].copy_from_slice(&values[..v.channels]);
        v
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_polyphonic(&self) -> bool {
        self.channels > 1
    }

    /// Voltage on a channel. Channels past the active count keep their last value.
    pub fn get(&self, channel: usize) -> f64 {
        self.values.get(channel).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, channel: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(channel) {
            *slot = value;
        }
    }

    pub fn set_channels(&mut self, channels: usize) {
        self.channels = channels.min(MAX_CHANNELS);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.channels]
    }
}

impl Default for Voltages {
    fn default() -> Self {
        Self::empty()
    }
}

/// Runtime port values container
///
/// An input port is considered patched exactly when it has an entry here.
#[derive(Debug, Clone, Default)]
pub struct PortValues {
    pub values: HashMap<PortId, Voltages>,
}

impl PortValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Voltage on the first channel
    pub fn get(&self, id: PortId) -> Option<f64> {
        self.values.get(&id).map(|v| v.get(0))
    }

    pub fn get_or(&self, id: PortId, default: f64) -> f64 {
        self.get(id).unwrap_or(default)
    }

    pub fn set(&mut self, id: PortId, value: f64) {
        self.values.insert(id, Voltages::mono(value));
    }

    pub fn poly(&self, id: PortId) -> Option<&Voltages> {
        self.values.get(&id)
    }

    pub fn set_poly(&mut self, id: PortId, voltages: Voltages) {
        self.values.insert(id, voltages);
    }

    /// Number of channels on a port; 0 when unpatched
    pub fn channels(&self, id: PortId) -> usize {
        self.values.get(&id).map_or(0, Voltages::channels)
    }

    pub fn has(&self, id: PortId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn remove(&mut self, id: PortId) {
        self.values.remove(&id);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Parameter definition for UI binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub id: ParamId,
    pub name: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamDef {
    pub fn new(id: ParamId, name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            id,
            name: name.into(),
            unit: String::new(),
            min,
            max,
            default: default.clamp(min, max),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Knob values of one module, kept inside their declared ranges
#[derive(Debug, Clone)]
pub struct Params {
    defs: Vec<ParamDef>,
    values: Vec<f64>,
}

impl Params {
    pub fn new(defs: Vec<ParamDef>) -> Self {
        let values = defs.iter().map(|d| d.default).collect();
        Self { defs, values }
    }

    pub fn defs(&self) -> &[ParamDef] {
        &self.defs
    }

    fn index(&self, id: ParamId) -> Option<usize> {
        self.defs.iter().position(|d| d.id == id)
    }

    pub fn get(&self, id: ParamId) -> Option<f64> {
        self.index(id).map(|i| self.values[i])
    }

    /// Value of a declared parameter; unknown ids read as 0
    pub fn value(&self, id: ParamId) -> f64 {
        self.get(id).unwrap_or(0.0)
    }

    pub fn set(&mut self, id: ParamId, value: f64) {
        if let Some(i) = self.index(id) {
            self.values[i] = self.defs[i].clamp(value);
        }
    }
}

/// Type-erased module interface driven by the host once per sample
pub trait GraphModule: Send + Sync {
    /// Returns the module's port specification
    fn port_spec(&self) -> &PortSpec;

    /// Process one sample. `inputs` holds an entry for every patched input.
    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues);

    /// Reset internal state
    fn reset(&mut self);

    /// Set sample rate
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Get parameter definitions for UI binding
    fn params(&self) -> &[ParamDef] {
        &[]
    }

    /// Get a parameter value
    fn get_param(&self, _id: ParamId) -> Option<f64> {
        None
    }

    /// Set a parameter value, clamped to its declared range
    fn set_param(&mut self, _id: ParamId, _value: f64) {}

    /// Module type identifier
    fn type_id(&self) -> &'static str {
        "unknown"
    }

    /// Message slot written by the module placed directly to the left
    fn left_expander_mut(&mut self) -> Option<&mut ExpanderLink> {
        None
    }

    /// Message for the right neighbour's left expander after this tick.
    /// `right_type` is the neighbour's [`type_id`](GraphModule::type_id).
    fn expander_message(&self, _right_type: &'static str) -> Option<ExpanderMessage> {
        None
    }
}
