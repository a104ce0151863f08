//! # Blipfx: Procedural Sound Effects
//!
//! `blipfx` renders the short, crunchy sound effects of early games: blips,
//! coin pickups and hits. Each sound is a modular voice driven one sample at a
//! time: a supersampled oscillator shaped by a hold/release envelope and
//! reduced to 8-bit resolution. Voices take pitch and time CVs and fire on
//! trigger edges.
//!
//! ## Layers
//!
//! - **Primitives** - bit quantization, edge detectors, timed triggers,
//!   the envelope and the oscillators
//! - **Modules** - [`Blip`](modules::Blip), [`Coin`](modules::Coin),
//!   [`Hit`](modules::Hit), the delayed trigger [`DTrig`](modules::DTrig) and
//!   the [`Utp`](selector::Utp)/[`Utox`](selector::Utox) selectors, all
//!   speaking the [`GraphModule`](port::GraphModule) per-sample contract
//! - **Rack** - a host that lays modules out in a row, runs cables between
//!   them and carries expander messages between neighbours
//!
//! Preset parameter sets in [`presets`] roll random sounds and persist them as
//! JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blipfx::prelude::*;
//!
//! let mut rack = Rack::new(44100.0);
//!
//! let clock = rack.add("clock", DTrig::new(44100.0));
//! let coin = rack.add("coin", Coin::new(44100.0));
//! rack.connect(clock.out("trig"), coin.in_("trig")).unwrap();
//!
//! rack.tick();
//! let sample = rack.output(coin.out("out")).unwrap_or(0.0);
//! ```

pub mod envelope;
pub mod modules;
pub mod oscillator;
pub mod port;
pub mod presets;
pub mod quantize;
pub mod rack;
pub mod rng;
pub mod selector;
pub mod trigger;

/// Prelude module for convenient imports
pub mod prelude {
    // Port system
    pub use crate::port::{
        GraphModule, ParamDef, ParamId, Params, PortDef, PortId, PortSpec, PortValues,
        SignalKind, Voltages, MAX_CHANNELS, TRIGGER_THRESHOLDS,
    };

    // Rack
    pub use crate::rack::{Cable, CableId, ModuleHandle, ModuleId, PortRef, Rack, RackError};

    // Modules
    pub use crate::modules::{period_seconds, Blip, Coin, DTrig, Hit, FREQ_C4};
    pub use crate::selector::{
        channel_index, ExpanderLink, ExpanderMessage, Utox, Utp, VoltageRange,
    };

    // Presets
    pub use crate::presets::{
        BlipParams, CoinParams, HitParams, PresetError, SoundKind, SoundParams,
    };

    // Primitives
    pub use crate::envelope::{EnvelopeGenerator, EnvelopeStage};
    pub use crate::oscillator::{blend_three, Oscillator, OscillatorKind, MAX_SUPERSAMPLING};
    pub use crate::quantize::{quantize, quantize_clamped};
    pub use crate::rng::Rng;
    pub use crate::trigger::{BooleanTrigger, PulseGenerator, SchmittTrigger, TimedTrigger};
}
