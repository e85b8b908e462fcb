//! # Monosynth: Last-Note-Priority Synth Controller
//!
//! `monosynth` turns note messages from input devices into a monophonic voice
//! with glide and an attack/release envelope. The sound itself comes from a
//! configurable set of parallel stage pipelines (oscillator, filter, shaper,
//! delay) that all feed one envelope gain.
//!
//! ## Architecture
//!
//! - **Registry** - Ordered key/value store behind the held-note stack and the device sets
//! - **Voice Controller** - Last-note priority, producing frequency/gain ramps
//! - **Device Binding** - Input discovery, filtering and hot-plug through a [`Transport`]
//! - **Pipeline Assembler** - Builds, tears down and exports stage graphs on an [`Engine`]
//! - **Synth** - Event ingestion tying the above together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use monosynth::prelude::*;
//!
//! let transport = VirtualTransport::new().with_input("kbd", "Keyboard");
//! let options = SynthOptions::default().with_graph(
//!     GraphConfig::silent()
//!         .with_gain(0.8)
//!         .with_pipeline(vec![
//!             StageDescriptor::oscillator(Waveform::Sawtooth),
//!             StageDescriptor::filter(FilterType::Lowpass, 1200.0),
//!         ]),
//! );
//!
//! let mut synth = Synth::new(StageGraph::new(), transport.clone(), options).unwrap();
//! synth.connect_inputs().unwrap();
//!
//! // Note-on for A4 arrives from the keyboard
//! transport.send("kbd", &[0x90, 69, 100]);
//! synth.process_events();
//! ```

pub mod config;
pub mod control;
pub mod curves;
pub mod device;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod midi;
pub mod param;
pub mod pipeline;
pub mod registry;
pub mod synth;
pub mod transport;
pub mod voice;

/// Prelude module for convenient imports
pub mod prelude {
    // Core containers
    pub use crate::registry::{Registry, RegistryEntry, RegistryError};

    // Curves and tuning
    pub use crate::curves::{distort, generate_curve, CurveParams, CurveTable};
    pub use crate::midi::{frequency_from_note_number, NoteMessage};

    // Voice control
    pub use crate::control::{AtomicF64, ControlTarget, ControlTargets};
    pub use crate::voice::{ActiveVoice, Ramp, VoiceController, VoiceParams, VoiceTiming};

    // Devices
    pub use crate::device::{
        DeviceBindingManager, DeviceInfo, DeviceRecord, DeviceSnapshot, InputFilter, Transport,
    };
    pub use crate::event::{event_channel, Discovery, EventSender, SynthEvent};
    pub use crate::transport::VirtualTransport;

    // Engine and pipelines
    pub use crate::engine::{Engine, FilterType, Oversample, ParamName, Waveform};
    pub use crate::graph::{GraphError, NodeId, StageGraph};
    pub use crate::param::AudioParam;
    pub use crate::pipeline::{
        CurveSpec, GraphConfig, NamedCurve, PipelineAssembler, StageDescriptor,
    };

    // Controller
    pub use crate::config::SynthOptions;
    pub use crate::error::{ConfigError, DeviceBindingError, SynthError};
    pub use crate::synth::Synth;
}

pub use error::{Result, SynthError};
pub use prelude::*;
