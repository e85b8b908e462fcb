//! Rendering Engine Interface
//!
//! The [`Engine`] trait is the boundary to whatever actually renders audio.
//! It exposes stage creation, series connection, automated parameters and
//! enough readback to export a live graph. [`crate::graph::StageGraph`] is the
//! in-memory implementation.

use crate::graph::GraphError;
use crate::param::AudioParam;
use core::fmt::Debug;
use core::hash::Hash;
use serde::{Deserialize, Serialize};

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Biquad filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Notch,
    Allpass,
}

/// Wave-shaper oversampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Oversample {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
}

/// Automatable parameters a stage may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    Frequency,
    Detune,
    Q,
    Gain,
    DelayTime,
}

impl ParamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Frequency => "frequency",
            ParamName::Detune => "detune",
            ParamName::Q => "Q",
            ParamName::Gain => "gain",
            ParamName::DelayTime => "delayTime",
        }
    }
}

/// Non-automatable settings of a live stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageSettings<'a> {
    Oscillator { waveform: Waveform },
    Filter { filter_type: FilterType },
    Shaper { curve: &'a [f32], oversample: Oversample },
    Delay { max_delay_time: f64 },
    Gain,
    Destination,
}

/// Stage-creation and routing primitives of a rendering engine
pub trait Engine {
    /// Handle to a live stage
    type Node: Copy + Eq + Hash + Debug;

    /// Current engine time in seconds
    fn current_time(&self) -> f64;

    /// The final output every graph ends in
    fn destination(&self) -> Self::Node;

    /// Create a running oscillator
    fn create_oscillator(&mut self, waveform: Waveform) -> Self::Node;

    fn create_filter(&mut self, filter_type: FilterType) -> Self::Node;

    fn create_shaper(&mut self, curve: Vec<f32>, oversample: Oversample) -> Self::Node;

    fn create_delay(&mut self, max_delay_time: f64) -> Self::Node;

    fn create_gain(&mut self) -> Self::Node;

    /// Route the output of `from` into `to`
    fn connect(&mut self, from: Self::Node, to: Self::Node) -> Result<(), GraphError>;

    /// Remove every outgoing connection of `node`
    fn disconnect(&mut self, node: Self::Node);

    /// Discard a stage together with its pending automation
    fn release(&mut self, node: Self::Node);

    fn settings(&self, node: Self::Node) -> Option<StageSettings<'_>>;

    fn param(&self, node: Self::Node, name: ParamName) -> Option<&AudioParam>;

    fn param_mut(&mut self, node: Self::Node, name: ParamName) -> Option<&mut AudioParam>;
}
