//! Synth Options
//!
//! Everything needed to construct a [`crate::Synth`], serializable as
//! camelCase JSON:
//!
//! ```json
//! {
//!   "inputName": "Launchkey",
//!   "attack": 0.05,
//!   "release": 0.3,
//!   "portamento": 0.1,
//!   "bindToInputs": true,
//!   "initialFrequency": 110.0,
//!   "graph": { "gain": 1.0, "pipelines": [[{ "nodeType": "oscillator", "type": "sine" }]] }
//! }
//! ```
//!
//! Missing fields take their defaults.

use crate::device::InputFilter;
use crate::error::ConfigError;
use crate::pipeline::GraphConfig;
use crate::voice::{VoiceTiming, DEFAULT_FREQUENCY, DEFAULT_TIMING};
use serde::{Deserialize, Serialize};

/// Construction options for a synth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthOptions {
    /// Bind inputs with exactly this name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,

    /// Bind the input with exactly this id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_id: Option<String>,

    pub attack: f64,
    pub release: f64,
    pub portamento: f64,

    /// Bind matching inputs during discovery and hot-plug
    pub bind_to_inputs: bool,

    /// Audible frequency before the first note
    pub initial_frequency: f64,

    pub graph: GraphConfig,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            input_name: None,
            input_id: None,
            attack: DEFAULT_TIMING,
            release: DEFAULT_TIMING,
            portamento: DEFAULT_TIMING,
            bind_to_inputs: true,
            initial_frequency: DEFAULT_FREQUENCY,
            graph: GraphConfig::default(),
        }
    }
}

impl SynthOptions {
    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    pub fn with_input_id(mut self, id: impl Into<String>) -> Self {
        self.input_id = Some(id.into());
        self
    }

    pub fn with_attack(mut self, attack: f64) -> Self {
        self.attack = attack;
        self
    }

    pub fn with_release(mut self, release: f64) -> Self {
        self.release = release;
        self
    }

    pub fn with_portamento(mut self, portamento: f64) -> Self {
        self.portamento = portamento;
        self
    }

    pub fn with_bind_to_inputs(mut self, bind: bool) -> Self {
        self.bind_to_inputs = bind;
        self
    }

    pub fn with_initial_frequency(mut self, frequency: f64) -> Self {
        self.initial_frequency = frequency;
        self
    }

    pub fn with_graph(mut self, graph: GraphConfig) -> Self {
        self.graph = graph;
        self
    }

    pub fn input_filter(&self) -> InputFilter {
        InputFilter {
            id: self.input_id.clone(),
            name: self.input_name.clone(),
        }
    }

    pub fn timing(&self) -> VoiceTiming {
        VoiceTiming {
            attack: self.attack,
            release: self.release,
            portamento: self.portamento,
        }
    }

    /// Check timings and the initial frequency
    ///
    /// The graph is checked separately when it is applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timings = [
            ("attack", self.attack),
            ("release", self.release),
            ("portamento", self.portamento),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidOption { name, value });
            }
        }

        if !self.initial_frequency.is_finite() || self.initial_frequency <= 0.0 {
            return Err(ConfigError::InvalidOption {
                name: "initialFrequency",
                value: self.initial_frequency,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
