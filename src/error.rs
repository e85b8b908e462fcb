//! Error types
//!
//! Every fallible operation in the crate returns [`SynthError`] or one of the
//! narrower enums it aggregates.

use thiserror::Error;

use crate::device::InputFilter;
use crate::graph::GraphError;
use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = core::result::Result<T, SynthError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    DeviceBinding(#[from] DeviceBindingError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Malformed or unusable graph configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pipeline {index} has no stages")]
    EmptyPipeline { index: usize },

    #[error("unknown curve \"{name}\" in pipeline {pipeline}, stage {stage}")]
    UnknownCurve {
        name: String,
        pipeline: usize,
        stage: usize,
    },

    #[error("invalid value {value} for \"{param}\" in pipeline {pipeline}, stage {stage}")]
    InvalidParameter {
        param: &'static str,
        value: f64,
        pipeline: usize,
        stage: usize,
    },

    #[error("oscillator in pipeline {pipeline}, stage {stage} has no input to feed it")]
    MisplacedOscillator { pipeline: usize, stage: usize },

    #[error("invalid gain ceiling {0}")]
    InvalidGain(f64),

    #[error("invalid value {value} for option \"{name}\"")]
    InvalidOption { name: &'static str, value: f64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Device discovery or binding failure
///
/// Non-fatal: the synth stays usable after reporting one of these.
#[derive(Debug, Error)]
pub enum DeviceBindingError {
    #[error("Device access rejected: {0}")]
    AccessRejected(String),

    #[error("{}", no_matching_inputs_message(.filter, .available))]
    NoMatchingInputs {
        filter: InputFilter,
        /// `(name, id)` of every available input
        available: Vec<(String, String)>,
    },
}

fn no_matching_inputs_message(filter: &InputFilter, available: &[(String, String)]) -> String {
    let mut lines = Vec::with_capacity(available.len() + 4);

    if let Some(id) = &filter.id {
        lines.push(format!("No input matching ID \"{}\".", id));
    }
    if let Some(name) = &filter.name {
        lines.push(format!("No input matching name \"{}\".", name));
    }

    lines.push("Available inputs:".to_string());
    for (name, id) in available {
        lines.push(format!("{} ({})", name, id));
    }
    lines.push(
        "No usable MIDI inputs found. Try removing/fixing inputName/inputID?".to_string(),
    );

    lines.join("\n")
}
