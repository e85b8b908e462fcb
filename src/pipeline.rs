//! Pipeline Assembly
//!
//! A [`GraphConfig`] describes one or more pipelines, each an ordered list of
//! [`StageDescriptor`]s. The [`PipelineAssembler`] materializes them on an
//! [`Engine`]: every pipeline becomes a series chain whose last stage feeds a
//! shared envelope (summing gain) stage, which in turn feeds the destination.
//! The live graph can be exported back into the same declarative shape.

use crate::curves::{CurveParams, CurveTable};
use crate::engine::{Engine, FilterType, Oversample, ParamName, StageSettings, Waveform};
use crate::error::{ConfigError, Result};
use crate::graph::GraphError;
use serde::{Deserialize, Serialize};

/// Oscillator stage parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscillatorStage {
    #[serde(rename = "type", default)]
    pub waveform: Waveform,
    #[serde(default)]
    pub detune: f64,
}

/// Biquad filter stage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStage {
    #[serde(rename = "type", default)]
    pub filter_type: FilterType,
    #[serde(default = "default_filter_frequency")]
    pub frequency: f64,
    #[serde(default)]
    pub detune: f64,
    #[serde(rename = "Q", alias = "q", default = "default_q")]
    pub q: f64,
    #[serde(default)]
    pub gain: f64,
}

fn default_filter_frequency() -> f64 {
    350.0
}

fn default_q() -> f64 {
    1.0
}

impl Default for FilterStage {
    fn default() -> Self {
        Self {
            filter_type: FilterType::default(),
            frequency: default_filter_frequency(),
            detune: 0.0,
            q: default_q(),
            gain: 0.0,
        }
    }
}

/// A curve generated by name when the stage is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCurve {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(flatten)]
    pub params: CurveParams,
}

impl NamedCurve {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: None,
            params: CurveParams::new(),
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// Shaper transfer curve: raw data or a named generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveSpec {
    Samples(Vec<f32>),
    Named(NamedCurve),
}

/// Wave-shaper stage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaperStage {
    pub curve: CurveSpec,
    #[serde(default)]
    pub oversample: Oversample,
}

/// Delay stage parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayStage {
    #[serde(default)]
    pub delay_time: f64,
}

/// One processing stage of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "lowercase")]
pub enum StageDescriptor {
    Oscillator(OscillatorStage),
    Filter(FilterStage),
    Shaper(ShaperStage),
    Delay(DelayStage),
}

impl StageDescriptor {
    pub fn oscillator(waveform: Waveform) -> Self {
        StageDescriptor::Oscillator(OscillatorStage {
            waveform,
            detune: 0.0,
        })
    }

    pub fn filter(filter_type: FilterType, frequency: f64) -> Self {
        StageDescriptor::Filter(FilterStage {
            filter_type,
            frequency,
            ..FilterStage::default()
        })
    }

    pub fn shaper(curve: CurveSpec) -> Self {
        StageDescriptor::Shaper(ShaperStage {
            curve,
            oversample: Oversample::None,
        })
    }

    pub fn delay(delay_time: f64) -> Self {
        StageDescriptor::Delay(DelayStage { delay_time })
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            StageDescriptor::Oscillator(_) => "oscillator",
            StageDescriptor::Filter(_) => "filter",
            StageDescriptor::Shaper(_) => "shaper",
            StageDescriptor::Delay(_) => "delay",
        }
    }

    fn validate(
        &self,
        curves: &CurveTable,
        pipeline: usize,
        stage: usize,
    ) -> core::result::Result<(), ConfigError> {
        let invalid = |param: &'static str, value: f64| ConfigError::InvalidParameter {
            param,
            value,
            pipeline,
            stage,
        };

        match self {
            StageDescriptor::Oscillator(osc) => {
                if stage > 0 {
                    return Err(ConfigError::MisplacedOscillator { pipeline, stage });
                }
                if !osc.detune.is_finite() {
                    return Err(invalid("detune", osc.detune));
                }
            }
            StageDescriptor::Filter(filter) => {
                for (param, value) in [
                    ("frequency", filter.frequency),
                    ("detune", filter.detune),
                    ("Q", filter.q),
                    ("gain", filter.gain),
                ] {
                    if !value.is_finite() {
                        return Err(invalid(param, value));
                    }
                }
                if filter.frequency < 0.0 {
                    return Err(invalid("frequency", filter.frequency));
                }
            }
            StageDescriptor::Shaper(shaper) => match &shaper.curve {
                CurveSpec::Samples(data) => {
                    if data.len() < 2 {
                        return Err(invalid("curve", data.len() as f64));
                    }
                }
                CurveSpec::Named(named) => {
                    if !curves.contains(&named.name) {
                        return Err(ConfigError::UnknownCurve {
                            name: named.name.clone(),
                            pipeline,
                            stage,
                        });
                    }
                    if let Some(samples) = named.samples {
                        if samples < 2 {
                            return Err(invalid("samples", samples as f64));
                        }
                    }
                }
            },
            StageDescriptor::Delay(delay) => {
                if !delay.delay_time.is_finite() || delay.delay_time < 0.0 {
                    return Err(invalid("delayTime", delay.delay_time));
                }
            }
        }
        Ok(())
    }
}

/// A series chain of stages
pub type Pipeline = Vec<StageDescriptor>;

/// Declarative description of the whole processing graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    /// Gain ceiling the envelope ramps toward on note-on
    #[serde(default = "default_gain")]
    pub gain: f64,

    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

fn default_gain() -> f64 {
    1.0
}

impl GraphConfig {
    /// A config with no pipelines (silent)
    pub fn silent() -> Self {
        Self {
            gain: default_gain(),
            pipelines: vec![],
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Check every pipeline without touching any graph
    pub fn validate(&self, curves: &CurveTable) -> core::result::Result<(), ConfigError> {
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ConfigError::InvalidGain(self.gain));
        }

        for (p, pipeline) in self.pipelines.iter().enumerate() {
            if pipeline.is_empty() {
                return Err(ConfigError::EmptyPipeline { index: p });
            }
            for (s, stage) in pipeline.iter().enumerate() {
                stage.validate(curves, p, s)?;
            }
        }
        Ok(())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> core::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> core::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for GraphConfig {
    /// A single sine oscillator at full gain
    fn default() -> Self {
        Self::silent().with_pipeline(vec![StageDescriptor::oscillator(Waveform::Sine)])
    }
}

/// Builds, tears down and exports pipelines on an engine
pub struct PipelineAssembler<E: Engine> {
    engine: E,
    curves: CurveTable,
    envelope: E::Node,
    pipelines: Vec<Vec<E::Node>>,
    gain: f64,
}

impl<E: Engine> PipelineAssembler<E> {
    /// Create an assembler with the built-in curves
    ///
    /// The envelope starts muted and is connected to the destination.
    pub fn new(engine: E) -> core::result::Result<Self, GraphError> {
        Self::with_curves(engine, CurveTable::new())
    }

    pub fn with_curves(
        mut engine: E,
        curves: CurveTable,
    ) -> core::result::Result<Self, GraphError> {
        let envelope = engine.create_gain();
        if let Some(gain) = engine.param_mut(envelope, ParamName::Gain) {
            gain.set_value(0.0);
        }
        let destination = engine.destination();
        engine.connect(envelope, destination)?;

        Ok(Self {
            engine,
            curves,
            envelope,
            pipelines: Vec::new(),
            gain: default_gain(),
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn curves(&self) -> &CurveTable {
        &self.curves
    }

    pub fn curves_mut(&mut self) -> &mut CurveTable {
        &mut self.curves
    }

    /// The shared summing stage every pipeline ends in
    pub fn envelope(&self) -> E::Node {
        self.envelope
    }

    /// Live stages, per pipeline, in construction order
    pub fn pipelines(&self) -> &[Vec<E::Node>] {
        &self.pipelines
    }

    /// Gain ceiling from the last applied config
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Every live oscillator stage
    pub fn oscillators(&self) -> Vec<E::Node> {
        self.pipelines
            .iter()
            .flatten()
            .copied()
            .filter(|&node| {
                matches!(
                    self.engine.settings(node),
                    Some(StageSettings::Oscillator { .. })
                )
            })
            .collect()
    }

    /// Replace the live graph with `config`
    ///
    /// The config is validated and fully built before the current graph is
    /// torn down; on error the current graph is left untouched.
    pub fn apply_config(&mut self, config: &GraphConfig) -> Result<()> {
        config.validate(&self.curves)?;

        let mut built: Vec<Vec<E::Node>> = Vec::with_capacity(config.pipelines.len());
        for (index, pipeline) in config.pipelines.iter().enumerate() {
            match self.build_pipeline(index, pipeline) {
                Ok(nodes) => built.push(nodes),
                Err(err) => {
                    self.discard(built.into_iter().flatten());
                    return Err(err);
                }
            }
        }

        self.teardown();
        self.pipelines = built;

        self.gain = config.gain;
        log::info!(
            "applied graph config: {} pipeline(s), {} stage(s), gain {}",
            self.pipelines.len(),
            self.pipelines.iter().map(Vec::len).sum::<usize>(),
            self.gain
        );
        Ok(())
    }

    /// Disconnect and discard every pipeline stage
    ///
    /// Pending automation on those stages goes with them.
    pub fn teardown(&mut self) {
        let nodes: Vec<E::Node> = self.pipelines.drain(..).flatten().collect();
        self.discard(nodes);
    }

    /// Build one series chain ending in the envelope
    ///
    /// Stages built before a failure are released again.
    fn build_pipeline(
        &mut self,
        index: usize,
        pipeline: &[StageDescriptor],
    ) -> Result<Vec<E::Node>> {
        let mut nodes = Vec::with_capacity(pipeline.len());
        for (stage, descriptor) in pipeline.iter().enumerate() {
            if let Err(err) = self.build_and_link(descriptor, index, stage, &mut nodes) {
                self.discard(nodes);
                return Err(err);
            }
        }
        if let Some(&last) = nodes.last() {
            if let Err(err) = self.engine.connect(last, self.envelope) {
                self.discard(nodes);
                return Err(err.into());
            }
        }
        Ok(nodes)
    }

    fn build_and_link(
        &mut self,
        descriptor: &StageDescriptor,
        pipeline: usize,
        stage: usize,
        nodes: &mut Vec<E::Node>,
    ) -> Result<()> {
        let node = self.build_stage(descriptor, pipeline, stage)?;
        nodes.push(node);
        if nodes.len() > 1 {
            let previous = nodes[nodes.len() - 2];
            self.engine.connect(previous, node)?;
        }
        Ok(())
    }

    fn discard(&mut self, nodes: impl IntoIterator<Item = E::Node>) {
        for node in nodes {
            self.engine.disconnect(node);
            self.engine.release(node);
        }
    }

    /// Describe the live graph
    ///
    /// Named shaper curves come back as their generated sample data.
    pub fn export_config(&self) -> GraphConfig {
        GraphConfig {
            gain: self.gain,
            pipelines: self
                .pipelines
                .iter()
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter_map(|&node| self.export_stage(node))
                        .collect()
                })
                .collect(),
        }
    }

    fn export_stage(&self, node: E::Node) -> Option<StageDescriptor> {
        let param = |name| self.engine.param(node, name).map(|p| p.value());

        match self.engine.settings(node)? {
            StageSettings::Oscillator { waveform } => {
                Some(StageDescriptor::Oscillator(OscillatorStage {
                    waveform,
                    detune: param(ParamName::Detune)?,
                }))
            }
            StageSettings::Filter { filter_type } => Some(StageDescriptor::Filter(FilterStage {
                filter_type,
                frequency: param(ParamName::Frequency)?,
                detune: param(ParamName::Detune)?,
                q: param(ParamName::Q)?,
                gain: param(ParamName::Gain)?,
            })),
            StageSettings::Shaper { curve, oversample } => {
                Some(StageDescriptor::Shaper(ShaperStage {
                    curve: CurveSpec::Samples(curve.to_vec()),
                    oversample,
                }))
            }
            StageSettings::Delay { .. } => Some(StageDescriptor::Delay(DelayStage {
                delay_time: param(ParamName::DelayTime)?,
            })),
            StageSettings::Gain | StageSettings::Destination => None,
        }
    }

    fn build_stage(
        &mut self,
        descriptor: &StageDescriptor,
        pipeline: usize,
        stage: usize,
    ) -> Result<E::Node> {
        let node = match descriptor {
            StageDescriptor::Oscillator(osc) => {
                let node = self.engine.create_oscillator(osc.waveform);
                self.set_param(node, ParamName::Detune, osc.detune);
                node
            }
            StageDescriptor::Filter(filter) => {
                let node = self.engine.create_filter(filter.filter_type);
                self.set_param(node, ParamName::Frequency, filter.frequency);
                self.set_param(node, ParamName::Detune, filter.detune);
                self.set_param(node, ParamName::Q, filter.q);
                self.set_param(node, ParamName::Gain, filter.gain);
                node
            }
            StageDescriptor::Shaper(shaper) => {
                let curve = match &shaper.curve {
                    CurveSpec::Samples(data) => data.clone(),
                    CurveSpec::Named(named) => self
                        .curves
                        .generate(&named.name, &named.params, named.samples)
                        .ok_or_else(|| ConfigError::UnknownCurve {
                            name: named.name.clone(),
                            pipeline,
                            stage,
                        })?,
                };
                self.engine.create_shaper(curve, shaper.oversample)
            }
            StageDescriptor::Delay(delay) => {
                let node = self.engine.create_delay(delay.delay_time.max(1.0));
                self.set_param(node, ParamName::DelayTime, delay.delay_time);
                node
            }
        };
        Ok(node)
    }

    fn set_param(&mut self, node: E::Node, name: ParamName, value: f64) {
        if let Some(param) = self.engine.param_mut(node, name) {
            param.set_value(value);
        }
    }
}
