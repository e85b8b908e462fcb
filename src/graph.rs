//! In-Memory Stage Graph
//!
//! [`StageGraph`] implements [`Engine`] without rendering any audio. It keeps
//! the stages, their connections and every parameter's automation timeline,
//! driven by a clock the caller advances. Parameter values can be evaluated
//! at any time, which makes it suitable for offline inspection and tests.

use crate::engine::{Engine, FilterType, Oversample, ParamName, StageSettings, Waveform};
use crate::param::AudioParam;
use slotmap::{DefaultKey, SlotMap};

/// Unique identifier for a stage in the graph
pub type NodeId = DefaultKey;

/// A directed connection between two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

/// Error types for graph operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    InvalidNode,
    InvalidConnection { reason: &'static str },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::InvalidNode => write!(f, "Invalid node"),
            GraphError::InvalidConnection { reason } => {
                write!(f, "Invalid connection: {}", reason)
            }
        }
    }
}

impl std::error::Error for GraphError {}

#[derive(Debug, Clone)]
enum NodeKind {
    Oscillator { waveform: Waveform },
    Filter { filter_type: FilterType },
    Shaper { curve: Vec<f32>, oversample: Oversample },
    Delay { max_delay_time: f64 },
    Gain,
    Destination,
}

impl NodeKind {
    fn accepts_input(&self) -> bool {
        !matches!(self, NodeKind::Oscillator { .. })
    }

    fn has_output(&self) -> bool {
        !matches!(self, NodeKind::Destination)
    }
}

/// Internal node representation
#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    params: Vec<(ParamName, AudioParam)>,
}

impl Node {
    fn new(kind: NodeKind, params: &[(ParamName, f64)]) -> Self {
        Self {
            kind,
            params: params
                .iter()
                .map(|&(name, default)| (name, AudioParam::new(default)))
                .collect(),
        }
    }
}

/// Stage graph with a manually advanced clock
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: SlotMap<NodeId, Node>,
    connections: Vec<Connection>,
    destination: NodeId,
    time: f64,
}

impl StageGraph {
    /// Create a graph holding only the destination
    pub fn new() -> Self {
        let mut nodes = SlotMap::new();
        let destination = nodes.insert(Node::new(NodeKind::Destination, &[]));
        Self {
            nodes,
            connections: Vec::new(),
            destination,
            time: 0.0,
        }
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds;
    }

    /// Number of live stages, including the destination
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.contains(&Connection { from, to })
    }

    /// Stages feeding into `node`
    pub fn inputs(&self, node: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|c| c.to == node)
            .map(|c| c.from)
            .collect()
    }

    /// Stages fed by `node`
    pub fn outputs(&self, node: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|c| c.from == node)
            .map(|c| c.to)
            .collect()
    }

    /// Computed value of a parameter at the current time
    pub fn param_value(&self, node: NodeId, name: ParamName) -> Option<f64> {
        self.param(node, name).map(|p| p.value_at(self.time))
    }

    fn add(&mut self, kind: NodeKind, params: &[(ParamName, f64)]) -> NodeId {
        self.nodes.insert(Node::new(kind, params))
    }
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for StageGraph {
    type Node = NodeId;

    fn current_time(&self) -> f64 {
        self.time
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(&mut self, waveform: Waveform) -> NodeId {
        self.add(
            NodeKind::Oscillator { waveform },
            &[(ParamName::Frequency, 440.0), (ParamName::Detune, 0.0)],
        )
    }

    fn create_filter(&mut self, filter_type: FilterType) -> NodeId {
        self.add(
            NodeKind::Filter { filter_type },
            &[
                (ParamName::Frequency, 350.0),
                (ParamName::Detune, 0.0),
                (ParamName::Q, 1.0),
                (ParamName::Gain, 0.0),
            ],
        )
    }

    fn create_shaper(&mut self, curve: Vec<f32>, oversample: Oversample) -> NodeId {
        self.add(NodeKind::Shaper { curve, oversample }, &[])
    }

    fn create_delay(&mut self, max_delay_time: f64) -> NodeId {
        self.add(
            NodeKind::Delay { max_delay_time },
            &[(ParamName::DelayTime, 0.0)],
        )
    }

    fn create_gain(&mut self) -> NodeId {
        self.add(NodeKind::Gain, &[(ParamName::Gain, 1.0)])
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let source = self.nodes.get(from).ok_or(GraphError::InvalidNode)?;
        let sink = self.nodes.get(to).ok_or(GraphError::InvalidNode)?;

        if !source.kind.has_output() {
            return Err(GraphError::InvalidConnection {
                reason: "source has no output",
            });
        }
        if !sink.kind.accepts_input() {
            return Err(GraphError::InvalidConnection {
                reason: "sink has no input",
            });
        }

        let connection = Connection { from, to };
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        self.connections.retain(|c| c.from != node);
    }

    fn release(&mut self, node: NodeId) {
        if node == self.destination {
            return;
        }
        if self.nodes.remove(node).is_some() {
            self.connections.retain(|c| c.from != node && c.to != node);
        }
    }

    fn settings(&self, node: NodeId) -> Option<StageSettings<'_>> {
        let node = self.nodes.get(node)?;
        Some(match &node.kind {
            NodeKind::Oscillator { waveform } => StageSettings::Oscillator {
                waveform: *waveform,
            },
            NodeKind::Filter { filter_type } => StageSettings::Filter {
                filter_type: *filter_type,
            },
            NodeKind::Shaper { curve, oversample } => StageSettings::Shaper {
                curve,
                oversample: *oversample,
            },
            NodeKind::Delay { max_delay_time } => StageSettings::Delay {
                max_delay_time: *max_delay_time,
            },
            NodeKind::Gain => StageSettings::Gain,
            NodeKind::Destination => StageSettings::Destination,
        })
    }

    fn param(&self, node: NodeId, name: ParamName) -> Option<&AudioParam> {
        self.nodes
            .get(node)?
            .params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p)
    }

    fn param_mut(&mut self, node: NodeId, name: ParamName) -> Option<&mut AudioParam> {
        self.nodes
            .get_mut(node)?
            .params
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_graph_has_destination() {
        let graph = StageGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(
            graph.settings(graph.destination()),
            Some(StageSettings::Destination)
        );
    }

    #[test]
    fn test_connect_chain() {
        let mut graph = StageGraph::new();
        let osc = graph.create_oscillator(Waveform::Sawtooth);
        let filter = graph.create_filter(FilterType::Lowpass);
        let dest = graph.destination();

        graph.connect(osc, filter).unwrap();
        graph.connect(filter, dest).unwrap();
        graph.connect(filter, dest).unwrap();

        assert_eq!(graph.connections().len(), 2);
        assert!(graph.is_connected(osc, filter));
        assert_eq!(graph.inputs(dest), vec![filter]);
        assert_eq!(graph.outputs(osc), vec![filter]);
    }

    #[test]
    fn test_invalid_connections() {
        let mut graph = StageGraph::new();
        let a = graph.create_oscillator(Waveform::Sine);
        let b = graph.create_oscillator(Waveform::Sine);
        let dest = graph.destination();

        assert!(matches!(
            graph.connect(a, b),
            Err(GraphError::InvalidConnection { .. })
        ));
        assert!(matches!(
            graph.connect(dest, a),
            Err(GraphError::InvalidConnection { .. })
        ));

        graph.release(b);
        assert_eq!(graph.connect(a, b), Err(GraphError::InvalidNode));
    }

    #[test]
    fn test_disconnect_removes_outgoing_only() {
        let mut graph = StageGraph::new();
        let osc = graph.create_oscillator(Waveform::Sine);
        let gain = graph.create_gain();
        let dest = graph.destination();
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, dest).unwrap();

        graph.disconnect(gain);
        assert!(graph.is_connected(osc, gain));
        assert!(!graph.is_connected(gain, dest));
    }

    #[test]
    fn test_release_drops_node_and_connections() {
        let mut graph = StageGraph::new();
        let osc = graph.create_oscillator(Waveform::Sine);
        let dest = graph.destination();
        graph.connect(osc, dest).unwrap();

        graph.release(osc);
        assert!(!graph.contains(osc));
        assert!(graph.connections().is_empty());

        graph.release(dest);
        assert!(graph.contains(dest));
    }

    #[test]
    fn test_default_params() {
        let mut graph = StageGraph::new();
        let filter = graph.create_filter(FilterType::Peaking);
        let delay = graph.create_delay(2.0);

        assert_eq!(graph.param_value(filter, ParamName::Frequency), Some(350.0));
        assert_eq!(graph.param_value(filter, ParamName::Q), Some(1.0));
        assert_eq!(graph.param_value(delay, ParamName::DelayTime), Some(0.0));
        assert_eq!(graph.param_value(delay, ParamName::Q), None);
        assert_eq!(
            graph.settings(delay),
            Some(StageSettings::Delay { max_delay_time: 2.0 })
        );
    }

    #[test]
    fn test_param_automation_follows_clock() {
        let mut graph = StageGraph::new();
        let gain = graph.create_gain();
        let param = graph.param_mut(gain, ParamName::Gain).unwrap();
        param.set_value(0.0);
        param.set_target_at_time(1.0, 0.0, 0.1);

        assert_eq!(graph.param_value(gain, ParamName::Gain), Some(0.0));
        graph.advance(2.0);
        assert!(graph.param_value(gain, ParamName::Gain).unwrap() > 0.999);
    }
}
