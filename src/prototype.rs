// src/prototype.rs
//
// Static, serializable description of a node graph.
//
// A Prototype is produced offline (editor, generator) and is never mutated
// by the runtime. `compile::create_instance` turns it into a running
// `GraphInstance`.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::identifier::{GRAPH_NODE_ID, Identifier, NodeId};
use crate::value::{MalformedValue, NestingGuard, Value, decode};

/// A named, typed slot on a graph or on a node.
///
/// The type of the slot is the type of its default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Identifier,
    pub default_value: Value,
}

impl Endpoint {
    pub fn new(id: impl Into<Identifier>, default_value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            default_value: default_value.into(),
        }
    }
}

/// Placement of one node in a prototype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeNode {
    /// Factory key of the node type
    pub type_id: Identifier,

    /// Unique, non-zero instance id
    pub id: NodeId,

    /// Overrides for the node's input plug defaults
    pub default_value_plugs: Vec<Endpoint>,

    /// Nested graph for composite nodes
    #[serde(default, deserialize_with = "deserialize_subroutine")]
    pub subroutine: Option<Box<Prototype>>,
}

fn deserialize_subroutine<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Box<Prototype>>, D::Error> {
    let _depth = NestingGuard::enter::<D::Error>()?;
    Option::<Box<Prototype>>::deserialize(deserializer)
}

impl PrototypeNode {
    pub fn new(type_id: impl Into<Identifier>, id: NodeId) -> Self {
        Self {
            type_id: type_id.into(),
            id,
            default_value_plugs: Vec::new(),
            subroutine: None,
        }
    }

    /// Override the default value of an input plug.
    pub fn with_override(mut self, plug: impl Into<Identifier>, value: impl Into<Value>) -> Self {
        self.default_value_plugs.push(Endpoint::new(plug, value));
        self
    }

    pub fn with_subroutine(mut self, prototype: Prototype) -> Self {
        self.subroutine = Some(Box::new(prototype));
        self
    }
}

/// What a connection terminus refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminusScope {
    /// A plug on a node
    Node,
    /// A graph-level input or output
    Graph,
    /// A graph-level local variable
    LocalVariable,
}

/// Kind of a connection: which side is a node, the graph or a local
/// variable, and whether the payload is a value or an event.
///
/// The discriminants are the persisted one-byte tags.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ConnectionKind {
    NodeValue_NodeValue = 0,
    NodeEvent_NodeEvent = 1,
    GraphValue_NodeValue = 2,
    // Graph input straight to graph output, e.g. a boolean that activates
    // a transition.
    GraphValue_GraphValue = 4,
    GraphEvent_NodeEvent = 5,
    NodeValue_GraphValue = 6,
    NodeEvent_GraphEvent = 7,
    GraphEvent_GraphEvent = 8,
    LocalVariable_NodeValue = 9,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 9] = [
        ConnectionKind::NodeValue_NodeValue,
        ConnectionKind::NodeEvent_NodeEvent,
        ConnectionKind::GraphValue_NodeValue,
        ConnectionKind::GraphValue_GraphValue,
        ConnectionKind::GraphEvent_NodeEvent,
        ConnectionKind::NodeValue_GraphValue,
        ConnectionKind::NodeEvent_GraphEvent,
        ConnectionKind::GraphEvent_GraphEvent,
        ConnectionKind::LocalVariable_NodeValue,
    ];

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Map the tag set used by sound graphs, which numbers the kinds
    /// differently and has no graph-to-graph kinds.
    pub fn from_sound_graph_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ConnectionKind::NodeValue_NodeValue),
            1 => Some(ConnectionKind::NodeEvent_NodeEvent),
            2 => Some(ConnectionKind::GraphValue_NodeValue),
            3 => Some(ConnectionKind::GraphEvent_NodeEvent),
            4 => Some(ConnectionKind::NodeValue_GraphValue),
            5 => Some(ConnectionKind::NodeEvent_GraphEvent),
            6 => Some(ConnectionKind::LocalVariable_NodeValue),
            _ => None,
        }
    }

    pub fn source_scope(self) -> TerminusScope {
        match self {
            ConnectionKind::NodeValue_NodeValue
            | ConnectionKind::NodeEvent_NodeEvent
            | ConnectionKind::NodeValue_GraphValue
            | ConnectionKind::NodeEvent_GraphEvent => TerminusScope::Node,
            ConnectionKind::GraphValue_NodeValue
            | ConnectionKind::GraphValue_GraphValue
            | ConnectionKind::GraphEvent_NodeEvent
            | ConnectionKind::GraphEvent_GraphEvent => TerminusScope::Graph,
            ConnectionKind::LocalVariable_NodeValue => TerminusScope::LocalVariable,
        }
    }

    pub fn destination_scope(self) -> TerminusScope {
        match self {
            ConnectionKind::NodeValue_NodeValue
            | ConnectionKind::NodeEvent_NodeEvent
            | ConnectionKind::GraphValue_NodeValue
            | ConnectionKind::GraphEvent_NodeEvent
            | ConnectionKind::LocalVariable_NodeValue => TerminusScope::Node,
            ConnectionKind::GraphValue_GraphValue
            | ConnectionKind::NodeValue_GraphValue
            | ConnectionKind::NodeEvent_GraphEvent
            | ConnectionKind::GraphEvent_GraphEvent => TerminusScope::Graph,
        }
    }

    /// Whether the wire carries discrete events rather than a sampled value.
    pub fn is_event(self) -> bool {
        matches!(
            self,
            ConnectionKind::NodeEvent_NodeEvent
                | ConnectionKind::GraphEvent_NodeEvent
                | ConnectionKind::NodeEvent_GraphEvent
                | ConnectionKind::GraphEvent_GraphEvent
        )
    }
}

impl From<ConnectionKind> for u8 {
    fn from(kind: ConnectionKind) -> Self {
        kind.tag()
    }
}

impl TryFrom<u8> for ConnectionKind {
    type Error = InvalidConnectionKind;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ConnectionKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or(InvalidConnectionKind(tag))
    }
}

/// A one-byte connection kind tag that names no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid connection kind tag {0}")]
pub struct InvalidConnectionKind(pub u8);

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionEndpoint {
    /// Owning node, or `GRAPH_NODE_ID` for graph/local-variable scope
    pub node_id: NodeId,
    pub endpoint_id: Identifier,
}

impl ConnectionEndpoint {
    pub fn node(node_id: NodeId, endpoint_id: impl Into<Identifier>) -> Self {
        Self {
            node_id,
            endpoint_id: endpoint_id.into(),
        }
    }

    pub fn graph(endpoint_id: impl Into<Identifier>) -> Self {
        Self::node(GRAPH_NODE_ID, endpoint_id)
    }
}

/// A directed wire between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: ConnectionEndpoint,
    pub destination: ConnectionEndpoint,
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn new(
        source: ConnectionEndpoint,
        destination: ConnectionEndpoint,
        kind: ConnectionKind,
    ) -> Self {
        Self {
            source,
            destination,
            kind,
        }
    }
}

/// The complete static description of a graph.
///
/// This is the unit that is authored, persisted and diffed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub debug_name: String,
    pub id: u64,

    pub inputs: Vec<Endpoint>,
    pub outputs: Vec<Endpoint>,
    pub local_variable_plugs: Vec<Endpoint>,

    pub nodes: Vec<PrototypeNode>,
    pub connections: Vec<Connection>,
}

impl Prototype {
    pub fn new(debug_name: impl Into<String>, id: u64) -> Self {
        Self {
            debug_name: debug_name.into(),
            id,
            ..Self::default()
        }
    }

    /// Encode into the persisted byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MalformedValue> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the persisted byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedValue> {
        decode(bytes)
    }

    pub fn add_input(&mut self, id: impl Into<Identifier>, default_value: impl Into<Value>) {
        self.inputs.push(Endpoint::new(id, default_value));
    }

    pub fn add_output(&mut self, id: impl Into<Identifier>, default_value: impl Into<Value>) {
        self.outputs.push(Endpoint::new(id, default_value));
    }

    pub fn add_local_variable(
        &mut self,
        id: impl Into<Identifier>,
        default_value: impl Into<Value>,
    ) {
        self.local_variable_plugs.push(Endpoint::new(id, default_value));
    }

    pub fn add_node(&mut self, node: PrototypeNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Add a wire. Node termini use their node id, graph and local-variable
    /// termini use `GRAPH_NODE_ID`.
    pub fn connect(
        &mut self,
        kind: ConnectionKind,
        source: (NodeId, impl Into<Identifier>),
        destination: (NodeId, impl Into<Identifier>),
    ) {
        self.connections.push(Connection::new(
            ConnectionEndpoint::node(source.0, source.1),
            ConnectionEndpoint::node(destination.0, destination.1),
            kind,
        ));
    }

    pub fn find_node(&self, id: NodeId) -> Option<&PrototypeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_input(&self, id: Identifier) -> Option<&Endpoint> {
        self.inputs.iter().find(|e| e.id == id)
    }

    pub fn find_output(&self, id: Identifier) -> Option<&Endpoint> {
        self.outputs.iter().find(|e| e.id == id)
    }

    pub fn find_local_variable(&self, id: Identifier) -> Option<&Endpoint> {
        self.local_variable_plugs.iter().find(|e| e.id == id)
    }

    /// Connections whose destination is the given node.
    pub fn connections_to(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.destination.node_id == node_id)
    }

    /// Connections whose source is the given node.
    pub fn connections_from(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.source.node_id == node_id)
    }
}
