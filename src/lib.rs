// src/lib.rs
//
// Library entry point: node-graph dataflow runtime.
//
// Prototypes (static, serializable graph descriptions) are compiled into
// GraphInstances (live, wired node processors) against a NodeRegistry.

pub mod compile;
pub mod config;
pub mod event;
pub mod graph;
pub mod identifier;
pub mod logging;
pub mod node;
pub mod node_factory;
pub mod nodes;
pub mod prototype;
pub mod subgraph;
pub mod value;


// Re-export key types for Rust consumers
pub use compile::{
    CompileError, CompileResult, create_instance, create_instance_with, dependency_order,
};
pub use config::RuntimeConfig;
pub use graph::GraphInstance;
pub use identifier::{GRAPH_NODE_ID, Identifier, NodeId};
pub use node::{InitContext, NodeIo, NodeLayout, NodeProcessor};
pub use node_factory::NodeRegistry;
pub use nodes::register_standard_nodes;
pub use prototype::{
    Connection, ConnectionEndpoint, ConnectionKind, Endpoint, Prototype, PrototypeNode,
};
pub use value::{MalformedValue, Value, ValueType};
