// src/node_factory.rs

use std::collections::HashMap;

use thiserror::Error;

use crate::identifier::{Identifier, NodeId};
use crate::node::NodeProcessor;

/// Constructor for one node type.
pub type NodeConstructor = fn(NodeId) -> Box<dyn NodeProcessor>;

/// A factory capable of creating fresh, unwired node instances.
///
/// This is only used during instance compilation.
pub trait NodeFactory: Send + Sync {
    /// Create one node instance tagged with `id`
    fn create(&self, id: NodeId) -> Box<dyn NodeProcessor>;
}

impl NodeFactory for NodeConstructor {
    fn create(&self, id: NodeId) -> Box<dyn NodeProcessor> {
        self(id)
    }
}

/// The requested node type has no registered constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown node type {0}")]
pub struct UnknownNodeType(pub Identifier);

/// Registry mapping node type identifiers to factories.
///
/// Built once at startup and then only read, so it can be shared across
/// threads compiling independent instances.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<Identifier, Box<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor. A later registration under the same id
    /// replaces the earlier one.
    pub fn register(&mut self, type_id: Identifier, constructor: NodeConstructor) {
        self.register_factory(type_id, Box::new(constructor));
    }

    pub fn register_factory(&mut self, type_id: Identifier, factory: Box<dyn NodeFactory>) {
        if self.factories.insert(type_id, factory).is_some() {
            log::warn!("Node type {} registered twice, keeping the last one", type_id);
        }
    }

    pub fn contains(&self, type_id: Identifier) -> bool {
        self.factories.contains_key(&type_id)
    }

    pub fn create(
        &self,
        type_id: Identifier,
        id: NodeId,
    ) -> Result<Box<dyn NodeProcessor>, UnknownNodeType> {
        self.factories
            .get(&type_id)
            .map(|factory| factory.create(id))
            .ok_or(UnknownNodeType(type_id))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
