// src/compile.rs
//
// Compiles a Prototype (declarative) into a GraphInstance (runtime).
//
// Compilation is all-or-nothing: any error discards everything built so
// far, so a caller never sees a partially wired instance.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::event::EventTarget;
use crate::graph::{GraphInstance, SlotId};
use crate::identifier::{GRAPH_NODE_ID, Identifier, NodeId};
use crate::node::{InitContext, NodeLayout, NodeProcessor};
use crate::node_factory::NodeRegistry;
use crate::prototype::{Connection, ConnectionEndpoint, ConnectionKind, Prototype, TerminusScope};
use crate::subgraph::SubgraphNode;
use crate::value::ValueType;

/// Error during instance compilation.
///
/// Every variant names the node and/or endpoint at fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("node {node} has unknown type {type_id}")]
    UnknownNodeType { node: NodeId, type_id: Identifier },

    #[error("connection references missing endpoint {endpoint} on node {node}")]
    DanglingConnectionEndpoint { node: NodeId, endpoint: Identifier },

    #[error("node id {0} is used more than once")]
    DuplicateNodeId(NodeId),

    #[error("node id 0 is reserved for the graph itself")]
    ReservedNodeId,

    #[error("value connections form a cycle through nodes {nodes:?}")]
    CyclicValueDependency { nodes: Vec<NodeId> },

    #[error("override for {plug} on node {node} is {found}, plug expects {expected}")]
    TypeMismatch {
        node: NodeId,
        plug: Identifier,
        expected: ValueType,
        found: ValueType,
    },

    #[error("node {node} has no input plug {plug} to override")]
    UnknownOverridePlug { node: NodeId, plug: Identifier },

    #[error("{endpoint} on node {node} has more than one incoming value connection")]
    MultipleValueSources { node: NodeId, endpoint: Identifier },

    #[error("{kind:?} connection cannot have a terminus on node {node}")]
    BoundaryTerminus { kind: ConnectionKind, node: NodeId },

    #[error("subroutine of node {node} is nested {depth} levels deep")]
    SubroutineTooDeep { node: NodeId, depth: usize },

    #[error("in subroutine of node {node}: {source}")]
    Subroutine {
        node: NodeId,
        #[source]
        source: Box<CompileError>,
    },
}

/// Result of instance compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Compile a Prototype into a ready-to-run GraphInstance with the default
/// runtime configuration.
pub fn create_instance(
    prototype: &Prototype,
    registry: &NodeRegistry,
) -> CompileResult<GraphInstance> {
    let config = RuntimeConfig::default();
    let ctx = InitContext::new(config.sample_rate);
    create_instance_with(prototype, registry, &ctx, &config)
}

/// Compile a Prototype into a GraphInstance.
///
/// This function:
/// 1. Creates node instances using the registry (subroutines recursively)
/// 2. Validates default-value overrides
/// 3. Resolves every connection into slot bindings and event routes
/// 4. Computes the dependency order over node-to-node value wires
/// 5. Initializes every node in that order
pub fn create_instance_with(
    prototype: &Prototype,
    registry: &NodeRegistry,
    ctx: &InitContext,
    config: &RuntimeConfig,
) -> CompileResult<GraphInstance> {
    let mut graph = build(prototype, registry, config, 0)?;
    graph.init(ctx);

    log::info!(
        "Compiled graph '{}': {} nodes, {} connections",
        prototype.debug_name,
        prototype.nodes.len(),
        prototype.connections.len()
    );

    Ok(graph)
}

/// Dependency order of the prototype's nodes.
///
/// Only node-to-node value wires constrain the order. Ties are broken by
/// position in the prototype, so the result is stable.
pub fn dependency_order(prototype: &Prototype) -> CompileResult<Vec<NodeId>> {
    let id_to_index = index_nodes(prototype)?;
    let order = sort_nodes(prototype, &id_to_index)?;
    Ok(order.into_iter().map(|i| prototype.nodes[i].id).collect())
}

// ═══════════════════════════════════════════════════════════════════
// Compilation steps
// ═══════════════════════════════════════════════════════════════════

fn build(
    prototype: &Prototype,
    registry: &NodeRegistry,
    config: &RuntimeConfig,
    depth: usize,
) -> CompileResult<GraphInstance> {
    let id_to_index = index_nodes(prototype)?;

    // Create all nodes
    let mut processors: Vec<Box<dyn NodeProcessor>> = Vec::with_capacity(prototype.nodes.len());
    for node in &prototype.nodes {
        let processor: Box<dyn NodeProcessor> = match &node.subroutine {
            Some(subroutine) => {
                if depth >= config.max_subroutine_depth {
                    return Err(CompileError::SubroutineTooDeep {
                        node: node.id,
                        depth: depth + 1,
                    });
                }
                let nested = build(subroutine, registry, config, depth + 1).map_err(|e| {
                    CompileError::Subroutine {
                        node: node.id,
                        source: Box::new(e),
                    }
                })?;
                Box::new(SubgraphNode::new(node.id, nested, subroutine))
            }
            None => registry.create(node.type_id, node.id).map_err(|_| {
                CompileError::UnknownNodeType {
                    node: node.id,
                    type_id: node.type_id,
                }
            })?,
        };
        log::debug!("Created node {} ({})", node.id, node.type_id);
        processors.push(processor);
    }

    let layouts: Vec<NodeLayout> = processors.iter().map(|p| p.layout()).collect();
    validate_overrides(prototype, &layouts)?;

    let mut graph = GraphInstance::new(prototype.debug_name.as_str(), config);

    // Graph-owned storage
    let mut input_slots = HashMap::with_capacity(prototype.inputs.len());
    for input in &prototype.inputs {
        let slot = graph.allocate_slot(input.default_value.clone());
        graph.bind_input(input.id, slot);
        input_slots.insert(input.id, slot);
    }

    let mut local_slots = HashMap::with_capacity(prototype.local_variable_plugs.len());
    for local in &prototype.local_variable_plugs {
        let slot = graph.allocate_slot(local.default_value.clone());
        graph.bind_local_variable(local.id, slot);
        local_slots.insert(local.id, slot);
    }

    // Node-owned output storage
    let mut output_slots: Vec<Vec<SlotId>> = Vec::with_capacity(layouts.len());
    for layout in &layouts {
        let mut slots = Vec::with_capacity(layout.outputs.len());
        for plug in &layout.outputs {
            slots.push(graph.allocate_slot(plug.default_value.clone()));
        }
        output_slots.push(slots);
    }

    // Wire up connections
    let resolver = Resolver {
        prototype,
        id_to_index: &id_to_index,
        layouts: &layouts,
    };
    let mut wiring = Wiring::new(&layouts);

    for conn in &prototype.connections {
        resolver.check_scopes(conn)?;

        match conn.kind {
            ConnectionKind::NodeValue_NodeValue => {
                let (src, out) = resolver.node_output(conn.source)?;
                let (dst, input) = resolver.node_input(conn.destination)?;
                wiring.bind_node_input(conn.destination, dst, input, output_slots[src][out])?;
            }
            ConnectionKind::GraphValue_NodeValue => {
                let id = resolver.graph_input(conn.source)?;
                let (dst, input) = resolver.node_input(conn.destination)?;
                wiring.bind_node_input(conn.destination, dst, input, input_slots[&id])?;
            }
            ConnectionKind::LocalVariable_NodeValue => {
                let id = resolver.local_variable(conn.source)?;
                let (dst, input) = resolver.node_input(conn.destination)?;
                wiring.bind_node_input(conn.destination, dst, input, local_slots[&id])?;
            }
            ConnectionKind::NodeValue_GraphValue => {
                let (src, out) = resolver.node_output(conn.source)?;
                let id = resolver.graph_output(conn.destination)?;
                wiring.bind_graph_output(id, output_slots[src][out])?;
            }
            ConnectionKind::GraphValue_GraphValue => {
                let source = resolver.graph_input(conn.source)?;
                let id = resolver.graph_output(conn.destination)?;
                wiring.bind_graph_output(id, input_slots[&source])?;
            }
            ConnectionKind::NodeEvent_NodeEvent => {
                let (src, out) = resolver.node_output_event(conn.source)?;
                let (dst, input) = resolver.node_input_event(conn.destination)?;
                wiring.route_node_event(
                    conn.source,
                    src,
                    out,
                    EventTarget::Node { node: dst, input },
                );
            }
            ConnectionKind::GraphEvent_NodeEvent => {
                let id = resolver.graph_input(conn.source)?;
                let (dst, input) = resolver.node_input_event(conn.destination)?;
                graph.route_graph_event(id, EventTarget::Node { node: dst, input });
            }
            ConnectionKind::NodeEvent_GraphEvent => {
                let (src, out) = resolver.node_output_event(conn.source)?;
                let id = resolver.graph_output(conn.destination)?;
                wiring.route_node_event(conn.source, src, out, EventTarget::GraphOutput(id));
            }
            ConnectionKind::GraphEvent_GraphEvent => {
                let source = resolver.graph_input(conn.source)?;
                let id = resolver.graph_output(conn.destination)?;
                graph.route_graph_event(source, EventTarget::GraphOutput(id));
            }
        }

        log::debug!(
            "Bound {:?} {}:{} -> {}:{}",
            conn.kind,
            conn.source.node_id,
            conn.source.endpoint_id,
            conn.destination.node_id,
            conn.destination.endpoint_id
        );
    }

    let order = sort_nodes(prototype, &id_to_index)?;

    // Unconnected inputs read their own constant slot
    for (i, (processor, layout)) in processors.into_iter().zip(&layouts).enumerate() {
        let node = &prototype.nodes[i];
        let mut inputs = Vec::with_capacity(layout.inputs.len());
        for (j, plug) in layout.inputs.iter().enumerate() {
            let slot = match wiring.node_inputs[i][j] {
                Some(slot) => slot,
                None => {
                    let value = node
                        .default_value_plugs
                        .iter()
                        .find(|o| o.id == plug.id)
                        .map_or_else(|| plug.default_value.clone(), |o| o.default_value.clone());
                    graph.allocate_slot(value)
                }
            };
            inputs.push(slot);
        }

        let outputs = std::mem::take(&mut output_slots[i]);
        graph.add_node(processor, inputs, outputs, layout.output_events.len());
    }

    // Node event routes need the nodes' routing rows
    for (end, node, output, target) in wiring.node_events {
        if !graph.route_node_event(node, output, target) {
            return Err(Resolver::dangling(end));
        }
    }

    // Unconnected graph outputs keep their default
    for output in &prototype.outputs {
        let slot = match wiring.graph_outputs.get(&output.id) {
            Some(&slot) => slot,
            None => graph.allocate_slot(output.default_value.clone()),
        };
        graph.bind_output(output.id, slot);
    }

    graph.set_evaluation_order(order);
    Ok(graph)
}

/// Map node ids to prototype positions, rejecting reserved and duplicate ids.
fn index_nodes(prototype: &Prototype) -> CompileResult<HashMap<NodeId, usize>> {
    let mut id_to_index = HashMap::with_capacity(prototype.nodes.len());
    for (i, node) in prototype.nodes.iter().enumerate() {
        if node.id == GRAPH_NODE_ID {
            return Err(CompileError::ReservedNodeId);
        }
        if id_to_index.insert(node.id, i).is_some() {
            return Err(CompileError::DuplicateNodeId(node.id));
        }
    }
    Ok(id_to_index)
}

fn validate_overrides(prototype: &Prototype, layouts: &[NodeLayout]) -> CompileResult<()> {
    for (node, layout) in prototype.nodes.iter().zip(layouts) {
        for plug in &node.default_value_plugs {
            let index = layout
                .input_index(plug.id)
                .ok_or(CompileError::UnknownOverridePlug {
                    node: node.id,
                    plug: plug.id,
                })?;

            let expected = layout.inputs[index].default_value.value_type();
            let found = plug.default_value.value_type();
            // A void default accepts any payload
            if expected != ValueType::Void && expected != found {
                return Err(CompileError::TypeMismatch {
                    node: node.id,
                    plug: plug.id,
                    expected,
                    found,
                });
            }
        }
    }
    Ok(())
}

/// Topological sort (Kahn's algorithm) over node-to-node value wires.
fn sort_nodes(
    prototype: &Prototype,
    id_to_index: &HashMap<NodeId, usize>,
) -> CompileResult<Vec<usize>> {
    let n = prototype.nodes.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    let lookup = |end: &ConnectionEndpoint| {
        id_to_index
            .get(&end.node_id)
            .copied()
            .ok_or(CompileError::DanglingConnectionEndpoint {
                node: end.node_id,
                endpoint: end.endpoint_id,
            })
    };

    for conn in &prototype.connections {
        if conn.kind != ConnectionKind::NodeValue_NodeValue {
            continue;
        }
        let src = lookup(&conn.source)?;
        let dst = lookup(&conn.destination)?;
        dependents[src].push(dst);
        in_degree[dst] += 1;
    }

    // Ready nodes, smallest prototype position first
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < n {
        // Nodes left over are on a cycle or downstream of one
        let nodes = (0..n)
            .filter(|&i| in_degree[i] > 0 && on_cycle(i, &dependents))
            .map(|i| prototype.nodes[i].id)
            .collect();
        return Err(CompileError::CyclicValueDependency { nodes });
    }

    Ok(order)
}

/// Whether `start` can reach itself along value wires.
fn on_cycle(start: usize, dependents: &[Vec<usize>]) -> bool {
    let mut seen = vec![false; dependents.len()];
    let mut stack = dependents[start].clone();

    while let Some(idx) = stack.pop() {
        if idx == start {
            return true;
        }
        if !std::mem::replace(&mut seen[idx], true) {
            stack.extend_from_slice(&dependents[idx]);
        }
    }
    false
}

// ═══════════════════════════════════════════════════════════════════
// Connection resolution
// ═══════════════════════════════════════════════════════════════════

/// Looks up connection termini against the prototype and node layouts.
struct Resolver<'a> {
    prototype: &'a Prototype,
    id_to_index: &'a HashMap<NodeId, usize>,
    layouts: &'a [NodeLayout],
}

impl Resolver<'_> {
    fn check_scopes(&self, conn: &Connection) -> CompileResult<()> {
        let kind = conn.kind;
        for (end, scope) in [
            (&conn.source, kind.source_scope()),
            (&conn.destination, kind.destination_scope()),
        ] {
            let is_graph = end.node_id == GRAPH_NODE_ID;
            let wants_graph = scope != TerminusScope::Node;
            if is_graph != wants_graph {
                return Err(CompileError::BoundaryTerminus {
                    kind,
                    node: end.node_id,
                });
            }
        }
        Ok(())
    }

    fn dangling(end: ConnectionEndpoint) -> CompileError {
        CompileError::DanglingConnectionEndpoint {
            node: end.node_id,
            endpoint: end.endpoint_id,
        }
    }

    fn node(&self, end: ConnectionEndpoint) -> CompileResult<usize> {
        self.id_to_index
            .get(&end.node_id)
            .copied()
            .ok_or_else(|| Self::dangling(end))
    }

    fn node_plug(
        &self,
        end: ConnectionEndpoint,
        find: impl Fn(&NodeLayout, Identifier) -> Option<usize>,
    ) -> CompileResult<(usize, usize)> {
        let idx = self.node(end)?;
        let plug = find(&self.layouts[idx], end.endpoint_id).ok_or_else(|| Self::dangling(end))?;
        Ok((idx, plug))
    }

    fn node_output(&self, end: ConnectionEndpoint) -> CompileResult<(usize, usize)> {
        self.node_plug(end, NodeLayout::output_index)
    }

    fn node_input(&self, end: ConnectionEndpoint) -> CompileResult<(usize, usize)> {
        self.node_plug(end, NodeLayout::input_index)
    }

    fn node_output_event(&self, end: ConnectionEndpoint) -> CompileResult<(usize, usize)> {
        self.node_plug(end, NodeLayout::output_event_index)
    }

    fn node_input_event(&self, end: ConnectionEndpoint) -> CompileResult<(usize, usize)> {
        self.node_plug(end, NodeLayout::input_event_index)
    }

    fn graph_input(&self, end: ConnectionEndpoint) -> CompileResult<Identifier> {
        self.prototype
            .find_input(end.endpoint_id)
            .map(|e| e.id)
            .ok_or_else(|| Self::dangling(end))
    }

    fn graph_output(&self, end: ConnectionEndpoint) -> CompileResult<Identifier> {
        self.prototype
            .find_output(end.endpoint_id)
            .map(|e| e.id)
            .ok_or_else(|| Self::dangling(end))
    }

    fn local_variable(&self, end: ConnectionEndpoint) -> CompileResult<Identifier> {
        self.prototype
            .find_local_variable(end.endpoint_id)
            .map(|e| e.id)
            .ok_or_else(|| Self::dangling(end))
    }
}

/// Bindings collected while resolving connections, applied once every
/// node has been added to the instance.
struct Wiring {
    /// Per node, per input plug: the slot it reads, if connected
    node_inputs: Vec<Vec<Option<SlotId>>>,
    /// Graph output id -> the slot it exposes
    graph_outputs: HashMap<Identifier, SlotId>,
    /// (source terminus, node index, output event index, target)
    node_events: Vec<(ConnectionEndpoint, usize, usize, EventTarget)>,
}

impl Wiring {
    fn new(layouts: &[NodeLayout]) -> Self {
        Self {
            node_inputs: layouts.iter().map(|l| vec![None; l.inputs.len()]).collect(),
            graph_outputs: HashMap::new(),
            node_events: Vec::new(),
        }
    }

    fn route_node_event(
        &mut self,
        end: ConnectionEndpoint,
        node: usize,
        output: usize,
        target: EventTarget,
    ) {
        self.node_events.push((end, node, output, target));
    }

    fn bind_node_input(
        &mut self,
        end: ConnectionEndpoint,
        node: usize,
        input: usize,
        slot: SlotId,
    ) -> CompileResult<()> {
        let binding = &mut self.node_inputs[node][input];
        if binding.is_some() {
            return Err(CompileError::MultipleValueSources {
                node: end.node_id,
                endpoint: end.endpoint_id,
            });
        }
        *binding = Some(slot);
        Ok(())
    }

    fn bind_graph_output(&mut self, id: Identifier, slot: SlotId) -> CompileResult<()> {
        if self.graph_outputs.insert(id, slot).is_some() {
            return Err(CompileError::MultipleValueSources {
                node: GRAPH_NODE_ID,
                endpoint: id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{node_types, plugs, register_standard_nodes};
    use crate::prototype::PrototypeNode;
    use crate::value::Value;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        register_standard_nodes(&mut registry);
        registry
    }

    /// Graph inputs A, B -> Add (Int) -> graph output Sum.
    fn adder() -> Prototype {
        let mut proto = Prototype::new("Adder", 1);
        proto.add_input("A", 0_i32);
        proto.add_input("B", 0_i32);
        proto.add_output("Sum", 0_i32);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 1));
        proto.connect(
            ConnectionKind::GraphValue_NodeValue,
            (GRAPH_NODE_ID, "A"),
            (1, plugs::VALUE1),
        );
        proto.connect(
            ConnectionKind::GraphValue_NodeValue,
            (GRAPH_NODE_ID, "B"),
            (1, plugs::VALUE2),
        );
        proto.connect(
            ConnectionKind::NodeValue_GraphValue,
            (1, plugs::OUT),
            (GRAPH_NODE_ID, "Sum"),
        );
        proto
    }

    #[test]
    fn test_compile_empty_graph() {
        let proto = Prototype::new("Empty", 1);
        let graph = create_instance(&proto, &NodeRegistry::new()).unwrap();
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_compile_simple_graph() {
        let mut graph = create_instance(&adder(), &registry()).unwrap();
        assert_eq!(graph.node_count(), 1);

        graph.set_input(Identifier::new("A"), 20_i32);
        graph.set_input(Identifier::new("B"), 22_i32);
        graph.process(1.0 / 60.0);
        assert_eq!(graph.read_output(Identifier::new("Sum")), Some(&Value::Int32(42)));
    }

    #[test]
    fn test_reserved_and_duplicate_ids() {
        let mut proto = Prototype::new("Bad", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 0));
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::ReservedNodeId)
        );

        let mut proto = Prototype::new("Bad", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 3));
        proto.add_node(PrototypeNode::new(node_types::ADD_FLOAT, 3));
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::DuplicateNodeId(3))
        );
    }

    #[test]
    fn test_override_checks() {
        let mut proto = Prototype::new("Bad", 1);
        proto.add_node(
            PrototypeNode::new(node_types::ADD_INT, 1).with_override(plugs::VALUE1, 1.5_f32),
        );
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::TypeMismatch {
                node: 1,
                plug: plugs::VALUE1,
                expected: ValueType::Int32,
                found: ValueType::Float32,
            })
        );

        let mut proto = Prototype::new("Bad", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 1).with_override("Nope", 1_i32));
        assert!(matches!(
            create_instance(&proto, &registry()),
            Err(CompileError::UnknownOverridePlug { node: 1, .. })
        ));
    }

    #[test]
    fn test_dangling_plug_on_existing_node() {
        let mut proto = adder();
        proto.connect(ConnectionKind::NodeValue_GraphValue, (1, "Missing"), (GRAPH_NODE_ID, "Sum"));
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::DanglingConnectionEndpoint {
                node: 1,
                endpoint: Identifier::new("Missing"),
            })
        );
    }

    #[test]
    fn test_multiple_value_sources() {
        let mut proto = adder();
        proto.connect(
            ConnectionKind::GraphValue_NodeValue,
            (GRAPH_NODE_ID, "B"),
            (1, plugs::VALUE1),
        );
        assert!(matches!(
            create_instance(&proto, &registry()),
            Err(CompileError::MultipleValueSources { node: 1, .. })
        ));
    }

    #[test]
    fn test_boundary_terminus() {
        let mut proto = adder();
        // Graph-value source must be node 0
        proto.connect(ConnectionKind::GraphValue_NodeValue, (1, plugs::OUT), (1, plugs::VALUE1));
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::BoundaryTerminus {
                kind: ConnectionKind::GraphValue_NodeValue,
                node: 1,
            })
        );
    }

    #[test]
    fn test_value_cycle_rejected_event_cycle_allowed() {
        let mut proto = Prototype::new("Loop", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 1));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 2));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (1, plugs::OUT), (2, plugs::VALUE1));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (2, plugs::OUT), (1, plugs::VALUE1));
        assert_eq!(
            create_instance(&proto, &registry()).err(),
            Some(CompileError::CyclicValueDependency { nodes: vec![1, 2] })
        );

        let mut proto = Prototype::new("EventLoop", 1);
        proto.add_node(PrototypeNode::new(node_types::GET_INT, 1));
        proto.add_node(PrototypeNode::new(node_types::GET_INT, 2));
        proto.connect(
            ConnectionKind::NodeEvent_NodeEvent,
            (1, plugs::ON_TRIGGER),
            (2, plugs::TRIGGER),
        );
        proto.connect(
            ConnectionKind::NodeEvent_NodeEvent,
            (2, plugs::ON_TRIGGER),
            (1, plugs::TRIGGER),
        );
        assert!(create_instance(&proto, &registry()).is_ok());
    }

    #[test]
    fn test_cycle_reports_only_looping_nodes() {
        let mut proto = Prototype::new("Loop", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 1));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 2));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 3));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 4));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (1, plugs::OUT), (2, plugs::VALUE1));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (2, plugs::OUT), (1, plugs::VALUE1));
        // 3 and 4 only hang off the loop
        proto.connect(ConnectionKind::NodeValue_NodeValue, (2, plugs::OUT), (3, plugs::VALUE1));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (3, plugs::OUT), (4, plugs::VALUE1));

        assert_eq!(
            dependency_order(&proto).err(),
            Some(CompileError::CyclicValueDependency { nodes: vec![1, 2] })
        );

        // Self loop
        let mut proto = Prototype::new("Self", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 5));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 6));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (5, plugs::OUT), (5, plugs::VALUE1));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (5, plugs::OUT), (6, plugs::VALUE1));
        assert_eq!(
            dependency_order(&proto).err(),
            Some(CompileError::CyclicValueDependency { nodes: vec![5] })
        );
    }

    #[test]
    fn test_node_event_wires_survive_compilation() {
        let mut proto = Prototype::new("Events", 1);
        proto.add_output("No", Value::Void);
        proto.add_node(PrototypeNode::new(node_types::BOOL_TRIGGER, 1));
        proto.add_node(PrototypeNode::new(node_types::TRIGGER_COUNTER, 2));
        proto.add_output("Count", 0_i32);
        proto.connect(
            ConnectionKind::NodeEvent_GraphEvent,
            (1, plugs::ON_FALSE),
            (GRAPH_NODE_ID, "No"),
        );
        proto.connect(
            ConnectionKind::NodeEvent_NodeEvent,
            (1, plugs::ON_FALSE),
            (2, plugs::TRIGGER),
        );
        proto.connect(
            ConnectionKind::NodeValue_GraphValue,
            (2, plugs::COUNT),
            (GRAPH_NODE_ID, "Count"),
        );

        let mut graph = create_instance(&proto, &registry()).unwrap();
        graph.process(1.0 / 60.0);
        graph.process(1.0 / 60.0);

        assert_eq!(graph.drain_events(), vec![Identifier::new("No"), Identifier::new("No")]);
        assert_eq!(graph.read_output(Identifier::new("Count")), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_missing_boundary_endpoints() {
        let dangling = |endpoint: &'static str| {
            Some(CompileError::DanglingConnectionEndpoint {
                node: GRAPH_NODE_ID,
                endpoint: Identifier::new(endpoint),
            })
        };

        // Graph input
        let mut proto = adder();
        proto.connect(
            ConnectionKind::GraphValue_NodeValue,
            (GRAPH_NODE_ID, "C"),
            (1, plugs::VALUE1),
        );
        assert_eq!(create_instance(&proto, &registry()).err(), dangling("C"));

        // Graph output
        let mut proto = adder();
        proto.connect(
            ConnectionKind::GraphValue_GraphValue,
            (GRAPH_NODE_ID, "A"),
            (GRAPH_NODE_ID, "Total"),
        );
        assert_eq!(create_instance(&proto, &registry()).err(), dangling("Total"));

        // Local variable
        let mut proto = adder();
        proto.add_local_variable("Gain", 1_i32);
        proto.connect(
            ConnectionKind::LocalVariable_NodeValue,
            (GRAPH_NODE_ID, "Drive"),
            (1, plugs::VALUE2),
        );
        assert_eq!(create_instance(&proto, &registry()).err(), dangling("Drive"));

        // Graph event input
        let mut proto = adder();
        proto.add_node(PrototypeNode::new(node_types::TRIGGER_COUNTER, 2));
        proto.connect(
            ConnectionKind::GraphEvent_NodeEvent,
            (GRAPH_NODE_ID, "Hit"),
            (2, plugs::TRIGGER),
        );
        assert_eq!(create_instance(&proto, &registry()).err(), dangling("Hit"));
    }

    #[test]
    fn test_dependency_order_ties_follow_prototype() {
        let mut proto = Prototype::new("Chain", 1);
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 30));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 10));
        proto.add_node(PrototypeNode::new(node_types::ADD_INT, 20));
        proto.connect(ConnectionKind::NodeValue_NodeValue, (20, plugs::OUT), (30, plugs::VALUE1));

        let order = dependency_order(&proto).unwrap();
        assert_eq!(order, vec![10, 20, 30]);
        assert_eq!(dependency_order(&proto).unwrap(), order);

        let graph = create_instance(&proto, &registry()).unwrap();
        assert_eq!(graph.evaluation_order(), order);
    }

    #[test]
    fn test_subroutine_depth_limit() {
        let mut inner = Prototype::new("Inner", 2);
        inner.add_node(PrototypeNode::new(node_types::ADD_INT, 1));

        let mut outer = Prototype::new("Outer", 1);
        outer.add_node(PrototypeNode::new("Subroutine", 5).with_subroutine(inner));

        let config = RuntimeConfig::default().with_max_subroutine_depth(0);
        let result = create_instance_with(&outer, &registry(), &InitContext::default(), &config);
        assert_eq!(
            result.err(),
            Some(CompileError::SubroutineTooDeep { node: 5, depth: 1 })
        );
    }

    #[test]
    fn test_subroutine_errors_name_the_parent() {
        let mut inner = Prototype::new("Inner", 2);
        inner.add_node(PrototypeNode::new("Missing", 1));

        let mut outer = Prototype::new("Outer", 1);
        outer.add_node(PrototypeNode::new("Subroutine", 5).with_subroutine(inner));

        match create_instance(&outer, &registry()) {
            Err(CompileError::Subroutine { node, source }) => {
                assert_eq!(node, 5);
                assert!(matches!(*source, CompileError::UnknownNodeType { node: 1, .. }));
            }
            other => panic!("unexpected result: {:?}", other.map(|g| g.node_count())),
        }
    }
}
