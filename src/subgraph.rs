// src/subgraph.rs
//
// A nested graph instance exposed to its parent as a single opaque node.

use crate::graph::GraphInstance;
use crate::identifier::{Identifier, NodeId};
use crate::node::{InitContext, NodeIo, NodeLayout, NodeProcessor};
use crate::prototype::{ConnectionKind, Prototype};

/// Runs a compiled subroutine.
///
/// The nested graph's value inputs and outputs become this node's plugs.
/// Graph inputs that feed event wires become input events, graph outputs
/// fed by event wires become output events.
pub struct SubgraphNode {
    id: NodeId,
    graph: GraphInstance,
    layout: NodeLayout,
}

impl SubgraphNode {
    pub fn new(id: NodeId, graph: GraphInstance, prototype: &Prototype) -> Self {
        Self {
            id,
            graph,
            layout: subgraph_layout(prototype),
        }
    }

    pub fn graph(&self) -> &GraphInstance {
        &self.graph
    }

    /// Forward the nested graph's outgoing events as this node's events.
    fn forward_events(&mut self, io: &mut NodeIo) {
        let layout = &self.layout;
        self.graph.handle_outgoing_events(|event| {
            if let Some(output) = layout.output_event_index(event) {
                io.emit(output, event);
            }
        });
    }
}

fn subgraph_layout(prototype: &Prototype) -> NodeLayout {
    let is_event_input = |id: Identifier| {
        prototype.connections.iter().any(|c| {
            matches!(
                c.kind,
                ConnectionKind::GraphEvent_NodeEvent | ConnectionKind::GraphEvent_GraphEvent
            ) && c.source.endpoint_id == id
        })
    };
    let is_event_output = |id: Identifier| {
        prototype.connections.iter().any(|c| {
            matches!(
                c.kind,
                ConnectionKind::NodeEvent_GraphEvent | ConnectionKind::GraphEvent_GraphEvent
            ) && c.destination.endpoint_id == id
        })
    };

    let mut layout = NodeLayout::new();
    for input in &prototype.inputs {
        if is_event_input(input.id) {
            layout = layout.input_event(input.id);
        } else {
            layout = layout.input(input.id, input.default_value.clone());
        }
    }
    for output in &prototype.outputs {
        if is_event_output(output.id) {
            layout = layout.output_event(output.id);
        } else {
            layout = layout.output(output.id, output.default_value.clone());
        }
    }
    layout
}

impl NodeProcessor for SubgraphNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        self.layout.clone()
    }

    fn init(&mut self, ctx: &InitContext, io: &mut NodeIo) {
        self.graph.init(ctx);
        self.forward_events(io);
    }

    /// Copies inputs in, runs the nested graph on its own dependency order
    /// and copies outputs out. Reports what the nested graph consumed.
    fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32 {
        for (i, plug) in self.layout.inputs.iter().enumerate() {
            self.graph.set_input(plug.id, io.input(i).clone());
        }

        let consumed = self.graph.process(time_step);

        for (i, plug) in self.layout.outputs.iter().enumerate() {
            if let Some(value) = self.graph.read_output(plug.id) {
                io.set_output(i, value.clone());
            }
        }

        self.forward_events(io);
        consumed
    }

    fn on_event(&mut self, input: usize, _event: Identifier, io: &mut NodeIo) {
        if let Some(&id) = self.layout.input_events.get(input) {
            self.graph.post_event(id);
            self.forward_events(io);
        }
    }

    fn reset(&mut self) {
        self.graph.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::identifier::GRAPH_NODE_ID;
    use crate::value::Value;

    fn relay() -> Prototype {
        let mut proto = Prototype::new("Relay", 3);
        proto.add_input("Level", 0.5_f32);
        proto.add_input("Start", Value::Void);
        proto.add_output("Level", 0.0_f32);
        proto.add_output("Started", Value::Void);
        proto.connect(
            ConnectionKind::GraphValue_GraphValue,
            (GRAPH_NODE_ID, "Level"),
            (GRAPH_NODE_ID, "Level"),
        );
        proto.connect(
            ConnectionKind::GraphEvent_GraphEvent,
            (GRAPH_NODE_ID, "Start"),
            (GRAPH_NODE_ID, "Started"),
        );
        proto
    }

    #[test]
    fn test_event_endpoints_become_event_plugs() {
        let layout = subgraph_layout(&relay());

        assert_eq!(layout.inputs.len(), 1);
        assert_eq!(layout.inputs[0].default_value, Value::Float32(0.5));
        assert_eq!(layout.input_event_index(Identifier::new("Start")), Some(0));
        assert_eq!(layout.output_index(Identifier::new("Level")), Some(0));
        assert_eq!(layout.output_event_index(Identifier::new("Started")), Some(0));
    }

    #[test]
    fn test_nested_graph_is_owned() {
        let graph = GraphInstance::new("Relay", &RuntimeConfig::default());
        let node = SubgraphNode::new(4, graph, &relay());

        assert_eq!(node.id(), 4);
        assert_eq!(node.graph().name(), "Relay");
        assert_eq!(node.graph().node_count(), 0);
    }
}
