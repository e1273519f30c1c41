// src/main.rs
//
// Demo: build a small prototype, compile it and run a few ticks.

use dataflow::nodes::{node_types, plugs};
use dataflow::{
    ConnectionKind, GRAPH_NODE_ID, Identifier, NodeRegistry, Prototype, PrototypeNode,
    create_instance, register_standard_nodes,
};

const TIME_STEP: f32 = 1.0 / 60.0;

/// ===============================
/// Prototype
/// ===============================

/// (A + B) * Scale -> Result, with a counter driven by the `Tick` event.
fn demo_prototype() -> Prototype {
    let mut proto = Prototype::new("Demo", 1);
    proto.add_input("A", 3_i32);
    proto.add_input("B", 4_i32);
    proto.add_input("Tick", false);
    proto.add_output("Result", 0_i32);
    proto.add_output("Ticks", 0_i32);

    proto.add_node(PrototypeNode::new(node_types::ADD_INT, 1));
    proto.add_node(
        PrototypeNode::new(node_types::MULTIPLY_INT, 2).with_override(plugs::MULTIPLIER, 10_i32),
    );
    proto.add_node(PrototypeNode::new(node_types::TRIGGER_COUNTER, 3));

    proto.connect(ConnectionKind::GraphValue_NodeValue, (GRAPH_NODE_ID, "A"), (1, plugs::VALUE1));
    proto.connect(ConnectionKind::GraphValue_NodeValue, (GRAPH_NODE_ID, "B"), (1, plugs::VALUE2));
    proto.connect(ConnectionKind::NodeValue_NodeValue, (1, plugs::OUT), (2, plugs::VALUE));
    proto.connect(ConnectionKind::NodeValue_GraphValue, (2, plugs::OUT), (GRAPH_NODE_ID, "Result"));
    proto.connect(
        ConnectionKind::GraphEvent_NodeEvent,
        (GRAPH_NODE_ID, "Tick"),
        (3, plugs::TRIGGER),
    );
    proto.connect(
        ConnectionKind::NodeValue_GraphValue,
        (3, plugs::COUNT),
        (GRAPH_NODE_ID, "Ticks"),
    );
    proto
}

/// ===============================
/// Main
/// ===============================

fn main() {
    dataflow::logging::init();

    let mut registry = NodeRegistry::new();
    register_standard_nodes(&mut registry);

    let proto = demo_prototype();
    let mut graph = match create_instance(&proto, &registry) {
        Ok(graph) => graph,
        Err(e) => {
            log::error!("Error compiling graph: {}", e);
            return;
        }
    };

    log::info!("Evaluation order: {:?}", graph.evaluation_order());

    for tick in 0..3 {
        graph.set_input(Identifier::new("A"), tick);
        graph.post_event(Identifier::new("Tick"));
        let consumed = graph.process(TIME_STEP);

        log::info!(
            "Tick {}: Result = {:?}, Ticks = {:?}, consumed {}",
            tick,
            graph.read_output(Identifier::new("Result")),
            graph.read_output(Identifier::new("Ticks")),
            consumed
        );
    }
}
