//! Compiled graph instances.
//!
//! A `GraphInstance` owns its node processors and a flat arena of value
//! slots. Every node output, graph input, local variable and unconnected
//! node input is one slot. Wiring is resolved at compile time into slot
//! indices: a node input simply reads the slot its upstream writes, so
//! each slot has exactly one writer and nodes never reference each other.

use std::collections::{HashMap, VecDeque};

use crate::config::RuntimeConfig;
use crate::event::{EventRoutes, EventTarget, OutgoingEvents};
use crate::identifier::{Identifier, NodeId};
use crate::node::{EmittedEvent, InitContext, NodeIo, NodeProcessor};
use crate::value::Value;

/// Index of a value slot in an instance's arena.
pub type SlotId = usize;

/// One node in the instance
pub struct GraphNode {
    pub id: NodeId,
    pub processor: Box<dyn NodeProcessor>,
    /// Slot read by each input plug, in layout order
    pub inputs: Vec<SlotId>,
    /// Slot written by each output plug, in layout order
    pub outputs: Vec<SlotId>,
    /// What the last `process` call reported consuming
    pub consumed: f32,
}

/// A live, wired graph compiled from a `Prototype`.
pub struct GraphInstance {
    name: String,

    nodes: Vec<GraphNode>,

    /// Value arena
    values: Vec<Value>,

    /// Compiled contents of every slot, restored by `reset`
    defaults: Vec<Value>,

    /// Node indices in dependency order
    eval_order: Vec<usize>,

    id_to_index: HashMap<NodeId, usize>,

    inputs: HashMap<Identifier, SlotId>,
    outputs: Vec<(Identifier, SlotId)>,
    local_variables: HashMap<Identifier, SlotId>,

    event_routes: EventRoutes,
    input_event_routes: HashMap<Identifier, Vec<EventTarget>>,
    outgoing: OutgoingEvents,

    /// Events waiting for delivery, tagged with the emitting node index
    pending: VecDeque<(usize, EmittedEvent)>,

    /// Scratch buffer nodes emit into
    emitted: Vec<EmittedEvent>,

    /// Deliveries left in the current tick
    hops_remaining: usize,

    max_event_hops: usize,
}

impl GraphInstance {
    pub(crate) fn new(name: impl Into<String>, config: &RuntimeConfig) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            values: Vec::new(),
            defaults: Vec::new(),
            eval_order: Vec::new(),
            id_to_index: HashMap::new(),
            inputs: HashMap::new(),
            outputs: Vec::new(),
            local_variables: HashMap::new(),
            event_routes: EventRoutes::new(),
            input_event_routes: HashMap::new(),
            outgoing: OutgoingEvents::new(config.event_queue_capacity),
            pending: VecDeque::new(),
            emitted: Vec::with_capacity(16),
            hops_remaining: config.max_event_hops,
            max_event_hops: config.max_event_hops,
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Construction (used by the compiler)
    // ═══════════════════════════════════════════════════════════════

    /// Allocate a slot holding `value`. Returns the slot id.
    pub(crate) fn allocate_slot(&mut self, value: Value) -> SlotId {
        let slot = self.values.len();
        self.defaults.push(value.clone());
        self.values.push(value);
        slot
    }

    /// Add a wired node. Returns the node index.
    pub(crate) fn add_node(
        &mut self,
        processor: Box<dyn NodeProcessor>,
        inputs: Vec<SlotId>,
        outputs: Vec<SlotId>,
        output_events: usize,
    ) -> usize {
        let idx = self.nodes.len();
        let id = processor.id();

        self.nodes.push(GraphNode {
            id,
            processor,
            inputs,
            outputs,
            consumed: 0.0,
        });
        self.event_routes.add_node(output_events);
        self.id_to_index.insert(id, idx);

        idx
    }

    pub(crate) fn bind_input(&mut self, id: Identifier, slot: SlotId) {
        self.inputs.insert(id, slot);
    }

    pub(crate) fn bind_output(&mut self, id: Identifier, slot: SlotId) {
        self.outputs.push((id, slot));
    }

    pub(crate) fn bind_local_variable(&mut self, id: Identifier, slot: SlotId) {
        self.local_variables.insert(id, slot);
    }

    /// Route output event `output` of node `node` to `target`. Returns false
    /// if the node has not been added or has no such output event.
    #[must_use]
    pub(crate) fn route_node_event(
        &mut self,
        node: usize,
        output: usize,
        target: EventTarget,
    ) -> bool {
        self.event_routes.connect(node, output, target)
    }

    /// Route graph input event `id` to `target`.
    pub(crate) fn route_graph_event(&mut self, id: Identifier, target: EventTarget) {
        self.input_event_routes.entry(id).or_default().push(target);
    }

    pub(crate) fn set_evaluation_order(&mut self, order: Vec<usize>) {
        self.eval_order = order;
    }

    // ═══════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in the order `process` runs them.
    pub fn evaluation_order(&self) -> Vec<NodeId> {
        self.eval_order.iter().map(|&i| self.nodes[i].id).collect()
    }

    /// What node `id` reported consuming on the last tick.
    pub fn node_consumed(&self, id: NodeId) -> Option<f32> {
        self.id_to_index.get(&id).map(|&i| self.nodes[i].consumed)
    }

    pub fn output_ids(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.outputs.iter().map(|&(id, _)| id)
    }

    pub fn has_input(&self, id: Identifier) -> bool {
        self.inputs.contains_key(&id)
    }

    pub fn has_local_variable(&self, id: Identifier) -> bool {
        self.local_variables.contains_key(&id)
    }

    // ═══════════════════════════════════════════════════════════════
    // Host API
    // ═══════════════════════════════════════════════════════════════

    /// Write a graph input. Returns false if the graph has no such input.
    pub fn set_input(&mut self, id: Identifier, value: impl Into<Value>) -> bool {
        match self.inputs.get(&id) {
            Some(&slot) => {
                self.values[slot] = value.into();
                true
            }
            None => {
                log::warn!("Graph '{}' has no input {}", self.name, id);
                false
            }
        }
    }

    /// Write a local variable. Returns false if the graph has no such
    /// variable.
    pub fn set_local_variable(&mut self, id: Identifier, value: impl Into<Value>) -> bool {
        match self.local_variables.get(&id) {
            Some(&slot) => {
                self.values[slot] = value.into();
                true
            }
            None => {
                log::warn!("Graph '{}' has no local variable {}", self.name, id);
                false
            }
        }
    }

    /// Current value of a graph output.
    pub fn read_output(&self, id: Identifier) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|&&(out, _)| out == id)
            .map(|&(_, slot)| &self.values[slot])
    }

    /// Initialize every node in dependency order.
    ///
    /// Safe to call again after the context changes.
    pub fn init(&mut self, ctx: &InitContext) {
        self.hops_remaining = self.max_event_hops;

        for i in 0..self.eval_order.len() {
            let idx = self.eval_order[i];
            let node = &mut self.nodes[idx];
            let mut io = NodeIo::new(
                &mut self.values,
                &node.inputs,
                &node.outputs,
                &mut self.emitted,
            );
            node.processor.init(ctx, &mut io);
            self.dispatch_events(idx);
        }
    }

    /// Run one tick: every node once, in dependency order.
    ///
    /// Returns the largest time step any node reported consuming, or 0 for
    /// an empty graph.
    pub fn process(&mut self, time_step: f32) -> f32 {
        self.hops_remaining = self.max_event_hops;
        let mut consumed = 0.0_f32;

        // Use index iteration to avoid cloning eval_order
        for i in 0..self.eval_order.len() {
            let idx = self.eval_order[i];
            let node = &mut self.nodes[idx];
            let mut io = NodeIo::new(
                &mut self.values,
                &node.inputs,
                &node.outputs,
                &mut self.emitted,
            );
            node.consumed = node.processor.process(&mut io, time_step);
            consumed = consumed.max(node.consumed);
            self.dispatch_events(idx);
        }

        consumed
    }

    /// Fire graph input event `id` into the graph. Returns false if nothing
    /// is bound to it.
    pub fn post_event(&mut self, id: Identifier) -> bool {
        let Some(targets) = self.input_event_routes.get(&id) else {
            log::warn!("Graph '{}' has no input event {}", self.name, id);
            return false;
        };

        let targets = targets.clone();
        self.hops_remaining = self.max_event_hops;
        for target in targets {
            if !self.deliver(target, id) {
                return true;
            }
        }
        self.flush_pending();
        true
    }

    /// Pop every queued outgoing event, oldest first.
    pub fn drain_events(&mut self) -> Vec<Identifier> {
        let mut events = Vec::with_capacity(self.outgoing.len());
        while let Some(event) = self.outgoing.pop() {
            events.push(event);
        }
        events
    }

    /// Hand every queued outgoing event to `handle`, oldest first.
    pub fn handle_outgoing_events(&mut self, mut handle: impl FnMut(Identifier)) {
        while let Some(event) = self.outgoing.pop() {
            handle(event);
        }
    }

    pub fn has_outgoing_events(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Reset all node state and restore every slot to its compiled value.
    pub fn reset(&mut self) {
        self.values.clone_from(&self.defaults);
        for node in &mut self.nodes {
            node.processor.reset();
            node.consumed = 0.0;
        }
        self.pending.clear();
        self.emitted.clear();
        self.outgoing.clear();
    }

    // ═══════════════════════════════════════════════════════════════
    // Event delivery
    // ═══════════════════════════════════════════════════════════════

    /// Deliver everything node `source` just emitted, and everything those
    /// deliveries emit in turn.
    fn dispatch_events(&mut self, source: usize) {
        self.pending
            .extend(self.emitted.drain(..).map(|event| (source, event)));
        self.flush_pending();
    }

    fn flush_pending(&mut self) {
        while let Some((node, event)) = self.pending.pop_front() {
            let count = self.event_routes.targets(node, event.output).len();
            for i in 0..count {
                let target = self.event_routes.targets(node, event.output)[i];
                if !self.deliver(target, event.event) {
                    return;
                }
            }
        }
    }

    /// Deliver one event. Returns false once the tick's budget is spent.
    fn deliver(&mut self, target: EventTarget, event: Identifier) -> bool {
        if self.hops_remaining == 0 {
            log::warn!(
                "Graph '{}' exceeded {} event deliveries, dropping {} pending",
                self.name,
                self.max_event_hops,
                self.pending.len() + 1
            );
            self.pending.clear();
            self.emitted.clear();
            return false;
        }
        self.hops_remaining -= 1;

        match target {
            EventTarget::GraphOutput(id) => {
                self.outgoing.push(id);
            }
            EventTarget::Node { node: idx, input } => {
                let node = &mut self.nodes[idx];
                let mut io = NodeIo::new(
                    &mut self.values,
                    &node.inputs,
                    &node.outputs,
                    &mut self.emitted,
                );
                node.processor.on_event(input, event, &mut io);
                self.pending
                    .extend(self.emitted.drain(..).map(|event| (idx, event)));
            }
        }
        true
    }
}

impl std::fmt::Debug for GraphInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphInstance")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("slots", &self.values.len())
            .field("eval_order", &self.evaluation_order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeLayout;

    /// Writes a counter to its output; emits on output event 0 every tick.
    struct Ticker {
        id: NodeId,
        ticks: i32,
    }

    impl NodeProcessor for Ticker {
        fn id(&self) -> NodeId {
            self.id
        }

        fn layout(&self) -> NodeLayout {
            NodeLayout::new()
                .output(Identifier::new("Ticks"), 0_i32)
                .output_event(Identifier::new("OnTick"))
        }

        fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32 {
            self.ticks += 1;
            io.set_output(0, self.ticks);
            io.emit(0, Identifier::new("Tick"));
            time_step * 0.5
        }

        fn reset(&mut self) {
            self.ticks = 0;
        }
    }

    /// Re-emits every event it receives.
    struct Echo {
        id: NodeId,
        received: usize,
    }

    impl NodeProcessor for Echo {
        fn id(&self) -> NodeId {
            self.id
        }

        fn layout(&self) -> NodeLayout {
            NodeLayout::new()
                .input_event(Identifier::new("In"))
                .output_event(Identifier::new("Out"))
        }

        fn process(&mut self, _io: &mut NodeIo, _time_step: f32) -> f32 {
            0.0
        }

        fn on_event(&mut self, _input: usize, event: Identifier, io: &mut NodeIo) {
            self.received += 1;
            io.emit(0, event);
        }
    }

    fn ticker_graph(config: &RuntimeConfig) -> GraphInstance {
        let mut graph = GraphInstance::new("Ticker", config);
        let out = graph.allocate_slot(Value::Int32(0));
        let idx = graph.add_node(Box::new(Ticker { id: 1, ticks: 0 }), vec![], vec![out], 1);
        graph.bind_output(Identifier::new("Ticks"), out);
        assert!(
            graph.route_node_event(idx, 0, EventTarget::GraphOutput(Identifier::new("Ticked"))),
        );
        graph.set_evaluation_order(vec![idx]);
        graph
    }

    #[test]
    fn test_process_reports_max_consumed() {
        let mut graph = ticker_graph(&RuntimeConfig::default());

        assert_eq!(graph.process(0.2), 0.1);
        assert_eq!(graph.node_consumed(1), Some(0.1));
        assert_eq!(graph.read_output(Identifier::new("Ticks")), Some(&Value::Int32(1)));
        assert_eq!(graph.drain_events(), vec![Identifier::new("Ticked")]);
    }

    #[test]
    fn test_empty_graph_consumes_nothing() {
        let mut graph = GraphInstance::new("Empty", &RuntimeConfig::default());
        assert_eq!(graph.process(1.0), 0.0);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_reset_restores_slots() {
        let mut graph = ticker_graph(&RuntimeConfig::default());
        graph.process(0.1);
        graph.process(0.1);
        graph.reset();

        assert_eq!(graph.read_output(Identifier::new("Ticks")), Some(&Value::Int32(0)));
        assert!(!graph.has_outgoing_events());
        graph.process(0.1);
        assert_eq!(graph.read_output(Identifier::new("Ticks")), Some(&Value::Int32(1)));
    }

    #[test]
    fn test_outgoing_queue_drops_overflow() {
        let config = RuntimeConfig::default().with_event_queue_capacity(2);
        let mut graph = ticker_graph(&config);
        for _ in 0..5 {
            graph.process(0.1);
        }

        let mut seen = 0;
        graph.handle_outgoing_events(|_| seen += 1);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_event_cycle_is_bounded() {
        let config = RuntimeConfig::default().with_max_event_hops(10);
        let mut graph = GraphInstance::new("Loop", &config);
        let a = graph.add_node(Box::new(Echo { id: 1, received: 0 }), vec![], vec![], 1);
        let b = graph.add_node(Box::new(Echo { id: 2, received: 0 }), vec![], vec![], 1);
        assert!(graph.route_node_event(a, 0, EventTarget::Node { node: b, input: 0 }));
        assert!(graph.route_node_event(b, 0, EventTarget::Node { node: a, input: 0 }));
        graph.route_graph_event(Identifier::new("Start"), EventTarget::Node { node: a, input: 0 });
        graph.set_evaluation_order(vec![a, b]);

        assert!(graph.post_event(Identifier::new("Start")));
        assert!(!graph.post_event(Identifier::new("Missing")));

        // The loop stops once the budget is spent and the graph keeps running
        assert_eq!(graph.process(0.1), 0.0);
    }

    #[test]
    fn test_event_routes_need_added_nodes() {
        let mut graph = GraphInstance::new("Routes", &RuntimeConfig::default());
        let target = EventTarget::GraphOutput(Identifier::new("Out"));
        assert!(!graph.route_node_event(0, 0, target));

        let idx = graph.add_node(Box::new(Echo { id: 1, received: 0 }), vec![], vec![], 1);
        assert!(graph.route_node_event(idx, 0, target));
        assert!(!graph.route_node_event(idx, 1, target));
    }

    #[test]
    fn test_unknown_writes_are_rejected() {
        let mut graph = ticker_graph(&RuntimeConfig::default());
        assert!(!graph.set_input(Identifier::new("Nope"), 1.0_f32));
        assert!(!graph.set_local_variable(Identifier::new("Nope"), 1.0_f32));
    }
}
