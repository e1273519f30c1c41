// src/event.rs
//
// Event routing for graph instances.
//
// Events are fire-and-forget notifications. They do not take part in the
// per-tick evaluation order, so event wires may form cycles; a delivery
// budget keeps such cycles from spinning forever.

use std::collections::VecDeque;

use crate::identifier::Identifier;

/// Where an emitted event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    /// Input event `input` of the node at index `node`
    Node { node: usize, input: usize },
    /// Graph-level output event, surfaced to the host
    GraphOutput(Identifier),
}

/// Event routing table: for each node, for each of its output events, the
/// targets in connection order.
#[derive(Debug, Default)]
pub struct EventRoutes {
    routes: Vec<Vec<Vec<EventTarget>>>,
}

impl EventRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve routing rows for a node with `output_events` output events.
    pub fn add_node(&mut self, output_events: usize) {
        self.routes.push(vec![Vec::new(); output_events]);
    }

    /// Add a route. Returns false if the node or its output event has no
    /// routing row.
    #[must_use]
    pub fn connect(&mut self, node: usize, output: usize, target: EventTarget) -> bool {
        match self.routes.get_mut(node).and_then(|r| r.get_mut(output)) {
            Some(row) => {
                row.push(target);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn targets(&self, node: usize, output: usize) -> &[EventTarget] {
        self.routes
            .get(node)
            .and_then(|r| r.get(output))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Bounded FIFO of graph output event ids waiting for the host.
#[derive(Debug)]
pub struct OutgoingEvents {
    queue: VecDeque<Identifier>,
    capacity: usize,
}

impl OutgoingEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue an event. Returns false (and drops the event) when full.
    pub fn push(&mut self, event: Identifier) -> bool {
        if self.queue.len() >= self.capacity {
            log::warn!("Outgoing event queue full, dropping {}", event);
            return false;
        }
        self.queue.push_back(event);
        true
    }

    pub fn pop(&mut self) -> Option<Identifier> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_queue_is_bounded() {
        let mut queue = OutgoingEvents::new(2);
        let id = Identifier::new("Done");

        assert!(queue.push(id));
        assert!(queue.push(id));
        assert!(!queue.push(id));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some(id));
        assert!(queue.push(id));
    }

    #[test]
    fn test_routes_keep_connection_order() {
        let mut routes = EventRoutes::new();
        routes.add_node(2);
        routes.add_node(0);

        let out = Identifier::new("Out");
        assert!(routes.connect(0, 1, EventTarget::GraphOutput(out)));
        assert!(routes.connect(0, 1, EventTarget::Node { node: 1, input: 0 }));
        // Rows that were never reserved are refused
        assert!(!routes.connect(1, 0, EventTarget::GraphOutput(out)));
        assert!(!routes.connect(2, 0, EventTarget::GraphOutput(out)));

        assert_eq!(
            routes.targets(0, 1),
            &[
                EventTarget::GraphOutput(out),
                EventTarget::Node { node: 1, input: 0 }
            ]
        );
        assert!(routes.targets(0, 0).is_empty());
        assert!(routes.targets(1, 0).is_empty());
        assert!(routes.targets(7, 0).is_empty());
    }
}
