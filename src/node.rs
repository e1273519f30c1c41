// src/node.rs

use crate::graph::SlotId;
use crate::identifier::{Identifier, NodeId};
use crate::value::{Scalar, Value};

/// Read-only view of a skeleton, handed to animation nodes at init time.
pub trait SkeletonView: Send + Sync {
    fn bone_count(&self) -> usize;

    /// Index of a bone by name.
    fn bone_index(&self, name: &str) -> Option<usize>;
}

/// Domain context passed to nodes during initialization.
#[derive(Clone, Copy)]
pub struct InitContext<'a> {
    /// Sample rate for audio graphs
    pub sample_rate: f64,

    /// Skeleton for animation graphs
    pub skeleton: Option<&'a dyn SkeletonView>,
}

impl<'a> InitContext<'a> {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            skeleton: None,
        }
    }

    pub fn with_skeleton(mut self, skeleton: &'a dyn SkeletonView) -> Self {
        self.skeleton = Some(skeleton);
        self
    }
}

impl Default for InitContext<'_> {
    fn default() -> Self {
        Self::new(48_000.0)
    }
}

impl std::fmt::Debug for InitContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitContext")
            .field("sample_rate", &self.sample_rate)
            .field("skeleton", &self.skeleton.map(|s| s.bone_count()))
            .finish()
    }
}

/// One value plug of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugInfo {
    pub id: Identifier,
    /// Runtime default; its type is the plug's declared type
    pub default_value: Value,
}

impl PlugInfo {
    pub fn new(id: Identifier, default_value: impl Into<Value>) -> Self {
        Self {
            id,
            default_value: default_value.into(),
        }
    }
}

/// The plugs a node exposes, in index order.
///
/// Indices into these lists are what `NodeIo` and `on_event` use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeLayout {
    pub inputs: Vec<PlugInfo>,
    pub outputs: Vec<PlugInfo>,
    pub input_events: Vec<Identifier>,
    pub output_events: Vec<Identifier>,
}

impl NodeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, id: Identifier, default_value: impl Into<Value>) -> Self {
        self.inputs.push(PlugInfo::new(id, default_value));
        self
    }

    pub fn output(mut self, id: Identifier, default_value: impl Into<Value>) -> Self {
        self.outputs.push(PlugInfo::new(id, default_value));
        self
    }

    pub fn input_event(mut self, id: Identifier) -> Self {
        self.input_events.push(id);
        self
    }

    pub fn output_event(mut self, id: Identifier) -> Self {
        self.output_events.push(id);
        self
    }

    pub fn input_index(&self, id: Identifier) -> Option<usize> {
        self.inputs.iter().position(|p| p.id == id)
    }

    pub fn output_index(&self, id: Identifier) -> Option<usize> {
        self.outputs.iter().position(|p| p.id == id)
    }

    pub fn input_event_index(&self, id: Identifier) -> Option<usize> {
        self.input_events.iter().position(|&e| e == id)
    }

    pub fn output_event_index(&self, id: Identifier) -> Option<usize> {
        self.output_events.iter().position(|&e| e == id)
    }
}

/// An event a node emitted on one of its output events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedEvent {
    pub output: usize,
    pub event: Identifier,
}

static VOID: Value = Value::Void;

/// A node's window onto the instance's value arena.
///
/// Inputs resolve to whatever slot the compiler bound them to (an upstream
/// output, a graph input, a local variable, or the node's own default
/// slot). Outputs are slots owned by the node.
pub struct NodeIo<'a> {
    values: &'a mut [Value],
    inputs: &'a [SlotId],
    outputs: &'a [SlotId],
    emitted: &'a mut Vec<EmittedEvent>,
}

impl<'a> NodeIo<'a> {
    pub fn new(
        values: &'a mut [Value],
        inputs: &'a [SlotId],
        outputs: &'a [SlotId],
        emitted: &'a mut Vec<EmittedEvent>,
    ) -> Self {
        Self {
            values,
            inputs,
            outputs,
            emitted,
        }
    }

    /// Current value at input `index`. Out-of-range reads see `Value::Void`.
    #[inline]
    pub fn input(&self, index: usize) -> &Value {
        self.inputs
            .get(index)
            .and_then(|&slot| self.values.get(slot))
            .unwrap_or(&VOID)
    }

    #[inline]
    pub fn input_as<T: Scalar>(&self, index: usize) -> T {
        T::from_value(self.input(index))
    }

    #[inline]
    pub fn output(&self, index: usize) -> &Value {
        self.outputs
            .get(index)
            .and_then(|&slot| self.values.get(slot))
            .unwrap_or(&VOID)
    }

    #[inline]
    pub fn set_output(&mut self, index: usize, value: impl Into<Value>) {
        if let Some(&slot) = self.outputs.get(index) {
            if let Some(target) = self.values.get_mut(slot) {
                *target = value.into();
            }
        }
    }

    /// Fire output event `output` carrying `event`.
    ///
    /// Delivery happens after the current `process`/`on_event` call returns.
    #[inline]
    pub fn emit(&mut self, output: usize, event: Identifier) {
        self.emitted.push(EmittedEvent { output, event });
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }
}

/// Core node trait.
///
/// Nodes:
/// - are created unwired by the factory
/// - do NOT know about other nodes or the prototype
/// - read inputs and write outputs only through `NodeIo`
/// - never fail at runtime; numeric edge cases produce sentinels
pub trait NodeProcessor: Send {
    /// Instance id this node was created with.
    fn id(&self) -> NodeId;

    /// Plugs this node exposes. Called once at compile time.
    fn layout(&self) -> NodeLayout;

    /// Called once after wiring, and again whenever the domain context
    /// changes. Must be idempotent.
    fn init(&mut self, _ctx: &InitContext, _io: &mut NodeIo) {}

    /// Evaluate one tick.
    ///
    /// The engine guarantees every upstream value input has already been
    /// written this tick. Returns how much of `time_step` was consumed.
    fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32;

    /// An event arrived on input event `input`.
    fn on_event(&mut self, _input: usize, _event: Identifier, _io: &mut NodeIo) {}

    /// Reset internal state (host stop/seek).
    fn reset(&mut self) {}
}
