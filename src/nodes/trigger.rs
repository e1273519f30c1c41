// Trigger nodes (turn values into events and count events)

use crate::identifier::{Identifier, NodeId};
use crate::node::{InitContext, NodeIo, NodeLayout, NodeProcessor};

use super::plugs;

/// Event ids carried by trigger outputs.
pub mod ids {
    use crate::identifier::Identifier;

    pub const TRUE: Identifier = Identifier::new("True");
    pub const FALSE: Identifier = Identifier::new("False");
    pub const TRIGGER: Identifier = Identifier::new("Trigger");
    pub const RESET: Identifier = Identifier::new("Reset");
}

// ═══════════════════════════════════════════════════════════════════
// Bool Trigger
// ═══════════════════════════════════════════════════════════════════

/// Emits `True` on `OnTrue` or `False` on `OnFalse` every tick, depending on
/// `Value`.
pub struct BoolTrigger {
    id: NodeId,
}

impl BoolTrigger {
    const ON_TRUE: usize = 0;
    const ON_FALSE: usize = 1;

    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id })
    }
}

impl NodeProcessor for BoolTrigger {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::VALUE, false)
            .output_event(plugs::ON_TRUE)
            .output_event(plugs::ON_FALSE)
    }

    fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32 {
        if io.input_as::<bool>(0) {
            io.emit(Self::ON_TRUE, ids::TRUE);
        } else {
            io.emit(Self::ON_FALSE, ids::FALSE);
        }
        time_step
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trigger Counter
// ═══════════════════════════════════════════════════════════════════

/// Counts `Trigger` events.
///
/// `Value` is `StartValue + Count * StepSize`. When `ResetCount` is positive
/// the counter resets itself once `Count` reaches it.
pub struct TriggerCounter {
    id: NodeId,
    count: i32,
}

impl TriggerCounter {
    // Input events
    const TRIGGER: usize = 0;
    const RESET: usize = 1;

    // Value inputs
    const START_VALUE: usize = 0;
    const STEP_SIZE: usize = 1;
    const RESET_COUNT: usize = 2;

    // Value outputs
    const COUNT: usize = 0;
    const VALUE: usize = 1;

    // Output events
    const ON_TRIGGER: usize = 0;
    const ON_RESET: usize = 1;

    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id, count: 0 })
    }

    fn publish(&self, io: &mut NodeIo) {
        let start = io.input_as::<f32>(Self::START_VALUE);
        let step = io.input_as::<f32>(Self::STEP_SIZE);
        io.set_output(Self::COUNT, self.count);
        io.set_output(Self::VALUE, start + step * self.count as f32);
    }

    fn reset_count(&mut self, io: &mut NodeIo) {
        self.count = 0;
        self.publish(io);
        io.emit(Self::ON_RESET, ids::RESET);
    }
}

impl NodeProcessor for TriggerCounter {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input_event(plugs::TRIGGER)
            .input_event(plugs::RESET)
            .input(plugs::START_VALUE, 0.0_f32)
            .input(plugs::STEP_SIZE, 1.0_f32)
            .input(plugs::RESET_COUNT, 0_i32)
            .output(plugs::COUNT, 0_i32)
            .output(plugs::VALUE, 0.0_f32)
            .output_event(plugs::ON_TRIGGER)
            .output_event(plugs::ON_RESET)
    }

    fn init(&mut self, _ctx: &InitContext, io: &mut NodeIo) {
        self.count = 0;
        self.publish(io);
    }

    fn process(&mut self, _io: &mut NodeIo, time_step: f32) -> f32 {
        time_step
    }

    fn on_event(&mut self, input: usize, _event: Identifier, io: &mut NodeIo) {
        match input {
            Self::TRIGGER => {
                self.count = self.count.wrapping_add(1);
                self.publish(io);
                io.emit(Self::ON_TRIGGER, ids::TRIGGER);

                let reset_at = io.input_as::<i32>(Self::RESET_COUNT);
                if reset_at > 0 && self.count >= reset_at {
                    self.reset_count(io);
                }
            }
            Self::RESET => self.reset_count(io),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}
