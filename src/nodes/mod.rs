// src/nodes/mod.rs
//
// Standard node library.

pub mod array;
pub mod logic;
pub mod math;
pub mod trigger;

pub use array::Get;
pub use logic::{BoolLogic, Compare, CompareOp};
pub use math::{
    BinaryMath, BinaryOp, BpmToSeconds, Clamp, FrequencyToNote, Log, MapRange, NoteToFrequency,
    Number, Power,
};
pub use trigger::{BoolTrigger, TriggerCounter};

use crate::node_factory::NodeRegistry;

// ═══════════════════════════════════════════════════════════════════
// Node Type IDs
// ═══════════════════════════════════════════════════════════════════

pub mod node_types {
    use crate::identifier::Identifier;

    pub const ADD_FLOAT: Identifier = Identifier::new("Add (Float)");
    pub const ADD_INT: Identifier = Identifier::new("Add (Int)");
    pub const SUBTRACT_FLOAT: Identifier = Identifier::new("Subtract (Float)");
    pub const SUBTRACT_INT: Identifier = Identifier::new("Subtract (Int)");
    pub const MULTIPLY_FLOAT: Identifier = Identifier::new("Multiply (Float)");
    pub const MULTIPLY_INT: Identifier = Identifier::new("Multiply (Int)");
    pub const DIVIDE_FLOAT: Identifier = Identifier::new("Divide (Float)");
    pub const DIVIDE_INT: Identifier = Identifier::new("Divide (Int)");
    pub const MODULO_INT: Identifier = Identifier::new("Modulo (Int)");
    pub const MIN_FLOAT: Identifier = Identifier::new("Min (Float)");
    pub const MIN_INT: Identifier = Identifier::new("Min (Int)");
    pub const MAX_FLOAT: Identifier = Identifier::new("Max (Float)");
    pub const MAX_INT: Identifier = Identifier::new("Max (Int)");
    pub const CLAMP_FLOAT: Identifier = Identifier::new("Clamp (Float)");
    pub const CLAMP_INT: Identifier = Identifier::new("Clamp (Int)");
    pub const MAP_RANGE_FLOAT: Identifier = Identifier::new("Map Range (Float)");
    pub const MAP_RANGE_INT: Identifier = Identifier::new("Map Range (Int)");
    pub const POWER: Identifier = Identifier::new("Power (Float)");
    pub const LOG: Identifier = Identifier::new("Log (Float)");

    pub const NOTE_TO_FREQUENCY_FLOAT: Identifier = Identifier::new("Note To Frequency (Float)");
    pub const NOTE_TO_FREQUENCY_INT: Identifier = Identifier::new("Note To Frequency (Int)");
    pub const FREQUENCY_TO_NOTE: Identifier = Identifier::new("Frequency To Note");
    pub const BPM_TO_SECONDS: Identifier = Identifier::new("BPM to Seconds");

    pub const CHECK_EQUAL_FLOAT: Identifier = Identifier::new("Check Equal (Float)");
    pub const CHECK_EQUAL_INT: Identifier = Identifier::new("Check Equal (Int)");
    pub const CHECK_NOT_EQUAL_FLOAT: Identifier = Identifier::new("Check Not Equal (Float)");
    pub const CHECK_NOT_EQUAL_INT: Identifier = Identifier::new("Check Not Equal (Int)");
    pub const CHECK_LESS_FLOAT: Identifier = Identifier::new("Check Less (Float)");
    pub const CHECK_LESS_INT: Identifier = Identifier::new("Check Less (Int)");
    pub const CHECK_LESS_EQUAL_FLOAT: Identifier = Identifier::new("Check Less Equal (Float)");
    pub const CHECK_LESS_EQUAL_INT: Identifier = Identifier::new("Check Less Equal (Int)");
    pub const CHECK_GREATER_FLOAT: Identifier = Identifier::new("Check Greater (Float)");
    pub const CHECK_GREATER_INT: Identifier = Identifier::new("Check Greater (Int)");
    pub const CHECK_GREATER_EQUAL_FLOAT: Identifier =
        Identifier::new("Check Greater Equal (Float)");
    pub const CHECK_GREATER_EQUAL_INT: Identifier = Identifier::new("Check Greater Equal (Int)");
    pub const AND: Identifier = Identifier::new("And");
    pub const OR: Identifier = Identifier::new("Or");
    pub const NOT: Identifier = Identifier::new("Not");

    pub const BOOL_TRIGGER: Identifier = Identifier::new("Bool Trigger");
    pub const TRIGGER_COUNTER: Identifier = Identifier::new("Trigger Counter");

    pub const GET_FLOAT: Identifier = Identifier::new("Get (Float)");
    pub const GET_INT: Identifier = Identifier::new("Get (Int)");
    pub const GET_INT64: Identifier = Identifier::new("Get (Int64)");
}

// ═══════════════════════════════════════════════════════════════════
// Plug IDs (shared across node types)
// ═══════════════════════════════════════════════════════════════════

pub mod plugs {
    use crate::identifier::Identifier;

    pub const VALUE: Identifier = Identifier::new("Value");
    pub const VALUE1: Identifier = Identifier::new("Value1");
    pub const VALUE2: Identifier = Identifier::new("Value2");
    pub const OUT: Identifier = Identifier::new("Out");
    pub const MULTIPLIER: Identifier = Identifier::new("Multiplier");
    pub const DIVISOR: Identifier = Identifier::new("Divisor");
    pub const MIN: Identifier = Identifier::new("Min");
    pub const MAX: Identifier = Identifier::new("Max");
    pub const BASE: Identifier = Identifier::new("Base");
    pub const EXPONENT: Identifier = Identifier::new("Exponent");

    // Map Range
    pub const IN_RANGE_MIN: Identifier = Identifier::new("InRangeMin");
    pub const IN_RANGE_MAX: Identifier = Identifier::new("InRangeMax");
    pub const OUT_RANGE_MIN: Identifier = Identifier::new("OutRangeMin");
    pub const OUT_RANGE_MAX: Identifier = Identifier::new("OutRangeMax");
    pub const CLAMPED: Identifier = Identifier::new("Clamped");

    // Music
    pub const MIDI_NOTE: Identifier = Identifier::new("MIDINote");
    pub const FREQUENCY: Identifier = Identifier::new("Frequency");
    pub const BPM: Identifier = Identifier::new("BPM");
    pub const SECONDS: Identifier = Identifier::new("Seconds");

    // Triggers
    pub const TRIGGER: Identifier = Identifier::new("Trigger");
    pub const RESET: Identifier = Identifier::new("Reset");
    pub const ON_TRUE: Identifier = Identifier::new("OnTrue");
    pub const ON_FALSE: Identifier = Identifier::new("OnFalse");
    pub const ON_TRIGGER: Identifier = Identifier::new("OnTrigger");
    pub const ON_RESET: Identifier = Identifier::new("OnReset");
    pub const START_VALUE: Identifier = Identifier::new("StartValue");
    pub const STEP_SIZE: Identifier = Identifier::new("StepSize");
    pub const RESET_COUNT: Identifier = Identifier::new("ResetCount");
    pub const COUNT: Identifier = Identifier::new("Count");

    // Arrays
    pub const ARRAY: Identifier = Identifier::new("Array");
    pub const INDEX: Identifier = Identifier::new("Index");
    pub const ELEMENT: Identifier = Identifier::new("Element");
}

// ═══════════════════════════════════════════════════════════════════
// Registry Population
// ═══════════════════════════════════════════════════════════════════

/// Populate the registry with all standard node types.
pub fn register_standard_nodes(registry: &mut NodeRegistry) {
    register_math(registry);
    register_logic(registry);
    register_triggers(registry);
    register_arrays(registry);
}

fn register_math(registry: &mut NodeRegistry) {
    use math::*;

    registry.register(node_types::ADD_FLOAT, add::<f32>);
    registry.register(node_types::ADD_INT, add::<i32>);
    registry.register(node_types::SUBTRACT_FLOAT, subtract::<f32>);
    registry.register(node_types::SUBTRACT_INT, subtract::<i32>);
    registry.register(node_types::MULTIPLY_FLOAT, multiply::<f32>);
    registry.register(node_types::MULTIPLY_INT, multiply::<i32>);
    registry.register(node_types::DIVIDE_FLOAT, divide::<f32>);
    registry.register(node_types::DIVIDE_INT, divide::<i32>);
    registry.register(node_types::MODULO_INT, modulo::<i32>);
    registry.register(node_types::MIN_FLOAT, min_node::<f32>);
    registry.register(node_types::MIN_INT, min_node::<i32>);
    registry.register(node_types::MAX_FLOAT, max_node::<f32>);
    registry.register(node_types::MAX_INT, max_node::<i32>);
    registry.register(node_types::CLAMP_FLOAT, Clamp::<f32>::create);
    registry.register(node_types::CLAMP_INT, Clamp::<i32>::create);
    registry.register(node_types::MAP_RANGE_FLOAT, MapRange::<f32>::create);
    registry.register(node_types::MAP_RANGE_INT, MapRange::<i32>::create);
    registry.register(node_types::POWER, Power::create);
    registry.register(node_types::LOG, Log::create);

    registry.register(node_types::NOTE_TO_FREQUENCY_FLOAT, NoteToFrequency::<f32>::create);
    registry.register(node_types::NOTE_TO_FREQUENCY_INT, NoteToFrequency::<i32>::create);
    registry.register(node_types::FREQUENCY_TO_NOTE, FrequencyToNote::create);
    registry.register(node_types::BPM_TO_SECONDS, BpmToSeconds::create);
}

fn register_logic(registry: &mut NodeRegistry) {
    use logic::*;

    registry.register(node_types::CHECK_EQUAL_FLOAT, check_equal::<f32>);
    registry.register(node_types::CHECK_EQUAL_INT, check_equal::<i32>);
    registry.register(node_types::CHECK_NOT_EQUAL_FLOAT, check_not_equal::<f32>);
    registry.register(node_types::CHECK_NOT_EQUAL_INT, check_not_equal::<i32>);
    registry.register(node_types::CHECK_LESS_FLOAT, check_less::<f32>);
    registry.register(node_types::CHECK_LESS_INT, check_less::<i32>);
    registry.register(node_types::CHECK_LESS_EQUAL_FLOAT, check_less_equal::<f32>);
    registry.register(node_types::CHECK_LESS_EQUAL_INT, check_less_equal::<i32>);
    registry.register(node_types::CHECK_GREATER_FLOAT, check_greater::<f32>);
    registry.register(node_types::CHECK_GREATER_INT, check_greater::<i32>);
    registry.register(node_types::CHECK_GREATER_EQUAL_FLOAT, check_greater_equal::<f32>);
    registry.register(node_types::CHECK_GREATER_EQUAL_INT, check_greater_equal::<i32>);
    registry.register(node_types::AND, BoolLogic::and);
    registry.register(node_types::OR, BoolLogic::or);
    registry.register(node_types::NOT, BoolLogic::not);
}

fn register_triggers(registry: &mut NodeRegistry) {
    registry.register(node_types::BOOL_TRIGGER, BoolTrigger::create);
    registry.register(node_types::TRIGGER_COUNTER, TriggerCounter::create);
}

fn register_arrays(registry: &mut NodeRegistry) {
    registry.register(node_types::GET_FLOAT, Get::<f32>::create);
    registry.register(node_types::GET_INT, Get::<i32>::create);
    registry.register(node_types::GET_INT64, Get::<i64>::create);
}
