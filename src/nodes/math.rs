// Math nodes (arithmetic, ranges, music helpers)
//
// Math nodes report consuming none of the time step; they have no timeline.

use std::marker::PhantomData;

use crate::identifier::{Identifier, NodeId};
use crate::node::{NodeIo, NodeLayout, NodeProcessor};
use crate::value::Scalar;

use super::plugs;

/// Scalar payloads that support the arithmetic the math nodes need.
///
/// Integer arithmetic wraps; division and remainder by zero return `None`
/// so callers can substitute the sentinel.
pub trait Number: Scalar {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn checked_div(self, rhs: Self) -> Option<Self>;
    fn checked_rem(self, rhs: Self) -> Option<Self>;
}

impl Number for f32 {
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }

    fn checked_div(self, rhs: Self) -> Option<Self> {
        (rhs != 0.0).then(|| self / rhs)
    }

    fn checked_rem(self, rhs: Self) -> Option<Self> {
        (rhs != 0.0).then(|| self % rhs)
    }
}

macro_rules! impl_integer_number {
    ($($t:ty),*) => {$(
        impl Number for $t {
            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            fn checked_div(self, rhs: Self) -> Option<Self> {
                (rhs != 0).then(|| self.wrapping_div(rhs))
            }

            fn checked_rem(self, rhs: Self) -> Option<Self> {
                (rhs != 0).then(|| self.wrapping_rem(rhs))
            }
        }
    )*};
}

impl_integer_number!(i32, i64);

#[inline]
fn min<T: Scalar>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

#[inline]
fn max<T: Scalar>(a: T, b: T) -> T {
    if a < b { b } else { a }
}

/// `min(max(value, lo), hi)`: with inverted bounds the upper bound wins.
#[inline]
fn clamp<T: Scalar>(value: T, lo: T, hi: T) -> T {
    min(max(value, lo), hi)
}

// ═══════════════════════════════════════════════════════════════════
// Binary arithmetic
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    /// Divisor 0 yields -1
    Divide,
    /// Divisor 0 yields -1
    Modulo,
    Min,
    Max,
}

impl BinaryOp {
    /// (left input, right input, output)
    fn plugs(self) -> (Identifier, Identifier, Identifier) {
        match self {
            BinaryOp::Add | BinaryOp::Subtract => (plugs::VALUE1, plugs::VALUE2, plugs::OUT),
            BinaryOp::Multiply => (plugs::VALUE, plugs::MULTIPLIER, plugs::OUT),
            BinaryOp::Divide | BinaryOp::Modulo => (plugs::VALUE, plugs::DIVISOR, plugs::OUT),
            BinaryOp::Min | BinaryOp::Max => (plugs::VALUE1, plugs::VALUE2, plugs::VALUE),
        }
    }

    #[inline]
    fn apply<T: Number>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a.add(b),
            BinaryOp::Subtract => a.sub(b),
            BinaryOp::Multiply => a.mul(b),
            BinaryOp::Divide => a.checked_div(b).unwrap_or(T::NEG_ONE),
            BinaryOp::Modulo => a.checked_rem(b).unwrap_or(T::NEG_ONE),
            BinaryOp::Min => min(a, b),
            BinaryOp::Max => max(a, b),
        }
    }
}

/// Two inputs of type `T`, one output of type `T`.
pub struct BinaryMath<T: Number> {
    id: NodeId,
    op: BinaryOp,
    _payload: PhantomData<T>,
}

impl<T: Number> BinaryMath<T> {
    pub fn new(id: NodeId, op: BinaryOp) -> Self {
        Self {
            id,
            op,
            _payload: PhantomData,
        }
    }
}

impl<T: Number> NodeProcessor for BinaryMath<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        let (lhs, rhs, out) = self.op.plugs();
        NodeLayout::new()
            .input(lhs, T::ZERO.into_value())
            .input(rhs, T::ZERO.into_value())
            .output(out, T::ZERO.into_value())
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let result = self.op.apply(io.input_as::<T>(0), io.input_as::<T>(1));
        io.set_output(0, result.into_value());
        0.0
    }
}

pub fn add<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Add))
}

pub fn subtract<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Subtract))
}

pub fn multiply<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Multiply))
}

pub fn divide<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Divide))
}

pub fn modulo<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Modulo))
}

pub fn min_node<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Min))
}

pub fn max_node<T: Number>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(BinaryMath::<T>::new(id, BinaryOp::Max))
}

// ═══════════════════════════════════════════════════════════════════
// Clamp / Map Range
// ═══════════════════════════════════════════════════════════════════

pub struct Clamp<T: Number> {
    id: NodeId,
    _payload: PhantomData<T>,
}

impl<T: Number> Clamp<T> {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self {
            id,
            _payload: PhantomData,
        })
    }
}

impl<T: Number> NodeProcessor for Clamp<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::VALUE, T::ZERO.into_value())
            .input(plugs::MIN, T::ZERO.into_value())
            .input(plugs::MAX, T::from_f64(1.0).into_value())
            .output(plugs::VALUE, T::ZERO.into_value())
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let value = clamp(io.input_as::<T>(0), io.input_as::<T>(1), io.input_as::<T>(2));
        io.set_output(0, value.into_value());
        0.0
    }
}

/// Linear remap of `Value` from the input range onto the output range.
///
/// A zero-width input range maps everything to `OutRangeMin`.
pub struct MapRange<T: Number> {
    id: NodeId,
    _payload: PhantomData<T>,
}

impl<T: Number> MapRange<T> {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self {
            id,
            _payload: PhantomData,
        })
    }
}

impl<T: Number> NodeProcessor for MapRange<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::VALUE, T::ZERO.into_value())
            .input(plugs::IN_RANGE_MIN, T::ZERO.into_value())
            .input(plugs::IN_RANGE_MAX, T::from_f64(1.0).into_value())
            .input(plugs::OUT_RANGE_MIN, T::ZERO.into_value())
            .input(plugs::OUT_RANGE_MAX, T::from_f64(1.0).into_value())
            .input(plugs::CLAMPED, false)
            .output(plugs::VALUE, T::ZERO.into_value())
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let value = io.input_as::<T>(0);
        let in_min = io.input_as::<T>(1);
        let in_max = io.input_as::<T>(2);
        let out_min = io.input_as::<T>(3).to_f64();
        let out_max = io.input_as::<T>(4).to_f64();
        let clamped = io.input_as::<bool>(5);

        let value = if clamped {
            clamp(value, in_min, in_max)
        } else {
            value
        };

        let range = in_max.to_f64() - in_min.to_f64();
        let mapped = if range == 0.0 {
            out_min
        } else {
            let t = (value.to_f64() - in_min.to_f64()) / range;
            out_min + (out_max - out_min) * t
        };

        io.set_output(0, T::from_f64(mapped).into_value());
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════
// Power / Log
// ═══════════════════════════════════════════════════════════════════

pub struct Power {
    id: NodeId,
}

impl Power {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id })
    }
}

impl NodeProcessor for Power {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::BASE, 0.0_f32)
            .input(plugs::EXPONENT, 1.0_f32)
            .output(plugs::OUT, 0.0_f32)
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let base = io.input_as::<f32>(0);
        let exponent = io.input_as::<f32>(1);
        io.set_output(0, base.powf(exponent));
        0.0
    }
}

/// Logarithm of `Value` in `Base`. Non-positive values and degenerate
/// bases yield 0.
pub struct Log {
    id: NodeId,
}

impl Log {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id })
    }
}

impl NodeProcessor for Log {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::VALUE, 1.0_f32)
            .input(plugs::BASE, 10.0_f32)
            .output(plugs::OUT, 0.0_f32)
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let value = io.input_as::<f32>(0);
        let base = io.input_as::<f32>(1);

        let out = if value <= 0.0 || base <= 0.0 || base == 1.0 {
            0.0
        } else {
            value.log(base)
        };

        io.set_output(0, if out.is_finite() { out } else { 0.0 });
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════
// Music helpers
// ═══════════════════════════════════════════════════════════════════

const A4_FREQUENCY: f64 = 440.0;
const A4_NOTE: f64 = 69.0;

/// MIDI note number to frequency in Hz (equal temperament, A4 = 440 Hz).
pub fn note_to_frequency(note: f64) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((note - A4_NOTE) / 12.0)
}

/// Frequency in Hz to a fractional MIDI note. Non-positive input yields 0.
pub fn frequency_to_note(frequency: f64) -> f64 {
    if frequency <= 0.0 {
        return 0.0;
    }
    A4_NOTE + 12.0 * (frequency / A4_FREQUENCY).log2()
}

pub struct NoteToFrequency<T: Number> {
    id: NodeId,
    _payload: PhantomData<T>,
}

impl<T: Number> NoteToFrequency<T> {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self {
            id,
            _payload: PhantomData,
        })
    }
}

impl<T: Number> NodeProcessor for NoteToFrequency<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::MIDI_NOTE, T::from_f64(A4_NOTE).into_value())
            .output(plugs::FREQUENCY, A4_FREQUENCY as f32)
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let note = io.input_as::<T>(0).to_f64();
        io.set_output(0, note_to_frequency(note) as f32);
        0.0
    }
}

pub struct FrequencyToNote {
    id: NodeId,
}

impl FrequencyToNote {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id })
    }
}

impl NodeProcessor for FrequencyToNote {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::FREQUENCY, A4_FREQUENCY as f32)
            .output(plugs::MIDI_NOTE, A4_NOTE as f32)
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let frequency = io.input_as::<f32>(0) as f64;
        io.set_output(0, frequency_to_note(frequency) as f32);
        0.0
    }
}

/// Length of one beat in seconds. Non-positive tempo yields 0.
pub struct BpmToSeconds {
    id: NodeId,
}

impl BpmToSeconds {
    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self { id })
    }
}

impl NodeProcessor for BpmToSeconds {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::BPM, 120.0_f32)
            .output(plugs::SECONDS, 0.5_f32)
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        let bpm = io.input_as::<f32>(0);
        io.set_output(0, if bpm > 0.0 { 60.0 / bpm } else { 0.0 });
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    /// Run one tick of `node` with the given input values; returns outputs
    /// and the consumed time step.
    fn run(node: &mut dyn NodeProcessor, inputs: &[Value]) -> (Vec<Value>, f32) {
        let layout = node.layout();
        let mut values: Vec<Value> = layout
            .inputs
            .iter()
            .enumerate()
            .map(|(i, plug)| inputs.get(i).cloned().unwrap_or(plug.default_value.clone()))
            .collect();
        values.extend(layout.outputs.iter().map(|p| p.default_value.clone()));

        let input_slots: Vec<usize> = (0..layout.inputs.len()).collect();
        let output_slots: Vec<usize> = (layout.inputs.len()..values.len()).collect();
        let mut emitted = Vec::new();

        let consumed = {
            let mut io = NodeIo::new(&mut values, &input_slots, &output_slots, &mut emitted);
            node.process(&mut io, 0.5)
        };

        (values.split_off(layout.inputs.len()), consumed)
    }

    #[test]
    fn test_add_int() {
        let mut node = add::<i32>(1);
        let (out, consumed) = run(node.as_mut(), &[3_i32.into(), 4_i32.into()]);
        assert_eq!(out[0], Value::Int32(7));
        assert_eq!(consumed, 0.0);
    }

    #[test]
    fn test_divide_by_zero_sentinel() {
        let mut node = divide::<i32>(1);
        let (out, _) = run(node.as_mut(), &[10_i32.into(), 0_i32.into()]);
        assert_eq!(out[0], Value::Int32(-1));

        let mut node = divide::<f32>(1);
        let (out, _) = run(node.as_mut(), &[10.0_f32.into(), 0.0_f32.into()]);
        assert_eq!(out[0], Value::Float32(-1.0));

        let mut node = modulo::<i32>(1);
        let (out, _) = run(node.as_mut(), &[7_i32.into(), 0_i32.into()]);
        assert_eq!(out[0], Value::Int32(-1));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let mut node = divide::<i32>(1);
        let (out, _) = run(node.as_mut(), &[i32::MIN.into(), (-1_i32).into()]);
        assert_eq!(out[0], Value::Int32(i32::MIN));
    }

    #[test]
    fn test_clamp_inverted_bounds_does_not_panic() {
        let mut node = Clamp::<f32>::create(1);
        let (out, _) = run(node.as_mut(), &[5.0_f32.into(), 2.0_f32.into(), 1.0_f32.into()]);
        assert_eq!(out[0], Value::Float32(1.0));
    }

    #[test]
    fn test_map_range() {
        let mut node = MapRange::<f32>::create(1);
        let inputs = [
            Value::Float32(5.0),
            Value::Float32(0.0),
            Value::Float32(10.0),
            Value::Float32(100.0),
            Value::Float32(200.0),
            Value::Bool(false),
        ];
        let (out, _) = run(node.as_mut(), &inputs);
        assert_eq!(out[0], Value::Float32(150.0));

        // Zero-width input range
        let inputs = [
            Value::Float32(5.0),
            Value::Float32(3.0),
            Value::Float32(3.0),
            Value::Float32(100.0),
            Value::Float32(200.0),
            Value::Bool(true),
        ];
        let (out, _) = run(node.as_mut(), &inputs);
        assert_eq!(out[0], Value::Float32(100.0));
    }

    #[test]
    fn test_log_invalid_input_is_zero() {
        let mut node = Log::create(1);
        let (out, _) = run(node.as_mut(), &[(-1.0_f32).into(), 10.0_f32.into()]);
        assert_eq!(out[0], Value::Float32(0.0));

        let (out, _) = run(node.as_mut(), &[100.0_f32.into(), 10.0_f32.into()]);
        match out[0] {
            Value::Float32(v) => assert!((v - 2.0).abs() < 1e-5),
            ref other => panic!("wrong output: {other:?}"),
        }
    }

    #[test]
    fn test_music_helpers() {
        assert!((note_to_frequency(69.0) - 440.0).abs() < 1e-9);
        assert!((note_to_frequency(81.0) - 880.0).abs() < 1e-9);
        assert!((frequency_to_note(220.0) - 57.0).abs() < 1e-9);
        assert_eq!(frequency_to_note(0.0), 0.0);

        let mut node = BpmToSeconds::create(1);
        let (out, _) = run(node.as_mut(), &[0.0_f32.into()]);
        assert_eq!(out[0], Value::Float32(0.0));
        let (out, _) = run(node.as_mut(), &[120.0_f32.into()]);
        assert_eq!(out[0], Value::Float32(0.5));
    }
}
