// Array nodes

use std::marker::PhantomData;

use crate::identifier::{Identifier, NodeId};
use crate::node::{InitContext, NodeIo, NodeLayout, NodeProcessor};
use crate::value::{Scalar, Value};

use super::plugs;

/// Element `Index` of `Array`, wrapping out-of-range indices.
///
/// An empty (or non-array) input yields the element type's zero. A
/// `Trigger` event re-reads the element and fires `OnTrigger`.
pub struct Get<T: Scalar> {
    id: NodeId,
    _payload: PhantomData<T>,
}

impl<T: Scalar> Get<T> {
    const ARRAY: usize = 0;
    const INDEX: usize = 1;
    const ELEMENT: usize = 0;
    const ON_TRIGGER: usize = 0;

    pub fn create(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self {
            id,
            _payload: PhantomData,
        })
    }

    fn read_element(io: &NodeIo) -> T {
        let items = io.input(Self::ARRAY).as_array().unwrap_or(&[]);
        wrapped_index(io.input_as::<i32>(Self::INDEX), items.len())
            .map_or(T::ZERO, |i| T::from_value(&items[i]))
    }

    fn update(&self, io: &mut NodeIo) {
        let element = Self::read_element(io);
        io.set_output(Self::ELEMENT, element.into_value());
    }
}

/// `index` folded into `0..len`; `None` when `len` is zero.
fn wrapped_index(index: i32, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((index as i64).rem_euclid(len as i64) as usize)
}

impl<T: Scalar> NodeProcessor for Get<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::ARRAY, Value::Array(Vec::new()))
            .input(plugs::INDEX, 0_i32)
            .output(plugs::ELEMENT, T::ZERO.into_value())
            .input_event(plugs::TRIGGER)
            .output_event(plugs::ON_TRIGGER)
    }

    fn init(&mut self, _ctx: &InitContext, io: &mut NodeIo) {
        self.update(io);
    }

    fn process(&mut self, io: &mut NodeIo, _time_step: f32) -> f32 {
        self.update(io);
        0.0
    }

    fn on_event(&mut self, _input: usize, event: Identifier, io: &mut NodeIo) {
        self.update(io);
        io.emit(Self::ON_TRIGGER, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<T: Scalar>(array: Value, index: i32) -> Value {
        let mut node = Get::<T>::create(1);
        let mut values = vec![array, Value::Int32(index), Value::Void];
        let mut emitted = Vec::new();
        let mut io = NodeIo::new(&mut values, &[0, 1], &[2], &mut emitted);
        assert_eq!(node.process(&mut io, 1.0), 0.0);
        io.output(0).clone()
    }

    #[test]
    fn test_index_wraps() {
        let array = Value::from(vec![1.0_f32, 2.0, 3.0]);
        assert_eq!(get::<f32>(array.clone(), 1), Value::Float32(2.0));
        assert_eq!(get::<f32>(array.clone(), 4), Value::Float32(2.0));
        assert_eq!(get::<f32>(array, -1), Value::Float32(3.0));
    }

    #[test]
    fn test_empty_array_yields_zero() {
        assert_eq!(get::<i64>(Value::Array(Vec::new()), 5), Value::Int64(0));
        assert_eq!(get::<i32>(Value::Void, 0), Value::Int32(0));
    }

    #[test]
    fn test_trigger_forwards_event() {
        let mut node = Get::<i32>::create(1);
        let mut values = vec![Value::from(vec![7_i32, 8]), Value::Int32(1), Value::Void];
        let mut emitted = Vec::new();
        let mut io = NodeIo::new(&mut values, &[0, 1], &[2], &mut emitted);

        let event = Identifier::new("Go");
        node.on_event(0, event, &mut io);
        assert_eq!(io.output(0), &Value::Int32(8));
        assert_eq!(emitted[0].event, event);
    }
}
