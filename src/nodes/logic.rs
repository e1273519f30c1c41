// Logic nodes (comparisons, boolean operators)
//
// Logic nodes pass the whole time step through as consumed.

use std::marker::PhantomData;

use crate::identifier::NodeId;
use crate::node::{NodeIo, NodeLayout, NodeProcessor};
use crate::value::Scalar;

use super::plugs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    #[inline]
    fn apply<T: Scalar>(self, a: T, b: T) -> bool {
        match self {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Less => a < b,
            CompareOp::LessEqual => a <= b,
            CompareOp::Greater => a > b,
            CompareOp::GreaterEqual => a >= b,
        }
    }
}

/// `Value1 <op> Value2` as a bool on `Out`.
pub struct Compare<T: Scalar> {
    id: NodeId,
    op: CompareOp,
    _payload: PhantomData<T>,
}

impl<T: Scalar> Compare<T> {
    pub fn new(id: NodeId, op: CompareOp) -> Self {
        Self {
            id,
            op,
            _payload: PhantomData,
        }
    }
}

impl<T: Scalar> NodeProcessor for Compare<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        NodeLayout::new()
            .input(plugs::VALUE1, T::ZERO.into_value())
            .input(plugs::VALUE2, T::ZERO.into_value())
            .output(plugs::OUT, false)
    }

    fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32 {
        let result = self.op.apply(io.input_as::<T>(0), io.input_as::<T>(1));
        io.set_output(0, result);
        time_step
    }
}

pub fn check_equal<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::Equal))
}

pub fn check_not_equal<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::NotEqual))
}

pub fn check_less<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::Less))
}

pub fn check_less_equal<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::LessEqual))
}

pub fn check_greater<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::Greater))
}

pub fn check_greater_equal<T: Scalar>(id: NodeId) -> Box<dyn NodeProcessor> {
    Box::new(Compare::<T>::new(id, CompareOp::GreaterEqual))
}

// ═══════════════════════════════════════════════════════════════════
// Boolean operators
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

pub struct BoolLogic {
    id: NodeId,
    op: BoolOp,
}

impl BoolLogic {
    pub fn new(id: NodeId, op: BoolOp) -> Self {
        Self { id, op }
    }

    pub fn and(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self::new(id, BoolOp::And))
    }

    pub fn or(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self::new(id, BoolOp::Or))
    }

    pub fn not(id: NodeId) -> Box<dyn NodeProcessor> {
        Box::new(Self::new(id, BoolOp::Not))
    }
}

impl NodeProcessor for BoolLogic {
    fn id(&self) -> NodeId {
        self.id
    }

    fn layout(&self) -> NodeLayout {
        match self.op {
            BoolOp::Not => NodeLayout::new()
                .input(plugs::VALUE, false)
                .output(plugs::OUT, true),
            BoolOp::And | BoolOp::Or => NodeLayout::new()
                .input(plugs::VALUE1, false)
                .input(plugs::VALUE2, false)
                .output(plugs::OUT, false),
        }
    }

    fn process(&mut self, io: &mut NodeIo, time_step: f32) -> f32 {
        let a = io.input_as::<bool>(0);
        let out = match self.op {
            BoolOp::And => a && io.input_as::<bool>(1),
            BoolOp::Or => a || io.input_as::<bool>(1),
            BoolOp::Not => !a,
        };
        io.set_output(0, out);
        time_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn eval(node: &mut dyn NodeProcessor, a: Value, b: Value) -> (Value, f32) {
        let mut values = vec![a, b, Value::Void];
        let inputs = [0, 1];
        let outputs = [2];
        let mut emitted = Vec::new();
        let mut io = NodeIo::new(&mut values, &inputs, &outputs, &mut emitted);
        let consumed = node.process(&mut io, 0.25);
        (io.output(0).clone(), consumed)
    }

    #[test]
    fn test_comparisons_consume_time_step() {
        let mut less = check_less::<f32>(1);
        let (out, consumed) = eval(less.as_mut(), 1.0_f32.into(), 2.0_f32.into());
        assert_eq!(out, Value::Bool(true));
        assert_eq!(consumed, 0.25);

        let mut eq = check_equal::<i32>(2);
        let (out, _) = eval(eq.as_mut(), 3_i32.into(), 4_i32.into());
        assert_eq!(out, Value::Bool(false));

        let mut ge = check_greater_equal::<i32>(3);
        let (out, _) = eval(ge.as_mut(), 4_i32.into(), 4_i32.into());
        assert_eq!(out, Value::Bool(true));
    }

    #[test]
    fn test_boolean_operators() {
        let mut and = BoolLogic::and(1);
        assert_eq!(eval(and.as_mut(), true.into(), false.into()).0, Value::Bool(false));

        let mut or = BoolLogic::or(2);
        assert_eq!(eval(or.as_mut(), true.into(), false.into()).0, Value::Bool(true));

        let mut not = BoolLogic::not(3);
        assert_eq!(eval(not.as_mut(), true.into(), Value::Void).0, Value::Bool(false));
    }
}
