// src/value.rs
//
// Dynamically-typed constants carried by endpoints.

use std::cell::Cell;
use std::fmt;

use bincode::Options;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest nesting of arrays, objects and subroutines accepted when decoding.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Largest byte payload accepted when decoding.
pub const MAX_DECODE_BYTES: u64 = 64 * 1024 * 1024;

/// Serialized bytes could not be decoded.
#[derive(Debug, Error)]
#[error("malformed serialized data: {0}")]
pub struct MalformedValue(#[from] pub bincode::Error);

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Vec2,
    Vec3,
    Vec4,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

/// A small tagged union used for endpoint defaults, overrides and the
/// values flowing along wires at runtime.
///
/// The variant order is part of the persisted format. Float payloads
/// compare by bit pattern, so a NaN default still equals itself after a
/// round trip.
#[derive(Debug, Clone, Default, Serialize)]
pub enum Value {
    #[default]
    Void,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    String(String),
    Array(Vec<Value>),
    Object {
        class_name: String,
        members: Vec<(String, Value)>,
    },
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Void => ValueType::Void,
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::Vec2(_) => ValueType::Vec2,
            Value::Vec3(_) => ValueType::Vec3,
            Value::Vec4(_) => ValueType::Vec4,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object { .. } => ValueType::Object,
        }
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Encode into the persisted byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MalformedValue> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the persisted byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedValue> {
        decode(bytes)
    }

    /// Numeric view as `f64`. Non-numeric values read as `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            Value::Int32(v) => Some(v as f64),
            Value::Int64(v) => Some(v as f64),
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view as `i64`, truncating floats toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(b) => Some(b as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::Float32(v) => Some(v as i64),
            Value::Float64(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int32(v) => Some(v != 0),
            Value::Int64(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up an object member by name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object { members, .. } => {
                members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Vec2(a), Value::Vec2(b)) => same_bits(a, b),
            (Value::Vec3(a), Value::Vec3(b)) => same_bits(a, b),
            (Value::Vec4(a), Value::Vec4(b)) => same_bits(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (
                Value::Object {
                    class_name: a,
                    members: a_members,
                },
                Value::Object {
                    class_name: b,
                    members: b_members,
                },
            ) => a == b && a_members == b_members,
            _ => false,
        }
    }
}

fn same_bits(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

// ═══════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════

/// Decode persisted bytes with the size and nesting limits applied.
///
/// Same wire format as `bincode::serialize`.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MalformedValue> {
    Ok(bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_DECODE_BYTES)
        .deserialize(bytes)?)
}

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of decode nesting until dropped.
pub(crate) struct NestingGuard(());

impl NestingGuard {
    pub(crate) fn enter<E: de::Error>() -> Result<Self, E> {
        DECODE_DEPTH.with(|depth| {
            if depth.get() >= MAX_NESTING_DEPTH {
                return Err(E::custom(format_args!(
                    "nesting deeper than {} levels",
                    MAX_NESTING_DEPTH
                )));
            }
            depth.set(depth.get() + 1);
            Ok(NestingGuard(()))
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Decoded shape of `Value`; variant order must match.
#[derive(Deserialize)]
#[serde(rename = "Value")]
enum ValueRepr {
    Void,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    String(String),
    Array(Vec<Value>),
    Object {
        class_name: String,
        members: Vec<(String, Value)>,
    },
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Void => Value::Void,
            ValueRepr::Bool(v) => Value::Bool(v),
            ValueRepr::Int32(v) => Value::Int32(v),
            ValueRepr::Int64(v) => Value::Int64(v),
            ValueRepr::Float32(v) => Value::Float32(v),
            ValueRepr::Float64(v) => Value::Float64(v),
            ValueRepr::Vec2(v) => Value::Vec2(v),
            ValueRepr::Vec3(v) => Value::Vec3(v),
            ValueRepr::Vec4(v) => Value::Vec4(v),
            ValueRepr::String(v) => Value::String(v),
            ValueRepr::Array(v) => Value::Array(v),
            ValueRepr::Object {
                class_name,
                members,
            } => Value::Object {
                class_name,
                members,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _depth = NestingGuard::enter::<D::Error>()?;
        ValueRepr::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<[f32; 2]> for Value {
    fn from(v: [f32; 2]) -> Self {
        Value::Vec2(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Value::Vec3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Value::Vec4(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Scalar payloads for typed nodes
// ═══════════════════════════════════════════════════════════════════

/// A primitive payload that typed nodes read from and write to plugs.
///
/// Reads never fail: a value of the wrong shape reads as `ZERO`, so the
/// per-tick path stays free of error handling.
pub trait Scalar: Copy + PartialOrd + Send + 'static {
    const ZERO: Self;
    const NEG_ONE: Self;
    const TYPE: ValueType;

    fn from_value(value: &Value) -> Self;
    fn into_value(self) -> Value;
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const NEG_ONE: Self = -1.0;
    const TYPE: ValueType = ValueType::Float32;

    #[inline]
    fn from_value(value: &Value) -> Self {
        value.as_f64().map_or(Self::ZERO, |v| v as f32)
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Float32(self)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Scalar for i32 {
    const ZERO: Self = 0;
    const NEG_ONE: Self = -1;
    const TYPE: ValueType = ValueType::Int32;

    #[inline]
    fn from_value(value: &Value) -> Self {
        value.as_i64().map_or(Self::ZERO, |v| v as i32)
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Int32(self)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

impl Scalar for i64 {
    const ZERO: Self = 0;
    const NEG_ONE: Self = -1;
    const TYPE: ValueType = ValueType::Int64;

    #[inline]
    fn from_value(value: &Value) -> Self {
        value.as_i64().unwrap_or(Self::ZERO)
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Int64(self)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i64
    }
}

impl Scalar for bool {
    const ZERO: Self = false;
    const NEG_ONE: Self = true;
    const TYPE: ValueType = ValueType::Bool;

    #[inline]
    fn from_value(value: &Value) -> Self {
        value.as_bool().unwrap_or(false)
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v != 0.0
    }
}
