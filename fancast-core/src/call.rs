//! Method identities and the dynamic value model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Return kind of a dispatch method, driving zero-value coercion.
///
/// A dispatch that notified nobody (or whose method is `Void`) has no
/// result; for the primitive-like kinds the dispatcher substitutes the
/// kind's zero value instead of returning nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnKind {
    /// The method returns nothing; any produced value is discarded.
    Void,
    /// Boolean return; absence coerces to `false`.
    Bool,
    /// Integer return; absence coerces to `0`.
    Int,
    /// Float return; absence coerces to `0.0`.
    Float,
    /// Nullable value return; absence stays absent.
    Value,
}

impl ReturnKind {
    /// The substitute for an absent result of this kind.
    pub fn zero_value(self) -> Option<Value> {
        match self {
            ReturnKind::Void | ReturnKind::Value => None,
            ReturnKind::Bool => Some(Value::Bool(false)),
            ReturnKind::Int => Some(Value::Int(0)),
            ReturnKind::Float => Some(Value::Float(0.0)),
        }
    }
}

/// Identity of one method on a dispatch interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodId {
    /// Method name, unique within its interface.
    pub name: &'static str,
    /// Return kind, consulted for the final coercion of a dispatch result.
    pub returns: ReturnKind,
}

impl MethodId {
    /// A method identity with the given name and return kind.
    pub const fn new(name: &'static str, returns: ReturnKind) -> Self {
        Self { name, returns }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One method invocation: identity plus argument list.
#[derive(Clone, Debug)]
pub struct MethodCall {
    /// The method being invoked.
    pub method: MethodId,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl MethodCall {
    /// A call of `method` with no arguments.
    pub fn new(method: MethodId) -> Self {
        Self {
            method,
            args: Vec::new(),
        }
    }

    /// A call of `method` with the given arguments.
    pub fn with_args(method: MethodId, args: Vec<Value>) -> Self {
        Self { method, args }
    }
}

/// Dynamic argument/result value.
#[derive(Clone)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
    /// Escape hatch for arbitrary payloads; compared by pointer identity.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary payload.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    /// The boolean inside, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer inside, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The float inside, if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The string inside, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Downcast an `Opaque` payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(v) => v.downcast_ref(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
