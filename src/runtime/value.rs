use crate::runtime::scope::{BlueprintId, Frame};
use num_bigint::BigInt;
use std::fmt;
use std::rc::Rc;

/// A runtime value. Cloning is cheap: compound values are `Rc`-shared and
/// immutable once constructed.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Big(Rc<BigInt>),
    Str(Rc<str>),
    Bool(bool),
    Tuple(Rc<(Value, Value)>),
    Closure(Rc<Closure>),
}

/// A function value: the blueprint describing its body, parameters and
/// memoization cell, plus the frame that was active when the `Function`
/// expression produced it.
pub struct Closure {
    pub blueprint: BlueprintId,
    pub frame: Rc<Frame>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure(blueprint {})", self.blueprint)
    }
}

impl Value {
    pub fn big(value: BigInt) -> Self {
        Value::Big(Rc::new(value))
    }

    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn tuple(first: Value, second: Value) -> Self {
        Value::Tuple(Rc::new((first, second)))
    }

    /// Kind tag used in diagnostics. Big integers report as plain `int`.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Int(_) | Value::Big(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Tuple(_) => "tuple",
            Value::Closure(_) => "#closure",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Big(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Tuple(pair) => write!(f, "({}, {})", pair.0, pair.1),
            Value::Closure(_) => write!(f, "<#closure>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Big(a), Value::Big(b)) => a == b,
            (Value::Int(a), Value::Big(b)) | (Value::Big(b), Value::Int(a)) => {
                **b == BigInt::from(*a)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a.0 == b.0 && a.1 == b.1,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
