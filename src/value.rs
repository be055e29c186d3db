use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, InstanceRef};

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(InstanceRef),
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

/// Value equality: `nil` only equals `nil`, primitives compare by value,
/// callables and instances by identity.  Never fails.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => fmt_number(*n, f),

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(c) => write!(f, "{}", c),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class()),
        }
    }
}

/// Plain decimal for magnitudes in `[1e-3, 1e7)`, with integral values
/// dropping their fraction; exponent form such as `1.0E23` otherwise.
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }

    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }

    let magnitude: f64 = n.abs();

    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return write!(f, "{}", n);
    }

    let rendered: String = format!("{:e}", n);

    match rendered.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => {
            write!(f, "{}E{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => write!(f, "{}.0E{}", mantissa, exponent),
        None => f.write_str(&rendered),
    }
}

// Closures and instances can reach themselves through their environments, so
// Debug never descends into them.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}
