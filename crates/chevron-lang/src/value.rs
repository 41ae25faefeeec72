use std::cell::RefCell;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use itertools::Itertools;

use crate::ast::Program;
use crate::ast::node::{Ident, Params};
use crate::eval::env::Env;
use crate::eval::runtime_value::RuntimeValue;
use crate::number::Number;

#[derive(Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Bool(bool),
    String(String),
    Tuple(Vec<Value>),
    Function(Params, Program),
    NativeFunction(Ident),
    None,
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n.into())
    }
}

impl From<RuntimeValue> for Value {
    fn from(value: RuntimeValue) -> Self {
        match value {
            RuntimeValue::Number(n) => Value::Number(n),
            RuntimeValue::Bool(b) => Value::Bool(b),
            RuntimeValue::String(s) => Value::String(s),
            RuntimeValue::Tuple(values) => {
                Value::Tuple(values.into_iter().map(Into::into).collect::<Vec<_>>())
            }
            RuntimeValue::Function(params, program, _) => Value::Function(params, program),
            RuntimeValue::NativeFunction(ident) => Value::NativeFunction(ident),
            RuntimeValue::None => Value::None,
        }
    }
}

impl From<Value> for RuntimeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => RuntimeValue::Number(n),
            Value::Bool(b) => RuntimeValue::Bool(b),
            Value::String(s) => RuntimeValue::String(s),
            Value::Tuple(values) => {
                RuntimeValue::Tuple(values.into_iter().map(Into::into).collect::<Vec<_>>())
            }
            Value::Function(params, program) => {
                RuntimeValue::Function(params, program, Rc::new(RefCell::new(Env::default())))
            }
            Value::NativeFunction(ident) => RuntimeValue::NativeFunction(ident),
            Value::None => RuntimeValue::None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let value = match self {
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.to_string(),
            Value::Tuple(values) => {
                format!("({})", values.iter().map(|v| v.to_string()).join(", "))
            }
            Value::None => "".to_string(),
            Value::Function(params, _) => format!("function/{}", params.len()),
            Value::NativeFunction(_) => "native_function".to_string(),
        };

        write!(f, "{}", value)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let value = match self {
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => format!("\"{}\"", s),
            Value::Tuple(values) => {
                format!("({})", values.iter().map(|v| format!("{:?}", v)).join(", "))
            }
            Value::None => "None".to_string(),
            Value::Function(params, _) => format!("function/{}", params.len()),
            Value::NativeFunction(ident) => format!("native_function: {}", ident),
        };

        write!(f, "{}", value)
    }
}

impl Value {
    pub const NONE: Value = Self::None;
    pub const TRUE: Value = Self::Bool(true);
    pub const FALSE: Value = Self::Bool(false);

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Value::Tuple(_))
    }
}
