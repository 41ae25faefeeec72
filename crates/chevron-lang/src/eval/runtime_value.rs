use std::{borrow::Cow, cell::RefCell, cmp::Ordering, rc::Rc};

use itertools::Itertools;

use super::env::Env;
use crate::ast::Program;
use crate::ast::node::{Ident, Params};
use crate::number::Number;

#[derive(Clone, Default)]
pub enum RuntimeValue {
    Number(Number),
    Bool(bool),
    String(String),
    Tuple(Vec<RuntimeValue>),
    Function(Params, Program, Rc<RefCell<Env>>),
    NativeFunction(Ident),
    #[default]
    None,
}

// Custom PartialEq implementation to avoid comparing Env pointers
impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => a == b,
            (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a == b,
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::Tuple(a), RuntimeValue::Tuple(b)) => a == b,
            (RuntimeValue::Function(a1, b1, _), RuntimeValue::Function(a2, b2, _)) => {
                a1 == a2 && b1 == b2
            }
            (RuntimeValue::NativeFunction(a), RuntimeValue::NativeFunction(b)) => a == b,
            (RuntimeValue::None, RuntimeValue::None) => true,
            _ => false,
        }
    }
}

impl PartialOrd for RuntimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => a.partial_cmp(b),
            (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a.partial_cmp(b),
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a.partial_cmp(b),
            (RuntimeValue::Tuple(a), RuntimeValue::Tuple(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Bool(b)
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::String(s)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

impl From<Number> for RuntimeValue {
    fn from(n: Number) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<i32> for RuntimeValue {
    fn from(n: i32) -> Self {
        RuntimeValue::Number(n.into())
    }
}

impl From<usize> for RuntimeValue {
    fn from(n: usize) -> Self {
        RuntimeValue::Number(n.into())
    }
}

impl From<Vec<RuntimeValue>> for RuntimeValue {
    fn from(values: Vec<RuntimeValue>) -> Self {
        RuntimeValue::Tuple(values)
    }
}

impl RuntimeValue {
    pub const NONE: RuntimeValue = Self::None;
    pub const TRUE: RuntimeValue = Self::Bool(true);
    pub const FALSE: RuntimeValue = Self::Bool(false);

    pub fn is_none(&self) -> bool {
        matches!(self, RuntimeValue::None)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Number(n) => !n.is_zero(),
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Tuple(values) => !values.is_empty(),
            RuntimeValue::Function(_, _, _) | RuntimeValue::NativeFunction(_) => true,
            RuntimeValue::None => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuntimeValue::Number(_) => "number",
            RuntimeValue::Bool(_) => "bool",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Tuple(_) => "tuple",
            RuntimeValue::Function(_, _, _) => "function",
            RuntimeValue::NativeFunction(_) => "native_function",
            RuntimeValue::None => "None",
        }
    }
}

impl std::fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let value: Cow<'_, str> = match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::String(s) => Cow::Borrowed(s),
            Self::Tuple(values) => {
                Cow::Owned(format!("({})", values.iter().map(|v| v.to_string()).join(", ")))
            }
            Self::Function(params, ..) => Cow::Owned(format!("function/{}", params.len())),
            Self::NativeFunction(ident) => Cow::Owned(format!("native_function: {}", ident)),
            Self::None => Cow::Borrowed(""),
        };
        write!(f, "{}", value)
    }
}

impl std::fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let value: Cow<'_, str> = match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::String(s) => Cow::Owned(format!("\"{}\"", s)),
            Self::Tuple(values) => {
                Cow::Owned(format!("({})", values.iter().map(|v| format!("{:?}", v)).join(", ")))
            }
            Self::Function(params, ..) => Cow::Owned(format!("function/{}", params.len())),
            Self::NativeFunction(ident) => Cow::Owned(format!("native_function: {}", ident)),
            Self::None => Cow::Borrowed("None"),
        };
        write!(f, "{}", value)
    }
}
