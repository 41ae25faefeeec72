use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ast::IdentName;
use crate::eval::runtime_value::RuntimeValue;

#[derive(Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("{0} failed!")]
    AssertionFailed(String),
    #[error("{0}")]
    Message(String),
}

/// A template handler: receives the evaluated context expression and the
/// template-argument tuple, returns the value substituted at the call site.
pub type TemplateFn =
    Rc<dyn Fn(RuntimeValue, &[RuntimeValue]) -> Result<RuntimeValue, TemplateError>>;

/// Maps template names to handlers.
///
/// Dispatch is an explicit registry lookup rather than name mangling in the
/// caller's scope; an unresolved name is a reportable runtime error, not a
/// language-level name error.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    handlers: FxHashMap<IdentName, TemplateFn>,
}

impl Debug for TemplateRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "TemplateRegistry({})",
            self.handlers.keys().sorted().join(", ")
        )
    }
}

impl TemplateRegistry {
    /// A registry with the two reference templates installed.
    pub fn with_builtin_templates() -> Self {
        let mut registry = Self::default();
        registry.register("Ensure", |expr, _| Ok(expr));
        registry.register("Assert", |expr, args: &[RuntimeValue]| {
            if expr.is_truthy() {
                Ok(RuntimeValue::None)
            } else {
                let check = args
                    .last()
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "assertion".to_string());
                Err(TemplateError::AssertionFailed(check))
            }
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(RuntimeValue, &[RuntimeValue]) -> Result<RuntimeValue, TemplateError> + 'static,
    {
        self.handlers.insert(IdentName::from(name), Rc::new(handler));
    }

    pub fn resolve(&self, name: &str) -> Option<TemplateFn> {
        self.handlers.get(name).map(Rc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}
