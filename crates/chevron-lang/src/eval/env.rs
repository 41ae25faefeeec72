use std::cell::RefCell;
use std::rc::Weak;

use rustc_hash::{FxBuildHasher, FxHashMap};
use thiserror::Error;

use super::builtin;
use super::runtime_value::RuntimeValue;
use crate::ast::IdentName;
use crate::ast::node::Ident;

#[derive(Error, Debug, PartialEq)]
pub enum EnvError {
    #[error("\"{0}\" is not defined")]
    NotDefined(String),
}

#[derive(Debug, Clone, Default)]
pub struct Env {
    context: FxHashMap<IdentName, RuntimeValue>,
    parent: Option<Weak<RefCell<Env>>>,
}

impl Env {
    pub fn with_parent(parent: Weak<RefCell<Env>>) -> Self {
        Self {
            context: FxHashMap::with_capacity_and_hasher(8, FxBuildHasher),
            parent: Some(parent),
        }
    }

    #[inline(always)]
    pub fn define(&mut self, name: IdentName, runtime_value: RuntimeValue) {
        self.context.insert(name, runtime_value);
    }

    #[inline(always)]
    pub fn resolve(&self, name: &IdentName) -> Result<RuntimeValue, EnvError> {
        match self.context.get(name) {
            Some(value) => Ok(value.clone()),
            None => match self.parent.as_ref().and_then(|parent| parent.upgrade()) {
                Some(ref parent_env) => parent_env.borrow().resolve(name),
                None => {
                    // The root scope falls back to built-in functions, so a
                    // bare `int` resolves to a first-class function value.
                    if builtin::get(name).is_some() {
                        Ok(RuntimeValue::NativeFunction(Ident::new(name)))
                    } else {
                        Err(EnvError::NotDefined(name.to_string()))
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_env_define_and_resolve() {
        let mut env = Env::default();
        let value = RuntimeValue::Number(42.into());
        env.define(IdentName::from("x"), value.clone());

        let resolved = env.resolve(&IdentName::from("x")).unwrap();
        assert_eq!(resolved, value);
    }

    #[test]
    fn test_env_resolve_from_parent() {
        let parent_env = Rc::new(RefCell::new(Env::default()));
        let mut child_env = Env::with_parent(Rc::downgrade(&parent_env));

        let parent_value = RuntimeValue::Number(100.into());
        parent_env
            .borrow_mut()
            .define(IdentName::from("parent_var"), parent_value.clone());

        let child_value = RuntimeValue::Number(200.into());
        child_env.define(IdentName::from("child_var"), child_value.clone());

        assert_eq!(
            child_env.resolve(&IdentName::from("child_var")).unwrap(),
            child_value
        );
        assert_eq!(
            child_env.resolve(&IdentName::from("parent_var")).unwrap(),
            parent_value
        );
        assert!(
            parent_env
                .borrow()
                .resolve(&IdentName::from("child_var"))
                .is_err()
        );
    }

    #[test]
    fn test_env_shadow_parent_variable() {
        let parent_env = Rc::new(RefCell::new(Env::default()));
        let mut child_env = Env::with_parent(Rc::downgrade(&parent_env));

        parent_env
            .borrow_mut()
            .define(IdentName::from("x"), RuntimeValue::Number(100.into()));

        let child_value = RuntimeValue::Number(200.into());
        child_env.define(IdentName::from("x"), child_value.clone());

        assert_eq!(child_env.resolve(&IdentName::from("x")).unwrap(), child_value);
    }

    #[test]
    fn test_env_falls_back_to_builtins() {
        let env = Env::default();
        assert_eq!(
            env.resolve(&IdentName::from("int")).unwrap(),
            RuntimeValue::NativeFunction(Ident::new("int"))
        );
        assert_eq!(
            env.resolve(&IdentName::from("nope")),
            Err(EnvError::NotDefined("nope".to_string()))
        );
    }
}
