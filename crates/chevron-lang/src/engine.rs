use std::{cell::RefCell, rc::Rc};

use crate::{
    arena::Arena,
    ast::{IdentName, parser::Parser},
    compiler::{Compiler, MARKER_DECORATOR},
    error::{self, InnerError},
    eval::Evaluator,
    lexer::{self, token::Token},
    source::{SourceId, SourceMap},
    template::TemplateError,
    value::Value,
};

#[derive(Debug, Clone)]
pub struct Options {
    /// Name of the marker decorator a function must carry.
    pub marker: IdentName,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            marker: IdentName::from(MARKER_DECORATOR),
        }
    }
}

/// Compiles decorated function sources and calls the installed results.
///
/// Compilation happens once, eagerly: tokenize, parse, check the structural
/// contract, rewrite template chains, install. The compiled function replaces
/// the original under its own name for the lifetime of the engine.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) evaluator: Evaluator,
    pub(crate) options: Options,
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
    sources: SourceMap,
}

impl Default for Engine {
    fn default() -> Self {
        let token_arena = Rc::new(RefCell::new(Arena::new(1_000)));

        Self {
            evaluator: Evaluator::new(Rc::clone(&token_arena)),
            options: Options::default(),
            token_arena,
            sources: SourceMap::default(),
        }
    }
}

impl Engine {
    pub fn set_marker(&mut self, marker: &str) {
        self.options.marker = IdentName::from(marker);
    }

    pub fn set_max_call_stack_depth(&mut self, depth: u32) {
        self.evaluator.options.max_call_stack_depth = depth;
    }

    /// Registers a template handler under `name`.
    pub fn register_template<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(Value, &[Value]) -> Result<Value, TemplateError> + 'static,
    {
        self.evaluator.templates_mut().register(name, move |expr, args| {
            let args = args
                .iter()
                .map(|arg| Value::from(arg.clone()))
                .collect::<Vec<_>>();
            handler(Value::from(expr), &args).map(Into::into)
        });
    }

    /// Names of the functions compiled into this engine.
    pub fn defined_functions(&self) -> Vec<IdentName> {
        self.evaluator.defined_functions()
    }

    /// Compiles the source of one decorated function and installs the result
    /// under the function's name. Returns the installed name.
    ///
    /// All structural violations and placeholder range errors surface here,
    /// before the function can be called.
    #[allow(clippy::result_large_err)]
    pub fn compile(&mut self, code: &str) -> Result<IdentName, error::Error> {
        let source_id = self.sources.add(code);
        let tokens = lexer::tokenize(code, source_id)
            .map_err(|e| error::Error::from_error(InnerError::Lexer(e), &self.sources, source_id))?;
        let tokens = tokens.into_iter().map(Rc::new).collect::<Vec<_>>();

        let program = Parser::new(tokens.iter(), Rc::clone(&self.token_arena))
            .parse()
            .map_err(|e| error::Error::from_error(InnerError::Parse(e), &self.sources, source_id))?;

        let compiled = Compiler::new(self.options.marker.clone(), Rc::clone(&self.token_arena))
            .compile(&program)
            .map_err(|e| {
                error::Error::from_error(InnerError::Compile(e), &self.sources, source_id)
            })?;

        self.evaluator
            .define_function(&compiled)
            .map_err(|e| error::Error::from_error(InnerError::Eval(e), &self.sources, source_id))
    }

    /// Calls an installed function with the given arguments.
    #[allow(clippy::result_large_err)]
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, error::Error> {
        self.evaluator
            .call(name, args.into_iter().map(Into::into).collect())
            .map(Value::from)
            .map_err(|e| {
                error::Error::from_error(InnerError::Eval(e), &self.sources, SourceId::TOP_LEVEL)
            })
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_default() {
        let engine = Engine::default();
        assert_eq!(engine.options.marker, MARKER_DECORATOR);
    }

    #[test]
    fn test_compile_and_call() {
        let mut engine = Engine::default();
        let name = engine
            .compile("@template def double(x): x * 2;")
            .expect("compile failed");
        assert_eq!(name, "double");

        let result = engine.call("double", vec![21.into()]).expect("call failed");
        assert_eq!(result, Value::Number(42.into()));
    }

    #[test]
    fn test_call_unknown_function() {
        let mut engine = Engine::default();
        assert!(engine.call("missing", vec![]).is_err());
    }

    #[test]
    fn test_set_marker() {
        let mut engine = Engine::default();
        engine.set_marker("rewrite");
        assert!(engine.compile("@rewrite def id(x): x;").is_ok());
        assert!(engine.compile("@template def id2(x): x;").is_err());
    }

    #[test]
    fn test_defined_functions() {
        let mut engine = Engine::default();
        engine.compile("@template def id(x): x;").expect("compile failed");
        let defined = engine.defined_functions();
        assert!(defined.iter().any(|name| name.as_str() == "id"));
    }

    #[test]
    fn test_register_template() {
        let mut engine = Engine::default();
        engine.register_template("Double", |expr, _| match expr {
            Value::Number(n) => Ok(Value::Number(n + n)),
            other => Err(TemplateError::Message(format!("can't double {:?}", other))),
        });
        engine
            .compile("@template def f(x): Double<.0>(x);")
            .expect("compile failed");

        let result = engine.call("f", vec![21.into()]).expect("call failed");
        assert_eq!(result, Value::Number(42.into()));
    }

    #[test]
    fn test_version() {
        assert!(!Engine::version().is_empty());
    }
}
