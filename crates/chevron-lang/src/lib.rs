//! `chevron-lang` is a parser, compile-time rewriter and evaluator for the
//! chevron template language.
//!
//! A function decorated with `@template` may invoke a template handler with
//! the chain syntax `Name<context>(args)`; the chain is rewritten into a
//! template invocation at compilation time, with `.0`, `.1`, ... inside the
//! chevrons standing for the template arguments.
//!
//! ## Examples
//!
//! ```
//! use chevron_lang::{Engine, Value};
//!
//! let code = "
//! @template
//! def foo(x, y):
//!   let x = Ensure<int(.0)>(x) |
//!   Assert<.0 ** 2 == .1>(x, y) |
//!   x + y
//! ;";
//!
//! let mut engine = Engine::default();
//! engine.compile(code).unwrap();
//!
//! let result = engine.call("foo", vec![Value::from(3), Value::from(9)]).unwrap();
//! assert_eq!(result, Value::Number(12.into()));
//!
//! // `Assert` raises at call time when the comparison fails, naming the
//! // rendered expression.
//! let err = engine.call("foo", vec![Value::from(3), Value::from(8)]).unwrap_err();
//! assert!(err.to_string().contains("x ** 2 == y failed!"));
//! ```
mod arena;
mod ast;
mod compiler;
mod engine;
mod error;
mod eval;
mod lexer;
mod number;
mod range;
mod rewrite;
mod source;
mod template;
mod value;

use std::cell::RefCell;
use std::rc::Rc;

use error::InnerError;
use source::SourceMap;

pub use arena::Arena;
pub use ast::IdentName as AstIdentName;
pub use ast::Program;
pub use ast::node::Expr as AstExpr;
pub use ast::node::Ident as AstIdent;
pub use ast::node::Literal as AstLiteral;
pub use ast::node::Node as AstNode;
pub use ast::node::Param as AstParam;
pub use ast::node::Params as AstParams;
pub use ast::parser::Parser as AstParser;
pub use compiler::MARKER_DECORATOR;
pub use engine::Engine;
pub use error::Error;
pub use lexer::token::{Token, TokenKind};
pub use number::Number;
pub use range::{Position, Range};
pub use source::SourceId;
pub use template::TemplateError;
pub use value::Value;

pub type CallResult = Result<Value, Error>;

/// Parses code into AST nodes without compiling it.
#[allow(clippy::result_large_err)]
pub fn parse(
    code: &str,
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
) -> Result<Program, error::Error> {
    let mut sources = SourceMap::default();
    let source_id = sources.add(code);
    let tokens = lexer::tokenize(code, source_id)
        .map_err(|e| error::Error::from_error(InnerError::Lexer(e), &sources, source_id))?
        .into_iter()
        .map(Rc::new)
        .collect::<Vec<_>>();

    AstParser::new(tokens.iter(), token_arena)
        .parse()
        .map_err(|e| error::Error::from_error(InnerError::Parse(e), &sources, source_id))
}

/// Tokenizes code without parsing it.
#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str) -> Result<Vec<Token>, error::Error> {
    let mut sources = SourceMap::default();
    let source_id = sources.add(code);
    lexer::tokenize(code, source_id)
        .map_err(|e| error::Error::from_error(InnerError::Lexer(e), &sources, source_id))
}
