pub mod error;

use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::Arena;
use crate::ast::node::{Expr, Ident, Node};
use crate::ast::{IdentName, Program};
use crate::lexer::token::Token;
use crate::rewrite::Rewriter;

use error::CompileError;

/// The marker decorator a function must carry to be compiled.
pub const MARKER_DECORATOR: &str = "template";

/// Decoration-time driver.
///
/// Takes the parsed source of one decorated function, enforces the structural
/// contract (a single definition, exactly the marker decorator, no defaulted
/// parameters), strips the marker and rewrites the body. The returned
/// definition is what gets installed in place of the original.
pub(crate) struct Compiler {
    marker: IdentName,
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
}

impl Compiler {
    pub fn new(marker: IdentName, token_arena: Rc<RefCell<Arena<Rc<Token>>>>) -> Self {
        Self {
            marker,
            token_arena,
        }
    }

    pub fn compile(&self, program: &Program) -> Result<Rc<Node>, CompileError> {
        let node = match program.as_slice() {
            [node] => node,
            [_, extra, ..] => {
                return Err(CompileError::ExpectedSingleDefinition(self.token_of(extra)));
            }
            [] => return Err(CompileError::EmptySource),
        };

        let (name, params, decorators, body) = match &*node.expr {
            Expr::Def(name, params, decorators, body) => (name, params, decorators, body),
            _ => return Err(CompileError::ExpectedDefinition(self.token_of(node))),
        };

        if decorators.len() != 1 {
            return Err(CompileError::InvalidDecoratorCount(
                self.token_of(node),
                decorators.len(),
            ));
        }
        let decorator = &decorators[0];
        if decorator.name != self.marker {
            return Err(CompileError::UnknownDecorator(
                self.token_of_ident(decorator, node),
                decorator.name.clone(),
            ));
        }

        for param in params {
            if param.default.is_some() {
                return Err(CompileError::DefaultedParam(
                    self.token_of_ident(&param.name, node),
                    param.name.name.clone(),
                ));
            }
        }

        let body = Rewriter::new(Rc::clone(&self.token_arena)).rewrite_program(body)?;

        // The marker is stripped; the compiled function does not re-decorate
        // itself.
        Ok(Rc::new(Node {
            token_id: node.token_id,
            expr: Rc::new(Expr::Def(name.clone(), params.clone(), Vec::new(), body)),
        }))
    }

    fn token_of(&self, node: &Rc<Node>) -> Token {
        (*self.token_arena.borrow()[node.token_id]).clone()
    }

    fn token_of_ident(&self, ident: &Ident, fallback: &Rc<Node>) -> Token {
        ident
            .token
            .as_deref()
            .cloned()
            .unwrap_or_else(|| self.token_of(fallback))
    }
}
