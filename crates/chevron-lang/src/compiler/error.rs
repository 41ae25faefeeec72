use compact_str::CompactString;
use thiserror::Error;

use crate::lexer::token::Token;

/// Decoration-time failures. Every variant aborts compilation before the
/// function is installed; none of these are deferred to call time.
#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("Expected a function definition")]
    EmptySource,
    #[error("Expected a single function definition")]
    ExpectedSingleDefinition(Token),
    #[error("Expected a decorated function definition")]
    ExpectedDefinition(Token),
    #[error("Expected exactly one decorator, found {1}")]
    InvalidDecoratorCount(Token, usize),
    #[error("Unknown decorator `@{1}`")]
    UnknownDecorator(Token, CompactString),
    #[error("Default parameter values are not supported for \"{1}\"")]
    DefaultedParam(Token, CompactString),
    #[error("Template {1} can't access `.{2}` since it only got {3} args")]
    ArgRefOutOfRange(Token, CompactString, usize, usize),
}

impl CompileError {
    pub fn token(&self) -> Option<&Token> {
        match self {
            CompileError::EmptySource => None,
            CompileError::ExpectedSingleDefinition(token) => Some(token),
            CompileError::ExpectedDefinition(token) => Some(token),
            CompileError::InvalidDecoratorCount(token, _) => Some(token),
            CompileError::UnknownDecorator(token, _) => Some(token),
            CompileError::DefaultedParam(token, _) => Some(token),
            CompileError::ArgRefOutOfRange(token, _, _, _) => Some(token),
        }
    }
}
