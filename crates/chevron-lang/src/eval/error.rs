use thiserror::Error;

use crate::ast::IdentName;
use crate::lexer::token::Token;

type ErrorToken = Token;

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("{1} failed!")]
    AssertionFailed(ErrorToken, String),
    #[error("Argument reference `.{1}` used outside of a template context")]
    ArgRefOutsideTemplate(ErrorToken, usize),
    #[error("\"{0}\" is not defined")]
    FunctionNotFound(IdentName),
    #[error("Internal error")]
    InternalError(ErrorToken),
    #[error("Invalid number of arguments in \"{1}\", expected {2}, got {3}")]
    InvalidNumberOfArguments(ErrorToken, IdentName, u8, u8),
    #[error(r#"Invalid types for "{}", got {}"#, name, args.join(", "))]
    InvalidTypes {
        token: ErrorToken,
        name: IdentName,
        args: Vec<String>,
    },
    #[error("\"{1}\" is not a function")]
    NotAFunction(ErrorToken, IdentName),
    #[error("\"{1}\" is not defined")]
    NotDefined(ErrorToken, IdentName),
    #[error("Maximum recursion depth exceeded \"{0}\"")]
    RecursionError(u32),
    #[error("{1}")]
    TemplateFailed(ErrorToken, String),
    #[error("Unknown template \"{1}\"")]
    UnknownTemplate(ErrorToken, IdentName),
    #[error("Divided by 0")]
    ZeroDivision(ErrorToken),
}

impl EvalError {
    #[cold]
    pub fn token(&self) -> Option<&Token> {
        match self {
            EvalError::AssertionFailed(token, _) => Some(token),
            EvalError::ArgRefOutsideTemplate(token, _) => Some(token),
            EvalError::FunctionNotFound(_) => None,
            EvalError::InternalError(token) => Some(token),
            EvalError::InvalidNumberOfArguments(token, _, _, _) => Some(token),
            EvalError::InvalidTypes { token, .. } => Some(token),
            EvalError::NotAFunction(token, _) => Some(token),
            EvalError::NotDefined(token, _) => Some(token),
            EvalError::RecursionError(_) => None,
            EvalError::TemplateFailed(token, _) => Some(token),
            EvalError::UnknownTemplate(token, _) => Some(token),
            EvalError::ZeroDivision(token) => Some(token),
        }
    }
}
