use miette::{Diagnostic, LabeledSpan, SourceOffset, SourceSpan};

use crate::{
    ast::error::ParseError,
    compiler::error::CompileError,
    eval::error::EvalError,
    lexer::{error::LexerError, token::Token},
    source::{SourceId, SourceMap},
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl InnerError {
    fn token(&self) -> Option<&Token> {
        match self {
            InnerError::Compile(err) => err.token(),
            InnerError::Eval(err) => err.token(),
            InnerError::Lexer(err) => err.token(),
            InnerError::Parse(err) => err.token(),
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub(crate) fn from_error(cause: InnerError, sources: &SourceMap, fallback: SourceId) -> Self {
        match cause.token() {
            Some(token) => {
                let source_code = sources
                    .text(token.source_id)
                    .unwrap_or_default()
                    .to_string();
                let start = SourceOffset::from_location(
                    &source_code,
                    token.range.start.line as usize,
                    token.range.start.column,
                );
                let end = SourceOffset::from_location(
                    &source_code,
                    token.range.end.line as usize,
                    token.range.end.column,
                );
                let location = SourceSpan::new(
                    start,
                    std::cmp::max(end.offset().saturating_sub(start.offset()), 1),
                );

                Self {
                    cause,
                    source_code,
                    location,
                }
            }
            None => {
                let source_code = sources.text(fallback).unwrap_or_default().to_string();
                let is_eof = matches!(
                    cause,
                    InnerError::Lexer(LexerError::UnexpectedEOFDetected)
                        | InnerError::Parse(ParseError::UnexpectedEOFDetected)
                );

                let location = if is_eof {
                    let lines = source_code.lines();
                    let loc_line = lines.clone().count().saturating_sub(1);
                    let loc_col = lines.last().map(|line| line.len()).unwrap_or(0);
                    SourceSpan::new(
                        SourceOffset::from_location(&source_code, loc_line, loc_col),
                        1,
                    )
                } else {
                    SourceSpan::new(SourceOffset::from_location(&source_code, 0, 0), 1)
                };

                Self {
                    cause,
                    source_code,
                    location,
                }
            }
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => "LexerError::UnexpectedToken",
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => {
                "LexerError::UnexpectedEOFDetected"
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => {
                "ParseError::UnexpectedEOFDetected"
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                "ParseError::ExpectedClosingParen"
            }
            InnerError::Compile(CompileError::EmptySource) => "CompileError::EmptySource",
            InnerError::Compile(CompileError::ExpectedSingleDefinition(_)) => {
                "CompileError::ExpectedSingleDefinition"
            }
            InnerError::Compile(CompileError::ExpectedDefinition(_)) => {
                "CompileError::ExpectedDefinition"
            }
            InnerError::Compile(CompileError::InvalidDecoratorCount(_, _)) => {
                "CompileError::InvalidDecoratorCount"
            }
            InnerError::Compile(CompileError::UnknownDecorator(_, _)) => {
                "CompileError::UnknownDecorator"
            }
            InnerError::Compile(CompileError::DefaultedParam(_, _)) => {
                "CompileError::DefaultedParam"
            }
            InnerError::Compile(CompileError::ArgRefOutOfRange(_, _, _, _)) => {
                "CompileError::ArgRefOutOfRange"
            }
            InnerError::Eval(EvalError::AssertionFailed(_, _)) => "EvalError::AssertionFailed",
            InnerError::Eval(EvalError::ArgRefOutsideTemplate(_, _)) => {
                "EvalError::ArgRefOutsideTemplate"
            }
            InnerError::Eval(EvalError::FunctionNotFound(_)) => "EvalError::FunctionNotFound",
            InnerError::Eval(EvalError::InternalError(_)) => "EvalError::InternalError",
            InnerError::Eval(EvalError::InvalidNumberOfArguments(_, _, _, _)) => {
                "EvalError::InvalidNumberOfArguments"
            }
            InnerError::Eval(EvalError::InvalidTypes { .. }) => "EvalError::InvalidTypes",
            InnerError::Eval(EvalError::NotAFunction(_, _)) => "EvalError::NotAFunction",
            InnerError::Eval(EvalError::NotDefined(_, _)) => "EvalError::NotDefined",
            InnerError::Eval(EvalError::RecursionError(_)) => "EvalError::RecursionError",
            InnerError::Eval(EvalError::TemplateFailed(_, _)) => "EvalError::TemplateFailed",
            InnerError::Eval(EvalError::UnknownTemplate(_, _)) => "EvalError::UnknownTemplate",
            InnerError::Eval(EvalError::ZeroDivision(_)) => "EvalError::ZeroDivision",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => {
                Some("Check for unexpected or misplaced tokens in your input.".to_string())
            }
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => {
                Some("Input ended unexpectedly. Make sure all expressions are complete.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => {
                Some("Input ended unexpectedly. Check for a missing `;` or incomplete expressions.".to_string())
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                Some("Check for a missing closing parenthesis.".to_string())
            }
            InnerError::Compile(CompileError::EmptySource) => {
                Some("Provide a single decorated function definition.".to_string())
            }
            InnerError::Compile(CompileError::ExpectedSingleDefinition(_)) => {
                Some("Compile one function at a time; remove the extra top-level items.".to_string())
            }
            InnerError::Compile(CompileError::ExpectedDefinition(_)) => {
                Some("The source must be a function definition, not a bare expression.".to_string())
            }
            InnerError::Compile(CompileError::InvalidDecoratorCount(_, _)) => {
                Some("The function must carry exactly the marker decorator.".to_string())
            }
            InnerError::Compile(CompileError::UnknownDecorator(_, name)) => {
                Some(format!("`@{name}` is not the marker decorator this engine compiles."))
            }
            InnerError::Compile(CompileError::DefaultedParam(_, _)) => {
                Some("Remove the parameter's default value.".to_string())
            }
            InnerError::Compile(CompileError::ArgRefOutOfRange(_, _, _, available)) => {
                Some(format!("Template argument indices are zero-based; only {available} are available."))
            }
            InnerError::Eval(EvalError::NotDefined(_, name)) => {
                Some(format!("'{name}' is not defined. Did you forget to declare it?"))
            }
            InnerError::Eval(EvalError::FunctionNotFound(name)) => {
                Some(format!("'{name}' has not been compiled into this engine."))
            }
            InnerError::Eval(EvalError::UnknownTemplate(_, name)) => {
                Some(format!("Register a template named '{name}' before calling this function."))
            }
            InnerError::Eval(EvalError::InvalidNumberOfArguments(_, _, expected, actual)) => {
                Some(format!("Invalid number of arguments: expected {expected}, got {actual}."))
            }
            InnerError::Eval(EvalError::InvalidTypes { .. }) => {
                Some("Type mismatch. Check the types of your operands.".to_string())
            }
            InnerError::Eval(EvalError::ZeroDivision(_)) => {
                Some("Division by zero is not allowed.".to_string())
            }
            InnerError::Eval(EvalError::ArgRefOutsideTemplate(_, _)) => {
                Some("Argument references are only meaningful inside a template's chevrons.".to_string())
            }
            InnerError::Eval(EvalError::InternalError(_)) => {
                Some("An internal error occurred. Please report this if it persists.".to_string())
            }
            _ => None,
        };

        msg.map(|msg| Box::new(msg) as Box<dyn std::fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            None,
            self.location,
        ))))
    }
}
