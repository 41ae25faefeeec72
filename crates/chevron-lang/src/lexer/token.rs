use std::fmt::{self, Display, Formatter};

use compact_str::CompactString;

use crate::{number::Number, range::Range, source::SourceId};

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
    pub source_id: SourceId,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
pub enum TokenKind {
    ArgRef(usize),
    Asterisk,
    BoolLiteral(bool),
    Colon,
    Comma,
    Comment(String),
    Decorator(CompactString),
    Def,
    Eof,
    EqEq,
    Equal,
    Gt,
    Gte,
    Ident(CompactString),
    LParen,
    Let,
    Lt,
    Lte,
    Minus,
    NeEq,
    None,
    NumberLiteral(Number),
    Percent,
    Pipe,
    Plus,
    Pow,
    RParen,
    SemiColon,
    Slash,
    StringLiteral(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::ArgRef(index) => write!(f, ".{}", index),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::BoolLiteral(b) => write!(f, "{}", b),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Comment(comment) => write!(f, "# {}", comment.trim()),
            TokenKind::Decorator(name) => write!(f, "@{}", name),
            TokenKind::Def => write!(f, "def"),
            TokenKind::Eof => write!(f, ""),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Equal => write!(f, "="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::None => write!(f, "None"),
            TokenKind::NumberLiteral(n) => write!(f, "{}", n),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Pow => write!(f, "**"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::SemiColon => write!(f, ";"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::StringLiteral(s) => write!(f, "\"{}\"", s),
        }
    }
}
