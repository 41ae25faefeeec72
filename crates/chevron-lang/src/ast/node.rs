use std::{
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::{lexer::token::Token, number::Number};

use super::{IdentName, Program, TokenId};

pub type Args = SmallVec<[Rc<Node>; 4]>;
pub type Params = Vec<Param>;
pub type Decorators = Vec<Ident>;

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub token_id: TokenId,
    pub expr: Rc<Expr>,
}

#[derive(PartialEq, Debug, Eq, Clone)]
pub struct Ident {
    pub name: IdentName,
    pub token: Option<Rc<Token>>,
}

impl Hash for Ident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Ord for Ident {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl PartialOrd for Ident {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Self::new_with_token(name, None)
    }

    pub fn new_with_token(name: &str, token: Option<Rc<Token>>) -> Self {
        Self {
            name: CompactString::from(name),
            token,
        }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

/// A function parameter. Defaults parse but are rejected at decoration time.
#[derive(PartialEq, Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Rc<Node>>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
        }
    }
}

#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub enum Literal {
    String(String),
    Number(Number),
    Bool(bool),
    None,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Call(Ident, Args),
    /// A chained relational expression: the leftmost operand plus the ordered
    /// `(operator, operand)` pairs. Kept first-class so the rewriter can
    /// inspect the chain shape; never desugared into calls.
    Compare(Rc<Node>, Vec<(CompareOp, Rc<Node>)>),
    /// A rewritten template invocation: template name, context arguments and
    /// the (possibly augmented) template-argument sequence. Only produced by
    /// the rewriter; has no surface syntax of its own.
    TemplateCall(Ident, Args, Args),
    /// Zero-based reference to a template argument (`.0`, `.1`, ...).
    ArgRef(usize),
    Def(Ident, Params, Decorators, Program),
    Let(Ident, Rc<Node>),
    Literal(Literal),
    Ident(Ident),
    Paren(Rc<Node>),
    Tuple(Args),
}
