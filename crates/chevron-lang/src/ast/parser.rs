use std::cell::RefCell;
use std::iter::Peekable;
use std::rc::Rc;

use smallvec::smallvec;

use crate::arena::Arena;
use crate::lexer::token::{Token, TokenKind};

use super::constants;
use super::error::ParseError;
use super::node::{Args, CompareOp, Decorators, Expr, Ident, Literal, Node, Param, Params};
use super::{Program, TokenId};

pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Rc<Token>>>,
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: core::slice::Iter<'a, Rc<Token>>,
        token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
    ) -> Self {
        Self {
            tokens: tokens.peekable(),
            token_arena,
        }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = Vec::new();

        while let Some(token) = self.tokens.next() {
            match &token.kind {
                TokenKind::Comment(_) | TokenKind::Pipe => continue,
                TokenKind::Eof => break,
                TokenKind::Decorator(_) | TokenKind::Def => {
                    program.push(self.parse_def(Rc::clone(token))?);
                }
                _ => {
                    let node = self.parse_stmt(Rc::clone(token))?;
                    program.push(node);
                }
            }
        }

        if program.is_empty() {
            return Err(ParseError::UnexpectedEOFDetected);
        }

        Ok(program)
    }

    fn token_alloc(&self, token: &Rc<Token>) -> TokenId {
        self.token_arena.borrow_mut().alloc(Rc::clone(token))
    }

    fn next_token(&mut self) -> Result<Rc<Token>, ParseError> {
        self.tokens
            .next()
            .map(Rc::clone)
            .ok_or(ParseError::UnexpectedEOFDetected)
    }

    fn parse_def(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let mut decorators: Decorators = Vec::new();
        let mut token = token;

        while let TokenKind::Decorator(name) = &token.kind {
            decorators.push(Ident::new_with_token(name, Some(Rc::clone(&token))));
            token = self.next_token()?;
        }

        if !matches!(token.kind, TokenKind::Def) {
            return Err(ParseError::UnexpectedToken((*token).clone()));
        }

        let def_token_id = self.token_alloc(&token);
        let name_token = self.next_token()?;
        let name = match &name_token.kind {
            TokenKind::Ident(name) => Ident::new_with_token(name, Some(Rc::clone(&name_token))),
            _ => return Err(ParseError::UnexpectedToken((*name_token).clone())),
        };

        let paren_token = self.next_token()?;
        if !matches!(paren_token.kind, TokenKind::LParen) {
            return Err(ParseError::UnexpectedToken((*paren_token).clone()));
        }
        let params = self.parse_params()?;

        let colon_token = self.next_token()?;
        if !matches!(colon_token.kind, TokenKind::Colon) {
            return Err(ParseError::UnexpectedToken((*colon_token).clone()));
        }

        let body = self.parse_body()?;

        Ok(Rc::new(Node {
            token_id: def_token_id,
            expr: Rc::new(Expr::Def(name, params, decorators, body)),
        }))
    }

    fn parse_params(&mut self) -> Result<Params, ParseError> {
        let mut params: Params = Vec::new();

        loop {
            let token = self.next_token()?;
            match &token.kind {
                TokenKind::RParen => break,
                TokenKind::Ident(name) => {
                    let name = Ident::new_with_token(name, Some(Rc::clone(&token)));
                    let default = if matches!(
                        self.tokens.peek().map(|t| &t.kind),
                        Some(TokenKind::Equal)
                    ) {
                        self.next_token()?;
                        let value_token = self.next_token()?;
                        Some(self.parse_expr(value_token)?)
                    } else {
                        None
                    };
                    params.push(Param { name, default });

                    let separator = self.next_token()?;
                    match &separator.kind {
                        TokenKind::Comma => continue,
                        TokenKind::RParen => break,
                        _ => return Err(ParseError::ExpectedClosingParen((*separator).clone())),
                    }
                }
                _ => return Err(ParseError::UnexpectedToken((*token).clone())),
            }
        }

        Ok(params)
    }

    fn parse_body(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        loop {
            let mut token = self.next_token()?;
            while matches!(token.kind, TokenKind::Comment(_)) {
                token = self.next_token()?;
            }
            if token.is_eof() {
                return Err(ParseError::UnexpectedEOFDetected);
            }

            body.push(self.parse_stmt(token)?);

            while matches!(
                self.tokens.peek().map(|t| &t.kind),
                Some(TokenKind::Comment(_))
            ) {
                self.tokens.next();
            }

            let separator = self.next_token()?;
            match &separator.kind {
                TokenKind::Pipe => continue,
                TokenKind::SemiColon => break,
                TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
                _ => return Err(ParseError::UnexpectedToken((*separator).clone())),
            }
        }

        Ok(body)
    }

    fn parse_stmt(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        match &token.kind {
            TokenKind::Let => self.parse_let(token),
            _ => self.parse_expr(token),
        }
    }

    fn parse_let(&mut self, let_token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let token_id = self.token_alloc(&let_token);
        let name_token = self.next_token()?;
        let name = match &name_token.kind {
            TokenKind::Ident(name) => Ident::new_with_token(name, Some(Rc::clone(&name_token))),
            _ => return Err(ParseError::UnexpectedToken((*name_token).clone())),
        };

        let equal_token = self.next_token()?;
        if !matches!(equal_token.kind, TokenKind::Equal) {
            return Err(ParseError::UnexpectedToken((*equal_token).clone()));
        }

        let value_token = self.next_token()?;
        let value = self.parse_expr(value_token)?;

        Ok(Rc::new(Node {
            token_id,
            expr: Rc::new(Expr::Let(name, value)),
        }))
    }

    #[inline(always)]
    fn parse_expr(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        self.parse_comparison(token)
    }

    fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
        match kind {
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::Lte => Some(CompareOp::Lte),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Gte => Some(CompareOp::Gte),
            TokenKind::EqEq => Some(CompareOp::Eq),
            TokenKind::NeEq => Some(CompareOp::Ne),
            _ => None,
        }
    }

    // Comparison operators are collected into a single `Compare` chain
    // instead of nesting left-associatively; the rewriter pattern-matches
    // on the chain's first and last operator.
    fn parse_comparison(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let first = self.parse_additive(token)?;
        let mut pairs: Vec<(CompareOp, Rc<Node>)> = Vec::new();
        let mut chain_token_id: Option<TokenId> = None;

        while let Some(peeked) = self.tokens.peek() {
            let op = match Self::compare_op(&peeked.kind) {
                Some(op) => op,
                None => break,
            };
            let op_token = self.next_token()?;
            if chain_token_id.is_none() {
                chain_token_id = Some(self.token_alloc(&op_token));
            }
            let operand_token = self.next_token()?;
            let operand = self.parse_additive(operand_token)?;
            pairs.push((op, operand));
        }

        match chain_token_id {
            Some(token_id) => Ok(Rc::new(Node {
                token_id,
                expr: Rc::new(Expr::Compare(first, pairs)),
            })),
            None => Ok(first),
        }
    }

    fn parse_additive(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_multiplicative(token)?;

        while let Some(peeked) = self.tokens.peek() {
            let name = match &peeked.kind {
                TokenKind::Plus => constants::ADD,
                TokenKind::Minus => constants::SUB,
                _ => break,
            };
            let op_token = self.next_token()?;
            let op_token_id = self.token_alloc(&op_token);
            let rhs_token = self.next_token()?;
            let rhs = self.parse_multiplicative(rhs_token)?;
            lhs = Rc::new(Node {
                token_id: op_token_id,
                expr: Rc::new(Expr::Call(
                    Ident::new_with_token(name, Some(op_token)),
                    smallvec![lhs, rhs],
                )),
            });
        }

        Ok(lhs)
    }

    fn parse_multiplicative(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let mut lhs = self.parse_unary(token)?;

        while let Some(peeked) = self.tokens.peek() {
            let name = match &peeked.kind {
                TokenKind::Asterisk => constants::MUL,
                TokenKind::Slash => constants::DIV,
                TokenKind::Percent => constants::MOD,
                _ => break,
            };
            let op_token = self.next_token()?;
            let op_token_id = self.token_alloc(&op_token);
            let rhs_token = self.next_token()?;
            let rhs = self.parse_unary(rhs_token)?;
            lhs = Rc::new(Node {
                token_id: op_token_id,
                expr: Rc::new(Expr::Call(
                    Ident::new_with_token(name, Some(op_token)),
                    smallvec![lhs, rhs],
                )),
            });
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        if matches!(token.kind, TokenKind::Minus) {
            let token_id = self.token_alloc(&token);
            let operand_token = self.next_token()?;
            let operand = self.parse_unary(operand_token)?;
            return Ok(Rc::new(Node {
                token_id,
                expr: Rc::new(Expr::Call(
                    Ident::new_with_token(constants::NEG, Some(token)),
                    smallvec![operand],
                )),
            }));
        }

        self.parse_power(token)
    }

    fn parse_power(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let lhs = self.parse_primary(token)?;

        if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::Pow)) {
            let op_token = self.next_token()?;
            let op_token_id = self.token_alloc(&op_token);
            let rhs_token = self.next_token()?;
            // Right-associative; the operand may itself be signed (`2 ** -3`).
            let rhs = self.parse_unary(rhs_token)?;
            return Ok(Rc::new(Node {
                token_id: op_token_id,
                expr: Rc::new(Expr::Call(
                    Ident::new_with_token(constants::POW, Some(op_token)),
                    smallvec![lhs, rhs],
                )),
            }));
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        match &token.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.parse_ident(name, token)
            }
            TokenKind::BoolLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::NumberLiteral(_)
            | TokenKind::None => self.parse_literal(token),
            TokenKind::ArgRef(index) => {
                let index = *index;
                let token_id = self.token_alloc(&token);
                Ok(Rc::new(Node {
                    token_id,
                    expr: Rc::new(Expr::ArgRef(index)),
                }))
            }
            TokenKind::LParen => self.parse_paren(token),
            TokenKind::Let => self.parse_let(token),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken((*token).clone())),
        }
    }

    fn parse_ident(&mut self, name: super::IdentName, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let token_id = self.token_alloc(&token);
        let ident = Ident::new_with_token(&name, Some(Rc::clone(&token)));

        if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            self.next_token()?;
            let args = self.parse_args()?;
            return Ok(Rc::new(Node {
                token_id,
                expr: Rc::new(Expr::Call(ident, args)),
            }));
        }

        Ok(Rc::new(Node {
            token_id,
            expr: Rc::new(Expr::Ident(ident)),
        }))
    }

    fn parse_literal(&mut self, token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let token_id = self.token_alloc(&token);
        let literal = match &token.kind {
            TokenKind::BoolLiteral(b) => Literal::Bool(*b),
            TokenKind::StringLiteral(s) => Literal::String(s.clone()),
            TokenKind::NumberLiteral(n) => Literal::Number(*n),
            TokenKind::None => Literal::None,
            _ => return Err(ParseError::UnexpectedToken((*token).clone())),
        };
        Ok(Rc::new(Node {
            token_id,
            expr: Rc::new(Expr::Literal(literal)),
        }))
    }

    fn parse_args(&mut self) -> Result<Args, ParseError> {
        let mut args = Args::new();

        if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.next_token()?;
            return Ok(args);
        }

        loop {
            let token = self.next_token()?;
            args.push(self.parse_expr(token)?);

            let separator = self.next_token()?;
            match &separator.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
                _ => return Err(ParseError::ExpectedClosingParen((*separator).clone())),
            }
        }

        Ok(args)
    }

    fn parse_paren(&mut self, lparen_token: Rc<Token>) -> Result<Rc<Node>, ParseError> {
        let token_id = self.token_alloc(&lparen_token);

        if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.next_token()?;
            return Ok(Rc::new(Node {
                token_id,
                expr: Rc::new(Expr::Tuple(Args::new())),
            }));
        }

        let first_token = self.next_token()?;
        let first = self.parse_expr(first_token)?;

        let separator = self.next_token()?;
        match &separator.kind {
            TokenKind::RParen => Ok(Rc::new(Node {
                token_id,
                expr: Rc::new(Expr::Paren(first)),
            })),
            TokenKind::Comma => {
                let mut elements: Args = smallvec![first];
                loop {
                    if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                        self.next_token()?;
                        break;
                    }
                    let token = self.next_token()?;
                    elements.push(self.parse_expr(token)?);

                    let separator = self.next_token()?;
                    match &separator.kind {
                        TokenKind::Comma => continue,
                        TokenKind::RParen => break,
                        TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
                        _ => return Err(ParseError::ExpectedClosingParen((*separator).clone())),
                    }
                }
                Ok(Rc::new(Node {
                    token_id,
                    expr: Rc::new(Expr::Tuple(elements)),
                }))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::ExpectedClosingParen((*separator).clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::source::SourceId;
    use rstest::rstest;

    fn parse_to_code(code: &str) -> Result<Vec<String>, ParseError> {
        let tokens = lexer::tokenize(code, SourceId::TOP_LEVEL).expect("tokenize failed");
        let tokens = tokens.into_iter().map(Rc::new).collect::<Vec<_>>();
        let token_arena = Rc::new(RefCell::new(Arena::new(100)));
        Parser::new(tokens.iter(), token_arena)
            .parse()
            .map(|program| program.iter().map(|node| node.to_code()).collect())
    }

    #[rstest]
    #[case::simple_def("def foo(x): x;", "def foo(x): x;")]
    #[case::decorated("@template def foo(x): x;", "@template\ndef foo(x): x;")]
    #[case::params_default("def foo(x, y = 1): x;", "def foo(x, y = 1): x;")]
    #[case::body_sequence("def foo(x): let y = x | y + 1;", "def foo(x): let y = x | y + 1;")]
    #[case::precedence("1 + 2 * 3", "1 + 2 * 3")]
    #[case::precedence_paren("(1 + 2) * 3", "(1 + 2) * 3")]
    #[case::power_right_assoc("2 ** 3 ** 4", "2 ** 3 ** 4")]
    #[case::unary_minus("-x * y", "-x * y")]
    #[case::comparison_chain("a < b == c > d", "a < b == c > d")]
    #[case::template_shape("Ensure<int(.0)>(x)", "Ensure < int(.0) > (x)")]
    #[case::tuple("(x, y)", "(x, y)")]
    #[case::tuple_single("(x,)", "(x,)")]
    #[case::unit_tuple("()", "()")]
    #[case::call_no_args("f()", "f()")]
    #[case::string_escape("\"a\\nb\"", "\"a\\nb\"")]
    fn test_parse(#[case] code: &str, #[case] expected: &str) {
        let nodes = parse_to_code(code).expect("parse failed");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0], expected);
    }

    #[rstest]
    #[case::unterminated_def("def foo(x): x")]
    #[case::missing_paren("def foo(x: x;")]
    #[case::empty("")]
    fn test_parse_error(#[case] code: &str) {
        assert!(parse_to_code(code).is_err());
    }

    #[test]
    fn test_comparison_chain_shape() {
        let tokens = lexer::tokenize("a < b > c", SourceId::TOP_LEVEL).expect("tokenize failed");
        let tokens = tokens.into_iter().map(Rc::new).collect::<Vec<_>>();
        let token_arena = Rc::new(RefCell::new(Arena::new(100)));
        let program = Parser::new(tokens.iter(), token_arena)
            .parse()
            .expect("parse failed");

        match &*program[0].expr {
            Expr::Compare(left, pairs) => {
                assert!(matches!(&*left.expr, Expr::Ident(ident) if ident.name == "a"));
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].0, CompareOp::Lt);
                assert_eq!(pairs[1].0, CompareOp::Gt);
            }
            expr => panic!("expected comparison chain, got {:?}", expr),
        }
    }
}
