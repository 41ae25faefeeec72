pub mod error;
pub mod token;

use compact_str::CompactString;
use error::LexerError;
use nom::Parser;
use nom::bytes::complete::is_not;
use nom::character::complete::digit1;
use nom::combinator::opt;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of},
    combinator::{map, map_opt, map_res, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded},
};
use nom_locate::position;
use token::{Token, TokenKind};

use crate::number::Number;
use crate::range::{Range, Span};
use crate::source::SourceId;

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| {
                let source_id = span.extra;
                Token {
                    range: span.into(),
                    kind: $kind,
                    source_id,
                }
            })
            .parse(input)
        }
    };
}

pub fn tokenize(input: &str, source_id: SourceId) -> Result<Vec<Token>, LexerError> {
    match tokens(Span::new_extra(input, source_id)) {
        Ok((span, tokens)) => {
            let eof: Range = span.into();

            if eof.start == eof.end {
                Ok([
                    tokens,
                    vec![Token {
                        range: eof,
                        kind: TokenKind::Eof,
                        source_id,
                    }],
                ]
                .concat())
            } else {
                Err(LexerError::UnexpectedEOFDetected)
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(LexerError::UnexpectedToken(Token {
                range: e.input.into(),
                kind: TokenKind::Eof,
                source_id,
            }))
        }
        _ => unreachable!(),
    }
}

fn unicode(input: Span) -> IResult<Span, char> {
    map_opt(
        map_res(
            preceded(
                char('u'),
                delimited(
                    char('{'),
                    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                    char('}'),
                ),
            ),
            |span: Span| u32::from_str_radix(span.fragment(), 16),
        ),
        char::from_u32,
    )
    .parse(input)
}

fn inline_comment(input: Span) -> IResult<Span, Token> {
    map(preceded(char('#'), is_not("\n\r")), |span: Span| {
        let source_id = span.extra;
        let kind = TokenKind::Comment(span.fragment().to_string());
        Token {
            range: span.into(),
            kind,
            source_id,
        }
    })
    .parse(input)
}

define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(pipe, "|", TokenKind::Pipe);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(semi_colon, ";", TokenKind::SemiColon);
define_token_parser!(pow, "**", TokenKind::Pow);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(def, "def ", TokenKind::Def);
define_token_parser!(let_, "let ", TokenKind::Let);
define_token_parser!(
    empty_string,
    "\"\"",
    TokenKind::StringLiteral(String::new())
);

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        pow, eq_eq, ne_eq, lte, gte, lt, gt, equal, plus, minus, asterisk, slash, percent, l_paren,
        r_paren, comma, colon, semi_colon, pipe,
    ))
    .parse(input)
}

fn keywords(input: Span) -> IResult<Span, Token> {
    alt((def, let_)).parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |span: Span| {
            span.fragment().parse().map(|s: f64| {
                let source_id = span.extra;
                Token {
                    range: span.into(),
                    kind: TokenKind::NumberLiteral(Number::new(s)),
                    source_id,
                }
            })
        },
    )
    .parse(input)
}

// `.N` is a dedicated argument-reference token, not a float with a missing
// integer part; the digits are a zero-based index into the template arguments.
fn arg_ref(input: Span) -> IResult<Span, Token> {
    map_res(preceded(char('.'), digit1), |span: Span| {
        span.fragment().parse().map(|index: usize| {
            let source_id = span.extra;
            Token {
                range: span.into(),
                kind: TokenKind::ArgRef(index),
                source_id,
            }
        })
    })
    .parse(input)
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, s) = delimited(
        char('"'),
        escaped_transform(
            none_of("\"\\"),
            '\\',
            alt((
                value('\\', char('\\')),
                value('\"', char('\"')),
                value('\r', char('r')),
                value('\n', char('n')),
                value('\t', char('t')),
                unicode,
            )),
        ),
        char('"'),
    )
    .parse(span)?;
    let (span, end) = position(span)?;
    let source_id = start.extra;

    Ok((
        span,
        Token {
            range: Range {
                start: start.into(),
                end: end.into(),
            },
            kind: TokenKind::StringLiteral(s.to_string()),
            source_id,
        },
    ))
}

fn literals(input: Span) -> IResult<Span, Token> {
    alt((number_literal, empty_string, string_literal)).parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| {
            let source_id = span.extra;
            let kind = match *span.fragment() {
                "true" => TokenKind::BoolLiteral(true),
                "false" => TokenKind::BoolLiteral(false),
                "None" => TokenKind::None,
                fragment => TokenKind::Ident(CompactString::new(fragment)),
            };
            Token {
                range: span.into(),
                kind,
                source_id,
            }
        },
    )
    .parse(input)
}

fn decorator(input: Span) -> IResult<Span, Token> {
    preceded(
        tag("@"),
        map(
            recognize(many1(alt((alphanumeric1, tag("_"))))),
            |span: Span| {
                let kind = TokenKind::Decorator(CompactString::new(span.fragment()));
                let source_id = span.extra;
                Token {
                    range: span.into(),
                    kind,
                    source_id,
                }
            },
        ),
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        inline_comment,
        decorator,
        keywords,
        literals,
        arg_ref,
        punctuations,
        ident,
    ))
    .parse(input)
}

fn tokens(input: Span) -> IResult<Span, Vec<Token>> {
    many0(delimited(multispace0, token, multispace0)).parse(input)
}

#[cfg(test)]
mod tests {
    use crate::range::Position;

    use super::*;
    use rstest::rstest;

    fn source() -> SourceId {
        SourceId::TOP_LEVEL
    }

    #[rstest]
    #[case("Ensure(x)",
        Ok(vec![
          Token{range: Range { start: Position {line: 1, column: 1}, end: Position {line: 1, column: 7} }, kind: TokenKind::Ident(CompactString::new("Ensure")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 7}, end: Position {line: 1, column: 8} }, kind: TokenKind::LParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 8}, end: Position {line: 1, column: 9} }, kind: TokenKind::Ident(CompactString::new("x")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 9}, end: Position {line: 1, column: 10} }, kind: TokenKind::RParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 10}, end: Position {line: 1, column: 10} }, kind: TokenKind::Eof, source_id: source()}]))]
    #[case("Assert<.0 ** 2 == .1>(x, y)",
        Ok(vec![
          Token{range: Range { start: Position {line: 1, column: 1}, end: Position {line: 1, column: 7} }, kind: TokenKind::Ident(CompactString::new("Assert")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 7}, end: Position {line: 1, column: 8} }, kind: TokenKind::Lt, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 9}, end: Position {line: 1, column: 10} }, kind: TokenKind::ArgRef(0), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 11}, end: Position {line: 1, column: 13} }, kind: TokenKind::Pow, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 14}, end: Position {line: 1, column: 15} }, kind: TokenKind::NumberLiteral(2.into()), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 16}, end: Position {line: 1, column: 18} }, kind: TokenKind::EqEq, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 20}, end: Position {line: 1, column: 21} }, kind: TokenKind::ArgRef(1), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 21}, end: Position {line: 1, column: 22} }, kind: TokenKind::Gt, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 22}, end: Position {line: 1, column: 23} }, kind: TokenKind::LParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 23}, end: Position {line: 1, column: 24} }, kind: TokenKind::Ident(CompactString::new("x")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 24}, end: Position {line: 1, column: 25} }, kind: TokenKind::Comma, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 26}, end: Position {line: 1, column: 27} }, kind: TokenKind::Ident(CompactString::new("y")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 27}, end: Position {line: 1, column: 28} }, kind: TokenKind::RParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 28}, end: Position {line: 1, column: 28} }, kind: TokenKind::Eof, source_id: source()}]))]
    #[case("def foo(x): x;",
        Ok(vec![
          Token{range: Range { start: Position {line: 1, column: 1}, end: Position {line: 1, column: 4} }, kind: TokenKind::Def, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 5}, end: Position {line: 1, column: 8} }, kind: TokenKind::Ident(CompactString::new("foo")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 8}, end: Position {line: 1, column: 9} }, kind: TokenKind::LParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 9}, end: Position {line: 1, column: 10} }, kind: TokenKind::Ident(CompactString::new("x")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 10}, end: Position {line: 1, column: 11} }, kind: TokenKind::RParen, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 11}, end: Position {line: 1, column: 12} }, kind: TokenKind::Colon, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 13}, end: Position {line: 1, column: 14} }, kind: TokenKind::Ident(CompactString::new("x")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 14}, end: Position {line: 1, column: 15} }, kind: TokenKind::SemiColon, source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 15}, end: Position {line: 1, column: 15} }, kind: TokenKind::Eof, source_id: source()}]))]
    #[case("@template",
        Ok(vec![
          Token{range: Range { start: Position {line: 1, column: 2}, end: Position {line: 1, column: 10} }, kind: TokenKind::Decorator(CompactString::new("template")), source_id: source()},
          Token{range: Range { start: Position {line: 1, column: 10}, end: Position {line: 1, column: 10} }, kind: TokenKind::Eof, source_id: source()}]))]
    #[case("\"test", Err(LexerError::UnexpectedEOFDetected))]
    fn test_tokenize(#[case] input: &str, #[case] expected: Result<Vec<Token>, LexerError>) {
        assert_eq!(tokenize(input, source()), expected);
    }

    #[rstest]
    #[case("0.5", TokenKind::NumberLiteral(Number::new(0.5)))]
    #[case("42", TokenKind::NumberLiteral(42.into()))]
    #[case(".5", TokenKind::ArgRef(5))]
    #[case(".10", TokenKind::ArgRef(10))]
    #[case("true", TokenKind::BoolLiteral(true))]
    #[case("false", TokenKind::BoolLiteral(false))]
    #[case("None", TokenKind::None)]
    #[case("\"a\\nb\"", TokenKind::StringLiteral("a\nb".to_string()))]
    #[case("\"\"", TokenKind::StringLiteral(String::new()))]
    fn test_single_token(#[case] input: &str, #[case] expected: TokenKind) {
        let tokens = tokenize(input, source()).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, expected);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[rstest]
    fn test_minus_is_not_part_of_number() {
        let tokens = tokenize("1-2", source()).unwrap();
        let kinds = tokens.into_iter().map(|t| t.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                TokenKind::NumberLiteral(1.into()),
                TokenKind::Minus,
                TokenKind::NumberLiteral(2.into()),
                TokenKind::Eof
            ]
        );
    }
}
