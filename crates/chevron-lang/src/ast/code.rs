use std::fmt::Write;

use itertools::Itertools;

use super::constants;
use super::node::{Args, Expr, Literal, Node, Param};

// Precedence levels used when rendering desugared operator calls back to
// their infix form: 0 comparison, 1 additive, 2 multiplicative, 3 power,
// 4 atomic.
const PREC_COMPARE: u8 = 0;
const PREC_ATOM: u8 = 4;

impl Node {
    /// Converts the AST node back to chevron source code.
    ///
    /// The output is valid source that, when parsed, produces an equivalent
    /// AST structure. Binary built-in calls introduced by the parser are
    /// rendered back in operator form, so diagnostics read like the call
    /// site (`x ** 2 == y`, not `eq(pow(x, 2), y)`).
    pub fn to_code(&self) -> String {
        let mut output = String::new();
        self.format_to_code(&mut output);
        output
    }

    fn precedence(&self) -> u8 {
        match &*self.expr {
            Expr::Compare(_, _) => PREC_COMPARE,
            Expr::Call(func, args) if args.len() == 2 => {
                operator_symbol(&func.name).map_or(PREC_ATOM, |(_, prec)| prec)
            }
            _ => PREC_ATOM,
        }
    }

    fn format_to_code(&self, buf: &mut String) {
        match &*self.expr {
            Expr::Literal(lit) => {
                format_literal(lit, buf);
            }
            Expr::Ident(ident) => {
                write!(buf, "{}", ident).unwrap();
            }
            Expr::ArgRef(index) => {
                write!(buf, ".{}", index).unwrap();
            }
            Expr::Call(func, args) if args.len() == 1 && func.name == constants::NEG => {
                buf.push('-');
                self.format_operand(&args[0], buf, 3);
            }
            Expr::Call(func, args) => {
                if let (Some((symbol, prec)), 2) = (operator_symbol(&func.name), args.len()) {
                    // Left-associative except `**`.
                    let (left_min, right_min) = if func.name == constants::POW {
                        (prec + 1, prec)
                    } else {
                        (prec, prec + 1)
                    };
                    self.format_operand(&args[0], buf, left_min);
                    write!(buf, " {} ", symbol).unwrap();
                    self.format_operand(&args[1], buf, right_min);
                } else {
                    write!(buf, "{}", func).unwrap();
                    buf.push('(');
                    format_args(args, buf);
                    buf.push(')');
                }
            }
            Expr::Compare(left, pairs) => {
                self.format_operand(left, buf, PREC_COMPARE + 1);
                for (op, operand) in pairs {
                    write!(buf, " {} ", op).unwrap();
                    self.format_operand(operand, buf, PREC_COMPARE + 1);
                }
            }
            Expr::TemplateCall(name, context, template_args) => {
                write!(buf, "{}", name).unwrap();
                buf.push('<');
                format_args(context, buf);
                buf.push('>');
                buf.push('(');
                format_args(template_args, buf);
                buf.push(')');
            }
            Expr::Tuple(elements) => {
                buf.push('(');
                format_args(elements, buf);
                if elements.len() == 1 {
                    buf.push(',');
                }
                buf.push(')');
            }
            Expr::Paren(node) => {
                buf.push('(');
                node.format_to_code(buf);
                buf.push(')');
            }
            Expr::Let(ident, value) => {
                write!(buf, "let {} = ", ident).unwrap();
                value.format_to_code(buf);
            }
            Expr::Def(name, params, decorators, body) => {
                for decorator in decorators {
                    writeln!(buf, "@{}", decorator).unwrap();
                }
                write!(buf, "def {}(", name).unwrap();
                format_params(params, buf);
                buf.push_str("): ");
                for (i, node) in body.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(" | ");
                    }
                    node.format_to_code(buf);
                }
                buf.push(';');
            }
        }
    }

    fn format_operand(&self, operand: &Node, buf: &mut String, min_prec: u8) {
        if operand.precedence() < min_prec {
            buf.push('(');
            operand.format_to_code(buf);
            buf.push(')');
        } else {
            operand.format_to_code(buf);
        }
    }
}

fn operator_symbol(name: &str) -> Option<(&'static str, u8)> {
    match name {
        constants::ADD => Some(("+", 1)),
        constants::SUB => Some(("-", 1)),
        constants::MUL => Some(("*", 2)),
        constants::DIV => Some(("/", 2)),
        constants::MOD => Some(("%", 2)),
        constants::POW => Some(("**", 3)),
        _ => None,
    }
}

fn format_args(args: &Args, buf: &mut String) {
    let rendered = args.iter().map(|arg| arg.to_code()).join(", ");
    buf.push_str(&rendered);
}

fn format_params(params: &[Param], buf: &mut String) {
    let rendered = params
        .iter()
        .map(|param| match &param.default {
            Some(default) => format!("{} = {}", param.name, default.to_code()),
            None => param.name.to_string(),
        })
        .join(", ");
    buf.push_str(&rendered);
}

fn format_literal(literal: &Literal, buf: &mut String) {
    match literal {
        Literal::String(s) => {
            buf.push('"');
            for c in s.chars() {
                match c {
                    '"' => buf.push_str("\\\""),
                    '\\' => buf.push_str("\\\\"),
                    '\n' => buf.push_str("\\n"),
                    '\r' => buf.push_str("\\r"),
                    '\t' => buf.push_str("\\t"),
                    _ => buf.push(c),
                }
            }
            buf.push('"');
        }
        Literal::Number(n) => {
            write!(buf, "{}", n).unwrap();
        }
        Literal::Bool(b) => {
            write!(buf, "{}", b).unwrap();
        }
        Literal::None => {
            buf.push_str("None");
        }
    }
}
