// Rewrites qualifying comparison chains into template invocations.
//
// A chain qualifies when it has at least two operators, starts with `<`,
// ends with `>`, and its leftmost operand is a plain identifier:
//
//   Ensure<int(.0)>(x)        =>  TemplateCall(Ensure, [int(x)], [x])
//   Assert<.0 ** 2 == .1>(x, y)
//       =>  TemplateCall(Assert, [x ** 2 == y], [x, y, "x ** 2 == y"])
//
// Everything else is an identity transformation that recurses into children.
use std::cell::RefCell;
use std::rc::Rc;

use smallvec::smallvec;

use crate::arena::Arena;
use crate::ast::Program;
use crate::ast::node::{Args, CompareOp, Expr, Ident, Literal, Node};
use crate::compiler::error::CompileError;
use crate::lexer::token::Token;

pub(crate) struct Rewriter {
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
}

impl Rewriter {
    pub fn new(token_arena: Rc<RefCell<Arena<Rc<Token>>>>) -> Self {
        Self { token_arena }
    }

    pub fn rewrite_program(&self, program: &Program) -> Result<Program, CompileError> {
        program.iter().map(|node| self.rewrite(node)).collect()
    }

    /// Pure transformation: returns a new tree and leaves the input intact.
    pub fn rewrite(&self, node: &Rc<Node>) -> Result<Rc<Node>, CompileError> {
        match &*node.expr {
            Expr::Compare(left, pairs) if Self::qualifies(left, pairs) => {
                self.rewrite_chain(node, left, pairs)
            }
            Expr::Compare(left, pairs) => {
                let left = self.rewrite(left)?;
                let pairs = pairs
                    .iter()
                    .map(|(op, operand)| Ok((*op, self.rewrite(operand)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Compare(left, pairs)),
                }))
            }
            Expr::Call(ident, args) => {
                let args = self.rewrite_args(args)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Call(ident.clone(), args)),
                }))
            }
            Expr::TemplateCall(ident, context, template_args) => {
                let context = self.rewrite_args(context)?;
                let template_args = self.rewrite_args(template_args)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::TemplateCall(ident.clone(), context, template_args)),
                }))
            }
            Expr::Tuple(elements) => {
                let elements = self.rewrite_args(elements)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Tuple(elements)),
                }))
            }
            Expr::Paren(inner) => {
                let inner = self.rewrite(inner)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Paren(inner)),
                }))
            }
            Expr::Let(ident, value) => {
                let value = self.rewrite(value)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Let(ident.clone(), value)),
                }))
            }
            Expr::Def(name, params, decorators, body) => {
                let body = self.rewrite_program(body)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Def(
                        name.clone(),
                        params.clone(),
                        decorators.clone(),
                        body,
                    )),
                }))
            }
            Expr::Literal(_) | Expr::Ident(_) | Expr::ArgRef(_) => Ok(Rc::clone(node)),
        }
    }

    fn rewrite_args(&self, args: &Args) -> Result<Args, CompileError> {
        args.iter().map(|arg| self.rewrite(arg)).collect()
    }

    fn qualifies(left: &Rc<Node>, pairs: &[(CompareOp, Rc<Node>)]) -> bool {
        pairs.len() >= 2
            && matches!(pairs.first(), Some((CompareOp::Lt, _)))
            && matches!(pairs.last(), Some((CompareOp::Gt, _)))
            && matches!(&*left.expr, Expr::Ident(_))
    }

    fn rewrite_chain(
        &self,
        node: &Rc<Node>,
        left: &Rc<Node>,
        pairs: &[(CompareOp, Rc<Node>)],
    ) -> Result<Rc<Node>, CompileError> {
        let template = match &*left.expr {
            Expr::Ident(ident) => ident.clone(),
            _ => unreachable!("qualifies() requires an identifier head"),
        };

        let operands = pairs.iter().map(|(_, operand)| operand).collect::<Vec<_>>();
        let checks = pairs[1..pairs.len() - 1]
            .iter()
            .map(|(op, _)| *op)
            .collect::<Vec<_>>();
        let context_vars = &operands[..operands.len() - 1];
        let template_args_node = operands[operands.len() - 1];

        // Normalize the final operand into an ordered argument sequence.
        let mut template_args: Args = match &*template_args_node.expr {
            Expr::Tuple(elements) => elements.clone(),
            Expr::Paren(inner) => smallvec![Rc::clone(inner)],
            _ => smallvec![Rc::clone(template_args_node)],
        };

        let translation = template_args.clone();
        let substituter = ArgSubstituter {
            template: &template,
            translation: &translation,
            token_arena: &self.token_arena,
        };

        let mut context_args = context_vars
            .iter()
            .map(|var| substituter.substitute(var))
            .collect::<Result<Vec<_>, CompileError>>()?;

        if !checks.is_empty() {
            // Fold the rewritten context expressions back into one chain and
            // append its rendering so the handler can name the failing
            // expression. The text comes from the rewritten nodes, not the
            // original call site; substituted expressions show substituted.
            let mut rest = context_args.drain(..);
            let first = rest.next().expect("context is never empty here");
            let synthetic_pairs = checks
                .iter()
                .zip(rest)
                .map(|(op, operand)| (*op, operand))
                .collect::<Vec<_>>();
            let synthetic = Rc::new(Node {
                token_id: node.token_id,
                expr: Rc::new(Expr::Compare(first, synthetic_pairs)),
            });
            template_args.push(Rc::new(Node {
                token_id: node.token_id,
                expr: Rc::new(Expr::Literal(Literal::String(synthetic.to_code()))),
            }));
            context_args = vec![synthetic];
        }

        Ok(Rc::new(Node {
            token_id: node.token_id,
            expr: Rc::new(Expr::TemplateCall(
                template,
                context_args.into_iter().collect(),
                template_args,
            )),
        }))
    }
}

struct ArgSubstituter<'a> {
    template: &'a Ident,
    translation: &'a [Rc<Node>],
    token_arena: &'a Rc<RefCell<Arena<Rc<Token>>>>,
}

impl ArgSubstituter<'_> {
    fn substitute(&self, node: &Rc<Node>) -> Result<Rc<Node>, CompileError> {
        match &*node.expr {
            Expr::ArgRef(index) => {
                if *index >= self.translation.len() {
                    let token = (*self.token_arena.borrow()[node.token_id]).clone();
                    return Err(CompileError::ArgRefOutOfRange(
                        token,
                        self.template.name.clone(),
                        *index,
                        self.translation.len(),
                    ));
                }
                // Structural copy, not a move: the argument node stays usable
                // in the final argument tuple. The copy takes over the
                // placeholder's location so diagnostics point at the call site.
                let copy = deep_copy(&self.translation[*index]);
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::clone(&copy.expr),
                }))
            }
            Expr::Call(ident, args) => {
                let args = self.substitute_args(args)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Call(ident.clone(), args)),
                }))
            }
            Expr::Compare(left, pairs) => {
                let left = self.substitute(left)?;
                let pairs = pairs
                    .iter()
                    .map(|(op, operand)| Ok((*op, self.substitute(operand)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Compare(left, pairs)),
                }))
            }
            Expr::TemplateCall(ident, context, template_args) => {
                let context = self.substitute_args(context)?;
                let template_args = self.substitute_args(template_args)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::TemplateCall(ident.clone(), context, template_args)),
                }))
            }
            Expr::Tuple(elements) => {
                let elements = self.substitute_args(elements)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Tuple(elements)),
                }))
            }
            Expr::Paren(inner) => {
                let inner = self.substitute(inner)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Paren(inner)),
                }))
            }
            Expr::Let(ident, value) => {
                let value = self.substitute(value)?;
                Ok(Rc::new(Node {
                    token_id: node.token_id,
                    expr: Rc::new(Expr::Let(ident.clone(), value)),
                }))
            }
            Expr::Literal(_) | Expr::Ident(_) | Expr::Def(..) => Ok(Rc::clone(node)),
        }
    }

    fn substitute_args(&self, args: &Args) -> Result<Args, CompileError> {
        args.iter().map(|arg| self.substitute(arg)).collect()
    }
}

fn deep_copy(node: &Rc<Node>) -> Rc<Node> {
    let expr = match &*node.expr {
        Expr::Call(ident, args) => Expr::Call(ident.clone(), args.iter().map(deep_copy).collect()),
        Expr::Compare(left, pairs) => Expr::Compare(
            deep_copy(left),
            pairs
                .iter()
                .map(|(op, operand)| (*op, deep_copy(operand)))
                .collect(),
        ),
        Expr::TemplateCall(ident, context, template_args) => Expr::TemplateCall(
            ident.clone(),
            context.iter().map(deep_copy).collect(),
            template_args.iter().map(deep_copy).collect(),
        ),
        Expr::Tuple(elements) => Expr::Tuple(elements.iter().map(deep_copy).collect()),
        Expr::Paren(inner) => Expr::Paren(deep_copy(inner)),
        Expr::Let(ident, value) => Expr::Let(ident.clone(), deep_copy(value)),
        Expr::Def(name, params, decorators, body) => Expr::Def(
            name.clone(),
            params.clone(),
            decorators.clone(),
            body.iter().map(deep_copy).collect(),
        ),
        expr @ (Expr::Literal(_) | Expr::Ident(_) | Expr::ArgRef(_)) => expr.clone(),
    };

    Rc::new(Node {
        token_id: node.token_id,
        expr: Rc::new(expr),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::Parser;
    use crate::lexer;
    use crate::source::SourceId;
    use rstest::rstest;

    fn rewrite_source(code: &str) -> Result<Vec<String>, CompileError> {
        let tokens = lexer::tokenize(code, SourceId::TOP_LEVEL).expect("tokenize failed");
        let tokens = tokens.into_iter().map(Rc::new).collect::<Vec<_>>();
        let token_arena = Rc::new(RefCell::new(Arena::new(100)));
        let program = Parser::new(tokens.iter(), Rc::clone(&token_arena))
            .parse()
            .expect("parse failed");

        Rewriter::new(token_arena)
            .rewrite_program(&program)
            .map(|program| program.iter().map(|node| node.to_code()).collect())
    }

    #[rstest]
    #[case::no_chain("x + 1", "x + 1")]
    #[case::single_op_chain("a < b", "a < b")]
    #[case::wrong_first_op("T <= a > b", "T <= a > b")]
    #[case::wrong_last_op("T < a >= b", "T < a >= b")]
    #[case::non_ident_head("(f) < a > b", "(f) < a > b")]
    #[case::simple("Ensure<int(.0)>(x)", "Ensure<int(x)>(x)")]
    #[case::bare_arg("Ensure<.0>(x)", "Ensure<x>(x)")]
    #[case::tuple_args("Pick<.1>(x, y)", "Pick<y>(x, y)")]
    #[case::intermediate_op(
        "Assert<.0 ** 2 == .1>(x, y)",
        "Assert<x ** 2 == y>(x, y, \"x ** 2 == y\")"
    )]
    #[case::nested_in_call("f(Ensure<.0>(x))", "f(Ensure<x>(x))")]
    #[case::inside_def(
        "def foo(x): Ensure<int(.0)>(x);",
        "def foo(x): Ensure<int(x)>(x);"
    )]
    fn test_rewrite(#[case] code: &str, #[case] expected: &str) {
        let nodes = rewrite_source(code).expect("rewrite failed");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0], expected);
    }

    #[rstest]
    #[case("Ensure<int(.1)>(x)", "Ensure", 1, 1)]
    #[case("Pick<.2>(x, y)", "Pick", 2, 2)]
    #[case("Ensure<.0>()", "Ensure", 0, 0)]
    fn test_arg_ref_out_of_range(
        #[case] code: &str,
        #[case] template: &str,
        #[case] index: usize,
        #[case] available: usize,
    ) {
        match rewrite_source(code) {
            Err(CompileError::ArgRefOutOfRange(_, name, i, len)) => {
                assert_eq!(name, template);
                assert_eq!(i, index);
                assert_eq!(len, available);
            }
            other => panic!("expected ArgRefOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_substituted_copy_is_distinct() {
        let tokens = lexer::tokenize("Ensure<.0 + .0>(x)", SourceId::TOP_LEVEL)
            .expect("tokenize failed");
        let tokens = tokens.into_iter().map(Rc::new).collect::<Vec<_>>();
        let token_arena = Rc::new(RefCell::new(Arena::new(100)));
        let program = Parser::new(tokens.iter(), Rc::clone(&token_arena))
            .parse()
            .expect("parse failed");

        let rewritten = Rewriter::new(token_arena)
            .rewrite(&program[0])
            .expect("rewrite failed");

        match &*rewritten.expr {
            Expr::TemplateCall(_, context, template_args) => {
                let original_arg = &template_args[0];
                let substituted = match &*context[0].expr {
                    Expr::Call(_, args) => args,
                    expr => panic!("expected call, got {:?}", expr),
                };
                // Both substitutions are copies: distinct allocations that
                // render back to the original argument's source text.
                assert!(!Rc::ptr_eq(&substituted[0].expr, &original_arg.expr));
                assert!(!Rc::ptr_eq(&substituted[1].expr, &original_arg.expr));
                assert!(!Rc::ptr_eq(&substituted[0].expr, &substituted[1].expr));
                assert_eq!(substituted[0].to_code(), original_arg.to_code());
            }
            expr => panic!("expected template call, got {:?}", expr),
        }
    }
}
