// Tree-walking evaluator for compiled functions.
//
// The engine installs each compiled definition into the root environment;
// calls bind parameters in a child scope and evaluate the body expressions
// in order, the last value being the function's result. Template invocations
// dispatch through the registry in `crate::template`.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

pub mod builtin;
pub mod env;
pub mod error;
pub mod runtime_value;

use rustc_hash::FxHashMap;

use crate::arena::Arena;
use crate::ast::node::{CompareOp, Expr, Ident, Literal, Node, Params};
use crate::ast::{IdentName, Program, TokenId};
use crate::lexer::token::Token;
use crate::template::{TemplateError, TemplateRegistry};

use env::Env;
use error::EvalError;
use runtime_value::RuntimeValue;

/// Configuration options for the evaluator.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum depth of the call stack to prevent infinite recursion.
    pub max_call_stack_depth: u32,
}

#[cfg(debug_assertions)]
impl Default for Options {
    fn default() -> Self {
        Self {
            max_call_stack_depth: 32,
        }
    }
}

#[cfg(not(debug_assertions))]
impl Default for Options {
    fn default() -> Self {
        Self {
            max_call_stack_depth: 192,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    env: Rc<RefCell<Env>>,
    token_arena: Rc<RefCell<Arena<Rc<Token>>>>,
    templates: TemplateRegistry,
    /// Definition-site token for each installed function, for errors raised
    /// by name-based calls.
    definitions: FxHashMap<IdentName, TokenId>,
    call_stack_depth: u32,
    pub(crate) options: Options,
}

impl Evaluator {
    pub(crate) fn new(token_arena: Rc<RefCell<Arena<Rc<Token>>>>) -> Self {
        Self {
            env: Rc::new(RefCell::new(Env::default())),
            token_arena,
            templates: TemplateRegistry::with_builtin_templates(),
            definitions: FxHashMap::default(),
            call_stack_depth: 0,
            options: Options::default(),
        }
    }

    pub(crate) fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    pub(crate) fn defined_functions(&self) -> Vec<IdentName> {
        self.definitions.keys().cloned().collect()
    }

    fn token(&self, token_id: TokenId) -> Token {
        (*self.token_arena.borrow()[token_id]).clone()
    }

    /// Installs a compiled definition under its own name in the root scope.
    /// The function captures the root environment, so other installed
    /// functions and built-ins resolve exactly as they would have at the
    /// definition site.
    pub(crate) fn define_function(&mut self, node: &Rc<Node>) -> Result<IdentName, EvalError> {
        match &*node.expr {
            Expr::Def(name, params, _, body) => {
                self.env.borrow_mut().define(
                    name.name.clone(),
                    RuntimeValue::Function(params.clone(), body.clone(), Rc::clone(&self.env)),
                );
                self.definitions.insert(name.name.clone(), node.token_id);
                Ok(name.name.clone())
            }
            _ => Err(EvalError::InternalError(self.token(node.token_id))),
        }
    }

    /// Invokes an installed function by name.
    pub(crate) fn call(
        &mut self,
        name: &str,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, EvalError> {
        let token_id = match self.definitions.get(name) {
            Some(token_id) => *token_id,
            None => return Err(EvalError::FunctionNotFound(IdentName::from(name))),
        };
        let resolved = self.env.borrow().resolve(&IdentName::from(name));

        match resolved {
            Ok(RuntimeValue::Function(params, body, closure_env)) => {
                if params.len() != args.len() {
                    return Err(EvalError::InvalidNumberOfArguments(
                        self.token(token_id),
                        IdentName::from(name),
                        params.len() as u8,
                        args.len() as u8,
                    ));
                }
                self.eval_function(&params, &body, &closure_env, args)
            }
            Ok(_) => Err(EvalError::NotAFunction(
                self.token(token_id),
                IdentName::from(name),
            )),
            Err(_) => Err(EvalError::FunctionNotFound(IdentName::from(name))),
        }
    }

    fn eval_function(
        &mut self,
        params: &Params,
        body: &Program,
        closure_env: &Rc<RefCell<Env>>,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, EvalError> {
        self.call_stack_depth += 1;
        if self.call_stack_depth > self.options.max_call_stack_depth {
            self.call_stack_depth -= 1;
            return Err(EvalError::RecursionError(self.options.max_call_stack_depth));
        }

        let env = Rc::new(RefCell::new(Env::with_parent(Rc::downgrade(closure_env))));
        for (param, arg) in params.iter().zip(args) {
            env.borrow_mut().define(param.name.name.clone(), arg);
        }

        let result = self.eval_program(&env, body);
        self.call_stack_depth -= 1;
        result
    }

    fn eval_program(
        &mut self,
        env: &Rc<RefCell<Env>>,
        program: &Program,
    ) -> Result<RuntimeValue, EvalError> {
        let mut value = RuntimeValue::None;
        for node in program {
            value = self.eval_node(env, node)?;
        }
        Ok(value)
    }

    fn eval_node(
        &mut self,
        env: &Rc<RefCell<Env>>,
        node: &Rc<Node>,
    ) -> Result<RuntimeValue, EvalError> {
        match &*node.expr {
            Expr::Literal(Literal::Number(n)) => Ok(RuntimeValue::Number(*n)),
            Expr::Literal(Literal::Bool(b)) => Ok(RuntimeValue::Bool(*b)),
            Expr::Literal(Literal::String(s)) => Ok(RuntimeValue::String(s.clone())),
            Expr::Literal(Literal::None) => Ok(RuntimeValue::None),
            Expr::Ident(ident) => env
                .borrow()
                .resolve(&ident.name)
                .map_err(|_| EvalError::NotDefined(self.token(node.token_id), ident.name.clone())),
            Expr::ArgRef(index) => Err(EvalError::ArgRefOutsideTemplate(
                self.token(node.token_id),
                *index,
            )),
            Expr::Paren(inner) => self.eval_node(env, inner),
            Expr::Tuple(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.eval_node(env, element))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                Ok(RuntimeValue::Tuple(values))
            }
            Expr::Let(ident, value) => {
                let value = self.eval_node(env, value)?;
                env.borrow_mut().define(ident.name.clone(), value.clone());
                Ok(value)
            }
            Expr::Call(ident, args) => {
                let arg_values = args
                    .iter()
                    .map(|arg| self.eval_node(env, arg))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                self.eval_call(env, node, ident, arg_values)
            }
            Expr::Compare(left, pairs) => {
                let mut prev = self.eval_node(env, left)?;
                for (op, operand) in pairs {
                    let next = self.eval_node(env, operand)?;
                    if !self.compare(node, *op, &prev, &next)? {
                        return Ok(RuntimeValue::FALSE);
                    }
                    prev = next;
                }
                Ok(RuntimeValue::TRUE)
            }
            Expr::TemplateCall(ident, context, template_args) => {
                let handler = self.templates.resolve(&ident.name).ok_or_else(|| {
                    EvalError::UnknownTemplate(self.token(node.token_id), ident.name.clone())
                })?;

                let mut context_values = context
                    .iter()
                    .map(|arg| self.eval_node(env, arg))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                // The rewriter always emits exactly one context argument.
                if context_values.len() != 1 {
                    return Err(EvalError::InternalError(self.token(node.token_id)));
                }
                let expr_value = context_values.pop().unwrap_or_default();

                let template_arg_values = template_args
                    .iter()
                    .map(|arg| self.eval_node(env, arg))
                    .collect::<Result<Vec<_>, EvalError>>()?;

                (*handler)(expr_value, &template_arg_values).map_err(|e| match e {
                    TemplateError::AssertionFailed(check) => {
                        EvalError::AssertionFailed(self.token(node.token_id), check)
                    }
                    TemplateError::Message(message) => {
                        EvalError::TemplateFailed(self.token(node.token_id), message)
                    }
                })
            }
            Expr::Def(_, _, _, _) => Err(EvalError::InternalError(self.token(node.token_id))),
        }
    }

    fn eval_call(
        &mut self,
        env: &Rc<RefCell<Env>>,
        node: &Rc<Node>,
        ident: &Ident,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, EvalError> {
        let resolved = env.borrow().resolve(&ident.name);

        match resolved {
            Ok(RuntimeValue::Function(params, body, closure_env)) => {
                if params.len() != args.len() {
                    return Err(EvalError::InvalidNumberOfArguments(
                        self.token(node.token_id),
                        ident.name.clone(),
                        params.len() as u8,
                        args.len() as u8,
                    ));
                }
                self.eval_function(&params, &body, &closure_env, args)
            }
            Ok(RuntimeValue::NativeFunction(native)) => self.eval_builtin(node, &native, args),
            Ok(_) => Err(EvalError::NotAFunction(
                self.token(node.token_id),
                ident.name.clone(),
            )),
            Err(_) => Err(EvalError::NotDefined(
                self.token(node.token_id),
                ident.name.clone(),
            )),
        }
    }

    fn eval_builtin(
        &self,
        node: &Rc<Node>,
        ident: &Ident,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, EvalError> {
        let builtin = builtin::get(&ident.name).ok_or_else(|| {
            EvalError::NotDefined(self.token(node.token_id), ident.name.clone())
        })?;

        if builtin.num_params as usize != args.len() {
            return Err(EvalError::InvalidNumberOfArguments(
                self.token(node.token_id),
                ident.name.clone(),
                builtin.num_params,
                args.len() as u8,
            ));
        }

        (builtin.func)(ident, &args).map_err(|e| match e {
            builtin::Error::InvalidTypes(name, got) => EvalError::InvalidTypes {
                token: self.token(node.token_id),
                name: IdentName::from(name),
                args: vec![got],
            },
            builtin::Error::ZeroDivision => EvalError::ZeroDivision(self.token(node.token_id)),
        })
    }

    fn compare(
        &self,
        node: &Rc<Node>,
        op: CompareOp,
        left: &RuntimeValue,
        right: &RuntimeValue,
    ) -> Result<bool, EvalError> {
        let result = match op {
            CompareOp::Eq => Some(left == right),
            CompareOp::Ne => Some(left != right),
            CompareOp::Lt => left.partial_cmp(right).map(|o| o == Ordering::Less),
            CompareOp::Lte => left.partial_cmp(right).map(|o| o != Ordering::Greater),
            CompareOp::Gt => left.partial_cmp(right).map(|o| o == Ordering::Greater),
            CompareOp::Gte => left.partial_cmp(right).map(|o| o != Ordering::Less),
        };

        result.ok_or_else(|| EvalError::InvalidTypes {
            token: self.token(node.token_id),
            name: IdentName::from(op.to_string().as_str()),
            args: vec![format!("{:?}", left), format!("{:?}", right)],
        })
    }
}
