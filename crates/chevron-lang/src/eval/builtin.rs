use std::sync::LazyLock;

use compact_str::CompactString;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::runtime_value::RuntimeValue;
use crate::ast::node::Ident;
use crate::number::Number;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid types for \"{0}\", got {1}")]
    InvalidTypes(String, String),
    #[error("Divided by 0")]
    ZeroDivision,
}

#[derive(Clone, Debug)]
pub struct BuiltinFunction {
    pub num_params: u8,
    pub func: fn(&Ident, &[RuntimeValue]) -> Result<RuntimeValue, Error>,
}

impl BuiltinFunction {
    fn new(
        num_params: u8,
        func: fn(&Ident, &[RuntimeValue]) -> Result<RuntimeValue, Error>,
    ) -> Self {
        BuiltinFunction { num_params, func }
    }
}

fn invalid_types(ident: &Ident, args: &[RuntimeValue]) -> Error {
    Error::InvalidTypes(
        ident.to_string(),
        args.iter().map(|arg| format!("{:?}", arg)).join(", "),
    )
}

pub static BUILTIN_FUNCTIONS: LazyLock<FxHashMap<CompactString, BuiltinFunction>> =
    LazyLock::new(|| {
        let mut map = FxHashMap::default();

        map.insert(
            CompactString::new("add"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok((*a + *b).into()),
                [RuntimeValue::String(a), RuntimeValue::String(b)] => {
                    Ok(format!("{}{}", a, b).into())
                }
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("sub"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok((*a - *b).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("mul"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok((*a * *b).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("div"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(_), RuntimeValue::Number(b)] if b.is_zero() => {
                    Err(Error::ZeroDivision)
                }
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok((*a / *b).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("mod"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(_), RuntimeValue::Number(b)] if b.is_zero() => {
                    Err(Error::ZeroDivision)
                }
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok((*a % *b).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("pow"),
            BuiltinFunction::new(2, |ident, args| match args {
                [RuntimeValue::Number(a), RuntimeValue::Number(b)] => Ok(a.pow(*b).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("neg"),
            BuiltinFunction::new(1, |ident, args| match args {
                [RuntimeValue::Number(a)] => Ok((-*a).into()),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("int"),
            BuiltinFunction::new(1, |ident, args| match args {
                [RuntimeValue::Number(n)] => Ok(n.trunc().into()),
                [RuntimeValue::Bool(b)] => Ok(Number::from(*b as i64).into()),
                [RuntimeValue::String(s)] => s
                    .trim()
                    .parse::<f64>()
                    .map(|n| Number::new(n).trunc().into())
                    .map_err(|_| invalid_types(ident, args)),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("float"),
            BuiltinFunction::new(1, |ident, args| match args {
                [RuntimeValue::Number(n)] => Ok((*n).into()),
                [RuntimeValue::Bool(b)] => Ok(Number::from(*b as i64).into()),
                [RuntimeValue::String(s)] => s
                    .trim()
                    .parse::<f64>()
                    .map(|n| Number::new(n).into())
                    .map_err(|_| invalid_types(ident, args)),
                _ => Err(invalid_types(ident, args)),
            }),
        );
        map.insert(
            CompactString::new("str"),
            BuiltinFunction::new(1, |_, args| match args {
                [value] => Ok(value.to_string().into()),
                _ => unreachable!(),
            }),
        );

        map
    });

pub fn get(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTIN_FUNCTIONS.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call(name: &str, args: &[RuntimeValue]) -> Result<RuntimeValue, Error> {
        let builtin = get(name).unwrap_or_else(|| panic!("no builtin {}", name));
        (builtin.func)(&Ident::new(name), args)
    }

    #[rstest]
    #[case("add", vec![1.into(), 2.into()], Ok(RuntimeValue::Number(3.into())))]
    #[case("add", vec!["a".into(), "b".into()], Ok(RuntimeValue::String("ab".to_string())))]
    #[case("sub", vec![5.into(), 2.into()], Ok(RuntimeValue::Number(3.into())))]
    #[case("mul", vec![4.into(), 3.into()], Ok(RuntimeValue::Number(12.into())))]
    #[case("div", vec![9.into(), 3.into()], Ok(RuntimeValue::Number(3.into())))]
    #[case("div", vec![9.into(), 0.into()], Err(Error::ZeroDivision))]
    #[case("mod", vec![9.into(), 4.into()], Ok(RuntimeValue::Number(1.into())))]
    #[case("pow", vec![3.into(), 2.into()], Ok(RuntimeValue::Number(9.into())))]
    #[case("neg", vec![3.into()], Ok(RuntimeValue::Number(Number::new(-3.0))))]
    #[case("int", vec![RuntimeValue::Number(Number::new(3.9))], Ok(RuntimeValue::Number(3.into())))]
    #[case("int", vec!["42".into()], Ok(RuntimeValue::Number(42.into())))]
    #[case("int", vec![RuntimeValue::Bool(true)], Ok(RuntimeValue::Number(1.into())))]
    #[case("float", vec!["2.5".into()], Ok(RuntimeValue::Number(Number::new(2.5))))]
    #[case("str", vec![42.into()], Ok(RuntimeValue::String("42".to_string())))]
    fn test_builtins(
        #[case] name: &str,
        #[case] args: Vec<RuntimeValue>,
        #[case] expected: Result<RuntimeValue, Error>,
    ) {
        assert_eq!(call(name, &args), expected);
    }

    #[test]
    fn test_add_rejects_mixed_types() {
        let result = call("add", &[1.into(), "x".into()]);
        assert!(matches!(result, Err(Error::InvalidTypes(_, _))));
    }
}
