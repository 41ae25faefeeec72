use chevron_lang::{Engine, TemplateError, Value};
use rstest::{fixture, rstest};

#[fixture]
fn engine() -> Engine {
    Engine::default()
}

#[rstest]
#[case::ensure_conversion(
    "@template
     def coerce(x):
       Ensure<int(.0)>(x)
     ;",
    "coerce",
    vec![Value::from("42")],
    Value::Number(42.into()))]
#[case::ensure_truncates(
    "@template
     def coerce(x):
       Ensure<int(.0)>(x)
     ;",
    "coerce",
    vec![Value::from(3.7)],
    Value::Number(3.into()))]
#[case::assert_passes(
    "@template
     def foo(x, y):
       let x = Ensure<int(.0)>(x) |
       Assert<.0 ** 2 == .1>(x, y) |
       x + y
     ;",
    "foo",
    vec![Value::from(3), Value::from(9)],
    Value::Number(12.into()))]
#[case::assert_result_is_none(
    "@template
     def check(x):
       Assert<.0>(x)
     ;",
    "check",
    vec![Value::from(1)],
    Value::None)]
#[case::multiple_chains(
    "@template
     def both(x, y):
       let a = Ensure<int(.0)>(x) |
       let b = Ensure<int(.0)>(y) |
       a + b
     ;",
    "both",
    vec![Value::from("1"), Value::from("2")],
    Value::Number(3.into()))]
#[case::arithmetic_precedence(
    "@template
     def calc(x):
       1 + x * 3 ** 2
     ;",
    "calc",
    vec![Value::from(2)],
    Value::Number(19.into()))]
#[case::runtime_chain_holds(
    "@template
     def in_range(x):
       1 < x < 10
     ;",
    "in_range",
    vec![Value::from(5)],
    Value::Bool(true))]
#[case::runtime_chain_fails(
    "@template
     def in_range(x):
       1 < x < 10
     ;",
    "in_range",
    vec![Value::from(20)],
    Value::Bool(false))]
#[case::literal_head_chain_not_rewritten(
    "@template
     def positive(x):
       1 < x > 0
     ;",
    "positive",
    vec![Value::from(5)],
    Value::Bool(true))]
#[case::string_concat(
    "@template
     def greet(name):
       \"hello \" + name
     ;",
    "greet",
    vec![Value::from("world")],
    Value::String("hello world".to_string()))]
#[case::tuple_result(
    "@template
     def pair(x, y):
       (x, y)
     ;",
    "pair",
    vec![Value::from(1), Value::from(2)],
    Value::Tuple(vec![Value::Number(1.into()), Value::Number(2.into())]))]
#[case::leading_dot_is_arg_ref_but_decimals_are_numbers(
    "@template
     def scale(x):
       Ensure<.0 * 0.5>(x)
     ;",
    "scale",
    vec![Value::from(10)],
    Value::Number(5.into()))]
fn test_compile_and_call(
    mut engine: Engine,
    #[case] code: &str,
    #[case] name: &str,
    #[case] args: Vec<Value>,
    #[case] expected: Value,
) {
    engine.compile(code).expect("compile failed");
    let result = engine.call(name, args).expect("call failed");
    assert_eq!(result, expected);
}

#[rstest]
#[case::assert_names_the_rendered_expression(
    "@template
     def foo(x, y):
       Assert<.0 ** 2 == .1>(x, y)
     ;",
    "foo",
    vec![Value::from(3), Value::from(8)],
    "x ** 2 == y failed!")]
#[case::assert_without_diagnostic_uses_last_arg(
    "@template
     def check(x):
       Assert<.0>(x)
     ;",
    "check",
    vec![Value::from(0)],
    "failed!")]
#[case::unknown_template(
    "@template
     def f(x):
       Snapshot<.0>(x)
     ;",
    "f",
    vec![Value::from(1)],
    "Unknown template \"Snapshot\"")]
#[case::zero_division(
    "@template
     def d(x):
       x / 0
     ;",
    "d",
    vec![Value::from(1)],
    "Divided by 0")]
#[case::undefined_name(
    "@template
     def f(x):
       x + missing
     ;",
    "f",
    vec![Value::from(1)],
    "\"missing\" is not defined")]
#[case::wrong_argument_count(
    "@template
     def f(x, y):
       x + y
     ;",
    "f",
    vec![Value::from(1)],
    "Invalid number of arguments")]
fn test_call_error(
    mut engine: Engine,
    #[case] code: &str,
    #[case] name: &str,
    #[case] args: Vec<Value>,
    #[case] expected_message: &str,
) {
    engine.compile(code).expect("compile failed");
    let err = engine.call(name, args).expect_err("expected a call error");
    assert!(
        err.to_string().contains(expected_message),
        "error `{}` does not contain `{}`",
        err,
        expected_message
    );
}

#[rstest]
#[case::arg_ref_out_of_range(
    "@template
     def f(x):
       Ensure<int(.1)>(x)
     ;",
    "Template Ensure can't access `.1` since it only got 1 args")]
#[case::two_decorators(
    "@template
     @other
     def f(x):
       x
     ;",
    "Expected exactly one decorator, found 2")]
#[case::no_decorator(
    "def f(x):
       x
     ;",
    "Expected exactly one decorator, found 0")]
#[case::wrong_decorator(
    "@memoize
     def f(x):
       x
     ;",
    "Unknown decorator `@memoize`")]
#[case::defaulted_param(
    "@template
     def f(x, y = 1):
       x
     ;",
    "Default parameter values are not supported for \"y\"")]
#[case::bare_expression("1 + 2", "Expected a decorated function definition")]
#[case::two_definitions(
    "@template
     def a(x):
       x
     ;
     @template
     def b(x):
       x
     ;",
    "Expected a single function definition")]
#[case::unclosed_params("@template def f(x x;", "Expected a closing parenthesis")]
#[case::empty_body("@template def f(x): ;", "Unexpected token")]
fn test_compile_error(mut engine: Engine, #[case] code: &str, #[case] expected_message: &str) {
    let err = engine.compile(code).expect_err("expected a compile error");
    assert!(
        err.to_string().contains(expected_message),
        "error `{}` does not contain `{}`",
        err,
        expected_message
    );
    assert!(engine.defined_functions().is_empty());
}

#[rstest]
fn test_out_of_range_fails_before_any_call(mut engine: Engine) {
    // Decoration-time failure: nothing gets installed.
    let err = engine
        .compile("@template def f(x): Ensure<int(.3)>(x);")
        .expect_err("expected a compile error");
    assert!(err.to_string().contains("can't access `.3`"));
    assert!(engine.defined_functions().is_empty());
}

#[rstest]
fn test_compiled_functions_call_each_other(mut engine: Engine) {
    engine
        .compile("@template def inc(x): x + 1;")
        .expect("compile failed");
    engine
        .compile("@template def twice_inc(x): inc(inc(x));")
        .expect("compile failed");

    let result = engine
        .call("twice_inc", vec![Value::from(1)])
        .expect("call failed");
    assert_eq!(result, Value::Number(3.into()));
}

#[rstest]
fn test_recursion_limit(mut engine: Engine) {
    engine
        .compile("@template def spin(x): spin(x);")
        .expect("compile failed");

    let err = engine
        .call("spin", vec![Value::from(1)])
        .expect_err("expected a recursion error");
    assert!(err.to_string().contains("Maximum recursion depth exceeded"));
}

#[rstest]
fn test_custom_template_end_to_end(mut engine: Engine) {
    engine.register_template("Clamp", |expr, args| match (expr, args) {
        (Value::Number(n), [Value::Number(lo), Value::Number(hi), ..]) => {
            Ok(Value::Number(n.clamp(*lo, *hi)))
        }
        (expr, _) => Err(TemplateError::Message(format!("can't clamp {:?}", expr))),
    });
    engine
        .compile("@template def clamped(x): Clamp<.2>(0, 10, x);")
        .expect("compile failed");

    let result = engine
        .call("clamped", vec![Value::from(42)])
        .expect("call failed");
    assert_eq!(result, Value::Number(10.into()));
}

#[rstest]
fn test_stray_arg_ref_is_a_call_time_error(mut engine: Engine) {
    engine
        .compile("@template def f(x): x + .0;")
        .expect("compile failed");

    let err = engine
        .call("f", vec![Value::from(1)])
        .expect_err("expected an error");
    assert!(err.to_string().contains("outside of a template context"));
}
