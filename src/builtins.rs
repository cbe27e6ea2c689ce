use lazy_static::lazy_static;

use std::{collections::HashMap, fmt::Display};

use crate::{
    env::Env,
    error::{self as e, Error},
    eval::eval_form,
    reader::read_all,
    value::{
        Args, Builtin, BuiltinFunction, EvalResult, ScopedBuiltin, ScopedBuiltinFunction, Value,
    },
};

type IntegerOperation = fn(i64, i64) -> Result<i64, Error>;
type FloatOperation = fn(f64, f64) -> Result<f64, Error>;

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, BuiltinFunction> = {
        let mut table: HashMap<&'static str, BuiltinFunction> = HashMap::new();
        table.insert("+", add);
        table.insert("-", subtract);
        table.insert("*", multiply);
        table.insert("/", divide);
        table.insert("=", equal);
        table.insert("<", less);
        table.insert("<=", less_equal);
        table.insert(">", greater);
        table.insert(">=", greater_equal);
        table.insert("BOOLEAN?", booleanp);
        table.insert("PAIR?", pairp);
        table.insert("SYMBOL?", symbolp);
        table.insert("NULL?", nullp);
        table.insert("NUMBER?", numberp);
        table.insert("STRING?", stringp);
        table.insert("CHAR?", charp);
        table.insert("VECTOR?", vectorp);
        table.insert("PROCEDURE?", procedurep);
        table.insert("NOT", not);
        table.insert("CAR", car);
        table.insert("CDR", cdr);
        table.insert("CONS", cons);
        table.insert("LIST", list);
        table.insert("DISPLAY", display);
        table
    };
    static ref SCOPED_BUILTINS: HashMap<&'static str, ScopedBuiltinFunction> = {
        let mut table: HashMap<&'static str, ScopedBuiltinFunction> = HashMap::new();
        table.insert("EVAL", eval);
        table.insert("ENV", env);
        table
    };
}

/// Primitive over evaluated arguments registered under `name`.
pub fn builtin(name: &str) -> Option<Builtin> {
    BUILTINS
        .get_key_value(name)
        .map(|(name, func)| Builtin { name, func: *func })
}

/// Primitive that also receives the calling environment.
pub fn scoped_builtin(name: &str) -> Option<ScopedBuiltin> {
    SCOPED_BUILTINS
        .get_key_value(name)
        .map(|(name, func)| ScopedBuiltin { name, func: *func })
}

pub fn add(args: Args) -> EvalResult {
    arithmetic_operation(
        args,
        |a, b| a.checked_add(b).ok_or_else(|| e::numeric_overflow('+', a, b)),
        |a, b| Ok(a + b),
        "+",
    )
}

pub fn subtract(args: Args) -> EvalResult {
    arithmetic_operation(
        args,
        |a, b| a.checked_sub(b).ok_or_else(|| e::numeric_overflow('-', a, b)),
        |a, b| Ok(a - b),
        "-",
    )
}

pub fn multiply(args: Args) -> EvalResult {
    arithmetic_operation(
        args,
        |a, b| a.checked_mul(b).ok_or_else(|| e::numeric_overflow('*', a, b)),
        |a, b| Ok(a * b),
        "*",
    )
}

pub fn divide(args: Args) -> EvalResult {
    arithmetic_operation(
        args,
        |a, b| {
            if b == 0 {
                Err(e::division_by_zero('/'))
            } else {
                a.checked_div(b).ok_or_else(|| e::numeric_overflow('/', a, b))
            }
        },
        |a, b| {
            if b == 0.0 {
                Err(e::division_by_zero('/'))
            } else {
                Ok(a / b)
            }
        },
        "/",
    )
}

pub fn equal(args: Args) -> EvalResult {
    arithmetic_compare(args, i64::eq, f64::eq, '=')
}

pub fn less(args: Args) -> EvalResult {
    arithmetic_compare(args, i64::lt, f64::lt, '<')
}

pub fn less_equal(args: Args) -> EvalResult {
    arithmetic_compare(args, i64::le, f64::le, "<=")
}

pub fn greater(args: Args) -> EvalResult {
    arithmetic_compare(args, i64::gt, f64::gt, '>')
}

pub fn greater_equal(args: Args) -> EvalResult {
    arithmetic_compare(args, i64::ge, f64::ge, ">=")
}

pub fn booleanp(args: Args) -> EvalResult {
    predicate(args, "boolean?", |v| matches!(v, Value::Bool(_)))
}

pub fn pairp(args: Args) -> EvalResult {
    predicate(args, "pair?", |v| matches!(v, Value::Pair(p) if !p.is_empty()))
}

pub fn symbolp(args: Args) -> EvalResult {
    predicate(args, "symbol?", |v| matches!(v, Value::Symbol(_)))
}

pub fn nullp(args: Args) -> EvalResult {
    predicate(args, "null?", Value::is_empty_list)
}

pub fn numberp(args: Args) -> EvalResult {
    predicate(args, "number?", |v| {
        matches!(v, Value::Integer(_) | Value::Float(_))
    })
}

pub fn stringp(args: Args) -> EvalResult {
    predicate(args, "string?", |v| matches!(v, Value::String(_)))
}

pub fn charp(args: Args) -> EvalResult {
    predicate(args, "char?", |v| matches!(v, Value::Char(_)))
}

pub fn vectorp(args: Args) -> EvalResult {
    predicate(args, "vector?", |v| matches!(v, Value::Vector(_)))
}

pub fn procedurep(args: Args) -> EvalResult {
    predicate(args, "procedure?", |v| {
        matches!(
            v,
            Value::Closure(_) | Value::Builtin(_) | Value::ScopedBuiltin(_)
        )
    })
}

pub fn not(args: Args) -> EvalResult {
    predicate(args, "not", |v| matches!(v, Value::Bool(false)))
}

pub fn car(args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 1, 1, "car")?;

    match &args[0] {
        Value::Pair(p) => p
            .car()
            .cloned()
            .ok_or_else(|| e::arg_type("car", "pair", 0, &args[0])),
        other => Err(e::arg_type("car", "pair", 0, other)),
    }
}

pub fn cdr(args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 1, 1, "cdr")?;

    match &args[0] {
        Value::Pair(p) if !p.is_empty() => Ok(p.cdr().cloned().unwrap_or_else(Value::empty_list)),
        other => Err(e::arg_type("cdr", "pair", 0, other)),
    }
}

pub fn cons(args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 2, 2, "cons")?;

    let cdr = if args[1].is_empty_list() {
        None
    } else {
        Some(args[1].clone())
    };
    Ok(Value::cons(args[0].clone(), cdr))
}

pub fn list(args: Args) -> EvalResult {
    Ok(Value::make_list(args))
}

pub fn display(args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 1, 1, "display")?;

    println!("{}", args[0]);
    Ok(Value::Unspecified)
}

/// `(eval expr)` or `(eval expr environment)`. A string is read and each of
/// its expressions evaluated in turn.
pub fn eval(env: &Env, args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 1 || n == 2, "1 or 2", "eval")?;

    let target = match args.get(1) {
        None => env.clone(),
        Some(Value::Environment(target)) => target.clone(),
        Some(other) => return Err(e::arg_type("eval", "environment", 1, other)),
    };

    match &args[0] {
        Value::String(source) => read_all(source)
            .into_iter()
            .try_fold(Value::Unspecified, |_, form| eval_form(form, &target)),
        expr => eval_form(expr.clone(), &target),
    }
}

pub fn env(env: &Env, args: Args) -> EvalResult {
    ensure_len(args.len(), |n| n == 0, 0, "env")?;

    Ok(Value::Environment(env.clone()))
}

#[inline]
fn predicate<P>(args: Args, name: &str, p: P) -> EvalResult
where
    P: Fn(&Value) -> bool,
{
    ensure_len(args.len(), |n| n == 1, 1, name)?;

    Ok(Value::Bool(p(&args[0])))
}

/// Left fold over the arguments. The first argument picks integer or float
/// arithmetic and every other argument must match it.
#[inline]
fn arithmetic_operation<D: Display + Copy>(
    args: Args,
    integer_operation: IntegerOperation,
    float_operation: FloatOperation,
    name: D,
) -> EvalResult {
    ensure_len(args.len(), |n| n >= 1, "1 or more", name)?;

    match &args[0] {
        Value::Integer(first) => args
            .iter()
            .enumerate()
            .skip(1)
            .try_fold(*first, |acc, (i, arg)| {
                integer_operation(acc, integer(arg, name, i)?)
            })
            .map(Value::Integer),
        Value::Float(first) => args
            .iter()
            .enumerate()
            .skip(1)
            .try_fold(*first, |acc, (i, arg)| {
                float_operation(acc, float(arg, name, i)?)
            })
            .map(Value::Float),
        other => Err(e::arg_type(name, "integer or float", 0, other)),
    }
}

/// True when every adjacent pair satisfies the relation. All arguments are
/// type checked before any comparison.
#[inline]
fn arithmetic_compare<D: Display + Copy>(
    args: Args,
    integer_compare: fn(&i64, &i64) -> bool,
    float_compare: fn(&f64, &f64) -> bool,
    name: D,
) -> EvalResult {
    ensure_len(args.len(), |n| n >= 1, "1 or more", name)?;

    match &args[0] {
        Value::Integer(_) => {
            let numbers = args
                .iter()
                .enumerate()
                .map(|(i, arg)| integer(arg, name, i))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Bool(
                numbers.windows(2).all(|w| integer_compare(&w[0], &w[1])),
            ))
        }
        Value::Float(_) => {
            let numbers = args
                .iter()
                .enumerate()
                .map(|(i, arg)| float(arg, name, i))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Bool(
                numbers.windows(2).all(|w| float_compare(&w[0], &w[1])),
            ))
        }
        other => Err(e::arg_type(name, "integer or float", 0, other)),
    }
}

#[inline]
fn integer<D: Display>(value: &Value, name: D, index: usize) -> Result<i64, Error> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(e::arg_type(name, "integer", index, other)),
    }
}

#[inline]
fn float<D: Display>(value: &Value, name: D, index: usize) -> Result<f64, Error> {
    match value {
        Value::Float(n) => Ok(*n),
        other => Err(e::arg_type(name, "float", index, other)),
    }
}

#[inline]
pub fn ensure_len<F, D, S>(provided: usize, p: F, required: S, name: D) -> Result<(), Error>
where
    F: Fn(usize) -> bool,
    D: Display,
    S: Display,
{
    if p(provided) {
        Ok(())
    } else {
        Err(e::arg_count(name, required, provided))
    }
}

#[cfg(test)]
mod builtins_tests {
    use super::*;

    use crate::error::EvalError;

    fn call(name: &str, args: Vec<Value>) -> EvalResult {
        let builtin = builtin(name).unwrap_or_else(|| panic!("no builtin {}", name));
        (builtin.func)(args.into_iter().collect())
    }

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().copied().map(Value::Integer).collect()
    }

    #[test]
    fn registry_lookup() {
        assert!(builtin("+").is_some());
        assert!(builtin("DISPLAY").is_some());
        assert!(builtin("display").is_none());
        assert!(builtin("EVAL").is_none());
        assert!(scoped_builtin("EVAL").is_some());
        assert!(scoped_builtin("ENV").is_some());
        assert!(scoped_builtin("+").is_none());
    }

    #[test]
    fn arithmetic_folds_left() {
        assert_eq!(call("+", ints(&[1, 2, 3])), Ok(Value::Integer(6)));
        assert_eq!(call("*", ints(&[2, 3, 4])), Ok(Value::Integer(24)));
        assert_eq!(call("-", ints(&[10, 1, 2])), Ok(Value::Integer(7)));
        assert_eq!(call("/", ints(&[100, 5, 2])), Ok(Value::Integer(10)));
        assert_eq!(call("/", ints(&[7, 2])), Ok(Value::Integer(3)));
        assert_eq!(call("-", ints(&[5])), Ok(Value::Integer(5)));
        assert_eq!(
            call("+", vec![Value::Float(1.5), Value::Float(2.0)]),
            Ok(Value::Float(3.5))
        );
    }

    #[test]
    fn arithmetic_rejects_mixed_types() {
        assert!(matches!(
            call("+", vec![Value::Integer(1), Value::Float(2.0)]),
            Err(Error::Eval(EvalError::InvalidArgumentType { index: 1, .. }))
        ));
        assert!(matches!(
            call("*", vec![Value::Float(1.0), Value::Integer(2)]),
            Err(Error::Eval(EvalError::InvalidArgumentType { .. }))
        ));
        assert!(matches!(
            call("+", vec![Value::make_string("a")]),
            Err(Error::Eval(EvalError::InvalidArgumentType { index: 0, .. }))
        ));
    }

    #[test]
    fn arithmetic_failures() {
        assert_eq!(call("/", ints(&[1, 0])), Err(e::division_by_zero('/')));
        assert_eq!(
            call("/", vec![Value::Float(1.0), Value::Float(0.0)]),
            Err(e::division_by_zero('/'))
        );
        assert_eq!(
            call("+", ints(&[i64::MAX, 1])),
            Err(e::numeric_overflow('+', i64::MAX, 1))
        );
        assert!(matches!(
            call("+", vec![]),
            Err(Error::Eval(EvalError::InvalidNumberOfArguments { .. }))
        ));
    }

    #[test]
    fn comparison_chains() {
        assert_eq!(call("<", ints(&[1, 2, 3])), Ok(Value::Bool(true)));
        assert_eq!(call("<", ints(&[1, 3, 2])), Ok(Value::Bool(false)));
        assert_eq!(call("<=", ints(&[1, 1, 2])), Ok(Value::Bool(true)));
        assert_eq!(call(">", ints(&[3, 2, 1])), Ok(Value::Bool(true)));
        assert_eq!(call(">=", ints(&[3, 3, 4])), Ok(Value::Bool(false)));
        assert_eq!(call("=", ints(&[2, 2, 2])), Ok(Value::Bool(true)));
        assert_eq!(call("=", ints(&[7])), Ok(Value::Bool(true)));
        assert_eq!(
            call("<", vec![Value::Float(1.0), Value::Float(2.5)]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn comparison_type_mismatch_fails_whole_call() {
        assert!(matches!(
            call("<", vec![Value::Integer(3), Value::Integer(1), Value::Float(2.0)]),
            Err(Error::Eval(EvalError::InvalidArgumentType { index: 2, .. }))
        ));
    }

    #[test]
    fn predicates() {
        assert_eq!(call("BOOLEAN?", vec![Value::Bool(false)]), Ok(Value::Bool(true)));
        assert_eq!(call("BOOLEAN?", ints(&[0])), Ok(Value::Bool(false)));
        assert_eq!(
            call("SYMBOL?", vec![Value::make_symbol("a")]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("PAIR?", vec![Value::make_list(ints(&[1]))]),
            Ok(Value::Bool(true))
        );
        assert_eq!(call("PAIR?", vec![Value::empty_list()]), Ok(Value::Bool(false)));
        assert_eq!(call("NULL?", vec![Value::empty_list()]), Ok(Value::Bool(true)));
        assert_eq!(call("NUMBER?", vec![Value::Float(1.0)]), Ok(Value::Bool(true)));
        assert_eq!(call("NOT", vec![Value::Bool(false)]), Ok(Value::Bool(true)));
        assert_eq!(call("NOT", ints(&[0])), Ok(Value::Bool(false)));
        assert!(call("SYMBOL?", vec![]).is_err());
    }

    #[test]
    fn list_primitives() {
        let list = call("LIST", ints(&[1, 2, 3])).unwrap();
        assert_eq!(list.to_string(), "(1 2 3)");
        assert_eq!(call("CAR", vec![list.clone()]), Ok(Value::Integer(1)));
        assert_eq!(call("CDR", vec![list]).unwrap().to_string(), "(2 3)");
        assert_eq!(
            call("CDR", vec![Value::make_list(ints(&[1]))]),
            Ok(Value::empty_list())
        );
        assert_eq!(call("CONS", ints(&[1, 2])).unwrap().to_string(), "(1 . 2)");
        assert_eq!(
            call("CONS", vec![Value::Integer(1), Value::empty_list()])
                .unwrap()
                .to_string(),
            "(1)"
        );
        assert_eq!(call("LIST", vec![]), Ok(Value::empty_list()));
        assert!(call("CAR", vec![Value::empty_list()]).is_err());
    }

    #[test]
    fn display_returns_unspecified() {
        assert_eq!(call("DISPLAY", ints(&[1])), Ok(Value::Unspecified));
        assert!(call("DISPLAY", ints(&[1, 2])).is_err());
    }

    #[test]
    fn scoped_builtins_see_the_environment() {
        let root = Env::new().make();
        root.define_or_set("X", Value::Integer(42));

        let env_builtin = scoped_builtin("ENV").unwrap();
        let reified = (env_builtin.func)(&root, Args::new()).unwrap();
        assert!(matches!(&reified, Value::Environment(env) if env.ptr_eq(&root)));

        let eval_builtin = scoped_builtin("EVAL").unwrap();
        let args: Args = vec![Value::make_string("(+ x 1)")].into_iter().collect();
        assert_eq!((eval_builtin.func)(&root, args), Ok(Value::Integer(43)));

        let child = Env::child_of(&root);
        child.define_or_set("X", Value::Integer(1));
        let args: Args = vec![Value::make_symbol("x"), reified].into_iter().collect();
        assert_eq!((eval_builtin.func)(&child, args), Ok(Value::Integer(42)));
    }
}
