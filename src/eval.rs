use tracing::{debug, trace};

use crate::{
    builtins,
    env::Env,
    error::{self as e, Error},
    value::{Args, Closure, EvalResult, Pair, Value},
};

/// Evaluates `ast` in `env`. Failures are returned as `Value::Error`.
pub fn eval(ast: Value, env: &Env) -> Value {
    eval_form(ast, env).unwrap_or_else(Value::from)
}

pub fn eval_form(ast: Value, env: &Env) -> EvalResult {
    match ast {
        Value::Error(err) => Err(err),
        Value::Symbol(s) => lookup(&s, env),
        // a closure takes the environment it is evaluated in
        Value::Closure(closure) => Ok(Value::Closure(closure.bind(env))),
        Value::Pair(pair) => eval_pair(&pair, env),
        other => Ok(other),
    }
}

fn lookup(name: &str, env: &Env) -> EvalResult {
    env.lookup(name)
        .or_else(|| builtins::builtin(name).map(Value::Builtin))
        .or_else(|| builtins::scoped_builtin(name).map(Value::ScopedBuiltin))
        .ok_or_else(|| e::unknown_identifier(name))
}

fn eval_pair(pair: &Pair, env: &Env) -> EvalResult {
    let head = match pair.car() {
        Some(head) => head,
        None => return Ok(Value::empty_list()),
    };
    let rest = pair.cdr();

    match head {
        Value::Closure(closure) => {
            let closure = closure.bind(env);
            let args = eval_args(rest, env, "lambda")?;
            apply_closure(&closure, args, env, "lambda")
        }

        Value::Builtin(_) | Value::ScopedBuiltin(_) => {
            let args = eval_args(rest, env, "procedure")?;
            apply_procedure(head, args, env, "procedure")
        }

        Value::Symbol(s) => match s.as_str() {
            "DEFINE" => eval_define(rest, env),
            "QUOTE" | "QUASIQUOTE" => eval_quote(rest, s),
            "IF" => eval_if(rest, env),
            "BEGIN" => eval_begin(rest, env),
            name => {
                if let Some(builtin) = builtins::builtin(name) {
                    let args = eval_args(rest, env, name)?;
                    trace!(builtin = name, args = args.len(), "calling builtin");
                    (builtin.func)(args)
                } else if let Some(scoped) = builtins::scoped_builtin(name) {
                    let args = eval_args(rest, env, name)?;
                    trace!(builtin = name, args = args.len(), "calling scoped builtin");
                    (scoped.func)(env, args)
                } else {
                    match env.lookup(name) {
                        Some(procedure @ Value::Closure(_))
                        | Some(procedure @ Value::Builtin(_))
                        | Some(procedure @ Value::ScopedBuiltin(_)) => {
                            let args = eval_args(rest, env, name)?;
                            apply_procedure(&procedure, args, env, name)
                        }
                        _ => Err(e::unknown_procedure(name)),
                    }
                }
            }
        },

        // compound or literal head: the form is its head's value
        other => eval_form(other.clone(), env),
    }
}

/// Elements of the list that follows a form's head.
fn operands<'a>(rest: Option<&'a Value>, form: &str) -> Result<Vec<&'a Value>, Error> {
    let mut items = Vec::new();
    let mut rest = rest;

    while let Some(cell) = rest {
        match cell {
            Value::Pair(pair) if pair.is_empty() => break,
            Value::Pair(pair) => {
                items.extend(pair.car());
                rest = pair.cdr();
            }
            _ => return Err(e::malformed_form(form)),
        }
    }

    Ok(items)
}

/// Left to right; the first failure stops the remaining evaluations.
fn eval_args(rest: Option<&Value>, env: &Env, form: &str) -> Result<Args, Error> {
    operands(rest, form)?
        .into_iter()
        .map(|arg| eval_form(arg.clone(), env))
        .collect()
}

fn eval_define(rest: Option<&Value>, env: &Env) -> EvalResult {
    match operands(rest, "define")?.as_slice() {
        [Value::Symbol(name), expr] => {
            let value = eval_form((*expr).clone(), env)?;
            debug!(name = name.as_str(), value = %value, "define");
            env.define_or_set(name.as_str(), value);
            Ok(Value::Unspecified)
        }
        _ => Err(e::malformed_form("define")),
    }
}

fn eval_quote(rest: Option<&Value>, form: &str) -> EvalResult {
    match operands(rest, form)?.as_slice() {
        [quoted] => Ok((*quoted).clone()),
        _ => Err(e::malformed_form(form)),
    }
}

fn eval_if(rest: Option<&Value>, env: &Env) -> EvalResult {
    let (cond, then, otherwise) = match operands(rest, "if")?.as_slice() {
        [cond, then] => ((*cond).clone(), (*then).clone(), None),
        [cond, then, otherwise] => ((*cond).clone(), (*then).clone(), Some((*otherwise).clone())),
        _ => return Err(e::malformed_form("if")),
    };

    match eval_form(cond, env)? {
        Value::Bool(false) => otherwise.map_or(Ok(Value::Unspecified), |ast| eval_form(ast, env)),
        _ => eval_form(then, env),
    }
}

fn eval_begin(rest: Option<&Value>, env: &Env) -> EvalResult {
    operands(rest, "begin")?
        .into_iter()
        .try_fold(Value::Unspecified, |_, form| eval_form(form.clone(), env))
}

fn apply_procedure(procedure: &Value, args: Args, env: &Env, name: &str) -> EvalResult {
    match procedure {
        Value::Closure(closure) => apply_closure(closure, args, env, name),
        Value::Builtin(builtin) => (builtin.func)(args),
        Value::ScopedBuiltin(scoped) => (scoped.func)(env, args),
        other => Err(e::not_procedure(other)),
    }
}

/// Runs the body in a new frame whose parent is the captured environment.
/// A closure that was never evaluated captures the caller's environment.
fn apply_closure(closure: &Closure, args: Args, env: &Env, name: &str) -> EvalResult {
    if closure.params().len() != args.len() {
        return Err(e::arg_count(name, closure.params().len(), args.len()));
    }

    trace!(procedure = name, args = args.len(), "applying closure");

    let captured = closure.env().unwrap_or(env).clone();
    let frame = Env::new()
        .env(captured)
        .binds(closure.params(), args)
        .make();

    eval_form(closure.body().clone(), &frame)
}
