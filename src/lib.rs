//! A small Scheme: a reader that turns text into S-expressions and a
//! tree-walking evaluator over lexically scoped environments.
//!
//! ```
//! use schemer::{run, Env, Value};
//!
//! let env = Env::new().make();
//! let result = run("(define (square x) (* x x)) (square 12)", &env);
//! assert_eq!(result, Value::Integer(144));
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod reader;
pub mod value;

pub use crate::{
    env::Env,
    error::{Error, EvalError, ReadError},
    eval::eval,
    reader::{read, read_all, Reader},
    value::Value,
};

/// Reads every expression in `source` and evaluates them in order in `env`.
/// Returns the last result, or the first error.
pub fn run(source: &str, env: &Env) -> Value {
    let mut reader = Reader::new(source);
    let mut result = Value::Unspecified;

    loop {
        match reader.read() {
            form if form.is_eof() => return result,
            form => result = eval(form, env),
        }

        if result.is_error() {
            return result;
        }
    }
}

#[cfg(test)]
mod run_tests {
    use super::*;

    #[test]
    fn returns_last_result() {
        let env = Env::new().make();
        assert_eq!(run("1 2 3", &env), Value::Integer(3));
        assert_eq!(run("", &env), Value::Unspecified);
    }

    #[test]
    fn stops_at_first_error() {
        let env = Env::new().make();
        let result = run("(define a 1) oops (define b 2)", &env);
        assert_eq!(result.to_string(), "unknown identifier OOPS");
        assert_eq!(run("a", &env), Value::Integer(1));
        assert!(run("b", &env).is_error());
        assert!(run("(1 2", &env).is_error());
    }
}
