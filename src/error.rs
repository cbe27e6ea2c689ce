use std::fmt::Display;

use thiserror::Error;

use crate::value::Value;

/// Message carried by the end-of-input error. Callers that only see the
/// printed form of an error can compare against it.
pub const EOF_MESSAGE: &str = "EOF";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    #[error("EOF")]
    Eof,
    #[error("unexpected )")]
    UnmatchedParen,
    #[error("missing closing )")]
    UnterminatedList,
    #[error("missing closing \"")]
    UnterminatedString,
    #[error("unexpected .")]
    UnexpectedDot,
    #[error("expecting one of T, F, \\ or ( after #, found {0}")]
    MalformedHash(String),
    #[error("malformed {form}: {reason}")]
    MalformedSyntax { form: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown identifier {0}")]
    UnknownIdentifier(String),
    #[error("unknown procedure {0}")]
    UnknownProcedure(String),
    #[error("{name}: expected {expected} for argument {index}, got {provided}")]
    InvalidArgumentType {
        name: String,
        expected: String,
        index: usize,
        provided: String,
    },
    #[error("{name}: expected {required} arguments, got {provided}")]
    InvalidNumberOfArguments {
        name: String,
        required: String,
        provided: usize,
    },
    #[error("{0}: division by zero")]
    DivisionByZero(String),
    #[error("{name}: numeric overflow on {first} and {second}")]
    NumericOverflow {
        name: String,
        first: i64,
        second: i64,
    },
    #[error("malformed {0} form")]
    MalformedForm(String),
    #[error("{0} is not a procedure")]
    NotProcedure(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Read(ReadError::Eof))
    }
}

pub fn eof() -> Error {
    ReadError::Eof.into()
}

pub fn malformed_syntax<R: Into<String>>(form: &'static str, reason: R) -> Error {
    ReadError::MalformedSyntax {
        form,
        reason: reason.into(),
    }
    .into()
}

pub fn unknown_identifier<D: Display>(name: D) -> Error {
    EvalError::UnknownIdentifier(name.to_string()).into()
}

pub fn unknown_procedure<D: Display>(name: D) -> Error {
    EvalError::UnknownProcedure(name.to_string()).into()
}

pub fn not_procedure(value: &Value) -> Error {
    EvalError::NotProcedure(value.to_string()).into()
}

pub fn arg_type<D, E>(name: D, expected: E, index: usize, provided: &Value) -> Error
where
    D: Display,
    E: Display,
{
    EvalError::InvalidArgumentType {
        name: name.to_string(),
        expected: expected.to_string(),
        index,
        provided: provided.type_name().into(),
    }
    .into()
}

pub fn arg_count<D, S>(name: D, required: S, provided: usize) -> Error
where
    D: Display,
    S: Display,
{
    EvalError::InvalidNumberOfArguments {
        name: name.to_string(),
        required: required.to_string(),
        provided,
    }
    .into()
}

pub fn division_by_zero<D: Display>(name: D) -> Error {
    EvalError::DivisionByZero(name.to_string()).into()
}

pub fn numeric_overflow<D: Display>(name: D, first: i64, second: i64) -> Error {
    EvalError::NumericOverflow {
        name: name.to_string(),
        first,
        second,
    }
    .into()
}

pub fn malformed_form<D: Display>(name: D) -> Error {
    EvalError::MalformedForm(name.to_string()).into()
}
