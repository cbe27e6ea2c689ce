use im_rc::Vector;

use std::{
    cmp::PartialEq,
    fmt::{self, Debug, Display},
    rc::Rc,
};

use crate::{
    env::Env,
    error::{Error, ReadError},
};

pub type Args = Vector<Value>;
pub type Params = Vec<Rc<String>>;
pub type EvalResult = Result<Value, Error>;
pub type BuiltinFunction = fn(Args) -> EvalResult;
pub type ScopedBuiltinFunction = fn(&Env, Args) -> EvalResult;

#[derive(Clone)]
pub enum Value {
    Unspecified,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Char(char),
    String(Rc<String>),
    Symbol(Rc<String>),
    Pair(Rc<Pair>),
    Vector(Vector<Value>),
    Closure(Rc<Closure>),
    Builtin(Builtin),
    ScopedBuiltin(ScopedBuiltin),
    Environment(Env),
    Error(Error),
}

/// A cons cell. The empty list is the cell with neither slot filled; a
/// proper list ends in a cell whose `cdr` is absent.
pub struct Pair {
    car: Option<Value>,
    cdr: Option<Value>,
}

impl Pair {
    #[inline]
    pub fn car(&self) -> Option<&Value> {
        self.car.as_ref()
    }

    #[inline]
    pub fn cdr(&self) -> Option<&Value> {
        self.cdr.as_ref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.car.is_none() && self.cdr.is_none()
    }

    /// Elements of the proper part of the list starting at this cell.
    pub fn iter(&self) -> PairIter<'_> {
        PairIter {
            next: if self.is_empty() { None } else { Some(self) },
        }
    }

    /// The terminator of an improper list, if there is one.
    pub fn tail(&self) -> Option<&Value> {
        let mut pair = self;
        loop {
            match pair.cdr.as_ref() {
                Some(Value::Pair(next)) if !next.is_empty() => pair = next,
                Some(Value::Pair(_)) | None => return None,
                Some(other) => return Some(other),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

pub struct PairIter<'a> {
    next: Option<&'a Pair>,
}

impl<'a> Iterator for PairIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.next.take()?;
        self.next = match pair.cdr.as_ref() {
            Some(Value::Pair(next)) if !next.is_empty() => Some(next),
            _ => None,
        };
        pair.car.as_ref()
    }
}

pub struct Closure {
    params: Params,
    body: Value,
    env: Option<Env>,
}

impl Closure {
    pub fn new(params: Params, body: Value) -> Self {
        Closure {
            params,
            body,
            env: None,
        }
    }

    /// A copy of this closure capturing `env`.
    pub fn bind(&self, env: &Env) -> Rc<Closure> {
        Rc::new(Closure {
            params: self.params.clone(),
            body: self.body.clone(),
            env: Some(env.clone()),
        })
    }

    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    #[inline]
    pub fn env(&self) -> Option<&Env> {
        self.env.as_ref()
    }
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFunction,
}

#[derive(Clone, Copy)]
pub struct ScopedBuiltin {
    pub name: &'static str,
    pub func: ScopedBuiltinFunction,
}

impl Value {
    #[inline]
    pub fn symbol(&self) -> Option<&Rc<String>> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn pair(&self) -> Option<&Rc<Pair>> {
        match self {
            Value::Pair(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty_list(&self) -> bool {
        matches!(self, Value::Pair(p) if p.is_empty())
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Value::Error(e) if e.is_eof())
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Elements of a proper list; `None` for anything else.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Pair(p) if p.tail().is_none() => Some(p.iter().cloned().collect()),
            _ => None,
        }
    }

    #[inline]
    pub fn empty_list() -> Self {
        Value::Pair(Rc::new(Pair {
            car: None,
            cdr: None,
        }))
    }

    #[inline]
    pub fn cons(car: Value, cdr: Option<Value>) -> Self {
        Value::Pair(Rc::new(Pair {
            car: Some(car),
            cdr,
        }))
    }

    #[inline]
    pub fn make_list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::make_dotted(items, None)
    }

    /// Builds `(a b ... . tail)`; without a tail, or with an empty-list tail,
    /// the list is proper.
    pub fn make_dotted<I: IntoIterator<Item = Value>>(items: I, tail: Option<Value>) -> Self {
        let tail = tail.filter(|t| !t.is_empty_list());
        let items: Vec<Value> = items.into_iter().collect();
        let mut iter = items.into_iter().rev();
        match iter.next() {
            None => Value::empty_list(),
            Some(last) => iter.fold(Value::cons(last, tail), |acc, car| {
                Value::cons(car, Some(acc))
            }),
        }
    }

    /// Symbols are kept in their canonical upper-case spelling.
    #[inline]
    pub fn make_symbol<S: AsRef<str>>(s: S) -> Self {
        Value::Symbol(Rc::new(s.as_ref().to_uppercase()))
    }

    #[inline]
    pub fn make_string<I: Into<String>>(s: I) -> Self {
        Value::String(Rc::new(s.into()))
    }

    #[inline]
    pub fn make_closure(params: Params, body: Value) -> Self {
        Value::Closure(Rc::new(Closure::new(params, body)))
    }

    /// Moves an error value to the `Err` side.
    #[inline]
    pub fn into_result(self) -> EvalResult {
        match self {
            Value::Error(e) => Err(e),
            other => Ok(other),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unspecified => "unspecified",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(p) if p.is_empty() => "empty list",
            Value::Pair(_) => "pair",
            Value::Vector(_) => "vector",
            Value::Closure(_) | Value::Builtin(_) | Value::ScopedBuiltin(_) => "procedure",
            Value::Environment(_) => "environment",
            Value::Error(_) => "error",
        }
    }
}

impl From<Error> for Value {
    fn from(source: Error) -> Self {
        Value::Error(source)
    }
}

impl From<ReadError> for Value {
    fn from(source: ReadError) -> Self {
        Value::Error(source.into())
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.car == other.car && self.cdr == other.cdr
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unspecified, Self::Unspecified) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Pair(a), Self::Pair(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a.name == b.name,
            (Self::ScopedBuiltin(a), Self::ScopedBuiltin(b)) => a.name == b.name,
            (Self::Environment(a), Self::Environment(b)) => a.ptr_eq(b),
            (Self::Error(a), Self::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unspecified => Ok(()),
            Self::Bool(true) => write!(f, "#T"),
            Self::Bool(false) => write!(f, "#F"),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{:.6}", n),
            Self::Char(c) => write!(f, "#\\{}", c),
            Self::String(s) => write!(f, "\"{}\"", s),
            Self::Symbol(s) => write!(f, "{}", s),
            Self::Pair(p) => {
                write!(f, "(")?;
                display_seq(p.iter(), f)?;
                if let Some(tail) = p.tail() {
                    write!(f, " . {}", tail)?;
                }
                write!(f, ")")
            }
            Self::Vector(v) => {
                write!(f, "#(")?;
                display_seq(v.iter(), f)?;
                write!(f, ")")
            }
            Self::Closure(c) if c.env().is_none() => {
                write!(f, "(LAMBDA (")?;
                display_seq(c.params().iter(), f)?;
                write!(f, ") {})", c.body())
            }
            Self::Closure(_) | Self::Builtin(_) | Self::ScopedBuiltin(_) => {
                write!(f, "#<procedure>")
            }
            Self::Environment(_) => write!(f, "#<environment>"),
            Self::Error(e) => write!(f, "{}", e),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "#<unspecified>"),
            Self::Error(e) => write!(f, "#<error {:?}>", e),
            other => write!(f, "{}", other),
        }
    }
}

fn display_seq<P: Display, I: Iterator<Item = P>>(mut i: I, f: &mut fmt::Formatter) -> fmt::Result {
    if let Some(e) = i.next() {
        write!(f, "{}", e)?;
    }

    for e in i {
        write!(f, " {}", e)?;
    }

    Ok(())
}
