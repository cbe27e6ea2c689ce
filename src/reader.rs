use im_rc::Vector;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use std::{iter::Peekable, str::Chars};

use crate::{
    error::{self as e, Error, ReadError},
    value::{EvalResult, Params, Value},
};

lazy_static! {
    static ref INTEGER_RE: Regex =
        Regex::new(concat!(
            r"^([+-]?)(?:0[xX]_?([0-9a-fA-F]+(?:_[0-9a-fA-F]+)*)",
            r"|0[bB]_?([01]+(?:_[01]+)*)",
            r"|0[oO]?_?([0-7]+(?:_[0-7]+)*)",
            r"|([1-9][0-9]*(?:_[0-9]+)*|0))$"
        ))
        .unwrap();
    static ref FLOAT_RE: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap();
}

/// Reads the first expression of `s`.
pub fn read(s: &str) -> Value {
    Reader::new(s).read()
}

/// Reads every expression of `s`, stopping at end of input or at the first
/// error, which is kept as the last element.
pub fn read_all(s: &str) -> Vec<Value> {
    Reader::new(s).read_all()
}

pub struct Reader<I: Iterator<Item = char>>(Peekable<I>);

impl<'s> Reader<Chars<'s>> {
    pub fn new(s: &'s str) -> Self {
        Reader(s.chars().peekable())
    }
}

impl<I: Iterator<Item = char>> Reader<I> {
    pub fn from_chars(chars: I) -> Self {
        Reader(chars.peekable())
    }

    /// Next complete expression, or an error value. End of input is the
    /// `EOF` error.
    pub fn read(&mut self) -> Value {
        self.read_form().unwrap_or_else(|err| {
            if !err.is_eof() {
                debug!(error = %err, "read failed");
            }
            err.into()
        })
    }

    pub fn read_all(&mut self) -> Vec<Value> {
        let mut forms = Vec::new();
        loop {
            match self.read() {
                value if value.is_eof() => return forms,
                value if value.is_error() => {
                    forms.push(value);
                    return forms;
                }
                value => forms.push(value),
            }
        }
    }

    fn read_form(&mut self) -> EvalResult {
        self.skip_whitespace();

        match self.0.next().ok_or_else(e::eof)? {
            '(' => self.read_list(),
            ')' => Err(ReadError::UnmatchedParen.into()),
            '#' => self.read_hash(),
            '"' => self.read_string(),
            '\'' => self.read_quote("QUOTE"),
            '`' => self.read_quote("QUASIQUOTE"),
            c @ '+' | c @ '-' | c @ '*' | c @ '/' | c @ '=' | c @ '<' | c @ '>' => {
                Ok(self.read_operator(c))
            }
            '.' if self.at_delimiter() => Err(ReadError::UnexpectedDot.into()),
            c => Ok(self.read_atom(c.to_string())),
        }
    }

    /// Reads an expression that must exist because an enclosing form is
    /// still open.
    fn read_nested(&mut self) -> EvalResult {
        self.read_form().map_err(|err| {
            if err.is_eof() {
                ReadError::UnterminatedList.into()
            } else {
                err
            }
        })
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.0.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.0.next();
                }
                ';' => {
                    while let Some(c) = self.0.next() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn at_delimiter(&mut self) -> bool {
        match self.0.peek() {
            None => true,
            Some(&c) => is_delimiter(c),
        }
    }

    fn read_list(&mut self) -> EvalResult {
        self.skip_whitespace();
        match self.0.peek() {
            None => return Err(ReadError::UnterminatedList.into()),
            Some(')') => {
                self.0.next();
                return Ok(Value::empty_list());
            }
            Some(_) => (),
        }

        let head = self.read_nested()?;

        match head.symbol().map(|s| s.as_str()) {
            Some("LAMBDA") => return self.read_lambda(),
            Some("LET") => return self.read_let(),
            Some("DEFINE") => {
                self.skip_whitespace();
                if self.0.peek() == Some(&'(') {
                    self.0.next();
                    return self.read_define_procedure();
                }
            }
            _ => (),
        }

        self.read_list_tail(vec![head])
    }

    fn read_list_tail(&mut self, mut items: Vec<Value>) -> EvalResult {
        loop {
            self.skip_whitespace();
            match self.0.peek().copied() {
                None => return Err(ReadError::UnterminatedList.into()),
                Some(')') => {
                    self.0.next();
                    return Ok(Value::make_list(items));
                }
                Some('.') => {
                    self.0.next();
                    if self.at_delimiter() {
                        let tail = self.read_nested()?;
                        self.expect_close("dotted list", "expected ) after the tail")?;
                        return Ok(Value::make_dotted(items, Some(tail)));
                    }
                    items.push(self.read_atom(".".into()));
                }
                Some(_) => items.push(self.read_nested()?),
            }
        }
    }

    fn expect_close(&mut self, form: &'static str, reason: &str) -> Result<(), Error> {
        self.skip_whitespace();
        match self.0.next() {
            Some(')') => Ok(()),
            None => Err(ReadError::UnterminatedList.into()),
            Some(_) => Err(e::malformed_syntax(form, reason)),
        }
    }

    fn expect_open(&mut self, form: &'static str, reason: &str) -> Result<(), Error> {
        self.skip_whitespace();
        match self.0.next() {
            Some('(') => Ok(()),
            None => Err(ReadError::UnterminatedList.into()),
            Some(_) => Err(e::malformed_syntax(form, reason)),
        }
    }

    // (lambda (p1 p2 ...) body), the head is already consumed
    fn read_lambda(&mut self) -> EvalResult {
        self.expect_open("lambda", "expected a parameter list")?;
        let params = self.read_params("lambda")?;
        let body = self.read_body("lambda")?;
        Ok(Value::make_closure(params, body))
    }

    // (define (name p1 p2 ...) body) => (DEFINE name (LAMBDA (p1 p2 ...) body))
    fn read_define_procedure(&mut self) -> EvalResult {
        self.skip_whitespace();
        if self.0.peek() == Some(&')') {
            return Err(e::malformed_syntax("define", "missing procedure name"));
        }

        let name = match self.read_nested()? {
            Value::Symbol(s) => s,
            other => {
                return Err(e::malformed_syntax(
                    "define",
                    format!("procedure name {} is not a symbol", other),
                ))
            }
        };
        let params = self.read_params("define")?;
        let body = self.read_body("define")?;

        Ok(Value::make_list(vec![
            Value::make_symbol("DEFINE"),
            Value::Symbol(name),
            Value::make_closure(params, body),
        ]))
    }

    // (let ((v1 e1) (v2 e2) ...) body) => ((LAMBDA (v1 v2 ...) body) e1 e2 ...)
    fn read_let(&mut self) -> EvalResult {
        self.expect_open("let", "expected a binding list")?;

        let mut names = Params::new();
        let mut inits = Vec::new();

        loop {
            self.skip_whitespace();
            match self.0.peek() {
                None => return Err(ReadError::UnterminatedList.into()),
                Some(')') => {
                    self.0.next();
                    break;
                }
                Some(_) => {
                    let binding = self.read_nested()?;
                    match binding.list_items().as_deref() {
                        Some([Value::Symbol(name), init]) => {
                            names.push(name.clone());
                            inits.push(init.clone());
                        }
                        _ => {
                            return Err(e::malformed_syntax(
                                "let",
                                format!("binding {} is not (name expression)", binding),
                            ))
                        }
                    }
                }
            }
        }

        let body = self.read_body("let")?;
        let args = if inits.is_empty() {
            None
        } else {
            Some(Value::make_list(inits))
        };

        Ok(Value::cons(Value::make_closure(names, body), args))
    }

    // parameter symbols up to and including the closing paren
    fn read_params(&mut self, form: &'static str) -> Result<Params, Error> {
        let mut params = Params::new();
        loop {
            self.skip_whitespace();
            match self.0.peek() {
                None => return Err(ReadError::UnterminatedList.into()),
                Some(')') => {
                    self.0.next();
                    return Ok(params);
                }
                Some(_) => match self.read_nested()? {
                    Value::Symbol(s) => params.push(s),
                    other => {
                        return Err(e::malformed_syntax(
                            form,
                            format!("parameter {} is not a symbol", other),
                        ))
                    }
                },
            }
        }
    }

    // exactly one expression followed by the form's closing paren
    fn read_body(&mut self, form: &'static str) -> EvalResult {
        const REASON: &str = "expected exactly one body expression";

        self.skip_whitespace();
        match self.0.peek() {
            None => return Err(ReadError::UnterminatedList.into()),
            Some(')') => return Err(e::malformed_syntax(form, REASON)),
            Some(_) => (),
        }

        let body = self.read_nested()?;
        self.expect_close(form, REASON)?;
        Ok(body)
    }

    fn read_hash(&mut self) -> EvalResult {
        match self.0.next() {
            Some('t') | Some('T') => Ok(Value::Bool(true)),
            Some('f') | Some('F') => Ok(Value::Bool(false)),
            Some('\\') => self
                .0
                .next()
                .map(Value::Char)
                .ok_or_else(|| ReadError::MalformedHash("end of input".into()).into()),
            Some('(') => self.read_vector(),
            Some(c) => Err(ReadError::MalformedHash(c.to_string()).into()),
            None => Err(ReadError::MalformedHash("end of input".into()).into()),
        }
    }

    fn read_vector(&mut self) -> EvalResult {
        let mut vector = Vector::new();
        loop {
            self.skip_whitespace();
            match self.0.peek() {
                None => return Err(ReadError::UnterminatedList.into()),
                Some(')') => {
                    self.0.next();
                    return Ok(Value::Vector(vector));
                }
                Some(_) => vector.push_back(self.read_nested()?),
            }
        }
    }

    fn read_string(&mut self) -> EvalResult {
        let mut result = String::new();
        loop {
            match self.0.next() {
                None => return Err(ReadError::UnterminatedString.into()),
                Some('"') => return Ok(Value::make_string(result)),
                Some(c) => result.push(c),
            }
        }
    }

    fn read_quote(&mut self, rm: &str) -> EvalResult {
        let quoted = self.read_form().map_err(|err| {
            if err.is_eof() {
                e::malformed_syntax("quote", "expected an expression")
            } else {
                err
            }
        })?;

        Ok(Value::make_list(vec![Value::make_symbol(rm), quoted]))
    }

    fn read_operator(&mut self, c: char) -> Value {
        let mut token = c.to_string();

        if (c == '<' || c == '>') && self.0.peek() == Some(&'=') {
            self.0.next();
            token.push('=');
        }

        if self.at_delimiter() {
            Value::make_symbol(token)
        } else {
            self.read_atom(token)
        }
    }

    fn read_atom(&mut self, mut token: String) -> Value {
        while let Some(&c) = self.0.peek() {
            if is_delimiter(c) {
                break;
            }
            token.push(c);
            self.0.next();
        }

        classify_atom(&token)
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '(' | ')' | ';')
}

fn classify_atom(token: &str) -> Value {
    if let Some(n) = parse_integer(token) {
        return Value::Integer(n);
    }

    if FLOAT_RE.is_match(token) {
        if let Ok(f) = token.parse() {
            return Value::Float(f);
        }
    }

    Value::make_symbol(token)
}

fn parse_integer(token: &str) -> Option<i64> {
    let caps = INTEGER_RE.captures(token)?;
    let sign = caps.get(1).map_or("", |m| m.as_str());

    let (digits, radix) = if let Some(m) = caps.get(2) {
        (m, 16)
    } else if let Some(m) = caps.get(3) {
        (m, 2)
    } else if let Some(m) = caps.get(4) {
        (m, 8)
    } else {
        (caps.get(5)?, 10)
    };

    // underscores only ever separate digits
    let digits = digits.as_str().replace('_', "");
    i64::from_str_radix(&format!("{}{}", sign, digits), radix).ok()
}
