use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::value::{Args, Value};

/// One lexical frame plus the chain of frames enclosing it.
pub struct Env(Rc<Frame>);

struct Frame {
    data: RefCell<HashMap<String, Value>>,
    outer: Option<Env>,
}

impl Env {
    pub fn new() -> EnvBuilder {
        EnvBuilder {
            data: HashMap::new(),
            outer: None,
        }
    }

    /// An empty frame whose only parent is `parent`.
    pub fn child_of(parent: &Env) -> Env {
        Env::new().env(parent.clone()).make()
    }

    /// Innermost binding of `k`, searching outward through the parents.
    pub fn lookup(&self, k: &str) -> Option<Value> {
        self.0
            .data
            .borrow()
            .get(k)
            .cloned()
            .or_else(|| self.0.outer.as_ref().and_then(|e| e.lookup(k)))
    }

    /// Binds `key` in this frame only, replacing an existing local binding.
    pub fn define_or_set<K: Into<String>>(&self, key: K, value: Value) {
        self.0.data.borrow_mut().insert(key.into(), value);
    }

    #[inline]
    pub fn parent(&self) -> Option<&Env> {
        self.0.outer.as_ref()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Clone for Env {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

pub struct EnvBuilder {
    data: HashMap<String, Value>,
    outer: Option<Env>,
}

impl EnvBuilder {
    pub fn env(mut self, env: Env) -> Self {
        self.outer = Some(env);
        self
    }

    /// Positional parameter binding. Arity is checked by the caller.
    pub fn binds(mut self, params: &[Rc<String>], values: Args) -> Self {
        debug_assert_eq!(params.len(), values.len(), "eval bug: arity not checked");

        self.data.extend(
            params
                .iter()
                .map(|p| p.as_ref().clone())
                .zip(values.into_iter()),
        );
        self
    }

    pub fn make(mut self) -> Env {
        let outer = self.outer.take();

        Env(Rc::new(Frame {
            data: RefCell::new(self.data),
            outer,
        }))
    }
}

#[cfg(test)]
mod env_tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let root = Env::new().make();
        root.define_or_set("X", Value::Integer(1));
        root.define_or_set("Y", Value::Integer(2));

        let child = Env::child_of(&root);
        child.define_or_set("X", Value::Integer(10));

        assert_eq!(child.lookup("X"), Some(Value::Integer(10)));
        assert_eq!(child.lookup("Y"), Some(Value::Integer(2)));
        assert_eq!(root.lookup("X"), Some(Value::Integer(1)));
        assert_eq!(child.lookup("Z"), None);
        assert!(child.parent().unwrap().ptr_eq(&root));
        assert!(root.parent().is_none());
    }

    #[test]
    fn define_or_set_is_frame_local() {
        let root = Env::new().make();
        root.define_or_set("X", Value::Integer(1));
        let child = Env::child_of(&root);

        child.define_or_set("X", Value::Integer(2));
        child.define_or_set("X", Value::Integer(3));

        assert_eq!(child.lookup("X"), Some(Value::Integer(3)));
        assert_eq!(root.lookup("X"), Some(Value::Integer(1)));
    }

    #[test]
    fn binds_parameters_positionally() {
        let root = Env::new().make();
        let params = vec![Rc::new("A".to_string()), Rc::new("B".to_string())];
        let args: Args = vec![Value::Integer(1), Value::Integer(2)]
            .into_iter()
            .collect();

        let frame = Env::new().env(root.clone()).binds(&params, args).make();

        assert_eq!(frame.lookup("A"), Some(Value::Integer(1)));
        assert_eq!(frame.lookup("B"), Some(Value::Integer(2)));
        assert_eq!(root.lookup("A"), None);
    }
}
