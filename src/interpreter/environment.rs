use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::value::Value;

/// A single lexical scope frame: a name→value map plus a parent link.
/// Shared by reference so closures capture the frame itself, not a copy
/// of it — a later assignment through one reference is visible through
/// every other reference to the same frame.
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Environment>>>,
}

pub type EnvRef = Rc<RefCell<Environment>>;

impl Environment {
    pub fn new_global() -> EnvRef {
        Rc::new(RefCell::new(Environment { values: HashMap::new(), parent: None }))
    }

    pub fn new_enclosed(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Defines (or redefines) a binding in this exact frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Reads a name on the global frame — used when the resolver left no
    /// distance entry for a reference.
    pub fn get_global(global: &EnvRef, name: &str) -> Option<Value> {
        global.borrow().values.get(name).cloned()
    }

    pub fn assign_global(global: &EnvRef, name: &str, value: Value) -> bool {
        let mut env = global.borrow_mut();
        if env.values.contains_key(name) {
            env.values.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }

    /// Walks `distance` parent links up from `env`.
    fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let parent = current
                .borrow()
                .parent
                .clone()
                .expect("resolver distance exceeds environment chain depth");
            current = parent;
        }
        current
    }

    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame = Environment::ancestor(env, distance);
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        let frame = Environment::ancestor(env, distance);
        let mut frame = frame.borrow_mut();
        if frame.values.contains_key(name) {
            frame.values.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interpreter::value::Value;

    #[test]
    fn closures_share_frames_by_reference() {
        let global = Environment::new_global();
        let inner = Environment::new_enclosed(&global);
        inner.borrow_mut().define("n", Value::Number(1.0));

        // a second handle to the same frame observes a later assignment
        let handle = Rc::clone(&inner);
        Environment::assign_at(&inner, 0, "n", Value::Number(2.0));

        assert_eq!(handle.borrow().values.get("n"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn get_at_walks_ancestors() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(9.0));
        let block = Environment::new_enclosed(&global);
        let inner = Environment::new_enclosed(&block);

        assert_eq!(Environment::get_at(&inner, 2, "x"), Some(Value::Number(9.0)));
    }
}
