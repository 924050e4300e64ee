use std::rc::Rc;

use crate::interpreter::environment::EnvRef;
use crate::interpreter::value::{Builtin, Value};

/// Installs the language's one standard-library function into a fresh
/// global frame. `clock` returns seconds elapsed since the interpreter
/// was constructed; the exact epoch doesn't matter, only that successive
/// calls increase.
pub fn install(global: &EnvRef) {
    define_builtin(global, "clock", 0, |interp, _args| Ok(Value::Number(interp.elapsed_seconds())));
}

fn define_builtin(
    global: &EnvRef,
    name: &str,
    arity: i32,
    func: impl Fn(&mut crate::interpreter::Interpreter, Vec<Value>) -> crate::interpreter::RuntimeResult<Value>
        + 'static,
) {
    let builtin = Rc::new(Builtin { name: name.to_string(), arity, func: Box::new(func) });
    global.borrow_mut().define(name, Value::Builtin(builtin));
}
