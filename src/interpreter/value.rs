use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use crate::ast::{Block, FunDecl};
use crate::interpreter::control::{ControlFlow, RuntimeResult};
use crate::interpreter::environment::EnvRef;
use crate::interpreter::Interpreter;
use crate::token::Literal;

/// The dynamic value universe: nil, bool, number, string, and three
/// flavors of callable/object reference. Reference variants compare by
/// identity (`Rc::ptr_eq`), matching the value-type-identity equality
/// rule for functions, classes, and instances.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<Function>),
    Class(Rc<RefCell<Class>>),
    Instance(Rc<RefCell<Instance>>),
    Builtin(Rc<Builtin>),
}

impl Value {
    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    /// `nil` and `false` are falsy; every other value, including `0` and
    /// `""`, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Builtin(_) => "builtin",
        }
    }

    pub fn as_callable(&self) -> Option<Box<dyn Callable>> {
        match self {
            Value::Function(f) => Some(Box::new(Rc::clone(f))),
            Value::Class(c) => Some(Box::new(Rc::clone(c))),
            Value::Builtin(b) => Some(Box::new(Rc::clone(b))),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
            Value::Class(class) => write!(f, "<class {}>", class.borrow().name),
            Value::Instance(instance) => {
                write!(f, "<instance {}>", instance.borrow().class.borrow().name)
            }
            Value::Builtin(b) => write!(f, "<native fn {}>", b.name),
        }
    }
}

/// Renders a number the way the `+` string-coercion rule needs: shortest
/// decimal form, with no trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Implemented by anything the interpreter can invoke via `Call`: user
/// functions, classes (as constructors), and builtins. Arity `-1` marks
/// a variadic builtin.
pub trait Callable {
    fn arity(&self) -> i32;
    fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value>;
    fn name(&self) -> String;
}

/// Either a named declaration (`fun f() {}`) or an anonymous one
/// (`fun () {}`) — both share the same call machinery.
#[derive(Debug)]
pub enum FunctionBody {
    Declared(Rc<FunDecl>),
    Anonymous { params: Vec<crate::token::Token>, body: Block },
}

/// A user-defined function value: its body, the closure frame captured
/// at declaration time, and whether it is a class initializer (which
/// changes what `return` yields; see `Function::bind`).
#[derive(Debug)]
pub struct Function {
    pub body: FunctionBody,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(body: FunctionBody, closure: EnvRef, is_initializer: bool) -> Function {
        Function { body, closure, is_initializer }
    }

    pub fn params(&self) -> &[crate::token::Token] {
        match &self.body {
            FunctionBody::Declared(decl) => &decl.params,
            FunctionBody::Anonymous { params, .. } => params,
        }
    }

    pub fn statements(&self) -> &Block {
        match &self.body {
            FunctionBody::Declared(decl) => &decl.body,
            FunctionBody::Anonymous { body, .. } => body,
        }
    }

    /// Rebinds this function to an instance: a fresh frame, parented on
    /// the method's original closure, defines `this`. The body and
    /// initializer-ness are shared, unchanged.
    pub fn bind(self: &Rc<Function>, instance: &Rc<RefCell<Instance>>) -> Rc<Function> {
        let frame = crate::interpreter::environment::Environment::new_enclosed(&self.closure);
        frame.borrow_mut().define("this", Value::Instance(Rc::clone(instance)));
        Rc::new(Function {
            body: clone_body(&self.body),
            closure: frame,
            is_initializer: self.is_initializer,
        })
    }
}

fn clone_body(body: &FunctionBody) -> FunctionBody {
    match body {
        FunctionBody::Declared(decl) => FunctionBody::Declared(Rc::clone(decl)),
        FunctionBody::Anonymous { params, body } => {
            FunctionBody::Anonymous { params: params.clone(), body: body.clone() }
        }
    }
}

impl Callable for Rc<Function> {
    fn arity(&self) -> i32 {
        self.params().len() as i32
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
        let call_env = crate::interpreter::environment::Environment::new_enclosed(&self.closure);
        for (param, arg) in self.params().iter().zip(args.into_iter()) {
            call_env.borrow_mut().define(param.lexeme.clone(), arg);
        }

        match interp.execute_block(self.statements(), call_env)? {
            ControlFlow::Return(value) => {
                if self.is_initializer {
                    Ok(bound_this(&self.closure))
                } else {
                    Ok(value)
                }
            }
            ControlFlow::Normal => {
                if self.is_initializer {
                    Ok(bound_this(&self.closure))
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }

    fn name(&self) -> String {
        match &self.body {
            FunctionBody::Declared(decl) => decl.name.lexeme.clone(),
            FunctionBody::Anonymous { .. } => "anonymous".to_string(),
        }
    }
}

/// Reads `this` back out of a bound method's own closure frame (distance
/// 0), used to produce the bound instance on initializer return.
fn bound_this(closure: &EnvRef) -> Value {
    crate::interpreter::environment::Environment::get_at(closure, 0, "this").unwrap_or(Value::Nil)
}

/// A class is itself an object with property access: besides its method
/// tables it carries a mutable field map (`Set`/`Get` on the class value
/// directly, e.g. class-level counters).
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<RefCell<Class>>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub static_methods: HashMap<String, Rc<Function>>,
    pub fields: HashMap<String, Value>,
}

impl Class {
    /// Walks the superclass chain looking for an instance method; no
    /// flattening, so a change to a superclass's method table is visible
    /// to subclasses that haven't cached a lookup.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|s| s.borrow().find_method(name))
    }

    pub fn find_static(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.static_methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|s| s.borrow().find_static(name))
    }
}

impl Callable for Rc<RefCell<Class>> {
    fn arity(&self) -> i32 {
        self.borrow().find_method("init").map(|init| init.arity()).unwrap_or(0)
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
        let instance = Rc::new(RefCell::new(Instance {
            class: Rc::clone(self),
            fields: HashMap::new(),
        }));

        if let Some(init) = self.borrow().find_method("init") {
            init.bind(&instance).call(interp, args)?;
        }

        Ok(Value::Instance(instance))
    }

    fn name(&self) -> String {
        self.borrow().name.clone()
    }
}

/// An instance of a `Class`: a back-reference to its class and a
/// mutable field map, consulted before falling back to method lookup:
/// fields shadow methods of the same name.
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<RefCell<Class>>,
    pub fields: HashMap<String, Value>,
}

/// A host-provided function not expressible in the interpreted language
/// itself, e.g. `clock`. `arity = -1` marks a variadic builtin.
pub struct Builtin {
    pub name: String,
    pub arity: i32,
    pub func: Box<dyn Fn(&mut Interpreter, Vec<Value>) -> RuntimeResult<Value>>,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for Rc<Builtin> {
    fn arity(&self) -> i32 {
        self.arity
    }

    fn call(&self, interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
        (self.func)(interp, args)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
