use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

use crate::ast::{Block, Expr, ExprKind, Stmt};
use crate::common::diagnostic::{Diagnostic, DiagnosticKind};
use crate::interpreter::control::{ControlFlow, RuntimeError, RuntimeResult};
use crate::interpreter::environment::{EnvRef, Environment};
use crate::interpreter::value::{format_number, Callable, Class, Function, FunctionBody, Instance, Value};
use crate::resolver::Distances;
use crate::token::{Token, TokenKind};

/// Walks statements and expressions against the resolver's distance
/// table and a chain of environments. Owns the global frame for the
/// lifetime of the interpreter so the REPL can reuse one `Interpreter`
/// across lines.
pub struct Interpreter {
    pub global: EnvRef,
    environment: EnvRef,
    distances: Distances,
    started: Instant,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    /// Builds an interpreter that writes `print` output somewhere other
    /// than stdout — tests use this to assert on a program's output
    /// without touching the real standard output stream.
    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let global = Environment::new_global();
        crate::builtins::install(&global);
        Interpreter {
            environment: EnvRef::clone(&global),
            global,
            distances: Distances::new(),
            started: Instant::now(),
            output,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Merges freshly resolved distances in, so a REPL line's references
    /// into previous lines' globals keep working as new distances are
    /// layered on top of old ones.
    pub fn adopt_distances(&mut self, distances: Distances) {
        self.distances.extend(distances);
    }

    /// Executes a list of top-level statements, collecting any runtime
    /// diagnostic raised along the way. A runtime error halts the whole
    /// run at the first one (there is no containing construct to recover
    /// into at the top level).
    pub fn interpret(&mut self, statements: &[Stmt]) -> Vec<Diagnostic> {
        for stmt in statements {
            if let Err(err) = self.exec(stmt) {
                return vec![Diagnostic::new(DiagnosticKind::RuntimeError, err.message, err.token.span)];
            }
        }
        vec![]
    }

    // --- statement execution --------------------------------------------

    fn exec(&mut self, stmt: &Stmt) -> RuntimeResult<ControlFlow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr)?;
                Ok(ControlFlow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.eval(expr)?;
                let _ = writeln!(self.output, "{}", value);
                Ok(ControlFlow::Normal)
            }

            Stmt::Var { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name.lexeme.clone(), value);
                Ok(ControlFlow::Normal)
            }

            Stmt::Block(body) => {
                let block_env = Environment::new_enclosed(&self.environment);
                self.execute_block(body, block_env)
            }

            Stmt::If { cond, then_branch, else_branch } => {
                if self.eval(cond)?.is_truthy() {
                    self.exec(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec(else_branch)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }

            Stmt::While { cond, body } => {
                while self.eval(cond)?.is_truthy() {
                    match self.exec(body)? {
                        ControlFlow::Normal => {}
                        flow @ ControlFlow::Return(_) => return Ok(flow),
                    }
                }
                Ok(ControlFlow::Normal)
            }

            Stmt::Fun(decl) => {
                let function = Rc::new(Function::new(
                    FunctionBody::Declared(Rc::clone(decl)),
                    EnvRef::clone(&self.environment),
                    false,
                ));
                self.environment.borrow_mut().define(decl.name.lexeme.clone(), Value::Function(function));
                Ok(ControlFlow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }

            Stmt::Class { name, superclass, methods, static_methods } => {
                self.exec_class(name, superclass.as_ref(), methods, static_methods)
            }
        }
    }

    fn exec_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunDecl>],
        static_methods: &[Rc<crate::ast::FunDecl>],
    ) -> RuntimeResult<ControlFlow> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.eval(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => return Err(self.error(name, "Superclass must be a class")),
                }
            }
            None => None,
        };

        self.environment.borrow_mut().define(name.lexeme.clone(), Value::Nil);

        // a `super`-defining scope is pushed only when there is a
        // superclass, so methods' closures see `super` iff they need it.
        let methods_env = match &superclass_value {
            Some(superclass) => {
                let env = Environment::new_enclosed(&self.environment);
                env.borrow_mut().define("super", Value::Class(Rc::clone(superclass)));
                env
            }
            None => EnvRef::clone(&self.environment),
        };

        let build = |decls: &[Rc<crate::ast::FunDecl>]| {
            let mut map = HashMap::new();
            for decl in decls {
                let is_initializer = decl.name.lexeme == "init";
                let function = Rc::new(Function::new(
                    FunctionBody::Declared(Rc::clone(decl)),
                    EnvRef::clone(&methods_env),
                    is_initializer,
                ));
                map.insert(decl.name.lexeme.clone(), function);
            }
            map
        };

        let class = Rc::new(RefCell::new(Class {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: build(methods),
            static_methods: build(static_methods),
            fields: HashMap::new(),
        }));

        self.assign_defined(name, Value::Class(class));
        Ok(ControlFlow::Normal)
    }

    /// Runs a block's statements in `env`, always restoring the prior
    /// current-environment on every exit path, including an early
    /// `Return`.
    pub fn execute_block(&mut self, body: &Block, env: EnvRef) -> RuntimeResult<ControlFlow> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut result = Ok(ControlFlow::Normal);
        for stmt in body {
            match self.exec(stmt) {
                Ok(ControlFlow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    /// Defines `name` back into whatever frame it was already declared
    /// in — used right after `exec_class` already pre-declared the name
    /// as `nil`, so the assignment lands in the same frame.
    fn assign_defined(&mut self, name: &Token, value: Value) {
        self.environment.borrow_mut().define(name.lexeme.clone(), value);
    }

    // --- expression evaluation -------------------------------------------

    fn eval(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Value::from_literal(literal)),

            ExprKind::Identifier(name) => self.lookup(expr.id, name),

            ExprKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(expr.id, target, value.clone())?;
                Ok(value)
            }

            ExprKind::Unary { op, right } => self.eval_unary(op, right),

            ExprKind::Binary { left, op, right } => self.eval_binary(left, op, right),

            ExprKind::Logical { left, op, right } => {
                let left_value = self.eval(left)?;
                let short_circuits = if op.kind == TokenKind::Or {
                    left_value.is_truthy()
                } else {
                    !left_value.is_truthy()
                };
                if short_circuits {
                    Ok(left_value)
                } else {
                    self.eval(right)
                }
            }

            ExprKind::Grouping(inner) => self.eval(inner),

            ExprKind::Condition { test, then_branch, else_branch } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }

            ExprKind::Sequence(exprs) => {
                let mut last = Value::Nil;
                for e in exprs {
                    last = self.eval(e)?;
                }
                Ok(last)
            }

            ExprKind::Call { callee, paren, args } => self.eval_call(callee, paren, args),

            ExprKind::Get { object, name } => {
                let object = self.eval(object)?;
                self.get_property(&object, name)
            }

            ExprKind::Set { object, name, value } => {
                let object = self.eval(object)?;
                let value = self.eval(value)?;
                self.set_property(&object, name, value.clone())?;
                Ok(value)
            }

            ExprKind::This(keyword) => self.lookup(expr.id, keyword),

            ExprKind::Super { keyword, method } => self.eval_super(expr.id, keyword, method),

            ExprKind::FunExpr { params, body } => {
                let function = Rc::new(Function::new(
                    FunctionBody::Anonymous { params: params.clone(), body: body.clone() },
                    EnvRef::clone(&self.environment),
                    false,
                ));
                Ok(Value::Function(function))
            }
        }
    }

    fn eval_unary(&mut self, op: &Token, right: &Expr) -> RuntimeResult<Value> {
        let right = self.eval(right)?;
        match op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(self.type_error(op, &other, "Operand must be a number")),
            },
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only produces '-' or '!' as unary operators"),
        }
    }

    fn eval_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> RuntimeResult<Value> {
        let left = self.eval(left)?;
        let right = self.eval(right)?;

        use TokenKind::*;
        match op.kind {
            Minus | Star | Slash => {
                let (a, b) = self.both_numbers(op, &left, &right)?;
                Ok(Value::Number(match op.kind {
                    Minus => a - b,
                    Star => a * b,
                    Slash => a / b, // IEEE-754: division by zero yields ±Infinity, not an error
                    _ => unreachable!(),
                }))
            }

            Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (Value::String(a), Value::Number(b)) => {
                    Ok(Value::String(format!("{}{}", a, format_number(*b))))
                }
                (Value::Number(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", format_number(*a), b)))
                }
                _ => Err(self.error(op, "Operands must be two numbers or two strings")),
            },

            Less | LessEqual | Greater | GreaterEqual => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(match op.kind {
                    Less => a < b,
                    LessEqual => a <= b,
                    Greater => a > b,
                    GreaterEqual => a >= b,
                    _ => unreachable!(),
                })),
                (Value::String(a), Value::String(b)) => Ok(Value::Bool(match op.kind {
                    Less => a < b,
                    LessEqual => a <= b,
                    Greater => a > b,
                    GreaterEqual => a >= b,
                    _ => unreachable!(),
                })),
                _ => Err(self.error(op, "Operands must be two numbers or two strings")),
            },

            BangEqual => Ok(Value::Bool(left != right)),
            EqualEqual => Ok(Value::Bool(left == right)),

            _ => unreachable!("parser only produces binary operators from this set"),
        }
    }

    fn both_numbers(&self, op: &Token, left: &Value, right: &Value) -> RuntimeResult<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
            _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers")),
        }
    }

    fn eval_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> RuntimeResult<Value> {
        let callee_value = self.eval(callee)?;

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval(arg)?);
        }

        let Some(callable) = callee_value.as_callable() else {
            return Err(self.error(paren, "Can only call functions and classes"));
        };

        let arity = callable.arity();
        if arity >= 0 && arg_values.len() as i32 != arity {
            return Err(self.error(
                paren,
                format!("Expected {} arguments but got {}", arity, arg_values.len()),
            ));
        }

        callable.call(self, arg_values)
    }

    fn get_property(&mut self, object: &Value, name: &Token) -> RuntimeResult<Value> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.borrow().fields.get(&name.lexeme).cloned() {
                    return Ok(value);
                }
                let class = Rc::clone(&instance.borrow().class);
                if let Some(method) = class.borrow().find_method(&name.lexeme) {
                    return Ok(Value::Function(method.bind(instance)));
                }
                Err(self.error(name, format!("Undefined property '{}'", name.lexeme)))
            }
            Value::Class(class) => {
                if let Some(value) = class.borrow().fields.get(&name.lexeme).cloned() {
                    return Ok(value);
                }
                if let Some(method) = class.borrow().find_static(&name.lexeme) {
                    return Ok(Value::Function(method));
                }
                Err(self.error(name, format!("Undefined property '{}'", name.lexeme)))
            }
            _ => Err(self.error(name, "Only instances and classes have properties")),
        }
    }

    fn set_property(&mut self, object: &Value, name: &Token, value: Value) -> RuntimeResult<()> {
        match object {
            Value::Instance(instance) => {
                instance.borrow_mut().fields.insert(name.lexeme.clone(), value);
                Ok(())
            }
            Value::Class(class) => {
                class.borrow_mut().fields.insert(name.lexeme.clone(), value);
                Ok(())
            }
            _ => Err(self.error(name, "Only instances and classes have fields")),
        }
    }

    fn eval_super(&mut self, id: crate::ast::NodeId, keyword: &Token, method: &Token) -> RuntimeResult<Value> {
        let distance = match self.distances.get(&id) {
            Some(&distance) => distance,
            None => return Err(self.error(keyword, "Undefined variable 'super'")),
        };
        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => unreachable!("resolver only binds 'super' scopes to class values"),
        };
        // `this` is always exactly one frame nearer than the `super` scope
        // that names it.
        let this = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => unreachable!("resolver only binds a 'this' scope inward of 'super'"),
        };

        match superclass.borrow().find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(&this))),
            None => Err(self.error(method, format!("Undefined property '{}'", method.lexeme))),
        }
    }

    // --- variable access --------------------------------------------------

    fn lookup(&self, id: crate::ast::NodeId, name: &Token) -> RuntimeResult<Value> {
        let found = match self.distances.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => Environment::get_global(&self.global, &name.lexeme),
        };
        found.ok_or_else(|| self.error(name, format!("Undefined variable '{}'", name.lexeme)))
    }

    fn assign(&mut self, id: crate::ast::NodeId, name: &Token, value: Value) -> RuntimeResult<()> {
        let ok = match self.distances.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, &name.lexeme, value),
            None => Environment::assign_global(&self.global, &name.lexeme, value),
        };
        if ok {
            Ok(())
        } else {
            Err(self.error(name, format!("Undefined variable '{}'", name.lexeme)))
        }
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(token.clone(), message)
    }

    fn type_error(&self, token: &Token, value: &Value, message: &str) -> RuntimeError {
        self.error(token, format!("{} (got {})", message, value.type_name()))
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}
