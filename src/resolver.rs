use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, FunDecl, NodeId, Stmt};
use crate::common::diagnostic::{Diagnostic, DiagnosticKind};
use crate::token::Token;

/// The resolver's output: for every variable-referencing expression node
/// (`Identifier`, `Assign`, `This`, `Super`), how many scope frames to
/// skip from the point of reference to the frame that declares it.
/// Absence of an entry means "look it up on the global frame."
pub type Distances = HashMap<NodeId, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionContext {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassContext {
    None,
    InClass,
}

/// Whether a name has merely been declared (visible but not yet safe to
/// read) or fully defined (initializer has run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Declared,
    Defined,
}

type Scope = HashMap<String, Binding>;

pub struct Resolver {
    scopes: Vec<Scope>,
    distances: Distances,
    function_context: FunctionContext,
    class_context: ClassContext,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            scopes: vec![],
            distances: Distances::new(),
            function_context: FunctionContext::None,
            class_context: ClassContext::None,
            diagnostics: vec![],
        }
    }

    /// Resolves a list of statements against whatever scopes already
    /// exist on `self` (the REPL reuses one `Resolver` across lines so
    /// names declared on an earlier line remain visible; see
    /// `global_environment_is_shared_across_repl_lines` in tests).
    pub fn resolve(&mut self, statements: &[Stmt]) -> Vec<Diagnostic> {
        self.resolve_statements(statements);
        std::mem::take(&mut self.diagnostics)
    }

    pub fn distances(&self) -> &Distances {
        &self.distances
    }

    pub fn into_distances(self) -> Distances {
        self.distances
    }

    // --- scope stack ---------------------------------------------------

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };
        if scope.contains_key(&name.lexeme) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::SyntaxError,
                format!("Variable '{}' already declared in this scope", name.lexeme),
                name.span.clone(),
            ));
        }
        scope.insert(name.lexeme.clone(), Binding::Declared);
    }

    fn define(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };
        scope.insert(name.lexeme.clone(), Binding::Defined);
    }

    fn define_synthetic(&mut self, name: &str) {
        let Some(scope) = self.scopes.last_mut() else { return };
        scope.insert(name.to_string(), Binding::Defined);
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (i, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.distances.insert(id, i);
                return;
            }
        }
        // not found in any scope: treat as a global reference
    }

    // --- statements ------------------------------------------------------

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, init } => {
                self.declare(name);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }

            Stmt::Block(body) => {
                self.begin_scope();
                self.resolve_statements(body);
                self.end_scope();
            }

            Stmt::If { cond, then_branch, else_branch } => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { cond, body } => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }

            Stmt::Fun(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionContext::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.function_context == FunctionContext::None {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        "Can't return from top-level code",
                        keyword.span.clone(),
                    ));
                }
                if let Some(value) = value {
                    if self.function_context == FunctionContext::Initializer {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::SyntaxError,
                            "Can't return a value from an initializer",
                            keyword.span.clone(),
                        ));
                    }
                    self.resolve_expr(value);
                }
            }

            Stmt::Class { name, superclass, methods, static_methods } => {
                self.resolve_class(name, superclass.as_ref(), methods, static_methods);
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunDecl>],
        static_methods: &[std::rc::Rc<FunDecl>],
    ) {
        let enclosing_class = self.class_context;
        self.class_context = ClassContext::InClass;

        self.declare(name);
        self.define(name);

        if let Some(superclass_expr) = superclass {
            if let ExprKind::Identifier(super_name) = &superclass_expr.kind {
                if super_name.lexeme == name.lexeme {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        "A class can't inherit from itself",
                        super_name.span.clone(),
                    ));
                }
            }
            self.resolve_expr(superclass_expr);
        }

        // static methods see neither `this` nor `super`
        for method in static_methods {
            self.resolve_function(method, FunctionContext::Method);
        }

        if superclass.is_some() {
            self.begin_scope();
            self.define_synthetic("super");
        }

        self.begin_scope();
        self.define_synthetic("this");

        for method in methods {
            let context = if method.name.lexeme == "init" {
                FunctionContext::Initializer
            } else {
                FunctionContext::Method
            };
            self.resolve_function(method, context);
        }

        self.end_scope(); // this

        if superclass.is_some() {
            self.end_scope(); // super
        }

        self.class_context = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunDecl, context: FunctionContext) {
        let enclosing_function = self.function_context;
        self.function_context = context;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&decl.body);
        self.end_scope();

        self.function_context = enclosing_function;
    }

    // --- expressions -----------------------------------------------------

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Identifier(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&Binding::Declared) {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::SyntaxError,
                            format!(
                                "Can't read local variable '{}' in its own initializer",
                                name.lexeme
                            ),
                            name.span.clone(),
                        ));
                    }
                }
                self.resolve_local(expr.id, &name.lexeme);
            }

            ExprKind::Assign { target, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, &target.lexeme);
            }

            ExprKind::Unary { right, .. } => self.resolve_expr(right),

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Grouping(inner) => self.resolve_expr(inner),

            ExprKind::Condition { test, then_branch, else_branch } => {
                self.resolve_expr(test);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            ExprKind::Sequence(exprs) => {
                for e in exprs {
                    self.resolve_expr(e);
                }
            }

            ExprKind::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }

            ExprKind::Get { object, .. } => self.resolve_expr(object),

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            ExprKind::This(keyword) => {
                if self.class_context == ClassContext::None {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        "Can't use 'this' outside of a class",
                        keyword.span.clone(),
                    ));
                    return;
                }
                self.resolve_local(expr.id, "this");
            }

            ExprKind::Super { keyword, .. } => {
                if self.class_context == ClassContext::None {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        "Can't use 'super' outside of a class",
                        keyword.span.clone(),
                    ));
                    return;
                }
                self.resolve_local(expr.id, "super");
            }

            ExprKind::FunExpr { params, body } => {
                let enclosing_function = self.function_context;
                self.function_context = FunctionContext::Function;

                self.begin_scope();
                for param in params {
                    self.declare(param);
                    self.define(param);
                }
                self.resolve_statements(body);
                self.end_scope();

                self.function_context = enclosing_function;
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Resolver {
        Resolver::new()
    }
}
