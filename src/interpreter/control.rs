use crate::interpreter::value::Value;
use crate::token::Token;

/// How a statement finished executing. `Return` carries the value up
/// through every enclosing statement evaluator until it reaches the
/// function-call boundary that catches it — a typed propagation in
/// place of exception-based unwinding.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    Normal,
    Return(Value),
}

impl ControlFlow {
    pub fn is_return(&self) -> bool {
        matches!(self, ControlFlow::Return(_))
    }
}

/// A runtime failure, carrying the token whose span points at the
/// offending code so the driver can render a positioned diagnostic.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> RuntimeError {
        RuntimeError { token, message: message.into() }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
