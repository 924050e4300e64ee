//! The tree-walking evaluator: environments, the dynamic value universe,
//! non-local control flow, and the statement/expression evaluator itself.

pub mod control;
pub mod environment;
pub mod eval;
pub mod value;

pub use control::{ControlFlow, RuntimeError, RuntimeResult};
pub use environment::{EnvRef, Environment};
pub use eval::Interpreter;
pub use value::Value;
