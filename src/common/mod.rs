//! Data structures shared across every pipeline stage: source text,
//! source-location spans, and the diagnostic sink errors are reported
//! through.

pub mod diagnostic;
pub mod source;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Note};
pub use source::Source;
pub use span::Span;
