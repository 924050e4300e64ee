use std::fmt::{self, Display, Formatter};

use crate::common::span::Span;

/// Which stage of the pipeline raised a `Diagnostic`. Carried through to
/// the rendered message as a tag, per spec: `TokenError`, `SyntaxError`,
/// `RuntimeError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Lexer failure: unrecognized character, malformed number.
    TokenError,
    /// Parser or resolver failure: missing token, invalid assignment
    /// target, redeclaration, `this`/`return` misuse, and so on.
    SyntaxError,
    /// Interpreter failure: type mismatch, undefined variable, arity
    /// mismatch, missing property, and so on.
    RuntimeError,
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::TokenError => "TokenError",
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::RuntimeError => "RuntimeError",
        };
        write!(f, "{}", name)
    }
}

/// A location in source code with an optional hint, attached to a
/// `Diagnostic`. Most diagnostics carry exactly one note.
#[derive(Debug, Clone)]
pub struct Note {
    pub span: Span,
    pub hint: Option<String>,
}

impl Note {
    pub fn new(span: Span) -> Note {
        Note { span, hint: None }
    }

    pub fn with_hint(span: Span, hint: impl Into<String>) -> Note {
        Note { span, hint: Some(hint.into()) }
    }
}

/// A single reported error: a kind tag, a human-readable reason, and the
/// source location(s) that produced it.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub reason: String,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, reason: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic { kind, reason: reason.into(), notes: vec![Note::new(span)] }
    }

    pub fn with_hint(
        kind: DiagnosticKind,
        reason: impl Into<String>,
        span: Span,
        hint: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic { kind, reason: reason.into(), notes: vec![Note::with_hint(span, hint)] }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for note in &self.notes {
            let formatted = note.span.format();
            write!(f, "{}", formatted)?;
            if let Some(hint) = &note.hint {
                writeln!(f, "{} |- note: {}", " ".repeat(formatted.gutter_padding()), hint)?;
            }
        }
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Accumulates diagnostics across a single `run`. The driver consults
/// `had_error` between pipeline stages to decide whether to proceed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.reported.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.reported.extend(diagnostics);
    }

    pub fn had_error(&self) -> bool {
        !self.reported.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reported.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.reported
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    #[test]
    fn renders_kind_and_reason() {
        let source = Source::source("1 + ;");
        let span = Span::new(&source, 4, 1);
        let diagnostic =
            Diagnostic::new(DiagnosticKind::SyntaxError, "Expected expression", span);

        let rendered = format!("{}", diagnostic);
        assert!(rendered.contains("SyntaxError"));
        assert!(rendered.contains("Expected expression"));
    }
}
