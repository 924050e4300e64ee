//! A tree-walking interpreter for a small, dynamically typed, C-syntax
//! scripting language: lexer, parser, resolver, and interpreter, wired
//! together behind a single [`run`] entry point.

pub mod ast;
pub mod builtins;
pub mod common;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;

use common::{Diagnostic, Diagnostics, Source};
use interpreter::Interpreter;
use resolver::Resolver;
use std::rc::Rc;

/// Lexes, parses, resolves, and interprets one `Source` against an
/// already-running `Interpreter`/`Resolver` pair. Each pipeline stage
/// reports into a shared `Diagnostics` sink and is gated on `had_error`
/// before the next stage runs.
///
/// The REPL and the script runner both call this; the REPL simply keeps
/// reusing the same `Interpreter` and `Resolver` across calls so that
/// globals declared on one line are visible on the next.
pub fn run(source: Rc<Source>, interp: &mut Interpreter, resolver: &mut Resolver) -> Vec<Diagnostic> {
    let mut diagnostics = Diagnostics::new();

    let (tokens, lex_diagnostics) = lexer::Lexer::lex(source);
    diagnostics.extend(lex_diagnostics);
    if diagnostics.had_error() {
        return diagnostics.into_vec();
    }

    let (statements, parse_diagnostics) = parser::Parser::parse(tokens);
    diagnostics.extend(parse_diagnostics);
    if diagnostics.had_error() {
        return diagnostics.into_vec();
    }

    diagnostics.extend(resolver.resolve(&statements));
    if diagnostics.had_error() {
        return diagnostics.into_vec();
    }

    interp.adopt_distances(resolver.distances().clone());
    diagnostics.extend(interp.interpret(&statements));
    diagnostics.into_vec()
}
