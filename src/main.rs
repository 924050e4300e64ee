use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use colored::Colorize;
use corvus::common::{Diagnostic, DiagnosticKind, Source};
use corvus::interpreter::Interpreter;
use corvus::resolver::Resolver;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            run_repl();
            ExitCode::SUCCESS
        }
        [path] => run_file(path),
        _ => {
            eprintln!("Usage: corvus [script]");
            ExitCode::from(1)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match Source::path(std::path::Path::new(path)) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: couldn't read '{}': {}", "error".red().bold(), path, err);
            return ExitCode::from(1);
        }
    };

    let mut interp = Interpreter::new();
    let mut resolver = Resolver::new();
    let diagnostics = corvus::run(source, &mut interp, &mut resolver);

    report_all(&diagnostics);
    exit_code_for(&diagnostics)
}

fn run_repl() {
    println!("corvus {}  (Ctrl+D to exit)", env!("CARGO_PKG_VERSION"));

    let mut interp = Interpreter::new();
    let mut resolver = Resolver::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                eprintln!("{}: {}", "error".red().bold(), err);
                break;
            }
        }

        let source = Source::source(&line);
        let diagnostics = corvus::run(source, &mut interp, &mut resolver);
        report_all(&diagnostics);
    }
}

fn report_all(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        report(diagnostic);
    }
}

fn report(diagnostic: &Diagnostic) {
    let status = match diagnostic.kind {
        DiagnosticKind::TokenError => "error".yellow().bold(),
        DiagnosticKind::SyntaxError => "error".red().bold(),
        DiagnosticKind::RuntimeError => "error".red().bold(),
    };
    eprintln!("{}: {}", status, diagnostic);
}

/// 65 for syntax/static errors, 70 for runtime errors, following the
/// `sysexits.h` convention the diagnostic kind already tracks.
fn exit_code_for(diagnostics: &[Diagnostic]) -> ExitCode {
    if diagnostics.iter().any(|d| d.kind == DiagnosticKind::RuntimeError) {
        ExitCode::from(70)
    } else if !diagnostics.is_empty() {
        ExitCode::from(65)
    } else {
        ExitCode::SUCCESS
    }
}
