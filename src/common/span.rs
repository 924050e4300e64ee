use std::{
    fmt::{self, Display, Formatter},
    rc::Rc,
};

use crate::common::source::Source;

/// A `Span` refers to a byte range of a `Source`, much like a `&str` but
/// carrying a reference to the `Source` it was cut from rather than the
/// text itself. Spans are attached to tokens and AST nodes so diagnostics
/// can point back at the exact source text that produced them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Span {
    source: Rc<Source>,
    offset: usize,
    length: usize,
}

impl Span {
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span { source: Rc::clone(source), offset, length }
    }

    /// A zero-width span pointing at a single byte offset, used for
    /// point diagnostics (e.g. an unrecognized character).
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span { source: Rc::clone(source), offset, length: 1 }
    }

    /// Combines two spans from the same source into the smallest span
    /// that contains both.
    pub fn combine(a: &Span, b: &Span) -> Span {
        assert!(Rc::ptr_eq(&a.source, &b.source), "can't combine spans from different sources");

        let offset = a.offset.min(b.offset);
        let end = (a.offset + a.length).max(b.offset + b.length);
        Span::new(&a.source, offset, end - offset)
    }

    pub fn contents(&self) -> &str {
        &self.source.contents[self.offset..self.offset + self.length]
    }

    pub fn path(&self) -> &std::path::Path {
        &self.source.path
    }

    /// Returns `(start_line, start_col)` and `(end_line, end_col)`, all
    /// zero-indexed.
    fn line_indices(&self) -> ((usize, usize), (usize, usize)) {
        let start = self.offset;
        let end = (self.offset + self.length).saturating_sub(1).max(start);

        let line_col = |at: usize| -> (usize, usize) {
            let mut line = 0;
            let mut col = 0;
            for (i, c) in self.source.contents.char_indices() {
                if i >= at {
                    break;
                }
                if c == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
            }
            (line, col)
        };

        (line_col(start), line_col(end))
    }

    /// Renders the span as a human-readable source excerpt, pointing a
    /// caret at the offending text for single-line spans.
    pub fn format(&self) -> FormattedSpan {
        let ((start_line, start_col), (end_line, _end_col)) = self.line_indices();
        let lines: Vec<&str> = self.source.contents.lines().collect();

        FormattedSpan {
            path: self.source.path.display().to_string(),
            start: start_line,
            start_col,
            lines: lines
                .get(start_line..=end_line.min(lines.len().saturating_sub(1)))
                .map(|s| s.iter().map(|l| l.to_string()).collect())
                .unwrap_or_default(),
            length: self.length,
            multiline: start_line != end_line,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// A pre-rendered view of a `Span`'s surrounding source text, separated
/// from `Span` itself so `Diagnostic` can lay it out next to a hint.
pub struct FormattedSpan {
    pub path: String,
    pub start: usize,
    pub start_col: usize,
    pub lines: Vec<String>,
    pub length: usize,
    pub multiline: bool,
}

impl FormattedSpan {
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub fn gutter_padding(&self) -> usize {
        (self.start + self.lines.len()).to_string().len()
    }

    pub fn carets(&self) -> usize {
        self.length.max(1)
    }
}

impl Display for FormattedSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let padding = self.gutter_padding();
        writeln!(f, "{}:{}:{}", self.path, self.start + 1, self.start_col + 1)?;
        writeln!(f, "{} |", " ".repeat(padding))?;

        if self.multiline {
            for (i, line) in self.lines.iter().enumerate() {
                let no = (self.start + i + 1).to_string();
                writeln!(f, "{}{} > {}", " ".repeat(padding - no.len()), no, line)?;
            }
            writeln!(f, "{} |", " ".repeat(padding))
        } else {
            let no = (self.start + 1).to_string();
            writeln!(f, "{} | {}", no, self.lines.first().cloned().unwrap_or_default())?;
            writeln!(
                f,
                "{} | {}{}",
                " ".repeat(padding),
                " ".repeat(self.start_col),
                "^".repeat(self.carets()),
            )
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn combination() {
        let source = Source::source("heck, that's awesome");
        let a = Span::new(&source, 0, 5);
        let b = Span::new(&source, 11, 2);

        assert_eq!(Span::combine(&a, &b), Span::new(&source, 0, 13));
    }

    #[test]
    fn single_line_format_has_caret() {
        let source = Source::source("var x = 1;");
        let span = Span::new(&source, 4, 1);
        let rendered = format!("{}", span.format());
        assert!(rendered.contains('^'));
    }
}
