use std::{
    fs,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Some literal source code, whether a REPL line, a script file, or an
/// in-memory string handed to the library directly. A `Source` is little
/// more than a string with a path, the path serving as the source's name
/// in diagnostics. Sources without a real path point at `<repl>`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Builds a new `Source` from an owned string and a path.
    pub fn new(contents: String, path: PathBuf) -> Rc<Source> {
        Rc::new(Source { contents, path })
    }

    /// Reads a file from disk into a `Source`.
    pub fn path(path: &Path) -> io::Result<Rc<Source>> {
        let contents = fs::read_to_string(path)?;
        Ok(Source::new(contents, path.to_owned()))
    }

    /// Builds a `Source` from a bare string, for the REPL and for tests.
    /// Its path points at the sentinel `<repl>`.
    pub fn source(contents: &str) -> Rc<Source> {
        Source::new(contents.to_string(), PathBuf::from("<repl>"))
    }
}
