/// Source locations attached to values, rules, and errors.
///
/// A [`Location`] names the source a value came from plus a 1-based line and
/// column. The engine never reads sources itself; locations are carried
/// through from the parser so that validation failures can point back into
/// the original configuration text.
use std::fmt;

/// A position within a configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// The name or path of the source (e.g. a file name).
    source: String,
    /// The 1-based line number.
    line: u32,
    /// The 1-based column number, counted in Unicode code points.
    column: u32,
}

impl Location {
    /// Constructs a new location.
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }

    /// Returns the source name.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the 1-based column number.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}
