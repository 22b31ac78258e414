/// The error type shared by the rules compiler and the document validator.
///
/// Every failure the engine reports is an [`Error`] with the `Validation`
/// category. The `Internal` category is reserved for consistency breaches
/// inside the engine itself (a broken invariant, never user input).
///
/// Errors carry an optional [`NamePath`] identifying the offending
/// configuration node and an optional [`Location`] pointing into the source.
/// Both passes unwind explicit work stacks by returning errors; each layer
/// that catches one may enrich it with path and location when the inner
/// error lacked them, then pass it on. No error is ever suppressed.
use std::fmt;

use crate::location::Location;
use crate::name_path::NamePath;

/// The category of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A rules document, rule definition, or configuration document failed
    /// validation. This is the only category produced for user input.
    Validation,
    /// An internal consistency breach; indicates a bug in the engine.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => f.write_str("Validation"),
            Self::Internal => f.write_str("Internal"),
        }
    }
}

/// A validation or internal error raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    category: ErrorCategory,
    message: String,
    name_path: Option<NamePath>,
    location: Option<Location>,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Constructs a validation error with a bare message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Validation,
            message: message.into(),
            name_path: None,
            location: None,
        }
    }

    /// Constructs an internal error. Raised only for broken invariants.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Internal,
            message: message.into(),
            name_path: None,
            location: None,
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Returns the message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the name path of the offending node, if one was attached.
    pub fn name_path(&self) -> Option<&NamePath> {
        self.name_path.as_ref()
    }

    /// Returns the source location of this error, if one was attached.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Returns `true` if this error already carries a source location.
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// Returns this error with its message replaced.
    ///
    /// Used to substitute a rule's or constraint's custom error message for
    /// the default one; path and location are kept.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns this error with the given name path and location attached.
    #[must_use]
    pub fn with_name_path_and_location(
        mut self,
        name_path: NamePath,
        location: Option<Location>,
    ) -> Self {
        self.name_path = Some(name_path);
        self.location = location;
        self
    }

    /// Returns this error with the given location attached.
    #[must_use]
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        if let Some(name_path) = &self.name_path {
            write!(f, " (at '{name_path}')")?;
        }
        if let Some(location) = &self.location {
            write!(f, " [{location}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
