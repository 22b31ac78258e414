/// Names of configuration values and rules.
///
/// A [`Name`] is one of three variants: a *regular* name (an identifier,
/// normalized to lowercase with spaces folded to underscores), a *text* name
/// (a quoted string key in a section with texts), or an *index* (the position
/// of an entry in a list). Equality and hashing operate on the normalized
/// form, so `Server Port`, `server_port`, and `SERVER_PORT` are the same
/// regular name.
///
/// Names starting with `vr_` are reserved for the validation-rules language.
/// The `vr_vr_` prefix escapes a reserved name: a rules document uses
/// `vr_vr_entry` to describe a configuration value literally named
/// `vr_entry`.
use std::fmt;

use crate::error::{Error, Result};

/// String constants for the reserved validation-rule names.
pub mod reserved {
    /// Prefix marking a name as reserved for the rules language.
    pub const PREFIX: &str = "vr_";
    /// Prefix escaping a reserved name for use as a regular document name.
    pub const ESCAPE_PREFIX: &str = "vr_vr_";
    /// A template definition at the rules document root.
    pub const TEMPLATE: &str = "vr_template";
    /// The per-element rule inside a list rule.
    pub const ENTRY: &str = "vr_entry";
    /// A wildcard child rule matching any name.
    pub const ANY: &str = "vr_any";
    /// The name-constraint rule inside a `vr_any` rule.
    pub const NAME: &str = "vr_name";
    /// A section list of key-index definitions.
    pub const KEY: &str = "vr_key";
    /// A section list of dependency definitions.
    pub const DEPENDENCY: &str = "vr_dependency";
}

/// The variant of a [`Name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameType {
    /// An identifier, subject to normalization.
    Regular,
    /// A quoted string key.
    Text,
    /// A zero-based list position.
    Index,
}

/// The name of a configuration value or rule node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// A normalized identifier.
    Regular(String),
    /// A quoted string key, compared exactly.
    Text(String),
    /// A zero-based list position.
    Index(usize),
}

/// Normalizes a regular name: lowercase, spaces folded to underscores.
fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

impl Name {
    /// Creates a regular name after normalization.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the normalized name is empty, does not
    /// start with a letter, or contains characters other than ASCII letters,
    /// digits, and underscores.
    pub fn regular(text: &str) -> Result<Self> {
        let normalized = normalize(text);
        let mut chars = normalized.chars();
        let Some(first) = chars.next() else {
            return Err(Error::validation("A name must not be empty"));
        };
        if !first.is_ascii_lowercase() {
            return Err(Error::validation(format!(
                "The name '{normalized}' must start with a letter"
            )));
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(Error::validation(format!(
                "The name '{normalized}' contains characters that are not letters, \
                 digits, or underscores"
            )));
        }
        Ok(Self::Regular(normalized))
    }

    /// Creates a regular name after normalization, skipping validation.
    ///
    /// Used for internal constants and display purposes where the input is
    /// known to be well formed.
    pub fn regular_lossy(text: &str) -> Self {
        Self::Regular(normalize(text))
    }

    /// Creates a text name. The content is compared exactly.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates an index name.
    pub fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// Creates the empty name used by document roots and unnamed values.
    pub fn empty() -> Self {
        Self::Regular(String::new())
    }

    /// Returns the variant of this name.
    pub fn name_type(&self) -> NameType {
        match self {
            Self::Regular(_) => NameType::Regular,
            Self::Text(_) => NameType::Text,
            Self::Index(_) => NameType::Index,
        }
    }

    /// Returns `true` if this is a regular name.
    pub fn is_regular(&self) -> bool {
        matches!(self, Self::Regular(_))
    }

    /// Returns `true` if this is a text name.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns `true` if this is an index name.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Returns `true` for the empty regular name.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Regular(text) if text.is_empty())
    }

    /// Returns the normalized identifier if this is a regular name.
    pub fn as_regular(&self) -> Option<&str> {
        match self {
            Self::Regular(text) => Some(text),
            Self::Text(_) | Self::Index(_) => None,
        }
    }

    /// Returns the string content if this is a text name.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Regular(_) | Self::Index(_) => None,
        }
    }

    /// Returns the position if this is an index name.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Regular(_) | Self::Text(_) => None,
        }
    }

    /// Tests whether this is the given regular name.
    ///
    /// The argument must already be in normalized form.
    pub fn is(&self, word: &str) -> bool {
        self.as_regular() == Some(word)
    }

    /// Returns `true` if this is a regular name reserved for the rules
    /// language (any `vr_` prefix).
    pub fn is_reserved(&self) -> bool {
        match self {
            Self::Regular(text) => text.starts_with(reserved::PREFIX),
            Self::Text(_) | Self::Index(_) => false,
        }
    }

    /// Returns `true` if this is an escaped reserved name (`vr_vr_` prefix).
    pub fn is_escaped_reserved(&self) -> bool {
        match self {
            Self::Regular(text) => text.starts_with(reserved::ESCAPE_PREFIX),
            Self::Text(_) | Self::Index(_) => false,
        }
    }

    /// Returns this name with one leading `vr_` prefix removed.
    ///
    /// Used to unescape `vr_vr_<x>` into `vr_<x>`. Names without the prefix
    /// are returned unchanged.
    #[must_use]
    pub fn with_reserved_prefix_removed(&self) -> Self {
        match self {
            Self::Regular(text) => match text.strip_prefix(reserved::PREFIX) {
                Some(stripped) => Self::Regular(stripped.to_owned()),
                None => self.clone(),
            },
            Self::Text(_) | Self::Index(_) => self.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular(text) => f.write_str(text),
            Self::Text(text) => write!(f, "\"{text}\""),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}
