/// Ordered sequences of names addressing values and rules within a tree.
///
/// A [`NamePath`] is a list of [`Name`] elements; equality is element-wise
/// equality after normalization. Paths render and parse in the dotted text
/// form used by key and dependency definitions: regular names joined with
/// `.`, text names quoted, and indexes in brackets (`filter.vr_entry.name`,
/// `servers[0].port`, `translations."en US"`).
use std::fmt;

use crate::error::{Error, Result};
use crate::name::Name;

/// A path of names from a tree root to one of its nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NamePath {
    names: Vec<Name>,
}

impl NamePath {
    /// Creates an empty path (the document root).
    pub fn root() -> Self {
        Self { names: Vec::new() }
    }

    /// Creates a path from a list of names.
    pub fn from_names(names: Vec<Name>) -> Self {
        Self { names }
    }

    /// Parses a path from its dotted text form.
    ///
    /// Segments are separated by `.`; `"..."` segments become text names and
    /// `[n]` segments become index names. Everything else must be a valid
    /// regular name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty input, unterminated quotes,
    /// malformed index brackets, or invalid regular names.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut names = Vec::new();
        let mut rest = text;
        if rest.is_empty() {
            return Err(Error::validation("A name path must not be empty"));
        }
        loop {
            let (name, remainder) = parse_segment(rest)?;
            names.push(name);
            match remainder {
                Some(r) => rest = r,
                None => break,
            }
        }
        Ok(Self { names })
    }

    /// Returns the number of names in this path.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if this path is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the first name, if any.
    pub fn first(&self) -> Option<&Name> {
        self.names.first()
    }

    /// Returns the last name, if any.
    pub fn last(&self) -> Option<&Name> {
        self.names.last()
    }

    /// Returns the name at the given position, if any.
    pub fn at(&self, index: usize) -> Option<&Name> {
        self.names.get(index)
    }

    /// Iterates over the names of this path.
    pub fn iter(&self) -> std::slice::Iter<'_, Name> {
        self.names.iter()
    }

    /// Appends a name to this path.
    pub fn push(&mut self, name: Name) {
        self.names.push(name);
    }

    /// Returns this path with a name appended.
    #[must_use]
    pub fn joined(&self, name: Name) -> Self {
        let mut names = self.names.clone();
        names.push(name);
        Self { names }
    }

    /// Returns this path with another path appended.
    #[must_use]
    pub fn concatenated(&self, other: &Self) -> Self {
        let mut names = self.names.clone();
        names.extend(other.names.iter().cloned());
        Self { names }
    }

    /// Returns the prefix of the given length (clamped to the path length).
    #[must_use]
    pub fn prefix(&self, length: usize) -> Self {
        Self {
            names: self.names.iter().take(length).cloned().collect(),
        }
    }

    /// Returns the sub-path starting at the given position.
    #[must_use]
    pub fn suffix_from(&self, start: usize) -> Self {
        Self {
            names: self.names.iter().skip(start).cloned().collect(),
        }
    }

    /// Returns this path without its last name.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut names = self.names.clone();
        names.pop();
        Self { names }
    }

    /// Returns the position of the first name equal to the given regular
    /// name, if any.
    pub fn find_regular(&self, word: &str) -> Option<usize> {
        self.names.iter().position(|name| name.is(word))
    }

    /// Returns `true` if any name in this path is a text name.
    pub fn contains_text(&self) -> bool {
        self.names.iter().any(Name::is_text)
    }

    /// Returns `true` if any name in this path is an index name.
    pub fn contains_index(&self) -> bool {
        self.names.iter().any(Name::is_index)
    }

    /// Renders this path in its dotted text form.
    pub fn to_text(&self) -> String {
        let mut result = String::new();
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 && !name.is_index() {
                result.push('.');
            }
            result.push_str(&name.to_string());
        }
        result
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl TryFrom<&str> for NamePath {
    type Error = Error;

    fn try_from(text: &str) -> Result<Self> {
        Self::from_text(text)
    }
}

impl From<Name> for NamePath {
    fn from(name: Name) -> Self {
        Self { names: vec![name] }
    }
}

/// Parses one segment from the front of `text`.
///
/// Returns the parsed name and the remaining text after the separator, or
/// `None` when the input is exhausted.
fn parse_segment(text: &str) -> Result<(Name, Option<&str>)> {
    if let Some(rest) = text.strip_prefix('"') {
        let Some(end) = rest.find('"') else {
            return Err(Error::validation(format!(
                "Unterminated quoted name in name path: \"{text}"
            )));
        };
        let name = Name::text(&rest[..end]);
        return Ok((name, split_separator(&rest[end + 1..])?));
    }
    if let Some(rest) = text.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            return Err(Error::validation(format!(
                "Unterminated index bracket in name path: [{text}"
            )));
        };
        let index: usize = rest[..end].trim().parse().map_err(|_| {
            Error::validation(format!("Invalid index '{}' in name path", &rest[..end]))
        })?;
        return Ok((Name::index(index), split_separator(&rest[end + 1..])?));
    }
    let end = text
        .char_indices()
        .find(|(_, c)| *c == '.' || *c == '[')
        .map_or(text.len(), |(i, _)| i);
    let name = Name::regular(&text[..end])?;
    if text[end..].starts_with('[') {
        // An index follows directly, without a dot separator.
        return Ok((name, Some(&text[end..])));
    }
    Ok((name, split_separator(&text[end..])?))
}

/// Consumes a leading `.` separator; an empty remainder ends the path.
fn split_separator(rest: &str) -> Result<Option<&str>> {
    if rest.is_empty() {
        return Ok(None);
    }
    if let Some(next) = rest.strip_prefix('.') {
        if next.is_empty() {
            return Err(Error::validation("A name path must not end with a dot"));
        }
        return Ok(Some(next));
    }
    if rest.starts_with('[') {
        // An index segment may follow without a separator.
        return Ok(Some(rest));
    }
    Err(Error::validation(format!(
        "Unexpected character after name path segment: {rest}"
    )))
}

#[cfg(test)]
mod tests;
