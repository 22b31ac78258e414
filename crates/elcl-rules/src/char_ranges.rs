/// Character sets for the `chars` constraint.
///
/// A set is the union of inclusive code-point ranges. Sets are written as a
/// list of expressions in the rules document: `(a-z)` for a range, `[abc]`
/// for an explicit list, or one of the named sets `letters`, `digits`,
/// `spacing`, and `linebreak`. Matching is always case-sensitive.
use crate::error::{Error, Result};

/// An inclusive range of Unicode code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    first: char,
    last: char,
}

impl CharRange {
    /// Creates a range covering `first..=last`.
    pub fn new(first: char, last: char) -> Self {
        Self { first, last }
    }

    /// Creates a range covering a single character.
    pub fn single(c: char) -> Self {
        Self { first: c, last: c }
    }

    /// Tests whether the range contains the given character.
    pub fn contains(&self, c: char) -> bool {
        self.first <= c && c <= self.last
    }
}

/// A union of character ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharRanges {
    ranges: Vec<CharRange>,
}

impl CharRanges {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a range to the set.
    pub fn add(&mut self, range: CharRange) {
        self.ranges.push(range);
    }

    /// Adds a single character to the set.
    pub fn add_single(&mut self, c: char) {
        self.ranges.push(CharRange::single(c));
    }

    /// Appends all ranges of another set.
    pub fn extend(&mut self, other: &Self) {
        self.ranges.extend_from_slice(&other.ranges);
    }

    /// Tests whether any range contains the given character.
    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|range| range.contains(c))
    }

    /// Returns `true` if the set has no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Parses a list of character-set expressions and unions the results.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed range or list expressions
    /// and for unknown set names.
    pub fn parse_expressions(expressions: &[String]) -> Result<Self> {
        let mut result = Self::new();
        for expression in expressions {
            parse_expression(expression, &mut result)?;
        }
        Ok(result)
    }
}

/// Combining marks are not allowed as range endpoints; a range like
/// `(a-ä̃)` would silently cover unrelated code points.
fn is_combining_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036f}'
            | '\u{1ab0}'..='\u{1aff}'
            | '\u{1dc0}'..='\u{1dff}'
            | '\u{20d0}'..='\u{20ff}'
            | '\u{fe20}'..='\u{fe2f}'
    )
}

/// Parses one expression and appends its ranges to `out`.
fn parse_expression(expression: &str, out: &mut CharRanges) -> Result<()> {
    if let Some(inner) = expression
        .strip_prefix('(')
        .and_then(|e| e.strip_suffix(')'))
    {
        return parse_paren_range(inner, expression, out);
    }
    if let Some(inner) = expression
        .strip_prefix('[')
        .and_then(|e| e.strip_suffix(']'))
    {
        return parse_bracket_list(inner, out);
    }
    if append_named_set(expression, out) {
        return Ok(());
    }
    Err(Error::validation(format!(
        "Unknown character-set expression: '{expression}'"
    )))
}

/// Parses the inside of a `(a-z)` range expression.
fn parse_paren_range(inner: &str, raw: &str, out: &mut CharRanges) -> Result<()> {
    let chars: Vec<char> = inner.chars().collect();
    if chars.len() != 3 || chars[1] != '-' {
        return Err(Error::validation(format!(
            "A character range must have the form '(a-z)', got '{raw}'"
        )));
    }
    let (first, last) = (chars[0], chars[2]);
    if is_combining_mark(first) || is_combining_mark(last) {
        return Err(Error::validation(format!(
            "A character range must not use combining marks: '{raw}'"
        )));
    }
    if first >= last {
        return Err(Error::validation(format!(
            "The start of a character range must come before its end: '{raw}'"
        )));
    }
    out.add(CharRange::new(first, last));
    Ok(())
}

/// Parses the inside of a `[abc]` list expression.
fn parse_bracket_list(inner: &str, out: &mut CharRanges) -> Result<()> {
    if inner.is_empty() {
        return Err(Error::validation(
            "A character list must contain at least one character",
        ));
    }
    let mut seen = Vec::new();
    for c in inner.chars() {
        if seen.contains(&c) {
            return Err(Error::validation(format!(
                "The character '{c}' appears more than once in a character list"
            )));
        }
        seen.push(c);
        out.add_single(c);
    }
    Ok(())
}

/// Appends a named set; returns `false` for unknown names.
fn append_named_set(name: &str, out: &mut CharRanges) -> bool {
    match name {
        "letters" => {
            out.add(CharRange::new('a', 'z'));
            out.add(CharRange::new('A', 'Z'));
        }
        "digits" => out.add(CharRange::new('0', '9')),
        "spacing" => {
            out.add_single(' ');
            out.add_single('\t');
        }
        "linebreak" => {
            out.add_single('\n');
            out.add_single('\r');
        }
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests;
