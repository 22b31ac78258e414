/// Typed constraints applied to values once their rule type matches.
///
/// A [`Constraint`] is a tagged union of kinds ([`ConstraintKind`]) plus the
/// attributes every constraint shares: its user-facing name (including any
/// `not_` prefix), the negation flag, an optional custom error message, a
/// from-template marker, and the declaration location. A rule holds at most
/// one constraint per [`ConstraintType`]; positive and negated spellings
/// share that slot.
///
/// Evaluation is keyed on the validated value's kind. A constraint performs
/// no work when the value's kind does not match one of its supported
/// inputs; rule-type validation runs first and guarantees the pairing is
/// meaningful. Key constraints are the exception: they are collected here
/// but evaluated by the validator's second pass against key indexes.
use regex::Regex;

use crate::char_ranges::CharRanges;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::name_path::NamePath;
use crate::rule::{CaseSensitivity, RuleRef, RuleType};
use crate::types::{Bytes, Date, DateTime, Time};
use crate::value::{ValueData, ValueRef, ValueType};

// ---------------------------------------------------------------------------
// ConstraintType
// ---------------------------------------------------------------------------

/// The slot a constraint occupies on a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Lower bound (numeric, temporal, length, or element count).
    Minimum,
    /// Upper bound (numeric, temporal, length, or element count).
    Maximum,
    /// Exact comparison.
    Equals,
    /// Membership in a fixed list.
    In,
    /// Divisibility of a value or count.
    Multiple,
    /// Character-set restriction on texts.
    Chars,
    /// Prefix restriction on texts.
    Starts,
    /// Suffix restriction on texts.
    Ends,
    /// Substring restriction on texts.
    Contains,
    /// Regular-expression match on texts.
    Matches,
    /// Cross-reference into a key index (evaluated in pass 2).
    Key,
}

impl ConstraintType {
    /// Returns the base spelling of this constraint in rules documents.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Equals => "equals",
            Self::In => "in",
            Self::Multiple => "multiple",
            Self::Chars => "chars",
            Self::Starts => "starts",
            Self::Ends => "ends",
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::Key => "key",
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// The comparison value of a minimum or maximum constraint.
#[derive(Debug, Clone)]
pub enum BoundValue {
    /// A numeric bound, or a length/count bound for texts, byte sequences,
    /// lists, and sections.
    Integer(i64),
    /// A numeric bound for float rules.
    Float(f64),
    /// A temporal bound for date rules.
    Date(Date),
    /// A temporal bound for date-time rules.
    DateTime(DateTime),
    /// Independent row and column bounds for value matrices.
    Matrix(i64, i64),
}

/// The comparison value of an equals constraint.
#[derive(Debug, Clone)]
pub enum EqualsValue {
    /// An exact integer, or an exact length/count for other kinds.
    Integer(i64),
    /// An exact boolean.
    Boolean(bool),
    /// A float compared within platform tolerance.
    Float(f64),
    /// A text compared under the rule's case sensitivity.
    Text(String),
    /// A byte sequence compared exactly.
    Bytes(Bytes),
    /// Exact row and column counts for value matrices.
    Matrix(i64, i64),
}

/// The membership list of an `in` constraint.
#[derive(Debug, Clone)]
pub enum InValues {
    /// Integer membership.
    Integers(Vec<i64>),
    /// Float membership, compared within platform tolerance.
    Floats(Vec<f64>),
    /// Text membership under the rule's case sensitivity.
    Texts(Vec<String>),
    /// Byte-sequence membership, compared exactly.
    ByteSequences(Vec<Bytes>),
}

/// The divisor of a `multiple` constraint.
#[derive(Debug, Clone)]
pub enum MultipleValue {
    /// An integer divisor for values or counts.
    Integer(i64),
    /// A float divisor.
    Float(f64),
    /// Independent row and column divisors for value matrices.
    Matrix(i64, i64),
}

/// The kind-specific payload of a constraint.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// Inclusive lower bound.
    Minimum(BoundValue),
    /// Inclusive upper bound.
    Maximum(BoundValue),
    /// Exact comparison.
    Equals(EqualsValue),
    /// Membership in a duplicate-free list.
    In(InValues),
    /// Divisibility check.
    Multiple(MultipleValue),
    /// Character-set restriction. Always case-sensitive.
    Chars(CharRanges),
    /// Accepted text prefixes (OR semantics).
    Starts(Vec<String>),
    /// Accepted text suffixes (OR semantics).
    Ends(Vec<String>),
    /// Accepted substrings (OR semantics).
    Contains(Vec<String>),
    /// A compiled regular expression.
    Matches(Regex),
    /// References into key indexes, resolved in pass 2.
    Key(Vec<NamePath>),
}

impl ConstraintKind {
    /// Returns the slot this kind occupies.
    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            Self::Minimum(_) => ConstraintType::Minimum,
            Self::Maximum(_) => ConstraintType::Maximum,
            Self::Equals(_) => ConstraintType::Equals,
            Self::In(_) => ConstraintType::In,
            Self::Multiple(_) => ConstraintType::Multiple,
            Self::Chars(_) => ConstraintType::Chars,
            Self::Starts(_) => ConstraintType::Starts,
            Self::Ends(_) => ConstraintType::Ends,
            Self::Contains(_) => ConstraintType::Contains,
            Self::Matches(_) => ConstraintType::Matches,
            Self::Key(_) => ConstraintType::Key,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation context
// ---------------------------------------------------------------------------

/// What a constraint is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTarget {
    /// The value's payload.
    Value,
    /// The value's name (used by `vr_name` rules).
    Name,
}

/// The context a constraint is evaluated in.
pub struct ValidationContext<'a> {
    /// Whether the payload or the name is validated.
    pub target: ValidationTarget,
    /// The value node being validated.
    pub value: &'a ValueRef,
    /// The rule the constraint belongs to.
    pub rule: &'a RuleRef,
}

// ---------------------------------------------------------------------------
// Constraint
// ---------------------------------------------------------------------------

/// A named predicate attached to a rule.
#[derive(Debug, Clone)]
pub struct Constraint {
    kind: ConstraintKind,
    name: String,
    negated: bool,
    custom_error: Option<String>,
    from_template: bool,
    location: Option<Location>,
}

impl Constraint {
    /// Creates a constraint with the given kind and user-facing name.
    pub fn new(kind: ConstraintKind, name: impl Into<String>, negated: bool) -> Self {
        Self {
            kind,
            name: name.into(),
            negated,
            custom_error: None,
            from_template: false,
            location: None,
        }
    }

    /// Returns the kind-specific payload.
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Returns the slot this constraint occupies.
    pub fn constraint_type(&self) -> ConstraintType {
        self.kind.constraint_type()
    }

    /// Returns the user-facing spelling, including any `not_` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this constraint is negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns the custom error message, if set.
    pub fn custom_error(&self) -> Option<&str> {
        self.custom_error.as_deref()
    }

    /// Sets the custom error message.
    pub fn set_custom_error(&mut self, message: impl Into<String>) {
        self.custom_error = Some(message.into());
    }

    /// Returns `true` if this constraint was imported from a template.
    pub fn is_from_template(&self) -> bool {
        self.from_template
    }

    /// Marks this constraint as imported from a template.
    pub fn set_from_template(&mut self, from_template: bool) {
        self.from_template = from_template;
    }

    /// Returns the declaration location, if known.
    pub fn location(&self) -> Option<Location> {
        self.location.clone()
    }

    /// Sets the declaration location.
    pub fn set_location(&mut self, location: Option<Location>) {
        self.location = location;
    }

    /// Returns the key references of a key constraint.
    pub fn key_references(&self) -> Option<&[NamePath]> {
        if let ConstraintKind::Key(references) = &self.kind {
            return Some(references);
        }
        None
    }

    // -- evaluation ---------------------------------------------------------

    /// Evaluates this constraint in the given context.
    ///
    /// Unsupported value kinds pass silently; rule-type validation has
    /// already established that the pairing is valid. Key constraints are
    /// not evaluated here.
    pub fn evaluate(&self, context: &ValidationContext<'_>) -> Result<()> {
        match context.target {
            ValidationTarget::Value => self.evaluate_value(context),
            ValidationTarget::Name => self.evaluate_name(context),
        }
    }

    fn evaluate_name(&self, context: &ValidationContext<'_>) -> Result<()> {
        let name = context.value.name();
        let Some(text) = name.as_regular().map(str::to_owned) else {
            return Ok(());
        };
        self.check_text(context, &text)
    }

    fn evaluate_value(&self, context: &ValidationContext<'_>) -> Result<()> {
        let value = context.value;
        match value.data() {
            ValueData::Integer(payload) => self.check_integer(*payload),
            ValueData::Boolean(payload) => self.check_boolean(*payload),
            ValueData::Float(payload) => self.check_float(*payload),
            ValueData::Text(payload) => {
                let text = payload.clone();
                self.check_text(context, &text)
            }
            ValueData::Date(payload) => self.check_date(*payload),
            ValueData::DateTime(payload) => self.check_date_time(*payload),
            ValueData::Bytes(payload) => {
                let bytes = payload.clone();
                self.check_bytes(&bytes)
            }
            // No constraint kind applies to times, durations, or regular
            // expression values.
            ValueData::Time(_) | ValueData::TimeDelta(_) | ValueData::Regex(_) => Ok(()),
            ValueData::None => self.check_container(context),
        }
    }

    // -- integers and counts ------------------------------------------------

    /// Checks bound, equality, and divisibility constraints against a
    /// number: either an integer payload or a derived count.
    fn check_count(&self, subject: &str, count: i64) -> Result<()> {
        if let ConstraintKind::Minimum(BoundValue::Integer(bound)) = &self.kind {
            if self.bound_violated(true, &count, bound) {
                return Err(Error::validation(format!(
                    "{subject} must be {} {bound}",
                    self.bound_text(true)
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::Integer(bound)) = &self.kind {
            if self.bound_violated(false, &count, bound) {
                return Err(Error::validation(format!(
                    "{subject} must be {} {bound}",
                    self.bound_text(false)
                )));
            }
        }
        if let ConstraintKind::Equals(EqualsValue::Integer(expected)) = &self.kind {
            if (count == *expected) == self.negated {
                return Err(Error::validation(format!(
                    "{subject} {} {expected}",
                    self.equals_text()
                )));
            }
        }
        if let ConstraintKind::Multiple(MultipleValue::Integer(divisor)) = &self.kind {
            if self.integer_multiple_violated(count, *divisor) {
                return Err(Error::validation(format!(
                    "{subject} {} {divisor}",
                    self.multiple_text()
                )));
            }
        }
        Ok(())
    }

    fn check_integer(&self, value: i64) -> Result<()> {
        if let ConstraintKind::In(InValues::Integers(values)) = &self.kind {
            if values.contains(&value) == self.negated {
                let expected = join_displayed(values);
                return Err(Error::validation(format!(
                    "The value {} {expected}",
                    self.in_text()
                )));
            }
        }
        self.check_count("The value", value)
    }

    // -- booleans -----------------------------------------------------------

    fn check_boolean(&self, value: bool) -> Result<()> {
        if let ConstraintKind::Equals(EqualsValue::Boolean(expected)) = &self.kind {
            if (value == *expected) == self.negated {
                let required = if self.negated { !*expected } else { *expected };
                return Err(Error::validation(format!(
                    "The value must be {required}"
                )));
            }
        }
        Ok(())
    }

    // -- floats -------------------------------------------------------------

    fn check_float(&self, value: f64) -> Result<()> {
        if let ConstraintKind::Minimum(BoundValue::Float(bound)) = &self.kind {
            if value.is_nan() || self.bound_violated(true, &value, bound) {
                return Err(Error::validation(format!(
                    "The value must be {} {bound}",
                    self.bound_text(true)
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::Float(bound)) = &self.kind {
            if value.is_nan() || self.bound_violated(false, &value, bound) {
                return Err(Error::validation(format!(
                    "The value must be {} {bound}",
                    self.bound_text(false)
                )));
            }
        }
        if let ConstraintKind::Equals(EqualsValue::Float(expected)) = &self.kind {
            if floats_equal(value, *expected) == self.negated {
                return Err(Error::validation(format!(
                    "The value {} {expected} (within platform tolerance)",
                    self.equals_text()
                )));
            }
        }
        if let ConstraintKind::In(InValues::Floats(values)) = &self.kind {
            let contained = values.iter().any(|v| (value - v).abs() < f64::EPSILON);
            if contained == self.negated {
                let expected = join_displayed(values);
                return Err(Error::validation(format!(
                    "The value {} {expected} (within platform tolerance)",
                    self.in_text()
                )));
            }
        }
        if let ConstraintKind::Multiple(MultipleValue::Float(divisor)) = &self.kind {
            if self.float_multiple_violated(value, *divisor) {
                return Err(Error::validation(format!(
                    "The value {} {divisor}",
                    self.multiple_text()
                )));
            }
        }
        Ok(())
    }

    // -- texts --------------------------------------------------------------

    fn check_text(&self, context: &ValidationContext<'_>, text: &str) -> Result<()> {
        let case_sensitivity = context.rule.borrow().case_sensitivity();
        if let ConstraintKind::Equals(EqualsValue::Text(expected)) = &self.kind {
            if case_sensitivity.text_eq(text, expected) == self.negated {
                return Err(Error::validation(format!(
                    "The text {} \"{expected}\" ({case_sensitivity})",
                    self.equals_text()
                )));
            }
        }
        if let ConstraintKind::In(InValues::Texts(values)) = &self.kind {
            let contained = values
                .iter()
                .any(|value| case_sensitivity.text_eq(text, value));
            if contained == self.negated {
                let expected = join_quoted(values);
                return Err(Error::validation(format!(
                    "The text {} {expected} ({case_sensitivity})",
                    self.in_text()
                )));
            }
        }
        if let ConstraintKind::Chars(ranges) = &self.kind {
            self.check_chars(context, ranges, text)?;
        }
        if let ConstraintKind::Starts(values) = &self.kind {
            self.check_text_part(values, "start with", text, case_sensitivity, |t, e| {
                t.starts_with(e)
            })?;
        }
        if let ConstraintKind::Ends(values) = &self.kind {
            self.check_text_part(values, "end with", text, case_sensitivity, |t, e| {
                t.ends_with(e)
            })?;
        }
        if let ConstraintKind::Contains(values) = &self.kind {
            self.check_text_part(values, "contain", text, case_sensitivity, |t, e| {
                t.contains(e)
            })?;
        }
        if let ConstraintKind::Matches(pattern) = &self.kind {
            if pattern.is_match(text) == self.negated {
                let message = if self.negated {
                    "The text must not match the excluded pattern"
                } else {
                    "The text does not match the expected pattern"
                };
                return Err(Error::validation(message));
            }
        }
        self.check_count(
            "The number of characters in this text",
            char_count(text),
        )
    }

    /// `chars` is always case-sensitive; positions count Unicode code
    /// points, not bytes.
    fn check_chars(
        &self,
        context: &ValidationContext<'_>,
        ranges: &CharRanges,
        text: &str,
    ) -> Result<()> {
        for (position, character) in text.chars().enumerate() {
            if ranges.contains(character) == self.negated {
                let is_secret =
                    context.value.is_secret() || context.rule.borrow().is_secret();
                let message = if is_secret {
                    format!("The character at position {position} is not allowed in this text")
                } else {
                    format!(
                        "The character '{character}' at position {position} \
                         is not allowed in this text"
                    )
                };
                return Err(Error::validation(message));
            }
        }
        Ok(())
    }

    fn check_text_part(
        &self,
        values: &[String],
        part_text: &str,
        text: &str,
        case_sensitivity: CaseSensitivity,
        part_matches: impl Fn(&str, &str) -> bool,
    ) -> Result<()> {
        let folded_text = case_sensitivity.folded(text);
        let matches = values
            .iter()
            .any(|value| part_matches(&folded_text, &case_sensitivity.folded(value)));
        if matches == self.negated {
            let verb = if self.negated { "must not" } else { "does not" };
            let expected = join_quoted(values);
            return Err(Error::validation(format!(
                "The text {verb} {part_text} {expected} ({case_sensitivity})"
            )));
        }
        Ok(())
    }

    // -- dates and date-times -----------------------------------------------

    fn check_date(&self, value: Date) -> Result<()> {
        if let ConstraintKind::Minimum(BoundValue::Date(bound)) = &self.kind {
            if self.bound_violated(true, &value, bound) {
                return Err(Error::validation(format!(
                    "The date must be {} {bound}",
                    self.bound_text(true)
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::Date(bound)) = &self.kind {
            if self.bound_violated(false, &value, bound) {
                return Err(Error::validation(format!(
                    "The date must be {} {bound}",
                    self.bound_text(false)
                )));
            }
        }
        if let ConstraintKind::Minimum(BoundValue::DateTime(bound)) = &self.kind {
            let as_date_time = DateTime::new(value, Time::midnight());
            if self.bound_violated(true, &as_date_time, bound) {
                return Err(Error::validation(format!(
                    "The date must be {} {}",
                    self.bound_text(true),
                    bound.date()
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::DateTime(bound)) = &self.kind {
            let as_date_time = DateTime::new(value, Time::midnight());
            if self.bound_violated(false, &as_date_time, bound) {
                return Err(Error::validation(format!(
                    "The date must be {} {}",
                    self.bound_text(false),
                    bound.date()
                )));
            }
        }
        Ok(())
    }

    fn check_date_time(&self, value: DateTime) -> Result<()> {
        if let ConstraintKind::Minimum(BoundValue::Date(bound)) = &self.kind {
            let date = value.date();
            if self.bound_violated(true, &date, bound) {
                return Err(Error::validation(format!(
                    "The date in this date-time must be {} {bound}",
                    self.bound_text(true)
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::Date(bound)) = &self.kind {
            let date = value.date();
            if self.bound_violated(false, &date, bound) {
                return Err(Error::validation(format!(
                    "The date in this date-time must be {} {bound}",
                    self.bound_text(false)
                )));
            }
        }
        if let ConstraintKind::Minimum(BoundValue::DateTime(bound)) = &self.kind {
            if self.bound_violated(true, &value, bound) {
                return Err(Error::validation(format!(
                    "The date-time must be {} {bound}",
                    self.bound_text(true)
                )));
            }
        }
        if let ConstraintKind::Maximum(BoundValue::DateTime(bound)) = &self.kind {
            if self.bound_violated(false, &value, bound) {
                return Err(Error::validation(format!(
                    "The date-time must be {} {bound}",
                    self.bound_text(false)
                )));
            }
        }
        Ok(())
    }

    // -- byte sequences -----------------------------------------------------

    fn check_bytes(&self, value: &Bytes) -> Result<()> {
        if let ConstraintKind::Equals(EqualsValue::Bytes(expected)) = &self.kind {
            if (value == expected) == self.negated {
                return Err(Error::validation(format!(
                    "The byte sequence {} \"{}\"",
                    self.equals_text(),
                    expected.to_hex()
                )));
            }
        }
        if let ConstraintKind::In(InValues::ByteSequences(values)) = &self.kind {
            if values.contains(value) == self.negated {
                let expected: Vec<String> = values.iter().map(Bytes::to_hex).collect();
                return Err(Error::validation(format!(
                    "The byte sequence {} {}",
                    self.in_text(),
                    join_quoted(&expected)
                )));
            }
        }
        let length = i64::try_from(value.len()).unwrap_or(i64::MAX);
        self.check_count("The number of bytes", length)
    }

    // -- containers ---------------------------------------------------------

    fn check_container(&self, context: &ValidationContext<'_>) -> Result<()> {
        let value = context.value;
        let value_type = value.value_type();
        if value_type.is_list() {
            if let ConstraintKind::Minimum(BoundValue::Matrix(rows, columns)) = &self.kind {
                return self.check_matrix_bound(value, true, *rows, *columns);
            }
            if let ConstraintKind::Maximum(BoundValue::Matrix(rows, columns)) = &self.kind {
                return self.check_matrix_bound(value, false, *rows, *columns);
            }
            if let ConstraintKind::Equals(EqualsValue::Matrix(rows, columns)) = &self.kind {
                return self.check_matrix_equals(value, *rows, *columns);
            }
            if let ConstraintKind::Multiple(MultipleValue::Matrix(rows, columns)) = &self.kind {
                return self.check_matrix_multiple(value, *rows, *columns);
            }
        }
        let subject = match value_type {
            ValueType::ValueList | ValueType::ValueMatrix => "The number of values in this list",
            ValueType::SectionList => "The number of entries in this section list",
            ValueType::SectionWithNames
            | ValueType::SectionWithTexts
            | ValueType::IntermediateSection
            | ValueType::Document => "The number of entries in this section",
            ValueType::Integer
            | ValueType::Boolean
            | ValueType::Float
            | ValueType::Text
            | ValueType::Date
            | ValueType::Time
            | ValueType::DateTime
            | ValueType::Bytes
            | ValueType::TimeDelta
            | ValueType::Regex => return Ok(()),
        };
        let count = i64::try_from(value.len()).unwrap_or(i64::MAX);
        self.check_count(subject, count)
    }

    fn check_matrix_bound(
        &self,
        value: &ValueRef,
        is_minimum: bool,
        rows: i64,
        columns: i64,
    ) -> Result<()> {
        let row_count = i64::try_from(value.len()).unwrap_or(i64::MAX);
        if self.bound_violated(is_minimum, &row_count, &rows) {
            return Err(Error::validation(format!(
                "The number of rows in this value matrix must be {} {rows}",
                self.bound_text(is_minimum)
            )));
        }
        for row in value.children_snapshot() {
            let column_count = row_length(&row);
            if self.bound_violated(is_minimum, &column_count, &columns) {
                return Err(Error::validation(format!(
                    "The number of columns in this row must be {} {columns}",
                    self.bound_text(is_minimum)
                )));
            }
        }
        Ok(())
    }

    fn check_matrix_equals(&self, value: &ValueRef, rows: i64, columns: i64) -> Result<()> {
        let row_count = i64::try_from(value.len()).unwrap_or(i64::MAX);
        if (row_count == rows) == self.negated {
            return Err(Error::validation(format!(
                "The number of rows {} {rows}",
                self.equals_text()
            )));
        }
        for row in value.children_snapshot() {
            if (row_length(&row) == columns) == self.negated {
                return Err(Error::validation(format!(
                    "The number of columns {} {columns}",
                    self.equals_text()
                )));
            }
        }
        Ok(())
    }

    fn check_matrix_multiple(&self, value: &ValueRef, rows: i64, columns: i64) -> Result<()> {
        let row_count = i64::try_from(value.len()).unwrap_or(i64::MAX);
        if self.integer_multiple_violated(row_count, rows) {
            return Err(Error::validation(format!(
                "The number of rows {} {rows}",
                self.multiple_text()
            )));
        }
        for row in value.children_snapshot() {
            if self.integer_multiple_violated(row_length(&row), columns) {
                return Err(Error::validation(format!(
                    "The number of columns {} {columns}",
                    self.multiple_text()
                )));
            }
        }
        Ok(())
    }

    // -- shared helpers -----------------------------------------------------

    /// Tests an inclusive bound, honouring negation (which flips the check
    /// to a strict bound in the opposite direction).
    fn bound_violated<T: PartialOrd>(&self, is_minimum: bool, value: &T, bound: &T) -> bool {
        let below = if is_minimum {
            value < bound
        } else {
            value > bound
        };
        if self.negated { !below } else { below }
    }

    fn bound_text(&self, is_minimum: bool) -> &'static str {
        if is_minimum {
            if self.negated { "less than" } else { "at least" }
        } else if self.negated {
            "greater than"
        } else {
            "at most"
        }
    }

    fn equals_text(&self) -> &'static str {
        if self.negated {
            "must not be equal to"
        } else {
            "must be equal to"
        }
    }

    fn in_text(&self) -> &'static str {
        if self.negated {
            "must not be one of"
        } else {
            "must be one of"
        }
    }

    fn multiple_text(&self) -> &'static str {
        if self.negated {
            "must not be a multiple of"
        } else {
            "must be a multiple of"
        }
    }

    fn integer_multiple_violated(&self, value: i64, divisor: i64) -> bool {
        let divisor = divisor.unsigned_abs();
        if divisor == 0 {
            // Nothing is a multiple of zero.
            return !self.negated;
        }
        let is_multiple = value.unsigned_abs() % divisor == 0;
        if self.negated { is_multiple } else { !is_multiple }
    }

    fn float_multiple_violated(&self, value: f64, divisor: f64) -> bool {
        if divisor.abs() <= f64::EPSILON {
            return !self.negated;
        }
        let quotient = value / divisor;
        let is_multiple = (quotient - quotient.round()).abs() < f64::EPSILON;
        if self.negated { is_multiple } else { !is_multiple }
    }
}

/// Compares floats the way the `equals` constraint does: NaN equals NaN,
/// infinities compare by sign, finite values within a strict epsilon.
pub(crate) fn floats_equal(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() < f64::EPSILON
}

/// Returns the number of Unicode code points, saturating into `i64`.
fn char_count(text: &str) -> i64 {
    i64::try_from(text.chars().count()).unwrap_or(i64::MAX)
}

/// Returns the column count of one matrix row; a scalar counts as one.
fn row_length(row: &ValueRef) -> i64 {
    if row.value_type().is_list() {
        i64::try_from(row.len()).unwrap_or(i64::MAX)
    } else {
        1
    }
}

/// Joins displayed values with " or " for error messages.
fn join_displayed<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Joins quoted values with " or " for error messages.
fn join_quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(" or ")
}

// ---------------------------------------------------------------------------
// Construction support shared by the compiler and the builder
// ---------------------------------------------------------------------------

/// Checks that a minimum/maximum payload fits the rule type.
pub(crate) fn check_bound_supported(
    rule_type: RuleType,
    bound: &BoundValue,
    constraint_name: &str,
) -> Result<()> {
    let supported = match bound {
        BoundValue::Integer(_) => matches!(
            rule_type,
            RuleType::Integer
                | RuleType::Text
                | RuleType::Bytes
                | RuleType::ValueList
                | RuleType::Section
                | RuleType::SectionList
                | RuleType::SectionWithTexts
        ),
        BoundValue::Float(_) => rule_type == RuleType::Float,
        BoundValue::Date(_) => rule_type == RuleType::Date,
        BoundValue::DateTime(_) => rule_type == RuleType::DateTime,
        BoundValue::Matrix(_, _) => rule_type == RuleType::ValueMatrix,
    };
    check_supported(supported, rule_type, constraint_name)
}

/// Checks that an equals payload fits the rule type.
pub(crate) fn check_equals_supported(
    rule_type: RuleType,
    value: &EqualsValue,
    constraint_name: &str,
) -> Result<()> {
    let supported = match value {
        EqualsValue::Integer(_) => matches!(
            rule_type,
            RuleType::Integer
                | RuleType::Text
                | RuleType::Bytes
                | RuleType::ValueList
                | RuleType::Section
                | RuleType::SectionList
                | RuleType::SectionWithTexts
        ),
        EqualsValue::Boolean(_) => rule_type == RuleType::Boolean,
        EqualsValue::Float(_) => rule_type == RuleType::Float,
        EqualsValue::Text(_) => rule_type == RuleType::Text,
        EqualsValue::Bytes(_) => rule_type == RuleType::Bytes,
        EqualsValue::Matrix(_, _) => rule_type == RuleType::ValueMatrix,
    };
    check_supported(supported, rule_type, constraint_name)
}

/// Checks that an `in` payload fits the rule type.
pub(crate) fn check_in_supported(
    rule_type: RuleType,
    values: &InValues,
    constraint_name: &str,
) -> Result<()> {
    let supported = match values {
        InValues::Integers(_) => rule_type == RuleType::Integer,
        InValues::Floats(_) => rule_type == RuleType::Float,
        InValues::Texts(_) => rule_type == RuleType::Text,
        InValues::ByteSequences(_) => rule_type == RuleType::Bytes,
    };
    check_supported(supported, rule_type, constraint_name)
}

/// Checks that a `multiple` payload fits the rule type.
pub(crate) fn check_multiple_supported(
    rule_type: RuleType,
    divisor: &MultipleValue,
    constraint_name: &str,
) -> Result<()> {
    let supported = match divisor {
        MultipleValue::Integer(_) => matches!(
            rule_type,
            RuleType::Integer
                | RuleType::Text
                | RuleType::Bytes
                | RuleType::ValueList
                | RuleType::Section
                | RuleType::SectionList
                | RuleType::SectionWithTexts
        ),
        MultipleValue::Float(_) => rule_type == RuleType::Float,
        MultipleValue::Matrix(_, _) => rule_type == RuleType::ValueMatrix,
    };
    check_supported(supported, rule_type, constraint_name)
}

/// Checks that a text-only constraint is applied to a text rule.
pub(crate) fn check_text_only(rule_type: RuleType, constraint_name: &str) -> Result<()> {
    check_supported(rule_type == RuleType::Text, rule_type, constraint_name)
}

fn check_supported(supported: bool, rule_type: RuleType, constraint_name: &str) -> Result<()> {
    if supported {
        return Ok(());
    }
    Err(Error::validation(format!(
        "The '{constraint_name}' constraint is not supported for '{}' rules",
        rule_type.to_text()
    )))
}

/// Tests an `in` list for duplicates under the given case sensitivity.
pub(crate) fn in_values_have_duplicates(
    values: &InValues,
    case_sensitivity: CaseSensitivity,
) -> bool {
    match values {
        InValues::Integers(values) => has_duplicate(values, |a, b| a == b),
        InValues::Floats(values) => has_duplicate(values, |a, b| (a - b).abs() < f64::EPSILON),
        InValues::Texts(values) => {
            has_duplicate(values, |a, b| case_sensitivity.text_eq(a, b))
        }
        InValues::ByteSequences(values) => has_duplicate(values, |a, b| a == b),
    }
}

fn has_duplicate<T>(values: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    for (i, a) in values.iter().enumerate() {
        for b in values.iter().skip(i + 1) {
            if eq(a, b) {
                return true;
            }
        }
    }
    false
}

/// Compiles the pattern of a `matches` constraint.
///
/// Compilation happens at rule-definition time, so invalid patterns are
/// definition errors, never validation-time surprises.
pub(crate) fn compile_match_pattern(pattern: &str, multi_line: bool) -> Result<Regex> {
    regex::RegexBuilder::new(pattern)
        .multi_line(multi_line)
        .build()
        .map_err(|error| Error::validation(format!("Invalid regular expression: {error}")))
}
