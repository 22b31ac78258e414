/// The programmatic rules builder.
///
/// [`RulesBuilder`] produces a rule model without a rules document: each
/// registration names a rule path as text, a rule type, and a list of
/// [`Attribute`] values. Attributes are applied eagerly and type-checked
/// against the rule type exactly like the document compiler's handlers, so
/// a misuse fails at the registration call, not at `take_rules()`.
///
/// `take_rules()` runs definition validation, hands out the finished rule
/// set, and resets the builder for reuse.
use crate::constraint::{
    BoundValue, Constraint, ConstraintKind, ConstraintType, EqualsValue, InValues, MultipleValue,
    check_bound_supported, check_equals_supported, check_in_supported, check_multiple_supported,
    check_text_only, compile_match_pattern, in_values_have_duplicates,
};
use crate::char_ranges::CharRanges;
use crate::error::{Error, Result};
use crate::from_document::RulesFromDocument;
use crate::name_path::NamePath;
use crate::rule::{CaseSensitivity, Rule, RuleRef, RuleType, attach_constraint};
use crate::rules::Rules;
use crate::types::{Bytes, Date, DateTime};
use crate::value::ValueRef;
use crate::version_mask::VersionMask;

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// The payload of one builder attribute.
#[derive(Debug, Clone)]
enum AttributeKind {
    Title(String),
    Description(String),
    CustomError(String),
    Optional,
    Secret,
    CaseSensitive(bool),
    Default(ValueRef),
    Versions(Vec<i64>),
    MinimumVersion(i64),
    MaximumVersion(i64),
    Minimum(BoundValue),
    Maximum(BoundValue),
    Equals(EqualsValue),
    In(InValues),
    Multiple(MultipleValue),
    Chars(Vec<String>),
    Starts(Vec<String>),
    Ends(Vec<String>),
    Contains(Vec<String>),
    Matches { pattern: String, multi_line: bool },
    Key(Vec<String>),
}

/// One attribute of a rule registration: a constraint, a version limit, or
/// a plain rule attribute.
///
/// Constraint attributes and version limits may be [`negated`]; constraint
/// attributes may carry a per-constraint error message via [`with_error`].
///
/// [`negated`]: Attribute::negated
/// [`with_error`]: Attribute::with_error
#[derive(Debug, Clone)]
pub struct Attribute {
    kind: AttributeKind,
    negated: bool,
    custom_error: Option<String>,
}

fn texts(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

impl Attribute {
    fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            negated: false,
            custom_error: None,
        }
    }

    /// Sets the rule title.
    pub fn title(title: impl Into<String>) -> Self {
        Self::new(AttributeKind::Title(title.into()))
    }

    /// Sets the rule description.
    pub fn description(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::Description(description.into()))
    }

    /// Sets the rule's custom error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AttributeKind::CustomError(message.into()))
    }

    /// Marks the rule as optional.
    pub fn optional() -> Self {
        Self::new(AttributeKind::Optional)
    }

    /// Marks the rule as secret.
    pub fn secret() -> Self {
        Self::new(AttributeKind::Secret)
    }

    /// Sets the case sensitivity of text comparisons.
    pub fn case_sensitive(enabled: bool) -> Self {
        Self::new(AttributeKind::CaseSensitive(enabled))
    }

    /// Sets the default value, inserted when the value is missing.
    pub fn default_value(value: ValueRef) -> Self {
        Self::new(AttributeKind::Default(value))
    }

    /// Restricts the rule to an explicit list of document versions.
    pub fn versions(versions: Vec<i64>) -> Self {
        Self::new(AttributeKind::Versions(versions))
    }

    /// Restricts the rule to versions at or above the given one.
    pub fn minimum_version(version: i64) -> Self {
        Self::new(AttributeKind::MinimumVersion(version))
    }

    /// Restricts the rule to versions at or below the given one.
    pub fn maximum_version(version: i64) -> Self {
        Self::new(AttributeKind::MaximumVersion(version))
    }

    /// Adds an integer (or length/count) minimum.
    pub fn minimum(value: i64) -> Self {
        Self::new(AttributeKind::Minimum(BoundValue::Integer(value)))
    }

    /// Adds a float minimum.
    pub fn minimum_float(value: f64) -> Self {
        Self::new(AttributeKind::Minimum(BoundValue::Float(value)))
    }

    /// Adds a date minimum.
    pub fn minimum_date(value: Date) -> Self {
        Self::new(AttributeKind::Minimum(BoundValue::Date(value)))
    }

    /// Adds a date-time minimum.
    pub fn minimum_date_time(value: DateTime) -> Self {
        Self::new(AttributeKind::Minimum(BoundValue::DateTime(value)))
    }

    /// Adds a row/column minimum for a value matrix.
    pub fn minimum_matrix(rows: i64, columns: i64) -> Self {
        Self::new(AttributeKind::Minimum(BoundValue::Matrix(rows, columns)))
    }

    /// Adds an integer (or length/count) maximum.
    pub fn maximum(value: i64) -> Self {
        Self::new(AttributeKind::Maximum(BoundValue::Integer(value)))
    }

    /// Adds a float maximum.
    pub fn maximum_float(value: f64) -> Self {
        Self::new(AttributeKind::Maximum(BoundValue::Float(value)))
    }

    /// Adds a date maximum.
    pub fn maximum_date(value: Date) -> Self {
        Self::new(AttributeKind::Maximum(BoundValue::Date(value)))
    }

    /// Adds a date-time maximum.
    pub fn maximum_date_time(value: DateTime) -> Self {
        Self::new(AttributeKind::Maximum(BoundValue::DateTime(value)))
    }

    /// Adds a row/column maximum for a value matrix.
    pub fn maximum_matrix(rows: i64, columns: i64) -> Self {
        Self::new(AttributeKind::Maximum(BoundValue::Matrix(rows, columns)))
    }

    /// Requires an exact integer value (or length/count).
    pub fn equals(value: i64) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Integer(value)))
    }

    /// Requires an exact boolean value.
    pub fn equals_boolean(value: bool) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Boolean(value)))
    }

    /// Requires a float value within platform tolerance.
    pub fn equals_float(value: f64) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Float(value)))
    }

    /// Requires an exact text value under the rule's case sensitivity.
    pub fn equals_text(value: impl Into<String>) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Text(value.into())))
    }

    /// Requires an exact byte sequence.
    pub fn equals_bytes(value: Bytes) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Bytes(value)))
    }

    /// Requires exact row and column counts for a value matrix.
    pub fn equals_matrix(rows: i64, columns: i64) -> Self {
        Self::new(AttributeKind::Equals(EqualsValue::Matrix(rows, columns)))
    }

    /// Requires membership in an integer list.
    pub fn in_integers(values: Vec<i64>) -> Self {
        Self::new(AttributeKind::In(InValues::Integers(values)))
    }

    /// Requires membership in a float list.
    pub fn in_floats(values: Vec<f64>) -> Self {
        Self::new(AttributeKind::In(InValues::Floats(values)))
    }

    /// Requires membership in a text list.
    pub fn in_texts(values: &[&str]) -> Self {
        Self::new(AttributeKind::In(InValues::Texts(texts(values))))
    }

    /// Requires membership in a byte-sequence list.
    pub fn in_bytes(values: Vec<Bytes>) -> Self {
        Self::new(AttributeKind::In(InValues::ByteSequences(values)))
    }

    /// Requires the value (or count) to be a multiple of the divisor.
    pub fn multiple(divisor: i64) -> Self {
        Self::new(AttributeKind::Multiple(MultipleValue::Integer(divisor)))
    }

    /// Requires a float value to be a multiple of the divisor.
    pub fn multiple_float(divisor: f64) -> Self {
        Self::new(AttributeKind::Multiple(MultipleValue::Float(divisor)))
    }

    /// Requires matrix row and column counts to be multiples.
    pub fn multiple_matrix(rows: i64, columns: i64) -> Self {
        Self::new(AttributeKind::Multiple(MultipleValue::Matrix(rows, columns)))
    }

    /// Restricts text to a character set (`(a-z)`, `[abc]`, or a named set).
    pub fn chars(expressions: &[&str]) -> Self {
        Self::new(AttributeKind::Chars(texts(expressions)))
    }

    /// Requires text to start with one of the given prefixes.
    pub fn starts(values: &[&str]) -> Self {
        Self::new(AttributeKind::Starts(texts(values)))
    }

    /// Requires text to end with one of the given suffixes.
    pub fn ends(values: &[&str]) -> Self {
        Self::new(AttributeKind::Ends(texts(values)))
    }

    /// Requires text to contain one of the given fragments.
    pub fn contains(values: &[&str]) -> Self {
        Self::new(AttributeKind::Contains(texts(values)))
    }

    /// Requires text to match a regular expression.
    pub fn matches(pattern: impl Into<String>, multi_line: bool) -> Self {
        Self::new(AttributeKind::Matches {
            pattern: pattern.into(),
            multi_line,
        })
    }

    /// Requires the value to refer to one of the given key indexes.
    pub fn key(references: &[&str]) -> Self {
        Self::new(AttributeKind::Key(texts(references)))
    }

    /// Negates a constraint or version limit.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    /// Attaches a custom error message to a constraint.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.custom_error = Some(message.into());
        self
    }

    /// Returns the base spelling of this attribute in a rules document.
    fn base_name(&self) -> &'static str {
        match &self.kind {
            AttributeKind::Title(_) => "title",
            AttributeKind::Description(_) => "description",
            AttributeKind::CustomError(_) => "error",
            AttributeKind::Optional => "is_optional",
            AttributeKind::Secret => "is_secret",
            AttributeKind::CaseSensitive(_) => "case_sensitive",
            AttributeKind::Default(_) => "default",
            AttributeKind::Versions(_) => "version",
            AttributeKind::MinimumVersion(_) => "minimum_version",
            AttributeKind::MaximumVersion(_) => "maximum_version",
            AttributeKind::Minimum(_) => ConstraintType::Minimum.base_name(),
            AttributeKind::Maximum(_) => ConstraintType::Maximum.base_name(),
            AttributeKind::Equals(_) => ConstraintType::Equals.base_name(),
            AttributeKind::In(_) => ConstraintType::In.base_name(),
            AttributeKind::Multiple(_) => ConstraintType::Multiple.base_name(),
            AttributeKind::Chars(_) => ConstraintType::Chars.base_name(),
            AttributeKind::Starts(_) => ConstraintType::Starts.base_name(),
            AttributeKind::Ends(_) => ConstraintType::Ends.base_name(),
            AttributeKind::Contains(_) => ConstraintType::Contains.base_name(),
            AttributeKind::Matches { .. } => ConstraintType::Matches.base_name(),
            AttributeKind::Key(_) => ConstraintType::Key.base_name(),
        }
    }

    fn accepts_negation(&self) -> bool {
        !matches!(
            &self.kind,
            AttributeKind::Title(_)
                | AttributeKind::Description(_)
                | AttributeKind::CustomError(_)
                | AttributeKind::Optional
                | AttributeKind::Secret
                | AttributeKind::CaseSensitive(_)
                | AttributeKind::Default(_)
        )
    }

    fn accepts_custom_error(&self) -> bool {
        matches!(
            &self.kind,
            AttributeKind::Minimum(_)
                | AttributeKind::Maximum(_)
                | AttributeKind::Equals(_)
                | AttributeKind::In(_)
                | AttributeKind::Multiple(_)
                | AttributeKind::Chars(_)
                | AttributeKind::Starts(_)
                | AttributeKind::Ends(_)
                | AttributeKind::Contains(_)
                | AttributeKind::Matches { .. }
                | AttributeKind::Key(_)
        )
    }

    /// Applies this attribute to a freshly created rule.
    fn apply(self, rule: &RuleRef) -> Result<()> {
        if self.negated && !self.accepts_negation() {
            return Err(Error::validation(format!(
                "'{}' does not accept 'not_' prefixes",
                self.base_name()
            )));
        }
        if self.custom_error.is_some() && !self.accepts_custom_error() {
            return Err(Error::validation(format!(
                "'{}' does not accept '_error' suffixes",
                self.base_name()
            )));
        }
        let rule_type = rule.borrow().rule_type();
        let negated = self.negated;
        let custom_error = self.custom_error.clone();
        let base_name = self.base_name();
        let kind = match self.kind {
            AttributeKind::Title(title) => {
                rule.borrow_mut().title = Some(title);
                return Ok(());
            }
            AttributeKind::Description(description) => {
                rule.borrow_mut().description = Some(description);
                return Ok(());
            }
            AttributeKind::CustomError(message) => {
                rule.borrow_mut().custom_error = Some(message);
                return Ok(());
            }
            AttributeKind::Optional => {
                rule.borrow_mut().is_optional = true;
                return Ok(());
            }
            AttributeKind::Secret => {
                rule.borrow_mut().is_secret = true;
                return Ok(());
            }
            AttributeKind::CaseSensitive(enabled) => {
                rule.borrow_mut().case_sensitivity = if enabled {
                    CaseSensitivity::Sensitive
                } else {
                    CaseSensitivity::Insensitive
                };
                return Ok(());
            }
            AttributeKind::Default(value) => {
                if !rule_type.accepts_defaults() {
                    return Err(Error::validation(format!(
                        "A default value cannot be used for '{}' node rules",
                        rule_type.to_text()
                    )));
                }
                if !rule_type.matches_value_type(value.value_type()) {
                    return Err(Error::validation(format!(
                        "The 'default' value must be {}",
                        rule_type.expected_text()
                    )));
                }
                rule.borrow_mut().default_value = Some(value.deep_copy());
                return Ok(());
            }
            AttributeKind::Versions(versions) => {
                let mask = versions_mask(&versions)?;
                apply_version_mask(rule, mask, negated);
                return Ok(());
            }
            AttributeKind::MinimumVersion(version) => {
                let version = non_negative_version(version, "minimum_version")?;
                apply_version_mask(rule, VersionMask::from_range(version, None), negated);
                return Ok(());
            }
            AttributeKind::MaximumVersion(version) => {
                let version = non_negative_version(version, "maximum_version")?;
                apply_version_mask(rule, VersionMask::from_range(0, Some(version)), negated);
                return Ok(());
            }
            AttributeKind::Minimum(bound) => {
                check_bound_supported(rule_type, &bound, base_name)?;
                ConstraintKind::Minimum(bound)
            }
            AttributeKind::Maximum(bound) => {
                check_bound_supported(rule_type, &bound, base_name)?;
                ConstraintKind::Maximum(bound)
            }
            AttributeKind::Equals(value) => {
                check_equals_supported(rule_type, &value, base_name)?;
                ConstraintKind::Equals(value)
            }
            AttributeKind::In(values) => {
                check_in_supported(rule_type, &values, base_name)?;
                let case_sensitivity = rule.borrow().case_sensitivity();
                if in_values_have_duplicates(&values, case_sensitivity) {
                    return Err(Error::validation(format!(
                        "The '{base_name}' list must not contain duplicate values"
                    )));
                }
                ConstraintKind::In(values)
            }
            AttributeKind::Multiple(divisor) => {
                check_multiple_supported(rule_type, &divisor, base_name)?;
                ConstraintKind::Multiple(divisor)
            }
            AttributeKind::Chars(expressions) => {
                check_text_only(rule_type, base_name)?;
                ConstraintKind::Chars(CharRanges::parse_expressions(&expressions)?)
            }
            AttributeKind::Starts(values) => {
                check_text_only(rule_type, base_name)?;
                ConstraintKind::Starts(values)
            }
            AttributeKind::Ends(values) => {
                check_text_only(rule_type, base_name)?;
                ConstraintKind::Ends(values)
            }
            AttributeKind::Contains(values) => {
                check_text_only(rule_type, base_name)?;
                ConstraintKind::Contains(values)
            }
            AttributeKind::Matches {
                pattern,
                multi_line,
            } => {
                check_text_only(rule_type, base_name)?;
                if pattern.is_empty() {
                    return Err(Error::validation(
                        "The regular expression in a 'matches' constraint cannot be empty",
                    ));
                }
                ConstraintKind::Matches(compile_match_pattern(&pattern, multi_line)?)
            }
            AttributeKind::Key(references) => {
                let mut parsed = Vec::with_capacity(references.len());
                for reference in &references {
                    parsed.push(NamePath::from_text(reference).map_err(|error| {
                        Error::validation(format!(
                            "Invalid name-path for key reference: {}",
                            error.message()
                        ))
                    })?);
                }
                ConstraintKind::Key(parsed)
            }
        };
        let spelled_name = if negated {
            format!("not_{base_name}")
        } else {
            base_name.to_owned()
        };
        let mut constraint = Constraint::new(kind, spelled_name, negated);
        if let Some(message) = custom_error {
            constraint.set_custom_error(message);
        }
        attach_constraint(rule, constraint)
    }
}

fn versions_mask(versions: &[i64]) -> Result<VersionMask> {
    if versions.is_empty() {
        return Err(Error::validation("The 'version' value must be one or more integers"));
    }
    let mut unsigned = Vec::with_capacity(versions.len());
    for version in versions {
        let Ok(value) = u64::try_from(*version) else {
            return Err(Error::validation(
                "The values in 'version' must be non-negative integers",
            ));
        };
        if unsigned.contains(&value) {
            return Err(Error::validation("The values in 'version' must be unique"));
        }
        unsigned.push(value);
    }
    Ok(VersionMask::from_versions(&unsigned))
}

fn non_negative_version(version: i64, entry: &str) -> Result<u64> {
    u64::try_from(version)
        .map_err(|_| Error::validation(format!("The '{entry}' value must be non-negative")))
}

fn apply_version_mask(rule: &RuleRef, mask: VersionMask, negated: bool) {
    let mask = if negated { !mask } else { mask };
    rule.borrow_mut().limit_version_mask(&mask);
}

// ---------------------------------------------------------------------------
// RulesBuilder
// ---------------------------------------------------------------------------

/// Builds validation rules programmatically.
#[derive(Debug, Default)]
pub struct RulesBuilder {
    rules: Rules,
}

impl RulesBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            rules: Rules::new(),
        }
    }

    /// Reads rules from a parsed rules document and validates them.
    pub fn read_from_document(&mut self, document: &ValueRef) -> Result<()> {
        RulesFromDocument::new(&self.rules, document).read()?;
        self.rules.validate_definition()
    }

    /// Registers a rule at the given path (e.g. `"server.port"`).
    ///
    /// # Errors
    ///
    /// Returns a validation error when the path is malformed or already
    /// taken, the parent rule is missing, or an attribute does not fit the
    /// rule type.
    pub fn add_rule(
        &mut self,
        path: &str,
        rule_type: RuleType,
        attributes: Vec<Attribute>,
    ) -> Result<()> {
        let rule = self.prepare_rule(path, rule_type, attributes)?;
        self.rules.add_rule(&rule)
    }

    /// Registers a rule as one alternative at the given path.
    ///
    /// The first registration creates the enclosing Alternatives rule;
    /// later registrations append to it.
    pub fn add_alternative(
        &mut self,
        path: &str,
        rule_type: RuleType,
        attributes: Vec<Attribute>,
    ) -> Result<()> {
        let rule = self.prepare_rule(path, rule_type, attributes)?;
        self.rules.add_alternative_rule(&rule)
    }

    fn prepare_rule(
        &mut self,
        path: &str,
        rule_type: RuleType,
        attributes: Vec<Attribute>,
    ) -> Result<RuleRef> {
        if rule_type == RuleType::Alternatives {
            return Err(Error::validation(
                "Register each alternative separately instead of an 'alternatives' rule",
            ));
        }
        let name_path = NamePath::from_text(path)?;
        if name_path.contains_text() || name_path.contains_index() {
            return Err(Error::validation(
                "Text names or indexes are not allowed in a name-path for validation rules",
            ));
        }
        let rule = Rule::new_ref(rule_type);
        {
            let mut new_rule = rule.borrow_mut();
            new_rule.rule_name_path = name_path.clone();
            new_rule.target_name_path = name_path;
        }
        for attribute in attributes {
            attribute.apply(&rule)?;
        }
        Ok(rule)
    }

    /// Discards the rules built so far.
    pub fn reset(&mut self) {
        self.rules = Rules::new();
    }

    /// Validates the definition and hands out the finished rule set,
    /// resetting the builder.
    pub fn take_rules(&mut self) -> Result<Rules> {
        self.rules.validate_definition()?;
        Ok(std::mem::take(&mut self.rules))
    }
}

#[cfg(test)]
mod tests;
