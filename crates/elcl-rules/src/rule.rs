/// The rule tree: one node per expected configuration value.
///
/// A [`Rule`] describes the type, constraints, and attributes of one node in
/// a validated document. Rules form a tree rooted at an implicit Section
/// rule with an empty path. Children keep insertion order and are keyed by
/// the last name of their target path; the children of an Alternatives rule
/// are keyed by synthetic index names instead.
///
/// Rules are built by the compiler or the builder and treated as immutable
/// once definition validation has run.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::constraint::{Constraint, ConstraintType};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::name::{Name, reserved};
use crate::name_path::NamePath;
use crate::value::{ValueRef, ValueType};
use crate::version_mask::VersionMask;

/// A shared reference to a rule node.
pub type RuleRef = Rc<RefCell<Rule>>;

// ---------------------------------------------------------------------------
// RuleType
// ---------------------------------------------------------------------------

/// The category of value or structure a rule expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Expects an integer value.
    Integer,
    /// Expects a boolean value.
    Boolean,
    /// Expects a float value.
    Float,
    /// Expects a text value.
    Text,
    /// Expects a date value.
    Date,
    /// Expects a time value.
    Time,
    /// Expects a date-time value.
    DateTime,
    /// Expects a byte-sequence value.
    Bytes,
    /// Expects a time-delta value.
    TimeDelta,
    /// Expects a regular-expression value.
    Regex,
    /// Expects any single value.
    Value,
    /// Expects a list of values.
    ValueList,
    /// Expects a list of value lists.
    ValueMatrix,
    /// Expects a section with regular names.
    Section,
    /// Expects a list of sections.
    SectionList,
    /// Expects a section with text names.
    SectionWithTexts,
    /// A container of alternative rules; the first match wins.
    Alternatives,
    /// Accepts the whole subtree without validating it.
    NotValidated,
}

impl RuleType {
    /// Parses a rule type from its text form in a rules document.
    ///
    /// Matching ignores case, spaces, and underscores, so `date_time`,
    /// `DateTime`, and `datetime` are all accepted. `alternatives` is not a
    /// valid spelling: alternatives are declared as section lists.
    pub fn from_text(text: &str) -> Option<Self> {
        let key: String = text
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "float" => Some(Self::Float),
            "text" => Some(Self::Text),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" => Some(Self::DateTime),
            "bytes" => Some(Self::Bytes),
            "timedelta" => Some(Self::TimeDelta),
            "regex" => Some(Self::Regex),
            "value" => Some(Self::Value),
            "valuelist" => Some(Self::ValueList),
            "valuematrix" => Some(Self::ValueMatrix),
            "section" => Some(Self::Section),
            "sectionlist" => Some(Self::SectionList),
            "sectionwithtexts" => Some(Self::SectionWithTexts),
            "notvalidated" => Some(Self::NotValidated),
            _ => None,
        }
    }

    /// Returns the canonical text form of this rule type.
    pub fn to_text(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date_time",
            Self::Bytes => "bytes",
            Self::TimeDelta => "time_delta",
            Self::Regex => "regex",
            Self::Value => "value",
            Self::ValueList => "value_list",
            Self::ValueMatrix => "value_matrix",
            Self::Section => "section",
            Self::SectionList => "section_list",
            Self::SectionWithTexts => "section_with_texts",
            Self::Alternatives => "alternatives",
            Self::NotValidated => "not_validated",
        }
    }

    /// Returns `true` for rule types expecting a single value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Boolean
                | Self::Float
                | Self::Text
                | Self::Date
                | Self::Time
                | Self::DateTime
                | Self::Bytes
                | Self::TimeDelta
                | Self::Regex
                | Self::Value
        )
    }

    /// Returns `true` for rule types that may carry a default value.
    pub fn accepts_defaults(&self) -> bool {
        self.is_scalar() || matches!(self, Self::ValueList | Self::ValueMatrix)
    }

    /// Tests whether this rule type accepts a value of the given kind.
    pub fn matches_value_type(&self, value_type: ValueType) -> bool {
        match self {
            Self::Integer => value_type == ValueType::Integer,
            Self::Boolean => value_type == ValueType::Boolean,
            Self::Float => value_type == ValueType::Float,
            Self::Text => value_type == ValueType::Text,
            Self::Date => value_type == ValueType::Date,
            Self::Time => value_type == ValueType::Time,
            Self::DateTime => value_type == ValueType::DateTime,
            Self::Bytes => value_type == ValueType::Bytes,
            Self::TimeDelta => value_type == ValueType::TimeDelta,
            Self::Regex => value_type == ValueType::Regex,
            Self::Value => value_type.is_scalar(),
            Self::ValueList => value_type == ValueType::ValueList || value_type.is_scalar(),
            Self::ValueMatrix => value_type.is_list() || value_type.is_scalar(),
            Self::Section => matches!(
                value_type,
                ValueType::SectionWithNames
                    | ValueType::IntermediateSection
                    | ValueType::Document
            ),
            Self::SectionList => value_type == ValueType::SectionList,
            Self::SectionWithTexts => value_type == ValueType::SectionWithTexts,
            // Alternatives match through their children, never directly.
            Self::Alternatives => false,
            Self::NotValidated => true,
        }
    }

    /// Returns a human-readable description of the expected value, as used
    /// in error messages.
    pub fn expected_text(&self) -> &'static str {
        match self {
            Self::Integer => "an integer value",
            Self::Boolean => "a boolean value",
            Self::Float => "a floating-point value",
            Self::Text => "a text value",
            Self::Date => "a date value",
            Self::Time => "a time value",
            Self::DateTime => "a date-time value",
            Self::Bytes => "a byte sequence",
            Self::TimeDelta => "a time-delta value",
            Self::Regex => "a regular expression",
            Self::Value => "a value",
            Self::ValueList => "a list of values",
            Self::ValueMatrix => "a value matrix",
            Self::Section => "a section",
            Self::SectionList => "a section list",
            Self::SectionWithTexts => "a section with texts",
            Self::Alternatives => "one of several alternatives",
            Self::NotValidated => "any value",
        }
    }
}

// ---------------------------------------------------------------------------
// CaseSensitivity
// ---------------------------------------------------------------------------

/// Whether text comparisons of a rule are case-sensitive.
///
/// Text constraints default to case-insensitive comparison; the
/// `case_sensitive` attribute switches a rule to exact comparison. The
/// `chars` constraint ignores this setting and is always case-sensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CaseSensitivity {
    /// Compare text after Unicode lowercasing.
    #[default]
    Insensitive,
    /// Compare text exactly.
    Sensitive,
}

impl CaseSensitivity {
    /// Folds a text for comparison under this sensitivity.
    pub fn folded(&self, text: &str) -> String {
        match self {
            Self::Insensitive => text.to_lowercase(),
            Self::Sensitive => text.to_owned(),
        }
    }

    /// Compares two texts under this sensitivity.
    pub fn text_eq(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Insensitive => a.to_lowercase() == b.to_lowercase(),
            Self::Sensitive => a == b,
        }
    }
}

impl std::fmt::Display for CaseSensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insensitive => f.write_str("case-insensitive"),
            Self::Sensitive => f.write_str("case-sensitive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// The co-occurrence relation a dependency definition enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyMode {
    /// Sources configured implies targets configured.
    If,
    /// Sources configured implies targets not configured.
    IfNot,
    /// At least one side configured.
    Or,
    /// At most one side configured: either side alone or neither, never
    /// both.
    Xor,
    /// Both sides configured, or neither.
    Xnor,
    /// Both sides configured.
    And,
}

impl DependencyMode {
    /// Parses a dependency mode from its text form.
    pub fn from_text(text: &str) -> Option<Self> {
        match Name::regular(text).ok()?.as_regular() {
            Some("if") => Some(Self::If),
            Some("if_not") => Some(Self::IfNot),
            Some("or") => Some(Self::Or),
            Some("xor") => Some(Self::Xor),
            Some("xnor") => Some(Self::Xnor),
            Some("and") => Some(Self::And),
            Some(_) | None => None,
        }
    }

    /// Tests whether the configured-state combination satisfies this mode.
    pub fn is_satisfied(&self, has_source: bool, has_target: bool) -> bool {
        match self {
            Self::If => !has_source || has_target,
            Self::IfNot => !has_source || !has_target,
            Self::Or => has_source || has_target,
            Self::Xor => !(has_source && has_target),
            Self::Xnor => has_source == has_target,
            Self::And => has_source && has_target,
        }
    }
}

/// A dependency between configured values within a section.
#[derive(Debug, Clone)]
pub struct DependencyDefinition {
    /// The co-occurrence relation to enforce.
    pub mode: DependencyMode,
    /// Paths whose configured state forms the source side.
    pub sources: Vec<NamePath>,
    /// Paths whose configured state forms the target side.
    pub targets: Vec<NamePath>,
    /// A custom message replacing the mode-specific default.
    pub error_message: Option<String>,
    /// Where this definition was declared.
    pub location: Option<Location>,
}

// ---------------------------------------------------------------------------
// Key definitions
// ---------------------------------------------------------------------------

/// A key-index definition collected from a `vr_key` section.
#[derive(Debug, Clone)]
pub struct KeyDefinition {
    /// The index name; empty for unnamed (validate-only) indexes.
    pub name: Name,
    /// The component paths, each passing through `vr_entry`.
    pub keys: Vec<NamePath>,
    /// Case sensitivity of the collected key texts.
    pub case_sensitivity: CaseSensitivity,
    /// Where this definition was declared.
    pub location: Option<Location>,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// One node of the rule tree.
#[derive(Debug)]
pub struct Rule {
    pub(crate) rule_name_path: NamePath,
    pub(crate) target_name_path: NamePath,
    pub(crate) rule_type: RuleType,
    pub(crate) location: Option<Location>,
    pub(crate) children: Vec<RuleRef>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) version_mask: VersionMask,
    pub(crate) default_value: Option<ValueRef>,
    pub(crate) is_optional: bool,
    pub(crate) is_secret: bool,
    pub(crate) case_sensitivity: CaseSensitivity,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) custom_error: Option<String>,
    pub(crate) key_definitions: Vec<KeyDefinition>,
    pub(crate) dependency_definitions: Vec<DependencyDefinition>,
    pub(crate) parent: Weak<RefCell<Rule>>,
}

impl Rule {
    /// Creates a detached rule of the given type with empty paths.
    pub fn new(rule_type: RuleType) -> Self {
        Self {
            rule_name_path: NamePath::root(),
            target_name_path: NamePath::root(),
            rule_type,
            location: None,
            children: Vec::new(),
            constraints: Vec::new(),
            version_mask: VersionMask::all(),
            default_value: None,
            is_optional: false,
            is_secret: false,
            case_sensitivity: CaseSensitivity::default(),
            title: None,
            description: None,
            custom_error: None,
            key_definitions: Vec::new(),
            dependency_definitions: Vec::new(),
            parent: Weak::new(),
        }
    }

    /// Creates a detached, shared rule of the given type.
    pub fn new_ref(rule_type: RuleType) -> RuleRef {
        Rc::new(RefCell::new(Self::new(rule_type)))
    }

    /// Returns the type of this rule.
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Returns the path of this rule within the rules tree.
    pub fn rule_name_path(&self) -> &NamePath {
        &self.rule_name_path
    }

    /// Returns the path used to match configuration nodes.
    pub fn target_name_path(&self) -> &NamePath {
        &self.target_name_path
    }

    /// Returns the last name of the rule path.
    pub fn rule_name(&self) -> Name {
        self.rule_name_path.last().cloned().unwrap_or_else(Name::empty)
    }

    /// Returns the last name of the target path, falling back to the rule
    /// path when no target path was set.
    pub fn target_name(&self) -> Name {
        self.target_name_path
            .last()
            .or_else(|| self.rule_name_path.last())
            .cloned()
            .unwrap_or_else(Name::empty)
    }

    /// Returns the location this rule was declared at, if known.
    pub fn location(&self) -> Option<Location> {
        self.location.clone()
    }

    /// Returns `true` if this rule has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the children of this rule in insertion order.
    pub fn children(&self) -> &[RuleRef] {
        &self.children
    }

    /// Returns the child with the given name.
    ///
    /// A child matches by its rule name (the synthetic index of an
    /// alternative, or an escaped spelling) or by its target name (the
    /// unescaped spelling used in the validated document).
    pub fn child(&self, name: &Name) -> Option<RuleRef> {
        self.children
            .iter()
            .find(|child| {
                let child_view = child.borrow();
                child_view.rule_name() == *name || child_view.target_name() == *name
            })
            .cloned()
    }

    /// Returns the child with the given regular name.
    pub fn child_named(&self, word: &str) -> Option<RuleRef> {
        self.child(&Name::regular_lossy(word))
    }

    /// Tests whether a child with the given lookup key exists.
    pub fn has_child(&self, name: &Name) -> bool {
        self.child(name).is_some()
    }

    /// Returns the descendant rule at the given path.
    pub fn descendant(&self, path: &NamePath) -> Option<RuleRef> {
        let mut iter = path.iter();
        let first = iter.next()?;
        let mut current = self.child(first)?;
        for name in iter {
            let next = current.borrow().child(name)?;
            current = next;
        }
        Some(current)
    }

    /// Returns the parent rule, if this rule is attached to a tree.
    pub fn parent(&self) -> Option<RuleRef> {
        self.parent.upgrade()
    }

    /// Returns the name-constraint rule (`vr_name` child), if any.
    pub fn name_constraints(&self) -> Option<RuleRef> {
        self.child_named(reserved::NAME)
    }

    /// Tests whether this rule has name constraints.
    pub fn has_name_constraints(&self) -> bool {
        self.name_constraints().is_some()
    }

    // -- constraints --------------------------------------------------------

    /// Returns the constraints of this rule in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Tests whether a constraint of the given type is attached, positive
    /// or negated.
    pub fn has_constraint(&self, constraint_type: ConstraintType) -> bool {
        self.constraint(constraint_type).is_some()
    }

    /// Returns the constraint of the given type, if attached.
    pub fn constraint(&self, constraint_type: ConstraintType) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|constraint| constraint.constraint_type() == constraint_type)
    }

    /// Tests whether a constraint with the given user-facing name (including
    /// any `not_` prefix) is attached.
    pub fn has_constraint_named(&self, name: &str) -> bool {
        self.constraints.iter().any(|constraint| constraint.name() == name)
    }

    /// Returns a mutable reference to the constraint with the given
    /// user-facing name.
    pub(crate) fn constraint_named_mut(&mut self, name: &str) -> Option<&mut Constraint> {
        self.constraints
            .iter_mut()
            .find(|constraint| constraint.name() == name)
    }

    /// Adds a constraint, replacing an existing one of the same type in
    /// place so that its declaration position is preserved.
    pub(crate) fn add_or_overwrite_constraint(&mut self, constraint: Constraint) {
        let constraint_type = constraint.constraint_type();
        for slot in &mut self.constraints {
            if slot.constraint_type() == constraint_type {
                *slot = constraint;
                return;
            }
        }
        self.constraints.push(constraint);
    }

    // -- attributes ---------------------------------------------------------

    /// Returns the version mask restricting when this rule is active.
    pub fn version_mask(&self) -> &VersionMask {
        &self.version_mask
    }

    /// Narrows the version mask by intersection.
    pub fn limit_version_mask(&mut self, mask: &VersionMask) {
        self.version_mask = self.version_mask.intersected(mask);
    }

    /// Returns the default value subtree, if one is set.
    pub fn default_value(&self) -> Option<ValueRef> {
        self.default_value.clone()
    }

    /// Tests whether this rule carries a default value.
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    /// Returns `true` if a missing value is acceptable for this rule.
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// Returns `true` if matched values are marked secret.
    pub fn is_secret(&self) -> bool {
        self.is_secret
    }

    /// Returns the case sensitivity used by text constraints of this rule.
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }

    /// Returns the title of this rule, if set.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the description of this rule, if set.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the custom error message of this rule, if set.
    pub fn custom_error(&self) -> Option<&str> {
        self.custom_error.as_deref()
    }

    /// Returns the key definitions attached to this rule.
    pub fn key_definitions(&self) -> &[KeyDefinition] {
        &self.key_definitions
    }

    /// Tests whether key definitions are attached.
    pub fn has_key_definitions(&self) -> bool {
        !self.key_definitions.is_empty()
    }

    /// Returns the dependency definitions attached to this rule.
    pub fn dependency_definitions(&self) -> &[DependencyDefinition] {
        &self.dependency_definitions
    }

    /// Tests whether dependency definitions are attached.
    pub fn has_dependency_definitions(&self) -> bool {
        !self.dependency_definitions.is_empty()
    }
}

/// Attaches a child rule to a parent, linking the parent pointer.
pub(crate) fn add_child_rule(parent: &RuleRef, child: &RuleRef) {
    child.borrow_mut().parent = Rc::downgrade(parent);
    parent.borrow_mut().children.push(child.clone());
}

/// Attaches a constraint to a rule, enforcing the one-slot-per-type rule.
///
/// Two constraints of the same origin (both from a template, or both from
/// the use site) may not share a slot; a use-site constraint overwrites a
/// template-imported one in place.
pub(crate) fn attach_constraint(rule: &RuleRef, constraint: Constraint) -> Result<()> {
    {
        let rule_view = rule.borrow();
        if let Some(existing) = rule_view.constraint(constraint.constraint_type()) {
            if existing.is_from_template() == constraint.is_from_template() {
                if existing.name() != constraint.name() {
                    return Err(Error::validation(format!(
                        "Constraint '{}' for type '{}' is already defined. \
                         You must not mix positive and negative constraints for the same type",
                        constraint.name(),
                        constraint.constraint_type().base_name()
                    )));
                }
                return Err(Error::validation(format!(
                    "Constraint '{}' is already defined",
                    constraint.name()
                )));
            }
        }
    }
    rule.borrow_mut().add_or_overwrite_constraint(constraint);
    Ok(())
}
