/// The parsed configuration value tree consumed by the engine.
///
/// A [`Value`] node carries a name, a [`ValueType`], an optional scalar
/// payload, a source location, and an ordered child list. Nodes are
/// reference counted with weak parent links, so ownership points strictly
/// downward. The fields the validator owns (the validation-rule
/// annotation, the default-value flag, and the secret flag) use interior
/// mutability; everything else is fixed once a node is built.
///
/// The engine does not parse configuration text. Constructors for every
/// value kind allow a parser front end (and the tests in this crate) to
/// assemble documents programmatically.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::location::Location;
use crate::name::Name;
use crate::name_path::NamePath;
use crate::rule::RuleRef;
use crate::types::{Bytes, Date, DateTime, RegexSource, Time, TimeDelta};

/// A shared reference to a value node.
pub type ValueRef = Rc<Value>;

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// The kind of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A signed 64-bit integer.
    Integer,
    /// A boolean.
    Boolean,
    /// A 64-bit floating-point number.
    Float,
    /// A text string.
    Text,
    /// A calendar date.
    Date,
    /// A time of day.
    Time,
    /// A combined date and time.
    DateTime,
    /// A byte sequence.
    Bytes,
    /// A duration.
    TimeDelta,
    /// An uncompiled regular expression.
    Regex,
    /// An ordered list of values.
    ValueList,
    /// A list of value lists.
    ValueMatrix,
    /// An ancestor section that was never explicitly declared.
    IntermediateSection,
    /// A section whose children carry regular names.
    SectionWithNames,
    /// A section whose children carry text names.
    SectionWithTexts,
    /// An ordered list of sections.
    SectionList,
    /// The document root.
    Document,
}

impl ValueType {
    /// Returns `true` for single-value kinds.
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
        )
    }

    /// Returns `true` for value lists and matrices.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::ValueList | Self::ValueMatrix)
    }

    /// Returns `true` for kinds whose children are addressed by name.
    pub fn is_map(&self) -> bool {
        matches!(
            self,
            Self::IntermediateSection
                | Self::SectionWithNames
                | Self::SectionWithTexts
                | Self::Document
        )
    }

    /// Returns `true` for sections, section lists, and the document root:
    /// everything that structures a document rather than holding a value.
    pub fn is_structural(&self) -> bool {
        self.is_map() || *self == Self::SectionList
    }

    /// Returns a human-readable description with its article, as used in
    /// error messages ("an integer value", "a section list").
    pub fn description(&self) -> &'static str {
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
            Self::ValueList => "a list of values",
            Self::ValueMatrix => "a value matrix",
            Self::IntermediateSection | Self::SectionWithNames => "a section",
            Self::SectionWithTexts => "a section with texts",
            Self::SectionList => "a section list",
            Self::Document => "a document",
        }
    }
}

// ---------------------------------------------------------------------------
// ValueData
// ---------------------------------------------------------------------------

/// The scalar payload of a value node. Structural nodes carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    /// No payload (structural kinds).
    None,
    /// An integer payload.
    Integer(i64),
    /// A boolean payload.
    Boolean(bool),
    /// A float payload.
    Float(f64),
    /// A text payload.
    Text(String),
    /// A date payload.
    Date(Date),
    /// A time payload.
    Time(Time),
    /// A date-time payload.
    DateTime(DateTime),
    /// A byte-sequence payload.
    Bytes(Bytes),
    /// A duration payload.
    TimeDelta(TimeDelta),
    /// A regular-expression payload.
    Regex(RegexSource),
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// One node of a parsed configuration document.
#[derive(Debug)]
pub struct Value {
    value_type: ValueType,
    data: ValueData,
    name: RefCell<Name>,
    location: RefCell<Option<Location>>,
    children: RefCell<Vec<ValueRef>>,
    parent: RefCell<Weak<Value>>,
    validation_rule: RefCell<Option<RuleRef>>,
    is_default_value: Cell<bool>,
    is_secret: Cell<bool>,
}

impl Value {
    fn build(value_type: ValueType, data: ValueData) -> ValueRef {
        Rc::new(Self {
            value_type,
            data,
            name: RefCell::new(Name::empty()),
            location: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            validation_rule: RefCell::new(None),
            is_default_value: Cell::new(false),
            is_secret: Cell::new(false),
        })
    }

    /// Creates a document root.
    pub fn document() -> ValueRef {
        Self::build(ValueType::Document, ValueData::None)
    }

    /// Creates an integer value.
    pub fn integer(value: i64) -> ValueRef {
        Self::build(ValueType::Integer, ValueData::Integer(value))
    }

    /// Creates a boolean value.
    pub fn boolean(value: bool) -> ValueRef {
        Self::build(ValueType::Boolean, ValueData::Boolean(value))
    }

    /// Creates a float value.
    pub fn float(value: f64) -> ValueRef {
        Self::build(ValueType::Float, ValueData::Float(value))
    }

    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> ValueRef {
        Self::build(ValueType::Text, ValueData::Text(value.into()))
    }

    /// Creates a date value.
    pub fn date(value: Date) -> ValueRef {
        Self::build(ValueType::Date, ValueData::Date(value))
    }

    /// Creates a time value.
    pub fn time(value: Time) -> ValueRef {
        Self::build(ValueType::Time, ValueData::Time(value))
    }

    /// Creates a date-time value.
    pub fn date_time(value: DateTime) -> ValueRef {
        Self::build(ValueType::DateTime, ValueData::DateTime(value))
    }

    /// Creates a byte-sequence value.
    pub fn bytes(value: Bytes) -> ValueRef {
        Self::build(ValueType::Bytes, ValueData::Bytes(value))
    }

    /// Creates a time-delta value.
    pub fn time_delta(value: TimeDelta) -> ValueRef {
        Self::build(ValueType::TimeDelta, ValueData::TimeDelta(value))
    }

    /// Creates a regular-expression value.
    pub fn regex(value: RegexSource) -> ValueRef {
        Self::build(ValueType::Regex, ValueData::Regex(value))
    }

    /// Creates an empty value list.
    pub fn value_list() -> ValueRef {
        Self::build(ValueType::ValueList, ValueData::None)
    }

    /// Creates an empty value matrix (a list of value lists).
    pub fn value_matrix() -> ValueRef {
        Self::build(ValueType::ValueMatrix, ValueData::None)
    }

    /// Creates an empty section with regular names.
    pub fn section_with_names() -> ValueRef {
        Self::build(ValueType::SectionWithNames, ValueData::None)
    }

    /// Creates an empty section with text names.
    pub fn section_with_texts() -> ValueRef {
        Self::build(ValueType::SectionWithTexts, ValueData::None)
    }

    /// Creates an intermediate section.
    pub fn intermediate_section() -> ValueRef {
        Self::build(ValueType::IntermediateSection, ValueData::None)
    }

    /// Creates an empty section list.
    pub fn section_list() -> ValueRef {
        Self::build(ValueType::SectionList, ValueData::None)
    }

    // -- structure ----------------------------------------------------------

    /// Returns the kind of this value.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the scalar payload of this value.
    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Returns the name of this value.
    pub fn name(&self) -> Name {
        self.name.borrow().clone()
    }

    /// Sets the name of this value.
    pub fn set_name(&self, name: Name) {
        *self.name.borrow_mut() = name;
    }

    /// Returns the source location of this value, if known.
    pub fn location(&self) -> Option<Location> {
        self.location.borrow().clone()
    }

    /// Sets the source location of this value.
    pub fn set_location(&self, location: Location) {
        *self.location.borrow_mut() = Some(location);
    }

    /// Returns the parent of this value, if it has one.
    pub fn parent(&self) -> Option<ValueRef> {
        self.parent.borrow().upgrade()
    }

    /// Returns `true` if this is a document root.
    pub fn is_document(&self) -> bool {
        self.value_type == ValueType::Document
    }

    /// Returns `true` if this is a section with regular names.
    pub fn is_section_with_names(&self) -> bool {
        self.value_type == ValueType::SectionWithNames
    }

    /// Returns the number of children.
    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    /// Returns `true` if this value has no children.
    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// Adds a child value, linking its parent pointer.
    ///
    /// Children of lists and section lists that still carry the empty name
    /// are assigned their position as an index name.
    pub fn add_child(self: &Rc<Self>, child: ValueRef) {
        *child.parent.borrow_mut() = Rc::downgrade(self);
        let needs_index = matches!(
            self.value_type,
            ValueType::ValueList | ValueType::ValueMatrix | ValueType::SectionList
        );
        if needs_index && child.name().is_empty() {
            child.set_name(Name::index(self.children.borrow().len()));
        }
        self.children.borrow_mut().push(child);
    }

    /// Returns a snapshot of the child list.
    pub fn children_snapshot(&self) -> Vec<ValueRef> {
        self.children.borrow().clone()
    }

    /// Returns the first child with the given name.
    pub fn child(&self, name: &Name) -> Option<ValueRef> {
        self.children
            .borrow()
            .iter()
            .find(|child| child.name() == *name)
            .cloned()
    }

    /// Returns the first child with the given regular name.
    pub fn child_named(&self, word: &str) -> Option<ValueRef> {
        self.children
            .borrow()
            .iter()
            .find(|child| child.name().is(word))
            .cloned()
    }

    /// Returns the descendant at the given path, or the value itself for an
    /// empty path.
    pub fn value(self: &Rc<Self>, path: &NamePath) -> Option<ValueRef> {
        let mut current = self.clone();
        for name in path.iter() {
            current = current.child(name)?;
        }
        Some(current)
    }

    /// Tests whether a descendant exists at the given path.
    pub fn has_value(self: &Rc<Self>, path: &NamePath) -> bool {
        self.value(path).is_some()
    }

    /// Returns the path of this value from its tree root.
    ///
    /// The document root itself contributes no name.
    pub fn name_path(self: &Rc<Self>) -> NamePath {
        let mut names = Vec::new();
        let mut current = self.clone();
        loop {
            let parent = current.parent();
            match parent {
                Some(parent) => {
                    names.push(current.name());
                    current = parent;
                }
                None => {
                    if !current.is_document() && !current.name().is_empty() {
                        names.push(current.name());
                    }
                    break;
                }
            }
        }
        names.reverse();
        NamePath::from_names(names)
    }

    // -- payload access -----------------------------------------------------

    /// Returns the integer payload, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        if let ValueData::Integer(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the boolean payload, if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        if let ValueData::Boolean(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the float payload, if this is a float value.
    pub fn as_float(&self) -> Option<f64> {
        if let ValueData::Float(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        if let ValueData::Text(value) = &self.data {
            return Some(value);
        }
        None
    }

    /// Returns the date payload, if this is a date value.
    pub fn as_date(&self) -> Option<Date> {
        if let ValueData::Date(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the time payload, if this is a time value.
    pub fn as_time(&self) -> Option<Time> {
        if let ValueData::Time(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the date-time payload, if this is a date-time value.
    pub fn as_date_time(&self) -> Option<DateTime> {
        if let ValueData::DateTime(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the byte-sequence payload, if this is a bytes value.
    pub fn as_bytes(&self) -> Option<Bytes> {
        if let ValueData::Bytes(value) = &self.data {
            return Some(value.clone());
        }
        None
    }

    /// Returns the time-delta payload, if this is a time-delta value.
    pub fn as_time_delta(&self) -> Option<TimeDelta> {
        if let ValueData::TimeDelta(value) = &self.data {
            return Some(*value);
        }
        None
    }

    /// Returns the regular-expression payload, if this is a regex value.
    pub fn as_regex(&self) -> Option<RegexSource> {
        if let ValueData::Regex(value) = &self.data {
            return Some(value.clone());
        }
        None
    }

    /// Returns the text representation used in key indexes and composite
    /// keys: the raw text for text values, the decimal form for integers.
    pub fn to_text_representation(&self) -> Option<String> {
        match &self.data {
            ValueData::Text(value) => Some(value.clone()),
            ValueData::Integer(value) => Some(value.to_string()),
            ValueData::None
            | ValueData::Boolean(_)
            | ValueData::Float(_)
            | ValueData::Date(_)
            | ValueData::Time(_)
            | ValueData::DateTime(_)
            | ValueData::Bytes(_)
            | ValueData::TimeDelta(_)
            | ValueData::Regex(_) => None,
        }
    }

    /// Returns this value as a list of entries: the children for a value
    /// list or matrix, the value itself for any other kind.
    pub fn list_entries(self: &Rc<Self>) -> Vec<ValueRef> {
        if self.value_type.is_list() {
            self.children_snapshot()
        } else {
            vec![self.clone()]
        }
    }

    /// Extracts a text list: a single text value or a value list of texts.
    pub fn text_items(self: &Rc<Self>) -> Option<Vec<String>> {
        self.typed_items(|value| value.as_text().map(str::to_owned))
    }

    /// Extracts an integer list: a single integer or a value list of
    /// integers.
    pub fn integer_items(self: &Rc<Self>) -> Option<Vec<i64>> {
        self.typed_items(Value::as_integer)
    }

    /// Extracts a float list: a single float or a value list of floats.
    pub fn float_items(self: &Rc<Self>) -> Option<Vec<f64>> {
        self.typed_items(Value::as_float)
    }

    /// Extracts a bytes list: a single byte sequence or a value list of
    /// byte sequences.
    pub fn bytes_items(self: &Rc<Self>) -> Option<Vec<Bytes>> {
        self.typed_items(Value::as_bytes)
    }

    fn typed_items<T>(self: &Rc<Self>, extract: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
        if self.value_type == ValueType::ValueList {
            self.children
                .borrow()
                .iter()
                .map(|child| extract(child))
                .collect()
        } else {
            Some(vec![extract(self)?])
        }
    }

    // -- validator-owned state ----------------------------------------------

    /// Returns the rule this value was validated against, if any.
    pub fn validation_rule(&self) -> Option<RuleRef> {
        self.validation_rule.borrow().clone()
    }

    /// Attaches the rule this value was validated against.
    pub fn set_validation_rule(&self, rule: RuleRef) {
        *self.validation_rule.borrow_mut() = Some(rule);
    }

    /// Returns `true` if this value was materialized from a rule default.
    pub fn is_default_value(&self) -> bool {
        self.is_default_value.get()
    }

    /// Marks this value as materialized from a rule default.
    pub fn mark_as_default_value(&self) {
        self.is_default_value.set(true);
    }

    /// Returns `true` if this value is covered by a secret rule.
    pub fn is_secret(&self) -> bool {
        self.is_secret.get()
    }

    /// Sets the secret flag of this value.
    pub fn set_secret(&self, is_secret: bool) {
        self.is_secret.set(is_secret);
    }

    /// Removes all children that were materialized as defaults by an
    /// earlier validation run.
    pub fn remove_default_values(&self) {
        self.children
            .borrow_mut()
            .retain(|child| !child.is_default_value());
    }

    /// Creates an independent deep copy of this subtree.
    ///
    /// The copy keeps names, payloads, and locations; validation
    /// annotations and flags are not carried over.
    pub fn deep_copy(self: &Rc<Self>) -> ValueRef {
        let copy = self.clone_node();
        let mut stack = vec![(self.clone(), copy.clone())];
        while let Some((original, duplicate)) = stack.pop() {
            for child in original.children_snapshot() {
                let child_copy = child.clone_node();
                duplicate.add_child(child_copy.clone());
                stack.push((child, child_copy));
            }
        }
        copy
    }

    fn clone_node(&self) -> ValueRef {
        let copy = Self::build(self.value_type, self.data.clone());
        copy.set_name(self.name());
        if let Some(location) = self.location() {
            copy.set_location(location);
        }
        copy
    }
}

// ---------------------------------------------------------------------------
// Tree traversal
// ---------------------------------------------------------------------------

/// Walks a value tree in declaration order without recursion.
///
/// A preorder depth-first traversal with an explicit stack. When the filter
/// returns `false` for a node, the entire subtree rooted there is skipped.
/// The visit callback may fail; the first error stops the walk.
pub fn walk_tree<F, V>(root: &ValueRef, mut filter: F, mut visit: V) -> Result<()>
where
    F: FnMut(&ValueRef) -> bool,
    V: FnMut(&ValueRef) -> Result<()>,
{
    let mut stack = Vec::with_capacity(32);
    stack.push(root.clone());
    while let Some(node) = stack.pop() {
        if !filter(&node) {
            continue;
        }
        visit(&node)?;
        for child in node.children_snapshot().into_iter().rev() {
            stack.push(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
