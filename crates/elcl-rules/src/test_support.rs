//! Shared test helper functions for constructing document fixtures.
//!
//! This module is compiled only in test builds and provides short
//! constructors for configuration and rules documents used across the unit
//! test modules of this crate.
#![allow(clippy::expect_used)]

use crate::name::Name;
use crate::types::RegexSource;
use crate::value::{Value, ValueRef};

/// Names a value with a regular name, panicking on invalid input.
pub fn named(name: &str, value: ValueRef) -> ValueRef {
    value.set_name(Name::regular(name).expect("valid regular name"));
    value
}

/// Creates a document root with the given children.
pub fn document(children: Vec<ValueRef>) -> ValueRef {
    let root = Value::document();
    for child in children {
        root.add_child(child);
    }
    root
}

/// Creates a named section with regular names.
pub fn section(name: &str, children: Vec<ValueRef>) -> ValueRef {
    let value = Value::section_with_names();
    for child in children {
        value.add_child(child);
    }
    named(name, value)
}

/// Creates a named intermediate section.
pub fn intermediate(name: &str, children: Vec<ValueRef>) -> ValueRef {
    let value = Value::intermediate_section();
    for child in children {
        value.add_child(child);
    }
    named(name, value)
}

/// Creates a named section list with the given entry sections.
pub fn section_list(name: &str, entries: Vec<ValueRef>) -> ValueRef {
    let value = Value::section_list();
    for entry in entries {
        value.add_child(entry);
    }
    named(name, value)
}

/// Creates an unnamed section used as a section-list entry.
pub fn list_entry(children: Vec<ValueRef>) -> ValueRef {
    let value = Value::section_with_names();
    for child in children {
        value.add_child(child);
    }
    value
}

/// Creates a named integer value.
pub fn integer(name: &str, value: i64) -> ValueRef {
    named(name, Value::integer(value))
}

/// Creates a named boolean value.
pub fn boolean(name: &str, value: bool) -> ValueRef {
    named(name, Value::boolean(value))
}

/// Creates a named text value.
pub fn text(name: &str, value: &str) -> ValueRef {
    named(name, Value::text(value))
}

/// Creates a named regular-expression value.
pub fn regex(name: &str, pattern: &str) -> ValueRef {
    named(name, Value::regex(RegexSource::new(pattern, false)))
}

/// Creates a named value list from unnamed values.
pub fn value_list(name: &str, values: Vec<ValueRef>) -> ValueRef {
    let list = Value::value_list();
    for value in values {
        list.add_child(value);
    }
    named(name, list)
}

/// Creates a named list of text values.
pub fn text_list(name: &str, values: &[&str]) -> ValueRef {
    value_list(
        name,
        values.iter().map(|value| Value::text(*value)).collect(),
    )
}

/// Creates a named list of integer values.
pub fn integer_list(name: &str, values: &[i64]) -> ValueRef {
    value_list(
        name,
        values.iter().map(|value| Value::integer(*value)).collect(),
    )
}
