#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod builder;
pub mod char_ranges;
pub mod constraint;
pub mod definition;
pub mod error;
pub mod from_document;
pub mod key_index;
pub mod location;
pub mod name;
pub mod name_path;
pub mod rule;
pub mod rules;
pub mod types;
pub mod validator;
pub mod value;
pub mod version_mask;

pub use builder::{Attribute, RulesBuilder};
pub use char_ranges::{CharRange, CharRanges};
pub use constraint::{
    BoundValue, Constraint, ConstraintKind, ConstraintType, EqualsValue, InValues, MultipleValue,
    ValidationContext, ValidationTarget,
};
pub use error::{Error, ErrorCategory, Result};
pub use key_index::KeyIndex;
pub use location::Location;
pub use name::{Name, NameType};
pub use name_path::NamePath;
pub use rule::{
    CaseSensitivity, DependencyDefinition, DependencyMode, KeyDefinition, Rule, RuleRef, RuleType,
};
pub use rules::Rules;
pub use types::{Bytes, Date, DateTime, RegexSource, Time, TimeDelta};
pub use value::{Value, ValueData, ValueRef, ValueType, walk_tree};
pub use version_mask::VersionMask;

/// Returns the current version of the elcl-rules library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
pub(crate) mod test_support;
