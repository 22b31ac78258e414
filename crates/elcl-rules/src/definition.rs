/// Definition validation: checks a finished rule tree for consistency.
///
/// Runs once after the compiler or the builder has produced a rule tree,
/// walking it top-down with an explicit stack. Every rule passes a fixed
/// list of checks; the first failure wins and is localized at the offending
/// rule.
use crate::constraint::{BoundValue, ConstraintKind, ConstraintType};
use crate::error::{Error, Result};
use crate::name::{Name, reserved};
use crate::name_path::NamePath;
use crate::rule::{KeyDefinition, RuleRef, RuleType};

/// The validator for a rule definition.
pub(crate) struct DefinitionValidator {
    root: RuleRef,
}

impl DefinitionValidator {
    /// Creates a validator for the given rule tree.
    pub(crate) fn new(root: &RuleRef) -> Self {
        Self { root: root.clone() }
    }

    /// Validates every rule in the tree.
    pub(crate) fn validate(&self) -> Result<()> {
        let mut stack = vec![self.root.clone()];
        while let Some(rule) = stack.pop() {
            validate_rule(&rule)?;
            stack.extend(rule.borrow().children().iter().cloned());
        }
        Ok(())
    }
}

/// All per-rule checks, in evaluation order.
const RULE_CHECKS: &[fn(&RuleRef) -> Result<()>] = &[
    check_name_rule_is_text,
    check_section_list,
    check_alternatives,
    check_any_rule,
    check_value_list,
    check_defaults_and_optionality,
    check_secret_marker,
    check_minimum_maximum_relation,
    check_key_definition_placement,
    check_key_references,
    check_dependency_definitions,
];

fn validate_rule(rule: &RuleRef) -> Result<()> {
    for check in RULE_CHECKS {
        check(rule).map_err(|error| {
            if error.has_location() {
                return error;
            }
            let rule_view = rule.borrow();
            error.with_name_path_and_location(
                rule_view.rule_name_path().clone(),
                rule_view.location(),
            )
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

fn check_name_rule_is_text(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    if rule_view.rule_name().is(reserved::NAME) && rule_view.rule_type() != RuleType::Text {
        return Err(Error::validation("The name rule must have a type of 'text'"));
    }
    Ok(())
}

fn check_section_list(rule: &RuleRef) -> Result<()> {
    if rule.borrow().rule_type() != RuleType::SectionList {
        return Ok(());
    }
    let Some(entry) = rule.borrow().child_named(reserved::ENTRY) else {
        return Err(Error::validation(
            "A section list rule must have a 'vr_entry' node-rules definition",
        ));
    };
    let section_entry_ok = |candidate: &RuleRef| {
        matches!(
            candidate.borrow().rule_type(),
            RuleType::Section | RuleType::SectionWithTexts
        )
    };
    let entry_type = entry.borrow().rule_type();
    if entry_type == RuleType::Alternatives {
        for alternative in entry.borrow().children() {
            if !section_entry_ok(alternative) {
                return Err(attach_to_rule(
                    Error::validation(
                        "All alternatives in a 'vr_entry' node-rules definition for a \
                         section list must be of type 'section' or 'section_with_texts'",
                    ),
                    alternative,
                ));
            }
            check_entry_common(alternative).map_err(|error| attach_to_rule(error, alternative))?;
        }
    } else if !section_entry_ok(&entry) {
        return Err(attach_to_rule(
            Error::validation(
                "The 'vr_entry' node-rules definition for a section list must be of \
                 type 'section' or 'section_with_texts'",
            ),
            &entry,
        ));
    } else {
        check_entry_common(&entry).map_err(|error| attach_to_rule(error, &entry))?;
    }
    check_only_entry_children(rule)
}

fn check_value_list(rule: &RuleRef) -> Result<()> {
    let rule_type = rule.borrow().rule_type();
    if rule_type != RuleType::ValueList && rule_type != RuleType::ValueMatrix {
        return Ok(());
    }
    let Some(entry) = rule.borrow().child_named(reserved::ENTRY) else {
        return Err(Error::validation(
            "A value list or matrix rule must have a 'vr_entry' node-rules definition",
        ));
    };
    let entry_type = entry.borrow().rule_type();
    if entry_type == RuleType::Alternatives {
        for alternative in entry.borrow().children() {
            if !alternative.borrow().rule_type().is_scalar() {
                return Err(attach_to_rule(
                    Error::validation(
                        "All alternatives in a 'vr_entry' node-rules definition for a \
                         value list must be scalar types",
                    ),
                    alternative,
                ));
            }
            check_entry_common(alternative).map_err(|error| attach_to_rule(error, alternative))?;
        }
    } else if !entry_type.is_scalar() {
        return Err(attach_to_rule(
            Error::validation(format!(
                "Unexpected 'vr_entry' node-rules definition type for a value list. \
                 Expected a scalar value type, but got {}",
                entry_type.expected_text()
            )),
            &entry,
        ));
    } else {
        check_entry_common(&entry).map_err(|error| attach_to_rule(error, &entry))?;
    }
    check_only_entry_children(rule)
}

fn check_entry_common(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    if rule_view.has_default() {
        return Err(Error::validation(
            "The 'vr_entry' node-rules definition may not have a default value",
        ));
    }
    if rule_view.is_optional() {
        return Err(Error::validation(
            "The 'vr_entry' node-rules definition cannot be optional",
        ));
    }
    Ok(())
}

fn check_only_entry_children(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    for child in rule_view.children() {
        if !child.borrow().rule_name().is(reserved::ENTRY) {
            return Err(attach_to_rule(
                Error::validation(format!(
                    "Unexpected sub-node-rules definition in '{}' rule: \
                     only 'vr_entry' is permitted",
                    rule_view.rule_type().to_text()
                )),
                child,
            ));
        }
    }
    Ok(())
}

fn check_alternatives(rule: &RuleRef) -> Result<()> {
    if rule.borrow().rule_type() != RuleType::Alternatives {
        return Ok(());
    }
    let rule_view = rule.borrow();
    let mut has_default = false;
    for (index, alternative) in rule_view.children().iter().enumerate() {
        let alternative_view = alternative.borrow();
        if alternative_view.rule_type() == RuleType::Alternatives {
            return Err(Error::validation(
                "Alternatives may not contain other alternatives",
            ));
        }
        if alternative_view.has_default() {
            if has_default {
                return Err(Error::validation(
                    "Only one alternative may have a default value",
                ));
            }
            has_default = true;
        }
        if alternative_view.is_optional() && index > 0 {
            return Err(Error::validation(
                "Only the first alternative may be marked as optional",
            ));
        }
    }
    Ok(())
}

fn check_any_rule(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    if !rule_view.rule_name().is(reserved::ANY) {
        return Ok(());
    }
    if rule_view.is_optional() {
        return Err(Error::validation(
            "The 'vr_any' rule cannot be set optional, it is optional by definition",
        ));
    }
    if rule_view.has_default() {
        return Err(Error::validation("The 'vr_any' rule cannot have a default value"));
    }
    Ok(())
}

fn check_defaults_and_optionality(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    if rule_view.has_default() && rule_view.is_optional() {
        return Err(Error::validation(
            "A node-rules definition may not be both optional and have a default value",
        ));
    }
    if let Some(default_value) = rule_view.default_value() {
        if !rule_view
            .rule_type()
            .matches_value_type(default_value.value_type())
        {
            return Err(Error::validation(format!(
                "The default value of a node-rules definition must match its type. \
                 Expected {}, but got {}",
                rule_view.rule_type().expected_text(),
                default_value.value_type().description()
            )));
        }
    }
    Ok(())
}

fn check_secret_marker(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    if !rule_view.is_secret() {
        return Ok(());
    }
    if !rule_view.rule_type().is_scalar() {
        return Err(Error::validation(format!(
            "The 'is_secret' marker can only be used for scalar value types. \
             Found '{}' type",
            rule_view.rule_type().to_text()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Constraint checks
// ---------------------------------------------------------------------------

fn check_minimum_maximum_relation(rule: &RuleRef) -> Result<()> {
    let rule_view = rule.borrow();
    let Some(minimum) = rule_view.constraint(ConstraintType::Minimum) else {
        return Ok(());
    };
    let Some(maximum) = rule_view.constraint(ConstraintType::Maximum) else {
        return Ok(());
    };
    if minimum.is_negated() || maximum.is_negated() {
        return Ok(());
    }
    let (ConstraintKind::Minimum(low), ConstraintKind::Maximum(high)) =
        (minimum.kind(), maximum.kind())
    else {
        return Err(Error::internal("Constraint slots hold mismatched kinds"));
    };
    if bounds_inverted(low, high) {
        return Err(Error::validation(
            "The 'minimum' constraint value must be less than or equal to the 'maximum' value",
        ));
    }
    Ok(())
}

/// Tests whether a non-negated minimum exceeds its maximum. Both payloads
/// are built against the same rule type, so their variants always agree.
fn bounds_inverted(low: &BoundValue, high: &BoundValue) -> bool {
    if let (BoundValue::Integer(low), BoundValue::Integer(high)) = (low, high) {
        return low > high;
    }
    if let (BoundValue::Float(low), BoundValue::Float(high)) = (low, high) {
        return low > high;
    }
    if let (BoundValue::Date(low), BoundValue::Date(high)) = (low, high) {
        return low > high;
    }
    if let (BoundValue::DateTime(low), BoundValue::DateTime(high)) = (low, high) {
        return low > high;
    }
    if let (BoundValue::Matrix(low_rows, low_columns), BoundValue::Matrix(high_rows, high_columns)) =
        (low, high)
    {
        return low_rows > high_rows || low_columns > high_columns;
    }
    false
}

// ---------------------------------------------------------------------------
// Key definition checks
// ---------------------------------------------------------------------------

fn check_key_definition_placement(rule: &RuleRef) -> Result<()> {
    if !rule.borrow().has_key_definitions() {
        return Ok(());
    }
    if rule.borrow().rule_type() != RuleType::Section {
        let location = rule
            .borrow()
            .key_definitions()
            .first()
            .and_then(|definition| definition.location.clone());
        return Err(Error::validation(
            "Key definitions may only be placed in a section or the document root",
        )
        .with_location(location));
    }
    let mut seen_index_names: Vec<Name> = Vec::new();
    let definitions = rule.borrow().key_definitions().to_vec();
    for definition in &definitions {
        check_key_definition(rule, definition, &mut seen_index_names).map_err(|error| {
            if error.has_location() {
                error
            } else {
                error.with_location(definition.location.clone())
            }
        })?;
    }
    Ok(())
}

fn check_key_definition(
    rule: &RuleRef,
    definition: &KeyDefinition,
    seen_index_names: &mut Vec<Name>,
) -> Result<()> {
    if !definition.name.is_empty() {
        if seen_index_names.contains(&definition.name) {
            return Err(Error::validation(
                "All 'vr_key' definitions in the same section must have a unique name",
            ));
        }
        seen_index_names.push(definition.name.clone());
    }
    let mut first_list_path = NamePath::root();
    let mut first_list_rule: Option<RuleRef> = None;
    for key in &definition.keys {
        let Some(entry_index) = key.find_regular(reserved::ENTRY) else {
            return Err(Error::validation(format!(
                "Keys must point to values inside a section list. \
                 The 'vr_entry' is missing in the key path '{key}'"
            )));
        };
        let list_path = key.prefix(entry_index);
        if list_path.is_empty() {
            return Err(Error::validation(format!(
                "The key '{key}' does not point to a section list. \
                 No list is named in front of the 'vr_entry'"
            )));
        }
        if first_list_rule.is_none() {
            let candidate = rule.borrow().descendant(&list_path);
            let Some(candidate) =
                candidate.filter(|list| list.borrow().rule_type() == RuleType::SectionList)
            else {
                return Err(Error::validation(format!(
                    "The initial path '{list_path}' in a key does not point to a section list"
                )));
            };
            first_list_path = list_path.clone();
            first_list_rule = Some(candidate);
        } else if list_path != first_list_path {
            return Err(Error::validation(format!(
                "All keys in a 'vr_key' definition must point to the same section list. \
                 The key '{key}' points to a different list than previous keys in the \
                 same definition"
            )));
        }
        let value_path = key.suffix_from(entry_index + 1);
        if value_path.is_empty() {
            return Err(Error::validation(format!(
                "The key '{key}' has no value path after 'vr_entry'"
            )));
        }
        if value_path.find_regular(reserved::ENTRY).is_some() {
            return Err(Error::validation(format!(
                "The key '{key}' points to a value in a nested section list"
            )));
        }
        let Some(list_rule) = &first_list_rule else {
            return Err(Error::internal("Missing section list rule for a key definition"));
        };
        let entry_rule = list_rule.borrow().child_named(reserved::ENTRY);
        let Some(entry_rule) =
            entry_rule.filter(|entry| entry.borrow().rule_type() == RuleType::Section)
        else {
            return Err(Error::validation(format!(
                "The 'vr_entry' in the key path '{key}' does not point to a section \
                 in a section list"
            )));
        };
        let Some(value_rule) = entry_rule.borrow().descendant(&value_path) else {
            return Err(Error::validation(format!(
                "The value path '{value_path}' in the key '{key}' does not point to a \
                 validated value"
            )));
        };
        let value_rule_type = value_rule.borrow().rule_type();
        if value_rule_type == RuleType::Alternatives {
            let has_key_capable_alternative = value_rule.borrow().children().iter().any(|alt| {
                matches!(
                    alt.borrow().rule_type(),
                    RuleType::Integer | RuleType::Text
                )
            });
            if !has_key_capable_alternative {
                return Err(Error::validation(format!(
                    "The value path '{value_path}' in the key '{key}' points to a value \
                     with alternatives, but none of the alternatives contain a text or \
                     integer value"
                )));
            }
        } else if value_rule_type != RuleType::Text && value_rule_type != RuleType::Integer {
            return Err(Error::validation(format!(
                "The value path '{value_path}' in the key '{key}' does not point to a \
                 text or integer value"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Key reference checks
// ---------------------------------------------------------------------------

fn check_key_references(rule: &RuleRef) -> Result<()> {
    let constraint_data = {
        let rule_view = rule.borrow();
        let Some(constraint) = rule_view.constraint(ConstraintType::Key) else {
            return Ok(());
        };
        let references = constraint.key_references().map(<[NamePath]>::to_vec);
        (references, constraint.location())
    };
    let (Some(references), constraint_location) = constraint_data else {
        return Err(Error::internal("A key constraint without references"));
    };
    let rule_type = rule.borrow().rule_type();
    if rule_type != RuleType::Text && rule_type != RuleType::Integer {
        return Err(Error::validation(
            "Key references can only be used on text or integer values",
        ));
    }
    let mut seen: Vec<NamePath> = Vec::new();
    for reference in &references {
        let result = (|| {
            if seen.contains(reference) {
                return Err(Error::validation("Each key reference must be unique"));
            }
            seen.push(reference.clone());
            validate_key_reference(rule, reference)
        })();
        result.map_err(|error| {
            if error.has_location() {
                error
            } else {
                error.with_location(constraint_location.clone())
            }
        })?;
    }
    Ok(())
}

fn validate_key_reference(rule: &RuleRef, reference: &NamePath) -> Result<()> {
    let Some(first) = reference.first() else {
        return Err(Error::validation("A key reference cannot be empty"));
    };
    if !first.is_regular() {
        return Err(Error::validation("A key reference must start with a regular name"));
    }
    let mut reference_index = None;
    if reference.len() >= 2 {
        let Some(index) = reference.at(1).and_then(Name::as_index) else {
            return Err(Error::validation(
                "Only an index is allowed after the name of the key reference",
            ));
        };
        if index > 9 {
            return Err(Error::validation("The key index must be between 0 and 9"));
        }
        reference_index = Some(index);
    }
    if reference.len() > 2 {
        return Err(Error::validation(
            "Unexpected name path elements after the key reference",
        ));
    }
    // Search the nearest enclosing key definition with the referenced name.
    let mut scope = rule.borrow().parent();
    let mut found: Option<(RuleRef, KeyDefinition)> = None;
    while let Some(current) = scope {
        let definition = current
            .borrow()
            .key_definitions()
            .iter()
            .find(|definition| definition.name == *first)
            .cloned();
        if let Some(definition) = definition {
            found = Some((current, definition));
            break;
        }
        scope = current.borrow().parent();
    }
    let Some((owner_rule, definition)) = found else {
        return Err(Error::validation(format!(
            "The 'vr_key' definition for the reference '{reference}' was not found \
             in the scope of the constraint"
        )));
    };
    if let Some(index) = reference_index {
        if index >= definition.keys.len() {
            return Err(Error::validation(format!(
                "The key index in the key reference '{reference}' is out of bounds"
            )));
        }
    }
    let rule_type = rule.borrow().rule_type();
    if definition.keys.len() > 1 && reference_index.is_none() {
        if rule_type == RuleType::Text {
            return Ok(());
        }
        return Err(Error::validation(
            "A key referencing a multi-key index as a whole must be of type 'text'",
        ));
    }
    let index = reference_index.unwrap_or(0);
    let key_types = resolve_key_definition_types(&owner_rule, &definition, index)?;
    if !key_types.contains(&rule_type) {
        let expected = key_types
            .iter()
            .map(|key_type| key_type.expected_text())
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(Error::validation(format!(
            "A key reference for an index of {expected} must be of the same type"
        )));
    }
    Ok(())
}

/// Returns the text/integer types a key column can produce.
fn resolve_key_definition_types(
    owner_rule: &RuleRef,
    definition: &KeyDefinition,
    index: usize,
) -> Result<Vec<RuleType>> {
    let Some(key_path) = definition.keys.get(index) else {
        return Err(Error::internal("Partial key index out of bounds"));
    };
    let Some(target_rule) = owner_rule.borrow().descendant(key_path) else {
        return Err(Error::internal("A validated key definition path no longer resolves"));
    };
    let target_type = target_rule.borrow().rule_type();
    if target_type == RuleType::Alternatives {
        let mut result = Vec::new();
        for alternative in target_rule.borrow().children() {
            let alternative_type = alternative.borrow().rule_type();
            if (alternative_type == RuleType::Text || alternative_type == RuleType::Integer)
                && !result.contains(&alternative_type)
            {
                result.push(alternative_type);
            }
        }
        return Ok(result);
    }
    Ok(vec![target_type])
}

// ---------------------------------------------------------------------------
// Dependency checks
// ---------------------------------------------------------------------------

fn check_dependency_definitions(rule: &RuleRef) -> Result<()> {
    if !rule.borrow().has_dependency_definitions() {
        return Ok(());
    }
    if rule.borrow().rule_type() != RuleType::Section {
        return Err(Error::validation(
            "Dependency definitions can only be placed in a node-rules definition of a section",
        ));
    }
    let definitions = rule.borrow().dependency_definitions().to_vec();
    for definition in &definitions {
        let result = (|| {
            let mut seen: Vec<&NamePath> = Vec::new();
            for path in definition.sources.iter().chain(definition.targets.iter()) {
                if seen.contains(&path) {
                    return Err(Error::validation(
                        "Each path in 'source' and 'target' of a dependency must be unique",
                    ));
                }
                seen.push(path);
                validate_dependency_path(rule, path)?;
            }
            Ok(())
        })();
        result.map_err(|error| {
            if error.has_location() {
                error
            } else {
                error.with_location(definition.location.clone())
            }
        })?;
    }
    Ok(())
}

fn validate_dependency_path(rule: &RuleRef, dependency_path: &NamePath) -> Result<()> {
    if dependency_path.contains_index() || dependency_path.contains_text() {
        return Err(Error::validation(
            "The dependency path cannot contain an index or text",
        ));
    }
    if dependency_path.find_regular(reserved::ENTRY).is_some() {
        return Err(Error::validation(format!(
            "The dependency path '{dependency_path}' points to a value in a section list"
        )));
    }
    let Some(target_rule) = rule.borrow().descendant(dependency_path) else {
        return Err(Error::validation(format!(
            "The dependency path '{dependency_path}' does not point to a validated value"
        )));
    };
    // The path is acceptable when some rule along the chain may legitimately
    // be absent.
    let mut tested_path = dependency_path.clone();
    let mut tested_rule = Some(target_rule);
    loop {
        let Some(current) = &tested_rule else {
            break;
        };
        if rule_is_optional(current) {
            return Ok(());
        }
        if tested_path.len() <= 1 {
            break;
        }
        tested_path = tested_path.parent();
        tested_rule = rule.borrow().descendant(&tested_path);
    }
    Err(Error::validation(format!(
        "The dependency path '{dependency_path}' points to a value that is neither \
         optional nor has a default value"
    )))
}

fn rule_is_optional(rule: &RuleRef) -> bool {
    let rule_view = rule.borrow();
    if rule_view.rule_type() == RuleType::Alternatives {
        return rule_view
            .children()
            .iter()
            .any(|alternative| rule_is_optional(alternative));
    }
    rule_view.is_optional() || rule_view.has_default()
}

/// Attaches a rule's path and location to an error that lacks a location.
fn attach_to_rule(error: Error, rule: &RuleRef) -> Error {
    if error.has_location() {
        return error;
    }
    let rule_view = rule.borrow();
    error.with_name_path_and_location(rule_view.rule_name_path().clone(), rule_view.location())
}

#[cfg(test)]
mod tests;
