/// The two-pass document validator.
///
/// Pass 1 walks the configuration tree with an explicit stack of
/// value/rule frames: it matches each value to a rule, checks types and
/// constraints, resolves alternatives, validates list and matrix entries,
/// materializes defaults for missing values, and annotates every value with
/// the rule that matched it. Pass 2 runs only when key indexes or
/// dependencies are in play: it rebuilds the traversal over the annotated
/// tree with explicit enter/exit frames, builds key indexes on section
/// entry, evaluates deferred key constraints against the index stack, and
/// checks dependency definitions.
///
/// The validator mutates the configuration tree (annotations, secret flags,
/// inserted defaults) and raises on the first failure in declaration order.
use std::cell::RefCell;
use std::rc::Rc;

use crate::constraint::{ConstraintType, ValidationContext, ValidationTarget};
use crate::error::{Error, ErrorCategory, Result};
use crate::key_index::KeyIndex;
use crate::name::{Name, reserved};
use crate::name_path::NamePath;
use crate::rule::{
    DependencyDefinition, DependencyMode, KeyDefinition, Rule, RuleRef, RuleType,
};
use crate::value::{ValueRef, ValueType, walk_tree};

/// Attaches a value's path and location to an error that lacks a location.
fn attach_to_value(error: Error, value: &ValueRef) -> Error {
    if error.has_location() {
        return error;
    }
    error.with_name_path_and_location(value.name_path(), value.location())
}

/// One frame of the pass-2 traversal.
struct Pass2Frame {
    value: ValueRef,
    rule: RuleRef,
    /// How many key indexes this frame pushed onto the index stack.
    added_indexes: usize,
    /// Exit frames pop the indexes their enter frame pushed.
    is_exit: bool,
}

/// The validator state for one validation run.
pub(crate) struct DocumentValidator {
    root: RuleRef,
    value: ValueRef,
    version: i64,
    use_indexes: bool,
    use_dependencies: bool,
}

impl DocumentValidator {
    /// Creates a validator for one rule tree, document, and version.
    pub(crate) fn new(root: &RuleRef, value: &ValueRef, version: i64) -> Self {
        Self {
            root: root.clone(),
            value: value.clone(),
            version,
            use_indexes: false,
            use_dependencies: false,
        }
    }

    /// Runs both validation passes.
    pub(crate) fn validate(mut self) -> Result<()> {
        if self.root.borrow().is_empty() {
            return Ok(());
        }
        self.pass_1()?;
        self.pass_2()
    }

    // -- pass 1 -------------------------------------------------------------

    fn pass_1(&mut self) -> Result<()> {
        self.use_indexes = self.root.borrow().has_key_definitions();
        self.use_dependencies = self.root.borrow().has_dependency_definitions();

        let mut stack: Vec<(ValueRef, RuleRef)> = Vec::with_capacity(32);
        stack.push((self.value.clone(), self.root.clone()));
        while let Some((value, rule)) = stack.pop() {
            // Defaults materialized by an earlier validation must not count
            // as configured in this one.
            value.remove_default_values();
            let effective_rule = if Rc::ptr_eq(&value, &self.value) {
                value.set_validation_rule(rule.clone());
                rule
            } else {
                let Some(selected) = self.validate_value(&rule, &value)? else {
                    // Not-validated branch or no descent required.
                    continue;
                };
                self.assign_rule(&value, &selected);
                let selected_type = selected.borrow().rule_type();
                if selected_type == RuleType::ValueList || selected_type == RuleType::ValueMatrix {
                    // List and matrix entries were validated in place.
                    continue;
                }
                selected
            };
            // Push children in reverse declaration order so they pop in
            // declaration order.
            let mut matched_rules: Vec<*const RefCell<Rule>> = Vec::new();
            for child in value.children_snapshot().into_iter().rev() {
                let child_rule = self.next_rule_for_value(&effective_rule, &child)?;
                matched_rules.push(Rc::as_ptr(&child_rule));
                stack.push((child, child_rule));
            }
            let rule_children = effective_rule.borrow().children().to_vec();
            for child_rule in &rule_children {
                if matched_rules.contains(&Rc::as_ptr(child_rule)) {
                    continue;
                }
                self.handle_missing_values(child_rule, &value)?;
            }
        }
        Ok(())
    }

    /// Validates one value against its selected rule.
    ///
    /// Returns the rule to validate the children against, or `None` when
    /// the branch requires no further descent.
    fn validate_value(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<Option<RuleRef>> {
        self.validate_name_constraints(rule, value)?;
        {
            let rule_view = rule.borrow();
            if rule_view.has_key_definitions() || rule_view.has_constraint(ConstraintType::Key) {
                self.use_indexes = true;
            }
            if rule_view.has_dependency_definitions() {
                self.use_dependencies = true;
            }
        }
        let rule_type = rule.borrow().rule_type();
        if rule_type == RuleType::NotValidated {
            self.handle_not_validated(rule, value)?;
            return Ok(None);
        }
        if rule_type == RuleType::Alternatives {
            return self.handle_alternatives(rule, value).map(Some);
        }
        if rule_type == RuleType::SectionList {
            return self.handle_section_list(rule, value).map(Some);
        }
        if rule_type == RuleType::ValueList {
            return self.handle_value_list(rule, value).map(Some);
        }
        if rule_type == RuleType::ValueMatrix {
            return self.handle_value_matrix(rule, value).map(Some);
        }
        self.handle_common(rule, value).map(Some)
    }

    /// Attaches the rule to the value and propagates the secret flag.
    fn assign_rule(&self, value: &ValueRef, rule: &RuleRef) {
        value.set_validation_rule(rule.clone());
        if rule.borrow().is_secret() {
            value.set_secret(true);
        }
    }

    /// Marks the whole branch as not-validated; nothing below is checked.
    fn handle_not_validated(&self, rule: &RuleRef, value: &ValueRef) -> Result<()> {
        walk_tree(
            value,
            |_| true,
            |node| {
                node.set_validation_rule(rule.clone());
                Ok(())
            },
        )
    }

    /// Picks the first alternative that matches by version, type, and
    /// constraints.
    fn handle_alternatives(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        let candidates: Vec<RuleRef> = rule
            .borrow()
            .children()
            .iter()
            .filter(|alternative| {
                let alternative_view = alternative.borrow();
                alternative_view.version_mask().matches(self.version)
                    && alternative_view
                        .rule_type()
                        .matches_value_type(value.value_type())
            })
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(self.expected_vs_actual(rule, value));
        }
        let mut first_error = None;
        for alternative in candidates {
            match self.validate_value_constraints(&alternative, value) {
                Ok(()) => return Ok(alternative),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        Err(first_error
            .unwrap_or_else(|| Error::internal("Expected a constraint error for an alternative")))
    }

    fn handle_section_list(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        if value.value_type() != ValueType::SectionList {
            return Err(self.expected_vs_actual(rule, value));
        }
        self.validate_value_constraints(rule, value)?;
        Ok(rule.clone())
    }

    /// Shared pre-check for value lists and matrices: evaluates the size
    /// constraints and resolves the entry rule.
    fn list_pre_check(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        self.validate_value_constraints(rule, value)?;
        if !value.value_type().is_list() && !value.value_type().is_scalar() {
            return Err(attach_to_value(
                Error::validation(format!(
                    "Expected a list of values, but found {}",
                    value.value_type().description()
                )),
                value,
            ));
        }
        rule.borrow()
            .child_named(reserved::ENTRY)
            .ok_or_else(|| Error::internal("Missing 'vr_entry' rule for a list rule"))
    }

    /// Validates one element of a list or one cell of a matrix.
    fn validate_list_element(&mut self, entry_rule: &RuleRef, element: &ValueRef) -> Result<()> {
        let entry_type = entry_rule.borrow().rule_type();
        if !entry_type.is_scalar() && entry_type != RuleType::Alternatives {
            return Err(Error::internal("Unexpected rule type for 'vr_entry'"));
        }
        let used_rule = if entry_type == RuleType::Alternatives {
            self.handle_alternatives(entry_rule, element)?
        } else {
            self.handle_common(entry_rule, element)?
        };
        self.assign_rule(element, &used_rule);
        Ok(())
    }

    fn handle_value_list(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        let entry_rule = self.list_pre_check(rule, value)?;
        for element in value.list_entries() {
            self.validate_list_element(&entry_rule, &element)?;
        }
        Ok(rule.clone())
    }

    fn handle_value_matrix(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        let entry_rule = self.list_pre_check(rule, value)?;
        for row in value.list_entries() {
            for cell in row.list_entries() {
                self.validate_list_element(&entry_rule, &cell)?;
            }
        }
        Ok(rule.clone())
    }

    /// Handles scalar values and sections: type check plus constraints.
    fn handle_common(&mut self, rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        if !rule
            .borrow()
            .rule_type()
            .matches_value_type(value.value_type())
        {
            return Err(self.expected_vs_actual(rule, value));
        }
        self.validate_value_constraints(rule, value)?;
        Ok(rule.clone())
    }

    // -- rule selection and missing values ----------------------------------

    /// Selects the child rule matching a value's name.
    fn next_rule_for_value(&self, parent_rule: &RuleRef, value: &ValueRef) -> Result<RuleRef> {
        let name = value.name();
        if name.is_index() {
            // List entries are validated by the entry rule.
            return parent_rule
                .borrow()
                .child_named(reserved::ENTRY)
                .ok_or_else(|| Error::internal("Missing entry rule for a list rule"));
        }
        let mut any_rule = None;
        {
            let parent_view = parent_rule.borrow();
            for child_rule in parent_view.children() {
                let child_view = child_rule.borrow();
                if !child_view.version_mask().matches(self.version) {
                    continue;
                }
                if child_view.rule_name().is(reserved::ANY) {
                    // The wildcard applies only when nothing else matches.
                    any_rule = Some(child_rule.clone());
                    continue;
                }
                if child_view.target_name() == name {
                    return Ok(child_rule.clone());
                }
            }
        }
        if let Some(any_rule) = any_rule {
            return Ok(any_rule);
        }
        let description = value.value_type().description();
        let bare_description = description
            .strip_prefix("an ")
            .or_else(|| description.strip_prefix("a "))
            .unwrap_or(description);
        Err(attach_to_value(
            Error::validation(format!(
                "Found an unexpected {bare_description} in this document"
            )),
            value,
        ))
    }

    /// Handles a child rule that received no value from the parent.
    fn handle_missing_values(&self, rule: &RuleRef, parent_value: &ValueRef) -> Result<()> {
        {
            let rule_view = rule.borrow();
            if rule_view.rule_type() == RuleType::NotValidated
                || !rule_view.version_mask().matches(self.version)
                || rule_view.rule_name().is_reserved()
                || rule_view.is_optional()
            {
                return Ok(());
            }
            if rule_view.has_default() {
                drop(rule_view);
                return self.copy_default_value(rule, parent_value);
            }
            if rule_view.rule_type() == RuleType::Alternatives {
                for alternative in rule_view.children() {
                    let alternative_view = alternative.borrow();
                    if !alternative_view.version_mask().matches(self.version) {
                        continue;
                    }
                    if alternative_view.is_optional() {
                        return Ok(());
                    }
                    if alternative_view.has_default() {
                        drop(alternative_view);
                        return self.copy_default_value(alternative, parent_value);
                    }
                }
            }
        }
        Err(attach_to_value(
            Error::validation(format!(
                "In {}, expected {} with the name '{}'",
                parent_location_text(parent_value),
                self.expected_value_type_text(rule),
                rule.borrow().target_name()
            )),
            parent_value,
        ))
    }

    /// Materializes a rule's default under the parent value.
    ///
    /// The default is always an independent deep copy; every node of the
    /// copy carries the rule annotation and the default-value marker.
    fn copy_default_value(&self, rule: &RuleRef, parent_value: &ValueRef) -> Result<()> {
        let Some(default_value) = rule.borrow().default_value() else {
            return Err(Error::internal("Expected a default value on this rule"));
        };
        let copy = default_value.deep_copy();
        copy.set_name(rule.borrow().target_name());
        let is_secret = rule.borrow().is_secret();
        walk_tree(
            &copy,
            |_| true,
            |node| {
                node.set_validation_rule(rule.clone());
                node.mark_as_default_value();
                if is_secret {
                    node.set_secret(true);
                }
                Ok(())
            },
        )?;
        parent_value.add_child(copy);
        Ok(())
    }

    // -- constraints --------------------------------------------------------

    /// Evaluates the `vr_name` constraints against a value's name.
    fn validate_name_constraints(&self, rule: &RuleRef, value: &ValueRef) -> Result<()> {
        let Some(name_rule) = rule.borrow().name_constraints() else {
            return Ok(());
        };
        let name = value.name();
        if name.is_index() || name.is_text() {
            return Err(attach_to_value(
                Error::validation("Expected a named value, but got a list entry or text index"),
                value,
            ));
        }
        let context = ValidationContext {
            target: ValidationTarget::Name,
            value,
            rule: &name_rule,
        };
        self.validate_constraints(&name_rule, &context, value)
    }

    fn validate_value_constraints(&self, rule: &RuleRef, value: &ValueRef) -> Result<()> {
        let context = ValidationContext {
            target: ValidationTarget::Value,
            value,
            rule,
        };
        self.validate_constraints(rule, &context, value)
    }

    /// Evaluates a rule's constraints in declaration order, rewriting
    /// failures to the constraint's or rule's custom error message.
    fn validate_constraints(
        &self,
        rule: &RuleRef,
        context: &ValidationContext<'_>,
        value: &ValueRef,
    ) -> Result<()> {
        let constraints = rule.borrow().constraints().to_vec();
        let rule_custom_error = rule.borrow().custom_error().map(str::to_owned);
        for constraint in &constraints {
            if constraint.constraint_type() == ConstraintType::Key {
                // Key constraints need the indexes of pass 2.
                continue;
            }
            if let Err(error) = constraint.evaluate(context) {
                let mut error = error;
                if error.category() == ErrorCategory::Validation {
                    if let Some(custom) = constraint.custom_error() {
                        error = error.with_message(custom);
                    } else if let Some(custom) = &rule_custom_error {
                        error = error.with_message(custom.clone());
                    }
                }
                return Err(attach_to_value(error, value));
            }
        }
        Ok(())
    }

    // -- error texts --------------------------------------------------------

    /// Describes the value type(s) a rule expects, listing every
    /// version-active alternative.
    fn expected_value_type_text(&self, rule: &RuleRef) -> String {
        let rule_view = rule.borrow();
        if rule_view.rule_type() != RuleType::Alternatives {
            return rule_view.rule_type().expected_text().to_owned();
        }
        let mut texts: Vec<&'static str> = Vec::new();
        for alternative in rule_view.children() {
            let alternative_view = alternative.borrow();
            if !alternative_view.version_mask().matches(self.version) {
                continue;
            }
            let text = alternative_view.rule_type().expected_text();
            if !texts.contains(&text) {
                texts.push(text);
            }
        }
        if texts.is_empty() {
            return rule_view.rule_type().expected_text().to_owned();
        }
        texts.join(" or ")
    }

    fn expected_vs_actual(&self, rule: &RuleRef, value: &ValueRef) -> Error {
        attach_to_value(
            Error::validation(format!(
                "Expected {} but got {}",
                self.expected_value_type_text(rule),
                value.value_type().description()
            )),
            value,
        )
    }

    // -- pass 2 -------------------------------------------------------------

    fn pass_2(&mut self) -> Result<()> {
        if !self.use_indexes && !self.use_dependencies {
            return Ok(());
        }
        let mut stack: Vec<Pass2Frame> = Vec::with_capacity(32);
        stack.push(Pass2Frame {
            value: self.value.clone(),
            rule: self.root.clone(),
            added_indexes: 0,
            is_exit: false,
        });
        let mut key_index_stack: Vec<KeyIndex> = Vec::new();
        while let Some(mut frame) = stack.pop() {
            if frame.is_exit {
                let remaining = key_index_stack.len().saturating_sub(frame.added_indexes);
                key_index_stack.truncate(remaining);
                continue;
            }
            if frame.rule.borrow().has_key_definitions() {
                let indexes = self.build_key_indexes(&frame.value, &frame.rule)?;
                frame.added_indexes = indexes.len();
                key_index_stack.extend(indexes);
            }
            if frame.rule.borrow().has_constraint(ConstraintType::Key) {
                self.validate_key_constraint(&key_index_stack, &frame.value, &frame.rule)?;
            }
            if frame.rule.borrow().has_dependency_definitions() {
                self.validate_dependencies(&frame.value, &frame.rule)?;
            }
            let children = frame.value.children_snapshot();
            stack.push(Pass2Frame {
                value: frame.value,
                rule: frame.rule,
                added_indexes: frame.added_indexes,
                is_exit: true,
            });
            for child in children.into_iter().rev() {
                if child.is_default_value() {
                    // Materialized defaults are not configured values.
                    continue;
                }
                let Some(child_rule) = child.validation_rule() else {
                    continue;
                };
                if child_rule.borrow().rule_type() == RuleType::NotValidated {
                    continue;
                }
                stack.push(Pass2Frame {
                    value: child,
                    rule: child_rule,
                    added_indexes: 0,
                    is_exit: false,
                });
            }
        }
        Ok(())
    }

    /// Builds the key indexes of a section; only named indexes are kept for
    /// key-constraint lookups.
    fn build_key_indexes(&self, value: &ValueRef, rule: &RuleRef) -> Result<Vec<KeyIndex>> {
        let definitions = rule.borrow().key_definitions().to_vec();
        let mut result = Vec::new();
        for definition in &definitions {
            let index = self.build_key_index_and_validate_uniqueness(value, definition)?;
            if !index.name().is_empty() {
                result.push(index);
            }
        }
        Ok(result)
    }

    fn build_key_index_and_validate_uniqueness(
        &self,
        value: &ValueRef,
        definition: &KeyDefinition,
    ) -> Result<KeyIndex> {
        let mut list_path = NamePath::root();
        let mut value_paths: Vec<NamePath> = Vec::new();
        for key in &definition.keys {
            let Some(entry_index) = key.find_regular(reserved::ENTRY) else {
                return Err(Error::internal("A key path without 'vr_entry' survived validation"));
            };
            let new_list_path = key.prefix(entry_index);
            if list_path.is_empty() {
                list_path = new_list_path;
            } else if list_path != new_list_path {
                return Err(Error::internal("Key paths of one definition name different lists"));
            }
            let value_path = key.suffix_from(entry_index + 1);
            if value_path.is_empty() {
                return Err(Error::internal("A key path without a value part survived validation"));
            }
            value_paths.push(value_path);
        }
        let mut index = KeyIndex::new(
            definition.name.clone(),
            definition.case_sensitivity,
            value_paths.len(),
        );
        // A missing or differently-typed list leaves the index empty.
        let Some(list_value) = value.value(&list_path) else {
            return Ok(index);
        };
        if list_value.value_type() != ValueType::SectionList {
            return Ok(index);
        }
        for entry in list_value.children_snapshot() {
            let mut components = Vec::with_capacity(value_paths.len());
            let mut any_component = false;
            for value_path in &value_paths {
                let component = entry
                    .value(value_path)
                    .and_then(|component| component.to_text_representation());
                match component {
                    Some(text) => {
                        components.push(text);
                        any_component = true;
                    }
                    None => components.push(String::new()),
                }
            }
            if !any_component {
                // Entries without any key component are not indexed.
                continue;
            }
            if !index.try_add_key(&components) {
                if value_paths.len() == 1 {
                    return Err(attach_to_value(
                        Error::validation(format!(
                            "The key '{}' is not unique in the list '{}'. Found a duplicate",
                            value_paths[0],
                            list_value.name_path()
                        )),
                        &entry,
                    ));
                }
                let joined = value_paths
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("', '");
                return Err(attach_to_value(
                    Error::validation(format!(
                        "The combined keys '{joined}' are not unique in the list '{}'. \
                         Found a duplicate",
                        list_value.name_path()
                    )),
                    &entry,
                ));
            }
        }
        Ok(index)
    }

    /// Resolves a key constraint against the named indexes in scope,
    /// searching the stack from the innermost section outward.
    fn validate_key_constraint(
        &self,
        key_index_stack: &[KeyIndex],
        value: &ValueRef,
        rule: &RuleRef,
    ) -> Result<()> {
        let Some(tested_key) = value.to_text_representation() else {
            return Err(Error::internal(
                "A key constraint on a value that is neither text nor integer",
            ));
        };
        let constraint = {
            let rule_view = rule.borrow();
            rule_view
                .constraint(ConstraintType::Key)
                .cloned()
                .ok_or_else(|| Error::internal("Missing key constraint"))?
        };
        let Some(references) = constraint.key_references() else {
            return Err(Error::internal("A key constraint without references"));
        };
        let mut found = false;
        for reference in references {
            let Some(reference_name) = reference.first() else {
                return Err(Error::internal("An empty key reference survived validation"));
            };
            let Some(index) = key_index_stack
                .iter()
                .rev()
                .find(|index| index.name() == reference_name)
            else {
                return Err(Error::internal("Missing key index for a validated reference"));
            };
            let matches = match reference.at(1).and_then(Name::as_index) {
                Some(column) => index.has_component(&tested_key, column),
                None => index.has_key(&tested_key),
            };
            if matches {
                found = true;
                break;
            }
        }
        let satisfied = if constraint.is_negated() { !found } else { found };
        if satisfied {
            return Ok(());
        }
        let message = constraint
            .custom_error()
            .map(str::to_owned)
            .or_else(|| rule.borrow().custom_error().map(str::to_owned))
            .unwrap_or_else(|| {
                if constraint.is_negated() {
                    "This value must not refer to an existing key".to_owned()
                } else {
                    "This value must refer to an existing key, but no matching entry was found"
                        .to_owned()
                }
            });
        Err(attach_to_value(Error::validation(message), value))
    }

    /// Evaluates the dependency definitions of a section.
    ///
    /// A path counts as configured only when the resolved value exists and
    /// is not a materialized default.
    fn validate_dependencies(&self, value: &ValueRef, rule: &RuleRef) -> Result<()> {
        let definitions = rule.borrow().dependency_definitions().to_vec();
        for dependency in &definitions {
            let is_configured = |path: &NamePath| {
                value
                    .value(path)
                    .is_some_and(|resolved| !resolved.is_default_value())
            };
            let has_source = dependency.sources.iter().any(|path| is_configured(path));
            let has_target = dependency.targets.iter().any(|path| is_configured(path));
            if dependency.mode.is_satisfied(has_source, has_target) {
                continue;
            }
            let message = match &dependency.error_message {
                Some(custom) => custom.clone(),
                None => default_dependency_message(dependency),
            };
            return Err(attach_to_value(Error::validation(message), value));
        }
        Ok(())
    }
}

/// Builds the mode-specific default message of a failed dependency.
fn default_dependency_message(dependency: &DependencyDefinition) -> String {
    match dependency.mode {
        DependencyMode::If => format!(
            "If {} is configured, you must also configure {}",
            paths_or(&dependency.sources, false),
            paths_or(&dependency.targets, false)
        ),
        DependencyMode::IfNot => format!(
            "If {} is configured, you must {}",
            paths_or(&dependency.sources, false),
            paths_or(&dependency.targets, true)
        ),
        DependencyMode::Or => {
            let mut all_paths = dependency.sources.clone();
            all_paths.extend(dependency.targets.iter().cloned());
            format!("You must configure {}", paths_or(&all_paths, false))
        }
        DependencyMode::Xor => format!(
            "You must either configure {} or configure {}",
            paths_or(&dependency.sources, false),
            paths_or(&dependency.targets, false)
        ),
        DependencyMode::Xnor => format!(
            "You must configure {} and configure {}, or none of them",
            paths_or(&dependency.sources, false),
            paths_or(&dependency.targets, false)
        ),
        DependencyMode::And => format!(
            "You must configure {} and configure {}",
            paths_or(&dependency.sources, false),
            paths_or(&dependency.targets, false)
        ),
    }
}

/// Renders a path list for dependency messages ("'a', 'b', or 'c'").
fn paths_or(paths: &[NamePath], for_negation: bool) -> String {
    let mut result = String::new();
    if paths.len() > 1 {
        result.push_str(if for_negation {
            "configure none of "
        } else {
            "at least one of "
        });
    } else if for_negation {
        result.push_str("not configure ");
    }
    result.push('\'');
    for (i, path) in paths.iter().enumerate() {
        result.push_str(&path.to_text());
        if i + 2 == paths.len() {
            result.push_str("', or '");
        } else if i + 1 < paths.len() {
            result.push_str("', '");
        }
    }
    result.push('\'');
    result
}

/// Describes the parent context for missing-value messages.
fn parent_location_text(value: &ValueRef) -> String {
    if value.is_document() {
        return "the document root".to_owned();
    }
    if value.value_type() == ValueType::SectionWithTexts {
        return format!("the section with texts '{}'", value.name_path());
    }
    format!("the section '{}'", value.name_path())
}

#[cfg(test)]
mod tests;
