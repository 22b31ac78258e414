/// The rules compiler: lifts a parsed rules document into a rule tree.
///
/// A rules document is itself a configuration document. The compiler walks
/// it depth-first in declaration order, skipping the `vr_template` subtree
/// (templates are expanded on demand at their use sites) and the entries of
/// `vr_key` and `vr_dependency` sections (their parents consume them). Each
/// visited node becomes a rule, a name-constraint rule, a key definition,
/// or a dependency definition.
///
/// Attribute and constraint entries are dispatched through a handler table
/// keyed by the entry's base name. A `not_` prefix negates a constraint and
/// an `<name>_error` sibling attaches a custom message to it.
use crate::constraint::{
    BoundValue, Constraint, ConstraintKind, EqualsValue, InValues, MultipleValue,
    check_bound_supported, check_equals_supported, check_in_supported, check_multiple_supported,
    check_text_only, compile_match_pattern, in_values_have_duplicates,
};
use crate::char_ranges::CharRanges;
use crate::error::{Error, Result};
use crate::name::{Name, reserved};
use crate::name_path::NamePath;
use crate::rule::{
    CaseSensitivity, DependencyDefinition, DependencyMode, KeyDefinition, Rule, RuleRef, RuleType,
    attach_constraint,
};
use crate::rules::Rules;
use crate::value::{ValueRef, ValueType, walk_tree};
use crate::version_mask::VersionMask;

/// Attaches a node's path and location to an error that lacks a location.
fn attach_to_value(error: Error, node: &ValueRef) -> Error {
    if error.has_location() {
        return error;
    }
    error.with_name_path_and_location(node.name_path(), node.location())
}

// ---------------------------------------------------------------------------
// Handler table
// ---------------------------------------------------------------------------

/// The context passed to each constraint or attribute handler.
struct HandlerContext<'a> {
    /// The rule the entry belongs to.
    rule: &'a RuleRef,
    /// The entry value carrying the constraint or attribute payload.
    node: &'a ValueRef,
    /// `true` when the entry was spelled with a `not_` prefix.
    negated: bool,
}

type HandlerFn = fn(&HandlerContext<'_>) -> Result<Option<ConstraintKind>>;

/// One entry of the constraint-handler table.
struct ConstraintHandler {
    name: &'static str,
    handler: HandlerFn,
    accepts_not: bool,
    accepts_error: bool,
}

/// All recognized constraint and attribute entries, by base name.
const CONSTRAINT_HANDLERS: &[ConstraintHandler] = &[
    ConstraintHandler { name: "chars", handler: handle_chars, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "contains", handler: handle_contains, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "default", handler: handle_default, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "description", handler: handle_description, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "ends", handler: handle_ends, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "equals", handler: handle_equals, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "error", handler: handle_error, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "in", handler: handle_in, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "is_optional", handler: handle_is_optional, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "is_secret", handler: handle_is_secret, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "key", handler: handle_key, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "matches", handler: handle_matches, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "maximum", handler: handle_maximum, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "maximum_version", handler: handle_maximum_version, accepts_not: true, accepts_error: false },
    ConstraintHandler { name: "minimum", handler: handle_minimum, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "minimum_version", handler: handle_minimum_version, accepts_not: true, accepts_error: false },
    ConstraintHandler { name: "multiple", handler: handle_multiple, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "starts", handler: handle_starts, accepts_not: true, accepts_error: true },
    ConstraintHandler { name: "title", handler: handle_title, accepts_not: false, accepts_error: false },
    ConstraintHandler { name: "version", handler: handle_version, accepts_not: true, accepts_error: false },
];

fn resolve_constraint_handler(name: &str) -> Result<&'static ConstraintHandler> {
    CONSTRAINT_HANDLERS
        .iter()
        .find(|handler| handler.name == name)
        .ok_or_else(|| Error::validation(format!("Unknown constraint: {name}")))
}

// ---------------------------------------------------------------------------
// RulesFromDocument
// ---------------------------------------------------------------------------

/// The compiler state for one rules document.
pub(crate) struct RulesFromDocument<'a> {
    /// The rule set being filled.
    rules: &'a Rules,
    /// The rules document being read.
    document: ValueRef,
    /// The use-site path that replaces `vr_template.<name>` while a template
    /// is expanded. Doubles as the in-template flag.
    path_for_template: Option<NamePath>,
}

impl<'a> RulesFromDocument<'a> {
    /// Creates a compiler for the given rule set and document.
    pub(crate) fn new(rules: &'a Rules, document: &ValueRef) -> Self {
        Self {
            rules,
            document: document.clone(),
            path_for_template: None,
        }
    }

    /// Reads all rules from the document.
    pub(crate) fn read(&mut self) -> Result<()> {
        if !self.rules.is_empty() {
            return Err(Error::validation(
                "Rules from a document can only be read into an empty rule-set",
            ));
        }
        if !self.document.is_document() {
            return Err(Error::validation(
                "Validation rules must be read from a document root",
            ));
        }
        let document = self.document.clone();
        walk_tree(&document, rules_document_filter, |node| {
            if node.is_document() {
                return Ok(());
            }
            self.process_document_node(node)
        })
    }

    fn process_document_node(&mut self, node: &ValueRef) -> Result<()> {
        self.process_document_node_inner(node)
            .map_err(|error| attach_to_value(error, node))
    }

    fn process_document_node_inner(&mut self, node: &ValueRef) -> Result<()> {
        if node.is_document() {
            return Err(Error::internal(
                "Document nodes are not allowed in validation rules",
            ));
        }
        if node.value_type() == ValueType::SectionWithTexts {
            return Err(Error::validation(
                "Section with texts is not allowed in a validation rules document",
            ));
        }
        let name_path = node.name_path();
        if name_path.is_empty() {
            return Err(Error::internal("Expected a non-empty name path for a node"));
        }
        if name_path.contains_text() {
            return Err(Error::validation(
                "Text names are not allowed in a validation rules document",
            ));
        }
        let name = node.name();
        if name.is(reserved::TEMPLATE) {
            // The template subtree is filtered out of the walk, so any
            // remaining occurrence is a definition below the document root.
            return Err(Error::validation("Templates must be defined in the document root"));
        }
        if name.is(reserved::NAME) {
            return self.process_name_node(node);
        }
        if name.is(reserved::DEPENDENCY) {
            return self.process_dependencies(node);
        }
        if name.is(reserved::KEY) {
            return self.process_key(node);
        }
        if name.is(reserved::ENTRY)
            || name.is(reserved::ANY)
            || !name.is_reserved()
            || name.is_escaped_reserved()
        {
            return self.process_regular_node(node);
        }
        Err(Error::validation("Unknown reserved name"))
    }

    // -- regular rules ------------------------------------------------------

    fn process_regular_node(&mut self, node: &ValueRef) -> Result<()> {
        let rule = Rule::new_ref(RuleType::Section);
        {
            let mut new_rule = rule.borrow_mut();
            new_rule.location = node.location();
            new_rule.rule_name_path = self.create_rule_name_path(&node.name_path());
            new_rule.target_name_path = self.create_target_name_path(&node.name_path());
        }
        // Attach early so descendants of this node find their parent rule.
        self.rules.add_rule(&rule)?;
        if node.value_type() == ValueType::SectionList {
            // A section list in a rules document declares alternatives; the
            // walker turns each entry into one alternative rule.
            rule.borrow_mut().rule_type = RuleType::Alternatives;
            return Ok(());
        }
        if node.value_type() == ValueType::IntermediateSection {
            // An undeclared ancestor becomes a plain section rule.
            rule.borrow_mut().rule_type = RuleType::Section;
            return Ok(());
        }
        self.process_node_rules(node, &rule)
    }

    fn process_node_rules(&mut self, node: &ValueRef, rule: &RuleRef) -> Result<()> {
        if node.value_type() != ValueType::SectionWithNames {
            return Err(Error::internal("Expected a section with names node"));
        }
        self.handle_type_or_template(node, rule)?;
        let is_template_alternatives = rule.borrow().rule_type() == RuleType::Alternatives
            && node.child_named("use_template").is_some();
        if is_template_alternatives {
            for child in node.children_snapshot() {
                if !child.name().is("use_template") {
                    return Err(Error::validation(
                        "Templates that define alternatives cannot be customized \
                         at the usage location",
                    ));
                }
            }
            return Ok(());
        }
        handle_case_sensitive(node, rule)?;
        self.process_common_node_rules(node, rule)
    }

    fn handle_type_or_template(&mut self, node: &ValueRef, rule: &RuleRef) -> Result<()> {
        if let Some(type_value) = node.child_named("type") {
            let Some(type_text) = type_value.as_text() else {
                return Err(attach_to_value(
                    Error::validation("The 'type' value must be a text"),
                    &type_value,
                ));
            };
            let Some(rule_type) = RuleType::from_text(type_text) else {
                return Err(attach_to_value(
                    Error::validation("Unknown rule type"),
                    &type_value,
                ));
            };
            if let Some(use_template) = node.child_named("use_template") {
                if !use_template.value_type().is_structural() {
                    return Err(Error::validation(
                        "The section cannot have both a 'type' and a 'use_template' value",
                    ));
                }
            }
            rule.borrow_mut().rule_type = rule_type;
            return Ok(());
        }
        if let Some(use_template) = node.child_named("use_template") {
            return self.process_template(node, &use_template, rule);
        }
        Err(Error::validation(
            "The section must have either a 'type' or a 'use_template' value",
        ))
    }

    // -- templates ----------------------------------------------------------

    fn process_template(
        &mut self,
        node: &ValueRef,
        use_template_value: &ValueRef,
        rule: &RuleRef,
    ) -> Result<()> {
        self.process_template_inner(node, use_template_value, rule)
            .map_err(|error| attach_to_value(error, use_template_value))
    }

    fn process_template_inner(
        &mut self,
        node: &ValueRef,
        use_template_value: &ValueRef,
        rule: &RuleRef,
    ) -> Result<()> {
        let Some(template_name_text) = use_template_value.as_text() else {
            return Err(Error::validation("The 'use_template' value must be a text"));
        };
        if self.path_for_template.is_some() {
            return Err(Error::validation(
                "You must not use 'use_template' in template definitions",
            ));
        }
        let template_name = Name::regular(template_name_text).map_err(|error| {
            Error::validation(format!(
                "The name specified in 'use_template' is not a valid template name: {}",
                error.message()
            ))
        })?;
        let template_path = NamePath::from_names(vec![
            Name::regular_lossy(reserved::TEMPLATE),
            template_name,
        ]);
        let Some(template_node) = self.document.value(&template_path) else {
            return Err(Error::validation(
                "The template referenced by 'use_template' does not exist",
            ));
        };
        if template_node.value_type() != ValueType::SectionWithNames
            && template_node.value_type() != ValueType::SectionList
        {
            return Err(Error::validation(
                "Template definitions must be sections or section lists",
            ));
        }
        self.path_for_template = Some(node.name_path());
        if template_node.value_type() == ValueType::SectionList {
            rule.borrow_mut().rule_type = RuleType::Alternatives;
        } else {
            self.process_node_rules(&template_node, rule)?;
        }
        // Re-emit the template's descendants under the use-site path.
        let template_root = template_node.clone();
        walk_tree(&template_node, structural_node_filter, |visited| {
            if std::rc::Rc::ptr_eq(visited, &template_root) {
                // The template root is already merged into the current rule.
                return Ok(());
            }
            self.process_document_node(visited)
        })?;
        self.path_for_template = None;
        Ok(())
    }

    // -- name-constraint rules ----------------------------------------------

    fn process_name_node(&mut self, node: &ValueRef) -> Result<()> {
        let rule = Rule::new_ref(RuleType::Text);
        {
            let mut new_rule = rule.borrow_mut();
            new_rule.location = node.location();
            new_rule.rule_name_path = self.create_rule_name_path(&node.name_path());
            new_rule.target_name_path = self.create_target_name_path(&node.name_path());
        }
        self.rules.add_rule(&rule)?;
        if node.value_type() == ValueType::SectionList {
            return Err(Error::validation(
                "Name node-rules definitions cannot be alternatives",
            ));
        }
        if node.value_type() == ValueType::IntermediateSection {
            return Err(Error::validation(
                "A name node-rules definition must not have subsections",
            ));
        }
        self.process_name_node_rules(node, &rule)
    }

    fn process_name_node_rules(&mut self, node: &ValueRef, rule: &RuleRef) -> Result<()> {
        if node.value_type() != ValueType::SectionWithNames {
            return Err(Error::internal("Expected a section with names node"));
        }
        if let Some(type_value) = node.child_named("type") {
            let Some(type_text) = type_value.as_text() else {
                return Err(attach_to_value(
                    Error::validation("The 'type' value must be a text"),
                    &type_value,
                ));
            };
            if RuleType::from_text(type_text) != Some(RuleType::Text) {
                return Err(attach_to_value(
                    Error::validation("Name node-rules must have a 'type' value of 'text'"),
                    &type_value,
                ));
            }
        }
        if node.child_named("use_template").is_some() {
            return Err(Error::validation(
                "Name node-rules cannot have a 'use_template' value",
            ));
        }
        handle_case_sensitive(node, rule)?;
        self.process_common_node_rules(node, rule)
    }

    // -- constraint and attribute entries ------------------------------------

    fn process_common_node_rules(&mut self, node: &ValueRef, rule: &RuleRef) -> Result<()> {
        let mut custom_errors: Vec<(String, String)> = Vec::new();
        for child in node.children_snapshot() {
            self.process_rule_entry(&mut custom_errors, rule, &child)
                .map_err(|error| attach_to_value(error, &child))?;
        }
        for (name, message) in custom_errors {
            let mut rule_mut = rule.borrow_mut();
            let Some(constraint) = rule_mut.constraint_named_mut(&name) else {
                return Err(Error::validation(format!(
                    "There is no constraint '{name}' for the custom error message '{name}_error'"
                )));
            };
            constraint.set_custom_error(message);
        }
        Ok(())
    }

    fn process_rule_entry(
        &mut self,
        custom_errors: &mut Vec<(String, String)>,
        rule: &RuleRef,
        value: &ValueRef,
    ) -> Result<()> {
        if value.value_type().is_structural() {
            if rule.borrow().rule_name().is(reserved::NAME) {
                return Err(Error::validation("A 'vr_name' section cannot have subsections"));
            }
            // Subsections and section lists become their own rules through
            // the walker.
            return Ok(());
        }
        let name = value.name();
        let Some(name_text) = name.as_regular().map(str::to_owned) else {
            return Err(Error::validation("Unexpected element in a node-rules definition"));
        };
        if name.is("type") || name.is("use_template") || name.is("case_sensitive") {
            return Ok(());
        }
        self.handle_constraint_and_attributes(custom_errors, rule, value, &name_text)
    }

    fn handle_constraint_and_attributes(
        &mut self,
        custom_errors: &mut Vec<(String, String)>,
        rule: &RuleRef,
        value: &ValueRef,
        name_text: &str,
    ) -> Result<()> {
        if let Some(base) = name_text.strip_suffix("_error") {
            let lookup = base.strip_prefix("not_").unwrap_or(base);
            let handler = resolve_constraint_handler(lookup)?;
            if !handler.accepts_error {
                return Err(Error::validation(format!(
                    "'{base}' does not accept '_error' suffixes"
                )));
            }
            let Some(message) = value.as_text() else {
                return Err(Error::validation(format!(
                    "The '{name_text}' value must be a text"
                )));
            };
            custom_errors.push((base.to_owned(), message.to_owned()));
            return Ok(());
        }
        let negated = name_text.starts_with("not_");
        let lookup = name_text.strip_prefix("not_").unwrap_or(name_text);
        let handler = resolve_constraint_handler(lookup)?;
        if negated && !handler.accepts_not {
            return Err(Error::validation(format!(
                "'{name_text}' does not accept 'not_' prefixes"
            )));
        }
        let context = HandlerContext {
            rule,
            node: value,
            negated,
        };
        let Some(kind) = (handler.handler)(&context)? else {
            return Ok(());
        };
        let mut constraint = Constraint::new(kind, name_text, negated);
        constraint.set_location(value.location());
        let from_template = value
            .name_path()
            .first()
            .is_some_and(|first| first.is(reserved::TEMPLATE));
        constraint.set_from_template(from_template);
        attach_constraint(rule, constraint)
    }

    // -- key definitions ----------------------------------------------------

    fn process_key(&mut self, node: &ValueRef) -> Result<()> {
        if node.value_type() != ValueType::SectionList {
            return Err(Error::validation(
                "Key 'vr_key' node-rules definitions must be section lists",
            ));
        }
        let parent_rule = self.parent_rule_for_node(node)?;
        for entry in node.children_snapshot() {
            let mut name = Name::empty();
            if let Some(name_value) = entry.child_named("name") {
                let Some(name_text) = name_value.as_text() else {
                    return Err(Error::validation(
                        "The 'name' in 'vr_key' must be a text value with a regular name",
                    ));
                };
                name = Name::regular(name_text).map_err(|error| {
                    attach_to_value(
                        Error::validation(format!(
                            "The 'name' in 'vr_key' is not a valid regular name: {}",
                            error.message()
                        )),
                        &name_value,
                    )
                })?;
            }
            let Some(key_value) = entry.child_named("key") else {
                return Err(Error::validation("A 'vr_key' definition must have a 'key' value"));
            };
            let key_entries = key_value.list_entries();
            if key_entries.is_empty() {
                return Err(Error::validation(
                    "The 'key' in 'vr_key' must be either a text value or a list of text values",
                ));
            }
            if key_entries.len() > 10 {
                return Err(Error::validation(
                    "This implementation does not support more than 10 'key' paths in one 'vr_key'",
                ));
            }
            let mut keys = Vec::with_capacity(key_entries.len());
            for key_entry in &key_entries {
                let Some(key_text) = key_entry.as_text() else {
                    return Err(attach_to_value(
                        Error::validation(format!(
                            "Expected one or more text values in 'key' of 'vr_key', but got {}",
                            key_entry.value_type().description()
                        )),
                        key_entry,
                    ));
                };
                let key_path = NamePath::from_text(key_text).map_err(|error| {
                    attach_to_value(
                        Error::validation(format!(
                            "A name path in 'key' in 'vr_key' is not valid: {}",
                            error.message()
                        )),
                        key_entry,
                    )
                })?;
                keys.push(key_path);
            }
            let mut case_sensitivity = CaseSensitivity::Insensitive;
            if let Some(case_value) = entry.child_named("case_sensitive") {
                let Some(flag) = case_value.as_boolean() else {
                    return Err(Error::validation("The 'case_sensitive' value must be boolean"));
                };
                if flag {
                    case_sensitivity = CaseSensitivity::Sensitive;
                }
            }
            for extra in entry.children_snapshot() {
                let extra_name = extra.name();
                if !extra_name.is("key") && !extra_name.is("name") && !extra_name.is("case_sensitive")
                {
                    return Err(attach_to_value(
                        Error::validation("Unexpected element in 'vr_key'"),
                        &extra,
                    ));
                }
            }
            parent_rule.borrow_mut().key_definitions.push(KeyDefinition {
                name,
                keys,
                case_sensitivity,
                location: entry.location(),
            });
        }
        Ok(())
    }

    // -- dependency definitions ---------------------------------------------

    fn process_dependencies(&mut self, node: &ValueRef) -> Result<()> {
        if node.value_type() != ValueType::SectionList {
            return Err(Error::validation(
                "Dependency 'vr_dependency' node-rules definitions must be section lists",
            ));
        }
        let parent_rule = self.parent_rule_for_node(node)?;
        for entry in node.children_snapshot() {
            if entry.value_type() != ValueType::SectionWithNames {
                return Err(Error::validation(
                    "Dependency definitions must be sections with regular names",
                ));
            }
            let mut mode = None;
            let mut sources = None;
            let mut targets = None;
            let mut error_message = None;
            for child in entry.children_snapshot() {
                process_dependency_entry(
                    &child,
                    &mut mode,
                    &mut sources,
                    &mut targets,
                    &mut error_message,
                )
                .map_err(|error| attach_to_value(error, &child))?;
            }
            let Some(mode) = mode else {
                return Err(Error::validation(
                    "A 'vr_dependency' definition must have a 'mode' value",
                ));
            };
            let Some(sources) = sources else {
                return Err(Error::validation(
                    "A 'vr_dependency' definition must have a 'source' value",
                ));
            };
            let Some(targets) = targets else {
                return Err(Error::validation(
                    "A 'vr_dependency' definition must have a 'target' value",
                ));
            };
            parent_rule
                .borrow_mut()
                .dependency_definitions
                .push(DependencyDefinition {
                    mode,
                    sources,
                    targets,
                    error_message,
                    location: entry.location(),
                });
        }
        Ok(())
    }

    // -- path handling ------------------------------------------------------

    /// Returns the rule whose children the given definition node belongs to.
    fn parent_rule_for_node(&self, node: &ValueRef) -> Result<RuleRef> {
        let rule_path = self.create_rule_name_path(&node.name_path());
        if rule_path.is_empty() {
            return Err(Error::internal("Expected a parent rule for a definition node"));
        }
        if rule_path.len() == 1 {
            return Ok(self.rules.root());
        }
        self.rules
            .rule_for_name_path(&rule_path, rule_path.len() - 1)
            .ok_or_else(|| Error::internal("Expected a parent rule for a definition node"))
    }

    /// Builds the rule path of a node: the document path, with an initial
    /// `vr_template.<name>` replaced by the template use-site path.
    fn create_rule_name_path(&self, name_path: &NamePath) -> NamePath {
        let Some(template_path) = &self.path_for_template else {
            return name_path.clone();
        };
        if !is_template_path(name_path) {
            return name_path.clone();
        }
        let mut result = template_path.clone();
        for name in name_path.iter().skip(2) {
            result.push(name.clone());
        }
        result
    }

    /// Builds the target path of a node: indexes dropped, template prefixes
    /// substituted, and `vr_vr_` escapes unescaped.
    fn create_target_name_path(&self, name_path: &NamePath) -> NamePath {
        let mut result = NamePath::root();
        let mut start_index = 0;
        if is_template_path(name_path) {
            if let Some(template_path) = &self.path_for_template {
                append_regular_names(&mut result, template_path, 0);
                start_index = 2;
            }
        }
        append_regular_names(&mut result, name_path, start_index);
        result
    }
}

/// Tests whether a document path points into the template section.
fn is_template_path(name_path: &NamePath) -> bool {
    name_path
        .first()
        .is_some_and(|first| first.is(reserved::TEMPLATE))
}

/// Appends the regular names of `name_path` (from `start_index` on) to
/// `result`, unescaping `vr_vr_` prefixes.
fn append_regular_names(result: &mut NamePath, name_path: &NamePath, start_index: usize) {
    for i in start_index..name_path.len() {
        let Some(name) = name_path.at(i) else {
            continue;
        };
        if !name.is_regular() {
            continue;
        }
        if name.is_escaped_reserved() {
            result.push(name.with_reserved_prefix_removed());
        } else {
            result.push(name.clone());
        }
    }
}

/// The walk filter shared by the main pass and template expansion: skip the
/// entries of `vr_key`/`vr_dependency` (their parents consume them); visit
/// sections and section lists.
fn structural_node_filter(node: &ValueRef) -> bool {
    if node.name().is_index() {
        let Some(parent) = node.parent() else {
            return false;
        };
        let parent_name = parent.name();
        if parent_name.is(reserved::KEY) || parent_name.is(reserved::DEPENDENCY) {
            return false;
        }
    }
    node.value_type().is_map() || node.value_type() == ValueType::SectionList
}

/// The walk filter for a rules document: additionally skips the template
/// section, which is expanded on demand at its use sites.
fn rules_document_filter(node: &ValueRef) -> bool {
    if !node.is_document() && is_template_path(&node.name_path()) {
        return false;
    }
    structural_node_filter(node)
}

/// Handles the optional `case_sensitive` attribute of a node.
fn handle_case_sensitive(node: &ValueRef, rule: &RuleRef) -> Result<()> {
    let Some(value) = node.child_named("case_sensitive") else {
        return Ok(());
    };
    let Some(flag) = value.as_boolean() else {
        return Err(attach_to_value(
            Error::validation("The 'case_sensitive' value must be boolean"),
            &value,
        ));
    };
    rule.borrow_mut().case_sensitivity = if flag {
        CaseSensitivity::Sensitive
    } else {
        CaseSensitivity::Insensitive
    };
    Ok(())
}

/// Parses one entry of a dependency definition.
fn process_dependency_entry(
    child: &ValueRef,
    mode: &mut Option<DependencyMode>,
    sources: &mut Option<Vec<NamePath>>,
    targets: &mut Option<Vec<NamePath>>,
    error_message: &mut Option<String>,
) -> Result<()> {
    let name = child.name();
    if name.is("mode") {
        let Some(mode_text) = child.as_text() else {
            return Err(Error::validation(
                "The 'mode' value in 'vr_dependency' must be a text value",
            ));
        };
        let Some(parsed) = DependencyMode::from_text(mode_text) else {
            return Err(Error::validation(
                "The 'mode' value in 'vr_dependency' must be one of: \
                 'if', 'if_not', 'or', 'xor', 'xnor', 'and'",
            ));
        };
        *mode = Some(parsed);
        return Ok(());
    }
    if name.is("source") || name.is("target") {
        let field = if name.is("source") { "source" } else { "target" };
        let Some(path_texts) = child.text_items() else {
            return Err(Error::validation(format!(
                "The '{field}' value in 'vr_dependency' must be one or more text values"
            )));
        };
        if path_texts.is_empty() {
            return Err(Error::validation(format!(
                "The '{field}' value in 'vr_dependency' must be one or more text values"
            )));
        }
        if path_texts.len() > 10 {
            return Err(Error::validation(format!(
                "This implementation does not support more than 10 '{field}' paths \
                 in one 'vr_dependency'"
            )));
        }
        let mut paths = Vec::with_capacity(path_texts.len());
        for path_text in &path_texts {
            let path = NamePath::from_text(path_text).map_err(|_| {
                Error::validation(format!(
                    "A name path in '{field}' in 'vr_dependency' is not valid"
                ))
            })?;
            paths.push(path);
        }
        if name.is("source") {
            *sources = Some(paths);
        } else {
            *targets = Some(paths);
        }
        return Ok(());
    }
    if name.is("error") {
        let Some(message) = child.as_text() else {
            return Err(Error::validation(
                "The 'error' value in 'vr_dependency' must be a text value",
            ));
        };
        *error_message = Some(message.to_owned());
        return Ok(());
    }
    Err(Error::validation("Unexpected element in 'vr_dependency'"))
}

// ---------------------------------------------------------------------------
// Constraint handlers
// ---------------------------------------------------------------------------

fn entry_name(context: &HandlerContext<'_>) -> String {
    context.node.name().to_string()
}

fn handle_minimum(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    min_max_kind(context, true)
}

fn handle_maximum(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    min_max_kind(context, false)
}

fn min_max_kind(context: &HandlerContext<'_>, is_minimum: bool) -> Result<Option<ConstraintKind>> {
    let rule_type = context.rule.borrow().rule_type();
    let name = entry_name(context);
    let bound = bound_value_for(context, rule_type, &name)?;
    check_bound_supported(rule_type, &bound, &name)?;
    Ok(Some(if is_minimum {
        ConstraintKind::Minimum(bound)
    } else {
        ConstraintKind::Maximum(bound)
    }))
}

/// Reads the bound payload matching the rule type.
fn bound_value_for(
    context: &HandlerContext<'_>,
    rule_type: RuleType,
    name: &str,
) -> Result<BoundValue> {
    let node = context.node;
    let mismatch = |expected: &str| {
        Error::validation(format!(
            "The '{name}' constraint for the '{}' rule must be {expected}",
            rule_type.to_text()
        ))
    };
    match rule_type {
        RuleType::Integer
        | RuleType::Text
        | RuleType::Bytes
        | RuleType::ValueList
        | RuleType::Section
        | RuleType::SectionList
        | RuleType::SectionWithTexts => node
            .as_integer()
            .map(BoundValue::Integer)
            .ok_or_else(|| mismatch("an integer value")),
        RuleType::Float => node
            .as_float()
            .map(BoundValue::Float)
            .ok_or_else(|| mismatch("a floating-point value")),
        RuleType::Date => node
            .as_date()
            .map(BoundValue::Date)
            .ok_or_else(|| mismatch("a date value")),
        RuleType::DateTime => node
            .as_date_time()
            .map(BoundValue::DateTime)
            .ok_or_else(|| mismatch("a date-time value")),
        RuleType::ValueMatrix => {
            if let Some(pair) = node.integer_items() {
                if pair.len() == 2 {
                    return Ok(BoundValue::Matrix(pair[0], pair[1]));
                }
            }
            Err(Error::validation(format!(
                "The '{name}' constraint for a value matrix must be a list \
                 with two integer values"
            )))
        }
        RuleType::Boolean
        | RuleType::Time
        | RuleType::TimeDelta
        | RuleType::Regex
        | RuleType::Value
        | RuleType::Alternatives
        | RuleType::NotValidated => Err(Error::validation(format!(
            "The '{name}' constraint is not supported for '{}' rules",
            rule_type.to_text()
        ))),
    }
}

fn handle_equals(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let rule_type = context.rule.borrow().rule_type();
    let node = context.node;
    let name = entry_name(context);
    let value = match rule_type {
        RuleType::Integer => EqualsValue::Integer(node.as_integer().ok_or_else(|| {
            Error::validation("The 'equals' constraint for an integer rule must be an integer")
        })?),
        RuleType::Float => EqualsValue::Float(node.as_float().ok_or_else(|| {
            Error::validation("The 'equals' constraint for a float rule must be a float")
        })?),
        RuleType::Text => {
            if let Some(text) = node.as_text() {
                EqualsValue::Text(text.to_owned())
            } else if let Some(integer) = node.as_integer() {
                EqualsValue::Integer(integer)
            } else {
                return Err(Error::validation(
                    "The 'equals' constraint for a text rule must be a text or integer",
                ));
            }
        }
        RuleType::Bytes => {
            if let Some(bytes) = node.as_bytes() {
                EqualsValue::Bytes(bytes)
            } else if let Some(integer) = node.as_integer() {
                EqualsValue::Integer(integer)
            } else {
                return Err(Error::validation(
                    "The 'equals' constraint for a bytes rule must be a byte sequence or integer",
                ));
            }
        }
        RuleType::Boolean => EqualsValue::Boolean(node.as_boolean().ok_or_else(|| {
            Error::validation("The 'equals' constraint for a boolean rule must be a boolean")
        })?),
        RuleType::ValueList => EqualsValue::Integer(node.as_integer().ok_or_else(|| {
            Error::validation("The 'equals' constraint for a value list must be an integer")
        })?),
        RuleType::ValueMatrix => {
            if let Some(pair) = node.integer_items() {
                if pair.len() == 2 {
                    EqualsValue::Matrix(pair[0], pair[1])
                } else {
                    return Err(Error::validation(
                        "The 'equals' constraint for a value matrix must be a list \
                         with two integer values",
                    ));
                }
            } else {
                return Err(Error::validation(
                    "The 'equals' constraint for a value matrix must be a list \
                     with two integer values",
                ));
            }
        }
        RuleType::Section | RuleType::SectionList | RuleType::SectionWithTexts => {
            EqualsValue::Integer(node.as_integer().ok_or_else(|| {
                Error::validation(
                    "The 'equals' constraint for a section or section list must be an integer",
                )
            })?)
        }
        RuleType::Date
        | RuleType::Time
        | RuleType::DateTime
        | RuleType::TimeDelta
        | RuleType::Regex
        | RuleType::Value
        | RuleType::Alternatives
        | RuleType::NotValidated => {
            return Err(Error::validation(format!(
                "The '{name}' constraint is not supported for '{}' rules",
                rule_type.to_text()
            )));
        }
    };
    check_equals_supported(rule_type, &value, &name)?;
    Ok(Some(ConstraintKind::Equals(value)))
}

fn handle_in(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let rule_type = context.rule.borrow().rule_type();
    let node = context.node;
    let name = entry_name(context);
    let empty_error = || {
        Error::validation(format!(
            "The '{name}' constraint must specify a single {} value or a list of {} values",
            rule_type.to_text(),
            rule_type.to_text()
        ))
    };
    let values = match rule_type {
        RuleType::Integer => InValues::Integers(node.integer_items().ok_or_else(empty_error)?),
        RuleType::Float => InValues::Floats(node.float_items().ok_or_else(empty_error)?),
        RuleType::Text => InValues::Texts(node.text_items().ok_or_else(empty_error)?),
        RuleType::Bytes => InValues::ByteSequences(node.bytes_items().ok_or_else(empty_error)?),
        RuleType::Boolean
        | RuleType::Date
        | RuleType::Time
        | RuleType::DateTime
        | RuleType::TimeDelta
        | RuleType::Regex
        | RuleType::Value
        | RuleType::ValueList
        | RuleType::ValueMatrix
        | RuleType::Section
        | RuleType::SectionList
        | RuleType::SectionWithTexts
        | RuleType::Alternatives
        | RuleType::NotValidated => {
            return Err(Error::validation(format!(
                "The '{name}' constraint is not supported for '{}' rules",
                rule_type.to_text()
            )));
        }
    };
    let is_empty = match &values {
        InValues::Integers(list) => list.is_empty(),
        InValues::Floats(list) => list.is_empty(),
        InValues::Texts(list) => list.is_empty(),
        InValues::ByteSequences(list) => list.is_empty(),
    };
    if is_empty {
        return Err(empty_error());
    }
    let case_sensitivity = context.rule.borrow().case_sensitivity();
    if in_values_have_duplicates(&values, case_sensitivity) {
        return Err(Error::validation(format!(
            "The '{name}' list must not contain duplicate values"
        )));
    }
    check_in_supported(rule_type, &values, &name)?;
    Ok(Some(ConstraintKind::In(values)))
}

fn handle_multiple(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let rule_type = context.rule.borrow().rule_type();
    let node = context.node;
    let name = entry_name(context);
    let integer_divisor = |subject: &str| -> Result<MultipleValue> {
        let Some(divisor) = node.as_integer() else {
            return Err(Error::validation(format!(
                "The 'multiple' constraint for {subject} must be an integer"
            )));
        };
        if divisor == 0 {
            return Err(Error::validation("The 'multiple' divisor must not be zero"));
        }
        Ok(MultipleValue::Integer(divisor))
    };
    let divisor = match rule_type {
        RuleType::Integer => integer_divisor("an integer rule")?,
        RuleType::Float => {
            let Some(divisor) = node.as_float() else {
                return Err(Error::validation(
                    "The 'multiple' constraint for a float rule must be a float",
                ));
            };
            if divisor.abs() <= f64::EPSILON {
                return Err(Error::validation("The 'multiple' divisor must not be zero"));
            }
            MultipleValue::Float(divisor)
        }
        RuleType::Text => integer_divisor("a text rule")?,
        RuleType::Bytes => integer_divisor("a bytes rule")?,
        RuleType::ValueList => integer_divisor("a value list")?,
        RuleType::ValueMatrix => {
            let pair = node.integer_items().filter(|items| items.len() == 2);
            let Some(pair) = pair else {
                return Err(Error::validation(
                    "The 'multiple' constraint for a value matrix must be a list \
                     with two integer values",
                ));
            };
            if pair[0] == 0 || pair[1] == 0 {
                return Err(Error::validation("The 'multiple' divisors must not be zero"));
            }
            MultipleValue::Matrix(pair[0], pair[1])
        }
        RuleType::Section | RuleType::SectionList | RuleType::SectionWithTexts => {
            integer_divisor("a section or section list")?
        }
        RuleType::Boolean
        | RuleType::Date
        | RuleType::Time
        | RuleType::DateTime
        | RuleType::TimeDelta
        | RuleType::Regex
        | RuleType::Value
        | RuleType::Alternatives
        | RuleType::NotValidated => {
            return Err(Error::validation(format!(
                "The '{name}' constraint is not supported for '{}' rules",
                rule_type.to_text()
            )));
        }
    };
    check_multiple_supported(rule_type, &divisor, &name)?;
    Ok(Some(ConstraintKind::Multiple(divisor)))
}

fn handle_chars(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let name = entry_name(context);
    check_text_only(context.rule.borrow().rule_type(), &name)?;
    let Some(expressions) = context.node.text_items() else {
        return Err(Error::validation(format!(
            "The '{name}' constraint must specify a single text value or a list of texts"
        )));
    };
    if expressions.is_empty() {
        return Err(Error::validation(format!(
            "The '{name}' constraint must specify a single text value or a list of texts"
        )));
    }
    let ranges = CharRanges::parse_expressions(&expressions)?;
    Ok(Some(ConstraintKind::Chars(ranges)))
}

fn handle_starts(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    Ok(Some(ConstraintKind::Starts(text_part_values(context)?)))
}

fn handle_ends(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    Ok(Some(ConstraintKind::Ends(text_part_values(context)?)))
}

fn handle_contains(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    Ok(Some(ConstraintKind::Contains(text_part_values(context)?)))
}

fn text_part_values(context: &HandlerContext<'_>) -> Result<Vec<String>> {
    let name = entry_name(context);
    check_text_only(context.rule.borrow().rule_type(), &name)?;
    let values = context.node.text_items().filter(|items| !items.is_empty());
    values.ok_or_else(|| {
        Error::validation(format!(
            "The '{name}' constraint must specify a single text value or a list of texts"
        ))
    })
}

fn handle_matches(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    if context.rule.borrow().rule_type() != RuleType::Text {
        return Err(Error::validation(
            "The 'matches' constraint can only be used on text rules",
        ));
    }
    let Some(regex_value) = context.node.as_regex() else {
        return Err(Error::validation(
            "The 'matches' constraint requires a regular expression value",
        ));
    };
    if regex_value.pattern().is_empty() {
        return Err(Error::validation(
            "The regular expression in a 'matches' constraint cannot be empty",
        ));
    }
    let pattern = compile_match_pattern(regex_value.pattern(), regex_value.is_multi_line())?;
    Ok(Some(ConstraintKind::Matches(pattern)))
}

fn handle_key(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let node = context.node;
    let type_error = || {
        Error::validation(
            "The 'key' value must be a text or a list of text with the referenced keys",
        )
    };
    if node.value_type() != ValueType::Text && node.value_type() != ValueType::ValueList {
        return Err(type_error());
    }
    let mut references = Vec::new();
    for reference_value in node.list_entries() {
        let Some(reference_text) = reference_value.as_text() else {
            return Err(type_error());
        };
        let reference = NamePath::from_text(reference_text).map_err(|error| {
            attach_to_value(
                Error::validation(format!(
                    "Invalid name-path for key reference: {}",
                    error.message()
                )),
                &reference_value,
            )
        })?;
        references.push(reference);
    }
    // The references are resolved during definition validation.
    Ok(Some(ConstraintKind::Key(references)))
}

// ---------------------------------------------------------------------------
// Attribute handlers
// ---------------------------------------------------------------------------

fn handle_default(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let rule_type = context.rule.borrow().rule_type();
    if !rule_type.accepts_defaults() {
        return Err(Error::validation(format!(
            "A default value cannot be used for '{}' node rules",
            rule_type.to_text()
        )));
    }
    if !rule_type.matches_value_type(context.node.value_type()) {
        return Err(Error::validation(format!(
            "The 'default' value must be {}",
            rule_type.expected_text()
        )));
    }
    context.rule.borrow_mut().default_value = Some(context.node.deep_copy());
    Ok(None)
}

fn handle_title(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(text) = context.node.as_text() else {
        return Err(Error::validation("The 'title' value must be a text"));
    };
    context.rule.borrow_mut().title = Some(text.to_owned());
    Ok(None)
}

fn handle_description(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(text) = context.node.as_text() else {
        return Err(Error::validation("The 'description' value must be text"));
    };
    context.rule.borrow_mut().description = Some(text.to_owned());
    Ok(None)
}

fn handle_error(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(text) = context.node.as_text() else {
        return Err(Error::validation("The 'error' value must be text"));
    };
    context.rule.borrow_mut().custom_error = Some(text.to_owned());
    Ok(None)
}

fn handle_is_optional(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(flag) = context.node.as_boolean() else {
        return Err(Error::validation("The 'is_optional' value must be boolean"));
    };
    context.rule.borrow_mut().is_optional = flag;
    Ok(None)
}

fn handle_is_secret(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(flag) = context.node.as_boolean() else {
        return Err(Error::validation("The 'is_secret' value must be boolean"));
    };
    context.rule.borrow_mut().is_secret = flag;
    Ok(None)
}

fn handle_version(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let Some(versions) = context.node.integer_items().filter(|items| !items.is_empty()) else {
        return Err(Error::validation("The 'version' value must be one or more integers"));
    };
    let mut unsigned = Vec::with_capacity(versions.len());
    for version in &versions {
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
    let mut mask = VersionMask::from_versions(&unsigned);
    if context.negated {
        mask = !mask;
    }
    context.rule.borrow_mut().limit_version_mask(&mask);
    Ok(None)
}

fn handle_minimum_version(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let version = bounded_version(context.node, "minimum_version")?;
    let mut mask = VersionMask::from_range(version, None);
    if context.negated {
        mask = !mask;
    }
    context.rule.borrow_mut().limit_version_mask(&mask);
    Ok(None)
}

fn handle_maximum_version(context: &HandlerContext<'_>) -> Result<Option<ConstraintKind>> {
    let version = bounded_version(context.node, "maximum_version")?;
    let mut mask = VersionMask::from_range(0, Some(version));
    if context.negated {
        mask = !mask;
    }
    context.rule.borrow_mut().limit_version_mask(&mask);
    Ok(None)
}

fn bounded_version(node: &ValueRef, entry: &str) -> Result<u64> {
    let Some(version) = node.as_integer() else {
        return Err(Error::validation(format!(
            "The '{entry}' value must be an integer"
        )));
    };
    u64::try_from(version).map_err(|_| {
        Error::validation(format!("The '{entry}' value must be non-negative"))
    })
}
