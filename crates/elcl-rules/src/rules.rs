/// The rule-set container and public entry point for validation.
///
/// A [`Rules`] value holds the root of a rule tree (always a Section rule
/// with an empty path), accepts rules from the compiler or the builder, and
/// validates configuration documents against the finished set. Definition
/// validation runs once per modification and is tracked here.
use std::cell::Cell;

use crate::definition::DefinitionValidator;
use crate::error::{Error, Result};
use crate::from_document::RulesFromDocument;
use crate::name::Name;
use crate::name_path::NamePath;
use crate::rule::{Rule, RuleRef, RuleType, add_child_rule};
use crate::validator::DocumentValidator;
use crate::value::ValueRef;

/// A set of validation rules.
#[derive(Debug)]
pub struct Rules {
    /// The root rule. Always a Section rule with no constraints.
    root: RuleRef,
    /// Whether the current definition has passed validation.
    definition_validated: Cell<bool>,
}

impl Rules {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self {
            root: Rule::new_ref(RuleType::Section),
            definition_validated: Cell::new(false),
        }
    }

    /// Reads and validates rules from a parsed rules document.
    ///
    /// # Errors
    ///
    /// Returns a validation error for any problem in the document or in the
    /// resulting rule definition.
    pub fn create_from_document(document: &ValueRef) -> Result<Self> {
        let rules = Self::new();
        RulesFromDocument::new(&rules, document).read()?;
        rules.validate_definition()?;
        Ok(rules)
    }

    /// Validates a configuration document against these rules.
    ///
    /// On success the document carries rule annotations and materialized
    /// defaults. On failure the document is left partially annotated; run
    /// the validation again after fixing the input.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure in declaration order.
    pub fn validate(&self, value: &ValueRef, version: i64) -> Result<()> {
        if !value.is_document() && !value.is_section_with_names() {
            return Err(Error::validation(
                "The value to validate must be a document or a section with names",
            ));
        }
        DocumentValidator::new(&self.root, value, version).validate()
    }

    /// Returns `true` if no rules are defined.
    pub fn is_empty(&self) -> bool {
        self.root.borrow().is_empty()
    }

    /// Returns `true` if the current definition has passed validation.
    pub fn is_definition_validated(&self) -> bool {
        self.definition_validated.get()
    }

    /// Returns the root rule.
    pub fn root(&self) -> RuleRef {
        self.root.clone()
    }

    /// Adds a rule, attaching it to the parent its rule path names.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the parent rule does not exist and an
    /// internal error for an empty rule path.
    pub(crate) fn add_rule(&self, rule: &RuleRef) -> Result<()> {
        let parent = self.parent_for(rule)?;
        add_child_rule(&parent, rule);
        self.definition_validated.set(false);
        Ok(())
    }

    /// Adds a rule as an alternative.
    ///
    /// If no rule exists at the path yet, an Alternatives rule is created
    /// there first; the given rule is then appended under a synthetic index
    /// name.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the parent does not exist or the
    /// path is already taken by a non-alternative rule.
    pub(crate) fn add_alternative_rule(&self, rule: &RuleRef) -> Result<()> {
        let parent = self.parent_for(rule)?;
        let path = rule.borrow().rule_name_path().clone();
        let last_name = path.last().cloned().ok_or_else(|| {
            Error::internal("The name path of a rule must not be empty")
        })?;
        let existing_child = parent.borrow().child(&last_name);
        let alternatives = match existing_child {
            Some(existing) => {
                if existing.borrow().rule_type() != RuleType::Alternatives {
                    return Err(Error::validation(format!(
                        "Adding a rule failed, because the rule '{path}' already exists \
                         and is no alternative rule"
                    )));
                }
                existing
            }
            None => {
                let created = Rule::new_ref(RuleType::Alternatives);
                {
                    let mut created_rule = created.borrow_mut();
                    created_rule.rule_name_path = path.clone();
                    created_rule.target_name_path = path.clone();
                }
                add_child_rule(&parent, &created);
                created
            }
        };
        let index = alternatives.borrow().children().len();
        {
            let mut new_rule = rule.borrow_mut();
            new_rule.rule_name_path = path.joined(Name::index(index));
        }
        add_child_rule(&alternatives, rule);
        self.definition_validated.set(false);
        Ok(())
    }

    /// Resolves the parent rule for a new rule from its rule path.
    fn parent_for(&self, rule: &RuleRef) -> Result<RuleRef> {
        let path = rule.borrow().rule_name_path().clone();
        if path.is_empty() {
            return Err(Error::internal("The name path of a rule must not be empty"));
        }
        if path.len() == 1 {
            return Ok(self.root.clone());
        }
        self.rule_for_name_path(&path, path.len() - 1).ok_or_else(|| {
            let last = path.last().cloned().unwrap_or_else(Name::empty);
            Error::validation(format!(
                "Adding a rule failed, because the parent rule for rule '{last}' does not exist"
            ))
        })
    }

    /// Returns the rule at the given path, descending at most `max_depth`
    /// names. A `max_depth` of zero searches the whole path.
    pub fn rule_for_name_path(&self, path: &NamePath, max_depth: usize) -> Option<RuleRef> {
        if path.is_empty() {
            return None;
        }
        let depth = if max_depth == 0 {
            path.len()
        } else {
            max_depth.min(path.len())
        };
        let mut current = self.root.clone();
        for i in 0..depth {
            let next = current.borrow().child(path.at(i)?)?;
            current = next;
        }
        Some(current)
    }

    /// Validates the rule definition itself.
    ///
    /// Idempotent: once validated, repeated calls are no-ops until the set
    /// is modified again.
    ///
    /// # Errors
    ///
    /// Returns a validation error localized at the offending rule.
    pub fn validate_definition(&self) -> Result<()> {
        if self.definition_validated.get() {
            return Ok(());
        }
        DefinitionValidator::new(&self.root).validate()?;
        self.definition_validated.set(true);
        Ok(())
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}
