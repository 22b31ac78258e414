#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_support::{document, integer, list_entry, section, section_list, text};
use crate::value::Value;

#[test]
fn builds_a_rule_tree_without_a_document() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule("server", RuleType::Section, vec![])
        .expect("section rule");
    builder
        .add_rule(
            "server.port",
            RuleType::Integer,
            vec![Attribute::minimum(1), Attribute::maximum(65534)],
        )
        .expect("port rule");
    let rules = builder.take_rules().expect("valid definition");
    assert!(rules.is_definition_validated());

    let config = document(vec![section("server", vec![integer("port", 8080)])]);
    rules.validate(&config, 0).expect("port in range");

    let config = document(vec![section("server", vec![integer("port", 0)])]);
    let error = rules.validate(&config, 0).expect_err("port out of range");
    assert_eq!(error.message(), "The value must be at least 1");
}

#[test]
fn attributes_apply_eagerly_and_type_check() {
    let mut builder = RulesBuilder::new();
    let error = builder
        .add_rule(
            "port",
            RuleType::Integer,
            vec![Attribute::chars(&["(a-z)"])],
        )
        .expect_err("chars on an integer rule");
    assert_eq!(
        error.message(),
        "The 'chars' constraint is not supported for 'integer' rules"
    );
}

#[test]
fn invalid_paths_are_rejected() {
    let mut builder = RulesBuilder::new();
    let error = builder
        .add_rule("server.\"text\"", RuleType::Integer, vec![])
        .expect_err("text segment");
    assert!(error.message().contains("Text names or indexes are not allowed"));
    let error = builder
        .add_rule("server[0]", RuleType::Integer, vec![])
        .expect_err("index segment");
    assert!(error.message().contains("Text names or indexes are not allowed"));
}

#[test]
fn negation_and_custom_errors_attach_to_constraints() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule(
            "port",
            RuleType::Integer,
            vec![
                Attribute::in_integers(vec![0, 22])
                    .negated()
                    .with_error("This port is reserved"),
            ],
        )
        .expect("negated in constraint");
    let rules = builder.take_rules().expect("valid definition");

    let config = document(vec![integer("port", 22)]);
    let error = rules.validate(&config, 0).expect_err("reserved port");
    assert_eq!(error.message(), "This port is reserved");

    let config = document(vec![integer("port", 8080)]);
    rules.validate(&config, 0).expect("unreserved port");
}

#[test]
fn plain_attributes_reject_negation_and_errors() {
    let mut builder = RulesBuilder::new();
    let error = builder
        .add_rule(
            "port",
            RuleType::Integer,
            vec![Attribute::title("Port").negated()],
        )
        .expect_err("negated title");
    assert_eq!(error.message(), "'title' does not accept 'not_' prefixes");

    let error = builder
        .add_rule(
            "port",
            RuleType::Integer,
            vec![Attribute::minimum_version(2).with_error("nope")],
        )
        .expect_err("error on version attribute");
    assert_eq!(
        error.message(),
        "'minimum_version' does not accept '_error' suffixes"
    );
}

#[test]
fn alternatives_are_registered_one_by_one() {
    let mut builder = RulesBuilder::new();
    builder
        .add_alternative(
            "bind",
            RuleType::Text,
            vec![Attribute::default_value(Value::text("0.0.0.0:8080"))],
        )
        .expect("text alternative");
    builder
        .add_alternative("bind", RuleType::Integer, vec![])
        .expect("integer alternative");
    let rules = builder.take_rules().expect("valid definition");

    let config = document(vec![]);
    rules.validate(&config, 0).expect("default inserted");
    let bind = config.child_named("bind").expect("bind value");
    assert_eq!(bind.as_text(), Some("0.0.0.0:8080"));
    assert!(bind.is_default_value());
}

#[test]
fn default_values_must_match_the_rule_type() {
    let mut builder = RulesBuilder::new();
    let error = builder
        .add_rule(
            "host",
            RuleType::Text,
            vec![Attribute::default_value(Value::integer(1))],
        )
        .expect_err("wrong default type");
    assert!(error.message().contains("'default' value must be a text value"));

    let error = builder
        .add_rule(
            "server",
            RuleType::Section,
            vec![Attribute::default_value(Value::section_with_names())],
        )
        .expect_err("defaults on sections");
    assert!(error.message().contains("cannot be used for 'section' node rules"));
}

#[test]
fn version_attributes_narrow_the_mask() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule(
            "legacy",
            RuleType::Text,
            vec![Attribute::optional(), Attribute::maximum_version(1)],
        )
        .expect("legacy rule");
    builder
        .add_rule(
            "skipped",
            RuleType::Text,
            vec![Attribute::optional(), Attribute::versions(vec![2]).negated()],
        )
        .expect("excluded version");
    let rules = builder.take_rules().expect("valid definition");

    let root = rules.root();
    let legacy = root
        .borrow()
        .child_named("legacy")
        .expect("legacy rule");
    assert!(legacy.borrow().version_mask().matches(1));
    assert!(!legacy.borrow().version_mask().matches(2));
    let skipped = root
        .borrow()
        .child_named("skipped")
        .expect("skipped rule");
    assert!(!skipped.borrow().version_mask().matches(2));
    assert!(skipped.borrow().version_mask().matches(3));
}

#[test]
fn take_rules_resets_the_builder() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule("port", RuleType::Integer, vec![])
        .expect("port rule");
    let rules = builder.take_rules().expect("valid definition");
    assert!(!rules.is_empty());

    // The builder starts over; taking again yields an empty set.
    let fresh = builder.take_rules().expect("empty set validates");
    assert!(fresh.is_empty());
}

#[test]
fn reset_discards_pending_rules() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule("port", RuleType::Integer, vec![])
        .expect("port rule");
    builder.reset();
    let rules = builder.take_rules().expect("empty set");
    assert!(rules.is_empty());
}

#[test]
fn builder_definitions_run_the_same_checks_as_documents() {
    let mut builder = RulesBuilder::new();
    builder
        .add_rule(
            "host",
            RuleType::Text,
            vec![
                Attribute::optional(),
                Attribute::default_value(Value::text("localhost")),
            ],
        )
        .expect("attributes apply eagerly");
    let error = builder.take_rules().expect_err("default plus optional");
    assert!(
        error
            .message()
            .contains("may not be both optional and have a default value")
    );
}

#[test]
fn builder_and_document_produce_equivalent_rules() {
    let rules_doc = document(vec![section_list(
        "limit",
        vec![
            list_entry(vec![text("type", "integer"), integer("minimum", 10)]),
            list_entry(vec![text("type", "text")]),
        ],
    )]);
    let from_document = crate::rules::Rules::create_from_document(&rules_doc)
        .expect("document rules");

    let mut builder = RulesBuilder::new();
    builder
        .add_alternative("limit", RuleType::Integer, vec![Attribute::minimum(10)])
        .expect("integer alternative");
    builder
        .add_alternative("limit", RuleType::Text, vec![])
        .expect("text alternative");
    let from_builder = builder.take_rules().expect("builder rules");

    for config in [
        document(vec![integer("limit", 50)]),
        document(vec![text("limit", "none")]),
    ] {
        from_document.validate(&config, 0).expect("document rules accept");
        from_builder.validate(&config, 0).expect("builder rules accept");
    }
    let config = document(vec![integer("limit", 5)]);
    let document_error = from_document.validate(&config, 0).expect_err("rejected");
    let builder_error = from_builder.validate(&config, 0).expect_err("rejected");
    assert_eq!(document_error.message(), builder_error.message());
}
