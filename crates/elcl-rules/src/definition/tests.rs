#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use crate::rules::Rules;
use crate::test_support::{
    boolean, document, integer, intermediate, list_entry, section, section_list, text,
};

fn compile_error(rules_doc: &crate::value::ValueRef) -> Error {
    Rules::create_from_document(rules_doc).expect_err("definition must be rejected")
}

#[test]
fn section_list_requires_a_section_entry() {
    let rules_doc = document(vec![section(
        "filter",
        vec![text("type", "section_list")],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("must have a 'vr_entry'"));

    let rules_doc = document(vec![section(
        "filter",
        vec![
            text("type", "section_list"),
            section("vr_entry", vec![text("type", "integer")]),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("'section' or 'section_with_texts'"));
}

#[test]
fn section_list_rejects_extra_children() {
    let rules_doc = document(vec![section(
        "filter",
        vec![
            text("type", "section_list"),
            section("vr_entry", vec![text("type", "section")]),
            section("extra", vec![text("type", "text")]),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("only 'vr_entry' is permitted"));
}

#[test]
fn list_entries_may_not_be_optional_or_defaulted() {
    let rules_doc = document(vec![section(
        "ports",
        vec![
            text("type", "value_list"),
            section(
                "vr_entry",
                vec![text("type", "integer"), boolean("is_optional", true)],
            ),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("cannot be optional"));

    let rules_doc = document(vec![section(
        "ports",
        vec![
            text("type", "value_list"),
            section(
                "vr_entry",
                vec![text("type", "integer"), integer("default", 8)],
            ),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("may not have a default value"));
}

#[test]
fn value_list_entries_must_be_scalar() {
    let rules_doc = document(vec![section(
        "ports",
        vec![
            text("type", "value_list"),
            section("vr_entry", vec![text("type", "section")]),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("Expected a scalar value type"));
}

#[test]
fn value_list_requires_an_entry() {
    let rules_doc = document(vec![section(
        "ports",
        vec![text("type", "value_list")],
    )]);
    let error = compile_error(&rules_doc);
    assert!(
        error
            .message()
            .contains("A value list or matrix rule must have a 'vr_entry'")
    );
}

#[test]
fn alternatives_limits_on_optional_and_default() {
    let rules_doc = document(vec![section_list(
        "bind",
        vec![
            list_entry(vec![text("type", "text")]),
            list_entry(vec![text("type", "integer"), boolean("is_optional", true)]),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("Only the first alternative may be marked as optional"));

    let rules_doc = document(vec![section_list(
        "bind",
        vec![
            list_entry(vec![text("type", "text"), text("default", "a")]),
            list_entry(vec![text("type", "integer"), integer("default", 1)]),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("Only one alternative may have a default value"));
}

#[test]
fn any_rule_may_not_be_optional_or_defaulted() {
    let rules_doc = document(vec![intermediate(
        "plugins",
        vec![section(
            "vr_any",
            vec![text("type", "text"), boolean("is_optional", true)],
        )],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("'vr_any' rule cannot be set optional"));

    let rules_doc = document(vec![intermediate(
        "plugins",
        vec![section(
            "vr_any",
            vec![text("type", "text"), text("default", "x")],
        )],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("'vr_any' rule cannot have a default value"));
}

#[test]
fn default_and_optional_are_mutually_exclusive() {
    let rules_doc = document(vec![section(
        "host",
        vec![
            text("type", "text"),
            text("default", "localhost"),
            boolean("is_optional", true),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(
        error
            .message()
            .contains("may not be both optional and have a default value")
    );
}

#[test]
fn secret_marker_is_scalar_only() {
    let rules_doc = document(vec![section(
        "server",
        vec![text("type", "section"), boolean("is_secret", true)],
    )]);
    let error = compile_error(&rules_doc);
    assert!(
        error
            .message()
            .contains("'is_secret' marker can only be used for scalar value types")
    );
}

#[test]
fn minimum_must_not_exceed_maximum() {
    let rules_doc = document(vec![section(
        "port",
        vec![
            text("type", "integer"),
            integer("minimum", 10),
            integer("maximum", 5),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(
        error
            .message()
            .contains("'minimum' constraint value must be less than or equal to")
    );
}

#[test]
fn negated_bounds_skip_the_relation_check() {
    let rules_doc = document(vec![section(
        "port",
        vec![
            text("type", "integer"),
            integer("not_minimum", 10),
            integer("maximum", 5),
        ],
    )]);
    Rules::create_from_document(&rules_doc).expect("negated bounds are unordered");
}

// -- key definitions --------------------------------------------------------

fn filter_list_rule() -> crate::value::ValueRef {
    section(
        "filter",
        vec![
            text("type", "section_list"),
            section(
                "vr_entry",
                vec![
                    text("type", "section"),
                    section("identifier", vec![text("type", "text")]),
                    section("priority", vec![text("type", "integer")]),
                    section("comment", vec![text("type", "section")]),
                ],
            ),
        ],
    )
}

fn key_doc(key_paths: &[&str]) -> crate::value::ValueRef {
    let mut entry = vec![text("name", "filter")];
    if key_paths.len() == 1 {
        entry.push(text("key", key_paths[0]));
    } else {
        entry.push(crate::test_support::text_list("key", key_paths));
    }
    document(vec![
        section_list("vr_key", vec![list_entry(entry)]),
        filter_list_rule(),
    ])
}

#[test]
fn key_paths_must_pass_through_a_section_list() {
    let error = compile_error(&key_doc(&["filter.identifier"]));
    assert!(error.message().contains("'vr_entry' is missing in the key path"));

    let error = compile_error(&key_doc(&["vr_entry.identifier"]));
    assert!(error.message().contains("No list is named in front of the 'vr_entry'"));

    let error = compile_error(&key_doc(&["missing.vr_entry.identifier"]));
    assert!(error.message().contains("does not point to a section list"));

    let error = compile_error(&key_doc(&["filter.vr_entry"]));
    assert!(error.message().contains("has no value path after 'vr_entry'"));

    let error = compile_error(&key_doc(&["filter.vr_entry.x.vr_entry.y"]));
    assert!(error.message().contains("nested section list"));

    let error = compile_error(&key_doc(&["filter.vr_entry.missing"]));
    assert!(error.message().contains("does not point to a validated value"));

    let error = compile_error(&key_doc(&["filter.vr_entry.comment"]));
    assert!(error.message().contains("does not point to a text or integer value"));

    Rules::create_from_document(&key_doc(&["filter.vr_entry.identifier"]))
        .expect("valid key path");
    Rules::create_from_document(&key_doc(&[
        "filter.vr_entry.identifier",
        "filter.vr_entry.priority",
    ]))
    .expect("valid composite key");
}

#[test]
fn key_definition_names_must_be_unique() {
    let rules_doc = document(vec![
        section_list(
            "vr_key",
            vec![
                list_entry(vec![
                    text("name", "filter"),
                    text("key", "filter.vr_entry.identifier"),
                ]),
                list_entry(vec![
                    text("name", "filter"),
                    text("key", "filter.vr_entry.priority"),
                ]),
            ],
        ),
        filter_list_rule(),
    ]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("must have a unique name"));
}

#[test]
fn composite_keys_must_share_one_list() {
    let rules_doc = document(vec![
        section_list(
            "vr_key",
            vec![list_entry(vec![
                text("name", "mixed"),
                crate::test_support::text_list(
                    "key",
                    &["filter.vr_entry.identifier", "other.vr_entry.identifier"],
                ),
            ])],
        ),
        filter_list_rule(),
        section(
            "other",
            vec![
                text("type", "section_list"),
                section(
                    "vr_entry",
                    vec![
                        text("type", "section"),
                        section("identifier", vec![text("type", "text")]),
                    ],
                ),
            ],
        ),
    ]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("must point to the same section list"));
}

// -- key references ---------------------------------------------------------

fn key_reference_doc(reference: &[&str], value_type: &str) -> crate::value::ValueRef {
    let key_entry = if reference.len() == 1 {
        text("key", reference[0])
    } else {
        crate::test_support::text_list("key", reference)
    };
    document(vec![
        section_list(
            "vr_key",
            vec![list_entry(vec![
                text("name", "filter"),
                crate::test_support::text_list(
                    "key",
                    &["filter.vr_entry.identifier", "filter.vr_entry.priority"],
                ),
            ])],
        ),
        filter_list_rule(),
        intermediate(
            "app",
            vec![section(
                "start_filter",
                vec![text("type", value_type), key_entry],
            )],
        ),
    ])
}

#[test]
fn key_references_resolve_against_enclosing_definitions() {
    // A whole-composite reference is only valid on text rules.
    Rules::create_from_document(&key_reference_doc(&["filter"], "text"))
        .expect("text rule may reference the whole composite");
    let error = compile_error(&key_reference_doc(&["filter"], "integer"));
    assert!(
        error
            .message()
            .contains("multi-key index as a whole must be of type 'text'")
    );

    // A column reference must match the column's type.
    Rules::create_from_document(&key_reference_doc(&["filter[1]"], "integer"))
        .expect("integer rule may reference the integer column");
    let error = compile_error(&key_reference_doc(&["filter[1]"], "text"));
    assert!(error.message().contains("must be of the same type"));

    // Out-of-range columns are rejected.
    let error = compile_error(&key_reference_doc(&["filter[2]"], "text"));
    assert!(error.message().contains("out of bounds"));

    // Unknown definitions are rejected.
    let error = compile_error(&key_reference_doc(&["unknown"], "text"));
    assert!(error.message().contains("was not found in the scope"));

    // Duplicate references are rejected.
    let error = compile_error(&key_reference_doc(&["filter", "filter"], "text"));
    assert!(error.message().contains("must be unique"));
}

#[test]
fn key_references_are_limited_to_text_and_integer_rules() {
    let rules_doc = document(vec![
        section_list(
            "vr_key",
            vec![list_entry(vec![
                text("name", "filter"),
                text("key", "filter.vr_entry.identifier"),
            ])],
        ),
        filter_list_rule(),
        section(
            "flag",
            vec![text("type", "boolean"), text("key", "filter")],
        ),
    ]);
    let error = compile_error(&rules_doc);
    assert!(
        error
            .message()
            .contains("Key references can only be used on text or integer values")
    );
}

// -- dependencies -----------------------------------------------------------

fn dependency_doc(source: &str, target: &str, optional_leaf: bool) -> crate::value::ValueRef {
    document(vec![intermediate(
        "server",
        vec![
            section(
                "hostname",
                vec![text("type", "text"), boolean("is_optional", optional_leaf)],
            ),
            section(
                "ip_address",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "xor"),
                    text("source", source),
                    text("target", target),
                ])],
            ),
        ],
    )])
}

#[test]
fn dependency_paths_must_resolve_and_be_unique() {
    Rules::create_from_document(&dependency_doc("hostname", "ip_address", true))
        .expect("valid dependency");

    let error = compile_error(&dependency_doc("missing", "ip_address", true));
    assert!(error.message().contains("does not point to a validated value"));

    let error = compile_error(&dependency_doc("hostname", "hostname", true));
    assert!(error.message().contains("must be unique"));
}

#[test]
fn dependency_paths_require_an_optional_or_defaulted_chain() {
    let error = compile_error(&dependency_doc("hostname", "ip_address", false));
    assert!(
        error
            .message()
            .contains("neither optional nor has a default value")
    );
}

#[test]
fn dependency_paths_may_not_enter_section_lists() {
    let rules_doc = document(vec![intermediate(
        "server",
        vec![
            filter_list_rule(),
            section(
                "flag",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "if"),
                    text("source", "flag"),
                    text("target", "filter.vr_entry.identifier"),
                ])],
            ),
        ],
    )]);
    let error = compile_error(&rules_doc);
    assert!(error.message().contains("points to a value in a section list"));
}

#[test]
fn defaulted_chains_also_satisfy_dependencies() {
    let rules_doc = document(vec![intermediate(
        "server",
        vec![
            section(
                "hostname",
                vec![text("type", "text"), text("default", "localhost")],
            ),
            section(
                "ip_address",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "if"),
                    text("source", "hostname"),
                    text("target", "ip_address"),
                ])],
            ),
        ],
    )]);
    Rules::create_from_document(&rules_doc).expect("defaulted source is acceptable");
}
