#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use crate::rules::Rules;
use crate::test_support::{
    boolean, document, integer, intermediate, list_entry, section, section_list, text, text_list,
    value_list,
};
use crate::value::Value;

fn compile(rules_doc: &ValueRef) -> Rules {
    Rules::create_from_document(rules_doc).expect("valid rules document")
}

fn port_rules() -> Rules {
    compile(&document(vec![intermediate(
        "server",
        vec![section(
            "port",
            vec![
                text("type", "integer"),
                integer("minimum", 1),
                integer("maximum", 65534),
            ],
        )],
    )]))
}

fn port_document(port: ValueRef) -> ValueRef {
    port.set_name(crate::name::Name::regular_lossy("port"));
    document(vec![section("server", vec![port])])
}

// -- scenario: integer bounds -----------------------------------------------

#[test]
fn integer_bounds_accept_values_in_range() {
    let rules = port_rules();
    let config = port_document(Value::integer(8080));
    rules.validate(&config, 0).expect("port in range");
    let port = config
        .value(&NamePath::from_text("server.port").expect("path"))
        .expect("port value");
    assert!(port.validation_rule().is_some());
}

#[test]
fn integer_bounds_reject_values_below_minimum() {
    let rules = port_rules();
    let config = port_document(Value::integer(0));
    let error = rules.validate(&config, 0).expect_err("port out of range");
    assert_eq!(error.message(), "The value must be at least 1");
    assert_eq!(
        error.name_path().map(NamePath::to_text),
        Some("server.port".to_owned())
    );
}

#[test]
fn type_mismatches_name_expected_and_actual() {
    let rules = port_rules();
    let config = port_document(Value::text("text"));
    let error = rules.validate(&config, 0).expect_err("wrong type");
    assert_eq!(
        error.message(),
        "Expected an integer value but got a text value"
    );
}

#[test]
fn unexpected_values_are_rejected() {
    let rules = port_rules();
    let config = document(vec![section(
        "server",
        vec![integer("port", 8080), integer("extra", 1)],
    )]);
    let error = rules.validate(&config, 0).expect_err("unexpected value");
    assert_eq!(
        error.message(),
        "Found an unexpected integer value in this document"
    );
}

#[test]
fn missing_values_name_the_context_and_type() {
    let rules = port_rules();
    let config = document(vec![section("server", vec![])]);
    let error = rules.validate(&config, 0).expect_err("missing port");
    assert_eq!(
        error.message(),
        "In the section 'server', expected an integer value with the name 'port'"
    );

    let rules = compile(&document(vec![section(
        "port",
        vec![text("type", "integer")],
    )]));
    let error = rules
        .validate(&document(vec![]), 0)
        .expect_err("missing at root");
    assert_eq!(
        error.message(),
        "In the document root, expected an integer value with the name 'port'"
    );
}

// -- custom errors ----------------------------------------------------------

#[test]
fn custom_errors_replace_constraint_messages() {
    let rules = compile(&document(vec![section(
        "port",
        vec![
            text("type", "integer"),
            integer("minimum", 1024),
            text("minimum_error", "Use an unprivileged port"),
        ],
    )]));
    let config = document(vec![integer("port", 80)]);
    let error = rules.validate(&config, 0).expect_err("below minimum");
    assert_eq!(error.message(), "Use an unprivileged port");
}

#[test]
fn rule_errors_apply_when_the_constraint_has_none() {
    let rules = compile(&document(vec![section(
        "port",
        vec![
            text("type", "integer"),
            integer("minimum", 1024),
            text("error", "The port setting is invalid"),
        ],
    )]));
    let config = document(vec![integer("port", 80)]);
    let error = rules.validate(&config, 0).expect_err("below minimum");
    assert_eq!(error.message(), "The port setting is invalid");
}

// -- scenario: alternatives with a default ----------------------------------

fn bind_rules() -> Rules {
    compile(&document(vec![intermediate(
        "app",
        vec![section_list(
            "bind",
            vec![
                list_entry(vec![text("type", "text"), text("default", "0.0.0.0:8080")]),
                list_entry(vec![
                    text("type", "section"),
                    section("address", vec![text("type", "text")]),
                    section(
                        "port",
                        vec![text("type", "integer"), integer("default", 8080)],
                    ),
                ]),
            ],
        )],
    )]))
}

#[test]
fn alternatives_insert_the_defaulted_alternative_when_missing() {
    let rules = bind_rules();
    let config = document(vec![section("app", vec![])]);
    rules.validate(&config, 0).expect("default inserted");
    let bind = config
        .value(&NamePath::from_text("app.bind").expect("path"))
        .expect("bind value");
    assert_eq!(bind.as_text(), Some("0.0.0.0:8080"));
    assert!(bind.is_default_value());
    assert!(bind.validation_rule().is_some());
}

#[test]
fn alternatives_match_by_value_type_first() {
    let rules = bind_rules();
    let config = document(vec![section("app", vec![text("bind", "127.0.0.1:80")])]);
    rules.validate(&config, 0).expect("text alternative");

    let config = document(vec![section(
        "app",
        vec![section("bind", vec![text("address", "127.0.0.1")])],
    )]);
    rules.validate(&config, 0).expect("section alternative");
    let port = config
        .value(&NamePath::from_text("app.bind.port").expect("path"))
        .expect("defaulted port");
    assert!(port.is_default_value());
    assert_eq!(port.as_integer(), Some(8080));
}

#[test]
fn alternatives_enumerate_expected_types_on_mismatch() {
    let rules = bind_rules();
    let config = document(vec![section("app", vec![integer("bind", 9000)])]);
    let error = rules.validate(&config, 0).expect_err("no alternative fits");
    assert_eq!(
        error.message(),
        "Expected a text value or a section but got an integer value"
    );
}

#[test]
fn alternatives_rethrow_the_first_constraint_failure() {
    let rules = compile(&document(vec![section_list(
        "limit",
        vec![
            list_entry(vec![text("type", "integer"), integer("minimum", 100)]),
            list_entry(vec![text("type", "integer"), integer("minimum", 10)]),
        ],
    )]));
    // Both alternatives fail on constraints; the first failure is reported.
    let config = document(vec![integer("limit", 5)]);
    let error = rules.validate(&config, 0).expect_err("no alternative fits");
    assert_eq!(error.message(), "The value must be at least 100");
    // The second alternative matches once its constraints pass.
    let config = document(vec![integer("limit", 50)]);
    rules.validate(&config, 0).expect("second alternative matches");
}

// -- scenario: template with override ---------------------------------------

#[test]
fn template_overrides_keep_constraint_order() {
    let rules = compile(&document(vec![
        intermediate(
            "vr_template",
            vec![section(
                "port",
                vec![
                    text("type", "integer"),
                    integer("minimum", 1),
                    integer("maximum", 100),
                ],
            )],
        ),
        intermediate(
            "server",
            vec![section(
                "port",
                vec![text("use_template", "port"), integer("minimum", 10)],
            )],
        ),
    ]));
    let config = port_document(Value::integer(10));
    rules.validate(&config, 0).expect("within overridden bounds");

    let config = port_document(Value::integer(5));
    let error = rules.validate(&config, 0).expect_err("below override");
    assert_eq!(error.message(), "The value must be at least 10");

    let config = port_document(Value::integer(200));
    let error = rules.validate(&config, 0).expect_err("above template maximum");
    assert_eq!(error.message(), "The value must be at most 100");
}

// -- value lists and matrices ------------------------------------------------

#[test]
fn value_list_entries_are_validated_in_place() {
    let rules = compile(&document(vec![section(
        "ports",
        vec![
            text("type", "value_list"),
            integer("minimum", 1),
            integer("maximum", 3),
            section(
                "vr_entry",
                vec![text("type", "integer"), integer("minimum", 1024)],
            ),
        ],
    )]));
    let config = document(vec![value_list(
        "ports",
        vec![Value::integer(8080), Value::integer(9090)],
    )]);
    rules.validate(&config, 0).expect("valid list");
    let ports = config
        .value(&NamePath::from_text("ports").expect("path"))
        .expect("ports value");
    for entry in ports.children_snapshot() {
        let rule = entry.validation_rule().expect("entry annotated");
        assert_eq!(rule.borrow().rule_type(), crate::rule::RuleType::Integer);
    }

    let config = document(vec![value_list(
        "ports",
        vec![Value::integer(8080), Value::integer(80)],
    )]);
    let error = rules.validate(&config, 0).expect_err("entry below minimum");
    assert_eq!(error.message(), "The value must be at least 1024");

    let config = document(vec![value_list(
        "ports",
        vec![
            Value::integer(8080),
            Value::integer(8081),
            Value::integer(8082),
            Value::integer(8083),
        ],
    )]);
    let error = rules.validate(&config, 0).expect_err("too many entries");
    assert_eq!(
        error.message(),
        "The number of values in this list must be at most 3"
    );
}

#[test]
fn a_single_scalar_satisfies_a_value_list_rule() {
    let rules = compile(&document(vec![section(
        "ports",
        vec![
            text("type", "value_list"),
            section("vr_entry", vec![text("type", "integer")]),
        ],
    )]));
    let config = document(vec![integer("ports", 8080)]);
    rules.validate(&config, 0).expect("scalar promoted to list");
}

#[test]
fn matrix_cells_are_validated_in_place() {
    let rules = compile(&document(vec![section(
        "grid",
        vec![
            text("type", "value_matrix"),
            section("vr_entry", vec![text("type", "integer")]),
        ],
    )]));
    let matrix = Value::value_matrix();
    for values in [[1i64, 2], [3, 4]] {
        let row = Value::value_list();
        for value in values {
            row.add_child(Value::integer(value));
        }
        matrix.add_child(row);
    }
    matrix.set_name(crate::name::Name::regular_lossy("grid"));
    let config = document(vec![matrix]);
    rules.validate(&config, 0).expect("valid matrix");

    let bad = Value::value_matrix();
    let row = Value::value_list();
    row.add_child(Value::text("x"));
    bad.add_child(row);
    bad.set_name(crate::name::Name::regular_lossy("grid"));
    let config = document(vec![bad]);
    let error = rules.validate(&config, 0).expect_err("non-integer cell");
    assert_eq!(
        error.message(),
        "Expected an integer value but got a text value"
    );
}

// -- section lists -----------------------------------------------------------

#[test]
fn section_list_entries_carry_the_entry_child_rules() {
    let rules = compile(&document(vec![section(
        "filter",
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
    )]));
    let config = document(vec![section_list(
        "filter",
        vec![
            list_entry(vec![text("identifier", "one")]),
            list_entry(vec![text("identifier", "two")]),
        ],
    )]);
    rules.validate(&config, 0).expect("valid section list");
    let filter = config
        .value(&NamePath::from_text("filter").expect("path"))
        .expect("filter value");
    for entry in filter.children_snapshot() {
        let entry_rule = entry.validation_rule().expect("entry annotated");
        assert_eq!(entry_rule.borrow().rule_type(), crate::rule::RuleType::Section);
        let identifier = entry.child_named("identifier").expect("identifier value");
        let identifier_rule = identifier.validation_rule().expect("identifier annotated");
        assert_eq!(identifier_rule.borrow().rule_type(), crate::rule::RuleType::Text);
    }
}

// -- scenario: not validated -------------------------------------------------

#[test]
fn not_validated_branches_accept_anything() {
    let rules = compile(&document(vec![intermediate(
        "server",
        vec![
            section("port", vec![text("type", "integer")]),
            section("plugin", vec![text("type", "NotValidated")]),
        ],
    )]));
    let plugin = section(
        "plugin",
        vec![
            text("free_form", "anything"),
            section("nested", vec![integer("deep", 1)]),
        ],
    );
    let config = document(vec![section(
        "server",
        vec![integer("port", 80), plugin],
    )]);
    rules.validate(&config, 0).expect("free-form branch accepted");

    // Every node below the branch carries the not-validated rule.
    let nested_value = config
        .value(&NamePath::from_text("server.plugin.nested.deep").expect("path"))
        .expect("deep value");
    let rule = nested_value.validation_rule().expect("annotated");
    assert_eq!(rule.borrow().rule_type(), crate::rule::RuleType::NotValidated);
}

// -- wildcard and name constraints -------------------------------------------

#[test]
fn any_rules_match_unnamed_children_and_check_names() {
    let rules = compile(&document(vec![intermediate(
        "plugins",
        vec![section(
            "vr_any",
            vec![
                text("type", "integer"),
                section(
                    "vr_name",
                    vec![text("type", "text"), text_list("chars", &["(a-z)", "[_]"])],
                ),
            ],
        )],
    )]));
    let config = document(vec![section(
        "plugins",
        vec![integer("first_one", 1), integer("second", 2)],
    )]);
    rules.validate(&config, 0).expect("wildcard accepts names");

    let config = document(vec![section("plugins", vec![integer("bad9name", 1)])]);
    let error = rules.validate(&config, 0).expect_err("digit in name");
    assert!(error.message().contains("is not allowed in this text"));
}

// -- secrets ------------------------------------------------------------------

#[test]
fn secret_rules_mark_matched_values() {
    let rules = compile(&document(vec![section(
        "token",
        vec![text("type", "text"), boolean("is_secret", true)],
    )]));
    let config = document(vec![text("token", "hunter2")]);
    rules.validate(&config, 0).expect("valid token");
    let token = config
        .value(&NamePath::from_text("token").expect("path"))
        .expect("token value");
    assert!(token.is_secret());
}

// -- repeated validation -------------------------------------------------------

#[test]
fn defaults_do_not_leak_between_validations() {
    let rules = compile(&document(vec![section(
        "host",
        vec![text("type", "text"), text("default", "localhost")],
    )]));
    let config = document(vec![]);
    rules.validate(&config, 0).expect("first run");
    assert_eq!(config.len(), 1);
    rules.validate(&config, 0).expect("second run");
    // The default from the first run was removed before re-inserting.
    assert_eq!(config.len(), 1);
    let host = config.child_named("host").expect("host value");
    assert!(host.is_default_value());
    assert_eq!(host.as_text(), Some("localhost"));
}

// -- versions ------------------------------------------------------------------

#[test]
fn version_masks_select_rules_per_document_version() {
    let rules = compile(&document(vec![section_list(
        "limit",
        vec![
            list_entry(vec![text("type", "text"), integer("maximum_version", 1)]),
            list_entry(vec![text("type", "integer"), integer("minimum_version", 2)]),
        ],
    )]));
    let config = document(vec![text("limit", "none")]);
    rules.validate(&config, 1).expect("text form in version 1");
    let error = rules.validate(&config, 2).expect_err("text form retired");
    assert_eq!(error.message(), "Expected an integer value but got a text value");

    let config = document(vec![integer("limit", 10)]);
    rules.validate(&config, 2).expect("integer form in version 2");
}

#[test]
fn version_inactive_rules_do_not_demand_values() {
    let rules = compile(&document(vec![section(
        "new_feature",
        vec![text("type", "text"), integer("minimum_version", 5)],
    )]));
    let config = document(vec![]);
    rules.validate(&config, 1).expect("inactive rule is not missing");
    let error = rules.validate(&config, 5).expect_err("active rule is missing");
    assert!(error.message().contains("expected a text value"));
}

// -- scenario: key indexes -----------------------------------------------------

fn filter_rules() -> Rules {
    compile(&document(vec![
        section_list(
            "vr_key",
            vec![list_entry(vec![
                text("name", "filter"),
                text("key", "filter.vr_entry.identifier"),
            ])],
        ),
        section(
            "filter",
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
        intermediate(
            "app",
            vec![section(
                "start_filter",
                vec![text("type", "text"), text("key", "filter")],
            )],
        ),
    ]))
}

fn filter_config(identifiers: &[&str], start_filter: &str) -> ValueRef {
    let entries = identifiers
        .iter()
        .map(|identifier| list_entry(vec![text("identifier", identifier)]))
        .collect();
    document(vec![
        section_list("filter", entries),
        section("app", vec![text("start_filter", start_filter)]),
    ])
}

#[test]
fn key_constraints_accept_known_keys() {
    let rules = filter_rules();
    let config = filter_config(&["one", "two"], "one");
    rules.validate(&config, 0).expect("key exists");
}

#[test]
fn duplicate_keys_are_rejected_at_the_offending_entry() {
    let rules = filter_rules();
    let config = filter_config(&["one", "one"], "one");
    let error = rules.validate(&config, 0).expect_err("duplicate key");
    assert!(error.message().contains("Found a duplicate"));
    assert!(error.message().contains("'identifier'"));
}

#[test]
fn key_constraints_reject_unknown_keys() {
    let rules = filter_rules();
    let config = filter_config(&["one", "two"], "three");
    let error = rules.validate(&config, 0).expect_err("unknown key");
    assert_eq!(
        error.message(),
        "This value must refer to an existing key, but no matching entry was found"
    );
}

#[test]
fn composite_key_columns_are_addressable() {
    let rules = compile(&document(vec![
        section_list(
            "vr_key",
            vec![list_entry(vec![
                text("name", "route"),
                text_list(
                    "key",
                    &["routes.vr_entry.host", "routes.vr_entry.port"],
                ),
            ])],
        ),
        section(
            "routes",
            vec![
                text("type", "section_list"),
                section(
                    "vr_entry",
                    vec![
                        text("type", "section"),
                        section("host", vec![text("type", "text")]),
                        section("port", vec![text("type", "integer")]),
                    ],
                ),
            ],
        ),
        intermediate(
            "app",
            vec![
                section(
                    "default_host",
                    vec![text("type", "text"), text("key", "route[0]")],
                ),
                section(
                    "default_route",
                    vec![text("type", "text"), text("key", "route")],
                ),
            ],
        ),
    ]));
    let config = document(vec![
        section_list(
            "routes",
            vec![list_entry(vec![
                text("host", "web"),
                integer("port", 8080),
            ])],
        ),
        section(
            "app",
            vec![
                text("default_host", "web"),
                text("default_route", "web,8080"),
            ],
        ),
    ]);
    rules.validate(&config, 0).expect("column and composite lookups");

    let config = document(vec![
        section_list(
            "routes",
            vec![list_entry(vec![
                text("host", "web"),
                integer("port", 8080),
            ])],
        ),
        section(
            "app",
            vec![
                text("default_host", "web"),
                text("default_route", "web,9090"),
            ],
        ),
    ]);
    let error = rules.validate(&config, 0).expect_err("composite mismatch");
    assert!(error.message().contains("must refer to an existing key"));
}

// -- scenario: dependencies ----------------------------------------------------

fn xor_rules() -> Rules {
    compile(&document(vec![intermediate(
        "server",
        vec![
            section(
                "hostname",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section(
                "ip_address",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "xor"),
                    text("source", "hostname"),
                    text("target", "ip_address"),
                ])],
            ),
        ],
    )]))
}

#[test]
fn xor_dependencies_allow_either_side_or_neither() {
    let rules = xor_rules();
    for children in [
        vec![],
        vec![text("hostname", "example.com")],
        vec![text("ip_address", "192.0.2.1")],
    ] {
        let config = document(vec![section("server", children)]);
        rules.validate(&config, 0).expect("xor satisfied");
    }
}

#[test]
fn xor_dependencies_reject_both_sides() {
    let rules = xor_rules();
    let config = document(vec![section(
        "server",
        vec![
            text("hostname", "example.com"),
            text("ip_address", "192.0.2.1"),
        ],
    )]);
    let error = rules.validate(&config, 0).expect_err("both configured");
    assert_eq!(
        error.message(),
        "You must either configure 'hostname' or configure 'ip_address'"
    );
}

#[test]
fn default_values_do_not_count_as_configured() {
    let rules = compile(&document(vec![intermediate(
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
                    text("mode", "xor"),
                    text("source", "hostname"),
                    text("target", "ip_address"),
                ])],
            ),
        ],
    )]));
    // The hostname exists only as a default; configuring the ip_address
    // must still satisfy the dependency.
    let config = document(vec![section(
        "server",
        vec![text("ip_address", "192.0.2.1")],
    )]);
    rules.validate(&config, 0).expect("default is not configured");
}

#[test]
fn and_dependencies_require_both_sides() {
    let rules = compile(&document(vec![intermediate(
        "server",
        vec![
            section(
                "certificate",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section(
                "private_key",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "and"),
                    text("source", "certificate"),
                    text("target", "private_key"),
                ])],
            ),
        ],
    )]));
    let config = document(vec![section(
        "server",
        vec![text("certificate", "a.pem")],
    )]);
    let error = rules.validate(&config, 0).expect_err("missing private key");
    assert_eq!(
        error.message(),
        "You must configure 'certificate' and configure 'private_key'"
    );
}

#[test]
fn if_dependencies_use_custom_errors() {
    let rules = compile(&document(vec![intermediate(
        "server",
        vec![
            section(
                "tls",
                vec![text("type", "boolean"), boolean("is_optional", true)],
            ),
            section(
                "certificate",
                vec![text("type", "text"), boolean("is_optional", true)],
            ),
            section_list(
                "vr_dependency",
                vec![list_entry(vec![
                    text("mode", "if"),
                    text("source", "tls"),
                    text("target", "certificate"),
                    text("error", "TLS requires a certificate"),
                ])],
            ),
        ],
    )]));
    let config = document(vec![section("server", vec![boolean("tls", true)])]);
    let error = rules.validate(&config, 0).expect_err("certificate missing");
    assert_eq!(error.message(), "TLS requires a certificate");
}

// -- invariants ---------------------------------------------------------------

#[test]
fn every_value_is_annotated_after_validation() {
    let rules = compile(&document(vec![intermediate(
        "server",
        vec![
            section("port", vec![text("type", "integer")]),
            section(
                "hosts",
                vec![
                    text("type", "value_list"),
                    section("vr_entry", vec![text("type", "text")]),
                ],
            ),
        ],
    )]));
    let config = document(vec![section(
        "server",
        vec![
            integer("port", 80),
            crate::test_support::text_list("hosts", &["a", "b"]),
        ],
    )]);
    rules.validate(&config, 0).expect("valid document");
    let mut unannotated = 0;
    crate::value::walk_tree(
        &config,
        |_| true,
        |node| {
            if node.validation_rule().is_none() {
                unannotated += 1;
            }
            Ok(())
        },
    )
    .expect("walk");
    assert_eq!(unannotated, 0);
}

#[test]
fn validating_a_section_instead_of_a_document_works() {
    let rules = compile(&document(vec![section(
        "port",
        vec![text("type", "integer")],
    )]));
    let standalone = section("server", vec![integer("port", 8080)]);
    rules.validate(&standalone, 0).expect("section root");
}
