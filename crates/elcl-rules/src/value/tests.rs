#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;

fn named(name: &str, value: ValueRef) -> ValueRef {
    value.set_name(Name::regular_lossy(name));
    value
}

#[test]
fn section_children_are_found_by_normalized_name() {
    let section = Value::section_with_names();
    section.add_child(named("Server Port", Value::integer(8080)));
    let child = section
        .child(&Name::regular_lossy("server_port"))
        .expect("child found");
    assert_eq!(child.as_integer(), Some(8080));
    assert!(section.child(&Name::regular_lossy("missing")).is_none());
}

#[test]
fn list_children_receive_index_names() {
    let list = Value::value_list();
    list.add_child(Value::integer(1));
    list.add_child(Value::integer(2));
    let children = list.children_snapshot();
    assert_eq!(children[0].name(), Name::index(0));
    assert_eq!(children[1].name(), Name::index(1));
}

#[test]
fn value_lookup_descends_a_path() {
    let document = Value::document();
    let server = named("server", Value::section_with_names());
    server.add_child(named("port", Value::integer(8080)));
    document.add_child(server);
    let port = document
        .value(&NamePath::from_text("server.port").expect("path"))
        .expect("value found");
    assert_eq!(port.as_integer(), Some(8080));
    assert!(document.has_value(&NamePath::from_text("server").expect("path")));
    assert!(!document.has_value(&NamePath::from_text("client").expect("path")));
}

#[test]
fn name_path_walks_up_to_the_document() {
    let document = Value::document();
    let server = named("server", Value::section_with_names());
    let port = named("port", Value::integer(8080));
    server.add_child(port.clone());
    document.add_child(server);
    assert_eq!(port.name_path().to_text(), "server.port");
    assert_eq!(document.name_path().to_text(), "");
}

#[test]
fn typed_item_extraction() {
    let single = Value::text("one");
    assert_eq!(single.text_items(), Some(vec!["one".to_owned()]));

    let list = Value::value_list();
    list.add_child(Value::text("a"));
    list.add_child(Value::text("b"));
    assert_eq!(
        list.text_items(),
        Some(vec!["a".to_owned(), "b".to_owned()])
    );

    let mixed = Value::value_list();
    mixed.add_child(Value::text("a"));
    mixed.add_child(Value::integer(1));
    assert_eq!(mixed.text_items(), None);

    assert_eq!(Value::integer(7).integer_items(), Some(vec![7]));
    assert_eq!(Value::text("x").integer_items(), None);
}

#[test]
fn list_entries_wraps_scalars() {
    let scalar = Value::integer(5);
    let entries = scalar.list_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].as_integer(), Some(5));
}

#[test]
fn text_representation_for_keys() {
    assert_eq!(
        Value::text("alpha").to_text_representation(),
        Some("alpha".to_owned())
    );
    assert_eq!(
        Value::integer(42).to_text_representation(),
        Some("42".to_owned())
    );
    assert_eq!(Value::boolean(true).to_text_representation(), None);
}

#[test]
fn deep_copy_is_independent() {
    let section = named("server", Value::section_with_names());
    let port = named("port", Value::integer(8080));
    port.set_location(Location::new("a.elcl", 4, 1));
    port.mark_as_default_value();
    port.set_secret(true);
    section.add_child(port);

    let copy = section.deep_copy();
    assert_eq!(copy.name(), Name::regular_lossy("server"));
    assert_eq!(copy.len(), 1);
    let port_copy = copy.child_named("port").expect("copied child");
    assert_eq!(port_copy.as_integer(), Some(8080));
    assert_eq!(port_copy.location(), Some(Location::new("a.elcl", 4, 1)));
    // Flags and annotations are not carried into the copy.
    assert!(!port_copy.is_default_value());
    assert!(!port_copy.is_secret());
    assert!(port_copy.validation_rule().is_none());
    // The copy is detached from the original tree.
    assert!(copy.parent().is_none());
}

#[test]
fn remove_default_values_drops_only_defaults() {
    let section = Value::section_with_names();
    let configured = named("a", Value::integer(1));
    let materialized = named("b", Value::integer(2));
    materialized.mark_as_default_value();
    section.add_child(configured);
    section.add_child(materialized);
    section.remove_default_values();
    assert_eq!(section.len(), 1);
    assert!(section.child_named("a").is_some());
    assert!(section.child_named("b").is_none());
}

#[test]
fn walk_tree_visits_in_declaration_order() {
    let document = Value::document();
    let a = named("a", Value::section_with_names());
    a.add_child(named("a1", Value::integer(1)));
    a.add_child(named("a2", Value::integer(2)));
    let b = named("b", Value::section_with_names());
    b.add_child(named("b1", Value::integer(3)));
    document.add_child(a);
    document.add_child(b);

    let mut order = Vec::new();
    walk_tree(
        &document,
        |_| true,
        |node| {
            order.push(node.name().to_string());
            Ok(())
        },
    )
    .expect("walk succeeds");
    assert_eq!(order, ["", "a", "a1", "a2", "b", "b1"]);
}

#[test]
fn walk_tree_filter_skips_subtrees() {
    let document = Value::document();
    let a = named("a", Value::section_with_names());
    a.add_child(named("a1", Value::integer(1)));
    document.add_child(a);
    document.add_child(named("b", Value::integer(2)));

    let mut order = Vec::new();
    walk_tree(
        &document,
        |node| !node.name().is("a"),
        |node| {
            order.push(node.name().to_string());
            Ok(())
        },
    )
    .expect("walk succeeds");
    assert_eq!(order, ["", "b"]);
}

#[test]
fn value_type_descriptions() {
    assert_eq!(ValueType::Integer.description(), "an integer value");
    assert_eq!(ValueType::Text.description(), "a text value");
    assert_eq!(ValueType::SectionList.description(), "a section list");
    assert_eq!(ValueType::IntermediateSection.description(), "a section");
}
