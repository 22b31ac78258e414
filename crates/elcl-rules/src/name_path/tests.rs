#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;

fn path(text: &str) -> NamePath {
    NamePath::from_text(text).expect("valid path")
}

#[test]
fn parses_regular_segments() {
    let p = path("server.port");
    assert_eq!(p.len(), 2);
    assert_eq!(p.at(0), Some(&Name::regular_lossy("server")));
    assert_eq!(p.at(1), Some(&Name::regular_lossy("port")));
}

#[test]
fn parses_text_and_index_segments() {
    let p = path("translations.\"en US\".text");
    assert_eq!(p.at(1), Some(&Name::text("en US")));

    let p = path("servers[2].port");
    assert_eq!(p.at(1), Some(&Name::index(2)));
    assert_eq!(p.len(), 3);
}

#[test]
fn rejects_malformed_paths() {
    assert!(NamePath::from_text("").is_err());
    assert!(NamePath::from_text("server.").is_err());
    assert!(NamePath::from_text("server..port").is_err());
    assert!(NamePath::from_text("server.\"open").is_err());
    assert!(NamePath::from_text("server.[x]").is_err());
    assert!(NamePath::from_text("server.9port").is_err());
}

#[test]
fn equality_uses_normalization() {
    assert_eq!(path("Server.Port"), path("server.port"));
    assert_eq!(path("time out.limit"), path("time_out.limit"));
    assert_ne!(path("server.port"), path("server.host"));
}

#[test]
fn prefix_suffix_and_parent() {
    let p = path("app.filter.vr_entry.identifier");
    assert_eq!(p.prefix(2), path("app.filter"));
    assert_eq!(p.suffix_from(3), path("identifier"));
    assert_eq!(p.parent(), path("app.filter.vr_entry"));
    assert_eq!(p.find_regular("vr_entry"), Some(2));
    assert_eq!(p.find_regular("missing"), None);
}

#[test]
fn membership_tests() {
    assert!(path("a.\"b\".c").contains_text());
    assert!(!path("a.b.c").contains_text());
    assert!(path("a[0].c").contains_index());
    assert!(!path("a.b").contains_index());
}

#[test]
fn round_trips_through_text() {
    for text in ["server.port", "servers[0].port", "a.\"b c\".d"] {
        let p = path(text);
        assert_eq!(NamePath::from_text(&p.to_text()).expect("reparse"), p);
    }
}

#[test]
fn joined_and_concatenated() {
    let base = path("server");
    let joined = base.joined(Name::regular_lossy("port"));
    assert_eq!(joined, path("server.port"));
    let concatenated = base.concatenated(&path("tls.cert"));
    assert_eq!(concatenated, path("server.tls.cert"));
    assert_eq!(base.len(), 1);
}
