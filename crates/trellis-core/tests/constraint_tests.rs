mod common;

use common::{collection_module, content_module, defaults_module, game_module};
use serde_json::json;
use trellis_core::{Browser, ErrorKind, JsonContainer, JsonWriter, SharedBuffer};

fn read_to_string(sel: &trellis_core::Selection) -> String {
    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    sel.insert_into(writer.node()).or_err().unwrap();
    buf.string()
}

// ===== DEPTH =====

#[test]
fn test_max_depth_prunes_below_limit() {
    let schema = game_module();
    let node = JsonContainer::new(json!({
        "game": {
            "base-radius": 14,
            "teams": [{"color": "red", "team": {"members": ["joe", "mary"]}}]
        }
    }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?depth=2");
    assert_eq!(read_to_string(&sel), r#"{"game":{"base-radius":14}}"#);

    // a larger budget exposes the full tree
    let sel = browser.root().find_url("?depth=10");
    assert!(read_to_string(&sel).contains("members"));
}

// ===== FIELDS =====

#[test]
fn test_fields_keeps_only_matching_subtrees() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({
        "a": {"b": {"x": "waldo"}},
        "p": [{"k": "walter"}]
    }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?fields=a.b");
    assert_eq!(read_to_string(&sel), r#"{"a":{"b":{"x":"waldo"}}}"#);
}

#[test]
fn test_exclude_fields_drops_subtree() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({
        "a": {"b": {"x": "waldo"}},
        "p": [{"k": "walter"}]
    }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?c2-xfields=a");
    assert_eq!(read_to_string(&sel), r#"{"p":[{"k":"walter"}]}"#);
}

// ===== LIST RANGE =====

#[test]
fn test_list_range_window() {
    let schema = collection_module();
    let items: Vec<serde_json::Value> = (0..10).map(|i| json!({"k": format!("k{}", i)})).collect();
    let node = JsonContainer::new(json!({ "p": items }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?c2-range=p!2-5");
    assert_eq!(
        read_to_string(&sel),
        r#"{"p":[{"k":"k2"},{"k":"k3"},{"k":"k4"}]}"#
    );
}

// ===== NODE BUDGET =====

#[test]
fn test_max_node_count_aborts_with_too_large() {
    let schema = collection_module();
    let items: Vec<serde_json::Value> = (0..10).map(|i| json!({"k": format!("k{}", i)})).collect();
    let node = JsonContainer::new(json!({ "p": items }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?c2-max-node-count=5");
    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    let err = sel.insert_into(writer.node()).or_err().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooLarge);
    assert_eq!(err.status(), 413);
}

// ===== CONTENT =====

#[test]
fn test_content_config_elides_state_subtrees() {
    let schema = content_module();
    let node = JsonContainer::new(json!({
        "y": {"a": "state"},
        "z": {"a": "config"}
    }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?content=config");
    assert_eq!(read_to_string(&sel), r#"{"z":{"a":"config"}}"#);
}

#[test]
fn test_content_nonconfig_elides_config_leaves() {
    let schema = content_module();
    let node = JsonContainer::new(json!({
        "y": {"a": "state"},
        "z": {"a": "config"}
    }));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?content=nonconfig");
    let out = read_to_string(&sel);
    assert!(out.contains(r#""y":{"a":"state"}"#), "got {}", out);
    assert!(!out.contains("config"), "got {}", out);
}

// ===== WITH-DEFAULTS =====

#[test]
fn test_with_defaults_report_all_synthesizes() {
    let schema = defaults_module();
    let node = JsonContainer::new(json!({"c": {"name": "x"}}));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?with-defaults=report-all");
    assert_eq!(read_to_string(&sel), r#"{"c":{"speed":10,"name":"x"}}"#);
}

#[test]
fn test_with_defaults_trim_elides_default_values() {
    let schema = defaults_module();
    // speed explicitly set to the default value
    let node = JsonContainer::new(json!({"c": {"speed": 10, "name": "x"}}));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?with-defaults=trim");
    assert_eq!(read_to_string(&sel), r#"{"c":{"name":"x"}}"#);
}

#[test]
fn test_with_defaults_explicit_skips_synthesis() {
    let schema = defaults_module();
    let node = JsonContainer::new(json!({"c": {"name": "x"}}));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find_url("?with-defaults=explicit");
    assert_eq!(read_to_string(&sel), r#"{"c":{"name":"x"}}"#);
}
