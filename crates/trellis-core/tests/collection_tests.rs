mod common;

use common::collection_module;
use serde_json::json;
use trellis_core::{Browser, JsonContainer, JsonReader, JsonWriter, SharedBuffer};

// ===== READ: data tree to JSON =====

#[test]
fn test_container_read() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "waldo"}}}));
    let browser = Browser::new(schema, node);

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();

    assert_eq!(buf.string(), r#"{"a":{"b":{"x":"waldo"}}}"#);
}

#[test]
fn test_list_read() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({
        "p": [{"k": "walter"}, {"k": "waldo"}, {"k": "weirdo"}]
    }));
    let browser = Browser::new(schema, node);

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();

    assert_eq!(
        buf.string(),
        r#"{"p":[{"k":"walter"},{"k":"waldo"},{"k":"weirdo"}]}"#
    );
}

// ===== WRITE: JSON into a data tree =====

#[test]
fn test_container_write() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node.clone());

    let payload = JsonReader::from_str(r#"{"a":{"b":{"x":"waldo"}}}"#).unwrap();
    browser.root().insert_from(payload).or_err().unwrap();

    assert_eq!(node.value()["a"]["b"]["x"], json!("waldo"));
}

#[test]
fn test_list_write() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node.clone());

    let payload =
        JsonReader::from_str(r#"{"p":[{"k":"walter"},{"k":"waldo"},{"k":"weirdo"}]}"#).unwrap();
    browser.root().insert_from(payload).or_err().unwrap();

    assert_eq!(node.value()["p"][1]["k"], json!("waldo"));
}

#[test]
fn test_list_write_missing_key_rejected() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    let payload = JsonReader::from_str(r#"{"p":[{"q":{"s":"hi"}}]}"#).unwrap();
    let err = browser
        .root()
        .insert_from(payload)
        .or_err()
        .unwrap_err();

    assert!(
        err.to_string().starts_with("no key"),
        "wrong error: {}",
        err
    );
    assert_eq!(err.status(), 400);
}

// ===== ROUND TRIP =====

#[test]
fn test_json_round_trip() {
    let schema = collection_module();
    // payload members in schema order so the rendering matches exactly
    let payload = concat!(
        r#"{"a":{"b":{"x":"waldo"}},"#,
        r#""p":[{"k":"walter","q":{"s":"hi"},"r":[{"z":1},{"z":2}]}]}"#
    );

    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);
    browser
        .root()
        .insert_from(JsonReader::from_str(payload).unwrap())
        .or_err()
        .unwrap();

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();

    assert_eq!(buf.string(), payload);
}

// ===== DELETE =====

#[test]
fn test_container_delete() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "waldo"}}}));
    let browser = Browser::new(schema, node);

    browser.root().find("a/b").delete().unwrap();

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();
    assert_eq!(buf.string(), r#"{"a":{}}"#);
}

#[test]
fn test_list_item_delete() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({
        "p": [{"k": "walter"}, {"k": "waldo"}, {"k": "weirdo"}]
    }));
    let browser = Browser::new(schema, node);

    browser.root().find("p=walter").delete().unwrap();

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();
    assert_eq!(buf.string(), r#"{"p":[{"k":"waldo"},{"k":"weirdo"}]}"#);
}
