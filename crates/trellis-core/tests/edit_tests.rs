mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{choice_module, collection_module};
use serde_json::json;
use trellis_core::errors::Result;
use trellis_core::node::{ListRequest, Node, ValueHandle};
use trellis_core::{BasicNode, Browser, ErrorKind, JsonContainer, JsonReader, Trigger};

// ===== MODE SEMANTICS =====

#[test]
fn test_insert_existing_container_conflicts() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "old"}}}));
    let browser = Browser::new(schema, node.clone());
    let before = node.value();

    let payload = JsonReader::from_str(r#"{"a":{"b":{"x":"new"}}}"#).unwrap();
    let err = browser.root().insert_from(payload).or_err().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status(), 409);
    assert_eq!(node.value(), before, "state must be unchanged");
}

#[test]
fn test_insert_existing_list_item_conflicts() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"p": [{"k": "walter"}]}));
    let browser = Browser::new(schema, node.clone());
    let before = node.value();

    let payload = JsonReader::from_str(r#"{"p":[{"k":"walter"}]}"#).unwrap();
    let err = browser.root().insert_from(payload).or_err().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(node.value(), before);
}

#[test]
fn test_update_missing_container_not_found() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    let payload = JsonReader::from_str(r#"{"a":{"b":{"x":"v"}}}"#).unwrap();
    let err = browser.root().update_from(payload).or_err().unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn test_upsert_merges_existing() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "old"}}}));
    let browser = Browser::new(schema, node.clone());

    let payload = JsonReader::from_str(r#"{"a":{"b":{"x":"new"}}}"#).unwrap();
    browser.root().upsert_from(payload).or_err().unwrap();
    assert_eq!(node.value()["a"]["b"]["x"], json!("new"));
}

// ===== IDEMPOTENCE =====

#[test]
fn test_upsert_twice_is_idempotent() {
    let schema = collection_module();
    let payload = r#"{"a":{"b":{"x":"waldo"}},"p":[{"k":"w","q":{"s":"hi"}}]}"#;

    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node.clone());
    browser
        .root()
        .upsert_from(JsonReader::from_str(payload).unwrap())
        .or_err()
        .unwrap();
    let once = node.value();

    browser
        .root()
        .upsert_from(JsonReader::from_str(payload).unwrap())
        .or_err()
        .unwrap();
    assert_eq!(node.value(), once);
}

#[test]
fn test_update_twice_is_idempotent() {
    let schema = collection_module();
    let payload = r#"{"a":{"b":{"x":"waldo"}}}"#;

    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node.clone());
    browser
        .root()
        .upsert_from(JsonReader::from_str(payload).unwrap())
        .or_err()
        .unwrap();
    let once = node.value();

    browser
        .root()
        .update_from(JsonReader::from_str(payload).unwrap())
        .or_err()
        .unwrap();
    assert_eq!(node.value(), once);
}

// ===== KEY ORDERING =====

/// Destination that records every field write so the editor's write
/// order is observable
fn recording_list_dst(trace: Rc<RefCell<Vec<String>>>) -> Rc<dyn Node> {
    fn item_node(trace: Rc<RefCell<Vec<String>>>) -> Rc<dyn Node> {
        let field_trace = Rc::clone(&trace);
        BasicNode::new()
            .on_field(move |r, hnd: &mut ValueHandle| {
                field_trace
                    .borrow_mut()
                    .push(r.sel.schema().ident(r.meta).to_string());
                hnd.val.take();
                Ok(())
            })
            .on_child(move |r| {
                if r.new {
                    return Ok(Some(item_node(Rc::clone(&trace))));
                }
                Ok(None)
            })
            .into_node()
    }
    fn list_node(trace: Rc<RefCell<Vec<String>>>) -> Rc<dyn Node> {
        BasicNode::new()
            .on_next(move |r: &ListRequest| {
                if r.new {
                    return Ok(Some((item_node(Rc::clone(&trace)), r.key.clone())));
                }
                Ok(None)
            })
            .into_node()
    }
    let list_trace = trace;
    BasicNode::new()
        .on_child(move |r| {
            if !r.new {
                return Ok(None);
            }
            Ok(Some(list_node(Rc::clone(&list_trace))))
        })
        .into_node()
}

#[test]
fn test_key_leaves_written_first() {
    let schema = collection_module();
    // payload deliberately orders the key leaf last
    let node = JsonContainer::new(json!({"p": [{"q": {"s": "hi"}, "k": "a"}]}));
    let browser = Browser::new(schema, node);

    let trace: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let dst = recording_list_dst(Rc::clone(&trace));
    browser.root().insert_into(dst).or_err().unwrap();

    let writes = trace.borrow();
    let k_pos = writes.iter().position(|w| w == "k");
    let s_pos = writes.iter().position(|w| w == "s");
    assert!(k_pos.is_some(), "key leaf was not written: {:?}", writes);
    if let (Some(k), Some(s)) = (k_pos, s_pos) {
        assert!(k < s, "key write must precede non-key writes: {:?}", writes);
    }
}

// ===== CHOICE =====

#[test]
fn test_choice_narrows_to_active_case() {
    let schema = choice_module();
    let node = JsonContainer::new(json!({"conn": {"port": 8080}}));
    let browser = Browser::new(schema, node);

    let buf = trellis_core::SharedBuffer::new();
    let writer = trellis_core::JsonWriter::new(buf.clone());
    browser
        .root()
        .insert_into(writer.node())
        .or_err()
        .unwrap();
    assert_eq!(buf.string(), r#"{"conn":{"port":8080}}"#);
}

#[test]
fn test_update_cannot_switch_active_case() {
    let schema = choice_module();
    let node = JsonContainer::new(json!({"conn": {"cert": "pem"}}));
    let browser = Browser::new(schema, node);

    let payload = JsonReader::from_str(r#"{"conn":{"port":443}}"#).unwrap();
    let err = browser.root().update_from(payload).or_err().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

// ===== EDIT EVENTS =====

#[test]
fn test_triggers_fire_once_per_edit_cycle() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    let begins = Rc::new(RefCell::new(0));
    let ends = Rc::new(RefCell::new(0));
    let b = Rc::clone(&begins);
    browser.register_trigger(Trigger::on_begin("", move |_r| -> Result<()> {
        *b.borrow_mut() += 1;
        Ok(())
    }));
    let e = Rc::clone(&ends);
    browser.register_trigger(Trigger::on_end("", move |_r| -> Result<()> {
        *e.borrow_mut() += 1;
        Ok(())
    }));

    let payload = JsonReader::from_str(r#"{"a":{"b":{"x":"v"}}}"#).unwrap();
    browser.root().upsert_from(payload).or_err().unwrap();

    assert_eq!(*begins.borrow(), 1);
    assert_eq!(*ends.borrow(), 1);
}
