mod common;

use common::collection_module;
use serde_json::json;
use trellis_core::{Browser, ErrorKind, JsonContainer, TrellisError};
use trellis_core_types::RequestContext;

// ===== NAVIGATION =====

#[test]
fn test_find_relative_parent() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "waldo"}}}));
    let browser = Browser::new(schema, node);

    let b = browser.root().find("a/b");
    let a = b.find("../b");
    assert!(a.last_err().is_none());
    assert_eq!(a.path().to_string(), "/a/b");
}

#[test]
fn test_find_above_root_fails() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    let err = browser.root().find("../a").or_err().unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn test_unknown_ident_is_404() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    let sel = browser.root().find("nothing/here");
    assert_eq!(sel.last_err().unwrap().status(), 404);
}

// ===== LEAF ACCESS =====

#[test]
fn test_get_and_set() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {"x": "waldo"}}}));
    let browser = Browser::new(schema, node.clone());

    let b = browser.root().find("a/b");
    assert_eq!(b.get("x").unwrap().unwrap().to_string(), "waldo");

    b.set("x", &json!("odlaw")).unwrap();
    assert_eq!(node.value()["a"]["b"]["x"], json!("odlaw"));
}

#[test]
fn test_get_non_leaf_is_bad_request() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {}}));
    let browser = Browser::new(schema, node);

    let err = browser.root().get("a").unwrap_err();
    assert_eq!(err.status(), 400);
}

// ===== STICKY ERRORS =====

#[test]
fn test_sticky_error_short_circuits() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {}}}));
    let browser = Browser::new(schema, node);

    let broken = browser.root().find("bogus");
    let first = broken.last_err().cloned().unwrap();

    // every subsequent step re-emits the same error without touching
    // the provider
    let chained = broken.find("a/b").constrain("depth=1");
    assert_eq!(chained.last_err(), Some(&first));
    assert_eq!(chained.get("x").unwrap_err(), first);
    assert_eq!(chained.delete().unwrap_err(), first);
}

// ===== CANCELLATION =====

#[test]
fn test_cancelled_context_surfaces() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"a": {"b": {}}}));
    let browser = Browser::new(schema, node);

    let ctx = RequestContext::background();
    let root = browser.root_with_context(ctx.clone());
    ctx.cancel();

    let sel = root.find("a/b");
    assert_eq!(sel.last_err(), Some(&TrellisError::Cancelled));
    assert_eq!(sel.last_err().unwrap().kind(), ErrorKind::Internal);
}

// ===== KEYS =====

#[test]
fn test_selection_key_exposed() {
    let schema = collection_module();
    let node = JsonContainer::new(json!({"p": [{"k": "walter"}]}));
    let browser = Browser::new(schema, node);

    let item = browser.root().find("p=walter");
    assert_eq!(item.key().len(), 1);
    assert_eq!(item.key()[0].to_string(), "walter");
    assert!(item.inside_list());
    assert_eq!(item.path().to_string(), "/p=walter");
}
