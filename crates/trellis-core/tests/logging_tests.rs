mod common;

use common::{collection_module, content_module};
use serde_json::json;
use trellis_core::logging_facility::capture;
use trellis_core::{Browser, JsonContainer, JsonReader, JsonWriter, SharedBuffer};
use trellis_core_types::schema::{
    EVENT_BEGIN_EDIT, EVENT_EDIT, EVENT_END_EDIT, EVENT_FAIL, EVENT_PRUNED,
};

// One process-wide capture subscriber is shared by every test in this
// binary; assertions check for events each test produced itself and
// never count or clear.

#[test]
fn test_edit_cycle_emits_canonical_events() {
    let cap = capture::install();

    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);
    browser
        .root()
        .upsert_from(JsonReader::from_str(r#"{"a":{"b":{"x":"v"}}}"#).unwrap())
        .or_err()
        .unwrap();

    cap.assert_event(EVENT_EDIT);
    cap.assert_event(EVENT_BEGIN_EDIT);
    cap.assert_event(EVENT_END_EDIT);

    let edits = cap.named(EVENT_EDIT);
    assert!(
        edits
            .iter()
            .any(|e| e.edit_mode() == Some("Upsert") && e.path.is_some()),
        "no upsert edit event in {:?}",
        edits
    );

    let begins = cap.named(EVENT_BEGIN_EDIT);
    assert!(
        begins
            .iter()
            .any(|e| e.component.is_some() && e.request_id().is_some()),
        "no begin event with correlation in {:?}",
        begins
    );
}

#[test]
fn test_prunes_name_the_constraint_and_ident() {
    let cap = capture::install();

    let schema = content_module();
    let node = JsonContainer::new(json!({"y": {"a": "state"}, "z": {"a": "config"}}));
    let browser = Browser::new(schema, node);

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .find_url("?content=config")
        .insert_into(writer.node())
        .or_err()
        .unwrap();

    let pruned = cap.named(EVENT_PRUNED);
    let content_prune = pruned
        .iter()
        .find(|e| e.constraint() == Some("content") && e.ident() == Some("y"));
    assert!(
        content_prune.is_some(),
        "no content prune of y in {:?}",
        pruned
    );
}

#[test]
fn test_failed_steps_carry_error_classification() {
    let cap = capture::install();

    let schema = collection_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);
    let sel = browser.root().find("no-such-def");
    assert!(sel.last_err().is_some());

    let fails = cap.named(EVENT_FAIL);
    let not_found = fails
        .iter()
        .find(|e| e.err_status() == Some("404") && e.err_kind().is_some());
    assert!(not_found.is_some(), "no 404 failure in {:?}", fails);
}
